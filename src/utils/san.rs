//! Standard algebraic notation for display and export.
//!
//! Handles piece letters, captures, castling, promotions, file/rank
//! disambiguation, and check/checkmate suffixes. Needs a mutable board to
//! probe the position after the move for `+`/`#`.

use crate::board::bitboard::{file_of, rank_of};
use crate::board::board::Board;
use crate::board::piece::PieceKind;
use crate::movegen::generator::MoveGenerator;
use crate::movegen::packed_move::{Move, FLAG_CASTLE, FLAG_EN_PASSANT};
use crate::utils::algebraic::square_to_algebraic;

/// Render a legal move in SAN. The board is restored before returning.
pub fn move_to_san(board: &mut Board, mv: Move) -> String {
    let mut generator = MoveGenerator::new();
    let legal_moves = generator.generate_moves(board, true);

    let mut out = String::new();
    let moved_kind = board
        .piece_at(mv.from())
        .kind()
        .unwrap_or(PieceKind::Pawn);
    let is_capture = board.piece_at(mv.to()).is_some() || mv.flag() == FLAG_EN_PASSANT;

    if mv.flag() == FLAG_CASTLE {
        out.push_str(if file_of(mv.to()) == 6 { "O-O" } else { "O-O-O" });
    } else if moved_kind == PieceKind::Pawn {
        if is_capture {
            out.push(char::from(b'a' + file_of(mv.from())));
            out.push('x');
        }
        out.push_str(&square_to_algebraic(mv.to()));
        if let Some(promoted) = mv.promotion_kind() {
            out.push('=');
            out.push(piece_letter(promoted));
        }
    } else {
        out.push(piece_letter(moved_kind));
        out.push_str(&disambiguation(board, &legal_moves, mv, moved_kind));
        if is_capture {
            out.push('x');
        }
        out.push_str(&square_to_algebraic(mv.to()));
    }

    // Probe the resulting position for check and mate marks.
    board.make_move(mv, true);
    let replies = generator.generate_moves(board, true);
    if board.is_in_check() {
        out.push(if replies.is_empty() { '#' } else { '+' });
    }
    board.unmake_move(mv, true);

    out
}

/// File, rank, or full-square prefix when sibling pieces of the same kind
/// can reach the same target.
fn disambiguation(
    board: &Board,
    legal_moves: &[Move],
    mv: Move,
    moved_kind: PieceKind,
) -> String {
    let rivals: Vec<Move> = legal_moves
        .iter()
        .copied()
        .filter(|other| {
            other.from() != mv.from()
                && other.to() == mv.to()
                && board.piece_at(other.from()).kind() == Some(moved_kind)
        })
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let from_file = file_of(mv.from());
    let from_rank = rank_of(mv.from());
    let file_unique = rivals.iter().all(|other| file_of(other.from()) != from_file);
    if file_unique {
        return char::from(b'a' + from_file).to_string();
    }
    let rank_unique = rivals.iter().all(|other| rank_of(other.from()) != from_rank);
    if rank_unique {
        return char::from(b'1' + from_rank).to_string();
    }
    square_to_algebraic(mv.from())
}

fn piece_letter(kind: PieceKind) -> char {
    match kind {
        PieceKind::Knight => 'N',
        PieceKind::Bishop => 'B',
        PieceKind::Rook => 'R',
        PieceKind::Queen => 'Q',
        PieceKind::King => 'K',
        PieceKind::Pawn => 'P',
    }
}

#[cfg(test)]
mod tests {
    use super::move_to_san;
    use crate::board::board::Board;
    use crate::utils::long_algebraic::uci_to_move;

    fn san(fen: &str, uci: &str) -> String {
        let mut board = Board::from_fen(fen).expect("FEN should parse");
        let mv = uci_to_move(&board, uci).expect("move should be legal");
        let text = move_to_san(&mut board, mv);
        assert_eq!(board.current_fen(), fen, "board must be restored");
        text
    }

    #[test]
    fn basic_piece_and_pawn_moves() {
        let start = crate::board::board::STARTING_POSITION_FEN;
        assert_eq!(san(start, "g1f3"), "Nf3");
        assert_eq!(san(start, "e2e4"), "e4");
    }

    #[test]
    fn captures_use_x_and_pawn_file_prefix() {
        assert_eq!(
            san("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2", "e4d5"),
            "exd5"
        );
        assert_eq!(
            san("4k3/8/3r4/8/8/8/3R4/4K3 w - - 0 1", "d2d6"),
            "Rxd6"
        );
    }

    #[test]
    fn castling_text() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        assert_eq!(san(fen, "e1g1"), "O-O");
        assert_eq!(san(fen, "e1c1"), "O-O-O");
    }

    #[test]
    fn promotion_with_mate_suffix() {
        // Promoting on a8 delivers a back-rank style mate against the
        // cornered king.
        assert_eq!(san("k7/2P5/1K6/8/8/8/8/8 w - - 0 1", "c7c8q"), "c8=Q#");
        assert_eq!(san("k7/2P5/1K6/8/8/8/8/8 w - - 0 1", "c7c8r"), "c8=R#");
    }

    #[test]
    fn check_suffix() {
        assert_eq!(san("4k3/8/8/8/8/8/8/R3K3 w - - 0 1", "a1a8"), "Ra8+");
    }

    #[test]
    fn file_disambiguation_between_twin_rooks() {
        // Rooks on a1 and h1 can both reach d1.
        assert_eq!(san("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1", "a1d1"), "Rad1");
    }

    #[test]
    fn rank_disambiguation_when_files_match() {
        // Rooks on d2 and d6 both reach d4.
        assert_eq!(san("4k3/8/3r4/8/8/8/3r4/3QK3 b - - 0 1", "d2d4"), "R2d4");
    }

    #[test]
    fn knights_disambiguate_by_file() {
        // Knights on b1 and f3 both reach d2.
        assert_eq!(san("4k3/8/8/8/8/5N2/8/1N2K3 w - - 0 1", "f3d2"), "Nfd2");
    }
}
