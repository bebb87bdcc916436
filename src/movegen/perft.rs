//! Perft: exhaustive legal-move enumeration for move generator validation.
//!
//! Node counts from fixed depths are compared against published reference
//! values; any divergence pinpoints a generation or make/unmake defect.

use crate::board::board::Board;
use crate::board::piece::Square;
use crate::movegen::generator::MoveGenerator;
use crate::movegen::packed_move::{Move, FLAG_CASTLE, FLAG_EN_PASSANT};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerftCounts {
    pub nodes: u64,
    pub captures: u64,
    pub en_passant: u64,
    pub castles: u64,
    pub promotions: u64,
}

impl PerftCounts {
    fn leaf(board: &Board, mv: Move) -> Self {
        let is_en_passant = mv.flag() == FLAG_EN_PASSANT;
        // `board` is observed before the move is made, so the target square
        // still holds any captured piece.
        let is_capture = is_en_passant || board.piece_at(mv.to()).is_some();
        Self {
            nodes: 1,
            captures: u64::from(is_capture),
            en_passant: u64::from(is_en_passant),
            castles: u64::from(mv.flag() == FLAG_CASTLE),
            promotions: u64::from(mv.is_promotion()),
        }
    }

    fn merge(&mut self, rhs: PerftCounts) {
        self.nodes += rhs.nodes;
        self.captures += rhs.captures;
        self.en_passant += rhs.en_passant;
        self.castles += rhs.castles;
        self.promotions += rhs.promotions;
    }
}

/// Count leaf nodes of the legal move tree to `depth`.
pub fn perft(board: &mut Board, depth: u8) -> u64 {
    perft_detailed(board, depth).nodes
}

pub fn perft_detailed(board: &mut Board, depth: u8) -> PerftCounts {
    if depth == 0 {
        return PerftCounts {
            nodes: 1,
            ..PerftCounts::default()
        };
    }

    let mut generator = MoveGenerator::new();
    let mut total = PerftCounts::default();
    perft_recurse(board, &mut generator, depth, &mut total);
    total
}

fn perft_recurse(
    board: &mut Board,
    generator: &mut MoveGenerator,
    depth: u8,
    total: &mut PerftCounts,
) {
    let moves = generator.generate_moves(board, true);

    if depth == 1 {
        for mv in moves {
            total.merge(PerftCounts::leaf(board, mv));
        }
        return;
    }

    for mv in moves {
        board.make_move(mv, true);
        perft_recurse(board, generator, depth - 1, total);
        board.unmake_move(mv, true);
    }
}

/// Per-root-move node counts, the standard tool for localizing a divergence
/// against a reference engine.
pub fn perft_divide(board: &mut Board, depth: u8) -> Vec<(Square, Square, u64)> {
    let mut generator = MoveGenerator::new();
    let moves = generator.generate_moves(board, true);
    let mut rows = Vec::with_capacity(moves.len());

    for mv in moves {
        board.make_move(mv, true);
        let nodes = if depth <= 1 {
            1
        } else {
            perft_detailed(board, depth - 1).nodes
        };
        board.unmake_move(mv, true);
        rows.push((mv.from(), mv.to(), nodes));
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::{perft, perft_detailed, perft_divide};
    use crate::board::board::{Board, STARTING_POSITION_FEN};

    const KIWIPETE_FEN: &str =
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    fn assert_perft(fen: &str, expected: &[u64]) {
        let mut board = Board::from_fen(fen).expect("perft FEN should parse");
        for (depth_idx, &expected_nodes) in expected.iter().enumerate() {
            let depth = (depth_idx + 1) as u8;
            assert_eq!(
                perft(&mut board, depth),
                expected_nodes,
                "node mismatch for '{fen}' at depth {depth}"
            );
        }
    }

    #[test]
    fn start_position_reference_counts() {
        assert_perft(STARTING_POSITION_FEN, &[20, 400, 8_902, 197_281]);
    }

    #[test]
    #[ignore = "slow; run explicitly with --ignored"]
    fn start_position_depth_five() {
        assert_perft(STARTING_POSITION_FEN, &[20, 400, 8_902, 197_281, 4_865_609]);
    }

    #[test]
    fn kiwipete_reference_counts() {
        assert_perft(KIWIPETE_FEN, &[48, 2_039, 97_862]);
    }

    #[test]
    fn endgame_position_reference_counts() {
        // CPW position 3: pins and en passant along a shared rank.
        assert_perft("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", &[14, 191, 2_812, 43_238]);
    }

    #[test]
    fn promotion_heavy_position_reference_counts() {
        // CPW position 4.
        assert_perft(
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            &[6, 264, 9_467],
        );
    }

    #[test]
    fn talkchess_position_reference_counts() {
        // CPW position 5: catches castling-rights and promotion edge cases.
        assert_perft(
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            &[44, 1_486, 62_379],
        );
    }

    #[test]
    fn steven_edwards_position_reference_counts() {
        // CPW position 6.
        assert_perft(
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
            &[46, 2_079, 89_890],
        );
    }

    #[test]
    fn kiwipete_depth_one_move_classes() {
        let mut board = Board::from_fen(KIWIPETE_FEN).expect("FEN should parse");
        let counts = perft_detailed(&mut board, 1);
        assert_eq!(counts.nodes, 48);
        assert_eq!(counts.captures, 8);
        assert_eq!(counts.castles, 2);
        assert_eq!(counts.en_passant, 0);
        assert_eq!(counts.promotions, 0);
    }

    #[test]
    fn divide_rows_sum_to_total() {
        let mut board = Board::from_fen(KIWIPETE_FEN).expect("FEN should parse");
        let rows = perft_divide(&mut board, 2);
        assert_eq!(rows.len(), 48);
        let total: u64 = rows.iter().map(|(_, _, n)| n).sum();
        assert_eq!(total, 2_039);
    }

    #[test]
    fn perft_leaves_the_board_untouched() {
        let mut board = Board::from_fen(KIWIPETE_FEN).expect("FEN should parse");
        let fen_before = board.current_fen();
        let key_before = board.zobrist_key();
        let _ = perft(&mut board, 3);
        assert_eq!(board.current_fen(), fen_before);
        assert_eq!(board.zobrist_key(), key_before);
    }
}
