//! Board-to-FEN serializer, the inverse of `fen_parser`.

use crate::board::board::Board;
use crate::board::piece::{
    Color, Piece, PieceKind, CASTLE_BLACK_KINGSIDE, CASTLE_BLACK_QUEENSIDE,
    CASTLE_WHITE_KINGSIDE, CASTLE_WHITE_QUEENSIDE,
};
use crate::utils::algebraic::square_to_algebraic;

pub fn generate_fen(board: &Board) -> String {
    let mut out = String::with_capacity(90);

    for rank in (0..8u8).rev() {
        let mut empty_run = 0;
        for file in 0..8u8 {
            let piece = board.piece_at(rank * 8 + file);
            if piece.is_none() {
                empty_run += 1;
                continue;
            }
            if empty_run > 0 {
                out.push(char::from(b'0' + empty_run));
                empty_run = 0;
            }
            out.push(piece_to_fen_char(piece));
        }
        if empty_run > 0 {
            out.push(char::from(b'0' + empty_run));
        }
        if rank > 0 {
            out.push('/');
        }
    }

    out.push(' ');
    out.push(if board.white_to_move { 'w' } else { 'b' });

    out.push(' ');
    let rights = board.castling_rights();
    if rights == 0 {
        out.push('-');
    } else {
        if rights & CASTLE_WHITE_KINGSIDE != 0 {
            out.push('K');
        }
        if rights & CASTLE_WHITE_QUEENSIDE != 0 {
            out.push('Q');
        }
        if rights & CASTLE_BLACK_KINGSIDE != 0 {
            out.push('k');
        }
        if rights & CASTLE_BLACK_QUEENSIDE != 0 {
            out.push('q');
        }
    }

    out.push(' ');
    match board.en_passant_square() {
        Some(square) => out.push_str(&square_to_algebraic(square)),
        None => out.push('-'),
    }

    let fullmove = board.ply_count / 2 + 1;
    out.push_str(&format!(" {} {}", board.halfmove_clock(), fullmove));

    out
}

fn piece_to_fen_char(piece: Piece) -> char {
    let ch = match piece.kind() {
        Some(PieceKind::Pawn) => 'p',
        Some(PieceKind::Knight) => 'n',
        Some(PieceKind::Bishop) => 'b',
        Some(PieceKind::Rook) => 'r',
        Some(PieceKind::Queen) => 'q',
        Some(PieceKind::King) => 'k',
        None => unreachable!("only occupied squares are serialized"),
    };
    if piece.color() == Color::White {
        ch.to_ascii_uppercase()
    } else {
        ch
    }
}
