//! UCI long algebraic move text (`e2e4`, `e7e8q`).

use crate::board::board::Board;
use crate::movegen::generator::{MoveGenerator, PromotionMode};
use crate::movegen::packed_move::Move;
use crate::board::piece::PieceKind;
use crate::utils::algebraic::{algebraic_to_square, square_to_algebraic};

pub fn move_to_uci(mv: Move) -> String {
    if mv.is_null() {
        return "0000".to_owned();
    }
    let mut out = String::with_capacity(5);
    out.push_str(&square_to_algebraic(mv.from()));
    out.push_str(&square_to_algebraic(mv.to()));
    if let Some(kind) = mv.promotion_kind() {
        out.push(match kind {
            PieceKind::Queen => 'q',
            PieceKind::Rook => 'r',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            _ => 'q',
        });
    }
    out
}

/// Resolve move text against the current position.
///
/// Flags (en passant, castling, double push) cannot be derived from the text
/// alone, so the move is matched against the legal move list; this doubles as
/// validation for text arriving over the wire.
pub fn uci_to_move(board: &Board, text: &str) -> Result<Move, String> {
    let text = text.trim();
    if !text.is_ascii() || text.len() < 4 || text.len() > 5 {
        return Err(format!("invalid move text '{text}'"));
    }

    let from = algebraic_to_square(&text[0..2])?;
    let to = algebraic_to_square(&text[2..4])?;
    let promotion = match text.as_bytes().get(4) {
        None => None,
        Some(b'q') | Some(b'Q') => Some(PieceKind::Queen),
        Some(b'r') | Some(b'R') => Some(PieceKind::Rook),
        Some(b'n') | Some(b'N') => Some(PieceKind::Knight),
        Some(b'b') | Some(b'B') => Some(PieceKind::Bishop),
        Some(_) => return Err(format!("invalid promotion in '{text}'")),
    };

    // Match against every promotion variant regardless of the generator mode
    // the search runs with.
    let mut generator = MoveGenerator::new();
    generator.promotion_mode = PromotionMode::All;
    generator
        .generate_moves(board, true)
        .into_iter()
        .find(|mv| mv.from() == from && mv.to() == to && mv.promotion_kind() == promotion)
        .ok_or_else(|| format!("move '{text}' is not legal in this position"))
}
