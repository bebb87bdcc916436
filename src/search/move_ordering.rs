//! Move ordering heuristics.
//!
//! Good ordering is what makes alpha-beta prune: the hash move first, then
//! winning captures by most-valuable-victim, promotions, killer moves, and
//! finally quiet moves ranked by history counters and piece-square gain.
//! Losing captures sort below every quiet move.

use crate::board::board::Board;
use crate::board::piece::{Color, PieceKind};
use crate::eval::evaluation::piece_value;
use crate::eval::piece_square;
use crate::movegen::packed_move::{Move, FLAG_EN_PASSANT};

const HASH_MOVE_SCORE: i32 = 10_000_000;
const WINNING_CAPTURE_BASE: i32 = 8_000_000;
const PROMOTION_BASE: i32 = 6_000_000;
const KILLER_SCORE: i32 = 4_000_000;
const LOSING_CAPTURE_BASE: i32 = -2_000_000;
const CAPTURE_VICTIM_MULTIPLIER: i32 = 100;

/// Two-slot killer store per ply: quiet moves that caused a beta cutoff at
/// this depth in a sibling node.
#[derive(Debug, Clone, Copy, Default)]
pub struct KillerMoves {
    pub first: Move,
    pub second: Move,
}

impl KillerMoves {
    pub fn add(&mut self, mv: Move) {
        if mv != self.first {
            self.second = self.first;
            self.first = mv;
        }
    }

    #[inline]
    pub fn matches(&self, mv: Move) -> bool {
        !mv.is_null() && (mv == self.first || mv == self.second)
    }

    pub fn clear(&mut self) {
        self.first = Move::NULL;
        self.second = Move::NULL;
    }
}

/// Butterfly history: cutoff counts per colour/from/to, aged between
/// searches by the searcher.
pub type HistoryTable = [[[i32; 64]; 64]; 2];

/// Sort `moves` best-first in place.
pub fn order_moves(
    board: &Board,
    moves: &mut [Move],
    hash_move: Move,
    killers: KillerMoves,
    history: &HistoryTable,
) {
    let mut scored: Vec<(i32, Move)> = moves
        .iter()
        .map(|&mv| (score_move(board, mv, hash_move, killers, history), mv))
        .collect();
    scored.sort_by_key(|(score, _)| -*score);
    for (slot, (_, mv)) in moves.iter_mut().zip(scored) {
        *slot = mv;
    }
}

/// Capture-only ordering for quiescence: MVV-LVA, no heuristic tables.
pub fn order_captures(board: &Board, moves: &mut [Move]) {
    order_moves(board, moves, Move::NULL, KillerMoves::default(), &EMPTY_HISTORY);
}

static EMPTY_HISTORY: HistoryTable = [[[0; 64]; 64]; 2];

fn score_move(
    board: &Board,
    mv: Move,
    hash_move: Move,
    killers: KillerMoves,
    history: &HistoryTable,
) -> i32 {
    if mv == hash_move && !mv.is_null() {
        return HASH_MOVE_SCORE;
    }

    let us = board.color_to_move();
    let moved = board.piece_at(mv.from());
    let moved_kind = moved.kind().unwrap_or(PieceKind::Pawn);

    let victim_kind = if mv.flag() == FLAG_EN_PASSANT {
        Some(PieceKind::Pawn)
    } else {
        board.piece_at(mv.to()).kind()
    };

    if let Some(victim) = victim_kind {
        // Most valuable victim first, cheapest attacker as tie-break; clearly
        // losing trades go behind the quiet moves.
        let exchange = piece_value(victim) - piece_value(moved_kind);
        let mvv_lva = piece_value(victim) * CAPTURE_VICTIM_MULTIPLIER - piece_value(moved_kind);
        return if exchange >= 0 {
            WINNING_CAPTURE_BASE + mvv_lva
        } else {
            LOSING_CAPTURE_BASE + mvv_lva
        };
    }

    if let Some(promoted) = mv.promotion_kind() {
        return PROMOTION_BASE + piece_value(promoted);
    }

    if killers.matches(mv) {
        return KILLER_SCORE;
    }

    history[us.index()][mv.from() as usize][mv.to() as usize]
        + piece_square_delta(mv, moved_kind, us)
}

/// Net piece-square-table gain of a quiet move, a cheap tie-break among
/// moves with no history yet.
fn piece_square_delta(mv: Move, kind: PieceKind, color: Color) -> i32 {
    let table = match kind {
        PieceKind::Pawn => &piece_square::PAWN,
        PieceKind::Knight => &piece_square::KNIGHT,
        PieceKind::Bishop => &piece_square::BISHOP,
        PieceKind::Rook => &piece_square::ROOK,
        PieceKind::Queen => &piece_square::QUEEN,
        PieceKind::King => &piece_square::KING_MID,
    };
    piece_square::read(table, mv.to(), color.is_white())
        - piece_square::read(table, mv.from(), color.is_white())
}
