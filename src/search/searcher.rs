//! Iterative-deepening negamax search.
//!
//! Runs full alpha-beta passes at increasing depth; after each completed
//! depth the result becomes authoritative, so a cancelled deeper pass still
//! answers with the last finished one. Cancellation is cooperative: the stop
//! and abort flags are polled at the top of every recursive call, and once
//! set the recursion unwinds returning neutral values.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::prelude::IndexedRandom;

use crate::board::bitboard::rank_of;
use crate::board::board::Board;
use crate::board::piece::PieceKind;
use crate::eval::evaluation::{BoardScorer, StandardScorer};
use crate::movegen::generator::MoveGenerator;
use crate::movegen::packed_move::{Move, FLAG_EN_PASSANT};
use crate::search::move_ordering::{
    order_captures, order_moves, HistoryTable, KillerMoves,
};
use crate::search::transposition::{Bound, TranspositionTable};
use crate::utils::long_algebraic::move_to_uci;

pub const MATE_SCORE: i32 = 30_000;
pub const DRAW_SCORE: i32 = 0;
const MATE_THRESHOLD: i32 = MATE_SCORE - 1_000;
const MAX_PLY: usize = 128;
const MAX_EXTENSIONS: u8 = 16;

#[inline]
pub fn is_mate_score(value: i32) -> bool {
    value.abs() >= MATE_THRESHOLD
}

/// Full moves until mate for a mate score (negative when being mated).
#[inline]
pub fn mate_in_moves(value: i32) -> i32 {
    let plies = MATE_SCORE - value.abs();
    ((plies + 1) / 2) * value.signum()
}

#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub max_depth: u8,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchDiagnostics {
    pub nodes: u64,
    pub quiescence_nodes: u64,
    pub beta_cutoffs: u64,
    pub tt_hits: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    pub best_move: Move,
    pub value: i32,
    pub depth: u8,
    pub elapsed_ms: u64,
    pub diagnostics: SearchDiagnostics,
    /// Set when the search never completed depth 1 and a uniformly random
    /// legal move was substituted.
    pub random_fallback: bool,
    pub info_lines: Vec<String>,
}

impl SearchReport {
    /// UCI score fragment: `cp <n>` or `mate <n>`.
    pub fn uci_score(&self) -> String {
        if is_mate_score(self.value) {
            format!("mate {}", mate_in_moves(self.value))
        } else {
            format!("cp {}", self.value)
        }
    }
}

pub struct Searcher {
    generator: MoveGenerator,
    transposition_table: TranspositionTable,
    scorer: Box<dyn BoardScorer>,
    pub use_transposition_table: bool,

    killers: [KillerMoves; MAX_PLY],
    history: HistoryTable,

    stop: Arc<AtomicBool>,
    abort: Arc<AtomicBool>,

    diagnostics: SearchDiagnostics,
    best_move_this_iteration: Move,
}

impl Searcher {
    pub fn new(hash_mb: usize) -> Self {
        Self::with_scorer(hash_mb, Box::new(StandardScorer))
    }

    pub fn with_scorer(hash_mb: usize, scorer: Box<dyn BoardScorer>) -> Self {
        Self {
            generator: MoveGenerator::new(),
            transposition_table: TranspositionTable::new_with_mb(hash_mb),
            scorer,
            use_transposition_table: true,
            killers: [KillerMoves::default(); MAX_PLY],
            history: [[[0; 64]; 64]; 2],
            stop: Arc::new(AtomicBool::new(false)),
            abort: Arc::new(AtomicBool::new(false)),
            diagnostics: SearchDiagnostics::default(),
            best_move_this_iteration: Move::NULL,
        }
    }

    /// Flag an external timer sets when the think budget runs out.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Independent hard-abort flag for caller-initiated aborts.
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn generator_mut(&mut self) -> &mut MoveGenerator {
        &mut self.generator
    }

    pub fn resize_table(&mut self, hash_mb: usize) {
        self.transposition_table = TranspositionTable::new_with_mb(hash_mb);
    }

    /// Forget everything learned from previous games.
    pub fn new_game(&mut self) {
        self.transposition_table.clear();
        self.reset_heuristics();
    }

    fn reset_heuristics(&mut self) {
        for killer in &mut self.killers {
            killer.clear();
        }
        self.history = [[[0; 64]; 64]; 2];
    }

    #[inline]
    fn cancelled(&self) -> bool {
        self.stop.load(Ordering::Relaxed) || self.abort.load(Ordering::Relaxed)
    }

    /// Run iterative deepening on `board` until the depth limit, a proven
    /// mate, or cancellation.
    ///
    /// The caller resets the stop/abort flags before starting; an external
    /// timer may set the stop flag at any point, including before the first
    /// node.
    pub fn search(&mut self, board: &mut Board, limits: SearchLimits) -> SearchReport {
        let started_at = Instant::now();
        self.diagnostics = SearchDiagnostics::default();
        self.reset_heuristics();

        let mut report = SearchReport::default();

        for depth in 1..=limits.max_depth.max(1) {
            self.best_move_this_iteration = Move::NULL;
            let value = self.negamax(board, depth, 0, -MATE_SCORE, MATE_SCORE, 0);

            if self.cancelled() {
                break;
            }

            report.best_move = self.best_move_this_iteration;
            report.value = value;
            report.depth = depth;

            let elapsed_ms = started_at.elapsed().as_millis() as u64;
            let nps = if elapsed_ms == 0 {
                0
            } else {
                self.diagnostics.nodes.saturating_mul(1000) / elapsed_ms
            };
            report.info_lines.push(format!(
                "info depth {} score {} nodes {} nps {} time {} pv {}",
                depth,
                report.uci_score(),
                self.diagnostics.nodes,
                nps,
                elapsed_ms,
                move_to_uci(report.best_move),
            ));

            // A forced mate within the searched horizon cannot improve.
            if is_mate_score(value) && MATE_SCORE - value.abs() <= i32::from(depth) {
                break;
            }
        }

        if report.best_move.is_null() {
            // Cancelled before any depth finished: any legal move beats no
            // move at all.
            let legal = self.generator.generate_moves(board, true);
            if let Some(&mv) = legal.as_slice().choose(&mut rand::rng()) {
                report.best_move = mv;
                report.random_fallback = true;
                report
                    .info_lines
                    .push("info string search cancelled early, playing random legal move".to_owned());
            }
        }

        report.elapsed_ms = started_at.elapsed().as_millis() as u64;
        report.diagnostics = self.diagnostics;
        report
    }

    fn negamax(
        &mut self,
        board: &mut Board,
        depth: u8,
        ply: u8,
        mut alpha: i32,
        mut beta: i32,
        extensions: u8,
    ) -> i32 {
        if self.cancelled() {
            return 0;
        }
        self.diagnostics.nodes += 1;

        let key = board.zobrist_key();

        if ply > 0 {
            if board.fifty_move_draw()
                || board.position_repeated(key)
                || board.insufficient_material()
            {
                return DRAW_SCORE;
            }

            // Mate-distance pruning: a mate already found closer to the root
            // bounds what this subtree can possibly return.
            alpha = alpha.max(-MATE_SCORE + i32::from(ply));
            beta = beta.min(MATE_SCORE - i32::from(ply));
            if alpha >= beta {
                return alpha;
            }

            if self.use_transposition_table {
                if let Some(value) = self
                    .transposition_table
                    .lookup(key, depth, ply, alpha, beta)
                {
                    self.diagnostics.tt_hits += 1;
                    return value;
                }
            }
        }

        if depth == 0 {
            return self.quiescence(board, alpha, beta);
        }

        let mut moves = self.generator.generate_moves(board, true);
        let in_check = self.generator.in_check();

        if moves.is_empty() {
            return if in_check {
                -(MATE_SCORE - i32::from(ply))
            } else {
                DRAW_SCORE
            };
        }

        let hash_move = if self.use_transposition_table {
            self.transposition_table.stored_move(key).unwrap_or(Move::NULL)
        } else {
            Move::NULL
        };
        let killers = self.killers[usize::from(ply).min(MAX_PLY - 1)];
        order_moves(board, &mut moves, hash_move, killers, &self.history);

        let mut bound = Bound::Upper;
        let mut best_move = Move::NULL;

        for (move_index, mv) in moves.into_iter().enumerate() {
            let is_capture =
                board.piece_at(mv.to()).is_some() || mv.flag() == FLAG_EN_PASSANT;
            let is_quiet = !is_capture && !mv.is_promotion();

            board.make_move(mv, true);

            let extension = self.move_extension(board, mv, extensions);

            // Late-move reductions: low-ranked quiet moves get a reduced
            // zero-window probe first and a full re-search only on promise.
            let mut value;
            let reducible =
                extension == 0 && depth >= 3 && move_index >= 3 && is_quiet && !in_check;
            let mut needs_full_search = true;
            if reducible {
                value = -self.negamax(board, depth - 2, ply + 1, -alpha - 1, -alpha, extensions);
                needs_full_search = value > alpha;
            } else {
                value = 0;
            }
            if needs_full_search {
                value = -self.negamax(
                    board,
                    depth - 1 + extension,
                    ply + 1,
                    -beta,
                    -alpha,
                    extensions + extension,
                );
            }

            board.unmake_move(mv, true);

            if self.cancelled() {
                return 0;
            }

            if value >= beta {
                self.diagnostics.beta_cutoffs += 1;
                if self.use_transposition_table {
                    self.transposition_table
                        .store(key, depth, ply, beta, Bound::Lower, mv);
                }
                if is_quiet {
                    let ply_index = usize::from(ply).min(MAX_PLY - 1);
                    self.killers[ply_index].add(mv);
                    self.history[board.color_to_move().index()][mv.from() as usize]
                        [mv.to() as usize] += i32::from(depth) * i32::from(depth);
                }
                return beta;
            }

            if value > alpha {
                alpha = value;
                bound = Bound::Exact;
                best_move = mv;
                if ply == 0 {
                    self.best_move_this_iteration = mv;
                }
            }
        }

        if self.use_transposition_table {
            self.transposition_table
                .store(key, depth, ply, alpha, bound, best_move);
        }

        alpha
    }

    /// Search one ply deeper after checking moves and pushes to the
    /// pre-promotion rank, up to a fixed budget per line.
    fn move_extension(&mut self, board: &mut Board, mv: Move, extensions: u8) -> u8 {
        if extensions >= MAX_EXTENSIONS {
            return 0;
        }
        if board.is_in_check() {
            return 1;
        }
        let target_rank = rank_of(mv.to());
        let moved = board.piece_at(mv.to());
        if moved.is_kind(PieceKind::Pawn) && (target_rank == 1 || target_rank == 6) {
            return 1;
        }
        0
    }

    /// Captures-only extension of the search at depth zero, so the static
    /// evaluation is never taken in the middle of a capture sequence.
    fn quiescence(&mut self, board: &mut Board, mut alpha: i32, beta: i32) -> i32 {
        if self.cancelled() {
            return 0;
        }
        self.diagnostics.nodes += 1;
        self.diagnostics.quiescence_nodes += 1;

        let stand_pat = self.scorer.score(board);
        if stand_pat >= beta {
            return beta;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let mut moves = self.generator.generate_moves(board, false);
        order_captures(board, &mut moves);

        for mv in moves {
            board.make_move(mv, true);
            let value = -self.quiescence(board, -beta, -alpha);
            board.unmake_move(mv, true);

            if self.cancelled() {
                return 0;
            }
            if value >= beta {
                self.diagnostics.beta_cutoffs += 1;
                return beta;
            }
            if value > alpha {
                alpha = value;
            }
        }

        alpha
    }
}
