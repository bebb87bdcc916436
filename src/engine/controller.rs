//! Background search control.
//!
//! Owns the searcher and its board copy, runs each search on a dedicated
//! worker thread, arms a wall-clock timer that trips the cooperative stop
//! flag, and delivers the result through a one-shot completion callback.
//! A separate hard-abort flag serves caller-initiated aborts (for example a
//! new position arriving mid-search); an aborted search delivers nothing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::board::board::Board;
use crate::book::opening_book::OpeningBook;
use crate::engine::time_management::think_time_ms;
use crate::movegen::generator::PromotionMode;
use crate::search::searcher::{SearchLimits, SearchReport, Searcher};

const DEFAULT_MAX_DEPTH: u8 = 64;
/// Stop consulting the book once the game leaves theory.
const MAX_BOOK_PLY: u32 = 16;

#[derive(Debug, Clone, Default)]
pub struct GoParams {
    pub depth: Option<u8>,
    pub movetime_ms: Option<u64>,
    pub wtime_ms: Option<u64>,
    pub btime_ms: Option<u64>,
    pub winc_ms: Option<u64>,
    pub binc_ms: Option<u64>,
    pub movestogo: Option<u16>,
    pub infinite: bool,
}

pub struct EngineController {
    searcher: Arc<Mutex<Searcher>>,
    book: OpeningBook,
    pub own_book: bool,

    stop: Arc<AtomicBool>,
    abort: Arc<AtomicBool>,
    /// Bumped per search so a stale timer cannot stop a later search.
    generation: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl EngineController {
    pub fn new(hash_mb: usize) -> Self {
        let searcher = Searcher::new(hash_mb);
        let stop = searcher.stop_flag();
        let abort = searcher.abort_flag();
        Self {
            searcher: Arc::new(Mutex::new(searcher)),
            book: OpeningBook::load_default(),
            own_book: true,
            stop,
            abort,
            generation: Arc::new(AtomicU64::new(0)),
            worker: None,
        }
    }

    /// Start a search on a private copy of `board`. `on_complete` fires
    /// exactly once when the search finishes, from the worker thread (or
    /// inline for an instant book reply); callers must marshal back to their
    /// own thread if they touch shared state.
    pub fn begin_search(
        &mut self,
        board: Board,
        params: GoParams,
        on_complete: Box<dyn FnOnce(SearchReport) + Send>,
    ) {
        // Never run concurrently with ourselves.
        self.stop_and_wait();
        self.stop.store(false, Ordering::Relaxed);
        self.abort.store(false, Ordering::Relaxed);
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        if self.own_book && board.ply_count < MAX_BOOK_PLY {
            if let Some(book_move) = self.book.try_get_move(&board, &mut rand::rng()) {
                let report = SearchReport {
                    best_move: book_move,
                    info_lines: vec!["info string book move".to_owned()],
                    ..SearchReport::default()
                };
                on_complete(report);
                return;
            }
        }

        if let Some(budget_ms) = think_time_ms(&board, &params) {
            let stop = Arc::clone(&self.stop);
            let abort = Arc::clone(&self.abort);
            let generation_counter = Arc::clone(&self.generation);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(budget_ms));
                // Only stop the search this timer was armed for.
                if generation_counter.load(Ordering::Relaxed) == generation
                    && !abort.load(Ordering::Relaxed)
                {
                    stop.store(true, Ordering::Relaxed);
                }
            });
        }

        let limits = SearchLimits {
            max_depth: params.depth.unwrap_or(DEFAULT_MAX_DEPTH),
        };
        let searcher = Arc::clone(&self.searcher);
        let abort = Arc::clone(&self.abort);
        self.worker = Some(thread::spawn(move || {
            let mut search_board = board;
            let report = searcher
                .lock()
                .expect("searcher mutex should not be poisoned")
                .search(&mut search_board, limits);
            // A hard abort means the caller no longer wants this answer.
            if !abort.load(Ordering::Relaxed) {
                on_complete(report);
            }
        }));
    }

    /// Cooperative cancel: the search wraps up and still reports its best
    /// answer so far.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Hard cancel: unwind as fast as possible and deliver nothing.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    /// Block until any in-flight search has finished.
    pub fn wait_for_search_end(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    fn stop_and_wait(&mut self) {
        if self.worker.is_some() {
            self.stop();
            self.wait_for_search_end();
        }
    }

    pub fn abort_and_wait(&mut self) {
        self.abort();
        self.wait_for_search_end();
    }

    /// Reset everything learned from the previous game.
    pub fn new_game(&mut self) {
        self.abort_and_wait();
        self.searcher
            .lock()
            .expect("searcher mutex should not be poisoned")
            .new_game();
    }

    pub fn resize_hash(&mut self, hash_mb: usize) {
        self.abort_and_wait();
        self.searcher
            .lock()
            .expect("searcher mutex should not be poisoned")
            .resize_table(hash_mb);
    }

    pub fn set_promotion_mode(&mut self, mode: PromotionMode) {
        self.abort_and_wait();
        self.searcher
            .lock()
            .expect("searcher mutex should not be poisoned")
            .generator_mut()
            .promotion_mode = mode;
    }
}

impl Drop for EngineController {
    fn drop(&mut self) {
        self.abort_and_wait();
    }
}
