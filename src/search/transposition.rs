//! Fixed-size transposition table keyed by Zobrist hash.
//!
//! The table is a cache, never a source of truth: entries are validated by
//! full-key comparison and depth/bound gating on every probe, so index
//! collisions and overwrites can only cost time, not correctness. Stores
//! overwrite their slot unconditionally.

use crate::movegen::packed_move::Move;
use crate::search::searcher::is_mate_score;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Full-window result; usable at any window.
    Exact,
    /// Fail-high: the real value is at least the stored one.
    Lower,
    /// Fail-low: the real value is at most the stored one.
    Upper,
}

#[derive(Debug, Clone, Copy)]
pub struct TTEntry {
    pub key: u64,
    pub value: i32,
    pub best_move: Move,
    pub depth: u8,
    pub bound: Bound,
}

#[derive(Debug, Clone)]
pub struct TranspositionTable {
    entries: Vec<Option<TTEntry>>,
}

impl TranspositionTable {
    pub fn new_with_mb(size_mb: usize) -> Self {
        let bytes = size_mb.max(1) * 1024 * 1024;
        let entry_size = std::mem::size_of::<Option<TTEntry>>().max(1);
        let count = (bytes / entry_size).max(1);
        Self {
            entries: vec![None; count],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.fill(None);
    }

    #[inline]
    fn index(&self, key: u64) -> usize {
        (key as usize) % self.entries.len()
    }

    /// Best move remembered for a position, regardless of stored depth.
    /// Used for move ordering even when the score itself is unusable.
    pub fn stored_move(&self, key: u64) -> Option<Move> {
        let entry = self.entries[self.index(key)]?;
        if entry.key == key && !entry.best_move.is_null() {
            Some(entry.best_move)
        } else {
            None
        }
    }

    /// Cached score usable at the given window, or `None` on a miss.
    ///
    /// A hit requires a full key match and a stored depth at least as deep as
    /// requested; the bound kind then gates usability exactly as in
    /// alpha-beta: exact scores always, lower bounds only if they still fail
    /// high, upper bounds only if they still fail low.
    pub fn lookup(
        &self,
        key: u64,
        depth: u8,
        ply_from_root: u8,
        alpha: i32,
        beta: i32,
    ) -> Option<i32> {
        let entry = self.entries[self.index(key)]?;
        if entry.key != key || entry.depth < depth {
            return None;
        }

        let value = retrieve_mate_score(entry.value, ply_from_root);
        match entry.bound {
            Bound::Exact => Some(value),
            Bound::Lower if value >= beta => Some(value),
            Bound::Upper if value <= alpha => Some(value),
            _ => None,
        }
    }

    /// Record a search result, unconditionally overwriting the slot.
    pub fn store(
        &mut self,
        key: u64,
        depth: u8,
        ply_from_root: u8,
        value: i32,
        bound: Bound,
        best_move: Move,
    ) {
        let index = self.index(key);
        self.entries[index] = Some(TTEntry {
            key,
            value: store_mate_score(value, ply_from_root),
            best_move,
            depth,
            bound,
        });
    }
}

/// Convert a root-relative mate score into a position-relative one, so a
/// cached "mate in N from here" stays correct when reused at another depth.
#[inline]
fn store_mate_score(value: i32, ply_from_root: u8) -> i32 {
    if is_mate_score(value) {
        let sign = value.signum();
        (value * sign + i32::from(ply_from_root)) * sign
    } else {
        value
    }
}

#[inline]
fn retrieve_mate_score(value: i32, ply_from_root: u8) -> i32 {
    if is_mate_score(value) {
        let sign = value.signum();
        (value * sign - i32::from(ply_from_root)) * sign
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::{Bound, TranspositionTable};
    use crate::movegen::packed_move::Move;
    use crate::search::searcher::MATE_SCORE;

    #[test]
    fn store_and_lookup_round_trip() {
        let mut tt = TranspositionTable::new_with_mb(1);
        let mv = Move::quiet(12, 28);
        tt.store(1234, 5, 0, 42, Bound::Exact, mv);

        assert_eq!(tt.lookup(1234, 5, 0, -100, 100), Some(42));
        assert_eq!(tt.lookup(1234, 3, 0, -100, 100), Some(42));
        assert_eq!(tt.stored_move(1234), Some(mv));
    }

    #[test]
    fn shallow_entries_do_not_satisfy_deeper_probes() {
        let mut tt = TranspositionTable::new_with_mb(1);
        tt.store(99, 2, 0, 10, Bound::Exact, Move::NULL);
        assert_eq!(tt.lookup(99, 3, 0, -100, 100), None);
    }

    #[test]
    fn key_mismatch_is_a_miss_even_on_index_collision() {
        let mut tt = TranspositionTable::new_with_mb(1);
        let len = tt.len() as u64;
        tt.store(7, 4, 0, 55, Bound::Exact, Move::NULL);
        // Same slot, different key.
        assert_eq!(tt.lookup(7 + len, 4, 0, -100, 100), None);
        assert_eq!(tt.stored_move(7 + len), None);
    }

    #[test]
    fn bound_kinds_gate_usability_against_the_window() {
        let mut tt = TranspositionTable::new_with_mb(1);

        tt.store(1, 4, 0, 80, Bound::Lower, Move::NULL);
        assert_eq!(tt.lookup(1, 4, 0, -100, 50), Some(80), "still a beta cutoff");
        assert_eq!(tt.lookup(1, 4, 0, -100, 100), None, "window moved past it");

        tt.store(2, 4, 0, -30, Bound::Upper, Move::NULL);
        assert_eq!(tt.lookup(2, 4, 0, 0, 100), Some(-30), "still fails low");
        assert_eq!(tt.lookup(2, 4, 0, -50, 100), None);
    }

    #[test]
    fn stores_overwrite_unconditionally() {
        let mut tt = TranspositionTable::new_with_mb(1);
        tt.store(5, 9, 0, 1, Bound::Exact, Move::NULL);
        tt.store(5, 2, 0, 7, Bound::Exact, Move::NULL);
        assert_eq!(tt.lookup(5, 2, 0, -100, 100), Some(7));
        assert_eq!(tt.lookup(5, 9, 0, -100, 100), None, "deep entry is gone");
    }

    #[test]
    fn mate_scores_translate_across_tree_depths() {
        let mut tt = TranspositionTable::new_with_mb(1);
        // Mate in 3 plies discovered at ply 4: root-relative score is
        // MATE - 7.
        let at_ply = 4u8;
        let root_relative = MATE_SCORE - 7;
        tt.store(77, 6, at_ply, root_relative, Bound::Exact, Move::NULL);

        // Reused at ply 2 the same position must read as mate in 3 from
        // there, i.e. MATE - 5 relative to the new root distance.
        assert_eq!(tt.lookup(77, 6, 2, -MATE_SCORE, MATE_SCORE), Some(MATE_SCORE - 5));

        // Mated-side scores translate symmetrically.
        tt.store(78, 6, at_ply, -(MATE_SCORE - 7), Bound::Exact, Move::NULL);
        assert_eq!(
            tt.lookup(78, 6, 2, -MATE_SCORE, MATE_SCORE),
            Some(-(MATE_SCORE - 5))
        );
    }
}
