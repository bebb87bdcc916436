//! Statistical opening book consulted before search.
//!
//! Records map a normalized position key (FEN with the move counters
//! stripped) to the moves seen there and how often each was played.
//! Selection is weighted-random over power-smoothed play counts so rare but
//! attested moves are not starved out entirely.

use std::collections::HashMap;

use rand::Rng;

use crate::board::board::Board;
use crate::movegen::packed_move::Move;
use crate::utils::long_algebraic::uci_to_move;

#[derive(Debug, Clone)]
pub struct BookMove {
    pub uci: String,
    pub play_count: u32,
}

#[derive(Debug, Clone)]
pub struct OpeningBook {
    entries: HashMap<String, Vec<BookMove>>,
    /// Play-count smoothing exponent in `[0, 1]`: 1 keeps raw frequencies,
    /// 0 flattens every attested move to equal weight.
    pub weight_pow: f64,
}

impl Default for OpeningBook {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            weight_pow: 0.5,
        }
    }
}

impl OpeningBook {
    /// The embedded default book: a small set of mainline openings.
    pub fn load_default() -> Self {
        Self::from_text(include_str!("data/openings.book"))
            .expect("embedded opening book should always parse")
    }

    /// Parse the newline-separated book format: a `pos <key>` line starts a
    /// record, each following line holds one `<uci-move> <count>` pair
    /// (`<uci-move>(<count>)` is accepted too).
    pub fn from_text(text: &str) -> Result<Self, String> {
        let mut book = Self::default();
        let mut current_key: Option<String> = None;

        for (line_no, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(key) = line.strip_prefix("pos ") {
                current_key = Some(key.trim().to_owned());
                continue;
            }

            let key = current_key
                .as_ref()
                .ok_or_else(|| format!("line {}: move before any 'pos' record", line_no + 1))?;

            let (uci, count) = parse_move_pair(line)
                .ok_or_else(|| format!("line {}: malformed move record '{line}'", line_no + 1))?;

            book.entries
                .entry(key.clone())
                .or_default()
                .push(BookMove {
                    uci,
                    play_count: count,
                });
        }

        Ok(book)
    }

    /// Strip the halfmove/fullmove counters off the position's FEN.
    pub fn position_key(board: &Board) -> String {
        let fen = board.current_fen();
        fen.split_whitespace()
            .take(4)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn moves_for(&self, board: &Board) -> Option<&[BookMove]> {
        self.entries
            .get(&Self::position_key(board))
            .map(|moves| moves.as_slice())
    }

    /// Pick a book move for the position, weighted by smoothed play counts.
    /// Returns a miss for unknown positions or unparseable book moves.
    pub fn try_get_move<R: Rng + ?Sized>(&self, board: &Board, rng: &mut R) -> Option<Move> {
        let candidates = self.moves_for(board)?;
        if candidates.is_empty() {
            return None;
        }

        let weights: Vec<u64> = candidates
            .iter()
            .map(|m| smoothed_weight(m.play_count, self.weight_pow))
            .collect();
        let total: u64 = weights.iter().sum();
        if total == 0 {
            return None;
        }

        let mut pick = rng.random_range(0..total);
        for (candidate, weight) in candidates.iter().zip(weights) {
            if pick < weight {
                return uci_to_move(board, &candidate.uci).ok();
            }
            pick -= weight;
        }
        None
    }
}

/// `ceil(count^p)`; any attested move keeps at least weight 1.
fn smoothed_weight(play_count: u32, pow: f64) -> u64 {
    if play_count == 0 {
        return 0;
    }
    f64::from(play_count).powf(pow.clamp(0.0, 1.0)).ceil() as u64
}

fn parse_move_pair(line: &str) -> Option<(String, u32)> {
    // "e2e4 23" or "e2e4(23)".
    if let Some((uci, count)) = line.split_once('(') {
        let count = count.strip_suffix(')')?.trim().parse::<u32>().ok()?;
        return Some((uci.trim().to_owned(), count));
    }
    let mut parts = line.split_whitespace();
    let uci = parts.next()?.to_owned();
    let count = parts.next()?.parse::<u32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((uci, count))
}
