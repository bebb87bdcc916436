//! Think-time budgeting from UCI clock data.
//!
//! With an explicit `movetime` the budget is exact; otherwise a fraction of
//! the remaining clock plus most of the increment is apportioned, with a
//! reserve so the engine never flags on the clock itself.

use crate::board::board::Board;
use crate::engine::controller::GoParams;

/// Milliseconds to think for this move, or `None` for no time limit
/// (`go infinite` or pure depth-limited searches).
pub fn think_time_ms(board: &Board, params: &GoParams) -> Option<u64> {
    if params.infinite {
        return None;
    }
    if let Some(ms) = params.movetime_ms {
        return Some(ms.max(1));
    }

    let (remaining, increment) = if board.white_to_move {
        (params.wtime_ms, params.winc_ms)
    } else {
        (params.btime_ms, params.binc_ms)
    };
    let remaining = remaining?;

    let expected_moves_left = match params.movestogo {
        Some(n) => u64::from(n.max(1)),
        None => {
            let ply = u64::from(board.ply_count);
            if ply < 20 {
                40
            } else if ply < 60 {
                28
            } else {
                18
            }
        }
    };

    let reserve = (remaining / 25).max(50).min(remaining.saturating_sub(1));
    let usable = remaining.saturating_sub(reserve);
    let base = usable / expected_moves_left;
    let increment_bonus = increment.unwrap_or(0).saturating_mul(3) / 4;

    let min_budget = if remaining < 1_000 { 5 } else { 15 };
    let max_budget = (remaining / 4).max(1);
    Some(
        base.saturating_add(increment_bonus)
            .min(max_budget)
            .max(min_budget)
            .max(1),
    )
}
