//! PGN export of the played game.
//!
//! Serializes the board's played-move history to PGN with SAN movetext.
//! Import is out of scope; the engine only ever exports what it played.

use std::collections::BTreeMap;

use crate::board::board::{Board, STARTING_POSITION_FEN};
use crate::movegen::packed_move::Move;
use crate::utils::san::move_to_san;

/// Write a PGN document for a game that started from `starting_fen` and
/// played `moves`. `result` is a PGN result string (`1-0`, `0-1`, `1/2-1/2`,
/// or `*`).
pub fn write_pgn(starting_fen: &str, moves: &[Move], result: &str) -> Result<String, String> {
    let mut headers = BTreeMap::<String, String>::new();
    headers.insert("Event".to_owned(), "Quince Chess Game".to_owned());
    headers.insert("Site".to_owned(), "Local".to_owned());
    headers.insert(
        "Date".to_owned(),
        chrono::Local::now().format("%Y.%m.%d").to_string(),
    );
    headers.insert("Round".to_owned(), "-".to_owned());
    headers.insert("White".to_owned(), "White".to_owned());
    headers.insert("Black".to_owned(), "Black".to_owned());
    headers.insert("Result".to_owned(), normalize_result(result).to_owned());

    if starting_fen != STARTING_POSITION_FEN {
        headers.insert("SetUp".to_owned(), "1".to_owned());
        headers.insert("FEN".to_owned(), starting_fen.to_owned());
    }

    let mut out = String::new();
    for (key, value) in &headers {
        out.push_str(&format!("[{key} \"{value}\"]\n"));
    }
    out.push('\n');

    let mut board = Board::from_fen(starting_fen)?;
    let mut movetext = Vec::<String>::with_capacity(moves.len() + 1);
    for &mv in moves {
        let san = move_to_san(&mut board, mv);
        if board.white_to_move {
            movetext.push(format!("{}. {}", board.ply_count / 2 + 1, san));
        } else {
            movetext.push(san);
        }
        board.make_move(mv, false);
    }
    movetext.push(normalize_result(result).to_owned());

    out.push_str(&movetext.join(" "));
    out.push('\n');
    Ok(out)
}

/// Export the game currently recorded on `board`.
pub fn board_to_pgn(board: &Board, starting_fen: &str, result: &str) -> Result<String, String> {
    write_pgn(starting_fen, &board.played_moves, result)
}

fn normalize_result(result: &str) -> &str {
    match result {
        "1-0" | "0-1" | "1/2-1/2" => result,
        _ => "*",
    }
}
