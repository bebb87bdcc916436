//! UCI protocol front-end and command loop.
//!
//! Parses UCI commands, maintains the current game position, routes `go`
//! requests to the background search controller, and emits protocol output
//! through a channel so `bestmove` can arrive asynchronously while the loop
//! keeps reading stdin. Malformed input is reported as an `info string` and
//! never kills the engine.

use std::io::{self, BufRead};
use std::sync::mpsc::{channel, Sender};
use std::thread;

use crate::board::board::Board;
use crate::engine::controller::{EngineController, GoParams};
use crate::movegen::generator::PromotionMode;
use crate::utils::long_algebraic::{move_to_uci, uci_to_move};
use crate::utils::render_board::render_board;

const ENGINE_NAME: &str = "Quince Chess";
const ENGINE_AUTHOR: &str = "the Quince Chess developers";
const DEFAULT_HASH_MB: usize = 64;

/// Run the blocking stdin/stdout protocol loop until `quit`.
pub fn run_stdio_loop() -> io::Result<()> {
    let (response_tx, response_rx) = channel::<String>();

    // Printer thread: everything the engine says flows through here, so
    // asynchronous bestmove lines never interleave mid-line with command
    // replies.
    let printer = thread::spawn(move || {
        while let Ok(line) = response_rx.recv() {
            println!("{line}");
        }
    });

    let mut state = UciState::new(response_tx);
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if state.handle_command(&line) {
            break;
        }
    }

    drop(state); // closes the response channel
    let _ = printer.join();
    Ok(())
}

pub struct UciState {
    board: Board,
    controller: EngineController,
    responses: Sender<String>,
    hash_mb: usize,
}

impl UciState {
    pub fn new(responses: Sender<String>) -> Self {
        Self {
            board: Board::start_position(),
            controller: EngineController::new(DEFAULT_HASH_MB),
            responses,
            hash_mb: DEFAULT_HASH_MB,
        }
    }

    fn send(&self, line: String) {
        let _ = self.responses.send(line);
    }

    /// Handle one command line; returns `true` on `quit`.
    pub fn handle_command(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return false;
        }
        let command = trimmed.split_whitespace().next().unwrap_or_default();

        match command {
            "uci" => {
                self.send(format!("id name {ENGINE_NAME}"));
                self.send(format!("id author {ENGINE_AUTHOR}"));
                self.send("option name Hash type spin default 64 min 1 max 1024".to_owned());
                self.send("option name OwnBook type check default true".to_owned());
                self.send(
                    "option name Promotions type combo default all var all var queen_knight var queen_only"
                        .to_owned(),
                );
                self.send("uciok".to_owned());
            }
            "isready" => self.send("readyok".to_owned()),
            "setoption" => {
                if let Err(error) = self.handle_setoption(trimmed) {
                    self.send(format!("info string setoption error: {error}"));
                }
            }
            "ucinewgame" => {
                self.controller.new_game();
                self.board = Board::start_position();
            }
            "position" => {
                if let Err(error) = self.handle_position(trimmed) {
                    self.send(format!("info string position error: {error}"));
                }
            }
            "go" => self.handle_go(trimmed),
            "stop" => self.controller.stop(),
            "d" => {
                self.send(render_board(&self.board));
                self.send(format!("Fen: {}", self.board.current_fen()));
                self.send(format!("Key: {:016X}", self.board.zobrist_key()));
            }
            "quit" => {
                self.controller.abort_and_wait();
                return true;
            }
            other => {
                self.send(format!("info string unknown command '{other}'"));
            }
        }

        false
    }

    fn handle_setoption(&mut self, line: &str) -> Result<(), String> {
        let mut name_tokens = Vec::<&str>::new();
        let mut value_tokens = Vec::<&str>::new();
        let mut section = "";
        for token in line.split_whitespace().skip(1) {
            match token {
                "name" => section = "name",
                "value" => section = "value",
                _ if section == "name" => name_tokens.push(token),
                _ if section == "value" => value_tokens.push(token),
                _ => {}
            }
        }
        let name = name_tokens.join(" ");
        let value = value_tokens.join(" ");

        if name.eq_ignore_ascii_case("Hash") {
            let megabytes = value
                .parse::<usize>()
                .map_err(|_| format!("invalid Hash value '{value}'"))?;
            self.hash_mb = megabytes.clamp(1, 1024);
            self.controller.resize_hash(self.hash_mb);
        } else if name.eq_ignore_ascii_case("OwnBook") {
            self.controller.own_book =
                matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes");
        } else if name.eq_ignore_ascii_case("Promotions") {
            let mode = match value.to_ascii_lowercase().as_str() {
                "all" => PromotionMode::All,
                "queen_knight" => PromotionMode::QueenAndKnight,
                "queen_only" => PromotionMode::QueenOnly,
                other => return Err(format!("unknown Promotions value '{other}'")),
            };
            self.controller.set_promotion_mode(mode);
        } else {
            return Err(format!("unknown option '{name}'"));
        }
        Ok(())
    }

    fn handle_position(&mut self, line: &str) -> Result<(), String> {
        // A new position invalidates any search still running on the old one.
        self.controller.abort_and_wait();

        let mut tokens = line.split_whitespace().peekable();
        let _ = tokens.next(); // "position"

        let mut board = match tokens.next() {
            Some("startpos") => Board::start_position(),
            Some("fen") => {
                let mut fen_parts = Vec::<&str>::new();
                while let Some(&token) = tokens.peek() {
                    if token == "moves" {
                        break;
                    }
                    fen_parts.push(tokens.next().unwrap_or_default());
                }
                if fen_parts.is_empty() {
                    return Err("missing FEN after 'position fen'".to_owned());
                }
                Board::from_fen(&fen_parts.join(" "))?
            }
            Some(other) => return Err(format!("unsupported position token '{other}'")),
            None => return Err("incomplete position command".to_owned()),
        };

        if tokens.peek() == Some(&"moves") {
            let _ = tokens.next();
            for move_text in tokens {
                let mv = uci_to_move(&board, move_text)?;
                board.make_move(mv, false);
            }
        }

        self.board = board;
        Ok(())
    }

    fn handle_go(&mut self, line: &str) {
        let params = parse_go_params(line);
        let responses = self.responses.clone();
        self.controller.begin_search(
            self.board.clone(),
            params,
            Box::new(move |report| {
                for info in &report.info_lines {
                    let _ = responses.send(info.clone());
                }
                let _ = responses.send(format!("bestmove {}", move_to_uci(report.best_move)));
            }),
        );
    }

    /// Block until an in-flight `go` has delivered its bestmove (tests and
    /// clean shutdown).
    pub fn wait_for_search_end(&mut self) {
        self.controller.wait_for_search_end();
    }
}

fn parse_go_params(line: &str) -> GoParams {
    let mut params = GoParams::default();
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut i = 0usize;
    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                params.depth = tokens.get(i).and_then(|x| x.parse::<u8>().ok());
            }
            "movetime" => {
                i += 1;
                params.movetime_ms = tokens.get(i).and_then(|x| x.parse::<u64>().ok());
            }
            "wtime" => {
                i += 1;
                params.wtime_ms = tokens.get(i).and_then(|x| x.parse::<u64>().ok());
            }
            "btime" => {
                i += 1;
                params.btime_ms = tokens.get(i).and_then(|x| x.parse::<u64>().ok());
            }
            "winc" => {
                i += 1;
                params.winc_ms = tokens.get(i).and_then(|x| x.parse::<u64>().ok());
            }
            "binc" => {
                i += 1;
                params.binc_ms = tokens.get(i).and_then(|x| x.parse::<u64>().ok());
            }
            "movestogo" => {
                i += 1;
                params.movestogo = tokens.get(i).and_then(|x| x.parse::<u16>().ok());
            }
            "infinite" => params.infinite = true,
            _ => {}
        }
        i += 1;
    }
    params
}
