//! Quince Chess binary: a UCI engine speaking on stdin/stdout.

use std::io;

use quince_chess::uci::uci_loop::run_stdio_loop;

fn main() -> io::Result<()> {
    run_stdio_loop()
}
