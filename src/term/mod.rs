//! Terminal host for the emulator.
//!
//! Plays the part of the console widget and the frame scheduler:
//! - Keystrokes are queued into the console and wake a waiting program
//! - Output is flushed once per frame with newlines framed for raw mode
//! - One slice runs per frame while the machine wants to run

mod app;

pub use app::{key_to_byte, run_terminal, RunSummary, TerminalApp};
