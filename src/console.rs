//! An in-memory console.
//!
//! Keystrokes queue up in a FIFO until the program reads them; output
//! characters collect in a buffer the host drains once per frame.

use crate::cpu::mmio::{InputSource, OutputSink};
use std::collections::VecDeque;

/// Queue-backed keyboard and display.
#[derive(Debug, Clone, Default)]
pub struct BufferedConsole {
    input: VecDeque<u8>,
    output: Vec<u16>,
}

impl BufferedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a keystroke.
    pub fn push_key(&mut self, key: u8) {
        self.input.push_back(key);
    }

    /// Queue every byte of `text`.
    pub fn push_str(&mut self, text: &str) {
        self.input.extend(text.bytes());
    }

    /// Number of keystrokes not yet read by the program.
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Drop any queued keystrokes.
    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    /// Everything written to the display so far.
    pub fn output(&self) -> &[u16] {
        &self.output
    }

    /// Drain the display buffer.
    pub fn take_output(&mut self) -> Vec<u16> {
        std::mem::take(&mut self.output)
    }

    /// Drain the display buffer as text, one byte per character.
    pub fn take_output_string(&mut self) -> String {
        self.take_output()
            .into_iter()
            .map(|c| (c & 0xFF) as u8 as char)
            .collect()
    }
}

impl InputSource for BufferedConsole {
    fn has_char(&self) -> bool {
        !self.input.is_empty()
    }

    fn get_char(&mut self) -> u8 {
        self.input.pop_front().unwrap_or(0)
    }
}

impl OutputSink for BufferedConsole {
    fn put_char(&mut self, value: u16) {
        self.output.push(value);
    }
}

/// Convert display characters to terminal text, framing `\n` as `\r\n`.
pub fn to_terminal_text(chars: &[u16]) -> String {
    let mut out = String::with_capacity(chars.len());
    for &c in chars {
        match (c & 0xFF) as u8 {
            b'\n' => out.push_str("\r\n"),
            byte => out.push(byte as char),
        }
    }
    out
}
