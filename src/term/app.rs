//! Terminal host state and event loop.

use crate::console::{to_terminal_text, BufferedConsole};
use crate::cpu::{CpuError, Instruction, Registers};
use crate::vm::{FrameQueue, RunState, SliceOutcome, Vm};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::io::Write;
use std::time::Duration;

/// Time between frames while the machine is idle.
const FRAME: Duration = Duration::from_millis(16);

/// How a terminal session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub state: RunState,
    pub cycles: u64,
    pub halt_reason: Option<CpuError>,
    /// Final register file.
    pub registers: Registers,
    pub last_instruction: Option<Instruction>,
    /// Memory around the final PC.
    pub memory: Vec<(u16, u16)>,
    /// The user pressed Ctrl-C.
    pub interrupted: bool,
}

/// Terminal host application state.
pub struct TerminalApp {
    /// The machine being hosted.
    pub vm: Vm<BufferedConsole, FrameQueue>,
    /// Should we quit?
    pub should_quit: bool,
    /// Why the last slice ended.
    pub last_slice: Option<SliceOutcome>,
}

impl TerminalApp {
    /// Wrap a machine that has its images loaded.
    pub fn new(vm: Vm<BufferedConsole, FrameQueue>) -> Self {
        Self {
            vm,
            should_quit: false,
            last_slice: None,
        }
    }

    /// Run the slice due this frame, if any.
    pub fn tick(&mut self) {
        if let Some(end) = self.vm.poll_frame() {
            self.last_slice = Some(end);
        }
    }

    /// Has the program finished for good?
    pub fn finished(&self) -> bool {
        matches!(
            self.last_slice,
            Some(SliceOutcome::Stopped) | Some(SliceOutcome::Halted)
        )
    }

    /// Forward a key press to the program.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if let Some(byte) = key_to_byte(key) {
            self.vm.console_mut().push_key(byte);
            self.vm.notify_input_available();
        }
    }

    /// Drain program output as terminal text.
    pub fn take_output(&mut self) -> String {
        to_terminal_text(&self.vm.console_mut().take_output())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            state: self.vm.state(),
            cycles: self.vm.cpu.cycles,
            halt_reason: self.vm.halt_reason(),
            registers: self.vm.cpu.regs.clone(),
            last_instruction: self.vm.cpu.last_instruction(),
            memory: self.vm.cpu.memory_near_pc(),
            interrupted: self.should_quit,
        }
    }
}

/// Translate a key press into the byte the program reads.
pub fn key_to_byte(key: KeyEvent) -> Option<u8> {
    match key.code {
        KeyCode::Enter => Some(b'\n'),
        KeyCode::Backspace => Some(0x08),
        KeyCode::Tab => Some(b'\t'),
        KeyCode::Esc => Some(0x1B),
        KeyCode::Char(c) if c.is_ascii() => {
            if key.modifiers.contains(KeyModifiers::CONTROL) && c.is_ascii_alphabetic() {
                Some((c.to_ascii_lowercase() as u8) - b'a' + 1)
            } else {
                Some(c as u8)
            }
        }
        _ => None,
    }
}

/// Host a machine on the current terminal until it stops or the user quits.
pub fn run_terminal(vm: Vm<BufferedConsole, FrameQueue>) -> std::io::Result<RunSummary> {
    use crossterm::{
        event::{self, Event, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode},
    };
    use std::io::stdout;

    enable_raw_mode()?;
    let mut out = stdout();
    let mut app = TerminalApp::new(vm);
    app.vm.schedule_execution();

    let result = (|| -> std::io::Result<()> {
        loop {
            app.tick();

            let text = app.take_output();
            if !text.is_empty() {
                out.write_all(text.as_bytes())?;
                out.flush()?;
            }

            if app.finished() || app.should_quit {
                return Ok(());
            }

            // Don't sleep while the machine has more work queued.
            let wait = if app.vm.host().is_due() { Duration::ZERO } else { FRAME };
            if event::poll(wait)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        app.handle_key(key);
                    }
                }
            }
        }
    })();

    disable_raw_mode()?;
    writeln!(out)?;
    result.map(|()| app.summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ObjectImage;
    use crate::vm::VmConfig;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_to_byte() {
        assert_eq!(key_to_byte(press(KeyCode::Char('a'))), Some(b'a'));
        assert_eq!(key_to_byte(press(KeyCode::Enter)), Some(b'\n'));
        assert_eq!(key_to_byte(press(KeyCode::Backspace)), Some(0x08));
        assert_eq!(key_to_byte(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL)), Some(0x04));
        assert_eq!(key_to_byte(press(KeyCode::Char('é'))), None);
        assert_eq!(key_to_byte(press(KeyCode::Left)), None);
    }

    #[test]
    fn test_keys_wake_waiting_program() {
        // loop: GETC; STI R0, #1; BRnzp loop; .FILL xFE06
        let mut vm = Vm::new(BufferedConsole::new(), FrameQueue::new(), VmConfig::default());
        vm.load(&ObjectImage::new(0x3000, vec![0xF020, 0xB001, 0x0FFD, 0xFE06])).unwrap();
        vm.schedule_execution();
        let mut app = TerminalApp::new(vm);

        app.tick();
        assert_eq!(app.last_slice, Some(SliceOutcome::Suspended));

        app.handle_key(press(KeyCode::Char('x')));
        app.handle_key(press(KeyCode::Enter));
        app.tick();

        assert_eq!(app.take_output(), "x\r\n");
        assert!(!app.finished());

        let summary = app.summary();
        assert_eq!(summary.state, RunState::SuspendedForInput);
        assert_eq!(summary.last_instruction, Some(Instruction::Br { nzp: 0b111, offset: -3 }));
        assert_eq!(summary.memory[4], (0x3000, 0xF020));
    }

    #[test]
    fn test_ctrl_c_quits() {
        let vm = Vm::new(BufferedConsole::new(), FrameQueue::new(), VmConfig::default());
        let mut app = TerminalApp::new(vm);

        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));

        assert!(app.should_quit);
        assert_eq!(app.vm.console().pending_input(), 0);
        assert!(app.summary().interrupted);
    }
}
