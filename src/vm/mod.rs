//! Execution scheduler.
//!
//! Runs the CPU in bounded quanta so the host's own event loop stays
//! responsive, and parks the machine when a program blocks on console
//! input until the host reports that a key arrived.
//!
//! ```text
//!              quantum done (reschedule)
//!            +------------------------+
//!            v                        |
//!   reset -> Running -----------------+
//!            |   ^
//!   GETC,    |   | notify_input_available
//!   no input v   |
//!        SuspendedForInput
//!
//!   Running --(error)--> Halted
//! ```

mod config;
mod host;

pub use config::{ConfigError, VmConfig, DEFAULT_QUANTUM};
pub use host::{FrameQueue, HostScheduler};

use crate::cpu::{Cpu, CpuError, Devices, Outcome};
use crate::image::{LoadError, ObjectImage};
use serde::{Deserialize, Serialize};

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Executing, or waiting for the next host turn.
    Running,
    /// Blocked in GETC until input arrives.
    SuspendedForInput,
    /// Stopped by an error; only `reset` leaves this state.
    Halted,
}

/// How a slice ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOutcome {
    /// The full quantum ran and the next slice is scheduled.
    Yielded,
    /// The program is waiting for input.
    Suspended,
    /// The MCR run bit is clear.
    Stopped,
    /// Execution failed. See [`Vm::halt_reason`].
    Halted,
}

/// An LC-3 machine wired to its console and host.
pub struct Vm<D, H: HostScheduler> {
    /// The emulated CPU and memory.
    pub cpu: Cpu,
    console: D,
    host: H,
    config: VmConfig,
    os_image: Option<ObjectImage>,
    state: RunState,
    pending: Option<H::Handle>,
    halt_reason: Option<CpuError>,
}

impl<D: Devices, H: HostScheduler> Vm<D, H> {
    /// Create a machine in the reset state.
    pub fn new(console: D, host: H, config: VmConfig) -> Self {
        Self {
            cpu: Cpu::new(),
            console,
            host,
            config,
            os_image: None,
            state: RunState::Running,
            pending: None,
            halt_reason: None,
        }
    }

    /// Attach the operating-system image used by [`Vm::load_operating_system_image`].
    pub fn with_os(mut self, os: ObjectImage) -> Self {
        self.set_os(os);
        self
    }

    pub fn set_os(&mut self, os: ObjectImage) {
        self.os_image = Some(os);
    }

    /// Return to the power-on state and drop any scheduled continuation.
    pub fn reset(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.host.cancel_continuation(handle);
        }
        self.cpu.reset();
        self.state = RunState::Running;
        self.halt_reason = None;
        tracing::debug!("machine reset");
    }

    /// Load the attached operating-system image.
    pub fn load_operating_system_image(&mut self) -> Result<(), LoadError> {
        let os = self.os_image.as_ref().ok_or(LoadError::NoOperatingSystem)?;
        self.cpu.load(os)
    }

    /// Load a program image. Nothing is written if it does not fit.
    pub fn load(&mut self, image: &ObjectImage) -> Result<(), LoadError> {
        self.cpu.load(image)
    }

    /// Ask the host for a slice, unless one is already pending or the
    /// machine cannot run.
    pub fn schedule_execution(&mut self) {
        if self.state != RunState::Running || self.pending.is_some() {
            return;
        }
        self.pending = Some(self.host.schedule_continuation());
        tracing::trace!("slice scheduled");
    }

    /// Resume a machine parked in GETC. Does nothing in any other state.
    pub fn notify_input_available(&mut self) {
        if self.state != RunState::SuspendedForInput {
            return;
        }
        self.state = RunState::Running;
        tracing::debug!("input available, resuming");
        self.schedule_execution();
    }

    /// Body of a host continuation: run up to one quantum.
    pub fn run_slice(&mut self) -> SliceOutcome {
        self.run_slice_within(u64::MAX)
    }

    /// Like `run_slice`, but execute at most `limit` instructions. A slice
    /// cut short by the limit still yields and reschedules.
    pub fn run_slice_within(&mut self, limit: u64) -> SliceOutcome {
        self.pending = None;

        let budget = u64::from(self.config.quantum()).min(limit);
        for _ in 0..budget {
            if let Some(end) = self.advance() {
                return end;
            }
        }

        self.schedule_execution();
        SliceOutcome::Yielded
    }

    /// Execute a single instruction with the same state transitions as a slice.
    ///
    /// Returns `None` when the instruction completed and the machine can
    /// keep going.
    pub fn step(&mut self) -> Option<SliceOutcome> {
        self.advance()
    }

    fn advance(&mut self) -> Option<SliceOutcome> {
        match self.state {
            RunState::Running => {}
            RunState::SuspendedForInput => return Some(SliceOutcome::Suspended),
            RunState::Halted => return Some(SliceOutcome::Halted),
        }

        if !self.cpu.is_running() {
            tracing::debug!("run bit clear, stopping at {:#06x}", self.cpu.regs.pc);
            return Some(SliceOutcome::Stopped);
        }

        match self.cpu.step(&mut self.console) {
            Ok(Outcome::Success) => None,
            Ok(Outcome::RetryAfterInterrupt) => {
                self.cpu.regs.rewind_pc();
                self.state = RunState::SuspendedForInput;
                tracing::debug!("waiting for input at {:#06x}", self.cpu.regs.pc);
                Some(SliceOutcome::Suspended)
            }
            Err(e) => {
                tracing::warn!("halted at {:#06x}: {}", self.cpu.regs.pc.wrapping_sub(1), e);
                self.state = RunState::Halted;
                self.halt_reason = Some(e);
                Some(SliceOutcome::Halted)
            }
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The error that halted the machine, if any.
    pub fn halt_reason(&self) -> Option<CpuError> {
        self.halt_reason
    }

    /// Is a continuation waiting to fire?
    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }

    pub fn console(&self) -> &D {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut D {
        &mut self.console
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

impl<D: Devices> Vm<D, FrameQueue> {
    /// Run a slice if one is due this frame.
    pub fn poll_frame(&mut self) -> Option<SliceOutcome> {
        self.poll_frame_within(u64::MAX)
    }

    /// `poll_frame` with the slice capped at `limit` instructions.
    pub fn poll_frame_within(&mut self, limit: u64) -> Option<SliceOutcome> {
        if self.host.take_due() {
            Some(self.run_slice_within(limit))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::ConditionCode;
    use crate::console::BufferedConsole;
    use crate::cpu::mmio::{KBSR, MCR};
    use crate::cpu::{MmioError, Opcode};

    /// Records every scheduling call.
    #[derive(Debug, Default)]
    struct RecordingHost {
        next: u32,
        scheduled: Vec<u32>,
        cancelled: Vec<u32>,
    }

    impl HostScheduler for RecordingHost {
        type Handle = u32;

        fn schedule_continuation(&mut self) -> u32 {
            self.next += 1;
            self.scheduled.push(self.next);
            self.next
        }

        fn cancel_continuation(&mut self, handle: u32) {
            self.cancelled.push(handle);
        }
    }

    fn vm_with(words: &[u16], quantum: u32) -> Vm<BufferedConsole, RecordingHost> {
        let config = VmConfig::with_quantum(quantum).unwrap();
        let mut vm = Vm::new(BufferedConsole::new(), RecordingHost::default(), config);
        vm.load(&ObjectImage::new(0x3000, words.to_vec())).unwrap();
        vm
    }

    #[test]
    fn test_schedule_is_idempotent() {
        let mut vm = vm_with(&[], 10);

        vm.schedule_execution();
        vm.schedule_execution();

        assert_eq!(vm.host().scheduled, vec![1]);
        assert!(vm.is_scheduled());
    }

    #[test]
    fn test_quantum_bounds_slice() {
        // BRnzp #-1: spin forever
        let mut vm = vm_with(&[0x0FFF], 10);
        vm.schedule_execution();

        let end = vm.run_slice();

        assert_eq!(end, SliceOutcome::Yielded);
        assert_eq!(vm.cpu.cycles, 10);
        assert_eq!(vm.state(), RunState::Running);
        assert_eq!(vm.host().scheduled, vec![1, 2]);
        assert!(vm.is_scheduled());
    }

    #[test]
    fn test_getc_suspends_and_resumes() {
        // GETC; ADD R1, R0, #0
        let mut vm = vm_with(&[0xF020, 0x1220], 100);
        vm.schedule_execution();

        assert_eq!(vm.run_slice(), SliceOutcome::Suspended);
        assert_eq!(vm.state(), RunState::SuspendedForInput);
        assert_eq!(vm.cpu.regs.pc, 0x3000);
        assert!(!vm.is_scheduled());

        vm.console_mut().push_key(b'k');
        vm.notify_input_available();
        vm.notify_input_available();
        assert_eq!(vm.host().scheduled, vec![1, 2]);

        assert_eq!(vm.step(), None);
        assert_eq!(vm.cpu.regs.get(0), b'k' as u16);
        assert_eq!(vm.cpu.regs.pc, 0x3001);

        assert_eq!(vm.step(), None);
        assert_eq!(vm.cpu.regs.get(1), b'k' as u16);
        assert_eq!(vm.cpu.regs.cond, ConditionCode::Positive);
    }

    #[test]
    fn test_notify_ignored_while_running() {
        let mut vm = vm_with(&[0x0FFF], 10);

        vm.notify_input_available();

        assert!(vm.host().scheduled.is_empty());
        assert_eq!(vm.state(), RunState::Running);
    }

    #[test]
    fn test_fatal_opcode_halts() {
        // ADD R0, R0, #1; RTI
        let mut vm = vm_with(&[0x1021, 0x8000], 100);
        vm.schedule_execution();

        assert_eq!(vm.run_slice(), SliceOutcome::Halted);
        assert_eq!(vm.state(), RunState::Halted);
        assert_eq!(vm.halt_reason(), Some(CpuError::OpcodeNotImplemented(Opcode::Rti)));
        assert_eq!(vm.host().scheduled, vec![1]);

        // Stays halted; nothing more runs.
        vm.schedule_execution();
        assert_eq!(vm.run_slice(), SliceOutcome::Halted);
        assert_eq!(vm.cpu.cycles, 1);
        assert_eq!(vm.host().scheduled, vec![1]);
    }

    #[test]
    fn test_store_to_status_register_halts() {
        // LD R1, #1; STR R0, R1, #0; .FILL xFE00
        let mut vm = vm_with(&[0x2201, 0x7040, KBSR], 100);
        vm.cpu.regs.set(0, 0x1234);
        vm.schedule_execution();

        assert_eq!(vm.run_slice(), SliceOutcome::Halted);
        assert_eq!(vm.state(), RunState::Halted);
        assert_eq!(
            vm.halt_reason(),
            Some(CpuError::ReadOnlyRegister(MmioError::ReadOnly { addr: KBSR, value: 0x1234 }))
        );
        assert_eq!(vm.cpu.cycles, 1);
        assert!(!vm.is_scheduled());
    }

    #[test]
    fn test_slice_within_limit() {
        // ADD R0, R0, #1; BRnzp #-2
        let mut vm = vm_with(&[0x1021, 0x0FFE], 100);
        vm.schedule_execution();

        assert_eq!(vm.run_slice_within(10), SliceOutcome::Yielded);
        assert_eq!(vm.cpu.cycles, 10);
        assert_eq!(vm.cpu.regs.get(0), 5);
        assert!(vm.is_scheduled());

        // A limit above the quantum leaves the quantum in charge.
        assert_eq!(vm.run_slice_within(1_000), SliceOutcome::Yielded);
        assert_eq!(vm.cpu.cycles, 110);
    }

    #[test]
    fn test_frame_queue_respects_limit() {
        let config = VmConfig::with_quantum(1_000).unwrap();
        let mut vm = Vm::new(BufferedConsole::new(), FrameQueue::new(), config);
        vm.load(&ObjectImage::new(0x3000, vec![0x1021, 0x0FFE])).unwrap();
        vm.schedule_execution();

        let mut frames = 0;
        while vm.cpu.cycles < 25 {
            let remaining = 25 - vm.cpu.cycles;
            assert_eq!(vm.poll_frame_within(remaining.min(7)), Some(SliceOutcome::Yielded));
            frames += 1;
        }

        assert_eq!(vm.cpu.cycles, 25);
        assert_eq!(frames, 4);
    }

    #[test]
    fn test_smallest_quantum_makes_progress() {
        assert!(VmConfig::with_quantum(0).is_err());

        let mut vm = vm_with(&[0x1021, 0x0FFE], 1);
        vm.schedule_execution();
        for _ in 0..1_000 {
            assert_eq!(vm.run_slice(), SliceOutcome::Yielded);
        }

        assert_eq!(vm.cpu.cycles, 1_000);
        assert_eq!(vm.cpu.regs.get(0), 500);
    }

    #[test]
    fn test_clear_run_bit_stops_cleanly() {
        // AND R0, R0, #0; STI R0, #0; .FILL xFFFE
        let mut vm = vm_with(&[0x5020, 0xB000, MCR], 100);
        vm.schedule_execution();

        assert_eq!(vm.run_slice(), SliceOutcome::Stopped);
        assert_eq!(vm.cpu.cycles, 2);
        assert_eq!(vm.state(), RunState::Running);
        assert!(vm.halt_reason().is_none());
        assert!(!vm.is_scheduled());
    }

    #[test]
    fn test_reset_cancels_pending() {
        let mut vm = vm_with(&[0x1025], 10);
        vm.schedule_execution();

        vm.reset();

        assert_eq!(vm.host().cancelled, vec![1]);
        assert!(!vm.is_scheduled());
        assert_eq!(vm.state(), RunState::Running);
        assert_eq!(vm.cpu.mem.read(0x3000), 0);
        assert_eq!(vm.cpu.regs.pc, 0x3000);
        assert!(vm.cpu.is_running());
    }

    #[test]
    fn test_reset_leaves_halted_state() {
        let mut vm = vm_with(&[0xD000], 10);
        assert_eq!(vm.run_slice(), SliceOutcome::Halted);

        vm.reset();

        assert_eq!(vm.state(), RunState::Running);
        assert!(vm.halt_reason().is_none());
        // Nothing was pending, so nothing to cancel.
        assert!(vm.host().cancelled.is_empty());
    }

    #[test]
    fn test_load_image() {
        let mut vm = vm_with(&[], 10);
        let image = ObjectImage::parse(&[0x30, 0x00, 0x11, 0x11, 0x22, 0x22]).unwrap();

        vm.load(&image).unwrap();

        assert_eq!(vm.cpu.mem.read(0x3000), 0x1111);
        assert_eq!(vm.cpu.mem.read(0x3001), 0x2222);
    }

    #[test]
    fn test_load_too_large_is_all_or_nothing() {
        let mut vm = vm_with(&[], 10);
        let image = ObjectImage::new(0xFFF0, vec![0xAAAA; 17]);

        let err = vm.load(&image).unwrap_err();

        assert_eq!(err, LoadError::InputTooLarge { origin: 0xFFF0, len: 17 });
        assert!((0xFFF0..=0xFFFD).all(|a| vm.cpu.mem.read(a) == 0));
        assert!(vm.cpu.is_running());
    }

    #[test]
    fn test_operating_system_image() {
        let mut vm = vm_with(&[], 10);
        assert_eq!(vm.load_operating_system_image(), Err(LoadError::NoOperatingSystem));

        let mut vm = vm.with_os(ObjectImage::new(0x0200, vec![0x1234]));
        vm.load_operating_system_image().unwrap();
        assert_eq!(vm.cpu.mem.read(0x0200), 0x1234);
    }

    #[test]
    fn test_echo_through_frame_queue() {
        // loop: GETC; STI R0, #1; BRnzp loop; .FILL xFE06
        let mut vm = Vm::new(BufferedConsole::new(), FrameQueue::new(), VmConfig::default());
        vm.load(&ObjectImage::new(0x3000, vec![0xF020, 0xB001, 0x0FFD, 0xFE06])).unwrap();
        vm.schedule_execution();

        assert_eq!(vm.poll_frame(), Some(SliceOutcome::Suspended));
        assert_eq!(vm.poll_frame(), None);

        vm.console_mut().push_str("ok");
        vm.notify_input_available();

        assert_eq!(vm.poll_frame(), Some(SliceOutcome::Suspended));
        assert_eq!(vm.console_mut().take_output_string(), "ok");
        assert_eq!(vm.cpu.regs.pc, 0x3000);
    }
}
