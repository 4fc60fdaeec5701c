//! # LC-3 Emulator
//!
//! An emulator core for the LC-3, the 16-bit teaching computer with eight
//! registers, fifteen instructions and memory-mapped console I/O.
//!
//! The core is a library: a host supplies the console (keyboard queue and
//! display), drives execution one bounded slice at a time, and tells the
//! machine when a key arrives.

pub mod bits;
pub mod cpu;
pub mod image;
pub mod console;
pub mod vm;

#[cfg(feature = "term")]
pub mod term;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use bits::{sign_extend, swap16, ConditionCode};
pub use cpu::{Cpu, CpuError, Instruction, Memory, Outcome, Registers};
pub use cpu::{InputSource, OutputSink};
pub use console::BufferedConsole;
pub use image::{disassemble, read_object, LoadError, ObjectImage};
pub use vm::{FrameQueue, HostScheduler, RunState, SliceOutcome, Vm, VmConfig};

#[cfg(feature = "term")]
pub use term::run_terminal;
