//! CPU emulation for the LC-3.
//!
//! - 65536 sixteen-bit memory cells, with device registers in the top page
//! - 8 general-purpose registers, PC and the N/Z/P condition code
//! - 15 implemented instructions in a fixed 16-bit format

pub mod memory;
pub mod registers;
pub mod mmio;
pub mod decode;
pub mod execute;

pub use memory::Memory;
pub use registers::Registers;
pub use mmio::{Devices, InputSource, MmioError, OutputSink};
pub use decode::{DecodeError, Instruction, JsrTarget, Opcode, Operand};
pub use execute::{Cpu, CpuError, Outcome};
