//! Object images and their disassembly.
//!
//! This module provides:
//! - The big-endian object image format the loader consumes
//! - A disassembler (instruction words → readable text)

pub mod object;
pub mod disasm;

pub use object::{read_object, LoadError, ObjectImage};
pub use disasm::{disassemble, disassemble_instruction, format_instruction};
