//! Memory-mapped device registers.
//!
//! Every CPU memory access goes through [`read`] and [`write`], which
//! redirect the reserved addresses to the console collaborators and fall
//! through to raw [`Memory`] for everything else.

use crate::cpu::Memory;
use thiserror::Error;

/// Keyboard status register. Bit 15 is set while input is waiting.
pub const KBSR: u16 = 0xFE00;
/// Keyboard data register.
pub const KBDR: u16 = 0xFE02;
/// Display status register. Always ready.
pub const DSR: u16 = 0xFE04;
/// Display data register. Writing emits a character.
pub const DDR: u16 = 0xFE06;
/// Machine control register. Bit 15 is the run bit.
pub const MCR: u16 = 0xFFFE;

/// The ready/run bit shared by the status registers and MCR.
pub const STATUS_BIT: u16 = 1 << 15;

/// A source of console characters, consumed front first.
pub trait InputSource {
    /// Is a character waiting?
    fn has_char(&self) -> bool;

    /// Pop the next character. Only called after `has_char` returned true.
    fn get_char(&mut self) -> u8;
}

/// A sink for console output.
pub trait OutputSink {
    /// Emit one character, exactly as the program wrote it.
    fn put_char(&mut self, value: u16);
}

/// Both halves of the console, as the executor needs them.
pub trait Devices: InputSource + OutputSink {}

impl<T: InputSource + OutputSink + ?Sized> Devices for T {}

/// Errors raised by device register accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MmioError {
    #[error("write of {value:#06x} to read-only device register {addr:#06x}")]
    ReadOnly { addr: u16, value: u16 },
}

/// Read a word as the CPU sees it.
pub fn read<I: InputSource + ?Sized>(mem: &Memory, addr: u16, input: &mut I) -> u16 {
    match addr {
        KBSR => {
            if input.has_char() {
                STATUS_BIT
            } else {
                0
            }
        }
        KBDR => {
            if input.has_char() {
                input.get_char() as u16
            } else {
                0
            }
        }
        DSR => STATUS_BIT,
        DDR => 0,
        _ => mem.read(addr),
    }
}

/// Write a word as the CPU sees it.
pub fn write<O: OutputSink + ?Sized>(
    mem: &mut Memory,
    addr: u16,
    value: u16,
    output: &mut O,
) -> Result<(), MmioError> {
    match addr {
        KBSR | KBDR | DSR => {
            tracing::warn!("rejected write of {:#06x} to read-only register {:#06x}", value, addr);
            Err(MmioError::ReadOnly { addr, value })
        }
        DDR => {
            output.put_char(value);
            Ok(())
        }
        _ => {
            mem.write(addr, value);
            Ok(())
        }
    }
}

/// Is the MCR run bit set?
#[inline]
pub fn is_running(mem: &Memory) -> bool {
    mem.read(MCR) & STATUS_BIT != 0
}
