//! LC-3 register file.
//!
//! - R0..R7: general-purpose 16-bit registers
//! - PC: program counter
//! - PSR: processor status, of which only the N/Z/P bits are modelled

use crate::bits::ConditionCode;
use serde::{Deserialize, Serialize};

/// Address execution starts from after a reset.
pub const ENTRY_ADDRESS: u16 = 0x3000;

/// A general-purpose register index (0-7).
pub type Reg = u8;

/// The LC-3 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0..R7
    pub r: [u16; 8],

    /// Program counter
    pub pc: u16,

    /// Condition code held in the PSR.
    pub cond: ConditionCode,
}

impl Registers {
    /// Create a register file in the reset state.
    pub fn new() -> Self {
        Self {
            r: [0; 8],
            pc: ENTRY_ADDRESS,
            cond: ConditionCode::Zero,
        }
    }

    /// Reset to the power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn get(&self, reg: Reg) -> u16 {
        self.r[(reg & 0b111) as usize]
    }

    /// Write a register without touching the condition code.
    #[inline]
    pub fn set(&mut self, reg: Reg, value: u16) {
        self.r[(reg & 0b111) as usize] = value;
    }

    /// Write a register and derive the condition code from it.
    #[inline]
    pub fn set_with_cc(&mut self, reg: Reg, value: u16) {
        self.set(reg, value);
        self.cond = ConditionCode::from_value(value);
    }

    /// The PSR as the machine would see it.
    #[inline]
    pub fn psr(&self) -> u16 {
        self.cond.bits()
    }

    /// Increment the program counter by 1, wrapping.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Undo the fetch increment.
    pub fn rewind_pc(&mut self) {
        self.pc = self.pc.wrapping_sub(1);
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: u16) {
        self.pc = addr;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
