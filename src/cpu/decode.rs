//! Instruction decoder for the LC-3.
//!
//! Every instruction is one 16-bit word. Bits 15-12 hold the opcode; the
//! remaining twelve bits are register numbers, immediates and PC-relative
//! offsets laid out per opcode.

use crate::bits::sign_extend;
use crate::cpu::registers::Reg;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The sixteen opcode slots, by their bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Br = 0b0000,
    Add = 0b0001,
    Ld = 0b0010,
    St = 0b0011,
    Jsr = 0b0100,
    And = 0b0101,
    Ldr = 0b0110,
    Str = 0b0111,
    Rti = 0b1000,
    Not = 0b1001,
    Ldi = 0b1010,
    Sti = 0b1011,
    Jmp = 0b1100,
    Reserved = 0b1101,
    Lea = 0b1110,
    Trap = 0b1111,
}

impl Opcode {
    /// Opcode of an instruction word.
    pub fn of(word: u16) -> Option<Self> {
        let op = match word >> 12 {
            0b0000 => Opcode::Br,
            0b0001 => Opcode::Add,
            0b0010 => Opcode::Ld,
            0b0011 => Opcode::St,
            0b0100 => Opcode::Jsr,
            0b0101 => Opcode::And,
            0b0110 => Opcode::Ldr,
            0b0111 => Opcode::Str,
            0b1000 => Opcode::Rti,
            0b1001 => Opcode::Not,
            0b1010 => Opcode::Ldi,
            0b1011 => Opcode::Sti,
            0b1100 => Opcode::Jmp,
            0b1101 => Opcode::Reserved,
            0b1110 => Opcode::Lea,
            0b1111 => Opcode::Trap,
            _ => return None,
        };
        Some(op)
    }

    /// Opcode bits placed at 15-12.
    #[inline]
    pub const fn bits(self) -> u16 {
        (self as u16) << 12
    }
}

/// Second operand of ADD and AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Register mode (bit 5 clear).
    Reg(Reg),
    /// Sign-extended imm5 (bit 5 set).
    Imm(i16),
}

/// Where JSR goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JsrTarget {
    /// JSR: PC-relative offset11.
    Offset(i16),
    /// JSRR: base register.
    Reg(Reg),
}

/// Decoded LC-3 instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Operate ====================

    /// DR := SR1 + operand
    Add { dr: Reg, sr1: Reg, src2: Operand },

    /// DR := SR1 & operand
    And { dr: Reg, sr1: Reg, src2: Operand },

    /// DR := !SR
    Not { dr: Reg, sr: Reg },

    // ==================== Data Movement ====================

    /// DR := mem[PC + offset9]
    Ld { dr: Reg, offset: i16 },

    /// DR := mem[mem[PC + offset9]]
    Ldi { dr: Reg, offset: i16 },

    /// DR := mem[BaseR + offset6]
    Ldr { dr: Reg, base: Reg, offset: i16 },

    /// DR := PC + offset9
    Lea { dr: Reg, offset: i16 },

    /// mem[PC + offset9] := SR
    St { sr: Reg, offset: i16 },

    /// mem[mem[PC + offset9]] := SR
    Sti { sr: Reg, offset: i16 },

    /// mem[BaseR + offset6] := SR
    Str { sr: Reg, base: Reg, offset: i16 },

    // ==================== Control ====================

    /// if (PSR & nzp) != 0 then PC += offset9
    Br { nzp: u16, offset: i16 },

    /// PC := BaseR
    Jmp { base: Reg },

    /// R7 := PC; PC := target
    Jsr { target: JsrTarget },

    /// System call through the vector table at 0x0000-0x00FF.
    Trap { vector: u8 },

    /// Return from interrupt. Not implemented.
    Rti,

    /// Opcode 1101. Not implemented.
    Reserved,
}

impl Instruction {
    /// The opcode slot this instruction occupies.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Add { .. } => Opcode::Add,
            Instruction::And { .. } => Opcode::And,
            Instruction::Not { .. } => Opcode::Not,
            Instruction::Ld { .. } => Opcode::Ld,
            Instruction::Ldi { .. } => Opcode::Ldi,
            Instruction::Ldr { .. } => Opcode::Ldr,
            Instruction::Lea { .. } => Opcode::Lea,
            Instruction::St { .. } => Opcode::St,
            Instruction::Sti { .. } => Opcode::Sti,
            Instruction::Str { .. } => Opcode::Str,
            Instruction::Br { .. } => Opcode::Br,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Jsr { .. } => Opcode::Jsr,
            Instruction::Trap { .. } => Opcode::Trap,
            Instruction::Rti => Opcode::Rti,
            Instruction::Reserved => Opcode::Reserved,
        }
    }
}

/// Bits 11-9: DR, SR (stores) or the BR condition mask.
#[inline]
fn reg_11_9(word: u16) -> Reg {
    ((word >> 9) & 0b111) as Reg
}

/// Bits 8-6: SR1 or BaseR.
#[inline]
fn reg_8_6(word: u16) -> Reg {
    ((word >> 6) & 0b111) as Reg
}

#[inline]
fn field(word: u16, n: u32) -> i16 {
    sign_extend(word, n) as i16
}

/// Decode an instruction word.
pub fn decode(word: u16) -> Result<Instruction, DecodeError> {
    let opcode = Opcode::of(word).ok_or(DecodeError::InvalidOpcode(word >> 12))?;

    let src2 = || {
        if word & (1 << 5) != 0 {
            Operand::Imm(field(word, 5))
        } else {
            Operand::Reg((word & 0b111) as Reg)
        }
    };

    let instruction = match opcode {
        Opcode::Add => Instruction::Add { dr: reg_11_9(word), sr1: reg_8_6(word), src2: src2() },
        Opcode::And => Instruction::And { dr: reg_11_9(word), sr1: reg_8_6(word), src2: src2() },
        Opcode::Not => Instruction::Not { dr: reg_11_9(word), sr: reg_8_6(word) },
        Opcode::Ld => Instruction::Ld { dr: reg_11_9(word), offset: field(word, 9) },
        Opcode::Ldi => Instruction::Ldi { dr: reg_11_9(word), offset: field(word, 9) },
        Opcode::Ldr => Instruction::Ldr { dr: reg_11_9(word), base: reg_8_6(word), offset: field(word, 6) },
        Opcode::Lea => Instruction::Lea { dr: reg_11_9(word), offset: field(word, 9) },
        Opcode::St => Instruction::St { sr: reg_11_9(word), offset: field(word, 9) },
        Opcode::Sti => Instruction::Sti { sr: reg_11_9(word), offset: field(word, 9) },
        Opcode::Str => Instruction::Str { sr: reg_11_9(word), base: reg_8_6(word), offset: field(word, 6) },
        Opcode::Br => Instruction::Br { nzp: (word >> 9) & 0b111, offset: field(word, 9) },
        Opcode::Jmp => Instruction::Jmp { base: reg_8_6(word) },
        Opcode::Jsr => {
            let target = if word & (1 << 11) != 0 {
                JsrTarget::Offset(field(word, 11))
            } else {
                JsrTarget::Reg(reg_8_6(word))
            };
            Instruction::Jsr { target }
        }
        Opcode::Trap => Instruction::Trap { vector: (word & 0xFF) as u8 },
        Opcode::Rti => Instruction::Rti,
        Opcode::Reserved => Instruction::Reserved,
    };

    Ok(instruction)
}

/// Encode an instruction back to its word.
pub fn encode(instr: &Instruction) -> u16 {
    let r11 = |r: Reg| ((r & 0b111) as u16) << 9;
    let r8 = |r: Reg| ((r & 0b111) as u16) << 6;
    let off = |o: i16, n: u32| (o as u16) & ((1u16 << n) - 1);
    let op2 = |src2: &Operand| match *src2 {
        Operand::Reg(r) => (r & 0b111) as u16,
        Operand::Imm(imm) => (1 << 5) | off(imm, 5),
    };

    let operands = match instr {
        Instruction::Add { dr, sr1, src2 } | Instruction::And { dr, sr1, src2 } => {
            r11(*dr) | r8(*sr1) | op2(src2)
        }
        Instruction::Not { dr, sr } => r11(*dr) | r8(*sr) | 0x3F,
        Instruction::Ld { dr, offset }
        | Instruction::Ldi { dr, offset }
        | Instruction::Lea { dr, offset } => r11(*dr) | off(*offset, 9),
        Instruction::St { sr, offset } | Instruction::Sti { sr, offset } => r11(*sr) | off(*offset, 9),
        Instruction::Ldr { dr: r, base, offset } | Instruction::Str { sr: r, base, offset } => {
            r11(*r) | r8(*base) | off(*offset, 6)
        }
        Instruction::Br { nzp, offset } => ((nzp & 0b111) << 9) | off(*offset, 9),
        Instruction::Jmp { base } => r8(*base),
        Instruction::Jsr { target: JsrTarget::Offset(offset) } => (1 << 11) | off(*offset, 11),
        Instruction::Jsr { target: JsrTarget::Reg(base) } => r8(*base),
        Instruction::Trap { vector } => *vector as u16,
        Instruction::Rti | Instruction::Reserved => 0,
    };

    instr.opcode().bits() | operands
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid opcode: {0:#06b}")]
    InvalidOpcode(u16),
}
