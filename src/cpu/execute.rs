//! CPU execution engine for the LC-3.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::bits::arith::offset;
use crate::cpu::decode::{self, DecodeError, Instruction, JsrTarget, Opcode, Operand};
use crate::cpu::mmio::{self, Devices, MmioError, MCR, STATUS_BIT};
use crate::cpu::{Memory, Registers};
use crate::image::{LoadError, ObjectImage};
use thiserror::Error;

/// Trap vector of the blocking character-input service (GETC).
pub const TRAP_GETC: u8 = 0x20;

const NEAR_PC_BEFORE: u16 = 4;
const NEAR_PC_CELLS: usize = 9;

/// Result of a successfully executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The instruction completed.
    Success,
    /// GETC found no input. PC still points past the trap.
    RetryAfterInterrupt,
}

/// The LC-3 CPU.
#[derive(Clone)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Instructions completed since reset.
    pub cycles: u64,
    /// Last executed instruction (for tracing).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a CPU in the reset state.
    pub fn new() -> Self {
        let mut cpu = Self {
            regs: Registers::new(),
            mem: Memory::new(),
            cycles: 0,
            last_instr: None,
        };
        cpu.mem.write(MCR, STATUS_BIT);
        cpu
    }

    /// Zero memory and registers, point PC at the entry address and set the run bit.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.mem.write(MCR, STATUS_BIT);
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Copy an object image into memory.
    pub fn load(&mut self, image: &ObjectImage) -> Result<(), LoadError> {
        self.mem.load_block(image.origin, &image.words)?;
        tracing::debug!(
            "loaded {} words at {:#06x}",
            image.words.len(),
            image.origin
        );
        Ok(())
    }

    /// Is the MCR run bit set?
    pub fn is_running(&self) -> bool {
        mmio::is_running(&self.mem)
    }

    /// Fetch the word at PC, advance PC, and execute it.
    ///
    /// On [`Outcome::RetryAfterInterrupt`] the fetch increment is left in
    /// place; the caller decides whether to rewind.
    pub fn step<D: Devices + ?Sized>(&mut self, dev: &mut D) -> Result<Outcome, CpuError> {
        let pc = self.regs.advance_pc();
        let word = mmio::read(&self.mem, pc, dev);
        tracing::trace!("{:#06x}: {:#06x}", pc, word);
        self.execute(word, dev)
    }

    /// Decode and execute one instruction word.
    pub fn execute<D: Devices + ?Sized>(&mut self, word: u16, dev: &mut D) -> Result<Outcome, CpuError> {
        let instr = decode::decode(word)?;
        let outcome = self.dispatch(instr, dev)?;

        if outcome == Outcome::Success {
            self.cycles += 1;
            self.last_instr = Some(instr);
        }
        Ok(outcome)
    }

    fn dispatch<D: Devices + ?Sized>(&mut self, instr: Instruction, dev: &mut D) -> Result<Outcome, CpuError> {
        match instr {
            // ==================== Operate ====================

            Instruction::Add { dr, sr1, src2 } => {
                let value = self.regs.get(sr1).wrapping_add(self.operand(src2));
                self.regs.set_with_cc(dr, value);
            }

            Instruction::And { dr, sr1, src2 } => {
                let value = self.regs.get(sr1) & self.operand(src2);
                self.regs.set_with_cc(dr, value);
            }

            Instruction::Not { dr, sr } => {
                let value = !self.regs.get(sr);
                self.regs.set_with_cc(dr, value);
            }

            // ==================== Data Movement ====================

            Instruction::Ld { dr, offset: off } => {
                let addr = offset(self.regs.pc, off as i32);
                let value = mmio::read(&self.mem, addr, dev);
                self.regs.set_with_cc(dr, value);
            }

            Instruction::Ldi { dr, offset: off } => {
                let pointer = offset(self.regs.pc, off as i32);
                let addr = mmio::read(&self.mem, pointer, dev);
                let value = mmio::read(&self.mem, addr, dev);
                self.regs.set_with_cc(dr, value);
            }

            Instruction::Ldr { dr, base, offset: off } => {
                let addr = offset(self.regs.get(base), off as i32);
                let value = mmio::read(&self.mem, addr, dev);
                self.regs.set_with_cc(dr, value);
            }

            Instruction::Lea { dr, offset: off } => {
                let value = offset(self.regs.pc, off as i32);
                self.regs.set_with_cc(dr, value);
            }

            Instruction::St { sr, offset: off } => {
                let addr = offset(self.regs.pc, off as i32);
                mmio::write(&mut self.mem, addr, self.regs.get(sr), dev)?;
            }

            Instruction::Sti { sr, offset: off } => {
                let pointer = offset(self.regs.pc, off as i32);
                let addr = mmio::read(&self.mem, pointer, dev);
                mmio::write(&mut self.mem, addr, self.regs.get(sr), dev)?;
            }

            Instruction::Str { sr, base, offset: off } => {
                let addr = offset(self.regs.get(base), off as i32);
                mmio::write(&mut self.mem, addr, self.regs.get(sr), dev)?;
            }

            // ==================== Control ====================

            Instruction::Br { nzp, offset: off } => {
                if self.regs.cond.matches(nzp) {
                    let target = offset(self.regs.pc, off as i32);
                    self.regs.jump(target);
                }
            }

            Instruction::Jmp { base } => {
                let target = self.regs.get(base);
                self.regs.jump(target);
            }

            Instruction::Jsr { target } => {
                // R7 is written before the base register is read, so JSRR R7
                // lands on the return address.
                self.regs.set(7, self.regs.pc);
                let target = match target {
                    JsrTarget::Offset(off) => offset(self.regs.pc, off as i32),
                    JsrTarget::Reg(base) => self.regs.get(base),
                };
                self.regs.jump(target);
            }

            Instruction::Trap { vector: TRAP_GETC } => {
                if !dev.has_char() {
                    return Ok(Outcome::RetryAfterInterrupt);
                }
                let c = dev.get_char();
                self.regs.set(0, c as u16);
            }

            Instruction::Trap { vector } => {
                self.regs.set(7, self.regs.pc);
                let target = mmio::read(&self.mem, vector as u16, dev);
                self.regs.jump(target);
            }

            Instruction::Rti => return Err(CpuError::OpcodeNotImplemented(Opcode::Rti)),

            Instruction::Reserved => return Err(CpuError::OpcodeNotImplemented(Opcode::Reserved)),
        }

        Ok(Outcome::Success)
    }

    #[inline]
    fn operand(&self, src2: Operand) -> u16 {
        match src2 {
            Operand::Reg(r) => self.regs.get(r),
            Operand::Imm(imm) => imm as u16,
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// The cells around PC, as shown by `--dump`.
    pub fn memory_near_pc(&self) -> Vec<(u16, u16)> {
        self.mem.dump(self.regs.pc.saturating_sub(NEAR_PC_BEFORE), NEAR_PC_CELLS)
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that stop execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("opcode not implemented: {0:?}")]
    OpcodeNotImplemented(Opcode),

    #[error("decode failed: {0}")]
    Fail(#[from] DecodeError),

    #[error("device error: {0}")]
    ReadOnlyRegister(#[from] MmioError),
}
