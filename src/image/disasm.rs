//! Disassembler for LC-3 instruction words.

use crate::cpu::decode::{decode, Instruction, JsrTarget, Operand};

/// Disassemble a single instruction word to text.
pub fn disassemble_instruction(word: u16) -> String {
    match decode(word) {
        Ok(decoded) => format_instruction(&decoded),
        Err(_) => format!(".FILL x{:04X}", word),
    }
}

/// Disassemble a block of words loaded at `origin`.
pub fn disassemble(origin: u16, words: &[u16]) -> String {
    let mut output = String::new();
    output.push_str("; LC-3 Disassembly\n");
    output.push_str(&format!(".ORIG x{:04X}\n", origin));

    for (i, word) in words.iter().enumerate() {
        let addr = origin.wrapping_add(i as u16);
        let line = disassemble_instruction(*word);
        output.push_str(&format!("x{:04X}: {:<20} ; x{:04X}\n", addr, line, word));
    }

    output.push_str(".END\n");
    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    match instr {
        // Operate
        Instruction::Add { dr, sr1, src2 } => format!("ADD R{}, R{}, {}", dr, sr1, format_operand(src2)),
        Instruction::And { dr, sr1, src2 } => format!("AND R{}, R{}, {}", dr, sr1, format_operand(src2)),
        Instruction::Not { dr, sr } => format!("NOT R{}, R{}", dr, sr),

        // Data movement
        Instruction::Ld { dr, offset } => format!("LD R{}, #{}", dr, offset),
        Instruction::Ldi { dr, offset } => format!("LDI R{}, #{}", dr, offset),
        Instruction::Ldr { dr, base, offset } => format!("LDR R{}, R{}, #{}", dr, base, offset),
        Instruction::Lea { dr, offset } => format!("LEA R{}, #{}", dr, offset),
        Instruction::St { sr, offset } => format!("ST R{}, #{}", sr, offset),
        Instruction::Sti { sr, offset } => format!("STI R{}, #{}", sr, offset),
        Instruction::Str { sr, base, offset } => format!("STR R{}, R{}, #{}", sr, base, offset),

        // Control
        Instruction::Br { nzp: 0, .. } => "NOP".to_string(),
        Instruction::Br { nzp, offset } => format!("BR{} #{}", format_nzp(*nzp), offset),
        Instruction::Jmp { base: 7 } => "RET".to_string(),
        Instruction::Jmp { base } => format!("JMP R{}", base),
        Instruction::Jsr { target: JsrTarget::Offset(offset) } => format!("JSR #{}", offset),
        Instruction::Jsr { target: JsrTarget::Reg(base) } => format!("JSRR R{}", base),
        Instruction::Trap { vector } => match trap_alias(*vector) {
            Some(name) => name.to_string(),
            None => format!("TRAP x{:02X}", vector),
        },
        Instruction::Rti => "RTI".to_string(),
        Instruction::Reserved => "RESERVED".to_string(),
    }
}

fn format_operand(src2: &Operand) -> String {
    match src2 {
        Operand::Reg(r) => format!("R{}", r),
        Operand::Imm(imm) => format!("#{}", imm),
    }
}

fn format_nzp(nzp: u16) -> String {
    let mut s = String::new();
    if nzp & 0b100 != 0 {
        s.push('n');
    }
    if nzp & 0b010 != 0 {
        s.push('z');
    }
    if nzp & 0b001 != 0 {
        s.push('p');
    }
    s
}

/// Standard names for the OS service routines.
fn trap_alias(vector: u8) -> Option<&'static str> {
    match vector {
        0x20 => Some("GETC"),
        0x21 => Some("OUT"),
        0x22 => Some("PUTS"),
        0x23 => Some("IN"),
        0x24 => Some("PUTSP"),
        0x25 => Some("HALT"),
        _ => None,
    }
}
