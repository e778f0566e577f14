//! Tiny instruction encoders used to build test programs.

use crate::cpu::{GteOp, Opcode, RegIdx};

pub use crate::cpu::RegIdx as R;

fn r(special: u32, rs: RegIdx, rt: RegIdx, rd: RegIdx, shift: u32) -> u32 {
    Opcode::r_type(special, rs, rt, rd, shift).word()
}

fn i(op: u32, rs: RegIdx, rt: RegIdx, imm: i32) -> u32 {
    Opcode::i_type(op, rs, rt, imm as u16).word()
}

pub const NOP: u32 = 0;

pub fn brk() -> u32 {
    r(0x0d, R::ZERO, R::ZERO, R::ZERO, 0)
}

pub fn syscall() -> u32 {
    r(0x0c, R::ZERO, R::ZERO, R::ZERO, 0)
}

pub fn sll(rd: RegIdx, rt: RegIdx, shift: u32) -> u32 {
    r(0x00, R::ZERO, rt, rd, shift)
}

pub fn sra(rd: RegIdx, rt: RegIdx, shift: u32) -> u32 {
    r(0x03, R::ZERO, rt, rd, shift)
}

pub fn srlv(rd: RegIdx, rt: RegIdx, rs: RegIdx) -> u32 {
    r(0x06, rs, rt, rd, 0)
}

pub fn jr(rs: RegIdx) -> u32 {
    r(0x08, rs, R::ZERO, R::ZERO, 0)
}

pub fn jalr(rd: RegIdx, rs: RegIdx) -> u32 {
    r(0x09, rs, R::ZERO, rd, 0)
}

pub fn mfhi(rd: RegIdx) -> u32 {
    r(0x10, R::ZERO, R::ZERO, rd, 0)
}

pub fn mflo(rd: RegIdx) -> u32 {
    r(0x12, R::ZERO, R::ZERO, rd, 0)
}

pub fn mult(rs: RegIdx, rt: RegIdx) -> u32 {
    r(0x18, rs, rt, R::ZERO, 0)
}

pub fn multu(rs: RegIdx, rt: RegIdx) -> u32 {
    r(0x19, rs, rt, R::ZERO, 0)
}

pub fn div(rs: RegIdx, rt: RegIdx) -> u32 {
    r(0x1a, rs, rt, R::ZERO, 0)
}

pub fn divu(rs: RegIdx, rt: RegIdx) -> u32 {
    r(0x1b, rs, rt, R::ZERO, 0)
}

pub fn add(rd: RegIdx, rs: RegIdx, rt: RegIdx) -> u32 {
    r(0x20, rs, rt, rd, 0)
}

pub fn addu(rd: RegIdx, rs: RegIdx, rt: RegIdx) -> u32 {
    r(0x21, rs, rt, rd, 0)
}

pub fn sub(rd: RegIdx, rs: RegIdx, rt: RegIdx) -> u32 {
    r(0x22, rs, rt, rd, 0)
}

pub fn slt(rd: RegIdx, rs: RegIdx, rt: RegIdx) -> u32 {
    r(0x2a, rs, rt, rd, 0)
}

pub fn sltu(rd: RegIdx, rs: RegIdx, rt: RegIdx) -> u32 {
    r(0x2b, rs, rt, rd, 0)
}

pub fn bltz(rs: RegIdx, offset: i32) -> u32 {
    i(0x01, rs, R::new(0x00), offset)
}

pub fn bgezal(rs: RegIdx, offset: i32) -> u32 {
    i(0x01, rs, R::new(0x11), offset)
}

/// `addr` is a byte address in the same 256 MiB segment.
pub fn j(addr: u32) -> u32 {
    Opcode::j_type(0x02, addr >> 2).word()
}

pub fn jal(addr: u32) -> u32 {
    Opcode::j_type(0x03, addr >> 2).word()
}

pub fn beq(rs: RegIdx, rt: RegIdx, offset: i32) -> u32 {
    i(0x04, rs, rt, offset)
}

pub fn bne(rs: RegIdx, rt: RegIdx, offset: i32) -> u32 {
    i(0x05, rs, rt, offset)
}

pub fn addi(rt: RegIdx, rs: RegIdx, imm: i32) -> u32 {
    i(0x08, rs, rt, imm)
}

pub fn addiu(rt: RegIdx, rs: RegIdx, imm: i32) -> u32 {
    i(0x09, rs, rt, imm)
}

pub fn sltiu(rt: RegIdx, rs: RegIdx, imm: i32) -> u32 {
    i(0x0b, rs, rt, imm)
}

pub fn ori(rt: RegIdx, rs: RegIdx, imm: u32) -> u32 {
    i(0x0d, rs, rt, imm as i32)
}

pub fn lui(rt: RegIdx, imm: u32) -> u32 {
    i(0x0f, R::ZERO, rt, imm as i32)
}

pub fn lb(rt: RegIdx, offset: i32, base: RegIdx) -> u32 {
    i(0x20, base, rt, offset)
}

pub fn lh(rt: RegIdx, offset: i32, base: RegIdx) -> u32 {
    i(0x21, base, rt, offset)
}

pub fn lwl(rt: RegIdx, offset: i32, base: RegIdx) -> u32 {
    i(0x22, base, rt, offset)
}

pub fn lw(rt: RegIdx, offset: i32, base: RegIdx) -> u32 {
    i(0x23, base, rt, offset)
}

pub fn lbu(rt: RegIdx, offset: i32, base: RegIdx) -> u32 {
    i(0x24, base, rt, offset)
}

pub fn lwr(rt: RegIdx, offset: i32, base: RegIdx) -> u32 {
    i(0x26, base, rt, offset)
}

pub fn sb(rt: RegIdx, offset: i32, base: RegIdx) -> u32 {
    i(0x28, base, rt, offset)
}

pub fn sh(rt: RegIdx, offset: i32, base: RegIdx) -> u32 {
    i(0x29, base, rt, offset)
}

pub fn swl(rt: RegIdx, offset: i32, base: RegIdx) -> u32 {
    i(0x2a, base, rt, offset)
}

pub fn sw(rt: RegIdx, offset: i32, base: RegIdx) -> u32 {
    i(0x2b, base, rt, offset)
}

pub fn swr(rt: RegIdx, offset: i32, base: RegIdx) -> u32 {
    i(0x2e, base, rt, offset)
}

pub fn mfc0(rt: RegIdx, reg: u32) -> u32 {
    Opcode::cop_move(0, 0x0, rt, reg).word()
}

pub fn mtc0(rt: RegIdx, reg: u32) -> u32 {
    Opcode::cop_move(0, 0x4, rt, reg).word()
}

pub fn rfe() -> u32 {
    Opcode::cop_cmd(0, 0x10).word()
}

pub fn mfc2(rt: RegIdx, reg: u32) -> u32 {
    Opcode::cop_move(2, 0x0, rt, reg).word()
}

pub fn cfc2(rt: RegIdx, reg: u32) -> u32 {
    Opcode::cop_move(2, 0x2, rt, reg).word()
}

pub fn mtc2(rt: RegIdx, reg: u32) -> u32 {
    Opcode::cop_move(2, 0x4, rt, reg).word()
}

pub fn ctc2(rt: RegIdx, reg: u32) -> u32 {
    Opcode::cop_move(2, 0x6, rt, reg).word()
}

pub fn cop2(cmd: GteOp) -> u32 {
    Opcode::cop_cmd(2, cmd.word()).word()
}

/// LWC2. `reg` is the GTE data register.
pub fn lwc2(reg: u32, offset: i32, base: RegIdx) -> u32 {
    i(0x32, base, R::new(reg), offset)
}

pub fn swc2(reg: u32, offset: i32, base: RegIdx) -> u32 {
    i(0x3a, base, R::new(reg), offset)
}

/// A word with the op field of COP1.
pub fn cop1() -> u32 {
    0x11 << 26
}
