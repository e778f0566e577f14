//! Opcode dispatch.
//!
//! Two tables of handlers, one indexed by the op field and one by the function field of SPECIAL
//! instructions. Every slot not filled in raises a reserved instruction exception.

use crate::bus::Bus;

use super::exception::Trap;
use super::{Cpu, Opcode};

type Handler<B> = fn(&mut Cpu<B>, Opcode) -> Result<(), Trap>;

impl<B: Bus> Cpu<B> {
    const PRIMARY: [Handler<B>; 64] = {
        let mut table = [Self::op_reserved as Handler<B>; 64];

        table[0x00] = Self::op_special;
        table[0x01] = Self::op_bcondz;
        table[0x02] = Self::op_j;
        table[0x03] = Self::op_jal;
        table[0x04] = Self::op_beq;
        table[0x05] = Self::op_bne;
        table[0x06] = Self::op_blez;
        table[0x07] = Self::op_bgtz;
        table[0x08] = Self::op_addi;
        table[0x09] = Self::op_addiu;
        table[0x0a] = Self::op_slti;
        table[0x0b] = Self::op_sltiu;
        table[0x0c] = Self::op_andi;
        table[0x0d] = Self::op_ori;
        table[0x0e] = Self::op_xori;
        table[0x0f] = Self::op_lui;

        table[0x10] = Self::op_cop0;
        table[0x11] = Self::op_cop_unusable;
        table[0x12] = Self::op_cop2;
        table[0x13] = Self::op_cop_unusable;

        table[0x20] = Self::op_lb;
        table[0x21] = Self::op_lh;
        table[0x22] = Self::op_lwl;
        table[0x23] = Self::op_lw;
        table[0x24] = Self::op_lbu;
        table[0x25] = Self::op_lhu;
        table[0x26] = Self::op_lwr;
        table[0x28] = Self::op_sb;
        table[0x29] = Self::op_sh;
        table[0x2a] = Self::op_swl;
        table[0x2b] = Self::op_sw;
        table[0x2e] = Self::op_swr;

        table[0x30] = Self::op_cop_unusable;
        table[0x31] = Self::op_cop_unusable;
        table[0x32] = Self::op_lwc2;
        table[0x33] = Self::op_cop_unusable;
        table[0x38] = Self::op_cop_unusable;
        table[0x39] = Self::op_cop_unusable;
        table[0x3a] = Self::op_swc2;
        table[0x3b] = Self::op_cop_unusable;

        table
    };

    const SPECIAL: [Handler<B>; 64] = {
        let mut table = [Self::op_reserved as Handler<B>; 64];

        table[0x00] = Self::op_sll;
        table[0x02] = Self::op_srl;
        table[0x03] = Self::op_sra;
        table[0x04] = Self::op_sllv;
        table[0x06] = Self::op_srlv;
        table[0x07] = Self::op_srav;
        table[0x08] = Self::op_jr;
        table[0x09] = Self::op_jalr;
        table[0x0c] = Self::op_syscall;
        table[0x0d] = Self::op_break;
        table[0x10] = Self::op_mfhi;
        table[0x11] = Self::op_mthi;
        table[0x12] = Self::op_mflo;
        table[0x13] = Self::op_mtlo;
        table[0x18] = Self::op_mult;
        table[0x19] = Self::op_multu;
        table[0x1a] = Self::op_div;
        table[0x1b] = Self::op_divu;
        table[0x20] = Self::op_add;
        table[0x21] = Self::op_addu;
        table[0x22] = Self::op_sub;
        table[0x23] = Self::op_subu;
        table[0x24] = Self::op_and;
        table[0x25] = Self::op_or;
        table[0x26] = Self::op_xor;
        table[0x27] = Self::op_nor;
        table[0x2a] = Self::op_slt;
        table[0x2b] = Self::op_sltu;

        table
    };

    /// Execute a single instruction.
    pub(super) fn execute(&mut self, op: Opcode) -> Result<(), Trap> {
        Self::PRIMARY[op.op() as usize](self, op)
    }

    /// SPECIAL - Register layout instructions, dispatched on the function field.
    fn op_special(&mut self, op: Opcode) -> Result<(), Trap> {
        Self::SPECIAL[op.special() as usize](self, op)
    }
}
