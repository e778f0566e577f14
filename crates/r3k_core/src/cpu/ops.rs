//! Instruction implementations.
//!
//! Every handler reads its operands, returns early if the instruction faults, and otherwise
//! writes its results and moves the program counter to the next instruction itself.

use r3k_util::Bit;

use crate::bus::{AddrUnit, Bus};
use crate::error::Error;

use super::exception::{Exception, Trap};
use super::gte::GteOp;
use super::{Cpu, Opcode, RegIdx};

type OpResult = Result<(), Trap>;

impl<B: Bus> Cpu<B> {
    /// Branch to an offset relative to the delay slot.
    fn branch(&mut self, op: Opcode) {
        let target = self
            .pc
            .wrapping_add(4)
            .wrapping_add(op.signed_imm() << 2);
        self.set_jump(target);
    }

    fn load_addr(&self, op: Opcode) -> u32 {
        self.read_reg(op.rs()).wrapping_add(op.signed_imm())
    }

    /// Write the result of a register layout instruction and move on.
    fn retire(&mut self, rd: RegIdx, val: u32) -> OpResult {
        self.write_reg(rd, val);
        self.advance_pc();
        Ok(())
    }

    /// SLL - Shift left logical.
    pub(super) fn op_sll(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rt()) << op.shift();
        self.retire(op.rd(), val)
    }

    /// SRL - Shift right logical.
    pub(super) fn op_srl(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rt()) >> op.shift();
        self.retire(op.rd(), val)
    }

    /// SRA - Shift right arithmetic.
    pub(super) fn op_sra(&mut self, op: Opcode) -> OpResult {
        let val = (self.read_reg(op.rt()) as i32) >> op.shift();
        self.retire(op.rd(), val as u32)
    }

    /// SLLV - Shift left logical variable.
    pub(super) fn op_sllv(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rt()) << self.read_reg(op.rs()).bit_range(0, 4);
        self.retire(op.rd(), val)
    }

    /// SRLV - Shift right logical variable.
    pub(super) fn op_srlv(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rt()) >> self.read_reg(op.rs()).bit_range(0, 4);
        self.retire(op.rd(), val)
    }

    /// SRAV - Shift right arithmetic variable.
    pub(super) fn op_srav(&mut self, op: Opcode) -> OpResult {
        let val = (self.read_reg(op.rt()) as i32) >> self.read_reg(op.rs()).bit_range(0, 4);
        self.retire(op.rd(), val as u32)
    }

    /// JR - Jump register.
    ///
    /// A misaligned target isn't caught here, but when the instruction at the target is fetched.
    pub(super) fn op_jr(&mut self, op: Opcode) -> OpResult {
        self.set_jump(self.read_reg(op.rs()));
        self.advance_pc();
        Ok(())
    }

    /// JALR - Jump and link register.
    pub(super) fn op_jalr(&mut self, op: Opcode) -> OpResult {
        let target = self.read_reg(op.rs());
        let ret = self.pc.wrapping_add(8);

        self.set_jump(target);
        self.retire(op.rd(), ret)
    }

    fn syscall_trace(&self) {
        let func = self.read_reg(RegIdx::A0);
        let name = match func {
            0 => "no function",
            1 => "enter critical section",
            2 => "exit critical section",
            3 => "change thread",
            _ => "unknown",
        };
        debug!("syscall {func} ({name}) at {:08x}", self.pc);
    }

    /// SYSCALL - Throw a syscall exception.
    pub(super) fn op_syscall(&mut self, _: Opcode) -> OpResult {
        if log_enabled!(log::Level::Debug) {
            self.syscall_trace();
        }
        Err(Exception::Syscall.into())
    }

    /// BREAK - Throw a breakpoint exception.
    pub(super) fn op_break(&mut self, _: Opcode) -> OpResult {
        Err(Exception::Breakpoint.into())
    }

    /// MFHI - Move from high.
    pub(super) fn op_mfhi(&mut self, op: Opcode) -> OpResult {
        self.retire(op.rd(), self.hi)
    }

    /// MTHI - Move to high.
    pub(super) fn op_mthi(&mut self, op: Opcode) -> OpResult {
        self.hi = self.read_reg(op.rs());
        self.advance_pc();
        Ok(())
    }

    /// MFLO - Move from low.
    pub(super) fn op_mflo(&mut self, op: Opcode) -> OpResult {
        self.retire(op.rd(), self.lo)
    }

    /// MTLO - Move to low.
    pub(super) fn op_mtlo(&mut self, op: Opcode) -> OpResult {
        self.lo = self.read_reg(op.rs());
        self.advance_pc();
        Ok(())
    }

    fn set_hi_lo(&mut self, hi: u32, lo: u32) -> OpResult {
        self.hi = hi;
        self.lo = lo;
        self.advance_pc();
        Ok(())
    }

    /// MULT - Signed multiplication.
    pub(super) fn op_mult(&mut self, op: Opcode) -> OpResult {
        let lhs = self.read_reg(op.rs()) as i32;
        let rhs = self.read_reg(op.rt()) as i32;

        let val = (i64::from(lhs) * i64::from(rhs)) as u64;

        self.set_hi_lo((val >> 32) as u32, val as u32)
    }

    /// MULTU - Unsigned multiplication.
    pub(super) fn op_multu(&mut self, op: Opcode) -> OpResult {
        let lhs = self.read_reg(op.rs());
        let rhs = self.read_reg(op.rt());

        let val = u64::from(lhs) * u64::from(rhs);

        self.set_hi_lo((val >> 32) as u32, val as u32)
    }

    /// # DIV - Signed division
    ///
    /// Dividing by zero doesn't trap but gives a fixed result depending on the sign of the
    /// dividend. So does the single overflowing case.
    pub(super) fn op_div(&mut self, op: Opcode) -> OpResult {
        let lhs = self.read_reg(op.rs()) as i32;
        let rhs = self.read_reg(op.rt()) as i32;

        if rhs == 0 {
            let lo: u32 = if lhs < 0 { 1 } else { 0xffff_ffff };
            self.set_hi_lo(lhs as u32, lo)
        } else if rhs == -1 && lhs == i32::MIN {
            self.set_hi_lo(0, 0x8000_0000)
        } else {
            self.set_hi_lo((lhs % rhs) as u32, (lhs / rhs) as u32)
        }
    }

    /// DIVU - Unsigned division.
    pub(super) fn op_divu(&mut self, op: Opcode) -> OpResult {
        let lhs = self.read_reg(op.rs());
        let rhs = self.read_reg(op.rt());

        if rhs == 0 {
            self.set_hi_lo(lhs, 0xffff_ffff)
        } else {
            self.set_hi_lo(lhs % rhs, lhs / rhs)
        }
    }

    /// ADD - Add signed. Traps on overflow.
    pub(super) fn op_add(&mut self, op: Opcode) -> OpResult {
        let lhs = self.read_reg(op.rs()) as i32;
        let rhs = self.read_reg(op.rt()) as i32;

        let val = lhs.checked_add(rhs).ok_or(Exception::ArithmeticOverflow)?;

        self.retire(op.rd(), val as u32)
    }

    /// ADDU - Add unsigned.
    pub(super) fn op_addu(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rs()).wrapping_add(self.read_reg(op.rt()));
        self.retire(op.rd(), val)
    }

    /// SUB - Subtract signed. Traps on overflow.
    pub(super) fn op_sub(&mut self, op: Opcode) -> OpResult {
        let lhs = self.read_reg(op.rs()) as i32;
        let rhs = self.read_reg(op.rt()) as i32;

        let val = lhs.checked_sub(rhs).ok_or(Exception::ArithmeticOverflow)?;

        self.retire(op.rd(), val as u32)
    }

    /// SUBU - Subtract unsigned.
    pub(super) fn op_subu(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rs()).wrapping_sub(self.read_reg(op.rt()));
        self.retire(op.rd(), val)
    }

    /// AND - Bitwise and.
    pub(super) fn op_and(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rs()) & self.read_reg(op.rt());
        self.retire(op.rd(), val)
    }

    /// OR - Bitwise or.
    pub(super) fn op_or(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rs()) | self.read_reg(op.rt());
        self.retire(op.rd(), val)
    }

    /// XOR - Bitwise exclusive or.
    pub(super) fn op_xor(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rs()) ^ self.read_reg(op.rt());
        self.retire(op.rd(), val)
    }

    /// NOR - Bitwise not or.
    pub(super) fn op_nor(&mut self, op: Opcode) -> OpResult {
        let val = !(self.read_reg(op.rs()) | self.read_reg(op.rt()));
        self.retire(op.rd(), val)
    }

    /// SLT - Set if less than.
    pub(super) fn op_slt(&mut self, op: Opcode) -> OpResult {
        let val = (self.read_reg(op.rs()) as i32) < (self.read_reg(op.rt()) as i32);
        self.retire(op.rd(), val as u32)
    }

    /// SLTU - Set if less than unsigned.
    pub(super) fn op_sltu(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rs()) < self.read_reg(op.rt());
        self.retire(op.rd(), val as u32)
    }

    /// # BCONDZ - Conditional branching
    ///
    /// Four branch instructions share this opcode. Bit 16 selects between branching on less than
    /// zero and greater or equal zero. If bits 17..20 equal 0x8, the return address is written to
    /// $ra whether or not the branch is taken.
    ///
    /// - BLTZ: Branch if less than zero.
    /// - BLTZAL: Branch if less than zero and link.
    /// - BGEZ: Branch if greater than or equal to zero.
    /// - BGEZAL: Branch if greater than or equal to zero and link.
    pub(super) fn op_bcondz(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rs()) as i32;
        let taken = (val < 0) ^ op.bgez();

        if op.update_ra_on_branch() {
            self.write_reg(RegIdx::RA, self.pc.wrapping_add(8));
        }

        if taken {
            self.branch(op);
        }

        self.advance_pc();
        Ok(())
    }

    /// J - Jump.
    pub(super) fn op_j(&mut self, op: Opcode) -> OpResult {
        let region = self.pc.wrapping_add(4) & 0xf000_0000;
        self.set_jump(region | (op.target() << 2));
        self.advance_pc();
        Ok(())
    }

    /// JAL - Jump and link.
    pub(super) fn op_jal(&mut self, op: Opcode) -> OpResult {
        self.write_reg(RegIdx::RA, self.pc.wrapping_add(8));
        self.op_j(op)
    }

    fn branch_if(&mut self, op: Opcode, cond: bool) -> OpResult {
        if cond {
            self.branch(op);
        }
        self.advance_pc();
        Ok(())
    }

    /// BEQ - Branch if equal.
    pub(super) fn op_beq(&mut self, op: Opcode) -> OpResult {
        let cond = self.read_reg(op.rs()) == self.read_reg(op.rt());
        self.branch_if(op, cond)
    }

    /// BNE - Branch if not equal.
    pub(super) fn op_bne(&mut self, op: Opcode) -> OpResult {
        let cond = self.read_reg(op.rs()) != self.read_reg(op.rt());
        self.branch_if(op, cond)
    }

    /// BLEZ - Branch if less than or equal to zero.
    pub(super) fn op_blez(&mut self, op: Opcode) -> OpResult {
        let cond = (self.read_reg(op.rs()) as i32) <= 0;
        self.branch_if(op, cond)
    }

    /// BGTZ - Branch if greater than zero.
    pub(super) fn op_bgtz(&mut self, op: Opcode) -> OpResult {
        let cond = (self.read_reg(op.rs()) as i32) > 0;
        self.branch_if(op, cond)
    }

    /// ADDI - Add immediate signed. Traps on overflow.
    pub(super) fn op_addi(&mut self, op: Opcode) -> OpResult {
        let val = (self.read_reg(op.rs()) as i32)
            .checked_add(op.signed_imm() as i32)
            .ok_or(Exception::ArithmeticOverflow)?;

        self.retire(op.rt(), val as u32)
    }

    /// # ADDIU - Add immediate unsigned
    ///
    /// The immediate is still sign extended. Unsigned only means that it wraps on overflow.
    pub(super) fn op_addiu(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rs()).wrapping_add(op.signed_imm());
        self.retire(op.rt(), val)
    }

    /// SLTI - Set if less than immediate signed.
    pub(super) fn op_slti(&mut self, op: Opcode) -> OpResult {
        let val = (self.read_reg(op.rs()) as i32) < (op.signed_imm() as i32);
        self.retire(op.rt(), val as u32)
    }

    /// SLTIU - Set if less than sign extended immediate, compared unsigned.
    pub(super) fn op_sltiu(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rs()) < op.signed_imm();
        self.retire(op.rt(), val as u32)
    }

    /// ANDI - Bitwise and immediate.
    pub(super) fn op_andi(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rs()) & op.imm();
        self.retire(op.rt(), val)
    }

    /// ORI - Bitwise or immediate.
    pub(super) fn op_ori(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rs()) | op.imm();
        self.retire(op.rt(), val)
    }

    /// XORI - Bitwise exclusive or immediate.
    pub(super) fn op_xori(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rs()) ^ op.imm();
        self.retire(op.rt(), val)
    }

    /// LUI - Load upper immediate.
    pub(super) fn op_lui(&mut self, op: Opcode) -> OpResult {
        self.retire(op.rt(), op.imm() << 16)
    }

    /// COP0 - System control coprocessor instruction.
    pub(super) fn op_cop0(&mut self, op: Opcode) -> OpResult {
        match op.cop_op() {
            // MFC0 - Move from coprocessor 0.
            0x0 => {
                let index = op.cop_reg();
                let val = self
                    .cop0
                    .read(index)
                    .ok_or(Error::Cop0Read { index, pc: self.pc })?;

                self.delay_load(op.rt(), val);
            }
            // MTC0 - Move to coprocessor 0.
            0x4 => {
                let index = op.cop_reg();
                let val = self.read_reg(op.rt());

                self.cop0
                    .write(index, val)
                    .ok_or(Error::Cop0Write { index, val, pc: self.pc })?;
            }
            // RFE - Return from exception.
            0x10 if op.special() == 0x10 => self.cop0.exit_exception(),
            _ => return Err(Exception::ReservedInstruction.into()),
        }

        self.advance_pc();
        Ok(())
    }

    /// COP2 - Geometry transformation engine instruction.
    pub(super) fn op_cop2(&mut self, op: Opcode) -> OpResult {
        if op.cop_op().bit(4) {
            let cmd = GteOp::new(op.cop_cmd_field());

            if let Err(ex) = self.gte.exec(cmd) {
                warn!("unknown gte command {:02x} at {:08x}", cmd.cmd(), self.pc);
                return Err(ex.into());
            }

            self.advance_pc();
            return Ok(());
        }

        let reg = op.cop_reg() as usize;
        let rt = op.rt();

        match op.cop_op() {
            // MFC2 - Move from data register.
            0x0 => {
                let val = self.gte.read(reg);
                self.delay_load(rt, val);
            }
            // CFC2 - Move from control register.
            0x2 => {
                let val = self.gte.read(reg + 32);
                self.delay_load(rt, val);
            }
            // MTC2 - Move to data register.
            0x4 => {
                let val = self.read_reg(rt);
                self.gte.write(reg, val);
            }
            // CTC2 - Move to control register.
            0x6 => {
                let val = self.read_reg(rt);
                self.gte.write(reg + 32, val);
            }
            _ => return Err(Exception::ReservedInstruction.into()),
        }

        self.advance_pc();
        Ok(())
    }

    /// COP1, COP3 and the load and store instructions for coprocessors other than the GTE.
    /// None of them are present.
    pub(super) fn op_cop_unusable(&mut self, _: Opcode) -> OpResult {
        Err(Exception::CopUnusable.into())
    }

    fn finish_load(&mut self, rt: RegIdx, val: u32) -> OpResult {
        self.delay_load(rt, val);
        self.advance_pc();
        Ok(())
    }

    /// LB - Load byte.
    pub(super) fn op_lb(&mut self, op: Opcode) -> OpResult {
        let val = self.load::<u8>(self.load_addr(op))? as i8;
        self.finish_load(op.rt(), val as u32)
    }

    /// LH - Load half word.
    pub(super) fn op_lh(&mut self, op: Opcode) -> OpResult {
        let val = self.load::<u16>(self.load_addr(op))? as i16;
        self.finish_load(op.rt(), val as u32)
    }

    /// LW - Load word.
    pub(super) fn op_lw(&mut self, op: Opcode) -> OpResult {
        let val = self.load::<u32>(self.load_addr(op))?;
        self.finish_load(op.rt(), val)
    }

    /// LBU - Load byte unsigned.
    pub(super) fn op_lbu(&mut self, op: Opcode) -> OpResult {
        let val = self.load::<u8>(self.load_addr(op))?;
        self.finish_load(op.rt(), val.into())
    }

    /// LHU - Load half word unsigned.
    pub(super) fn op_lhu(&mut self, op: Opcode) -> OpResult {
        let val = self.load::<u16>(self.load_addr(op))?;
        self.finish_load(op.rt(), val.into())
    }

    /// # LWL - Load word left
    ///
    /// Loads the most significant bytes of an unaligned word. The bytes are merged into the
    /// current value of the target register, which includes a load still in the delay slot. This
    /// makes an LWL and LWR pair behave as a single unaligned load.
    pub(super) fn op_lwl(&mut self, op: Opcode) -> OpResult {
        let addr = self.load_addr(op);
        let word = self.load::<u32>(addr & !0x3)?;

        let val = self.pending_reg(op.rt());
        let val = match addr & 0x3 {
            0 => (val & 0x00ff_ffff) | (word << 24),
            1 => (val & 0x0000_ffff) | (word << 16),
            2 => (val & 0x0000_00ff) | (word << 8),
            _ => word,
        };

        self.finish_load(op.rt(), val)
    }

    /// # LWR - Load word right
    ///
    /// See [`Self::op_lwl`].
    pub(super) fn op_lwr(&mut self, op: Opcode) -> OpResult {
        let addr = self.load_addr(op);
        let word = self.load::<u32>(addr & !0x3)?;

        let val = self.pending_reg(op.rt());
        let val = match addr & 0x3 {
            0 => word,
            1 => (val & 0xff00_0000) | (word >> 8),
            2 => (val & 0xffff_0000) | (word >> 16),
            _ => (val & 0xffff_ff00) | (word >> 24),
        };

        self.finish_load(op.rt(), val)
    }

    fn finish_store<T: AddrUnit>(&mut self, addr: u32, val: T) -> OpResult {
        self.store::<T>(addr, val)?;
        self.advance_pc();
        Ok(())
    }

    /// SB - Store byte.
    pub(super) fn op_sb(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rt()) as u8;
        self.finish_store(self.load_addr(op), val)
    }

    /// SH - Store half word.
    pub(super) fn op_sh(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rt()) as u16;
        self.finish_store(self.load_addr(op), val)
    }

    /// SW - Store word.
    pub(super) fn op_sw(&mut self, op: Opcode) -> OpResult {
        let val = self.read_reg(op.rt());
        self.finish_store(self.load_addr(op), val)
    }

    /// # SWL - Store word left
    ///
    /// Stores the most significant bytes of a register to an unaligned address. The counterpart
    /// of [`Self::op_lwl`].
    pub(super) fn op_swl(&mut self, op: Opcode) -> OpResult {
        let addr = self.load_addr(op);
        let aligned = addr & !0x3;

        let val = self.read_reg(op.rt());
        let word = self.load::<u32>(aligned)?;

        let val = match addr & 0x3 {
            0 => (word & 0xffff_ff00) | (val >> 24),
            1 => (word & 0xffff_0000) | (val >> 16),
            2 => (word & 0xff00_0000) | (val >> 8),
            _ => val,
        };

        self.finish_store(aligned, val)
    }

    /// # SWR - Store word right
    ///
    /// See [`Self::op_swl`].
    pub(super) fn op_swr(&mut self, op: Opcode) -> OpResult {
        let addr = self.load_addr(op);
        let aligned = addr & !0x3;

        let val = self.read_reg(op.rt());
        let word = self.load::<u32>(aligned)?;

        let val = match addr & 0x3 {
            0 => val,
            1 => (word & 0x0000_00ff) | (val << 8),
            2 => (word & 0x0000_ffff) | (val << 16),
            _ => (word & 0x00ff_ffff) | (val << 24),
        };

        self.finish_store(aligned, val)
    }

    /// LWC2 - Load word into a GTE data register.
    pub(super) fn op_lwc2(&mut self, op: Opcode) -> OpResult {
        let val = self.load::<u32>(self.load_addr(op))?;

        self.gte.write(op.rt().index(), val);
        self.advance_pc();

        Ok(())
    }

    /// SWC2 - Store word from a GTE data register.
    pub(super) fn op_swc2(&mut self, op: Opcode) -> OpResult {
        let val = self.gte.read(op.rt().index());
        self.finish_store(self.load_addr(op), val)
    }

    /// Reserved or unknown instruction.
    pub(super) fn op_reserved(&mut self, op: Opcode) -> OpResult {
        debug!("reserved instruction {:08x} at {:08x}", op.word(), self.pc);
        Err(Exception::ReservedInstruction.into())
    }
}
