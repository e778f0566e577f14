//! Decoding and encoding of R3000A instruction words.
//!
//! Every instruction is a single 32-bit word in one of three layouts:
//!
//! - Immediate: 6-bit op, 5-bit rs, 5-bit rt, 16-bit immediate.
//! - Jump: 6-bit op, 26-bit target.
//! - Register: 6-bit op (always 0), 5-bit rs, 5-bit rt, 5-bit rd, 5-bit shift, 6-bit function.
//!
//! Coprocessor instructions reuse the register layout, with the rs field selecting the
//! coprocessor operation and rd naming a coprocessor register.

use r3k_util::Bit;

use super::gte::GteOp;

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Opcode(pub(crate) u32);

impl Opcode {
    pub const NOP: Self = Opcode(0);

    pub const fn new(opcode: u32) -> Self {
        Opcode(opcode)
    }

    pub const fn word(self) -> u32 {
        self.0
    }

    /// Build a register layout instruction. The op field is always 0.
    pub const fn r_type(special: u32, rs: RegIdx, rt: RegIdx, rd: RegIdx, shift: u32) -> Self {
        Opcode(
            (rs.0 as u32) << 21
                | (rt.0 as u32) << 16
                | (rd.0 as u32) << 11
                | (shift & 0x1f) << 6
                | (special & 0x3f)
        )
    }

    /// Build an immediate layout instruction.
    pub const fn i_type(op: u32, rs: RegIdx, rt: RegIdx, imm: u16) -> Self {
        Opcode((op & 0x3f) << 26 | (rs.0 as u32) << 21 | (rt.0 as u32) << 16 | imm as u32)
    }

    /// Build a jump layout instruction. `target` is the word index, not the byte address.
    pub const fn j_type(op: u32, target: u32) -> Self {
        Opcode((op & 0x3f) << 26 | (target & 0x3ff_ffff))
    }

    /// Build a coprocessor move, such as MFC0 or CTC2. `reg` is the coprocessor register.
    pub const fn cop_move(cop: u32, cop_op: u32, rt: RegIdx, reg: u32) -> Self {
        Opcode(
            (0x10 | (cop & 0x3)) << 26
                | (cop_op & 0x1f) << 21
                | (rt.0 as u32) << 16
                | (reg & 0x1f) << 11
        )
    }

    /// Build a coprocessor command. `cmd` is the 25-bit command field.
    pub const fn cop_cmd(cop: u32, cmd: u32) -> Self {
        Opcode((0x10 | (cop & 0x3)) << 26 | 1 << 25 | (cmd & 0x1ff_ffff))
    }

    /// Operation.
    pub fn op(self) -> u32 {
        self.0.bit_range(26, 31)
    }

    /// Function field of register layout instructions.
    pub fn special(self) -> u32 {
        self.0.bit_range(0, 5)
    }

    /// Coprocessor operation. Shares bits with `rs`.
    pub fn cop_op(self) -> u32 {
        self.0.bit_range(21, 25)
    }

    /// Coprocessor register index. Shares bits with `rd`.
    pub fn cop_reg(self) -> u32 {
        self.0.bit_range(11, 15)
    }

    /// The 25-bit coprocessor command field.
    pub fn cop_cmd_field(self) -> u32 {
        self.0.bit_range(0, 24)
    }

    pub fn imm(self) -> u32 {
        self.0.bit_range(0, 15)
    }

    /// Immediate value sign extended to 32 bits.
    pub fn signed_imm(self) -> u32 {
        self.0.bit_range(0, 15) as i16 as u32
    }

    /// Jump target word index.
    pub fn target(self) -> u32 {
        self.0.bit_range(0, 25)
    }

    pub fn shift(self) -> u32 {
        self.0.bit_range(6, 10)
    }

    /// Destination register.
    pub fn rd(self) -> RegIdx {
        RegIdx::new(self.0.bit_range(11, 15))
    }

    /// Target register.
    pub fn rt(self) -> RegIdx {
        RegIdx::new(self.0.bit_range(16, 20))
    }

    /// Source register.
    pub fn rs(self) -> RegIdx {
        RegIdx::new(self.0.bit_range(21, 25))
    }

    /// Branch on greater or equal zero. Used by BCONDZ.
    pub fn bgez(self) -> bool {
        self.0.bit(16)
    }

    /// Link on branch. Used by BCONDZ.
    pub fn update_ra_on_branch(self) -> bool {
        self.0.bit_range(17, 20) == 0x8
    }

    fn fmt_cop(self, f: &mut fmt::Formatter, cop: u32) -> fmt::Result {
        if self.cop_op().bit(4) {
            return match cop {
                0 if self.special() == 0x10 => write!(f, "rfe"),
                2 => write!(f, "{}", GteOp::new(self.cop_cmd_field())),
                _ => write!(f, "cop{cop} {:07x}", self.cop_cmd_field()),
            };
        }

        let name = match self.cop_op() {
            0x0 => "mfc",
            0x2 => "cfc",
            0x4 => "mtc",
            0x6 => "ctc",
            _ => return write!(f, "illegal"),
        };

        write!(f, "{name}{cop} {} ${}", self.rt(), self.cop_reg())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (rs, rt, rd) = (self.rs(), self.rt(), self.rd());
        let simm = self.signed_imm() as i32;

        match self.op() {
            0x0 => match self.special() {
                0x00 if self.0 == 0 => write!(f, "nop"),
                0x00 => write!(f, "sll {rd} {rt} {}", self.shift()),
                0x02 => write!(f, "srl {rd} {rt} {}", self.shift()),
                0x03 => write!(f, "sra {rd} {rt} {}", self.shift()),
                0x04 => write!(f, "sllv {rd} {rt} {rs}"),
                0x06 => write!(f, "srlv {rd} {rt} {rs}"),
                0x07 => write!(f, "srav {rd} {rt} {rs}"),
                0x08 => write!(f, "jr {rs}"),
                0x09 => write!(f, "jalr {rd} {rs}"),
                0x0c => write!(f, "syscall"),
                0x0d => write!(f, "break"),
                0x10 => write!(f, "mfhi {rd}"),
                0x11 => write!(f, "mthi {rs}"),
                0x12 => write!(f, "mflo {rd}"),
                0x13 => write!(f, "mtlo {rs}"),
                0x18 => write!(f, "mult {rs} {rt}"),
                0x19 => write!(f, "multu {rs} {rt}"),
                0x1a => write!(f, "div {rs} {rt}"),
                0x1b => write!(f, "divu {rs} {rt}"),
                0x20 => write!(f, "add {rd} {rs} {rt}"),
                0x21 => write!(f, "addu {rd} {rs} {rt}"),
                0x22 => write!(f, "sub {rd} {rs} {rt}"),
                0x23 => write!(f, "subu {rd} {rs} {rt}"),
                0x24 => write!(f, "and {rd} {rs} {rt}"),
                0x25 => write!(f, "or {rd} {rs} {rt}"),
                0x26 => write!(f, "xor {rd} {rs} {rt}"),
                0x27 => write!(f, "nor {rd} {rs} {rt}"),
                0x2a => write!(f, "slt {rd} {rs} {rt}"),
                0x2b => write!(f, "sltu {rd} {rs} {rt}"),
                _ => write!(f, "illegal"),
            },
            0x01 => {
                let op = match (self.update_ra_on_branch(), self.bgez()) {
                    (true, true) => "bgezal",
                    (true, false) => "bltzal",
                    (false, true) => "bgez",
                    (false, false) => "bltz",
                };
                write!(f, "{op} {rs} {simm}")
            }
            0x02 => write!(f, "j {:08x}", self.target() << 2),
            0x03 => write!(f, "jal {:08x}", self.target() << 2),
            0x04 => write!(f, "beq {rs} {rt} {simm}"),
            0x05 => write!(f, "bne {rs} {rt} {simm}"),
            0x06 => write!(f, "blez {rs} {simm}"),
            0x07 => write!(f, "bgtz {rs} {simm}"),
            0x08 => write!(f, "addi {rt} {rs} {simm}"),
            0x09 => write!(f, "addiu {rt} {rs} {simm}"),
            0x0a => write!(f, "slti {rt} {rs} {simm}"),
            0x0b => write!(f, "sltiu {rt} {rs} {simm}"),
            0x0c => write!(f, "andi {rt} {rs} {:04x}", self.imm()),
            0x0d => write!(f, "ori {rt} {rs} {:04x}", self.imm()),
            0x0e => write!(f, "xori {rt} {rs} {:04x}", self.imm()),
            0x0f => write!(f, "lui {rt} {:04x}", self.imm()),
            op @ 0x10..=0x13 => self.fmt_cop(f, op - 0x10),
            0x20 => write!(f, "lb {rt} {simm}({rs})"),
            0x21 => write!(f, "lh {rt} {simm}({rs})"),
            0x22 => write!(f, "lwl {rt} {simm}({rs})"),
            0x23 => write!(f, "lw {rt} {simm}({rs})"),
            0x24 => write!(f, "lbu {rt} {simm}({rs})"),
            0x25 => write!(f, "lhu {rt} {simm}({rs})"),
            0x26 => write!(f, "lwr {rt} {simm}({rs})"),
            0x28 => write!(f, "sb {rt} {simm}({rs})"),
            0x29 => write!(f, "sh {rt} {simm}({rs})"),
            0x2a => write!(f, "swl {rt} {simm}({rs})"),
            0x2b => write!(f, "sw {rt} {simm}({rs})"),
            0x2e => write!(f, "swr {rt} {simm}({rs})"),
            op @ (0x30..=0x33 | 0x38..=0x3b) => {
                let kind = if op & 0x8 == 0 { "lwc" } else { "swc" };
                write!(f, "{kind}{} ${} {simm}({rs})", op & 0x3, self.0.bit_range(16, 20))
            }
            _ => write!(f, "illegal"),
        }
    }
}

/// Index of a general purpose register.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub struct RegIdx(pub(crate) u8);

impl RegIdx {
    pub const ZERO: Self = Self(0);
    pub const AT: Self = Self(1);
    pub const V0: Self = Self(2);
    pub const V1: Self = Self(3);
    pub const A0: Self = Self(4);
    pub const A1: Self = Self(5);
    pub const A2: Self = Self(6);
    pub const A3: Self = Self(7);
    pub const T0: Self = Self(8);
    pub const T1: Self = Self(9);
    pub const T2: Self = Self(10);
    pub const T3: Self = Self(11);
    pub const T4: Self = Self(12);
    pub const T5: Self = Self(13);
    pub const T6: Self = Self(14);
    pub const T7: Self = Self(15);
    pub const S0: Self = Self(16);
    pub const S1: Self = Self(17);
    pub const S2: Self = Self(18);
    pub const S3: Self = Self(19);
    pub const S4: Self = Self(20);
    pub const S5: Self = Self(21);
    pub const S6: Self = Self(22);
    pub const S7: Self = Self(23);
    pub const T8: Self = Self(24);
    pub const T9: Self = Self(25);
    pub const K0: Self = Self(26);
    pub const K1: Self = Self(27);
    pub const GP: Self = Self(28);
    pub const SP: Self = Self(29);
    pub const FP: Self = Self(30);
    pub const RA: Self = Self(31);

    /// Only the low 5 bits of `idx` are used.
    pub const fn new(idx: u32) -> Self {
        Self((idx & 0x1f) as u8)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RegIdx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${}", REGISTER_NAMES[self.index()])
    }
}

pub const REGISTER_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5", "t6",
    "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp", "fp",
    "ra",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields() {
        let op = Opcode::i_type(0x23, RegIdx::S0, RegIdx::T0, 0xfffc);

        assert_eq!(op.op(), 0x23);
        assert_eq!(op.rs(), RegIdx::S0);
        assert_eq!(op.rt(), RegIdx::T0);
        assert_eq!(op.imm(), 0xfffc);
        assert_eq!(op.signed_imm(), 0xffff_fffc);

        let op = Opcode::r_type(0x03, RegIdx::ZERO, RegIdx::A1, RegIdx::V0, 7);

        assert_eq!(op.op(), 0);
        assert_eq!(op.special(), 0x03);
        assert_eq!(op.rd(), RegIdx::V0);
        assert_eq!(op.shift(), 7);

        let op = Opcode::cop_move(2, 0x6, RegIdx::T3, 58);

        assert_eq!(op.op(), 0x12);
        assert_eq!(op.cop_op(), 0x6);
        assert_eq!(op.cop_reg(), 26);
    }

    #[test]
    fn disassemble() {
        let cases = [
            (Opcode::NOP, "nop"),
            (Opcode::i_type(0x09, RegIdx::ZERO, RegIdx::T0, 0xffff), "addiu $t0 $zero -1"),
            (Opcode::i_type(0x23, RegIdx::S0, RegIdx::T0, 0xfffc), "lw $t0 -4($s0)"),
            (Opcode::i_type(0x01, RegIdx::A0, RegIdx::new(0x11), 4), "bgezal $a0 4"),
            (Opcode::j_type(0x02, 0x8001_0010 >> 2), "j 00010010"),
            (Opcode::cop_move(0, 0x0, RegIdx::T0, 12), "mfc0 $t0 $12"),
            (Opcode::cop_cmd(0, 0x10), "rfe"),
            (Opcode::cop_cmd(2, GteOp::encode(GteOp::RTPS, true, false).word()), "rtps sf"),
            (Opcode::i_type(0x32, RegIdx::S0, RegIdx::new(3), 8), "lwc2 $3 8($s0)"),
            (Opcode::new(0xfc00_0000), "illegal"),
        ];

        for (op, text) in cases {
            assert_eq!(op.to_string(), text);
        }
    }

    /// Build `op` again from its decoded fields.
    fn reencode(op: Opcode) -> Opcode {
        match op.op() {
            0x00 => Opcode::r_type(op.special(), op.rs(), op.rt(), op.rd(), op.shift()),
            0x02 | 0x03 => Opcode::j_type(op.op(), op.target()),
            cop @ 0x10..=0x13 if op.cop_op() & 0x10 != 0 => {
                Opcode::cop_cmd(cop & 0x3, op.cop_cmd_field())
            }
            cop @ 0x10..=0x13 => Opcode::cop_move(cop & 0x3, op.cop_op(), op.rt(), op.cop_reg()),
            _ => Opcode::i_type(op.op(), op.rs(), op.rt(), op.imm() as u16),
        }
    }

    #[test]
    fn reencode_fields() {
        let mut words = vec![0, 0xffff_ffff, 0x8000_0000, 0x0000_0001];
        for op in 0..64 {
            words.extend([op << 26, op << 26 | 0x03ff_ffff, op << 26 | 0x0210_8421]);
        }

        for seed in [0x1234_5678_u32, 0xdead_beef, 0x0bad_f00d, 0x7fff_0001] {
            let mut x = seed;
            for _ in 0..256 {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                words.push(x);
            }
        }

        for word in words {
            let op = Opcode::new(word);

            // The low bits of coprocessor moves aren't decoded.
            let expected = match op.op() {
                0x10..=0x13 if op.cop_op() & 0x10 == 0 => word & !0x7ff,
                _ => word,
            };

            assert_eq!(reencode(op).word(), expected, "{word:08x}");
            assert!(!op.to_string().is_empty(), "{word:08x}");
        }
    }

    #[test]
    fn register_names() {
        assert_eq!(RegIdx::RA.to_string(), "$ra");
        assert_eq!(RegIdx::new(33), RegIdx::AT);
    }
}
