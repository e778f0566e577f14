//! # Register file
//!
//! The GTE has 32 data registers (0..31), accessed with MFC2, MTC2, LWC2 and SWC2, and 32 control
//! registers, accessed with CFC2 and CTC2. Here they share a single index space with the control
//! registers at 32..63.
//!
//! Most registers hold either a single 32 bit value or two packed 16 bit values. A few derive
//! their value from others when read or have side effects when written, which is all described
//! by [`RULES`].

use r3k_util::{Bit, SignExtend};

use crate::error::Error;

use super::math::{leading_sign_bits, Flags};
use super::Gte;

pub const VXY0: usize = 0;
pub const VZ0: usize = 1;
pub const RGBC: usize = 6;
pub const OTZ: usize = 7;
pub const IR0: usize = 8;
pub const IR1: usize = 9;
pub const SXY0: usize = 12;
pub const SXY1: usize = 13;
pub const SXY2: usize = 14;
pub const SXYP: usize = 15;
pub const SZ0: usize = 16;
pub const RGB0: usize = 20;
pub const MAC0: usize = 24;
pub const MAC1: usize = 25;
pub const IRGB: usize = 28;
pub const ORGB: usize = 29;
pub const LZCS: usize = 30;
pub const LZCR: usize = 31;

pub const RT: usize = 32;
pub const TR: usize = 37;
pub const LLM: usize = 40;
pub const BK: usize = 45;
pub const LCM: usize = 48;
pub const FC: usize = 53;
pub const OFX: usize = 56;
pub const OFY: usize = 57;
pub const H: usize = 58;
pub const DQA: usize = 59;
pub const DQB: usize = 60;
pub const ZSF3: usize = 61;
pub const ZSF4: usize = 62;
pub const FLAG: usize = 63;

pub const REGISTER_NAMES: [&str; 64] = [
    "vxy0", "vz0", "vxy1", "vz1", "vxy2", "vz2", "rgbc", "otz",
    "ir0", "ir1", "ir2", "ir3", "sxy0", "sxy1", "sxy2", "sxyp",
    "sz0", "sz1", "sz2", "sz3", "rgb0", "rgb1", "rgb2", "res1",
    "mac0", "mac1", "mac2", "mac3", "irgb", "orgb", "lzcs", "lzcr",
    "rt11rt12", "rt13rt21", "rt22rt23", "rt31rt32", "rt33", "trx", "try", "trz",
    "l11l12", "l13l21", "l22l23", "l31l32", "l33", "rbk", "gbk", "bbk",
    "lr1lr2", "lr3lg1", "lg2lg3", "lb1lb2", "lb3", "rfc", "gfc", "bfc",
    "ofx", "ofy", "h", "dqa", "dqb", "zsf3", "zsf4", "flag",
];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ReadRule {
    Raw,
    /// Sign extend the low 16 bits.
    SignExtend,
    /// Read another register.
    Mirror(usize),
    /// IR1..3 packed into 5:5:5 color.
    PackIr,
    Flags,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum WriteRule {
    Raw,
    /// Sign extend the low 16 bits.
    SignExtend,
    /// Keep only the low 16 bits.
    Mask16,
    /// Push onto the screen XY FIFO.
    PushSxy,
    /// Expand 5:5:5 color into IR1..3.
    UnpackIr,
    /// Store and count leading sign bits into LZCR.
    CountSign,
    Ignore,
    Flags,
}

const RULES: [(ReadRule, WriteRule); 64] = {
    let mut table = [(ReadRule::Raw, WriteRule::Raw); 64];

    let mut i = 0;
    while i < 64 {
        table[i] = match i {
            1 | 3 | 5 | 9 | 10 | 11 => (ReadRule::SignExtend, WriteRule::SignExtend),
            8 | 36 | 44 | 52 | 59 | 61 | 62 => (ReadRule::Raw, WriteRule::SignExtend),
            7 | 16..=19 => (ReadRule::Raw, WriteRule::Mask16),
            // H is unsigned, but reads sign extend anyway.
            H => (ReadRule::SignExtend, WriteRule::Mask16),
            SXYP => (ReadRule::Mirror(SXY2), WriteRule::PushSxy),
            IRGB => (ReadRule::PackIr, WriteRule::UnpackIr),
            ORGB => (ReadRule::PackIr, WriteRule::Ignore),
            LZCS => (ReadRule::Raw, WriteRule::CountSign),
            LZCR => (ReadRule::Raw, WriteRule::Ignore),
            FLAG => (ReadRule::Flags, WriteRule::Flags),
            _ => (ReadRule::Raw, WriteRule::Raw),
        };
        i += 1;
    }

    table
};

/// Pack an IR value into a 5 bit color component.
fn pack_component(ir: u32) -> u32 {
    (ir as i16).clamp(0, 0xf80) as u32 >> 7
}

impl Gte {
    /// Read register `index`, which must be below 64.
    pub(crate) fn read(&self, index: usize) -> u32 {
        match RULES[index].0 {
            ReadRule::Raw => self.regs[index],
            ReadRule::SignExtend => self.regs[index].sign_extend(16),
            ReadRule::Mirror(other) => self.regs[other],
            ReadRule::PackIr => {
                let [r, g, b] = [0, 1, 2].map(|i| pack_component(self.regs[IR1 + i]));
                r | g << 5 | b << 10
            }
            ReadRule::Flags => self.flags.bits(),
        }
    }

    /// Write register `index`, which must be below 64.
    pub(crate) fn write(&mut self, index: usize, val: u32) {
        match RULES[index].1 {
            WriteRule::Raw => self.regs[index] = val,
            WriteRule::SignExtend => self.regs[index] = val.sign_extend(16),
            WriteRule::Mask16 => self.regs[index] = val & 0xffff,
            WriteRule::PushSxy => self.push_sxy(val),
            WriteRule::UnpackIr => {
                self.regs[index] = val;
                for i in 0..3 {
                    self.regs[IR1 + i] = val.bit_range(i * 5, i * 5 + 4) * 0x80;
                }
            }
            WriteRule::CountSign => {
                self.regs[index] = val;
                self.regs[LZCR] = leading_sign_bits(val);
            }
            WriteRule::Ignore => {
                trace!("write of {val:08x} to gte register {} dropped", REGISTER_NAMES[index]);
            }
            WriteRule::Flags => self.flags = Flags::new(val),
        }
    }

    /// Read a register the way the MFC2 and CFC2 instructions would, with control registers at
    /// `32..64`.
    pub fn read_reg(&self, index: u32) -> Result<u32, Error> {
        if index >= 64 {
            return Err(Error::GteIndex(index));
        }
        Ok(self.read(index as usize))
    }

    /// Write a register the way the MTC2 and CTC2 instructions would.
    pub fn write_reg(&mut self, index: u32, val: u32) -> Result<(), Error> {
        if index >= 64 {
            return Err(Error::GteIndex(index));
        }
        self.write(index as usize, val);
        Ok(())
    }

    /// Push `val` onto the screen XY FIFO.
    pub(super) fn push_sxy(&mut self, val: u32) {
        self.regs[SXY0] = self.regs[SXY1];
        self.regs[SXY1] = self.regs[SXY2];
        self.regs[SXY2] = val;
    }
}
