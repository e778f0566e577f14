use r3k_util::Bit;

use std::fmt;

/// The 25 bit command field of a GTE instruction.
///
/// | Bits  | Field | Usage                                         |
/// |-------|-------|-----------------------------------------------|
/// | 0-5   | cmd   | Command number                                |
/// | 10    | lm    | Clamp IR results at 0 instead of -0x8000      |
/// | 13-14 | tx    | MVMVA translation vector                      |
/// | 15-16 | vx    | MVMVA multiply vector                         |
/// | 17-18 | mx    | MVMVA matrix                                  |
/// | 19    | sf    | Shift results right by 12                     |
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GteOp(u32);

impl GteOp {
    pub const RTPS: u32 = 0x01;
    pub const NCLIP: u32 = 0x06;
    pub const OP: u32 = 0x0c;
    pub const DPCS: u32 = 0x10;
    pub const INTPL: u32 = 0x11;
    pub const MVMVA: u32 = 0x12;
    pub const NCDS: u32 = 0x13;
    pub const CDP: u32 = 0x14;
    pub const NCDT: u32 = 0x16;
    pub const NCCS: u32 = 0x1b;
    pub const CC: u32 = 0x1c;
    pub const NCS: u32 = 0x1e;
    pub const NCT: u32 = 0x20;
    pub const SQR: u32 = 0x28;
    pub const DCPL: u32 = 0x29;
    pub const DPCT: u32 = 0x2a;
    pub const AVSZ3: u32 = 0x2d;
    pub const AVSZ4: u32 = 0x2e;
    pub const RTPT: u32 = 0x30;
    pub const GPF: u32 = 0x3d;
    pub const GPL: u32 = 0x3e;
    pub const NCCT: u32 = 0x3f;

    pub fn new(val: u32) -> Self {
        Self(val & 0x1ff_ffff)
    }

    /// Assemble a command field.
    pub const fn encode(cmd: u32, sf: bool, lm: bool) -> Self {
        Self((cmd & 0x3f) | (lm as u32) << 10 | (sf as u32) << 19)
    }

    /// Assemble an MVMVA command field.
    pub const fn mvmva(sf: bool, lm: bool, mx: u32, vx: u32, tx: u32) -> Self {
        let base = Self::encode(Self::MVMVA, sf, lm).0;
        Self(base | (tx & 0x3) << 13 | (vx & 0x3) << 15 | (mx & 0x3) << 17)
    }

    pub fn word(self) -> u32 {
        self.0
    }

    pub fn cmd(self) -> u32 {
        self.0.bit_range(0, 5)
    }

    /// If IR results saturate at 0 rather than -0x8000.
    pub fn lm(self) -> bool {
        self.0.bit(10)
    }

    /// Number of bits results are shifted right by, either 0 or 12.
    pub fn sf(self) -> u32 {
        self.0.bit(19) as u32 * 12
    }

    pub fn tx(self) -> u32 {
        self.0.bit_range(13, 14)
    }

    pub fn vx(self) -> u32 {
        self.0.bit_range(15, 16)
    }

    pub fn mx(self) -> u32 {
        self.0.bit_range(17, 18)
    }

    pub fn name(self) -> Option<&'static str> {
        let name = match self.cmd() {
            Self::RTPS => "rtps",
            Self::NCLIP => "nclip",
            Self::OP => "op",
            Self::DPCS => "dpcs",
            Self::INTPL => "intpl",
            Self::MVMVA => "mvmva",
            Self::NCDS => "ncds",
            Self::CDP => "cdp",
            Self::NCDT => "ncdt",
            Self::NCCS => "nccs",
            Self::CC => "cc",
            Self::NCS => "ncs",
            Self::NCT => "nct",
            Self::SQR => "sqr",
            Self::DCPL => "dcpl",
            Self::DPCT => "dpct",
            Self::AVSZ3 => "avsz3",
            Self::AVSZ4 => "avsz4",
            Self::RTPT => "rtpt",
            Self::GPF => "gpf",
            Self::GPL => "gpl",
            Self::NCCT => "ncct",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for GteOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Some(name) = self.name() else {
            return write!(f, "cop2 {:07x}", self.0);
        };

        f.write_str(name)?;

        if self.cmd() == Self::MVMVA {
            write!(f, " mx={} vx={} tx={}", self.mx(), self.vx(), self.tx())?;
        }
        if self.sf() != 0 {
            f.write_str(" sf")?;
        }
        if self.lm() {
            f.write_str(" lm")?;
        }

        Ok(())
    }
}

#[test]
fn fields() {
    let op = GteOp::mvmva(true, false, 3, 1, 2);

    assert_eq!(op.cmd(), GteOp::MVMVA);
    assert_eq!(op.sf(), 12);
    assert!(!op.lm());
    assert_eq!((op.mx(), op.vx(), op.tx()), (3, 1, 2));
    assert_eq!(op.to_string(), "mvmva mx=3 vx=1 tx=2 sf");

    let op = GteOp::encode(GteOp::NCDS, false, true);
    assert_eq!(op.word(), 0x0000_0413);
    assert_eq!(op.to_string(), "ncds lm");

    assert_eq!(GteOp::new(0x3e0_0001).word(), 0x1e0_0001);
    assert_eq!(GteOp::new(0x02).to_string(), "cop2 0000002");
}
