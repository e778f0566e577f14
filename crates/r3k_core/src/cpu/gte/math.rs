//! Fixed point helpers shared by the GTE commands: saturation, overflow detection and the
//! unsigned Newton-Raphson divider used by perspective projection.

use r3k_util::BitSet;

/// Saturation of IR1, IR2 and IR3.
pub const IR_SAT: [usize; 3] = [24, 23, 22];
/// Saturation of the color FIFO components.
pub const COLOR_SAT: [usize; 3] = [21, 20, 19];
/// Positive overflow of MAC1, MAC2 and MAC3.
pub const MAC_POS: [usize; 3] = [30, 29, 28];
/// Negative overflow of MAC1, MAC2 and MAC3.
pub const MAC_NEG: [usize; 3] = [27, 26, 25];
pub const SZ_SAT: usize = 18;
pub const DIV_OVERFLOW: usize = 17;
pub const MAC0_POS: usize = 16;
pub const MAC0_NEG: usize = 15;
pub const SX_SAT: usize = 14;
pub const SY_SAT: usize = 13;
pub const IR0_SAT: usize = 12;

/// Bits of the flag register that may be written by the guest.
pub const FLAG_WRITE_MASK: u32 = 0x7fff_f000;

/// Bits summarized by the error bit 31.
pub const FLAG_ERROR_MASK: u32 = 0x7f87_e000;

/// The flag register. Bits are only ever set while a command runs, and cleared when the next
/// one starts.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub struct Flags(u32);

impl Flags {
    pub fn new(bits: u32) -> Self {
        Self(bits & FLAG_WRITE_MASK)
    }

    #[inline]
    pub fn set(&mut self, flag: usize) {
        self.0 = self.0.set_bit(flag, true);
    }

    #[inline]
    pub fn set_if(&mut self, flag: usize, cond: bool) {
        if cond {
            self.set(flag);
        }
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// The register as read by the guest, with the summary bit included.
    pub fn bits(self) -> u32 {
        if self.0 & FLAG_ERROR_MASK != 0 {
            self.0 | (1 << 31)
        } else {
            self.0
        }
    }
}

/// Check a MAC1..3 intermediate against the 44 bit accumulator range. `idx` is 0 for MAC1.
#[inline]
pub fn check_mac_overflow(flags: &mut Flags, idx: usize, val: i64) {
    flags.set_if(MAC_POS[idx], val > (1 << 43) - 1);
    flags.set_if(MAC_NEG[idx], val < -(1 << 43));
}

/// Wrap `val` to the 44 bit width of MAC1..3.
#[inline]
pub fn wrap_mac(val: i64) -> i64 {
    (val << 20) >> 20
}

#[inline]
pub fn check_mac0_overflow(flags: &mut Flags, val: i64) {
    flags.set_if(MAC0_POS, val > i64::from(i32::MAX));
    flags.set_if(MAC0_NEG, val < i64::from(i32::MIN));
}

/// Saturate `val` into IR1..3. The lower bound is 0 if `lm` is set.
#[inline]
pub fn lim_a(flags: &mut Flags, idx: usize, val: i32, lm: bool) -> i16 {
    let min = if lm { 0 } else { -0x8000 };
    flags.set_if(IR_SAT[idx], !(min..=0x7fff).contains(&val));
    val.clamp(min, 0x7fff) as i16
}

/// Saturation of IR3 during RTPS and RTPT. `mac` is the accumulator before the shift by `sf`.
/// Overflow is judged on `mac >> 12` regardless of `sf`, and a negative clamp only raises the
/// flag when `sf` is set.
#[inline]
pub fn lim_a_sf(flags: &mut Flags, mac: i64, sf: u32, lm: bool) -> i16 {
    let shifted = (mac >> sf) as i32;
    let unshifted = (mac >> 12) as i32;

    flags.set_if(IR_SAT[2], !(-0x8000..=0x7fff).contains(&unshifted));

    let min = if lm { 0 } else { -0x8000 };
    if shifted > 0x7fff {
        flags.set(IR_SAT[2]);
        0x7fff
    } else if shifted < min {
        flags.set_if(IR_SAT[2], sf != 0);
        min as i16
    } else {
        shifted as i16
    }
}

/// Saturate `val` to a color component.
#[inline]
pub fn lim_b(flags: &mut Flags, idx: usize, val: i32) -> u8 {
    flags.set_if(COLOR_SAT[idx], !(0..=0xff).contains(&val));
    val.clamp(0, 0xff) as u8
}

/// Saturate `val` to a depth value.
#[inline]
pub fn lim_c(flags: &mut Flags, val: i32) -> u16 {
    flags.set_if(SZ_SAT, !(0..=0xffff).contains(&val));
    val.clamp(0, 0xffff) as u16
}

/// Saturate `val` to IR0.
#[inline]
pub fn lim_e(flags: &mut Flags, val: i64) -> i16 {
    flags.set_if(IR0_SAT, !(0..=0x1000).contains(&val));
    val.clamp(0, 0x1000) as i16
}

/// Saturate a screen coordinate. `flag` is either [`SX_SAT`] or [`SY_SAT`].
#[inline]
pub fn lim_xy(flags: &mut Flags, flag: usize, val: i32) -> i16 {
    flags.set_if(flag, !(-0x400..=0x3ff).contains(&val));
    val.clamp(-0x400, 0x3ff) as i16
}

/// Number of leading bits equal to the sign bit.
pub fn leading_sign_bits(val: u32) -> u32 {
    if val as i32 >= 0 {
        val.leading_zeros()
    } else {
        val.leading_ones()
    }
}

/// Unsigned fixed point division of `num` by `den`, giving a 1.16 result. Used to calculate
/// the projection factor `H / SZ3`.
///
/// The reciprocal of `den` is approximated with a table lookup followed by a single
/// Newton-Raphson iteration. The result saturates at `0x1ffff` with the divide overflow flag set,
/// which is also the answer when `num` is at least twice `den`.
pub fn divide(flags: &mut Flags, num: u16, den: u16) -> u32 {
    let (num, den) = (u32::from(num), u32::from(den));

    if num >= den * 2 {
        flags.set(DIV_OVERFLOW);
        return 0x1ffff;
    }

    // A zero `den` is caught above.
    let shift = (den as u16).leading_zeros();
    let norm = (den << shift) & 0x7fff;

    let factor = u32::from(UNR_TABLE[((norm + 0x40) >> 7) as usize]) + 0x101;
    let err = ((0x80_i32 - (factor * (norm + 0x8000)) as i32) as u32 >> 8) & 0x1ffff;
    let recip = (factor * err + 0x80) >> 8;

    let res = (u64::from(recip) * u64::from(num << shift) + 0x8000) >> 16;

    if res > 0x1ffff {
        flags.set(DIV_OVERFLOW);
        0x1ffff
    } else {
        res as u32
    }
}

/// Initial reciprocal approximations, indexed by the top bits of the normalized divisor.
const UNR_TABLE: [u8; 0x101] = [
    0xff, 0xfd, 0xfb, 0xf9, 0xf7, 0xf5, 0xf3, 0xf1, 0xef, 0xee, 0xec, 0xea, 0xe8, 0xe6, 0xe4, 0xe3,
    0xe1, 0xdf, 0xdd, 0xdc, 0xda, 0xd8, 0xd6, 0xd5, 0xd3, 0xd1, 0xd0, 0xce, 0xcd, 0xcb, 0xc9, 0xc8,
    0xc6, 0xc5, 0xc3, 0xc1, 0xc0, 0xbe, 0xbd, 0xbb, 0xba, 0xb8, 0xb7, 0xb5, 0xb4, 0xb2, 0xb1, 0xb0,
    0xae, 0xad, 0xab, 0xaa, 0xa9, 0xa7, 0xa6, 0xa4, 0xa3, 0xa2, 0xa0, 0x9f, 0x9e, 0x9c, 0x9b, 0x9a,
    0x99, 0x97, 0x96, 0x95, 0x94, 0x92, 0x91, 0x90, 0x8f, 0x8d, 0x8c, 0x8b, 0x8a, 0x89, 0x87, 0x86,
    0x85, 0x84, 0x83, 0x82, 0x81, 0x7f, 0x7e, 0x7d, 0x7c, 0x7b, 0x7a, 0x79, 0x78, 0x77, 0x75, 0x74,
    0x73, 0x72, 0x71, 0x70, 0x6f, 0x6e, 0x6d, 0x6c, 0x6b, 0x6a, 0x69, 0x68, 0x67, 0x66, 0x65, 0x64,
    0x63, 0x62, 0x61, 0x60, 0x5f, 0x5e, 0x5d, 0x5d, 0x5c, 0x5b, 0x5a, 0x59, 0x58, 0x57, 0x56, 0x55,
    0x54, 0x53, 0x53, 0x52, 0x51, 0x50, 0x4f, 0x4e, 0x4d, 0x4d, 0x4c, 0x4b, 0x4a, 0x49, 0x48, 0x48,
    0x47, 0x46, 0x45, 0x44, 0x43, 0x43, 0x42, 0x41, 0x40, 0x3f, 0x3f, 0x3e, 0x3d, 0x3c, 0x3c, 0x3b,
    0x3a, 0x39, 0x39, 0x38, 0x37, 0x36, 0x36, 0x35, 0x34, 0x33, 0x33, 0x32, 0x31, 0x31, 0x30, 0x2f,
    0x2e, 0x2e, 0x2d, 0x2c, 0x2c, 0x2b, 0x2a, 0x2a, 0x29, 0x28, 0x28, 0x27, 0x26, 0x26, 0x25, 0x24,
    0x24, 0x23, 0x22, 0x22, 0x21, 0x20, 0x20, 0x1f, 0x1e, 0x1e, 0x1d, 0x1d, 0x1c, 0x1b, 0x1b, 0x1a,
    0x19, 0x19, 0x18, 0x18, 0x17, 0x16, 0x16, 0x15, 0x15, 0x14, 0x14, 0x13, 0x12, 0x12, 0x11, 0x11,
    0x10, 0x0f, 0x0f, 0x0e, 0x0e, 0x0d, 0x0d, 0x0c, 0x0c, 0x0b, 0x0a, 0x0a, 0x09, 0x09, 0x08, 0x08,
    0x07, 0x07, 0x06, 0x06, 0x05, 0x05, 0x04, 0x04, 0x03, 0x03, 0x02, 0x02, 0x01, 0x01, 0x00, 0x00,
    0x00,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divide_half() {
        let mut flags = Flags::default();
        assert_eq!(divide(&mut flags, 0x100, 0x200), 0x8000);
        assert_eq!(flags, Flags::default());
    }

    #[test]
    fn divide_equal() {
        let mut flags = Flags::default();
        assert_eq!(divide(&mut flags, 0x1000, 0x1000), 0x10000);
        assert_eq!(flags.bits(), 0);
    }

    #[test]
    fn divide_overflow() {
        let mut flags = Flags::default();
        assert_eq!(divide(&mut flags, 0x100, 0x80), 0x1ffff);
        assert_eq!(flags.bits(), 1 << DIV_OVERFLOW | 1 << 31);

        let mut flags = Flags::default();
        assert_eq!(divide(&mut flags, 0, 0), 0x1ffff);
    }

    #[test]
    fn mac_wrap() {
        assert_eq!(wrap_mac((1 << 43) - 1), (1 << 43) - 1);
        assert_eq!(wrap_mac(1 << 43), -(1 << 43));
        assert_eq!(wrap_mac(-(1 << 43) - 1), (1 << 43) - 1);
        assert_eq!(wrap_mac(-5), -5);
    }

    #[test]
    fn sign_bits() {
        assert_eq!(leading_sign_bits(0), 32);
        assert_eq!(leading_sign_bits(0xffff_ffff), 32);
        assert_eq!(leading_sign_bits(0x0000_ffff), 16);
        assert_eq!(leading_sign_bits(0xff00_0000), 8);
        assert_eq!(leading_sign_bits(0x4000_0000), 1);
    }

    #[test]
    fn saturation() {
        let mut flags = Flags::default();

        assert_eq!(lim_a(&mut flags, 0, -5, true), 0);
        assert_eq!(lim_a(&mut flags, 1, -5, false), -5);
        assert_eq!(lim_b(&mut flags, 2, 0x1ff), 0xff);
        assert_eq!(lim_e(&mut flags, 0x2000), 0x1000);

        assert_eq!(flags.bits(), 1 << 24 | 1 << 19 | 1 << 12 | 1 << 31);
    }

    #[test]
    fn ir3_saturation() {
        // IR3 saturation isn't summarized in bit 31.
        let mut flags = Flags::default();
        assert_eq!(lim_a_sf(&mut flags, 0x0800_0000, 12, false), 0x7fff);
        assert_eq!(flags.bits(), 1 << 22);

        // Negative values clamped without shift only flag if the unshifted value overflows.
        let mut flags = Flags::default();
        assert_eq!(lim_a_sf(&mut flags, -0x10, 0, true), 0);
        assert_eq!(flags.bits(), 0);

        let mut flags = Flags::default();
        assert_eq!(lim_a_sf(&mut flags, -0x1000_0000, 0, true), 0);
        assert_eq!(flags.bits(), 1 << 22);
    }
}
