//! Bit field helpers used when picking apart instruction words and register values.

/// Extract bits from an integer.
pub trait Bit {
    /// Extract a single bit.
    #[must_use]
    fn bit(self, n: usize) -> bool;

    /// Extract the bits between `ls` and `ms`. Both are inclusive.
    #[must_use]
    fn bit_range(self, ls: usize, ms: usize) -> Self;
}

/// Replace bits of an integer.
pub trait BitSet {
    #[must_use]
    fn set_bit(self, bit: usize, val: bool) -> Self;

    /// Replace the bits between `ls` and `ms` (inclusive) with the low bits of `val`.
    #[must_use]
    fn set_bit_range(self, ls: usize, ms: usize, val: Self) -> Self;
}

/// Treat the lowest `bits` bits as a two's complement number and sign extend it to the full
/// width of the type.
pub trait SignExtend {
    #[must_use]
    fn sign_extend(self, bits: u32) -> Self;
}

macro_rules! impl_bit {
    ($($t:ident),*) => {
        $(
            impl Bit for $t {
                #[inline]
                fn bit(self, n: usize) -> bool {
                    (self >> n) & 1 == 1
                }

                #[inline]
                fn bit_range(self, ls: usize, ms: usize) -> Self {
                    let width = ms - ls + 1;
                    let mask = if width >= Self::BITS as usize {
                        !0
                    } else {
                        (1 << width) - 1
                    };
                    (self >> ls) & mask
                }
            }
        )*
    }
}

macro_rules! impl_bit_set {
    ($($t:ident),*) => {
        $(
            impl BitSet for $t {
                #[inline]
                fn set_bit(self, bit: usize, val: bool) -> Self {
                    (self & !(1 << bit)) | ((val as Self) << bit)
                }

                #[inline]
                fn set_bit_range(self, ls: usize, ms: usize, val: Self) -> Self {
                    let mask = (1 << (ms - ls + 1)) - 1;
                    (self & !(mask << ls)) | ((val & mask) << ls)
                }
            }
        )*
    }
}

macro_rules! impl_sign_extend {
    ($($t:ident => $s:ident),*) => {
        $(
            impl SignExtend for $t {
                #[inline]
                fn sign_extend(self, bits: u32) -> Self {
                    let shift = Self::BITS - bits;
                    (((self as $s) << shift) >> shift) as Self
                }
            }
        )*
    }
}

impl_bit!(u64, u32, i32, u16, u8);
impl_bit_set!(u32, i32, u16);
impl_sign_extend!(u32 => i32, i32 => i32, u64 => i64, i64 => i64);

#[test]
fn bit_range() {
    assert_eq!(0xdead_beef_u32.bit_range(0, 15), 0xbeef);
    assert_eq!(0xdead_beef_u32.bit_range(16, 31), 0xdead);
    assert_eq!(0xdead_beef_u32.bit_range(0, 31), 0xdead_beef);
    assert_eq!(0b1010_u8.bit_range(1, 2), 0b01);
}

#[test]
fn set_bit_range() {
    assert_eq!(0_u32.set_bit_range(3, 4, 0b11), 0b11000);
    assert_eq!(0_u32.set_bit_range(0, 10, u32::MAX), 0b111_1111_1111);
    assert_eq!(u32::MAX.set_bit_range(2, 6, 0), 0xffff_ff83);
}

#[test]
fn set_bit() {
    assert_eq!(0_u32.set_bit(31, true), 0x8000_0000);
    assert_eq!(0b111_u32.set_bit(2, false), 0b011);
}

#[test]
fn sign_extend() {
    assert_eq!(0x8000_u32.sign_extend(16), 0xffff_8000);
    assert_eq!(0x7fff_u32.sign_extend(16), 0x7fff);
    assert_eq!(0x1234_8000_u32.sign_extend(16), 0xffff_8000);
    assert_eq!((1_i64 << 43).sign_extend(44), -(1 << 43));
    assert_eq!(((1_i64 << 43) - 1).sign_extend(44), (1 << 43) - 1);
}
