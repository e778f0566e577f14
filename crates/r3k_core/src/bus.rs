//! The boundary between the core and the rest of the machine.
//!
//! The core doesn't know anything about the memory map. It checks alignment itself and hands
//! every access to a [`Bus`], which decides what lives at an address.

use thiserror::Error;

/// A physical address with nothing mapped to it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unmapped bus address {addr:08x}")]
pub struct BusError {
    pub addr: u32,
}

/// Width of a single memory access.
pub trait AddrUnit: Copy + Into<u32> {
    /// Width in bytes.
    const WIDTH: usize;

    /// Truncate `val` to the width of `Self`.
    fn from_u32(val: u32) -> Self;

    #[inline]
    fn is_aligned(addr: u32) -> bool {
        addr & (Self::WIDTH as u32 - 1) == 0
    }
}

impl AddrUnit for u8 {
    const WIDTH: usize = 1;

    #[inline]
    fn from_u32(val: u32) -> Self {
        val as u8
    }
}

impl AddrUnit for u16 {
    const WIDTH: usize = 2;

    #[inline]
    fn from_u32(val: u32) -> Self {
        val as u16
    }
}

impl AddrUnit for u32 {
    const WIDTH: usize = 4;

    #[inline]
    fn from_u32(val: u32) -> Self {
        val
    }
}

/// Memory as seen from the CPU.
///
/// Calls are synchronous, and any side effect must have been applied before they return. The
/// address is always aligned to `T` when the core calls.
pub trait Bus {
    fn load<T: AddrUnit>(&mut self, addr: u32) -> Result<T, BusError>;

    fn store<T: AddrUnit>(&mut self, addr: u32, val: T) -> Result<(), BusError>;

    /// The external interrupt line. Sampled once per step.
    fn irq_asserted(&self) -> bool {
        false
    }
}

/// Strip the segment bits from a virtual address. KUSEG, KSEG0 and KSEG1 all map to the same
/// physical memory, while KSEG2 is left alone.
#[inline]
pub fn to_physical(addr: u32) -> u32 {
    const REGION_MAP: [u32; 8] = [
        0xffff_ffff,
        0xffff_ffff,
        0xffff_ffff,
        0xffff_ffff,
        0x7fff_ffff,
        0x1fff_ffff,
        0xffff_ffff,
        0xffff_ffff,
    ];
    addr & REGION_MAP[(addr >> 29) as usize]
}

/// Flat little endian memory starting at physical address 0. Anything past the end is unmapped.
pub struct Ram {
    data: Box<[u8]>,
    irq: bool,
}

impl Ram {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size].into_boxed_slice(),
            irq: false,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Drive the interrupt line seen by the CPU.
    pub fn set_irq(&mut self, asserted: bool) {
        self.irq = asserted;
    }

    /// Copy `bytes` into memory starting at `addr`.
    pub fn write_bytes(&mut self, addr: u32, bytes: &[u8]) -> Result<(), BusError> {
        let start = self.offset(addr, bytes.len())?;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Fill `len` bytes starting at `addr` with zeroes.
    pub fn clear(&mut self, addr: u32, len: usize) -> Result<(), BusError> {
        let start = self.offset(addr, len)?;
        self.data[start..start + len].fill(0);
        Ok(())
    }

    /// Copy a sequence of words into memory starting at `addr`.
    pub fn write_words(&mut self, addr: u32, words: &[u32]) -> Result<(), BusError> {
        let bytes: Vec<u8> = words
            .iter()
            .flat_map(|word| word.to_le_bytes())
            .collect();
        self.write_bytes(addr, &bytes)
    }

    fn offset(&self, addr: u32, len: usize) -> Result<usize, BusError> {
        let start = to_physical(addr) as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(start),
            _ => Err(BusError { addr }),
        }
    }
}

impl Bus for Ram {
    fn load<T: AddrUnit>(&mut self, addr: u32) -> Result<T, BusError> {
        let offset = self.offset(addr, T::WIDTH)?;
        let val = (0..T::WIDTH).fold(0, |val, byte| {
            val | (self.data[offset + byte] as u32) << (8 * byte)
        });
        Ok(T::from_u32(val))
    }

    fn store<T: AddrUnit>(&mut self, addr: u32, val: T) -> Result<(), BusError> {
        let offset = self.offset(addr, T::WIDTH)?;
        let val: u32 = val.into();
        for byte in 0..T::WIDTH {
            self.data[offset + byte] = (val >> (8 * byte)) as u8;
        }
        Ok(())
    }

    fn irq_asserted(&self) -> bool {
        self.irq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian() {
        let mut ram = Ram::new(16);
        ram.store::<u32>(0x0, 0x1122_3344).unwrap();
        assert_eq!(ram.load::<u8>(0x0).unwrap(), 0x44);
        assert_eq!(ram.load::<u16>(0x2).unwrap(), 0x1122);
    }

    #[test]
    fn segments_alias() {
        let mut ram = Ram::new(16);
        ram.store::<u16>(0xa000_0004, 0xbeef).unwrap();
        assert_eq!(ram.load::<u16>(0x8000_0004).unwrap(), 0xbeef);
        assert_eq!(ram.load::<u16>(0x0000_0004).unwrap(), 0xbeef);
    }

    #[test]
    fn out_of_range() {
        let mut ram = Ram::new(16);
        assert_eq!(ram.load::<u32>(0x10), Err(BusError { addr: 0x10 }));
        assert!(ram.store::<u8>(0x0f, 1).is_ok());
        assert!(ram.store::<u16>(0x0f, 1).is_err());
    }
}
