//! # Coprocessor 0
//!
//! The system control coprocessor. On the R3000A it holds exception state, interrupt masks and
//! debug breakpoint registers. The memory management parts of the MIPS architecture are absent.
//!
//! | Number | Name     | Usage                       |
//! |--------|----------|-----------------------------|
//! | 0..2   | -        | -                           |
//! | 3      | bpc      | Breakpoint on execution     |
//! | 4      | -        | -                           |
//! | 5      | bda      | Breakpoint on data access   |
//! | 6      | tar      | Target address              |
//! | 7      | dcic     | Breakpoint control          |
//! | 8      | badvaddr | Bad virtual address         |
//! | 9      | bdam     | Data access breakpoint mask |
//! | 10     | -        | -                           |
//! | 11     | bpcm     | Execute breakpoint mask     |
//! | 12     | sr       | Status register             |
//! | 13     | cause    | Exception type              |
//! | 14     | epc      | Return address from trap    |
//! | 15     | prid     | Processor ID                |

use r3k_util::{Bit, BitSet};

use crate::error::Error;
use super::exception::Exception;

pub const BPC: u32 = 3;
pub const BDA: u32 = 5;
pub const TAR: u32 = 6;
pub const DCIC: u32 = 7;
pub const BAD_VADDR: u32 = 8;
pub const BDAM: u32 = 9;
pub const BPCM: u32 = 11;
pub const SR: u32 = 12;
pub const CAUSE: u32 = 13;
pub const EPC: u32 = 14;
pub const PRID: u32 = 15;

/// How a guest access to a register behaves.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Access {
    Unmapped,
    /// Writes are dropped.
    ReadOnly,
    /// Only the bits in the mask are replaced on write.
    Masked(u32),
}

const ACCESS: [Access; 16] = {
    let mut table = [Access::Unmapped; 16];

    table[BPC as usize] = Access::Masked(0xffff_ffff);
    table[BDA as usize] = Access::Masked(0xffff_ffff);
    table[TAR as usize] = Access::ReadOnly;
    table[DCIC as usize] = Access::Masked(0xffff_ffff);
    table[BAD_VADDR as usize] = Access::ReadOnly;
    table[BDAM as usize] = Access::Masked(0xffff_ffff);
    table[BPCM as usize] = Access::Masked(0xffff_ffff);
    table[SR as usize] = Access::Masked(0xffff_ffff);

    // Only the two software interrupt bits.
    table[CAUSE as usize] = Access::Masked(0x0000_0300);

    table[EPC as usize] = Access::ReadOnly;
    table[PRID as usize] = Access::ReadOnly;

    table
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Cop0 {
    regs: [u32; 16],
    /// Set when SR has been written by the guest. Cleared by the step loop.
    sr_written: bool,
}

impl Cop0 {
    pub fn new(prid: u32) -> Self {
        let mut regs = [0; 16];
        regs[PRID as usize] = prid;
        Self { regs, sr_written: false }
    }

    /// Read a register the way MFC0 would.
    pub fn read_index(&self, index: u32) -> Result<u32, Error> {
        self.read(index).ok_or(Error::Cop0Index(index))
    }

    /// Returns `None` if `index` isn't mapped.
    pub(super) fn read(&self, index: u32) -> Option<u32> {
        match ACCESS.get(index as usize)? {
            Access::Unmapped => None,
            _ => Some(self.regs[index as usize]),
        }
    }

    /// Write a register the way MTC0 would. Returns `None` if `index` isn't mapped.
    pub(super) fn write(&mut self, index: u32, val: u32) -> Option<()> {
        match ACCESS.get(index as usize)? {
            Access::Unmapped => return None,
            Access::ReadOnly => {
                trace!("write of {val:08x} to read-only cop0 register {index} dropped");
            }
            Access::Masked(mask) => {
                let reg = &mut self.regs[index as usize];
                *reg = (*reg & !mask) | (val & mask);
            }
        }
        if index == SR {
            self.sr_written = true;
        }
        Some(())
    }

    pub fn sr(&self) -> u32 {
        self.regs[SR as usize]
    }

    pub fn cause(&self) -> u32 {
        self.regs[CAUSE as usize]
    }

    pub fn epc(&self) -> u32 {
        self.regs[EPC as usize]
    }

    pub fn bad_vaddr(&self) -> u32 {
        self.regs[BAD_VADDR as usize]
    }

    /// Stores don't reach memory when the cache is isolated.
    #[inline]
    pub fn cache_isolated(&self) -> bool {
        self.sr().bit(16)
    }

    /// If the boot exception vectors are in use.
    #[inline]
    fn bev(&self) -> bool {
        self.sr().bit(22)
    }

    #[inline]
    pub fn irq_enabled(&self) -> bool {
        self.sr().bit(0)
    }

    /// Mirror the external interrupt line into CAUSE bit 10.
    pub(super) fn set_irq_line(&mut self, asserted: bool) {
        let cause = &mut self.regs[CAUSE as usize];
        *cause = cause.set_bit(10, asserted);
    }

    /// An interrupt is pending if interrupts are enabled and an unmasked interrupt bit is set in
    /// CAUSE. Both the hardware line and the software bits count.
    pub fn irq_pending(&self) -> bool {
        self.irq_enabled() && self.sr() & self.cause() & 0xff00 != 0
    }

    pub(super) fn take_sr_written(&mut self) -> bool {
        std::mem::take(&mut self.sr_written)
    }

    /// Put back a flag taken by [`Self::take_sr_written`] for a step that didn't complete.
    pub(super) fn restore_sr_written(&mut self, written: bool) {
        self.sr_written |= written;
    }

    pub(super) fn set_bad_vaddr(&mut self, addr: u32) {
        self.regs[BAD_VADDR as usize] = addr;
    }

    /// Start handling an exception. Pushes the interrupt enable and kernel mode bits of the
    /// status register, which disables interrupts and enters kernel mode. CAUSE gets the exception
    /// code and branch delay bit and EPC the address to return to.
    ///
    /// Returns the address of the exception handler.
    pub(super) fn enter_exception(&mut self, ex: Exception, epc: u32, in_delay: bool) -> u32 {
        let sr = self.sr();
        self.regs[SR as usize] = sr.set_bit_range(0, 5, sr << 2);

        let cause = self.cause()
            .set_bit_range(2, 6, ex as u32)
            .set_bit(31, in_delay);

        self.regs[CAUSE as usize] = cause;
        self.regs[EPC as usize] = epc;

        if self.bev() {
            0xbfc0_0180
        } else {
            0x8000_0080
        }
    }

    /// RFE. Pops the mode bits pushed by [`Self::enter_exception`].
    pub(super) fn exit_exception(&mut self) {
        let sr = self.sr();
        self.regs[SR as usize] = sr.set_bit_range(0, 3, sr.bit_range(2, 5));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_masks() {
        let mut cop0 = Cop0::new(2);

        assert_eq!(cop0.write(CAUSE, 0xffff_ffff), Some(()));
        assert_eq!(cop0.cause(), 0x300);

        assert_eq!(cop0.write(PRID, 0x1234), Some(()));
        assert_eq!(cop0.read(PRID), Some(2));

        assert_eq!(cop0.write(4, 1), None);
        assert_eq!(cop0.read(10), None);
        assert_eq!(cop0.read(16), None);
        assert_eq!(cop0.read_index(0), Err(Error::Cop0Index(0)));
    }

    #[test]
    fn mode_stack() {
        let mut cop0 = Cop0::new(2);
        cop0.write(SR, 0b01_0110).unwrap();
        assert!(cop0.take_sr_written());
        assert!(!cop0.take_sr_written());

        let vector = cop0.enter_exception(Exception::Syscall, 0x8000_1000, false);

        assert_eq!(vector, 0x8000_0080);
        assert_eq!(cop0.sr() & 0x3f, 0b01_1000);
        assert_eq!(cop0.cause() >> 2 & 0x1f, 8);
        assert_eq!(cop0.epc(), 0x8000_1000);

        cop0.exit_exception();
        assert_eq!(cop0.sr() & 0x3f, 0b01_0110);
    }

    #[test]
    fn boot_vector() {
        let mut cop0 = Cop0::new(2);
        cop0.write(SR, 1 << 22).unwrap();
        assert_eq!(cop0.enter_exception(Exception::Breakpoint, 0, true), 0xbfc0_0180);
        assert!(cop0.cause().bit(31));
    }

    #[test]
    fn software_interrupt() {
        let mut cop0 = Cop0::new(2);
        cop0.write(SR, 0x101).unwrap();
        assert!(!cop0.irq_pending());
        cop0.write(CAUSE, 0x100).unwrap();
        assert!(cop0.irq_pending());
    }
}
