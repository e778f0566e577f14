use crate::bus::Bus;
use crate::error::Error;

use super::Cpu;

/// Guest visible exceptions. The discriminant is the exception code stored in CAUSE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exception {
    /// An interrupt has occurred.
    Interrupt = 0x0,
    /// TLB modification. Never raised since the R3000A used here has no TLB.
    Mod = 0x1,
    TlbLoad = 0x2,
    TlbStore = 0x3,
    /// Loading data or fetching an instruction at an unaligned address.
    AddressLoadError = 0x4,
    /// Storing data at an unaligned address.
    AddressStoreError = 0x5,
    /// Fetching an instruction from an unmapped address.
    BusInstructionError = 0x6,
    /// Loading or storing data at an unmapped address.
    BusDataError = 0x7,
    /// Thrown by SYSCALL.
    Syscall = 0x8,
    /// Thrown by BREAK.
    Breakpoint = 0x9,
    /// Thrown when executing an unknown instruction.
    ReservedInstruction = 0xa,
    /// Thrown when executing an instruction for an unavailable coprocessor.
    CopUnusable = 0xb,
    /// Thrown by the signed add and subtract instructions on overflow.
    ArithmeticOverflow = 0xc,
}

/// Anything that stops an instruction from completing.
#[derive(Debug)]
pub(crate) enum Trap {
    /// Delivered to the guest.
    Exception(Exception),
    /// Returned to the caller of [`Cpu::step`].
    Fatal(Error),
}

impl From<Exception> for Trap {
    fn from(ex: Exception) -> Self {
        Trap::Exception(ex)
    }
}

impl From<Error> for Trap {
    fn from(err: Error) -> Self {
        Trap::Fatal(err)
    }
}

impl<B: Bus> Cpu<B> {
    /// Enter an exception raised by the instruction at `pc`.
    ///
    /// If the instruction is in a branch delay slot, EPC points at the branch instead so the
    /// branch is executed again on return. Any pending jump is dropped.
    pub(super) fn enter_exception(&mut self, ex: Exception, in_delay: bool) {
        trace!("exception {ex:?} at {:08x}", self.pc);

        let epc = if in_delay {
            self.pc.wrapping_sub(4)
        } else {
            self.pc
        };

        self.pc = self.cop0.enter_exception(ex, epc, in_delay);
        self.pending_jump = None;
    }
}
