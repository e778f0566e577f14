//! Emulation of the MIPS R3000A.
//!
//! The pipeline is modelled at the level software can observe: one instruction retires per
//! [`Cpu::step`], the instruction after a branch always executes before the branch is taken, and
//! the result of a load isn't visible to the instruction right after it.

mod cop0;
mod dispatch;
mod exception;
mod ops;

pub mod gte;
pub mod opcode;

use crate::bus::{AddrUnit, Bus};
use crate::config::CpuConfig;
use crate::error::Error;
use crate::Cycle;

use exception::Trap;

pub use cop0::Cop0;
pub use exception::Exception;
pub use gte::{Gte, GteOp};
pub use opcode::{Opcode, RegIdx, REGISTER_NAMES};

/// A pending write to a general purpose register.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
struct DelaySlot {
    reg: RegIdx,
    val: u32,
}

/// # Load delay queue
///
/// Values loaded from memory or moved from a coprocessor arrive in the register file after the
/// next instruction has executed. Each step commits at most one entry, so no more than two can
/// be in flight at a time: the one issued by the previous instruction and the one issued by the
/// current.
#[derive(Default, Clone, PartialEq, Eq, Debug)]
struct LoadDelay {
    slots: [DelaySlot; 2],
    len: usize,
}

impl LoadDelay {
    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push(&mut self, reg: RegIdx, val: u32) {
        debug_assert!(self.len < 2, "load delay queue overflow");
        self.slots[self.len.min(1)] = DelaySlot { reg, val };
        self.len = (self.len + 1).min(2);
    }

    fn pop(&mut self) -> Option<DelaySlot> {
        if self.len == 0 {
            return None;
        }
        let head = self.slots[0];
        self.slots[0] = self.slots[1];
        self.len -= 1;
        Some(head)
    }

    /// The value of the newest pending load to `reg`, if any.
    fn newest(&self, reg: RegIdx) -> Option<u32> {
        self.slots[..self.len]
            .iter()
            .rev()
            .find(|slot| slot.reg == reg)
            .map(|slot| slot.val)
    }

    /// If a younger entry targets the same register as the head.
    fn head_cancelled(&self) -> bool {
        self.len == 2 && self.slots[0].reg == self.slots[1].reg
    }
}

pub struct Cpu<B: Bus> {
    /// The address of the instruction about to be executed. Instructions move it forward
    /// themselves, so during execution it points at the instruction being executed.
    pc: u32,
    /// Set by branch and jump instructions. Taken after the instruction in the delay slot has
    /// executed.
    pending_jump: Option<u32>,
    /// # Registers
    ///
    /// All registers are general purpose besides $zero, which always reads as 0. The rest are
    /// used for specific purposes by convention.
    ///
    /// | Number  | Name    | Usage                 |
    /// |---------|---------|-----------------------|
    /// | r0      | $zero   | Always 0              |
    /// | r1      | $at     | Reserved by assembler |
    /// | r2-r3   | $v0-$v1 | Results               |
    /// | r4-r7   | $a0-$a3 | Arguments             |
    /// | r8-r15  | $t0-$t7 | Temporaries           |
    /// | r16-r23 | $s0-$s7 | Saved                 |
    /// | r24-r25 | $t8-$t9 | Temporaries           |
    /// | r26-r27 | $k0-$k1 | Reserved by kernel    |
    /// | r28     | $gp     | Global pointer        |
    /// | r29     | $sp     | Stack pointer         |
    /// | r30     | $fp     | Frame pointer         |
    /// | r31     | $ra     | Return address        |
    registers: [u32; 32],
    /// Results of multiply and divide instructions.
    hi: u32,
    lo: u32,
    load_delay: LoadDelay,
    /// The register written directly by the current instruction, if any. A pending load to the
    /// same register is dropped when the queue is committed.
    immediate_write: Option<RegIdx>,
    cop0: Cop0,
    gte: Gte,
    cycle: Cycle,
    /// Line buffer for BIOS character output. `None` if capture is disabled.
    tty: Option<String>,
    pub bus: B,
}

impl<B: Bus> Cpu<B> {
    pub fn new(bus: B, config: &CpuConfig) -> Self {
        Self {
            pc: config.reset_pc,
            pending_jump: None,
            registers: [0; 32],
            hi: 0,
            lo: 0,
            load_delay: LoadDelay::default(),
            immediate_write: None,
            cop0: Cop0::new(config.prid),
            gte: Gte::default(),
            cycle: 0,
            tty: config.tty.then(String::new),
            bus,
        }
    }

    pub fn read_reg(&self, idx: RegIdx) -> u32 {
        if idx == RegIdx::ZERO {
            0
        } else {
            self.registers[idx.index()]
        }
    }

    /// Write a register directly, bypassing the load delay. Meant for loaders setting up the
    /// initial state.
    pub fn set_reg(&mut self, idx: RegIdx, val: u32) {
        self.registers[idx.index()] = val;
    }

    /// All general purpose registers, with $zero reading as 0.
    pub fn registers(&self) -> [u32; 32] {
        let mut regs = self.registers;
        regs[0] = 0;
        regs
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Move execution to `pc`. Any pending jump is dropped.
    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
        self.pending_jump = None;
    }

    pub fn hi(&self) -> u32 {
        self.hi
    }

    pub fn lo(&self) -> u32 {
        self.lo
    }

    /// The number of steps taken since reset.
    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    pub fn cop0(&self) -> &Cop0 {
        &self.cop0
    }

    pub fn gte(&self) -> &Gte {
        &self.gte
    }

    pub fn gte_mut(&mut self) -> &mut Gte {
        &mut self.gte
    }

    /// Peek at the instruction about to be executed.
    pub fn curr_ins(&mut self) -> Opcode {
        Opcode::new(self.bus.load::<u32>(self.pc & !0x3).unwrap_or(0xffff_ffff))
    }

    /// Immediate register write. Visible to the next instruction.
    fn write_reg(&mut self, idx: RegIdx, val: u32) {
        self.registers[idx.index()] = val;
        self.immediate_write = Some(idx);
    }

    /// Delayed register write. Visible after the next instruction.
    fn delay_load(&mut self, idx: RegIdx, val: u32) {
        self.load_delay.push(idx, val);
    }

    /// The value `idx` will have once pending loads have landed. Used as merge base by LWL and
    /// LWR.
    fn pending_reg(&self, idx: RegIdx) -> u32 {
        match self.load_delay.newest(idx) {
            Some(val) if idx != RegIdx::ZERO => val,
            _ => self.read_reg(idx),
        }
    }

    /// Commit the oldest pending load.
    fn commit_load(&mut self) {
        let cancelled = self.load_delay.head_cancelled();
        if let Some(DelaySlot { reg, val }) = self.load_delay.pop() {
            if cancelled || self.immediate_write == Some(reg) {
                trace!("pending load of {val:08x} to {reg} dropped");
            } else {
                self.registers[reg.index()] = val;
            }
        }
    }

    fn set_jump(&mut self, addr: u32) {
        self.pending_jump = Some(addr);
    }

    /// Move on to the next instruction.
    #[inline]
    fn advance_pc(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    /// Load data from the bus. Must not be used to fetch instructions.
    fn load<T: AddrUnit>(&mut self, addr: u32) -> Result<T, Exception> {
        if !T::is_aligned(addr) {
            self.cop0.set_bad_vaddr(addr);
            return Err(Exception::AddressLoadError);
        }
        self.bus.load::<T>(addr).map_err(|err| {
            trace!("data load failed: {err}");
            Exception::BusDataError
        })
    }

    fn store<T: AddrUnit>(&mut self, addr: u32, val: T) -> Result<(), Exception> {
        if !T::is_aligned(addr) {
            self.cop0.set_bad_vaddr(addr);
            return Err(Exception::AddressStoreError);
        }

        if self.cop0.cache_isolated() {
            let val: u32 = val.into();
            trace!("store of {val:08x} to {addr:08x} with cache isolated");
            return Ok(());
        }

        self.bus.store::<T>(addr, val).map_err(|err| {
            trace!("data store failed: {err}");
            Exception::BusDataError
        })
    }

    fn fetch(&mut self) -> Result<Opcode, Exception> {
        if !u32::is_aligned(self.pc) {
            self.cop0.set_bad_vaddr(self.pc);
            return Err(Exception::AddressLoadError);
        }
        self.bus.load::<u32>(self.pc).map(Opcode::new).map_err(|err| {
            trace!("instruction fetch failed: {err}");
            Exception::BusInstructionError
        })
    }

    /// The character passed to the BIOS `std_out_putchar` call, if the instruction about to be
    /// executed is the entry of the call.
    fn putchar(&self) -> Option<char> {
        self.tty.as_ref()?;

        if !matches!(self.pc, 0x0000_00b0 | 0x8000_00b0 | 0xa000_00b0) {
            return None;
        }

        if self.registers[RegIdx::T1.index()] != 0x3d {
            return None;
        }

        Some(self.registers[RegIdx::A0.index()] as u8 as char)
    }

    fn capture_tty(&mut self, c: char) {
        let Some(line) = self.tty.as_mut() else {
            return;
        };

        match c {
            '\n' => {
                info!("tty: {line}");
                line.clear();
            }
            c => line.push(c),
        }
    }

    /// The characters captured since the last newline. `None` if capture is disabled.
    pub fn tty_line(&self) -> Option<&str> {
        self.tty.as_deref()
    }

    /// Execute a single instruction, or enter a pending interrupt.
    ///
    /// Returns an error only if the core reached a state with no architectural answer. The
    /// instruction that caused it is left uncommitted.
    pub fn step(&mut self) -> Result<(), Error> {
        self.cop0.set_irq_line(self.bus.irq_asserted());

        let sr_written = self.cop0.take_sr_written();
        let had_load = !self.load_delay.is_empty();

        self.immediate_write = None;

        // An interrupt unmasked by the previous instruction is taken after this one instead.
        let deferred_irq = self.cop0.irq_pending() && sr_written;

        // Entering the handler takes the whole step. Its first instruction runs on the next.
        if self.cop0.irq_pending() && !deferred_irq {
            let in_delay = self.pending_jump.is_some();
            self.enter_exception(Exception::Interrupt, in_delay);
            if had_load {
                self.commit_load();
            }
            self.cycle += 1;
            return Ok(());
        }

        let jump = self.pending_jump.take();

        let putchar = self.putchar();

        match self.fetch() {
            Ok(op) => {
                if log_enabled!(log::Level::Trace) {
                    trace!("{:08x}: {op}", self.pc);
                }
                match self.execute(op) {
                    Ok(()) => {
                        if let Some(c) = putchar {
                            self.capture_tty(c);
                        }
                        if let Some(target) = jump {
                            self.pc = target;
                        }
                    }
                    Err(Trap::Exception(ex)) => {
                        self.enter_exception(ex, jump.is_some());
                    }
                    Err(Trap::Fatal(err)) => {
                        error!("{err}");
                        self.pending_jump = jump;
                        self.cop0.restore_sr_written(sr_written);
                        return Err(err);
                    }
                }
            }
            Err(ex) => self.enter_exception(ex, jump.is_some()),
        }

        if had_load {
            self.commit_load();
        }

        if deferred_irq && self.cop0.irq_pending() {
            let in_delay = self.pending_jump.is_some();
            self.enter_exception(Exception::Interrupt, in_delay);
        }

        self.cycle += 1;

        Ok(())
    }
}
