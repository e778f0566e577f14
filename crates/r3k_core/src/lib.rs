//! Instruction execution core of the MIPS R3000A, together with the system control coprocessor
//! (COP0) and the geometry transformation engine (COP2).
//!
//! The core only sees memory through the [`Bus`] trait. Everything else about the machine lives
//! on the other side of it.

#[macro_use]
extern crate log;

#[cfg(test)]
mod test;

pub mod bus;
pub mod config;
pub mod cpu;
pub mod error;

pub use bus::{AddrUnit, Bus, BusError, Ram};
pub use config::CpuConfig;
pub use cpu::{Cpu, Opcode, RegIdx};
pub use error::Error;

/// Used to represent an absolute CPU cycle number.
pub type Cycle = u64;
