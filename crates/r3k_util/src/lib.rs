#[macro_use]
extern crate log;

pub mod bit;
pub mod exe;

pub use bit::{Bit, BitSet, SignExtend};
pub use exe::Exe;
