use thiserror::Error;

/// Host-level faults. These mean the core was asked to do something it has no architectural
/// answer for, as opposed to guest faults which are delivered as exceptions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("read from unmapped cop0 register {index} at {pc:08x}")]
    Cop0Read { index: u32, pc: u32 },

    #[error("write of {val:08x} to unmapped cop0 register {index} at {pc:08x}")]
    Cop0Write { index: u32, val: u32, pc: u32 },

    #[error("cop0 register index {0} out of range")]
    Cop0Index(u32),

    #[error("gte register index {0} out of range")]
    GteIndex(u32),
}
