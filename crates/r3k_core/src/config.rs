use serde::{Deserialize, Serialize};

/// Start-up parameters of the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    /// The address of the first instruction executed.
    pub reset_pc: u32,
    /// Value reported by the COP0 processor id register.
    pub prid: u32,
    /// Capture characters written through the BIOS `std_out_putchar` call and log them line by
    /// line.
    pub tty: bool,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            reset_pc: 0xbfc0_0000,
            prid: 0x0000_0002,
            tty: true,
        }
    }
}
