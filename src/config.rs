use r3k_core::CpuConfig;
use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};
use std::{fs, io};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to deserialize config file: {0}")]
    Deserialize(#[from] toml::de::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cpu: CpuConfig,
    pub run: RunConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Path to the PS-X EXE to run. Relative paths start at the directory of the config file.
    pub exe: PathBuf,
    /// Size of memory in bytes.
    #[serde(default = "default_ram_size")]
    pub ram_size: usize,
    /// Number of steps to run before stopping.
    #[serde(default = "default_cycles")]
    pub cycles: u64,
    /// Log the disassembly of every executed instruction.
    #[serde(default)]
    pub trace: bool,
}

fn default_ram_size() -> usize {
    2 * 1024 * 1024
}

fn default_cycles() -> u64 {
    1_000_000
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            exe: PathBuf::new(),
            ram_size: default_ram_size(),
            cycles: default_cycles(),
            trace: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(&fs::read_to_string(path)?)?;

        if config.run.exe.is_relative() {
            if let Some(dir) = path.parent() {
                config.run.exe = dir.join(&config.run.exe);
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config: Config = toml::from_str("[run]\nexe = \"hello.exe\"").unwrap();

        assert_eq!(config.run.exe, PathBuf::from("hello.exe"));
        assert_eq!(config.run.ram_size, 2 * 1024 * 1024);
        assert_eq!(config.run.cycles, 1_000_000);
        assert!(!config.run.trace);
        assert_eq!(config.cpu, CpuConfig::default());
    }

    #[test]
    fn overrides() {
        let config: Config = toml::from_str(
            r#"
            [cpu]
            reset_pc = 0x80010000
            tty = false

            [run]
            exe = "/tmp/test.exe"
            cycles = 500
            trace = true
            "#,
        )
        .unwrap();

        assert_eq!(config.cpu.reset_pc, 0x8001_0000);
        assert!(!config.cpu.tty);
        assert_eq!(config.run.cycles, 500);
        assert!(config.run.trace);
    }

    #[test]
    fn missing_exe() {
        assert!(toml::from_str::<Config>("[run]\ncycles = 10").is_err());
    }
}
