//! Headless runner. Loads a PS-X EXE into flat memory and runs it for a number of steps.

#[macro_use]
extern crate log;

mod config;

use clap::Parser;
use r3k_core::cpu::REGISTER_NAMES;
use r3k_core::{BusError, Cpu, Ram, RegIdx};
use r3k_util::exe::{Exe, ExeError};

use config::{Config, ConfigError};

use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the config file.
    #[arg(short, long)]
    config: PathBuf,

    /// Number of steps to run, overriding the config.
    #[arg(short = 'n', long)]
    cycles: Option<u64>,
}

#[derive(thiserror::Error, Debug)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Exe(#[from] ExeError),

    #[error("exe doesn't fit in memory: {0}")]
    Memory(#[from] BusError),

    #[error("cpu halted: {0}")]
    Cpu(#[from] r3k_core::Error),
}

fn init_logger(trace: bool) {
    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);

    if trace {
        builder.filter_module("r3k_core::cpu", log::LevelFilter::Trace);
    }

    builder.init();
}

/// Copy `exe` into memory and point the CPU at its entry.
fn load_exe(cpu: &mut Cpu<Ram>, exe: &Exe) -> Result<(), BusError> {
    cpu.bus.write_bytes(exe.text_base, &exe.text)?;

    if exe.bss_size != 0 {
        cpu.bus.clear(exe.bss_base, exe.bss_size as usize)?;
    }

    cpu.set_pc(exe.pc);
    cpu.set_reg(RegIdx::GP, exe.gp);

    if let Some(sp) = exe.sp {
        cpu.set_reg(RegIdx::SP, sp);
        cpu.set_reg(RegIdx::FP, sp);
    }

    Ok(())
}

fn dump_registers(cpu: &Cpu<Ram>) {
    info!("pc {:08x} hi {:08x} lo {:08x} cycle {}", cpu.pc(), cpu.hi(), cpu.lo(), cpu.cycle());

    let regs = cpu.registers();
    for row in (0..32).step_by(4) {
        let line: Vec<String> = (row..row + 4)
            .map(|i| format!("{:>4} {:08x}", REGISTER_NAMES[i], regs[i]))
            .collect();
        info!("{}", line.join("  "));
    }

    let cop0 = cpu.cop0();
    info!("sr {:08x} cause {:08x} epc {:08x}", cop0.sr(), cop0.cause(), cop0.epc());
}

fn run(args: &Args) -> Result<(), RunError> {
    let config = Config::load(&args.config)?;

    init_logger(config.run.trace);

    let exe = Exe::load(&config.run.exe)?;
    info!("loaded {} bytes of text at {:08x}", exe.text.len(), exe.text_base);

    let mut cpu = Cpu::new(Ram::new(config.run.ram_size), &config.cpu);
    load_exe(&mut cpu, &exe)?;

    let cycles = args.cycles.unwrap_or(config.run.cycles);
    let result = (0..cycles).try_for_each(|_| cpu.step());

    dump_registers(&cpu);
    result?;

    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(err) = run(&args) {
        eprintln!("{err}");
        process::exit(1);
    }
}
