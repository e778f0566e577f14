mod asm;

use crate::bus::Ram;
use crate::config::CpuConfig;
use crate::cpu::Cpu;

/// Where test programs are loaded and started.
pub const BASE: u32 = 0x8001_0000;

/// Scratch memory for loads and stores.
pub const DATA: u32 = 0x8002_0000;

/// General exception vector with BEV clear.
pub const VECTOR: u32 = 0x8000_0080;

const RAM_SIZE: usize = 0x4_0000;

/// Give up on programs that don't reach a BREAK.
const STEP_LIMIT: usize = 10_000;

fn is_break(cpu: &mut Cpu<Ram>) -> bool {
    let ins = cpu.curr_ins();
    ins.op() == 0x0 && ins.special() == 0xd
}

/// Load `program` at [`BASE`] without running it. A BREAK is placed at the exception vector, so
/// any exception ends [`run_cpu`] there.
pub fn load_program(program: &[u32]) -> Cpu<Ram> {
    let mut ram = Ram::new(RAM_SIZE);

    ram.write_words(BASE, program).unwrap();
    ram.write_words(VECTOR, &[asm::brk()]).unwrap();

    let config = CpuConfig {
        reset_pc: BASE,
        tty: false,
        ..CpuConfig::default()
    };

    Cpu::new(ram, &config)
}

/// Step until the next instruction is BREAK.
pub fn run_cpu(cpu: &mut Cpu<Ram>) {
    for _ in 0..STEP_LIMIT {
        if is_break(cpu) {
            return;
        }
        cpu.step().unwrap();
    }
    panic!("no break reached after {STEP_LIMIT} steps, pc at {:08x}", cpu.pc());
}

pub fn run_program(program: &[u32]) -> Cpu<Ram> {
    let mut cpu = load_program(program);
    run_cpu(&mut cpu);
    cpu
}

pub fn step_n(cpu: &mut Cpu<Ram>, n: usize) {
    for _ in 0..n {
        cpu.step().unwrap();
    }
}
