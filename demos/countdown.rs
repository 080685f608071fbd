use color_eyre::eyre::{eyre, Result};

use log::{info, LevelFilter};
use pcpu::memory::{Address, Memory};
use pcpu::minifloat::Minifloat;
use pcpu::processor::{Instruction, Opcode, Processor, Reg};
use pcpu::write_instructions;
use simple_logger::SimpleLogger;

/// The main entrypoint. First instruction should be placed here.
const ENTRYPOINT: Address = 0x10;
/// Where the counter is written after every step
const OUTPUT: Address = 0x80;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .map_err(|err| eyre!("{}", err))?; // logging

    let (r0, r1, r2) = (Reg::R0, Reg::new(1), Reg::new(2));

    let mut mem = Memory::default();
    mem.write_byte(0x00, ENTRYPOINT);
    write_instructions!(mem : ENTRYPOINT =>
        Instruction::LoadLiteral { dst: r1, value: 0x50 }, // 4.0
        Instruction::LoadLiteral { dst: r2, value: 0xB0 }, // -1.0
        Instruction::AddFloat { dst: r1, lhs: r1, rhs: r2 },
        Instruction::StoreMem { src: r1, addr: OUTPUT },
        Instruction::JumpIfEq { reg: r1, target: ENTRYPOINT + 12 },
        Instruction::JumpIfEq { reg: r0, target: ENTRYPOINT + 4 },
        Instruction::Halt,
    );

    let mut cpu = Processor::new(Some(&mut mem))?;
    cpu.start()?;

    while !cpu.is_halted() {
        cpu.cycle()?;

        if (cpu.ir >> 12) as u8 == u8::from(Opcode::StoreMem) {
            let value = cpu.memory().map(|mem| mem.read_byte(OUTPUT)).unwrap_or(0);
            info!("{}", Minifloat(value));
        }
    }

    Ok(())
}
