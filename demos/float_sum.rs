use color_eyre::eyre::{eyre, Result};

use log::info;
use pcpu::memory::image::Image;
use pcpu::memory::Memory;
use pcpu::minifloat::Minifloat;
use pcpu::processor::Processor;
use simple_logger::SimpleLogger;

/// Adds the minifloats at 0x80 and 0x81 into 0x82
#[rustfmt::skip]
const IMAGE: &[u8] = &[
    0x00, 0x20,             // entry point
    0x80, 0x38,             // 1.5
    0x81, 0x44,             // 2.5
    0x20, 10,               // 10 bytes of code at the entry point
    0x11, 0x80,             // LDM r1, [0x80]
    0x12, 0x81,             // LDM r2, [0x81]
    0x63, 0x12,             // ADDF r3, r1, r2
    0x33, 0x82,             // STM [0x82], r3
    0xC0, 0x00,             // HALT
];

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new()
        .init()
        .map_err(|err| eyre!("{}", err))?; // logging

    let image = Image::decode(IMAGE)?;
    let mut mem = Memory::default();

    let mut cpu = Processor::new(Some(&mut mem))?;
    cpu.load_image(&image)?;
    cpu.start()?;
    cpu.run(None)?;
    drop(cpu);

    info!(
        "{} + {} = {}",
        Minifloat(mem.read_byte(0x80)),
        Minifloat(mem.read_byte(0x81)),
        Minifloat(mem.read_byte(0x82))
    );
    println!("{}", mem.hexdump(Some(image.memory())));

    Ok(())
}
