use color_eyre::eyre::Result;

use pcpu::error::{Error, FormatError};
use pcpu::memory::image::Image;
use pcpu::memory::{Endianness, Memory};
use pcpu::processor::{Config, Processor, Reg};

const FLOAT_SUM: &[u8] = &[
    0x00, 0x20, 0x80, 0x38, 0x81, 0x44, 0x20, 10, 0x11, 0x80, 0x12, 0x81, 0x63, 0x12, 0x33, 0x82,
    0xC0, 0x00,
];

#[test]
fn test_float_sum_image() -> Result<()> {
    let image = Image::decode(FLOAT_SUM)?;
    assert_eq!(image.entry_point(), 0x20);

    let mut mem = Memory::default();
    let mut cpu = Processor::new(Some(&mut mem))?;
    cpu.load_image(&image)?;
    cpu.start()?;

    assert_eq!(cpu.run(Some(100))?, 5);
    assert!(cpu.is_halted());
    assert_eq!(cpu.registers[Reg::new(3)], 0x50);
    drop(cpu);

    assert_eq!(mem.read_byte(0x82), 0x50); // 1.5 + 2.5 = 4.0
    assert_eq!(mem.read_byte(0x00), 0x20);

    Ok(())
}

#[test]
fn test_bit_twiddling_little_endian_image() -> Result<()> {
    // words are stored low byte first
    let bytes = [
        0x00, 0x10, // entry point
        0x10, 12, // block of 6 words
        0xF0, 0x21, // LDL r1, 0xF0
        0x3C, 0x22, // LDL r2, 0x3C
        0x12, 0x93, // XOR r3, r1, r2
        0x02, 0xA3, // ROT r3, 2
        0x90, 0x33, // STM [0x90], r3
        0x00, 0xC0, // HALT
    ];
    let image = Image::decode(&bytes)?;

    let mut mem = Memory::default();
    let config = Config::default().with_endianness(Endianness::Little);
    let mut cpu = Processor::with_config(Some(&mut mem), config)?;
    cpu.load_image(&image)?;
    cpu.start()?;
    cpu.run(None)?;
    drop(cpu);

    // 0xF0 ^ 0x3C = 0xCC, rotated right by two
    assert_eq!(mem.read_byte(0x90), 0x33);

    Ok(())
}

#[test]
fn test_failed_decode_leaves_memory_alone() -> Result<()> {
    let good = Image::decode(FLOAT_SUM)?;
    let mut mem = Memory::default();
    let mut cpu = Processor::new(Some(&mut mem))?;
    cpu.load_image(&good)?;

    let mut oversized = FLOAT_SUM.to_vec();
    oversized.extend_from_slice(&[0x20, 0xF0]);
    oversized.extend(std::iter::repeat(0xAA).take(0xF0));

    let err = Image::decode(&oversized).unwrap_err();
    assert!(matches!(
        err,
        Error::Format {
            reason: FormatError::InputTooLong { .. }
        }
    ));
    assert_eq!(cpu.memory(), Some(good.memory()));

    let overflowing = [0x00, 0xF0, 0xF0, 0x20];
    assert!(matches!(
        Image::decode(&overflowing),
        Err(Error::Format { .. })
    ));

    Ok(())
}
