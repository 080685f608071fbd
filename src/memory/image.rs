//! Images seed the memory of a processor before it starts.
//!
//! The compact format is a sequence of `(address, value)` byte pairs:
//!
//! - the first pair addressed to `0x00` sets the entry point,
//! - once the entry point is known, a pair addressed to the entry point is a
//!   block directive: its value is a byte count `n` and the next `n` input
//!   bytes are copied verbatim starting at that address,
//! - every other pair writes a single byte.
//!
//! ```text
//! 00 10        entry point 0x10
//! 05 AA        memory[0x05] = 0xAA
//! 10 04 ....   4 bytes of code copied to 0x10..0x14
//! ```

use std::io::{Read, Write};

use log::*;

use super::{Address, Byte, Memory, MEMSIZE};
use crate::error::{FormatError, Result};

/// Address whose first pair carries the entry point
pub const ADDR_PROGRAM_COUNTER: Address = 0x00;

/// A memory snapshot taken right before execution starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Image {
    entry_point: Address,
    memory: Memory,
}

impl Image {
    /// Wraps a memory snapshot. The entry point is read from cell 0.
    pub fn new(memory: Memory) -> Self {
        Self {
            entry_point: memory.read_byte(ADDR_PROGRAM_COUNTER),
            memory,
        }
    }

    /// Address the processor starts executing at
    pub fn entry_point(&self) -> Address {
        self.entry_point
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Decodes the pair encoded format.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Format`](crate::error::Error::Format) if the input is
    /// longer than the address space, ends in the middle of a pair or block, or
    /// a block runs past the last memory cell.
    pub fn decode(bytes: &[Byte]) -> Result<Self> {
        if bytes.len() > MEMSIZE {
            return Err(FormatError::InputTooLong { len: bytes.len() }.into());
        }

        let mut memory = Memory::default();
        let mut pc: Option<Address> = None;
        let mut cursor = 0;

        while cursor < bytes.len() {
            let (address, value) = match bytes.get(cursor..cursor + 2) {
                Some(&[address, value]) => (address, value),
                _ => return Err(FormatError::TruncatedPair { offset: cursor }.into()),
            };
            cursor += 2;

            if pc == Some(address) {
                let len = value as usize;
                let block = bytes.get(cursor..cursor + len).ok_or(FormatError::TruncatedBlock {
                    address,
                    len,
                    available: bytes.len() - cursor,
                })?;
                memory.write_array(address, block)?;
                cursor += len;

                trace!("block of {} bytes at 0x{:02X}", len, address);

                // cell 0 and the entry point are the same byte
                if address == ADDR_PROGRAM_COUNTER && len > 0 {
                    pc = Some(memory.read_byte(ADDR_PROGRAM_COUNTER));
                }
                continue;
            }

            if address == ADDR_PROGRAM_COUNTER {
                match pc {
                    None => {
                        trace!("entry point 0x{:02X}", value);
                        memory.write_byte(ADDR_PROGRAM_COUNTER, value);
                        pc = Some(value);
                    }
                    Some(_) => warn!("ignoring second entry point pair (0x{:02X})", value),
                }
            } else {
                trace!("0x{:02X} = 0x{:02X}", address, value);
                memory.write_byte(address, value);
            }
        }

        Ok(Self::new(memory))
    }

    /// Decodes a literal memory dump. Shorter input leaves the remaining
    /// cells zeroed.
    ///
    /// # Errors
    ///
    /// Fails if the dump is longer than [`MEMSIZE`].
    pub fn decode_raw(bytes: &[Byte]) -> Result<Self> {
        if bytes.len() > MEMSIZE {
            return Err(FormatError::InputTooLong { len: bytes.len() }.into());
        }

        let mut memory = Memory::default();
        memory.data[..bytes.len()].copy_from_slice(bytes);
        Ok(Self::new(memory))
    }

    /// Serializes the snapshot as a raw memory dump
    pub fn encode(&self) -> [Byte; MEMSIZE] {
        self.memory.data
    }

    /// Reads the whole source and decodes it, either pair encoded or raw
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Io`](crate::error::Error::Io) if reading fails, or
    /// with the errors of [`Image::decode`] / [`Image::decode_raw`].
    pub fn from_reader<R: Read>(mut reader: R, raw: bool) -> Result<Self> {
        let mut bytes = Vec::with_capacity(MEMSIZE);
        reader.read_to_end(&mut bytes)?;

        if raw {
            Self::decode_raw(&bytes)
        } else {
            Self::decode(&bytes)
        }
    }

    /// Writes the raw memory dump to `writer`
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }
}

impl From<Memory> for Image {
    fn from(memory: Memory) -> Self {
        Self::new(memory)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;

    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_decode_entry_point_and_single_byte() -> Result<()> {
        let image = Image::decode(&[0x00, 0x10, 0x05, 0xAA])?;

        assert_eq!(image.entry_point(), 0x10);
        assert_eq!(image.memory().read_byte(0x05), 0xAA);
        for (address, byte) in image.memory().data.iter().enumerate() {
            if address != 0x00 && address != 0x05 {
                assert_eq!(*byte, 0, "cell 0x{:02X}", address);
            }
        }

        Ok(())
    }

    #[test]
    fn test_decode_block_directive() -> Result<()> {
        let image = Image::decode(&[0x00, 0x02, 0x02, 0x03, 0x11, 0x22, 0x33])?;

        assert_eq!(image.entry_point(), 2);
        assert_eq!(&image.memory().data[2..5], &[0x11, 0x22, 0x33]);
        assert_eq!(image.memory().read_byte(5), 0);

        Ok(())
    }

    #[test]
    fn test_decode_pairs_after_block() -> Result<()> {
        let image = Image::decode(&[0x00, 0x20, 0x20, 0x02, 0x23, 0x7F, 0x40, 0x01])?;

        assert_eq!(&image.memory().data[0x20..0x22], &[0x23, 0x7F]);
        assert_eq!(image.memory().read_byte(0x40), 0x01);

        Ok(())
    }

    #[test]
    fn test_decode_without_entry_point() -> Result<()> {
        let image = Image::decode(&[0x05, 0x01, 0x06, 0x02])?;

        assert_eq!(image.entry_point(), 0);
        assert_eq!(image.memory().read_byte(0x05), 0x01);
        assert_eq!(image.memory().read_byte(0x06), 0x02);

        Ok(())
    }

    #[test]
    fn test_decode_no_block_before_entry_point() -> Result<()> {
        // 0x10 is only a block address once the entry point names it
        let image = Image::decode(&[0x10, 0x03, 0x00, 0x10, 0x11, 0x22])?;

        assert_eq!(image.memory().read_byte(0x10), 0x03);
        assert_eq!(image.memory().read_byte(0x11), 0x22);

        Ok(())
    }

    #[test]
    fn test_decode_second_entry_point_ignored() -> Result<()> {
        let image = Image::decode(&[0x00, 0x10, 0x00, 0x30])?;

        assert_eq!(image.entry_point(), 0x10);
        assert_eq!(image.memory().read_byte(0x00), 0x10);

        Ok(())
    }

    #[test]
    fn test_decode_block_over_entry_point_cell() -> Result<()> {
        let image = Image::decode(&[0x00, 0x00, 0x00, 0x02, 0x08, 0xC0])?;

        assert_eq!(image.entry_point(), 0x08);
        assert_eq!(image.memory().read_byte(0x00), 0x08);
        assert_eq!(image.memory().read_byte(0x01), 0xC0);

        Ok(())
    }

    #[test]
    fn test_decode_block_past_memory_end() -> Result<()> {
        let mut bytes = vec![0x00, 0xFE, 0xFE, 0x03];
        bytes.extend_from_slice(&[1, 2, 3]);

        let err = Image::decode(&bytes).unwrap_err();
        assert_eq!(
            err,
            Error::Format {
                reason: FormatError::BlockOutOfBounds {
                    address: 0xFE,
                    len: 3
                }
            }
        );

        Ok(())
    }

    #[test]
    fn test_decode_input_too_long() -> Result<()> {
        let bytes = vec![0x01; MEMSIZE + 2];
        let err = Image::decode(&bytes).unwrap_err();
        assert_eq!(
            err,
            Error::Format {
                reason: FormatError::InputTooLong { len: MEMSIZE + 2 }
            }
        );

        Ok(())
    }

    #[test]
    fn test_decode_truncated_input() -> Result<()> {
        assert!(matches!(
            Image::decode(&[0x00, 0x10, 0x05]),
            Err(Error::Format {
                reason: FormatError::TruncatedPair { offset: 2 }
            })
        ));
        assert!(matches!(
            Image::decode(&[0x00, 0x10, 0x10, 0x04, 0xAA]),
            Err(Error::Format {
                reason: FormatError::TruncatedBlock { available: 1, .. }
            })
        ));

        Ok(())
    }

    #[test]
    fn test_raw_round_trip() -> Result<()> {
        let mut bytes = [0u8; MEMSIZE];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = (i * 7 + 3) as u8;
        }

        let image = Image::decode_raw(&bytes)?;
        assert_eq!(image.encode(), bytes);
        assert_eq!(image.entry_point(), 3);

        Ok(())
    }

    #[test]
    fn test_raw_short_and_long() -> Result<()> {
        let image = Image::decode_raw(&[0x04, 0x00, 0x00, 0x00, 0xC0])?;
        assert_eq!(image.memory().read_byte(4), 0xC0);
        assert_eq!(image.memory().read_byte(5), 0x00);

        assert!(Image::decode_raw(&[0; MEMSIZE + 1]).is_err());

        Ok(())
    }

    struct BrokenPipe;

    impl Read for BrokenPipe {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_reader_and_writer_errors() -> Result<()> {
        assert_eq!(
            Image::from_reader(BrokenPipe, false),
            Err(Error::Io {
                kind: std::io::ErrorKind::BrokenPipe
            })
        );
        assert_eq!(
            Image::default().write_to(BrokenPipe),
            Err(Error::Io {
                kind: std::io::ErrorKind::BrokenPipe
            })
        );
        assert_eq!(
            Image::from_reader(&[0u8; 3][..], false),
            Err(Error::Format {
                reason: FormatError::TruncatedPair { offset: 2 }
            })
        );

        Ok(())
    }

    #[test]
    fn test_reader_and_writer() -> Result<()> {
        let image = Image::from_reader(&[0x00, 0x10, 0x05, 0xAA][..], false)?;

        let mut out = Vec::new();
        image.write_to(&mut out)?;
        assert_eq!(out.len(), MEMSIZE);
        assert_eq!(Image::from_reader(&out[..], true)?, image);

        Ok(())
    }
}
