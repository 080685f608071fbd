use std::fmt;

use crate::error::{FormatError, Result};

pub mod image;

pub type Byte = u8; // 1 byte
pub type Word = u16; // 2 bytes
/// Every byte of memory is addressable with a single byte
pub type Address = u8;

/// Size of the memory block in bytes
pub const MEMSIZE: usize = 256;

/// Byte order used when reading a word from two consecutive cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// The byte at the lower address holds the high half of the word
    Big,
    /// The byte at the lower address holds the low half of the word
    Little,
}

impl Default for Endianness {
    fn default() -> Self {
        Self::Big
    }
}

/// Emulates memory for use with the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Memory {
    /// The actual data of the memory
    pub data: [Byte; MEMSIZE],
}

impl Default for Memory {
    /// Initializes zeroed memory
    fn default() -> Self {
        Memory { data: [0; MEMSIZE] }
    }
}

impl Memory {
    /// Reads a byte from the memory
    pub fn read_byte(&self, position: Address) -> Byte {
        self.data[position as usize]
    }

    /// Writes a byte to the memory
    pub fn write_byte(&mut self, position: Address, value: Byte) {
        self.data[position as usize] = value;
    }

    /// Reads a word from the memory. The second byte wraps around to address 0
    /// when `position` is the last cell.
    pub fn read_word(&self, position: Address, endianness: Endianness) -> Word {
        let first = self.read_byte(position);
        let second = self.read_byte(position.wrapping_add(1));
        match endianness {
            Endianness::Big => Word::from_be_bytes([first, second]),
            Endianness::Little => Word::from_le_bytes([first, second]),
        }
    }

    /// Writes a word to the memory, wrapping around like [`Memory::read_word`]
    pub fn write_word(&mut self, position: Address, value: Word, endianness: Endianness) {
        let [first, second] = match endianness {
            Endianness::Big => value.to_be_bytes(),
            Endianness::Little => value.to_le_bytes(),
        };
        self.write_byte(position, first);
        self.write_byte(position.wrapping_add(1), second);
    }

    /// Writes an array of bytes to the memory
    ///
    /// # Errors
    ///
    /// Fails without touching memory if `data` would run past the last cell.
    pub fn write_array(&mut self, position: Address, data: &[Byte]) -> Result<()> {
        let start = position as usize;
        let end = start + data.len();
        if end > MEMSIZE {
            return Err(FormatError::BlockOutOfBounds {
                address: position,
                len: data.len(),
            }
            .into());
        }

        self.data[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Renders the memory as a hex table with 16 bytes per row. Bytes that
    /// differ from `baseline` are followed by a `*`.
    pub fn hexdump<'a>(&'a self, baseline: Option<&'a Memory>) -> HexDump<'a> {
        HexDump {
            memory: self,
            baseline,
        }
    }
}

/// Hex table view of a [`Memory`], see [`Memory::hexdump`]
#[derive(Debug, Clone, Copy)]
pub struct HexDump<'a> {
    memory: &'a Memory,
    baseline: Option<&'a Memory>,
}

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.memory.data.chunks(16).enumerate() {
            write!(f, "0x{:02X}:", row * 16)?;
            for (column, byte) in chunk.iter().enumerate() {
                let changed = self
                    .baseline
                    .map_or(false, |base| base.data[row * 16 + column] != *byte);
                write!(f, " {:02X}{}", byte, if changed { '*' } else { ' ' })?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Writes a block of instructions directly into the memory, big endian,
/// starting at the given address
#[macro_export]
macro_rules! write_instructions {
    ( $mem:ident : $pos:expr => $( $instruction:expr ),+ $(,)? ) => {{
        let start: $crate::memory::Address = $pos;
        let words = [ $( $instruction.encode() ),+ ];
        for (index, word) in words.iter().enumerate() {
            $mem.write_word(
                start.wrapping_add((index * 2) as $crate::memory::Address),
                *word,
                $crate::memory::Endianness::Big,
            );
        }
    }};
}
