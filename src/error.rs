use std::io;

use thiserror::Error;

use crate::memory::{Address, Word};

/// Errors reported by the processor and the image codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The processor has no memory block bound to it
    #[error("CPU manages no memory block")]
    Configuration,
    /// The image input does not fit into the 256 byte address space
    #[error("image format error: {reason}")]
    Format { reason: FormatError },
    /// The fetched word carries an opcode outside the instruction set
    #[error("unsupported instruction 0x{word:04X} at 0x{pc:02X}")]
    UnsupportedInstruction { word: Word, pc: Address },
    /// Reading or writing an image failed
    #[error("image i/o failed: {kind:?}")]
    Io { kind: io::ErrorKind },
}

/// Why an image could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("input of {len} bytes exceeds memory capacity")]
    InputTooLong { len: usize },
    #[error("pair at offset {offset} is missing its value byte")]
    TruncatedPair { offset: usize },
    #[error("block at 0x{address:02X} wants {len} bytes but the input ends after {available}")]
    TruncatedBlock {
        address: Address,
        len: usize,
        available: usize,
    },
    #[error("block at 0x{address:02X} with {len} bytes runs past the end of memory")]
    BlockOutOfBounds { address: Address, len: usize },
}

impl From<FormatError> for Error {
    fn from(reason: FormatError) -> Self {
        Error::Format { reason }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io { kind: err.kind() }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
