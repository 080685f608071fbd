//! A minimal 8-bit virtual processor.
//!
//! The processor works on 256 bytes of memory and 16 byte registers. Each
//! instruction is one 16-bit word: an opcode nibble followed by three
//! parameter nibbles, or by a register nibble and an 8-bit immediate.
//! Memory is seeded from an [`Image`](memory::image::Image) before the run.

pub mod error;
pub mod memory;
pub mod minifloat;
pub mod processor;
