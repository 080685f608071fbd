use std::convert::TryFrom;
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::error::{Error, Result};
use crate::memory::image::{Image, ADDR_PROGRAM_COUNTER};
use crate::memory::{Address, Byte, Endianness, Memory, Word};
use crate::minifloat::Minifloat;
use log::*;
use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

/// Number of general purpose registers
pub const REGISTER_COUNT: usize = 16;

/// Index of one of the 16 registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Reg(u8);

impl Reg {
    /// Register compared against by [`Instruction::JumpIfEq`]
    pub const R0: Self = Self(0);

    /// Creates a register index from the low nibble of `index`
    pub const fn new(index: u8) -> Self {
        Self(index & 0x0F)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{:x}", self.0)
    }
}

/// The register file, `r0` to `rf`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Registers {
    pub slots: [Byte; REGISTER_COUNT],
}

impl Index<Reg> for Registers {
    type Output = Byte;

    fn index(&self, reg: Reg) -> &Byte {
        &self.slots[reg.index()]
    }
}

impl IndexMut<Reg> for Registers {
    fn index_mut(&mut self, reg: Reg) -> &mut Byte {
        &mut self.slots[reg.index()]
    }
}

macro_rules! opcodes {
    ( $( $( #[doc = $doc:expr] )+ $name:ident ( $mnemonic:literal ) = $repr:literal , )+ ) => {
        /// The opcode nibble of an instruction word
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Opcode {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Opcode {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            pub fn mnemonic(&self) -> &'static str {
                match self {
                    $( Self::$name => $mnemonic , )+
                }
            }
        }

        impl ::std::fmt::Display for Opcode {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.mnemonic())
            }
        }
    }
}

opcodes! {
    /// Load a register with a byte from memory
    LoadMem("LDM") = 0x1,
    /// Load a register with the literal low byte
    LoadLiteral("LDL") = 0x2,
    /// Write a register to memory
    StoreMem("STM") = 0x3,
    /// Copy a register to another register (reserved)
    CopyReg("CPY") = 0x4,
    /// Add two signed integers (reserved)
    AddInt("ADDI") = 0x5,
    /// Add two minifloats
    AddFloat("ADDF") = 0x6,
    /// Bitwise OR of two registers
    Or("OR") = 0x7,
    /// Bitwise AND of two registers
    And("AND") = 0x8,
    /// Bitwise XOR of two registers
    Xor("XOR") = 0x9,
    /// Rotate a register to the right
    Rotate("ROT") = 0xA,
    /// Jump if a register equals r0
    JumpIfEq("JEQ") = 0xB,
    /// Stop the execution of the program
    Halt("HALT") = 0xC,
    /// Vendor specific instructions (reserved)
    Extension("EXT") = 0xE,
}

/// A decoded instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    LoadMem { dst: Reg, addr: Address },
    LoadLiteral { dst: Reg, value: Byte },
    StoreMem { src: Reg, addr: Address },
    AddFloat { dst: Reg, lhs: Reg, rhs: Reg },
    Or { dst: Reg, lhs: Reg, rhs: Reg },
    And { dst: Reg, lhs: Reg, rhs: Reg },
    Xor { dst: Reg, lhs: Reg, rhs: Reg },
    /// Rotates `reg` right by `amount % 8`
    Rotate { reg: Reg, amount: u8 },
    JumpIfEq { reg: Reg, target: Address },
    Halt,
    /// A defined opcode without behaviour yet. Executes as a no-op.
    Reserved { opcode: Opcode, operands: Word },
}

impl Instruction {
    /// Splits `word` into its opcode and parameter nibbles
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedInstruction`] if the opcode is not
    /// defined. `pc` is only used for the error.
    pub fn decode(word: Word, pc: Address) -> Result<Self> {
        let opcode = Opcode::try_from((word >> 12) as u8)
            .map_err(|_| Error::UnsupportedInstruction { word, pc })?;

        let p1 = Reg::new((word >> 8) as u8);
        let p2 = Reg::new((word >> 4) as u8);
        let p3 = Reg::new(word as u8);
        let low = (word & 0x00FF) as Byte;

        let instruction = match opcode {
            Opcode::LoadMem => Self::LoadMem { dst: p1, addr: low },
            Opcode::LoadLiteral => Self::LoadLiteral { dst: p1, value: low },
            Opcode::StoreMem => Self::StoreMem { src: p1, addr: low },
            Opcode::AddFloat => Self::AddFloat { dst: p1, lhs: p2, rhs: p3 },
            Opcode::Or => Self::Or { dst: p1, lhs: p2, rhs: p3 },
            Opcode::And => Self::And { dst: p1, lhs: p2, rhs: p3 },
            Opcode::Xor => Self::Xor { dst: p1, lhs: p2, rhs: p3 },
            Opcode::Rotate => Self::Rotate {
                reg: p1,
                amount: p3.0,
            },
            Opcode::JumpIfEq => Self::JumpIfEq {
                reg: p1,
                target: low,
            },
            Opcode::Halt => Self::Halt,
            Opcode::CopyReg | Opcode::AddInt | Opcode::Extension => Self::Reserved {
                opcode,
                operands: word & 0x0FFF,
            },
        };

        Ok(instruction)
    }

    /// Packs the instruction back into a word
    pub fn encode(&self) -> Word {
        let pack = |opcode: Opcode, p1: u8, p2: u8, p3: u8| -> Word {
            (u8::from(opcode) as Word) << 12
                | ((p1 & 0xF) as Word) << 8
                | ((p2 & 0xF) as Word) << 4
                | (p3 & 0xF) as Word
        };
        let with_byte = |opcode: Opcode, p1: Reg, byte: Byte| -> Word {
            (u8::from(opcode) as Word) << 12 | (p1.0 as Word) << 8 | byte as Word
        };

        match *self {
            Self::LoadMem { dst, addr } => with_byte(Opcode::LoadMem, dst, addr),
            Self::LoadLiteral { dst, value } => with_byte(Opcode::LoadLiteral, dst, value),
            Self::StoreMem { src, addr } => with_byte(Opcode::StoreMem, src, addr),
            Self::AddFloat { dst, lhs, rhs } => pack(Opcode::AddFloat, dst.0, lhs.0, rhs.0),
            Self::Or { dst, lhs, rhs } => pack(Opcode::Or, dst.0, lhs.0, rhs.0),
            Self::And { dst, lhs, rhs } => pack(Opcode::And, dst.0, lhs.0, rhs.0),
            Self::Xor { dst, lhs, rhs } => pack(Opcode::Xor, dst.0, lhs.0, rhs.0),
            Self::Rotate { reg, amount } => pack(Opcode::Rotate, reg.0, 0, amount),
            Self::JumpIfEq { reg, target } => with_byte(Opcode::JumpIfEq, reg, target),
            Self::Halt => pack(Opcode::Halt, 0, 0, 0),
            Self::Reserved { opcode, operands } => {
                (u8::from(opcode) as Word) << 12 | (operands & 0x0FFF)
            }
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Self::LoadMem { .. } => Opcode::LoadMem,
            Self::LoadLiteral { .. } => Opcode::LoadLiteral,
            Self::StoreMem { .. } => Opcode::StoreMem,
            Self::AddFloat { .. } => Opcode::AddFloat,
            Self::Or { .. } => Opcode::Or,
            Self::And { .. } => Opcode::And,
            Self::Xor { .. } => Opcode::Xor,
            Self::Rotate { .. } => Opcode::Rotate,
            Self::JumpIfEq { .. } => Opcode::JumpIfEq,
            Self::Halt => Opcode::Halt,
            Self::Reserved { opcode, .. } => *opcode,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.opcode();
        match *self {
            Self::LoadMem { dst, addr } => write!(f, "{} {}, [0x{:02X}]", op, dst, addr),
            Self::LoadLiteral { dst, value } => write!(f, "{} {}, 0x{:02X}", op, dst, value),
            Self::StoreMem { src, addr } => write!(f, "{} [0x{:02X}], {}", op, addr, src),
            Self::AddFloat { dst, lhs, rhs }
            | Self::Or { dst, lhs, rhs }
            | Self::And { dst, lhs, rhs }
            | Self::Xor { dst, lhs, rhs } => write!(f, "{} {}, {}, {}", op, dst, lhs, rhs),
            Self::Rotate { reg, amount } => write!(f, "{} {}, {}", op, reg, amount % 8),
            Self::JumpIfEq { reg, target } => write!(f, "{} {}, 0x{:02X}", op, reg, target),
            Self::Halt => f.write_str(op.mnemonic()),
            Self::Reserved { operands, .. } => write!(f, "{} 0x{:03X} (reserved)", op, operands),
        }
    }
}

/// What to do when a fetched word has no defined opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedPolicy {
    /// Log a warning and treat the word as a no-op
    Ignore,
    /// Stop with [`Error::UnsupportedInstruction`]
    Fail,
}

impl Default for UnsupportedPolicy {
    fn default() -> Self {
        Self::Ignore
    }
}

/// Processor settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    /// Byte order of instruction words in memory
    pub endianness: Endianness,
    pub on_unsupported: UnsupportedPolicy,
}

impl Config {
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    pub fn with_unsupported_policy(mut self, policy: UnsupportedPolicy) -> Self {
        self.on_unsupported = policy;
        self
    }
}

/// Visible processor state, everything but memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct State {
    pub registers: Registers,
    /// Instruction register, the last fetched word
    pub ir: Word,
    /// Program counter
    pub pc: Address,
}

/// Emulates a CPU working on memory borrowed from the caller
#[derive(Debug)]
pub struct Processor<'m> {
    pub registers: Registers,
    /// Instruction register
    pub ir: Word,
    /// Program counter
    pub pc: Address,
    config: Config,
    memory: Option<&'m mut Memory>,
}

impl<'m> Processor<'m> {
    /// Initializes a new CPU bound to `memory`
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Configuration`] if no memory is given.
    pub fn new(memory: Option<&'m mut Memory>) -> Result<Self> {
        Self::with_config(memory, Config::default())
    }

    pub fn with_config(memory: Option<&'m mut Memory>, config: Config) -> Result<Self> {
        let memory = memory.ok_or(Error::Configuration)?;

        Ok(Self {
            registers: Registers::default(),
            ir: 0x0000,
            pc: 0x00,
            config,
            memory: Some(memory),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Binds a memory block, returning the previously bound one
    pub fn bind_memory(&mut self, memory: &'m mut Memory) -> Option<&'m mut Memory> {
        self.memory.replace(memory)
    }

    /// Hands the memory block back to the caller. Until a new block is bound
    /// the processor refuses to run.
    pub fn release_memory(&mut self) -> Option<&'m mut Memory> {
        self.memory.take()
    }

    /// Read only view of the bound memory
    pub fn memory(&self) -> Option<&Memory> {
        self.memory.as_deref()
    }

    fn memory_mut(&mut self) -> Result<&mut Memory> {
        self.memory.as_deref_mut().ok_or(Error::Configuration)
    }

    pub fn state(&self) -> State {
        State {
            registers: self.registers,
            ir: self.ir,
            pc: self.pc,
        }
    }

    /// Whether the last fetched word is a HALT
    pub fn is_halted(&self) -> bool {
        (self.ir >> 12) as u8 == u8::from(Opcode::Halt)
    }

    /// Jumps to the entry point stored in memory cell 0
    pub fn start(&mut self) -> Result<()> {
        let entry_point = self.memory_mut()?.read_byte(ADDR_PROGRAM_COUNTER);
        self.pc = entry_point;

        debug!("Start at 0x{:02X}", entry_point);
        Ok(())
    }

    /// Overwrites the whole memory with the image. The program counter is
    /// left alone; call [`Processor::start`] afterwards.
    pub fn load_image(&mut self, image: &Image) -> Result<()> {
        *self.memory_mut()? = *image.memory();
        Ok(())
    }

    /// Executes a decoded instruction. Returns whether the program counter
    /// should move on to the next word.
    fn execute_instruction(&mut self, instruction: Instruction) -> Result<bool> {
        let regs = &mut self.registers;

        match instruction {
            Instruction::LoadMem { dst, addr } => {
                let value = self
                    .memory
                    .as_deref()
                    .ok_or(Error::Configuration)?
                    .read_byte(addr);
                regs[dst] = value;
            }
            Instruction::LoadLiteral { dst, value } => {
                regs[dst] = value;
            }
            Instruction::StoreMem { src, addr } => {
                self.memory
                    .as_deref_mut()
                    .ok_or(Error::Configuration)?
                    .write_byte(addr, regs[src]);
            }
            Instruction::AddFloat { dst, lhs, rhs } => {
                let sum = Minifloat(regs[lhs]) + Minifloat(regs[rhs]);
                trace!("{} + {} = {}", Minifloat(regs[lhs]), Minifloat(regs[rhs]), sum);
                regs[dst] = sum.bits();
            }
            Instruction::Or { dst, lhs, rhs } => {
                regs[dst] = regs[lhs] | regs[rhs];
            }
            Instruction::And { dst, lhs, rhs } => {
                regs[dst] = regs[lhs] & regs[rhs];
            }
            Instruction::Xor { dst, lhs, rhs } => {
                regs[dst] = regs[lhs] ^ regs[rhs];
            }
            Instruction::Rotate { reg, amount } => {
                regs[reg] = regs[reg].rotate_right((amount % 8) as u32);
            }
            Instruction::JumpIfEq { reg, target } => {
                if regs[reg] == regs[Reg::R0] {
                    self.pc = target;
                    return Ok(false);
                }
            }
            Instruction::Halt => return Ok(false),
            Instruction::Reserved { opcode, .. } => {
                trace!("{} is reserved, skipping", opcode);
            }
        }

        Ok(true)
    }

    /// Runs one fetch-decode-execute cycle
    pub fn cycle(&mut self) -> Result<()> {
        let pc = self.pc;
        let endianness = self.config.endianness;
        self.ir = self.memory_mut()?.read_word(pc, endianness);

        let advance = match Instruction::decode(self.ir, pc) {
            Ok(instruction) => {
                debug!("0x{:02X}: 0x{:04X} -> {}", pc, self.ir, instruction);
                self.execute_instruction(instruction)?
            }
            Err(err) => match self.config.on_unsupported {
                UnsupportedPolicy::Ignore => {
                    warn!("{}, skipping", err);
                    true
                }
                UnsupportedPolicy::Fail => return Err(err),
            },
        };

        if advance {
            self.pc = self.pc.wrapping_add(2);
        }

        Ok(())
    }

    /// Runs cycles until a HALT is fetched or `limit` cycles have run.
    /// Returns the number of cycles executed.
    pub fn run(&mut self, limit: Option<usize>) -> Result<usize> {
        let mut cycles = 0;

        while limit.map_or(true, |limit| cycles < limit) {
            self.cycle()?;
            cycles += 1;

            if self.is_halted() {
                info!("Halted at 0x{:02X} after {} cycles", self.pc, cycles);
                break;
            }
        }

        Ok(cycles)
    }
}
