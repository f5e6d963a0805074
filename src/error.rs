//! Error and stop-signal types shared by the loader, the machine, and the driver.

use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::bytecode::{Opcode, Word};
use crate::datapath::AluOp;

/// Failures while decoding or assembling a program.
#[derive(Debug, Error)]
pub enum ProgramError {
  #[error("malformed program container: {0}")]
  Json(#[from] serde_json::Error),
  #[error("line {line}: {name} is not an operation")]
  NotAnOperation { line: u32, name: String },
  #[error("line {line}: could not parse `{text}`")]
  Syntax { line: u32, text: String },
  #[error("line {line}: label `{label}` is defined more than once")]
  DuplicateLabel { line: u32, label: String },
  #[error("line {line}: undefined label `{label}`")]
  UndefinedLabel { line: u32, label: String },
  #[error("line {line}: {operation} requires an argument")]
  ArgumentMissing { line: u32, operation: Opcode },
  #[error("line {line}: {operation} takes no argument")]
  UnexpectedArgument { line: u32, operation: Opcode },
  #[error("line {line}: the data segment may only be given once")]
  DuplicateData { line: u32 },
}

/// Machine parameters that cannot host the given program.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("memory size {memory_size} must exceed the program length {program_len} plus 128")]
  MemoryTooSmall { memory_size: usize, program_len: usize },
  #[error("data segment of {data_len} words does not fit below address {limit}")]
  DataTooLarge { data_len: usize, limit: usize },
  #[error("operand stack capacity must be nonzero")]
  EmptyStack,
}

/// Protocol violations. None of these occur for a correctly produced program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MachineError {
  #[error("address {address} is outside [0, {memory_size}]")]
  AddressOutOfRange { address: Word, memory_size: usize },
  #[error("the input port is read-only")]
  WriteToInputPort,
  #[error("the output port is write-only")]
  ReadFromOutputPort,
  #[error("address {address} holds program text")]
  ProgramTextAccess { address: usize },
  #[error("no instruction at pc {pc} (program length {program_len})")]
  NoInstruction { pc: usize, program_len: usize },
  #[error("stack offset {offset} is deeper than {max}")]
  StackOffset { offset: usize, max: usize },
  #[error("stack underflow: offset {offset} with {head} words on the stack")]
  StackUnderflow { offset: usize, head: usize },
  #[error("stack head moved out of [0, {capacity}): {head} {delta:+}")]
  StackBounds { head: usize, delta: isize, capacity: usize },
  #[error("head adjustment {0} is not a microcode step")]
  IllegalHeadDelta(isize),
  #[error("{0} requires an argument")]
  MissingArgument(Opcode),
  #[error("{opcode} cannot use `{argument}` as an argument")]
  InvalidArgument { opcode: Opcode, argument: String },
  #[error("arithmetic overflow in {0}")]
  Overflow(AluOp),
  #[error("division by zero in {0}")]
  DivisionByZero(AluOp),
  #[error("negative exponent {0} in POW")]
  NegativeExponent(Word),
  #[error("{0} has no microcode")]
  UnsupportedOpcode(Opcode),
}

/// A fault annotated with where in the run it happened. `instruction` is empty when the
/// fault was the fetch itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("fault at tick {tick}, pc {pc} `{instruction}`: {source}")]
pub struct ExecutionError {
  pub tick        : u64,
  pub pc          : usize,
  pub opcode      : Option<Opcode>,
  pub instruction : String,
  pub source      : MachineError,
}

/**
  Anything that interrupts the execution of an instruction. `Halt` and `InputExhausted` end a
  run normally; `Fault` aborts it.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trap {
  Halt,
  InputExhausted,
  Fault(MachineError),
}

impl From<MachineError> for Trap {
  fn from(error: MachineError) -> Trap {
    Trap::Fault(error)
  }
}

impl Display for Trap {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Trap::Halt            => write!(f, "halt"),
      Trap::InputExhausted  => write!(f, "input exhausted"),
      Trap::Fault(error)    => write!(f, "{}", error),
    }
  }
}

pub type MachineResult<T> = Result<T, Trap>;
