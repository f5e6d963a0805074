use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{Display as StrumDisplay, EnumString};

use crate::bytecode::Term;
use crate::error::MachineError;

/// A machine word. The translator emits 32 bit signed integers.
pub type Word = i32;

/**
  Opcodes of the virtual machine.

  The text form of each opcode is the mnemonic the translator writes into the program
  container. The short forms `WR_DIR`, `WR_NDR` and `INV` are accepted when parsing. The
  numeric form indexes the per-opcode statistics of a run, so the order below is stable.
*/
#[derive(
  StrumDisplay, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,       Eq, PartialEq,    Debug,         Hash
)]
#[repr(u8)]
pub enum Opcode {
  // Memory access //
  #[strum(to_string = "WRITE_DIR", serialize = "WR_DIR")]
  WriteDirect,
  #[strum(to_string = "WRITE_NDR", serialize = "WR_NDR")]
  WriteIndirect,
  #[strum(to_string = "READ_DIR")]
  ReadDirect,
  #[strum(to_string = "READ_NDR")]
  ReadIndirect,

  // I/O //
  #[strum(to_string = "PRINT")]
  Print,

  // Markers //
  #[strum(to_string = "BEGIN")]
  Begin,
  #[strum(to_string = "NOP")]
  Nop,

  // Arithmetic and logic //
  #[strum(to_string = "MOD")]
  Mod,
  #[strum(to_string = "PLUS")]
  Plus,
  #[strum(to_string = "MINUS")]
  Minus,
  #[strum(to_string = "MULT")]
  Mult,
  #[strum(to_string = "DIV")]
  Div,
  #[strum(to_string = "POW")]
  Pow,
  #[strum(to_string = "LT")]
  Lt,
  #[strum(to_string = "NEG")]
  Neg,
  #[strum(to_string = "INVERT", serialize = "INV")]
  Invert,

  // Stack shuffle //
  #[strum(to_string = "DUP")]
  Dup,
  #[strum(to_string = "OVER")]
  Over,
  #[strum(to_string = "ROT")]
  Rot,
  #[strum(to_string = "SWAP")]
  Swap,
  #[strum(to_string = "PUSH")]
  Push,
  #[strum(to_string = "DROP")]
  Drop,

  // Control flow //
  #[strum(to_string = "JMP")]
  Jmp,
  #[strum(to_string = "JNT")]
  Jnt,
  #[strum(to_string = "HALT")]
  Halt,
}

/// Number of opcodes, one past the largest opcode code.
pub const OPCODE_COUNT: usize = 25;

impl Opcode {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// Recovers an opcode from its code, if the code names one.
  pub fn from_code(code: u8) -> Option<Opcode> {
    Opcode::try_from(code).ok()
  }

  /// `PUSH`, `JMP` and `JNT` carry an argument; nothing else does.
  pub fn takes_argument(&self) -> bool {
    match self {
      Opcode::Push | Opcode::Jmp | Opcode::Jnt => true,
      _ => false
    }
  }

  pub fn is_jump(&self) -> bool {
    match self {
      Opcode::Jmp | Opcode::Jnt => true,
      _ => false
    }
  }
}

impl Serialize for Opcode {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for Opcode {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Opcode, D::Error> {
    let name = String::deserialize(deserializer)?;
    Opcode::from_str(&name)
      .map_err(|_| de::Error::custom(format!("unknown opcode `{}`", name)))
  }
}

/**
  The argument of an instruction: a numeric literal or jump target, or a single character
  whose code is the value. A string that spells an integer is a number, since the translator
  may quote numeric literals.
*/
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawArgument", into = "RawArgument")]
pub enum Argument {
  Number(Word),
  Char(char),
}

// The shape of an argument in the container.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawArgument {
  Number(Word),
  Text(String),
}

impl TryFrom<RawArgument> for Argument {
  type Error = String;

  fn try_from(raw: RawArgument) -> Result<Argument, String> {
    match raw {

      RawArgument::Number(value) => Ok(Argument::Number(value)),

      RawArgument::Text(text) => {
        if let Ok(value) = text.trim().parse::<Word>() {
          return Ok(Argument::Number(value));
        }
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
          (Some(c), None) => Ok(Argument::Char(c)),
          _ => Err(format!("`{}` is neither a number nor a single character", text))
        }
      }

    }
  }
}

impl From<Argument> for RawArgument {
  fn from(argument: Argument) -> RawArgument {
    match argument {
      Argument::Number(value) => RawArgument::Number(value),
      Argument::Char(c)       => RawArgument::Text(c.to_string()),
    }
  }
}

impl Argument {
  /// The value the argument pushes: the number itself, or the character's code.
  pub fn value(&self) -> Word {
    match self {
      Argument::Number(value) => *value,
      Argument::Char(c)       => *c as u32 as Word,
    }
  }
}

impl Display for Argument {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Argument::Number(value) => write!(f, "{}", value),
      Argument::Char(c)       => write!(f, "'{}'", c.escape_default()),
    }
  }
}

/// One entry of the program text.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Instruction {
  pub opcode : Opcode,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub arg    : Option<Argument>,
  /// Provenance only; never consulted by the machine.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub term   : Option<Term>,
}

impl Instruction {
  pub fn new(opcode: Opcode) -> Instruction {
    Instruction { opcode, arg: None, term: None }
  }

  pub fn with_arg(opcode: Opcode, arg: Argument) -> Instruction {
    Instruction { opcode, arg: Some(arg), term: None }
  }

  pub fn with_term(mut self, term: Term) -> Instruction {
    self.term = Some(term);
    self
  }

  fn argument(&self) -> Result<Argument, MachineError> {
    self.arg.ok_or(MachineError::MissingArgument(self.opcode))
  }

  /// The value pushed by `PUSH`.
  pub fn literal(&self) -> Result<Word, MachineError> {
    Ok(self.argument()?.value())
  }

  /// The program counter a jump lands on.
  pub fn target(&self) -> Result<usize, MachineError> {
    match self.argument()? {
      Argument::Number(value) if value >= 0 => Ok(value as usize),
      other => Err(MachineError::InvalidArgument {
        opcode   : self.opcode,
        argument : other.to_string(),
      })
    }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match &self.arg {
      Some(arg) => write!(f, "{} {}", self.opcode, arg),
      None      => write!(f, "{}", self.opcode),
    }
  }
}
