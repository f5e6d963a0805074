use std::fmt::{Display, Formatter};

use crate::bytecode::{Instruction, Word};

/// Contents of one memory address.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Cell {
  /// A data word, or the last value latched by a port
  Word(Word),
  /// One instruction of program text
  Instruction(Instruction),
}

impl Cell {
  pub fn word(&self) -> Option<Word> {
    match self {
      Cell::Word(w) => Some(*w),
      _             => None
    }
  }

  pub fn instruction(&self) -> Option<&Instruction> {
    match self {
      Cell::Instruction(i) => Some(i),
      _                    => None
    }
  }
}

impl Display for Cell {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Cell::Word(w)        => write!(f, "{}", w),
      Cell::Instruction(i) => write!(f, "<{}>", i),
    }
  }
}
