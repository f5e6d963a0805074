//! The meaning of a raw memory address: one of the two I/O ports, a data word, or a word of
//! program text.

use std::fmt::{Display, Formatter};

// `AddressNumberType` is `usize`, as it is naturally an index into a memory store.
pub type AddressNumberType = usize;

/// Reading this address consumes one character of input.
pub const INPUT_PORT  : AddressNumberType = 0;
/// Writing this address appends to the output.
pub const OUTPUT_PORT : AddressNumberType = 1;
/// First general data word.
pub const DATA_START  : AddressNumberType = 2;
/// Program text never starts below this address, and the initial data segment never
/// reaches it.
pub const PROGRAM_BASE: AddressNumberType = 128;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum Address {
  InputPort,
  OutputPort,
  /// A general data word.
  Data(AddressNumberType),
  /// A word of program text, reachable only through the program counter.
  Program(AddressNumberType)
}

impl Address {
  /// Classifies a raw address, given where the program text begins.
  pub fn classify(raw: AddressNumberType, program_start: AddressNumberType) -> Address {
    match raw {
      INPUT_PORT                 => Address::InputPort,
      OUTPUT_PORT                => Address::OutputPort,
      a if a >= program_start    => Address::Program(a),
      a                          => Address::Data(a),
    }
  }

  /// Converts the address back to an index into memory.
  pub fn idx(&self) -> AddressNumberType {
    match self {
      Address::InputPort  => INPUT_PORT,
      Address::OutputPort => OUTPUT_PORT,
      Address::Data(i)    => *i,
      Address::Program(i) => *i,
    }
  }

  pub fn is_port(&self) -> bool {
    match self {
      Address::InputPort | Address::OutputPort => true,
      _ => false
    }
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Address::InputPort  => write!(f, "IN"),
      Address::OutputPort => write!(f, "OUT"),
      Address::Data(i)    => write!(f, "MEM[{}]", i),
      Address::Program(i) => write!(f, "PROG[{}]", i),
    }
  }
}
