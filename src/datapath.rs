/*!
  The datapath: a fixed-capacity operand stack with a head register, and a single-cycle
  arithmetic/logic unit that reads the top of the stack and latches its result in an
  accumulator for the next microcode step.

  Booleans are words on the stack: `TRUE` is `-1` and `FALSE` is `0`. They only become Rust
  `bool`s when the control unit asks for a branch decision.
*/

use strum_macros::Display as StrumDisplay;

use crate::bytecode::{Opcode, Word};
use crate::error::{ConfigError, MachineError};

pub const STACK_CAPACITY : usize = 256;
/// The deepest word the microcode can see below the top of the stack.
pub const MAX_OFFSET     : usize = 3;

pub const TRUE  : Word = -1;
pub const FALSE : Word = 0;

/// Operations of the ALU. Binary operations read `top(1)` and `top(0)`.
#[derive(StrumDisplay, Clone, Copy, Eq, PartialEq, Debug, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum AluOp {
  /// `top(1) % top(0)`, rounded toward negative infinity
  Mod,
  Plus,
  Mult,
  /// `top(0) ** top(1)`: the base is on top, the exponent below it
  Pow,
  /// `top(1) < top(0)`
  Lt,
  Neg,
  /// `-(top(0) + 1)`
  Invert,
  /// `top(1) + 1`, the pointer auto-increment of indirect addressing
  Increment,
  /// `FALSE` if `top(0)` is `TRUE`, `TRUE` otherwise
  NotTrue,
}

impl AluOp {
  /// The ALU operation an arithmetic opcode selects, if it has one.
  pub fn for_opcode(opcode: Opcode) -> Option<AluOp> {
    match opcode {
      Opcode::Mod    => Some(AluOp::Mod),
      Opcode::Plus   => Some(AluOp::Plus),
      Opcode::Mult   => Some(AluOp::Mult),
      Opcode::Pow    => Some(AluOp::Pow),
      Opcode::Lt     => Some(AluOp::Lt),
      Opcode::Neg    => Some(AluOp::Neg),
      Opcode::Invert => Some(AluOp::Invert),
      _              => None
    }
  }

  /// Number of operands the operation consumes when its opcode retires.
  pub fn arity(&self) -> usize {
    match self {
      AluOp::Neg | AluOp::Invert | AluOp::NotTrue => 1,
      _ => 2
    }
  }
}

fn truth(condition: bool) -> Word {
  if condition { TRUE } else { FALSE }
}

pub struct DataPath {
  stack : Vec<Word>,
  head  : usize,  // Number of occupied slots
  alu   : Word,   // Accumulator
}

impl DataPath {

  pub fn new(capacity: usize) -> Result<DataPath, ConfigError> {
    if capacity == 0 {
      return Err(ConfigError::EmptyStack);
    }
    Ok(DataPath {
      stack : vec![0; capacity],
      head  : 0,
      alu   : 0,
    })
  }

  pub fn head(&self) -> usize {
    self.head
  }

  pub fn capacity(&self) -> usize {
    self.stack.len()
  }

  pub fn alu(&self) -> Word {
    self.alu
  }

  /// The occupied part of the stack, bottom first.
  pub fn words(&self) -> &[Word] {
    &self.stack[..self.head]
  }

  /// The word `offset` places below the top of the stack.
  pub fn top(&self, offset: usize) -> Result<Word, MachineError> {
    if offset > MAX_OFFSET {
      return Err(MachineError::StackOffset { offset, max: MAX_OFFSET });
    }
    if offset >= self.head {
      return Err(MachineError::StackUnderflow { offset, head: self.head });
    }
    Ok(self.stack[self.head - offset - 1])
  }

  /// `top(offset) + 1`, driven onto the bus for the write-back of indirect addressing.
  pub fn top_incremented(&self, offset: usize) -> Result<Word, MachineError> {
    self.top(offset)?
      .checked_add(1)
      .ok_or(MachineError::Overflow(AluOp::Increment))
  }

  /// Moves the head by one of the step sizes the microcode uses: `+1`, `-1`, `-2` or `-3`.
  pub fn adjust_head(&mut self, delta: isize) -> Result<(), MachineError> {
    match delta {
      1 | -1 | -2 | -3 => {}
      _ => return Err(MachineError::IllegalHeadDelta(delta))
    }
    let head = self.head as isize + delta;
    if head < 0 || head >= self.capacity() as isize {
      return Err(MachineError::StackBounds { head: self.head, delta, capacity: self.capacity() });
    }
    self.head = head as usize;
    Ok(())
  }

  pub fn push(&mut self, value: Word) -> Result<(), MachineError> {
    self.stack[self.head] = value;
    self.adjust_head(1)
  }

  /// Consumes the top of the stack as a branch condition.
  pub fn pop_truth(&mut self) -> Result<bool, MachineError> {
    self.latch_alu(AluOp::NotTrue)?;
    self.adjust_head(-1)?;
    Ok(self.alu != TRUE)
  }

  pub fn latch_alu(&mut self, op: AluOp) -> Result<(), MachineError> {
    let overflow = MachineError::Overflow(op);
    self.alu =
      match op {

        AluOp::Mod => {
          let (a, b) = (self.top(1)?, self.top(0)?);
          if b == 0 {
            return Err(MachineError::DivisionByZero(op));
          }
          let r = a.checked_rem(b).ok_or(overflow)?;
          if r != 0 && (r < 0) != (b < 0) { r + b } else { r }
        }

        AluOp::Plus => self.top(1)?.checked_add(self.top(0)?).ok_or(overflow)?,

        AluOp::Mult => self.top(1)?.checked_mul(self.top(0)?).ok_or(overflow)?,

        AluOp::Pow => {
          let (base, exponent) = (self.top(0)?, self.top(1)?);
          if exponent < 0 {
            return Err(MachineError::NegativeExponent(exponent));
          }
          base.checked_pow(exponent as u32).ok_or(overflow)?
        }

        AluOp::Lt => truth(self.top(1)? < self.top(0)?),

        AluOp::Neg => self.top(0)?.checked_neg().ok_or(overflow)?,

        AluOp::Invert => {
          self.top(0)?
            .checked_add(1)
            .and_then(Word::checked_neg)
            .ok_or(overflow)?
        }

        AluOp::Increment => self.top(1)?.checked_add(1).ok_or(overflow)?,

        AluOp::NotTrue => truth(self.top(0)? != TRUE),

      };
    Ok(())
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn stack(words: &[Word]) -> DataPath {
    let mut dp = DataPath::new(STACK_CAPACITY).unwrap();
    for w in words {
      dp.push(*w).unwrap();
    }
    dp
  }

  fn alu(words: &[Word], op: AluOp) -> Result<Word, MachineError> {
    let mut dp = stack(words);
    dp.latch_alu(op)?;
    Ok(dp.alu())
  }

  #[test]
  fn top_offsets() {
    let dp = stack(&[1, 2, 3, 4, 5]);
    assert_eq!(dp.top(0), Ok(5));
    assert_eq!(dp.top(3), Ok(2));
    assert_eq!(dp.top(4), Err(MachineError::StackOffset { offset: 4, max: 3 }));
    let dp = stack(&[1]);
    assert_eq!(dp.top(1), Err(MachineError::StackUnderflow { offset: 1, head: 1 }));
  }

  #[test]
  fn head_deltas() {
    let mut dp = stack(&[1, 2, 3]);
    assert_eq!(dp.adjust_head(2), Err(MachineError::IllegalHeadDelta(2)));
    assert_eq!(dp.adjust_head(0), Err(MachineError::IllegalHeadDelta(0)));
    dp.adjust_head(-3).unwrap();
    assert_eq!(dp.head(), 0);
    assert!(dp.adjust_head(-1).is_err());
    assert_eq!(dp.head(), 0);
  }

  #[test]
  fn head_stays_below_capacity() {
    let mut dp = DataPath::new(4).unwrap();
    for w in 0..3 {
      dp.push(w).unwrap();
    }
    assert_eq!(
      dp.push(3),
      Err(MachineError::StackBounds { head: 3, delta: 1, capacity: 4 })
    );
    assert_eq!(dp.head(), 3);
    assert_eq!(dp.words(), &[0, 1, 2]);
    assert_eq!(DataPath::new(0).err(), Some(ConfigError::EmptyStack));
  }

  #[test]
  fn binary_operations() {
    assert_eq!(alu(&[3, 4], AluOp::Plus), Ok(7));
    assert_eq!(alu(&[3, 4], AluOp::Mult), Ok(12));
    assert_eq!(alu(&[7, 3], AluOp::Mod), Ok(1));
    assert_eq!(alu(&[-7, 3], AluOp::Mod), Ok(2));
    assert_eq!(alu(&[7, -3], AluOp::Mod), Ok(-2));
    assert_eq!(alu(&[5, 3], AluOp::Lt), Ok(FALSE));
    assert_eq!(alu(&[3, 5], AluOp::Lt), Ok(TRUE));
    assert_eq!(alu(&[9, 4], AluOp::Increment), Ok(10));
  }

  #[test]
  fn pow_takes_its_base_from_the_top() {
    // top(1) = 3 is the exponent, top(0) = 2 the base.
    assert_eq!(alu(&[3, 2], AluOp::Pow), Ok(8));
    assert_eq!(alu(&[2, 3], AluOp::Pow), Ok(9));
    assert_eq!(alu(&[0, 5], AluOp::Pow), Ok(1));
    assert_eq!(alu(&[-1, 5], AluOp::Pow), Err(MachineError::NegativeExponent(-1)));
  }

  #[test]
  fn unary_operations() {
    assert_eq!(alu(&[5], AluOp::Neg), Ok(-5));
    assert_eq!(alu(&[5], AluOp::Invert), Ok(-6));
    assert_eq!(alu(&[TRUE], AluOp::Invert), Ok(FALSE));
    assert_eq!(alu(&[FALSE], AluOp::Invert), Ok(TRUE));
    assert_eq!(alu(&[TRUE], AluOp::NotTrue), Ok(FALSE));
    assert_eq!(alu(&[FALSE], AluOp::NotTrue), Ok(TRUE));
    assert_eq!(alu(&[17], AluOp::NotTrue), Ok(TRUE));
  }

  #[test]
  fn arithmetic_faults() {
    assert_eq!(alu(&[1, 0], AluOp::Mod), Err(MachineError::DivisionByZero(AluOp::Mod)));
    assert_eq!(alu(&[Word::MAX, 1], AluOp::Plus), Err(MachineError::Overflow(AluOp::Plus)));
    assert_eq!(alu(&[Word::MIN], AluOp::Neg), Err(MachineError::Overflow(AluOp::Neg)));
    assert_eq!(alu(&[Word::MIN, -1], AluOp::Mod), Err(MachineError::Overflow(AluOp::Mod)));
    assert_eq!(alu(&[3], AluOp::Plus), Err(MachineError::StackUnderflow { offset: 1, head: 1 }));
  }

  #[test]
  fn pop_truth_consumes() {
    let mut dp = stack(&[7, TRUE, FALSE]);
    assert_eq!(dp.pop_truth(), Ok(false));
    assert_eq!(dp.pop_truth(), Ok(true));
    assert_eq!(dp.pop_truth(), Ok(false));
    assert_eq!(dp.head(), 0);
    assert!(dp.pop_truth().is_err());
  }

  #[test]
  fn opcode_selection() {
    assert_eq!(AluOp::for_opcode(Opcode::Pow), Some(AluOp::Pow));
    assert_eq!(AluOp::for_opcode(Opcode::Div), None);
    assert_eq!(AluOp::for_opcode(Opcode::Minus), None);
    assert_eq!(AluOp::Invert.arity(), 1);
    assert_eq!(AluOp::Lt.arity(), 2);
  }
}
