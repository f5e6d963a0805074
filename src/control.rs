//! The control unit: fetches an instruction, then runs the fixed microcode sequence for its
//! opcode one tick at a time against memory and the datapath.

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};

use crate::bytecode::{Instruction, Opcode, Word};
use crate::datapath::{AluOp, DataPath};
use crate::error::{MachineError, MachineResult, Trap};
use crate::memory::Memory;

/// Ticks each opcode's microcode takes when it retires. `HALT` stops before any tick.
pub fn microcode_ticks(opcode: Opcode) -> u64 {
  match opcode {
    Opcode::ReadIndirect | Opcode::WriteIndirect => 5,
    Opcode::ReadDirect   | Opcode::WriteDirect   => 2,
    Opcode::Mod  | Opcode::Plus | Opcode::Minus | Opcode::Mult | Opcode::Div
    | Opcode::Pow | Opcode::Lt  | Opcode::Neg   | Opcode::Invert => 2,
    Opcode::Halt => 0,
    _ => 1
  }
}

pub struct ControlUnit {
  memory   : Memory,
  datapath : DataPath,
  pc       : usize,
  tick     : u64,
  current  : Option<Instruction>, // The instruction being executed
}

impl ControlUnit {

  pub fn new(memory: Memory, datapath: DataPath) -> ControlUnit {
    ControlUnit {
      memory,
      datapath,
      pc      : 0,
      tick    : 0,
      current : None,
    }
  }

  // region Accessors

  pub fn pc(&self) -> usize {
    self.pc
  }

  pub fn ticks(&self) -> u64 {
    self.tick
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  pub fn datapath(&self) -> &DataPath {
    &self.datapath
  }

  pub fn current(&self) -> Option<&Instruction> {
    self.current.as_ref()
  }

  pub fn into_memory(self) -> Memory {
    self.memory
  }

  // endregion

  fn tick(&mut self) {
    self.tick += 1;
    #[cfg(feature = "trace_computation")] println!("{}", self);
  }

  fn advance(&mut self) {
    self.pc += 1;
  }

  /// Latches `top(offset)` into the memory address register.
  fn latch_address_from(&mut self, offset: usize) -> MachineResult<()> {
    let address = self.datapath.top(offset)?;
    self.memory.latch_address(address)?;
    Ok(())
  }

  /**
    Fetches the instruction at the program counter and executes it. Returns the opcode of the
    retired instruction. `Trap::Halt` and `Trap::InputExhausted` mean the run is over.
  */
  pub fn decode_and_execute(&mut self) -> MachineResult<Opcode> {
    self.current = None;
    let instruction = self.memory.fetch_instruction(self.pc)?.clone();
    self.current    = Some(instruction.clone());
    self.execute(&instruction)?;
    Ok(instruction.opcode)
  }

  fn execute(&mut self, instruction: &Instruction) -> MachineResult<()> {
    match instruction.opcode {
      Opcode::ReadDirect    => self.read_direct(),
      Opcode::ReadIndirect  => self.read_indirect(),
      Opcode::WriteDirect   => self.write_direct(),
      Opcode::WriteIndirect => self.write_indirect(),

      Opcode::Jnt           => self.jump_if_not_true(instruction),
      Opcode::Jmp           => self.jump(instruction),
      Opcode::Halt          => Err(Trap::Halt),

      Opcode::Begin
      | Opcode::Nop         => self.no_operation(),

      Opcode::Mod  | Opcode::Plus | Opcode::Minus | Opcode::Mult | Opcode::Div
      | Opcode::Pow | Opcode::Lt  | Opcode::Neg   | Opcode::Invert
                            => self.alu_operation(instruction.opcode),

      Opcode::Rot           => self.rotate(),
      Opcode::Dup           => self.duplicate(),
      Opcode::Over          => self.over(),
      Opcode::Swap          => self.swap(),
      Opcode::Push          => self.push(instruction),
      Opcode::Drop          => self.drop_top(),

      Opcode::Print         => Err(MachineError::UnsupportedOpcode(Opcode::Print).into()),
    }
  }

  // region Microcode

  /// `[.., a] -> [.., MEM[a]]`
  fn read_direct(&mut self) -> MachineResult<()> {
    self.latch_address_from(0)?;
    self.datapath.adjust_head(-1)?;
    self.tick();

    let value = self.memory.read()?;
    self.datapath.push(value)?;
    self.advance();
    self.tick();
    Ok(())
  }

  /// `[.., p] -> [.., MEM[MEM[p]]]`, then `MEM[p] += 1`.
  fn read_indirect(&mut self) -> MachineResult<()> {
    // [.., p] -> [.., p, q]
    self.latch_address_from(0)?;
    let pointer = self.memory.read()?;
    self.datapath.push(pointer)?;
    self.tick();

    // [.., p, q] -> [.., p, q, v]
    self.latch_address_from(0)?;
    let value = self.memory.read()?;
    self.datapath.push(value)?;
    self.tick();

    // [.., p, q, v] -> [.., v, q, p]
    let (v, q, p) = (self.datapath.top(0)?, self.datapath.top(1)?, self.datapath.top(2)?);
    self.datapath.adjust_head(-3)?;
    self.datapath.push(v)?;
    self.datapath.push(q)?;
    self.datapath.push(p)?;
    self.tick();

    self.latch_address_from(0)?;
    self.tick();

    // MEM[p] = q + 1; [.., v, q, p] -> [.., v]
    self.datapath.latch_alu(AluOp::Increment)?;
    self.memory.write(self.datapath.alu())?;
    self.datapath.adjust_head(-2)?;
    self.advance();
    self.tick();
    Ok(())
  }

  /// `[.., x, a] -> [..]`, `MEM[a] = x`
  fn write_direct(&mut self) -> MachineResult<()> {
    self.latch_address_from(0)?;
    self.tick();

    let value = self.datapath.top(1)?;
    self.memory.write(value)?;
    self.datapath.adjust_head(-2)?;
    self.advance();
    self.tick();
    Ok(())
  }

  /// `[.., x, p] -> [..]`, `MEM[MEM[p]] = x`, then `MEM[p] += 1`.
  fn write_indirect(&mut self) -> MachineResult<()> {
    // [.., x, p] -> [.., x, p, q]
    self.latch_address_from(0)?;
    let pointer = self.memory.read()?;
    self.datapath.push(pointer)?;
    self.tick();

    self.latch_address_from(0)?;
    self.tick();

    let value = self.datapath.top(2)?;
    self.memory.write(value)?;
    self.tick();

    self.latch_address_from(1)?;
    self.tick();

    let next = self.datapath.top_incremented(0)?;
    self.memory.write(next)?;
    self.datapath.adjust_head(-3)?;
    self.advance();
    self.tick();
    Ok(())
  }

  /// Falls through if the popped word is `TRUE`, jumps otherwise.
  fn jump_if_not_true(&mut self, instruction: &Instruction) -> MachineResult<()> {
    if self.datapath.pop_truth()? {
      self.advance();
    } else {
      self.pc = instruction.target()?;
    }
    self.tick();
    Ok(())
  }

  fn jump(&mut self, instruction: &Instruction) -> MachineResult<()> {
    self.pc = instruction.target()?;
    self.tick();
    Ok(())
  }

  fn no_operation(&mut self) -> MachineResult<()> {
    self.advance();
    self.tick();
    Ok(())
  }

  fn alu_operation(&mut self, opcode: Opcode) -> MachineResult<()> {
    let op = AluOp::for_opcode(opcode).ok_or(MachineError::UnsupportedOpcode(opcode))?;
    self.datapath.latch_alu(op)?;
    self.datapath.adjust_head(-(op.arity() as isize))?;
    self.tick();

    self.datapath.push(self.datapath.alu())?;
    self.advance();
    self.tick();
    Ok(())
  }

  /// `[.., a, b, c] -> [.., b, c, a]`
  fn rotate(&mut self) -> MachineResult<()> {
    let (c, b, a) = (self.datapath.top(0)?, self.datapath.top(1)?, self.datapath.top(2)?);
    self.datapath.adjust_head(-3)?;
    self.datapath.push(b)?;
    self.datapath.push(c)?;
    self.datapath.push(a)?;
    self.advance();
    self.tick();
    Ok(())
  }

  fn duplicate(&mut self) -> MachineResult<()> {
    let value = self.datapath.top(0)?;
    self.datapath.push(value)?;
    self.advance();
    self.tick();
    Ok(())
  }

  fn over(&mut self) -> MachineResult<()> {
    let value = self.datapath.top(1)?;
    self.datapath.push(value)?;
    self.advance();
    self.tick();
    Ok(())
  }

  fn swap(&mut self) -> MachineResult<()> {
    let (b, a) = (self.datapath.top(0)?, self.datapath.top(1)?);
    self.datapath.adjust_head(-2)?;
    self.datapath.push(b)?;
    self.datapath.push(a)?;
    self.advance();
    self.tick();
    Ok(())
  }

  fn push(&mut self, instruction: &Instruction) -> MachineResult<()> {
    let value = instruction.literal()?;
    self.datapath.push(value)?;
    self.advance();
    self.tick();
    Ok(())
  }

  fn drop_top(&mut self) -> MachineResult<()> {
    self.datapath.adjust_head(-1)?;
    self.advance();
    self.tick();
    Ok(())
  }

  // endregion

  // region Display methods

  fn make_stack_table(words: &[Word]) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Depth", ubl->"Word"]);

    for (depth, word) in words.iter().rev().enumerate() {
      match depth == 0 {
        true  => table.add_row(row![r->format!("* --> S[{}] =", depth), word]),
        false => table.add_row(row![r->format!("S[{}] =", depth), word]),
      };
    }
    table
  }

  fn make_state_table(&self) -> Table {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);

    let (instruction, term) =
      match &self.current {
        Some(i) => (
          i.to_string(),
          i.term.as_ref().map(|t| t.to_string()).unwrap_or_default()
        ),
        None    => (String::new(), String::new()),
      };

    table.add_row(row![r->"Tick",        self.tick]);
    table.add_row(row![r->"PC",          self.pc]);
    table.add_row(row![r->"Head",        self.datapath.head()]);
    table.add_row(row![r->"ALU",         self.datapath.alu()]);
    table.add_row(row![r->"Address",     self.memory.address()]);
    table.add_row(row![r->"Instruction", instruction]);
    table.add_row(row![r->"Term",        term]);
    table
  }

  // endregion
}


lazy_static! {
  pub(crate) static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for ControlUnit {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    // Only the words the microcode can reach, plus one.
    let words      = self.datapath.words();
    let visible    = &words[words.len().saturating_sub(5)..];
    let state      = self.make_state_table();
    let stack      = ControlUnit::make_stack_table(visible);

    let mut combined_table = table!([state, stack]);
    combined_table.set_titles(row![ub->"Control Unit", ub->"Operand Stack"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "{}", combined_table)
  }
}
