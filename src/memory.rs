/*!
  Unified memory with memory-mapped I/O.

  ```text
    0                     input port (read-only)
    1                     output port (write-only)
    2 .. program_start    data words
    program_start .. end  program text
  ```

  The program text sits at the top of memory, so `program_start = memory_size - program_len`,
  which is always above `PROGRAM_BASE`. The initial data segment is an image of low memory
  starting at address 0 and is zero-filled up to the program text. Memory is accessed through
  an address register: `latch_address` sets it, and `read`/`write` act on it.
*/

use std::collections::VecDeque;

use crate::address::{Address, AddressNumberType, INPUT_PORT, OUTPUT_PORT, PROGRAM_BASE};
use crate::bytecode::{Instruction, Word};
use crate::cell::Cell;
use crate::error::{ConfigError, MachineError, MachineResult, Trap};

pub struct Memory {
  cells         : Vec<Cell>,
  address       : AddressNumberType, // Address register
  program_start : AddressNumberType,
  program_len   : usize,
  input         : VecDeque<char>,
  output        : Vec<String>,
}

impl Memory {

  pub fn new<I>(memory_size: usize, program: Vec<Instruction>, data: &[Word], input: I)
    -> Result<Memory, ConfigError>
    where I: IntoIterator<Item = char>
  {
    let program_len = program.len();
    if memory_size <= program_len + PROGRAM_BASE {
      return Err(ConfigError::MemoryTooSmall { memory_size, program_len });
    }
    if data.len() > PROGRAM_BASE {
      return Err(ConfigError::DataTooLarge { data_len: data.len(), limit: PROGRAM_BASE });
    }

    let program_start = memory_size - program_len;
    let mut cells: Vec<Cell> = Vec::with_capacity(memory_size);
    cells.extend(data.iter().map(|w| Cell::Word(*w)));
    cells.resize(program_start, Cell::Word(0));
    cells.extend(program.into_iter().map(Cell::Instruction));

    Ok(Memory {
      cells,
      address       : 0,
      program_start,
      program_len,
      input         : input.into_iter().collect(),
      output        : vec![],
    })
  }

  // region Accessors

  pub fn memory_size(&self) -> usize {
    self.cells.len()
  }

  pub fn program_start(&self) -> AddressNumberType {
    self.program_start
  }

  pub fn program_len(&self) -> usize {
    self.program_len
  }

  /// The currently latched address.
  pub fn address(&self) -> Address {
    Address::classify(self.address, self.program_start)
  }

  /// The stored word at `address`, without any port side effects.
  pub fn peek(&self, address: AddressNumberType) -> Option<Word> {
    self.cells.get(address).and_then(Cell::word)
  }

  pub fn output(&self) -> &[String] {
    &self.output
  }

  pub fn into_output(self) -> Vec<String> {
    self.output
  }

  pub fn pending_input(&self) -> usize {
    self.input.len()
  }

  // endregion

  pub fn latch_address(&mut self, address: Word) -> Result<(), MachineError> {
    if address < 0 || address as usize > self.memory_size() {
      return Err(MachineError::AddressOutOfRange { address, memory_size: self.memory_size() });
    }
    self.address = address as AddressNumberType;
    Ok(())
  }

  /// Index of the latched address if it holds a data word or port latch.
  fn data_index(&self) -> Result<AddressNumberType, MachineError> {
    match self.address() {
      _ if self.address >= self.memory_size() => {
        Err(MachineError::AddressOutOfRange {
          address     : self.address as Word,
          memory_size : self.memory_size()
        })
      }
      Address::Program(a) => Err(MachineError::ProgramTextAccess { address: a }),
      address             => Ok(address.idx()),
    }
  }

  /**
    Reads the latched address. Reading the input port consumes the next input character and
    yields its code, which is also latched at the port address. An empty input queue stops the
    machine with `Trap::InputExhausted`.
  */
  pub fn read(&mut self) -> MachineResult<Word> {
    match self.address() {

      Address::OutputPort => Err(MachineError::ReadFromOutputPort.into()),

      Address::InputPort  => {
        let c =
          match self.input.pop_front() {
            Some(c) => c,
            None    => {
              #[cfg(feature = "trace_computation")] println!("input: buffer is empty");
              return Err(Trap::InputExhausted);
            }
          };
        let value = c as u32 as Word;
        self.cells[INPUT_PORT] = Cell::Word(value);
        #[cfg(feature = "trace_computation")]
          println!("input: {} << {:?}", self.input.iter().collect::<String>(), c);
        Ok(value)
      }

      _ => {
        let index = self.data_index()?;
        // Every index below `program_start` holds a word.
        Ok(self.cells[index].word().unwrap_or_default())
      }

    }
  }

  /**
    Writes the latched address. Writing the output port latches the raw value and appends a
    token to the output: the character with that code if the value is in `0..=127`, otherwise
    the value in decimal.
  */
  pub fn write(&mut self, value: Word) -> Result<(), MachineError> {
    match self.address() {

      Address::InputPort  => Err(MachineError::WriteToInputPort),

      Address::OutputPort => {
        self.cells[OUTPUT_PORT] = Cell::Word(value);
        let token =
          match value {
            0..=127 => (value as u8 as char).to_string(),
            _       => value.to_string(),
          };
        #[cfg(feature = "trace_computation")]
          println!("output: {} << {:?}", self.output.concat(), token);
        self.output.push(token);
        Ok(())
      }

      _ => {
        let index = self.data_index()?;
        self.cells[index] = Cell::Word(value);
        Ok(())
      }

    }
  }

  /// Translates a program counter into the program text and returns the instruction there.
  pub fn fetch_instruction(&self, pc: usize) -> Result<&Instruction, MachineError> {
    let missing = MachineError::NoInstruction { pc, program_len: self.program_len };
    if pc >= self.program_len {
      return Err(missing);
    }
    let address = self.program_start + pc;
    if address < PROGRAM_BASE || address >= self.memory_size() {
      return Err(missing);
    }
    self.cells[address].instruction().ok_or(missing)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::Opcode;

  fn memory(data: &[Word], input: &str) -> Memory {
    let program = vec![Instruction::new(Opcode::Nop), Instruction::new(Opcode::Halt)];
    Memory::new(200, program, data, input.chars()).unwrap()
  }

  #[test]
  fn layout() {
    let m = memory(&[0, 0, 11, 12], "");
    assert_eq!(m.memory_size(), 200);
    assert_eq!(m.program_start(), 198);
    assert_eq!(m.peek(2), Some(11));
    assert_eq!(m.peek(3), Some(12));
    assert_eq!(m.peek(4), Some(0));
    assert_eq!(m.peek(197), Some(0));
    assert_eq!(m.peek(198), None);
    assert_eq!(m.fetch_instruction(1).unwrap().opcode, Opcode::Halt);
  }

  #[test]
  fn configuration_errors() {
    let program = vec![Instruction::new(Opcode::Halt); 10];
    assert_eq!(
      Memory::new(138, program.clone(), &[], "".chars()).err(),
      Some(ConfigError::MemoryTooSmall { memory_size: 138, program_len: 10 })
    );
    assert!(Memory::new(139, program.clone(), &[], "".chars()).is_ok());
    assert_eq!(
      Memory::new(600, program, &[0; 129], "".chars()).err(),
      Some(ConfigError::DataTooLarge { data_len: 129, limit: 128 })
    );
  }

  #[test]
  fn data_words() {
    let mut m = memory(&[], "");
    m.latch_address(50).unwrap();
    m.write(-9).unwrap();
    assert_eq!(m.read(), Ok(-9));
    assert_eq!(m.address(), Address::Data(50));
  }

  #[test]
  fn latch_bounds() {
    let mut m = memory(&[], "");
    assert!(m.latch_address(-1).is_err());
    assert!(m.latch_address(201).is_err());
    // The end of memory can be latched but not accessed.
    m.latch_address(200).unwrap();
    assert!(matches!(m.read(), Err(Trap::Fault(MachineError::AddressOutOfRange { .. }))));
    assert!(m.write(1).is_err());
  }

  #[test]
  fn program_text_is_not_data() {
    let mut m = memory(&[], "");
    m.latch_address(199).unwrap();
    assert_eq!(m.read(), Err(Trap::Fault(MachineError::ProgramTextAccess { address: 199 })));
    assert_eq!(m.write(3), Err(MachineError::ProgramTextAccess { address: 199 }));
  }

  #[test]
  fn input_port() {
    let mut m = memory(&[], "hi");
    m.latch_address(0).unwrap();
    assert_eq!(m.read(), Ok('h' as Word));
    assert_eq!(m.peek(0), Some('h' as Word));
    assert_eq!(m.read(), Ok('i' as Word));
    assert_eq!(m.read(), Err(Trap::InputExhausted));
    assert_eq!(m.write(1), Err(MachineError::WriteToInputPort));
  }

  #[test]
  fn output_port() {
    let mut m = memory(&[], "");
    m.latch_address(1).unwrap();
    m.write(65).unwrap();
    m.write(200).unwrap();
    m.write(-1).unwrap();
    m.write(0).unwrap();
    assert_eq!(m.output(), &["A", "200", "-1", "\u{0}"]);
    assert_eq!(m.peek(1), Some(0));
    assert_eq!(m.read(), Err(Trap::Fault(MachineError::ReadFromOutputPort)));
  }

  #[test]
  fn fetch_bounds() {
    let m = memory(&[], "");
    assert_eq!(
      m.fetch_instruction(2).err(),
      Some(MachineError::NoInstruction { pc: 2, program_len: 2 })
    );
  }
}
