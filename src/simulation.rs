/*!
  A simulation owns one run of the machine: it builds memory, the datapath and the control
  unit from a program, an input stream and a configuration, then retires instructions until
  the program halts, the input runs dry, or the instruction limit is reached.

  Halting and exhausting the input are both normal ends of a run. Reaching the limit is
  reported on stderr and in the `RunReport`, but still returns everything produced so far.
  Faults abort the run with an `ExecutionError`.
*/

use std::fmt::{Display, Formatter};

use prettytable::Table;
use thiserror::Error;

use crate::bytecode::{Opcode, Program, OPCODE_COUNT};
use crate::config::MachineConfig;
use crate::control::{ControlUnit, TABLE_DISPLAY_FORMAT};
use crate::datapath::DataPath;
use crate::error::{ConfigError, ExecutionError, Trap};
use crate::memory::Memory;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Termination {
  Halted,
  InputExhausted,
  LimitReached,
}

impl Termination {
  /// Whether the program itself ended the run.
  pub fn is_normal(&self) -> bool {
    match self {
      Termination::Halted | Termination::InputExhausted => true,
      Termination::LimitReached => false
    }
  }
}

impl Display for Termination {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Termination::Halted         => write!(f, "halted"),
      Termination::InputExhausted => write!(f, "input exhausted"),
      Termination::LimitReached   => write!(f, "instruction limit reached"),
    }
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunReport {
  /// Output tokens in the order they were written.
  pub output        : Vec<String>,
  /// Instructions retired. A `HALT`, or an instruction stopped by empty input, does not count.
  pub instructions  : u64,
  pub ticks         : u64,
  pub termination   : Termination,
  /// Instructions retired per opcode, indexed by opcode code.
  pub opcode_counts : [u64; OPCODE_COUNT],
  /// Ticks spent per opcode, including those of an instruction stopped by empty input.
  pub tick_counts   : [u64; OPCODE_COUNT],
}

impl RunReport {
  pub fn output_text(&self) -> String {
    self.output.concat()
  }

  pub fn retired(&self, opcode: Opcode) -> u64 {
    self.opcode_counts[opcode.code() as usize]
  }

  pub fn ticks_spent(&self, opcode: Opcode) -> u64 {
    self.tick_counts[opcode.code() as usize]
  }

  pub fn statistics_table(&self) -> Table {
    let mut table = Table::new();
    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubl->"Opcode", ubr->"Retired", ubr->"Ticks"]);

    let counts = self.opcode_counts.iter().zip(self.tick_counts.iter());
    for (code, (count, ticks)) in counts.enumerate() {
      if *count == 0 && *ticks == 0 {
        continue;
      }
      if let Some(opcode) = Opcode::from_code(code as u8) {
        table.add_row(row![opcode, r->count, r->ticks]);
      }
    }
    table.add_row(row![b->"total", br->self.instructions, br->self.ticks]);
    table
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error(transparent)]
  Execution(#[from] ExecutionError),
}

pub struct Simulation {
  control : ControlUnit,
  limit   : u64,
  retired : u64,
  counts  : [u64; OPCODE_COUNT],
  ticks   : [u64; OPCODE_COUNT],
}

impl Simulation {

  pub fn new(program: &Program, input: &str, config: &MachineConfig) -> Result<Simulation, ConfigError> {
    let memory   = Memory::new(config.memory_size, program.instructions.clone(), program.data(), input.chars())?;
    let datapath = DataPath::new(config.stack_capacity)?;
    Ok(Simulation {
      control : ControlUnit::new(memory, datapath),
      limit   : config.instruction_limit,
      retired : 0,
      counts  : [0; OPCODE_COUNT],
      ticks   : [0; OPCODE_COUNT],
    })
  }

  pub fn control(&self) -> &ControlUnit {
    &self.control
  }

  pub fn retired(&self) -> u64 {
    self.retired
  }

  /// Retires one instruction. Returns how the run ended if it has.
  pub fn step(&mut self) -> Result<Option<Termination>, ExecutionError> {
    if self.retired >= self.limit {
      eprintln!(
        "Too long execution: stopped after {} instructions at pc {}.",
        self.retired,
        self.control.pc()
      );
      return Ok(Some(Termination::LimitReached));
    }

    let before = self.control.ticks();
    let result = self.control.decode_and_execute();
    if let Some(instruction) = self.control.current() {
      self.ticks[instruction.opcode.code() as usize] += self.control.ticks() - before;
    }

    match result {

      Ok(opcode) => {
        self.retired += 1;
        self.counts[opcode.code() as usize] += 1;
        Ok(None)
      }

      Err(Trap::Halt)           => Ok(Some(Termination::Halted)),

      Err(Trap::InputExhausted) => Ok(Some(Termination::InputExhausted)),

      Err(Trap::Fault(source))  => {
        let current = self.control.current();
        Err(ExecutionError {
          tick        : self.control.ticks(),
          pc          : self.control.pc(),
          opcode      : current.map(|i| i.opcode),
          instruction : current.map(|i| i.to_string()).unwrap_or_default(),
          source,
        })
      }

    }
  }

  pub fn run(mut self) -> Result<RunReport, ExecutionError> {
    let termination =
      loop {
        if let Some(termination) = self.step()? {
          break termination;
        }
      };

    let ticks = self.control.ticks();
    Ok(RunReport {
      output        : self.control.into_memory().into_output(),
      instructions  : self.retired,
      ticks,
      termination,
      opcode_counts : self.counts,
      tick_counts   : self.ticks,
    })
  }
}

/// Runs `program` to completion on `input`.
pub fn simulate(program: &Program, input: &str, config: &MachineConfig) -> Result<RunReport, SimulationError> {
  Ok(Simulation::new(program, input, config)?.run()?)
}
