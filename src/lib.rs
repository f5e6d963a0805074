/*!
  A deterministic, cycle-accurate stack machine. Programs run against a unified memory with
  memory-mapped I/O ports, an operand stack with a single-cycle ALU, and a microcoded control
  unit that counts every register transfer as one tick.

  The usual entry point is `simulate`, which takes a `Program`, an input string and a
  `MachineConfig` and returns a `RunReport` with the output and the instruction and tick
  counts.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod address;
pub mod bytecode;
pub mod cell;
pub mod config;
pub mod control;
pub mod datapath;
pub mod error;
pub mod memory;
pub mod simulation;
pub mod symboltable;

pub use bytecode::{Argument, Instruction, Listing, Opcode, Program, Term, Word};
pub use config::MachineConfig;
pub use error::{ConfigError, ExecutionError, MachineError, ProgramError};
pub use simulation::{simulate, RunReport, Simulation, SimulationError, Termination};
