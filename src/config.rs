use crate::datapath::STACK_CAPACITY;

pub const DEFAULT_MEMORY_SIZE       : usize = 600;
pub const DEFAULT_INSTRUCTION_LIMIT : u64   = 3000;

/// Parameters of one run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct MachineConfig {
  /// Words of unified memory, ports and program text included.
  pub memory_size       : usize,
  pub stack_capacity    : usize,
  /// Instructions retired before the run is cut off.
  pub instruction_limit : u64,
}

impl Default for MachineConfig {
  fn default() -> MachineConfig {
    MachineConfig {
      memory_size       : DEFAULT_MEMORY_SIZE,
      stack_capacity    : STACK_CAPACITY,
      instruction_limit : DEFAULT_INSTRUCTION_LIMIT,
    }
  }
}

impl MachineConfig {
  pub fn with_limit(mut self, instruction_limit: u64) -> MachineConfig {
    self.instruction_limit = instruction_limit;
    self
  }

  pub fn with_memory_size(mut self, memory_size: usize) -> MachineConfig {
    self.memory_size = memory_size;
    self
  }
}
