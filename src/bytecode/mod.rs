/*!

  The machine consumes programs produced by an upstream translator. A program is an ordered
  sequence of instructions addressed by a zero-based program counter, plus an optional
  initial data segment that seeds low memory. Words are 32 bit signed integers.

  Each instruction is an opcode, an optional argument, and an optional `Term` recording the
  source expression it came from. Unlike a packed bytecode, the instruction is kept whole:
  the program text lives in its own region of memory and is only ever reached through the
  program counter, so there is no word layout to encode. The opcode is still a single byte,
  and that byte indexes per-opcode statistics.

  Programs travel in two forms:

    container: JSON, the contract with the translator (see `container`)
    assembly:  line-oriented text for people (see `assembly`)

*/

mod assembly;
mod container;
mod instruction;
mod term;

pub use assembly::{parse_assembly, Listing};
pub use container::{decode, encode, Program};
pub use instruction::{Argument, Instruction, Opcode, Word, OPCODE_COUNT};
pub use term::Term;
