use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;

use stackvm::bytecode::{decode, encode, parse_assembly};
use stackvm::config::{DEFAULT_INSTRUCTION_LIMIT, DEFAULT_MEMORY_SIZE};
use stackvm::datapath::STACK_CAPACITY;
use stackvm::{simulate, MachineConfig, Program};

/// Exit status of a run cut off by the instruction limit.
const EXIT_LIMIT_REACHED: i32 = 2;

/// Runs a compiled program on the stack machine.
#[derive(Parser, Debug)]
#[command(name = "stackvm", version)]
struct Args {
  /// Program container (JSON), or assembly when it ends in `.asm`.
  program: PathBuf,

  /// Text file fed to the input port, one character per read.
  input: Option<PathBuf>,

  /// Words of unified memory.
  #[arg(long, default_value_t = DEFAULT_MEMORY_SIZE)]
  memory_size: usize,

  /// Operand stack capacity.
  #[arg(long, default_value_t = STACK_CAPACITY)]
  stack_capacity: usize,

  /// Stop after this many retired instructions.
  #[arg(long, default_value_t = DEFAULT_INSTRUCTION_LIMIT)]
  limit: u64,

  /// Treat the program as assembly regardless of its extension.
  #[arg(long, default_value_t = false)]
  asm: bool,

  /// Write the loaded program as a JSON container to this path.
  #[arg(long, value_name = "PATH")]
  emit: Option<PathBuf>,

  /// Print per-opcode statistics after the run.
  #[arg(long, default_value_t = false)]
  stats: bool,
}

fn load_program(args: &Args) -> anyhow::Result<Program> {
  let text = fs::read_to_string(&args.program)
    .with_context(|| format!("reading {}", args.program.display()))?;
  let is_assembly = args.asm || args.program.extension().map_or(false, |e| e == "asm");
  let program =
    match is_assembly {
      true  => parse_assembly(&text)?,
      false => decode(&text)?,
    };
  Ok(program)
}

fn main() -> anyhow::Result<()> {
  let args = Args::parse();

  #[cfg(feature = "trace_computation")]
  println!("Computation Tracing ENABLED");

  let program = load_program(&args)?;
  if let Some(path) = &args.emit {
    fs::write(path, encode(&program)?)
      .with_context(|| format!("writing {}", path.display()))?;
  }

  let input =
    match &args.input {
      Some(path) => fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?,
      None => String::new(),
    };

  let config = MachineConfig {
    memory_size       : args.memory_size,
    stack_capacity    : args.stack_capacity,
    instruction_limit : args.limit,
  };
  let report = simulate(&program, &input, &config)?;

  println!("output: {}", report.output_text());
  println!("instr_counter: {} ticks: {}", report.instructions, report.ticks);
  if args.stats {
    println!("{}", report.statistics_table());
  }

  if !report.termination.is_normal() {
    process::exit(EXIT_LIMIT_REACHED);
  }
  Ok(())
}
