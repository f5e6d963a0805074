/*!
  The human readable textual form of a program is called assembly. Each line holds at most
  one instruction:

  ```text
  .data 0 0 72 105       # optional initial data segment, from address 0
  start:  PUSH 'A'       # label, mnemonic, operand, comment
          JMP start
  ```

  Operands are decimal integers, character literals, or label names, which resolve to the
  program counter of the instruction they mark. Character literals take the escapes Rust
  prints for them, such as `'\n'`, `'\''` and `'\u{e9}'`. An instruction may carry several
  labels. Mnemonics are case insensitive. This module
  leverages the `strum` derives of `Opcode` to go between mnemonics and opcodes.
*/

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use nom::{
  branch::alt,
  bytes::complete::{tag, take_while, take_while1},
  character::complete::{char as one_char, digit1, none_of, space0, space1},
  combinator::{all_consuming, map, map_opt, map_res, opt, recognize, rest},
  multi::many0,
  sequence::{delimited, pair, preceded, terminated, tuple},
  IResult
};

use super::{Argument, Instruction, Opcode, Program, Term, Word};
use crate::error::ProgramError;
use crate::symboltable::SymbolTable;

enum Operand<'a> {
  Literal(Argument),
  Label(&'a str)
}

impl<'a> Display for Operand<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Operand::Literal(argument) => write!(f, "{}", argument),
      Operand::Label(label)      => write!(f, "{}", label),
    }
  }
}

enum Statement<'a> {
  Data(Vec<Word>),
  Instruction(&'a str, Option<Operand<'a>>)
}

struct Line<'a> {
  label     : Option<&'a str>,
  statement : Option<Statement<'a>>,
  comment   : Option<&'a str>
}

// region Parsers

fn identifier(input: &str) -> IResult<&str, &str> {
  recognize(pair(
    take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
    take_while(|c: char| c.is_ascii_alphanumeric() || c == '_')
  ))(input)
}

fn number(input: &str) -> IResult<&str, Word> {
  map_res(
    recognize(pair(opt(one_char('-')), digit1)),
    |text: &str| text.parse::<Word>()
  )(input)
}

// `\u{..}`
fn unicode_escape(input: &str) -> IResult<&str, char> {
  map_opt(
    delimited(tag("u{"), take_while1(|c: char| c.is_ascii_hexdigit()), one_char('}')),
    |hex: &str| u32::from_str_radix(hex, 16).ok().and_then(std::char::from_u32)
  )(input)
}

/// The escapes `char::escape_default` produces.
fn escape(input: &str) -> IResult<&str, char> {
  preceded(
    one_char('\\'),
    alt((
      map(one_char('n'),  |_| '\n'),
      map(one_char('t'),  |_| '\t'),
      map(one_char('r'),  |_| '\r'),
      map(one_char('0'),  |_| '\0'),
      one_char('\\'),
      one_char('\''),
      one_char('"'),
      unicode_escape
    ))
  )(input)
}

fn character(input: &str) -> IResult<&str, char> {
  delimited(one_char('\''), alt((escape, none_of("\\'"))), one_char('\''))(input)
}

fn operand(input: &str) -> IResult<&str, Operand> {
  alt((
    map(number,     |value| Operand::Literal(Argument::Number(value))),
    map(character,  |c| Operand::Literal(Argument::Char(c))),
    map(identifier, Operand::Label)
  ))(input)
}

fn data_directive(input: &str) -> IResult<&str, Vec<Word>> {
  preceded(tag(".data"), many0(preceded(space1, number)))(input)
}

fn instruction(input: &str) -> IResult<&str, (&str, Option<Operand>)> {
  pair(identifier, opt(preceded(space1, operand)))(input)
}

fn statement(input: &str) -> IResult<&str, Statement> {
  alt((
    map(data_directive, Statement::Data),
    map(instruction,    |(mnemonic, operand)| Statement::Instruction(mnemonic, operand))
  ))(input)
}

fn label_definition(input: &str) -> IResult<&str, &str> {
  terminated(identifier, preceded(space0, one_char(':')))(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
  preceded(one_char('#'), rest)(input)
}

fn line(input: &str) -> IResult<&str, Line> {
  map(
    all_consuming(tuple((
      preceded(space0, opt(terminated(label_definition, space0))),
      opt(terminated(statement, space0)),
      opt(comment)
    ))),
    |(label, statement, comment)| Line { label, statement, comment }
  )(input)
}

// endregion

/// An instruction whose label operand has not been resolved yet.
struct Pending<'a> {
  line        : u32,
  instruction : Instruction,
  label       : Option<&'a str>
}

/// Assembles program text into a program. Labels are resolved after the whole text is read,
/// so forward jumps need no special treatment.
pub fn parse_assembly(text: &str) -> Result<Program, ProgramError> {
  let mut symbols               = SymbolTable::new();
  let mut pending: Vec<Pending> = Vec::new();
  let mut data: Option<Vec<Word>> = None;

  for (index, source) in text.lines().enumerate() {
    let line_number = index as u32 + 1;
    let parsed =
      match line(source) {
        Ok((_rest, parsed)) => parsed,
        Err(_e) => {
          return Err(ProgramError::Syntax { line: line_number, text: source.trim().to_string() });
        }
      };

    if let Some(label) = parsed.label {
      let pc = pending.len();
      if symbols.insert(label, pc).is_err() {
        return Err(ProgramError::DuplicateLabel { line: line_number, label: label.to_string() });
      }
    }

    match parsed.statement {

      None => {}

      Some(Statement::Data(words)) => {
        if data.is_some() {
          return Err(ProgramError::DuplicateData { line: line_number });
        }
        data = Some(words);
      }

      Some(Statement::Instruction(mnemonic, operand)) => {
        let opcode =
          match Opcode::from_str(&mnemonic.to_ascii_uppercase()) {
            Ok(opcode) => opcode,
            Err(_e) => {
              return Err(ProgramError::NotAnOperation {
                line : line_number,
                name : mnemonic.to_string()
              });
            }
          };

        match (&operand, opcode.takes_argument()) {
          (None, true) => {
            return Err(ProgramError::ArgumentMissing { line: line_number, operation: opcode });
          }
          (Some(_), false) => {
            return Err(ProgramError::UnexpectedArgument { line: line_number, operation: opcode });
          }
          _ => {}
        }

        let source_text =
          match &operand {
            Some(operand) => format!("{} {}", mnemonic, operand),
            None          => mnemonic.to_string(),
          };
        let term = Term::new(line_number, parsed.comment.unwrap_or("").trim(), &source_text);

        let (instruction, label) =
          match operand {
            Some(Operand::Literal(argument)) => (Instruction::with_arg(opcode, argument), None),
            Some(Operand::Label(label))      => (Instruction::new(opcode), Some(label)),
            None                             => (Instruction::new(opcode), None),
          };

        pending.push(Pending { line: line_number, instruction: instruction.with_term(term), label });
      }

    } // end match statement
  } // end for each line

  let mut instructions = Vec::with_capacity(pending.len());
  for Pending { line, mut instruction, label } in pending {
    if let Some(label) = label {
      match symbols.get_address(label) {
        Some(pc) => instruction.arg = Some(Argument::Number(pc as Word)),
        None     => {
          return Err(ProgramError::UndefinedLabel { line, label: label.to_string() });
        }
      }
    }
    instructions.push(instruction);
  }

  Ok(Program { data, instructions })
}

/**
  Displays a program as assembly. Every jump target gets a label of the form `L<pc>`, and jump
  arguments are written as those labels, so the listing assembles back into the same program.
  Term contexts are kept as comments.
*/
pub struct Listing<'a> {
  program : &'a Program,
  symbols : SymbolTable
}

impl<'a> Listing<'a> {
  pub fn new(program: &'a Program) -> Listing<'a> {
    let mut symbols = SymbolTable::new();
    for instruction in program.instructions.iter().filter(|i| i.opcode.is_jump()) {
      if let Ok(pc) = instruction.target() {
        // A second jump to the same target finds its label already present.
        let _ = symbols.insert(&format!("L{}", pc), pc);
      }
    }
    Listing { program, symbols }
  }
}

impl<'a> Display for Listing<'a> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    if let Some(data) = &self.program.data {
      write!(f, ".data")?;
      for word in data {
        write!(f, " {}", word)?;
      }
      writeln!(f)?;
    }

    for (pc, instruction) in self.program.instructions.iter().enumerate() {
      if let Some(label) = self.symbols.get_label(pc) {
        writeln!(f, "{}:", label)?;
      }

      let target_label =
        match instruction.target() {
          Ok(target) if instruction.opcode.is_jump() => self.symbols.get_label(target),
          _ => None
        };
      let text =
        match target_label {
          Some(label) => format!("{} {}", instruction.opcode, label),
          None        => instruction.to_string(),
        };

      match &instruction.term {
        Some(term) if !term.context.is_empty() => writeln!(f, "    {:<16}# {}", text, term.context)?,
        _                                      => writeln!(f, "    {}", text)?,
      }
    }

    // A label may mark the end of the program.
    if let Some(label) = self.symbols.get_label(self.program.len()) {
      writeln!(f, "{}:", label)?;
    }
    Ok(())
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn instructions_and_literals() {
    let program = parse_assembly("
      push 10
      PUSH 'A'   # letter
      PUSH -3
      plus
      halt
    ").unwrap();

    assert_eq!(program.data, None);
    assert_eq!(program.len(), 5);
    assert_eq!(program.instructions[0].arg, Some(Argument::Number(10)));
    assert_eq!(program.instructions[1].arg, Some(Argument::Char('A')));
    assert_eq!(program.instructions[2].arg, Some(Argument::Number(-3)));
    assert_eq!(program.instructions[3].opcode, Opcode::Plus);
    assert_eq!(program.instructions[1].term, Some(Term::new(3, "letter", "PUSH 'A'")));
  }

  #[test]
  fn labels_resolve_forward_and_backward() {
    let program = parse_assembly("
      start:
        PUSH 0
        JNT done
      again: NOP
        JMP again
      done: HALT
    ").unwrap();

    assert_eq!(program.instructions[1].arg, Some(Argument::Number(4)));
    assert_eq!(program.instructions[3].arg, Some(Argument::Number(2)));
  }

  #[test]
  fn several_labels_on_one_instruction() {
    let program = parse_assembly("
      NOP
      start:
      loop: PUSH 1
        JMP start
        JMP loop
    ").unwrap();
    assert_eq!(program.instructions[2].arg, Some(Argument::Number(1)));
    assert_eq!(program.instructions[3].arg, Some(Argument::Number(1)));
    assert!(matches!(
      parse_assembly("a:\nb: NOP\nb: NOP"),
      Err(ProgramError::DuplicateLabel { line: 3, .. })
    ));
  }

  #[test]
  fn data_segment() {
    let program = parse_assembly(".data 0 0 7 -8\nHALT").unwrap();
    assert_eq!(program.data(), &[0, 0, 7, -8]);
  }

  #[test]
  fn character_literals_may_be_special() {
    let program = parse_assembly("PUSH '#' # hash\nPUSH ' '").unwrap();
    assert_eq!(program.instructions[0].arg, Some(Argument::Char('#')));
    assert_eq!(program.instructions[1].arg, Some(Argument::Char(' ')));
  }

  #[test]
  fn character_escapes() {
    let program = parse_assembly("PUSH '\\n'\nPUSH '\\''\nPUSH '\\\\'\nPUSH '\\u{e9}'").unwrap();
    let args: Vec<_> = program.instructions.iter().map(|i| i.arg).collect();
    assert_eq!(
      args,
      vec![
        Some(Argument::Char('\n')),
        Some(Argument::Char('\'')),
        Some(Argument::Char('\\')),
        Some(Argument::Char('é')),
      ]
    );
    assert!(matches!(parse_assembly("PUSH '\\q'"), Err(ProgramError::Syntax { line: 1, .. })));
    assert!(matches!(parse_assembly("PUSH '''"), Err(ProgramError::Syntax { line: 1, .. })));
  }

  #[test]
  fn errors_carry_lines() {
    match parse_assembly("NOP\nFROB") {
      Err(ProgramError::NotAnOperation { line, name }) => {
        assert_eq!(line, 2);
        assert_eq!(name, "FROB");
      }
      other => panic!("unexpected: {:?}", other.map(|p| p.len()))
    }
    assert!(matches!(parse_assembly("JMP nowhere"), Err(ProgramError::UndefinedLabel { line: 1, .. })));
    assert!(matches!(parse_assembly("a: NOP\na: NOP"), Err(ProgramError::DuplicateLabel { line: 2, .. })));
    assert!(matches!(parse_assembly("PUSH"), Err(ProgramError::ArgumentMissing { line: 1, .. })));
    assert!(matches!(parse_assembly("DUP 3"), Err(ProgramError::UnexpectedArgument { line: 1, .. })));
    assert!(matches!(parse_assembly("PUSH 1 2"), Err(ProgramError::Syntax { line: 1, .. })));
    assert!(matches!(parse_assembly(".data 1\n.data 2"), Err(ProgramError::DuplicateData { line: 2 })));
  }

  #[test]
  fn listing_reassembles() {
    let source = "
      .data 0 0 3
      loop: PUSH 'x'
        DUP
        JNT loop    # back
        JMP end
        HALT
      end:
    ";
    let program  = parse_assembly(source).unwrap();
    let listing  = Listing::new(&program).to_string();
    let reparsed = parse_assembly(&listing).unwrap();

    assert_eq!(reparsed.data, program.data);
    let strip = |p: &Program| -> Vec<(Opcode, Option<Argument>)> {
      p.instructions.iter().map(|i| (i.opcode, i.arg)).collect()
    };
    assert_eq!(strip(&reparsed), strip(&program));
    assert!(listing.contains("L0:"));
    assert!(listing.contains("JNT L0"));
    assert!(listing.contains("# back"));

    let chars   = ['\n', '\t', '\'', '\\', '"', '#', ' ', 'é', '\u{7f}'];
    let program = Program::new(
      chars.iter()
        .map(|c| Instruction::with_arg(Opcode::Push, Argument::Char(*c)))
        .chain(std::iter::once(Instruction::new(Opcode::Halt)))
        .collect()
    );
    let listing  = Listing::new(&program).to_string();
    let reparsed = parse_assembly(&listing).unwrap();
    assert_eq!(strip(&reparsed), strip(&program));
    assert!(listing.contains("PUSH '\\n'"));
  }
}
