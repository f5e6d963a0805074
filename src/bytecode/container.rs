/*!
  The program container handed over by the translator: an optional initial data segment and
  the instruction sequence. The container is a JSON record with an explicit `data` field and
  an `instructions` field, so neither part has to be located by scanning the text. A bare
  JSON array of instructions is read as a program without a data segment.
*/

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Instruction, Word};
use crate::error::ProgramError;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Program {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data         : Option<Vec<Word>>,
  pub instructions : Vec<Instruction>,
}

impl Program {
  pub fn new(instructions: Vec<Instruction>) -> Program {
    Program { data: None, instructions }
  }

  pub fn with_data(data: Vec<Word>, instructions: Vec<Instruction>) -> Program {
    Program { data: Some(data), instructions }
  }

  /// The initial data words, empty when the container has no data segment.
  pub fn data(&self) -> &[Word] {
    self.data.as_deref().unwrap_or(&[])
  }

  pub fn len(&self) -> usize {
    self.instructions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.instructions.is_empty()
  }
}

pub fn decode(text: &str) -> Result<Program, ProgramError> {
  let value: Value = serde_json::from_str(text)?;
  let program =
    match value {
      Value::Array(_) => Program::new(serde_json::from_value(value)?),
      _               => serde_json::from_value(value)?,
    };
  Ok(program)
}

pub fn encode(program: &Program) -> Result<String, ProgramError> {
  Ok(serde_json::to_string_pretty(program)?)
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::{Argument, Opcode, Term, OPCODE_COUNT};

  fn every_opcode() -> Vec<Instruction> {
    (0..OPCODE_COUNT as u8)
      .map(|code| {
        let opcode = Opcode::from_code(code).unwrap();
        let term   = Term::new(code as u32 + 1, "context", &opcode.to_string());
        let instruction =
          match opcode {
            Opcode::Push => Instruction::with_arg(opcode, Argument::Char('A')),
            Opcode::Jmp  => Instruction::with_arg(opcode, Argument::Number(0)),
            Opcode::Jnt  => Instruction::with_arg(opcode, Argument::Number(7)),
            _            => Instruction::new(opcode),
          };
        instruction.with_term(term)
      })
      .collect()
  }

  #[test]
  fn round_trip_with_data() {
    let mut instructions = every_opcode();
    instructions.push(Instruction::with_arg(Opcode::Push, Argument::Number(-12)));
    let program = Program::with_data(vec![0, 0, 72, 105, -3], instructions);

    let decoded = decode(&encode(&program).unwrap()).unwrap();
    assert_eq!(decoded, program);
  }

  #[test]
  fn round_trip_without_data() {
    let program = Program::new(every_opcode());
    let text    = encode(&program).unwrap();
    assert!(!text.contains("\"data\""));
    assert_eq!(decode(&text).unwrap(), program);
  }

  #[test]
  fn translator_layout() {
    let text = r#"{
      "data": [0, 0, 5],
      "instructions": [
        {"opcode": "BEGIN", "term": [1, "main", "begin"]},
        {"opcode": "PUSH", "arg": "10"},
        {"opcode": "WRITE_DIR"},
        {"opcode": "HALT"}
      ]
    }"#;
    let program = decode(text).unwrap();
    assert_eq!(program.data(), &[0, 0, 5]);
    assert_eq!(program.len(), 4);
    assert_eq!(program.instructions[0].term, Some(Term::new(1, "main", "begin")));
    assert_eq!(program.instructions[1].arg, Some(Argument::Number(10)));
    assert_eq!(program.instructions[2].opcode, Opcode::WriteDirect);
  }

  #[test]
  fn bare_instruction_array() {
    let program = decode(r#"[{"opcode": "NOP"}, {"opcode": "HALT"}]"#).unwrap();
    assert_eq!(program.data, None);
    assert_eq!(program.data(), &[] as &[Word]);
    assert_eq!(program.instructions[1], Instruction::new(Opcode::Halt));
  }

  #[test]
  fn unknown_opcode() {
    assert!(decode(r#"{"instructions": [{"opcode": "FROB"}]}"#).is_err());
    assert!(decode(r#"{"data": [1]}"#).is_err());
  }
}
