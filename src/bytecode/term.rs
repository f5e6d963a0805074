//! Provenance of a compiled instruction, carried for diagnostic tracing.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use string_cache::DefaultAtom;

/**
  The source expression an instruction was compiled from: the source line, a comment or
  context string, and the literal source text. As with all strings in this codebase, the
  strings are interned. In the container a `Term` is the triple `[line_num, context, text]`.
*/
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "(u32, String, String)", into = "(u32, String, String)")]
pub struct Term {
  pub line_num : u32,
  pub context  : DefaultAtom,
  pub text     : DefaultAtom,
}

impl Term {
  pub fn new(line_num: u32, context: &str, text: &str) -> Term {
    Term {
      line_num,
      context : DefaultAtom::from(context),
      text    : DefaultAtom::from(text),
    }
  }
}

impl From<(u32, String, String)> for Term {
  fn from((line_num, context, text): (u32, String, String)) -> Term {
    Term::new(line_num, &context, &text)
  }
}

impl From<Term> for (u32, String, String) {
  fn from(term: Term) -> (u32, String, String) {
    (term.line_num, term.context.to_string(), term.text.to_string())
  }
}

impl Display for Term {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "'{}' @ {}:{}", self.text, self.line_num, self.context)
  }
}
