use std::collections::HashMap;

use bimap::BiMap;
use string_cache::DefaultAtom;

/**
  A symbol table maps label names to the program counter of the instruction they mark. The
  first label of each address lives in a BiMap, so a label can be found from its address
  when listing a program. Further labels on an address are aliases and only resolve forward.
*/
#[derive(Debug)]
pub struct SymbolTable {
  table   : BiMap<DefaultAtom, usize>,
  aliases : HashMap<DefaultAtom, usize>,
}

impl SymbolTable {

  pub fn new() -> SymbolTable {
    SymbolTable {
      table   : BiMap::new(),
      aliases : HashMap::new(),
    }
  }

  /// The first label defined at `pc`.
  pub fn get_label(&self, pc: usize) -> Option<&DefaultAtom> {
    self.table.get_by_right(&pc)
  }

  pub fn get_address(&self, label: &str) -> Option<usize> {
    let label = DefaultAtom::from(label);
    self.table.get_by_left(&label).or_else(|| self.aliases.get(&label)).copied()
  }

  /// Fails without modifying the table if the label is already defined.
  pub fn insert(&mut self, label: &str, pc: usize) -> Result<(), DefaultAtom> {
    let label = DefaultAtom::from(label);
    if self.table.contains_left(&label) || self.aliases.contains_key(&label) {
      return Err(label);
    }
    match self.table.contains_right(&pc) {
      true  => { self.aliases.insert(label, pc); }
      false => { self.table.insert(label, pc); }
    }
    Ok(())
  }

  pub fn contains_label(&self, label: &str) -> bool {
    self.get_address(label).is_some()
  }

  pub fn len(&self) -> usize {
    self.table.len() + self.aliases.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
