use std::fmt::Display;

use indexmap::IndexMap;

use crate::lexer::Location;

use super::{types::VarType, value::Value};

/// Everything the pipeline knows about one declared identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct IdInfo {
    /// Data-memory slot, assigned sequentially from 0 in declaration order.
    pub mem_location: usize,
    /// Every source location the identifier appears at, in traversal order.
    pub locations: Vec<Location>,
    pub val: Value,
    pub ty: VarType,
}

impl IdInfo {
    pub fn new(ty: VarType, declared_at: Location, mem_location: usize) -> Self {
        Self {
            mem_location,
            locations: vec![declared_at],
            val: Value::default_for(ty),
            ty,
        }
    }

    pub fn record_location(&mut self, location: Location) {
        if !self.locations.contains(&location) {
            self.locations.push(location);
        }
    }

    pub fn reset_value(&mut self) {
        self.val = Value::default_for(self.ty);
    }
}

impl Display for IdInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let locations = self
            .locations
            .iter()
            .map(Location::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}#[{}]#{}#{}", self.mem_location, locations, self.val, self.ty)
    }
}

/// Symbol table in declaration order, keyed by identifier.
pub type SymbolTable = IndexMap<String, IdInfo>;

/// Render the table the way `symtab.txt` stores it.
pub fn render_symtab(table: &SymbolTable) -> String {
    let mut out = String::new();
    for (name, info) in table {
        out.push_str(&format!("{name}: {info}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symtab_line_format() {
        let mut info = IdInfo::new(VarType::Int, Location::new(1, 7), 0);
        info.record_location(Location::new(2, 3));
        info.record_location(Location::new(2, 3));
        info.val = Value::Int(5);

        assert_eq!(info.to_string(), "0#[1:7, 2:3]#5#int");
    }
}
