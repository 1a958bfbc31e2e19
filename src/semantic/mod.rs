//! Semantic analyzer for Tiny-Extended.
//!
//! Walks the syntax tree in two passes: declarations populate the symbol
//! table (pass 1, pre-order), statements are type checked and constant
//! folded (pass 2, post-order). Refuses to run while syntax errors remain.

mod symbol;
mod types;
mod value;

pub use symbol::*;
pub use types::*;
pub use value::*;

use std::{
    cmp::Ordering,
    error::Error,
    fmt::Display,
    fs::{self, File},
    io::Write,
    path::Path,
};

use log::debug;

use crate::{
    ast::{self, Atom, AtomKind, OpKind},
    lexer::Location,
    parser::SyntaxError,
};

const SYNTAX_ERROR_AT: &str =
    "Cannot proceed with semantic analysis. There are still syntax errors at";
const ALREADY_DECLARED: &str = "Variable was already declared";
const NOT_DECLARED: &str = "Variable was not declared";
const DIVISION_BY_ZERO: &str = "Division by zero";
const EXPECTED_TYPE: &str = "Expected type:";

/// Fatal analyzer failure (unresolved syntax errors upstream).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisError(pub String);

impl Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Error for AnalysisError {}

/// A collected semantic error or warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticError {
    pub location: Location,
    pub message: String,
}

impl Display for SemanticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message.as_str())
    }
}

impl Error for SemanticError {}

#[derive(Default)]
pub struct Analyzer {
    pub errors: Vec<SemanticError>,
    pub symbol_table: SymbolTable,
    mem_location: usize,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotate the tree with types and folded values. Consumes the parse
    /// tree and returns the evaluated one.
    pub fn walk(
        &mut self,
        mut root: Atom,
        parse_errors: &[SyntaxError],
    ) -> Result<Atom, AnalysisError> {
        self.errors.clear();
        self.symbol_table.clear();
        self.mem_location = 0;

        if let Some(first) = parse_errors.first() {
            let message = match first.location {
                Some(location) => format!("{SYNTAX_ERROR_AT} {location}"),
                None => first.message.clone(),
            };
            return Err(AnalysisError(message));
        }

        debug!("analyzing '{}'", root.lexeme);
        if let Some(declarations) = root.children.get_mut(0) {
            self.declare(declarations);
        }
        if let Some(statements) = root.children.get_mut(1) {
            self.eval_statements(statements);
        }

        Ok(root)
    }

    /// Write `etree.txt`, `errors.txt` and `symtab.txt` into `out_dir`.
    pub fn write_output(&self, root: &Atom, out_dir: &Path) -> Result<(), Box<dyn Error>> {
        fs::create_dir_all(out_dir)?;
        fs::write(out_dir.join("etree.txt"), ast::render(root))?;

        let mut errors_file = File::create(out_dir.join("errors.txt"))?;
        for error in &self.errors {
            writeln!(errors_file, "{error}")?;
        }

        fs::write(out_dir.join("symtab.txt"), render_symtab(&self.symbol_table))?;
        Ok(())
    }

    fn add_error(&mut self, location: Location, message: String) {
        if !self.errors.iter().any(|error| error.message == message) {
            self.errors.push(SemanticError { location, message });
        }
    }

    fn check_declared(&mut self, name: &str, category: &str, location: Location) -> bool {
        if self.symbol_table.contains_key(name) {
            return true;
        }
        self.add_error(
            location,
            format!("Error at {location}: token -> {category}, {name}. {NOT_DECLARED}."),
        );
        false
    }

    fn record_location(&mut self, name: &str, location: Location) {
        if let Some(info) = self.symbol_table.get_mut(name) {
            info.record_location(location);
        }
    }

    fn declare(&mut self, declarations: &mut Atom) {
        for var_type in &mut declarations.children {
            let Ok(ty) = var_type.lexeme.parse::<VarType>() else {
                continue;
            };
            for id_atom in &mut var_type.children {
                if !matches!(id_atom.kind, AtomKind::Id { .. }) {
                    continue;
                }
                if self.symbol_table.contains_key(&id_atom.lexeme) {
                    self.add_error(
                        id_atom.location,
                        format!(
                            "Error at {}: token -> ID, {}. {ALREADY_DECLARED}.",
                            id_atom.location, id_atom.lexeme
                        ),
                    );
                } else {
                    id_atom.ty = Some(ty);
                    self.symbol_table.insert(
                        id_atom.lexeme.clone(),
                        IdInfo::new(ty, id_atom.location, self.mem_location),
                    );
                    self.mem_location += 1;
                }
            }
        }
    }

    fn eval_statements(&mut self, atom: &mut Atom) {
        for child in &mut atom.children {
            self.eval_statements(child);
        }
        self.visit(atom);
    }

    fn visit(&mut self, atom: &mut Atom) {
        match atom.kind.clone() {
            AtomKind::Op(_) => {
                let value = self.eval_op(atom);
                atom.val = Some(value);
            }
            AtomKind::Assign { target } => self.visit_assignment(atom, &target),
            AtomKind::If | AtomKind::While => {
                if let Some(condition) = atom.children.first_mut() {
                    if !is_relational(condition) {
                        let value = self.eval_condition(&*condition);
                        condition.val = Some(value);
                    }
                }
            }
            AtomKind::Repeat => {
                if let Some(condition) = atom.children.get_mut(1) {
                    if !is_relational(condition) {
                        let value = self.eval_condition(&*condition);
                        condition.val = Some(value);
                    }
                }
            }
            AtomKind::Cout | AtomKind::Coutln => {
                if let Some(child) = atom.children.first_mut() {
                    if matches!(child.kind, AtomKind::Id { .. }) {
                        let value = self.eval_operand(&*child);
                        child.val = Some(value);
                    }
                }
            }
            AtomKind::Cin {
                target,
                id_location,
            } => {
                if self.check_declared(&target, "KEYWORD", atom.location) {
                    if let Some(location) = id_location {
                        self.record_location(&target, location);
                    }
                }
            }
            _ => {}
        }
    }

    fn visit_assignment(&mut self, atom: &mut Atom, target: &str) {
        if !self.check_declared(target, "ID", atom.location) {
            return;
        }
        let Some(child) = atom.children.first() else {
            return;
        };
        let child_location = child.location;
        let value = self.eval_operand(child);
        let Some(ty) = self.symbol_table.get(target).map(|info| info.ty) else {
            return;
        };

        match ty {
            VarType::Real => self.assign(atom, target, Value::Real(value.as_real())),
            VarType::Int if matches!(value, Value::Int(_)) => self.assign(atom, target, value),
            VarType::Boolean if matches!(value, Value::Bool(_)) => self.assign(atom, target, value),
            _ => self.add_error(
                child_location,
                format!("Warning at {child_location}. {EXPECTED_TYPE} {ty}"),
            ),
        }

        self.record_location(target, atom.location);
    }

    fn assign(&mut self, atom: &mut Atom, target: &str, value: Value) {
        atom.val = Some(value);
        if let Some(info) = self.symbol_table.get_mut(target) {
            info.val = value;
        }
    }

    fn eval_op(&mut self, atom: &Atom) -> Value {
        let AtomKind::Op(op) = &atom.kind else {
            return Value::Int(0);
        };

        match (*op, atom.children.as_slice()) {
            (OpKind::Add, [operand]) => self.eval_operand(operand),
            (OpKind::Sub, [operand]) => self.eval_operand(operand).neg(),
            (OpKind::Add, [lhs, rhs]) => self.eval_operand(lhs).add(self.eval_operand(rhs)),
            (OpKind::Sub, [lhs, rhs]) => self.eval_operand(lhs).sub(self.eval_operand(rhs)),
            (OpKind::Mul, [lhs, rhs]) => self.eval_operand(lhs).mul(self.eval_operand(rhs)),
            (OpKind::Div, [lhs, rhs]) => {
                let left = self.eval_operand(lhs);
                let right = self.eval_operand(rhs);
                if right.is_zero() {
                    self.add_error(
                        rhs.location,
                        format!("Error at {}. {DIVISION_BY_ZERO}", rhs.location),
                    );
                    Value::Real(f64::INFINITY)
                } else {
                    left.div(right)
                }
            }
            (op, [lhs, rhs]) if op.is_relational() => {
                let ordering = self.eval_operand(lhs).compare(self.eval_operand(rhs));
                Value::Bool(match op {
                    OpKind::Lt => ordering == Some(Ordering::Less),
                    OpKind::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                    OpKind::Gt => ordering == Some(Ordering::Greater),
                    OpKind::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                    OpKind::Eq => ordering == Some(Ordering::Equal),
                    OpKind::Ne => ordering != Some(Ordering::Equal),
                    _ => false,
                })
            }
            _ => Value::Int(0),
        }
    }

    fn eval_operand(&mut self, atom: &Atom) -> Value {
        match &atom.kind {
            AtomKind::Int => Value::Int(atom.lexeme.parse().unwrap_or(0)),
            AtomKind::Real => Value::Real(atom.lexeme.parse().unwrap_or(0.0)),
            AtomKind::Bool => Value::Bool(atom.lexeme == "True"),
            AtomKind::Id { inc_dec } => {
                if self.check_declared(&atom.lexeme, "ID", atom.location) {
                    if !*inc_dec {
                        self.record_location(&atom.lexeme, atom.location);
                    }
                    self.symbol_table
                        .get(&atom.lexeme)
                        .map(|info| info.val)
                        .unwrap_or(Value::Int(0))
                } else {
                    Value::Int(0)
                }
            }
            AtomKind::Op(_) => self.eval_op(atom),
            _ => Value::Int(0),
        }
    }

    fn eval_condition(&mut self, atom: &Atom) -> Value {
        let truthy = match &atom.kind {
            AtomKind::Int => atom.lexeme.parse::<i64>().unwrap_or(0) != 0,
            AtomKind::Real => atom.lexeme.parse::<f64>().unwrap_or(0.0) != 0.0,
            AtomKind::Bool => atom.lexeme != "False",
            AtomKind::Id { inc_dec } => {
                if self.check_declared(&atom.lexeme, "ID", atom.location) {
                    if !*inc_dec {
                        self.record_location(&atom.lexeme, atom.location);
                    }
                    self.symbol_table
                        .get(&atom.lexeme)
                        .map(|info| info.val.truthy())
                        .unwrap_or(false)
                } else {
                    false
                }
            }
            AtomKind::Op(_) => self.eval_op(atom).truthy(),
            _ => false,
        };
        Value::Bool(truthy)
    }
}

fn is_relational(atom: &Atom) -> bool {
    matches!(atom.kind, AtomKind::Op(op) if op.is_relational())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer::Lexer, parser::Parser};

    fn analyze(source: &str) -> (Analyzer, Atom) {
        let mut parser = Parser::new(Lexer::scan_text(source));
        let root = parser.parse().expect("expected parse to succeed");
        let mut analyzer = Analyzer::new();
        let evaluated = analyzer
            .walk(root, &parser.errors)
            .expect("expected analysis to run");
        (analyzer, evaluated)
    }

    #[test]
    fn test_declarations_get_sequential_memory_locations() {
        let (analyzer, _) = analyze("main { int x; real y; boolean z; }");

        let table = &analyzer.symbol_table;
        assert_eq!(table["x"].mem_location, 0);
        assert_eq!(table["y"].mem_location, 1);
        assert_eq!(table["z"].mem_location, 2);
        assert_eq!(table["x"].val, Value::Int(0));
        assert_eq!(table["y"].val, Value::Real(0.0));
        assert_eq!(table["z"].val, Value::Bool(false));
    }

    #[test]
    fn test_redeclaration_is_an_error() {
        let (analyzer, _) = analyze("main { int x; real x; }");

        assert_eq!(analyzer.errors.len(), 1);
        assert!(analyzer.errors[0]
            .message
            .ends_with("Variable was already declared."));
        // The first declaration wins.
        assert_eq!(analyzer.symbol_table["x"].ty, VarType::Int);
    }

    #[test]
    fn test_undeclared_assignment_target() {
        let (analyzer, _) = analyze("main { x := 1; }");

        assert_eq!(analyzer.errors.len(), 1);
        assert_eq!(
            analyzer.errors[0].message,
            "Error at 1:8: token -> ID, x. Variable was not declared."
        );
    }

    #[test]
    fn test_constant_folding_into_symbol_table() {
        let (analyzer, root) = analyze("main { int x; x := 2 + 3 * 4; }");

        assert!(analyzer.errors.is_empty());
        assert_eq!(analyzer.symbol_table["x"].val, Value::Int(14));
        assert_eq!(root.children[1].children[0].val, Some(Value::Int(14)));
    }

    #[test]
    fn test_division_by_zero_folds_to_infinity() {
        let (analyzer, root) = analyze("main { int x; x := 5 / 0; }");

        assert_eq!(analyzer.errors.len(), 2);
        assert!(analyzer.errors[0].message.ends_with("Division by zero"));
        // The folded value propagates as a real, which then mismatches.
        assert!(analyzer.errors[1].message.starts_with("Warning at"));
        let op = &root.children[1].children[0].children[0];
        assert_eq!(op.val, Some(Value::Real(f64::INFINITY)));
    }

    #[test]
    fn test_real_target_coerces_value() {
        let (analyzer, _) = analyze("main { real x; x := 3; }");

        assert!(analyzer.errors.is_empty());
        assert_eq!(analyzer.symbol_table["x"].val, Value::Real(3.0));
    }

    #[test]
    fn test_int_target_rejects_real_value() {
        let (analyzer, _) = analyze("main { int x; x := 2.5; }");

        assert_eq!(analyzer.errors.len(), 1);
        assert_eq!(
            analyzer.errors[0].message,
            "Warning at 1:20. Expected type: int"
        );
        // The rejected value does not reach the table.
        assert_eq!(analyzer.symbol_table["x"].val, Value::Int(0));
    }

    #[test]
    fn test_boolean_assignment_from_comparison() {
        let (analyzer, _) = analyze("main { boolean b; b := 3 < 5; }");

        assert!(analyzer.errors.is_empty());
        assert_eq!(analyzer.symbol_table["b"].val, Value::Bool(true));
    }

    #[test]
    fn test_location_tracking() {
        let (analyzer, _) = analyze("main { int x; x := 1; cout x; }");

        let locations = &analyzer.symbol_table["x"].locations;
        assert_eq!(
            locations,
            &vec![
                Location::new(1, 12),
                Location::new(1, 15),
                Location::new(1, 28),
            ]
        );
    }

    #[test]
    fn test_inc_dec_read_is_not_tracked() {
        let (analyzer, _) = analyze("main { int x; ++x; }");

        // Declaration plus the write; the synthetic read is suppressed.
        assert_eq!(analyzer.symbol_table["x"].locations.len(), 2);
        assert_eq!(analyzer.symbol_table["x"].val, Value::Int(1));
    }

    #[test]
    fn test_condition_coerced_to_boolean() {
        let (_, root) = analyze("main { int x; if (x) then { } }");

        let condition = &root.children[1].children[0].children[0];
        assert_eq!(condition.val, Some(Value::Bool(false)));
    }

    #[test]
    fn test_refuses_to_run_with_syntax_errors() {
        let mut parser = Parser::new(Lexer::scan_text("main { int x x := 1; }"));
        let root = parser.parse().expect("expected parse to succeed");

        let result = Analyzer::new().walk(root, &parser.errors);
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some(format!("{SYNTAX_ERROR_AT} 1:14"))
        );
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let source = "main { int x; x := 7 / 2; cout x; }";
        let mut parser = Parser::new(Lexer::scan_text(source));
        let root = parser.parse().expect("expected parse to succeed");

        let mut analyzer = Analyzer::new();
        let evaluated = analyzer.walk(root.clone(), &parser.errors).expect("first run");
        let first_table = analyzer.symbol_table.clone();
        let first_errors = analyzer.errors.clone();

        let again = analyzer.walk(root, &parser.errors).expect("second run");
        assert_eq!(evaluated, again);
        assert_eq!(first_table, analyzer.symbol_table);
        assert_eq!(first_errors, analyzer.errors);
    }
}
