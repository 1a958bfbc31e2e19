//! PM code generator.
//!
//! Emits the instruction listing for an evaluated syntax tree. Control flow
//! is backpatched: conditionals and loops reserve holes with `skip` and fill
//! them in once their exit addresses are known. `rompe` holes are collected
//! per enclosing loop, so breaks in nested loops each reach their own exit.

mod emitter;

pub use emitter::Emitter;

use std::{error::Error, fmt::Display, fs, path::Path};

use log::info;

use crate::{
    ast::{Atom, AtomKind, OpKind},
    machine::Opcode,
    semantic::{SemanticError, SymbolTable},
};

const SEMANTIC_ERROR_AT: &str =
    "Cannot proceed with code generation. There are still semantic errors at";

const PC: i64 = 7;
const MP: i64 = 6;
const GP: i64 = 5;
const AC: i64 = 0;
const AC1: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenError(pub String);

impl Display for CodegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Error for CodegenError {}

pub struct Compiler<'a> {
    symbols: &'a SymbolTable,
    emitter: Emitter,
    tmp_offset: i64,
    break_holes: Vec<usize>,
}

impl<'a> Compiler<'a> {
    pub fn new(symbols: &'a SymbolTable, trace: bool) -> Self {
        Self {
            symbols,
            emitter: Emitter::new(trace),
            tmp_offset: 0,
            break_holes: vec![],
        }
    }

    /// Emit the full listing for `root`.
    pub fn generate(
        mut self,
        root: &Atom,
        semantic_errors: &[SemanticError],
    ) -> Result<Vec<String>, CodegenError> {
        if let Some(first) = semantic_errors.first() {
            return Err(CodegenError(format!(
                "{SEMANTIC_ERROR_AT} {}",
                first.location
            )));
        }

        info!("Generating code...");
        self.emitter.comment("Standard prelude:");
        self.emitter
            .rm(Opcode::Ld, MP, 0, AC, "load maxaddress from location 0");
        self.emitter.rm(Opcode::St, AC, 0, AC, "clear location 0");
        self.emitter.comment("End of standard prelude");

        match root.children.as_slice() {
            [only] if only.kind == AtomKind::StmtList => self.gen_statements(only)?,
            [_, statements] => self.gen_statements(statements)?,
            _ => {}
        }

        self.emitter.comment("End of execution");
        self.emitter.ro(Opcode::Halt, 0, 0, 0, "");
        Ok(self.emitter.into_lines())
    }

    fn gen_statements(&mut self, list: &Atom) -> Result<(), CodegenError> {
        for atom in &list.children {
            match &atom.kind {
                AtomKind::If => self.gen_if(atom)?,
                AtomKind::While => self.gen_while(atom)?,
                AtomKind::Repeat => self.gen_repeat(atom)?,
                AtomKind::Cin { target, .. } => self.gen_cin(target)?,
                AtomKind::Cout => self.gen_cout(atom, false)?,
                AtomKind::Coutln => self.gen_cout(atom, true)?,
                AtomKind::StmtList => self.gen_statements(atom)?,
                AtomKind::Assign { target } => self.gen_assignment(atom, target)?,
                AtomKind::Break => self.gen_break(),
                _ => {}
            }
        }
        Ok(())
    }

    fn gen_if(&mut self, atom: &Atom) -> Result<(), CodegenError> {
        let [condition, then_branch, rest @ ..] = atom.children.as_slice() else {
            return Ok(());
        };
        let else_branch = rest.first();

        self.emitter.comment("-> if");
        self.gen_expression(condition)?;

        let then_hole = self.emitter.skip(1);
        self.emitter.comment("if: jump after then belongs here");
        self.gen_statements(then_branch)?;

        let else_hole = else_branch.map(|_| {
            let hole = self.emitter.skip(1);
            self.emitter.comment("if: jump after else belongs here");
            hole
        });

        let after_then = self.emitter.skip(0);
        self.emitter.backup(then_hole)?;
        self.emitter
            .rm_abs(Opcode::Jeq, AC, after_then, PC, "if: jmp to after then");
        self.emitter.restore();

        if let (Some(else_branch), Some(else_hole)) = (else_branch, else_hole) {
            self.gen_statements(else_branch)?;
            let after_else = self.emitter.skip(0);
            self.emitter.backup(else_hole)?;
            self.emitter
                .rm_abs(Opcode::Lda, PC, after_else, PC, "jmp to after else");
            self.emitter.restore();
        }

        self.emitter.comment("<- if");
        Ok(())
    }

    fn gen_while(&mut self, atom: &Atom) -> Result<(), CodegenError> {
        let [condition, body] = atom.children.as_slice() else {
            return Ok(());
        };

        self.emitter.comment("-> while");
        let head = self.emitter.skip(0);
        self.gen_expression(condition)?;
        let exit_hole = self.emitter.skip(1);

        let outer_breaks = std::mem::take(&mut self.break_holes);
        self.gen_statements(body)?;
        let breaks = std::mem::replace(&mut self.break_holes, outer_breaks);

        let current = self.emitter.skip(0);
        self.emitter.backup(exit_hole)?;
        self.emitter
            .rm_abs(Opcode::Jeq, AC, current + 1, PC, "jmp to after while");
        for hole in breaks {
            self.emitter.backup(hole)?;
            self.emitter
                .rm_abs(Opcode::Lda, PC, current + 1, PC, "rompe jump");
        }
        self.emitter.restore();
        self.emitter
            .rm_abs(Opcode::Lda, PC, head, PC, "jmp to expression");
        self.emitter.comment("<- while");
        Ok(())
    }

    fn gen_repeat(&mut self, atom: &Atom) -> Result<(), CodegenError> {
        let [body, condition] = atom.children.as_slice() else {
            return Ok(());
        };

        self.emitter.comment("-> repeat");
        let head = self.emitter.skip(0);

        let outer_breaks = std::mem::take(&mut self.break_holes);
        self.gen_statements(body)?;
        self.gen_expression(condition)?;
        let breaks = std::mem::replace(&mut self.break_holes, outer_breaks);

        if !breaks.is_empty() {
            let current = self.emitter.skip(0);
            for hole in breaks {
                self.emitter.backup(hole)?;
                self.emitter
                    .rm_abs(Opcode::Lda, PC, current + 1, PC, "rompe jump");
            }
            self.emitter.restore();
        }
        self.emitter
            .rm_abs(Opcode::Jeq, AC, head, PC, "repeat: jmp back to body");
        self.emitter.comment("<- repeat");
        Ok(())
    }

    fn gen_cin(&mut self, target: &str) -> Result<(), CodegenError> {
        self.emitter.ro(Opcode::In, AC, 0, 0, "-> read");
        let location = self.location_of(target)?;
        self.emitter.rm(Opcode::St, AC, location, GP, "<- read");
        Ok(())
    }

    fn gen_cout(&mut self, atom: &Atom, newline: bool) -> Result<(), CodegenError> {
        let Some(value) = atom.children.first() else {
            return Ok(());
        };
        self.gen_expression(value)?;
        let op = if newline { Opcode::OutLn } else { Opcode::Out };
        self.emitter.ro(op, AC, 0, 0, "-> write");
        Ok(())
    }

    fn gen_assignment(&mut self, atom: &Atom, target: &str) -> Result<(), CodegenError> {
        let Some(value) = atom.children.first() else {
            return Ok(());
        };

        self.emitter.comment("-> assignment");
        self.gen_expression(value)?;
        let location = self.location_of(target)?;
        self.emitter
            .rm(Opcode::St, AC, location, GP, "assignment: store value");
        self.emitter.comment("<- assignment");
        Ok(())
    }

    fn gen_break(&mut self) {
        self.break_holes.push(self.emitter.skip(1));
    }

    fn gen_expression(&mut self, atom: &Atom) -> Result<(), CodegenError> {
        match &atom.kind {
            AtomKind::Int | AtomKind::Real | AtomKind::Bool => {
                self.emitter.comment("-> Const");
                let literal = match atom.lexeme.as_str() {
                    "True" => "1",
                    "False" => "0",
                    lexeme => lexeme,
                };
                self.emitter.rm(Opcode::Ldc, AC, literal, 0, "Load const");
                self.emitter.comment("<- Const");
            }
            AtomKind::Id { .. } => {
                self.emitter.comment("-> Id");
                let location = self.location_of(&atom.lexeme)?;
                self.emitter.rm(Opcode::Ld, AC, location, GP, "Load ID value");
                self.emitter.comment("<- Id");
            }
            AtomKind::Op(op) => self.gen_operator(*op, atom)?,
            _ => {}
        }
        Ok(())
    }

    fn gen_operator(&mut self, op: OpKind, atom: &Atom) -> Result<(), CodegenError> {
        self.emitter.comment("-> Op");
        match atom.children.as_slice() {
            [lhs, rhs] => {
                self.gen_expression(lhs)?;
                self.push_operand();
                self.gen_expression(rhs)?;
                self.pop_operand();

                match op {
                    OpKind::Add => self.emitter.ro(Opcode::Add, AC, AC1, AC, "op +"),
                    OpKind::Sub => self.emitter.ro(Opcode::Sub, AC, AC1, AC, "op -"),
                    OpKind::Mul => self.emitter.ro(Opcode::Mul, AC, AC1, AC, "op *"),
                    OpKind::Div => self.emitter.ro(Opcode::Div, AC, AC1, AC, "op /"),
                    OpKind::Lt => self.gen_comparison(Opcode::Jlt, "<"),
                    OpKind::Le => self.gen_comparison(Opcode::Jle, "<="),
                    OpKind::Gt => self.gen_comparison(Opcode::Jgt, ">"),
                    OpKind::Ge => self.gen_comparison(Opcode::Jge, ">="),
                    OpKind::Eq => self.gen_comparison(Opcode::Jeq, "=="),
                    OpKind::Ne => self.gen_comparison(Opcode::Jne, "!="),
                    OpKind::Missing => {}
                }
            }
            [operand] => {
                self.emitter
                    .rm(Opcode::Ldc, AC, 0, AC, "load 0 in ac for sign operations");
                self.push_operand();
                self.gen_expression(operand)?;
                self.pop_operand();

                if op == OpKind::Sub {
                    self.emitter.ro(Opcode::Sub, AC, AC1, AC, "op -");
                } else {
                    self.emitter.ro(Opcode::Add, AC, AC1, AC, "op +");
                }
            }
            _ => {}
        }
        self.emitter.comment("<- Op");
        Ok(())
    }

    /// Save the left operand on the temp stack while the right one is
    /// being computed.
    fn push_operand(&mut self) {
        self.emitter
            .rm(Opcode::St, AC, self.tmp_offset, MP, "op: push left operand");
        self.tmp_offset -= 1;
    }

    fn pop_operand(&mut self) {
        self.tmp_offset += 1;
        self.emitter
            .rm(Opcode::Ld, AC1, self.tmp_offset, MP, "op: load left operand");
    }

    /// Comparisons leave 0/1 in the accumulator via a branch over the
    /// false case.
    fn gen_comparison(&mut self, jump: Opcode, operator: &str) {
        self.emitter
            .ro(Opcode::Sub, AC, AC1, AC, &format!("op {operator}"));
        self.emitter.rm(jump, AC, 2, PC, "br if true");
        self.emitter.rm(Opcode::Ldc, AC, 0, AC, "false case");
        self.emitter.rm(Opcode::Lda, PC, 1, PC, "unconditional jump");
        self.emitter.rm(Opcode::Ldc, AC, 1, AC, "true case");
    }

    fn location_of(&self, name: &str) -> Result<i64, CodegenError> {
        self.symbols
            .get(name)
            .map(|info| info.mem_location as i64)
            .ok_or_else(|| CodegenError(format!("no memory location for '{name}'")))
    }
}

/// Write `prru_code.txt` into `out_dir`.
pub fn write_listing(listing: &[String], out_dir: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(out_dir)?;
    let mut text = listing.join("\n");
    text.push('\n');
    fs::write(out_dir.join("prru_code.txt"), text)?;
    Ok(())
}
