//! The PM register machine.
//!
//! Loads a textual instruction listing back into instruction memory and
//! executes it behind a small interactive prompt. Stores into addresses
//! owned by declared variables are coerced to the declared type, keeping
//! the symbol table in sync with data memory.

mod instruction;

pub use instruction::*;

use std::{
    collections::HashMap,
    error::Error,
    fmt::Display,
    fs,
    io::{BufRead, Write},
    path::Path,
};

use log::debug;

use crate::semantic::{render_symtab, SymbolTable, Value};

pub const IADDR_SIZE: usize = 1024;
pub const DADDR_SIZE: usize = 1024;
const NO_REGS: usize = 8;
const PC_REG: usize = 7;

const IMEM_OOR: &str = "Instruction memory index out of range";
const DMEM_OOR: &str = "Memory index out of range";
const DIVISION_BY_ZERO: &str = "Division by zero";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineError(pub String);

impl Display for MachineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Error for MachineError {}

impl From<std::io::Error> for MachineError {
    fn from(error: std::io::Error) -> Self {
        Self(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Okay,
    Halt,
}

pub struct Machine<R, W> {
    imem: HashMap<usize, Instruction>,
    dmem: HashMap<usize, Value>,
    reg: [Value; NO_REGS],
    symbols: SymbolTable,
    pub count_instructions: bool,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Machine<R, W> {
    /// Parse `listing` into instruction memory and reset the machine.
    /// Symbol values are reset to their type defaults so the analyzer's
    /// folded values do not leak into the run.
    pub fn load(
        listing: &[String],
        mut symbols: SymbolTable,
        input: R,
        output: W,
    ) -> Result<Self, MachineError> {
        let imem = parse_listing(listing)?;
        debug!("loaded {} instructions", imem.len());

        for info in symbols.values_mut() {
            info.reset_value();
        }

        let mut machine = Self {
            imem,
            dmem: HashMap::new(),
            reg: [Value::Int(0); NO_REGS],
            symbols,
            count_instructions: false,
            input,
            output,
        };
        machine.reset();
        Ok(machine)
    }

    /// Reset registers and data memory for a fresh run.
    pub fn reset(&mut self) {
        self.reg = [Value::Int(0); NO_REGS];
        self.dmem.clear();
        self.dmem.insert(0, Value::Int(DADDR_SIZE as i64 - 1));
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Write the post-execution `symtab.txt` into `out_dir`.
    pub fn write_output(&self, out_dir: &Path) -> Result<(), Box<dyn Error>> {
        fs::create_dir_all(out_dir)?;
        fs::write(out_dir.join("symtab.txt"), render_symtab(&self.symbols))?;
        Ok(())
    }

    /// Execute one instruction at the current program counter.
    pub fn step(&mut self) -> Result<StepResult, MachineError> {
        let pc = int_of(self.reg[PC_REG]);
        if pc < 0 || pc > IADDR_SIZE as i64 {
            return Err(MachineError(IMEM_OOR.to_owned()));
        }
        self.reg[PC_REG] = Value::Int(pc + 1);

        let instruction = *self
            .imem
            .get(&(pc as usize))
            .ok_or_else(|| MachineError(IMEM_OOR.to_owned()))?;

        let r = instruction.a1;
        let s = int_of(instruction.a2);
        let t = instruction.a3;

        let mut m = 0;
        if instruction.op.form() != Form::RegisterOnly {
            let base = self.reg_value(instruction.a3)?;
            m = (instruction.a2.as_real() + base.as_real()) as i64;
            if instruction.op.form() == Form::RegisterMemory
                && (m < 0 || m > DADDR_SIZE as i64)
            {
                return Err(MachineError(DMEM_OOR.to_owned()));
            }
        }

        match instruction.op {
            Opcode::Halt => return Ok(StepResult::Halt),
            Opcode::In => {
                write!(self.output, "> ")?;
                self.output.flush()?;
                let mut line = String::new();
                if self.input.read_line(&mut line)? == 0 {
                    return Err(MachineError("Unexpected end of input".to_owned()));
                }
                let value = Value::parse_literal(line.trim()).ok_or_else(|| {
                    MachineError("Invalid conversion to int, real or boolean".to_owned())
                })?;
                self.set_reg(r, value)?;
            }
            Opcode::Out => {
                let value = self.reg_value(r)?;
                write!(self.output, "{value}")?;
            }
            Opcode::OutLn => {
                let value = self.reg_value(r)?;
                writeln!(self.output, "{value}")?;
            }
            Opcode::Add => {
                let value = self.reg_value(s)?.add(self.reg_value(t)?);
                self.set_reg(r, value)?;
            }
            Opcode::Sub => {
                let value = self.reg_value(s)?.sub(self.reg_value(t)?);
                self.set_reg(r, value)?;
            }
            Opcode::Mul => {
                let value = self.reg_value(s)?.mul(self.reg_value(t)?);
                self.set_reg(r, value)?;
            }
            Opcode::Div => {
                let left = self.reg_value(s)?;
                let right = self.reg_value(t)?;
                if right.is_zero() {
                    return Err(MachineError(DIVISION_BY_ZERO.to_owned()));
                }
                self.set_reg(r, divide(left, right))?;
            }
            Opcode::Ld => {
                let value = self
                    .dmem
                    .get(&(m as usize))
                    .copied()
                    .unwrap_or(Value::Int(0));
                self.set_reg(r, value)?;
            }
            Opcode::St => {
                let value = self.reg_value(r)?;
                let address = m as usize;
                let stored = match self
                    .symbols
                    .values_mut()
                    .find(|info| info.mem_location == address)
                {
                    Some(info) => {
                        let coerced = value.coerce(info.ty).map_err(MachineError)?;
                        info.val = coerced;
                        coerced
                    }
                    None => value,
                };
                self.dmem.insert(address, stored);
            }
            Opcode::Lda => self.set_reg(r, Value::Int(m))?,
            Opcode::Ldc => self.set_reg(r, instruction.a2)?,
            Opcode::Jlt => self.jump_if(r, m, |v| v < 0.0)?,
            Opcode::Jle => self.jump_if(r, m, |v| v <= 0.0)?,
            Opcode::Jgt => self.jump_if(r, m, |v| v > 0.0)?,
            Opcode::Jge => self.jump_if(r, m, |v| v >= 0.0)?,
            Opcode::Jeq => self.jump_if(r, m, |v| v == 0.0)?,
            Opcode::Jne => self.jump_if(r, m, |v| v != 0.0)?,
        }

        Ok(StepResult::Okay)
    }

    /// Run until `HALT` and return the number of executed instructions.
    pub fn go(&mut self) -> Result<usize, MachineError> {
        let mut steps = 0;
        loop {
            let result = self.step()?;
            steps += 1;
            if result == StepResult::Halt {
                return Ok(steps);
            }
        }
    }

    /// The interactive command loop.
    pub fn repl(&mut self) -> Result<(), MachineError> {
        loop {
            write!(self.output, "\nEnter command: ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let Some(command) = line.trim().chars().next() else {
                continue;
            };

            match command {
                'h' => {
                    writeln!(self.output, "\nCommands are: ")?;
                    writeln!(
                        self.output,
                        "   g(o        Execute PM instructions until HALT"
                    )?;
                    writeln!(
                        self.output,
                        "   c(lear     Reset simulator for new execution of program"
                    )?;
                    writeln!(
                        self.output,
                        "   h(elp      Cause this list of commands to be printed"
                    )?;
                    writeln!(self.output, "   q(uit      Terminate the simulation")?;
                }
                'g' => {
                    let steps = self.go()?;
                    if self.count_instructions {
                        writeln!(
                            self.output,
                            "Number of instructions executed = {steps}"
                        )?;
                    }
                }
                'c' => self.reset(),
                'q' => return Ok(()),
                other => writeln!(self.output, "Command {other} unknown")?,
            }
        }
    }

    fn reg_value(&self, index: i64) -> Result<Value, MachineError> {
        self.reg
            .get(usize::try_from(index).unwrap_or(usize::MAX))
            .copied()
            .ok_or_else(|| MachineError(format!("Bad register {index}")))
    }

    fn set_reg(&mut self, index: i64, value: Value) -> Result<(), MachineError> {
        let slot = usize::try_from(index)
            .ok()
            .and_then(|index| self.reg.get_mut(index))
            .ok_or_else(|| MachineError(format!("Bad register {index}")))?;
        *slot = value;
        Ok(())
    }

    fn jump_if(&mut self, r: i64, m: i64, taken: fn(f64) -> bool) -> Result<(), MachineError> {
        if taken(self.reg_value(r)?.as_real()) {
            self.reg[PC_REG] = Value::Int(m);
        }
        Ok(())
    }
}

fn int_of(value: Value) -> i64 {
    match value {
        Value::Int(int) => int,
        Value::Bool(boolean) => boolean as i64,
        Value::Real(real) => real as i64,
    }
}

/// Runtime division: exact integral quotients stay integral, everything
/// else produces the real quotient so that a typed store can still round
/// toward the target type.
fn divide(lhs: Value, rhs: Value) -> Value {
    if let (Value::Real(_), _) | (_, Value::Real(_)) = (lhs, rhs) {
        return Value::Real(lhs.as_real() / rhs.as_real());
    }
    let (left, right) = (int_of(lhs), int_of(rhs));
    if left % right == 0 {
        Value::Int(left / right)
    } else {
        Value::Real(lhs.as_real() / rhs.as_real())
    }
}
