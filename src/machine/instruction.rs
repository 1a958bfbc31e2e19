use std::{collections::HashMap, fmt::Display, str::FromStr};

use crate::semantic::Value;

use super::{MachineError, IADDR_SIZE};

/// The three instruction layouts of the PM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// `op r,s,t`
    RegisterOnly,
    /// `op r,d(s)` with a data-memory access at `d + reg[s]`
    RegisterMemory,
    /// `op r,d(s)` computing the plain address `d + reg[s]`
    RegisterAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Halt,
    In,
    Out,
    OutLn,
    Add,
    Sub,
    Mul,
    Div,
    Ld,
    St,
    Lda,
    Ldc,
    Jlt,
    Jle,
    Jgt,
    Jge,
    Jeq,
    Jne,
}

impl Opcode {
    pub fn form(self) -> Form {
        match self {
            Self::Halt
            | Self::In
            | Self::Out
            | Self::OutLn
            | Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div => Form::RegisterOnly,
            Self::Ld | Self::St => Form::RegisterMemory,
            Self::Lda
            | Self::Ldc
            | Self::Jlt
            | Self::Jle
            | Self::Jgt
            | Self::Jge
            | Self::Jeq
            | Self::Jne => Form::RegisterAddress,
        }
    }
}

pub struct OpcodeParseError(pub String);

impl FromStr for Opcode {
    type Err = OpcodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HALT" => Ok(Self::Halt),
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            "OUTLN" => Ok(Self::OutLn),
            "ADD" => Ok(Self::Add),
            "SUB" => Ok(Self::Sub),
            "MUL" => Ok(Self::Mul),
            "DIV" => Ok(Self::Div),
            "LD" => Ok(Self::Ld),
            "ST" => Ok(Self::St),
            "LDA" => Ok(Self::Lda),
            "LDC" => Ok(Self::Ldc),
            "JLT" => Ok(Self::Jlt),
            "JLE" => Ok(Self::Jle),
            "JGT" => Ok(Self::Jgt),
            "JGE" => Ok(Self::Jge),
            "JEQ" => Ok(Self::Jeq),
            "JNE" => Ok(Self::Jne),
            _ => Err(OpcodeParseError(format!("Illegal opcode '{s}'"))),
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Self::Halt => "HALT",
            Self::In => "IN",
            Self::Out => "OUT",
            Self::OutLn => "OUTLN",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Ld => "LD",
            Self::St => "ST",
            Self::Lda => "LDA",
            Self::Ldc => "LDC",
            Self::Jlt => "JLT",
            Self::Jle => "JLE",
            Self::Jgt => "JGT",
            Self::Jge => "JGE",
            Self::Jeq => "JEQ",
            Self::Jne => "JNE",
        };
        f.write_str(value)
    }
}

/// One decoded PM instruction. For RM/RA forms `a2` is the displacement
/// (possibly a real or boolean literal) and `a3` the base register.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub op: Opcode,
    pub a1: i64,
    pub a2: Value,
    pub a3: i64,
}

/// Parse a textual instruction listing into instruction memory. Comment
/// lines start with `*`; every other line is `LOC:  OP  ARGS[\tCOMMENT]`.
pub fn parse_listing(lines: &[String]) -> Result<HashMap<usize, Instruction>, MachineError> {
    let mut imem = HashMap::new();

    for (index, line) in lines.iter().enumerate() {
        let line_no = index + 1;
        if line.is_empty() || line.starts_with('*') {
            continue;
        }
        if !line.contains(':') {
            return Err(MachineError(format!("Missing colon at {line_no}")));
        }

        let mut fields = line.split("  ");
        let loc = fields
            .next()
            .and_then(|field| field.split(':').next())
            .and_then(|loc| loc.parse::<usize>().ok())
            .ok_or_else(|| MachineError(format!("Bad location at {line_no}")))?;
        if loc > IADDR_SIZE {
            return Err(MachineError(format!(
                "Location too large at {line_no}, instruction {loc}"
            )));
        }

        let opcode = fields
            .next()
            .filter(|opcode| !opcode.is_empty())
            .ok_or_else(|| MachineError(format!(
                "Missing opcode at {line_no}, instruction {loc}"
            )))?;
        let op = opcode
            .parse::<Opcode>()
            .map_err(|_| MachineError(format!(
                "Illegal opcode at {line_no}, instruction {loc}"
            )))?;

        let args = fields
            .next()
            .and_then(|args| args.split('\t').next())
            .ok_or_else(|| MachineError(format!(
                "Bad first register at {line_no}, instruction {loc}"
            )))?;

        let instruction = match op.form() {
            Form::RegisterOnly => parse_register_args(op, args, line_no, loc)?,
            Form::RegisterMemory | Form::RegisterAddress => {
                parse_memory_args(op, args, line_no, loc)?
            }
        };
        imem.insert(loc, instruction);
    }

    Ok(imem)
}

fn parse_register_args(
    op: Opcode,
    args: &str,
    line_no: usize,
    loc: usize,
) -> Result<Instruction, MachineError> {
    let mut parts = args.split(',');
    let a1 = parse_reg(parts.next(), "Bad first register", line_no, loc)?;
    let a2 = parse_reg(parts.next(), "Bad second register", line_no, loc)?;
    let a3 = parse_reg(parts.next(), "Bad third register", line_no, loc)?;
    Ok(Instruction {
        op,
        a1,
        a2: Value::Int(a2),
        a3,
    })
}

fn parse_memory_args(
    op: Opcode,
    args: &str,
    line_no: usize,
    loc: usize,
) -> Result<Instruction, MachineError> {
    let mut parts = args.split(',');
    let a1 = parse_reg(parts.next(), "Bad first register", line_no, loc)?;

    let rest = parts
        .next()
        .ok_or_else(|| MachineError(format!("Bad displacement at {line_no}, instruction {loc}")))?;
    let mut rest = rest.split('(');
    let a2 = rest
        .next()
        .and_then(Value::parse_literal)
        .ok_or_else(|| MachineError(format!("Bad displacement at {line_no}, instruction {loc}")))?;
    let a3 = rest
        .next()
        .and_then(|base| base.split(')').next())
        .and_then(|base| base.parse::<i64>().ok())
        .ok_or_else(|| MachineError(format!(
            "Bad second register at {line_no}, instruction {loc}"
        )))?;

    Ok(Instruction { op, a1, a2, a3 })
}

fn parse_reg(
    field: Option<&str>,
    label: &str,
    line_no: usize,
    loc: usize,
) -> Result<i64, MachineError> {
    field
        .and_then(|field| field.trim().parse::<i64>().ok())
        .ok_or_else(|| MachineError(format!("{label} at {line_no}, instruction {loc}")))
}
