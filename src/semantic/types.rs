use std::{fmt::Display, str::FromStr};

/// Declared type of a Tiny-Extended variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Int,
    Real,
    Boolean,
}

pub struct VarTypeParseError(pub String);

impl FromStr for VarType {
    type Err = VarTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(Self::Int),
            "real" => Ok(Self::Real),
            "boolean" => Ok(Self::Boolean),
            _ => Err(VarTypeParseError(format!("Invalid type '{s}'"))),
        }
    }
}

impl Display for VarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Self::Int => "int",
            Self::Real => "real",
            Self::Boolean => "boolean",
        };
        f.write_str(value)
    }
}
