use std::fmt::Display;

use super::types::VarType;

/// A runtime or constant-folded scalar. Booleans take part in arithmetic as
/// `1`/`0`; any real operand switches an operation to real semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Real(f64),
    Bool(bool),
}

impl Value {
    pub fn default_for(ty: VarType) -> Self {
        match ty {
            VarType::Int => Self::Int(0),
            VarType::Real => Self::Real(0.0),
            VarType::Boolean => Self::Bool(false),
        }
    }

    /// Parse an `int`, `real` or boolean literal.
    pub fn parse_literal(literal: &str) -> Option<Self> {
        match literal {
            "True" => return Some(Self::Bool(true)),
            "False" => return Some(Self::Bool(false)),
            _ => {}
        }
        if let Ok(int) = literal.parse::<i64>() {
            return Some(Self::Int(int));
        }
        literal.parse::<f64>().ok().map(Self::Real)
    }

    /// Integral view of the value, if it has one.
    fn as_int(self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(value),
            Self::Bool(value) => Some(value as i64),
            Self::Real(_) => None,
        }
    }

    pub fn as_real(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Real(value) => value,
            Self::Bool(value) => value as i64 as f64,
        }
    }

    pub fn is_zero(self) -> bool {
        self.as_real() == 0.0
    }

    pub fn truthy(self) -> bool {
        !self.is_zero()
    }

    pub fn add(self, other: Self) -> Self {
        match (self.as_int(), other.as_int()) {
            (Some(lhs), Some(rhs)) => Self::Int(lhs + rhs),
            _ => Self::Real(self.as_real() + other.as_real()),
        }
    }

    pub fn sub(self, other: Self) -> Self {
        match (self.as_int(), other.as_int()) {
            (Some(lhs), Some(rhs)) => Self::Int(lhs - rhs),
            _ => Self::Real(self.as_real() - other.as_real()),
        }
    }

    pub fn mul(self, other: Self) -> Self {
        match (self.as_int(), other.as_int()) {
            (Some(lhs), Some(rhs)) => Self::Int(lhs * rhs),
            _ => Self::Real(self.as_real() * other.as_real()),
        }
    }

    /// Division with truncation toward zero for integral operands. The
    /// caller is responsible for rejecting a zero divisor first.
    pub fn div(self, other: Self) -> Self {
        match (self.as_int(), other.as_int()) {
            (Some(lhs), Some(rhs)) => Self::Int(lhs / rhs),
            _ => Self::Real(self.as_real() / other.as_real()),
        }
    }

    pub fn neg(self) -> Self {
        match self.as_int() {
            Some(value) => Self::Int(-value),
            None => Self::Real(-self.as_real()),
        }
    }

    pub fn compare(self, other: Self) -> Option<std::cmp::Ordering> {
        match (self.as_int(), other.as_int()) {
            (Some(lhs), Some(rhs)) => Some(lhs.cmp(&rhs)),
            _ => self.as_real().partial_cmp(&other.as_real()),
        }
    }

    /// Convert to a variable's declared type; fails only for a non-finite
    /// real forced into an `int`.
    pub fn coerce(self, ty: VarType) -> Result<Self, String> {
        match ty {
            VarType::Int => match self {
                Self::Int(value) => Ok(Self::Int(value)),
                Self::Bool(value) => Ok(Self::Int(value as i64)),
                Self::Real(value) if value.is_finite() => Ok(Self::Int(value as i64)),
                Self::Real(_) => Err(format!("Invalid conversion to {ty}")),
            },
            VarType::Real => Ok(Self::Real(self.as_real())),
            VarType::Boolean => Ok(Self::Bool(self.truthy())),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Real(value) if value.fract() == 0.0 && value.is_finite() => {
                write!(f, "{value:.1}")
            }
            Self::Real(value) => write!(f, "{value}"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
        }
    }
}
