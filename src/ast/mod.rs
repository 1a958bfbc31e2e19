//! Syntax tree for Tiny-Extended.
//!
//! Every node is an [`Atom`]: a shared header (display lexeme + source
//! location) with a [`AtomKind`] tag for the construct it represents. The
//! semantic stage annotates atoms with their type and folded value in place.

use std::fmt::Display;

use crate::lexer::Location;
use crate::semantic::{Value, VarType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    /// Stand-in operator inserted when a multiplicative operator is missing
    /// between two factors of a condition.
    Missing,
}

impl OpKind {
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        Some(match lexeme {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            _ => return None,
        })
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne
        )
    }
}

impl Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Missing => "Ø",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtomKind {
    /// The `main` program node.
    Program,
    /// The declaration list (`<dl>`).
    DeclList,
    /// A statement list (`<sl>`); also the shape of every block.
    StmtList,
    /// A type keyword inside the declaration list; its children are the
    /// declared identifiers.
    Type,
    /// An identifier reference. `inc_dec` marks the synthetic operand of a
    /// desugared increment/decrement, which must not count as a read.
    Id { inc_dec: bool },
    Int,
    Real,
    Bool,
    Op(OpKind),
    If,
    While,
    Repeat,
    Break,
    /// `cin` statement; `id_location` is the location of the target
    /// identifier when one was actually present.
    Cin {
        target: String,
        id_location: Option<Location>,
    },
    Cout,
    Coutln,
    /// Assignment statement (including desugared `++`/`--`).
    Assign { target: String },
    /// Placeholder (`Ø`) produced while recovering from a malformed factor.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub kind: AtomKind,
    pub lexeme: String,
    pub location: Location,
    pub children: Vec<Atom>,
    pub ty: Option<VarType>,
    pub val: Option<Value>,
}

impl Atom {
    pub fn new(kind: AtomKind, lexeme: impl Into<String>, location: Location) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            location,
            children: vec![],
            ty: None,
            val: None,
        }
    }

    pub fn push(&mut self, child: Atom) {
        self.children.push(child);
    }

    /// Category label shown in tree renders and error messages.
    pub fn category_label(&self) -> &'static str {
        match &self.kind {
            AtomKind::Program
            | AtomKind::Type
            | AtomKind::If
            | AtomKind::While
            | AtomKind::Repeat
            | AtomKind::Break
            | AtomKind::Cin { .. }
            | AtomKind::Cout
            | AtomKind::Coutln => "KEYWORD",
            AtomKind::DeclList | AtomKind::StmtList => "LIST",
            AtomKind::Id { .. } | AtomKind::Assign { .. } => "ID",
            AtomKind::Int => "INT",
            AtomKind::Real => "REAL",
            AtomKind::Bool => "BOOLEAN",
            AtomKind::Op(_) => "OP",
            AtomKind::Placeholder => "SPECIAL",
        }
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.lexeme,
            self.category_label(),
            self.location
        )?;
        if let Some(ty) = self.ty {
            write!(f, " @type={ty}")?;
        }
        if let Some(val) = self.val {
            write!(f, " @val={val}")?;
        }
        Ok(())
    }
}

/// Render the tree as indented text, one node per line.
pub fn render(root: &Atom) -> String {
    let mut out = String::new();
    out.push_str(&format!("{root}\n"));
    render_children(root, "", &mut out);
    out
}

fn render_children(atom: &Atom, prefix: &str, out: &mut String) {
    let count = atom.children.len();
    for (index, child) in atom.children.iter().enumerate() {
        let last = index + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        out.push_str(&format!("{prefix}{branch}{child}\n"));

        let continuation = if last { "    " } else { "│   " };
        render_children(child, &format!("{prefix}{continuation}"), out);
    }
}
