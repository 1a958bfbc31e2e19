use std::fmt::Display;

/// 1-based line/column position of a token in the (tab-expanded) source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCategory {
    Id,
    Keyword,
    Int,
    Real,
    Boolean,
    Op,
    Special,
    Error,
    /// Sentinel used by the parser once the token stream is exhausted.
    /// The lexer never emits it.
    Eof,
}

impl Display for TokenCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TokenCategory::Id => "ID",
            TokenCategory::Keyword => "KEYWORD",
            TokenCategory::Int => "INT",
            TokenCategory::Real => "REAL",
            TokenCategory::Boolean => "BOOLEAN",
            TokenCategory::Op => "OP",
            TokenCategory::Special => "SPECIAL",
            TokenCategory::Error => "ERROR",
            TokenCategory::Eof => "EOF",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub lexeme: String,
    pub category: TokenCategory,
    pub location: Location,
}

impl Token {
    pub fn new(lexeme: impl Into<String>, category: TokenCategory, location: Location) -> Self {
        Self {
            lexeme: lexeme.into(),
            category,
            location,
        }
    }

    pub fn eof() -> Self {
        Self {
            lexeme: String::new(),
            category: TokenCategory::Eof,
            location: Location::default(),
        }
    }

    pub fn is_eof(&self) -> bool {
        self.category == TokenCategory::Eof
    }
}
