//! Lexer for the Tiny-Extended programming language.
//!
//! Scans a source file line by line into a sequence of [`Token`]s. Invalid
//! characters are emitted as `ERROR` tokens instead of aborting, so the
//! parser can decide how to react to them.

mod token;

pub use token::*;

use once_cell::sync::Lazy;
use std::{
    collections::HashSet,
    error::Error,
    fmt::Display,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use log::debug;

static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "main", "int", "real", "boolean", "if", "then", "else", "while", "repeat", "until", "cin",
        "cout", "coutln", "rompe",
    ])
});

const TAB_LENGTH: usize = 4;
const TOKENS_SEPARATOR: &str = ".....";
const INVALID_FILE_MSG: &str = "The input file does not exist or is empty.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError(pub String);

pub type LexResult<T> = Result<T, LexError>;

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Error for LexError {}

pub struct Lexer {
    input_file: PathBuf,
}

impl Lexer {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
        }
    }

    /// Scan the input file into the full token sequence, `ERROR` tokens
    /// included. Fails only for a missing or empty input file.
    pub fn scan(&self) -> LexResult<Vec<Token>> {
        let source = fs::read_to_string(&self.input_file).unwrap_or_default();
        if source.is_empty() {
            return Err(LexError(INVALID_FILE_MSG.to_owned()));
        }

        debug!("scanning '{}'", self.input_file.to_string_lossy());
        Ok(Self::scan_text(&source))
    }

    /// Scan source text directly (the file-independent core of [`scan`]).
    ///
    /// [`scan`]: Lexer::scan
    pub fn scan_text(source: &str) -> Vec<Token> {
        let mut tokens = vec![];
        let mut in_block_comment = false;

        for (index, line) in source.lines().enumerate() {
            let line = if line.contains('\t') {
                expand_tabs(line)
            } else {
                line.to_owned()
            };
            scan_line(&line, index + 1, &mut in_block_comment, &mut tokens);
        }

        tokens
    }

    /// Write `tokens.txt` and `errors.txt` into `out_dir`.
    pub fn write_output(&self, out_dir: &Path) -> Result<(), Box<dyn Error>> {
        let tokens = self.scan()?;

        fs::create_dir_all(out_dir)?;
        let mut tokens_file = File::create(out_dir.join("tokens.txt"))?;
        let mut errors_file = File::create(out_dir.join("errors.txt"))?;

        for token in &tokens {
            if token.category == TokenCategory::Error {
                writeln!(
                    errors_file,
                    "'{}' unexpected at {}",
                    token.lexeme, token.location
                )?;
            } else {
                writeln!(
                    tokens_file,
                    "{lexeme}{sep}{category}{sep}{location}",
                    lexeme = token.lexeme,
                    sep = TOKENS_SEPARATOR,
                    category = token.category,
                    location = token.location
                )?;
            }
        }

        Ok(())
    }
}

/// Replace each tab with spaces up to the next multiple of [`TAB_LENGTH`]
/// columns. Token columns refer to the expanded line.
fn expand_tabs(line: &str) -> String {
    let mut expanded = String::with_capacity(line.len());
    let mut column = 0;

    for c in line.chars() {
        if c == '\t' {
            let spaces = TAB_LENGTH - column % TAB_LENGTH;
            for _ in 0..spaces {
                expanded.push(' ');
            }
            column += spaces;
        } else {
            expanded.push(c);
            column += 1;
        }
    }

    expanded
}

fn scan_line(line: &str, line_num: usize, in_block_comment: &mut bool, tokens: &mut Vec<Token>) {
    let chars = line.chars().collect::<Vec<_>>();
    let mut pos = 0;

    if *in_block_comment {
        let Some(end) = find_block_end(&chars, 0) else {
            return;
        };
        *in_block_comment = false;
        pos = end + 2;
    }

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if c == '/' && chars.get(pos + 1) == Some(&'/') {
            return;
        }

        if c == '/' && chars.get(pos + 1) == Some(&'*') {
            match find_block_end(&chars, pos + 2) {
                Some(end) => {
                    pos = end + 2;
                    continue;
                }
                None => {
                    *in_block_comment = true;
                    return;
                }
            }
        }

        let location = Location::new(line_num, pos + 1);

        if c.is_ascii_digit() {
            let (lexeme, category) = scan_number(&chars, &mut pos);
            tokens.push(Token::new(lexeme, category, location));
            continue;
        }

        // Boolean literals take priority over identifiers.
        if starts_with(&chars, pos, "True") {
            tokens.push(Token::new("True", TokenCategory::Boolean, location));
            pos += 4;
            continue;
        }
        if starts_with(&chars, pos, "False") {
            tokens.push(Token::new("False", TokenCategory::Boolean, location));
            pos += 5;
            continue;
        }

        if c.is_ascii_alphabetic() {
            let mut end = pos + 1;
            while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                end += 1;
            }
            let lexeme = chars[pos..end].iter().collect::<String>();
            let category = if KEYWORDS.contains(lexeme.as_str()) {
                TokenCategory::Keyword
            } else {
                TokenCategory::Id
            };
            tokens.push(Token::new(lexeme, category, location));
            pos = end;
            continue;
        }

        if "{};,()".contains(c) {
            tokens.push(Token::new(c, TokenCategory::Special, location));
            pos += 1;
            continue;
        }

        if let Some(next) = chars.get(pos + 1) {
            let two = [c, *next].iter().collect::<String>();
            if matches!(two.as_str(), "++" | "--" | "<=" | ">=" | "==" | "!=" | ":=") {
                tokens.push(Token::new(two, TokenCategory::Op, location));
                pos += 2;
                continue;
            }
        }

        if "+-<>*/".contains(c) {
            tokens.push(Token::new(c, TokenCategory::Op, location));
            pos += 1;
            continue;
        }

        tokens.push(Token::new(c, TokenCategory::Error, location));
        pos += 1;
    }
}

fn scan_number(chars: &[char], pos: &mut usize) -> (String, TokenCategory) {
    let start = *pos;
    let mut end = start;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }

    // A dot only belongs to the number when digits follow it.
    if end < chars.len()
        && chars[end] == '.'
        && chars.get(end + 1).is_some_and(|c| c.is_ascii_digit())
    {
        end += 1;
        while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
        }
        *pos = end;
        return (chars[start..end].iter().collect(), TokenCategory::Real);
    }

    *pos = end;
    (chars[start..end].iter().collect(), TokenCategory::Int)
}

fn starts_with(chars: &[char], pos: usize, literal: &str) -> bool {
    literal
        .chars()
        .enumerate()
        .all(|(offset, c)| chars.get(pos + offset) == Some(&c))
}

fn find_block_end(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len().saturating_sub(1)).find(|&i| chars[i] == '*' && chars[i + 1] == '/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(source: &str) -> Vec<TokenCategory> {
        Lexer::scan_text(source)
            .iter()
            .map(|token| token.category)
            .collect()
    }

    #[test]
    fn test_scan_keywords_and_ids() {
        let tokens = Lexer::scan_text("main foo int bar_2");

        assert_eq!(
            tokens,
            vec![
                Token::new("main", TokenCategory::Keyword, Location::new(1, 1)),
                Token::new("foo", TokenCategory::Id, Location::new(1, 6)),
                Token::new("int", TokenCategory::Keyword, Location::new(1, 10)),
                Token::new("bar_2", TokenCategory::Id, Location::new(1, 14)),
            ]
        );
    }

    #[test]
    fn test_scan_numbers() {
        let tokens = Lexer::scan_text("42 3.14 7.");

        assert_eq!(
            tokens,
            vec![
                Token::new("42", TokenCategory::Int, Location::new(1, 1)),
                Token::new("3.14", TokenCategory::Real, Location::new(1, 4)),
                Token::new("7", TokenCategory::Int, Location::new(1, 9)),
                Token::new(".", TokenCategory::Error, Location::new(1, 10)),
            ]
        );
    }

    #[test]
    fn test_scan_booleans_before_ids() {
        let tokens = Lexer::scan_text("True False Truthy");

        assert_eq!(
            tokens[0],
            Token::new("True", TokenCategory::Boolean, Location::new(1, 1))
        );
        assert_eq!(
            tokens[1],
            Token::new("False", TokenCategory::Boolean, Location::new(1, 6))
        );
        // "Truthy" splits at the literal boundary, boolean first.
        assert_eq!(
            tokens[2],
            Token::new("True", TokenCategory::Boolean, Location::new(1, 12))
        );
        assert_eq!(
            tokens[3],
            Token::new("thy", TokenCategory::Id, Location::new(1, 16))
        );
    }

    #[test]
    fn test_scan_operators() {
        let tokens = Lexer::scan_text("x := x ++ - <= < >= == != * /");
        let lexemes = tokens.iter().map(|t| t.lexeme.as_str()).collect::<Vec<_>>();

        assert_eq!(
            lexemes,
            vec!["x", ":=", "x", "++", "-", "<=", "<", ">=", "==", "!=", "*", "/"]
        );
        assert!(tokens[1..]
            .iter()
            .all(|t| t.category == TokenCategory::Op || t.category == TokenCategory::Id));
    }

    #[test]
    fn test_scan_error_tokens() {
        assert_eq!(
            categories("x = 1 $"),
            vec![
                TokenCategory::Id,
                TokenCategory::Error,
                TokenCategory::Int,
                TokenCategory::Error,
            ]
        );
    }

    #[test]
    fn test_tab_expansion_columns() {
        let tokens = Lexer::scan_text("\tx\ty");

        assert_eq!(tokens[0].location, Location::new(1, 5));
        assert_eq!(tokens[1].location, Location::new(1, 9));
    }

    #[test]
    fn test_inline_comments() {
        let tokens = Lexer::scan_text("x // the rest is gone\ny");

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].location, Location::new(2, 1));
    }

    #[test]
    fn test_block_comments() {
        let tokens = Lexer::scan_text("a /* skip */ b /* over\nseveral\nlines */ c");

        let lexemes = tokens.iter().map(|t| t.lexeme.as_str()).collect::<Vec<_>>();
        assert_eq!(lexemes, vec!["a", "b", "c"]);
        assert_eq!(tokens[2].location, Location::new(3, 10));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = Lexer::new("does/not/exist.tny").scan();

        assert_eq!(result, Err(LexError(INVALID_FILE_MSG.to_owned())));
    }
}
