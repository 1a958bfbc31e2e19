//! Recursive-descent parser for Tiny-Extended.
//!
//! Parsing never aborts on malformed input: panic-mode recovery with
//! synchronizing token sets keeps going and always produces a tree, while
//! collecting one error per offending source location. The only fatal
//! condition is an `ERROR` token from the lexer.

use once_cell::sync::Lazy;
use std::{
    collections::HashSet,
    error::Error,
    fmt::Display,
    fs::{self, File},
    io::Write,
    path::Path,
};

use crate::{
    ast::{self, Atom, AtomKind, OpKind},
    lexer::{Location, Token, TokenCategory},
};

const LEXICAL_ERROR_AT: &str = "Cannot proceed with parsing. There are still invalid tokens at";
const ERROR_BEFORE_MAIN: &str = "Error: Code ends suddenly before closing 'main' block";
const ERROR_AFTER_MAIN: &str = "Error: There's code after closing 'main' block";

/// Fatal parser failure; recoverable errors land in [`Parser::errors`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

pub type PResult<T> = Result<T, ParseError>;

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Error for ParseError {}

/// A recovered-from syntax error. The post-main checks carry no location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub location: Option<Location>,
    pub message: String,
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message.as_str())
    }
}

impl Error for SyntaxError {}

/// Lexeme set used for FIRST/FOLLOW driven synchronization.
#[derive(Debug, Clone, Default)]
struct TokenSet(HashSet<&'static str>);

impl TokenSet {
    fn of(items: &[&'static str]) -> Self {
        Self(items.iter().copied().collect())
    }

    fn with(&self, items: &[&'static str]) -> Self {
        let mut set = self.0.clone();
        set.extend(items);
        Self(set)
    }

    fn union(&self, other: &TokenSet) -> Self {
        Self(self.0.union(&other.0).copied().collect())
    }

    fn contains(&self, lexeme: &str) -> bool {
        self.0.contains(lexeme)
    }
}

static FIRST_DL: Lazy<TokenSet> = Lazy::new(|| TokenSet::of(&["int", "real", "boolean"]));
static FIRST_UNA: Lazy<TokenSet> = Lazy::new(|| TokenSet::of(&["++", "--"]));
static FIRST_REL: Lazy<TokenSet> =
    Lazy::new(|| TokenSet::of(&["<=", "<", ">", ">=", "==", "!="]));
static FIRST_ADD: Lazy<TokenSet> = Lazy::new(|| TokenSet::of(&["+", "-"]));
static FIRST_MUL: Lazy<TokenSet> = Lazy::new(|| TokenSet::of(&["*", "/"]));
static FIRST_AT: Lazy<TokenSet> = Lazy::new(|| TokenSet::of(&[":=", "++", "--"]));
static FIRST_SL: Lazy<TokenSet> = Lazy::new(|| {
    TokenSet::of(&[
        "if", "while", "repeat", "cin", "cout", "coutln", "{", "++", "--",
    ])
});
static FIRST_LOOP_SL: Lazy<TokenSet> = Lazy::new(|| FIRST_SL.with(&["rompe"]));
static FIRST_FACT: Lazy<TokenSet> = Lazy::new(|| TokenSet::of(&["(", "True", "False"]));
static FIRST_EXP: Lazy<TokenSet> =
    Lazy::new(|| TokenSet::of(&["+", "-", "(", "True", "False"]));
static FOLLOW_DL: Lazy<TokenSet> = Lazy::new(|| FIRST_SL.with(&["}"]));
static FOLLOW_FACT: Lazy<TokenSet> = Lazy::new(|| {
    TokenSet::of(&[
        "*", "/", "<=", "<", ">", ">=", "==", "!=", "+", "-", ";", ")",
    ])
});

/// Category filter used both for matching and for deciding where a
/// recovery scan may stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CatFlag {
    None,
    Id,
    Num,
    IdNum,
}

impl CatFlag {
    fn matches(self, category: TokenCategory) -> bool {
        match self {
            Self::None => false,
            Self::Id => category == TokenCategory::Id,
            Self::Num => matches!(category, TokenCategory::Int | TokenCategory::Real),
            Self::IdNum => matches!(
                category,
                TokenCategory::Id | TokenCategory::Int | TokenCategory::Real
            ),
        }
    }
}

/// What a `sync` call was hoping to see. `Label` never matches anything;
/// it only shapes the error message.
enum Expected<'a> {
    Lexeme(&'a str),
    Id,
    Label(&'a str),
}

impl Expected<'_> {
    fn matches(&self, token: &Token) -> bool {
        match self {
            Expected::Lexeme(lexeme) => token.lexeme == *lexeme,
            Expected::Id => token.category == TokenCategory::Id,
            Expected::Label(_) => false,
        }
    }
}

impl Display for Expected<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expected::Lexeme(lexeme) => f.write_str(lexeme),
            Expected::Id => f.write_str("ID"),
            Expected::Label(label) => f.write_str(label),
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    pub errors: Vec<SyntaxError>,
    error_locations: HashSet<Location>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        tokens.push(Token::eof());
        Self {
            tokens,
            pos: 0,
            errors: vec![],
            error_locations: HashSet::new(),
        }
    }

    /// Build the syntax tree for the whole token stream.
    pub fn parse(&mut self) -> PResult<Atom> {
        self.errors.clear();
        self.error_locations.clear();
        self.pos = 0;
        self.check_current()?;
        self.program()
    }

    /// Write `tree.txt` and `errors.txt` into `out_dir`.
    pub fn write_output(&self, root: &Atom, out_dir: &Path) -> Result<(), Box<dyn Error>> {
        fs::create_dir_all(out_dir)?;
        fs::write(out_dir.join("tree.txt"), ast::render(root))?;

        let mut errors_file = File::create(out_dir.join("errors.txt"))?;
        for error in &self.errors {
            writeln!(errors_file, "{error}")?;
        }

        Ok(())
    }

    fn curr(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn at_end(&self) -> bool {
        self.curr().is_eof()
    }

    fn lookahead(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> PResult<()> {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        self.check_current()
    }

    fn check_current(&self) -> PResult<()> {
        if self.curr().category == TokenCategory::Error {
            return Err(ParseError(format!(
                "{LEXICAL_ERROR_AT} {}",
                self.curr().location
            )));
        }
        Ok(())
    }

    /// Accept `expected` and advance, or record one error and discard
    /// tokens until a member of `syncset` (or a token matching `flag`).
    fn sync(&mut self, expected: Expected, syncset: &TokenSet, flag: CatFlag) -> PResult<bool> {
        if expected.matches(self.curr()) {
            self.advance()?;
            return Ok(true);
        }

        self.add_error(&expected);
        self.scan_to(syncset, flag)?;
        Ok(false)
    }

    fn scan_to(&mut self, syncset: &TokenSet, flag: CatFlag) -> PResult<()> {
        while !self.at_end()
            && !syncset.contains(&self.curr().lexeme)
            && !flag.matches(self.curr().category)
        {
            self.advance()?;
        }
        Ok(())
    }

    fn add_error(&mut self, expected: &Expected) {
        let token = self.curr();
        if token.is_eof() || self.error_locations.contains(&token.location) {
            return;
        }

        let location = token.location;
        let message = format!(
            "Error at {}: token -> {}, {}. Expected: {expected}",
            token.location, token.category, token.lexeme
        );

        self.error_locations.insert(location);
        self.errors.push(SyntaxError {
            location: Some(location),
            message,
        });
    }

    fn check_for_starter(&mut self, label: &str, first: &TokenSet, flag: CatFlag) -> PResult<()> {
        if !first.contains(&self.curr().lexeme) && !flag.matches(self.curr().category) {
            self.sync(Expected::Label(label), first, flag)?;
        }
        Ok(())
    }

    fn program(&mut self) -> PResult<Atom> {
        let mut main = Atom::new(AtomKind::Program, "Ø", self.curr().location);
        if self.sync(
            Expected::Lexeme("main"),
            &FIRST_DL.union(&FIRST_SL),
            CatFlag::Id,
        )? {
            main.lexeme = "main".to_owned();
        }
        self.sync(
            Expected::Lexeme("{"),
            &FIRST_DL.union(&FOLLOW_DL),
            CatFlag::Id,
        )?;

        let declarations = self.declaration_list()?;
        main.push(declarations);
        let statements = self.statement_list(&TokenSet::default())?;
        main.push(statements);

        if self.at_end() {
            self.errors.push(SyntaxError {
                location: None,
                message: ERROR_BEFORE_MAIN.to_owned(),
            });
        } else if self.sync(Expected::Lexeme("}"), &TokenSet::default(), CatFlag::None)?
            && !self.at_end()
        {
            self.errors.push(SyntaxError {
                location: None,
                message: ERROR_AFTER_MAIN.to_owned(),
            });
        }

        Ok(main)
    }

    fn declaration_list(&mut self) -> PResult<Atom> {
        let starters = FIRST_DL.union(&FOLLOW_DL);
        self.check_for_starter(
            "Declaration starter, Statement starter",
            &starters,
            CatFlag::Id,
        )?;

        let mut dl = Atom::new(AtomKind::DeclList, "<dl>", self.curr().location);
        while FIRST_DL.contains(&self.curr().lexeme) {
            let mut var_type = Atom::new(
                AtomKind::Type,
                self.curr().lexeme.clone(),
                self.curr().location,
            );
            self.advance()?;
            self.variable_list(&mut var_type)?;
            dl.push(var_type);
            self.sync(Expected::Lexeme(";"), &starters, CatFlag::Id)?;
            self.check_for_starter(
                "Declaration starter, Statement starter",
                &starters,
                CatFlag::Id,
            )?;
        }

        Ok(dl)
    }

    fn variable_list(&mut self, var_type: &mut Atom) -> PResult<()> {
        let syncset = FIRST_DL.union(&FOLLOW_DL).with(&[",", ";"]);

        let first = self.curr().clone();
        if self.sync(Expected::Id, &syncset, CatFlag::Id)? {
            var_type.push(Atom::new(
                AtomKind::Id { inc_dec: false },
                first.lexeme,
                first.location,
            ));
        }

        while self.curr().lexeme == "," || self.independent_id() {
            self.sync(Expected::Lexeme(","), &syncset, CatFlag::Id)?;
            if self.independent_id() {
                let token = self.curr().clone();
                var_type.push(Atom::new(
                    AtomKind::Id { inc_dec: false },
                    token.lexeme,
                    token.location,
                ));
                self.advance()?;
            } else {
                self.sync(Expected::Label("Independent ID"), &syncset, CatFlag::Id)?;
            }
        }

        Ok(())
    }

    /// An identifier that does not start an assignment (`x` in `int x` as
    /// opposed to `x := ...` or `x++`).
    fn independent_id(&self) -> bool {
        self.curr().category == TokenCategory::Id
            && !FIRST_AT.contains(&self.lookahead().lexeme)
    }

    fn independent(&self, first: &TokenSet) -> bool {
        first.contains(&self.curr().lexeme)
            || CatFlag::Num.matches(self.curr().category)
            || self.independent_id()
    }

    fn statement_list(&mut self, additional: &TokenSet) -> PResult<Atom> {
        let starters = FOLLOW_DL.union(additional);
        self.check_for_starter("Statement starter", &starters, CatFlag::Id)?;

        let mut sl = Atom::new(AtomKind::StmtList, "<sl>", self.curr().location);
        // `rompe` only starts a statement inside a loop body.
        let first = if additional.contains("rompe") {
            &*FIRST_LOOP_SL
        } else {
            &*FIRST_SL
        };

        while first.contains(&self.curr().lexeme) || self.curr().category == TokenCategory::Id {
            let statement = match self.curr().lexeme.as_str() {
                "if" => self.selection(additional)?,
                "while" => self.iteration(additional)?,
                "repeat" => self.repetition(additional)?,
                "cin" => self.cin_stmt(additional)?,
                "cout" | "coutln" => self.cout_stmt(additional)?,
                "{" => self.block(additional)?,
                "rompe" => self.break_stmt(additional)?,
                "++" | "--" => self.pre(additional)?,
                _ => self.assignment(additional)?,
            };
            sl.push(statement);
            self.check_for_starter("Statement starter", &starters, CatFlag::Id)?;
        }

        Ok(sl)
    }

    fn selection(&mut self, additional: &TokenSet) -> PResult<Atom> {
        let mut if_atom = Atom::new(AtomKind::If, "if", self.curr().location);
        self.advance()?;

        self.sync(
            Expected::Lexeme("("),
            &FIRST_EXP
                .union(&FOLLOW_DL)
                .union(additional)
                .with(&["else"]),
            CatFlag::IdNum,
        )?;
        let then_sync = additional.with(&["else"]);
        let condition = self.expression(&then_sync, true)?;
        if_atom.push(condition);
        self.sync(
            Expected::Lexeme(")"),
            &FOLLOW_DL.union(additional).with(&["then", "else"]),
            CatFlag::Id,
        )?;
        self.sync(
            Expected::Lexeme("then"),
            &FOLLOW_DL.union(additional).with(&["else"]),
            CatFlag::Id,
        )?;
        if_atom.push(self.block(&then_sync)?);

        if self.curr().lexeme == "else" {
            self.advance()?;
            if_atom.push(self.block(additional)?);
        }

        Ok(if_atom)
    }

    fn iteration(&mut self, additional: &TokenSet) -> PResult<Atom> {
        let mut while_atom = Atom::new(AtomKind::While, "while", self.curr().location);
        self.advance()?;

        self.sync(
            Expected::Lexeme("("),
            &FIRST_EXP
                .union(&FOLLOW_DL)
                .union(additional)
                .with(&["rompe"]),
            CatFlag::IdNum,
        )?;
        let body_sync = additional.with(&["rompe"]);
        while_atom.push(self.expression(&body_sync, true)?);
        self.sync(
            Expected::Lexeme(")"),
            &FOLLOW_DL.union(additional).with(&["rompe"]),
            CatFlag::Id,
        )?;
        while_atom.push(self.block(&body_sync)?);

        Ok(while_atom)
    }

    fn repetition(&mut self, additional: &TokenSet) -> PResult<Atom> {
        let mut repeat_atom = Atom::new(AtomKind::Repeat, "repeat", self.curr().location);
        self.advance()?;

        let body_sync = additional.with(&["until", "rompe"]);
        repeat_atom.push(self.block(&body_sync)?);

        let loop_sync = additional.with(&["rompe"]);
        self.sync(
            Expected::Lexeme("until"),
            &FOLLOW_DL.union(&loop_sync).with(&["("]),
            CatFlag::Id,
        )?;
        self.sync(
            Expected::Lexeme("("),
            &FIRST_EXP.union(&FOLLOW_DL).union(&loop_sync),
            CatFlag::IdNum,
        )?;
        repeat_atom.push(self.expression(&loop_sync, true)?);
        self.sync(
            Expected::Lexeme(")"),
            &FOLLOW_DL.union(&loop_sync).with(&[";"]),
            CatFlag::Id,
        )?;
        self.sync(
            Expected::Lexeme(";"),
            &FOLLOW_DL.union(&loop_sync),
            CatFlag::Id,
        )?;

        Ok(repeat_atom)
    }

    fn cin_stmt(&mut self, additional: &TokenSet) -> PResult<Atom> {
        let cin_location = self.curr().location;
        self.advance()?;

        let id_token = self.curr().clone();
        let matched = self.sync(
            Expected::Id,
            &FOLLOW_DL.union(additional).with(&[";"]),
            CatFlag::Id,
        )?;
        let (target, id_location) = if matched {
            (id_token.lexeme, Some(id_token.location))
        } else {
            ("Ø".to_owned(), None)
        };

        let cin_atom = Atom::new(
            AtomKind::Cin {
                target: target.clone(),
                id_location,
            },
            format!("cin: {target}"),
            cin_location,
        );
        self.sync(
            Expected::Lexeme(";"),
            &FOLLOW_DL.union(additional),
            CatFlag::Id,
        )?;

        Ok(cin_atom)
    }

    fn cout_stmt(&mut self, additional: &TokenSet) -> PResult<Atom> {
        let kind = if self.curr().lexeme == "coutln" {
            AtomKind::Coutln
        } else {
            AtomKind::Cout
        };
        let mut cout_atom = Atom::new(kind, self.curr().lexeme.clone(), self.curr().location);
        self.advance()?;

        cout_atom.push(self.expression(additional, false)?);
        self.sync(
            Expected::Lexeme(";"),
            &FOLLOW_DL.union(additional),
            CatFlag::Id,
        )?;

        Ok(cout_atom)
    }

    fn block(&mut self, additional: &TokenSet) -> PResult<Atom> {
        self.sync(
            Expected::Lexeme("{"),
            &FOLLOW_DL.union(additional),
            CatFlag::Id,
        )?;
        let sl = self.statement_list(additional)?;
        self.sync(
            Expected::Lexeme("}"),
            &FOLLOW_DL.union(additional),
            CatFlag::Id,
        )?;
        Ok(sl)
    }

    fn break_stmt(&mut self, additional: &TokenSet) -> PResult<Atom> {
        let break_atom = Atom::new(AtomKind::Break, "rompe", self.curr().location);
        self.advance()?;
        self.sync(
            Expected::Lexeme(";"),
            &FOLLOW_DL.union(additional),
            CatFlag::Id,
        )?;
        Ok(break_atom)
    }

    fn assignment(&mut self, additional: &TokenSet) -> PResult<Atom> {
        let target = self.curr().lexeme.clone();
        let mut var = Atom::new(
            AtomKind::Assign {
                target: target.clone(),
            },
            format!("Assign to: {target}"),
            self.curr().location,
        );
        self.advance()?;

        if self.curr().lexeme == ":=" {
            self.advance()?;
            let value = self.expression(additional, false)?;
            var.push(value);
        } else if FIRST_UNA.contains(&self.curr().lexeme) {
            let op_lexeme = self.curr().lexeme.clone();
            let op_location = self.curr().location;
            self.advance()?;
            var.push(inc_dec_tree(&target, &op_lexeme, op_location));
        } else {
            self.sync(
                Expected::Label(":=, ++, --"),
                &FIRST_EXP.union(&FOLLOW_DL).union(additional).with(&[";"]),
                CatFlag::IdNum,
            )?;
            if self.independent(&FIRST_EXP) {
                let value = self.expression(additional, false)?;
                var.push(value);
            }
        }

        self.sync(
            Expected::Lexeme(";"),
            &FOLLOW_DL.union(additional),
            CatFlag::Id,
        )?;
        Ok(var)
    }

    fn pre(&mut self, additional: &TokenSet) -> PResult<Atom> {
        let op_lexeme = self.curr().lexeme.clone();
        let op_location = self.curr().location;
        self.advance()?;

        let id_token = self.curr().clone();
        let matched = self.sync(
            Expected::Id,
            &FOLLOW_DL.union(additional).with(&[";"]),
            CatFlag::Id,
        )?;
        let target = if matched {
            id_token.lexeme
        } else {
            "Ø".to_owned()
        };

        let mut var = Atom::new(
            AtomKind::Assign {
                target: target.clone(),
            },
            format!("Assign to: {target}"),
            id_token.location,
        );
        var.push(inc_dec_tree(&target, &op_lexeme, op_location));
        self.sync(
            Expected::Lexeme(";"),
            &FOLLOW_DL.union(additional),
            CatFlag::Id,
        )?;

        Ok(var)
    }

    fn current_op(&self) -> (Atom, String) {
        let lexeme = self.curr().lexeme.clone();
        let kind = OpKind::from_lexeme(&lexeme).unwrap_or(OpKind::Missing);
        (
            Atom::new(AtomKind::Op(kind), lexeme.clone(), self.curr().location),
            lexeme,
        )
    }

    /// Glue `old` and the next subexpression together under `op`.
    fn extend_exp(
        &mut self,
        mut op: Atom,
        expected: Expected,
        old: Atom,
        next: fn(&mut Self, &TokenSet, bool) -> PResult<Atom>,
        additional: &TokenSet,
        condition: bool,
    ) -> PResult<Atom> {
        self.sync(
            expected,
            &FIRST_EXP.union(&FOLLOW_DL).union(additional),
            CatFlag::IdNum,
        )?;
        op.push(old);
        let rhs = next(self, additional, condition)?;
        op.push(rhs);
        Ok(op)
    }

    fn expression(&mut self, additional: &TokenSet, condition: bool) -> PResult<Atom> {
        let mut temp = self.simple_expression(additional, condition)?;
        if FIRST_REL.contains(&self.curr().lexeme) {
            let (op, lexeme) = self.current_op();
            temp = self.extend_exp(
                op,
                Expected::Lexeme(&lexeme),
                temp,
                Self::simple_expression,
                additional,
                condition,
            )?;
        }
        Ok(temp)
    }

    fn simple_expression(&mut self, additional: &TokenSet, condition: bool) -> PResult<Atom> {
        let mut temp = self.term(additional, condition)?;
        while FIRST_ADD.contains(&self.curr().lexeme) {
            let (op, lexeme) = self.current_op();
            temp = self.extend_exp(
                op,
                Expected::Lexeme(&lexeme),
                temp,
                Self::term,
                additional,
                condition,
            )?;
        }
        Ok(temp)
    }

    fn term(&mut self, additional: &TokenSet, condition: bool) -> PResult<Atom> {
        let mut temp = self.superfactor(additional, condition)?;
        loop {
            if FIRST_MUL.contains(&self.curr().lexeme) {
                let (op, lexeme) = self.current_op();
                temp = self.extend_exp(
                    op,
                    Expected::Lexeme(&lexeme),
                    temp,
                    Self::superfactor,
                    additional,
                    condition,
                )?;
            } else if condition && self.independent(&FIRST_FACT) {
                // Two factors with nothing between them: glue them with a
                // stand-in operator so the condition keeps both operands.
                let op = Atom::new(
                    AtomKind::Op(OpKind::Missing),
                    "Arithmetic or relational OP",
                    self.curr().location,
                );
                temp = self.extend_exp(
                    op,
                    Expected::Label("Arithmetic or relational OP"),
                    temp,
                    Self::superfactor,
                    additional,
                    condition,
                )?;
                temp.lexeme = "Ø".to_owned();
            } else {
                break;
            }
        }
        Ok(temp)
    }

    fn superfactor(&mut self, additional: &TokenSet, condition: bool) -> PResult<Atom> {
        if FIRST_ADD.contains(&self.curr().lexeme) {
            let (mut sign, _) = self.current_op();
            self.advance()?;
            let operand = self.factor(additional, condition)?;
            sign.push(operand);
            return Ok(sign);
        }
        self.factor(additional, condition)
    }

    fn factor(&mut self, additional: &TokenSet, condition: bool) -> PResult<Atom> {
        if self.curr().lexeme == "(" {
            self.advance()?;
            let temp = self.expression(additional, condition)?;
            self.sync(
                Expected::Lexeme(")"),
                &FOLLOW_FACT.union(&FOLLOW_DL).union(additional),
                CatFlag::Id,
            )?;
            return Ok(temp);
        }

        let token = self.curr().clone();
        let kind = match token.category {
            TokenCategory::Id => Some(AtomKind::Id { inc_dec: false }),
            TokenCategory::Int => Some(AtomKind::Int),
            TokenCategory::Real => Some(AtomKind::Real),
            TokenCategory::Boolean => Some(AtomKind::Bool),
            _ => None,
        };
        if let Some(kind) = kind {
            self.advance()?;
            return Ok(Atom::new(kind, token.lexeme, token.location));
        }

        let temp = Atom::new(AtomKind::Placeholder, "Ø", token.location);
        self.sync(
            Expected::Label("(, True, False, ID, INT, REAL"),
            &FOLLOW_FACT.union(&FOLLOW_DL).union(additional),
            CatFlag::Id,
        )?;
        Ok(temp)
    }
}

/// `x++;`, `x--;`, `++x;` and `--x;` all produce the same assignment tree:
/// the target gets `target ± 1`, with the read marked as synthetic.
fn inc_dec_tree(target: &str, op_lexeme: &str, location: Location) -> Atom {
    let kind = if op_lexeme.starts_with('-') {
        OpKind::Sub
    } else {
        OpKind::Add
    };
    let mut op = Atom::new(AtomKind::Op(kind), kind.to_string(), location);
    op.push(Atom::new(AtomKind::Id { inc_dec: true }, target, location));
    op.push(Atom::new(AtomKind::Int, "1", location));
    op
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> (Atom, Vec<SyntaxError>) {
        let mut parser = Parser::new(Lexer::scan_text(source));
        let root = parser.parse().expect("expected parse to succeed");
        (root, parser.errors.clone())
    }

    fn first_statement(root: &Atom) -> &Atom {
        &root.children[1].children[0]
    }

    #[test]
    fn test_binary_ops_left_associative() {
        let (root, errors) = parse("main { int x; x := 1 - 2 - 3; }");
        assert!(errors.is_empty());

        let assign = first_statement(&root);
        let outer = &assign.children[0];
        assert_eq!(outer.kind, AtomKind::Op(OpKind::Sub));
        let inner = &outer.children[0];
        assert_eq!(inner.kind, AtomKind::Op(OpKind::Sub));
        assert_eq!(inner.children[0].lexeme, "1");
        assert_eq!(inner.children[1].lexeme, "2");
        assert_eq!(outer.children[1].lexeme, "3");
    }

    #[test]
    fn test_term_binds_tighter_than_sum() {
        let (root, errors) = parse("main { int x; x := 2 + 3 * 4; }");
        assert!(errors.is_empty());

        let sum = &first_statement(&root).children[0];
        assert_eq!(sum.kind, AtomKind::Op(OpKind::Add));
        assert_eq!(sum.children[0].lexeme, "2");
        let product = &sum.children[1];
        assert_eq!(product.kind, AtomKind::Op(OpKind::Mul));
        assert_eq!(product.children[0].lexeme, "3");
        assert_eq!(product.children[1].lexeme, "4");
    }

    #[test]
    fn test_unary_sign_single_child() {
        let (root, errors) = parse("main { int x; x := -5; }");
        assert!(errors.is_empty());

        let sign = &first_statement(&root).children[0];
        assert_eq!(sign.kind, AtomKind::Op(OpKind::Sub));
        assert_eq!(sign.children.len(), 1);
        assert_eq!(sign.children[0].lexeme, "5");
    }

    #[test]
    fn test_parenthesized_factor_has_no_wrapper() {
        let (root, errors) = parse("main { int x; x := (5); }");
        assert!(errors.is_empty());

        let value = &first_statement(&root).children[0];
        assert_eq!(value.kind, AtomKind::Int);
        assert_eq!(value.lexeme, "5");
    }

    #[test]
    fn test_inc_dec_desugaring() {
        for source in [
            "main { int x; x++; }",
            "main { int x; ++x; }",
        ] {
            let (root, errors) = parse(source);
            assert!(errors.is_empty(), "unexpected errors for {source}: {errors:?}");

            let assign = first_statement(&root);
            assert_eq!(
                assign.kind,
                AtomKind::Assign {
                    target: "x".to_owned()
                }
            );
            let op = &assign.children[0];
            assert_eq!(op.kind, AtomKind::Op(OpKind::Add));
            assert_eq!(op.children[0].kind, AtomKind::Id { inc_dec: true });
            assert_eq!(op.children[0].lexeme, "x");
            assert_eq!(op.children[1].lexeme, "1");
        }
    }

    #[test]
    fn test_missing_semicolon_recovers_with_one_error() {
        let (root, errors) = parse("main { int x x := 1; }");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].location, Some(Location::new(1, 14)));

        // Both the declaration and the assignment survive.
        assert_eq!(root.children[0].children[0].children[0].lexeme, "x");
        assert_eq!(
            first_statement(&root).kind,
            AtomKind::Assign {
                target: "x".to_owned()
            }
        );
    }

    #[test]
    fn test_missing_mul_op_in_condition() {
        let (root, errors) = parse("main { if (1 2) then { } }");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.ends_with("Expected: Arithmetic or relational OP"));

        let condition = &first_statement(&root).children[0];
        assert_eq!(condition.kind, AtomKind::Op(OpKind::Missing));
        assert_eq!(condition.lexeme, "Ø");
        assert_eq!(condition.children[0].lexeme, "1");
        assert_eq!(condition.children[1].lexeme, "2");
    }

    #[test]
    fn test_code_ends_before_closing_main() {
        let (_, errors) = parse("main { int x;");

        assert_eq!(errors.last().map(|e| e.message.as_str()), Some(ERROR_BEFORE_MAIN));
    }

    #[test]
    fn test_code_after_closing_main() {
        let (_, errors) = parse("main { } extra");

        assert_eq!(errors.last().map(|e| e.message.as_str()), Some(ERROR_AFTER_MAIN));
    }

    #[test]
    fn test_lexical_error_is_fatal() {
        let mut parser = Parser::new(Lexer::scan_text("main { $ }"));

        let result = parser.parse();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .starts_with(LEXICAL_ERROR_AT));
    }

    #[test]
    fn test_rompe_outside_loop_is_not_a_statement() {
        let (root, errors) = parse("main { rompe; }");

        // Recovery skips the stray keyword instead of building a break node.
        assert!(root.children[1].children.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_rompe_inside_loops() {
        let (root, errors) = parse("main { while (1) { rompe; } repeat { rompe; } until (1); }");
        assert!(errors.is_empty());

        let while_atom = &root.children[1].children[0];
        assert_eq!(while_atom.children[1].children[0].kind, AtomKind::Break);
        let repeat_atom = &root.children[1].children[1];
        assert_eq!(repeat_atom.children[0].children[0].kind, AtomKind::Break);
    }

    #[test]
    fn test_error_count_bounded_and_parse_terminates() {
        let (_, errors) = parse("main { ) ) ( ; then until + }");

        let token_count = Lexer::scan_text("main { ) ) ( ; then until + }").len();
        assert!(errors.len() <= token_count);
    }
}
