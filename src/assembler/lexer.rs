//! This lexer tokenizes Helix assembly and expands its macros.
//!
//! Macros never reach the parser: each one either becomes an ordinary
//! token, records something in the unit's tables, or pushes a prepared
//! token sequence onto the injection queue, which is always drained
//! before raw scanning resumes.
use std::collections::VecDeque;
use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::Keyword;
use super::draw;
use super::error::LexError;
use super::macros::{self, Macro};

/// Longest macro body accepted before we give up looking for its `;`.
pub const MAX_MACRO_LENGTH: usize = 256;

static BLOCK_COMMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/").expect("block comment pattern is valid")
});

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Token {
    Int(i64),
    /// Operator character, only produced inside arithmetic expressions.
    Op(char),
    Reg(i64),
    Mem(i64),
    Eof,
    Kwd(Keyword),
    Lbl(String),
    /// End of a subroutine or repeat body.
    Esr,
    Route(String),
}

impl Token {
    pub fn kind(&self) -> &'static str {
        match self {
            Token::Int(_) => "INT",
            Token::Op(_) => "OP",
            Token::Reg(_) => "REG",
            Token::Mem(_) => "MEM",
            Token::Eof => "EOF",
            Token::Kwd(_) => "KWD",
            Token::Lbl(_) => "LBL",
            Token::Esr => "ESR",
            Token::Route(_) => "ROUTE",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Int(v) | Token::Reg(v) | Token::Mem(v) => write!(f, "{}({})", self.kind(), v),
            Token::Op(c) => write!(f, "{}({})", self.kind(), c),
            Token::Kwd(k) => write!(f, "{}({})", self.kind(), k),
            Token::Lbl(s) | Token::Route(s) => write!(f, "{}({})", self.kind(), s),
            Token::Eof | Token::Esr => write!(f, "{}", self.kind()),
        }
    }
}

/// An evaluated `@expr`, kept for diagnostics.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Expression {
    pub text: String,
    pub value: i64,
}

/// Everything a lexer produces for one compilation unit.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Lexed {
    /// Top level tokens, terminated by `Token::Eof`.
    pub tokens: Vec<Token>,
    /// Unparsed subroutine bodies, in the order they were declared.
    pub subroutines: IndexMap<String, Vec<Token>>,
    pub expressions: Vec<Expression>,
    pub definitions: IndexMap<String, Token>,
}

pub struct Lexer {
    src: Vec<char>,
    pos: usize,
    injected: VecDeque<Token>,
    expressions: Vec<Expression>,
    subroutines: IndexMap<String, Vec<Token>>,
    definitions: IndexMap<String, Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        let stripped = BLOCK_COMMENT.replace_all(source.trim(), "");
        Lexer {
            src: stripped.trim().chars().collect(),
            pos: 0,
            injected: VecDeque::new(),
            expressions: Vec::new(),
            subroutines: IndexMap::new(),
            definitions: IndexMap::new(),
        }
    }

    /// Run the lexer to the end of the source, consuming itself.
    pub fn tokenize(mut self) -> Result<Lexed, LexError> {
        let mut tokens = Vec::with_capacity(self.src.len() / 2 + 1);

        loop {
            match self.next_token()? {
                Some(Token::Eof) => {
                    tokens.push(Token::Eof);
                    break;
                }
                Some(tok) => tokens.push(tok),
                None => {}
            }
        }

        debug!(
            "tokenized {} tokens, {} subroutine(s), {} expression(s), {} definition(s)",
            tokens.len(),
            self.subroutines.len(),
            self.expressions.len(),
            self.definitions.len()
        );

        Ok(Lexed {
            tokens,
            subroutines: self.subroutines,
            expressions: self.expressions,
            definitions: self.definitions,
        })
    }

    /// Produces the next token. `None` means a macro was expanded
    /// without emitting anything directly.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        if let Some(tok) = self.injected.pop_front() {
            return Ok(Some(tok));
        }

        self.skip_whitespace();

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Some(Token::Eof)),
        };

        if c.is_ascii_digit() {
            let digits = self.digits();
            return match digits.parse::<i64>() {
                Ok(v) => Ok(Some(Token::Int(v))),
                Err(_) => Err(LexError::NumberOverflow(digits)),
            };
        }

        match c {
            ':' | '#' => {
                self.advance();
                let addr = self.address(c)?;
                Ok(Some(if c == ':' { Token::Reg(addr) } else { Token::Mem(addr) }))
            }
            '@' => {
                self.advance();
                let name = self.macro_name();
                self.skip_whitespace();
                let body = self.macro_body()?;
                let m = Macro::parse(&name, &body)?;
                self.expand(m)
            }
            _ => self.word().map(Some),
        }
    }

    fn expand(&mut self, m: Macro) -> Result<Option<Token>, LexError> {
        trace!("expanding {:?}", m);
        match m {
            Macro::Expr(e) => {
                let value = e.value;
                self.expressions.push(e);
                Ok(Some(Token::Int(value)))
            }
            Macro::Label(name) => Ok(Some(Token::Lbl(name))),
            Macro::Route(name) => Ok(Some(Token::Route(name))),
            Macro::End => Ok(Some(Token::Esr)),
            Macro::Start(name) => {
                let body = self.block(&name)?;
                debug!("captured subroutine `{}` ({} tokens)", name, body.len());
                if self.subroutines.insert(name.clone(), body).is_some() {
                    warn!("Re-defined subroutine `{}`, the later body replaces the earlier one", name);
                }
                Ok(None)
            }
            Macro::Repeat(count) => {
                let body = self.block("repeat")?;
                let capacity = match body.len().checked_mul(count) {
                    Some(capacity) => capacity,
                    None => return Err(LexError::InvalidRepeat(count.to_string())),
                };
                let mut expanded = Vec::with_capacity(capacity);
                for _ in 0..count {
                    expanded.extend(body.iter().cloned());
                }
                self.inject(expanded);
                Ok(None)
            }
            Macro::Puts(text) => {
                self.inject(macros::puts_tokens(&text));
                Ok(None)
            }
            Macro::Line(a, b) => {
                self.inject(draw::line_tokens(a, b));
                Ok(None)
            }
            Macro::Define(name, token) => {
                self.definitions.insert(name, token);
                Ok(None)
            }
        }
    }

    /// Collects tokens up to the next end marker, expanding macros as it goes.
    fn block(&mut self, owner: &str) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            match self.next_token()? {
                Some(Token::Esr) => break,
                Some(Token::Eof) => {
                    warn!("`{}` body runs to the end of the source without `@end;`", owner);
                    break;
                }
                Some(tok) => tokens.push(tok),
                None => {}
            }
        }
        Ok(tokens)
    }

    /// Pushes tokens onto the front of the injection queue, keeping their order.
    fn inject(&mut self, tokens: Vec<Token>) {
        for tok in tokens.into_iter().rev() {
            self.injected.push_front(tok);
        }
    }

    fn address(&mut self, sigil: char) -> Result<i64, LexError> {
        let digits = self.digits();
        if digits.is_empty() {
            return Err(LexError::EmptyAddress(sigil));
        }
        digits
            .parse::<i64>()
            .map_err(|_| LexError::NumberOverflow(digits))
    }

    fn macro_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphabetic() || c == '_' || c == ':' || c == '@') {
                break;
            }
            name.push(c);
            self.advance();
        }
        name
    }

    /// Reads a macro body up to and including its terminating `;`.
    fn macro_body(&mut self) -> Result<String, LexError> {
        let mut body = String::new();
        loop {
            match self.peek() {
                Some(';') => break,
                Some(c) if body.chars().count() < MAX_MACRO_LENGTH => {
                    body.push(c);
                    self.advance();
                }
                _ => {
                    return Err(LexError::UnterminatedMacro {
                        limit: MAX_MACRO_LENGTH,
                        body,
                    })
                }
            }
        }
        self.advance();
        Ok(body.trim().to_owned())
    }

    fn word(&mut self) -> Result<Token, LexError> {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                break;
            }
            word.push(c);
            self.advance();
        }

        if let Ok(kw) = word.parse::<Keyword>() {
            return Ok(Token::Kwd(kw));
        }
        match self.definitions.get(&word) {
            Some(tok) => Ok(tok.clone()),
            None => Err(LexError::UnknownKeyword(word)),
        }
    }

    fn digits(&mut self) -> String {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.advance();
        }
        digits
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }
}
