//! Compile-time macros (`@name body;`) recognised by the lexer.
//!
//! A macro is parsed into a [`Macro`] as soon as its body has been read.
//! Expanding it is the lexer's job, since most kinds either emit a token
//! or push tokens onto the injection queue.
use super::draw::{self, Point};
use super::error::LexError;
use super::expr;
use super::lexer::{Expression, Lexer, Token};

/// Letters accepted by `@puts`, in character code order.
const CHAR_MAP: &str = "abcdefghijklmnopqrstuvwxyz";

/// Character codes are lowercase in the display's font.
const CHAR_LOWERCASE: u8 = 0b0010_0000;

/// Memory mapped character output buffer.
const CHAR_BUFFER: i64 = 16;

/// Instruction addresses are 8 bits, so no linkable block repeats more often.
pub const MAX_REPEAT: usize = 256;

/// Largest coordinate on either screen axis.
const SCREEN_MAX: i64 = 255;

#[derive(Clone, PartialEq, Debug)]
pub enum Macro {
    /// `@expr 2 * (1 + 3);`
    Expr(Expression),
    /// `@label loop;`
    Label(String),
    /// `@start name;` opens a subroutine body.
    Start(String),
    /// `@end;` closes a subroutine or repeat body.
    End,
    /// `@route name;`
    Route(String),
    /// `@repeat 4;` opens a block replayed that many times.
    Repeat(usize),
    /// `@puts "text";`
    Puts(String),
    /// `@line x1,y1:x2,y2;`
    Line(Point, Point),
    /// `@define NAME = :3;`
    Define(String, Token),
}

impl Macro {
    pub fn parse(name: &str, body: &str) -> Result<Macro, LexError> {
        match name {
            "expr" => Ok(Macro::Expr(Expression {
                text: body.to_owned(),
                value: eval(body)?,
            })),
            "label" => Ok(Macro::Label(body.to_owned())),
            "start" => Ok(Macro::Start(body.to_owned())),
            "end" => Ok(Macro::End),
            "route" => Ok(Macro::Route(body.to_owned())),
            "repeat" => match body.parse::<usize>() {
                Ok(count) if count <= MAX_REPEAT => Ok(Macro::Repeat(count)),
                _ => Err(LexError::InvalidRepeat(body.to_owned())),
            },
            "puts" => Ok(Macro::Puts(string_literal(body)?)),
            "line" => {
                let (a, b) = line_points(body)?;
                Ok(Macro::Line(a, b))
            }
            "define" => {
                let (name, token) = definition(body)?;
                Ok(Macro::Define(name, token))
            }
            _ => Err(LexError::UnknownMacro(name.to_owned())),
        }
    }
}

fn eval(text: &str) -> Result<i64, LexError> {
    expr::evaluate(text).map_err(|source| LexError::Expression {
        text: text.to_owned(),
        source,
    })
}

/// Extracts the text between the first pair of double quotes.
fn string_literal(body: &str) -> Result<String, LexError> {
    let rest = match body.strip_prefix('"') {
        Some(rest) => rest,
        None => return Err(LexError::InvalidString(body.to_owned())),
    };
    match rest.find('"') {
        Some(end) => Ok(rest[..end].to_owned()),
        None => Err(LexError::InvalidString(body.to_owned())),
    }
}

fn line_points(body: &str) -> Result<(Point, Point), LexError> {
    let ends: Vec<&str> = body.split(':').collect();
    if ends.len() != 2 {
        return Err(LexError::InvalidLine(body.to_owned()));
    }

    let mut points = Vec::with_capacity(2);
    for end in ends {
        let coords: Vec<&str> = end.split(',').collect();
        if coords.len() != 2 {
            return Err(LexError::InvalidLine(body.to_owned()));
        }
        let (x, y) = (eval(coords[0])?, eval(coords[1])?);
        if !(0..=SCREEN_MAX).contains(&x) || !(0..=SCREEN_MAX).contains(&y) {
            return Err(LexError::InvalidLine(body.to_owned()));
        }
        points.push(Point::new(x, y));
    }

    Ok((points[0], points[1]))
}

/// Tokenizes the right hand side of `NAME = value` with a fresh lexer.
fn definition(body: &str) -> Result<(String, Token), LexError> {
    let parts: Vec<&str> = body.split('=').collect();
    if parts.len() != 2 || parts[0].trim().is_empty() {
        return Err(LexError::InvalidDefinition(body.to_owned()));
    }

    let mut tokens = Lexer::new(parts[1].trim()).tokenize()?.tokens;
    tokens.pop();

    if tokens.len() != 1 {
        return Err(LexError::DefinitionArity(body.to_owned()));
    }
    Ok((parts[0].trim().to_owned(), tokens.remove(0)))
}

/// Tokens that write `text` into the character buffer one letter at a
/// time. Characters outside the font are skipped.
pub fn puts_tokens(text: &str) -> Vec<Token> {
    text.chars()
        .filter_map(|c| {
            let lower = c.to_ascii_lowercase();
            CHAR_MAP.chars().position(|m| m == lower)
        })
        .flat_map(|idx| draw::store_through_r0(CHAR_BUFFER, (idx as u8 | CHAR_LOWERCASE) as i64))
        .collect()
}
