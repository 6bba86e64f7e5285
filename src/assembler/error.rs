//! Error types for every stage of the assembler.
//!
//! Each stage owns one enum. They are all fatal to the compilation
//! unit; the driver wraps them in [`Error`] and the binary reports it.
use thiserror::Error;

/// Errors raised while scanning source text or expanding macros.
#[derive(Error, Clone, PartialEq, Debug)]
pub enum LexError {
    #[error("unknown keyword `{0}`")]
    UnknownKeyword(String),

    #[error("expected digits after address sigil `{0}`")]
    EmptyAddress(char),

    #[error("number `{0}` is too large")]
    NumberOverflow(String),

    #[error("macro body exceeds {limit} characters, did you forget a ';'?\n{body}")]
    UnterminatedMacro { limit: usize, body: String },

    #[error("unknown macro `@{0}`")]
    UnknownMacro(String),

    #[error("invalid repeat count `{0}`")]
    InvalidRepeat(String),

    #[error("invalid string in macro: {0}")]
    InvalidString(String),

    #[error("invalid line macro: {0}")]
    InvalidLine(String),

    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("definitions may only contain a single reg, mem addr, or imm value: {0}")]
    DefinitionArity(String),

    #[error("in expression `{text}`: {source}")]
    Expression {
        text: String,
        #[source]
        source: ExprError,
    },
}

/// Errors raised by the arithmetic evaluator.
#[derive(Error, Clone, PartialEq, Debug)]
pub enum ExprError {
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("expected `)`, found `{0}`")]
    UnbalancedParen(String),

    #[error("trailing input starting at `{0}`")]
    TrailingInput(String),

    #[error("literal `{0}` is too large")]
    LiteralOverflow(String),

    #[error("expression does not evaluate to a finite number")]
    NonFinite,
}

/// Errors raised while turning tokens into instructions.
#[derive(Error, Clone, PartialEq, Debug)]
pub enum ParseError {
    #[error("unsupported operand `{0}` for `{1}`")]
    UnsupportedOperand(String, String),

    #[error("unsupported load value `{0}`")]
    UnsupportedValue(String),

    #[error("unknown subroutine `{0}`")]
    UnknownSubroutine(String),

    #[error("unknown label `{0}`")]
    UnknownLabel(String),

    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),

    #[error("register :{0} is out of range, registers are :0 to :7")]
    RegisterOutOfRange(i64),

    #[error("address {0} does not fit in 8 bits")]
    AddressOutOfRange(i64),
}

/// Errors raised while laying out the subroutine table.
#[derive(Error, Clone, PartialEq, Debug)]
pub enum LinkError {
    #[error("call to unknown subroutine `{0}`")]
    UnknownSubroutine(String),

    #[error("address {0} does not fit in 8 bits")]
    AddressOutOfRange(usize),

    #[error("subroutines have already been mapped for this unit")]
    AlreadyLinked,
}

/// Any error that stops assembly of a compilation unit.
#[derive(Error, Clone, PartialEq, Debug)]
pub enum Error {
    #[error("lexer: {0}")]
    Lex(#[from] LexError),

    #[error("parser: {0}")]
    Parse(#[from] ParseError),

    #[error("linker: {0}")]
    Link(#[from] LinkError),
}
