//! The Parser module takes a token stream from the Lexer and encodes it
//! into a list of instructions.
//!
//! Parsing happens in three explicit passes which the caller runs in
//! order: [`Parser::parse`], [`Parser::resolve_labels`] and
//! [`Parser::map_subroutines`]. Only after the last one do the
//! instructions hold their final addresses.
use std::convert::TryFrom;

use indexmap::{IndexMap, IndexSet};

use super::ast::*;
use super::error::{LinkError, ParseError};
use super::lexer::Token;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    instructions: Vec<Instruction>,
    labels: Vec<Label>,
    /// Parsed subroutine bodies handed in by the caller, in declaration order.
    subroutines: IndexMap<String, Vec<Instruction>>,
    /// Names callable from this unit whose bodies are linked elsewhere.
    known_routes: IndexSet<String>,
    layout: Vec<Subroutine>,
    /// Address of the subroutine table guard, once linked.
    guard: Option<usize>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, subroutines: IndexMap<String, Vec<Instruction>>) -> Self {
        let capacity = tokens.len() / 2;
        Parser {
            tokens,
            pos: 0,
            instructions: Vec::with_capacity(capacity),
            labels: Vec::new(),
            subroutines,
            known_routes: IndexSet::new(),
            layout: Vec::new(),
            guard: None,
        }
    }

    /// Allows `@route` references to subroutines this parser will not link
    /// itself, such as sibling subroutines called from a subroutine body.
    pub fn with_known_routes<I: IntoIterator<Item = String>>(mut self, names: I) -> Self {
        self.known_routes.extend(names);
        self
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// The subroutine table, filled in by [`Parser::map_subroutines`].
    pub fn layout(&self) -> &[Subroutine] {
        &self.layout
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    /// Encodes every statement up to the end of the token stream.
    pub fn parse(&mut self) -> Result<(), ParseError> {
        while let Some(tok) = self.tokens.get(self.pos).cloned() {
            match tok {
                Token::Kwd(Keyword::RT) => {
                    self.instructions.push(ret());
                    self.pos += 1;
                }
                Token::Kwd(kw) => {
                    let ins = self.statement(kw)?;
                    trace!("0x{:02X}: {}", self.instructions.len(), ins.line);
                    self.instructions.push(ins);
                }
                Token::Lbl(name) => {
                    self.declare_label(name);
                    self.pos += 1;
                }
                Token::Eof => break,
                other => return Err(ParseError::UnexpectedToken(other.to_string())),
            }
        }

        debug!(
            "parsed {} instruction(s) and {} label(s)",
            self.instructions.len(),
            self.labels.len()
        );
        Ok(())
    }

    /// Writes each referenced label's position into its instruction.
    pub fn resolve_labels(&mut self) -> Result<(), ParseError> {
        let end = self.guard.unwrap_or(self.instructions.len());
        let labels = &self.labels;

        for ins in self.instructions[..end].iter_mut() {
            if let Some(name) = &ins.label {
                let label = match labels.iter().find(|l| &l.name == name) {
                    Some(label) => label,
                    None => return Err(ParseError::UnknownLabel(name.clone())),
                };
                ins.imm_value = byte(label.position as i64)?;
            }
        }
        Ok(())
    }

    /// Lays the subroutine table out after the program, behind a guard
    /// jump, and patches every call site with its target address.
    pub fn map_subroutines(&mut self) -> Result<(), LinkError> {
        if self.guard.is_some() {
            return Err(LinkError::AlreadyLinked);
        }

        let base = self.instructions.len();
        let mut offset = base;
        let mut layout = Vec::with_capacity(self.subroutines.len());
        for (name, instructions) in std::mem::take(&mut self.subroutines) {
            let sub = Subroutine {
                name,
                base_address: offset,
                instructions,
            };
            offset += sub.instructions.len();
            layout.push(sub);
        }

        let mut guard = Instruction::new("=== START SR_TABLE ===");
        guard.guard = true;
        guard.set_raw(address(offset + 1)?, special_low(Keyword::JP));
        self.instructions.push(guard);

        for sub in &layout {
            // The guard shifts every body one slot past its base address.
            let start = sub.base_address + 1;
            debug!(
                "subroutine `{}` at 0x{:02X} ({} instruction(s))",
                sub.name,
                start,
                sub.instructions.len()
            );
            for ins in &sub.instructions {
                let mut ins = ins.clone();
                if ins.label.is_some() {
                    ins.imm_value = address(ins.imm_value as usize + start)?;
                }
                self.instructions.push(ins);
            }
        }

        for ins in self.instructions.iter_mut() {
            if let Some(name) = &ins.route {
                let sub = match layout.iter().find(|s| &s.name == name) {
                    Some(sub) => sub,
                    None => return Err(LinkError::UnknownSubroutine(name.clone())),
                };
                ins.imm_value = address(sub.base_address + 1)?;
            }
        }

        self.guard = Some(base);
        self.layout = layout;
        Ok(())
    }

    /// Encodes one keyword statement and advances past its operands.
    fn statement(&mut self, kw: Keyword) -> Result<Instruction, ParseError> {
        let operand = self.lookahead(1);
        let value = self.lookahead(2);
        let mut ins = Instruction::default();

        match &operand {
            Token::Reg(r) => ins.reg_addr = register(*r)?,
            Token::Mem(m) => ins.imm_value = byte(*m)?,
            Token::Lbl(name) => ins.label = Some(name.clone()),
            Token::Route(name) => {
                if !self.knows_route(name) {
                    return Err(ParseError::UnknownSubroutine(name.clone()));
                }
                ins.route = Some(name.clone());
            }
            Token::Int(_) => {}
            other => {
                return Err(ParseError::UnsupportedOperand(other.to_string(), kw.to_string()))
            }
        }

        match (kw.alu_code(), kw.special_low()) {
            (Some(code), _) => {
                ins.line = format!("{}: {}", kw, operand);
                ins.alu_ctrl = code;
                ins.write_flag = true;
                self.pos += 2;
            }
            (None, Some(lo)) => {
                ins.line = format!("{}: {} - S", kw, operand);
                // Labels and routes are patched in later passes.
                let hi = match &operand {
                    Token::Reg(v) | Token::Mem(v) | Token::Int(v) => byte(*v)?,
                    _ => 0,
                };
                ins.set_raw(hi, lo);
                self.pos += 2;
            }
            // LD is the only keyword outside both opcode tables.
            (None, None) => {
                ins.line = format!("{}: {} <- {}", kw, operand, value);
                load(&mut ins, &value)?;
                ins.write_flag = true;
                self.pos += 3;
            }
        }

        Ok(ins)
    }

    fn declare_label(&mut self, name: String) {
        if self.labels.iter().any(|l| l.name == name) {
            warn!("Re-defined label `{}`, the first definition is kept", name);
            return;
        }
        self.labels.push(Label {
            name,
            position: self.instructions.len(),
        });
    }

    fn knows_route(&self, name: &str) -> bool {
        self.subroutines.contains_key(name) || self.known_routes.contains(name)
    }

    /// Peeks `n` tokens past the current one. Missing tokens read as EOF.
    #[inline]
    fn lookahead(&self, n: usize) -> Token {
        self.tokens.get(self.pos + n).cloned().unwrap_or(Token::Eof)
    }
}

fn load(ins: &mut Instruction, value: &Token) -> Result<(), ParseError> {
    match value {
        Token::Int(v) => {
            ins.mode_flag = false;
            // The CPU only latches immediates with the ALU overridden.
            ins.alu_ctrl = ALU_OVERRIDE;
            ins.imm_value = v.rem_euclid(256) as u8;
        }
        Token::Reg(r) => {
            ins.mode_flag = true;
            ins.reg_addr = register(*r)?;
        }
        Token::Mem(m) => {
            ins.mode_flag = false;
            ins.imm_value = byte(*m)?;
        }
        other => return Err(ParseError::UnsupportedValue(other.to_string())),
    }
    Ok(())
}

fn ret() -> Instruction {
    let mut ins = Instruction::new("RT: PC <- CALLSTACK.pop()");
    ins.set_raw(0, special_low(Keyword::RT));
    ins
}

fn special_low(kw: Keyword) -> u8 {
    kw.special_low().unwrap_or_default()
}

fn register(v: i64) -> Result<u8, ParseError> {
    match v {
        0..=7 => Ok(v as u8),
        _ => Err(ParseError::RegisterOutOfRange(v)),
    }
}

fn byte(v: i64) -> Result<u8, ParseError> {
    u8::try_from(v).map_err(|_| ParseError::AddressOutOfRange(v))
}

fn address(v: usize) -> Result<u8, LinkError> {
    u8::try_from(v).map_err(|_| LinkError::AddressOutOfRange(v))
}
