//! The Assembler module is in charge of taking a
//! Helix assembly file and producing a Vec<Instruction>.
//!
//! It does this with a macro expanding lexer, a two token
//! lookahead parser and a small linker that lays subroutines
//! out after the program.

pub mod ast;
pub mod codegen;
pub mod draw;
pub mod error;
pub mod expr;
pub mod lexer;
pub mod macros;
pub mod parser;

use indexmap::IndexMap;

pub use self::error::Error;
use self::ast::{Instruction, Label, Subroutine};
use self::lexer::{Expression, Lexer};
use self::parser::Parser;

/// A fully linked compilation unit.
#[derive(Clone, PartialEq, Debug)]
pub struct Assembly {
    pub instructions: Vec<Instruction>,
    pub labels: Vec<Label>,
    pub subroutines: Vec<Subroutine>,
    pub expressions: Vec<Expression>,
}

/// Runs the whole pipeline over one source file.
///
/// Every subroutine body is parsed on its own, with its own labels,
/// before the main program is parsed and linked against them.
pub fn assemble(source: &str) -> Result<Assembly, Error> {
    let lexed = Lexer::new(source).tokenize()?;
    let names: Vec<String> = lexed.subroutines.keys().cloned().collect();

    let mut bodies = IndexMap::with_capacity(names.len());
    for (name, tokens) in lexed.subroutines {
        debug!("parsing subroutine `{}`", name);
        let mut parser = Parser::new(tokens, IndexMap::new()).with_known_routes(names.iter().cloned());
        parser.parse()?;
        parser.resolve_labels()?;
        bodies.insert(name, parser.into_instructions());
    }

    let mut parser = Parser::new(lexed.tokens, bodies);
    parser.parse()?;
    parser.resolve_labels()?;
    parser.map_subroutines()?;

    info!(
        "assembled {} instruction(s), {} label(s), {} subroutine(s)",
        parser.instructions().len(),
        parser.labels().len(),
        parser.layout().len()
    );

    let labels = parser.labels().to_vec();
    let subroutines = parser.layout().to_vec();
    Ok(Assembly {
        instructions: parser.into_instructions(),
        labels,
        subroutines,
        expressions: lexed.expressions,
    })
}

#[cfg(test)]
mod tests {
    use super::error::{LexError, LinkError, ParseError};
    use super::*;

    fn bytes(asm: &Assembly) -> Vec<(u8, u8)> {
        asm.instructions.iter().map(|i| i.encode()).collect()
    }

    #[test]
    fn test_program_without_subroutines() {
        let asm = assemble("LD :1 31 JP 0").unwrap();
        // The guard is always appended and jumps past itself.
        assert_eq!(bytes(&asm), vec![(31, 0b1110_0110), (0, 0xFF), (3, 0xFF)]);
        assert!(asm.instructions[2].guard);
        assert!(asm.subroutines.is_empty());
    }

    #[test]
    fn test_full_pipeline() {
        let src = "
        /* blink the pixel at the cursor forever */
        @define CTRL = #108;
        @define ON = 3;

        @start blink;
            LD :1 ON
            LD CTRL :1
            LD :1 0
            LD CTRL :1
            RT
        @end;

        @label main;
        LD :2 @expr 64 / 2;
        CL @route blink;
        JP @label main;
        ";
        let asm = assemble(src).unwrap();
        assert_eq!(asm.labels, vec![Label { name: "main".to_owned(), position: 0 }]);
        assert_eq!(asm.expressions.len(), 1);
        assert_eq!(asm.expressions[0].value, 32);
        assert_eq!(asm.subroutines.len(), 1);
        assert_eq!(asm.subroutines[0].base_address, 3);

        assert_eq!(
            bytes(&asm),
            vec![
                (32, 0b1110_1010),
                (4, 0xF7),
                (0, 0xFF),
                (9, 0xFF),
                (3, 0b1110_0110),
                (108, 0b0000_0111),
                (0, 0b1110_0110),
                (108, 0b0000_0111),
                (0, 0),
            ]
        );
    }

    #[test]
    fn test_subroutines_call_each_other() {
        let src = "
        @start a; CL @route b; RT @end;
        @start b; @label spin; JZ @label spin; RT @end;
        CL @route a;
        ";
        let asm = assemble(src).unwrap();
        let ins = &asm.instructions;
        assert_eq!(ins[0].imm_value, 2);
        assert_eq!(ins[2].imm_value, 4);
        // `b`'s local label points at its own first instruction.
        assert_eq!(ins[4].imm_value, 4);
        assert_eq!(ins[1].imm_value, 6);
    }

    #[test]
    fn test_errors_surface_by_stage() {
        assert!(matches!(assemble("LD :1 oops"), Err(Error::Lex(LexError::UnknownKeyword(_)))));
        assert!(matches!(
            assemble("JP @label gone;"),
            Err(Error::Parse(ParseError::UnknownLabel(_)))
        ));
        assert!(matches!(
            assemble("@start s; JP @label outer; @end; @label outer; CL @route s;"),
            Err(Error::Parse(ParseError::UnknownLabel(_)))
        ));
        assert!(matches!(
            assemble("@repeat 200; AD :1 AD :2 @end;"),
            Err(Error::Link(LinkError::AddressOutOfRange(_)))
        ));
    }

    #[test]
    fn test_puts_and_line_assemble() {
        let asm = assemble("@puts \"ok\"; @line 1,1:2,2;").unwrap();
        // 2 chars * 2 + 2 pixels * 8 + guard
        assert_eq!(asm.instructions.len(), 4 + 16 + 1);
        assert_eq!(asm.instructions[0].encode(), ((14 | 0x20), 0b1110_0010));
        assert_eq!(asm.instructions[1].encode(), (16, 0b0000_0011));
    }
}
