//! Output artifacts built from a linked instruction list.
//!
//! Writers treat the instruction list as final; addresses are never
//! re-derived here.
use serde::Serialize;
use term_grid::{Cell, Direction, Filling, Grid, GridOptions};

use super::ast::Instruction;

/// Memory map of the target board, written at the top of the JSON artifact.
#[derive(Serialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Header {
    pub io_map: Vec<u8>,
    pub screen_x: u8,
    pub screen_y: u8,
    pub screen_ctrl: u8,
    pub stack_ptr: u8,
    pub stack_depth: u8,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            io_map: Vec::new(),
            screen_x: 0b110_1110,
            screen_y: 0b110_0000,
            screen_ctrl: 0b110_1100,
            stack_ptr: 0,
            stack_depth: 16,
        }
    }
}

#[derive(Serialize, Clone, PartialEq, Eq, Debug)]
pub struct Artifact {
    pub header: Header,
    pub instructions: Vec<[String; 2]>,
    pub lines: Vec<String>,
}

impl Artifact {
    pub fn new(header: Header, instructions: &[Instruction]) -> Self {
        Artifact {
            header,
            instructions: instructions.iter().map(|i| i.build()).collect(),
            lines: instructions.iter().map(|i| i.to_string()).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Raw machine words, big-endian, two bytes per instruction.
pub fn binary(instructions: &[Instruction]) -> Vec<u8> {
    instructions
        .iter()
        .flat_map(|i| i.assemble().to_be_bytes().to_vec())
        .collect()
}

/// A four column listing: address, trace line, arrow, machine word.
pub fn listing(instructions: &[Instruction]) -> String {
    let mut grid = Grid::new(GridOptions {
        filling: Filling::Spaces(1),
        direction: Direction::LeftToRight,
    });

    for (idx, ins) in instructions.iter().enumerate() {
        grid.add(Cell::from(format!("0x{:02X}:", idx)));
        grid.add(Cell::from(ins.line.clone()));
        grid.add(Cell::from("=>".to_string()));
        grid.add(Cell::from(format!("0x{:04X}", ins.assemble())));
    }

    grid.fit_into_columns(4).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Vec<Instruction> {
        let mut load = Instruction::new("LD: REG(1) <- INT(31)");
        load.set_raw(31, 0b1110_0110);
        let mut jump = Instruction::new("JP: INT(0) - S");
        jump.set_raw(0, 0xFF);
        vec![load, jump]
    }

    #[test]
    fn test_binary() {
        assert_eq!(binary(&program()), vec![0x1F, 0xE6, 0x00, 0xFF]);
        assert!(binary(&[]).is_empty());
    }

    #[test]
    fn test_artifact_json() {
        let artifact = Artifact::new(Header::default(), &program());
        let json: serde_json::Value = serde_json::from_str(&artifact.to_json().unwrap()).unwrap();

        assert_eq!(json["header"]["SCREEN_X"], 110);
        assert_eq!(json["header"]["SCREEN_Y"], 96);
        assert_eq!(json["header"]["SCREEN_CTRL"], 108);
        assert_eq!(json["header"]["STACK_DEPTH"], 16);
        assert_eq!(json["header"]["IO_MAP"], serde_json::json!([]));
        assert_eq!(
            json["instructions"],
            serde_json::json!([["0b00011111", "0b11100110"], ["0b00000000", "0b11111111"]])
        );
        assert!(json["lines"][1].as_str().unwrap().starts_with("Line:\t\tJP: INT(0) - S"));
    }

    #[test]
    fn test_listing() {
        let out = listing(&program());
        let rows: Vec<&str> = out.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("0x00:"));
        assert!(rows[0].contains("LD: REG(1) <- INT(31)"));
        assert!(rows[0].trim_end().ends_with("0x1FE6"));
        assert!(rows[1].trim_end().ends_with("0x00FF"));
    }
}
