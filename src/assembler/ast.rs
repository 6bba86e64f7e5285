//! Instruction records for the Helix Instruction Set.
//!
//! Every instruction is two bytes wide. The high byte carries an
//! address or immediate payload, the low byte packs the control fields:
//!
//! ```text
//!  15            8   7   5   4   2    1     0
//! +---------------+-------+-------+-----+------+
//! |   immValue    |  alu  |  reg  | wr  | mode |
//! +---------------+-------+-------+-----+------+
//! ```
//!
//! Supported Instructions:
//!
//! ```nasm
//! LD :R 31        /* R <= 31 (alu control is forced to OVERRIDE) */
//! LD :R :S        /* register to register */
//! LD #A :R        /* memory A <= R */
//! AD :R           /* ALU ops: AD SB AN OR NO XO */
//! JP 0            /* special ops: PP PO JZ JP RT RI SL SR CL */
//! JZ @label loop;
//! CL @route draw;
//! RT
//! ```
use std::fmt;
use std::str::FromStr;

/// Reserved ALU control code marking an immediate load.
pub const ALU_OVERRIDE: u8 = 0b111;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Keyword {
    LD,
    PP,
    PO,
    JZ,
    JP,
    RT,
    RI,
    CL,
    AD,
    SB,
    AN,
    OR,
    NO,
    XO,
    SL,
    SR,
}

impl Keyword {
    /// ALU control code, for arithmetic and logic keywords only.
    pub fn alu_code(&self) -> Option<u8> {
        use Keyword::*;
        match self {
            AD => Some(0b001),
            SB => Some(0b010),
            AN => Some(0b011),
            OR => Some(0b100),
            NO => Some(0b101),
            XO => Some(0b110),
            _ => None,
        }
    }

    /// The fixed low byte of a special instruction.
    /// The CPU decodes these bytes directly, so the control fields are
    /// recovered from them rather than chosen.
    pub fn special_low(&self) -> Option<u8> {
        use Keyword::*;
        match self {
            PP => Some(0),
            PO => Some(0),
            JZ => Some(0b0111_0011),
            JP => Some(0b1111_1111),
            RT => Some(0),
            RI => Some(0b1110_1111),
            SL => Some(0b0001_1000),
            SR => Some(0b0001_0100),
            CL => Some(0b1111_0111),
            _ => None,
        }
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Keyword::*;
        match s {
            "LD" => Ok(LD),
            "PP" => Ok(PP),
            "PO" => Ok(PO),
            "JZ" => Ok(JZ),
            "JP" => Ok(JP),
            "RT" => Ok(RT),
            "RI" => Ok(RI),
            "CL" => Ok(CL),
            "AD" => Ok(AD),
            "SB" => Ok(SB),
            "AN" => Ok(AN),
            "OR" => Ok(OR),
            "NO" => Ok(NO),
            "XO" => Ok(XO),
            "SL" => Ok(SL),
            "SR" => Ok(SR),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Instruction {
    /// Human readable trace of what produced this instruction.
    pub line: String,
    pub imm_value: u8,
    pub alu_ctrl: u8,
    pub reg_addr: u8,
    pub write_flag: bool,
    /// Selects whether `imm_value` is an immediate or a register reference.
    pub mode_flag: bool,
    /// Label whose position becomes `imm_value` once resolved.
    pub label: Option<String>,
    /// Subroutine whose address becomes `imm_value` once linked.
    pub route: Option<String>,
    /// Set on the jump that guards the subroutine table.
    pub guard: bool,
}

impl Instruction {
    pub fn new(line: impl Into<String>) -> Self {
        Instruction {
            line: line.into(),
            ..Default::default()
        }
    }

    /// Load a raw (hi, lo) pair, decoding the control fields out of `lo`.
    pub fn set_raw(&mut self, hi: u8, lo: u8) {
        self.imm_value = hi;
        self.alu_ctrl = (lo >> 5) & 0b111;
        self.reg_addr = (lo >> 2) & 0b111;
        self.write_flag = (lo >> 1) & 0b1 == 1;
        self.mode_flag = lo & 0b1 == 1;
    }

    /// Encodes the instruction as its (high, low) byte pair.
    pub fn encode(&self) -> (u8, u8) {
        let lo = ((self.alu_ctrl & 0b111) << 5)
            | ((self.reg_addr & 0b111) << 2)
            | ((self.write_flag as u8) << 1)
            | (self.mode_flag as u8);
        (self.imm_value, lo)
    }

    /// Assembles the instruction into a single machine word.
    pub fn assemble(&self) -> u16 {
        let (hi, lo) = self.encode();
        ((hi as u16) << 8) | lo as u16
    }

    /// The wire shape consumed by artifact writers: `[hi, lo]` as
    /// `0b`-prefixed, zero padded binary strings.
    pub fn build(&self) -> [String; 2] {
        let (hi, lo) = self.encode();
        [format!("0b{:08b}", hi), format!("0b{:08b}", lo)]
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [hi, lo] = self.build();
        writeln!(f, "Line:\t\t{}", self.line)?;
        if self.mode_flag {
            write!(f, "Instruction:\tAddr(0b{:08b})", self.imm_value)?;
        } else {
            write!(f, "Instruction:\tImm(0b{:08b})", self.imm_value)?;
        }
        writeln!(
            f,
            ", AluCtrl(0b{:03b}), RegAddr(0b{:03b}), Flags(mode = 0b{}, wr = 0b{})",
            self.alu_ctrl, self.reg_addr, self.mode_flag as u8, self.write_flag as u8
        )?;
        write!(f, "Raw:\t\t[{}, {}]", hi, lo)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Label {
    pub name: String,
    /// Index of the instruction that follows the label.
    pub position: usize,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Subroutine {
    pub name: String,
    /// Provisional start address; the body sits one past it because the
    /// guard jump precedes the table.
    pub base_address: usize,
    pub instructions: Vec<Instruction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYWORDS: [&str; 16] = [
        "LD", "PP", "PO", "JZ", "JP", "RT", "RI", "CL", "AD", "SB", "AN", "OR", "NO", "XO", "SL",
        "SR",
    ];

    #[test]
    fn test_keyword_from_str() {
        for kw in KEYWORDS.iter() {
            let parsed: Keyword = kw.parse().unwrap();
            assert_eq!(&parsed.to_string(), kw);
        }
        assert!("ld".parse::<Keyword>().is_err());
        assert!("NOP".parse::<Keyword>().is_err());
        assert!(" LD".parse::<Keyword>().is_err());
    }

    #[test]
    fn test_opcode_tables_are_disjoint() {
        for kw in KEYWORDS.iter() {
            let kw: Keyword = kw.parse().unwrap();
            assert!(!(kw.alu_code().is_some() && kw.special_low().is_some()), "{}", kw);
        }
        assert_eq!(Keyword::LD.alu_code(), None);
        assert_eq!(Keyword::LD.special_low(), None);
        assert_eq!(Keyword::XO.alu_code(), Some(6));
        assert_eq!(Keyword::JP.special_low(), Some(0xFF));
    }

    #[test]
    fn test_special_low_byte_round_trip() {
        for kw in KEYWORDS.iter() {
            let kw: Keyword = kw.parse().unwrap();
            if let Some(lo) = kw.special_low() {
                for hi in [0u8, 1, 0x5A, 0xFF].iter() {
                    let mut ins = Instruction::new(kw.to_string());
                    ins.set_raw(*hi, lo);
                    assert_eq!(ins.encode(), (*hi, lo));
                }
            }
        }
    }

    #[test]
    fn test_build() {
        let mut ins = Instruction::new("LD: REG(1) <- INT(31)");
        ins.imm_value = 31;
        ins.alu_ctrl = ALU_OVERRIDE;
        ins.reg_addr = 1;
        ins.write_flag = true;
        assert_eq!(ins.build(), ["0b00011111".to_owned(), "0b11100110".to_owned()]);
        assert_eq!(ins.assemble(), 0x1FE6);
    }

    #[test]
    fn test_display() {
        let mut ins = Instruction::new("JP: INT(3) - S");
        ins.set_raw(3, 0xFF);
        assert_eq!(
            ins.to_string(),
            "Line:\t\tJP: INT(3) - S\n\
             Instruction:\tAddr(0b00000011), AluCtrl(0b111), RegAddr(0b111), Flags(mode = 0b1, wr = 0b1)\n\
             Raw:\t\t[0b00000011, 0b11111111]"
        );
    }
}
