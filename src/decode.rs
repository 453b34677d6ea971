use std::fmt;

/// Addressing mode of a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The parameter is an address.
    Position,
    /// The parameter is the value itself.
    Immediate,
    /// The parameter is an address offset by the relative base.
    Relative,
}

impl Mode {
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Mode::Position),
            1 => Some(Mode::Immediate),
            2 => Some(Mode::Relative),
            _ => None,
        }
    }
}

/// The defined instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Multiply,
    Input,
    Output,
    JumpIfTrue,
    JumpIfFalse,
    LessThan,
    Equals,
    AdjustBase,
    Halt,
}

impl Opcode {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Opcode::Add),
            2 => Some(Opcode::Multiply),
            3 => Some(Opcode::Input),
            4 => Some(Opcode::Output),
            5 => Some(Opcode::JumpIfTrue),
            6 => Some(Opcode::JumpIfFalse),
            7 => Some(Opcode::LessThan),
            8 => Some(Opcode::Equals),
            9 => Some(Opcode::AdjustBase),
            99 => Some(Opcode::Halt),
            _ => None,
        }
    }

    /// Number of parameter words following the instruction word.
    pub fn param_count(self) -> usize {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => 3,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => 2,
            Opcode::Input | Opcode::Output | Opcode::AdjustBase => 1,
            Opcode::Halt => 0,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Multiply => "MUL",
            Opcode::Input => "IN",
            Opcode::Output => "OUT",
            Opcode::JumpIfTrue => "JNZ",
            Opcode::JumpIfFalse => "JZ",
            Opcode::LessThan => "LT",
            Opcode::Equals => "EQ",
            Opcode::AdjustBase => "ARB",
            Opcode::Halt => "HALT",
        }
    }
}

/// One instruction word split into its decimal fields.
///
/// The low two digits are the opcode; the next three, from least to most
/// significant, are the mode digits of parameters 1, 2 and 3. Decoding is
/// purely syntactic: it succeeds for every word and performs no validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub modes: [u8; 3],
}

pub fn decode(word: i64) -> Instruction {
    // Euclidean remainders keep every field a non-negative digit, even for
    // negative words.
    let digit = |div: i64| word.div_euclid(div).rem_euclid(10) as u8;
    Instruction {
        opcode: word.rem_euclid(100) as u8,
        modes: [digit(100), digit(1000), digit(10000)],
    }
}

impl Instruction {
    /// Reassemble the fields into an instruction word.
    pub fn encode(&self) -> i64 {
        self.opcode as i64
            + self.modes[0] as i64 * 100
            + self.modes[1] as i64 * 1000
            + self.modes[2] as i64 * 10000
    }

    /// Mode of parameter `index` (0-based), if its digit names one.
    pub fn mode(&self, index: usize) -> Option<Mode> {
        Mode::from_digit(self.modes[index])
    }
}

/// A single line of disassembly: a decoded instruction with its raw
/// parameter words.
pub struct Disassembled<'a> {
    pub opcode: Opcode,
    pub modes: [u8; 3],
    pub params: &'a [i64],
}

impl fmt::Display for Disassembled<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode.mnemonic())?;
        for (i, &param) in self.params.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            match Mode::from_digit(self.modes[i]) {
                Some(Mode::Position) => write!(f, "{sep}[{param}]")?,
                Some(Mode::Immediate) => write!(f, "{sep}{param}")?,
                Some(Mode::Relative) => write!(f, "{sep}[rb{param:+}]")?,
                None => write!(f, "{sep}?{param}")?,
            }
        }
        Ok(())
    }
}

/// Pretty-print a linear disassembly of `words` for human inspection.
///
/// Each recognised instruction consumes its parameters; anything else is
/// printed as a single `DATA` word. Instructions whose parameters run past
/// the end are printed as data too.
pub fn disassemble(words: &[i64]) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    let mut pc = 0;
    while pc < words.len() {
        let word = words[pc];
        let instr = decode(word);
        match Opcode::from_code(instr.opcode) {
            Some(opcode) if pc + opcode.param_count() < words.len() => {
                let params = &words[pc + 1..=pc + opcode.param_count()];
                let line = Disassembled {
                    opcode,
                    modes: instr.modes,
                    params,
                };
                let _ = writeln!(out, "{pc:5}: {line}");
                pc += 1 + opcode.param_count();
            }
            _ => {
                let _ = writeln!(out, "{pc:5}: DATA {word}");
                pc += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_opcode() {
        let instr = decode(2);
        assert_eq!(instr.opcode, 2);
        assert_eq!(instr.modes, [0, 0, 0]);
    }

    #[test]
    fn test_decode_modes_least_significant_first() {
        // 1002: opcode 02, param1 position, param2 immediate, param3 position.
        let instr = decode(1002);
        assert_eq!(instr.opcode, 2);
        assert_eq!(instr.mode(0), Some(Mode::Position));
        assert_eq!(instr.mode(1), Some(Mode::Immediate));
        assert_eq!(instr.mode(2), Some(Mode::Position));
    }

    #[test]
    fn test_decode_relative_write_target() {
        let instr = decode(21101);
        assert_eq!(instr.opcode, 1);
        assert_eq!(instr.modes, [1, 1, 2]);
    }

    #[test]
    fn test_decode_halt() {
        assert_eq!(decode(99).opcode, 99);
        assert_eq!(Opcode::from_code(decode(99).opcode), Some(Opcode::Halt));
    }

    #[test]
    fn test_decode_never_fails() {
        // Out-of-table opcode and mode digits still decode.
        let instr = decode(98711);
        assert_eq!(instr.opcode, 11);
        assert_eq!(instr.modes, [7, 8, 9]);
        assert_eq!(instr.mode(0), None);
        assert_eq!(Opcode::from_code(instr.opcode), None);
    }

    #[test]
    fn test_decode_negative_word() {
        // -1 = -1 * 100000 + 99999 under Euclidean division.
        let instr = decode(-1);
        assert_eq!(instr.opcode, 99);
        assert_eq!(instr.modes, [9, 9, 9]);
    }

    #[test]
    fn test_param_counts() {
        assert_eq!(Opcode::Add.param_count(), 3);
        assert_eq!(Opcode::JumpIfFalse.param_count(), 2);
        assert_eq!(Opcode::AdjustBase.param_count(), 1);
        assert_eq!(Opcode::Halt.param_count(), 0);
    }

    #[test]
    fn test_disassemble_modes() {
        let text = disassemble(&[1101, 1, 0, 13, 204, -1, 99]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "    0: ADD 1, 0, [13]");
        assert_eq!(lines[1], "    4: OUT [rb-1]");
        assert_eq!(lines[2], "    6: HALT");
    }

    #[test]
    fn test_disassemble_data_and_truncated() {
        let text = disassemble(&[42, 1, 2]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["    0: DATA 42", "    1: DATA 1", "    2: DATA 2"]);
    }
}
