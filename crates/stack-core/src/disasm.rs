//! Table-driven disassembler.
//!
//! Opcode rows are matched first-hit in table order after masking: ALU and
//! fixed-form rows ignore the return bit, operand rows also ignore the 5-bit
//! operand field. The masks are the executor's own field constants.

use std::fmt::Write as _;

use crate::encoding::{
    Instruction, InstructionClass, MASK_IGNORE_OPERAND, MASK_IGNORE_RETURN,
};

/// Display names of the 16 internal registers.
pub const REGISTER_NAMES: [&str; 16] = [
    "JK", "I", "PC", "true", "MD", "MD", "SR", "SR", "Bdata", "Bmask", "Bdir", "Btri", "Xdata",
    "Xmask", "Xdir", "Xtri",
];

/// Operand rendered between an entry's text fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Fixed text only.
    None,
    /// 5-bit literal or local address, two hex digits.
    Literal5,
    /// Internal register index, two hex digits, with its name appended.
    Register,
    /// The following program word, four hex digits.
    Literal16,
}

/// One row of the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpcodeEntry {
    /// Opcode bits after masking.
    pub opcode: u16,
    /// Mask applied to the word before comparing.
    pub mask: u16,
    /// Operand kind.
    pub operand: Operand,
    /// Text before the operand.
    pub before: &'static str,
    /// Text after the operand.
    pub after: &'static str,
}

impl OpcodeEntry {
    const fn new(
        opcode: u16,
        mask: u16,
        operand: Operand,
        before: &'static str,
        after: &'static str,
    ) -> Self {
        Self {
            opcode,
            mask,
            operand,
            before,
            after,
        }
    }

    /// Returns `true` when `word` matches this row.
    #[must_use]
    pub const fn matches(&self, word: u16) -> bool {
        word & self.mask == self.opcode
    }

    /// Instruction length in words.
    #[must_use]
    pub const fn len_words(&self) -> u8 {
        match self.operand {
            Operand::Literal16 => 2,
            _ => 1,
        }
    }
}

/// Control-flow hint for debugger stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Flow {
    /// Falls through or branches locally.
    Sequential,
    /// Subroutine call: step over.
    StepOver,
    /// Return bit set: step out.
    StepOut,
}

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Disassembly {
    /// Rendered mnemonic and operands.
    pub text: String,
    /// Length in bytes (2, or 4 with a trailing literal word).
    pub len_bytes: u8,
    /// Stepping hint.
    pub flow: Flow,
}

/// Opcode rows for the ALU, fetch/store and memory classes.
pub const OPCODE_TABLE: &[OpcodeEntry] = &[
    OpcodeEntry::new(0x8000, MASK_IGNORE_RETURN, Operand::None, "NOOP", ""),
    OpcodeEntry::new(0x8010, MASK_IGNORE_RETURN, Operand::None, "NIP", ""),
    OpcodeEntry::new(0x8E10, MASK_IGNORE_RETURN, Operand::None, "DROP", ""),
    OpcodeEntry::new(0x8E00, MASK_IGNORE_RETURN, Operand::None, "DROP DUP", ""),
    OpcodeEntry::new(0x8050, MASK_IGNORE_RETURN, Operand::None, "DUP", ""),
    OpcodeEntry::new(0x8E50, MASK_IGNORE_RETURN, Operand::None, "OVER", ""),
    OpcodeEntry::new(0x8E40, MASK_IGNORE_RETURN, Operand::None, "SWAP", ""),
    OpcodeEntry::new(0x8810, MASK_IGNORE_RETURN, Operand::None, "+", ""),
    OpcodeEntry::new(0x8890, MASK_IGNORE_RETURN, Operand::None, "+c", ""),
    OpcodeEntry::new(0x8C10, MASK_IGNORE_RETURN, Operand::None, "-", ""),
    OpcodeEntry::new(0x8C90, MASK_IGNORE_RETURN, Operand::None, "-c", ""),
    OpcodeEntry::new(0x8410, MASK_IGNORE_RETURN, Operand::None, "SWAP -", ""),
    OpcodeEntry::new(0x8490, MASK_IGNORE_RETURN, Operand::None, "SWAP -c", ""),
    OpcodeEntry::new(0x8610, MASK_IGNORE_RETURN, Operand::None, "OR", ""),
    OpcodeEntry::new(0x8A10, MASK_IGNORE_RETURN, Operand::None, "XOR", ""),
    OpcodeEntry::new(0x8210, MASK_IGNORE_RETURN, Operand::None, "AND", ""),
    OpcodeEntry::new(0x8001, MASK_IGNORE_RETURN, Operand::None, "2/", ""),
    OpcodeEntry::new(0x8002, MASK_IGNORE_RETURN, Operand::None, "2*", ""),
    OpcodeEntry::new(0x8003, MASK_IGNORE_RETURN, Operand::None, "0<", ""),
    OpcodeEntry::new(0x8009, MASK_IGNORE_RETURN, Operand::None, "D2/", ""),
    OpcodeEntry::new(0x800A, MASK_IGNORE_RETURN, Operand::None, "D2*", ""),
    OpcodeEntry::new(0x8909, MASK_IGNORE_RETURN, Operand::None, "*'", ""),
    OpcodeEntry::new(0x8509, MASK_IGNORE_RETURN, Operand::None, "*-", ""),
    OpcodeEntry::new(0x850A, MASK_IGNORE_RETURN, Operand::None, "*F", ""),
    OpcodeEntry::new(0x850E, MASK_IGNORE_RETURN, Operand::None, "/'", ""),
    OpcodeEntry::new(0x850C, MASK_IGNORE_RETURN, Operand::None, "/\"", ""),
    OpcodeEntry::new(0x858E, MASK_IGNORE_RETURN, Operand::None, "S'", ""),
    OpcodeEntry::new(0xCED1, MASK_IGNORE_RETURN, Operand::None, "R>", ""),
    OpcodeEntry::new(0xCEC1, MASK_IGNORE_RETURN, Operand::None, "R@ (#I)", ""),
    OpcodeEntry::new(0xC1D1, MASK_IGNORE_RETURN, Operand::None, "R> DROP", ""),
    OpcodeEntry::new(0xDE81, MASK_IGNORE_RETURN, Operand::None, ">R", ""),
    OpcodeEntry::new(0xDFC1, MASK_IGNORE_RETURN, Operand::None, "R> SWAP >R", ""),
    OpcodeEntry::new(0xEE40, MASK_IGNORE_RETURN, Operand::None, "@", ""),
    OpcodeEntry::new(0xE800, MASK_IGNORE_RETURN, Operand::None, "@ +", ""),
    OpcodeEntry::new(0xE880, MASK_IGNORE_RETURN, Operand::None, "@ +c", ""),
    OpcodeEntry::new(0xE400, MASK_IGNORE_RETURN, Operand::None, "@ -", ""),
    OpcodeEntry::new(0xE480, MASK_IGNORE_RETURN, Operand::None, "@ -c", ""),
    OpcodeEntry::new(0xEC00, MASK_IGNORE_RETURN, Operand::None, "@ SWAP -", ""),
    OpcodeEntry::new(0xEC80, MASK_IGNORE_RETURN, Operand::None, "@ SWAP -c", ""),
    OpcodeEntry::new(0xE600, MASK_IGNORE_RETURN, Operand::None, "@ OR", ""),
    OpcodeEntry::new(0xEA00, MASK_IGNORE_RETURN, Operand::None, "@ XOR", ""),
    OpcodeEntry::new(0xE200, MASK_IGNORE_RETURN, Operand::None, "@ AND", ""),
    OpcodeEntry::new(0xFE00, MASK_IGNORE_RETURN, Operand::None, "!", ""),
    OpcodeEntry::new(0xFE40, MASK_IGNORE_RETURN, Operand::None, "DUP !", ""),
    OpcodeEntry::new(0xCF40, MASK_IGNORE_RETURN, Operand::Literal16, "", " (FLF)"),
    OpcodeEntry::new(0xC900, MASK_IGNORE_RETURN, Operand::Literal16, "", " + (FLF)"),
    OpcodeEntry::new(0xC980, MASK_IGNORE_RETURN, Operand::Literal16, "", " +c (FLF)"),
    OpcodeEntry::new(0xC500, MASK_IGNORE_RETURN, Operand::Literal16, "", " - (FLF)"),
    OpcodeEntry::new(0xC580, MASK_IGNORE_RETURN, Operand::Literal16, "", " -c (FLF)"),
    OpcodeEntry::new(0xCD00, MASK_IGNORE_RETURN, Operand::Literal16, "", " SWAP - (FLF)"),
    OpcodeEntry::new(0xCD80, MASK_IGNORE_RETURN, Operand::Literal16, "", " SWAP -c (FLF)"),
    OpcodeEntry::new(0xC700, MASK_IGNORE_RETURN, Operand::Literal16, "", " OR (FLF)"),
    OpcodeEntry::new(0xCB00, MASK_IGNORE_RETURN, Operand::Literal16, "", " XOR (FLF)"),
    OpcodeEntry::new(0xC300, MASK_IGNORE_RETURN, Operand::Literal16, "", " AND (FLF)"),
    OpcodeEntry::new(0xE9C0, MASK_IGNORE_OPERAND, Operand::Literal5, "DUP @ SWAP ", " +"),
    OpcodeEntry::new(0xE5C0, MASK_IGNORE_OPERAND, Operand::Literal5, "DUP @ SWAP ", " -"),
    OpcodeEntry::new(0xF9C0, MASK_IGNORE_OPERAND, Operand::Literal5, "SWAP OVER ! ", " +"),
    OpcodeEntry::new(0xF5C0, MASK_IGNORE_OPERAND, Operand::Literal5, "SWAP OVER ! ", " -"),
    OpcodeEntry::new(0xCE40, MASK_IGNORE_OPERAND, Operand::Literal5, "", " @"),
    OpcodeEntry::new(0xC800, MASK_IGNORE_OPERAND, Operand::Literal5, "", " @ +"),
    OpcodeEntry::new(0xC880, MASK_IGNORE_OPERAND, Operand::Literal5, "", " @ +c"),
    OpcodeEntry::new(0xC400, MASK_IGNORE_OPERAND, Operand::Literal5, "", " @ -"),
    OpcodeEntry::new(0xC480, MASK_IGNORE_OPERAND, Operand::Literal5, "", " @ -c"),
    OpcodeEntry::new(0xCC00, MASK_IGNORE_OPERAND, Operand::Literal5, "", " @ SWAP -"),
    OpcodeEntry::new(0xCC80, MASK_IGNORE_OPERAND, Operand::Literal5, "", " @ SWAP -c"),
    OpcodeEntry::new(0xC600, MASK_IGNORE_OPERAND, Operand::Literal5, "", " @ OR"),
    OpcodeEntry::new(0xCA00, MASK_IGNORE_OPERAND, Operand::Literal5, "", " @ XOR"),
    OpcodeEntry::new(0xC200, MASK_IGNORE_OPERAND, Operand::Literal5, "", " @ AND"),
    OpcodeEntry::new(0xDE00, MASK_IGNORE_OPERAND, Operand::Literal5, "", " !"),
    OpcodeEntry::new(0xD240, MASK_IGNORE_OPERAND, Operand::Literal5, "DUP ", " !"),
    OpcodeEntry::new(0xD800, MASK_IGNORE_OPERAND, Operand::Literal5, "DUP ", " ! +"),
    OpcodeEntry::new(0xDC00, MASK_IGNORE_OPERAND, Operand::Literal5, "DUP ", " ! -"),
    OpcodeEntry::new(0xD400, MASK_IGNORE_OPERAND, Operand::Literal5, "DUP ", " ! SWAP -"),
    OpcodeEntry::new(0xD600, MASK_IGNORE_OPERAND, Operand::Literal5, "DUP ", " ! OR"),
    OpcodeEntry::new(0xDA00, MASK_IGNORE_OPERAND, Operand::Literal5, "DUP ", " ! XOR"),
    OpcodeEntry::new(0xD200, MASK_IGNORE_OPERAND, Operand::Literal5, "DUP ", " ! AND"),
    OpcodeEntry::new(0xCEC0, MASK_IGNORE_OPERAND, Operand::Register, "", " I@"),
    OpcodeEntry::new(0xC9C0, MASK_IGNORE_OPERAND, Operand::Register, "", " I@ +"),
    OpcodeEntry::new(0xC5C0, MASK_IGNORE_OPERAND, Operand::Register, "", " I@ -"),
    OpcodeEntry::new(0xCDC0, MASK_IGNORE_OPERAND, Operand::Register, "", " I@ SWAP -"),
    OpcodeEntry::new(0xC7C0, MASK_IGNORE_OPERAND, Operand::Register, "", " I@ OR"),
    OpcodeEntry::new(0xCBC0, MASK_IGNORE_OPERAND, Operand::Register, "", " I@ XOR"),
    OpcodeEntry::new(0xC3C0, MASK_IGNORE_OPERAND, Operand::Register, "", " I@ AND"),
    OpcodeEntry::new(0xDE80, MASK_IGNORE_OPERAND, Operand::Register, "", " I!"),
    OpcodeEntry::new(0xD0C0, MASK_IGNORE_OPERAND, Operand::Register, "", " I!"),
    OpcodeEntry::new(0xD880, MASK_IGNORE_OPERAND, Operand::Register, "DUP ", " I! +"),
    OpcodeEntry::new(0xDC80, MASK_IGNORE_OPERAND, Operand::Register, "DUP ", " I! -"),
    OpcodeEntry::new(0xD480, MASK_IGNORE_OPERAND, Operand::Register, "DUP ", " I! SWAP -"),
    OpcodeEntry::new(0xD680, MASK_IGNORE_OPERAND, Operand::Register, "DUP ", " I! OR"),
    OpcodeEntry::new(0xDA80, MASK_IGNORE_OPERAND, Operand::Register, "DUP ", " I! XOR"),
    OpcodeEntry::new(0xD280, MASK_IGNORE_OPERAND, Operand::Register, "DUP ", " I! AND"),
    OpcodeEntry::new(0xDFC0, MASK_IGNORE_OPERAND, Operand::Register, "", " I@!"),
    OpcodeEntry::new(0xDF40, MASK_IGNORE_OPERAND, Operand::Literal5, "", " (SLF)"),
    OpcodeEntry::new(0xD900, MASK_IGNORE_OPERAND, Operand::Literal5, "", " + (SLF)"),
    OpcodeEntry::new(0xD980, MASK_IGNORE_OPERAND, Operand::Literal5, "", " +c (SLF)"),
    OpcodeEntry::new(0xD500, MASK_IGNORE_OPERAND, Operand::Literal5, "", " - (SLF)"),
    OpcodeEntry::new(0xD580, MASK_IGNORE_OPERAND, Operand::Literal5, "", " -c (SLF)"),
    OpcodeEntry::new(0xDD00, MASK_IGNORE_OPERAND, Operand::Literal5, "", " SWAP - (SLF)"),
    OpcodeEntry::new(0xDD80, MASK_IGNORE_OPERAND, Operand::Literal5, "", " SWAP -c (SLF)"),
    OpcodeEntry::new(0xD700, MASK_IGNORE_OPERAND, Operand::Literal5, "", " OR (SLF)"),
    OpcodeEntry::new(0xDB00, MASK_IGNORE_OPERAND, Operand::Literal5, "", " XOR (SLF)"),
    OpcodeEntry::new(0xD300, MASK_IGNORE_OPERAND, Operand::Literal5, "", " AND (SLF)"),
];

/// Disassembles the big-endian word at the start of `bytes`, fetched from word address `pc`.
///
/// Returns `None` when `bytes` is shorter than the instruction.
#[must_use]
pub fn disassemble(bytes: &[u8], pc: u16) -> Option<Disassembly> {
    let word = word_at(bytes, 0)?;
    let insn = Instruction::new(word);

    let branch = |name: &str| Disassembly {
        text: format!("{name} {:04x}", insn.branch_target(pc)),
        len_bytes: 2,
        flow: Flow::Sequential,
    };

    match insn.class() {
        InstructionClass::Call => Some(Disassembly {
            text: format!("CALL {word:04x}"),
            len_bytes: 2,
            flow: Flow::StepOver,
        }),
        InstructionClass::If => Some(branch("0BRANCH")),
        InstructionClass::Loop => Some(branch("LOOP")),
        InstructionClass::Else => Some(branch("BRANCH")),
        _ => {
            let Some(entry) = OPCODE_TABLE.iter().find(|entry| entry.matches(word)) else {
                return Some(Disassembly {
                    text: format!("*** RAW: {word:04x} ***"),
                    len_bytes: 2,
                    flow: Flow::Sequential,
                });
            };
            render(entry, insn, bytes)
        }
    }
}

fn render(entry: &OpcodeEntry, insn: Instruction, bytes: &[u8]) -> Option<Disassembly> {
    let mut text = String::from(entry.before);
    match entry.operand {
        Operand::None => {}
        Operand::Literal5 => {
            let _ = write!(text, "{:02x}", insn.literal5());
        }
        Operand::Register => {
            let _ = write!(text, "{:02x}", insn.register());
        }
        Operand::Literal16 => {
            let _ = write!(text, "{:04x}", word_at(bytes, 2)?);
        }
    }
    text.push_str(entry.after);
    if entry.operand == Operand::Register {
        let _ = write!(text, " ({})", REGISTER_NAMES[usize::from(insn.register())]);
    }

    let flow = if insn.returns() {
        text.push_str(" ;");
        Flow::StepOut
    } else {
        Flow::Sequential
    };

    Some(Disassembly {
        text,
        len_bytes: entry.len_words() * 2,
        flow,
    })
}

fn word_at(bytes: &[u8], offset: usize) -> Option<u16> {
    let hi = *bytes.get(offset)?;
    let lo = *bytes.get(offset + 1)?;
    Some(u16::from_be_bytes([hi, lo]))
}
