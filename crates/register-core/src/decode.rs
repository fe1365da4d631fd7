//! Instruction decoder shared by the executor and the disassembler.
//!
//! [`decode`] turns a byte window starting at an instruction into a typed
//! [`Instruction`] plus its total length. Operand extensions are consumed
//! in encoding order: first general operand, second general operand, then
//! any trailing displacement or immediate field.

use crate::encoding::{format_of, Condition, Opcode, Width};
use crate::operand::{decode_displacement, GenOperand};

/// Longest possible instruction: three opcode bytes, two double-displacement
/// operands and a trailing displacement.
pub const MAX_INSTRUCTION_BYTES: usize = 23;

/// Format 1 operations carrying a single displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ControlOp {
    /// Branch to subroutine.
    Bsr,
    /// Return from subroutine.
    Ret,
    /// Call external procedure.
    Cxp,
    /// Return from external procedure.
    Rxp,
    /// Return from trap (privileged).
    Rett,
}

impl ControlOp {
    /// Assembler mnemonic.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bsr => "BSR",
            Self::Ret => "RET",
            Self::Cxp => "CXP",
            Self::Rxp => "RXP",
            Self::Rett => "RETT",
        }
    }
}

/// Format 1 operations with a register list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterListOp {
    /// Push listed registers.
    Save,
    /// Pop listed registers.
    Restore,
    /// Build a stack frame and save registers.
    Enter,
    /// Restore registers and tear down the frame.
    Exit,
}

impl RegisterListOp {
    /// Assembler mnemonic.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Save => "SAVE",
            Self::Restore => "RESTORE",
            Self::Enter => "ENTER",
            Self::Exit => "EXIT",
        }
    }

    /// Returns `true` when mask bit 0 names R7 rather than R0.
    #[must_use]
    pub const fn reversed_mask(self) -> bool {
        matches!(self, Self::Restore | Self::Exit)
    }
}

/// Format 1 operations without operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ImpliedOp {
    /// Return from interrupt (privileged).
    Reti,
    /// No operation.
    Nop,
    /// Halt until an interrupt.
    Wait,
    /// Diagnose: branch to itself.
    Dia,
    /// Trap if the F flag is set.
    Flag,
    /// Supervisor call trap.
    Svc,
    /// Breakpoint trap.
    Bpt,
}

impl ImpliedOp {
    /// Assembler mnemonic.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reti => "RETI",
            Self::Nop => "NOP",
            Self::Wait => "WAIT",
            Self::Dia => "DIA",
            Self::Flag => "FLAG",
            Self::Svc => "SVC",
            Self::Bpt => "BPT",
        }
    }
}

/// Format 2 operations taking a 4-bit signed constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum QuickOp {
    /// Add quick.
    Addq,
    /// Compare quick.
    Cmpq,
    /// Move quick.
    Movq,
}

impl QuickOp {
    /// Assembler mnemonic without width suffix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Addq => "ADDQ",
            Self::Cmpq => "CMPQ",
            Self::Movq => "MOVQ",
        }
    }
}

/// Dedicated-register moves of format 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ProcessorRegisterOp {
    /// Store processor register.
    Spr,
    /// Load processor register.
    Lpr,
}

impl ProcessorRegisterOp {
    /// Assembler mnemonic without width suffix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Spr => "SPR",
            Self::Lpr => "LPR",
        }
    }
}

/// Assembler name of a dedicated-register field, or `None` for reserved codes.
#[must_use]
pub const fn processor_register_name(code: u8) -> Option<&'static str> {
    match code {
        0 => Some("US"),
        8 => Some("FP"),
        9 => Some("SP"),
        10 => Some("SB"),
        13 => Some("PSR"),
        14 => Some("INTBASE"),
        15 => Some("MOD"),
        _ => None,
    }
}

/// Format 3 single-operand operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum UnaryOp {
    /// Call external procedure through a descriptor.
    Cxpd,
    /// Clear PSR bits.
    Bicpsr,
    /// Jump to an effective address.
    Jump,
    /// Set PSR bits.
    Bispsr,
    /// Adjust the stack pointer.
    Adjsp,
    /// Jump to subroutine.
    Jsr,
    /// Branch by a signed table value.
    Case,
}

impl UnaryOp {
    /// Assembler mnemonic without width suffix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cxpd => "CXPD",
            Self::Bicpsr => "BICPSR",
            Self::Jump => "JUMP",
            Self::Bispsr => "BISPSR",
            Self::Adjsp => "ADJSP",
            Self::Jsr => "JSR",
            Self::Case => "CASE",
        }
    }

    /// Returns `true` when the mnemonic carries a width suffix.
    #[must_use]
    pub const fn sized(self) -> bool {
        !matches!(self, Self::Cxpd | Self::Jump | Self::Jsr)
    }
}

/// Two-operand operations of formats 4, 6 and 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum BinaryOp {
    Add,
    Cmp,
    Bic,
    Addc,
    Mov,
    Or,
    Sub,
    Addr,
    And,
    Subc,
    Tbit,
    Xor,
    Rot,
    Ash,
    Cbit,
    Cbiti,
    Lsh,
    Sbit,
    Sbiti,
    Neg,
    Not,
    Subp,
    Abs,
    Com,
    Ibit,
    Addp,
    Movxbw,
    Movzbw,
    Movzd,
    Movxd,
    Mul,
    Mei,
    Dei,
    Quo,
    Rem,
    Mod,
    Div,
}

impl BinaryOp {
    /// Assembler mnemonic without width suffix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Cmp => "CMP",
            Self::Bic => "BIC",
            Self::Addc => "ADDC",
            Self::Mov => "MOV",
            Self::Or => "OR",
            Self::Sub => "SUB",
            Self::Addr => "ADDR",
            Self::And => "AND",
            Self::Subc => "SUBC",
            Self::Tbit => "TBIT",
            Self::Xor => "XOR",
            Self::Rot => "ROT",
            Self::Ash => "ASH",
            Self::Cbit => "CBIT",
            Self::Cbiti => "CBITI",
            Self::Lsh => "LSH",
            Self::Sbit => "SBIT",
            Self::Sbiti => "SBITI",
            Self::Neg => "NEG",
            Self::Not => "NOT",
            Self::Subp => "SUBP",
            Self::Abs => "ABS",
            Self::Com => "COM",
            Self::Ibit => "IBIT",
            Self::Addp => "ADDP",
            Self::Movxbw => "MOVXBW",
            Self::Movzbw => "MOVZBW",
            Self::Movzd => "MOVZ",
            Self::Movxd => "MOVX",
            Self::Mul => "MUL",
            Self::Mei => "MEI",
            Self::Dei => "DEI",
            Self::Quo => "QUO",
            Self::Rem => "REM",
            Self::Mod => "MOD",
            Self::Div => "DIV",
        }
    }

    /// Full mnemonic for `width`.
    #[must_use]
    pub fn mnemonic(self, width: Width) -> String {
        match self {
            Self::Movxbw | Self::Movzbw => self.name().to_string(),
            Self::Movzd | Self::Movxd => format!("{}{}D", self.name(), width.suffix()),
            _ => format!("{}{}", self.name(), width.suffix()),
        }
    }

    /// Width of the source operand.
    #[must_use]
    pub const fn source_width(self, width: Width) -> Width {
        match self {
            Self::Rot | Self::Ash | Self::Lsh => Width::Byte,
            _ => width,
        }
    }

    /// Width of the destination operand.
    #[must_use]
    pub const fn destination_width(self, width: Width) -> Width {
        match self {
            Self::Movxbw | Self::Movzbw => Width::Word,
            Self::Movzd | Self::Movxd => Width::Double,
            _ => width,
        }
    }

    const fn from_format4(op: u32) -> Option<Self> {
        match op {
            0 => Some(Self::Add),
            1 => Some(Self::Cmp),
            2 => Some(Self::Bic),
            4 => Some(Self::Addc),
            5 => Some(Self::Mov),
            6 => Some(Self::Or),
            8 => Some(Self::Sub),
            9 => Some(Self::Addr),
            10 => Some(Self::And),
            12 => Some(Self::Subc),
            13 => Some(Self::Tbit),
            14 => Some(Self::Xor),
            _ => None,
        }
    }

    const fn from_format6(op: u32) -> Option<Self> {
        match op {
            0 => Some(Self::Rot),
            1 => Some(Self::Ash),
            2 => Some(Self::Cbit),
            3 => Some(Self::Cbiti),
            5 => Some(Self::Lsh),
            6 => Some(Self::Sbit),
            7 => Some(Self::Sbiti),
            8 => Some(Self::Neg),
            9 => Some(Self::Not),
            11 => Some(Self::Subp),
            12 => Some(Self::Abs),
            13 => Some(Self::Com),
            14 => Some(Self::Ibit),
            15 => Some(Self::Addp),
            _ => None,
        }
    }

    const fn from_format7(op: u32) -> Option<Self> {
        match op {
            4 => Some(Self::Movxbw),
            5 => Some(Self::Movzbw),
            6 => Some(Self::Movzd),
            7 => Some(Self::Movxd),
            8 => Some(Self::Mul),
            9 => Some(Self::Mei),
            11 => Some(Self::Dei),
            12 => Some(Self::Quo),
            13 => Some(Self::Rem),
            14 => Some(Self::Mod),
            15 => Some(Self::Div),
            _ => None,
        }
    }
}

/// Block operations of format 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BlockOp {
    /// Move multiple.
    Movm,
    /// Compare multiple.
    Cmpm,
}

impl BlockOp {
    /// Assembler mnemonic without width suffix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Movm => "MOVM",
            Self::Cmpm => "CMPM",
        }
    }
}

/// Bit-field operations of format 7 with an inline offset/length byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FieldOp {
    /// Insert field, short form.
    Inss,
    /// Extract field, short form.
    Exts,
}

impl FieldOp {
    /// Assembler mnemonic without width suffix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Inss => "INSS",
            Self::Exts => "EXTS",
        }
    }
}

/// String operations of format 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StringOp {
    /// Move string.
    Movs,
    /// Compare strings.
    Cmps,
    /// Skip string.
    Skps,
}

impl StringOp {
    /// Assembler mnemonic without suffix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Movs => "MOVS",
            Self::Cmps => "CMPS",
            Self::Skps => "SKPS",
        }
    }
}

/// Termination test of a string instruction, applied to each element against R4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StringMatch {
    /// Run until R0 reaches zero.
    None,
    /// Stop at the first element different from R4.
    While,
    /// Stop at the first element equal to R4.
    Until,
}

/// Option bits of a string instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StringOptions {
    /// Translate each byte through the table at R3.
    pub translate: bool,
    /// Walk addresses downwards.
    pub backward: bool,
    /// Element test.
    pub matching: StringMatch,
}

impl StringOptions {
    /// Decodes the 4-bit option field; the reserved match code yields `None`.
    #[must_use]
    pub const fn from_field(field: u32) -> Option<Self> {
        let matching = match (field >> 2) & 0x3 {
            0 => StringMatch::None,
            1 => StringMatch::While,
            3 => StringMatch::Until,
            _ => return None,
        };
        Some(Self {
            translate: field & 0x1 != 0,
            backward: field & 0x2 != 0,
            matching,
        })
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Instruction {
    /// `Bcond disp` (format 0).
    Branch {
        /// Tested condition.
        condition: Condition,
        /// Offset from the instruction address.
        displacement: i32,
    },
    /// `BSR`, `RET`, `CXP`, `RXP`, `RETT`.
    Control {
        /// Operation.
        op: ControlOp,
        /// Branch offset, link-table index or stack adjustment.
        displacement: i32,
    },
    /// `SAVE`, `RESTORE`, `ENTER`, `EXIT`.
    RegisterList {
        /// Operation.
        op: RegisterListOp,
        /// Register mask byte as encoded.
        mask: u8,
        /// Local frame size for `ENTER`, zero otherwise.
        displacement: i32,
    },
    /// Operand-less format 1 instructions.
    Implied(ImpliedOp),
    /// `ADDQ`, `CMPQ`, `MOVQ`.
    Quick {
        /// Operation.
        op: QuickOp,
        /// Operand width.
        width: Width,
        /// Sign-extended quick constant.
        value: i32,
        /// Destination (or compared) operand.
        operand: GenOperand,
    },
    /// `SPR` and `LPR`.
    ProcessorRegister {
        /// Operation.
        op: ProcessorRegisterOp,
        /// Operand width.
        width: Width,
        /// Dedicated-register code.
        register: u8,
        /// General operand.
        operand: GenOperand,
    },
    /// `Scond`.
    SetCondition {
        /// Tested condition.
        condition: Condition,
        /// Operand width.
        width: Width,
        /// Destination.
        operand: GenOperand,
    },
    /// `ACB`.
    AddCompareBranch {
        /// Operand width.
        width: Width,
        /// Sign-extended increment.
        increment: i32,
        /// Loop index operand.
        index: GenOperand,
        /// Branch offset taken while the index is non-zero.
        displacement: i32,
    },
    /// Format 3 operations.
    Unary {
        /// Operation.
        op: UnaryOp,
        /// Operand width.
        width: Width,
        /// General operand.
        operand: GenOperand,
    },
    /// Two-operand arithmetic, logic, shift, bit and conversion operations.
    Binary {
        /// Operation.
        op: BinaryOp,
        /// Encoded width.
        width: Width,
        /// First operand.
        source: GenOperand,
        /// Second operand.
        destination: GenOperand,
    },
    /// `MOVM`, `CMPM`.
    Block {
        /// Operation.
        op: BlockOp,
        /// Element width.
        width: Width,
        /// First block.
        source: GenOperand,
        /// Second block.
        destination: GenOperand,
        /// Encoded block length.
        length: i32,
    },
    /// `INSS`, `EXTS`.
    Field {
        /// Operation.
        op: FieldOp,
        /// Width of the non-base operand.
        width: Width,
        /// First operand.
        source: GenOperand,
        /// Second operand.
        destination: GenOperand,
        /// Bit offset within the base, 0..=7.
        offset: u8,
        /// Field length in bits, 1..=32.
        length: u8,
    },
    /// `MOVS`, `CMPS`, `SKPS`.
    String {
        /// Operation.
        op: StringOp,
        /// Element width.
        width: Width,
        /// Option bits.
        options: StringOptions,
    },
    /// `SETCFG [list]`.
    SetConfig {
        /// Configuration bits.
        flags: u8,
    },
    /// Undefined opcode, reserved operation code or reserved width.
    Undefined,
    /// A format the interpreter does not model (floating point, MMU, custom slave).
    Unsupported {
        /// Format number.
        format: u8,
    },
}

/// Decoded instruction with its encoding metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decoded {
    /// First opcode bytes.
    pub opcode: Opcode,
    /// Format number, `None` for an undefined first byte.
    pub format: Option<u8>,
    /// The instruction.
    pub instruction: Instruction,
    /// Total length in bytes.
    pub len: usize,
}

/// Reads operand extensions in encoding order.
struct Cursor<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl Cursor<'_> {
    fn operand(&mut self, code: u8, width: Width) -> Option<GenOperand> {
        let (operand, len) = GenOperand::decode(code, self.bytes, self.at, width)?;
        self.at += len;
        Some(operand)
    }

    fn displacement(&mut self) -> Option<i32> {
        let (value, len) = decode_displacement(self.bytes, self.at)?;
        self.at += len;
        Some(value)
    }

    fn byte(&mut self) -> Option<u8> {
        let value = *self.bytes.get(self.at)?;
        self.at += 1;
        Some(value)
    }
}

/// Decodes the instruction at the start of `bytes`.
///
/// Returns `None` only when `bytes` ends before the instruction does.
#[must_use]
pub fn decode(bytes: &[u8]) -> Option<Decoded> {
    let first = *bytes.first()?;
    let opcode = Opcode::from_bytes(bytes);
    let format = format_of(first);
    let base = match format {
        Some(0 | 1) | None => 1,
        Some(2..=4) => 2,
        Some(5..=7) => 3,
        Some(_) => 1,
    };
    if bytes.len() < base {
        return None;
    }

    let mut cursor = Cursor { bytes, at: base };
    let instruction = match format {
        None => Instruction::Undefined,
        Some(0) => Instruction::Branch {
            condition: Condition::from_u4(opcode.high_nibble()),
            displacement: cursor.displacement()?,
        },
        Some(1) => decode_format1(opcode, &mut cursor)?,
        Some(2) => decode_format2(opcode, &mut cursor)?,
        Some(3) => decode_format3(opcode, &mut cursor)?,
        Some(4) => decode_format4(opcode, &mut cursor)?,
        Some(5) => decode_format5(opcode),
        Some(6) => decode_format6(opcode, &mut cursor)?,
        Some(7) => decode_format7(opcode, &mut cursor)?,
        Some(format) => Instruction::Unsupported { format },
    };

    Some(Decoded {
        opcode,
        format,
        instruction,
        len: cursor.at,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn decode_format1(opcode: Opcode, cursor: &mut Cursor<'_>) -> Option<Instruction> {
    const CONTROL: [ControlOp; 5] = [
        ControlOp::Bsr,
        ControlOp::Ret,
        ControlOp::Cxp,
        ControlOp::Rxp,
        ControlOp::Rett,
    ];
    const LISTS: [RegisterListOp; 4] = [
        RegisterListOp::Save,
        RegisterListOp::Restore,
        RegisterListOp::Enter,
        RegisterListOp::Exit,
    ];

    let op = opcode.high_nibble() as usize;
    let instruction = match op {
        0..=4 => Instruction::Control {
            op: CONTROL[op],
            displacement: cursor.displacement()?,
        },
        5 => Instruction::Implied(ImpliedOp::Reti),
        6..=9 => {
            let op = LISTS[op - 6];
            let mask = cursor.byte()?;
            let displacement = if op == RegisterListOp::Enter {
                cursor.displacement()?
            } else {
                0
            };
            Instruction::RegisterList {
                op,
                mask,
                displacement,
            }
        }
        10 => Instruction::Implied(ImpliedOp::Nop),
        11 => Instruction::Implied(ImpliedOp::Wait),
        12 => Instruction::Implied(ImpliedOp::Dia),
        13 => Instruction::Implied(ImpliedOp::Flag),
        14 => Instruction::Implied(ImpliedOp::Svc),
        _ => Instruction::Implied(ImpliedOp::Bpt),
    };
    Some(instruction)
}

#[allow(clippy::cast_possible_truncation)]
fn decode_format2(opcode: Opcode, cursor: &mut Cursor<'_>) -> Option<Instruction> {
    let Some(width) = Width::from_code(opcode.short_width()) else {
        return Some(Instruction::Undefined);
    };
    let code = opcode.gen_high();
    let register = opcode.short_field() as u8;
    let quick = |op, cursor: &mut Cursor<'_>| -> Option<Instruction> {
        Some(Instruction::Quick {
            op,
            width,
            value: opcode.quick(),
            operand: cursor.operand(code, width)?,
        })
    };
    let processor = |op, cursor: &mut Cursor<'_>| -> Option<Instruction> {
        Some(Instruction::ProcessorRegister {
            op,
            width,
            register,
            operand: cursor.operand(code, width)?,
        })
    };

    match opcode.quick_op() {
        0 => quick(QuickOp::Addq, cursor),
        1 => quick(QuickOp::Cmpq, cursor),
        2 => processor(ProcessorRegisterOp::Spr, cursor),
        3 => Some(Instruction::SetCondition {
            condition: Condition::from_u4(opcode.short_field()),
            width,
            operand: cursor.operand(code, width)?,
        }),
        4 => {
            let index = cursor.operand(code, width)?;
            Some(Instruction::AddCompareBranch {
                width,
                increment: opcode.quick(),
                index,
                displacement: cursor.displacement()?,
            })
        }
        5 => quick(QuickOp::Movq, cursor),
        6 => processor(ProcessorRegisterOp::Lpr, cursor),
        _ => Some(Instruction::Undefined),
    }
}

fn decode_format3(opcode: Opcode, cursor: &mut Cursor<'_>) -> Option<Instruction> {
    let Some(width) = Width::from_code(opcode.short_width()) else {
        return Some(Instruction::Undefined);
    };
    let op = match opcode.short_field() {
        0 => UnaryOp::Cxpd,
        2 => UnaryOp::Bicpsr,
        4 => UnaryOp::Jump,
        6 => UnaryOp::Bispsr,
        10 => UnaryOp::Adjsp,
        12 => UnaryOp::Jsr,
        14 => UnaryOp::Case,
        _ => return Some(Instruction::Undefined),
    };
    Some(Instruction::Unary {
        op,
        width,
        operand: cursor.operand(opcode.gen_high(), width)?,
    })
}

fn decode_format4(opcode: Opcode, cursor: &mut Cursor<'_>) -> Option<Instruction> {
    let (Some(width), Some(op)) = (
        Width::from_code(opcode.short_width()),
        BinaryOp::from_format4(opcode.dyadic_op()),
    ) else {
        return Some(Instruction::Undefined);
    };
    binary(op, width, opcode.gen_high(), opcode.gen_low(), cursor)
}

#[allow(clippy::cast_possible_truncation)]
const fn decode_format5(opcode: Opcode) -> Instruction {
    if opcode.long_op() == 2 {
        return Instruction::SetConfig {
            flags: opcode.string_field() as u8,
        };
    }
    let op = match opcode.long_op() {
        0 => StringOp::Movs,
        1 => StringOp::Cmps,
        3 => StringOp::Skps,
        _ => return Instruction::Undefined,
    };
    match (
        Width::from_code(opcode.long_width()),
        StringOptions::from_field(opcode.string_field()),
    ) {
        (Some(width), Some(options)) => Instruction::String { op, width, options },
        _ => Instruction::Undefined,
    }
}

fn decode_format6(opcode: Opcode, cursor: &mut Cursor<'_>) -> Option<Instruction> {
    let (Some(width), Some(op)) = (
        Width::from_code(opcode.long_width()),
        BinaryOp::from_format6(opcode.long_op()),
    ) else {
        return Some(Instruction::Undefined);
    };
    binary(op, width, opcode.gen1(), opcode.gen2(), cursor)
}

fn decode_format7(opcode: Opcode, cursor: &mut Cursor<'_>) -> Option<Instruction> {
    let Some(width) = Width::from_code(opcode.long_width()) else {
        return Some(Instruction::Undefined);
    };
    match opcode.long_op() {
        op @ (0 | 1) => {
            let source = cursor.operand(opcode.gen1(), width)?;
            let destination = cursor.operand(opcode.gen2(), width)?;
            Some(Instruction::Block {
                op: if op == 0 { BlockOp::Movm } else { BlockOp::Cmpm },
                width,
                source,
                destination,
                length: cursor.displacement()?,
            })
        }
        op @ (2 | 3) => {
            let field = if op == 2 { FieldOp::Inss } else { FieldOp::Exts };
            let (first, second) = match field {
                FieldOp::Inss => (width, Width::Double),
                FieldOp::Exts => (Width::Double, width),
            };
            let source = cursor.operand(opcode.gen1(), first)?;
            let destination = cursor.operand(opcode.gen2(), second)?;
            let spec = cursor.byte()?;
            Some(Instruction::Field {
                op: field,
                width,
                source,
                destination,
                offset: spec >> 5,
                length: (spec & 0x1F) + 1,
            })
        }
        op => match BinaryOp::from_format7(op) {
            Some(op) => binary(op, width, opcode.gen1(), opcode.gen2(), cursor),
            None => Some(Instruction::Undefined),
        },
    }
}

fn binary(
    op: BinaryOp,
    width: Width,
    source: u8,
    destination: u8,
    cursor: &mut Cursor<'_>,
) -> Option<Instruction> {
    let source = cursor.operand(source, op.source_width(width))?;
    let destination = cursor.operand(destination, op.destination_width(width))?;
    Some(Instruction::Binary {
        op,
        width,
        source,
        destination,
    })
}
