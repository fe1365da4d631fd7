//! Assembler-syntax rendering of decoded instructions.
//!
//! The disassembler runs the same [`decode`] as the executor, so lengths
//! and operand boundaries always agree with execution.

use crate::decode::{
    decode, processor_register_name, ControlOp, Decoded, ImpliedOp, Instruction, RegisterListOp,
    StringMatch, StringOptions, UnaryOp,
};
use crate::encoding::Width;

/// Control-flow hint for debugger stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Flow {
    /// Falls through or branches locally.
    Sequential,
    /// Subroutine or module call: step over.
    StepOver,
    /// Return: step out.
    StepOut,
}

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Disassembly {
    /// Rendered mnemonic and operands.
    pub text: String,
    /// Length in bytes.
    pub len_bytes: u8,
    /// Stepping hint.
    pub flow: Flow,
}

/// `SETCFG` list names indexed by the 4-bit configuration field.
pub const CONFIG_NAMES: [&str; 16] = [
    "", "I", "F", "FI", "M", "MI", "MF", "MFI", "C", "CI", "CF", "CFI", "CM", "CMI", "CMF", "CMFI",
];

/// Disassembles the instruction at the start of `bytes`, located at address `pc`.
///
/// Returns `None` when `bytes` is shorter than the instruction.
#[must_use]
pub fn disassemble(bytes: &[u8], pc: u32) -> Option<Disassembly> {
    let decoded = decode(bytes)?;
    Some(Disassembly {
        text: render(&decoded, pc),
        len_bytes: u8::try_from(decoded.len).unwrap_or(u8::MAX),
        flow: flow_of(decoded.instruction),
    })
}

const fn flow_of(instruction: Instruction) -> Flow {
    match instruction {
        Instruction::Control {
            op: ControlOp::Bsr | ControlOp::Cxp,
            ..
        }
        | Instruction::Unary {
            op: UnaryOp::Cxpd | UnaryOp::Jsr,
            ..
        } => Flow::StepOver,
        Instruction::Control {
            op: ControlOp::Ret | ControlOp::Rxp | ControlOp::Rett,
            ..
        }
        | Instruction::Implied(ImpliedOp::Reti) => Flow::StepOut,
        _ => Flow::Sequential,
    }
}

const fn target(pc: u32, displacement: i32) -> u32 {
    pc.wrapping_add_signed(displacement) & crate::ADDRESS_MASK
}

#[allow(clippy::too_many_lines)]
fn render(decoded: &Decoded, pc: u32) -> String {
    match decoded.instruction {
        Instruction::Branch {
            condition,
            displacement,
        } => format!(
            "B{} {displacement} (${:06X})",
            condition.mnemonic(),
            target(pc, displacement)
        ),
        Instruction::Control {
            op: ControlOp::Bsr,
            displacement,
        } => format!("BSR {displacement} (${:06X})", target(pc, displacement)),
        Instruction::Control { op, displacement } => format!("{} {displacement}", op.name()),
        Instruction::RegisterList {
            op,
            mask,
            displacement,
        } => {
            let list = register_list(op, mask);
            if op == RegisterListOp::Enter {
                format!("{} [{list}], {displacement}", op.name())
            } else {
                format!("{} [{list}]", op.name())
            }
        }
        Instruction::Implied(op) => op.name().to_string(),
        Instruction::Quick {
            op,
            width,
            value,
            operand,
        } => format!("{}{} {value}, {operand}", op.name(), width.suffix()),
        Instruction::ProcessorRegister {
            op,
            width,
            register,
            operand,
        } => format!(
            "{}{} {}, {operand}",
            op.name(),
            width.suffix(),
            processor_register_name(register).unwrap_or("[res]")
        ),
        Instruction::SetCondition {
            condition,
            width,
            operand,
        } => format!("S{}{} {operand}", condition.mnemonic(), width.suffix()),
        Instruction::AddCompareBranch {
            width,
            increment,
            index,
            displacement,
        } => format!(
            "ACB{} {increment}, {index}, {displacement} (${:06X})",
            width.suffix(),
            target(pc, displacement)
        ),
        Instruction::Unary { op, width, operand } => {
            if op.sized() {
                format!("{}{} {operand}", op.name(), width.suffix())
            } else {
                format!("{} {operand}", op.name())
            }
        }
        Instruction::Binary {
            op,
            width,
            source,
            destination,
        } => format!("{} {source}, {destination}", op.mnemonic(width)),
        Instruction::Block {
            op,
            width,
            source,
            destination,
            length,
        } => format!(
            "{}{} {source}, {destination}, {length}",
            op.name(),
            width.suffix()
        ),
        Instruction::Field {
            op,
            width,
            source,
            destination,
            offset,
            length,
        } => format!(
            "{}{} {source}, {destination}, {offset}, {length}",
            op.name(),
            width.suffix()
        ),
        Instruction::String { op, width, options } => string_text(op.name(), width, options),
        Instruction::SetConfig { flags } => {
            format!("SETCFG [{}]", CONFIG_NAMES[usize::from(flags & 0xF)])
        }
        Instruction::Undefined if decoded.format.is_none() => {
            format!("Unknown ({:02X})", decoded.opcode.first_byte())
        }
        Instruction::Undefined => "[Undefined]".to_string(),
        Instruction::Unsupported { format } => format!(
            "Unimplemented ({:02X}) (fmt {format})",
            decoded.opcode.first_byte()
        ),
    }
}

fn register_list(op: RegisterListOp, mask: u8) -> String {
    (0..8u8)
        .filter(|bit| mask & (1 << bit) != 0)
        .map(|bit| {
            let reg = if op.reversed_mask() { 7 - bit } else { bit };
            format!("R{reg}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn string_text(name: &str, width: Width, options: StringOptions) -> String {
    let mnemonic = if options.translate {
        format!("{name}T")
    } else {
        format!("{name}{}", width.suffix())
    };
    let mut flags = Vec::new();
    if options.backward {
        flags.push("B");
    }
    match options.matching {
        StringMatch::None => {}
        StringMatch::While => flags.push("W"),
        StringMatch::Until => flags.push("U"),
    }
    if flags.is_empty() {
        mnemonic
    } else {
        format!("{mnemonic} {}", flags.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{disassemble, Flow};

    #[rstest]
    #[case(&[0xA2], "NOP")]
    #[case(&[0x62, 0x03], "SAVE [R0 R1]")]
    #[case(&[0x72, 0xC0], "RESTORE [R1 R0]")]
    #[case(&[0x82, 0x04, 0x10], "ENTER [R2], 16")]
    #[case(&[0x0E, 0x88, 0x00], "SETCFG [I]")]
    #[case(&[0xFC], "Unknown (FC)")]
    #[case(&[0x3E, 0x00, 0x00], "Unimplemented (3E) (fmt 9)")]
    fn renders_fixed_forms(#[case] bytes: &[u8], #[case] text: &str) {
        assert_eq!(disassemble(bytes, 0).expect("decodes").text, text);
    }

    #[test]
    fn bsr_steps_over_and_shows_target() {
        let dis = disassemble(&[0x02, 0x10], 0x2000).expect("BSR");
        assert_eq!(dis.text, "BSR 16 ($002010)");
        assert_eq!(dis.flow, Flow::StepOver);
        assert_eq!(dis.len_bytes, 2);
    }

    #[test]
    fn returns_step_out() {
        assert_eq!(disassemble(&[0x12, 0x00], 0).expect("RET").flow, Flow::StepOut);
        assert_eq!(disassemble(&[0x52], 0).expect("RETI").flow, Flow::StepOut);
    }
}
