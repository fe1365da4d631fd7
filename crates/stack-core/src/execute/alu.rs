//! ALU evaluator and the ALU instruction class.

use crate::encoding::{AluOp, ShiftOp, StepMode, YSource};
use crate::{Instruction, StackBus, StackCpu};

/// Value and carry produced by one ALU evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AluResult {
    /// 16-bit result.
    pub value: u16,
    /// Carry out of bit 15; always `false` for the non-arithmetic functions.
    pub carry: bool,
}

impl AluResult {
    const fn logical(value: u16) -> Self {
        Self {
            value,
            carry: false,
        }
    }

    const fn widened(sum: u32) -> Self {
        Self {
            value: (sum & 0xFFFF) as u16,
            carry: sum & 0x1_0000 != 0,
        }
    }
}

/// Evaluates `op` with `t` as the first operand.
///
/// Subtraction adds the 16-bit ones' complement plus one, so the carry out
/// reads as "no borrow" (`t >= y` when `carry_in` is clear).
#[must_use]
pub const fn evaluate_alu(op: AluOp, t: u16, y: u16, carry_in: bool) -> AluResult {
    let cin = carry_in as u32;
    match op {
        AluOp::T => AluResult::logical(t),
        AluOp::And => AluResult::logical(t & y),
        AluOp::Sub => AluResult::widened(t as u32 + (!y) as u32 + 1 + cin),
        AluOp::Or => AluResult::logical(t | y),
        AluOp::Add => AluResult::widened(t as u32 + y as u32 + cin),
        AluOp::Xor => AluResult::logical(t ^ y),
        AluOp::SubY => AluResult::widened(y as u32 + (!t) as u32 + 1 + cin),
        AluOp::Y => AluResult::logical(y),
    }
}

impl StackCpu {
    pub(super) fn execute_alu(&mut self, bus: &mut dyn StackBus, insn: Instruction) {
        let source = insn.y_source();
        let y = match source {
            YSource::N | YSource::NWithCarry => self.regs.n,
            YSource::Md => self.regs.md,
            YSource::Sr => self.regs.sr,
        };

        if insn.copies_t_to_n() {
            if insn.stack_active() {
                self.push_data(bus);
            }
            self.regs.n = self.regs.t;
        } else if insn.stack_active() {
            self.pop_data(bus);
        }

        let carry_in = source == YSource::NWithCarry && self.regs.carry;
        let result = evaluate_alu(insn.alu_op(), self.regs.t, y, carry_in);
        self.regs.carry = result.carry;

        let commit = match insn.step_mode() {
            None => true,
            Some(StepMode::Divide) => result.carry,
            Some(StepMode::Multiply) => self.regs.n & 1 != 0,
            Some(StepMode::Hold | StepMode::SquareRoot) => false,
        };
        if commit {
            self.regs.t = result.value;
        }

        self.shift(insn);
        self.apply_return(bus, insn);
    }

    fn shift(&mut self, insn: Instruction) {
        let carry = u16::from(self.regs.carry);
        let regs = &mut self.regs;
        if insn.shift32() {
            match insn.shift() {
                ShiftOp::None => regs.n = (regs.n << 1) | carry,
                ShiftOp::Right => {
                    regs.n = (regs.n >> 1) | ((regs.t << 15) & 0x8000);
                    regs.t >>= 1;
                }
                ShiftOp::Left => {
                    regs.t = (regs.t << 1) | (regs.n >> 15);
                    regs.n = (regs.n << 1) | carry;
                }
                ShiftOp::SignFill => {}
            }
        } else {
            match insn.shift() {
                ShiftOp::None => {}
                ShiftOp::Right => regs.t = (regs.t >> 1) | (carry << 15),
                ShiftOp::Left => regs.t = (regs.t << 1) | carry,
                ShiftOp::SignFill => regs.t = if regs.t & 0x8000 != 0 { 0xFFFF } else { 0 },
            }
        }
    }
}
