//! Instruction word field layout.
//!
//! ```text
//!  15..12 | 11..9 | 8..7 |  6  | 5 |  4  |  3   |  2  | 1..0
//!  class  |  alu  |  y   | t>n | ; | sa  | sh32 | div | shift
//! ```
//!
//! Fetch/store and memory words reuse bits 8..6 as the IOS selector and
//! bits 4..0 as a short literal or local address; internal register words
//! take their register index from bits 3..0. Words with bit 15 clear are
//! calls to the word address they hold.

/// Instruction class field.
pub const MASK_CLASS: u16 = 0xF000;
/// In-page target of IF, LOOP and ELSE.
pub const MASK_BRANCH_OFFSET: u16 = 0x0FFF;
/// ALU function field.
pub const MASK_ALU: u16 = 0x0E00;
/// ALU second-operand selector.
pub const MASK_Y: u16 = 0x0180;
/// Fetch/store sub-operation selector.
pub const MASK_IOS: u16 = 0x01C0;
/// Iterative step flag of ALU words.
pub const BIT_STEP: u16 = 0x0100;
/// Carry-in enable.
pub const BIT_CARRY_IN: u16 = 0x0080;
/// Copy `t` into `n` (push) before the operation.
pub const BIT_T_TO_N: u16 = 0x0040;
/// Return after the operation.
pub const BIT_RETURN: u16 = 0x0020;
/// Stack-active flag.
pub const BIT_STACK_ACTIVE: u16 = 0x0010;
/// Short literal or local address.
pub const MASK_LITERAL5: u16 = 0x001F;
/// Internal register index.
pub const MASK_REGISTER: u16 = 0x000F;
/// Shift `t` and `n` as one 32-bit register.
pub const BIT_SHIFT32: u16 = 0x0008;
/// Divide/square-root variant of the step flag.
pub const BIT_DIVIDE: u16 = 0x0004;
/// Shift direction.
pub const MASK_SHIFT: u16 = 0x0003;

/// Opcode mask that ignores the return bit.
pub const MASK_IGNORE_RETURN: u16 = !BIT_RETURN;
/// Opcode mask that ignores the return bit and the 5-bit operand field.
pub const MASK_IGNORE_OPERAND: u16 = !(BIT_RETURN | MASK_LITERAL5);

/// Top-level instruction class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionClass {
    /// Bit 15 clear: subroutine call.
    Call,
    /// `1000`: ALU operation.
    Alu,
    /// `1001`: branch when `t` is zero, then drop.
    If,
    /// `1010`: branch while `i` is non-zero, decrementing it.
    Loop,
    /// `1011`: unconditional in-page branch.
    Else,
    /// `1100`: literal, local or internal fetch.
    Fetch,
    /// `1101`: literal, local or internal store.
    Store,
    /// `1110`: memory fetch through `t`.
    MemoryFetch,
    /// `1111`: memory store through `t`.
    MemoryStore,
}

/// ALU function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    /// Pass `t`.
    T,
    /// `t AND y`.
    And,
    /// `t - y`.
    Sub,
    /// `t OR y`.
    Or,
    /// `t + y`.
    Add,
    /// `t XOR y`.
    Xor,
    /// `y - t`.
    SubY,
    /// Pass `y`.
    Y,
}

impl AluOp {
    /// Decodes the 3-bit function field.
    #[must_use]
    pub const fn from_u3(bits: u16) -> Self {
        match bits & 0x7 {
            0 => Self::T,
            1 => Self::And,
            2 => Self::Sub,
            3 => Self::Or,
            4 => Self::Add,
            5 => Self::Xor,
            6 => Self::SubY,
            _ => Self::Y,
        }
    }
}

/// Second ALU operand source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YSource {
    /// `n`.
    N,
    /// `n` with the carry flag as carry-in.
    NWithCarry,
    /// `md`.
    Md,
    /// `sr`.
    Sr,
}

/// Shift applied after the ALU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftOp {
    /// No shift (or, in 32-bit mode, shift `n` left alone).
    None,
    /// Logical shift right.
    Right,
    /// Shift left.
    Left,
    /// Sign smear of `t` (the `0<` test); no effect in 32-bit mode.
    SignFill,
}

/// Iterative step variant selected by the step and divide bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepMode {
    /// Commit the result only when bit 0 of `n` is set.
    Multiply,
    /// Commit the result only when the ALU produced a carry.
    Divide,
    /// Square-root step.
    SquareRoot,
    /// Step with carry-in and no divide bit: the result is never committed.
    Hold,
}

/// Sub-operation of the fetch and store classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LliOperation {
    /// Fetch from a 5-bit local address.
    LocalFetch,
    /// Fetch an internal register.
    InternalFetch,
    /// Fetch the 16-bit literal in the following word.
    LongLiteral,
    /// Store `t` to a 5-bit local address.
    LocalStore,
    /// Store `t` to an internal register.
    InternalStore,
    /// Exchange `t` with an internal register.
    InternalSwap,
    /// Push the 5-bit literal held in the word.
    ShortLiteral,
}

/// A raw 16-bit instruction word with typed field accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction(u16);

impl Instruction {
    /// Wraps a raw instruction word.
    #[must_use]
    pub const fn new(word: u16) -> Self {
        Self(word)
    }

    /// Raw instruction word.
    #[must_use]
    pub const fn word(self) -> u16 {
        self.0
    }

    /// Instruction class.
    #[must_use]
    pub const fn class(self) -> InstructionClass {
        match self.0 & MASK_CLASS {
            0x8000 => InstructionClass::Alu,
            0x9000 => InstructionClass::If,
            0xA000 => InstructionClass::Loop,
            0xB000 => InstructionClass::Else,
            0xC000 => InstructionClass::Fetch,
            0xD000 => InstructionClass::Store,
            0xE000 => InstructionClass::MemoryFetch,
            0xF000 => InstructionClass::MemoryStore,
            _ => InstructionClass::Call,
        }
    }

    /// ALU function.
    #[must_use]
    pub const fn alu_op(self) -> AluOp {
        AluOp::from_u3((self.0 & MASK_ALU) >> 9)
    }

    /// Second operand source of ALU words.
    #[must_use]
    pub const fn y_source(self) -> YSource {
        match self.0 & MASK_Y {
            0x0000 => YSource::N,
            0x0080 => YSource::NWithCarry,
            0x0100 => YSource::Md,
            _ => YSource::Sr,
        }
    }

    /// Shift direction.
    #[must_use]
    pub const fn shift(self) -> ShiftOp {
        match self.0 & MASK_SHIFT {
            0 => ShiftOp::None,
            1 => ShiftOp::Right,
            2 => ShiftOp::Left,
            _ => ShiftOp::SignFill,
        }
    }

    /// Iterative step variant, or `None` for an ordinary ALU word.
    #[must_use]
    pub const fn step_mode(self) -> Option<StepMode> {
        if self.0 & BIT_STEP == 0 {
            return None;
        }
        let carry_in = self.uses_carry();
        Some(if self.0 & BIT_DIVIDE != 0 {
            if carry_in {
                StepMode::SquareRoot
            } else {
                StepMode::Divide
            }
        } else if carry_in {
            StepMode::Hold
        } else {
            StepMode::Multiply
        })
    }

    /// IOS selector (bits 8..6) of fetch, store and memory words.
    #[must_use]
    pub const fn io_select(self) -> u8 {
        ((self.0 & MASK_IOS) >> 6) as u8
    }

    /// Returns `true` when every IOS bit is set.
    #[must_use]
    pub const fn io_select_full(self) -> bool {
        self.0 & MASK_IOS == MASK_IOS
    }

    /// Sub-operation of a fetch word (class `1100`).
    #[must_use]
    pub const fn fetch_operation(self) -> LliOperation {
        match self.io_select() {
            0..=2 => LliOperation::LocalFetch,
            3 | 7 => LliOperation::InternalFetch,
            _ => LliOperation::LongLiteral,
        }
    }

    /// Sub-operation of a store word (class `1101`).
    #[must_use]
    pub const fn store_operation(self) -> LliOperation {
        match self.io_select() {
            0 | 1 => LliOperation::LocalStore,
            2 | 3 => LliOperation::InternalStore,
            7 => LliOperation::InternalSwap,
            _ => LliOperation::ShortLiteral,
        }
    }

    /// Sub-operation of a fetch or store word, `None` for other classes.
    #[must_use]
    pub const fn lli_operation(self) -> Option<LliOperation> {
        match self.class() {
            InstructionClass::Fetch => Some(self.fetch_operation()),
            InstructionClass::Store => Some(self.store_operation()),
            _ => None,
        }
    }

    /// Carry-in enable bit.
    #[must_use]
    pub const fn uses_carry(self) -> bool {
        self.0 & BIT_CARRY_IN != 0
    }

    /// Copy-`t`-to-`n` bit.
    #[must_use]
    pub const fn copies_t_to_n(self) -> bool {
        self.0 & BIT_T_TO_N != 0
    }

    /// Return bit.
    #[must_use]
    pub const fn returns(self) -> bool {
        self.0 & BIT_RETURN != 0
    }

    /// Stack-active bit.
    #[must_use]
    pub const fn stack_active(self) -> bool {
        self.0 & BIT_STACK_ACTIVE != 0
    }

    /// 32-bit shift bit.
    #[must_use]
    pub const fn shift32(self) -> bool {
        self.0 & BIT_SHIFT32 != 0
    }

    /// 5-bit short literal or local address.
    #[must_use]
    pub const fn literal5(self) -> u16 {
        self.0 & MASK_LITERAL5
    }

    /// Internal register index.
    #[must_use]
    pub const fn register(self) -> u8 {
        (self.0 & MASK_REGISTER) as u8
    }

    /// Target of an in-page branch fetched from `pc`; branches never leave the 4 Ki-word page.
    #[must_use]
    pub const fn branch_target(self, pc: u16) -> u16 {
        (pc & !MASK_BRANCH_OFFSET) | (self.0 & MASK_BRANCH_OFFSET)
    }

    /// Target of a call word.
    #[must_use]
    pub const fn call_target(self) -> u16 {
        self.0 & 0x7FFF
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        AluOp, Instruction, InstructionClass, LliOperation, ShiftOp, StepMode, YSource,
    };

    #[rstest]
    #[case(0x0000, InstructionClass::Call)]
    #[case(0x7FFF, InstructionClass::Call)]
    #[case(0x8000, InstructionClass::Alu)]
    #[case(0x9123, InstructionClass::If)]
    #[case(0xA123, InstructionClass::Loop)]
    #[case(0xB123, InstructionClass::Else)]
    #[case(0xCF40, InstructionClass::Fetch)]
    #[case(0xDE81, InstructionClass::Store)]
    #[case(0xEE40, InstructionClass::MemoryFetch)]
    #[case(0xFE00, InstructionClass::MemoryStore)]
    fn class_follows_top_nibble(#[case] word: u16, #[case] class: InstructionClass) {
        assert_eq!(Instruction::new(word).class(), class);
    }

    // LOOP is 1010 and ELSE is 1011; the two codes were once recorded swapped.
    #[test]
    fn loop_precedes_else_in_class_numbering() {
        assert_eq!(Instruction::new(0xA000).class(), InstructionClass::Loop);
        assert_eq!(Instruction::new(0xB000).class(), InstructionClass::Else);
    }

    #[rstest]
    #[case(0x8000, AluOp::T)]
    #[case(0x8200, AluOp::And)]
    #[case(0x8400, AluOp::Sub)]
    #[case(0x8600, AluOp::Or)]
    #[case(0x8800, AluOp::Add)]
    #[case(0x8A00, AluOp::Xor)]
    #[case(0x8C00, AluOp::SubY)]
    #[case(0x8E00, AluOp::Y)]
    fn alu_field_decodes_every_function(#[case] word: u16, #[case] op: AluOp) {
        assert_eq!(Instruction::new(word).alu_op(), op);
    }

    #[test]
    fn alu_fields_of_a_return_word() {
        let word = Instruction::new(0x8420);
        assert_eq!(word.alu_op(), AluOp::Sub);
        assert_eq!(word.y_source(), YSource::N);
        assert!(word.returns());
        assert!(!word.copies_t_to_n());
        assert!(!word.stack_active());
        assert_eq!(word.shift(), ShiftOp::None);
        assert_eq!(word.step_mode(), None);
    }

    #[rstest]
    #[case(0x8909, Some(StepMode::Multiply))]
    #[case(0x850E, Some(StepMode::Divide))]
    #[case(0x858E, Some(StepMode::SquareRoot))]
    #[case(0x8980, Some(StepMode::Hold))]
    #[case(0x8810, None)]
    fn step_bits_select_iterative_mode(#[case] word: u16, #[case] mode: Option<StepMode>) {
        assert_eq!(Instruction::new(word).step_mode(), mode);
    }

    #[rstest]
    #[case(0xC800, LliOperation::LocalFetch)]
    #[case(0xCEC1, LliOperation::InternalFetch)]
    #[case(0xC1D1, LliOperation::InternalFetch)]
    #[case(0xCF40, LliOperation::LongLiteral)]
    #[case(0xDE00, LliOperation::LocalStore)]
    #[case(0xDE81, LliOperation::InternalStore)]
    #[case(0xDFC1, LliOperation::InternalSwap)]
    #[case(0xDF40, LliOperation::ShortLiteral)]
    fn io_select_maps_to_lli_operation(#[case] word: u16, #[case] op: LliOperation) {
        assert_eq!(Instruction::new(word).lli_operation(), Some(op));
    }

    #[test]
    fn lli_operation_is_absent_outside_fetch_and_store() {
        assert_eq!(Instruction::new(0xEE40).lli_operation(), None);
        assert_eq!(Instruction::new(0x8000).lli_operation(), None);
    }

    #[test]
    fn branch_target_stays_in_page() {
        let word = Instruction::new(0xB456);
        assert_eq!(word.branch_target(0x1FFF), 0x1456);
        assert_eq!(word.branch_target(0xF001), 0xF456);
    }

    #[test]
    fn operand_fields_extract_low_bits() {
        let word = Instruction::new(0xD7F5);
        assert_eq!(word.literal5(), 0x15);
        assert_eq!(word.register(), 0x5);
        assert_eq!(Instruction::new(0x1234).call_target(), 0x1234);
    }
}
