//! Whole-core scenarios: arithmetic properties, stack discipline, TIMES,
//! the return bit, interrupts and the historically disputed behaviours.

#![allow(clippy::pedantic, clippy::nursery)]

use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use stack_core::{
    evaluate_alu, AddressSpace, AluOp, FlatStackMemory, Instruction, Port, PortError, StackBus,
    StackCpu, StackRegisters, StepMode,
};
use thiserror as _;
use tracing as _;

const BOOT: u16 = 0x1000;

fn boot_with(program: &[u16], regs: StackRegisters) -> (StackCpu, FlatStackMemory) {
    let mut memory = FlatStackMemory::default();
    memory.load_words(BOOT, program);
    let mut cpu = StackCpu::default();
    *cpu.registers_mut() = StackRegisters { pc: BOOT, ..regs };
    (cpu, memory)
}

fn boot(program: &[u16]) -> (StackCpu, FlatStackMemory) {
    boot_with(program, StackRegisters::default())
}

fn step(cpu: &mut StackCpu, memory: &mut FlatStackMemory) {
    cpu.step(memory).expect("instruction executes");
}

/// Independent 32-bit reference for the arithmetic ALU functions.
fn reference(op: AluOp, t: u16, y: u16, carry_in: bool) -> (u16, bool) {
    let (t, y, cin) = (u64::from(t), u64::from(y), u64::from(carry_in));
    let wide = match op {
        AluOp::Add => t + y + cin,
        AluOp::Sub => t + (0xFFFF - y) + 1 + cin,
        AluOp::SubY => y + (0xFFFF - t) + 1 + cin,
        _ => unreachable!("only arithmetic functions have a carry"),
    };
    ((wide & 0xFFFF) as u16, wide & 0x1_0000 != 0)
}

proptest! {
    #[test]
    fn arithmetic_carry_matches_wide_reference(
        t in any::<u16>(),
        y in any::<u16>(),
        carry_in in any::<bool>(),
        op in prop::sample::select(vec![AluOp::Add, AluOp::Sub, AluOp::SubY]),
    ) {
        let result = evaluate_alu(op, t, y, carry_in);
        let (value, carry) = reference(op, t, y, carry_in);
        prop_assert_eq!(result.value, value);
        prop_assert_eq!(result.carry, carry);

        let truncated = match op {
            AluOp::Add => t.wrapping_add(y).wrapping_add(u16::from(carry_in)),
            AluOp::Sub => t.wrapping_sub(y).wrapping_add(u16::from(carry_in)),
            _ => y.wrapping_sub(t).wrapping_add(u16::from(carry_in)),
        };
        prop_assert_eq!(result.value, truncated);
    }

    #[test]
    fn data_stack_push_then_pop_restores_state(
        t in any::<u16>(),
        n in any::<u16>(),
        k in any::<u8>(),
    ) {
        // DUP then DROP.
        let (mut cpu, mut memory) = boot_with(&[0x8050, 0x8E10], StackRegisters { t, n, k, ..StackRegisters::default() });
        step(&mut cpu, &mut memory);
        prop_assert_eq!(cpu.registers().k, k.wrapping_sub(1));
        step(&mut cpu, &mut memory);
        prop_assert_eq!(cpu.registers().t, t);
        prop_assert_eq!(cpu.registers().n, n);
        prop_assert_eq!(cpu.registers().k, k);
    }

    #[test]
    fn return_stack_push_then_pop_restores_state(
        t in any::<u16>(),
        i in any::<u16>(),
        j in any::<u8>(),
    ) {
        // >R then R>.
        let (mut cpu, mut memory) = boot_with(&[0xDE81, 0xCED1], StackRegisters { t, i, j, k: 0x80, ..StackRegisters::default() });
        step(&mut cpu, &mut memory);
        prop_assert_eq!(cpu.registers().i, t);
        prop_assert_eq!(cpu.registers().j, j.wrapping_sub(1));
        step(&mut cpu, &mut memory);
        prop_assert_eq!(cpu.registers().t, t);
        prop_assert_eq!(cpu.registers().i, i);
        prop_assert_eq!(cpu.registers().j, j);
        prop_assert_eq!(cpu.registers().k, 0x80);
    }

    #[test]
    fn times_holds_pc_until_counter_reaches_zero(count in 1u16..48) {
        // count TIMES 1 +
        let (mut cpu, mut memory) = boot(&[0xCF40, count, 0xDE91, 0xD901, 0x8000]);
        step(&mut cpu, &mut memory);
        step(&mut cpu, &mut memory);
        prop_assert!(cpu.times_mode());
        let depth_at_start = cpu.registers().j;

        for _ in 1..count {
            step(&mut cpu, &mut memory);
            prop_assert!(cpu.times_mode());
            prop_assert_eq!(cpu.registers().pc, 0x1003);
        }

        step(&mut cpu, &mut memory);
        prop_assert!(!cpu.times_mode());
        prop_assert_eq!(cpu.registers().pc, 0x1004);
        prop_assert_eq!(cpu.registers().j, depth_at_start.wrapping_add(1));
        prop_assert_eq!(cpu.registers().t, count);
    }

    #[test]
    fn clear_return_bit_leaves_control_state_alone(
        low in any::<u16>(),
        t in any::<u16>(),
        n in any::<u16>(),
        i in any::<u16>(),
        carry in any::<bool>(),
    ) {
        let word = 0x8000 | (low & 0x0FDF);
        prop_assume!(Instruction::new(word).step_mode() != Some(StepMode::SquareRoot));

        let (mut cpu, mut memory) = boot_with(&[word], StackRegisters { t, n, i, j: 0x40, carry, ..StackRegisters::default() });
        step(&mut cpu, &mut memory);
        prop_assert_eq!(cpu.registers().pc, BOOT + 1);
        prop_assert_eq!(cpu.registers().j, 0x40);
        prop_assert_eq!(cpu.registers().i, i);
    }

    #[test]
    fn set_return_bit_restores_pc_and_carry_from_i(
        low in any::<u16>(),
        i in any::<u16>(),
    ) {
        let word = 0x8020 | (low & 0x0FDF);
        prop_assume!(Instruction::new(word).step_mode() != Some(StepMode::SquareRoot));

        let (mut cpu, mut memory) = boot_with(&[word], StackRegisters { i, j: 0x40, ..StackRegisters::default() });
        step(&mut cpu, &mut memory);
        prop_assert_eq!(cpu.registers().pc, i & 0x7FFF);
        prop_assert_eq!(cpu.registers().carry, i & 0x8000 != 0);
        prop_assert_eq!(cpu.registers().j, 0x41);
    }
}

#[test]
fn and_clears_disjoint_bits_and_advances() {
    let (mut cpu, mut memory) = boot_with(
        &[0x8200],
        StackRegisters {
            t: 0x00F0,
            n: 0x0F00,
            ..StackRegisters::default()
        },
    );
    step(&mut cpu, &mut memory);
    assert_eq!(cpu.registers().t, 0x0000);
    assert_eq!(cpu.registers().pc, 0x1001);
}

// 0x8420 is T - N with the return bit set, not AND: it subtracts and returns through `i`.
#[test]
fn word_8420_subtracts_and_returns() {
    let insn = Instruction::new(0x8420);
    assert_eq!(insn.alu_op(), AluOp::Sub);
    assert!(insn.returns());

    let (mut cpu, mut memory) = boot_with(
        &[0x8420],
        StackRegisters {
            t: 0x00F0,
            n: 0x0F00,
            i: 0x2345,
            ..StackRegisters::default()
        },
    );
    step(&mut cpu, &mut memory);
    assert_eq!(cpu.registers().t, 0xF1F0);
    assert_eq!(cpu.registers().pc, 0x2345);
}

#[test]
fn masked_interrupt_stays_latched_until_enabled() {
    // Long literal 0x0100, store it to Xtri, NOOP.
    let (mut cpu, mut memory) = boot(&[0xCF40, 0x0100, 0xD08F, 0x8000]);
    memory.load_words(0x0020, &[0x8000]);

    cpu.request_interrupt();
    let first = cpu.step(&mut memory).expect("literal");
    assert!(!first.interrupt_taken);
    assert!(cpu.interrupt_pending());
    assert_eq!(cpu.registers().pc, 0x1002);

    let second = cpu.step(&mut memory).expect("enable");
    assert!(!second.interrupt_taken);
    assert!(cpu.interrupt_pending());

    let third = cpu.step(&mut memory).expect("vectored");
    assert!(third.interrupt_taken);
    assert!(!cpu.interrupt_pending());
    assert_eq!(third.pc, 0x0020);
    assert_eq!(cpu.registers().i, 0x1003);
    assert_eq!(cpu.registers().j, 0xFF);
}

#[rstest]
#[case::zero_takes_branch(0x0000, 0x1123)]
#[case::nonzero_falls_through(0x0001, 0x1001)]
fn if_branches_when_t_is_zero(#[case] t: u16, #[case] pc: u16) {
    let (mut cpu, mut memory) = boot_with(
        &[0x9123],
        StackRegisters {
            t,
            n: 0x0055,
            ..StackRegisters::default()
        },
    );
    step(&mut cpu, &mut memory);
    assert_eq!(cpu.registers().pc, pc);
    assert_eq!(cpu.registers().t, 0x0055);
    assert_eq!(cpu.registers().k, 1);
}

#[rstest]
#[case::counter_live(2, 0x1010, 1, 0x00)]
#[case::counter_spent(0, 0x1001, 0xABCD, 0x01)]
fn loop_is_1010_and_counts_i_down(
    #[case] i: u16,
    #[case] pc: u16,
    #[case] i_after: u16,
    #[case] j_after: u8,
) {
    let (mut cpu, mut memory) = boot_with(
        &[0xA010],
        StackRegisters {
            i,
            ..StackRegisters::default()
        },
    );
    memory.write_word(AddressSpace::ReturnStack, 0x0002, 0xABCD);
    step(&mut cpu, &mut memory);
    assert_eq!(cpu.registers().pc, pc);
    assert_eq!(cpu.registers().i, i_after);
    assert_eq!(cpu.registers().j, j_after);
}

#[test]
fn else_is_1011_and_always_branches() {
    let (mut cpu, mut memory) = boot(&[0xB800]);
    step(&mut cpu, &mut memory);
    assert_eq!(cpu.registers().pc, 0x1800);
}

#[rstest]
#[case::carry_clear(false, 0x1001)]
#[case::carry_set(true, 0x9001)]
fn call_keeps_carry_in_bit_15(#[case] carry: bool, #[case] link: u16) {
    let (mut cpu, mut memory) = boot_with(
        &[0x0300],
        StackRegisters {
            carry,
            ..StackRegisters::default()
        },
    );
    step(&mut cpu, &mut memory);
    assert_eq!(cpu.registers().pc, 0x0300);
    assert_eq!(cpu.registers().i, link);
}

#[test]
fn jk_register_puts_data_stack_pointer_high() {
    // JK I@ pushes (k << 8) | j.
    let (mut cpu, mut memory) = boot_with(
        &[0xCEC0],
        StackRegisters {
            j: 0x21,
            k: 0x43,
            ..StackRegisters::default()
        },
    );
    step(&mut cpu, &mut memory);
    assert_eq!(cpu.registers().t, 0x4321);
}

#[rstest]
#[case::carry_ignored_without_cin(0xD901, true, 0x0011)]
#[case::carry_used_with_cin(0xD981, true, 0x0012)]
#[case::cin_with_clear_carry(0xD981, false, 0x0011)]
fn cin_on_fetch_store_selects_the_carry_flag(
    #[case] word: u16,
    #[case] carry: bool,
    #[case] t: u16,
) {
    let (mut cpu, mut memory) = boot_with(
        &[word],
        StackRegisters {
            t: 0x0010,
            carry,
            ..StackRegisters::default()
        },
    );
    step(&mut cpu, &mut memory);
    assert_eq!(cpu.registers().t, t);
}

#[rstest]
#[case::plain_store_to_i(0xDE81, false)]
#[case::times_store_to_i(0xDE91, true)]
fn store_to_i_pushes_return_stack_exactly_once(#[case] word: u16, #[case] times: bool) {
    let (mut cpu, mut memory) = boot_with(
        &[word, 0x8000],
        StackRegisters {
            t: 5,
            ..StackRegisters::default()
        },
    );
    step(&mut cpu, &mut memory);
    assert_eq!(cpu.registers().j, 0xFF);
    assert_eq!(cpu.registers().i, 5);
    assert_eq!(cpu.times_mode(), times);
}

#[test]
fn return_is_suppressed_while_times_is_active() {
    // 2 TIMES, then a NOOP carrying the return bit.
    let (mut cpu, mut memory) = boot(&[0xCF40, 2, 0xDE91, 0x8020]);
    for _ in 0..3 {
        step(&mut cpu, &mut memory);
    }
    assert!(cpu.times_mode());
    assert_eq!(cpu.registers().pc, 0x1003);

    step(&mut cpu, &mut memory);
    assert!(!cpu.times_mode());
    // Last repetition runs with TIMES cleared, so the return bit applies.
    assert_eq!(cpu.registers().pc, 0x0000);
}

struct Pins {
    memory: FlatStackMemory,
    b_input: u16,
    b_output: Option<u16>,
}

impl StackBus for Pins {
    fn read_word(&mut self, space: AddressSpace, addr: u32) -> u16 {
        self.memory.read_word(space, addr)
    }

    fn write_word(&mut self, space: AddressSpace, addr: u32, value: u16) {
        self.memory.write_word(space, addr, value);
    }

    fn read_port(&mut self, port: Port) -> Result<u16, PortError> {
        match port {
            Port::B => Ok(self.b_input),
            Port::X => Err(PortError::Unbound),
        }
    }

    fn write_port(&mut self, port: Port, value: u16) -> Result<(), PortError> {
        match port {
            Port::B => {
                self.b_output = Some(value);
                Ok(())
            }
            Port::X => Err(PortError::Unbound),
        }
    }
}

#[test]
fn b_port_round_trip_through_device() {
    // FF00 Bdir I!, 1234 Bdata I!, Bdata I@
    let mut pins = Pins {
        memory: FlatStackMemory::default(),
        b_input: 0x00AA,
        b_output: None,
    };
    pins.memory.load_words(
        BOOT,
        &[0xCF40, 0xFF00, 0xD08A, 0xCF40, 0x1234, 0xD088, 0xCEC8],
    );
    let mut cpu = StackCpu::default();
    for _ in 0..4 {
        cpu.step(&mut pins).expect("port program");
    }
    assert_eq!(pins.b_output, Some(0x1234));
    assert_eq!(cpu.external_port_b(), 0x1200);

    cpu.step(&mut pins).expect("port read");
    // Output pins read the latch; input pins read pins XOR latch.
    assert_eq!(cpu.registers().t, 0x129E);
}
