//! Fetch, dispatch and retire loop of the stack processor.
//!
//! Every call to [`StackCpu::step`] follows the same order:
//! 1. Service a pending interrupt when the X-port enable bit is set
//! 2. Fetch the word at `pc`
//! 3. Run the TIMES counter, or advance `pc` past the word
//! 4. Dispatch on the instruction class
//! 5. Apply the return bit (ALU and fetch/store classes only)

mod alu;
mod internal;
mod lli;
mod memory_ops;

pub use alu::{evaluate_alu, AluResult};

use tracing::{debug, trace, warn};

use crate::encoding::{InstructionClass, StepMode};
use crate::timing::{cycle_cost, CycleCostKind};
use crate::{
    word_byte_address, AddressSpace, Instruction, Port, PortBank, RunOutcome, RunStop, StackBus,
    StackConfig, StackError, StackRegisters, StepOutcome, TraceControl, TraceEvent, TraceSink,
};

/// One stack processor core: register file, port banks and control latches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackCpu {
    config: StackConfig,
    regs: StackRegisters,
    port_b: PortBank,
    port_x: PortBank,
    times_mode: bool,
    interrupt_pending: bool,
}

impl Default for StackCpu {
    fn default() -> Self {
        Self::new(StackConfig::default())
    }
}

impl StackCpu {
    /// Creates a core in its reset state.
    #[must_use]
    pub const fn new(config: StackConfig) -> Self {
        Self {
            config,
            regs: StackRegisters::at_boot(config.boot_pc),
            port_b: PortBank::new(Port::B),
            port_x: PortBank::new(Port::X),
            times_mode: false,
            interrupt_pending: false,
        }
    }

    /// Clears every register and latch and reloads `pc` with the boot vector.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Configuration the core was built with.
    #[must_use]
    pub const fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Architectural registers.
    #[must_use]
    pub const fn registers(&self) -> &StackRegisters {
        &self.regs
    }

    /// Mutable architectural registers, for hosts and debuggers.
    pub const fn registers_mut(&mut self) -> &mut StackRegisters {
        &mut self.regs
    }

    /// B-port register bank.
    #[must_use]
    pub const fn port_b(&self) -> &PortBank {
        &self.port_b
    }

    /// X-port register bank.
    #[must_use]
    pub const fn port_x(&self) -> &PortBank {
        &self.port_x
    }

    /// Returns `true` while a TIMES repeat is re-executing one word.
    #[must_use]
    pub const fn times_mode(&self) -> bool {
        self.times_mode
    }

    /// Returns `true` while an interrupt request waits for the enable bit.
    #[must_use]
    pub const fn interrupt_pending(&self) -> bool {
        self.interrupt_pending
    }

    /// Raises the interrupt request line. The request stays latched until serviced.
    pub fn request_interrupt(&mut self) {
        self.interrupt_pending = true;
    }

    /// Pins the chip currently drives on the B port.
    #[must_use]
    pub const fn external_port_b(&self) -> u16 {
        self.port_b.driven_pins()
    }

    /// Pins the chip currently drives on the X port.
    #[must_use]
    pub const fn external_port_x(&self) -> u16 {
        self.port_x.driven_pins()
    }

    /// Drives the B-port input pins from the host side.
    pub const fn drive_port_b(&mut self, pins: u16) {
        self.port_b.latch_input(pins);
    }

    /// Drives the X-port input pins from the host side.
    pub const fn drive_port_x(&mut self, pins: u16) {
        self.port_x.latch_input(pins);
    }

    /// Executes exactly one instruction, servicing a pending interrupt first.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::UnimplementedStep`] for a square-root step word;
    /// the word is fetched but no register is modified.
    pub fn step(&mut self, bus: &mut dyn StackBus) -> Result<StepOutcome, StackError> {
        let interrupt_taken = self.poll_interrupt(bus).is_some();
        let pc = self.regs.pc;
        let word = self.fetch(bus);
        let cycles = self.execute(bus, pc, word)?;
        Ok(StepOutcome {
            pc,
            word,
            cycles,
            interrupt_taken,
        })
    }

    /// Executes instructions until `budget` cycles are consumed or `sink` breaks.
    ///
    /// A budget of zero returns immediately. The last instruction may overshoot
    /// the budget by its own cost. A break requested on
    /// [`TraceEvent::InstructionFetch`] leaves the fetched instruction unexecuted.
    ///
    /// # Errors
    ///
    /// Propagates [`StackError`] from [`StackCpu::step`]; cycles consumed before
    /// the failing instruction are lost with the partial outcome.
    pub fn run(
        &mut self,
        bus: &mut dyn StackBus,
        budget: u32,
        mut sink: Option<&mut dyn TraceSink>,
    ) -> Result<RunOutcome, StackError> {
        let mut cycles: u32 = 0;
        let mut instructions: u32 = 0;

        while cycles < budget {
            if let Some(return_pc) = self.poll_interrupt(bus) {
                emit(&mut sink, TraceEvent::InterruptServiced { return_pc });
            }

            let pc = self.regs.pc;
            let word = self.fetch(bus);
            if emit(&mut sink, TraceEvent::InstructionFetch { pc, word }) == TraceControl::Break {
                return Ok(RunOutcome {
                    cycles,
                    instructions,
                    stop: RunStop::Break { pc },
                });
            }

            let spent = self.execute(bus, pc, word)?;
            cycles = cycles.saturating_add(u32::from(spent));
            instructions = instructions.saturating_add(1);
            emit(
                &mut sink,
                TraceEvent::InstructionRetired { pc, cycles: spent },
            );
        }

        Ok(RunOutcome {
            cycles,
            instructions,
            stop: RunStop::BudgetExhausted,
        })
    }

    /// Services the interrupt request if it is latched and enabled; returns the pushed address.
    fn poll_interrupt(&mut self, bus: &mut dyn StackBus) -> Option<u16> {
        if !self.interrupt_pending || !self.port_x.interrupt_enabled() {
            return None;
        }
        let return_pc = self.regs.pc;
        self.push_return(bus);
        self.regs.i = return_pc;
        self.regs.pc = self.config.interrupt_vector;
        self.interrupt_pending = false;
        debug!(
            return_pc,
            vector = self.config.interrupt_vector,
            "interrupt serviced"
        );
        Some(return_pc)
    }

    fn fetch(&self, bus: &mut dyn StackBus) -> u16 {
        let word = bus.read_word(AddressSpace::Program, word_byte_address(self.regs.pc));
        trace!(pc = self.regs.pc, word, "fetch");
        word
    }

    fn execute(&mut self, bus: &mut dyn StackBus, pc: u16, word: u16) -> Result<u8, StackError> {
        let insn = Instruction::new(word);
        let class = insn.class();
        if class == InstructionClass::Alu && insn.step_mode() == Some(StepMode::SquareRoot) {
            warn!(pc, word, "square-root step is not implemented");
            return Err(StackError::UnimplementedStep { pc, word });
        }

        if self.times_mode {
            self.regs.i = self.regs.i.wrapping_sub(1);
            if self.regs.i == 0 {
                self.pop_return(bus);
                self.times_mode = false;
                debug!(pc, "times repeat finished");
            }
        }
        if !self.times_mode {
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }

        let kind = match class {
            InstructionClass::Alu => {
                self.execute_alu(bus, insn);
                CycleCostKind::Alu
            }
            InstructionClass::If => {
                if self.regs.t == 0 {
                    self.regs.pc = insn.branch_target(pc);
                }
                self.regs.t = self.regs.n;
                self.pop_data(bus);
                CycleCostKind::Branch
            }
            InstructionClass::Loop => {
                if self.regs.i == 0 {
                    self.pop_return(bus);
                } else {
                    self.regs.pc = insn.branch_target(pc);
                    self.regs.i -= 1;
                }
                CycleCostKind::Branch
            }
            InstructionClass::Else => {
                self.regs.pc = insn.branch_target(pc);
                CycleCostKind::Branch
            }
            InstructionClass::Fetch => self.execute_lli(bus, insn, insn.fetch_operation()),
            InstructionClass::Store => self.execute_lli(bus, insn, insn.store_operation()),
            InstructionClass::MemoryFetch => {
                self.memory_fetch(bus, insn);
                CycleCostKind::Memory
            }
            InstructionClass::MemoryStore => {
                self.memory_store(bus, insn);
                CycleCostKind::Memory
            }
            InstructionClass::Call => {
                let link = self.regs.return_link();
                self.push_return(bus);
                self.regs.i = link;
                self.regs.pc = insn.call_target();
                CycleCostKind::Call
            }
        };

        Ok(cycle_cost(kind).unwrap_or(1))
    }

    /// Runs `y` through the ALU against `t`, latching the carry.
    fn alu(&mut self, insn: Instruction, y: u16, carry_in: bool) -> u16 {
        let result = evaluate_alu(insn.alu_op(), self.regs.t, y, carry_in);
        self.regs.carry = result.carry;
        result.value
    }

    /// Carry-in for fetch/store words: bit 7 selects the carry flag, not a constant.
    const fn lli_carry_in(&self, insn: Instruction) -> bool {
        insn.uses_carry() && self.regs.carry
    }

    fn push_data(&mut self, bus: &mut dyn StackBus) {
        bus.write_word(
            AddressSpace::DataStack,
            word_byte_address(u16::from(self.regs.k)),
            self.regs.n,
        );
        self.regs.k = self.regs.k.wrapping_sub(1);
    }

    fn pop_data(&mut self, bus: &mut dyn StackBus) {
        self.regs.k = self.regs.k.wrapping_add(1);
        self.regs.n = bus.read_word(
            AddressSpace::DataStack,
            word_byte_address(u16::from(self.regs.k)),
        );
    }

    fn push_return(&mut self, bus: &mut dyn StackBus) {
        bus.write_word(
            AddressSpace::ReturnStack,
            word_byte_address(u16::from(self.regs.j)),
            self.regs.i,
        );
        self.regs.j = self.regs.j.wrapping_sub(1);
    }

    fn pop_return(&mut self, bus: &mut dyn StackBus) {
        self.regs.j = self.regs.j.wrapping_add(1);
        self.regs.i = bus.read_word(
            AddressSpace::ReturnStack,
            word_byte_address(u16::from(self.regs.j)),
        );
    }

    /// Pushes `t` into `n`, spilling `n` to the data stack.
    fn push_t(&mut self, bus: &mut dyn StackBus) {
        self.push_data(bus);
        self.regs.n = self.regs.t;
    }

    /// Return-bit post-process. A word executed under TIMES never returns.
    fn apply_return(&mut self, bus: &mut dyn StackBus, insn: Instruction) {
        if insn.returns() && !self.times_mode {
            self.regs.pc = self.regs.i & 0x7FFF;
            self.regs.carry = self.regs.i & 0x8000 != 0;
            self.pop_return(bus);
        }
    }

    const fn bank(&self, port: Port) -> &PortBank {
        match port {
            Port::B => &self.port_b,
            Port::X => &self.port_x,
        }
    }

    const fn bank_mut(&mut self, port: Port) -> &mut PortBank {
        match port {
            Port::B => &mut self.port_b,
            Port::X => &mut self.port_x,
        }
    }
}

fn emit(sink: &mut Option<&mut dyn TraceSink>, event: TraceEvent) -> TraceControl {
    sink.as_mut()
        .map_or(TraceControl::Continue, |sink| sink.on_event(event))
}

#[cfg(test)]
mod tests {
    use super::StackCpu;
    use crate::{
        AddressSpace, FlatStackMemory, RunStop, StackConfig, StackError, TraceControl,
        TraceEvent, TraceSink, INTERRUPT_ENABLE,
    };

    fn boot(program: &[u16]) -> (StackCpu, FlatStackMemory) {
        let mut memory = FlatStackMemory::default();
        memory.load_words(0x1000, program);
        (StackCpu::default(), memory)
    }

    #[test]
    fn reset_loads_boot_vector_and_clears_latches() {
        let (mut cpu, mut memory) = boot(&[0x8050]);
        cpu.registers_mut().t = 7;
        cpu.request_interrupt();
        cpu.step(&mut memory).expect("dup executes");

        cpu.reset();
        assert_eq!(cpu.registers().pc, 0x1000);
        assert_eq!(cpu.registers().t, 0);
        assert_eq!(cpu.registers().k, 0);
        assert!(!cpu.interrupt_pending());
        assert!(!cpu.times_mode());
    }

    #[test]
    fn custom_boot_vector_is_honoured() {
        let cpu = StackCpu::new(StackConfig {
            boot_pc: 0x0400,
            ..StackConfig::default()
        });
        assert_eq!(cpu.registers().pc, 0x0400);
    }

    #[test]
    fn dup_spills_n_and_copies_t() {
        let (mut cpu, mut memory) = boot(&[0x8050]);
        cpu.registers_mut().t = 0x1111;
        cpu.registers_mut().n = 0x2222;

        let outcome = cpu.step(&mut memory).expect("dup executes");
        assert_eq!(outcome.pc, 0x1000);
        assert_eq!(outcome.word, 0x8050);
        assert_eq!(outcome.cycles, 1);
        assert_eq!(cpu.registers().t, 0x1111);
        assert_eq!(cpu.registers().n, 0x1111);
        assert_eq!(cpu.registers().k, 0xFF);
        assert_eq!(memory.word(AddressSpace::DataStack, 0), 0x2222);
    }

    #[test]
    fn call_saves_carry_and_return_restores_it() {
        // CALL 0x0200; at 0x0200 a NOOP with the return bit.
        let (mut cpu, mut memory) = boot(&[0x0200]);
        memory.load_words(0x0200, &[0x8020]);
        cpu.registers_mut().carry = true;

        cpu.step(&mut memory).expect("call");
        assert_eq!(cpu.registers().pc, 0x0200);
        assert_eq!(cpu.registers().i, 0x9001);

        cpu.registers_mut().carry = false;
        cpu.step(&mut memory).expect("return");
        assert_eq!(cpu.registers().pc, 0x1001);
        assert!(cpu.registers().carry);
        assert_eq!(cpu.registers().j, 0);
    }

    #[test]
    fn square_root_step_aborts_without_side_effects() {
        let (mut cpu, mut memory) = boot(&[0x858E]);
        let before = *cpu.registers();
        let err = cpu.step(&mut memory).expect_err("sqrt step is fatal");
        assert_eq!(
            err,
            StackError::UnimplementedStep {
                pc: 0x1000,
                word: 0x858E
            }
        );
        assert_eq!(*cpu.registers(), before);
    }

    #[test]
    fn zero_budget_runs_nothing() {
        let (mut cpu, mut memory) = boot(&[0x8050]);
        let outcome = cpu.run(&mut memory, 0, None).expect("run");
        assert_eq!(outcome.instructions, 0);
        assert_eq!(outcome.stop, RunStop::BudgetExhausted);
        assert_eq!(cpu.registers().pc, 0x1000);
    }

    #[test]
    fn budget_counts_memory_ops_twice() {
        // @ then NOOP NOOP.
        let (mut cpu, mut memory) = boot(&[0xEE40, 0x8000, 0x8000]);
        let outcome = cpu.run(&mut memory, 3, None).expect("run");
        assert_eq!(outcome.cycles, 3);
        assert_eq!(outcome.instructions, 2);
        assert_eq!(cpu.registers().pc, 0x1002);
    }

    struct BreakAt(u16, Vec<TraceEvent>);

    impl TraceSink for BreakAt {
        fn on_event(&mut self, event: TraceEvent) -> TraceControl {
            self.1.push(event);
            match event {
                TraceEvent::InstructionFetch { pc, .. } if pc == self.0 => TraceControl::Break,
                _ => TraceControl::Continue,
            }
        }
    }

    #[test]
    fn break_on_fetch_leaves_instruction_unexecuted() {
        let (mut cpu, mut memory) = boot(&[0x8000, 0x8050]);
        let mut sink = BreakAt(0x1001, Vec::new());

        let outcome = cpu.run(&mut memory, 100, Some(&mut sink)).expect("run");
        assert_eq!(outcome.stop, RunStop::Break { pc: 0x1001 });
        assert_eq!(outcome.instructions, 1);
        assert_eq!(cpu.registers().pc, 0x1001);
        assert_eq!(cpu.registers().k, 0);
        assert_eq!(
            sink.1,
            vec![
                TraceEvent::InstructionFetch {
                    pc: 0x1000,
                    word: 0x8000
                },
                TraceEvent::InstructionRetired {
                    pc: 0x1000,
                    cycles: 1
                },
                TraceEvent::InstructionFetch {
                    pc: 0x1001,
                    word: 0x8050
                },
            ]
        );
    }

    #[test]
    fn enabled_interrupt_is_serviced_before_fetch() {
        // Long literal 0x0100, then store it to Xtri (internal register 15).
        let (mut cpu, mut memory) = boot(&[0xCF40, INTERRUPT_ENABLE, 0xD08F, 0x8000]);
        memory.load_words(0x0020, &[0x8000]);

        cpu.step(&mut memory).expect("literal");
        cpu.step(&mut memory).expect("xtri store");
        assert!(cpu.port_x().interrupt_enabled());

        cpu.request_interrupt();
        let outcome = cpu.step(&mut memory).expect("vectored");
        assert!(outcome.interrupt_taken);
        assert_eq!(outcome.pc, 0x0020);
        assert_eq!(cpu.registers().i, 0x1003);
        assert_eq!(cpu.registers().pc, 0x0021);
        assert!(!cpu.interrupt_pending());
    }
}
