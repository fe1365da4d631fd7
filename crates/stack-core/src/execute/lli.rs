//! Literal, local and internal fetch/store (classes `1100` and `1101`).

use tracing::debug;

use crate::encoding::LliOperation;
use crate::timing::CycleCostKind;
use crate::{word_byte_address, AddressSpace, Instruction, StackBus, StackCpu};

impl StackCpu {
    pub(super) fn execute_lli(
        &mut self,
        bus: &mut dyn StackBus,
        insn: Instruction,
        operation: LliOperation,
    ) -> CycleCostKind {
        let carry_in = self.lli_carry_in(insn);
        let kind = match operation {
            LliOperation::LocalFetch => {
                if insn.copies_t_to_n() {
                    self.push_t(bus);
                }
                let value = bus.read_word(AddressSpace::Program, word_byte_address(insn.literal5()));
                self.regs.t = self.alu(insn, value, carry_in);
                CycleCostKind::LocalAccess
            }
            LliOperation::InternalFetch => {
                // Select 3 pushes; select 7 replaces `t` in place.
                if insn.io_select() == 3 {
                    self.push_t(bus);
                }
                let value = self.read_internal(bus, insn.register());
                self.regs.t = self.alu(insn, value, false);
                if insn.stack_active() {
                    self.pop_return(bus);
                }
                CycleCostKind::Internal
            }
            LliOperation::LongLiteral => {
                if insn.copies_t_to_n() {
                    self.push_t(bus);
                }
                let value = bus.read_word(AddressSpace::Program, word_byte_address(self.regs.pc));
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.regs.t = self.alu(insn, value, carry_in);
                CycleCostKind::LongLiteral
            }
            LliOperation::LocalStore => {
                bus.write_word(
                    AddressSpace::Program,
                    word_byte_address(insn.literal5()),
                    self.regs.t,
                );
                self.regs.t = self.alu(insn, self.regs.n, carry_in);
                if !insn.copies_t_to_n() {
                    self.pop_data(bus);
                }
                CycleCostKind::LocalAccess
            }
            LliOperation::InternalStore => {
                if insn.stack_active() {
                    self.enter_times(bus);
                } else if insn.register() == 1 {
                    self.push_return(bus);
                }
                self.write_internal(bus, insn.register(), self.regs.t);
                self.regs.t = self.alu(insn, self.regs.n, carry_in);
                if !insn.copies_t_to_n() {
                    self.pop_data(bus);
                }
                CycleCostKind::Internal
            }
            LliOperation::InternalSwap => {
                if insn.stack_active() {
                    self.enter_times(bus);
                }
                let previous = self.read_internal(bus, insn.register());
                self.write_internal(bus, insn.register(), self.regs.t);
                self.regs.t = self.alu(insn, previous, carry_in);
                CycleCostKind::Internal
            }
            LliOperation::ShortLiteral => {
                if insn.copies_t_to_n() {
                    self.push_t(bus);
                }
                self.regs.t = self.alu(insn, insn.literal5(), carry_in);
                CycleCostKind::Internal
            }
        };
        self.apply_return(bus, insn);
        kind
    }

    fn enter_times(&mut self, bus: &mut dyn StackBus) {
        self.push_return(bus);
        self.times_mode = true;
        debug!(pc = self.regs.pc, "times repeat started");
    }
}
