//! Memory fetch and store through `t` (classes `1110` and `1111`).
//!
//! When every IOS bit is set the word keeps the address on the stack and
//! folds its 5-bit literal into `t` (`DUP @ SWAP nn +`); otherwise `t` is
//! consumed as the pointer. Neither form honours the return bit.

use crate::{word_byte_address, AddressSpace, Instruction, StackBus, StackCpu};

impl StackCpu {
    pub(super) fn memory_fetch(&mut self, bus: &mut dyn StackBus, insn: Instruction) {
        if insn.io_select_full() {
            self.push_data(bus);
            self.regs.n = bus.read_word(AddressSpace::Program, word_byte_address(self.regs.t));
            self.regs.t = self.alu(insn, insn.literal5(), false);
        } else {
            self.regs.t = bus.read_word(AddressSpace::Program, word_byte_address(self.regs.t));
            if !insn.copies_t_to_n() {
                self.regs.t = self.alu(insn, self.regs.n, false);
                self.pop_data(bus);
            }
        }
    }

    pub(super) fn memory_store(&mut self, bus: &mut dyn StackBus, insn: Instruction) {
        bus.write_word(
            AddressSpace::Program,
            word_byte_address(self.regs.t),
            self.regs.n,
        );
        self.pop_data(bus);
        if insn.io_select_full() {
            self.regs.t = self.alu(insn, insn.literal5(), false);
        } else if !insn.copies_t_to_n() {
            self.regs.t = self.alu(insn, self.regs.n, false);
            self.pop_data(bus);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{AddressSpace, FlatStackMemory, StackCpu};

    fn boot(program: &[u16]) -> (StackCpu, FlatStackMemory) {
        let mut memory = FlatStackMemory::default();
        memory.load_words(0x1000, program);
        (StackCpu::default(), memory)
    }

    #[test]
    fn fetch_replaces_address_with_contents() {
        let (mut cpu, mut memory) = boot(&[0xEE40]);
        memory.load_words(0x0200, &[0xCAFE]);
        cpu.registers_mut().t = 0x0200;
        cpu.registers_mut().n = 0x0009;

        let outcome = cpu.step(&mut memory).expect("@");
        assert_eq!(outcome.cycles, 2);
        assert_eq!(cpu.registers().t, 0xCAFE);
        assert_eq!(cpu.registers().n, 0x0009);
        assert_eq!(cpu.registers().k, 0);
    }

    #[test]
    fn fetch_add_folds_n_and_pops() {
        let (mut cpu, mut memory) = boot(&[0xE800]);
        memory.load_words(0x0200, &[0x0005]);
        cpu.registers_mut().t = 0x0200;
        cpu.registers_mut().n = 0x0003;

        cpu.step(&mut memory).expect("@ +");
        assert_eq!(cpu.registers().t, 0x0008);
        assert_eq!(cpu.registers().k, 1);
    }

    #[test]
    fn pointer_form_keeps_address_and_steps_it() {
        // DUP @ SWAP 02 +
        let (mut cpu, mut memory) = boot(&[0xE9C2]);
        memory.load_words(0x0200, &[0x7777]);
        cpu.registers_mut().t = 0x0200;

        cpu.step(&mut memory).expect("auto-increment fetch");
        assert_eq!(cpu.registers().t, 0x0202);
        assert_eq!(cpu.registers().n, 0x7777);
        assert_eq!(cpu.registers().k, 0xFF);
    }

    #[test]
    fn store_writes_n_at_t_and_drops_both() {
        let (mut cpu, mut memory) = boot(&[0xFE00]);
        cpu.registers_mut().t = 0x0300;
        cpu.registers_mut().n = 0x1234;

        cpu.step(&mut memory).expect("!");
        assert_eq!(memory.word(AddressSpace::Program, 0x0300), 0x1234);
        assert_eq!(cpu.registers().k, 2);
    }

    #[test]
    fn return_bit_is_ignored_by_memory_words() {
        let (mut cpu, mut memory) = boot(&[0xEE60]);
        cpu.registers_mut().i = 0x0400;
        cpu.step(&mut memory).expect("@ with return bit");
        assert_eq!(cpu.registers().pc, 0x1001);
        assert_eq!(cpu.registers().i, 0x0400);
    }
}
