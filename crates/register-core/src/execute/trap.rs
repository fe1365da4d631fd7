//! Trap and interrupt entry through the interrupt dispatch table.
//!
//! Entry saves `PSR << 16 | MOD` and then the return address on the
//! supervisor stack, clears the mode bits, and jumps through the
//! descriptor at `INTBASE + 4 * vector`.

use tracing::debug;

use crate::state::{PSR_I, PSR_P, PSR_S, PSR_T, PSR_U};
use crate::{RegisterBus, RegisterCpu, Trap, ADDRESS_MASK};

impl RegisterCpu {
    /// Enters the handler for `trap`, saving `return_pc` for `RETT`/`RETI`.
    pub(super) fn take_trap(&mut self, bus: &mut dyn RegisterBus, trap: Trap, return_pc: u32) {
        let saved_psr = self.regs.psr;
        let mut cleared = PSR_T | PSR_U | PSR_S | PSR_P;
        if trap.is_interrupt() {
            cleared |= PSR_I;
        }
        self.regs.psr &= !cleared;

        self.push32(bus, (u32::from(saved_psr) << 16) | u32::from(self.regs.mod_));
        self.push32(bus, return_pc);

        let slot = self
            .regs
            .intbase
            .wrapping_add(trap.vector().wrapping_mul(4))
            & ADDRESS_MASK;
        let descriptor = bus.read32(slot);
        self.regs.pc = self.enter_descriptor(bus, descriptor);
        self.waiting = false;
        debug!(
            ?trap,
            vector = trap.vector(),
            return_pc,
            handler = self.regs.pc,
            "trap taken"
        );
    }

    /// Services a latched NMI, or the interrupt line when enabled; returns the saved address.
    pub(super) fn poll_interrupt(&mut self, bus: &mut dyn RegisterBus) -> Option<u32> {
        let trap = if self.nmi_pending {
            self.nmi_pending = false;
            Trap::Nmi
        } else if self.interrupt_line && self.regs.flag(PSR_I) {
            Trap::Nvi
        } else {
            return None;
        };
        let return_pc = self.regs.pc;
        self.take_trap(bus, trap, return_pc);
        Some(return_pc)
    }
}

#[cfg(test)]
mod tests {
    use crate::state::{PSR_I, PSR_T};
    use crate::{FlatMemory, RegisterBus, RegisterCpu};

    /// Table at 0x0400 with every vector entering module 0x0100 at offset `0x40 + 4 * vector`.
    fn with_table() -> (RegisterCpu, FlatMemory) {
        let mut mem = FlatMemory::default();
        for vector in 0..11u32 {
            mem.write32(0x0400 + vector * 4, ((0x40 + vector * 4) << 16) | 0x0100);
        }
        mem.write32(0x0108, 0x6000);
        let mut cpu = RegisterCpu::default();
        {
            let regs = cpu.registers_mut();
            regs.pc = 0x1000;
            regs.intbase = 0x0400;
            regs.sp = [0x8000, 0x9000];
        }
        (cpu, mem)
    }

    #[test]
    fn interrupt_line_needs_enable_bit() {
        let (mut cpu, mut mem) = with_table();
        mem.load(0x1000, &[0xA2]);
        cpu.set_interrupt_line(true);
        let outcome = cpu.step(&mut mem).expect("NOP");
        assert!(!outcome.interrupt_taken);
        assert_eq!(cpu.registers().pc, 0x1001);

        cpu.registers_mut().psr |= PSR_I;
        let outcome = cpu.step(&mut mem).expect("interrupt then NOP at handler");
        assert!(outcome.interrupt_taken);
        assert_eq!(outcome.pc, 0x6040);
        assert_eq!(mem.read32(0x7FF8), 0x1001);
        assert_eq!(cpu.registers().psr & PSR_I, 0);
    }

    #[test]
    fn nmi_ignores_the_enable_bit_and_is_taken_once() {
        let (mut cpu, mut mem) = with_table();
        cpu.request_nmi();
        let outcome = cpu.step(&mut mem).expect("NMI");
        assert!(outcome.interrupt_taken);
        assert_eq!(outcome.pc, 0x6044);
        let outcome = cpu.step(&mut mem).expect("next");
        assert!(!outcome.interrupt_taken);
    }

    #[test]
    fn wait_halts_until_an_interrupt() {
        let (mut cpu, mut mem) = with_table();
        mem.load(0x1000, &[0xB2]);
        cpu.registers_mut().psr |= PSR_I;
        cpu.step(&mut mem).expect("WAIT");
        assert!(cpu.waiting());
        assert_eq!(cpu.registers().pc, 0x1001);

        let idle = cpu.step(&mut mem).expect("idle");
        assert!(idle.waiting);
        assert_eq!(idle.cycles, 0);

        cpu.set_interrupt_line(true);
        let woken = cpu.step(&mut mem).expect("interrupt");
        assert!(woken.interrupt_taken);
        assert!(!cpu.waiting());
        assert_eq!(mem.read32(0x7FF8), 0x1001);
    }

    #[test]
    fn trace_bit_traps_after_each_instruction() {
        let (mut cpu, mut mem) = with_table();
        mem.load(0x1000, &[0xA2]);
        cpu.registers_mut().psr |= PSR_T;
        let outcome = cpu.step(&mut mem).expect("NOP");
        assert_eq!(outcome.trap, Some(crate::Trap::Trc));
        assert_eq!(cpu.registers().pc, 0x6040 + 9 * 4);
        assert_eq!(mem.read32(0x7FF8), 0x1001);
        assert_eq!(cpu.registers().psr & PSR_T, 0);
    }
}
