//! Control transfer: subroutine and module calls, frames, jumps and loops.

use tracing::debug;

use crate::decode::{ControlOp, ImpliedOp, RegisterListOp, UnaryOp};
use crate::encoding::Width;
use crate::operand::GenOperand;
use crate::state::PSR_F;
use crate::{RegisterBus, RegisterCpu, Trap, ADDRESS_MASK};

use super::{Fault, Fetch, Next};

impl RegisterCpu {
    pub(super) fn execute_control(
        &mut self,
        bus: &mut dyn RegisterBus,
        fetch: &Fetch,
        op: ControlOp,
        displacement: i32,
    ) -> Result<Next, Fault> {
        match op {
            ControlOp::Bsr => {
                self.push32(bus, fetch.next_pc);
                Ok(Next::Jump(fetch.relative(displacement)))
            }
            ControlOp::Ret => {
                let target = self.pop32(bus);
                self.adjust_sp(displacement);
                Ok(Next::Jump(target))
            }
            ControlOp::Cxp => {
                let link_table = bus.read32(u32::from(self.regs.mod_).wrapping_add(4) & ADDRESS_MASK);
                let entry = link_table.wrapping_add_signed(displacement.wrapping_mul(4));
                let descriptor = bus.read32(entry & ADDRESS_MASK);
                Ok(Next::Jump(self.call_external(bus, fetch, descriptor)))
            }
            ControlOp::Rxp => {
                let target = self.pop32(bus);
                let module = self.pop32(bus);
                self.enter_module(bus, (module & 0xFFFF) as u16);
                self.adjust_sp(displacement);
                Ok(Next::Jump(target))
            }
            ControlOp::Rett => {
                self.require_supervisor()?;
                let target = self.return_from_trap(bus);
                self.adjust_sp(displacement);
                Ok(Next::Jump(target))
            }
        }
    }

    pub(super) fn execute_implied(
        &mut self,
        bus: &mut dyn RegisterBus,
        fetch: &Fetch,
        op: ImpliedOp,
    ) -> Result<Next, Fault> {
        match op {
            ImpliedOp::Reti => {
                self.require_supervisor()?;
                Ok(Next::Jump(self.return_from_trap(bus)))
            }
            ImpliedOp::Nop => Ok(Next::Sequential),
            ImpliedOp::Wait => {
                self.waiting = true;
                debug!(pc = fetch.pc, "waiting for interrupt");
                Ok(Next::Sequential)
            }
            ImpliedOp::Dia => Ok(Next::Jump(fetch.pc)),
            ImpliedOp::Flag if self.regs.flag(PSR_F) => Err(Trap::Flg.into()),
            ImpliedOp::Flag => Ok(Next::Sequential),
            ImpliedOp::Svc => Err(Trap::Svc.into()),
            ImpliedOp::Bpt => Err(Trap::Bpt.into()),
        }
    }

    /// `SAVE` and `ENTER` push R0 first; `RESTORE` and `EXIT` read mask bit 0 as R7.
    pub(super) fn execute_register_list(
        &mut self,
        bus: &mut dyn RegisterBus,
        op: RegisterListOp,
        mask: u8,
        displacement: i32,
    ) {
        match op {
            RegisterListOp::Save => self.save_registers(bus, mask),
            RegisterListOp::Restore => self.restore_registers(bus, mask),
            RegisterListOp::Enter => {
                self.push32(bus, self.regs.fp);
                self.regs.fp = self.regs.sp();
                self.adjust_sp(displacement.wrapping_neg());
                self.save_registers(bus, mask);
            }
            RegisterListOp::Exit => {
                self.restore_registers(bus, mask);
                self.regs.set_sp(self.regs.fp);
                self.regs.fp = self.pop32(bus);
            }
        }
    }

    pub(super) fn execute_unary(
        &mut self,
        bus: &mut dyn RegisterBus,
        fetch: &Fetch,
        op: UnaryOp,
        width: Width,
        operand: GenOperand,
    ) -> Result<Next, Fault> {
        match op {
            UnaryOp::Cxpd => {
                let addr = self.effective_address(bus, fetch, operand)?;
                let descriptor = bus.read32(addr);
                Ok(Next::Jump(self.call_external(bus, fetch, descriptor)))
            }
            UnaryOp::Bicpsr | UnaryOp::Bispsr => {
                if width != Width::Byte {
                    self.require_supervisor()?;
                }
                let bits = (self.read_operand(bus, fetch, operand, width)? & width.mask()) as u16;
                if op == UnaryOp::Bicpsr {
                    self.regs.psr &= !bits;
                } else {
                    self.regs.psr |= bits;
                }
                Ok(Next::Sequential)
            }
            UnaryOp::Jump => Ok(Next::Jump(self.effective_address(bus, fetch, operand)?)),
            UnaryOp::Adjsp => {
                let amount = width.sign_extend(self.read_operand(bus, fetch, operand, width)?);
                self.adjust_sp(amount.wrapping_neg());
                Ok(Next::Sequential)
            }
            UnaryOp::Jsr => {
                let target = self.effective_address(bus, fetch, operand)?;
                self.push32(bus, fetch.next_pc);
                Ok(Next::Jump(target))
            }
            UnaryOp::Case => {
                let index = width.sign_extend(self.read_operand(bus, fetch, operand, width)?);
                Ok(Next::Jump(fetch.relative(index)))
            }
        }
    }

    /// `ACB`: adds the increment to the index and branches while it is non-zero.
    pub(super) fn execute_acb(
        &mut self,
        bus: &mut dyn RegisterBus,
        fetch: &Fetch,
        width: Width,
        increment: i32,
        index: GenOperand,
        displacement: i32,
    ) -> Result<Next, Fault> {
        let loc = self.locate(bus, fetch, index)?;
        let value = self.read(bus, loc, width).wrapping_add(increment as u32) & width.mask();
        self.write(bus, loc, width, value)?;
        Ok(if value == 0 {
            Next::Sequential
        } else {
            Next::Jump(fetch.relative(displacement))
        })
    }

    /// Pushes MOD and the return address, then enters the module named by `descriptor`.
    fn call_external(&mut self, bus: &mut dyn RegisterBus, fetch: &Fetch, descriptor: u32) -> u32 {
        self.push32(bus, u32::from(self.regs.mod_));
        self.push32(bus, fetch.next_pc);
        self.enter_descriptor(bus, descriptor)
    }

    /// Loads MOD and SB from a procedure descriptor and returns its entry address.
    pub(super) fn enter_descriptor(&mut self, bus: &mut dyn RegisterBus, descriptor: u32) -> u32 {
        self.enter_module(bus, (descriptor & 0xFFFF) as u16);
        let program_base = bus.read32(u32::from(self.regs.mod_).wrapping_add(8) & ADDRESS_MASK);
        program_base.wrapping_add(descriptor >> 16) & ADDRESS_MASK
    }

    fn enter_module(&mut self, bus: &mut dyn RegisterBus, module: u16) {
        self.regs.mod_ = module;
        self.regs.sb = bus.read32(u32::from(module));
    }

    /// Pops the return address, then MOD and PSR saved by a trap.
    fn return_from_trap(&mut self, bus: &mut dyn RegisterBus) -> u32 {
        let target = self.pop32(bus);
        let saved = self.pop32(bus);
        self.regs.psr = (saved >> 16) as u16;
        self.enter_module(bus, (saved & 0xFFFF) as u16);
        debug!(target, psr = self.regs.psr, "return from trap");
        target
    }

    fn save_registers(&mut self, bus: &mut dyn RegisterBus, mask: u8) {
        for reg in 0..8 {
            if mask & (1 << reg) != 0 {
                self.push32(bus, self.regs.r[reg]);
            }
        }
    }

    fn restore_registers(&mut self, bus: &mut dyn RegisterBus, mask: u8) {
        for bit in 0..8 {
            if mask & (1 << bit) != 0 {
                self.regs.r[7 - bit] = self.pop32(bus);
            }
        }
    }

    const fn adjust_sp(&mut self, amount: i32) {
        let sp = self.regs.sp().wrapping_add_signed(amount);
        self.regs.set_sp(sp);
    }
}
