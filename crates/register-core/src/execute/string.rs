//! String instructions, executed one element per dispatch.
//!
//! R0 holds the remaining element count, R1 the source and R2 the
//! destination address, R3 the translation table and R4 the match value.
//! The instruction re-dispatches itself until R0 reaches zero or the
//! match test stops it, so interrupts and traces land between elements.

use crate::decode::{StringMatch, StringOp, StringOptions};
use crate::encoding::Width;
use crate::state::PSR_F;
use crate::{RegisterBus, RegisterCpu, ADDRESS_MASK};

use super::{read_memory, write_memory, Fault, Fetch, Next};

impl RegisterCpu {
    pub(super) fn execute_string(
        &mut self,
        bus: &mut dyn RegisterBus,
        fetch: &Fetch,
        op: StringOp,
        width: Width,
        options: StringOptions,
    ) -> Result<Next, Fault> {
        if op != StringOp::Movs {
            return Err(fetch.unimplemented());
        }
        if self.regs.r[0] == 0 {
            return Ok(Next::Sequential);
        }

        let mut value = read_memory(bus, self.regs.r[1] & ADDRESS_MASK, width);
        if options.translate && width == Width::Byte {
            value = u32::from(bus.read8(self.regs.r[3].wrapping_add(value) & ADDRESS_MASK));
        }
        write_memory(bus, self.regs.r[2] & ADDRESS_MASK, width, value);

        let step = width.bytes();
        let advance = |addr: u32| {
            if options.backward {
                addr.wrapping_sub(step)
            } else {
                addr.wrapping_add(step)
            }
        };
        self.regs.r[0] -= 1;
        self.regs.r[1] = advance(self.regs.r[1]);
        self.regs.r[2] = advance(self.regs.r[2]);

        let reference = self.regs.r[4] & width.mask();
        let stop = match options.matching {
            StringMatch::None => false,
            StringMatch::While => value != reference,
            StringMatch::Until => value == reference,
        };
        self.regs.set_flag(PSR_F, stop);

        Ok(if stop || self.regs.r[0] == 0 {
            Next::Sequential
        } else {
            Next::Repeat
        })
    }
}
