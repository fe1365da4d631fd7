/// Architectural register file of the stack processor.
///
/// `t` and `n` are the top two data-stack cells and `i` the top return-stack
/// cell; deeper cells live in the stack memories below `k` and `j`. Both
/// pointers decrement on push and increment before the read on pop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StackRegisters {
    /// Program counter (word address).
    pub pc: u16,
    /// Top of data stack, the ALU accumulator.
    pub t: u16,
    /// Second data-stack cell.
    pub n: u16,
    /// Top of return stack and loop counter.
    pub i: u16,
    /// Return-stack pointer.
    pub j: u8,
    /// Data-stack pointer.
    pub k: u8,
    /// Multiply/divide auxiliary register.
    pub md: u16,
    /// Square-root auxiliary register.
    pub sr: u16,
    /// ALU carry flag.
    pub carry: bool,
}

impl StackRegisters {
    /// Register file as left by reset: everything zero except `pc`.
    #[must_use]
    pub const fn at_boot(pc: u16) -> Self {
        Self {
            pc,
            t: 0,
            n: 0,
            i: 0,
            j: 0,
            k: 0,
            md: 0,
            sr: 0,
            carry: false,
        }
    }

    /// Packed stack pointers with `k` in the high byte.
    #[must_use]
    pub const fn jk(&self) -> u16 {
        ((self.k as u16) << 8) | self.j as u16
    }

    /// Unpacks a `jk` value: high byte to `k`, low byte to `j`.
    pub const fn set_jk(&mut self, value: u16) {
        self.k = (value >> 8) as u8;
        self.j = (value & 0x00FF) as u8;
    }

    /// Return address saved by CALL: `pc` with carry in bit 15.
    #[must_use]
    pub const fn return_link(&self) -> u16 {
        self.pc | ((self.carry as u16) << 15)
    }
}

#[cfg(test)]
mod tests {
    use super::StackRegisters;

    #[test]
    fn boot_state_zeroes_everything_but_pc() {
        let regs = StackRegisters::at_boot(0x1000);
        assert_eq!(
            regs,
            StackRegisters {
                pc: 0x1000,
                ..StackRegisters::default()
            }
        );
    }

    // Byte order was once recorded the other way round; K is the high byte.
    #[test]
    fn jk_packs_k_in_high_byte() {
        let mut regs = StackRegisters::default();
        regs.set_jk(0x12FE);
        assert_eq!(regs.k, 0x12);
        assert_eq!(regs.j, 0xFE);
        assert_eq!(regs.jk(), 0x12FE);
    }

    #[test]
    fn return_link_carries_flag_in_bit_15() {
        let regs = StackRegisters {
            pc: 0x0123,
            carry: true,
            ..StackRegisters::default()
        };
        assert_eq!(regs.return_link(), 0x8123);
    }
}
