use thiserror::Error;

/// Architectural traps and interrupts, each dispatched through the interrupt table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Trap {
    /// Maskable (vectored) interrupt.
    #[error("maskable interrupt")]
    Nvi,
    /// Non-maskable interrupt.
    #[error("non-maskable interrupt")]
    Nmi,
    /// Memory management abort.
    #[error("abort")]
    Abt,
    /// Floating-point unit trap.
    #[error("floating-point trap")]
    Fpu,
    /// Privileged instruction in user mode, or an illegal operand.
    #[error("illegal operation")]
    Ill,
    /// Supervisor call.
    #[error("supervisor call")]
    Svc,
    /// Integer division by zero.
    #[error("divide by zero")]
    Dvz,
    /// `FLAG` executed with the F flag set.
    #[error("flag trap")]
    Flg,
    /// Breakpoint.
    #[error("breakpoint")]
    Bpt,
    /// Single-step trace.
    #[error("trace trap")]
    Trc,
    /// Undefined instruction or addressing mode.
    #[error("undefined instruction")]
    Und,
}

impl Trap {
    /// Every trap in vector order.
    pub const ALL: [Self; 11] = [
        Self::Nvi,
        Self::Nmi,
        Self::Abt,
        Self::Fpu,
        Self::Ill,
        Self::Svc,
        Self::Dvz,
        Self::Flg,
        Self::Bpt,
        Self::Trc,
        Self::Und,
    ];

    /// Index of the trap's descriptor in the interrupt table.
    #[must_use]
    pub const fn vector(self) -> u32 {
        match self {
            Self::Nvi => 0,
            Self::Nmi => 1,
            Self::Abt => 2,
            Self::Fpu => 3,
            Self::Ill => 4,
            Self::Svc => 5,
            Self::Dvz => 6,
            Self::Flg => 7,
            Self::Bpt => 8,
            Self::Trc => 9,
            Self::Und => 10,
        }
    }

    /// Inverse of [`Trap::vector`].
    #[must_use]
    pub const fn from_vector(vector: u32) -> Option<Self> {
        if vector < Self::ALL.len() as u32 {
            Some(Self::ALL[vector as usize])
        } else {
            None
        }
    }

    /// Returns `true` for external interrupts, which return to the next instruction.
    #[must_use]
    pub const fn is_interrupt(self) -> bool {
        matches!(self, Self::Nvi | Self::Nmi)
    }
}

/// Conditions that abort the interpreter instead of trapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CoreError {
    /// A defined instruction the interpreter has no model for.
    #[error("unimplemented instruction {opcode:#08x} at {pc:#08x}")]
    Unimplemented {
        /// Address of the instruction.
        pc: u32,
        /// First three opcode bytes, little-endian.
        opcode: u32,
    },
    /// Scaled-index addressing (modes 28..=31) is not modelled.
    #[error("scaled-index addressing mode {mode} at {pc:#08x}")]
    ScaledIndexUnimplemented {
        /// Address of the instruction.
        pc: u32,
        /// General addressing mode field.
        mode: u8,
    },
}

impl CoreError {
    /// Address of the instruction that caused the abort.
    #[must_use]
    pub const fn pc(self) -> u32 {
        match self {
            Self::Unimplemented { pc, .. } | Self::ScaledIndexUnimplemented { pc, .. } => pc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreError, Trap};

    #[test]
    fn vectors_round_trip_in_table_order() {
        for (index, trap) in Trap::ALL.iter().enumerate() {
            assert_eq!(trap.vector(), index as u32);
            assert_eq!(Trap::from_vector(index as u32), Some(*trap));
        }
        assert_eq!(Trap::from_vector(11), None);
    }

    #[test]
    fn only_external_sources_count_as_interrupts() {
        assert!(Trap::Nvi.is_interrupt());
        assert!(Trap::Nmi.is_interrupt());
        assert!(!Trap::Svc.is_interrupt());
    }

    #[test]
    fn messages_name_address() {
        let err = CoreError::ScaledIndexUnimplemented {
            pc: 0x2000,
            mode: 28,
        };
        assert_eq!(err.to_string(), "scaled-index addressing mode 28 at 0x002000");
        assert_eq!(err.pc(), 0x2000);

        let err = CoreError::Unimplemented {
            pc: 0x10,
            opcode: 0x0004CE,
        };
        assert_eq!(err.to_string(), "unimplemented instruction 0x0004ce at 0x000010");
    }
}
