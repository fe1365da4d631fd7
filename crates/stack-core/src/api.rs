//! Public host-facing contracts for embedding the stack processor core.

use crate::{AddressSpace, PortError};

/// Word address the core starts fetching from after reset.
pub const DEFAULT_BOOT_PC: u16 = 0x1000;

/// Word address of the interrupt service routine.
pub const DEFAULT_INTERRUPT_VECTOR: u16 = 0x0020;

/// Immutable configuration for a core instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StackConfig {
    /// `pc` loaded by reset.
    pub boot_pc: u16,
    /// `pc` loaded when an interrupt is serviced.
    pub interrupt_vector: u16,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            boot_pc: DEFAULT_BOOT_PC,
            interrupt_vector: DEFAULT_INTERRUPT_VECTOR,
        }
    }
}

/// Named parallel I/O port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Port {
    /// 16-bit B port.
    B,
    /// 5-bit X port.
    X,
}

impl Port {
    /// Pins physically present on the port.
    #[must_use]
    pub const fn pin_mask(self) -> u16 {
        match self {
            Self::B => 0xFFFF,
            Self::X => 0x001F,
        }
    }

    /// Short display name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::B => "B",
            Self::X => "X",
        }
    }
}

/// Memory and port contract consumed by the interpreter.
///
/// Addresses are byte addresses; the core only issues even addresses and
/// 16-bit transfers. Port hooks are optional: the default implementations
/// report [`PortError::Unbound`], which the core tolerates.
pub trait StackBus {
    /// Reads a word from `space`.
    fn read_word(&mut self, space: AddressSpace, addr: u32) -> u16;

    /// Writes a word to `space`.
    fn write_word(&mut self, space: AddressSpace, addr: u32, value: u16);

    /// Samples the input pins of `port`.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Unbound`] when no device is attached, or
    /// [`PortError::DeviceFailed`] when the device cannot answer.
    fn read_port(&mut self, _port: Port) -> Result<u16, PortError> {
        Err(PortError::Unbound)
    }

    /// Presents a new output latch value for `port`.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Unbound`] when no device is attached, or
    /// [`PortError::DeviceFailed`] when the device rejects the write.
    fn write_port(&mut self, _port: Port, _value: u16) -> Result<(), PortError> {
        Err(PortError::Unbound)
    }
}

/// Result of retiring one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepOutcome {
    /// Word address the instruction was fetched from.
    pub pc: u16,
    /// Raw instruction word.
    pub word: u16,
    /// Cycles charged for the instruction.
    pub cycles: u8,
    /// Set when an interrupt was serviced before the fetch.
    pub interrupt_taken: bool,
}

/// Reason a run call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStop {
    /// The cycle budget reached zero or below.
    BudgetExhausted,
    /// A trace sink requested a stop before executing the instruction at `pc`.
    Break {
        /// Address of the instruction that was not executed.
        pc: u16,
    },
}

/// Aggregated outcome of a budgeted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunOutcome {
    /// Cycles consumed; the last instruction may overshoot the budget.
    pub cycles: u32,
    /// Instructions retired.
    pub instructions: u32,
    /// Why the loop stopped.
    pub stop: RunStop,
}

/// Events emitted to a [`TraceSink`] while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    /// An instruction was fetched and is about to execute.
    InstructionFetch {
        /// Fetch address.
        pc: u16,
        /// Raw instruction word.
        word: u16,
    },
    /// A pending interrupt was accepted.
    InterruptServiced {
        /// Address pushed on the return stack.
        return_pc: u16,
    },
    /// An instruction finished.
    InstructionRetired {
        /// Fetch address of the retired instruction.
        pc: u16,
        /// Cycles charged.
        cycles: u8,
    },
}

/// Verdict returned by a trace sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TraceControl {
    /// Keep running.
    #[default]
    Continue,
    /// Stop the run loop; only honoured for [`TraceEvent::InstructionFetch`].
    Break,
}

/// Debugger and tracing hook.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent) -> TraceControl;
}

#[cfg(test)]
mod tests {
    use super::{Port, StackBus, StackConfig, DEFAULT_BOOT_PC, DEFAULT_INTERRUPT_VECTOR};
    use crate::{AddressSpace, PortError};

    struct Silent;

    impl StackBus for Silent {
        fn read_word(&mut self, _space: AddressSpace, _addr: u32) -> u16 {
            0
        }

        fn write_word(&mut self, _space: AddressSpace, _addr: u32, _value: u16) {}
    }

    #[test]
    fn default_config_matches_boot_contract() {
        let config = StackConfig::default();
        assert_eq!(config.boot_pc, DEFAULT_BOOT_PC);
        assert_eq!(config.boot_pc, 0x1000);
        assert_eq!(config.interrupt_vector, DEFAULT_INTERRUPT_VECTOR);
        assert_eq!(config.interrupt_vector, 0x0020);
    }

    #[test]
    fn ports_default_to_unbound() {
        let mut bus = Silent;
        assert_eq!(bus.read_port(Port::B), Err(PortError::Unbound));
        assert_eq!(bus.write_port(Port::X, 1), Err(PortError::Unbound));
    }

    #[test]
    fn pin_masks_match_port_widths() {
        assert_eq!(Port::B.pin_mask(), 0xFFFF);
        assert_eq!(Port::X.pin_mask(), 0x001F);
        assert_eq!(Port::X.name(), "X");
    }
}
