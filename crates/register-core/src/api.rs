//! Public host-facing contracts for embedding the register processor core.

use crate::Trap;

/// Address the core starts fetching from after reset.
pub const DEFAULT_BOOT_PC: u32 = 0;

/// Cycles charged per dispatched instruction unless configured otherwise.
pub const DEFAULT_CYCLES_PER_INSTRUCTION: u32 = 1;

/// Immutable configuration for a core instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterConfig {
    /// `pc` loaded by reset.
    pub boot_pc: u32,
    /// Flat cost of one dispatch; a repeated string unit counts as one dispatch.
    pub cycles_per_instruction: u32,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            boot_pc: DEFAULT_BOOT_PC,
            cycles_per_instruction: DEFAULT_CYCLES_PER_INSTRUCTION,
        }
    }
}

/// Result of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepOutcome {
    /// Address of the dispatched instruction.
    pub pc: u32,
    /// First four instruction bytes, little-endian.
    pub opcode: u32,
    /// Cycles charged; zero while the core idles in `WAIT`.
    pub cycles: u32,
    /// Trap raised by the instruction and already dispatched.
    pub trap: Option<Trap>,
    /// Set when an interrupt was serviced before the fetch.
    pub interrupt_taken: bool,
    /// Set when the core is halted in `WAIT` and nothing was executed.
    pub waiting: bool,
}

/// Reason a run call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStop {
    /// The cycle budget was consumed.
    BudgetExhausted,
    /// A trace sink requested a stop before executing the instruction at `pc`.
    Break {
        /// Address of the instruction that was not executed.
        pc: u32,
    },
    /// The core halted in `WAIT` with no serviceable interrupt.
    Waiting,
}

/// Aggregated outcome of a budgeted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunOutcome {
    /// Cycles consumed; the last instruction may overshoot the budget.
    pub cycles: u32,
    /// Dispatches executed, including those that trapped.
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
        pc: u32,
        /// First four instruction bytes, little-endian.
        opcode: u32,
    },
    /// An external interrupt was accepted.
    InterruptServiced {
        /// Address saved for the return.
        return_pc: u32,
    },
    /// An instruction raised a trap and control moved to its handler.
    TrapTaken {
        /// The trap.
        trap: Trap,
        /// Address saved for the return.
        return_pc: u32,
    },
    /// An instruction finished.
    InstructionRetired {
        /// Fetch address of the retired instruction.
        pc: u32,
        /// Cycles charged.
        cycles: u32,
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
