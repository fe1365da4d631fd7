//! Instruction interpreter for a 16-bit two-stack Forth processor.
//!
//! The core owns its register file and port banks; program memory and the
//! two stack memories live behind the host-provided [`StackBus`].

/// Program and stack address spaces plus a flat backing store.
pub mod memory;
pub use memory::{
    read_u16_be, word_byte_address, write_u16_be, AddressSpace, FlatStackMemory,
    PROGRAM_SPACE_BYTES, STACK_SPACE_BYTES,
};

/// Public host-facing API contract and integration types.
pub mod api;
pub use api::{
    Port, RunOutcome, RunStop, StackBus, StackConfig, StepOutcome, TraceControl, TraceEvent,
    TraceSink, DEFAULT_BOOT_PC, DEFAULT_INTERRUPT_VECTOR,
};

/// Register file and parallel-port register banks.
pub mod state;
pub use state::{PortBank, StackRegisters, INTERRUPT_ENABLE};

/// Instruction word field layout and typed accessors.
pub mod encoding;
pub use encoding::{
    AluOp, Instruction, InstructionClass, LliOperation, ShiftOp, StepMode, YSource,
};

/// Error taxonomy for interpreter aborts and port adapters.
pub mod fault;
pub use fault::{PortError, StackError};

/// Per-class cycle costs.
pub mod timing;
pub use timing::{cycle_cost, CycleCostKind, CYCLE_COST_TABLE};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{evaluate_alu, AluResult, StackCpu};

/// Table-driven disassembler sharing the executor's field layout.
pub mod disasm;
pub use disasm::{
    disassemble, Disassembly, Flow, OpcodeEntry, Operand, OPCODE_TABLE, REGISTER_NAMES,
};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
