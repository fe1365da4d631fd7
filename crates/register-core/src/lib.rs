//! Instruction interpreter for a 32-bit general-register CISC processor.
//!
//! The core owns its register file and interrupt latches; memory lives
//! behind the host-provided [`RegisterBus`]. Architectural traps are
//! dispatched through the in-memory interrupt table and never surface as
//! Rust errors; [`CoreError`] is reserved for behavior the interpreter
//! does not model.

/// 24-bit little-endian bus contract and a flat backing store.
pub mod memory;
pub use memory::{FlatMemory, RegisterBus, ADDRESS_MASK, ADDRESS_SPACE_BYTES};

/// Public host-facing API contract and integration types.
pub mod api;
pub use api::{
    RegisterConfig, RunOutcome, RunStop, StepOutcome, TraceControl, TraceEvent, TraceSink,
    DEFAULT_BOOT_PC, DEFAULT_CYCLES_PER_INSTRUCTION,
};

/// Register file and processor status bits.
pub mod state;
pub use state::RegisterFile;

/// Format table, opcode fields, operand widths and condition codes.
pub mod encoding;
pub use encoding::{format_of, Condition, Opcode, Width, FORMAT_TABLE};

/// Displacement codec and general addressing-mode operands.
pub mod operand;
pub use operand::{decode_displacement, encode_displacement, gen_size, Base, GenOperand};

/// Instruction decoder shared by execution and disassembly.
pub mod decode;
pub use decode::{decode, Decoded, Instruction};

/// Traps and interpreter aborts.
pub mod fault;
pub use fault::{CoreError, Trap};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{
    add_with_carry, divide, subtract_with_borrow, ArithResult, DivideOp, RegisterCpu,
    PREFETCH_BYTES,
};

/// Assembler-syntax disassembler.
pub mod disasm;
pub use disasm::{disassemble, Disassembly, Flow, CONFIG_NAMES};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
