//! Register file and parallel-port register banks.

mod ports;
mod registers;

pub use ports::{PortBank, INTERRUPT_ENABLE};
pub use registers::StackRegisters;
