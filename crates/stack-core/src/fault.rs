use thiserror::Error;

/// Failure reported by a host port adapter.
///
/// Port failures never abort the interpreter: the core logs them and falls
/// back to the last pin values latched for that port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum PortError {
    /// No device is attached to the port.
    #[error("no device bound to port")]
    Unbound,
    /// The attached device could not complete the transfer.
    #[error("port device failed")]
    DeviceFailed,
}

/// Conditions that abort the interpreter loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StackError {
    /// Square-root step of the iterative ALU step family; the core has no model for it.
    #[error("unimplemented square-root step {word:#06x} at {pc:#06x}")]
    UnimplementedStep {
        /// Word address of the offending instruction.
        pc: u16,
        /// Raw instruction word.
        word: u16,
    },
}

impl StackError {
    /// Address of the instruction that caused the abort.
    #[must_use]
    pub const fn pc(self) -> u16 {
        match self {
            Self::UnimplementedStep { pc, .. } => pc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PortError, StackError};

    #[test]
    fn unimplemented_step_message_names_word_and_address() {
        let err = StackError::UnimplementedStep {
            pc: 0x1002,
            word: 0x858E,
        };
        assert_eq!(
            err.to_string(),
            "unimplemented square-root step 0x858e at 0x1002"
        );
        assert_eq!(err.pc(), 0x1002);
    }

    #[test]
    fn port_errors_render_distinct_messages() {
        assert_ne!(
            PortError::Unbound.to_string(),
            PortError::DeviceFailed.to_string()
        );
    }
}
