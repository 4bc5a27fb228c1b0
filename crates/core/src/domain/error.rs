// Function Error Types (caller-visible)

use serde::Serialize;
use thiserror::Error;

/// Error returned to the host dispatcher from a function call.
///
/// Argument, execution and cancellation failures are attributed to an
/// argument position so the host can point at the offending input.
/// Execution messages never carry raw OS error text.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FuncError {
    #[error("Invalid value for argument {position}: {message}")]
    Argument { position: usize, message: String },

    #[error("{message}")]
    Execution { position: usize, message: String },

    #[error("Result construction failed: {message}")]
    ResultConstruction { message: String },

    #[error("{message}")]
    Cancelled { position: usize, message: String },
}

impl FuncError {
    pub fn argument(position: usize, message: impl Into<String>) -> Self {
        Self::Argument {
            position,
            message: message.into(),
        }
    }

    pub fn execution(position: usize, message: impl Into<String>) -> Self {
        Self::Execution {
            position,
            message: message.into(),
        }
    }

    pub fn result_construction(message: impl Into<String>) -> Self {
        Self::ResultConstruction {
            message: message.into(),
        }
    }

    pub fn cancelled(position: usize, message: impl Into<String>) -> Self {
        Self::Cancelled {
            position,
            message: message.into(),
        }
    }

    /// Argument position this error is attributed to, if any
    pub fn argument_position(&self) -> Option<usize> {
        match self {
            FuncError::Argument { position, .. }
            | FuncError::Execution { position, .. }
            | FuncError::Cancelled { position, .. } => Some(*position),
            FuncError::ResultConstruction { .. } => None,
        }
    }

    pub fn is_argument_error(&self) -> bool {
        matches!(self, FuncError::Argument { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FuncError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_position() {
        assert_eq!(FuncError::argument(0, "bad").argument_position(), Some(0));
        assert_eq!(FuncError::execution(0, "boom").argument_position(), Some(0));
        assert_eq!(FuncError::cancelled(0, "stop").argument_position(), Some(0));
        assert_eq!(
            FuncError::result_construction("shape").argument_position(),
            None
        );
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let err = FuncError::execution(0, "Error running Python script: x");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["kind"], "execution");
        assert_eq!(json["position"], 0);
        assert_eq!(json["message"], "Error running Python script: x");
    }
}
