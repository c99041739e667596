use std::fmt;

use crate::engine::NativeType;
use crate::tensor::OpKind;

/// Errors raised by strata tensors, layouts and engines.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrataError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("engine type {0} has no logical dtype")]
    UnsupportedNativeType(NativeType),

    #[error("{op} is not implemented for {operand}")]
    NotImplemented { op: OpKind, operand: String },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("engine error: {0}")]
    Engine(String),
}

/// Coarse error taxonomy callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotImplemented,
    UnsupportedConfiguration,
    Engine,
}

impl StrataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StrataError::InvalidArgument(_)
            | StrataError::ShapeMismatch { .. }
            | StrataError::InvalidLayout(_)
            | StrataError::UnsupportedNativeType(_) => ErrorKind::InvalidArgument,
            StrataError::NotImplemented { .. } => ErrorKind::NotImplemented,
            StrataError::Unsupported(_) => ErrorKind::UnsupportedConfiguration,
            StrataError::Engine(_) => ErrorKind::Engine,
        }
    }

    pub(crate) fn not_implemented(op: OpKind, operand: impl fmt::Display) -> Self {
        StrataError::NotImplemented {
            op,
            operand: operand.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            StrataError::ShapeMismatch { expected: vec![2], got: vec![3] }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(StrataError::InvalidLayout("opaque".into()).kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            StrataError::not_implemented(OpKind::Flatten, "tensor").kind(),
            ErrorKind::NotImplemented
        );
        assert_eq!(
            StrataError::Unsupported("strided".into()).kind(),
            ErrorKind::UnsupportedConfiguration
        );
    }

    #[test]
    fn test_messages() {
        let err = StrataError::not_implemented(OpKind::InPlaceAdd, "f64");
        assert_eq!(err.to_string(), "add_assign is not implemented for f64");

        let err = StrataError::ShapeMismatch { expected: vec![2], got: vec![3] };
        assert_eq!(err.to_string(), "shape mismatch: expected [2], got [3]");
    }
}
