//! Error channel threaded through visitor callbacks.

use crate::token::Token;

/// Errors raised while transforming the IR.
///
/// Syntax errors are recoverable at the compiler boundary (formatted with
/// source coordinates there); internal errors are invariant violations that
/// terminate compilation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IrError {
    #[error("{message}")]
    Syntax { message: String, token: Token },

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl IrError {
    pub fn syntax(message: impl Into<String>, token: Token) -> Self {
        Self::Syntax {
            message: message.into(),
            token,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

pub type IrResult<T> = std::result::Result<T, IrError>;
