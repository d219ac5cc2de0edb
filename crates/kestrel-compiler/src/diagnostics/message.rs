//! Diagnostic message types.

use kestrel_ir::Token;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Related location information for a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub(crate) token: Token,
    pub(crate) message: String,
}

impl RelatedInfo {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        Self {
            token,
            message: message.into(),
        }
    }
}

/// A diagnostic anchored to the token that provoked it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DiagnosticMessage {
    pub(crate) severity: Severity,
    pub(crate) token: Token,
    pub(crate) message: String,
    pub(crate) related: Vec<RelatedInfo>,
}

impl DiagnosticMessage {
    pub(crate) fn error(token: Token, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            token,
            message: message.into(),
            related: Vec::new(),
        }
    }

    pub(crate) fn warning(token: Token, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            token,
            message: message.into(),
            related: Vec::new(),
        }
    }

    pub(crate) fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub(crate) fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl std::fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}: {}",
            self.severity,
            self.token.start,
            self.token.finish(),
            self.message
        )?;
        for related in &self.related {
            write!(
                f,
                " (related: {} at {}..{})",
                related.message,
                related.token.start,
                related.token.finish()
            )?;
        }
        Ok(())
    }
}
