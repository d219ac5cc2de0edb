//! Compiler diagnostics: collection, severity, and rendering.
//!
//! Passes report recoverable problems here; warnings never affect the
//! result tree, and the pipeline aborts at the first error.

mod message;
mod printer;

#[cfg(test)]
mod tests;

use kestrel_ir::Token;

pub use message::{RelatedInfo, Severity};
pub use printer::DiagnosticsPrinter;

use message::DiagnosticMessage;

/// Collection of diagnostic messages from parsing and analysis.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<DiagnosticMessage>,
}

/// Builder for constructing a diagnostic message.
#[must_use = "diagnostic not emitted, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: DiagnosticMessage,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, msg: impl Into<String>, token: Token) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: DiagnosticMessage::error(token, msg),
        }
    }

    pub fn warning(&mut self, msg: impl Into<String>, token: Token) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: DiagnosticMessage::warning(token, msg),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.is_error())
    }

    pub fn has_warnings(&self) -> bool {
        self.messages.iter().any(|d| d.is_warning())
    }

    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.messages.iter().filter(|d| d.is_warning()).count()
    }

    /// Token of the first error, for boundary formatting.
    pub fn first_error_token(&self) -> Option<Token> {
        self.messages.iter().find(|d| d.is_error()).map(|d| d.token)
    }

    pub fn first_error_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|d| d.is_error())
            .map(|d| d.message.as_str())
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }
}

impl<'a> DiagnosticBuilder<'a> {
    pub fn related_to(mut self, msg: impl Into<String>, token: Token) -> Self {
        self.message.related.push(RelatedInfo::new(token, msg));
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}
