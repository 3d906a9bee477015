// Error types for grammar generation and interpretation.
//
// Parameter errors abort the whole generation or interpretation pass;
// a bad argument is never silently defaulted. Structural faults during
// interpretation (unbalanced `]`, degenerate segments) are handled
// locally in `turtle.rs` and never surface as errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArborError {
    /// A parenthesized argument was neither a numeric literal nor a
    /// recognized named constant.
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    /// A `(` was opened after a symbol but never closed.
    #[error("unterminated parameter list starting at byte {at}")]
    UnterminatedParameter { at: usize },

    /// An empty `()` argument list.
    #[error("empty parameter list at byte {at}")]
    EmptyParameter { at: usize },
}
