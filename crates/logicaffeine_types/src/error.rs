//! Error types for the type inference engine.
//!
//! Every fallible operation in this crate aborts the whole inference on
//! failure ("no partial results are returned"), so `InferenceError`
//! is a plain, non-recoverable enum rather than something designed for
//! fine-grained recovery.

use std::fmt;

use logicaffeine_base::Span;

/// A fatal error raised during graph construction, merging, or solving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// `Intersect` found two incompatible types at the endpoints of one edge.
    TypeConflict { message: String, span: Span },
    /// The merger could not find a schema for a predicate not defined locally.
    UnresolvedPredicate { predicate_name: String, span: Span },
    /// The builder encountered an AST shape not covered by the construction rules.
    UnsupportedConstruct { description: String, span: Span },
}

impl InferenceError {
    pub fn span(&self) -> Span {
        match self {
            InferenceError::TypeConflict { span, .. } => *span,
            InferenceError::UnresolvedPredicate { span, .. } => *span,
            InferenceError::UnsupportedConstruct { span, .. } => *span,
        }
    }
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = self.span();
        match self {
            InferenceError::TypeConflict { message, .. } => {
                write!(f, "{message} at {}..{}", span.start, span.end)
            }
            InferenceError::UnresolvedPredicate { predicate_name, .. } => {
                write!(
                    f,
                    "unresolved predicate '{predicate_name}' at {}..{}",
                    span.start, span.end
                )
            }
            InferenceError::UnsupportedConstruct { description, .. } => {
                write!(
                    f,
                    "unsupported construct: {description} at {}..{}",
                    span.start, span.end
                )
            }
        }
    }
}

impl std::error::Error for InferenceError {}
