//! Test error types.

use thiserror::Error;

/// A [`Raiser`](crate::Raiser) was called more times than it has errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("raiser for {path} exhausted after {raised} exception(s)")]
pub struct RaiserExhausted {
    /// Path of the substituted callable.
    pub path: String,
    /// Number of scripted errors already returned.
    pub raised: usize,
}
