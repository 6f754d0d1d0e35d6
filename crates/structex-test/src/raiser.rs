//! Scripted raisers.

use std::collections::VecDeque;
use std::fmt;

use structex_core::Exception;

use crate::error::RaiserExhausted;

/// Yields a fixed sequence of errors, one per call.
///
/// Once the script is used up every further call yields
/// [`RaiserExhausted`].
pub struct Raiser {
    path: String,
    script: VecDeque<Exception>,
    raised: usize,
}

impl Raiser {
    /// Creates a raiser standing in for the callable at `path`.
    pub fn new<I, E>(path: impl Into<String>, exceptions: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Exception>,
    {
        Self {
            path: path.into(),
            script: exceptions.into_iter().map(Into::into).collect(),
            raised: 0,
        }
    }

    /// Returns the path this raiser stands in for.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the number of scripted errors not yet raised.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Returns the number of scripted errors already raised.
    pub fn raised(&self) -> usize {
        self.raised
    }

    /// Returns the next scripted error.
    pub fn raise(&mut self) -> Exception {
        match self.script.pop_front() {
            Some(exception) => {
                self.raised += 1;
                exception
            }
            None => {
                tracing::debug!(path = %self.path, raised = self.raised, "raiser exhausted");
                Box::new(RaiserExhausted {
                    path: self.path.clone(),
                    raised: self.raised,
                })
            }
        }
    }
}

impl fmt::Debug for Raiser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raiser")
            .field("path", &self.path)
            .field("remaining", &self.script.len())
            .field("raised", &self.raised)
            .finish()
    }
}
