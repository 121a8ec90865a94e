//! One-time initialization gate
//!
//! Every public engine operation passes through [`InitGate::ensure`] first.
//! Callers arriving before initialization has completed share one attempt;
//! once it succeeds the gate is open for good and later calls return at once.
//! A failed attempt is reported to everyone who waited on it and is not
//! remembered, so the next call tries again.

use crate::single_flight::SingleFlight;
use once_cell::sync::OnceCell;

/// Gate that opens after the first successful initialization
#[derive(Debug)]
pub struct InitGate<E> {
    done: OnceCell<()>,
    attempt: SingleFlight<(), Result<(), E>>,
}

impl<E: Clone> Default for InitGate<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> InitGate<E> {
    /// Create a closed gate
    pub fn new() -> Self {
        InitGate {
            done: OnceCell::new(),
            attempt: SingleFlight::new(),
        }
    }

    /// Run `init` unless the gate is already open; blocks while another caller's attempt runs
    pub fn ensure<F>(&self, init: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<(), E>,
    {
        if self.done.get().is_some() {
            return Ok(());
        }
        self.attempt.run(&(), || {
            if self.done.get().is_some() {
                return Ok(());
            }
            init()?;
            let _ = self.done.set(());
            Ok(())
        })
    }

    /// Whether initialization has succeeded
    pub fn is_open(&self) -> bool {
        self.done.get().is_some()
    }
}
