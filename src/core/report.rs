//! Outcome of a batch operation over many modules or targets.

use crate::error::ModuleError;
use std::fmt;

/// Per-item results of a batch: every item is attempted, nothing is rolled back.
#[derive(Debug)]
pub struct BatchReport<E = ModuleError> {
    /// Items that completed, in the order they were attempted.
    pub succeeded: Vec<String>,
    /// Items that failed, with their error.
    pub failed: Vec<(String, E)>,
}

impl<E> Default for BatchReport<E> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<E> BatchReport<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for one item.
    pub fn record(&mut self, name: impl Into<String>, outcome: Result<(), E>) {
        match outcome {
            Ok(()) => self.succeeded.push(name.into()),
            Err(e) => self.failed.push((name.into(), e)),
        }
    }

    /// Move an item from the success list to the failure list. An item that
    /// already failed keeps its first error.
    pub(crate) fn demote(&mut self, name: &str, error: E) {
        self.succeeded.retain(|n| n != name);
        if self.failure(name).is_none() {
            self.failed.push((name.to_string(), error));
        }
    }

    /// True when no item failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The error recorded for `name`, if it failed.
    pub fn failure(&self, name: &str) -> Option<&E> {
        self.failed.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    pub fn failed_names(&self) -> impl Iterator<Item = &str> {
        self.failed.iter().map(|(n, _)| n.as_str())
    }
}

impl<E: fmt::Display> fmt::Display for BatchReport<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} succeeded, {} failed", self.succeeded.len(), self.failed.len())?;
        for (name, error) in &self.failed {
            write!(f, "\n  {name}: {error}")?;
        }
        Ok(())
    }
}
