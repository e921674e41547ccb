// src/fetch.rs

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::PayrollError;

/// Result of a fetch that may have been overtaken by a newer one.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Fresh(T),
    /// A newer fetch started after this one; its result must not be shown.
    Stale,
}

impl<T> FetchOutcome<T> {
    pub fn fresh(self) -> Option<T> {
        match self {
            FetchOutcome::Fresh(value) => Some(value),
            FetchOutcome::Stale => None,
        }
    }
}

/// Monotonic counter: every fetch takes a ticket, only the latest ticket is current.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    current: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket(u64);

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> GenerationTicket {
        GenerationTicket(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: GenerationTicket) -> bool {
        self.current.load(Ordering::SeqCst) == ticket.0
    }

    pub fn settle<T>(&self, ticket: GenerationTicket, value: T) -> FetchOutcome<T> {
        if self.is_current(ticket) {
            FetchOutcome::Fresh(value)
        } else {
            debug!("Discarding response for stale fetch generation {}", ticket.0);
            FetchOutcome::Stale
        }
    }
}

/// At most one run of a named action at a time.
#[derive(Debug, Clone)]
pub struct ActionGuard {
    name: &'static str,
    busy: Arc<AtomicBool>,
}

/// Held while the action runs; dropping it (on success, error or panic) frees the guard.
#[derive(Debug)]
pub struct ActionTicket {
    busy: Arc<AtomicBool>,
}

impl Drop for ActionTicket {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl ActionGuard {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn try_begin(&self) -> Result<ActionTicket, PayrollError> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| PayrollError::ActionInProgress(self.name))?;
        Ok(ActionTicket {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}
