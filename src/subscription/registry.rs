//! Module `registry`
//!
//! Tracks which transactions currently have an open result subscription so a
//! second session for the same transaction is refused while the first lives.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

use crate::submission::TransactionId;

/// Shared set of transactions with a live session
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    watching: Arc<Mutex<HashSet<TransactionId>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `tx` for a new session.
    ///
    /// # Returns
    /// A guard releasing the claim when dropped, or `None` if a session for
    /// `tx` is already open.
    pub fn try_register(&self, tx: &TransactionId) -> Option<RegistrationGuard> {
        let mut watching = self.lock();
        if !watching.insert(tx.clone()) {
            return None;
        }
        debug!("Registered result session for {}", tx);
        Some(RegistrationGuard {
            registry: self.clone(),
            tx: tx.clone(),
        })
    }

    /// Checks whether a session for `tx` is currently open.
    pub fn is_watching(&self, tx: &TransactionId) -> bool {
        self.lock().contains(tx)
    }

    /// Number of open sessions
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn release(&self, tx: &TransactionId) {
        self.lock().remove(tx);
        debug!("Released result session for {}", tx);
    }

    // A panic while holding the lock cannot leave the set half-updated
    fn lock(&self) -> MutexGuard<'_, HashSet<TransactionId>> {
        self.watching
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Claim on one transaction, released on drop
#[derive(Debug)]
pub struct RegistrationGuard {
    registry: SessionRegistry,
    tx: TransactionId,
}

impl RegistrationGuard {
    pub fn transaction_id(&self) -> &TransactionId {
        &self.tx
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.registry.release(&self.tx);
    }
}
