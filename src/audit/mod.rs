//! Change notification and the append-only audit trail.
//!
//! The engine hands every persisted mutation to an [`AuditPublisher`], which dispatches it
//! synchronously, in subscription order, to each [`AclChangeListener`]. The bundled
//! [`AuditRecorder`] turns events into [`AuditLogEntry`](crate::types::AuditLogEntry)
//! rows in an [`AuditLogStore`].

mod log;
mod recorder;

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::Result;
use crate::types::AclChangeEvent;

pub use log::{AuditLogStore, InMemoryAuditLogStore, JsonlAuditLogStore};
pub use recorder::{AuditRecorder, AuditTrail};

/// Receives change events after the store commit.
pub trait AclChangeListener: Send + Sync {
    fn on_change(&self, event: &AclChangeEvent) -> Result<()>;
}

impl<F> AclChangeListener for F
where
    F: Fn(&AclChangeEvent) -> Result<()> + Send + Sync,
{
    fn on_change(&self, event: &AclChangeEvent) -> Result<()> {
        self(event)
    }
}

#[derive(Default)]
pub struct AuditPublisher {
    listeners: RwLock<Vec<Arc<dyn AclChangeListener>>>,
}

impl fmt::Debug for AuditPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditPublisher")
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl AuditPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn AclChangeListener>) {
        self.listeners.write().push(listener);
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver `event` to every listener. A failing listener is logged and skipped;
    /// the mutation it describes has already been committed.
    pub fn publish(&self, event: &AclChangeEvent) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            if let Err(err) = listener.on_change(event) {
                tracing::warn!(
                    audit.operation = %event.operation,
                    audit.identity = %event.identity,
                    error = %err,
                    "acl change listener failed"
                );
            }
        }
    }
}
