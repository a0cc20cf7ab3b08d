use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::PushMessage;
use tokio::sync::mpsc::UnboundedSender;

/// Live push connections keyed by account id. At most one connection per
/// account; registering again replaces the previous handle. Delivery is
/// best-effort: a closed channel drops the entry and reports not-delivered.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, UnboundedSender<PushMessage>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, account_id: &str, sender: UnboundedSender<PushMessage>) {
        self.guard().insert(account_id.to_string(), sender);
    }

    /// Removes the account's connection, but only if it is still the given
    /// handle. A connection that was already replaced stays registered.
    pub fn unregister(&self, account_id: &str, sender: &UnboundedSender<PushMessage>) {
        let mut connections = self.guard();
        if connections
            .get(account_id)
            .is_some_and(|current| current.same_channel(sender))
        {
            connections.remove(account_id);
        }
    }

    pub fn try_send(&self, account_id: &str, message: PushMessage) -> bool {
        let mut connections = self.guard();
        let Some(sender) = connections.get(account_id) else {
            return false;
        };

        if sender.send(message).is_err() {
            connections.remove(account_id);
            return false;
        }

        true
    }

    pub fn connected_count(&self) -> usize {
        self.guard().len()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, UnboundedSender<PushMessage>>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
