use std::fmt;
use std::sync::Arc;

use contracts::{Account, Notification, PushMessage};

use crate::registry::ConnectionRegistry;

#[derive(Debug)]
pub enum GatewayError {
    Unavailable(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(detail) => write!(f, "messaging gateway unavailable: {detail}"),
        }
    }
}

impl std::error::Error for GatewayError {}

/// Outbound text channel to an account, e.g. a Telegram bot adapter.
pub trait MessageGateway: Send + Sync {
    fn send_text(&self, account_id: &str, text: &str) -> Result<(), GatewayError>;
}

/// Default gateway that only logs, keeping the server usable without a
/// messaging backend.
#[derive(Debug, Default)]
pub struct LogGateway;

impl MessageGateway for LogGateway {
    fn send_text(&self, account_id: &str, text: &str) -> Result<(), GatewayError> {
        log::info!("[gateway] to {account_id}: {text}");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub targeted: usize,
    pub pushed: usize,
    pub messaged: usize,
    pub failed: usize,
}

/// Fans a notification out to accounts over the live push channel first and
/// the messaging gateway second. Delivery is best-effort; per-target
/// failures are logged and swallowed, never propagated.
pub struct NotificationDispatcher {
    registry: Arc<ConnectionRegistry>,
    gateway: Arc<dyn MessageGateway>,
}

impl NotificationDispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>, gateway: Arc<dyn MessageGateway>) -> Self {
        Self { registry, gateway }
    }

    /// Returns true when at least one channel accepted the notification.
    pub fn notify(&self, account_id: &str, notification: &Notification) -> bool {
        let pushed = self
            .registry
            .try_send(account_id, PushMessage::notification(account_id, notification));

        match self.gateway.send_text(account_id, &notification.message) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("[dispatch] gateway send to {account_id} failed: {err}");
                pushed
            }
        }
    }

    pub fn broadcast(
        &self,
        accounts: &[Account],
        notification: &Notification,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary {
            targeted: accounts.len(),
            ..DispatchSummary::default()
        };

        for account in accounts {
            if self.registry.try_send(
                &account.account_id,
                PushMessage::notification(&account.account_id, notification),
            ) {
                summary.pushed += 1;
            }

            match self
                .gateway
                .send_text(&account.account_id, &notification.message)
            {
                Ok(()) => summary.messaged += 1,
                Err(err) => {
                    summary.failed += 1;
                    log::warn!(
                        "[dispatch] gateway send to {} failed: {err}",
                        account.account_id
                    );
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use contracts::AccountProfile;
    use tokio::sync::mpsc;

    struct FailingGateway;

    impl MessageGateway for FailingGateway {
        fn send_text(&self, _account_id: &str, _text: &str) -> Result<(), GatewayError> {
            Err(GatewayError::Unavailable("test outage".to_string()))
        }
    }

    fn notification() -> Notification {
        Notification {
            message: "Server maintenance at noon".to_string(),
            important: true,
        }
    }

    #[test]
    fn notify_pushes_and_messages() {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = NotificationDispatcher::new(registry.clone(), Arc::new(LogGateway));
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("42", tx);

        assert!(dispatcher.notify("42", &notification()));
        let push = rx.try_recv().expect("push delivered");
        assert_eq!(push.message_type, "notification");
        assert_eq!(push.payload["important"], true);
    }

    #[test]
    fn gateway_outage_still_counts_the_push() {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = NotificationDispatcher::new(registry.clone(), Arc::new(FailingGateway));
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register("42", tx);

        assert!(dispatcher.notify("42", &notification()));
        assert!(!dispatcher.notify("offline", &notification()));
    }

    #[test]
    fn broadcast_tallies_per_channel_outcomes() {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = NotificationDispatcher::new(registry.clone(), Arc::new(FailingGateway));
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register("42", tx);

        let now = Utc::now();
        let accounts = vec![
            Account::new("42", AccountProfile::default(), now),
            Account::new("43", AccountProfile::default(), now),
        ];

        let summary = dispatcher.broadcast(&accounts, &notification());
        assert_eq!(summary.targeted, 2);
        assert_eq!(summary.pushed, 1);
        assert_eq!(summary.messaged, 0);
        assert_eq!(summary.failed, 2);
    }
}
