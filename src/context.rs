use crate::chain::ChainReader;
use crate::error::NotifyError;
use crate::metadata::TokenMetadataResolver;
use crate::notifier::{Notification, Notifier};
use crate::store::ActivityStore;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handles shared by every scanner and by the dispatcher.
#[derive(Clone)]
pub struct TrackerContext {
    pub chain: Arc<dyn ChainReader>,
    pub store: Arc<dyn ActivityStore>,
    pub notifier: Arc<dyn Notifier>,
    pub metadata: Arc<TokenMetadataResolver>,
    pub notify_timeout: Duration,
}

impl TrackerContext {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        store: Arc<dyn ActivityStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let metadata = Arc::new(TokenMetadataResolver::new(chain.clone()));
        Self {
            chain,
            store,
            notifier,
            metadata,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    pub fn with_notify_timeout(mut self, notify_timeout: Duration) -> Self {
        self.notify_timeout = notify_timeout;
        self
    }

    /// Delivers one notification, giving up after `notify_timeout`. A stalled
    /// consumer surfaces as `DeliveryFailed` like any other delivery error.
    pub async fn notify(
        &self,
        owner_id: i64,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        match tokio::time::timeout(
            self.notify_timeout,
            self.notifier.notify(owner_id, notification),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(NotifyError::DeliveryFailed(format!(
                "no delivery within {:?}",
                self.notify_timeout
            ))),
        }
    }
}
