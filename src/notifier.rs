use crate::activity::ActivityEvent;
use crate::balance::{BalanceChange, format_native};
use crate::error::NotifyError;
use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Activity {
        address: Address,
        event: ActivityEvent,
    },
    BalanceChanged(BalanceChange),
}

/// Delivers notifications to whoever owns the tracked address.
///
/// A failed delivery is logged by the caller and never blocks persistence or
/// the cursor.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, owner_id: i64, notification: &Notification)
    -> Result<(), NotifyError>;
}

/// Writes every notification to the log.
pub struct LogNotifier {
    native_symbol: String,
}

impl LogNotifier {
    pub fn new(native_symbol: impl Into<String>) -> Self {
        Self {
            native_symbol: native_symbol.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        owner_id: i64,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        match notification {
            Notification::Activity { address, event } => {
                info!("[owner {}] {:?}: {}", owner_id, address, event);
            }
            Notification::BalanceChanged(change) => {
                info!(
                    "[owner {}] {:?} balance {} -> {} {} ({})",
                    owner_id,
                    change.address,
                    format_native(change.previous),
                    format_native(change.current),
                    self.native_symbol,
                    change.delta()
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub owner_id: i64,
    pub notification: Notification,
}

/// Hands notifications to another task, typically a bot or web front-end.
#[derive(Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Delivery>,
}

impl ChannelNotifier {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Delivery>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(
        &self,
        owner_id: i64,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        self.tx
            .send(Delivery {
                owner_id,
                notification: notification.clone(),
            })
            .await
            .map_err(|_| NotifyError::DeliveryFailed("notification receiver dropped".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, U256, address};

    fn activity() -> Notification {
        Notification::Activity {
            address: address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
            event: ActivityEvent::ContractDeployment {
                tx_hash: B256::repeat_byte(7),
                new_contract: address!("cccccccccccccccccccccccccccccccccccccccc"),
                deployer: address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
                block: 3,
                gas_used: 100_000,
            },
        }
    }

    #[tokio::test]
    async fn channel_notifier_forwards_owner_and_payload() {
        let (notifier, mut rx) = ChannelNotifier::new(4);
        notifier.notify(9, &activity()).await.unwrap();

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.owner_id, 9);
        assert_eq!(delivery.notification, activity());
    }

    #[tokio::test]
    async fn channel_notifier_fails_once_receiver_is_gone() {
        let (notifier, rx) = ChannelNotifier::new(1);
        drop(rx);

        let err = notifier.notify(1, &activity()).await.unwrap_err();
        assert!(matches!(err, NotifyError::DeliveryFailed(_)));
    }

    #[test]
    fn notifications_serialize_with_type_tag() {
        let change = Notification::BalanceChanged(BalanceChange {
            address: Address::ZERO,
            previous: U256::from(1u64),
            current: U256::from(2u64),
            block: 5,
        });
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "balance_changed");
        assert_eq!(json["block"], 5);

        let json = serde_json::to_value(activity()).unwrap();
        assert_eq!(json["type"], "activity");
        assert_eq!(json["event"]["kind"], "contract_deployment");
    }
}
