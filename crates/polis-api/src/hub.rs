//! In-process fan-out of notification events to connected clients.

use polis_core::notification::{Notification, PushEvent};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{trace, warn};
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;

/// Publishes [`PushEvent`]s to every live [`Subscription`].
#[derive(Debug, Clone)]
pub struct NotificationHub {
  tx: broadcast::Sender<PushEvent>,
}

impl Default for NotificationHub {
  fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}

impl NotificationHub {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  pub fn publish(&self, event: PushEvent) {
    let user_id = event.notification().user_id;
    match self.tx.send(event) {
      Ok(n) => trace!(%user_id, receivers = n, "notification event published"),
      Err(_) => trace!(%user_id, "notification event dropped; no subscribers"),
    }
  }

  pub fn inserted(&self, notification: Notification) {
    self.publish(PushEvent::Inserted(notification));
  }

  pub fn updated(&self, notification: Notification) {
    self.publish(PushEvent::Updated(notification));
  }

  /// Receive events for `user_id` only. Dropping the subscription
  /// unsubscribes.
  pub fn subscribe(&self, user_id: Uuid) -> Subscription {
    Subscription { user_id, rx: self.tx.subscribe() }
  }

  pub fn subscriber_count(&self) -> usize { self.tx.receiver_count() }
}

#[derive(Debug)]
pub struct Subscription {
  user_id: Uuid,
  rx:      broadcast::Receiver<PushEvent>,
}

impl Subscription {
  /// The next event addressed to this subscriber, or `None` once the hub is
  /// gone. A lagging subscriber skips what it missed; clients refetch on
  /// reconnect anyway.
  pub async fn recv(&mut self) -> Option<PushEvent> {
    loop {
      match self.rx.recv().await {
        Ok(event) if event.notification().user_id == self.user_id => return Some(event),
        Ok(_) => continue,
        Err(RecvError::Lagged(skipped)) => {
          warn!(user_id = %self.user_id, skipped, "notification subscriber lagged");
        }
        Err(RecvError::Closed) => return None,
      }
    }
  }
}
