//! Best-effort direct messages, delivered off the interaction path.

use std::sync::Arc;

use {
    serenity::all::UserId,
    tokio::{sync::mpsc, task::JoinHandle},
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use crate::platform::Platform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: UserId,
    pub content: String,
}

impl Notification {
    #[must_use]
    pub fn new(recipient: UserId, content: impl Into<String>) -> Self {
        Self {
            recipient,
            content: content.into(),
        }
    }
}

/// Producer half. Cheap to clone; pushing never blocks.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<Notification>,
}

pub struct NotificationReceiver {
    rx: mpsc::UnboundedReceiver<Notification>,
}

#[must_use]
pub fn notification_queue() -> (NotificationQueue, NotificationReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NotificationQueue { tx }, NotificationReceiver { rx })
}

impl NotificationQueue {
    pub fn push(&self, notification: Notification) {
        if let Err(e) = self.tx.send(notification) {
            warn!(recipient = %e.0.recipient, "notification worker stopped, dropping message");
        }
    }
}

impl NotificationReceiver {
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Next queued notification, without waiting.
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}

/// Drain the queue until it closes or `cancel` fires. Delivery failures
/// (closed DMs, unknown users) are logged and never retried.
pub fn spawn_delivery(
    mut receiver: NotificationReceiver,
    platform: Arc<dyn Platform>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("notification delivery cancelled");
                    break;
                }
                next = receiver.recv() => {
                    let Some(notification) = next else {
                        debug!("notification queue closed");
                        break;
                    };
                    deliver(platform.as_ref(), &notification).await;
                }
            }
        }
    })
}

async fn deliver(platform: &dyn Platform, notification: &Notification) {
    match platform
        .send_direct_message(notification.recipient, &notification.content)
        .await
    {
        Ok(()) => debug!(recipient = %notification.recipient, "notification delivered"),
        Err(e) => warn!(
            recipient = %notification.recipient,
            error = %e,
            "failed to deliver notification"
        ),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::testing::FakePlatform};

    #[tokio::test]
    async fn delivers_in_order_and_survives_failures() {
        let fake = Arc::new(FakePlatform::new());
        fake.fail_dm_to(UserId::new(2));
        let (queue, receiver) = notification_queue();
        let cancel = CancellationToken::new();
        let handle = spawn_delivery(receiver, fake.clone(), cancel.clone());

        queue.push(Notification::new(UserId::new(1), "first"));
        queue.push(Notification::new(UserId::new(2), "blocked"));
        queue.push(Notification::new(UserId::new(3), "third"));
        drop(queue);
        handle.await.unwrap();

        assert_eq!(fake.dms(), vec![
            (UserId::new(1), "first".to_string()),
            (UserId::new(3), "third".to_string()),
        ]);
    }

    #[tokio::test]
    async fn cancellation_stops_the_worker() {
        let fake = Arc::new(FakePlatform::new());
        let (queue, receiver) = notification_queue();
        let cancel = CancellationToken::new();
        let handle = spawn_delivery(receiver, fake.clone(), cancel.clone());

        cancel.cancel();
        handle.await.unwrap();

        // Pushing after shutdown is harmless.
        queue.push(Notification::new(UserId::new(1), "late"));
        assert!(fake.dms().is_empty());
    }
}
