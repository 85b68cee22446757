//! Process-wide fan-out of the `notifications` Postgres channel.
//!
//! One background task holds a dedicated listener connection (outside the
//! pool) and rebroadcasts each payload, the customer's user id, to every
//! open unread-count stream. Streams end when [`NotificationFeed::close`]
//! is called at shutdown.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::db::notifications::CHANNEL;

const CHANNEL_CAPACITY: usize = 256;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Shared sender side; clones feed the same subscribers.
#[derive(Clone)]
pub struct NotificationFeed {
    sender: broadcast::Sender<String>,
    closed: Arc<watch::Sender<bool>>,
}

/// One stream's view of the feed.
pub struct Subscription {
    pub payloads: broadcast::Receiver<String>,
    pub closed: watch::Receiver<bool>,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationFeed {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (closed, _) = watch::channel(false);
        Self {
            sender,
            closed: Arc::new(closed),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            payloads: self.sender.subscribe(),
            closed: self.closed.subscribe(),
        }
    }

    /// Send a payload to current subscribers. Returns how many received it.
    pub fn publish(&self, payload: &str) -> usize {
        self.sender.send(payload.to_owned()).unwrap_or(0)
    }

    /// End every open stream and stop the listener task.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Spawn the listener task on its own connection to `database_url`.
    ///
    /// Lost connections are retried every few seconds until the feed closes.
    pub fn spawn_listener(&self, database_url: &SecretString) -> JoinHandle<()> {
        let feed = self.clone();
        let url = database_url.expose_secret().to_owned();
        tokio::spawn(async move {
            let mut closed = feed.closed.subscribe();
            while !feed.is_closed() {
                tokio::select! {
                    result = feed.relay(&url) => {
                        if let Err(e) = result {
                            tracing::warn!(error = %e, "Notification listener failed, reconnecting");
                        }
                    }
                    () = wait_closed(&mut closed) => break,
                }
                tokio::select! {
                    () = tokio::time::sleep(RECONNECT_DELAY) => {}
                    () = wait_closed(&mut closed) => break,
                }
            }
            tracing::debug!("Notification listener stopped");
        })
    }

    async fn relay(&self, url: &str) -> Result<(), sqlx::Error> {
        let mut listener = PgListener::connect(url).await?;
        listener.listen(CHANNEL).await?;
        tracing::info!(channel = CHANNEL, "Listening for notifications");
        loop {
            let notification = listener.recv().await?;
            self.publish(notification.payload());
        }
    }
}

/// Resolves once the feed is closed or dropped.
pub async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|c| *c).await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let feed = NotificationFeed::new();
        let mut first = feed.subscribe();
        let mut second = feed.clone().subscribe();

        assert_eq!(feed.publish("3f0c1a9e"), 2);
        assert_eq!(first.payloads.recv().await.unwrap(), "3f0c1a9e");
        assert_eq!(second.payloads.recv().await.unwrap(), "3f0c1a9e");
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        assert_eq!(NotificationFeed::new().publish("3f0c1a9e"), 0);
    }

    #[tokio::test]
    async fn test_close_wakes_subscribers() {
        let feed = NotificationFeed::new();
        let mut sub = feed.subscribe();
        assert!(!feed.is_closed());

        feed.close();
        wait_closed(&mut sub.closed).await;
        assert!(feed.is_closed());
        assert!(*sub.closed.borrow());
    }
}
