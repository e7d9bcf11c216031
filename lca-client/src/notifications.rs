//! Notification polling and optimistic dismissal
//!
//! The displayed list lives in a `watch` channel (the board). It is replaced
//! wholesale by each successful fetch and edited locally by [`NotificationPoller::dismiss`].
//!
//! Fetches and dismissals are not serialized against each other. A fetch that
//! reads the server before a dismissal reaches it, and lands after the local
//! removal, shows the dismissed item again until the next fetch. The local
//! board is authoritative only until the next full poll.

use crate::backend::BackendClient;
use crate::session::Session;
use crate::task::PeriodicTask;
use futures::stream::{self, Stream};
use lca_common::api::{decode_object, NotificationsEnvelope};
use lca_common::Notification;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Polls the backend for notifications and owns the displayed list
#[derive(Clone)]
pub struct NotificationPoller {
    backend: BackendClient,
    session: Session,
    board: Arc<watch::Sender<Vec<Notification>>>,
    interval: Duration,
}

impl NotificationPoller {
    pub fn new(backend: BackendClient, session: Session, interval: Duration) -> Self {
        let (board, _) = watch::channel(Vec::new());
        Self {
            backend,
            session,
            board: Arc::new(board),
            interval,
        }
    }

    /// Start polling: one fetch now, then one per interval
    ///
    /// Returns `None` without polling when no credential is present. Once
    /// started, the loop keeps running if the credential is later cleared;
    /// the owner stops it through the returned handle.
    pub fn start(&self) -> Option<PeriodicTask> {
        if !self.session.is_authenticated() {
            debug!("No credential; notification polling not started");
            return None;
        }

        info!(interval_ms = self.interval.as_millis() as u64, "Notification polling started");
        let poller = self.clone();
        Some(PeriodicTask::spawn(
            "notification-poll",
            self.interval,
            move || {
                let poller = poller.clone();
                async move {
                    poller.fetch_latest().await;
                }
            },
        ))
    }

    /// Fetch once and replace the board if the payload is array-shaped
    ///
    /// Returns true when the board was replaced. Failures and odd shapes are
    /// logged; the previous list is kept.
    pub async fn fetch_latest(&self) -> bool {
        let credential = self.session.credential();
        let payload = match self.backend.latest_notifications(credential.as_ref()).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Notification fetch failed");
                return false;
            }
        };

        let Some(envelope) = decode_object::<NotificationsEnvelope>(payload) else {
            debug!("Notification payload is not an object; keeping list");
            return false;
        };

        match envelope.notifications {
            Value::Array(items) => {
                let list: Vec<Notification> =
                    items.into_iter().map(Notification::from_value).collect();
                debug!(count = list.len(), "Notifications fetched");
                self.board.send_replace(list);
                true
            }
            other => {
                debug!(kind = ?other, "Notifications field is not an array; keeping list");
                false
            }
        }
    }

    /// Snapshot of the displayed list
    pub fn notifications(&self) -> Vec<Notification> {
        self.board.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.board.subscribe()
    }

    /// Stream of list snapshots, starting with the current one
    pub fn updates(&self) -> impl Stream<Item = Vec<Notification>> + Send + 'static {
        let rx = self.board.subscribe();
        stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let snapshot = rx.borrow_and_update().clone();
            Some((snapshot, (rx, false)))
        })
    }

    /// Remove the entry at `index` now and tell the backend in the background
    ///
    /// The removal is final as far as this call is concerned: a failed
    /// backend call is only logged and never re-adds the entry. Returns `None`
    /// (and issues no request) when `index` is out of range.
    pub fn dismiss(&self, index: usize) -> Option<DismissTicket> {
        let mut removed = None;
        self.board.send_if_modified(|list| {
            if index < list.len() {
                removed = Some(list.remove(index));
                true
            } else {
                false
            }
        });

        let Some(notification) = removed else {
            debug!(index, "Dismiss index out of range");
            return None;
        };
        info!(index, timestamp = %notification.timestamp(), "Notification dismissed");

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let backend = self.backend.clone();
                let credential = self.session.credential();
                let timestamp = notification.timestamp().clone();
                Some(runtime.spawn(async move {
                    match backend
                        .dismiss_notification(&timestamp, credential.as_ref())
                        .await
                    {
                        Ok(ack) => {
                            debug!(
                                timestamp = %timestamp,
                                removed = ?ack.removed,
                                "Dismiss acknowledged"
                            );
                            true
                        }
                        Err(e) => {
                            warn!(timestamp = %timestamp, error = %e, "Dismiss not acknowledged");
                            false
                        }
                    }
                }))
            }
            Err(_) => {
                warn!("No runtime; dismissal not sent to backend");
                None
            }
        };

        Some(DismissTicket {
            notification,
            handle,
        })
    }
}

/// Receipt for an optimistic dismissal
///
/// Dropping the ticket detaches the backend call; it still runs.
pub struct DismissTicket {
    notification: Notification,
    handle: Option<JoinHandle<bool>>,
}

impl DismissTicket {
    /// The entry that was removed from the board
    pub fn notification(&self) -> &Notification {
        &self.notification
    }

    /// Wait for the backend call; true if it succeeded
    pub async fn acknowledged(self) -> bool {
        match self.handle {
            Some(handle) => handle.await.unwrap_or(false),
            None => false,
        }
    }
}
