//! Background notification delivery.
//!
//! Services enqueue onto an unbounded channel and return immediately; a single
//! dispatcher task drains it and hands each message to the configured
//! [`Notifier`]. Delivery failures are logged and dropped.

use async_trait::async_trait;
use skyride_core::{CoreError, CoreResult, Notification, NotificationSink, Notifier, Template};
use skyride_shared::Masked;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationQueue {
    /// Spawns the dispatcher. The task ends once every queue handle is dropped
    /// and the backlog is drained.
    pub fn start(notifier: Arc<dyn Notifier>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();

        let handle = tokio::spawn(async move {
            info!("Notification dispatcher started");
            while let Some(notification) = rx.recv().await {
                if let Err(e) = notifier.send(&notification).await {
                    error!(
                        reference = %notification.reference,
                        recipient = %Masked(notification.recipient.as_str()),
                        "Failed to deliver notification: {}", e
                    );
                }
            }
            info!("Notification dispatcher stopped");
        });

        (Self { tx }, handle)
    }
}

impl NotificationSink for NotificationQueue {
    fn enqueue(&self, notification: Notification) -> CoreResult<()> {
        self.tx
            .send(notification)
            .map_err(|_| CoreError::Infrastructure("Notification dispatcher is not running".to_string()))
    }
}

/// Writes each message to the log instead of delivering it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> CoreResult<()> {
        let (subject, _) = notification.render();
        info!(
            recipient = %Masked(notification.recipient.as_str()),
            reference = %notification.reference,
            "Notification: {}", subject
        );
        Ok(())
    }
}

/// Drops one plain-text file per message into an outbox directory.
pub struct FileNotifier {
    outbox_dir: PathBuf,
}

impl FileNotifier {
    pub fn new(outbox_dir: impl Into<PathBuf>) -> Self {
        Self {
            outbox_dir: outbox_dir.into(),
        }
    }

    pub fn path_for(&self, notification: &Notification) -> PathBuf {
        let prefix = match notification.template {
            Template::BookingConfirmation => "flight_booking_email",
            Template::RideCreated => "ride_created_email",
        };
        self.outbox_dir
            .join(format!("{}_{}.txt", prefix, notification.reference))
    }
}

#[async_trait]
impl Notifier for FileNotifier {
    async fn send(&self, notification: &Notification) -> CoreResult<()> {
        let (subject, body) = notification.render();
        let content = format!(
            "To: {}\nSubject: {}\n\n{}\n",
            notification.recipient, subject, body
        );

        let path = self.path_for(notification);
        tokio::fs::create_dir_all(&self.outbox_dir)
            .await
            .map_err(|e| CoreError::Infrastructure(e.to_string()))?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| CoreError::Infrastructure(e.to_string()))?;

        info!(path = %path.display(), "Notification written to outbox");
        Ok(())
    }
}
