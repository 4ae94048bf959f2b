//! Batched delivery of article notifications to subscribers.
//!
//! Recipients are split into contiguous batches. All sends of a batch run
//! concurrently and the next batch only starts once every send of the
//! current one has settled and the pacing delay has elapsed. Failed sends
//! are logged and counted out, they are never retried.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use handlebars::RenderError;
use tracing::field::display;
use tracing::Span;

use crate::domain::{EmailAddress, NewArticle};
use crate::templates::{self, EmailMessage};

/// Something able to deliver one email to one address
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, recipient: &EmailAddress, message: &EmailMessage) -> anyhow::Result<()>;
}

/// Waits between two batches
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, delay: Duration);
}

/// Pacer backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Subscriber that will receive a notification
#[derive(Debug, Clone)]
pub struct Recipient {
    pub email: EmailAddress,
    pub display_name: String,
}

/// Kind of change that triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Publish,
    Update,
    Delete,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Publish => "publish",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Article change to announce, with the data its email template needs
#[derive(Debug, Clone)]
pub enum Notification {
    Published(NewArticle),
    Updated { title: String },
    Deleted { title: String },
}

/// One notification addressed to a list of recipients
#[derive(Debug, Clone)]
pub struct NotificationJob {
    notification: Notification,
    site_url: String,
    recipients: Vec<Recipient>,
}

impl NotificationJob {
    pub const fn new(
        notification: Notification,
        site_url: String,
        recipients: Vec<Recipient>,
    ) -> Self {
        Self {
            notification,
            site_url,
            recipients,
        }
    }

    pub const fn kind(&self) -> NotificationKind {
        match self.notification {
            Notification::Published(_) => NotificationKind::Publish,
            Notification::Updated { .. } => NotificationKind::Update,
            Notification::Deleted { .. } => NotificationKind::Delete,
        }
    }

    pub fn article_title(&self) -> &str {
        match &self.notification {
            Notification::Published(article) => article.title.as_ref(),
            Notification::Updated { title } | Notification::Deleted { title } => title,
        }
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Render the email for a single recipient
    pub fn render(&self, recipient: &Recipient) -> Result<EmailMessage, RenderError> {
        let name = &recipient.display_name;
        match &self.notification {
            Notification::Published(article) => {
                templates::article_published(name, article, &self.site_url)
            }
            Notification::Updated { title } => {
                templates::article_updated(name, title, &self.site_url)
            }
            Notification::Deleted { title } => {
                templates::article_removed(name, title, &self.site_url)
            }
        }
    }
}

/// Outcome of a dispatch. `sent <= attempted` always holds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DispatchResult {
    pub attempted: usize,
    pub sent: usize,
}

/// Batching and pacing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    pub batch_size: NonZeroUsize,
    pub inter_batch_delay: Duration,
}

impl DispatchSettings {
    pub const DEFAULT_BATCH_SIZE: usize = 100;
    pub const DEFAULT_INTER_BATCH_DELAY: Duration = Duration::from_millis(1000);
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(Self::DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            inter_batch_delay: Self::DEFAULT_INTER_BATCH_DELAY,
        }
    }
}

/// Bulk notification dispatcher, shared by the article handlers
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn EmailTransport>,
    pacer: Arc<dyn Pacer>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn EmailTransport>,
        pacer: Arc<dyn Pacer>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            transport,
            pacer,
            settings,
        }
    }

    /// Deliver a notification to all of its recipients
    #[tracing::instrument(
        name = "Dispatch article notification",
        skip_all,
        fields(
            kind = %job.kind(),
            article_title = %job.article_title(),
            attempted = job.recipients.len(),
            sent = tracing::field::Empty
        )
    )]
    pub async fn dispatch(&self, job: &NotificationJob) -> DispatchResult {
        let attempted = job.recipients.len();
        if attempted == 0 {
            tracing::info!("No subscribers to notify");
            Span::current().record("sent", 0);
            return DispatchResult::default();
        }

        let sent = AtomicUsize::new(0);
        let batch_size = self.settings.batch_size.get();
        let batch_count = attempted.div_ceil(batch_size);

        for (index, batch) in job.recipients.chunks(batch_size).enumerate() {
            // Wait for every send of the batch to settle, successful or not
            join_all(batch.iter().map(|recipient| self.deliver(job, recipient, &sent))).await;
            tracing::debug!(
                batch = index + 1,
                batch_count,
                sent = sent.load(Ordering::Relaxed),
                "Batch completed"
            );

            if index + 1 < batch_count {
                self.pacer.pause(self.settings.inter_batch_delay).await;
            }
        }

        let sent = sent.into_inner();
        Span::current().record("sent", display(sent));
        if sent == 0 {
            tracing::warn!("None of the notifications could be delivered");
        } else {
            tracing::info!("Notification delivered to {sent} of {attempted} subscribers");
        }

        DispatchResult { attempted, sent }
    }

    /// Send the notification to one recipient, counting successful deliveries
    ///
    /// An email that cannot be rendered counts as a failed send.
    async fn deliver(&self, job: &NotificationJob, recipient: &Recipient, sent: &AtomicUsize) {
        let message = match job.render(recipient) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Failed to render notification for subscriber {}", recipient.email
                );
                return;
            }
        };
        match self.transport.send(&recipient.email, &message).await {
            Ok(()) => {
                sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Failed to deliver notification to subscriber {}", recipient.email
                );
            }
        }
    }
}
