//! Notifier selection for the binary.

use cater_notify::{HttpNotifier, Notification, Notifier, NotifierConfig, NotifyError, RecordingNotifier};

/// The HTTP client when a notification service is configured, otherwise a
/// dry-run recorder whose notifications are only logged.
#[derive(Debug, Clone)]
pub enum CliNotifier {
    Http(HttpNotifier),
    DryRun(RecordingNotifier),
}

impl CliNotifier {
    /// Pick a notifier from `CATER_NOTIFY_URL` / `CATER_NOTIFY_TOKEN`.
    pub fn from_env() -> anyhow::Result<Self> {
        match NotifierConfig::from_env()? {
            Some(config) => {
                tracing::debug!(?config, "notifications go to the HTTP service");
                Ok(Self::Http(HttpNotifier::new(&config)?))
            }
            None => {
                tracing::debug!("CATER_NOTIFY_URL unset; notifications are dry-run");
                Ok(Self::DryRun(RecordingNotifier::new()))
            }
        }
    }
}

impl Notifier for CliNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        match self {
            Self::Http(http) => http.send(notification).await,
            Self::DryRun(recorder) => {
                tracing::info!(
                    invoice_id = %notification.invoice_id,
                    kind = %notification.kind,
                    recipient = %notification.recipient,
                    "dry-run notification"
                );
                recorder.send(notification).await
            }
        }
    }
}
