//! In-memory notifier.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::NotifyError;
use crate::{Notification, Notifier};

#[derive(Debug, Default)]
struct Inner {
    sent: Vec<Notification>,
    fail_with: Option<String>,
    delay: Option<Duration>,
}

/// Records every notification instead of delivering it.
///
/// Clones share the same log. A forced failure or delay applies to every
/// subsequent send; a failed send is not recorded.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingNotifier {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.inner.lock().fail_with = Some(message.into());
    }

    /// Delay every subsequent send by `delay` before recording it.
    pub fn delay_by(&self, delay: Duration) {
        self.inner.lock().delay = Some(delay);
    }

    /// Clear any forced failure or delay.
    pub fn reset_faults(&self) {
        let mut inner = self.inner.lock();
        inner.fail_with = None;
        inner.delay = None;
    }

    /// Snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.inner.lock().sent.clone()
    }

    /// Number of notifications sent.
    pub fn len(&self) -> usize {
        self.inner.lock().sent.len()
    }

    /// Whether nothing has been sent.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let (delay, fail_with) = {
            let inner = self.inner.lock();
            (inner.delay, inner.fail_with.clone())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = fail_with {
            return Err(NotifyError::Other(message));
        }
        self.inner.lock().sent.push(notification.clone());
        Ok(())
    }
}
