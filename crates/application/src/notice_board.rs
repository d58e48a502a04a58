//! Transient user-visible notices.
//!
//! Every failure path of a mutating operation ends here instead of returning
//! an error to the caller. Notices expire after a fixed time to live.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Severity class of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    /// The operation was persisted.
    Success,
    /// Something is degraded but usable.
    Warning,
    /// The operation failed or was refused.
    Error,
}

impl NoticeKind {
    /// Returns a stable label for rendering.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One auto-expiring notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity class.
    pub kind: NoticeKind,
    /// Text shown to the user.
    pub message: String,
    /// Instant after which the notice is no longer shown.
    pub expires_at: Instant,
}

/// Shared board of active notices.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    time_to_live: Duration,
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl NoticeBoard {
    /// Default visibility window of a notice.
    pub const DEFAULT_TIME_TO_LIVE: Duration = Duration::from_millis(3000);

    /// Creates an empty board.
    #[must_use]
    pub fn new(time_to_live: Duration) -> Self {
        Self {
            time_to_live,
            notices: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Posts a success notice.
    pub fn success(&self, message: impl Into<String>) {
        self.post(NoticeKind::Success, message.into());
    }

    /// Posts a warning notice.
    pub fn warning(&self, message: impl Into<String>) {
        self.post(NoticeKind::Warning, message.into());
    }

    /// Posts an error notice.
    pub fn error(&self, message: impl Into<String>) {
        self.post(NoticeKind::Error, message.into());
    }

    /// Returns notices that have not expired yet, oldest first.
    #[must_use]
    pub fn active(&self) -> Vec<Notice> {
        let now = Instant::now();
        let mut notices = self.lock();
        notices.retain(|notice| notice.expires_at > now);
        notices.clone()
    }

    /// Returns the most recent active notice.
    #[must_use]
    pub fn latest(&self) -> Option<Notice> {
        self.active().pop()
    }

    /// Removes and returns every notice, expired or not.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.lock())
    }

    fn post(&self, kind: NoticeKind, message: String) {
        match kind {
            NoticeKind::Success => info!(kind = kind.as_str(), message = %message, "notice"),
            NoticeKind::Warning | NoticeKind::Error => {
                warn!(kind = kind.as_str(), message = %message, "notice");
            }
        }

        let expires_at = Instant::now() + self.time_to_live;
        self.lock().push(Notice {
            kind,
            message,
            expires_at,
        });
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notice>> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIME_TO_LIVE)
    }
}
