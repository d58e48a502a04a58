//! Optimistic mutations over local record collections.
//!
//! A mutation takes the record's lock, snapshots the collection, applies the
//! local change, then issues exactly one remote call. On failure the snapshot
//! is restored and an error notice is posted. Errors never leave the
//! controller; callers receive a [`MutationOutcome`].

mod collection;

use std::future::{self, Future};

use bugtrack_core::{AppError, AppResult};
use tracing::{info, warn};

use crate::NoticeBoard;

pub use collection::{CollectionRecord, LocalCollection, RecordChange};

/// Notice texts for one mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationLabels {
    success: Option<String>,
    failure_prefix: String,
}

impl MutationLabels {
    /// Creates labels posting `"<failure_prefix>: <server message>"` on revert.
    #[must_use]
    pub fn new(failure_prefix: impl Into<String>) -> Self {
        Self {
            success: None,
            failure_prefix: failure_prefix.into(),
        }
    }

    /// Adds a notice posted once the backend accepted the change.
    #[must_use]
    pub fn with_success(mut self, message: impl Into<String>) -> Self {
        self.success = Some(message.into());
        self
    }

    fn failure_message(&self, error: &AppError) -> String {
        format!("{}: {}", self.failure_prefix, error.message())
    }
}

/// How an optimistic mutation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The remote call succeeded and the local change stands.
    Committed,
    /// The remote call failed and the local change was undone.
    Reverted {
        /// Notice text shown to the user.
        message: String,
    },
    /// Nothing was applied and nothing was sent.
    Rejected {
        /// Reason for the refusal.
        error: AppError,
    },
}

impl MutationOutcome {
    /// Returns whether the change was persisted.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Runs optimistic mutations and reports their outcome as notices.
#[derive(Clone, Default)]
pub struct OptimisticController {
    notices: NoticeBoard,
}

impl OptimisticController {
    /// Creates a controller posting to `notices`.
    #[must_use]
    pub fn new(notices: NoticeBoard) -> Self {
        Self { notices }
    }

    /// Returns the board this controller posts to.
    #[must_use]
    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Refuses a mutation before anything is applied.
    pub fn reject(&self, error: AppError) -> MutationOutcome {
        self.notices.error(error.message());
        MutationOutcome::Rejected { error }
    }

    /// Runs a non-optimistic remote call, e.g. an insert whose id the backend assigns.
    ///
    /// Returns `None` after posting the failure notice.
    pub async fn persist<V, F>(&self, labels: MutationLabels, remote: F) -> Option<V>
    where
        F: Future<Output = AppResult<V>>,
    {
        match remote.await {
            Ok(value) => {
                if let Some(message) = labels.success {
                    self.notices.success(message);
                }
                Some(value)
            }
            Err(error) => {
                warn!(error = %error, "remote write failed");
                self.notices.error(labels.failure_message(&error));
                None
            }
        }
    }

    /// Applies `plan` to the record at `key` locally, then runs `remote`.
    ///
    /// `plan` sees the current record and decides the local change; `remote`
    /// receives that change and performs the single backend call.
    pub async fn execute<T, P, R, F>(
        &self,
        collection: &LocalCollection<T>,
        key: T::Key,
        labels: MutationLabels,
        plan: P,
        remote: R,
    ) -> MutationOutcome
    where
        T: CollectionRecord,
        P: FnOnce(&T) -> AppResult<RecordChange<T>>,
        R: FnOnce(RecordChange<T>) -> F,
        F: Future<Output = AppResult<()>>,
    {
        self.execute_guarded(collection, key, labels, future::ready(Ok(())), plan, remote)
            .await
    }

    /// Like [`Self::execute`], with a precondition checked under the record lock.
    ///
    /// A failing precondition leaves the collection untouched and skips the
    /// remote call.
    pub async fn execute_guarded<T, G, P, R, F>(
        &self,
        collection: &LocalCollection<T>,
        key: T::Key,
        labels: MutationLabels,
        precondition: G,
        plan: P,
        remote: R,
    ) -> MutationOutcome
    where
        T: CollectionRecord,
        G: Future<Output = AppResult<()>>,
        P: FnOnce(&T) -> AppResult<RecordChange<T>>,
        R: FnOnce(RecordChange<T>) -> F,
        F: Future<Output = AppResult<()>>,
    {
        let _lease = collection.lock_record(&key).await;

        if let Err(error) = precondition.await {
            return self.reject(error);
        }

        let Some(current) = collection.get(&key) else {
            return self.reject(AppError::NotFound(format!("record '{key}' is not loaded")));
        };

        let change = match plan(&current) {
            Ok(change) => change,
            Err(error) => return self.reject(error),
        };

        let applied = match collection.apply(&key, change.clone()) {
            Ok(applied) => applied,
            Err(error) => return self.reject(error),
        };

        match remote(change).await {
            Ok(()) => {
                info!(record = %key, "optimistic mutation committed");
                if let Some(message) = labels.success {
                    self.notices.success(message);
                }
                MutationOutcome::Committed
            }
            Err(error) => {
                warn!(record = %key, error = %error, "optimistic mutation reverted");
                collection.revert(&key, applied);
                let message = labels.failure_message(&error);
                self.notices.error(message.clone());
                MutationOutcome::Reverted { message }
            }
        }
    }
}
