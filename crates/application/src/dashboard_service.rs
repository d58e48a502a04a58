use std::sync::Arc;

use bugtrack_core::AppResult;
use bugtrack_domain::BugStatus;
use tracing::error;

use crate::BugRepository;

/// Bug counts shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    /// Every bug.
    pub total: u64,
    /// Bugs in `Open`.
    pub open: u64,
    /// Bugs in `In Progress`.
    pub in_progress: u64,
    /// Bugs in `Closed` or `Resolved`.
    pub closed: u64,
}

/// Read-only bug statistics.
#[derive(Clone)]
pub struct DashboardService {
    bugs: Arc<dyn BugRepository>,
}

impl DashboardService {
    /// Creates a new dashboard service.
    #[must_use]
    pub fn new(bugs: Arc<dyn BugRepository>) -> Self {
        Self { bugs }
    }

    /// Counts bugs per status group. Failed counts read as zero.
    pub async fn stats(&self) -> DashboardStats {
        let (total, open, in_progress, closed) = tokio::join!(
            self.bugs.count_bugs(&[]),
            self.bugs.count_bugs(&[BugStatus::Open]),
            self.bugs.count_bugs(&[BugStatus::InProgress]),
            self.bugs.count_bugs(&[BugStatus::Closed, BugStatus::Resolved]),
        );

        DashboardStats {
            total: or_zero("total", total),
            open: or_zero("open", open),
            in_progress: or_zero("in_progress", in_progress),
            closed: or_zero("closed", closed),
        }
    }
}

fn or_zero(group: &'static str, count: AppResult<u64>) -> u64 {
    count.unwrap_or_else(|count_error| {
        error!(group, error = %count_error, "failed to count bugs");
        0
    })
}
