//! Application services and ports.

#![forbid(unsafe_code)]

mod backend_ports;
mod dashboard_service;
mod issue_service;
mod load_test_service;
mod notice_board;
mod optimistic_controller;
mod permission_resolver;
mod profile_service;
mod project_service;
mod session_service;
mod team_service;

#[cfg(test)]
mod test_support;

pub use backend_ports::{
    AttachmentRepository, AuthGateway, AuthSession, BlobStorage, BugQuery, BugRepository,
    LoadTestEventStream, LoadTestGateway, NewAttachment, PermissionPolicyRepository,
    ProfileUpsert, ProjectRepository, Registration, UserDirectory, UserRepository,
};
pub use dashboard_service::{DashboardService, DashboardStats};
pub use issue_service::{IssueService, UploadFile};
pub use load_test_service::{
    CHART_CAPACITY, CHART_LABEL, ChartPoint, LoadTestMonitor, LoadTestService,
};
pub use notice_board::{Notice, NoticeBoard, NoticeKind};
pub use optimistic_controller::{
    CollectionRecord, LocalCollection, MutationLabels, MutationOutcome, OptimisticController,
    RecordChange,
};
pub use permission_resolver::PermissionResolver;
pub use profile_service::ProfileService;
pub use project_service::ProjectService;
pub use session_service::{SessionContext, SessionEvent, SessionService};
pub use team_service::TeamService;
