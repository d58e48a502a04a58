use std::path::Path;

use bugtrack_application::{
    BugQuery, DashboardService, IssueService, LoadTestService, MutationOutcome, NoticeBoard,
    OptimisticController, ProfileService, ProjectService, SessionContext, SessionService,
    TeamService, UploadFile, UserRepository,
};
use bugtrack_core::{AppError, AppResult};
use bugtrack_domain::{
    AttachmentId, BugDraft, BugId, BugPriority, BugStatus, Capability, LoadTestRequest,
    ProjectId, RoleName,
};
use clap::ArgMatches;

use crate::backend::Backends;
use crate::config::ClientConfig;

/// Services wired for one invocation.
pub(crate) struct Client {
    config: ClientConfig,
    backends: Backends,
    controller: OptimisticController,
}

impl Client {
    pub(crate) fn new(config: ClientConfig, backends: Backends, notices: NoticeBoard) -> Self {
        Self {
            config,
            backends,
            controller: OptimisticController::new(notices),
        }
    }

    fn sessions(&self) -> SessionService {
        SessionService::new(
            self.backends.auth.clone(),
            self.backends.users.clone(),
            self.backends.policies.clone(),
        )
    }

    fn team(&self) -> TeamService {
        TeamService::new(
            self.backends.users.clone(),
            self.backends.policies.clone(),
            self.controller.clone(),
        )
    }

    fn issues(&self) -> IssueService {
        IssueService::new(
            self.backends.bugs.clone(),
            self.backends.attachments.clone(),
            self.backends.storage.clone(),
            self.controller.clone(),
        )
    }

    fn profiles(&self) -> ProfileService {
        ProfileService::new(
            self.backends.users.clone(),
            self.backends.storage.clone(),
            self.controller.clone(),
        )
    }

    fn projects(&self) -> ProjectService {
        ProjectService::new(self.backends.projects.clone(), self.controller.clone())
    }

    async fn sign_in(&self) -> AppResult<SessionContext> {
        let credentials = self.config.credentials()?;
        self.sessions()
            .sign_in(credentials.email.as_str(), credentials.password.as_str())
            .await
    }

    pub(crate) async fn dispatch(&self, matches: &ArgMatches) -> AppResult<()> {
        match matches.subcommand() {
            Some(("sign-up", args)) => self.sign_up(args).await,
            Some(("reset-password", args)) => {
                self.sessions()
                    .request_password_reset(
                        text(args, "email")?,
                        args.get_one::<String>("redirect").map(String::as_str),
                    )
                    .await?;
                println!("Password reset email sent.");
                Ok(())
            }
            Some(("change-password", args)) => {
                let session = self.sign_in().await?;
                self.sessions()
                    .update_password(text(args, "password")?, text(args, "confirm")?)
                    .await?;
                println!("Password updated.");
                self.sessions().sign_out(session).await
            }
            Some(("whoami", _)) => self.whoami().await,
            Some(("profile", args)) => self.edit_profile(args).await,
            Some(("team", args)) => self.list_team(args).await,
            Some(("set-role", args)) => self.set_role(args).await,
            Some(("roles", _)) => {
                let team = self.team();
                team.load_roles().await;
                for policy in team.roles().iter() {
                    let granted: Vec<&str> = Capability::all()
                        .iter()
                        .filter(|capability| policy.allows(**capability))
                        .map(Capability::as_str)
                        .collect();
                    println!("{:<12} {}", policy.role().as_str(), granted.join(", "));
                }
                Ok(())
            }
            Some(("create-role", args)) => {
                let session = self.sign_in().await?;
                let team = self.team();
                team.load_roles().await;
                match team.create_role(&session, text(args, "role")?).await {
                    Some(_) => Ok(()),
                    None => Err(AppError::Validation("role was not created".to_owned())),
                }
            }
            Some(("toggle-permission", args)) => {
                let session = self.sign_in().await?;
                let role = RoleName::new(text(args, "role")?)?;
                let capability = text(args, "capability")?.parse::<Capability>()?;
                let team = self.team();
                team.load_roles().await;
                outcome(team.toggle_permission(&session, &role, capability).await)
            }
            Some(("delete-role", args)) => {
                let session = self.sign_in().await?;
                let role = RoleName::new(text(args, "role")?)?;
                let team = self.team();
                team.load_roles().await;
                outcome(team.delete_role(&session, &role).await)
            }
            Some(("bugs", args)) => self.list_bugs(args).await,
            Some(("save-bug", args)) => self.save_bug(args).await,
            Some(("set-status", args)) => {
                let session = self.sign_in().await?;
                let status = text(args, "status")?.parse::<BugStatus>()?;
                let issues = self.issues();
                issues.load(BugQuery::default()).await;
                outcome(
                    issues
                        .change_status(&session, bug_id(args, "bug")?, status)
                        .await,
                )
            }
            Some(("delete-bug", args)) => {
                let session = self.sign_in().await?;
                let issues = self.issues();
                issues.load(BugQuery::default()).await;
                outcome(issues.delete_bug(&session, bug_id(args, "bug")?).await)
            }
            Some(("delete-attachment", args)) => {
                let session = self.sign_in().await?;
                let attachment_id = AttachmentId::new(number(args, "attachment")?);
                let issues = self.issues();
                issues.load(BugQuery::default()).await;
                outcome(
                    issues
                        .delete_attachment(&session, bug_id(args, "bug")?, attachment_id)
                        .await,
                )
            }
            Some(("projects", _)) => {
                let projects = self.projects();
                projects.load().await;
                for project in projects.projects().iter() {
                    println!(
                        "#{:<4} {:<6} {}",
                        project.id.value(),
                        project.key,
                        project.name
                    );
                }
                Ok(())
            }
            Some(("create-project", args)) => {
                let _session = self.sign_in().await?;
                let created = self
                    .projects()
                    .create(
                        text(args, "name")?,
                        text(args, "key")?,
                        args.get_one::<String>("description").cloned(),
                    )
                    .await;
                match created {
                    Some(project) => {
                        println!("Created project #{} ({})", project.id, project.key);
                        Ok(())
                    }
                    None => Err(AppError::Validation("project was not created".to_owned())),
                }
            }
            Some(("delete-project", args)) => {
                let session = self.sign_in().await?;
                let projects = self.projects();
                projects.load().await;
                let project_id = ProjectId::new(number(args, "project")?);
                outcome(projects.delete(&session, project_id).await)
            }
            Some(("stats", _)) => {
                let _session = self.sign_in().await?;
                let stats = DashboardService::new(self.backends.bugs.clone())
                    .stats()
                    .await;
                println!(
                    "total {}  open {}  in progress {}  closed {}",
                    stats.total, stats.open, stats.in_progress, stats.closed
                );
                Ok(())
            }
            Some(("load-test", args)) => self.load_test(args).await,
            Some((name, _)) => Err(AppError::Validation(format!("unknown command '{name}'"))),
            None => Err(AppError::Validation("a command is required".to_owned())),
        }
    }

    async fn sign_up(&self, args: &ArgMatches) -> AppResult<()> {
        let context = self
            .sessions()
            .sign_up(
                text(args, "email")?,
                text(args, "password")?,
                text(args, "confirm")?,
            )
            .await?;

        match context {
            Some(context) => println!("Signed up as {}", context.identity().email()),
            None => println!("Check your inbox to confirm the account, then sign in."),
        }
        Ok(())
    }

    async fn whoami(&self) -> AppResult<()> {
        let session = self.sign_in().await?;
        let role = session.role().map_or("<no profile>", RoleName::as_str);
        println!("{} ({role})", session.identity().email());
        for capability in Capability::all() {
            let mark = if session.can(*capability) { "yes" } else { "no" };
            println!("  {:<24} {mark}", capability.as_str());
        }
        Ok(())
    }

    async fn edit_profile(&self, args: &ArgMatches) -> AppResult<()> {
        let mut session = self.sign_in().await?;
        let avatar = args
            .get_one::<String>("avatar")
            .map(|path| read_upload(Path::new(path)))
            .transpose()?;

        match self
            .profiles()
            .update_profile(&mut session, text(args, "name")?, avatar)
            .await
        {
            Some(profile) => {
                if let Some(avatar) = profile.avatar.as_deref() {
                    println!("Avatar: {avatar}");
                }
                Ok(())
            }
            None => Err(AppError::Validation("profile was not updated".to_owned())),
        }
    }

    async fn list_team(&self, args: &ArgMatches) -> AppResult<()> {
        let _session = self.sign_in().await?;
        let team = self.team();
        team.load_directory().await;

        let users = match args.get_one::<String>("search") {
            Some(term) => team.search(term.as_str()),
            None => team.directory().to_vec(),
        };
        for user in users {
            println!(
                "{:<24} {:<32} {}",
                user.display_name(),
                user.email.as_deref().unwrap_or("-"),
                user.role
            );
        }
        Ok(())
    }

    async fn set_role(&self, args: &ArgMatches) -> AppResult<()> {
        let session = self.sign_in().await?;
        let role = RoleName::new(text(args, "role")?)?;
        let email = text(args, "email")?;
        let team = self.team();
        team.load_directory().await;

        let user_id = team
            .directory()
            .iter()
            .find(|user| user.email.as_deref() == Some(email))
            .map(|user| user.id)
            .ok_or_else(|| AppError::NotFound(format!("no team member with email '{email}'")))?;
        outcome(team.update_role(&session, user_id, role).await)
    }

    async fn list_bugs(&self, args: &ArgMatches) -> AppResult<()> {
        let _session = self.sign_in().await?;
        let issues = self.issues();
        issues
            .load(BugQuery {
                project_id: args.get_one::<i64>("project").copied().map(ProjectId::new),
            })
            .await;

        for bug in issues.bugs().iter() {
            println!(
                "#{:<4} {:<12} {:<9} {} ({} attachments)",
                bug.id.value(),
                bug.status.as_str(),
                bug.priority.as_str(),
                bug.title,
                bug.attachments.len()
            );
        }
        Ok(())
    }

    async fn save_bug(&self, args: &ArgMatches) -> AppResult<()> {
        let session = self.sign_in().await?;
        let mut draft = BugDraft::new(text(args, "title")?, Some(session.user_id()))?;
        draft.description = args.get_one::<String>("description").cloned();
        draft.project_id = args.get_one::<i64>("project").copied().map(ProjectId::new);
        if let Some(priority) = args.get_one::<String>("priority") {
            draft.priority = priority.parse::<BugPriority>()?;
        }
        if let Some(email) = args.get_one::<String>("assignee") {
            let assignee = self
                .backends
                .users
                .find_by_email(email.as_str())
                .await?
                .ok_or_else(|| AppError::NotFound(format!("no team member with email '{email}'")))?;
            draft.assignee_id = Some(assignee.id);
        }

        let files = args
            .get_many::<String>("file")
            .into_iter()
            .flatten()
            .map(|path| read_upload(Path::new(path)))
            .collect::<AppResult<Vec<_>>>()?;

        let editing = args.get_one::<i64>("id").copied().map(BugId::new);
        match self.issues().save(&session, editing, draft, files).await {
            Some(bug_id) => {
                println!("Saved bug #{bug_id}");
                Ok(())
            }
            None => Err(AppError::Validation("bug was not saved".to_owned())),
        }
    }

    async fn load_test(&self, args: &ArgMatches) -> AppResult<()> {
        let request = LoadTestRequest::new(
            text(args, "url")?,
            args.get_one::<u32>("threads").copied(),
            args.get_one::<u32>("duration").copied(),
        )?;

        let mut last_status = String::new();
        let monitor = LoadTestService::new(self.backends.load_test.clone())
            .run(&request, |monitor| {
                if monitor.status() != last_status {
                    last_status = monitor.status().to_owned();
                    println!("status: {last_status}");
                }
                if let Some(point) = monitor.chart().last() {
                    println!(
                        "  {}  latency {:.1} ms  throughput {:.1}/s",
                        point.time.format("%H:%M:%S"),
                        point.latency,
                        point.throughput
                    );
                }
            })
            .await;

        for report in monitor.reports() {
            println!(
                "{:<16} samples {:<6} avg {:>8.1}  min {:>8.1}  max {:>8.1}  errors {:>5.1}%",
                report.label,
                report.samples,
                report.average,
                report.min,
                report.max,
                report.error_rate
            );
        }
        Ok(())
    }
}

fn outcome(outcome: MutationOutcome) -> AppResult<()> {
    match outcome {
        MutationOutcome::Committed => Ok(()),
        MutationOutcome::Reverted { message } => Err(AppError::Remote(message)),
        MutationOutcome::Rejected { error } => Err(error),
    }
}

fn text<'a>(args: &'a ArgMatches, name: &str) -> AppResult<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn number(args: &ArgMatches, name: &str) -> AppResult<i64> {
    args.get_one::<i64>(name)
        .copied()
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn bug_id(args: &ArgMatches, name: &str) -> AppResult<BugId> {
    number(args, name).map(BugId::new)
}

fn read_upload(path: &Path) -> AppResult<UploadFile> {
    let bytes = std::fs::read(path).map_err(|error| {
        AppError::Validation(format!("failed to read '{}': {error}", path.display()))
    })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(UploadFile {
        content_type: content_type_for(name.as_str()).to_owned(),
        name,
        bytes,
    })
}

fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" | "log" => "text/plain",
        "json" => "application/json",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use bugtrack_application::MutationOutcome;
    use bugtrack_core::AppError;

    use super::{content_type_for, outcome};

    #[test]
    fn unknown_extensions_leave_content_type_to_the_upload_default() {
        assert_eq!(content_type_for("Screen.PNG"), "image/png");
        assert_eq!(content_type_for("core.dump"), "");
        assert_eq!(content_type_for("README"), "");
    }

    #[test]
    fn failed_outcomes_become_errors() {
        assert!(outcome(MutationOutcome::Committed).is_ok());
        assert_eq!(
            outcome(MutationOutcome::Reverted {
                message: "Failed to update role: offline".to_owned()
            }),
            Err(AppError::Remote("Failed to update role: offline".to_owned()))
        );
    }
}
