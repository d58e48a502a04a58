use clap::{Arg, ArgAction, Command, value_parser};

fn id_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .required(true)
        .value_parser(value_parser!(i64))
        .help(help)
}

pub(crate) fn command() -> Command {
    Command::new("bugtrack")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Bug tracker client")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("sign-up")
                .about("Create an account and its profile")
                .arg(Arg::new("email").required(true))
                .arg(Arg::new("password").required(true))
                .arg(Arg::new("confirm").required(true)),
        )
        .subcommand(
            Command::new("reset-password")
                .about("Send a password reset email")
                .arg(Arg::new("email").required(true))
                .arg(
                    Arg::new("redirect")
                        .long("redirect")
                        .help("Page the reset link should open"),
                ),
        )
        .subcommand(
            Command::new("change-password")
                .about("Change the signed-in account's password")
                .arg(Arg::new("password").required(true))
                .arg(Arg::new("confirm").required(true)),
        )
        .subcommand(Command::new("whoami").about("Show the signed-in profile and capabilities"))
        .subcommand(
            Command::new("profile")
                .about("Edit the signed-in user's display name and avatar")
                .arg(Arg::new("name").required(true))
                .arg(
                    Arg::new("avatar")
                        .long("avatar")
                        .help("Image file to upload as the new avatar"),
                ),
        )
        .subcommand(
            Command::new("team").about("List team members").arg(
                Arg::new("search")
                    .long("search")
                    .help("Filter by name or email"),
            ),
        )
        .subcommand(
            Command::new("set-role")
                .about("Change a team member's role")
                .arg(Arg::new("email").required(true))
                .arg(Arg::new("role").required(true)),
        )
        .subcommand(Command::new("roles").about("List roles and their capabilities"))
        .subcommand(
            Command::new("create-role")
                .about("Create a role with every capability denied")
                .arg(Arg::new("role").required(true)),
        )
        .subcommand(
            Command::new("toggle-permission")
                .about("Flip one capability of a role")
                .arg(Arg::new("role").required(true))
                .arg(
                    Arg::new("capability")
                        .required(true)
                        .help("e.g. can_delete_bug"),
                ),
        )
        .subcommand(
            Command::new("delete-role")
                .about("Delete a role nobody holds")
                .arg(Arg::new("role").required(true)),
        )
        .subcommand(
            Command::new("bugs").about("List bugs, newest first").arg(
                Arg::new("project")
                    .long("project")
                    .value_parser(value_parser!(i64))
                    .help("Only bugs of this project id"),
            ),
        )
        .subcommand(
            Command::new("save-bug")
                .about("Report a new bug or update an existing one")
                .arg(Arg::new("title").required(true))
                .arg(
                    Arg::new("id")
                        .long("id")
                        .value_parser(value_parser!(i64))
                        .help("Update this bug instead of creating one"),
                )
                .arg(Arg::new("description").long("description"))
                .arg(Arg::new("priority").long("priority").help("Low, Medium, High or Critical"))
                .arg(
                    Arg::new("project")
                        .long("project")
                        .value_parser(value_parser!(i64)),
                )
                .arg(
                    Arg::new("assignee")
                        .long("assignee")
                        .help("Email of the assigned team member"),
                )
                .arg(
                    Arg::new("file")
                        .long("file")
                        .action(ArgAction::Append)
                        .help("Attach a file; repeatable"),
                ),
        )
        .subcommand(
            Command::new("set-status")
                .about("Change a bug's status")
                .arg(id_arg("bug", "Bug id"))
                .arg(
                    Arg::new("status")
                        .required(true)
                        .help("Open, In Progress or Closed"),
                ),
        )
        .subcommand(
            Command::new("delete-bug")
                .about("Delete a bug")
                .arg(id_arg("bug", "Bug id")),
        )
        .subcommand(
            Command::new("delete-attachment")
                .about("Remove one attachment from a bug")
                .arg(id_arg("bug", "Bug id"))
                .arg(id_arg("attachment", "Attachment id")),
        )
        .subcommand(Command::new("projects").about("List projects"))
        .subcommand(
            Command::new("create-project")
                .about("Create a project")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("key").required(true).help("1 to 5 characters"))
                .arg(Arg::new("description").long("description")),
        )
        .subcommand(
            Command::new("delete-project")
                .about("Delete a project and its bugs")
                .arg(id_arg("project", "Project id")),
        )
        .subcommand(Command::new("stats").about("Show bug counts by status"))
        .subcommand(
            Command::new("load-test")
                .about("Run a load test and follow its progress")
                .arg(Arg::new("url").required(true))
                .arg(
                    Arg::new("threads")
                        .long("threads")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("duration")
                        .long("duration")
                        .value_parser(value_parser!(u32))
                        .help("Run length in seconds"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::command;

    #[test]
    fn command_definition_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn repeated_files_are_collected() {
        let matches = command().try_get_matches_from([
            "bugtrack",
            "save-bug",
            "Crash on save",
            "--file",
            "a.png",
            "--file",
            "b.log",
        ]);

        let files: Vec<String> = matches
            .ok()
            .and_then(|matches| {
                matches.subcommand_matches("save-bug").map(|args| {
                    args.get_many::<String>("file")
                        .into_iter()
                        .flatten()
                        .cloned()
                        .collect()
                })
            })
            .unwrap_or_default();
        assert_eq!(files, vec!["a.png", "b.log"]);
    }

    #[test]
    fn profile_takes_name_and_optional_avatar() {
        let matches =
            command().try_get_matches_from(["bugtrack", "profile", "Ada", "--avatar", "me.png"]);

        let parsed = matches.ok().and_then(|matches| {
            matches.subcommand_matches("profile").map(|args| {
                (
                    args.get_one::<String>("name").cloned(),
                    args.get_one::<String>("avatar").cloned(),
                )
            })
        });
        assert_eq!(
            parsed,
            Some((Some("Ada".to_owned()), Some("me.png".to_owned())))
        );
        assert!(command().try_get_matches_from(["bugtrack", "profile"]).is_err());
    }
}
