//! BugTrack command-line client.

#![forbid(unsafe_code)]

mod backend;
mod cli;
mod commands;
mod config;

use bugtrack_application::{NoticeBoard, NoticeKind};
use bugtrack_core::AppError;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::backend::Backends;
use crate::commands::Client;
use crate::config::ClientConfig;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let matches = cli::command().get_matches();
    let config = ClientConfig::load()?;
    let notices = NoticeBoard::new(config.notice_ttl);
    let backends = Backends::connect(&config)?;
    info!(command = matches.subcommand_name().unwrap_or("<none>"), "bugtrack-cli started");

    let client = Client::new(config, backends, notices.clone());
    let result = client.dispatch(&matches).await;
    print_notices(&notices);

    result
}

fn print_notices(notices: &NoticeBoard) {
    for notice in notices.drain() {
        match notice.kind {
            NoticeKind::Success => println!("{}", notice.message),
            NoticeKind::Warning | NoticeKind::Error => {
                eprintln!("{}: {}", notice.kind.as_str(), notice.message);
            }
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();
}
