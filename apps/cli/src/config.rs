use std::env;
use std::time::Duration;

use bugtrack_application::NoticeBoard;
use bugtrack_core::{AppError, AppResult};

const MEMORY_BACKEND: &str = "memory";
const DEFAULT_LOAD_TEST_URL: &str = "http://localhost:3000/loadtest";

/// Where rows, blobs and accounts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BackendTarget {
    /// Process-local store, lost on exit.
    Memory,
    /// Hosted backend-as-a-service project.
    Hosted { base_url: String, api_key: String },
}

/// Sign-in credentials taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Credentials {
    pub(crate) email: String,
    pub(crate) password: String,
}

/// Client configuration read once at startup.
#[derive(Debug, Clone)]
pub(crate) struct ClientConfig {
    pub(crate) backend: BackendTarget,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) notice_ttl: Duration,
    pub(crate) http_timeout: Duration,
    pub(crate) load_test_url: String,
}

impl ClientConfig {
    pub(crate) fn load() -> AppResult<Self> {
        let backend_url = required_env("BUGTRACK_BACKEND_URL")?;
        let backend = if backend_url.trim().eq_ignore_ascii_case(MEMORY_BACKEND) {
            BackendTarget::Memory
        } else {
            BackendTarget::Hosted {
                base_url: backend_url.trim().to_owned(),
                api_key: required_env("BUGTRACK_API_KEY")?,
            }
        };

        let credentials = match (env::var("BUGTRACK_EMAIL"), env::var("BUGTRACK_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(Credentials { email, password }),
            _ => None,
        };

        let default_ttl_ms =
            u64::try_from(NoticeBoard::DEFAULT_TIME_TO_LIVE.as_millis()).unwrap_or(u64::MAX);
        let notice_ttl_ms = parse_env_u64("BUGTRACK_NOTICE_TTL_MS", default_ttl_ms)?;
        let http_timeout_secs = parse_env_u64("BUGTRACK_HTTP_TIMEOUT_SECS", 15)?;
        let load_test_url = env::var("BUGTRACK_LOADTEST_URL")
            .unwrap_or_else(|_| DEFAULT_LOAD_TEST_URL.to_owned());

        if http_timeout_secs == 0 {
            return Err(AppError::Validation(
                "BUGTRACK_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            backend,
            credentials,
            notice_ttl: Duration::from_millis(notice_ttl_ms),
            http_timeout: Duration::from_secs(http_timeout_secs),
            load_test_url,
        })
    }

    pub(crate) fn credentials(&self) -> AppResult<&Credentials> {
        self.credentials.as_ref().ok_or_else(|| {
            AppError::Validation(
                "BUGTRACK_EMAIL and BUGTRACK_PASSWORD are required for this command".to_owned(),
            )
        })
    }
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
