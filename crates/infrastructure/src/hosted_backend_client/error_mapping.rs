use bugtrack_core::AppError;
use serde_json::Value;

/// Row API code for "no row matched a single-row request".
pub const MISSING_ROW_CODE: &str = "PGRST116";
/// Postgres unique violation.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";
/// Postgres insufficient privilege, raised by row-level security.
pub const ROW_SECURITY_DENIED_CODE: &str = "42501";

/// Maps a failed backend response onto the shared error type.
///
/// Row errors carry `{code, message, details, hint}`; auth errors use
/// `{error, error_description}` or `{code, msg}` with a numeric code.
pub fn map_backend_error(status: u16, body: &str) -> AppError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|value| value.get("code"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let message = parsed
        .as_ref()
        .and_then(|value| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str))
        })
        .map(str::to_owned)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("backend returned status {status}")
            } else {
                trimmed.to_owned()
            }
        });

    match code {
        MISSING_ROW_CODE => AppError::NotFound(message),
        UNIQUE_VIOLATION_CODE => AppError::Conflict(message),
        ROW_SECURITY_DENIED_CODE => AppError::Forbidden(message),
        _ => match status {
            401 => AppError::Unauthorized(message),
            403 => AppError::Forbidden(message),
            404 => AppError::NotFound(message),
            409 => AppError::Conflict(message),
            _ => AppError::Remote(message),
        },
    }
}

/// Parses the total from a `Content-Range` header such as `0-24/310` or `*/0`.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    header
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse::<u64>().ok())
}
