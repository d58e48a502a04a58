use bugtrack_core::AppError;

use super::{
    HostedBackendClient, RowFilter, SortDirection, map_backend_error, parse_content_range_total,
};

fn client(base_url: &str) -> HostedBackendClient {
    match HostedBackendClient::new(reqwest::Client::new(), base_url, "anon-key") {
        Ok(client) => client,
        Err(error) => panic!("client should build: {error}"),
    }
}

#[test]
fn rows_url_renders_filter_in_order() {
    let filter = RowFilter::new()
        .select("*,attachments(*)")
        .eq("project_id", 7)
        .order("created_at", SortDirection::Descending)
        .limit(1);

    let Ok(url) = client("https://demo.backend.test").rows_url("bugs", &filter) else {
        panic!("url should build");
    };

    assert_eq!(url.path(), "/rest/v1/bugs");
    assert_eq!(
        url.query_pairs()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>(),
        vec![
            "select=*,attachments(*)",
            "project_id=eq.7",
            "order=created_at.desc",
            "limit=1",
        ]
    );
}

#[test]
fn endpoint_keeps_base_path_and_encodes_segments() {
    let Ok(url) = client("https://demo.backend.test/project/")
        .endpoint(&["storage", "v1", "object", "attachments", "a b.png"])
    else {
        panic!("url should build");
    };

    assert_eq!(
        url.as_str(),
        "https://demo.backend.test/project/storage/v1/object/attachments/a%20b.png"
    );
}

#[test]
fn in_list_quotes_values() {
    let filter = RowFilter::new().in_list("status", &["Open", "In Progress"]);
    assert_eq!(
        filter.pairs(),
        &[("status".to_owned(), "in.(\"Open\",\"In Progress\")".to_owned())]
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    assert!(matches!(
        HostedBackendClient::new(reqwest::Client::new(), "not a url", "key"),
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        HostedBackendClient::new(reqwest::Client::new(), "mailto:team@example.com", "key"),
        Err(AppError::Validation(_))
    ));
}

#[test]
fn row_error_codes_take_precedence_over_status() {
    assert_eq!(
        map_backend_error(
            406,
            r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned"}"#
        ),
        AppError::NotFound("JSON object requested, multiple (or no) rows returned".to_owned())
    );
    assert_eq!(
        map_backend_error(
            400,
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#
        ),
        AppError::Conflict("duplicate key value violates unique constraint".to_owned())
    );
    assert_eq!(
        map_backend_error(401, r#"{"code":"42501","message":"row-level security"}"#),
        AppError::Forbidden("row-level security".to_owned())
    );
}

#[test]
fn auth_errors_fall_back_to_status() {
    assert_eq!(
        map_backend_error(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
        ),
        AppError::Remote("Invalid login credentials".to_owned())
    );
    assert_eq!(
        map_backend_error(401, r#"{"code":401,"msg":"JWT expired"}"#),
        AppError::Unauthorized("JWT expired".to_owned())
    );
    assert_eq!(
        map_backend_error(502, "  bad gateway \n"),
        AppError::Remote("bad gateway".to_owned())
    );
    assert_eq!(
        map_backend_error(503, ""),
        AppError::Remote("backend returned status 503".to_owned())
    );
}

#[test]
fn content_range_total_is_parsed() {
    assert_eq!(parse_content_range_total("0-24/310"), Some(310));
    assert_eq!(parse_content_range_total("*/0"), Some(0));
    assert_eq!(parse_content_range_total("0-24/*"), None);
    assert_eq!(parse_content_range_total("garbage"), None);
}

#[test]
fn upsert_targets_conflict_column() {
    let Ok(url) = client("https://demo.backend.test")
        .rows_url("users", &RowFilter::new().on_conflict("id"))
    else {
        panic!("url should build");
    };

    assert_eq!(url.as_str(), "https://demo.backend.test/rest/v1/users?on_conflict=id");
}
