//! HTTP client for the hosted backend-as-a-service.
//!
//! One client serves the row API (`/rest/v1`), the auth API (`/auth/v1`) and
//! blob storage (`/storage/v1`). Requests carry the project API key and the
//! signed-in user's access token when one is set.

mod error_mapping;
mod row_filter;

use std::sync::Arc;

use bugtrack_core::{AppError, AppResult};
use reqwest::header;
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use url::Url;

pub use error_mapping::{
    MISSING_ROW_CODE, ROW_SECURITY_DENIED_CODE, UNIQUE_VIOLATION_CODE, map_backend_error,
    parse_content_range_total,
};
pub use row_filter::{RowFilter, SortDirection};

const SINGLE_OBJECT_MEDIA_TYPE: &str = "application/vnd.pgrst.object+json";

/// Shared, cheaply cloneable client for the hosted backend.
#[derive(Clone)]
pub struct HostedBackendClient {
    http_client: reqwest::Client,
    base_url: Url,
    api_key: String,
    access_token: Arc<RwLock<Option<String>>>,
}

impl HostedBackendClient {
    /// Creates a client for the project at `base_url`.
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        api_key: impl Into<String>,
    ) -> AppResult<Self> {
        let base_url = Url::parse(base_url).map_err(|error| {
            AppError::Validation(format!("invalid backend url '{base_url}': {error}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "backend url '{base_url}' cannot carry a path"
            )));
        }

        Ok(Self {
            http_client,
            base_url,
            api_key: api_key.into(),
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Sets or clears the user access token sent with every request.
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    /// Builds `<base>/<segments...>`; segments are percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Internal(format!("backend url '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Row API endpoint for `table` with `filter` applied.
    pub fn rows_url(&self, table: &str, filter: &RowFilter) -> AppResult<Url> {
        let mut url = self.endpoint(&["rest", "v1", table])?;
        if !filter.pairs().is_empty() {
            url.query_pairs_mut().extend_pairs(filter.pairs());
        }
        Ok(url)
    }

    /// Starts a request with the API key and bearer token attached.
    pub async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .access_token
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.api_key.clone());

        self.http_client
            .request(method, url)
            .header("apikey", self.api_key.as_str())
            .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
    }

    /// Sends a request and maps non-success statuses onto [`AppError`].
    pub async fn execute(&self, request: RequestBuilder, action: &str) -> AppResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|error| AppError::Remote(format!("failed to {action}: {error}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_owned());
        Err(map_backend_error(status.as_u16(), body.as_str()))
    }

    /// Reads a JSON response body.
    pub async fn read_json<T: DeserializeOwned>(response: Response, action: &str) -> AppResult<T> {
        response.json::<T>().await.map_err(|error| {
            AppError::Internal(format!("failed to parse response to {action}: {error}"))
        })
    }

    /// Selects rows from `table`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &RowFilter,
    ) -> AppResult<Vec<T>> {
        let action = format!("select from {table}");
        let url = self.rows_url(table, filter)?;
        let response = self
            .execute(self.request(Method::GET, url).await, action.as_str())
            .await?;
        Self::read_json(response, action.as_str()).await
    }

    /// Selects exactly one row; a missing row is `Ok(None)`.
    pub async fn select_single<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &RowFilter,
    ) -> AppResult<Option<T>> {
        let action = format!("select one from {table}");
        let url = self.rows_url(table, filter)?;
        let request = self
            .request(Method::GET, url)
            .await
            .header(header::ACCEPT, SINGLE_OBJECT_MEDIA_TYPE);

        match self.execute(request, action.as_str()).await {
            Ok(response) => Self::read_json(response, action.as_str()).await.map(Some),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Counts rows matching `filter` without transferring them.
    pub async fn count(&self, table: &str, filter: &RowFilter) -> AppResult<u64> {
        let action = format!("count rows in {table}");
        let url = self.rows_url(table, filter)?;
        let request = self
            .request(Method::HEAD, url)
            .await
            .header("Prefer", "count=exact");
        let response = self.execute(request, action.as_str()).await?;

        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| AppError::Internal(format!("failed to {action}: missing Content-Range")))
    }

    /// Inserts rows and returns them as stored.
    pub async fn insert<B, T>(&self, table: &str, filter: &RowFilter, rows: &B) -> AppResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let action = format!("insert into {table}");
        self.write_rows(table, filter, rows, "return=representation", action.as_str())
            .await
    }

    /// Inserts rows, merging into existing rows that collide on `conflict_column`.
    ///
    /// Columns absent from `rows` keep their stored values.
    pub async fn upsert<B, T>(
        &self,
        table: &str,
        conflict_column: &str,
        rows: &B,
    ) -> AppResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let action = format!("upsert into {table}");
        self.write_rows(
            table,
            &RowFilter::new().on_conflict(conflict_column),
            rows,
            "resolution=merge-duplicates,return=representation",
            action.as_str(),
        )
        .await
    }

    async fn write_rows<B, T>(
        &self,
        table: &str,
        filter: &RowFilter,
        rows: &B,
        prefer: &str,
        action: &str,
    ) -> AppResult<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.rows_url(table, filter)?;
        let request = self
            .request(Method::POST, url)
            .await
            .header("Prefer", prefer)
            .json(rows);
        let response = self.execute(request, action).await?;
        Self::read_json(response, action).await
    }

    /// Updates every row matching `filter` with `changes`.
    pub async fn update<B>(&self, table: &str, filter: &RowFilter, changes: &B) -> AppResult<()>
    where
        B: Serialize + ?Sized,
    {
        let action = format!("update {table}");
        let url = self.rows_url(table, filter)?;
        let request = self
            .request(Method::PATCH, url)
            .await
            .header("Prefer", "return=minimal")
            .json(changes);
        self.execute(request, action.as_str()).await.map(|_| ())
    }

    /// Deletes every row matching `filter`.
    pub async fn delete(&self, table: &str, filter: &RowFilter) -> AppResult<()> {
        let action = format!("delete from {table}");
        let url = self.rows_url(table, filter)?;
        let request = self.request(Method::DELETE, url).await;
        self.execute(request, action.as_str()).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests;
