//! Local HTTP listener.
//!
//! Every command is reachable at `/omw/:command`, so a browser bookmark or a
//! shell alias around `curl` can log time without the CLI:
//!
//! - `add`, `a`: POST `{"args": ["design", "review"]}`
//! - `hello`/`h`, `break`/`b`, `ignore`/`i`, `stretch`/`s`
//! - `report`, `r`: `?start=2024-01-01&end=2024-01-07&format=fc`
//!
//! Appends answer with the stored entry as JSON.

use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, middleware};
use chrono::Local;
use omw_core::{BuildError, ParseError, RenderError, ReportFormat};
use omw_store::{Clock, EntryStore, ResourceLock, StoreError};
use serde::Deserialize;
use thiserror::Error;

use super::report::{Period, QUERY_BOUNDS};
use crate::Config;

/// Request failures, each mapped to a status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::UnknownCommand(_)
            | Self::BadRequest(_)
            | Self::Build(BuildError::OutOfRange { .. }) => StatusCode::BAD_REQUEST,
            Self::Store(StoreError::Lock { .. }) => StatusCode::CONFLICT,
            Self::Store(StoreError::Parse(ParseError::CategoryConflict { .. })) | Self::Build(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Store(
                StoreError::Parse(_) | StoreError::EmptyStore { .. } | StoreError::Validation(_),
            ) => StatusCode::BAD_REQUEST,
            Self::Store(_) | Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}

/// Body of an `add` request.
#[derive(Debug, Default, Deserialize)]
pub struct AddRequest {
    #[serde(default)]
    pub args: Vec<String>,
}

/// Query of a `report` request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub format: Option<String>,
}

/// Shared state for handlers.
pub struct ServerState {
    pub store: EntryStore,
    pub allowed_origin: HeaderValue,
}

/// Build the router.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(
            "/omw/:command",
            get(handle_command)
                .post(handle_command)
                .options(preflight),
        )
        .layer(middleware::map_response_with_state(
            Arc::clone(&state),
            set_common_headers,
        ))
        .with_state(state)
}

/// Serves until Ctrl-C.
pub async fn serve(config: &Config, store: EntryStore) -> anyhow::Result<()> {
    let allowed_origin = HeaderValue::from_str(&config.allowed_origin)
        .with_context(|| format!("invalid allowed_origin {:?}", config.allowed_origin))?;
    let state = Arc::new(ServerState {
        store,
        allowed_origin,
    });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, store = %state.store.path().display(), "listening");
    println!("Listening on http://{addr}/omw/");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}

async fn handle_command(
    State(state): State<Arc<ServerState>>,
    Path(command): Path<String>,
    Query(query): Query<ReportQuery>,
    body: Bytes,
) -> Response {
    // Store operations do blocking file IO.
    let result =
        tokio::task::spawn_blocking(move || dispatch(&state.store, &command, &query, &body)).await;

    match result {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => err.into_response(),
        Err(err) => {
            tracing::error!(%err, "command task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn preflight() -> Response {
    (
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "content-type"),
        ],
        StatusCode::OK,
    )
        .into_response()
}

async fn set_common_headers(State(state): State<Arc<ServerState>>, mut response: Response) -> Response {
    apply_common_headers(response.headers_mut(), &state.allowed_origin);
    response
}

fn apply_common_headers(headers: &mut HeaderMap, allowed_origin: &HeaderValue) {
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed_origin.clone());
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
}

/// Runs one command against the store.
pub fn dispatch<L: ResourceLock, C: Clock>(
    store: &EntryStore<L, C>,
    command: &str,
    query: &ReportQuery,
    body: &[u8],
) -> Result<Response, ApiError> {
    tracing::debug!(command, "handling command");

    let entry = match command {
        "add" | "a" => {
            let request: AddRequest = if body.is_empty() {
                AddRequest::default()
            } else {
                serde_json::from_slice(body).map_err(|err| ApiError::BadRequest(err.to_string()))?
            };
            if request.args.is_empty() {
                return Err(ApiError::BadRequest("missing args".to_string()));
            }
            store.append(&request.args.join(" "))?
        }
        "hello" | "h" => store.hello()?,
        "break" | "b" => store.add_break()?,
        "ignore" | "i" => store.add_ignore()?,
        "stretch" | "s" => store.stretch()?,
        "report" | "r" => return report(store, query),
        other => return Err(ApiError::UnknownCommand(other.to_string())),
    };

    Ok(Json(entry).into_response())
}

fn report<L: ResourceLock, C: Clock>(
    store: &EntryStore<L, C>,
    query: &ReportQuery,
) -> Result<Response, ApiError> {
    let today = Local::now().date_naive();
    let period = Period::resolve(
        query.start.as_deref(),
        query.end.as_deref(),
        today,
        QUERY_BOUNDS,
    )
    .map_err(|err| ApiError::BadRequest(format!("{err:#}")))?;
    let format = query
        .format
        .as_deref()
        .map_or(ReportFormat::Json, ReportFormat::from_name);

    let entries = store.read_all()?;
    let report = omw_core::build(
        &entries,
        omw_core::local_midnight(period.from),
        omw_core::local_midnight(period.to),
    )?;
    let body = omw_core::render(&report, format)?;

    let content_type = match format {
        ReportFormat::Text => "text/plain; charset=utf-8",
        ReportFormat::Json | ReportFormat::CalendarFeed => "application/json",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use omw_store::{ManualClock, MemoryLock};

    use super::*;

    type TestStore = EntryStore<MemoryLock, Arc<ManualClock>>;

    fn test_store(dir: &tempfile::TempDir) -> (TestStore, Arc<ManualClock>) {
        let start = omw_core::local_midnight(Local::now().date_naive()) + TimeDelta::hours(1);
        let clock = Arc::new(ManualClock::new(start));
        let store = EntryStore::with_parts(
            dir.path().join("omw.toml"),
            MemoryLock::default(),
            Arc::clone(&clock),
        );
        (store, clock)
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn status_of(result: Result<Response, ApiError>) -> StatusCode {
        match result {
            Ok(response) => response.status(),
            Err(err) => err.status(),
        }
    }

    #[tokio::test]
    async fn test_add_returns_entry() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = test_store(&dir);

        let response = dispatch(
            &store,
            "a",
            &ReportQuery::default(),
            br#"{"args": ["design", "review"]}"#,
        )
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let entry: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(entry["task"], "design review");
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_add_rejects_missing_or_bad_body() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = test_store(&dir);
        let query = ReportQuery::default();

        assert_eq!(status_of(dispatch(&store, "add", &query, b"")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(dispatch(&store, "add", &query, br#"{"args": []}"#)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(dispatch(&store, "add", &query, b"not json")),
            StatusCode::BAD_REQUEST
        );
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_tasks_map_to_client_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = test_store(&dir);
        let query = ReportQuery::default();

        assert_eq!(
            status_of(dispatch(&store, "add", &query, br#"{"args": ["lunch", "*"]}"#)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(dispatch(&store, "add", &query, br#"{"args": ["a", "**", "***"]}"#)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_of(dispatch(&store, "stretch", &query, b"")), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unknown_command_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = test_store(&dir);
        let err = dispatch(&store, "undo", &ReportQuery::default(), b"").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "unknown command: undo");
    }

    #[test]
    fn test_lock_contention_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = test_store(&dir);

        let status = store
            .with_exclusive(|_| status_of(dispatch(&store, "hello", &ReportQuery::default(), b"")))
            .unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_report_defaults_to_json_for_today() {
        let dir = tempfile::tempdir().unwrap();
        let (store, clock) = test_store(&dir);
        let query = ReportQuery::default();

        dispatch(&store, "hello", &query, b"").unwrap();
        clock.advance(TimeDelta::minutes(45));
        dispatch(&store, "add", &query, br#"{"args": ["code"]}"#).unwrap();

        let response = dispatch(&store, "r", &query, b"").unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            HeaderValue::from_static("application/json")
        );

        let report: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        let entries = report["entries"].as_array().unwrap();
        assert!(!entries.is_empty());
        assert_eq!(entries.last().unwrap()["title"], "code");
    }

    #[tokio::test]
    async fn test_report_calendar_feed_and_text() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = test_store(&dir);
        dispatch(&store, "break", &ReportQuery::default(), b"").unwrap();

        let query = ReportQuery {
            start: Some("2 days ago".to_string()),
            end: Some("today".to_string()),
            format: Some("fc".to_string()),
        };
        let feed: serde_json::Value =
            serde_json::from_str(&body_text(dispatch(&store, "report", &query, b"").unwrap()).await)
                .unwrap();
        assert_eq!(feed[0]["classNames"], serde_json::json!(["breakEntry"]));

        let query = ReportQuery {
            format: Some("text".to_string()),
            ..query
        };
        let response = dispatch(&store, "report", &query, b"").unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            HeaderValue::from_static("text/plain; charset=utf-8")
        );
        assert!(body_text(response).await.starts_with("Report Start: "));
    }

    #[test]
    fn test_report_rejects_bad_dates() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = test_store(&dir);
        let query = ReportQuery {
            start: Some("whenever".to_string()),
            ..ReportQuery::default()
        };
        let err = dispatch(&store, "report", &query, b"").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("invalid start"));

        let query = ReportQuery {
            end: Some("whenever".to_string()),
            ..ReportQuery::default()
        };
        let err = dispatch(&store, "report", &query, b"").unwrap_err();
        assert!(err.to_string().contains("invalid end"));
    }

    #[test]
    fn test_report_past_last_date_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = test_store(&dir);
        let query = ReportQuery {
            start: Some("+262142-12-31".to_string()),
            end: Some("+262142-12-31".to_string()),
            ..ReportQuery::default()
        };
        let err = dispatch(&store, "report", &query, b"").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_common_headers() {
        let mut headers = HeaderMap::new();
        let origin = HeaderValue::from_static("http://localhost:31337");
        apply_common_headers(&mut headers, &origin);

        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:31337");
        assert_eq!(headers[header::VARY], "Origin");
    }

    #[tokio::test]
    async fn test_preflight_is_empty_ok() {
        let response = preflight().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
        assert!(body_text(response).await.is_empty());
    }
}
