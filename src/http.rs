//! HTTP surface
//!
//! | Route | Behaviour |
//! |---|---|
//! | `GET /` | container page for the current live version |
//! | `GET /id` | live version id as plain text (empty before the first push) |
//! | `GET /status` | JSON with live id, staged ids and the push slot |
//! | `POST /push?command=START\|FINISH&push_id=<id>` | push protocol |
//! | `POST /push?command=OVERRIDE` | force-release the push slot |
//! | `GET /sketch/*path`, `GET /static/sketch/*path` | files of the live version |
//!
//! Read routes never wait on the push mutex. Push commands run on the
//! blocking pool because they perform filesystem work under that mutex.
//!
//! Live files are opened through `static/sketch/<path>`, so each open sees
//! either the old or the new version. A directory request opens the
//! directory and then its `index.html` separately; a FINISH plus sweep
//! landing between those two opens can still turn that request into a 404.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Path as UrlPath, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};

use crate::controller::{PushCommand, PushController};
use crate::error::WallmountError;
use crate::page::{render_container, PageOptions};

/// Shared state for all handlers
pub struct AppState {
    pub controller: Arc<PushController>,
    pub page: PageOptions,
}

impl AppState {
    pub fn new(controller: Arc<PushController>, page: PageOptions) -> Self {
        Self { controller, page }
    }
}

/// Build the router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/id", get(id_handler))
        .route("/status", get(status_handler))
        .route("/push", post(push_handler))
        .route("/sketch", get(|| async { Redirect::permanent("/sketch/") }))
        .route("/sketch/", get(sketch_index_handler))
        .route("/sketch/*path", get(sketch_file_handler))
        .route(
            "/static/sketch",
            get(|| async { Redirect::permanent("/static/sketch/") }),
        )
        .route("/static/sketch/", get(sketch_index_handler))
        .route("/static/sketch/*path", get(sketch_file_handler))
        .with_state(state)
}

// ============================================================================
// Errors
// ============================================================================

/// Error body returned by every failing route
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// `WallmountError` rendered as an HTTP response
pub struct ApiError(pub WallmountError);

impl From<WallmountError> for ApiError {
    fn from(e: WallmountError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            error!(op = "http.internal_error", error = %self.0, "Request failed");
        }
        let body = ErrorBody {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Read routes
// ============================================================================

async fn index_handler(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let live = state.controller.live()?;
    Ok(Html(render_container(live.as_ref(), &state.page)))
}

async fn id_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let live = state.controller.live()?;
    let body = live.map(|id| id.to_string()).unwrap_or_default();
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
        .into_response())
}

async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let live = state.controller.live()?;
    let staged = state.controller.staged()?;
    let reservation = match state.controller.try_state() {
        Some(push_state) => serde_json::to_value(push_state).unwrap_or(serde_json::Value::Null),
        None => json!("busy"),
    };
    Ok(Json(json!({
        "live": live,
        "staged": staged,
        "reservation": reservation,
    })))
}

// ============================================================================
// Push route
// ============================================================================

#[derive(Debug, Deserialize)]
struct PushQuery {
    command: Option<String>,
    push_id: Option<String>,
}

async fn push_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PushQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let command = PushCommand::parse(
        query.command.as_deref().unwrap_or(""),
        query.push_id.as_deref(),
    )
    .map_err(|e| {
        warn!(op = "http.push_rejected", error = %e, "Malformed push request");
        e
    })?;

    info!(op = "http.push", command = command.name(), "Push command received");

    let controller = Arc::clone(&state.controller);
    let outcome = tokio::task::spawn_blocking(move || controller.execute(command))
        .await
        .map_err(|e| WallmountError::Io(std::io::Error::other(e.to_string())))??;

    Ok(Json(json!({ "status": "ok", "outcome": outcome })))
}

// ============================================================================
// Live content
// ============================================================================

async fn sketch_index_handler(State(state): State<Arc<AppState>>) -> Response {
    serve_live_file(&state, "").await
}

async fn sketch_file_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(path): UrlPath<String>,
) -> Response {
    serve_live_file(&state, &path).await
}

/// Serve `relative` from the live version.
///
/// The file is opened through the live pointer, so the kernel resolves the
/// link at open time and an open handle keeps reading the version it found.
async fn serve_live_file(state: &AppState, relative: &str) -> Response {
    let store = state.controller.store();
    match store.live() {
        Ok(Some(_)) => {}
        Ok(None) => return not_found("No version is live"),
        Err(e) => return ApiError(e).into_response(),
    }

    let Some(path) = resolve_within(store.pointer_path(), relative) else {
        return not_found("Not found");
    };

    match read_live_file(path).await {
        Ok((path, bytes)) => (
            [
                (
                    header::CONTENT_TYPE,
                    HeaderValue::from_static(content_type_for(&path)),
                ),
                (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
            ],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => not_found("Not found"),
        Err(e) => ApiError(e.into()).into_response(),
    }
}

async fn read_live_file(mut path: PathBuf) -> std::io::Result<(PathBuf, Vec<u8>)> {
    let mut file = tokio::fs::File::open(&path).await?;
    if file.metadata().await?.is_dir() {
        path.push("index.html");
        file = tokio::fs::File::open(&path).await?;
    }
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).await?;
    Ok((path, bytes))
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, message.to_string()).into_response()
}

/// Join a request path onto `base`, refusing anything but plain names
fn resolve_within(base: &Path, relative: &str) -> Option<PathBuf> {
    let mut path = base.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(path)
}

/// Content type by file extension
fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "wasm" => "application/wasm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_within_rejects_escapes() {
        let base = Path::new("/srv/inbox/v1");
        assert_eq!(
            resolve_within(base, "js/sketch.js"),
            Some(PathBuf::from("/srv/inbox/v1/js/sketch.js"))
        );
        assert_eq!(resolve_within(base, ""), Some(base.to_path_buf()));
        assert_eq!(resolve_within(base, "../v2/index.html"), None);
        assert_eq!(resolve_within(base, "/etc/passwd"), None);
        assert_eq!(resolve_within(base, "a/../../b"), None);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(
            content_type_for(Path::new("index.html")),
            "text/html; charset=utf-8"
        );
        assert_eq!(
            content_type_for(Path::new("sketch.JS")),
            "text/javascript; charset=utf-8"
        );
        assert_eq!(content_type_for(Path::new("img.png")), "image/png");
        assert_eq!(
            content_type_for(Path::new("blob")),
            "application/octet-stream"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_live_files_open_through_pointer() {
        use crate::store::VersionStore;
        use crate::version_id::VersionId;

        let dir = tempfile::TempDir::new().unwrap();
        let store = VersionStore::open(dir.path()).unwrap();
        for raw in ["v1", "v2"] {
            let staged = store.inbox_dir().join(raw);
            std::fs::create_dir_all(&staged).unwrap();
            std::fs::write(staged.join("index.html"), raw).unwrap();
        }
        let v1 = VersionId::parse("v1").unwrap();
        store.switch_live(&v1).unwrap();

        let (path, bytes) = read_live_file(store.pointer_path().to_path_buf())
            .await
            .unwrap();
        assert_eq!(path, store.pointer_path().join("index.html"));
        assert_eq!(bytes, b"v1");

        // A handle opened before a switch and sweep keeps reading the old version
        let mut held = tokio::fs::File::open(store.pointer_path().join("index.html"))
            .await
            .unwrap();
        store.switch_live(&VersionId::parse("v2").unwrap()).unwrap();
        store.delete_staged(&v1).unwrap();

        let mut old = String::new();
        held.read_to_string(&mut old).await.unwrap();
        assert_eq!(old, "v1");

        let (_, bytes) = read_live_file(store.pointer_path().join("index.html"))
            .await
            .unwrap();
        assert_eq!(bytes, b"v2");
    }
}
