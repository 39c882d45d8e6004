//! Development server with live reload via Server-Sent Events.
//!
//! Serves the output directory from disk, injecting the reload client into
//! HTML pages. Requests for anything the build did not produce are proxied
//! to the backend process.

use crate::dev::SharedState;
use crate::error::{CliError, Result};
use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response, Sse, sse::Event, sse::KeepAlive},
    routing::get,
};
use std::convert::Infallible;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tower_http::cors::{Any, CorsLayer};

/// Route of the SSE stream.
pub const LIVERELOAD_PATH: &str = "/__kiln/livereload";
/// Route of the reload client.
pub const LIVERELOAD_SCRIPT_PATH: &str = "/__kiln/livereload.js";

const RELOAD_SCRIPT: &str = include_str!("../../assets/livereload.js");

/// Largest request body forwarded to the backend.
const MAX_PROXY_BODY: usize = 16 * 1024 * 1024;

/// Headers that describe one connection and are not forwarded.
const HOP_HEADERS: [header::HeaderName; 9] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
    header::CONTENT_LENGTH,
];

#[derive(Clone)]
struct AppState {
    shared: SharedState,
    http: reqwest::Client,
}

/// Development server.
pub struct DevServer {
    state: AppState,
}

impl DevServer {
    pub fn new(shared: SharedState) -> Result<Self> {
        let http = reqwest::Client::builder()
            .no_proxy()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| CliError::Server(format!("Failed to create proxy client: {}", e)))?;

        Ok(Self {
            state: AppState { shared, http },
        })
    }

    /// Bind the listener on localhost.
    pub async fn bind(port: u16) -> Result<TcpListener> {
        let addr = format!("127.0.0.1:{}", port);
        TcpListener::bind(&addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", addr, e)))
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route(LIVERELOAD_PATH, get(handle_sse))
            .route(LIVERELOAD_SCRIPT_PATH, get(handle_reload_script))
            .fallback(handle_request)
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.state.clone())
    }

    /// Serve until the task is dropped or the listener fails.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let app = self.router();
        axum::serve(listener, app)
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }
}

async fn handle_sse(
    State(app): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (id, rx) = app.shared.register_client();
    tracing::debug!("Live-reload client {} connected", id);

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn handle_reload_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        RELOAD_SCRIPT,
    )
}

/// Serve a built file, or proxy to the backend.
async fn handle_request(State(app): State<AppState>, request: Request) -> Response {
    let is_read = matches!(*request.method(), Method::GET | Method::HEAD);
    if let Some(file) = is_read
        .then(|| resolve_static(app.shared.out_dir(), request.uri().path()))
        .flatten()
    {
        match tokio::fs::read(&file).await {
            Ok(content) => return file_response(&file, content),
            Err(e) => {
                crate::ui::warning(&format!("Failed to read file {}: {}", file.display(), e));
            }
        }
    }

    proxy(&app, request).await
}

/// Map a request path to a file in the output directory.
fn resolve_static(out_dir: &Path, path: &str) -> Option<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let candidate = out_dir.join(relative);
    if candidate.is_file() {
        return Some(candidate);
    }

    let index = candidate.join("index.html");
    index.is_file().then_some(index)
}

fn file_response(file: &Path, content: Vec<u8>) -> Response {
    let content_type = determine_content_type(file);
    let body = inject_reload_script(&content, content_type);

    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

fn text_response(status: StatusCode, message: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message,
    )
        .into_response()
}

fn strip_hop_headers(headers: &mut HeaderMap) {
    for name in &HOP_HEADERS {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

/// Forward a request to the backend, preserving method, path, query,
/// headers and body.
async fn proxy(app: &AppState, request: Request) -> Response {
    let port = app.shared.backend_port();
    let (parts, body) = request.into_parts();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("http://127.0.0.1:{}{}", port, target);

    let body: Bytes = match axum::body::to_bytes(body, MAX_PROXY_BODY).await {
        Ok(body) => body,
        Err(e) => {
            return text_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Request body rejected: {}", e),
            );
        }
    };

    let mut headers = parts.headers;
    strip_hop_headers(&mut headers);

    let upstream = match app
        .http
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Proxy to {} failed: {}", url, e);
            return text_response(
                StatusCode::BAD_GATEWAY,
                format!("Backend on port {} is unavailable: {}", port, e),
            );
        }
    };

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_headers(&mut headers);

    let content = match upstream.bytes().await {
        Ok(content) => content,
        Err(e) => {
            return text_response(
                StatusCode::BAD_GATEWAY,
                format!("Backend response from port {} was cut off: {}", port, e),
            );
        }
    };

    let is_plain_html = !headers.contains_key(header::CONTENT_ENCODING)
        && headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/html"));
    let body = if is_plain_html {
        inject_reload_script(&content, "text/html")
    } else {
        content.to_vec()
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Inject the reload client before the closing `</body>` tag.
pub fn inject_reload_script(content: &[u8], content_type: &str) -> Vec<u8> {
    if !content_type.starts_with("text/html") {
        return content.to_vec();
    }

    let html = String::from_utf8_lossy(content);
    let script_tag = format!(r#"<script src="{}"></script>"#, LIVERELOAD_SCRIPT_PATH);

    if let Some(pos) = html.rfind("</body>") {
        let mut result = String::with_capacity(html.len() + script_tag.len() + 4);
        result.push_str(&html[..pos]);
        result.push_str(&script_tag);
        result.push('\n');
        result.push_str(&html[pos..]);
        return result.into_bytes();
    }

    let mut result = html.into_owned();
    result.push('\n');
    result.push_str(&script_tag);
    result.into_bytes()
}

fn determine_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}
