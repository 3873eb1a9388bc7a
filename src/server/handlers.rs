// src/server/handlers.rs

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
};
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tracing::{debug, warn};

use crate::server::reload::{RELOAD_SCRIPT, ReloadMessage, Reloader, inject_reload_script};

/// Shared state of the dev server.
#[derive(Debug, Clone)]
pub struct AppState {
    pub base: Arc<PathBuf>,
    pub livereload: bool,
    pub reloader: Reloader,
}

/// SSE stream of `reload` events. Ends when the server closes the reloader.
pub async fn handle_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!(clients = state.reloader.client_count() + 1, "livereload client connected");

    let stream = BroadcastStream::new(state.reloader.subscribe())
        .take_while(|msg| !matches!(msg, Ok(ReloadMessage::Closing)))
        .filter_map(|msg| match msg {
            Ok(ReloadMessage::Reload { run_id }) => {
                Some(Ok(Event::default().event("reload").data(run_id.to_string())))
            }
            Ok(ReloadMessage::Closing) => None,
            // Missed notices still mean "something changed".
            Err(_lagged) => Some(Ok(Event::default().event("reload").data("lagged"))),
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn handle_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        RELOAD_SCRIPT,
    )
}

/// Response mapper for files served from the base directory: adds
/// `Cache-Control: no-cache` and, with livereload on, puts the reload
/// snippet into full HTML pages.
pub async fn inject_livereload(State(state): State<AppState>, response: Response) -> Response {
    let (mut parts, body) = response.into_parts();
    parts
        .headers
        .entry(header::CACHE_CONTROL)
        .or_insert(HeaderValue::from_static("no-cache"));

    let is_html = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !state.livereload || !is_html || parts.status != StatusCode::OK {
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to buffer html response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let html = inject_reload_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;

    fn state(livereload: bool) -> AppState {
        AppState {
            base: Arc::new(PathBuf::from("dist")),
            livereload,
            reloader: Reloader::new(),
        }
    }

    fn file(content_type: &'static str, body: &'static str) -> Response {
        (
            [(header::CONTENT_TYPE, content_type), (header::CONTENT_LENGTH, "999")],
            body,
        )
            .into_response()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn html_gets_reload_script() {
        let response = inject_livereload(
            State(state(true)),
            file("text/html", "<html><body>x</body></html>"),
        )
        .await;

        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        let text = body_text(response).await;
        assert!(text.find("__livereload.js").unwrap() < text.find("</body>").unwrap());
    }

    #[tokio::test]
    async fn other_types_pass_through() {
        let response =
            inject_livereload(State(state(true)), file("text/css", "body{color:red}")).await;
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "999");
        assert_eq!(body_text(response).await, "body{color:red}");
    }

    #[tokio::test]
    async fn livereload_off_leaves_html() {
        let response =
            inject_livereload(State(state(false)), file("text/html", "<body></body>")).await;
        assert_eq!(body_text(response).await, "<body></body>");
    }
}
