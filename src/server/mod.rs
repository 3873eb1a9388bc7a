// src/server/mod.rs

//! Static dev server with livereload.
//!
//! Serves the configured base directory, injects the reload snippet into
//! HTML pages and streams `reload` events to connected browsers after every
//! successful rebuild.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{Router, middleware::map_response_with_state, routing::get};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::errors::Result;

pub mod bind;
pub mod handlers;
pub mod reload;

pub use bind::bind_with_fallback;
pub use handlers::AppState;
pub use reload::{ReloadMessage, Reloader, inject_reload_script};

/// Build the router for a given state.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new();
    if state.livereload {
        router = router
            .route(reload::EVENTS_PATH, get(handlers::handle_events))
            .route(reload::SCRIPT_PATH, get(handlers::handle_script));
    }
    let files = ServeDir::new(state.base.as_path()).append_index_html_on_directories(true);
    router
        .fallback_service(files)
        .layer(map_response_with_state(state.clone(), handlers::inject_livereload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug)]
pub struct DevServer;

impl DevServer {
    /// Bind and start serving in the background.
    ///
    /// `base` in the config is resolved against `root`.
    pub async fn start(cfg: &ServerConfig, root: &Path, reloader: Reloader) -> Result<ServerHandle> {
        let base = root.join(&cfg.base);
        if !base.is_dir() {
            warn!(base = ?base, "server base directory does not exist yet");
        }

        let (listener, addr) =
            bind_with_fallback(&cfg.hostname, cfg.port, cfg.use_available_port, cfg.port_search_limit)
                .await?;

        let app = router(AppState {
            base: Arc::new(base),
            livereload: cfg.livereload,
            reloader: reloader.clone(),
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = serve.await {
                error!(error = %err, "dev server stopped with an error");
            }
        });

        info!("dev server listening on http://{addr}");

        Ok(ServerHandle {
            addr,
            reloader,
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }
}

/// Running dev server.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    reloader: Reloader,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// The address actually bound.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn reloader(&self) -> &Reloader {
        &self.reloader
    }

    pub fn notify_reload(&self, run_id: crate::engine::RunId) -> usize {
        self.reloader.notify(run_id)
    }

    /// Close livereload streams and wait for in-flight requests to finish.
    pub async fn shutdown(mut self) {
        self.reloader.close();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(err) = (&mut self.task).await {
            warn!(error = %err, "dev server task did not finish cleanly");
        }
    }
}
