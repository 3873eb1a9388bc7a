// src/server/reload.rs

//! Livereload: a broadcast of reload notices plus the browser snippet that
//! listens for them over Server-Sent Events.

use std::sync::LazyLock;

use regex::Regex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::engine::RunId;

pub const EVENTS_PATH: &str = "/__livereload";
pub const SCRIPT_PATH: &str = "/__livereload.js";

/// Browser side of the reload channel.
pub const RELOAD_SCRIPT: &str = r#"(function () {
  if (!window.EventSource) { return; }
  var source = new EventSource("/__livereload");
  source.addEventListener("reload", function () {
    source.close();
    window.location.reload();
  });
})();
"#;

const SCRIPT_TAG: &str = r#"<script src="/__livereload.js"></script>"#;

static BODY_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body\s*>").expect("static pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadMessage {
    Reload { run_id: RunId },
    /// The server is shutting down; streams should end.
    Closing,
}

/// Fan-out of reload notices to every connected browser.
#[derive(Debug, Clone)]
pub struct Reloader {
    tx: broadcast::Sender<ReloadMessage>,
}

impl Default for Reloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reloader {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.tx.subscribe()
    }

    /// Ask every connected client to reload. Returns how many were reached.
    pub fn notify(&self, run_id: RunId) -> usize {
        match self.tx.send(ReloadMessage::Reload { run_id }) {
            Ok(n) => n,
            Err(_) => {
                debug!(run_id, "no livereload clients connected");
                0
            }
        }
    }

    pub fn close(&self) {
        let _ = self.tx.send(ReloadMessage::Closing);
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Insert the reload script tag before the last `</body>` (any case), or
/// append it when the page has none.
pub fn inject_reload_script(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + SCRIPT_TAG.len() + 1);
    match BODY_CLOSE.find_iter(html).last() {
        Some(m) => {
            out.push_str(&html[..m.start()]);
            out.push_str(SCRIPT_TAG);
            out.push('\n');
            out.push_str(&html[m.start()..]);
        }
        None => {
            out.push_str(html);
            out.push('\n');
            out.push_str(SCRIPT_TAG);
        }
    }
    out
}
