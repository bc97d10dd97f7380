//! Configuration file watcher for hot reload of routing rules.
//!
//! The parent directory is watched rather than the file itself, since many
//! editors save by writing a new file and renaming it over the old one.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::RoutingConfig;

/// Quiet period after the last file event before the file is read.
const SETTLE: Duration = Duration::from_millis(250);

/// Emits the routing section each time the file changes it.
pub struct ConfigWatcher {
    path: PathBuf,
    current: RoutingConfig,
    update_tx: mpsc::UnboundedSender<RoutingConfig>,
}

impl ConfigWatcher {
    /// `current` is the routing section already in effect.
    pub fn new(path: &Path, current: RoutingConfig) -> (Self, mpsc::UnboundedReceiver<RoutingConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            current,
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned watcher must be kept alive.
    ///
    /// Must be called inside a Tokio runtime; reloads run on a spawned task.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let file_name = self.path.file_name().map(ToOwned::to_owned);
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let path = self.path.clone();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, file_name.as_ref()) => {
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tokio::spawn(self.reload_loop(event_rx));

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }

    /// Coalesce bursts of events into one reload once writes settle.
    async fn reload_loop(mut self, mut events: mpsc::UnboundedReceiver<()>) {
        while events.recv().await.is_some() {
            loop {
                tokio::time::sleep(SETTLE).await;
                let mut more = false;
                while events.try_recv().is_ok() {
                    more = true;
                }
                if !more {
                    break;
                }
            }
            if !self.reload().await {
                return;
            }
        }
    }

    /// Returns false once nobody is listening for updates.
    async fn reload(&mut self) -> bool {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read config, keeping current routing rules");
                return true;
            }
        };
        // A truncate-then-write save is briefly empty; the next event carries the content.
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty; waiting for the write to finish");
            return true;
        }

        match parse_config(&content) {
            Ok(config) if config.routing == self.current => {
                tracing::debug!("Config file changed; routing rules unchanged");
                true
            }
            Ok(config) => {
                self.current = config.routing.clone();
                self.update_tx.send(config.routing).is_ok()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current routing rules");
                true
            }
        }
    }
}

/// A write or create of the watched file.
fn touches(event: &Event, file_name: Option<&OsString>) -> bool {
    (event.kind.is_modify() || event.kind.is_create())
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == file_name.map(OsString::as_os_str))
}
