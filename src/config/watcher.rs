//! Configuration file watcher for live reload.
//!
//! The parent directory is watched rather than the file itself: editors that
//! save by writing a temp file and renaming it over the original would
//! otherwise detach the watch after the first save.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::ServerConfig;

/// Watches one TOML file and emits each new valid configuration.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ServerConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ServerConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching in notify's background thread.
    ///
    /// The returned watcher must be kept alive for as long as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(ToOwned::to_owned);
        let last_seen = Mutex::new(fs::read_to_string(&path).ok());

        let watched = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = ?e, "Config watch error");
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                let touches_config = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(ToOwned::to_owned) == file_name);
                if !touches_config {
                    return;
                }
                reload(&watched, &last_seen, &update_tx);
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Re-read the file and forward it when its text changed and it validates.
fn reload(
    path: &Path,
    last_seen: &Mutex<Option<String>>,
    update_tx: &mpsc::UnboundedSender<ServerConfig>,
) {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Config file unreadable, keeping current configuration");
            return;
        }
    };

    {
        let Ok(mut last) = last_seen.lock() else {
            return;
        };
        if last.as_deref() == Some(content.as_str()) {
            return;
        }
        *last = Some(content.clone());
    }

    match parse_config(&content) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Config file changed, applying");
            let _ = update_tx.send(config);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reload_forwards_only_changed_valid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("treeserve.toml");
        fs::write(&path, "[limits]\nmax_concurrency = 4\n").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let last_seen = Mutex::new(fs::read_to_string(&path).ok());

        reload(&path, &last_seen, &tx);
        assert!(rx.try_recv().is_err());

        fs::write(&path, "[limits]\nmax_concurrency = 8\n").unwrap();
        reload(&path, &last_seen, &tx);
        assert_eq!(rx.try_recv().unwrap().limits.max_concurrency, 8);

        fs::write(&path, "[limits]\nmax_concurrency = 0\n").unwrap();
        reload(&path, &last_seen, &tx);
        assert!(rx.try_recv().is_err());
    }
}
