//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::cache::HostCache;
use crate::config::loader::{check_config, load_config};
use crate::config::schema::HostsConfig;
use crate::error::ConfigError;

/// A watcher that monitors the configuration file for changes.
///
/// Each accepted reload replaces the settings, clears the host cache and is
/// announced on the update channel.
pub struct ConfigWatcher {
    path: PathBuf,
    cache: Arc<HostCache>,
    update_tx: mpsc::UnboundedSender<Arc<HostsConfig>>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path, cache: Arc<HostCache>) -> (Self, mpsc::UnboundedReceiver<Arc<HostsConfig>>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                cache,
                update_tx,
            },
            update_rx,
        )
    }

    /// Reload now, outside of any file event.
    pub fn reload(&self) -> Result<Arc<HostsConfig>, ConfigError> {
        reload(&self.path, &self.cache, &self.update_tx)
    }

    /// Start watching the file in a background thread.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let cache = self.cache.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        if let Err(e) = reload(&path, &cache, &tx) {
                            tracing::error!("Failed to reload config: {}. Keeping current configuration.", e);
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

fn reload(
    path: &Path,
    cache: &HostCache,
    tx: &mpsc::UnboundedSender<Arc<HostsConfig>>,
) -> Result<Arc<HostsConfig>, ConfigError> {
    let config = load_config(path)?;
    check_config(&config)?;

    cache.settings_source().replace(config);
    cache.clear();

    let current = cache.settings();
    tracing::info!(root_hostconf = ?current.root_hostconf, "Configuration reloaded");
    let _ = tx.send(current.clone());
    Ok(current)
}
