//! Process-wide configuration source.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::schema::HostsConfig;

/// The active [`HostsConfig`], swapped atomically on reload.
///
/// Readers get a consistent snapshot; replacing the settings does not touch
/// anything derived from them. Call [`HostCache::clear`] afterwards.
///
/// [`HostCache::clear`]: crate::config::cache::HostCache::clear
#[derive(Debug)]
pub struct Settings {
    inner: ArcSwap<HostsConfig>,
}

impl Settings {
    pub fn new(config: HostsConfig) -> Self {
        Self {
            inner: ArcSwap::from_pointee(config),
        }
    }

    pub fn current(&self) -> Arc<HostsConfig> {
        self.inner.load_full()
    }

    pub fn replace(&self, config: HostsConfig) {
        self.inner.store(Arc::new(config));
    }

    /// Replace the settings with a modified copy of the current ones.
    pub fn update(&self, f: impl FnOnce(&mut HostsConfig)) {
        let mut config = HostsConfig::clone(&self.current());
        f(&mut config);
        self.replace(config);
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(HostsConfig::default())
    }
}
