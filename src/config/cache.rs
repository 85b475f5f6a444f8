//! Memoized host lookups derived from the active settings.
//!
//! # Data Flow
//! ```text
//! Settings (ArcSwap<HostsConfig>)
//!     → root_hostconf()      cached id of the root host table
//!     → table(id)            cached compiled HostTable per hostconf id
//!     → host(name)           cached Host per name, from the root table
//!     → matcher()            cached HostMatcher over the root table
//!
//! clear()
//!     → drops every entry at once; the next lookup reads the settings again
//! ```
//!
//! # Design Decisions
//! - Entries are derived from settings but never track them: after the
//!   settings change, `clear()` must be called or lookups stay stale
//! - Readers load an immutable snapshot without locking; populate and clear
//!   serialize on a mutation lock and publish a new snapshot
//! - A value built while a clear happened is returned but not stored

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use tracing::{debug, info};

use crate::config::schema::{HostConfig, HostsConfig};
use crate::config::settings::Settings;
use crate::error::{ConfigError, ReverseError};
use crate::routing::{Host, HostMatch, HostMatcher, HostTable};

#[derive(Debug, Clone, Default)]
struct CacheState {
    generation: u64,
    root: Option<String>,
    tables: HashMap<String, Arc<HostTable>>,
    hosts: HashMap<String, Arc<Host>>,
    matcher: Option<Arc<HostMatcher>>,
}

/// Explicit cache owned by the configuration layer and shared by reference.
#[derive(Debug)]
pub struct HostCache {
    settings: Arc<Settings>,
    state: ArcSwap<CacheState>,
    mutation: Mutex<()>,
}

impl HostCache {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            state: ArcSwap::from_pointee(CacheState::default()),
            mutation: Mutex::new(()),
        }
    }

    /// Current settings snapshot. Not cached.
    pub fn settings(&self) -> Arc<HostsConfig> {
        self.settings.current()
    }

    pub fn settings_source(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Id of the root hostconf.
    pub fn root_hostconf(&self) -> Result<String, ConfigError> {
        self.get_or_populate(
            "root_hostconf",
            |state| state.root.clone(),
            || {
                self.settings()
                    .root_hostconf
                    .clone()
                    .ok_or(ConfigError::MissingSetting("root_hostconf"))
            },
            |state, root| state.root = Some(root.clone()),
        )
    }

    /// Compiled host table of the hostconf `id`.
    pub fn table(&self, id: &str) -> Result<Arc<HostTable>, ConfigError> {
        self.get_or_populate(
            "table",
            |state| state.tables.get(id).cloned(),
            || build_table(&self.settings(), id),
            |state, table| {
                state.tables.insert(id.to_owned(), table.clone());
            },
        )
    }

    /// Host table of the root hostconf.
    pub fn host_patterns(&self) -> Result<Arc<HostTable>, ConfigError> {
        let root = self.root_hostconf()?;
        self.table(&root)
    }

    /// Host `name` of the root hostconf.
    pub fn host(&self, name: &str) -> Result<Arc<Host>, ReverseError> {
        self.get_or_populate(
            "host",
            |state| state.hosts.get(name).cloned(),
            || -> Result<_, ReverseError> {
                let table = self.host_patterns()?;
                Ok(table.host(name)?.clone())
            },
            |state, host| {
                state.hosts.insert(name.to_owned(), host.clone());
            },
        )
    }

    /// Matcher over the root hostconf with the configured default host.
    pub fn matcher(&self) -> Result<Arc<HostMatcher>, ConfigError> {
        self.get_or_populate(
            "matcher",
            |state| state.matcher.clone(),
            || -> Result<_, ConfigError> {
                let table = self.host_patterns()?;
                let settings = self.settings();
                HostMatcher::new(table, settings.default_host.as_deref()).map(Arc::new)
            },
            |state, matcher| state.matcher = Some(matcher.clone()),
        )
    }

    pub fn match_host(&self, hostname: &str) -> Result<HostMatch, ConfigError> {
        Ok(self.matcher()?.match_host(hostname))
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.state.load().generation + 1;
        self.state.store(Arc::new(CacheState {
            generation,
            ..CacheState::default()
        }));
        info!(generation, "Host caches cleared");
    }

    fn get_or_populate<T, E>(
        &self,
        entry: &'static str,
        read: impl Fn(&CacheState) -> Option<T>,
        build: impl FnOnce() -> Result<T, E>,
        store: impl FnOnce(&mut CacheState, &T),
    ) -> Result<T, E> {
        let generation = {
            let snapshot = self.state.load();
            if let Some(value) = read(&snapshot) {
                return Ok(value);
            }
            snapshot.generation
        };

        // Built outside the lock: builders consult other entries.
        let value = build()?;

        let _guard = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.state.load_full();
        if current.generation != generation {
            return Ok(value);
        }
        if let Some(existing) = read(&current) {
            return Ok(existing);
        }

        let mut next = CacheState::clone(&current);
        store(&mut next, &value);
        self.state.store(Arc::new(next));
        debug!(entry, generation, "Host cache populated");
        Ok(value)
    }
}

fn build_table(config: &HostsConfig, id: &str) -> Result<Arc<HostTable>, ConfigError> {
    let hostconf = config.hostconf(id);
    let hosts = hostconf
        .and_then(|h| h.hosts.as_ref())
        .ok_or_else(|| ConfigError::MissingHostPatterns(id.to_owned()))?;
    let prefix = hostconf.map(|h| h.prefix.as_str()).unwrap_or_default();

    HostTable::new(prefix, hosts.iter().map(HostConfig::to_spec)).map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use crate::error::NoReverseMatch;

    fn cache(toml: &str) -> HostCache {
        HostCache::new(Arc::new(Settings::new(parse_config(toml).unwrap())))
    }

    const TWO_HOSTCONFS: &str = r#"
        root_hostconf = "simple"
        default_host = "www"

        [[hostconfs]]
        id = "simple"
        hosts = [
            { regex = 'www\.example\.com', urlconf = "simple", name = "www" },
            { regex = '(\w+)', urlconf = "simple", name = "with_args" },
        ]

        [[hostconfs]]
        id = "other"
        prefix = "other"
        hosts = [
            { regex = 'www\.example\.com', urlconf = "urls", name = "www" },
            { regex = 'api', urlconf = "urls", name = "api" },
        ]
    "#;

    #[test]
    fn test_missing_root_hostconf() {
        let cache = cache("");
        assert_eq!(
            cache.root_hostconf().unwrap_err().to_string(),
            "Missing root_hostconf setting"
        );
        assert!(matches!(
            cache.matcher(),
            Err(ConfigError::MissingSetting("root_hostconf"))
        ));
    }

    #[test]
    fn test_missing_host_patterns() {
        let cache = cache(
            r#"
            root_hostconf = "empty"
            [[hostconfs]]
            id = "empty"
            "#,
        );
        assert_eq!(
            cache.host_patterns().unwrap_err().to_string(),
            "Missing host_patterns in 'empty'"
        );
    }

    #[test]
    fn test_missing_default_host() {
        let cache = cache(
            r#"
            root_hostconf = "simple"
            [[hostconfs]]
            id = "simple"
            hosts = [{ regex = 'www', urlconf = "simple", name = "www" }]
            "#,
        );
        assert_eq!(
            cache.matcher().unwrap_err().to_string(),
            "Missing default_host setting"
        );
    }

    #[test]
    fn test_lookups_are_memoized() {
        let cache = cache(TWO_HOSTCONFS);
        let first = cache.host("www").unwrap();
        let second = cache.host("www").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let table = cache.host_patterns().unwrap();
        assert!(Arc::ptr_eq(&table, &cache.table("simple").unwrap()));
        assert!(Arc::ptr_eq(&cache.matcher().unwrap(), &cache.matcher().unwrap()));
    }

    #[test]
    fn test_unknown_host() {
        let cache = cache(TWO_HOSTCONFS);
        assert!(matches!(
            cache.host("api"),
            Err(ReverseError::NoMatch(NoReverseMatch::UnknownHost(ref name))) if name == "api"
        ));
    }

    #[test]
    fn test_stale_until_cleared() {
        let cache = cache(TWO_HOSTCONFS);
        assert_eq!(cache.match_host("api.example.com").unwrap().host.name(), "with_args");

        cache
            .settings_source()
            .update(|c| c.root_hostconf = Some("other".into()));
        assert_eq!(cache.match_host("api.example.com").unwrap().host.name(), "with_args");

        cache.clear();
        let m = cache.match_host("api.example.com").unwrap();
        assert_eq!(m.host.name(), "api");
        assert_eq!(m.host.urlconf(), "other.urls");
    }

    #[test]
    fn test_clear_is_safe_under_concurrent_reads() {
        let cache = Arc::new(cache(TWO_HOSTCONFS));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        if i % 4 == 0 {
                            cache.clear();
                        }
                        let m = cache.match_host("other.example.com").unwrap();
                        assert_eq!(m.host.name(), "with_args");
                        assert!(cache.host("www").is_ok());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
