//! Urlconfs: path reversal and the per-request active urlconf.
//!
//! Hosts only name their urlconf. Turning a view name into a path is the job
//! of a [`PathReverser`]; [`UrlConfRegistry`] is the in-memory one built from
//! configuration.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use regex::Regex;

use crate::config::schema::UrlconfConfig;
use crate::error::{ConfigError, NoReverseMatch};
use crate::routing::pattern::{normalize, Template};

tokio::task_local! {
    static ACTIVE_URLCONF: Arc<str>;
}

/// Run `fut` with `urlconf` active. The previous value is restored when the
/// future completes, is dropped or panics.
pub async fn scope<F>(urlconf: impl Into<Arc<str>>, fut: F) -> F::Output
where
    F: Future,
{
    ACTIVE_URLCONF.scope(urlconf.into(), fut).await
}

/// Synchronous counterpart of [`scope`].
pub fn sync_scope<R>(urlconf: impl Into<Arc<str>>, f: impl FnOnce() -> R) -> R {
    ACTIVE_URLCONF.sync_scope(urlconf.into(), f)
}

/// The urlconf activated for the current task, if any.
pub fn current_urlconf() -> Option<Arc<str>> {
    ACTIVE_URLCONF.try_with(Arc::clone).ok()
}

/// Produces the path of a named view within a urlconf.
pub trait PathReverser: Send + Sync {
    fn reverse_path(
        &self,
        urlconf: &str,
        view: &str,
        args: &[String],
        kwargs: &BTreeMap<String, String>,
    ) -> Result<String, NoReverseMatch>;
}

#[derive(Debug)]
struct PathRoute {
    name: String,
    verifier: Regex,
    templates: Vec<Template>,
}

/// Named path patterns grouped by urlconf id.
#[derive(Debug, Default)]
pub struct UrlConfRegistry {
    urlconfs: HashMap<String, Vec<PathRoute>>,
}

impl UrlConfRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(urlconfs: &[UrlconfConfig]) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for urlconf in urlconfs {
            registry.register(
                &urlconf.id,
                urlconf.patterns.iter().map(|p| (p.name.as_str(), p.regex.as_str())),
            )?;
        }
        Ok(registry)
    }

    /// Add `(view name, path regex)` entries to `urlconf`, keeping order.
    /// Path regexes are written without the leading slash.
    pub fn register<'a>(
        &mut self,
        urlconf: &str,
        routes: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<(), ConfigError> {
        let entries = self.urlconfs.entry(urlconf.to_owned()).or_default();
        for (name, regex) in routes {
            let verifier = Regex::new(&format!("^(?:{regex})")).map_err(|source| {
                ConfigError::InvalidPattern {
                    pattern: regex.to_owned(),
                    source,
                }
            })?;
            entries.push(PathRoute {
                name: name.to_owned(),
                verifier,
                templates: normalize(regex)?,
            });
        }
        Ok(())
    }

    pub fn contains(&self, urlconf: &str) -> bool {
        self.urlconfs.contains_key(urlconf)
    }
}

impl PathReverser for UrlConfRegistry {
    fn reverse_path(
        &self,
        urlconf: &str,
        view: &str,
        args: &[String],
        kwargs: &BTreeMap<String, String>,
    ) -> Result<String, NoReverseMatch> {
        let routes = self
            .urlconfs
            .get(urlconf)
            .ok_or_else(|| NoReverseMatch::UnknownUrlconf(urlconf.to_owned()))?;

        for route in routes.iter().filter(|route| route.name == view) {
            for template in &route.templates {
                if let Some(candidate) = template.render_args(args, kwargs) {
                    if route.verifier.is_match(&candidate) {
                        return Ok(format!("/{candidate}"));
                    }
                }
            }
        }

        Err(NoReverseMatch::Path {
            view: view.to_owned(),
            urlconf: urlconf.to_owned(),
            args: args.to_vec(),
            kwargs: kwargs.clone(),
        })
    }
}
