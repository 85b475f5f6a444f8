//! Ordered, name-unique host tables.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ConfigError, NoReverseMatch};
use crate::routing::host::{Host, HostSpec};

/// Name no host may use.
pub const RESERVED_HOST_NAME: &str = "default";

/// Hosts in declaration order, plus a name index built alongside.
///
/// Never mutated after construction; a reload builds a new table.
#[derive(Debug, Default)]
pub struct HostTable {
    hosts: Vec<Arc<Host>>,
    index: HashMap<String, usize>,
}

impl HostTable {
    /// Compile `specs` in order, applying `prefix` to each urlconf.
    pub fn new<I, S>(prefix: &str, specs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<HostSpec>,
    {
        let mut table = HostTable::default();

        for spec in specs {
            let spec = spec.into();
            if table.index.contains_key(&spec.name) {
                return Err(ConfigError::DuplicateHost(spec.name));
            }
            if spec.name == RESERVED_HOST_NAME {
                return Err(ConfigError::ReservedHost(spec.name));
            }

            let host = Host::from_spec(spec, prefix)?;
            table.index.insert(host.name().to_owned(), table.hosts.len());
            table.hosts.push(Arc::new(host));
        }

        Ok(table)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Host>> {
        self.hosts.iter()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Host>> {
        self.index.get(name).map(|&i| &self.hosts[i])
    }

    /// Case-sensitive lookup by name.
    pub fn host(&self, name: &str) -> Result<&Arc<Host>, NoReverseMatch> {
        self.get(name)
            .ok_or_else(|| NoReverseMatch::UnknownHost(name.to_owned()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(|h| h.name())
    }
}

/// Build a host table, e.g.
///
/// ```
/// use host_router::routing::{patterns, HostSpec};
///
/// let hosts = patterns("mysite", [
///     HostSpec::new(r"www", "urls.default", "www"),
///     (r"api", "urls.api", "api").into(),
/// ]).unwrap();
/// assert_eq!(hosts.host("api").unwrap().urlconf(), "mysite.urls.api");
/// ```
pub fn patterns<I, S>(prefix: &str, specs: I) -> Result<HostTable, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: Into<HostSpec>,
{
    HostTable::new(prefix, specs)
}
