//! # Result Locators
//!
//! URI-shaped pointers to a persisted result:
//! `<kind>://<host>[:<port>]/<namespace>/<key>`, e.g.
//! `memory://127.0.0.1:6379/0/5f0c...`. A locator carries everything needed to
//! reach the right store instance, independent of which worker produced it.

use crate::error::{Result, TaskhiveError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResultLocator {
    pub kind: String,
    pub host: String,
    pub port: Option<u16>,
    pub namespace: String,
    pub key: String,
}

impl ResultLocator {
    pub fn new(
        kind: impl Into<String>,
        host: impl Into<String>,
        port: Option<u16>,
        namespace: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            host: host.into(),
            port,
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    /// Whether this locator points at the same store instance as `other`
    pub fn same_store(&self, other: &ResultLocator) -> bool {
        self.kind == other.kind
            && self.host == other.host
            && self.port == other.port
            && self.namespace == other.namespace
    }
}

impl fmt::Display for ResultLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.kind, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, "/{}/{}", self.namespace, self.key)
    }
}

impl FromStr for ResultLocator {
    type Err = TaskhiveError;

    fn from_str(s: &str) -> Result<Self> {
        let url = Url::parse(s).map_err(|e| TaskhiveError::invalid_locator(s, e.to_string()))?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TaskhiveError::invalid_locator(s, "missing host"))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.collect())
            .unwrap_or_default();
        let (namespace, key) = match segments.as_slice() {
            [namespace, key] if !namespace.is_empty() && !key.is_empty() => (*namespace, *key),
            _ => {
                return Err(TaskhiveError::invalid_locator(
                    s,
                    "expected /<namespace>/<key> path",
                ))
            }
        };

        Ok(Self::new(url.scheme(), host, url.port(), namespace, key))
    }
}

impl TryFrom<String> for ResultLocator {
    type Error = TaskhiveError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ResultLocator> for String {
    fn from(locator: ResultLocator) -> Self {
        locator.to_string()
    }
}
