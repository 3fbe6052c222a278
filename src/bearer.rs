//! Bearer URI → authority FQDN via the `radiodns.org` CNAME tree.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::common::dns::{DnsError, DnsResolver};
use crate::common::domain::reverse_labels;
use crate::error::RadioDnsError;
use crate::RADIODNS_ROOT;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BearerError {
    #[error("not a broadcast bearer: {0}")]
    UnsupportedScheme(String),
    #[error("bearer has no transmission identifier: {0}")]
    EmptyPath(String),
}

/// Broadcast bearer schemes known to RadioDNS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BearerScheme {
    Fm,
    Dab,
    Drm,
    Amss,
    Hd,
}

impl BearerScheme {
    /// Parse scheme string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fm" => Some(Self::Fm),
            "dab" => Some(Self::Dab),
            "drm" => Some(Self::Drm),
            "amss" => Some(Self::Amss),
            "hd" => Some(Self::Hd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fm => "fm",
            Self::Dab => "dab",
            Self::Drm => "drm",
            Self::Amss => "amss",
            Self::Hd => "hd",
        }
    }
}

impl fmt::Display for BearerScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split `uri` into a broadcast scheme and the rest.
///
/// Accepts the URI form `fm:ce1.c479.09580` and the path form
/// `fm/c479.ce1.ce15.gb`.
pub(crate) fn split_bearer_scheme(uri: &str) -> Option<(BearerScheme, &str)> {
    let idx = uri.find([':', '/'])?;
    let scheme = BearerScheme::parse(&uri[..idx])?;
    Some((scheme, &uri[idx + 1..]))
}

/// A parsed broadcast bearer identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerUri {
    scheme: BearerScheme,
    path: String,
}

impl BearerUri {
    pub fn parse(uri: &str) -> Result<Self, BearerError> {
        let (scheme, rest) =
            split_bearer_scheme(uri).ok_or_else(|| BearerError::UnsupportedScheme(uri.to_string()))?;
        // Query and fragment are not part of the identifier.
        let path = rest.split(['?', '#']).next().unwrap_or_default();
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return Err(BearerError::EmptyPath(uri.to_string()));
        }
        Ok(Self {
            scheme,
            path: path.to_string(),
        })
    }

    pub fn scheme(&self) -> BearerScheme {
        self.scheme
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// DNS name to CNAME-query: reversed path labels under
    /// `<scheme>.radiodns.org.`
    pub fn query_name(&self) -> String {
        format!("{}.{}.{}", reverse_labels(&self.path), self.scheme, RADIODNS_ROOT)
    }
}

impl FromStr for BearerUri {
    type Err = BearerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BearerUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.path)
    }
}

/// Resolve a bearer identifier string to its authority FQDN.
pub async fn resolve_bearer_authority<R: DnsResolver>(
    resolver: &R,
    bearer_uri: &str,
) -> Result<String, RadioDnsError> {
    let bearer = BearerUri::parse(bearer_uri)?;
    resolve_authority(resolver, &bearer).await
}

/// One CNAME query; the first answer is the authority. Any DNS failure and
/// an empty answer both surface as `ResolutionFailure`.
pub async fn resolve_authority<R: DnsResolver>(
    resolver: &R,
    bearer: &BearerUri,
) -> Result<String, RadioDnsError> {
    let name = bearer.query_name();
    let targets = resolver
        .query_cname(&name)
        .await
        .map_err(|e| RadioDnsError::resolution(&name, e))?;
    let authority = targets
        .into_iter()
        .next()
        .ok_or_else(|| RadioDnsError::resolution(&name, DnsError::NoRecords))?;
    debug!(bearer = %bearer, authority = %authority, "resolved bearer authority");
    Ok(authority)
}
