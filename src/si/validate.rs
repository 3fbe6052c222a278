use std::fmt;

use tracing::{debug, warn};

use super::document::{ElementId, SiDocument};
use crate::application::resolve_application;
use crate::bearer::{resolve_bearer_authority, split_bearer_scheme};
use crate::common::dns::DnsResolver;
use crate::common::domain::strip_root;
use crate::source::HttpUrl;
use crate::{DEFAULT_TRANSPORT, SPI_APP_LEGACY};

/// Why a bearer was taken out of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalReason {
    /// The bearer's own RadioDNS lookup failed.
    Unresolvable(String),
    /// The bearer points at a different authority than the one we resolved.
    AuthorityMismatch { expected: String, actual: String },
    /// The bearer's authority does not list the host that served the document.
    HostNotListed { host: String, hosts: Vec<String> },
    /// Service discovery against the bearer's authority failed.
    DiscoveryFailed(String),
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolvable(e) => write!(f, "failed resolving: {e}"),
            Self::AuthorityMismatch { expected, actual } => write!(f, "{actual} != {expected}"),
            Self::HostNotListed { host, hosts } => write!(f, "{host} not in {hosts:?}"),
            Self::DiscoveryFailed(e) => write!(f, "service discovery failed: {e}"),
        }
    }
}

/// A bearer removed during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedBearer {
    pub bearer: String,
    pub service: String,
    pub reason: RemovalReason,
}

/// Strips bearers that do not resolve back to the document's authority.
///
/// With a known authority each broadcast bearer must CNAME to that name
/// (compared case-sensitively, ignoring a trailing root dot). Without one,
/// the bearer's authority must advertise the host the document came from.
/// Non-broadcast bearers are never touched.
pub struct BearerValidator<'a, R: DnsResolver> {
    resolver: &'a R,
    application: &'a str,
    transport: &'a str,
}

impl<'a, R: DnsResolver> BearerValidator<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self {
            resolver,
            application: SPI_APP_LEGACY,
            transport: DEFAULT_TRANSPORT,
        }
    }

    pub fn application(mut self, application: &'a str) -> Self {
        self.application = application;
        self
    }

    pub fn transport(mut self, transport: &'a str) -> Self {
        self.transport = transport;
        self
    }

    /// Validate every service in `doc`, removing failing bearers in place.
    /// Decisions are made against a snapshot; removals are applied last.
    pub async fn validate(
        &self,
        doc: &mut SiDocument,
        url: &str,
        expected_authority: Option<&str>,
    ) -> Vec<RemovedBearer> {
        let host = HttpUrl::parse(url)
            .map(|u| u.host().to_ascii_lowercase())
            .unwrap_or_default();
        let mut removals: Vec<(ElementId, RemovedBearer)> = Vec::new();

        for service in doc.services() {
            for bearer in doc.bearers(service) {
                let Some(id) = bearer.id else { continue };
                if split_bearer_scheme(&id).is_none() {
                    continue;
                }
                let Some(reason) = self.check(&id, &host, expected_authority).await else {
                    debug!(bearer = %id, url, "bearer verified");
                    continue;
                };
                let name = doc.service_name(service);
                warn!(bearer = %id, service = %name, url, %reason, "removing bearer");
                removals.push((
                    bearer.element,
                    RemovedBearer {
                        bearer: id,
                        service: name,
                        reason,
                    },
                ));
            }
        }

        removals
            .into_iter()
            .map(|(element, removed)| {
                doc.remove(element);
                removed
            })
            .collect()
    }

    async fn check(&self, bearer: &str, host: &str, expected_authority: Option<&str>) -> Option<RemovalReason> {
        let authority = match resolve_bearer_authority(self.resolver, bearer).await {
            Ok(authority) => authority,
            Err(e) => return Some(RemovalReason::Unresolvable(e.to_string())),
        };

        match expected_authority {
            Some(expected) if strip_root(&authority) == strip_root(expected) => None,
            Some(expected) => Some(RemovalReason::AuthorityMismatch {
                expected: expected.to_string(),
                actual: authority,
            }),
            None => match resolve_application(self.resolver, &authority, self.application, self.transport).await {
                Ok(hosts) if hosts.iter().any(|h| h.eq_ignore_ascii_case(host)) => None,
                Ok(hosts) => Some(RemovalReason::HostNotListed {
                    host: host.to_string(),
                    hosts,
                }),
                Err(e) => Some(RemovalReason::DiscoveryFailed(e.to_string())),
            },
        }
    }
}
