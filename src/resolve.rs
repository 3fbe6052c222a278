use tracing::{error, info, warn};

use crate::common::dns::DnsResolver;
use crate::common::http::HttpClient;
use crate::config::ResolveOptions;
use crate::error::{FetchErrorKind, RadioDnsError};
use crate::output::OutputTarget;
use crate::si::{fetch_document, BearerValidator, RemovedBearer};
use crate::source::{build_targets, Targets};

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Candidate URL that produced the document.
    pub url: String,
    pub authority: Option<String>,
    /// Serialised document, as written to the output target.
    pub document: Vec<u8>,
    /// Bearers stripped during validation; empty when validation is off.
    pub removed: Vec<RemovedBearer>,
}

// ---------------------------------------------------------------------------
// RadioDns
// ---------------------------------------------------------------------------

/// Drives classification, candidate fetching and bearer validation.
///
/// Candidates are tried strictly in order; the first one that yields a
/// document wins and nothing after it is requested.
pub struct RadioDns<R: DnsResolver, H: HttpClient> {
    resolver: R,
    http: H,
    options: ResolveOptions,
}

impl<R: DnsResolver, H: HttpClient> RadioDns<R, H> {
    pub fn new(resolver: R, http: H) -> Self {
        Self {
            resolver,
            http,
            options: ResolveOptions::default(),
        }
    }

    pub fn options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Candidate URLs and authority for `source`, without fetching.
    pub async fn build_targets(&self, source: &str) -> Result<Targets, RadioDnsError> {
        build_targets(
            &self.resolver,
            source,
            &self.options.application,
            &self.options.transport,
        )
        .await
    }

    /// Fetch one candidate, validate it if asked to, and write it out.
    ///
    /// A failed write is logged and does not fail the fetch.
    pub async fn fetch_and_validate(
        &self,
        url: &str,
        authority: Option<&str>,
    ) -> Result<Resolution, RadioDnsError> {
        let mut doc = fetch_document(&self.http, url).await?;

        let removed = if self.options.remove_non_authoritative_bearers {
            BearerValidator::new(&self.resolver)
                .application(&self.options.application)
                .transport(&self.options.transport)
                .validate(&mut doc, url, authority)
                .await
        } else {
            Vec::new()
        };

        let document = doc
            .to_bytes()
            .map_err(|e| RadioDnsError::fetch(url, FetchErrorKind::Serialize(e.to_string())))?;

        let target = OutputTarget::from_path(self.options.output.as_deref());
        if let Err(e) = target.write(&document) {
            error!(error = %e, "could not write SI document");
        }

        Ok(Resolution {
            url: url.to_string(),
            authority: authority.map(str::to_string),
            document,
            removed,
        })
    }

    /// Full pipeline for one source.
    pub async fn resolve_and_fetch(&self, source: &str) -> Result<Resolution, RadioDnsError> {
        let targets = self.build_targets(source).await?;
        if targets.urls.is_empty() {
            warn!(source, authority = ?targets.authority, "no candidate URLs");
            return Err(RadioDnsError::NoCandidates {
                input: source.to_string(),
            });
        }

        for url in &targets.urls {
            match self.fetch_and_validate(url, targets.authority.as_deref()).await {
                Ok(resolution) => {
                    info!(url = %resolution.url, removed = resolution.removed.len(), "obtained SI document");
                    return Ok(resolution);
                }
                Err(e @ RadioDnsError::Fetch { .. }) => {
                    warn!(url = %url, error = %e, "candidate failed");
                }
                Err(e) => return Err(e),
            }
        }

        Err(RadioDnsError::AllCandidatesFailed {
            input: source.to_string(),
            attempts: targets.urls.len(),
        })
    }
}
