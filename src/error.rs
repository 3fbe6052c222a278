use std::fmt;

use thiserror::Error;

use crate::bearer::BearerError;
use crate::common::dns::DnsError;

/// Why a single candidate URL did not yield a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// Server answered with something other than 200.
    Status(u16),
    /// Connection, TLS or body read failure.
    Transport(String),
    /// Body is not well-formed XML.
    Parse(String),
    /// Document could not be written back out.
    Serialize(String),
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "returned a non-200 status ({status})"),
            Self::Transport(e) => write!(f, "request failed: {e}"),
            Self::Parse(e) => write!(f, "is not a valid SI document: {e}"),
            Self::Serialize(e) => write!(f, "could not be serialised: {e}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RadioDnsError {
    #[error("invalid bearer: {0}")]
    InvalidBearer(#[from] BearerError),
    #[error("failed resolving {name}: {source}")]
    ResolutionFailure { name: String, source: DnsError },
    #[error("{url} {kind}")]
    Fetch { url: String, kind: FetchErrorKind },
    #[error("failed writing to {target}: {source}")]
    OutputWriteFailure {
        target: String,
        source: std::io::Error,
    },
    #[error("no candidate URLs for {input}")]
    NoCandidates { input: String },
    #[error("all {attempts} attempts to obtain SI file for {input} failed")]
    AllCandidatesFailed { input: String, attempts: usize },
}

impl RadioDnsError {
    pub(crate) fn resolution(name: &str, source: DnsError) -> Self {
        Self::ResolutionFailure {
            name: name.to_string(),
            source,
        }
    }

    pub(crate) fn fetch(url: &str, kind: FetchErrorKind) -> Self {
        Self::Fetch {
            url: url.to_string(),
            kind,
        }
    }
}
