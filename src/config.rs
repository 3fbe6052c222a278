use std::path::PathBuf;
use std::time::Duration;

use crate::{DEFAULT_TRANSPORT, SPI_APP_LEGACY};

/// Per-run options for `RadioDns::resolve_and_fetch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// File to write the document to; standard output when `None`.
    pub output: Option<PathBuf>,
    /// Strip bearers that do not resolve back to the serving authority.
    pub remove_non_authoritative_bearers: bool,
    /// Service discovery application name.
    pub application: String,
    /// Service discovery transport protocol.
    pub transport: String,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            output: None,
            remove_non_authoritative_bearers: false,
            application: SPI_APP_LEGACY.to_string(),
            transport: DEFAULT_TRANSPORT.to_string(),
        }
    }
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn remove_non_authoritative_bearers(mut self, remove: bool) -> Self {
        self.remove_non_authoritative_bearers = remove;
        self
    }

    pub fn application(mut self, application: &str) -> Self {
        self.application = application.to_string();
        self
    }

    pub fn transport(mut self, transport: &str) -> Self {
        self.transport = transport.to_string();
        self
    }
}

/// Transport settings for the DNS and HTTP collaborators.
///
/// `None` keeps the underlying library default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub dns_timeout: Option<Duration>,
    pub dns_attempts: Option<usize>,
    pub http_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            dns_timeout: None,
            dns_attempts: None,
            http_timeout: None,
            user_agent: concat!("radiodns/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
