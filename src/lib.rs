//! RadioDNS resolution: broadcast bearer, URL or hostname → authoritative
//! FQDN → SPI endpoint → SI document, with optional removal of bearers that
//! do not resolve back to the serving authority.
//!
//! DNS and HTTP are reached through the `DnsResolver` and `HttpClient`
//! traits; nothing is cached between calls.

pub mod application;
pub mod bearer;
pub mod common;
pub mod config;
pub mod error;
pub mod output;
pub mod resolve;
pub mod si;
pub mod source;

pub use application::{resolve_application, CandidateTarget};
pub use bearer::{resolve_bearer_authority, BearerScheme, BearerUri};
pub use common::dns::{DnsError, DnsResolver, HickoryResolver, ServiceRecord};
pub use common::http::{HttpClient, HttpError, HttpResponse, ReqwestClient};
pub use config::{NetworkConfig, ResolveOptions};
pub use error::{FetchErrorKind, RadioDnsError};
pub use output::OutputTarget;
pub use resolve::{RadioDns, Resolution};
pub use si::{BearerValidator, RemovalReason, RemovedBearer, SiDocument};
pub use source::{build_targets, Source, Targets};

/// Path an SPI server publishes its SI document at.
pub const DEFAULT_SI_PATH: &str = "/radiodns/spi/3.1/SI.xml";
/// XML namespace of SPI 3.1 documents.
pub const SPI_NAMESPACE: &str = "http://www.worlddab.org/schemas/spi/31";
/// Service discovery name of the SPI application.
pub const SPI_APP_LEGACY: &str = "radioepg";
pub const DEFAULT_TRANSPORT: &str = "tcp";
/// Parent zone of all bearer lookups.
pub const RADIODNS_ROOT: &str = "radiodns.org.";
pub const DEFAULT_HTTP_PORT: u16 = 80;
