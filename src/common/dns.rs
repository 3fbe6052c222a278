use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::{ResolveError, ResolveErrorKind, TokioResolver};
use thiserror::Error;
use tracing::debug;

use crate::config::NetworkConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsError {
    #[error("NXDOMAIN: domain does not exist")]
    NxDomain,
    #[error("no records of the requested type")]
    NoRecords,
    #[error("SERVFAIL: server failure")]
    ServFail,
    #[error("timeout")]
    Timeout,
    #[error("DNS error: {0}")]
    Other(String),
}

/// A single SRV answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Target host as returned by DNS, usually with the trailing root dot.
    pub target: String,
    pub port: u16,
    /// Lower is more preferred.
    pub priority: u16,
    /// Higher is more preferred among equal priorities.
    pub weight: u16,
}

impl ServiceRecord {
    pub fn new(target: &str, port: u16, priority: u16, weight: u16) -> Self {
        Self {
            target: target.to_string(),
            port,
            priority,
            weight,
        }
    }
}

/// DNS resolver trait for abstracting the two lookups RadioDNS needs.
///
/// `query_srv` must report an empty answer set as `Err(DnsError::NoRecords)`
/// or `Ok(vec![])`; callers treat both the same.
pub trait DnsResolver: Clone + Send + Sync + 'static {
    fn query_cname(&self, name: &str) -> impl Future<Output = Result<Vec<String>, DnsError>> + Send;
    fn query_srv(&self, name: &str) -> impl Future<Output = Result<Vec<ServiceRecord>, DnsError>> + Send;
}

/// Hickory DNS resolver implementation
#[derive(Clone)]
pub struct HickoryResolver {
    resolver: TokioResolver,
}

impl HickoryResolver {
    /// Resolver using the system configuration, falling back to hickory's
    /// default upstreams when none can be read.
    pub fn new(network: &NetworkConfig) -> Self {
        let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                debug!(error = %e, "system resolver configuration unavailable, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        if let Some(timeout) = network.dns_timeout {
            opts.timeout = timeout;
        }
        if let Some(attempts) = network.dns_attempts {
            opts.attempts = attempts;
        }
        Self::with_config(config, opts)
    }

    pub fn with_config(config: ResolverConfig, opts: ResolverOpts) -> Self {
        let resolver = TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build();
        Self { resolver }
    }

    fn classify_error(e: &ResolveError) -> DnsError {
        if let ResolveErrorKind::Proto(proto) = e.kind() {
            match proto.kind() {
                ProtoErrorKind::NoRecordsFound { response_code, .. } => {
                    return match *response_code {
                        ResponseCode::NXDomain => DnsError::NxDomain,
                        ResponseCode::ServFail => DnsError::ServFail,
                        ResponseCode::NoError => DnsError::NoRecords,
                        other => DnsError::Other(format!("{other:?}")),
                    };
                }
                ProtoErrorKind::Timeout => return DnsError::Timeout,
                _ => {}
            }
        }
        let msg = e.to_string().to_lowercase();
        if msg.contains("timed out") || msg.contains("timeout") {
            DnsError::Timeout
        } else {
            DnsError::Other(e.to_string())
        }
    }
}

impl DnsResolver for HickoryResolver {
    async fn query_cname(&self, name: &str) -> Result<Vec<String>, DnsError> {
        debug!(name, "CNAME query");
        match self.resolver.lookup(name, RecordType::CNAME).await {
            Ok(lookup) => {
                let targets: Vec<String> = lookup
                    .iter()
                    .filter_map(|rdata| rdata.as_cname())
                    .map(|cname| cname.0.to_string())
                    .collect();
                Ok(targets)
            }
            Err(e) => Err(Self::classify_error(&e)),
        }
    }

    async fn query_srv(&self, name: &str) -> Result<Vec<ServiceRecord>, DnsError> {
        debug!(name, "SRV query");
        match self.resolver.srv_lookup(name).await {
            Ok(lookup) => {
                let records: Vec<ServiceRecord> = lookup
                    .iter()
                    .map(|srv| ServiceRecord {
                        target: srv.target().to_string(),
                        port: srv.port(),
                        priority: srv.priority(),
                        weight: srv.weight(),
                    })
                    .collect();
                Ok(records)
            }
            Err(e) => Err(Self::classify_error(&e)),
        }
    }
}

/// Mock DNS resolver for testing
#[derive(Clone, Default)]
pub struct MockResolver {
    cname_records: Arc<Mutex<HashMap<String, Vec<String>>>>,
    srv_records: Arc<Mutex<HashMap<String, Vec<ServiceRecord>>>>,
    errors: Arc<Mutex<HashMap<String, DnsError>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cname(&self, name: &str, target: &str) {
        self.cname_records
            .lock()
            .unwrap()
            .entry(name.to_lowercase())
            .or_default()
            .push(target.to_string());
    }

    pub fn add_srv(&self, name: &str, records: Vec<ServiceRecord>) {
        self.srv_records.lock().unwrap().insert(name.to_lowercase(), records);
    }

    /// Make every query for `name` fail with `error`.
    pub fn set_error(&self, name: &str, error: DnsError) {
        self.errors.lock().unwrap().insert(name.to_lowercase(), error);
    }

    /// Names queried so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    /// Unknown names answer NXDOMAIN, like a real zone would.
    fn answer<T: Clone>(&self, name: &str, table: &Mutex<HashMap<String, Vec<T>>>) -> Result<Vec<T>, DnsError> {
        let key = name.to_lowercase();
        self.queries.lock().unwrap().push(key.clone());
        if let Some(err) = self.errors.lock().unwrap().get(&key) {
            return Err(err.clone());
        }
        table.lock().unwrap().get(&key).cloned().ok_or(DnsError::NxDomain)
    }
}

impl DnsResolver for MockResolver {
    async fn query_cname(&self, name: &str) -> Result<Vec<String>, DnsError> {
        self.answer(name, &self.cname_records)
    }

    async fn query_srv(&self, name: &str) -> Result<Vec<ServiceRecord>, DnsError> {
        self.answer(name, &self.srv_records)
    }
}
