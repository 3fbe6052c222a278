//! Application service discovery: `_<app>._<transport>.<authority>` SRV
//! lookup ranked into candidate hosts.

use tracing::debug;

use crate::common::dns::{DnsError, DnsResolver, ServiceRecord};
use crate::common::domain::strip_root;
use crate::error::RadioDnsError;
use crate::DEFAULT_HTTP_PORT;

/// A ranked `host[:port]` built from one SRV answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTarget {
    pub host: String,
    pub priority: u16,
    pub weight: u16,
}

impl CandidateTarget {
    /// Port 80 is left implicit; every other port is appended.
    pub fn from_record(record: &ServiceRecord) -> Self {
        let target = strip_root(&record.target);
        let host = if record.port == DEFAULT_HTTP_PORT {
            target.to_string()
        } else {
            format!("{}:{}", target, record.port)
        };
        Self {
            host,
            priority: record.priority,
            weight: record.weight,
        }
    }
}

/// `_<application>._<transport>.<authority>`
pub fn service_query_name(authority: &str, application: &str, transport: &str) -> String {
    format!("_{application}._{transport}.{authority}")
}

/// Order by ascending priority, then descending weight. The sort is stable,
/// so records that tie on both keep their DNS order.
pub fn rank_targets(records: &[ServiceRecord]) -> Vec<CandidateTarget> {
    let mut targets: Vec<CandidateTarget> = records.iter().map(CandidateTarget::from_record).collect();
    targets.sort_by(|a, b| a.priority.cmp(&b.priority).then(b.weight.cmp(&a.weight)));
    targets
}

/// Discover the hosts serving `application` for `authority`.
///
/// An empty answer set is `Ok(vec![])`; any other DNS failure is a
/// `ResolutionFailure`.
pub async fn resolve_application<R: DnsResolver>(
    resolver: &R,
    authority: &str,
    application: &str,
    transport: &str,
) -> Result<Vec<String>, RadioDnsError> {
    let name = service_query_name(authority, application, transport);
    let records = match resolver.query_srv(&name).await {
        Ok(records) => records,
        Err(DnsError::NoRecords) => Vec::new(),
        Err(e) => return Err(RadioDnsError::resolution(&name, e)),
    };
    let hosts: Vec<String> = rank_targets(&records).into_iter().map(|t| t.host).collect();
    debug!(query = %name, hosts = ?hosts, "resolved application hosts");
    Ok(hosts)
}
