//! Source classification and candidate URL construction.

use std::fmt;

use tracing::debug;

use crate::application::resolve_application;
use crate::bearer::{resolve_authority, split_bearer_scheme, BearerError, BearerUri};
use crate::common::dns::DnsResolver;
use crate::error::RadioDnsError;
use crate::DEFAULT_SI_PATH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpScheme {
    Http,
    Https,
}

impl HttpScheme {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for HttpScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An http(s) URL split into scheme, network location and path.
/// Query and fragment are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpUrl {
    scheme: HttpScheme,
    host: String,
    path: String,
}

impl HttpUrl {
    pub fn parse(s: &str) -> Option<Self> {
        let (scheme, rest) = s.split_once(':')?;
        let scheme = HttpScheme::parse(scheme)?;
        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let (host, path) = match rest.strip_prefix("//") {
            Some(authority) => match authority.find('/') {
                Some(idx) => authority.split_at(idx),
                None => (authority, ""),
            },
            None => ("", rest),
        };
        Some(Self {
            scheme,
            host: host.to_string(),
            path: path.to_string(),
        })
    }

    pub fn scheme(&self) -> HttpScheme {
        self.scheme
    }

    /// Network location: host with optional `:port`.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn with_path(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path)
    }

    /// Candidate SI URLs in the order they should be tried.
    ///
    /// No path: the default SI path only. The default SI path itself: just
    /// that URL. Any other path: the URL as given, the default path, then
    /// the default path mounted under the given path.
    pub fn candidates(&self) -> Vec<String> {
        if self.path.is_empty() {
            return vec![self.with_path(DEFAULT_SI_PATH)];
        }
        let mut urls = vec![self.with_path(&self.path)];
        if self.path != DEFAULT_SI_PATH {
            urls.push(self.with_path(DEFAULT_SI_PATH));
            urls.push(self.with_path(&format!("{}{}", self.path, DEFAULT_SI_PATH)));
        }
        urls
    }
}

impl fmt::Display for HttpUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.host, self.path)
    }
}

/// What kind of input the caller gave us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    BroadcastBearer(BearerUri),
    HttpUrl(HttpUrl),
    BareHost(String),
}

impl Source {
    /// Broadcast schemes win, then http/https, then everything else is a host.
    pub fn classify(input: &str) -> Result<Self, BearerError> {
        if split_bearer_scheme(input).is_some() {
            return BearerUri::parse(input).map(Self::BroadcastBearer);
        }
        if let Some(url) = HttpUrl::parse(input) {
            return Ok(Self::HttpUrl(url));
        }
        Ok(Self::BareHost(input.to_string()))
    }
}

/// Ordered candidate SI URLs plus the authority, when one is known.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Targets {
    pub urls: Vec<String>,
    pub authority: Option<String>,
}

/// `http://<host>/radiodns/spi/3.1/SI.xml`
pub fn default_si_url(host: &str) -> String {
    format!("http://{host}{DEFAULT_SI_PATH}")
}

/// Classify `input` and build the URLs to try.
pub async fn build_targets<R: DnsResolver>(
    resolver: &R,
    input: &str,
    application: &str,
    transport: &str,
) -> Result<Targets, RadioDnsError> {
    match Source::classify(input)? {
        Source::BroadcastBearer(bearer) => {
            let authority = resolve_authority(resolver, &bearer).await?;
            let hosts = resolve_application(resolver, &authority, application, transport).await?;
            Ok(Targets {
                urls: hosts.iter().map(|h| default_si_url(h)).collect(),
                authority: Some(authority),
            })
        }
        Source::HttpUrl(url) => Ok(Targets {
            urls: url.candidates(),
            authority: None,
        }),
        Source::BareHost(host) => {
            match resolve_application(resolver, &host, application, transport).await {
                Ok(hosts) => Ok(Targets {
                    urls: hosts.iter().map(|h| default_si_url(h)).collect(),
                    authority: Some(host),
                }),
                Err(RadioDnsError::ResolutionFailure { name, source }) => {
                    debug!(query = %name, error = %source, "no service discovery for host, using it directly");
                    Ok(Targets {
                        urls: vec![default_si_url(&host)],
                        authority: None,
                    })
                }
                Err(e) => Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::dns::{DnsError, MockResolver, ServiceRecord};

    async fn targets(resolver: &MockResolver, input: &str) -> Targets {
        build_targets(resolver, input, "radioepg", "tcp").await.unwrap()
    }

    #[test]
    fn classify_bearer() {
        assert!(matches!(Source::classify("fm:ce1.c479.09580"), Ok(Source::BroadcastBearer(_))));
        assert!(matches!(Source::classify("DAB:ce1.c181.c1c0.0"), Ok(Source::BroadcastBearer(_))));
        assert!(matches!(Source::classify("fm/c479.ce1.ce15.gb"), Ok(Source::BroadcastBearer(_))));
    }

    #[test]
    fn classify_http() {
        assert!(matches!(Source::classify("http://station.example"), Ok(Source::HttpUrl(_))));
        assert!(matches!(Source::classify("HTTPS://station.example/x"), Ok(Source::HttpUrl(_))));
    }

    #[test]
    fn classify_bare_host() {
        assert_eq!(
            Source::classify("station.example"),
            Ok(Source::BareHost("station.example".into()))
        );
        assert_eq!(
            Source::classify("localhost:8080"),
            Ok(Source::BareHost("localhost:8080".into()))
        );
    }

    #[test]
    fn classify_bearer_without_path_is_invalid() {
        assert!(matches!(Source::classify("hd:"), Err(BearerError::EmptyPath(_))));
    }

    #[test]
    fn http_url_parts() {
        let url = HttpUrl::parse("https://station.example:8443/custom/path?x=1#top").unwrap();
        assert_eq!(url.scheme(), HttpScheme::Https);
        assert_eq!(url.host(), "station.example:8443");
        assert_eq!(url.path(), "/custom/path");
        assert_eq!(url.to_string(), "https://station.example:8443/custom/path");
    }

    #[test]
    fn http_url_without_path() {
        let url = HttpUrl::parse("http://station.example").unwrap();
        assert_eq!(url.host(), "station.example");
        assert_eq!(url.path(), "");
    }

    #[tokio::test]
    async fn http_without_path_uses_default() {
        let resolver = MockResolver::new();
        let t = targets(&resolver, "https://station.example").await;
        assert_eq!(t.urls, vec!["https://station.example/radiodns/spi/3.1/SI.xml"]);
        assert_eq!(t.authority, None);
        assert!(resolver.queries().is_empty());
    }

    #[tokio::test]
    async fn http_with_default_path_is_single_candidate() {
        let resolver = MockResolver::new();
        let t = targets(&resolver, "http://station.example/radiodns/spi/3.1/SI.xml").await;
        assert_eq!(t.urls, vec!["http://station.example/radiodns/spi/3.1/SI.xml"]);
        assert_eq!(t.authority, None);
    }

    #[tokio::test]
    async fn http_with_custom_path_has_three_candidates() {
        let resolver = MockResolver::new();
        let t = targets(&resolver, "http://station.example/custom/path").await;
        assert_eq!(
            t.urls,
            vec![
                "http://station.example/custom/path",
                "http://station.example/radiodns/spi/3.1/SI.xml",
                "http://station.example/custom/path/radiodns/spi/3.1/SI.xml",
            ]
        );
        assert_eq!(t.authority, None);
    }

    #[tokio::test]
    async fn bearer_source_resolves_authority_and_hosts() {
        let resolver = MockResolver::new();
        resolver.add_cname("gb.ce15.ce1.c479.fm.radiodns.org.", "example.org.");
        resolver.add_srv(
            "_radioepg._tcp.example.org.",
            vec![ServiceRecord::new("svc.example.org.", 80, 10, 0)],
        );
        let t = targets(&resolver, "fm/c479.ce1.ce15.gb").await;
        assert_eq!(t.urls, vec!["http://svc.example.org/radiodns/spi/3.1/SI.xml"]);
        assert_eq!(t.authority.as_deref(), Some("example.org."));
        assert_eq!(
            resolver.queries(),
            vec!["gb.ce15.ce1.c479.fm.radiodns.org.", "_radioepg._tcp.example.org."]
        );
    }

    #[tokio::test]
    async fn bearer_source_without_hosts_keeps_authority() {
        let resolver = MockResolver::new();
        resolver.add_cname("gb.ce15.ce1.c479.fm.radiodns.org.", "example.org.");
        resolver.add_srv("_radioepg._tcp.example.org.", vec![]);
        let t = targets(&resolver, "fm/c479.ce1.ce15.gb").await;
        assert!(t.urls.is_empty());
        assert_eq!(t.authority.as_deref(), Some("example.org."));
    }

    #[tokio::test]
    async fn bearer_source_unresolvable_fails() {
        let resolver = MockResolver::new();
        let err = build_targets(&resolver, "fm:ce1.c479.09580", "radioepg", "tcp").await.unwrap_err();
        assert!(matches!(err, RadioDnsError::ResolutionFailure { .. }));
    }

    #[tokio::test]
    async fn bare_host_with_service_discovery() {
        let resolver = MockResolver::new();
        resolver.add_srv(
            "_radioepg._tcp.station.example",
            vec![
                ServiceRecord::new("b.station.example.", 8080, 20, 0),
                ServiceRecord::new("a.station.example.", 80, 10, 0),
            ],
        );
        let t = targets(&resolver, "station.example").await;
        assert_eq!(
            t.urls,
            vec![
                "http://a.station.example/radiodns/spi/3.1/SI.xml",
                "http://b.station.example:8080/radiodns/spi/3.1/SI.xml",
            ]
        );
        assert_eq!(t.authority.as_deref(), Some("station.example"));
    }

    #[tokio::test]
    async fn bare_host_falls_back_to_literal_host() {
        let resolver = MockResolver::new();
        resolver.set_error("_radioepg._tcp.station.example", DnsError::ServFail);
        let t = targets(&resolver, "station.example").await;
        assert_eq!(t.urls, vec!["http://station.example/radiodns/spi/3.1/SI.xml"]);
        assert_eq!(t.authority, None);
    }

    #[tokio::test]
    async fn bare_host_empty_answer_does_not_fall_back() {
        let resolver = MockResolver::new();
        resolver.add_srv("_radioepg._tcp.station.example", vec![]);
        let t = targets(&resolver, "station.example").await;
        assert!(t.urls.is_empty());
        assert_eq!(t.authority.as_deref(), Some("station.example"));
    }
}
