use tracing::debug;

use super::document::SiDocument;
use crate::common::http::HttpClient;
use crate::error::{FetchErrorKind, RadioDnsError};

/// GET `url` and parse the body as an SI document.
///
/// Anything but a 200, a transport failure, or a body that is not
/// well-formed XML is a `Fetch` error for this URL.
pub async fn fetch_document<H: HttpClient>(http: &H, url: &str) -> Result<SiDocument, RadioDnsError> {
    let response = http
        .get(url)
        .await
        .map_err(|e| RadioDnsError::fetch(url, FetchErrorKind::Transport(e.to_string())))?;
    if response.status != 200 {
        return Err(RadioDnsError::fetch(url, FetchErrorKind::Status(response.status)));
    }
    debug!(url, bytes = response.body.len(), "fetched SI document");
    SiDocument::parse(&response.body).map_err(|e| RadioDnsError::fetch(url, FetchErrorKind::Parse(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::http::{HttpError, MockHttpClient};

    const URL: &str = "http://svc.example.org/radiodns/spi/3.1/SI.xml";

    #[tokio::test]
    async fn fetch_ok() {
        let http = MockHttpClient::new();
        http.add_response(
            URL,
            200,
            r#"<serviceInformation xmlns="http://www.worlddab.org/schemas/spi/31"><services/></serviceInformation>"#,
        );
        let doc = fetch_document(&http, URL).await.unwrap();
        assert_eq!(doc.root_name(), "serviceInformation");
    }

    #[tokio::test]
    async fn fetch_non_200() {
        let http = MockHttpClient::new();
        let err = fetch_document(&http, URL).await.unwrap_err();
        match err {
            RadioDnsError::Fetch { url, kind } => {
                assert_eq!(url, URL);
                assert_eq!(kind, FetchErrorKind::Status(404));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn fetch_redirect_is_not_followed() {
        let http = MockHttpClient::new();
        http.add_response(URL, 301, "");
        let err = fetch_document(&http, URL).await.unwrap_err();
        assert!(matches!(
            err,
            RadioDnsError::Fetch { kind: FetchErrorKind::Status(301), .. }
        ));
    }

    #[tokio::test]
    async fn fetch_malformed_xml() {
        let http = MockHttpClient::new();
        http.add_response(URL, 200, "<serviceInformation><services></serviceInformation>");
        let err = fetch_document(&http, URL).await.unwrap_err();
        assert!(matches!(
            err,
            RadioDnsError::Fetch { kind: FetchErrorKind::Parse(_), .. }
        ));
    }

    #[tokio::test]
    async fn fetch_transport_error() {
        let http = MockHttpClient::new();
        http.add_error(URL, HttpError::Request("connection refused".into()));
        let err = fetch_document(&http, URL).await.unwrap_err();
        assert!(matches!(
            err,
            RadioDnsError::Fetch { kind: FetchErrorKind::Transport(_), .. }
        ));
    }
}
