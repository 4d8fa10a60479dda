//! Metadata request resolving the current client archive URL.
//!
//! The configured environment answers with a small JSON document naming the
//! archive that currently serves the symbolication client. The URL embeds
//! the API token as a query parameter, so every surfaced copy of it goes
//! through [`redact_api_token`] first.

use serde::Deserialize;
use tracing::{debug, info};

use super::config::DssClientConfig;
use crate::error::{DtsymError, DtsymResult};

/// Fixed-length replacement for the token value in surfaced URLs.
const REDACTED_TOKEN: &str = "-----";

// ============================================================================
// Descriptor
// ============================================================================

/// Remote description of the currently served client archive.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientDescriptor {
    /// Download URL of the zip archive containing the client binary.
    #[serde(rename = "dssClientUrl", default)]
    pub dss_client_url: String,
}

/// Fetches and validates the client descriptor for the configured
/// environment.
///
/// # Errors
///
/// Returns an error if the request fails, the response status is not a
/// success, the body is not valid JSON, or the URL field is missing or
/// empty. All of these are absorbable by the cache fallback.
pub async fn fetch_client_descriptor(
    config: &DssClientConfig,
) -> DtsymResult<ClientDescriptor> {
    let url = config.metadata_url();
    let display_url = redact_api_token(&url);
    debug!("Requesting client descriptor from {}", display_url);

    let response = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .map_err(|source| DtsymError::MetadataRequest {
            url: display_url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DtsymError::MetadataStatus {
            url: display_url,
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("unknown").to_string(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|source| DtsymError::MetadataRequest {
            url: display_url,
            source,
        })?;

    let descriptor: ClientDescriptor = serde_json::from_str(&body)?;
    if descriptor.dss_client_url.is_empty() {
        return Err(DtsymError::DescriptorUrlMissing);
    }

    info!("Remote DSS client: {}", descriptor.dss_client_url);
    Ok(descriptor)
}

/// Replaces the API token value in a metadata URL with a fixed marker.
///
/// Everything after `Api-Token=` is dropped; the metadata URL carries the
/// token as its only query parameter.
pub fn redact_api_token(url: &str) -> String {
    match url.split_once("Api-Token=") {
        Some((head, _)) => format!("{head}Api-Token={REDACTED_TOKEN}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(server: &str) -> DssClientConfig {
        DssClientConfig::new(server, "this_is_just_a_mock_token_dont_report_pls")
    }

    #[test]
    fn redaction_replaces_the_token_value() {
        let url = "https://dynatrace.com/api/config/v1/symfiles/dtxdss-download?Api-Token=12345";
        assert_eq!(
            redact_api_token(url),
            "https://dynatrace.com/api/config/v1/symfiles/dtxdss-download?Api-Token=-----"
        );
    }

    #[test]
    fn redaction_drops_anything_after_the_token() {
        let url = "https://dynatrace.com/api/config/v1/symfiles/dtxdss-download?Api-Token=12345&otherArg=123";
        assert_eq!(
            redact_api_token(url),
            "https://dynatrace.com/api/config/v1/symfiles/dtxdss-download?Api-Token=-----"
        );
    }

    #[test]
    fn redaction_leaves_tokenless_urls_alone() {
        assert_eq!(
            redact_api_token("https://dynatrace.com/some/path"),
            "https://dynatrace.com/some/path"
        );
    }

    #[tokio::test]
    async fn descriptor_is_parsed_from_a_success_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/config/v1/symfiles/dtxdss-download")
            .match_query(mockito::Matcher::Regex("Api-Token=.*".into()))
            .with_status(200)
            .with_body(r#"{"dssClientUrl": "http://127.0.0.1:8000/DTXDssClient.zip"}"#)
            .create_async()
            .await;

        let descriptor = fetch_client_descriptor(&test_config(&server.url()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            descriptor.dss_client_url,
            "http://127.0.0.1:8000/DTXDssClient.zip"
        );
    }

    #[tokio::test]
    async fn error_status_is_reported_with_a_redacted_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/config/v1/symfiles/dtxdss-download")
            .match_query(mockito::Matcher::Regex("Api-Token=.*".into()))
            .with_status(401)
            .create_async()
            .await;

        let err = fetch_client_descriptor(&test_config(&server.url()))
            .await
            .unwrap_err();

        match &err {
            DtsymError::MetadataStatus { url, status, .. } => {
                assert_eq!(*status, 401);
                assert!(url.ends_with("Api-Token=-----"), "url not redacted: {url}");
                assert!(!url.contains("mock_token"));
            }
            other => panic!("expected MetadataStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_json_reports_a_missing_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/config/v1/symfiles/dtxdss-download")
            .match_query(mockito::Matcher::Regex("Api-Token=.*".into()))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let err = fetch_client_descriptor(&test_config(&server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, DtsymError::DescriptorUrlMissing));
    }

    #[tokio::test]
    async fn wrong_json_key_reports_a_missing_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/config/v1/symfiles/dtxdss-download")
            .match_query(mockito::Matcher::Regex("Api-Token=.*".into()))
            .with_status(200)
            .with_body(r#"{"dssClientUrl1": "http://127.0.0.1:8000/DTXDssClient.zip"}"#)
            .create_async()
            .await;

        let err = fetch_client_descriptor(&test_config(&server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, DtsymError::DescriptorUrlMissing));
    }

    #[tokio::test]
    async fn malformed_json_reports_a_parse_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/config/v1/symfiles/dtxdss-download")
            .match_query(mockito::Matcher::Regex("Api-Token=.*".into()))
            .with_status(200)
            .with_body(r#"{""dssClientUrl": "http://127.0.0.1:8000/DTXDssClient.zip"}"#)
            .create_async()
            .await;

        let err = fetch_client_descriptor(&test_config(&server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, DtsymError::DescriptorParse(_)));
    }
}
