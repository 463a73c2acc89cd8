//! Shared HTTP plumbing for provider clients.
//!
//! Every provider issues plain GET requests with query parameters and expects
//! a JSON body. This module owns the request/response cycle and maps every
//! failure onto [`ApiError`].

use std::time::Duration;

use serde::de::DeserializeOwned;

use super::error::ApiError;

/// Per-request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// User agent string sent to every provider
pub const USER_AGENT: &str = concat!("BookEnricher/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by all providers.
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
}

/// Send a GET request and decode the JSON body.
///
/// Returns `Ok(None)` when the provider answers 404, which every provider
/// uses for "no such book".
pub async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    provider: &'static str,
    url: &str,
    query: &[(&str, String)],
) -> Result<Option<T>, ApiError> {
    let response = http
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| ApiError::from_reqwest(provider, e))?;

    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        tracing::debug!(provider, url, "Not found");
        return Ok(None);
    }

    if !status.is_success() {
        return Err(ApiError::status_error(
            provider,
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
        ));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| ApiError::from_reqwest(provider, e))?;

    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| ApiError::decode(provider, e))
}

/// Percent-encode a value used as a URL path segment.
pub fn path_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Payload {
        name: String,
    }

    fn client() -> reqwest::Client {
        build_client(DEFAULT_TIMEOUT, USER_AGENT).unwrap()
    }

    #[tokio::test]
    async fn test_get_json_decodes_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/thing")
            .match_query(mockito::Matcher::UrlEncoded("q".into(), "a b".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name":"dune"}"#)
            .create_async()
            .await;

        let url = format!("{}/thing", server.url());
        let payload: Option<Payload> = get_json(&client(), "Test", &url, &[("q", "a b".to_string())])
            .await
            .unwrap();

        assert_eq!(payload.unwrap().name, "dune");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_is_none() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/missing").with_status(404).create_async().await;

        let url = format!("{}/missing", server.url());
        let payload: Option<Payload> = get_json(&client(), "Test", &url, &[]).await.unwrap();
        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn test_error_status_maps_to_response_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/down").with_status(503).create_async().await;

        let url = format!("{}/down", server.url());
        let err = get_json::<Payload>(&client(), "Test", &url, &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Response { status: Some(503), .. }));
        assert_eq!(err.provider(), "Test");
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/broken")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let url = format!("{}/broken", server.url());
        let err = get_json::<Payload>(&client(), "Test", &url, &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_connection_failure_maps_to_transport_error() {
        // Nothing listens on port 9 of localhost in the test environment
        let err = get_json::<Payload>(&client(), "Test", "http://127.0.0.1:9/x", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Transport { .. } | ApiError::Timeout { .. }
        ));
    }

    #[test]
    fn test_path_segment_encodes() {
        assert_eq!(path_segment("hardcover fiction"), "hardcover%20fiction");
    }
}
