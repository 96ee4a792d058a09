//! HTTP transport for the pipeline endpoint.
//!
//! One transport per logical connection; it holds no per-request mutable
//! state, so concurrent calls are as safe as the underlying `reqwest`
//! client, which is documented safe for concurrent use.

use std::fmt;

use reqwest::header;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{translate, wire, HranaError, Result};

const PIPELINE_PATH: &str = "/v2/pipeline";

pub(crate) struct HttpTransport {
    http: reqwest::Client,
    pipeline_url: String,
    authorization: Option<String>,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("pipeline_url", &self.pipeline_url)
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl HttpTransport {
    /// Validates and normalizes the endpoint, then builds the transport.
    /// Fails with [`HranaError::Configuration`] before any network I/O.
    pub(crate) fn open(base_url: &str, auth_token: Option<&str>) -> Result<Self> {
        let base = normalize_base_url(base_url)?;
        Ok(Self {
            http: reqwest::Client::new(),
            pipeline_url: format!("{base}{PIPELINE_PATH}"),
            authorization: auth_token.map(normalize_bearer_authorization),
        })
    }

    /// Performs one pipeline round trip. Returns the parsed response along
    /// with the raw body so callers can attach it to protocol violations.
    pub(crate) async fn send(
        &self,
        payload: &wire::PipelineRequest,
        cancel: &CancellationToken,
    ) -> Result<(wire::PipelineResponse, String)> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HranaError::Cancelled),
            result = self.round_trip(payload) => result,
        }
    }

    async fn round_trip(
        &self,
        payload: &wire::PipelineRequest,
    ) -> Result<(wire::PipelineResponse, String)> {
        debug!(url = %self.pipeline_url, requests = payload.requests.len(), "dispatching pipeline");

        let mut request = self
            .http
            .post(&self.pipeline_url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(payload);
        if let Some(authorization) = &self.authorization {
            request = request.header(header::AUTHORIZATION, authorization);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "pipeline request failed");
            return Err(translate::classify_http_failure(status.as_u16(), body));
        }

        let parsed = serde_json::from_str::<wire::PipelineResponse>(&body).map_err(|err| {
            HranaError::protocol_violation(format!("invalid pipeline response JSON: {err}"), &body)
        })?;
        Ok((parsed, body))
    }
}

/// Normalizes the configured endpoint: strips a trailing slash, rewrites
/// `libsql://` to `https://`, and rejects unrecognized schemes.
fn normalize_base_url(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(HranaError::Configuration(
            "endpoint URL cannot be empty".to_owned(),
        ));
    }
    if let Some(rest) = trimmed.strip_prefix("libsql://") {
        return Ok(format!("https://{rest}"));
    }
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        return Ok(trimmed.to_owned());
    }
    Err(HranaError::Configuration(format!(
        "unsupported URL scheme in '{base_url}'; expected libsql://, https:// or http://"
    )))
}

/// Ensures the header value carries a `Bearer ` prefix; a caller-supplied
/// value that already has one (any casing) is passed through.
fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_base_url, normalize_bearer_authorization, HttpTransport};
    use crate::HranaError;

    #[test]
    fn rewrites_libsql_scheme_to_https() {
        assert_eq!(
            normalize_base_url("libsql://db.example.com").expect("must normalize"),
            "https://db.example.com"
        );
    }

    #[test]
    fn strips_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://db.example.com/").expect("must normalize"),
            "https://db.example.com"
        );
    }

    #[test]
    fn rejects_unknown_scheme_before_any_request() {
        for url in ["ftp://db.example.com", "db.example.com", ""] {
            let err = normalize_base_url(url).expect_err("must reject");
            assert!(matches!(err, HranaError::Configuration(_)));
        }
    }

    #[test]
    fn normalize_bearer_adds_prefix_when_missing() {
        assert_eq!(
            normalize_bearer_authorization("abc123"),
            "Bearer abc123".to_owned()
        );
    }

    #[test]
    fn normalize_bearer_keeps_existing_prefix() {
        assert_eq!(
            normalize_bearer_authorization("bEaReR abc123"),
            "bEaReR abc123".to_owned()
        );
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let transport =
            HttpTransport::open("https://db.example.com", Some("secret-token")).expect("must open");
        let debug = format!("{transport:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn missing_token_is_legal() {
        let transport = HttpTransport::open("https://db.example.com", None).expect("must open");
        let debug = format!("{transport:?}");
        assert!(debug.contains("None"));
    }
}
