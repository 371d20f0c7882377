//! Shared HTTP plumbing for the web strategies.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::{InputError, TransportError};

/// User agent sent with every web probe.
pub const USER_AGENT: &str = concat!("recon0/", env!("CARGO_PKG_VERSION"));

/// Redirect hops followed before a request fails.
pub const MAX_REDIRECTS: usize = 5;

/// Build the client shared by all workers of one session.
///
/// The client-level timeout mirrors the engine's attempt guard so a stalled
/// body read cannot outlive it. Redirects are followed up to
/// [`MAX_REDIRECTS`] hops and the final response is judged.
pub fn build_client(timeout: Duration) -> Result<Client, InputError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|e| InputError::InvalidUrl {
            url: String::new(),
            reason: format!("HTTP client initialisation failed: {e}"),
        })
}

/// Parse and validate an absolute http(s) URL.
pub fn parse_url(raw: &str) -> Result<Url, InputError> {
    let url = Url::parse(raw.trim()).map_err(|e| InputError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(InputError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            })
        }
    }
    if url.host_str().is_none() {
        return Err(InputError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

/// Classify a reqwest failure.
pub fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::TimedOut(None);
    }
    if err.is_connect() {
        let detail = err.to_string();
        let lower = format!("{err:?}").to_lowercase();
        if lower.contains("refused") {
            return TransportError::Refused(detail);
        }
        return TransportError::Unreachable(detail);
    }
    TransportError::Http(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_accepts_http() {
        let url = parse_url("http://127.0.0.1:8080/app").unwrap();
        assert_eq!(url.port(), Some(8080));
        assert!(parse_url(" https://example.com ").is_ok());
    }

    #[test]
    fn test_parse_url_rejects_garbage() {
        assert!(matches!(parse_url("not a url"), Err(InputError::InvalidUrl { .. })));
        assert!(matches!(parse_url("ftp://example.com"), Err(InputError::InvalidUrl { .. })));
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(Duration::from_secs(3)).is_ok());
    }

    #[tokio::test]
    async fn test_classify_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = build_client(Duration::from_secs(2)).unwrap();
        let err = client
            .get(format!("http://127.0.0.1:{port}/"))
            .send()
            .await
            .unwrap_err();
        assert!(matches!(
            classify(err),
            TransportError::Refused(_) | TransportError::Unreachable(_)
        ));
    }
}
