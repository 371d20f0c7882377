//! Directory discovery by HTTP GET.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use super::http::classify;
use super::{Probe, StrategyKind};
use crate::{TransportError, Verdict};

/// Status and URL of one directory request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryResponse {
    pub url: String,
    pub status: StatusCode,
}

/// GETs `base/<candidate>` and reports 200 as a find.
#[derive(Debug, Clone)]
pub struct DirectoryProbe {
    client: Client,
    base: String,
}

impl DirectoryProbe {
    pub fn new(client: Client, base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// URL probed for `candidate`.
    pub fn url_for(&self, candidate: &str) -> String {
        format!("{}/{}", self.base, candidate.trim_start_matches('/'))
    }
}

#[async_trait]
impl Probe for DirectoryProbe {
    type Candidate = String;
    type Response = DirectoryResponse;

    fn kind(&self) -> StrategyKind {
        StrategyKind::Dirs
    }

    async fn attempt(&self, candidate: &String) -> Result<DirectoryResponse, TransportError> {
        let url = self.url_for(candidate);
        let response = self.client.get(&url).send().await.map_err(classify)?;
        Ok(DirectoryResponse {
            url,
            status: response.status(),
        })
    }

    fn judge(&self, candidate: &String, result: Result<DirectoryResponse, TransportError>) -> Verdict {
        match result {
            Ok(r) if r.status == StatusCode::OK => {
                Verdict::positive(format!("Found directory: {}", r.url))
            }
            Ok(r) => Verdict::negative(format!("{} ({})", r.url, r.status.as_u16())),
            Err(e) if e.is_timeout() => {
                Verdict::timeout(format!("{}: request timed out", self.url_for(candidate)))
            }
            Err(e) => Verdict::error(format!("An error occurred: {e}")),
        }
    }
}
