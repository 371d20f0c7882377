//! SSH password authentication probe.
//!
//! Each attempt opens a fresh SSH session, offers one password for the fixed
//! username and disconnects. Host keys are accepted unconditionally.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client;

use super::{Probe, StrategyKind};
use crate::{TransportError, Verdict};

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// One password login against a fixed host.
#[async_trait]
pub trait PasswordAuth: Send + Sync + 'static {
    /// `Ok(true)` if the server accepted the password, `Ok(false)` if it
    /// rejected it, `Err` if no verdict could be obtained.
    async fn try_password(&self, username: &str, password: &str) -> Result<bool, TransportError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// russh-backed authenticator
// ─────────────────────────────────────────────────────────────────────────────

struct AcceptAnyHostKey;

#[async_trait]
impl client::Handler for AcceptAnyHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh_keys::key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Live SSH client.
pub struct RusshAuth {
    host: String,
    port: u16,
    config: Arc<client::Config>,
}

impl RusshAuth {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        let config = client::Config {
            inactivity_timeout: Some(timeout),
            ..Default::default()
        };
        Self {
            host: host.into(),
            port,
            config: Arc::new(config),
        }
    }
}

fn ssh_error(err: russh::Error) -> TransportError {
    TransportError::Ssh(err.to_string())
}

#[async_trait]
impl PasswordAuth for RusshAuth {
    async fn try_password(&self, username: &str, password: &str) -> Result<bool, TransportError> {
        let mut session = client::connect(
            Arc::clone(&self.config),
            (self.host.as_str(), self.port),
            AcceptAnyHostKey,
        )
        .await
        .map_err(ssh_error)?;

        let accepted = session
            .authenticate_password(username, password)
            .await
            .map_err(ssh_error)?;

        if let Err(e) = session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
        {
            tracing::debug!(error = %e, host = %self.host, "ssh disconnect failed");
        }
        Ok(accepted)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Probe
// ─────────────────────────────────────────────────────────────────────────────

/// Password sweep for one username. Any failure to reach a verdict is an
/// error; under the SSH policy it aborts the sweep.
pub struct SshAuthProbe<A = RusshAuth> {
    auth: A,
    username: String,
}

impl<A: PasswordAuth> SshAuthProbe<A> {
    pub fn new(auth: A, username: impl Into<String>) -> Self {
        Self {
            auth,
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

#[async_trait]
impl<A: PasswordAuth> Probe for SshAuthProbe<A> {
    type Candidate = String;
    type Response = bool;

    fn kind(&self) -> StrategyKind {
        StrategyKind::Ssh
    }

    async fn attempt(&self, password: &String) -> Result<bool, TransportError> {
        self.auth.try_password(&self.username, password).await
    }

    fn judge(&self, password: &String, result: Result<bool, TransportError>) -> Verdict {
        match result {
            Ok(true) => Verdict::positive(format!(
                "Password found! Username: {}, Password: {}",
                self.username, password
            )),
            Ok(false) => Verdict::negative(format!("Authentication failed for password: {password}")),
            Err(e) if e.is_timeout() => {
                Verdict::error("Connection timed out. The host may be rate-limiting.")
            }
            Err(e) => Verdict::error(format!("An error occurred: {e}")),
        }
    }
}
