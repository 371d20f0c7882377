//! Probe strategies.
//!
//! A strategy pairs an async `attempt` (the network operation for one
//! candidate) with a synchronous `judge` (classification of its result).
//! The engine never looks inside either.

pub mod directory;
pub mod http;
pub mod pacing;
pub mod port_connect;
pub mod reflection;
pub mod ssh_auth;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Policy, TransportError, Verdict};

pub use directory::DirectoryProbe;
pub use pacing::Pacing;
pub use port_connect::PortConnectProbe;
pub use reflection::{LoginBypassProbe, ReflectedXssProbe};
pub use ssh_auth::{PasswordAuth, RusshAuth, SshAuthProbe};

/// Attempt/judge pair plugged into the engine.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    /// Unit of work: a port, a path segment, a password, a payload.
    type Candidate: Clone + std::fmt::Display + Send + Sync + 'static;
    /// Raw result of a successful attempt, consumed by `judge`.
    type Response: Send + 'static;

    /// Strategy this probe implements.
    fn kind(&self) -> StrategyKind;

    /// Perform the network operation for one candidate.
    async fn attempt(&self, candidate: &Self::Candidate) -> Result<Self::Response, TransportError>;

    /// Classify the attempt. Receives `TransportError::TimedOut` when the
    /// engine's per-attempt guard expired.
    fn judge(
        &self,
        candidate: &Self::Candidate,
        result: Result<Self::Response, TransportError>,
    ) -> Verdict;
}

/// The shipped strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Ports,
    Dirs,
    Ssh,
    Xss,
    Sqli,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ports => "ports",
            Self::Dirs => "dirs",
            Self::Ssh => "ssh",
            Self::Xss => "xss",
            Self::Sqli => "sqli",
        }
    }

    /// Continuation policy each strategy runs under.
    ///
    /// Directory sweeps keep going after a hit but abort on the first
    /// transport failure; SSH treats any connection failure or timeout as
    /// rate limiting and aborts the whole sweep.
    pub fn policy(&self) -> Policy {
        match self {
            Self::Ports => Policy::ExhaustAll,
            Self::Dirs => Policy::StopOnError,
            Self::Ssh | Self::Xss | Self::Sqli => Policy::StopOnSuccessOrError,
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_policies() {
        assert_eq!(StrategyKind::Ports.policy(), Policy::ExhaustAll);
        assert_eq!(StrategyKind::Dirs.policy(), Policy::StopOnError);
        assert_eq!(StrategyKind::Ssh.policy(), Policy::StopOnSuccessOrError);
        assert_eq!(StrategyKind::Sqli.policy(), Policy::StopOnSuccessOrError);
    }

    #[test]
    fn test_strategy_kind_as_str() {
        assert_eq!(StrategyKind::Ports.as_str(), "ports");
        assert_eq!(StrategyKind::Xss.to_string(), "xss");
    }
}
