//! recon0: concurrent probe engine and security-testing sweeps.
//!
//! A bounded-concurrency engine drives a candidate list (ports, directory
//! names, passwords, payloads) through a pluggable [`probe::Probe`] and a
//! [`policy::ContinuationPolicy`]. Usable as a library or via the `scan` CLI.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod policy;
pub mod probe;
pub mod stats;
pub mod wordlist;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export key engine types for library users.
pub use engine::{ProbeSession, SessionConfig, SessionReport, SessionState, Sweep, Termination};
pub use error::{InputError, ScanError, TransportError};
pub use policy::{ContinuationPolicy, Decision, Policy};
pub use probe::{Probe, StrategyKind};

// ─────────────────────────────────────────────────────────────────────────────
// Outcome status
// ─────────────────────────────────────────────────────────────────────────────

/// Classification of a single probe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The candidate hit: open port, existing directory, valid password,
    /// reflected payload.
    Positive,
    /// The candidate missed.
    Negative,
    /// The attempt failed at the transport level and the judge kept it as
    /// an error.
    Error,
    /// The attempt did not finish inside the per-attempt timeout.
    Timeout,
}

impl Status {
    /// Terminal line prefix for this status.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Positive => "[+]",
            Self::Negative => "[-]",
            Self::Error | Self::Timeout => "[!]",
        }
    }

    /// Returns true for Error and Timeout.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Timeout)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
            Self::Error => write!(f, "error"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Verdict / Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// What a judge returns: a status and an optional human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: Status,
    pub message: Option<String>,
}

impl Verdict {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }

    pub fn positive(message: impl Into<String>) -> Self {
        Self::new(Status::Positive, message)
    }

    pub fn negative(message: impl Into<String>) -> Self {
        Self::new(Status::Negative, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(Status::Timeout, message)
    }

    /// Default classification of a transport failure: timeouts become
    /// [`Status::Timeout`], everything else [`Status::Error`].
    pub fn from_transport(err: &TransportError) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else {
            Self::error(err.to_string())
        }
    }
}

/// Classified result of probing one candidate. Created once per attempted
/// candidate and never mutated.
#[derive(Debug, Clone)]
pub struct Outcome<C> {
    /// The candidate that was attempted.
    pub candidate: C,
    /// Judge classification.
    pub status: Status,
    /// Optional diagnostic message from the judge.
    pub message: Option<String>,
    /// Time from dispatch to classification.
    pub elapsed: Duration,
    /// Wall-clock time the outcome was produced.
    pub observed_at: DateTime<Utc>,
}

impl<C> Outcome<C> {
    pub fn new(candidate: C, verdict: Verdict, elapsed: Duration) -> Self {
        Self {
            candidate,
            status: verdict.status,
            message: verdict.message,
            elapsed,
            observed_at: Utc::now(),
        }
    }
}

impl<C: std::fmt::Display> Outcome<C> {
    /// Message if the judge supplied one, otherwise `"<candidate>: <status>"`.
    pub fn describe(&self) -> String {
        match &self.message {
            Some(m) => m.clone(),
            None => format!("{}: {}", self.candidate, self.status),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Port specification (parsed from CLI)
// ─────────────────────────────────────────────────────────────────────────────

/// Port specification: a comma-separated list, a range or the full range.
///
/// Parsed from strings like "80", "1-1024", "80,443,8080", "full".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortSpec {
    /// Explicit list of ports, in the order given.
    Explicit(Vec<u16>),
    /// Contiguous port range (inclusive).
    Range { start: u16, end: u16 },
    /// Full range 1-65535.
    Full,
}

/// Ports probed when none are given.
pub const DEFAULT_PORTS: &str = "80,443,22,21,25";

impl PortSpec {
    /// Parse a port spec string ("80", "1-1024", "80,443,8080", "1-65535").
    pub fn parse(s: &str) -> Result<Self, InputError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(InputError::PortSpec("empty port list".to_string()));
        }
        if s == "1-65535" || s == "full" {
            return Ok(Self::Full);
        }
        if s.contains('-') && !s.contains(',') {
            let (start, end) = s
                .split_once('-')
                .ok_or_else(|| InputError::PortSpec(format!("invalid range: '{s}'")))?;
            let start = parse_port(start)?;
            let end = parse_port(end)?;
            if end < start {
                return Err(InputError::PortSpec(format!(
                    "invalid range: {start} > {end}"
                )));
            }
            return Ok(Self::Range { start, end });
        }
        let ports = s.split(',').map(parse_port).collect::<Result<Vec<_>, _>>()?;
        Ok(Self::Explicit(ports))
    }

    /// Expand to the ordered list of ports to probe. Explicit lists keep
    /// their order; repeated ports are probed once.
    pub fn expand(&self) -> Vec<u16> {
        match self {
            Self::Explicit(ports) => {
                let mut seen = std::collections::HashSet::with_capacity(ports.len());
                ports.iter().copied().filter(|p| seen.insert(*p)).collect()
            }
            Self::Range { start, end } => (*start..=*end).collect(),
            Self::Full => (1..=65535).collect(),
        }
    }

    /// Return the count of ports this spec covers.
    pub fn count(&self) -> usize {
        match self {
            Self::Explicit(_) => self.expand().len(),
            Self::Range { start, end } => (*end as usize - *start as usize) + 1,
            Self::Full => 65535,
        }
    }
}

fn parse_port(p: &str) -> Result<u16, InputError> {
    match p.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(InputError::PortSpec(format!("invalid port: '{}'", p.trim()))),
        Ok(port) => Ok(port),
    }
}

impl std::fmt::Display for PortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(ports) => {
                let s: Vec<String> = ports.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", s.join(","))
            }
            Self::Range { start, end } => write!(f, "{}-{}", start, end),
            Self::Full => write!(f, "1-65535"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_prefixes() {
        assert_eq!(Status::Positive.prefix(), "[+]");
        assert_eq!(Status::Negative.prefix(), "[-]");
        assert_eq!(Status::Error.prefix(), "[!]");
        assert_eq!(Status::Timeout.prefix(), "[!]");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Positive.to_string(), "positive");
        assert_eq!(Status::Timeout.to_string(), "timeout");
    }

    #[test]
    fn test_status_is_failure() {
        assert!(!Status::Positive.is_failure());
        assert!(!Status::Negative.is_failure());
        assert!(Status::Error.is_failure());
        assert!(Status::Timeout.is_failure());
    }

    #[test]
    fn test_verdict_from_transport() {
        let timed_out = TransportError::TimedOut(Some(Duration::from_secs(1)));
        assert_eq!(Verdict::from_transport(&timed_out).status, Status::Timeout);

        let refused = TransportError::Refused("127.0.0.1:1".to_string());
        assert_eq!(Verdict::from_transport(&refused).status, Status::Error);
    }

    #[test]
    fn test_outcome_describe_falls_back_to_candidate() {
        let outcome = Outcome::new(
            "admin",
            Verdict {
                status: Status::Negative,
                message: None,
            },
            Duration::ZERO,
        );
        assert_eq!(outcome.describe(), "admin: negative");

        let outcome = Outcome::new(80u16, Verdict::positive("Port 80: OPEN"), Duration::ZERO);
        assert_eq!(outcome.describe(), "Port 80: OPEN");
    }

    #[test]
    fn test_port_spec_parse_single() {
        let spec = PortSpec::parse("80").unwrap();
        assert_eq!(spec, PortSpec::Explicit(vec![80]));
    }

    #[test]
    fn test_port_spec_parse_default_list_keeps_order() {
        let spec = PortSpec::parse(DEFAULT_PORTS).unwrap();
        assert_eq!(spec.expand(), vec![80, 443, 22, 21, 25]);
    }

    #[test]
    fn test_port_spec_parse_range() {
        let spec = PortSpec::parse("1-1024").unwrap();
        assert_eq!(
            spec,
            PortSpec::Range {
                start: 1,
                end: 1024
            }
        );
    }

    #[test]
    fn test_port_spec_parse_full() {
        assert_eq!(PortSpec::parse("1-65535").unwrap(), PortSpec::Full);
        assert_eq!(PortSpec::parse("full").unwrap(), PortSpec::Full);
    }

    #[test]
    fn test_port_spec_parse_invalid() {
        assert!(PortSpec::parse("1024-1").is_err());
        assert!(PortSpec::parse("80,http").is_err());
        assert!(PortSpec::parse("70000").is_err());
        assert!(PortSpec::parse("0").is_err());
        assert!(PortSpec::parse("").is_err());
        assert!(PortSpec::parse("80,,443").is_err());
    }

    #[test]
    fn test_port_spec_expand_dedups_preserving_order() {
        let spec = PortSpec::Explicit(vec![443, 80, 443, 22]);
        assert_eq!(spec.expand(), vec![443, 80, 22]);
        assert_eq!(spec.count(), 3);
    }

    #[test]
    fn test_port_spec_count() {
        assert_eq!(PortSpec::Range { start: 1, end: 100 }.count(), 100);
        assert_eq!(PortSpec::Full.count(), 65535);
    }

    #[test]
    fn test_port_spec_display() {
        assert_eq!(
            PortSpec::Range {
                start: 1,
                end: 1024
            }
            .to_string(),
            "1-1024"
        );
        assert_eq!(PortSpec::Full.to_string(), "1-65535");
        assert_eq!(PortSpec::Explicit(vec![80, 443]).to_string(), "80,443");
    }
}
