//! TCP connect probe.
//!
//! Full three-way handshake per port through the OS stack; the socket is
//! dropped as soon as the connect resolves.

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use tokio::net::TcpStream;

use super::{Probe, StrategyKind};
use crate::{InputError, TransportError, Verdict};

// ─────────────────────────────────────────────────────────────────────────────
// Target resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve a hostname or IP literal to a single address.
///
/// Returns `(ip, hostname)` where `hostname` is `Some` if DNS was performed.
/// IPv4 answers are preferred when a name resolves to both families.
pub async fn resolve_target(target: &str) -> Result<(IpAddr, Option<String>), InputError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(InputError::InvalidTarget {
            target: target.to_string(),
            reason: "empty host".to_string(),
        });
    }
    let literal = target.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = literal.parse::<IpAddr>() {
        return Ok((ip, None));
    }

    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((target, 0))
        .await
        .map_err(|e| InputError::InvalidTarget {
            target: target.to_string(),
            reason: format!("DNS resolution failed: {e}"),
        })?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .map(|a| (a.ip(), Some(target.to_string())))
        .ok_or_else(|| InputError::InvalidTarget {
            target: target.to_string(),
            reason: "no address found".to_string(),
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Probe
// ─────────────────────────────────────────────────────────────────────────────

/// Open/closed check by TCP connect. Refused and timed-out connects are
/// reported as closed, not as errors.
#[derive(Debug, Clone)]
pub struct PortConnectProbe {
    ip: IpAddr,
}

impl PortConnectProbe {
    pub fn new(ip: IpAddr) -> Self {
        Self { ip }
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }
}

#[async_trait]
impl Probe for PortConnectProbe {
    type Candidate = u16;
    type Response = ();

    fn kind(&self) -> StrategyKind {
        StrategyKind::Ports
    }

    async fn attempt(&self, port: &u16) -> Result<(), TransportError> {
        let addr = SocketAddr::new(self.ip, *port);
        TcpStream::connect(addr)
            .await
            .map(drop)
            .map_err(|e| TransportError::from_io(&e, addr))
    }

    fn judge(&self, port: &u16, result: Result<(), TransportError>) -> Verdict {
        match result {
            Ok(()) => Verdict::positive(format!("Port {port}: OPEN")),
            Err(TransportError::Refused(_)) | Err(TransportError::TimedOut(_)) => {
                Verdict::negative(format!("Port {port}: CLOSED"))
            }
            Err(e) => Verdict::error(format!("Port {port}: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ProbeSession, SessionConfig, Termination};
    use crate::Status;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    async fn closed_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[tokio::test]
    async fn test_resolve_ip_literal() {
        let (ip, host) = resolve_target("127.0.0.1").await.unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(host.is_none());

        let (ip, _) = resolve_target("[::1]").await.unwrap();
        assert!(ip.is_ipv6());
    }

    #[tokio::test]
    async fn test_resolve_invalid_host() {
        let err = resolve_target("this-host-does-not-exist-12345.invalid").await;
        assert!(matches!(err, Err(InputError::InvalidTarget { .. })));
        assert!(resolve_target("  ").await.is_err());
    }

    #[test]
    fn test_judge_messages() {
        let probe = PortConnectProbe::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let open = probe.judge(&80, Ok(()));
        assert_eq!(open, Verdict::positive("Port 80: OPEN"));

        let refused = probe.judge(&81, Err(TransportError::Refused("x".into())));
        assert_eq!(refused, Verdict::negative("Port 81: CLOSED"));

        let timed_out = probe.judge(&82, Err(TransportError::TimedOut(Some(Duration::from_secs(1)))));
        assert_eq!(timed_out.status, Status::Negative);

        let other = probe.judge(&83, Err(TransportError::Io("reset".into())));
        assert_eq!(other.status, Status::Error);
    }

    #[tokio::test]
    async fn test_open_and_closed_ports() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                if listener.accept().await.is_err() {
                    break;
                }
            }
        });
        let closed = closed_port().await;

        let probe = PortConnectProbe::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let session = ProbeSession::new(
            "127.0.0.1",
            probe,
            StrategyKind::Ports.policy(),
            SessionConfig::new(4, Duration::from_secs(1)),
        );
        let (outcomes, report) = session.run(vec![open, closed]).collect().await;

        assert_eq!(report.termination, Termination::Exhausted);
        assert_eq!(outcomes.len(), 2);
        for outcome in &outcomes {
            if outcome.candidate == open {
                assert_eq!(outcome.status, Status::Positive);
                assert_eq!(outcome.describe(), format!("Port {open}: OPEN"));
            } else {
                assert_eq!(outcome.status, Status::Negative);
                assert_eq!(outcome.describe(), format!("Port {closed}: CLOSED"));
            }
        }
    }
}
