//! Session tuning resolution.
//!
//! Precedence, highest first: command-line flags, environment
//! (`SCAN_CONCURRENCY`, `SCAN_TIMEOUT`, `SCAN_PACING`), per-strategy defaults.

use std::time::Duration;

use crate::engine::SessionConfig;
use crate::probe::{Pacing, StrategyKind};
use crate::InputError;

pub const ENV_CONCURRENCY: &str = "SCAN_CONCURRENCY";
pub const ENV_TIMEOUT: &str = "SCAN_TIMEOUT";
pub const ENV_PACING: &str = "SCAN_PACING";

/// Built-in `(concurrency, attempt timeout)` for a strategy.
///
/// Login bypass and XSS run one request at a time so the first payload in
/// list order wins. SSH stays low to avoid tripping rate limits.
pub fn strategy_defaults(kind: StrategyKind) -> (usize, Duration) {
    match kind {
        StrategyKind::Ports => (64, Duration::from_secs(1)),
        StrategyKind::Dirs => (16, Duration::from_secs(10)),
        StrategyKind::Ssh => (4, Duration::from_secs(10)),
        StrategyKind::Xss | StrategyKind::Sqli => (1, Duration::from_secs(10)),
    }
}

/// Parse a positive number of seconds ("2", "0.5").
pub fn parse_seconds(raw: &str) -> Result<Duration, InputError> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| InputError::Timeout(raw.to_string()))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(InputError::Timeout(raw.to_string()));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| InputError::Timeout(raw.to_string()))
}

/// Overrides read from the environment. Malformed values are logged and
/// ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepDefaults {
    pub concurrency: Option<usize>,
    pub timeout: Option<Duration>,
    pub pacing: Option<Pacing>,
}

impl SweepDefaults {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let concurrency = lookup(ENV_CONCURRENCY).and_then(|v| match v.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Some(n),
            _ => {
                tracing::warn!(var = ENV_CONCURRENCY, value = %v, "ignoring invalid concurrency");
                None
            }
        });

        let timeout = lookup(ENV_TIMEOUT).and_then(|v| match parse_seconds(&v) {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::warn!(var = ENV_TIMEOUT, error = %e, "ignoring invalid timeout");
                None
            }
        });

        let pacing = lookup(ENV_PACING).and_then(|v| {
            let parsed = Pacing::from_name(&v);
            if parsed.is_none() {
                tracing::warn!(var = ENV_PACING, value = %v, "ignoring unknown pacing profile");
            }
            parsed
        });

        Self {
            concurrency,
            timeout,
            pacing,
        }
    }

    /// Merge flags over these defaults for one strategy.
    ///
    /// A concurrency flag of 0 is rejected rather than clamped.
    pub fn resolve(
        &self,
        kind: StrategyKind,
        concurrency: Option<usize>,
        timeout: Option<Duration>,
        pacing: Option<Pacing>,
    ) -> Result<SessionConfig, InputError> {
        let (default_concurrency, default_timeout) = strategy_defaults(kind);

        let concurrency = concurrency
            .or(self.concurrency)
            .unwrap_or(default_concurrency);
        if concurrency == 0 {
            return Err(InputError::Concurrency);
        }
        let timeout = timeout.or(self.timeout).unwrap_or(default_timeout);
        let pacing = pacing.or(self.pacing).unwrap_or_default();

        Ok(SessionConfig::new(concurrency, timeout).with_pacing(pacing))
    }
}
