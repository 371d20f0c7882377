//! Pacing profiles for rate-limited sweeps.
//!
//! Each worker waits a jittered delay between consecutive dispatches, so the
//! aggregate request rate is roughly `concurrency / delay`.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Pacing profile controlling per-worker dispatch rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    /// No delay between dispatches.
    #[default]
    None,
    /// 50ms delay, 0.3 jitter.
    Polite,
    /// 250ms delay, 0.6 jitter.
    Stealthy,
    /// 1000ms delay, 0.8 jitter.
    Paranoid,
}

impl Pacing {
    /// Base inter-dispatch delay in milliseconds.
    pub fn delay_ms(&self) -> u64 {
        match self {
            Self::None => 0,
            Self::Polite => 50,
            Self::Stealthy => 250,
            Self::Paranoid => 1000,
        }
    }

    /// Jitter factor (0.0-1.0) applied to delay.
    pub fn jitter_pct(&self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Polite => 0.3,
            Self::Stealthy => 0.6,
            Self::Paranoid => 0.8,
        }
    }

    /// Calculate the delay before the next dispatch with jitter applied.
    pub fn jittered_delay(&self) -> Duration {
        let base = self.delay_ms();
        if base == 0 {
            return Duration::ZERO;
        }
        let jitter_range = (base as f64 * self.jitter_pct()) as u64;
        if jitter_range == 0 {
            return Duration::from_millis(base);
        }
        let offset = rand::thread_rng().gen_range(0..=jitter_range * 2);
        Duration::from_millis(base.saturating_sub(jitter_range) + offset)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Polite => "polite",
            Self::Stealthy => "stealthy",
            Self::Paranoid => "paranoid",
        }
    }

    /// Parse a profile name; unknown names yield `None`.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" => Some(Self::None),
            "polite" | "normal" => Some(Self::Polite),
            "stealthy" | "stealth" => Some(Self::Stealthy),
            "paranoid" => Some(Self::Paranoid),
            _ => None,
        }
    }
}

impl std::fmt::Display for Pacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_has_no_delay() {
        assert_eq!(Pacing::None.jittered_delay(), Duration::ZERO);
    }

    #[test]
    fn test_jittered_delay_within_bounds() {
        for _ in 0..100 {
            let d = Pacing::Polite.jittered_delay().as_millis();
            // 50ms +/- 15ms
            assert!((35..=65).contains(&d), "delay {}ms outside 35-65", d);
        }
        for _ in 0..100 {
            let d = Pacing::Paranoid.jittered_delay().as_millis();
            // 1000ms +/- 800ms
            assert!((200..=1800).contains(&d), "delay {}ms outside 200-1800", d);
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Pacing::from_name("stealth"), Some(Pacing::Stealthy));
        assert_eq!(Pacing::from_name(" Paranoid "), Some(Pacing::Paranoid));
        assert_eq!(Pacing::from_name("warp"), None);
    }

    #[test]
    fn test_default_is_none() {
        assert_eq!(Pacing::default(), Pacing::None);
    }
}
