//! Output formatters for sweep progress.
//!
//! Pretty mode prints one prefixed line per outcome plus `[*]` header and
//! summary lines. JSON mode prints one record per line: `session_start`,
//! one `outcome` per candidate, `session_end`.

use std::fmt::Display;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::OutputFmt;
use crate::engine::{SessionConfig, SessionReport, Tally, Termination};
use crate::probe::{Pacing, StrategyKind};
use crate::stats::LatencyStats;
use crate::{Outcome, Status};

/// Renders a session's lines in the selected format.
pub struct Reporter {
    fmt: OutputFmt,
    strategy: StrategyKind,
    target: String,
    session_id: Uuid,
    latencies: Vec<Duration>,
}

impl Reporter {
    pub fn new(fmt: OutputFmt, strategy: StrategyKind, target: impl Into<String>, session_id: Uuid) -> Self {
        Self {
            fmt,
            strategy,
            target: target.into(),
            session_id,
            latencies: Vec::new(),
        }
    }

    /// Opening line(s). `banner` is the human-readable header text.
    pub fn session_start(&self, banner: &str, candidates: usize, config: &SessionConfig) -> Vec<String> {
        match self.fmt {
            OutputFmt::Pretty => vec![format!("[*] {banner}")],
            OutputFmt::Json => vec![to_json_line(&Record::SessionStart {
                session_id: self.session_id,
                strategy: self.strategy,
                target: &self.target,
                candidates,
                concurrency: config.concurrency,
                timeout_ms: config.attempt_timeout.as_millis() as u64,
                pacing: config.pacing,
                started_at: Utc::now(),
            })],
        }
    }

    /// One line for one outcome.
    pub fn outcome<C: Display>(&mut self, outcome: &Outcome<C>) -> String {
        self.latencies.push(outcome.elapsed);
        match self.fmt {
            OutputFmt::Pretty => format!("{} {}", outcome.status.prefix(), outcome.describe()),
            OutputFmt::Json => to_json_line(&Record::Outcome {
                session_id: self.session_id,
                strategy: self.strategy,
                target: &self.target,
                candidate: outcome.candidate.to_string(),
                status: outcome.status,
                message: outcome.message.as_deref(),
                elapsed_ms: outcome.elapsed.as_secs_f64() * 1000.0,
                observed_at: outcome.observed_at,
            }),
        }
    }

    /// Closing line(s). `nothing_found` is printed when every candidate was
    /// tried without a single Positive.
    pub fn session_end(&self, report: &SessionReport, nothing_found: &str) -> Vec<String> {
        let latency = LatencyStats::from_durations(&self.latencies);
        match self.fmt {
            OutputFmt::Json => vec![to_json_line(&Record::SessionEnd {
                session_id: report.session_id,
                strategy: self.strategy,
                termination: report.termination,
                dispatched: report.dispatched,
                completed: report.completed,
                abandoned: report.abandoned,
                tally: report.tally,
                trigger: report.trigger.as_deref(),
                duration_ms: report.duration_ms,
                latency,
            })],
            OutputFmt::Pretty => {
                let mut lines = Vec::new();
                if report.termination == Termination::Exhausted && report.tally.positive == 0 {
                    lines.push(nothing_found.to_string());
                }
                lines.push(format!("[*] {}", summary_line(report)));
                if latency.samples > 0 {
                    lines.push(format!(
                        "[*] Latency: p50 {}, p90 {}, max {}",
                        format_ms(latency.p50),
                        format_ms(latency.p90),
                        format_ms(latency.max)
                    ));
                }
                lines
            }
        }
    }
}

fn summary_line(report: &SessionReport) -> String {
    let Tally {
        positive,
        negative,
        error,
        timeout,
    } = report.tally;

    let mut parts = Vec::new();
    for (count, label) in [
        (positive, "positive"),
        (negative, "negative"),
        (error, "error"),
        (timeout, "timeout"),
    ] {
        if count > 0 {
            parts.push(format!("{count} {label}"));
        }
    }
    if report.abandoned > 0 {
        parts.push(format!("{} abandoned", report.abandoned));
    }
    let detail = if parts.is_empty() {
        "no results".to_string()
    } else {
        parts.join(", ")
    };

    let duration_s = report.duration_ms as f64 / 1000.0;
    format!(
        "{} candidates probed in {duration_s:.2}s ({detail}); {}",
        report.dispatched, report.termination
    )
}

/// Format a millisecond value for humans.
pub fn format_ms(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.1}s", ms / 1000.0)
    } else if ms >= 1.0 {
        format!("{ms:.1}ms")
    } else {
        format!("{:.1}µs", ms * 1000.0)
    }
}

fn to_json_line(record: &Record<'_>) -> String {
    serde_json::to_string(record)
        .unwrap_or_else(|e| format!("{{\"type\":\"error\",\"error\":\"serialization failed: {e}\"}}"))
}

/// JSON-lines record.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record<'a> {
    SessionStart {
        session_id: Uuid,
        strategy: StrategyKind,
        target: &'a str,
        candidates: usize,
        concurrency: usize,
        timeout_ms: u64,
        pacing: Pacing,
        started_at: DateTime<Utc>,
    },
    Outcome {
        session_id: Uuid,
        strategy: StrategyKind,
        target: &'a str,
        candidate: String,
        status: Status,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<&'a str>,
        elapsed_ms: f64,
        observed_at: DateTime<Utc>,
    },
    SessionEnd {
        session_id: Uuid,
        strategy: StrategyKind,
        termination: Termination,
        dispatched: usize,
        completed: usize,
        abandoned: usize,
        tally: Tally,
        #[serde(skip_serializing_if = "Option::is_none")]
        trigger: Option<&'a str>,
        duration_ms: u64,
        latency: LatencyStats,
    },
}
