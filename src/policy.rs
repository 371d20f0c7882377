//! Continuation policies.
//!
//! After every outcome the engine asks the session's policy whether to keep
//! dispatching. A stop decision is latched once and never retracted.

use serde::{Deserialize, Serialize};

use crate::{Outcome, Status};

/// Decision taken after one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Continue,
    StopSuccess,
    StopError,
}

impl Decision {
    pub fn is_stop(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// Rule mapping the outcome just produced to a [`Decision`].
///
/// Must be pure and cheap: it runs on the worker that produced the outcome.
pub trait ContinuationPolicy<C>: Send + Sync {
    fn decide(&self, outcome: &Outcome<C>) -> Decision;
}

/// Built-in policies covering every shipped strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Probe every candidate.
    #[default]
    ExhaustAll,
    /// Stop on the first Positive.
    StopOnSuccess,
    /// Stop on the first Error or Timeout.
    StopOnError,
    /// Stop on whichever comes first.
    StopOnSuccessOrError,
}

impl Policy {
    fn stops_on_success(&self) -> bool {
        matches!(self, Self::StopOnSuccess | Self::StopOnSuccessOrError)
    }

    fn stops_on_error(&self) -> bool {
        matches!(self, Self::StopOnError | Self::StopOnSuccessOrError)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExhaustAll => "exhaust-all",
            Self::StopOnSuccess => "stop-on-success",
            Self::StopOnError => "stop-on-error",
            Self::StopOnSuccessOrError => "stop-on-success-or-error",
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<C> ContinuationPolicy<C> for Policy {
    fn decide(&self, outcome: &Outcome<C>) -> Decision {
        match outcome.status {
            Status::Positive if self.stops_on_success() => Decision::StopSuccess,
            Status::Error | Status::Timeout if self.stops_on_error() => Decision::StopError,
            _ => Decision::Continue,
        }
    }
}

/// Adapter turning a closure into a policy.
pub struct FnPolicy<F>(pub F);

impl<C, F> ContinuationPolicy<C> for FnPolicy<F>
where
    F: Fn(&Outcome<C>) -> Decision + Send + Sync,
{
    fn decide(&self, outcome: &Outcome<C>) -> Decision {
        (self.0)(outcome)
    }
}
