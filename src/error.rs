//! Error taxonomy.
//!
//! `InputError` is fatal and raised before any probing starts.
//! `TransportError` is local to one candidate and is handed to the judge.

use std::path::PathBuf;
use std::time::Duration;

/// Invalid user input. Reported before the sweep starts; exit code 1.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("wordlist file not found or unreadable: {}: {source}", path.display())]
    Wordlist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("wordlist is empty: {}", .0.display())]
    EmptyWordlist(PathBuf),

    #[error("malformed port list: {0}")]
    PortSpec(String),

    #[error("concurrency must be at least 1")]
    Concurrency,

    #[error("invalid timeout '{0}': expected a positive number of seconds")]
    Timeout(String),
}

/// Per-candidate transport failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection refused: {0}")]
    Refused(String),

    #[error("host unreachable: {0}")]
    Unreachable(String),

    /// Carries the guard that expired, when one is known.
    #[error("timed out{}", after(.0))]
    TimedOut(Option<Duration>),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("SSH session failed: {0}")]
    Ssh(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    /// Classify a socket-level error.
    pub fn from_io(err: &std::io::Error, peer: impl std::fmt::Display) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::ConnectionRefused => Self::Refused(peer.to_string()),
            ErrorKind::TimedOut => Self::TimedOut(None),
            ErrorKind::AddrNotAvailable | ErrorKind::NotFound => {
                Self::Unreachable(format!("{peer}: {err}"))
            }
            _ => Self::Io(format!("{peer}: {err}")),
        }
    }
}

fn after(limit: &Option<Duration>) -> String {
    limit.map(|d| format!(" after {d:?}")).unwrap_or_default()
}

/// Run-level failure of the `scan` tool.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("scan cancelled")]
    Cancelled,
}

/// Exit code for a completed run.
pub const EXIT_OK: i32 = 0;
/// Exit code for invalid input.
pub const EXIT_INPUT: i32 = 1;
/// Exit code for a run cancelled by signal.
pub const EXIT_CANCELLED: i32 = 2;

impl ScanError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Input(_) => EXIT_INPUT,
            Self::Cancelled => EXIT_CANCELLED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ScanError::Input(InputError::Concurrency).exit_code(), 1);
        assert_eq!(ScanError::Cancelled.exit_code(), 2);
    }

    #[test]
    fn test_from_io_refused() {
        let err = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        assert_eq!(
            TransportError::from_io(&err, "127.0.0.1:9"),
            TransportError::Refused("127.0.0.1:9".to_string())
        );
    }

    #[test]
    fn test_from_io_timeout_is_timeout() {
        let err = std::io::Error::from(std::io::ErrorKind::TimedOut);
        let classified = TransportError::from_io(&err, "10.0.0.1:22");
        assert!(classified.is_timeout());
        assert_eq!(classified.to_string(), "timed out");
    }

    #[test]
    fn test_timed_out_names_known_limit() {
        let err = TransportError::TimedOut(Some(Duration::from_secs(1)));
        assert_eq!(err.to_string(), "timed out after 1s");
    }

    #[test]
    fn test_wordlist_error_mentions_path() {
        let err = InputError::Wordlist {
            path: PathBuf::from("/nope/words.txt"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/nope/words.txt"));
    }
}
