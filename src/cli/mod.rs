//! CLI entrypoint for `scan`.
//!
//! Parses arguments, resolves session tuning, builds the selected probe,
//! drives the sweep and streams lines to stdout as outcomes arrive.

pub mod output;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;

use crate::config::{parse_seconds, SweepDefaults};
use crate::engine::{ProbeSession, SessionConfig, SessionReport, Termination};
use crate::probe::http::{build_client, parse_url};
use crate::probe::port_connect::resolve_target;
use crate::probe::reflection::DEFAULT_XSS_PARAM;
use crate::probe::ssh_auth::DEFAULT_SSH_PORT;
use crate::probe::{
    DirectoryProbe, LoginBypassProbe, Pacing, PortConnectProbe, Probe, ReflectedXssProbe,
    RusshAuth, SshAuthProbe, StrategyKind,
};
use crate::wordlist::load_wordlist;
use crate::{PortSpec, ScanError, DEFAULT_PORTS};

pub use output::Reporter;

// ─────────────────────────────────────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────────────────────────────────────

/// scan: concurrent port, directory, SSH password, XSS and SQLi sweeps.
#[derive(Parser, Debug)]
#[command(name = "scan", version, about)]
#[command(
    long_about = "Runs one security-testing sweep against a single target with bounded \
    concurrency, a per-attempt timeout and an optional pacing profile. Only test systems \
    you are authorised to test."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "pretty", value_enum)]
    pub output: OutputFmt,

    /// Pacing profile between dispatches (overrides SCAN_PACING)
    #[arg(long, global = true, value_enum)]
    pub pacing: Option<PacingArg>,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// TCP connect scan
    Ports(PortsArgs),
    /// Directory brute-force by HTTP GET
    Dirs(DirsArgs),
    /// SSH password brute-force
    Ssh(SshArgs),
    /// Reflected XSS check
    Xss(XssArgs),
    /// Login-form SQL injection bypass check
    Sqli(SqliArgs),
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct TuningArgs {
    /// Maximum simultaneous attempts (overrides SCAN_CONCURRENCY)
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Per-attempt timeout in seconds (overrides SCAN_TIMEOUT)
    #[arg(long, value_parser = parse_seconds)]
    pub timeout: Option<Duration>,
}

#[derive(Args, Debug)]
pub struct PortsArgs {
    /// Target IP address or hostname
    pub target: String,
    /// Port specification: "80", "1-1024", "80,443,8080", "full"
    #[arg(short, long, default_value = DEFAULT_PORTS)]
    pub ports: String,
    #[command(flatten)]
    pub tuning: TuningArgs,
}

#[derive(Args, Debug)]
pub struct DirsArgs {
    /// Base URL, e.g. http://10.0.0.5
    pub url: String,
    /// Wordlist file, one directory name per line
    pub wordlist: PathBuf,
    #[command(flatten)]
    pub tuning: TuningArgs,
}

#[derive(Args, Debug)]
pub struct SshArgs {
    /// SSH server IP address or hostname
    pub host: String,
    /// Username to authenticate as
    pub username: String,
    /// Wordlist file, one password per line
    pub wordlist: PathBuf,
    /// SSH port
    #[arg(long, default_value_t = DEFAULT_SSH_PORT)]
    pub port: u16,
    #[command(flatten)]
    pub tuning: TuningArgs,
}

#[derive(Args, Debug)]
pub struct XssArgs {
    /// URL to test
    pub url: String,
    /// Query parameter carrying the payload
    #[arg(long, default_value = DEFAULT_XSS_PARAM)]
    pub param: String,
    #[command(flatten)]
    pub tuning: TuningArgs,
}

#[derive(Args, Debug)]
pub struct SqliArgs {
    /// Login form URL
    pub url: String,
    /// Name of the username form field
    pub username_field: String,
    /// Name of the password form field
    pub password_field: String,
    #[command(flatten)]
    pub tuning: TuningArgs,
}

/// Pacing profile argument.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingArg {
    None,
    Polite,
    Stealthy,
    Paranoid,
}

impl From<PacingArg> for Pacing {
    fn from(p: PacingArg) -> Self {
        match p {
            PacingArg::None => Pacing::None,
            PacingArg::Polite => Pacing::Polite,
            PacingArg::Stealthy => Pacing::Stealthy,
            PacingArg::Paranoid => Pacing::Paranoid,
        }
    }
}

/// Output format argument.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFmt {
    Pretty,
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Per-run context shared by the subcommand runners.
pub struct RunContext {
    pub output: OutputFmt,
    pub pacing: Option<Pacing>,
    pub defaults: SweepDefaults,
    pub cancel: CancellationToken,
}

impl RunContext {
    fn session_config(&self, kind: StrategyKind, tuning: &TuningArgs) -> Result<SessionConfig, ScanError> {
        Ok(self
            .defaults
            .resolve(kind, tuning.concurrency, tuning.timeout, self.pacing)?)
    }
}

/// Run the selected subcommand to completion.
///
/// Input problems surface as [`ScanError::Input`] before any probe is sent;
/// a cancelled sweep returns [`ScanError::Cancelled`] after its lines are
/// printed.
pub async fn run(cli: Cli, cancel: CancellationToken) -> Result<SessionReport, ScanError> {
    let ctx = RunContext {
        output: cli.output,
        pacing: cli.pacing.map(Pacing::from),
        defaults: SweepDefaults::from_env(),
        cancel,
    };

    let report = match cli.command {
        Commands::Ports(args) => run_ports(args, &ctx).await?,
        Commands::Dirs(args) => run_dirs(args, &ctx).await?,
        Commands::Ssh(args) => run_ssh(args, &ctx).await?,
        Commands::Xss(args) => run_xss(args, &ctx).await?,
        Commands::Sqli(args) => run_sqli(args, &ctx).await?,
    };

    if report.termination == Termination::Cancelled {
        return Err(ScanError::Cancelled);
    }
    Ok(report)
}

pub async fn run_ports(args: PortsArgs, ctx: &RunContext) -> Result<SessionReport, ScanError> {
    let config = ctx.session_config(StrategyKind::Ports, &args.tuning)?;
    let ports = PortSpec::parse(&args.ports)?.expand();
    let (ip, hostname) = resolve_target(&args.target).await?;

    let host_label = hostname
        .map(|h| format!("{h} ({ip})"))
        .unwrap_or_else(|| ip.to_string());
    let banner = format!("Scanning {host_label} for open ports...");

    Ok(drive(
        PortConnectProbe::new(ip),
        args.target,
        &banner,
        ports,
        config,
        ctx,
        "[*] No open ports found.",
    )
    .await)
}

pub async fn run_dirs(args: DirsArgs, ctx: &RunContext) -> Result<SessionReport, ScanError> {
    let config = ctx.session_config(StrategyKind::Dirs, &args.tuning)?;
    let url = parse_url(&args.url)?;
    let words = load_wordlist(&args.wordlist).await?;
    let client = build_client(config.attempt_timeout)?;

    let base = url.as_str().trim_end_matches('/').to_string();
    let banner = format!("Starting directory brute-force on {base}...");

    Ok(drive(
        DirectoryProbe::new(client, base.clone()),
        base,
        &banner,
        words,
        config,
        ctx,
        "[*] No directories found.",
    )
    .await)
}

pub async fn run_ssh(args: SshArgs, ctx: &RunContext) -> Result<SessionReport, ScanError> {
    let config = ctx.session_config(StrategyKind::Ssh, &args.tuning)?;
    let passwords = load_wordlist(&args.wordlist).await?;
    let (ip, _) = resolve_target(&args.host).await?;

    let auth = RusshAuth::new(ip.to_string(), args.port, config.attempt_timeout);
    let banner = format!(
        "Starting SSH brute-force on {}:{} for user {}...",
        args.host, args.port, args.username
    );

    Ok(drive(
        SshAuthProbe::new(auth, args.username),
        args.host,
        &banner,
        passwords,
        config,
        ctx,
        "[-] No password found in the wordlist.",
    )
    .await)
}

pub async fn run_xss(args: XssArgs, ctx: &RunContext) -> Result<SessionReport, ScanError> {
    let config = ctx.session_config(StrategyKind::Xss, &args.tuning)?;
    let url = parse_url(&args.url)?;
    let client = build_client(config.attempt_timeout)?;

    let probe = ReflectedXssProbe::new(client, url.clone(), args.param);
    let payloads = probe.payloads();
    let banner = format!("Scanning {url} for reflected XSS...");

    Ok(drive(
        probe,
        url.to_string(),
        &banner,
        payloads,
        config,
        ctx,
        "[-] No reflected XSS vulnerability found.",
    )
    .await)
}

pub async fn run_sqli(args: SqliArgs, ctx: &RunContext) -> Result<SessionReport, ScanError> {
    let config = ctx.session_config(StrategyKind::Sqli, &args.tuning)?;
    let url = parse_url(&args.url)?;
    let client = build_client(config.attempt_timeout)?;

    let probe = LoginBypassProbe::new(client, url.clone(), args.username_field, args.password_field);
    let banner = format!("Testing {url} for SQL injection...");

    Ok(drive(
        probe,
        url.to_string(),
        &banner,
        LoginBypassProbe::payloads(),
        config,
        ctx,
        "[*] No simple SQL injection vulnerabilities found.",
    )
    .await)
}

/// Run one session under the strategy's policy, printing as outcomes arrive.
async fn drive<P: Probe>(
    probe: P,
    target: String,
    banner: &str,
    candidates: Vec<P::Candidate>,
    config: SessionConfig,
    ctx: &RunContext,
    nothing_found: &str,
) -> SessionReport {
    let kind = probe.kind();
    let total = candidates.len();
    let session = ProbeSession::new(target, probe, kind.policy(), config)
        .with_cancellation(ctx.cancel.clone());

    let mut reporter = Reporter::new(ctx.output, kind, session.target(), session.id());
    for line in reporter.session_start(banner, total, session.config()) {
        println!("{line}");
    }

    let mut sweep = session.run(candidates);
    while let Some(outcome) = sweep.next().await {
        println!("{}", reporter.outcome(&outcome));
    }
    let report = sweep.finish().await;

    for line in reporter.session_end(&report, nothing_found) {
        println!("{line}");
    }
    report
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InputError;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("scan").chain(args.iter().copied())).unwrap()
    }

    fn ctx() -> RunContext {
        RunContext {
            output: OutputFmt::Json,
            pacing: None,
            defaults: SweepDefaults::default(),
            cancel: CancellationToken::new(),
        }
    }

    #[test]
    fn test_parse_ports_defaults() {
        let cli = parse(&["ports", "127.0.0.1"]);
        assert_eq!(cli.output, OutputFmt::Pretty);
        match cli.command {
            Commands::Ports(a) => {
                assert_eq!(a.ports, DEFAULT_PORTS);
                assert!(a.tuning.concurrency.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = parse(&[
            "ssh", "10.0.0.5", "root", "pw.txt", "--port", "2222", "--concurrency", "2",
            "--timeout", "1.5", "--output", "json", "--pacing", "polite",
        ]);
        assert_eq!(cli.output, OutputFmt::Json);
        assert_eq!(cli.pacing, Some(PacingArg::Polite));
        match cli.command {
            Commands::Ssh(a) => {
                assert_eq!(a.port, 2222);
                assert_eq!(a.tuning.concurrency, Some(2));
                assert_eq!(a.tuning.timeout, Some(Duration::from_millis(1500)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_xss_param_default() {
        match parse(&["xss", "http://h/search"]).command {
            Commands::Xss(a) => assert_eq!(a.param, "xss_test"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_timeout() {
        let res = Cli::try_parse_from(["scan", "ports", "h", "--timeout", "soon"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_pacing_arg_conversion() {
        assert_eq!(Pacing::from(PacingArg::Stealthy), Pacing::Stealthy);
        assert_eq!(Pacing::from(PacingArg::None), Pacing::None);
    }

    #[tokio::test]
    async fn test_malformed_ports_is_input_error() {
        let args = PortsArgs {
            target: "127.0.0.1".into(),
            ports: "80,http".into(),
            tuning: TuningArgs::default(),
        };
        let err = run_ports(args, &ctx()).await.unwrap_err();
        assert!(matches!(err, ScanError::Input(InputError::PortSpec(_))));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_input_error() {
        let args = PortsArgs {
            target: "127.0.0.1".into(),
            ports: "80".into(),
            tuning: TuningArgs {
                concurrency: Some(0),
                timeout: None,
            },
        };
        let err = run_ports(args, &ctx()).await.unwrap_err();
        assert!(matches!(err, ScanError::Input(InputError::Concurrency)));
    }

    #[tokio::test]
    async fn test_missing_wordlist_is_input_error() {
        let args = DirsArgs {
            url: "http://127.0.0.1:1".into(),
            wordlist: PathBuf::from("/definitely/not/here.txt"),
            tuning: TuningArgs::default(),
        };
        let err = run_dirs(args, &ctx()).await.unwrap_err();
        assert!(matches!(err, ScanError::Input(InputError::Wordlist { .. })));
    }

    #[tokio::test]
    async fn test_bad_url_is_input_error() {
        let args = XssArgs {
            url: "not a url".into(),
            param: DEFAULT_XSS_PARAM.into(),
            tuning: TuningArgs::default(),
        };
        let err = run_xss(args, &ctx()).await.unwrap_err();
        assert!(matches!(err, ScanError::Input(InputError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_ports_run_against_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move { while listener.accept().await.is_ok() {} });

        let args = PortsArgs {
            target: "127.0.0.1".into(),
            ports: port.to_string(),
            tuning: TuningArgs::default(),
        };
        let report = run_ports(args, &ctx()).await.unwrap();
        assert_eq!(report.termination, Termination::Exhausted);
        assert_eq!(report.tally.positive, 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_maps_to_cancelled() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a\nb\nc").unwrap();

        let ctx = ctx();
        ctx.cancel.cancel();
        let args = DirsArgs {
            url: "http://127.0.0.1:1".into(),
            wordlist: file.path().to_path_buf(),
            tuning: TuningArgs::default(),
        };
        let report = run_dirs(args, &ctx).await.unwrap();
        assert_eq!(report.termination, Termination::Cancelled);
        assert_eq!(report.dispatched, 0);
    }

    #[tokio::test]
    async fn test_run_maps_cancellation_to_exit_code() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a\nb\nc").unwrap();
        let wordlist = file.path().to_string_lossy().into_owned();

        let cli = parse(&["--output", "json", "dirs", "http://127.0.0.1:1", &wordlist]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run(cli, cancel).await.unwrap_err();
        assert!(matches!(err, ScanError::Cancelled));
        assert_eq!(err.exit_code(), 2);
    }
}
