//! scan: concurrent security-testing sweeps.
//!
//! Usage:
//!   scan ports <TARGET> [--ports <SPEC>] [--concurrency N] [--timeout SEC]
//!   scan dirs <URL> <WORDLIST> [--concurrency N] [--timeout SEC]
//!   scan ssh <HOST> <USERNAME> <WORDLIST> [--port P] [--concurrency N] [--timeout SEC]
//!   scan xss <URL> [--param NAME] [--timeout SEC]
//!   scan sqli <URL> <USERNAME_FIELD> <PASSWORD_FIELD> [--timeout SEC]
//!
//! Global: --output pretty|json, --pacing none|polite|stealthy|paranoid

use clap::Parser;
use recon0::cli::{self, Cli};
use recon0::error::{ScanError, EXIT_INPUT, EXIT_OK};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialise logging (RUST_LOG=debug etc.)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_INPUT } else { EXIT_OK };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, cancelling sweep");
                on_signal.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "failed to install Ctrl-C handler"),
        }
    });

    match cli::run(cli, cancel).await {
        Ok(_) => std::process::exit(EXIT_OK),
        Err(ScanError::Cancelled) => {
            eprintln!("[!] Scan cancelled.");
            std::process::exit(ScanError::Cancelled.exit_code());
        }
        Err(e) => {
            println!("[-] {e}");
            std::process::exit(e.exit_code());
        }
    }
}
