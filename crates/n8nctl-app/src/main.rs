//! n8nctl entry point: parse the command line, resolve configuration,
//! dispatch, and translate the outcome into an envelope and exit code.
//! SIGINT/SIGTERM interrupt the running command and emit a truncated
//! `CANCELLED` envelope.

mod bulk;
mod cli;
mod commands;
mod config;
mod context;
mod envelope;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::context::AppContext;
use crate::envelope::{emit, Outcome};

#[tokio::main]
async fn main() {
    // .env is a convenience for local development; real config wins.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.global);

    let settings = match config::load(&cli.global) {
        Ok(settings) => settings,
        Err(err) => {
            let outcome = Outcome::error(
                n8nctl_core::ErrorClass::Config,
                err.code(),
                &err.to_string(),
                None,
            );
            finish(outcome, &cli.global);
        }
    };

    let ctx = AppContext::new(settings);

    let outcome = tokio::select! {
        outcome = commands::dispatch(&ctx, cli.command) => outcome,
        _ = shutdown_signal() => Outcome::cancelled(),
    };

    finish(outcome, &cli.global);
}

fn finish(outcome: Outcome, global: &cli::GlobalOptions) -> ! {
    if let Err(err) = emit(&outcome, global.json, global.save.as_deref()) {
        eprintln!("error[IO_ERROR]: failed to write output: {err}");
        std::process::exit(n8nctl_core::ErrorClass::Io.exit_code());
    }
    std::process::exit(outcome.exit_code);
}

fn init_tracing(global: &cli::GlobalOptions) {
    let default_level = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("n8nctl={default_level}")));

    let no_color = global.no_color || std::env::var_os("NO_COLOR").is_some();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .init();
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => {
                // Fall back to Ctrl-C only.
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
