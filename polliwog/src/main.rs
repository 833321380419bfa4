//! polliwog - mirror a remote daycare event feed into a local media archive
//!
//! One invocation performs one full pass: authenticate, walk the feed from
//! the latest event back to the earliest, and download every attachment not
//! already archived, stamping each file with its event's original timestamp.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/polliwog/config.toml (~/.config/polliwog/config.toml)
//! - Logs: $XDG_STATE_HOME/polliwog/polliwog.log (~/.local/state/polliwog/polliwog.log)

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use polliwog_core::{Config, Error, EventFeed, FeedClient, IngestCoordinator};

#[derive(Parser)]
#[command(name = "polliwog")]
#[command(about = "Mirror a remote daycare event feed into a local media archive")]
#[command(version)]
struct Args {
    /// Path to the config file (defaults to ~/.config/polliwog/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Authenticate and print the account overview without downloading
    #[arg(long)]
    dry_run: bool,

    /// Increase log verbosity (-v: debug, -vv: trace); overrides the
    /// configured level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            // Expected session and configuration failures exit 1; anything
            // else escaping the pipeline exits 2.
            match e.downcast_ref::<Error>() {
                Some(Error::Session(_)) | Some(Error::Config(_)) => ExitCode::from(1),
                _ => ExitCode::from(2),
            }
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;
    config.validate()?;

    let _log_guard = polliwog_core::logging::init(&config.logging, args.verbose)
        .context("failed to initialize logging")?;

    tracing::info!("polliwog starting");

    let username = config.feed.username.clone().unwrap_or_default();
    let password = config.feed.password.clone().unwrap_or_default();

    let client = FeedClient::new(&config.feed)?;
    client.login(&username, &password).await?;
    client.admit().await?;

    if args.dry_run {
        let overview = client.overview().await?;
        println!("earliest event: {}", overview.first_event_time);
        println!("latest event:   {}", overview.last_event_time);
        println!("\nDry run - nothing downloaded");
        return Ok(());
    }

    let coordinator = IngestCoordinator::new(client, &config.archive);
    let summary = coordinator.run().await?;

    println!(
        "Done: {} page(s), {} event(s), {} downloaded, {} skipped",
        summary.pages_fetched,
        summary.events_seen,
        summary.attachments_downloaded,
        summary.attachments_skipped,
    );
    if !summary.errors.is_empty() {
        println!("{} attachment(s) failed to download:", summary.errors.len());
        for (key, message) in &summary.errors {
            println!("  - {}: {}", key, message);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_accept_verbose() {
        let args = Args::try_parse_from(["polliwog", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert!(!args.dry_run);

        let args = Args::try_parse_from(["polliwog", "--verbose", "--dry-run"]).unwrap();
        assert_eq!(args.verbose, 1);
        assert!(args.dry_run);
    }

    #[test]
    fn test_args_default_verbosity_is_zero() {
        let args = Args::try_parse_from(["polliwog"]).unwrap();
        assert_eq!(args.verbose, 0);
    }
}
