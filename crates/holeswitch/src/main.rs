//! holeswitch — push-button and status LED control for Pi-hole blocking.
//!
//! `holeswitch monitor` is the daemon; the other subcommands are one-shot
//! helpers for checking and changing the blocking state from a shell.

use std::path::PathBuf;

use clap::Parser;

mod cli;

#[derive(Parser)]
#[command(
    name = "holeswitch",
    version,
    about = "Push-button and status LED control for Pi-hole blocking"
)]
struct Args {
    /// Output as JSON (for status, enable, disable, toggle, config)
    #[arg(long, global = true)]
    json: bool,

    /// Path to config file (default: platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: cli::Command,
}

fn init_logger(verbose: bool, daemon: bool) {
    let default = if verbose {
        "debug"
    } else if daemon {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose, matches!(args.command, cli::Command::Monitor));

    if let Err(e) = cli::run(args.command, args.json, args.config.as_deref()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
