//! # ternctl
//!
//! Operator CLI for tern wait set segments.
//!
//! # Usage
//!
//! ```bash
//! # Create segment "sensors" with 4 slots and print every wake-up
//! ternctl serve --segment sensors --slots 4
//!
//! # From another shell or process
//! ternctl trigger --segment sensors --slot 2
//!
//! # Inspect the segment
//! ternctl info --segment sensors
//!
//! # Serve from a config file, JSON logs
//! ternctl --json serve --config /etc/tern/serve.toml
//! ```

#![deny(warnings)]

mod serve;

use clap::{Parser, Subcommand};
use serve::ServeArgs;
use tern_common::config::LogLevel;
use tern_waitset::SharedSegment;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

/// tern wait set control tool
#[derive(Parser, Debug)]
#[command(name = "ternctl")]
#[command(version)]
#[command(about = "Serve, trigger and inspect tern wait set segments")]
#[command(long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a segment and block on its slots until interrupted
    Serve(ServeArgs),

    /// Trigger one slot of an existing segment
    Trigger {
        /// Segment name
        #[arg(long)]
        segment: String,

        /// Slot index
        #[arg(long)]
        slot: usize,
    },

    /// Print the state of an existing segment
    Info {
        /// Segment name
        #[arg(long)]
        segment: String,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("ternctl: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Command::Serve(ref serve_args) => {
            let config = serve_args.resolve()?;
            setup_tracing(args.verbose, args.json, config.shared.log_level);
            serve::run(&config)?;
        }
        Command::Trigger { ref segment, slot } => {
            setup_tracing(args.verbose, args.json, LogLevel::default());
            SharedSegment::open(segment)?.trigger(slot)?;
            info!(segment = %segment, slot, "slot triggered");
        }
        Command::Info { ref segment } => {
            setup_tracing(args.verbose, args.json, LogLevel::default());
            print_info(&SharedSegment::open(segment)?);
        }
    }

    Ok(())
}

fn print_info(segment: &SharedSegment) {
    let liveness = if segment.is_creator_alive() {
        "alive"
    } else {
        "dead"
    };
    let data = segment.condition_variable();

    println!("segment: {}", segment.name());
    println!("path: {}", segment.path().display());
    println!("creator_pid: {} ({liveness})", segment.creator_pid());
    println!("slots: {}", segment.slot_count());
    println!("triggered: {}", serve::format_slots(segment.triggered_slots()));
    println!("pending_notifications: {}", data.pending_notifications());
    println!("blocked_waiters: {}", data.blocked_waiters());
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(verbose: bool, json: bool, configured: LogLevel) {
    let level = if verbose {
        Level::DEBUG
    } else {
        configured.into()
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
