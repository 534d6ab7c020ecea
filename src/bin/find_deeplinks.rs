//! Deep link discovery
//!
//! Prints every app installed on the booted simulator with its URL schemes
//! and universal-link domains, as CSV on stdout.

use agentic_ios::device::SystemRunner;
use agentic_ios::discovery::{Discovery, CSV_HEADER};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// List URL schemes and universal links of apps on the booted simulator
#[derive(Parser, Debug)]
#[command(name = "find-deeplinks")]
#[command(about = "List URL schemes and universal-link domains of apps on the booted simulator")]
struct Args {
    /// Home directory holding Library/Developer/CoreSimulator (default: $HOME)
    #[arg(long)]
    home: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default = if args.verbose {
        "agentic_ios=debug,find_deeplinks=debug"
    } else {
        "agentic_ios=warn,find_deeplinks=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();

    let home = args
        .home
        .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
        .unwrap_or_default();

    let records = match Discovery::new(SystemRunner, home).discover() {
        Ok(records) => records,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Found {} apps", records.len());
    println!("{}", CSV_HEADER);
    for record in &records {
        println!("{}", record.to_csv_row());
    }
}
