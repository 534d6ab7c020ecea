//! ai-runner - Entry Point
//!
//! Takes a natural language instruction, asks the language model which app
//! it is about, and opens the matching deep link on a simulator or device.

use agentic_ios::command::ActionDispatcher;
use agentic_ios::core::config::{ConfigOverrides, RunnerConfig};
use agentic_ios::core::error::Result;
use agentic_ios::device;
use agentic_ios::llm::{parse_instruction, InstructionContext, LlmClient};

use clap::error::ErrorKind;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_FILE: &str = "ai-runner.toml";

/// Natural language commands for iOS apps
#[derive(Parser, Debug)]
#[command(name = "ai-runner")]
#[command(about = "Open and drive iOS apps on a simulator or device from a natural language instruction")]
struct Args {
    /// TOML config file (default: ./ai-runner.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model to use instead of the configured list (repeatable)
    #[arg(long = "model")]
    models: Vec<String>,

    /// Target a specific simulator UDID
    #[arg(long)]
    device: Option<String>,

    /// Target a physical device through devicectl
    #[arg(long, value_name = "UDID")]
    physical: Option<String>,

    /// Resolve and print the deep link without launching anything
    #[arg(long)]
    dry_run: bool,

    /// Print the resolved action as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// The instruction, e.g. "give Alice a phone call"
    #[arg(required = true, trailing_var_arg = true)]
    instruction: Vec<String>,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            // Printing only fails if stderr is gone, nothing left to report to
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(args.verbose);

    let instruction = args.instruction.join(" ").trim().to_string();
    if instruction.is_empty() {
        eprintln!("Usage: ai-runner \"<natural language command>\"");
        std::process::exit(1);
    }

    if let Err(e) = run(&args, &instruction) {
        tracing::debug!("Failed: {:?}", e);
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "agentic_ios=debug,ai_runner=debug"
    } else {
        "agentic_ios=info,ai_runner=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Defaults < config file < environment < command line
fn load_config(args: &Args) -> Result<RunnerConfig> {
    let path = args.config.clone().or_else(|| {
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.is_file().then_some(local)
    });
    let mut config = RunnerConfig::load(path.as_deref())?;
    config.apply_overrides(&ConfigOverrides {
        models: args.models.clone(),
        device: args.device.clone(),
        physical_device: args.physical.clone(),
        dry_run: args.dry_run,
    });

    config.validate()?;
    Ok(config)
}

fn run(args: &Args, instruction: &str) -> Result<()> {
    let config = load_config(args)?;
    let client = LlmClient::from_config(&config)?;

    let context = InstructionContext::from_instruction(instruction);
    tracing::info!("Detected slots: {}", context.summary());
    tracing::info!("Calling models: {}", config.models.join(", "));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let action = runtime.block_on(parse_instruction(&client, &context))?;

    let target = device::from_config(&config);
    let link = ActionDispatcher::build_link(&action)?;
    if !args.json {
        println!("Decision:");
        println!("  App       : {}", action.app);
        println!("  Arguments : {}", serde_json::to_string(&action.params)?);
        println!("  Link      : {}", link);
        println!("  Target    : {}", target.describe());
    }

    let outcome = ActionDispatcher::new(target.as_ref()).dispatch(&action)?;

    if args.json {
        let report = json!({
            "app": action.app,
            "params": action.params,
            "url": outcome.url,
            "device": outcome.device,
            "dry_run": config.dry_run,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if config.dry_run {
        println!("Dry run, nothing launched.");
    } else {
        println!("Launched {}.", outcome.app);
    }
    Ok(())
}
