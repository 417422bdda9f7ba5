//! `trellis` - run a script against a headless native view tree.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use trellis_api::Value;
use trellis_host::{Bridge, HostConfig, setup_logging};
use trellis_ui::ViewManagerRegistry;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Drive a native view tree from a script")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: <config dir>/trellis/trellis.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script and print the resulting view tree as JSON
    Run {
        /// Script to run (default: [script] entry from the config)
        script: Option<PathBuf>,

        /// Function to call after the script, as Module.method
        #[arg(long)]
        call: Option<String>,

        /// Arguments for --call, as a JSON list
        #[arg(long, default_value = "[]")]
        args: String,

        /// How long to wait for animations to finish (milliseconds)
        #[arg(long, default_value = "1000")]
        settle_ms: u64,
    },

    /// Print the native properties of every registered view manager
    Constants,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::load_default()?,
    };
    setup_logging(&config.log.filter)?;

    match cli.command {
        Commands::Run {
            script,
            call,
            args,
            settle_ms,
        } => run(&config, script, call, &args, settle_ms),
        Commands::Constants => {
            let constants = ViewManagerRegistry::new().native_props();
            println!("{}", serde_json::to_string_pretty(&constants)?);
            Ok(())
        }
    }
}

fn run(
    config: &HostConfig,
    script: Option<PathBuf>,
    call: Option<String>,
    args: &str,
    settle_ms: u64,
) -> Result<()> {
    let Some(path) = script.or_else(|| config.script.entry.clone()) else {
        bail!("no script given and no [script] entry configured");
    };
    let target = call.as_deref().map(parse_target).transpose()?;
    let args: Value = serde_json::from_str(args).context("--args is not valid JSON")?;
    let Value::List(args) = args else {
        bail!("--args must be a JSON list, got {}", args.type_name());
    };

    let bridge = Bridge::start(config, ViewManagerRegistry::new())?;
    bridge.mount_root(config.ui.root_width, config.ui.root_height)?;
    bridge.run_file(&path)?;

    if let Some((module, method)) = target {
        let result = bridge.call_function(module, method, args)?;
        tracing::info!(module, method, %result, "call returned");
    }

    if !bridge.settle(Duration::from_millis(settle_ms))? {
        tracing::warn!(settle_ms, "animations still running");
    }
    let snapshot = bridge.snapshot()?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    bridge.shutdown();
    Ok(())
}

fn parse_target(target: &str) -> Result<(&str, &str)> {
    match target.split_once('.') {
        Some((module, method)) if !module.is_empty() && !method.is_empty() => Ok((module, method)),
        _ => bail!("--call expects Module.method, got `{}`", target),
    }
}
