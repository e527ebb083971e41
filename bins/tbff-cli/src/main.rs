//! tbff-cli — Command-line driver for the TBFF flow engine.
//!
//! Loads a network snapshot from JSON, applies an optional edit, runs
//! propagation and prints the resulting state. Edits are written back to
//! the same file.

mod report;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tbff_core::constants::{CONVERGENCE_THRESHOLD, DEFAULT_ALLOCATION_PERCENTAGE, MAX_ITERATIONS};
use tbff_core::error::NetworkError;
use tbff_core::traits::FlowPropagator;
use tbff_core::types::{FlowNetwork, PropagationResult};
use tbff_flow::{
    EngineConfig, FlowEngine, SinkPolicy, create_allocation, delete_allocation, normalize_all,
    set_external_flow, update_allocation_percentage,
};
use tracing::info;

use crate::report::Report;

/// Threshold-based flow funding: propagate flow through a network of accounts.
#[derive(Parser, Debug)]
#[command(name = "tbff-cli", version)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Upper bound on propagation iterations
    #[arg(long, global = true, default_value_t = MAX_ITERATIONS)]
    max_iterations: u32,

    /// Largest per-node inflow change accepted as converged
    #[arg(long, global = true, default_value_t = CONVERGENCE_THRESHOLD)]
    convergence_threshold: f64,

    /// How an existing overflow sink is fed on later runs (set-once or recompute)
    #[arg(long, global = true, default_value = "set-once")]
    sink_policy: SinkPolicy,
}

impl EngineArgs {
    /// Convert CLI args into an EngineConfig.
    fn into_config(self) -> EngineConfig {
        EngineConfig {
            max_iterations: self.max_iterations,
            convergence_threshold: self.convergence_threshold,
            sink_policy: self.sink_policy,
            ..EngineConfig::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Propagate flow and print the steady state.
    Propagate(PropagateArgs),
    /// Set the external flow injected into a node.
    SetFlow(SetFlowArgs),
    /// Add an allocation between two nodes.
    Allocate(AllocateArgs),
    /// Change an allocation's percentage.
    SetPercentage(SetPercentageArgs),
    /// Remove an allocation.
    Deallocate(DeallocateArgs),
}

#[derive(Args, Debug)]
struct PropagateArgs {
    /// Network JSON file.
    file: PathBuf,

    /// Print the full result as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Write the propagated network back to the file.
    #[arg(long)]
    write: bool,
}

#[derive(Args, Debug)]
struct SetFlowArgs {
    file: PathBuf,

    #[arg(long)]
    node: String,

    /// Flow per cycle; negative values are clamped to zero.
    #[arg(long, allow_negative_numbers = true)]
    value: f64,
}

#[derive(Args, Debug)]
struct AllocateArgs {
    file: PathBuf,

    #[arg(long)]
    from: String,

    #[arg(long)]
    to: String,

    /// Initial percentage before the source's allocations are renormalized.
    #[arg(long, default_value_t = DEFAULT_ALLOCATION_PERCENTAGE, allow_negative_numbers = true)]
    percentage: f64,
}

#[derive(Args, Debug)]
struct SetPercentageArgs {
    file: PathBuf,

    #[arg(long)]
    allocation: String,

    /// New percentage; clamped to [0, 1].
    #[arg(long, allow_negative_numbers = true)]
    value: f64,
}

#[derive(Args, Debug)]
struct DeallocateArgs {
    file: PathBuf,

    #[arg(long)]
    allocation: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let engine =
        FlowEngine::with_config(cli.engine.into_config()).context("Invalid engine configuration")?;

    let result = match cli.command {
        Commands::Propagate(args) => {
            let result = propagate_file(&engine, &args.file, args.write)?;
            if args.json {
                let json = serde_json::to_string_pretty(&result)
                    .context("Failed to serialize propagation result")?;
                println!("{json}");
                return Ok(());
            }
            result
        }
        Commands::SetFlow(args) => edit_file(&engine, &args.file, |net| {
            set_external_flow(net, &args.node, args.value)
        })?,
        Commands::Allocate(args) => edit_file(&engine, &args.file, |net| {
            let id = create_allocation(net, &args.from, &args.to, args.percentage)?;
            info!(allocation = %id, from = %args.from, to = %args.to, "cli: allocation created");
            Ok(())
        })?,
        Commands::SetPercentage(args) => edit_file(&engine, &args.file, |net| {
            update_allocation_percentage(net, &args.allocation, args.value)
        })?,
        Commands::Deallocate(args) => edit_file(&engine, &args.file, |net| {
            delete_allocation(net, &args.allocation).map(|_| ())
        })?,
    };

    println!("{}", Report(&result));
    Ok(())
}

/// Load, propagate and optionally persist a network file.
fn propagate_file(engine: &FlowEngine, path: &Path, write: bool) -> Result<PropagationResult> {
    let network = load_network(path)?;
    let result = engine.propagate(&network).context("Propagation failed")?;
    if write {
        save_network(path, &result.network)?;
    }
    Ok(result)
}

/// Load a network file, apply `edit`, propagate and write the result back.
fn edit_file<F>(engine: &FlowEngine, path: &Path, edit: F) -> Result<PropagationResult>
where
    F: FnOnce(&mut FlowNetwork) -> Result<(), NetworkError>,
{
    let mut network = load_network(path)?;
    edit(&mut network).context("Edit rejected")?;
    let result = engine.propagate(&network).context("Propagation failed")?;
    save_network(path, &result.network)?;
    Ok(result)
}

/// Read a snapshot and normalize every source's allocations.
fn load_network(path: &Path) -> Result<FlowNetwork> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read network file: {}", path.display()))?;
    let mut network = FlowNetwork::from_json(&json)
        .with_context(|| format!("Failed to parse network file: {}", path.display()))?;
    normalize_all(&mut network);
    info!(
        file = %path.display(),
        nodes = network.nodes.len(),
        allocations = network.allocations.len(),
        "cli: network loaded"
    );
    Ok(network)
}

fn save_network(path: &Path, network: &FlowNetwork) -> Result<()> {
    let json = network
        .to_json_pretty()
        .context("Failed to serialize network")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write network file: {}", path.display()))?;
    info!(file = %path.display(), "cli: network saved");
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Logs go to stderr so stdout stays clean for reports and JSON.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
