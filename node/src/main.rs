// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # accord Node
//!
//! Entry point for the `accord-node` binary. Parses CLI arguments,
//! initializes logging and metrics, and runs the requested subcommand:
//!
//! - `init`   : write a network file with fresh keys for every role
//! - `demo`   : run issue and change end to end inside this process
//! - `version`: print build version information

mod cli;
mod demo;
mod logging;
mod metrics;
mod network;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;

use cli::{AccordNodeCli, Commands};
use demo::DemoOptions;
use metrics::FlowMetrics;
use network::NetworkFile;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = AccordNodeCli::parse();
    logging::init_logging(&cli.log, cli.log_format)?;

    match cli.command {
        Commands::Init(args) => init_network(args),
        Commands::Demo(args) => run_demo(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Writes a fresh network file with owner-only permissions.
fn init_network(args: cli::InitArgs) -> Result<()> {
    if args.out.exists() && !args.force {
        bail!(
            "{} already exists (use --force to overwrite)",
            args.out.display()
        );
    }

    let network = NetworkFile::generate();
    let body = serde_json::to_string_pretty(&network)?;
    std::fs::write(&args.out, body)
        .with_context(|| format!("failed to write network file {}", args.out.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&args.out, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!(path = %args.out.display(), "network file written");
    println!("Network file written to {}", args.out.display());
    for entry in &network.parties {
        let party = entry.party()?;
        println!("  {:<13} {}  {}", format!("{:?}", entry.role), party.owning_key.to_hex(), entry.name);
    }
    Ok(())
}

async fn run_demo(args: cli::DemoArgs) -> Result<()> {
    let network = match &args.network {
        Some(path) => NetworkFile::load(path)?,
        None => {
            tracing::info!("no network file given, generating a throwaway network");
            NetworkFile::generate()
        }
    };
    if let Some(dir) = &args.data_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
    }

    let metrics = FlowMetrics::new().context("failed to register metrics")?;
    let options = DemoOptions {
        data_dir: args.data_dir,
        vin: args.vin,
        plate: args.plate,
        new_location: args.new_location,
    };

    tracing::info!(
        parties = network.parties.len(),
        persistent = options.data_dir.is_some(),
        "starting demo"
    );

    let outcome = tokio::select! {
        r = demo::run(&network, &options, &metrics) => Some(r),
        _ = signal::ctrl_c() => None,
    };

    let result = match outcome {
        Some(Ok(report)) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Some(Err(e)) => Err(e),
        None => {
            tracing::info!("interrupted");
            Ok(())
        }
    };

    if args.metrics {
        print!("{}", metrics.encode()?);
    }
    result
}

fn print_version() {
    println!("accord-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol    {}", accord_protocol::config::PROTOCOL_VERSION);
    println!("contract    {}", accord_protocol::contract::CONTRACT_ID);
}
