//! # CLI Interface
//!
//! Command-line argument structure for `accord-node`, using `clap` derive.
//! Three subcommands: `init`, `demo` and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// accord participant node.
///
/// Runs the car issuance network locally: every party in the network file
/// gets its own keys, vault and responder, and the bank drives an issue and
/// a change through signature collection and notarisation.
#[derive(Parser, Debug)]
#[command(
    name = "accord-node",
    about = "accord participant node",
    version,
    propagate_version = true
)]
pub struct AccordNodeCli {
    /// Log output format.
    #[arg(long, global = true, env = "ACCORD_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Default log filter when `RUST_LOG` is not set.
    #[arg(
        long,
        global = true,
        env = "ACCORD_LOG",
        default_value = "accord_node=info,accord_protocol=info"
    )]
    pub log: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a network file with fresh keys for a bank, a dealer, a
    /// manufacturer and a notary.
    Init(InitArgs),
    /// Issue a car and then move it, all parties in this process.
    Demo(DemoArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Where to write the network file.
    #[arg(long, short = 'o', env = "ACCORD_NETWORK", default_value = "network.json")]
    pub out: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Network file to load. When omitted, a throwaway network with fresh
    /// keys is generated.
    #[arg(long, short = 'n', env = "ACCORD_NETWORK")]
    pub network: Option<PathBuf>,

    /// Keep each party's vault in a sled database under this directory.
    /// When omitted, vaults are in memory.
    #[arg(long, short = 'd', env = "ACCORD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Vehicle identification number of the issued car.
    #[arg(long, default_value = "KMHD841CBLU123456")]
    pub vin: String,

    /// License plate of the issued car. Must be seven characters.
    #[arg(long, default_value = "ABC1234")]
    pub plate: String,

    /// Dealership location the change moves the car to.
    #[arg(long, default_value = "Seoul")]
    pub new_location: String,

    /// Print Prometheus metrics after the report.
    #[arg(long)]
    pub metrics: bool,
}
