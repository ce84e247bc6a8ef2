//! # CLI Interface
//!
//! Defines the command-line argument structure for `lastwill-node` using
//! `clap` derive. Subcommands: `run`, `keygen`, and `version`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use lastwill_protocol::storage::StorageBackend;

use crate::logging::LogFormat;

/// LastWill vault service.
///
/// Serves the vault lifecycle over HTTP against a local devnet: create and
/// fund vaults, name beneficiaries, check in, and claim once the owner goes
/// quiet. Exposes Prometheus metrics on a separate port.
#[derive(Parser, Debug)]
#[command(
    name = "lastwill-node",
    about = "LastWill dead man's switch vault service",
    version,
    propagate_version = true
)]
pub struct LastWillCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the LastWill binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP service.
    Run(RunArgs),
    /// Generate an account key and write it to a file readable only by
    /// the current user.
    Keygen(KeygenArgs),
    /// Print version information and exit.
    Version,
}

/// Where vault records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Process memory. Everything is lost on exit.
    Memory,
    /// One JSON file per vault under `<data-dir>/vaults`.
    File,
    /// Embedded sled database under `<data-dir>/db`.
    Sled,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory for vault records and the sled database.
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "LASTWILL_DATA_DIR", default_value = ".lastwill")]
    pub data_dir: PathBuf,

    /// Port for the REST API.
    #[arg(long, env = "LASTWILL_API_PORT", default_value_t = 8645)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "LASTWILL_METRICS_PORT", default_value_t = 8646)]
    pub metrics_port: u16,

    /// Vault record backend.
    #[arg(long, env = "LASTWILL_STORE", value_enum, default_value_t = StoreKind::File)]
    pub store: StoreKind,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "LASTWILL_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Devnet gas price in wei. Zero makes every transaction free.
    #[arg(long, env = "LASTWILL_GAS_PRICE", default_value_t = lastwill_protocol::config::GAS_PRICE_WEI)]
    pub gas_price: u128,

    /// Attempts per delegation disable during a check-in.
    #[arg(long, env = "LASTWILL_DISABLE_ATTEMPTS", default_value_t = lastwill_protocol::config::DEFAULT_DISABLE_ATTEMPTS)]
    pub disable_attempts: u32,
}

impl RunArgs {
    pub fn log_format(&self) -> LogFormat {
        LogFormat::from_str_lossy(&self.log_format)
    }

    /// Resolves the store flag against the data directory.
    pub fn storage_backend(&self) -> StorageBackend {
        match self.store {
            StoreKind::Memory => StorageBackend::Memory,
            StoreKind::File => StorageBackend::File {
                dir: self.data_dir.join("vaults"),
            },
            StoreKind::Sled => StorageBackend::Sled {
                path: self.data_dir.join("db"),
            },
        }
    }
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// File to write the hex-encoded secret key to.
    #[arg(long, short = 'o', default_value = "account.key")]
    pub out: PathBuf,

    /// Overwrite `out` if it already exists.
    #[arg(long)]
    pub force: bool,
}
