//! `hwdb` - command line access to the hardware database.
//!
//! ```text
//! hwdb query W5F3 ip
//! hwdb licenses --license-file /etc/slurm/licenses
//! hwdb entries dls_setup 07_20
//! hwdb branch encode hxcube 6 12
//! hwdb --hwdb ./db.yaml branch decode jboa7fpga12chip13_1
//! ```
//!
//! The database file is `--hwdb`, else `[database] path` from
//! `~/.hwdb/config.toml`, else the system database. Logs go to stderr so
//! stdout stays machine-readable.

mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use hwdb_config::HwdbConfig;
use hwdb_persist::DEFAULT_DATABASE_PATH;
use hwdb_types::{BranchIdentifier, CarrierKind, Coordinate};

#[derive(Debug, Parser)]
#[command(name = "hwdb", version, about = "Query the hardware database")]
struct Cli {
    /// Database file to read.
    #[arg(long, global = true, value_name = "PATH")]
    hwdb: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print one property of the entry at a coordinate, e.g. `W5F3 ip`.
    Query {
        coordinate: Coordinate,
        property: String,
    },
    /// Write the scheduler license and TRES files.
    Licenses {
        #[arg(long, value_name = "FILE")]
        license_file: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        tres_file: Option<PathBuf>,
        /// Print both lines instead of writing files.
        #[arg(long)]
        stdout: bool,
    },
    /// Print the raw documents whose top-level NODE equals QUERY.
    Entries { node: String, query: String },
    /// Encode or decode chip branch identifiers.
    #[command(subcommand)]
    Branch(BranchCommand),
}

#[derive(Debug, Subcommand)]
enum BranchCommand {
    /// Identifier of a chip, looked up in the database by EEPROM or
    /// handwritten serial.
    Encode {
        carrier: Carrier,
        carrier_id: u32,
        chip_serial: u32,
        /// Build the identifier for this board slot without a database lookup.
        #[arg(long, value_name = "SLOT", conflicts_with = "legacy")]
        fpga: Option<u8>,
        /// Legacy flat HX-cube form without board slot.
        #[arg(long)]
        legacy: bool,
    },
    /// Split an identifier into its parts.
    Decode { identifier: BranchIdentifier },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Carrier {
    Hxcube,
    Jboa,
}

impl From<Carrier> for CarrierKind {
    fn from(carrier: Carrier) -> Self {
        match carrier {
            Carrier::Hxcube => CarrierKind::HXCube,
            Carrier::Jboa => CarrierKind::Jboa,
        }
    }
}

fn init_tracing(config_filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match HwdbConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_filter());

    let database = cli
        .hwdb
        .or_else(|| config.database_path())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));
    tracing::debug!(path = %database.display(), "Using hardware database");

    let result = match cli.command {
        Command::Query {
            coordinate,
            property,
        } => commands::query(&database, &coordinate, &property),
        Command::Licenses {
            license_file,
            tres_file,
            stdout,
        } => {
            if stdout {
                commands::print_licenses(&database)
            } else {
                commands::write_licenses(
                    &database,
                    &license_file.unwrap_or_else(|| config.license_file()),
                    &tres_file.unwrap_or_else(|| config.tres_file()),
                )
            }
        }
        Command::Entries { node, query } => commands::entries(&database, &node, &query),
        Command::Branch(BranchCommand::Encode {
            carrier,
            carrier_id,
            chip_serial,
            fpga,
            legacy,
        }) => commands::branch_encode(
            &database,
            carrier.into(),
            carrier_id,
            chip_serial,
            fpga,
            legacy,
        ),
        Command::Branch(BranchCommand::Decode { identifier }) => {
            commands::branch_decode(&identifier);
            Ok(ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
