//! IoTCC record inspector
//!
//! Reads the files the connector keeps on the gateway: the summary record,
//! per-entity cache records and discovery records.
//!
//! Usage:
//!   iotcc summary
//!   iotcc --config /etc/iotcc/dcc.json entity <uuid>
//!   iotcc discovery --dir /tmp/devices <uuid>
//!   iotcc reset --file /tmp/iotcc.json

use anyhow::Result;
use clap::{Parser, Subcommand};
use iotcc_cli::{
    load_config, reset_summary, show_discovery, show_entity, show_summary, Overrides,
};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "iotcc")]
#[command(about = "Inspect and reset IoTCC connector records")]
struct Args {
    /// Connector config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the summary record
    Summary {
        /// Summary file (iotcc.json)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print an entity's cache record
    Entity {
        /// Cache record directory
        #[arg(long)]
        dir: Option<PathBuf>,
        uuid: String,
    },
    /// Print an entity's discovery record
    Discovery {
        /// Discovery record directory
        #[arg(long)]
        dir: Option<PathBuf>,
        uuid: String,
    },
    /// Rewrite the summary record as an empty template
    Reset {
        /// Summary file (iotcc.json)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let store = load_config(args.config.as_deref())?.store_config();

    match args.command {
        Command::Summary { file } => {
            let overrides = Overrides { summary_file: file, ..Default::default() };
            println!("{}", show_summary(overrides.apply(store))?);
        }
        Command::Entity { dir, uuid } => {
            let overrides = Overrides { entity_dir: dir, ..Default::default() };
            println!("{}", show_entity(overrides.apply(store), &uuid)?);
        }
        Command::Discovery { dir, uuid } => {
            let overrides = Overrides { device_dir: dir, ..Default::default() };
            println!("{}", show_discovery(overrides.apply(store), &uuid)?);
        }
        Command::Reset { file } => {
            let overrides = Overrides { summary_file: file, ..Default::default() };
            reset_summary(overrides.apply(store))?;
        }
    }

    Ok(())
}
