//! wgcfg - WireGuard device configuration utility
//!
//! Reads and writes kernel WireGuard device configuration as JSON
//! records.

mod addr;
mod device;
mod keys;

use clap::{Parser, Subcommand};
use wgbind::{Bridge, LinuxBackend};

#[derive(Parser)]
#[command(name = "wgcfg")]
#[command(about = "WireGuard device configuration utility", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show a device's configuration as a JSON record
    Show {
        /// Interface name
        interface: String,
    },

    /// Apply a device configuration record from a JSON file ("-" for stdin)
    Apply {
        /// Path to the record
        file: String,
    },

    /// Create a new device
    Add {
        /// Interface name
        interface: String,
    },

    /// Delete a device
    Del {
        /// Interface name
        interface: String,
    },

    /// List WireGuard device names
    List,

    /// Generate a new private key
    Genkey,

    /// Derive public key from private key (reads from stdin)
    Pubkey,

    /// Generate a preshared key
    Genpsk,

    /// Show or assign interface addresses
    Addr(addr::AddrArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let bridge = Bridge::new(LinuxBackend::new());

    match cli.command {
        Command::Show { interface } => device::show(&bridge, &interface),
        Command::Apply { file } => device::apply(&bridge, &file),
        Command::Add { interface } => device::add(&bridge, &interface),
        Command::Del { interface } => device::del(&bridge, &interface),
        Command::List => device::list(&bridge),
        Command::Genkey => keys::genkey(&bridge),
        Command::Pubkey => keys::pubkey(&bridge),
        Command::Genpsk => keys::genpsk(&bridge),
        Command::Addr(args) => addr::run(&bridge, args),
    }
}
