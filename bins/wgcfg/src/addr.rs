//! Interface address subcommands.

use clap::{Args, Subcommand};
use serde_json::json;
use std::net::IpAddr;
use wgbind::{Backend, Bridge, AF_INET, AF_INET6};

#[derive(Args)]
pub struct AddrArgs {
    #[command(subcommand)]
    command: AddrCommand,
}

#[derive(Subcommand)]
enum AddrCommand {
    /// Show addresses assigned to an interface
    Show {
        /// Interface name
        interface: String,
    },

    /// Assign an address to an interface
    Set {
        /// Interface name
        interface: String,

        /// Address to assign (bare IP, no prefix)
        address: IpAddr,
    },
}

/// Run an address subcommand.
pub fn run<B: Backend>(bridge: &Bridge<B>, args: AddrArgs) -> anyhow::Result<()> {
    match args.command {
        AddrCommand::Show { interface } => {
            let records = bridge.get_interface_address(&[json!(interface)])?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        AddrCommand::Set { interface, address } => {
            let family = if address.is_ipv4() { AF_INET } else { AF_INET6 };
            bridge.set_interface_address(&[
                json!(interface),
                json!({ "family": family, "ip": address.to_string() }),
            ])?;
        }
    }
    Ok(())
}
