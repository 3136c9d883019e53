//! Command line wrapper around the region hint plugins.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use regionsrv_client::{azure, ec2, regionsrv};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "regionsrv-hint")]
#[command(about = "Print the region hint for the cloud guest registration client")]
#[command(version)]
struct Cli {
    /// Where the region hint comes from
    #[arg(long, value_enum, default_value_t = Provider::RegionServer)]
    provider: Provider,

    /// Configuration file for the region-server provider
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Provider {
    /// Probe the configured region servers for the lowest latency
    RegionServer,
    /// Ask the EC2 instance metadata service
    Ec2,
    /// Ask the Azure instance metadata service
    Azure,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let hint = match cli.provider {
        Provider::RegionServer => regionsrv::generate_region_srv_args_from(cli.config.as_deref())?,
        Provider::Ec2 => ec2::generate_region_srv_args()
            .context("could not determine a region hint from the EC2 metadata service")?,
        Provider::Azure => azure::generate_region_srv_args()
            .context("could not determine a region hint from the Azure metadata service")?,
    };
    println!("{hint}");
    Ok(())
}
