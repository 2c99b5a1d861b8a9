//! Command line and environment configuration

use crate::routes::parse_coordinates;
use clap::{Args, Parser, Subcommand};
use sheed_cloud::{DEFAULT_DATASET, OPENTOPOGRAPHY_USGS_URL};
use sheed_pipeline::DEFAULT_EXPAND_FACTOR;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sheed")]
#[command(author, version, about = "Watershed delineation from OpenTopography DEMs", long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// OpenTopography API key
    #[arg(long, env = "OT_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the web service
    Serve(ServeArgs),
    /// Delineate one watershed and exit
    Delineate(DelineateArgs),
}

/// Where DEMs come from and where results go
#[derive(Args, Debug, Clone)]
pub struct ProviderArgs {
    /// Directory for cached DEMs and exported watersheds
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// DEM API endpoint
    #[arg(long, default_value = OPENTOPOGRAPHY_USGS_URL)]
    pub dem_url: String,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Directory holding index.html and its assets
    #[arg(long, default_value = "static")]
    pub static_dir: PathBuf,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DelineateArgs {
    /// Pour point as "lat,lon"
    #[arg(long, value_parser = coordinates_arg, allow_hyphen_values = true)]
    pub coordinates: (f64, f64),

    /// Watershed name; defaults to "{lat}_{lon}_{expand_factor}"
    #[arg(long, default_value = "")]
    pub name: String,

    /// Half-size of the DEM box in degrees
    #[arg(short, long, default_value_t = DEFAULT_EXPAND_FACTOR)]
    pub expand_factor: f64,

    /// DEM dataset
    #[arg(long, default_value = DEFAULT_DATASET)]
    pub dem: String,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

fn coordinates_arg(text: &str) -> Result<(f64, f64), String> {
    parse_coordinates(text).ok_or_else(|| format!("expected \"lat,lon\", got {text:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["sheed", "--api-key", "k", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.port, 8080);
        assert_eq!(args.static_dir, PathBuf::from("static"));
        assert_eq!(args.provider.output_dir, PathBuf::from("output"));
        assert_eq!(args.provider.dem_url, OPENTOPOGRAPHY_USGS_URL);
    }

    #[test]
    fn test_delineate_args() {
        let cli = Cli::try_parse_from([
            "sheed",
            "--api-key",
            "k",
            "delineate",
            "--coordinates",
            "-33.4,-70.6",
            "--name",
            "Maipo",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Command::Delineate(args) = cli.command else {
            panic!("expected delineate");
        };
        assert_eq!(args.coordinates, (-33.4, -70.6));
        assert_eq!(args.name, "Maipo");
        assert_eq!(args.expand_factor, DEFAULT_EXPAND_FACTOR);
        assert_eq!(args.dem, "USGS10m");
    }

    #[test]
    fn test_bad_coordinates_rejected() {
        let result = Cli::try_parse_from([
            "sheed", "--api-key", "k", "delineate", "--coordinates", "somewhere",
        ]);
        assert!(result.is_err());
    }
}
