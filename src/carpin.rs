use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::location::{LocationFeed, LocationSource};
use crate::position::{Coordinate, parse_coordinate};
use crate::store::{FileStore, MemoryStore, StateStore};

mod annotations;
mod config;
mod feedback;
mod gui;
mod location;
mod navigation;
mod position;
mod state;
mod store;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("APP_GIT_HASH"), ")");

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about = "Remembers where you parked.", long_about = None)]
struct Cli {
    /// Use a fixed device location instead of a receiver, e.g. --at 40.7128,-74.0060
    #[arg(long, value_name = "LAT,LON", value_parser = parse_at)]
    at: Option<Coordinate>,

    /// Read NMEA 0183 sentences from a serial device or file
    #[arg(long, value_name = "PATH", conflicts_with = "at")]
    nmea: Option<PathBuf>,

    /// Keep the saved spot and map style in this file
    #[arg(long, value_name = "FILE")]
    state_file: Option<PathBuf>,

    /// Use this config file instead of the default one
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Command line wins over the config file
    fn location_source(&self, config: &Config) -> LocationSource {
        if let Some(path) = &self.nmea {
            LocationSource::Nmea(path.clone())
        } else if let Some(c) = self.at {
            LocationSource::Fixed(c)
        } else {
            config.location.source()
        }
    }
}

fn parse_at(s: &str) -> Result<Coordinate, String> {
    parse_coordinate(s).ok_or_else(|| format!("'{}' is not a valid LAT,LON pair", s))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Cli::parse();

    let config_path = match &args.config {
        Some(p) => p.clone(),
        None => Config::default_path()?,
    };
    let config = Config::load_from(&config_path)?;

    let store: Box<dyn StateStore> = match &args.state_file {
        Some(p) => Box::new(FileStore::new(p.clone())),
        None => match FileStore::open_default() {
            Ok(store) => {
                log::info!("State file: {:?}", store.path());
                Box::new(store)
            }
            Err(e) => {
                log::warn!("{:#}; the parking spot will not survive a restart", e);
                Box::new(MemoryStore::new())
            }
        },
    };

    let source = args.location_source(&config);
    let location = LocationFeed::start(&source).context("Failed to start location feed")?;

    let app = gui::GuiApp::new(config, Some(config_path), store, location);
    app.run().map_err(|e| anyhow::anyhow!("GUI Error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_location_precedence() {
        let mut config = Config::default();
        config.location.fixed = Some([10.0, 20.0]);

        let args = Cli::parse_from(["carpin"]);
        let from_config = LocationSource::Fixed(Coordinate::new(10.0, 20.0));
        assert_eq!(args.location_source(&config), from_config);

        let args = Cli::parse_from(["carpin", "--at", "40.5,-74.25"]);
        let fixed = LocationSource::Fixed(Coordinate::new(40.5, -74.25));
        assert_eq!(args.location_source(&config), fixed);

        let args = Cli::parse_from(["carpin", "--nmea", "/dev/ttyUSB0"]);
        let nmea = LocationSource::Nmea(PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(args.location_source(&config), nmea);
    }

    #[test]
    fn test_cli_rejects_bad_coordinate() {
        assert!(Cli::try_parse_from(["carpin", "--at", "north"]).is_err());
        assert!(Cli::try_parse_from(["carpin", "--at", "91.0,0.0"]).is_err());
    }
}
