use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::location::LocationSource;
use crate::navigation::DEFAULT_DIRECTIONS_URL;
use crate::position::Coordinate;

const CONFIG_FILE_NAME: &str = "carpin.conf";
const STANDARD_TILES_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
const SATELLITE_TILES_URL: &str = concat!(
    "https://server.arcgisonline.com/ArcGIS/rest/services/",
    "World_Imagery/MapServer/tile/{z}/{y}/{x}"
);

// --- GUI Config ---
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GuiConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub font_scale: Option<f32>,
    /// Zoom used when the map recenters on a pin or the device
    pub default_zoom: Option<f64>,
    pub pin_radius: Option<f32>,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            width: Some(480),
            height: Some(800),
            font_scale: Some(1.0),
            // Roughly a 0.01 degree span on a phone-sized window
            default_zoom: Some(16.0),
            pin_radius: Some(9.0),
        }
    }
}

// --- Map Config ---
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub standard_tiles_url: String,
    pub satellite_tiles_url: String,
    /// `{lat}`, `{lon}` and `{mode}` are filled in
    pub directions_url: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            standard_tiles_url: STANDARD_TILES_URL.to_string(),
            satellite_tiles_url: SATELLITE_TILES_URL.to_string(),
            directions_url: DEFAULT_DIRECTIONS_URL.to_string(),
        }
    }
}

// --- Location Config ---
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LocationConfig {
    /// [lat, lon]
    pub fixed: Option<[f64; 2]>,
    /// NMEA device or file, takes precedence over `fixed`
    pub nmea_path: Option<PathBuf>,
}

impl LocationConfig {
    pub fn source(&self) -> LocationSource {
        if let Some(path) = &self.nmea_path {
            LocationSource::Nmea(path.clone())
        } else if let Some([lat, lon]) = self.fixed {
            LocationSource::Fixed(Coordinate::new(lat, lon))
        } else {
            LocationSource::None
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub gui: GuiConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub location: LocationConfig,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("No config dir found")?;
        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Read the config, creating it with defaults if missing. Sections
    /// missing from an existing file are written back with their defaults.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read {:?}", config_path))?;
            log::debug!("Loading config from {:?}", config_path);
            let cfg: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config {:?}", config_path))?;

            let raw_value: toml::Value =
                toml::from_str(&content).unwrap_or(toml::Value::Integer(0));
            let missing: Vec<&str> = ["gui", "map", "location"]
                .into_iter()
                .filter(|section| raw_value.get(section).is_none())
                .collect();

            if !missing.is_empty() {
                log::debug!("Writing back default config sections: {:?}", missing);
                let toml_str = toml::to_string_pretty(&cfg)?;
                fs::write(config_path, toml_str)?;
            }
            Ok(cfg)
        } else {
            log::info!("Config file does not exist, creating new one at {:?}", config_path);
            let cfg = Config::default();
            let toml_str = toml::to_string_pretty(&cfg)?;
            fs::write(config_path, toml_str)?;
            Ok(cfg)
        }
    }

    /// Save updated gui config (e.g., window size) back to the config file
    pub fn save_gui_config(config_path: &Path, gui_config: &GuiConfig) -> Result<()> {
        if !config_path.exists() {
            log::warn!("Config file does not exist at {:?}", config_path);
            return Ok(());
        }
        let content = fs::read_to_string(config_path)?;
        let mut cfg: Config = toml::from_str(&content)?;
        cfg.gui = gui_config.clone();

        let toml_str = toml::to_string_pretty(&cfg)?;
        fs::write(config_path, toml_str)?;
        log::debug!("Saved gui config: {:?}", gui_config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join(CONFIG_FILE_NAME);
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let again = Config::load_from(&path).unwrap();
        assert_eq!(again, cfg);
    }

    #[test]
    fn test_writes_back_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[location]\nfixed = [40.0, -74.0]\n").unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.location.source(), LocationSource::Fixed(Coordinate::new(40.0, -74.0)));
        assert_eq!(cfg.gui, GuiConfig::default());

        let content = fs::read_to_string(&path).unwrap();
        let raw: toml::Value = toml::from_str(&content).unwrap();
        assert!(raw.get("gui").is_some());
        assert!(raw.get("map").is_some());
    }

    #[test]
    fn test_nmea_wins_over_fixed() {
        let loc = LocationConfig {
            fixed: Some([1.0, 2.0]),
            nmea_path: Some(PathBuf::from("/dev/ttyACM0")),
        };
        assert_eq!(loc.source(), LocationSource::Nmea(PathBuf::from("/dev/ttyACM0")));
        assert_eq!(LocationConfig::default().source(), LocationSource::None);
    }

    #[test]
    fn test_save_gui_config_keeps_other_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[location]\nfixed = [1.5, 2.5]\n").unwrap();
        Config::load_from(&path).unwrap();

        let gui = GuiConfig { width: Some(1024), height: Some(768), ..GuiConfig::default() };
        Config::save_gui_config(&path, &gui).unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.gui.width, Some(1024));
        assert_eq!(cfg.location.fixed, Some([1.5, 2.5]));
    }
}
