use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::position::Coordinate;

const STATE_DIR_NAME: &str = "carpin";
const STATE_FILE_NAME: &str = "carpin_state.toml";

/// Map rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapStyle {
    #[default]
    Standard,
    Satellite,
}

impl MapStyle {
    /// Get the other style
    pub fn next(self) -> Self {
        match self {
            MapStyle::Standard => MapStyle::Satellite,
            MapStyle::Satellite => MapStyle::Standard,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MapStyle::Standard => "Standard",
            MapStyle::Satellite => "Satellite",
        }
    }
}

impl From<i64> for MapStyle {
    fn from(code: i64) -> Self {
        match code {
            1 => MapStyle::Satellite,
            _ => MapStyle::Standard,
        }
    }
}

impl From<MapStyle> for i64 {
    fn from(style: MapStyle) -> Self {
        match style {
            MapStyle::Standard => 0,
            MapStyle::Satellite => 1,
        }
    }
}

/// Durable slot for the parked coordinate and the map style preference.
///
/// Writes replace the previous value and are complete when the call returns.
/// Clearing a missing value is not an error.
pub trait StateStore {
    fn save_location(&mut self, coordinate: Coordinate) -> Result<()>;
    fn load_location(&self) -> Option<Coordinate>;
    fn clear_location(&mut self) -> Result<()>;
    fn save_map_style(&mut self, style: MapStyle) -> Result<()>;
    fn load_map_style(&self) -> Option<MapStyle>;
}

// On-disk layout. Plain values must come before tables for TOML.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
struct StoredState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    map_type: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_location: Option<Coordinate>,
}

/// Flat TOML file, re-read on every load and replaced on every write
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store under the user's data directory
    pub fn open_default() -> Result<Self> {
        let data_dir = dirs::data_dir().context("No data dir found")?;
        Ok(Self::new(data_dir.join(STATE_DIR_NAME).join(STATE_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unparsable files read as empty. Any other I/O error is
    /// returned, so a write never replaces a file it could not read.
    fn read(&self) -> Result<StoredState> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoredState::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read state file {:?}", self.path));
            }
        };
        match toml::from_str(&content) {
            Ok(state) => Ok(state),
            Err(e) => {
                log::warn!("Ignoring unparsable state file {:?}: {}", self.path, e);
                Ok(StoredState::default())
            }
        }
    }

    fn read_or_default(&self) -> StoredState {
        self.read().unwrap_or_else(|e| {
            log::warn!("{:#}", e);
            StoredState::default()
        })
    }

    fn write(&self, state: &StoredState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state dir {:?}", parent))?;
        }
        let toml_str = toml::to_string_pretty(state)?;

        // Write next to the target and rename so a crash never leaves half a file
        let tmp_path = self.path.with_extension("toml.tmp");
        fs::write(&tmp_path, toml_str)
            .with_context(|| format!("Failed to write state file {:?}", tmp_path))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace state file {:?}", self.path))?;
        log::debug!("State written to {:?}: {:?}", self.path, state);
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut StoredState),
    {
        let mut state = self.read()?;
        f(&mut state);
        self.write(&state)
    }
}

impl StateStore for FileStore {
    fn save_location(&mut self, coordinate: Coordinate) -> Result<()> {
        self.update(|s| s.saved_location = Some(coordinate))
    }

    fn load_location(&self) -> Option<Coordinate> {
        self.read_or_default().saved_location
    }

    fn clear_location(&mut self) -> Result<()> {
        let mut state = self.read()?;
        if state.saved_location.take().is_none() {
            return Ok(());
        }
        self.write(&state)
    }

    fn save_map_style(&mut self, style: MapStyle) -> Result<()> {
        self.update(|s| s.map_type = Some(style.into()))
    }

    fn load_map_style(&self) -> Option<MapStyle> {
        self.read_or_default().map_type.map(MapStyle::from)
    }
}

/// In-process store with the same contract, nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: StoredState,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn save_location(&mut self, coordinate: Coordinate) -> Result<()> {
        self.state.saved_location = Some(coordinate);
        Ok(())
    }

    fn load_location(&self) -> Option<Coordinate> {
        self.state.saved_location
    }

    fn clear_location(&mut self) -> Result<()> {
        self.state.saved_location = None;
        Ok(())
    }

    fn save_map_style(&mut self, style: MapStyle) -> Result<()> {
        self.state.map_type = Some(style.into());
        Ok(())
    }

    fn load_map_style(&self) -> Option<MapStyle> {
        self.state.map_type.map(MapStyle::from)
    }
}
