// Hands a destination to an external directions app
use anyhow::{Context, Result};
use std::process::Command;

use crate::position::Coordinate;

/// OpenStreetMap routing from wherever the browser is to the car
pub const DEFAULT_DIRECTIONS_URL: &str =
    "https://www.openstreetmap.org/directions?engine=fossgis_osrm_car&route=;{lat}%2C{lon}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMode {
    Driving,
}

impl TravelMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
        }
    }
}

/// Fire-and-forget: nothing is returned to the caller, failures are only logged.
pub trait NavigationLauncher {
    fn open_directions(&self, destination: Coordinate, mode: TravelMode);
}

/// Opens a directions URL in the system browser
pub struct BrowserLauncher {
    template: String,
}

impl BrowserLauncher {
    pub fn new(template: impl Into<String>) -> Self {
        Self { template: template.into() }
    }

    /// Fill `{lat}`, `{lon}` and `{mode}` in the template
    pub fn directions_url(&self, destination: Coordinate, mode: TravelMode) -> String {
        self.template
            .replace("{lat}", &format!("{:.6}", destination.latitude))
            .replace("{lon}", &format!("{:.6}", destination.longitude))
            .replace("{mode}", mode.as_str())
    }
}

impl Default for BrowserLauncher {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECTIONS_URL)
    }
}

impl NavigationLauncher for BrowserLauncher {
    fn open_directions(&self, destination: Coordinate, mode: TravelMode) {
        let url = self.directions_url(destination, mode);
        log::info!("Opening directions: {}", url);
        if let Err(e) = open_url(&url) {
            log::error!("Failed to open directions: {:#}", e);
        }
    }
}

fn open_url(url: &str) -> Result<()> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        // The empty argument is the window title for `start`
        c.args(["/C", "start", ""]);
        c
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(url);
    // Not waited on; the browser outlives us
    cmd.spawn().with_context(|| format!("Failed to spawn {:?}", cmd.get_program()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template() {
        let launcher = BrowserLauncher::default();
        let url = launcher.directions_url(Coordinate::new(37.5, -122.25), TravelMode::Driving);
        assert!(url.starts_with("https://www.openstreetmap.org/directions?"), "got {}", url);
        assert!(url.contains("engine=fossgis_osrm_car"), "got {}", url);
        assert!(url.ends_with("route=;37.500000%2C-122.250000"), "got {}", url);
    }

    #[test]
    fn test_custom_template_with_mode() {
        let launcher = BrowserLauncher::new(
            "https://www.google.com/maps/dir/?api=1&destination={lat},{lon}&travelmode={mode}",
        );
        let url = launcher.directions_url(Coordinate::new(40.0, -74.0), TravelMode::Driving);
        let expected = "destination=40.000000,-74.000000&travelmode=driving";
        assert!(url.ends_with(expected), "got {}", url);
    }
}
