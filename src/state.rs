use crate::annotations::{AnnotationId, AnnotationSet};
use crate::feedback::Feedback;
use crate::navigation::{NavigationLauncher, TravelMode};
use crate::position::{Coordinate, get_distance_bearing_string};
use crate::store::{MapStyle, StateStore};

#[derive(Debug, Clone, PartialEq)]
pub enum InputIntent {
    /// Remember the current device location as the parking spot
    Save,
    Reset,
    /// Driving directions to the selected pin
    RequestDirections,
    ToggleMapStyle,
    RecenterOnLocation,
    /// Long-press on the map at this coordinate
    LongPress(Coordinate),
    /// Tap on an existing pin
    Tap(AnnotationId),
    Quit,
}

// --- AppState ---

/// Canonical app state. Owns the pins and the selection and is the only
/// writer of the store; the map view renders from it and reports gestures
/// back as intents.
pub struct AppState {
    pub annotations: AnnotationSet,
    pub map_style: MapStyle,
    /// Pending viewport recenter, consumed by the map view
    pub center_target: Option<Coordinate>,
    /// Short note about the last action, cleared by the GUI after a timeout
    pub status_message: Option<String>,
    pub exit_requested: bool,

    store: Box<dyn StateStore>,
    navigator: Box<dyn NavigationLauncher>,
    feedback: Box<dyn Feedback>,
}

impl AppState {
    pub fn new(
        store: Box<dyn StateStore>,
        navigator: Box<dyn NavigationLauncher>,
        feedback: Box<dyn Feedback>,
    ) -> Self {
        Self {
            annotations: AnnotationSet::new(),
            map_style: MapStyle::default(),
            center_target: None,
            status_message: None,
            exit_requested: false,
            store,
            navigator,
            feedback,
        }
    }

    /// Build the state at app launch: restore the map style, center on the
    /// device if its location is known, and bring back the saved spot as a
    /// selected pin.
    pub fn launch(
        store: Box<dyn StateStore>,
        navigator: Box<dyn NavigationLauncher>,
        feedback: Box<dyn Feedback>,
        location: Option<Coordinate>,
    ) -> Self {
        let mut state = Self::new(store, navigator, feedback);
        state.map_style = state.store.load_map_style().unwrap_or_default();
        state.center_target = location;

        if let Some(saved) = state.store.load_location() {
            log::info!("Restored parking spot at {}", saved);
            state.annotations.add_selected(saved);
        }
        state
    }

    pub fn handle_input(&mut self, intent: InputIntent, location: Option<Coordinate>) {
        match intent {
            InputIntent::Save => self.save(location),
            InputIntent::Reset => self.reset(),
            InputIntent::RequestDirections => self.request_directions(),
            InputIntent::ToggleMapStyle => self.toggle_map_style(),
            InputIntent::RecenterOnLocation => self.recenter_on_location(location),
            InputIntent::LongPress(coordinate) => self.drop_pin(coordinate),
            InputIntent::Tap(id) => self.select_pin(id),
            InputIntent::Quit => self.exit_requested = true,
        }
    }

    fn save(&mut self, location: Option<Coordinate>) {
        let Some(location) = location else {
            log::debug!("Save ignored: no known location");
            return;
        };

        self.annotations.add_selected(location);
        self.center_target = Some(location);
        self.feedback.impact();
        if let Err(e) = self.store.save_location(location) {
            log::error!("Failed to persist parking spot: {:#}", e);
        }
        self.set_status(format!("Saved parking spot at {}", location));
    }

    fn reset(&mut self) {
        self.annotations.clear();
        self.feedback.impact();
        if let Err(e) = self.store.clear_location() {
            log::error!("Failed to clear parking spot: {:#}", e);
        }
        self.set_status("Cleared all pins".to_string());
    }

    fn request_directions(&mut self) {
        let Some(target) = self.annotations.selected().map(|a| a.coordinate) else {
            log::debug!("Directions ignored: no pin selected");
            return;
        };
        self.navigator.open_directions(target, TravelMode::Driving);
        self.feedback.impact();
        self.set_status(format!("Directions to {}", target));
    }

    fn toggle_map_style(&mut self) {
        self.map_style = self.map_style.next();
        if let Err(e) = self.store.save_map_style(self.map_style) {
            log::error!("Failed to persist map style: {:#}", e);
        }
        self.set_status(format!("{} map", self.map_style.label()));
    }

    fn recenter_on_location(&mut self, location: Option<Coordinate>) {
        match location {
            Some(c) => self.center_target = Some(c),
            None => log::debug!("Recenter ignored: no known location"),
        }
    }

    /// Long-press pins are not persisted; only Save writes the store.
    fn drop_pin(&mut self, coordinate: Coordinate) {
        self.annotations.add_selected(coordinate);
        self.feedback.impact();
        self.set_status(format!("Pin dropped at {}", coordinate));
    }

    fn select_pin(&mut self, id: AnnotationId) {
        if !self.annotations.select(id) {
            log::debug!("Tap on unknown pin {:?} ignored", id);
            return;
        }
        self.feedback.impact();
    }

    fn set_status(&mut self, msg: String) {
        self.status_message = Some(msg);
    }

    /// Take the pending recenter, if any. The map view calls this once per frame.
    pub fn take_center_target(&mut self) -> Option<Coordinate> {
        self.center_target.take()
    }

    /// "123 m @ 45° NE" from the device to the selected pin
    pub fn distance_to_selected(&self, location: Option<Coordinate>) -> Option<String> {
        let from = location?;
        let to = self.annotations.selected()?.coordinate;
        get_distance_bearing_string(from, to)
    }

    #[cfg(test)]
    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }
}
