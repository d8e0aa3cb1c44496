use crossbeam_channel::{Receiver, Sender, unbounded};
use eframe::egui;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::{Config, GuiConfig};
use crate::feedback::PulseFeedback;
use crate::location::LocationFeed;
use crate::navigation::BrowserLauncher;
use crate::state::{AppState, InputIntent};
use crate::store::StateStore;

mod map_view;

use map_view::{MapEvent, MapSnapshot, MapViewState, render_map};

pub const APP_TITLE: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

const STATUS_TIMEOUT: Duration = Duration::from_secs(3);
// Location feed is polled at least this often even without input
const LOCATION_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct GuiApp {
    state: AppState,
    location: LocationFeed,
    map: MapViewState,
    pulse: PulseFeedback,

    map_events_tx: Sender<MapEvent>,
    map_events_rx: Receiver<MapEvent>,

    gui_config: GuiConfig,
    config_path: Option<PathBuf>,
    initial_scale_applied: bool,
    status_set_time: Option<Instant>,
    // Track window size for saving on exit
    last_window_size: Option<(u32, u32)>,
    config_saved: bool,
}

impl GuiApp {
    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        store: Box<dyn StateStore>,
        mut location: LocationFeed,
    ) -> Self {
        // A fixed source has its fix queued already
        location.poll();

        let pulse = PulseFeedback::new();
        let navigator = BrowserLauncher::new(config.map.directions_url.clone());
        let state = AppState::launch(
            store,
            Box::new(navigator),
            Box::new(pulse.clone()),
            location.latest(),
        );
        let (map_events_tx, map_events_rx) = unbounded();

        Self {
            state,
            location,
            map: MapViewState::new(&config.map, &config.gui),
            pulse,
            map_events_tx,
            map_events_rx,
            gui_config: config.gui,
            config_path,
            initial_scale_applied: false,
            status_set_time: None,
            last_window_size: None,
            config_saved: false,
        }
    }

    pub fn run(self) -> Result<(), eframe::Error> {
        let width = self.gui_config.width.unwrap_or(480) as f32;
        let height = self.gui_config.height.unwrap_or(800) as f32;
        log::debug!("Setting window size to {}x{}", width, height);

        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([width, height])
                .with_title(format!("{} ({})", APP_TITLE, env!("APP_GIT_HASH"))),
            ..Default::default()
        };

        eframe::run_native("carpin", options, Box::new(move |_cc| Ok(Box::new(self))))
    }

    fn keyboard_intents(&self, ctx: &egui::Context) -> Vec<InputIntent> {
        let mut intents = Vec::new();
        if ctx.wants_keyboard_input() {
            return intents;
        }
        let bindings = [
            (egui::Key::S, InputIntent::Save),
            (egui::Key::R, InputIntent::Reset),
            (egui::Key::M, InputIntent::RequestDirections),
            (egui::Key::T, InputIntent::ToggleMapStyle),
            (egui::Key::C, InputIntent::RecenterOnLocation),
        ];
        ctx.input(|i| {
            for (key, intent) in bindings {
                if i.key_pressed(key) {
                    intents.push(intent);
                }
            }
            let quit_combo = i.modifiers.ctrl && i.key_pressed(egui::Key::Q);
            if i.key_pressed(egui::Key::Escape) || quit_combo {
                intents.push(InputIntent::Quit);
            }
        });
        intents
    }

    fn action_button(ui: &mut egui::Ui, label: &str, fill: egui::Color32) -> bool {
        let text = egui::RichText::new(label).size(24.0).color(egui::Color32::WHITE);
        ui.add(egui::Button::new(text).fill(fill).corner_radius(10.0)).clicked()
    }

    fn round_button(ui: &mut egui::Ui, glyph: &str, color: egui::Color32, hover: &str) -> bool {
        let text = egui::RichText::new(glyph).size(26.0).color(color);
        let button = egui::Button::new(text)
            .fill(egui::Color32::from_black_alpha(180))
            .corner_radius(24.0)
            .min_size(egui::vec2(48.0, 48.0));
        ui.add(button).on_hover_text(hover).clicked()
    }

    fn save_gui_config(&mut self) {
        if self.config_saved {
            return;
        }
        self.config_saved = true;

        let Some(path) = &self.config_path else {
            return;
        };
        let mut gui_config = self.gui_config.clone();
        if let Some((w, h)) = self.last_window_size {
            gui_config.width = Some(w);
            gui_config.height = Some(h);
            log::info!("Saving window size: {}x{}", w, h);
        }
        if let Err(e) = Config::save_gui_config(path, &gui_config) {
            log::error!("Error saving config: {:#}", e);
        }
    }
}

impl eframe::App for GuiApp {
    // Required by eframe 0.34; all drawing happens in `update`, which eframe still calls first
    fn ui(&mut self, _ui: &mut egui::Ui, _frame: &mut eframe::Frame) {}

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.initial_scale_applied {
            let user_scale = self.gui_config.font_scale.unwrap_or(1.0);
            ctx.set_pixels_per_point(ctx.pixels_per_point() * user_scale);
            self.initial_scale_applied = true;
        }

        let now = Instant::now();
        if let Some(set_time) = self.status_set_time
            && set_time.elapsed() > STATUS_TIMEOUT
        {
            self.state.status_message = None;
            self.status_set_time = None;
        }

        self.location.poll();
        let device = self.location.latest();

        let mut intents = self.keyboard_intents(ctx);

        egui::TopBottomPanel::bottom("actions").show(ctx, |ui| {
            ui.add_space(6.0);
            if let Some(msg) = &self.state.status_message {
                ui.colored_label(egui::Color32::GREEN, msg);
            } else if let Some(dist) = self.state.distance_to_selected(device) {
                ui.label(format!("Car: {}", dist));
            } else if device.is_none() {
                ui.weak("Waiting for location...");
            } else {
                ui.weak("[S]ave | [R]eset | [M]ap | [T] Style | [C]enter");
            }

            ui.horizontal(|ui| {
                if Self::action_button(ui, " Save ", egui::Color32::from_rgb(0, 122, 255)) {
                    intents.push(InputIntent::Save);
                }
                if Self::action_button(ui, " Reset ", egui::Color32::from_rgb(220, 53, 69)) {
                    intents.push(InputIntent::Reset);
                }
                if Self::action_button(ui, " Map ", egui::Color32::from_rgb(40, 167, 69)) {
                    intents.push(InputIntent::RequestDirections);
                }
            });
            ui.add_space(6.0);
        });

        egui::CentralPanel::default().frame(egui::Frame::NONE).show(ctx, |ui| {
            let snapshot = MapSnapshot::from_state(&self.state);
            let recenter = self.state.take_center_target();
            render_map(
                &mut self.map,
                ui,
                snapshot,
                recenter,
                device,
                self.pulse.intensity(now),
                &self.map_events_tx,
            );
        });

        egui::Area::new(egui::Id::new("map_controls"))
            .anchor(egui::Align2::RIGHT_TOP, [-12.0, 12.0])
            .show(ctx, |ui| {
                if Self::round_button(ui, "🌐", egui::Color32::WHITE, "Toggle map style") {
                    intents.push(InputIntent::ToggleMapStyle);
                }
                ui.add_space(6.0);
                let blue = egui::Color32::from_rgb(30, 144, 255);
                if Self::round_button(ui, "📍", blue, "Center on my location") {
                    intents.push(InputIntent::RecenterOnLocation);
                }
            });

        // Map gestures, in the order they happened
        while let Ok(event) = self.map_events_rx.try_recv() {
            intents.push(event.into());
        }

        let handled_any = !intents.is_empty();
        for intent in intents {
            self.state.handle_input(intent, device);
        }
        if handled_any {
            if self.state.status_message.is_some() {
                self.status_set_time = Some(now);
            }
            ctx.request_repaint();
        }

        if let Some(rect) = ctx.input(|i| i.viewport().inner_rect) {
            let size = (rect.width().round() as u32, rect.height().round() as u32);
            if size.0 > 100 && size.1 > 100 {
                self.last_window_size = Some(size);
            }
        }

        if self.state.exit_requested {
            self.save_gui_config();
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        } else if ctx.input(|i| i.viewport().close_requested()) {
            self.save_gui_config();
        }

        if self.map.is_animating() || self.pulse.intensity(now).is_some() {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(LOCATION_POLL_INTERVAL);
        }
    }
}
