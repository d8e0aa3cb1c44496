// Map panel using walkers: draws pins from a state snapshot and reports gestures
use crossbeam_channel::Sender;
use eframe::egui;
use std::time::{Duration, Instant};
use walkers::sources::{Attribution, TileSource};
use walkers::{HttpTiles, Map, MapMemory, Plugin, Position, Projector, TileId};

use crate::annotations::AnnotationId;
use crate::config::{GuiConfig, MapConfig};
use crate::position::Coordinate;
use crate::state::{AppState, InputIntent};
use crate::store::MapStyle;

const RECENTER_DURATION: Duration = Duration::from_millis(400);
// Used when nothing is known at launch
const DEFAULT_CENTER: Coordinate = Coordinate { latitude: 51.0, longitude: 17.0 };

/// Gesture reported by the map, consumed by the controller in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    LongPress(Coordinate),
    Tap(AnnotationId),
}

impl From<MapEvent> for InputIntent {
    fn from(event: MapEvent) -> Self {
        match event {
            MapEvent::LongPress(c) => InputIntent::LongPress(c),
            MapEvent::Tap(id) => InputIntent::Tap(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub id: AnnotationId,
    pub coordinate: Coordinate,
    pub selected: bool,
}

/// Everything the map needs to draw one frame
#[derive(Debug, Clone, PartialEq)]
pub struct MapSnapshot {
    pub pins: Vec<Pin>,
    pub style: MapStyle,
}

impl MapSnapshot {
    pub fn from_state(state: &AppState) -> Self {
        let selected = state.annotations.selected_id();
        let pins = state
            .annotations
            .iter()
            .map(|a| Pin { id: a.id, coordinate: a.coordinate, selected: selected == Some(a.id) })
            .collect();
        Self { pins, style: state.map_style }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinColors {
    pub fill: egui::Color32,
    pub glyph: egui::Color32,
    pub outline: egui::Color32,
}

/// Selected pins are blue and the rest red in every style. Over imagery the
/// glyph and outline go white so the pin stays readable.
pub fn pin_colors(selected: bool, style: MapStyle) -> PinColors {
    let fill = if selected {
        egui::Color32::from_rgb(0, 122, 255)
    } else {
        egui::Color32::from_rgb(230, 40, 40)
    };
    match style {
        MapStyle::Standard => PinColors {
            fill,
            glyph: egui::Color32::from_rgb(255, 235, 235),
            outline: egui::Color32::from_gray(60),
        },
        MapStyle::Satellite => {
            PinColors { fill, glyph: egui::Color32::WHITE, outline: egui::Color32::WHITE }
        }
    }
}

/// Closest pin head within `radius` of `click`
pub fn hit_test(
    heads: &[(AnnotationId, egui::Pos2)],
    click: egui::Pos2,
    radius: f32,
) -> Option<AnnotationId> {
    heads
        .iter()
        .map(|(id, head)| (*id, head.distance(click)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

pub fn to_position(c: Coordinate) -> Position {
    walkers::lat_lon(c.latitude, c.longitude)
}

pub fn to_coordinate(p: Position) -> Coordinate {
    Coordinate::new(p.y(), p.x())
}

/// Ease-out move of the map center between two coordinates
#[derive(Debug, Clone)]
pub struct RecenterAnimation {
    from: Coordinate,
    to: Coordinate,
    started: Instant,
}

impl RecenterAnimation {
    pub fn new(from: Coordinate, to: Coordinate, started: Instant) -> Self {
        Self { from, to, started }
    }

    /// Center at `now` and whether the animation has finished
    pub fn position_at(&self, now: Instant) -> (Coordinate, bool) {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed >= RECENTER_DURATION {
            return (self.to, true);
        }
        let t = elapsed.as_secs_f64() / RECENTER_DURATION.as_secs_f64();
        let eased = 1.0 - (1.0 - t).powi(3);

        // Go the short way round the antimeridian
        let dlon = (self.to.longitude - self.from.longitude + 540.0).rem_euclid(360.0) - 180.0;
        let mut lon = self.from.longitude + dlon * eased;
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon < -180.0 {
            lon += 360.0;
        }
        let lat = self.from.latitude + (self.to.latitude - self.from.latitude) * eased;
        (Coordinate::new(lat, lon), false)
    }
}

/// Tile source filled from a `{z}/{x}/{y}` URL template
pub struct TemplateTiles {
    url: String,
    attribution: &'static str,
    attribution_url: &'static str,
}

impl TemplateTiles {
    pub fn for_style(style: MapStyle, url: String) -> Self {
        let (attribution, attribution_url) = match style {
            MapStyle::Standard => {
                ("© OpenStreetMap contributors", "https://www.openstreetmap.org/copyright")
            }
            MapStyle::Satellite => ("Imagery © Esri", "https://www.esri.com/"),
        };
        Self { url, attribution, attribution_url }
    }
}

pub fn expand_tile_url(template: &str, zoom: u8, x: u32, y: u32) -> String {
    template
        .replace("{z}", &zoom.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
}

impl TileSource for TemplateTiles {
    fn tile_url(&self, tile_id: TileId) -> String {
        expand_tile_url(&self.url, tile_id.zoom, tile_id.x, tile_id.y)
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: self.attribution,
            url: self.attribution_url,
            logo_light: None,
            logo_dark: None,
        }
    }
}

/// Map state kept across frames
pub struct MapViewState {
    /// Map memory for walkers (stores zoom, center, etc.)
    pub map_memory: MapMemory,
    /// Tile providers, created on first use of each style
    standard_tiles: Option<HttpTiles>,
    satellite_tiles: Option<HttpTiles>,
    standard_url: String,
    satellite_url: String,
    animation: Option<RecenterAnimation>,
    /// Set once the map has been given its launch center
    centered: bool,
    zoom: f64,
    pin_radius: f32,
}

impl MapViewState {
    pub fn new(map_config: &MapConfig, gui_config: &GuiConfig) -> Self {
        let zoom = gui_config.default_zoom.unwrap_or(16.0);
        let mut map_memory = MapMemory::default();
        if let Err(e) = map_memory.set_zoom(zoom) {
            log::warn!("Failed to set default zoom level {}: {:?}", zoom, e);
        }
        Self {
            map_memory,
            standard_tiles: None,
            satellite_tiles: None,
            standard_url: map_config.standard_tiles_url.clone(),
            satellite_url: map_config.satellite_tiles_url.clone(),
            animation: None,
            centered: false,
            zoom,
            pin_radius: gui_config.pin_radius.unwrap_or(9.0),
        }
    }

    /// Initialize tiles for a style if not already done
    fn ensure_tiles(&mut self, ctx: &egui::Context, style: MapStyle) {
        let (slot, url) = match style {
            MapStyle::Standard => (&mut self.standard_tiles, &self.standard_url),
            MapStyle::Satellite => (&mut self.satellite_tiles, &self.satellite_url),
        };
        if slot.is_none() {
            log::debug!("Creating {} tile source: {}", style.label(), url);
            *slot = Some(HttpTiles::new(TemplateTiles::for_style(style, url.clone()), ctx.clone()));
        }
    }

    /// Apply a pending recenter and advance the animation. The map only
    /// moves when asked: the first frame jumps to the launch target (or the
    /// default center) and later targets are animated. Returns true while
    /// still moving.
    pub fn update_center(&mut self, recenter: Option<Coordinate>, now: Instant) -> bool {
        if !self.centered {
            self.centered = true;
            let start = recenter.unwrap_or(DEFAULT_CENTER);
            log::debug!("Initial map center {}", start);
            self.map_memory.center_at(to_position(start));
            return false;
        }
        if let Some(target) = recenter {
            self.start_recenter(target, now);
        }
        self.step_animation(now)
    }

    /// Start an animated move from the current center to `target`
    fn start_recenter(&mut self, target: Coordinate, now: Instant) {
        let from = self.map_memory.detached().map(to_coordinate).unwrap_or(DEFAULT_CENTER);
        self.animation = Some(RecenterAnimation::new(from, target, now));
        if let Err(e) = self.map_memory.set_zoom(self.zoom) {
            log::warn!("Failed to set zoom level {}: {:?}", self.zoom, e);
        }
    }

    /// Advance the recenter animation. Returns true while still moving.
    fn step_animation(&mut self, now: Instant) -> bool {
        let Some(anim) = &self.animation else {
            return false;
        };
        let (center, finished) = anim.position_at(now);
        self.map_memory.center_at(to_position(center));
        if finished {
            self.animation = None;
        }
        !finished
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    #[cfg(test)]
    fn center(&self) -> Option<Coordinate> {
        self.map_memory.detached().map(to_coordinate)
    }
}

/// Plugin for drawing pins and turning clicks into map events
pub struct PinsPlugin {
    pins: Vec<Pin>,
    style: MapStyle,
    radius: f32,
    device: Option<Coordinate>,
    pulse: Option<f32>,
    events: Sender<MapEvent>,
}

impl PinsPlugin {
    fn draw_pin(
        painter: &egui::Painter,
        tip: egui::Pos2,
        radius: f32,
        colors: PinColors,
    ) -> egui::Pos2 {
        let head = tip - egui::vec2(0.0, radius * 1.8);
        let stroke = egui::Stroke::new(1.5, colors.outline);

        let left = head + egui::vec2(-radius * 0.75, radius * 0.6);
        let right = head + egui::vec2(radius * 0.75, radius * 0.6);
        painter.add(egui::Shape::convex_polygon(vec![left, right, tip], colors.fill, stroke));
        painter.circle_filled(head, radius, colors.fill);
        painter.circle_stroke(head, radius, stroke);
        painter.circle_filled(head, radius * 0.4, colors.glyph);
        head
    }
}

impl Plugin for PinsPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let painter = ui.painter();
        let project = |c: Coordinate| {
            let v = projector.project(to_position(c));
            egui::pos2(v.x, v.y)
        };

        if let Some(device) = self.device {
            let pos = project(device);
            painter.circle_filled(pos, 6.0, egui::Color32::from_rgb(30, 144, 255));
            painter.circle_stroke(pos, 6.0, egui::Stroke::new(2.0, egui::Color32::WHITE));
        }

        // Selected pin drawn last so it sits on top
        let mut order: Vec<&Pin> = self.pins.iter().collect();
        order.sort_by_key(|p| p.selected);

        let mut heads = Vec::with_capacity(order.len());
        let mut selected_head = None;
        for pin in order {
            let radius = if pin.selected { self.radius * 1.2 } else { self.radius };
            let colors = pin_colors(pin.selected, self.style);
            let head = Self::draw_pin(painter, project(pin.coordinate), radius, colors);
            if pin.selected {
                selected_head = Some((head, radius));
            }
            heads.push((pin.id, head));
        }

        if let Some(intensity) = self.pulse {
            let color = egui::Color32::from_white_alpha((intensity * 200.0) as u8);
            match selected_head {
                Some((head, radius)) => {
                    let ring = radius * (1.4 + (1.0 - intensity) * 1.6);
                    painter.circle_stroke(head, ring, egui::Stroke::new(3.0, color));
                }
                None => {
                    painter.rect_stroke(
                        response.rect.shrink(2.0),
                        0.0,
                        egui::Stroke::new(4.0, color),
                        egui::StrokeKind::Inside,
                    );
                }
            }
        }

        let Some(pointer) = response.interact_pointer_pos() else {
            return;
        };
        if response.clicked() {
            if let Some(id) = hit_test(&heads, pointer, self.radius * 1.3) {
                let _ = self.events.send(MapEvent::Tap(id));
            }
        } else if response.secondary_clicked() || response.long_touched() {
            let position = projector.unproject(pointer - response.rect.center());
            let _ = self.events.send(MapEvent::LongPress(to_coordinate(position)));
        }
    }
}

/// Render the map panel for one frame
pub fn render_map(
    state: &mut MapViewState,
    ui: &mut egui::Ui,
    snapshot: MapSnapshot,
    recenter: Option<Coordinate>,
    device: Option<Coordinate>,
    pulse: Option<f32>,
    events: &Sender<MapEvent>,
) {
    state.ensure_tiles(ui.ctx(), snapshot.style);
    if state.update_center(recenter, Instant::now()) {
        ui.ctx().request_repaint();
    }

    let plugin = PinsPlugin {
        pins: snapshot.pins,
        style: snapshot.style,
        radius: state.pin_radius,
        device,
        pulse,
        events: events.clone(),
    };

    let tiles = match snapshot.style {
        MapStyle::Standard => &mut state.standard_tiles,
        MapStyle::Satellite => &mut state.satellite_tiles,
    };
    if let Some(tiles) = tiles {
        // The map is detached from the first frame on, so this is never followed
        let map = Map::new(Some(tiles), &mut state.map_memory, to_position(DEFAULT_CENTER))
            .with_plugin(plugin);
        ui.add(map);
    }
}
