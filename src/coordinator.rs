// ============================================================================
// DRAWING COORDINATOR - pointer input -> tools -> layer pixels
// ============================================================================
//
// Single-threaded.  Every pointer event is handled to completion before the
// next; the only deferred work is the redraw throttle and the scheduler,
// both advanced by `tick`.

use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use egui::{Pos2, Rect, Vec2, pos2};
use image::{Rgba, RgbaImage};
use uuid::Uuid;

use crate::canvas::{BlendMode, LayerStack, TRANSPARENT, blend_image_onto, copy_region};
use crate::components::brush::{BrushEngine, BrushKind, BrushSettings};
use crate::components::colors::RecentColors;
use crate::components::grid::Grid;
use crate::components::history::UndoManager;
use crate::components::selection::{SelectionClip, SelectionEngine};
use crate::components::tools::{self, Gradient, GradientStop, GradientStyle, ToolKind};
use crate::config::EditorConfig;
use crate::events::{CoordinatorEvent, EventHub, Observer, StatusKind};
use crate::io::{self, CoreError};
use crate::ops::PlacedRaster;
use crate::ops::effects::LayerEffects;
use crate::ops::shapes::{ShapeKind, rasterize_outline};
use crate::ops::text::{TextStyle, load_font, rasterize_text};
use crate::ops::transform::draw_transformed;
use crate::scheduler::{RedrawThrottle, Scheduler};
use crate::viewport::Viewport;

/// Outline width for the line / rectangle / circle tools.
const SHAPE_STROKE_WIDTH: f32 = 2.0;
/// Text drags smaller than this open the default-sized text area instead.
const MIN_TEXT_AREA: (f32, f32) = (50.0, 30.0);
const DEFAULT_TEXT_AREA: (f32, f32) = (300.0, 150.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    /// Held space turns any drag into a pan.
    pub space: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScheduledTask {
    HideSizeIndicator,
}

/// What the current press is doing.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Gesture {
    Idle,
    Panning { last_screen: Pos2 },
    Selecting,
    TextArea { start: Pos2, end: Pos2 },
    Stroke { last: Pos2, moved: bool, secondary: bool },
    /// Line / rectangle / circle / gradient: committed on release.
    Drag { start: Pos2, end: Pos2, secondary: bool },
}

pub struct DrawingCoordinator {
    config: EditorConfig,
    layers: LayerStack,
    viewport: Viewport,
    history: UndoManager,
    selection: SelectionEngine,
    brush: BrushSettings,
    engine: BrushEngine,
    tool: ToolKind,
    gradient_style: GradientStyle,
    gradient_stops: Vec<GradientStop>,
    recent_colors: RecentColors,
    grid: Grid,
    events: EventHub,
    redraw: RedrawThrottle,
    scheduler: Scheduler<ScheduledTask>,
    gesture: Gesture,
}

impl DrawingCoordinator {
    pub fn new(width: u32, height: u32, config: EditorConfig) -> Self {
        let (width, height) = config.clamp_canvas(width, height);
        let layers = LayerStack::new(width, height);
        let mut history = UndoManager::new(config.max_undo_steps);
        let background = layers.active();
        history.save_layer_state(background.id, &background.pixels, "New Canvas");
        log_info!(
            "Canvas initialized: {}x{}, undo depth {}",
            width,
            height,
            history.max_steps()
        );

        Self {
            viewport: Viewport::from_config(&config),
            selection: SelectionEngine::new(config.min_selection_size, config.handle_hit_radius),
            engine: BrushEngine::from_config(&config),
            recent_colors: RecentColors::new(config.recent_colors_capacity),
            grid: Grid::new(config.grid_size),
            redraw: RedrawThrottle::new(Duration::from_millis(config.redraw_interval_ms)),
            layers,
            history,
            brush: BrushSettings::default(),
            tool: ToolKind::Brush,
            gradient_style: GradientStyle::Linear,
            gradient_stops: Vec::new(),
            events: EventHub::default(),
            scheduler: Scheduler::default(),
            gesture: Gesture::Idle,
            config,
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn history(&self) -> &UndoManager {
        &self.history
    }

    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    pub fn brush(&self) -> &BrushSettings {
        &self.brush
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn recent_colors(&self) -> &RecentColors {
        &self.recent_colors
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn gradient_style(&self) -> GradientStyle {
        self.gradient_style
    }

    /// Pixels of the active layer, e.g. for saving.
    pub fn active_layer_surface(&self) -> &RgbaImage {
        &self.layers.active().pixels
    }

    /// Flattened canvas for display or export.
    pub fn composite(&self) -> RgbaImage {
        self.layers.composite()
    }

    /// In-progress drag for a dashed preview: tool plus the two anchors.
    pub fn preview(&self) -> Option<(ToolKind, Pos2, Pos2)> {
        match self.gesture {
            Gesture::Drag { start, end, .. } => Some((self.tool, start, end)),
            Gesture::TextArea { start, end } => Some((ToolKind::Text, start, end)),
            _ => None,
        }
    }

    // ========================================================================
    // NOTIFICATIONS & REDRAW
    // ========================================================================

    pub fn subscribe(&mut self, observer: Observer) {
        self.events.subscribe(observer);
    }

    pub fn event_channel(&mut self) -> mpsc::Receiver<CoordinatorEvent> {
        self.events.channel()
    }

    pub fn needs_redraw(&self) -> bool {
        self.redraw.needs_redraw()
    }

    /// Clear the dirty flag; `true` when a repaint was due.
    pub fn take_redraw(&mut self) -> bool {
        self.redraw.take()
    }

    /// Advance timers: flushes throttled redraws and fires due tasks.
    pub fn tick(&mut self, now: Instant) {
        self.redraw.tick(now);
        for task in self.scheduler.run_due(now) {
            match task {
                ScheduledTask::HideSizeIndicator => self.events.emit(CoordinatorEvent::BrushSizeIndicator {
                    size: self.brush.size,
                    visible: false,
                }),
            }
        }
    }

    fn status(&mut self, kind: StatusKind) {
        self.events.emit(CoordinatorEvent::Status(kind));
    }

    fn content_changed(&mut self) {
        self.redraw.invalidate();
    }

    fn emit_selection(&mut self) {
        self.events.emit(CoordinatorEvent::SelectionChanged(self.selection.bounds()));
        self.redraw.invalidate();
    }

    fn emit_layers(&mut self, prev_active: usize) {
        self.events.emit(CoordinatorEvent::LayersChanged(self.layers.layer_infos()));
        let active = self.layers.active_index();
        if active != prev_active {
            self.events.emit(CoordinatorEvent::ActiveLayerChanged(active));
        }
        self.redraw.invalidate();
    }

    fn viewport_changed(&mut self, changed: bool) -> bool {
        if changed {
            self.events.emit(CoordinatorEvent::ViewportChanged {
                zoom: self.viewport.zoom(),
                offset: self.viewport.offset(),
            });
            self.redraw.request(Instant::now());
        }
        changed
    }

    fn show_size_indicator(&mut self) {
        self.events.emit(CoordinatorEvent::BrushSizeIndicator { size: self.brush.size, visible: true });
        let hide_at = Instant::now() + Duration::from_millis(self.config.size_indicator_ms);
        self.scheduler.reschedule(hide_at, ScheduledTask::HideSizeIndicator);
    }

    // ========================================================================
    // SHARED HELPERS
    // ========================================================================

    /// Status + `true` when the active layer refuses pixel edits.
    fn reject_locked(&mut self) -> bool {
        if !self.layers.active().locked {
            return false;
        }
        log_warn!("Edit rejected: layer '{}' is locked", self.layers.active().name);
        self.status(StatusKind::LayerLocked);
        true
    }

    fn save_active_state(&mut self, label: &str) {
        let layer = self.layers.active();
        self.history.save_layer_state(layer.id, &layer.pixels, label);
    }

    /// Push the engine's pre-capture surface, if it just lifted pixels.
    fn record_selection_edit(&mut self) {
        if let Some(before) = self.selection.take_pre_edit() {
            let id = self.layers.active().id;
            self.history.save_layer_state(id, &before, "Transform Selection");
        }
    }

    /// Blit floating content back before the active layer changes identity.
    fn commit_floating(&mut self) {
        if self.selection.is_floating() {
            self.selection.apply(&mut self.layers.active_mut().pixels);
            self.redraw.invalidate();
        }
    }

    fn paint_color(&self, secondary: bool) -> Rgba<u8> {
        if secondary { self.brush.secondary } else { self.brush.primary }
    }

    fn pixel_at(&self, p: Pos2) -> Option<(u32, u32)> {
        if p.x < 0.0 || p.y < 0.0 {
            return None;
        }
        let (x, y) = (p.x.floor() as u32, p.y.floor() as u32);
        (x < self.layers.width() && y < self.layers.height()).then_some((x, y))
    }

    /// Screen -> canvas, snapped to the grid when enabled.  Publishes the readout.
    fn canvas_point(&mut self, screen: Pos2) -> Pos2 {
        let p = self.grid.snap(self.viewport.screen_to_canvas(screen));
        self.events.emit(CoordinatorEvent::Coordinates {
            x: p.x,
            y: p.y,
            zoom: self.viewport.zoom(),
            snapped: self.grid.snap,
        });
        p
    }

    fn layer_index_for(&self, id: Option<Uuid>) -> usize {
        id.and_then(|id| self.layers.layers().iter().position(|l| l.id == id))
            .unwrap_or(self.layers.active_index())
    }

    // ========================================================================
    // POINTER INPUT
    // ========================================================================

    pub fn pointer_down(&mut self, screen: Pos2, button: PointerButton, mods: Modifiers) {
        if mods.space {
            self.gesture = Gesture::Panning { last_screen: screen };
            return;
        }
        let p = self.canvas_point(screen);
        let secondary = button == PointerButton::Secondary;

        if mods.alt {
            self.pick_color_at(p);
            return;
        }

        match self.tool {
            ToolKind::RectSelect | ToolKind::EllipseSelect | ToolKind::Lasso | ToolKind::SelectionMove => {
                self.selection_down(p, secondary)
            }
            ToolKind::MagicWand => self.magic_wand_at(p, mods.shift),
            ToolKind::Eyedropper => self.pick_color_at(p),
            ToolKind::Text => self.gesture = Gesture::TextArea { start: p, end: p },
            ToolKind::Fill => self.fill_at(p, secondary),
            ToolKind::Brush | ToolKind::Eraser => {
                if self.reject_locked() {
                    return;
                }
                let label = if self.tool == ToolKind::Eraser { "Erase" } else { "Brush Stroke" };
                self.save_active_state(label);
                self.engine.begin_stroke(&self.layers.active().pixels);
                self.gesture = Gesture::Stroke { last: p, moved: false, secondary };
            }
            ToolKind::Line | ToolKind::Rectangle | ToolKind::Circle | ToolKind::Gradient => {
                if self.reject_locked() {
                    return;
                }
                self.gesture = Gesture::Drag { start: p, end: p, secondary };
            }
        }
    }

    pub fn pointer_move(&mut self, screen: Pos2) {
        if let Gesture::Panning { last_screen } = self.gesture {
            self.gesture = Gesture::Panning { last_screen: screen };
            self.pan(screen - last_screen);
            return;
        }
        let p = self.canvas_point(screen);

        match self.gesture {
            Gesture::Idle | Gesture::Panning { .. } => {}
            Gesture::Selecting => {
                let changed = self.selection.pointer_move(p, &mut self.layers.active_mut().pixels);
                self.record_selection_edit();
                if changed {
                    self.redraw.invalidate();
                }
            }
            Gesture::TextArea { start, .. } => {
                self.gesture = Gesture::TextArea { start, end: p };
                self.redraw.invalidate();
            }
            Gesture::Stroke { last, secondary, .. } => {
                let color = self.paint_color(secondary);
                let eraser = self.tool == ToolKind::Eraser;
                let clip = self.selection.clip();
                self.engine.stroke_segment(
                    &mut self.layers.active_mut().pixels,
                    last,
                    p,
                    &self.brush,
                    color,
                    eraser,
                    clip.as_ref(),
                );
                self.gesture = Gesture::Stroke { last: p, moved: true, secondary };
                self.redraw.invalidate();
            }
            Gesture::Drag { start, secondary, .. } => {
                self.gesture = Gesture::Drag { start, end: p, secondary };
                self.redraw.invalidate();
            }
        }
    }

    pub fn pointer_up(&mut self, screen: Pos2) {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        if matches!(gesture, Gesture::Idle | Gesture::Panning { .. }) {
            return;
        }
        let p = self.canvas_point(screen);

        match gesture {
            Gesture::Idle | Gesture::Panning { .. } => {}
            Gesture::Selecting => {
                self.selection.pointer_up(p);
                self.emit_selection();
            }
            Gesture::TextArea { start, .. } => {
                let area = Rect::from_two_pos(start, p);
                let (width, height) = if area.width() < MIN_TEXT_AREA.0 || area.height() < MIN_TEXT_AREA.1 {
                    DEFAULT_TEXT_AREA
                } else {
                    (area.width(), area.height())
                };
                self.events.emit(CoordinatorEvent::TextAreaRequested { origin: area.min, width, height });
                self.redraw.invalidate();
            }
            Gesture::Stroke { moved, secondary, .. } => {
                if !moved {
                    let color = self.paint_color(secondary);
                    let eraser = self.tool == ToolKind::Eraser;
                    let clip = self.selection.clip();
                    self.engine.dab(&mut self.layers.active_mut().pixels, p, &self.brush, color, eraser, clip.as_ref());
                }
                self.engine.end_stroke();
                self.content_changed();
            }
            Gesture::Drag { start, secondary, .. } => self.commit_drag(start, p, secondary),
        }
    }

    fn selection_down(&mut self, p: Pos2, secondary: bool) {
        let Some(kind) = self.tool.selection_kind() else { return };
        let zoom = self.viewport.zoom();
        let on_selection = self.selection.handle_at(p, zoom).is_some()
            || self.selection.bounds().is_some_and(|b| SelectionClip::Rect(b).contains(p));

        // Marking a region is fine on a locked layer; moving, resizing or
        // rotating would lift its pixels.
        if on_selection && self.reject_locked() {
            return;
        }
        if !on_selection {
            if self.tool == ToolKind::SelectionMove {
                return;
            }
            self.selection.set_kind(kind);
        }
        let changed = self.selection.pointer_down(p, secondary, zoom, &mut self.layers.active_mut().pixels);
        self.record_selection_edit();
        self.gesture = Gesture::Selecting;
        if changed {
            self.emit_selection();
        }
    }

    fn magic_wand_at(&mut self, p: Pos2, additive: bool) {
        let Some((x, y)) = self.pixel_at(p) else {
            self.status(StatusKind::OutOfBounds);
            return;
        };
        let tolerance = self.config.magic_wand_tolerance;
        let Some(found) = tools::magic_wand(&self.layers.active().pixels, x, y, tolerance) else { return };
        let rect = match (additive, self.selection.bounds()) {
            (true, Some(existing)) => existing.union(found),
            _ => found,
        };
        self.selection.set_selection(rect, &mut self.layers.active_mut().pixels);
        self.emit_selection();
    }

    fn pick_color_at(&mut self, p: Pos2) {
        match tools::pick_color(&self.layers.active().pixels, p) {
            None => self.status(StatusKind::OutOfBounds),
            Some(color) => {
                self.brush.primary = color;
                self.recent_colors.push(color);
                self.status(StatusKind::ColorPicked { r: color[0], g: color[1], b: color[2] });
                self.set_tool(ToolKind::Brush);
            }
        }
    }

    fn fill_at(&mut self, p: Pos2, secondary: bool) {
        if self.reject_locked() {
            return;
        }
        let Some((x, y)) = self.pixel_at(p) else {
            self.status(StatusKind::OutOfBounds);
            return;
        };
        let color = self.paint_color(secondary);
        if *self.layers.active().pixels.get_pixel(x, y) == color {
            return;
        }
        self.save_active_state("Fill");
        tools::flood_fill(&mut self.layers.active_mut().pixels, x, y, color);
        self.content_changed();
    }

    fn commit_drag(&mut self, start: Pos2, end: Pos2, secondary: bool) {
        let color = self.paint_color(secondary);
        let clip = self.selection.clip();
        let (w, h) = (self.layers.width(), self.layers.height());

        let shape = match self.tool {
            ToolKind::Line => Some(ShapeKind::Line),
            ToolKind::Rectangle => Some(ShapeKind::Rectangle),
            ToolKind::Circle => Some(ShapeKind::Ellipse),
            _ => None,
        };

        if let Some(kind) = shape {
            let Some(raster) = rasterize_outline(kind, start, end, SHAPE_STROKE_WIDTH, color, w, h) else {
                return;
            };
            self.save_active_state(self.tool.name());
            composite_placed(&mut self.layers.active_mut().pixels, &raster, clip.as_ref());
        } else if self.tool == ToolKind::Gradient {
            if start.distance(end) < 1.0 {
                return;
            }
            let gradient = Gradient::new(
                self.gradient_style,
                self.gradient_stops.clone(),
                self.brush.primary,
                self.brush.secondary,
            );
            self.save_active_state("Gradient");
            gradient.render(&mut self.layers.active_mut().pixels, start, end, clip.as_ref());
        } else {
            return;
        }
        self.content_changed();
    }

    // ========================================================================
    // TOOLS & PAINT SETTINGS
    // ========================================================================

    pub fn set_tool(&mut self, tool: ToolKind) {
        if tool == self.tool {
            return;
        }
        // An unfinished press never carries over to the next tool.
        if matches!(self.gesture, Gesture::Stroke { .. }) {
            self.engine.end_stroke();
        }
        self.gesture = Gesture::Idle;
        self.tool = tool;
        self.events.emit(CoordinatorEvent::ToolChanged(tool));
    }

    pub fn set_primary_color(&mut self, color: Rgba<u8>) {
        self.brush.primary = color;
    }

    pub fn set_secondary_color(&mut self, color: Rgba<u8>) {
        self.brush.secondary = color;
    }

    pub fn swap_colors(&mut self) {
        self.brush.swap_colors();
    }

    pub fn set_brush_size(&mut self, size: f32) {
        self.brush.set_size(size);
        self.show_size_indicator();
    }

    pub fn set_brush_hardness(&mut self, hardness: f32) {
        self.brush.set_hardness(hardness);
    }

    pub fn set_brush_kind(&mut self, kind: BrushKind) {
        self.brush.kind = kind;
    }

    pub fn set_drop_settings(&mut self, drop_size: f32, drop_count: u32) {
        self.brush.set_drop_size(drop_size);
        self.brush.set_drop_count(drop_count);
    }

    pub fn preset_soft_round(&mut self) {
        self.brush.preset_soft_round();
        self.show_size_indicator();
    }

    pub fn preset_hard_round(&mut self) {
        self.brush.preset_hard_round();
        self.show_size_indicator();
    }

    pub fn preset_default_brush(&mut self) {
        self.brush.preset_default();
        self.show_size_indicator();
    }

    pub fn reset_brush(&mut self) {
        self.brush.reset();
        self.show_size_indicator();
    }

    pub fn set_gradient_style(&mut self, style: GradientStyle) {
        self.gradient_style = style;
    }

    /// Fewer than two stops means primary -> secondary.
    pub fn set_gradient_stops(&mut self, stops: Vec<GradientStop>) {
        self.gradient_stops = stops;
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    pub fn undo(&mut self) -> bool {
        let Some(target) = self.history.peek_undo().map(|s| s.layer) else {
            self.status(StatusKind::NothingToUndo);
            return false;
        };
        let index = self.layer_index_for(target);
        let Some(current) = self.visible_surface(index) else { return false };
        self.discard_floating();
        let Some(snapshot) = self.history.undo(&current) else { return false };
        if let Some(layer) = self.layers.layer_mut(index) {
            restore_surface(&mut layer.pixels, snapshot.pixels);
        }
        log_info!("Undo: {}", snapshot.label);
        self.status(StatusKind::Undone(snapshot.label));
        self.content_changed();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(target) = self.history.peek_redo().map(|s| s.layer) else {
            self.status(StatusKind::NothingToRedo);
            return false;
        };
        let index = self.layer_index_for(target);
        let Some(current) = self.visible_surface(index) else { return false };
        self.discard_floating();
        let Some(snapshot) = self.history.redo(&current) else { return false };
        if let Some(layer) = self.layers.layer_mut(index) {
            restore_surface(&mut layer.pixels, snapshot.pixels);
        }
        log_info!("Redo: {}", snapshot.label);
        self.status(StatusKind::Redone(snapshot.label));
        self.content_changed();
        true
    }

    /// Layer `index` as displayed: floating content drawn in at its current
    /// bounds and rotation.  This is what the opposite stack must remember.
    fn visible_surface(&self, index: usize) -> Option<RgbaImage> {
        let mut pixels = self.layers.layer(index)?.pixels.clone();
        if index == self.layers.active_index()
            && let (Some(content), Some(bounds)) = (self.selection.floating_content(), self.selection.bounds())
        {
            draw_transformed(&mut pixels, content, bounds, self.selection.rotation());
        }
        Some(pixels)
    }

    /// Floating pixels are dropped, not committed: the snapshot taken when
    /// they were lifted already holds them.
    fn discard_floating(&mut self) {
        if self.selection.is_floating() {
            self.selection.clear();
            self.emit_selection();
        }
    }

    // ========================================================================
    // CANVAS
    // ========================================================================

    /// Wipe every layer and the selection.
    pub fn new_canvas(&mut self) {
        self.save_active_state("New Canvas");
        self.selection.clear();
        self.layers.clear_all();
        log_info!("New canvas {}x{}", self.layers.width(), self.layers.height());
        self.emit_selection();
        self.content_changed();
    }

    /// Clear the active layer and drop the selection.
    pub fn clear_canvas(&mut self) {
        if self.reject_locked() {
            return;
        }
        self.save_active_state("Clear");
        self.selection.clear();
        self.layers.active_mut().clear();
        self.emit_selection();
        self.content_changed();
    }

    /// Resize every layer, anchored top-left.  Not clamped to the configured
    /// canvas range.
    pub fn resize_canvas(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width, height) == (self.layers.width(), self.layers.height()) {
            return false;
        }
        self.commit_floating();
        self.selection.clear();
        self.save_active_state("Resize Canvas");
        let prev = self.layers.active_index();
        self.layers.resize_all(width, height);
        log_info!("Canvas resized to {}x{}", width, height);
        self.status(StatusKind::CanvasResized { width, height });
        self.emit_selection();
        self.emit_layers(prev);
        true
    }

    /// Replace the active layer's content with `image` at (0, 0).
    pub fn load_image(&mut self, image: RgbaImage) {
        if self.reject_locked() {
            return;
        }
        self.save_active_state("Open Image");
        self.selection.clear();
        let (w, h) = image.dimensions();
        let surface = &mut self.layers.active_mut().pixels;
        surface.as_mut().fill(0);
        copy_region(&image, surface, 0, 0);
        log_info!("Loaded {}x{} image into active layer", w, h);
        self.status(StatusKind::ImageLoaded { width: w, height: h });
        self.emit_selection();
        self.content_changed();
    }

    /// Decode `path` and load it.  On failure nothing changes.
    pub fn open_image(&mut self, path: &Path) -> Result<(), CoreError> {
        match io::load_image(path) {
            Ok(image) => {
                self.load_image(image);
                Ok(())
            }
            Err(e) => {
                log_err!("Failed to open {}: {}", path.display(), e);
                self.status(StatusKind::LoadFailed(e.to_string()));
                Err(e)
            }
        }
    }

    pub fn save_active_layer(&self, path: &Path) -> Result<(), CoreError> {
        io::save_png(self.active_layer_surface(), path).inspect_err(|e| {
            log_err!("Failed to save {}: {}", path.display(), e);
        })
    }

    pub fn save_composite(&self, path: &Path) -> Result<(), CoreError> {
        io::save_png(&self.composite(), path).inspect_err(|e| {
            log_err!("Failed to save {}: {}", path.display(), e);
        })
    }

    /// Rasterize `text` onto the active layer, top-left anchored at `position`.
    /// Bad font bytes are reported before anything is touched.
    pub fn commit_text(&mut self, position: Pos2, text: &str, font_bytes: Vec<u8>, style: &TextStyle) -> Result<(), CoreError> {
        let font = match load_font(font_bytes) {
            Ok(font) => font,
            Err(e) => {
                log_err!("Text commit failed: {}", e);
                self.status(StatusKind::TextFailed(e.to_string()));
                return Err(e);
            }
        };
        if self.reject_locked() {
            return Ok(());
        }
        let (w, h) = (self.layers.width(), self.layers.height());
        let Some(raster) = rasterize_text(&font, text, style, (position.x, position.y), w, h) else {
            return Ok(());
        };
        let clip = self.selection.clip();
        self.save_active_state("Text");
        composite_placed(&mut self.layers.active_mut().pixels, &raster, clip.as_ref());
        self.content_changed();
        Ok(())
    }

    /// Fill the current selection (or the whole layer) with a gradient along
    /// `start -> end` without going through pointer input.
    pub fn apply_gradient(&mut self, start: Pos2, end: Pos2) {
        if self.reject_locked() {
            return;
        }
        let previous = self.tool;
        self.tool = ToolKind::Gradient;
        self.commit_drag(start, end, false);
        self.tool = previous;
    }

    /// Flood fill at a canvas point with the primary color.
    pub fn fill(&mut self, p: Pos2) {
        self.fill_at(p, false);
    }

    // ========================================================================
    // SELECTION & CLIPBOARD
    // ========================================================================

    pub fn select_all(&mut self) {
        let full = Rect::from_min_max(Pos2::ZERO, pos2(self.layers.width() as f32, self.layers.height() as f32));
        self.selection.set_selection(full, &mut self.layers.active_mut().pixels);
        self.emit_selection();
    }

    /// Commit floating content and drop the selection.
    pub fn apply_selection(&mut self) {
        if !self.selection.has_selection() {
            return;
        }
        self.selection.apply_and_clear(&mut self.layers.active_mut().pixels);
        self.emit_selection();
    }

    /// Drop the selection, discarding floating content.
    pub fn clear_selection(&mut self) {
        if !self.selection.has_selection() && !self.selection.is_floating() {
            return;
        }
        self.selection.clear();
        self.emit_selection();
    }

    pub fn copy(&mut self) -> bool {
        if !self.selection.has_selection() {
            self.status(StatusKind::NothingSelected);
            return false;
        }
        if !self.selection.copy(&self.layers.active().pixels) {
            return false;
        }
        log_info!("Copied selection {:?}", self.selection.bounds());
        self.status(StatusKind::Copied);
        true
    }

    pub fn cut(&mut self) -> bool {
        if self.reject_locked() {
            return false;
        }
        if !self.selection.has_selection() {
            self.status(StatusKind::NothingSelected);
            return false;
        }
        self.save_active_state("Cut");
        if !self.selection.cut(&mut self.layers.active_mut().pixels) {
            return false;
        }
        log_info!("Cut selection");
        self.status(StatusKind::Cut);
        self.emit_selection();
        true
    }

    pub fn paste(&mut self) -> bool {
        if self.reject_locked() {
            return false;
        }
        if !self.selection.has_clipboard() {
            self.status(StatusKind::ClipboardEmpty);
            return false;
        }
        self.save_active_state("Paste");
        if !self.selection.paste(&mut self.layers.active_mut().pixels) {
            return false;
        }
        log_info!("Pasted as floating selection at {:?}", self.selection.bounds());
        self.status(StatusKind::Pasted);
        self.emit_selection();
        true
    }

    pub fn delete_selection(&mut self) -> bool {
        if self.reject_locked() {
            return false;
        }
        if !self.selection.has_selection() {
            self.status(StatusKind::NothingSelected);
            return false;
        }
        self.save_active_state("Delete");
        if !self.selection.delete(&mut self.layers.active_mut().pixels) {
            return false;
        }
        log_info!("Deleted selection contents");
        self.status(StatusKind::Deleted);
        self.emit_selection();
        true
    }

    // ========================================================================
    // LAYERS
    // ========================================================================

    pub fn add_layer(&mut self, name: &str) -> usize {
        self.commit_floating();
        let prev = self.layers.active_index();
        let index = self.layers.create_layer(name);
        log_info!("Layer added: '{}' at {}", self.layers.active().name, index);
        self.emit_layers(prev);
        index
    }

    pub fn remove_layer(&mut self, index: usize) -> bool {
        self.commit_floating();
        let prev = self.layers.active_index();
        if !self.layers.remove_layer(index) {
            log_warn!("Remove layer {} rejected ({} layers)", index, self.layers.len());
            return false;
        }
        log_info!("Layer {} removed", index);
        self.emit_layers(prev);
        true
    }

    pub fn duplicate_layer(&mut self, index: usize) -> bool {
        self.structural(index, "Duplicate", |layers| layers.duplicate_layer(index))
    }

    pub fn move_layer_up(&mut self, index: usize) -> bool {
        self.structural(index, "Move up", |layers| layers.move_up(index))
    }

    pub fn move_layer_down(&mut self, index: usize) -> bool {
        self.structural(index, "Move down", |layers| layers.move_down(index))
    }

    /// Merge `index` onto the layer directly beneath it.
    pub fn merge_down(&mut self, index: usize) -> bool {
        if index == 0 {
            return false;
        }
        self.structural(index, "Merge down", |layers| layers.merge_layers(index - 1, index))
    }

    pub fn merge_all_visible(&mut self) -> bool {
        self.structural(0, "Merge visible", |layers| layers.merge_all_visible())
    }

    pub fn set_active_layer(&mut self, index: usize) -> bool {
        if index >= self.layers.len() || index == self.layers.active_index() {
            return false;
        }
        self.commit_floating();
        let prev = self.layers.active_index();
        self.layers.set_active(index);
        self.emit_layers(prev);
        true
    }

    fn structural(&mut self, index: usize, what: &str, op: impl FnOnce(&mut LayerStack) -> bool) -> bool {
        self.commit_floating();
        let prev = self.layers.active_index();
        if !op(&mut self.layers) {
            log_warn!("{} rejected for layer {}", what, index);
            return false;
        }
        log_info!("{} (layer {}), now {} layers", what, index, self.layers.len());
        self.emit_layers(prev);
        true
    }

    fn layer_property(&mut self, index: usize, f: impl FnOnce(&mut crate::canvas::Layer)) -> bool {
        let Some(layer) = self.layers.layer_mut(index) else { return false };
        f(layer);
        let prev = self.layers.active_index();
        self.emit_layers(prev);
        true
    }

    pub fn rename_layer(&mut self, index: usize, name: &str) -> bool {
        let name = name.to_string();
        self.layer_property(index, |l| l.name = name)
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> bool {
        self.layer_property(index, |l| l.visible = visible)
    }

    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) -> bool {
        self.layer_property(index, |l| l.set_opacity(opacity))
    }

    pub fn set_layer_blend_mode(&mut self, index: usize, mode: BlendMode) -> bool {
        self.layer_property(index, |l| l.blend_mode = mode)
    }

    pub fn set_layer_locked(&mut self, index: usize, locked: bool) -> bool {
        self.layer_property(index, |l| l.locked = locked)
    }

    pub fn set_layer_effects(&mut self, index: usize, effects: LayerEffects) -> bool {
        self.layer_property(index, |l| l.effects = effects)
    }

    // ========================================================================
    // GRID
    // ========================================================================

    pub fn toggle_grid(&mut self) -> bool {
        self.grid.visible = !self.grid.visible;
        self.redraw.invalidate();
        self.grid.visible
    }

    pub fn toggle_snap(&mut self) -> bool {
        self.grid.snap = !self.grid.snap;
        self.grid.snap
    }

    pub fn set_grid_size(&mut self, size: f32) {
        self.grid.set_size(size.clamp(5.0, 100.0));
        self.redraw.invalidate();
    }

    // ========================================================================
    // VIEWPORT
    // ========================================================================

    pub fn zoom_in(&mut self, center: Pos2) -> bool {
        let changed = self.viewport.zoom_in(center);
        self.viewport_changed(changed)
    }

    pub fn zoom_out(&mut self, center: Pos2) -> bool {
        let changed = self.viewport.zoom_out(center);
        self.viewport_changed(changed)
    }

    pub fn zoom_to(&mut self, level: f32, anchor: Pos2) -> bool {
        let changed = self.viewport.zoom_around(level, anchor);
        self.viewport_changed(changed)
    }

    pub fn pan(&mut self, delta: Vec2) -> bool {
        let changed = self.viewport.pan(delta);
        self.viewport_changed(changed)
    }

    pub fn reset_view(&mut self) -> bool {
        let changed = self.viewport.reset();
        self.viewport_changed(changed)
    }
}

/// Restore a snapshot; a snapshot taken before a canvas resize is pinned at
/// the origin of the current surface.
fn restore_surface(surface: &mut RgbaImage, pixels: RgbaImage) {
    if surface.dimensions() == pixels.dimensions() {
        *surface = pixels;
    } else {
        surface.as_mut().fill(0);
        copy_region(&pixels, surface, 0, 0);
    }
}

/// Source-over a placed raster, dropping pixels outside `clip`.
fn composite_placed(dest: &mut RgbaImage, raster: &PlacedRaster, clip: Option<&SelectionClip>) {
    let Some(clip) = clip else {
        blend_image_onto(dest, &raster.pixels, raster.x, raster.y, BlendMode::Normal, 1.0);
        return;
    };
    let mut masked = raster.pixels.clone();
    for (x, y, px) in masked.enumerate_pixels_mut() {
        let cx = raster.x + x as i64;
        let cy = raster.y + y as i64;
        if !clip.contains(pos2(cx as f32 + 0.5, cy as f32 + 0.5)) {
            *px = TRANSPARENT;
        }
    }
    blend_image_onto(dest, &masked, raster.x, raster.y, BlendMode::Normal, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn small_canvas_config() -> EditorConfig {
        EditorConfig {
            min_canvas_width: 1,
            min_canvas_height: 1,
            max_undo_steps: 20,
            ..EditorConfig::default()
        }
    }

    fn coordinator(w: u32, h: u32) -> DrawingCoordinator {
        DrawingCoordinator::new(w, h, small_canvas_config())
    }

    fn click(c: &mut DrawingCoordinator, p: Pos2) {
        c.pointer_down(p, PointerButton::Primary, Modifiers::default());
        c.pointer_up(p);
    }

    fn drag(c: &mut DrawingCoordinator, from: Pos2, to: Pos2) {
        c.pointer_down(from, PointerButton::Primary, Modifiers::default());
        c.pointer_move(to);
        c.pointer_up(to);
    }

    fn is_transparent(img: &RgbaImage) -> bool {
        img.pixels().all(|p| p[3] == 0)
    }

    /// 100x100 image where each pixel encodes its own position.
    fn coded_image() -> RgbaImage {
        RgbaImage::from_fn(100, 100, |x, y| Rgba([x as u8, y as u8, 100, 255]))
    }

    #[test]
    fn test_canvas_size_is_clamped() {
        let small = DrawingCoordinator::new(100, 100, EditorConfig::default());
        assert_eq!((small.layers().width(), small.layers().height()), (800, 600));
        let big = DrawingCoordinator::new(5000, 5000, EditorConfig::default());
        assert_eq!((big.layers().width(), big.layers().height()), (1920, 1080));
    }

    #[test]
    fn test_fill_then_undo_restores_transparent() {
        let mut c = coordinator(100, 100);
        c.set_tool(ToolKind::Fill);
        c.set_primary_color(RED);
        click(&mut c, pos2(50.0, 50.0));
        assert!(c.active_layer_surface().pixels().all(|p| *p == RED));
        assert!(c.undo());
        assert!(is_transparent(c.active_layer_surface()));
    }

    #[test]
    fn test_fill_same_color_adds_no_history() {
        let mut c = coordinator(20, 20);
        c.set_tool(ToolKind::Fill);
        c.set_primary_color(RED);
        click(&mut c, pos2(5.0, 5.0));
        let depth = c.history().undo_count();
        click(&mut c, pos2(5.0, 5.0));
        assert_eq!(c.history().undo_count(), depth);
    }

    #[test]
    fn test_selection_move_commits_on_new_selection() {
        let mut c = coordinator(100, 100);
        let original = coded_image();
        c.load_image(original.clone());
        c.set_tool(ToolKind::RectSelect);

        drag(&mut c, pos2(10.0, 10.0), pos2(60.0, 60.0));
        assert_eq!(c.selection().bounds(), Some(Rect::from_min_max(pos2(10.0, 10.0), pos2(60.0, 60.0))));

        drag(&mut c, pos2(20.0, 20.0), pos2(40.0, 40.0));
        assert!(c.selection().is_floating());

        // New selection elsewhere flushes the floating pixels.
        c.pointer_down(pos2(90.0, 90.0), PointerButton::Primary, Modifiers::default());
        assert!(!c.selection().is_floating());

        let surface = c.active_layer_surface();
        for y in 10..30 {
            for x in 10..60 {
                assert_eq!(surface.get_pixel(x, y)[3], 0, "ghost at ({x},{y})");
            }
        }
        for y in 30..80 {
            for x in 30..80 {
                assert_eq!(surface.get_pixel(x, y), original.get_pixel(x - 20, y - 20));
            }
        }
        c.pointer_up(pos2(90.0, 90.0));

        // The whole move is one undo step.
        assert!(c.undo());
        assert_eq!(c.active_layer_surface(), &original);
    }

    #[test]
    fn test_locked_layer_allows_marking_but_not_lifting() {
        let mut c = coordinator(100, 100);
        c.load_image(RgbaImage::from_pixel(100, 100, RED));
        c.set_layer_locked(0, true);
        c.set_tool(ToolKind::RectSelect);
        drag(&mut c, pos2(10.0, 10.0), pos2(60.0, 60.0));
        assert!(c.selection().bounds().is_some());

        let rx = c.event_channel();
        let steps = c.history().undo_history().len();
        drag(&mut c, pos2(20.0, 20.0), pos2(40.0, 40.0));
        assert!(!c.selection().is_floating());
        assert!(c.active_layer_surface().pixels().all(|p| *p == RED));
        assert_eq!(c.history().undo_history().len(), steps);
        assert!(rx.try_iter().any(|e| e == CoordinatorEvent::Status(StatusKind::LayerLocked)));
    }

    #[test]
    fn test_redo_after_undoing_floating_move_restores_content() {
        let mut c = coordinator(100, 100);
        c.load_image(RgbaImage::from_pixel(100, 100, RED));
        c.set_tool(ToolKind::RectSelect);
        drag(&mut c, pos2(10.0, 10.0), pos2(60.0, 60.0));
        drag(&mut c, pos2(20.0, 20.0), pos2(40.0, 40.0));
        assert!(c.selection().is_floating());

        assert!(c.undo());
        assert!(!c.selection().is_floating());
        assert!(c.active_layer_surface().pixels().all(|p| *p == RED));

        assert!(c.redo());
        let surface = c.active_layer_surface();
        assert_eq!(surface.get_pixel(15, 15)[3], 0);
        assert_eq!(*surface.get_pixel(35, 35), RED);
        assert_eq!(*surface.get_pixel(75, 75), RED);
        assert_eq!(surface.pixels().filter(|p| p[3] == 0).count(), 50 * 50 - 30 * 30);
    }

    #[test]
    fn test_brush_stroke_then_undo() {
        let mut c = coordinator(200, 50);
        c.set_brush_size(10.0);
        drag(&mut c, pos2(0.0, 0.0), pos2(100.0, 0.0));
        let surface = c.active_layer_surface();
        assert!(surface.get_pixel(50, 0)[3] > 0);
        assert!(surface.get_pixel(150, 0)[3] == 0);
        assert!(c.undo());
        assert!(is_transparent(c.active_layer_surface()));
    }

    #[test]
    fn test_click_without_drag_dabs() {
        let mut c = coordinator(50, 50);
        c.set_brush_size(10.0);
        click(&mut c, pos2(25.0, 25.0));
        assert!(c.active_layer_surface().get_pixel(25, 25)[3] > 0);
    }

    #[test]
    fn test_secondary_button_paints_secondary_color() {
        let mut c = coordinator(50, 50);
        c.set_brush_size(10.0);
        c.set_brush_hardness(100.0);
        c.set_secondary_color(RED);
        c.pointer_down(pos2(25.0, 25.0), PointerButton::Secondary, Modifiers::default());
        c.pointer_up(pos2(25.0, 25.0));
        assert_eq!(*c.active_layer_surface().get_pixel(25, 25), RED);
    }

    #[test]
    fn test_locked_layer_rejects_paint() {
        let mut c = coordinator(30, 30);
        let rx = c.event_channel();
        c.set_layer_locked(0, true);
        c.set_tool(ToolKind::Fill);
        click(&mut c, pos2(5.0, 5.0));
        assert!(is_transparent(c.active_layer_surface()));
        assert!(rx.try_iter().any(|e| e == CoordinatorEvent::Status(StatusKind::LayerLocked)));
    }

    #[test]
    fn test_eyedropper_picks_and_switches_to_brush() {
        let mut c = coordinator(20, 20);
        let mut img = RgbaImage::new(20, 20);
        img.put_pixel(5, 5, RED);
        c.load_image(img);
        let rx = c.event_channel();

        c.set_tool(ToolKind::Eyedropper);
        click(&mut c, pos2(5.5, 5.5));
        assert_eq!(c.brush().primary, RED);
        assert_eq!(c.tool(), ToolKind::Brush);
        assert_eq!(c.recent_colors().most_recent(), Some(RED));
        let events: Vec<_> = rx.try_iter().collect();
        assert!(events.contains(&CoordinatorEvent::Status(StatusKind::ColorPicked { r: 255, g: 0, b: 0 })));
        assert!(events.contains(&CoordinatorEvent::ToolChanged(ToolKind::Brush)));

        // Out of bounds: status only.
        c.set_tool(ToolKind::Eyedropper);
        click(&mut c, pos2(-3.0, 5.0));
        assert_eq!(c.tool(), ToolKind::Eyedropper);
        assert!(rx.try_iter().any(|e| e == CoordinatorEvent::Status(StatusKind::OutOfBounds)));
    }

    #[test]
    fn test_alt_click_picks_color() {
        let mut c = coordinator(10, 10);
        c.load_image(RgbaImage::from_pixel(10, 10, RED));
        let mods = Modifiers { alt: true, ..Modifiers::default() };
        c.pointer_down(pos2(3.0, 3.0), PointerButton::Primary, mods);
        c.pointer_up(pos2(3.0, 3.0));
        assert_eq!(c.brush().primary, RED);
        // Nothing was painted.
        assert_eq!(c.history().undo_count(), 2);
    }

    #[test]
    fn test_magic_wand_selects_and_unions_with_shift() {
        let mut c = coordinator(60, 60);
        let mut img = RgbaImage::from_pixel(60, 60, Rgba([255, 255, 255, 255]));
        for y in 5..15 {
            for x in 5..15 {
                img.put_pixel(x, y, RED);
            }
        }
        for y in 40..50 {
            for x in 40..50 {
                img.put_pixel(x, y, RED);
            }
        }
        c.load_image(img);
        c.set_tool(ToolKind::MagicWand);
        click(&mut c, pos2(7.0, 7.0));
        assert_eq!(c.selection().bounds(), Some(Rect::from_min_max(pos2(5.0, 5.0), pos2(15.0, 15.0))));

        let shift = Modifiers { shift: true, ..Modifiers::default() };
        c.pointer_down(pos2(45.0, 45.0), PointerButton::Primary, shift);
        c.pointer_up(pos2(45.0, 45.0));
        assert_eq!(c.selection().bounds(), Some(Rect::from_min_max(pos2(5.0, 5.0), pos2(50.0, 50.0))));
        assert!(c.active_layer_surface().get_pixel(20, 20)[0] == 255);
    }

    #[test]
    fn test_text_drag_requests_area_with_minimum() {
        let mut c = coordinator(400, 400);
        let rx = c.event_channel();
        c.set_tool(ToolKind::Text);
        drag(&mut c, pos2(10.0, 10.0), pos2(30.0, 20.0));
        drag(&mut c, pos2(100.0, 100.0), pos2(200.0, 160.0));
        let areas: Vec<_> = rx
            .try_iter()
            .filter(|e| matches!(e, CoordinatorEvent::TextAreaRequested { .. }))
            .collect();
        assert_eq!(
            areas,
            vec![
                CoordinatorEvent::TextAreaRequested { origin: pos2(10.0, 10.0), width: 300.0, height: 150.0 },
                CoordinatorEvent::TextAreaRequested { origin: pos2(100.0, 100.0), width: 100.0, height: 60.0 },
            ]
        );
    }

    #[test]
    fn test_invalid_font_changes_nothing() {
        let mut c = coordinator(50, 50);
        let depth = c.history().undo_count();
        let err = c.commit_text(pos2(0.0, 0.0), "hi", vec![0, 1, 2], &TextStyle::default());
        assert!(matches!(err, Err(CoreError::Font(_))));
        assert_eq!(c.history().undo_count(), depth);
        assert!(is_transparent(c.active_layer_surface()));
    }

    #[test]
    #[ignore = "needs DejaVuSans at /usr/share/fonts/truetype/dejavu"]
    fn test_commit_text_is_one_undo_step() {
        let bytes = std::fs::read("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf").unwrap();
        let mut c = coordinator(200, 100);
        let style = TextStyle { size: 24.0, color: RED, ..TextStyle::default() };
        c.commit_text(pos2(10.0, 10.0), "Mint", bytes, &style).unwrap();
        assert!(c.active_layer_surface().pixels().any(|p| p[3] > 200));
        assert_eq!(c.history().undo_history().first().map(String::as_str), Some("Text"));
        assert!(c.undo());
        assert!(is_transparent(c.active_layer_surface()));
    }

    #[test]
    fn test_shape_commit_is_clipped_to_selection() {
        let mut c = coordinator(100, 100);
        c.set_tool(ToolKind::RectSelect);
        drag(&mut c, pos2(0.0, 0.0), pos2(50.0, 100.0));
        c.set_tool(ToolKind::Line);
        drag(&mut c, pos2(10.0, 50.0), pos2(90.0, 50.0));
        let surface = c.active_layer_surface();
        assert_eq!(surface.get_pixel(30, 50)[3], 255);
        assert_eq!(surface.get_pixel(70, 50)[3], 0);
    }

    #[test]
    fn test_gradient_fills_whole_layer_without_selection() {
        let mut c = coordinator(40, 40);
        c.set_tool(ToolKind::Gradient);
        drag(&mut c, pos2(0.0, 0.0), pos2(40.0, 0.0));
        assert!(c.active_layer_surface().pixels().all(|p| p[3] == 255));
        assert!(c.undo());
        assert!(is_transparent(c.active_layer_surface()));
    }

    #[test]
    fn test_remove_last_layer_is_noop() {
        let mut c = coordinator(10, 10);
        assert!(!c.remove_layer(0));
        assert_eq!(c.layers().len(), 1);
        assert_eq!(c.add_layer("Ink"), 1);
        assert!(c.remove_layer(1));
        assert!(!c.remove_layer(7));
        assert_eq!(c.layers().len(), 1);
    }

    #[test]
    fn test_layer_events() {
        let mut c = coordinator(10, 10);
        let rx = c.event_channel();
        c.add_layer("Ink");
        let events: Vec<_> = rx.try_iter().collect();
        assert!(matches!(&events[0], CoordinatorEvent::LayersChanged(infos) if infos.len() == 2));
        assert_eq!(events[1], CoordinatorEvent::ActiveLayerChanged(1));
    }

    #[test]
    fn test_layer_switch_commits_floating_selection() {
        let mut c = coordinator(100, 100);
        c.load_image(RgbaImage::from_pixel(100, 100, RED));
        c.add_layer("Top");
        c.set_active_layer(0);
        c.set_tool(ToolKind::RectSelect);
        drag(&mut c, pos2(0.0, 0.0), pos2(40.0, 40.0));
        drag(&mut c, pos2(20.0, 20.0), pos2(70.0, 70.0));
        assert!(c.selection().is_floating());
        c.set_active_layer(1);
        assert!(!c.selection().is_floating());
        let bottom = &c.layers().layer(0).unwrap().pixels;
        assert_eq!(*bottom.get_pixel(60, 60), RED);
        assert_eq!(bottom.get_pixel(5, 5)[3], 0);
    }

    #[test]
    fn test_paste_floats_and_undo_restores() {
        let mut c = coordinator(100, 100);
        let mut img = RgbaImage::new(100, 100);
        for y in 0..10 {
            for x in 0..10 {
                img.put_pixel(x, y, RED);
            }
        }
        c.load_image(img);
        c.set_tool(ToolKind::RectSelect);
        drag(&mut c, pos2(0.0, 0.0), pos2(10.0, 10.0));
        assert!(c.copy());
        c.clear_selection();
        assert!(c.paste());
        assert_eq!(c.selection().bounds(), Some(Rect::from_min_max(pos2(45.0, 45.0), pos2(55.0, 55.0))));
        c.apply_selection();
        assert_eq!(*c.active_layer_surface().get_pixel(50, 50), RED);
        assert!(c.undo());
        assert_eq!(c.active_layer_surface().get_pixel(50, 50)[3], 0);
    }

    #[test]
    fn test_clipboard_without_selection_reports_status() {
        let mut c = coordinator(10, 10);
        let rx = c.event_channel();
        assert!(!c.copy());
        assert!(!c.delete_selection());
        assert!(!c.paste());
        let events: Vec<_> = rx.try_iter().collect();
        assert!(events.contains(&CoordinatorEvent::Status(StatusKind::NothingSelected)));
        assert!(events.contains(&CoordinatorEvent::Status(StatusKind::ClipboardEmpty)));
    }

    #[test]
    fn test_undo_after_resize_blits_at_origin() {
        let mut c = coordinator(100, 100);
        c.set_tool(ToolKind::Fill);
        c.set_primary_color(RED);
        click(&mut c, pos2(1.0, 1.0));
        assert!(c.resize_canvas(50, 50));
        c.set_tool(ToolKind::Eraser);
        c.set_brush_size(20.0);
        c.set_brush_hardness(100.0);
        click(&mut c, pos2(25.0, 25.0));
        assert!(c.undo());
        assert!(c.undo());
        let surface = c.active_layer_surface();
        assert_eq!(surface.dimensions(), (50, 50));
        assert!(surface.pixels().all(|p| *p == RED));
    }

    #[test]
    fn test_undo_on_empty_history_reports() {
        let mut c = coordinator(10, 10);
        let rx = c.event_channel();
        assert!(c.undo());
        assert!(!c.undo());
        assert!(c.redo());
        assert!(!c.redo());
        let events: Vec<_> = rx.try_iter().collect();
        assert!(events.contains(&CoordinatorEvent::Status(StatusKind::NothingToRedo)));
        assert!(events.contains(&CoordinatorEvent::Status(StatusKind::NothingToUndo)));
    }

    #[test]
    fn test_open_missing_file_leaves_state() {
        let mut c = coordinator(10, 10);
        let depth = c.history().undo_count();
        assert!(c.open_image(Path::new("/definitely/not/here.png")).is_err());
        assert_eq!(c.history().undo_count(), depth);
        assert!(is_transparent(c.active_layer_surface()));
    }

    #[test]
    fn test_space_drag_pans_without_painting() {
        let mut c = coordinator(50, 50);
        let space = Modifiers { space: true, ..Modifiers::default() };
        c.pointer_down(pos2(10.0, 10.0), PointerButton::Primary, space);
        c.pointer_move(pos2(30.0, 15.0));
        c.pointer_up(pos2(30.0, 15.0));
        assert_eq!(c.viewport().offset(), Vec2::new(20.0, 5.0));
        assert!(is_transparent(c.active_layer_surface()));
    }

    #[test]
    fn test_pointer_goes_through_viewport() {
        let mut c = coordinator(100, 100);
        c.zoom_to(2.0, Pos2::ZERO);
        c.set_tool(ToolKind::Fill);
        c.set_primary_color(RED);
        c.pointer_down(pos2(40.0, 40.0), PointerButton::Primary, Modifiers::default());
        let rx = c.event_channel();
        c.pointer_move(pos2(40.0, 40.0));
        assert_eq!(
            rx.try_recv().ok(),
            Some(CoordinatorEvent::Coordinates { x: 20.0, y: 20.0, zoom: 2.0, snapped: false })
        );
    }

    #[test]
    fn test_snap_to_grid_applies_to_pointer() {
        let mut c = coordinator(100, 100);
        c.toggle_snap();
        let rx = c.event_channel();
        c.pointer_move(pos2(29.0, 31.0));
        assert_eq!(
            rx.try_recv().ok(),
            Some(CoordinatorEvent::Coordinates { x: 20.0, y: 40.0, zoom: 1.0, snapped: true })
        );
        c.set_grid_size(1.0);
        assert_eq!(c.grid().size(), 5.0);
    }

    #[test]
    fn test_viewport_redraw_is_throttled() {
        let config = EditorConfig { redraw_interval_ms: 60_000, ..small_canvas_config() };
        let mut c = DrawingCoordinator::new(10, 10, config);
        let rx = c.event_channel();
        assert!(c.zoom_in(Pos2::ZERO));
        assert!(c.take_redraw());
        assert!(c.zoom_in(Pos2::ZERO));
        assert!(!c.needs_redraw());
        c.tick(Instant::now() + Duration::from_secs(120));
        assert!(c.take_redraw());
        assert_eq!(
            rx.try_iter().filter(|e| matches!(e, CoordinatorEvent::ViewportChanged { .. })).count(),
            2
        );
    }

    #[test]
    fn test_size_indicator_hides_after_delay() {
        let mut c = coordinator(10, 10);
        let rx = c.event_channel();
        c.set_brush_size(42.0);
        assert_eq!(rx.try_recv().ok(), Some(CoordinatorEvent::BrushSizeIndicator { size: 42.0, visible: true }));
        c.tick(Instant::now());
        assert!(rx.try_recv().is_err());
        c.tick(Instant::now() + Duration::from_millis(c.config().size_indicator_ms + 100));
        assert_eq!(rx.try_recv().ok(), Some(CoordinatorEvent::BrushSizeIndicator { size: 42.0, visible: false }));
    }

    #[test]
    fn test_observer_sees_tool_changes() {
        use std::cell::RefCell;
        use std::rc::Rc;
        let mut c = coordinator(10, 10);
        let tools = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&tools);
        c.subscribe(Box::new(move |e| {
            if let CoordinatorEvent::ToolChanged(t) = e {
                sink.borrow_mut().push(*t);
            }
        }));
        c.set_tool(ToolKind::Lasso);
        c.set_tool(ToolKind::Lasso);
        c.set_tool(ToolKind::Gradient);
        assert_eq!(tools.borrow().as_slice(), &[ToolKind::Lasso, ToolKind::Gradient]);
    }

    #[test]
    fn test_new_canvas_clears_everything() {
        let mut c = coordinator(20, 20);
        c.load_image(RgbaImage::from_pixel(20, 20, RED));
        c.add_layer("Ink");
        c.select_all();
        c.new_canvas();
        assert!(!c.selection().has_selection());
        assert!(c.layers().layers().iter().all(|l| is_transparent(&l.pixels)));
    }

    #[test]
    fn test_undo_depth_is_bounded() {
        let config = EditorConfig { max_undo_steps: 3, ..small_canvas_config() };
        let mut c = DrawingCoordinator::new(10, 10, config);
        c.set_tool(ToolKind::Fill);
        for v in 0..6u8 {
            c.set_primary_color(Rgba([v, 0, 0, 255]));
            click(&mut c, pos2(1.0, 1.0));
        }
        assert_eq!(c.history().undo_count(), 3);
    }
}
