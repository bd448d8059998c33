// ============================================================================
// EDITOR CONFIGURATION - tunable defaults for the drawing core
// ============================================================================
//
// Stored as plain `key=value` lines.  Unknown keys are skipped and malformed
// values leave the default in place, so an old or hand-edited file never
// prevents the editor from starting.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io::CoreError;

/// Hard ceiling for undo depth regardless of configuration.
pub const MAX_UNDO_CEILING: usize = 50;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Undo depth, clamped to [1, 50].
    pub max_undo_steps: usize,
    /// Per-channel tolerance used by the magic wand.
    pub magic_wand_tolerance: u8,
    /// Round brush / eraser interpolation step is `size / brush_step_divisor`.
    pub brush_step_divisor: f32,
    /// Special brushes step every `size * special_brush_spacing` pixels.
    pub special_brush_spacing: f32,
    pub zoom_step: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Rectangle / ellipse selections smaller than this (either side) are discarded.
    pub min_selection_size: f32,
    /// Resize-handle hit radius in screen pixels.
    pub handle_hit_radius: f32,
    /// Minimum spacing between viewport-triggered redraws.
    pub redraw_interval_ms: u64,
    /// How long the brush size indicator stays visible after a change.
    pub size_indicator_ms: u64,
    pub recent_colors_capacity: usize,
    pub min_canvas_width: u32,
    pub min_canvas_height: u32,
    pub max_canvas_width: u32,
    pub max_canvas_height: u32,
    pub grid_size: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo_steps: default_undo_steps(total_memory_bytes()),
            magic_wand_tolerance: 32,
            brush_step_divisor: 4.0,
            special_brush_spacing: 0.3,
            zoom_step: 1.2,
            min_zoom: 0.1,
            max_zoom: 15.5,
            min_selection_size: 5.0,
            handle_hit_radius: 12.0,
            redraw_interval_ms: 16,
            size_indicator_ms: 2000,
            recent_colors_capacity: 12,
            min_canvas_width: 800,
            min_canvas_height: 600,
            max_canvas_width: 1920,
            max_canvas_height: 1080,
            grid_size: 20.0,
        }
    }
}

impl EditorConfig {
    /// Clamp a requested canvas size into the configured range.
    pub fn clamp_canvas(&self, width: u32, height: u32) -> (u32, u32) {
        let max_w = self.max_canvas_width.max(self.min_canvas_width);
        let max_h = self.max_canvas_height.max(self.min_canvas_height);
        (
            width.clamp(self.min_canvas_width, max_w),
            height.clamp(self.min_canvas_height, max_h),
        )
    }

    /// Parse the `key=value` text format on top of the defaults.
    pub fn from_config_str(content: &str) -> Self {
        let mut c = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "max_undo_steps" => set_parsed(&mut c.max_undo_steps, val),
                "magic_wand_tolerance" => set_parsed(&mut c.magic_wand_tolerance, val),
                "brush_step_divisor" => set_parsed(&mut c.brush_step_divisor, val),
                "special_brush_spacing" => set_parsed(&mut c.special_brush_spacing, val),
                "zoom_step" => set_parsed(&mut c.zoom_step, val),
                "min_zoom" => set_parsed(&mut c.min_zoom, val),
                "max_zoom" => set_parsed(&mut c.max_zoom, val),
                "min_selection_size" => set_parsed(&mut c.min_selection_size, val),
                "handle_hit_radius" => set_parsed(&mut c.handle_hit_radius, val),
                "redraw_interval_ms" => set_parsed(&mut c.redraw_interval_ms, val),
                "size_indicator_ms" => set_parsed(&mut c.size_indicator_ms, val),
                "recent_colors_capacity" => set_parsed(&mut c.recent_colors_capacity, val),
                "min_canvas_width" => set_parsed(&mut c.min_canvas_width, val),
                "min_canvas_height" => set_parsed(&mut c.min_canvas_height, val),
                "max_canvas_width" => set_parsed(&mut c.max_canvas_width, val),
                "max_canvas_height" => set_parsed(&mut c.max_canvas_height, val),
                "grid_size" => set_parsed(&mut c.grid_size, val),
                _ => {}
            }
        }
        c.normalize();
        c
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "max_undo_steps={}\n\
             magic_wand_tolerance={}\n\
             brush_step_divisor={}\n\
             special_brush_spacing={}\n\
             zoom_step={}\n\
             min_zoom={}\n\
             max_zoom={}\n\
             min_selection_size={}\n\
             handle_hit_radius={}\n\
             redraw_interval_ms={}\n\
             size_indicator_ms={}\n\
             recent_colors_capacity={}\n\
             min_canvas_width={}\n\
             min_canvas_height={}\n\
             max_canvas_width={}\n\
             max_canvas_height={}\n\
             grid_size={}\n",
            self.max_undo_steps,
            self.magic_wand_tolerance,
            self.brush_step_divisor,
            self.special_brush_spacing,
            self.zoom_step,
            self.min_zoom,
            self.max_zoom,
            self.min_selection_size,
            self.handle_hit_radius,
            self.redraw_interval_ms,
            self.size_indicator_ms,
            self.recent_colors_capacity,
            self.min_canvas_width,
            self.min_canvas_height,
            self.max_canvas_width,
            self.max_canvas_height,
            self.grid_size,
        )
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_config_str(&content))
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        std::fs::write(path, self.to_config_string())?;
        Ok(())
    }

    /// Pull out-of-range values back to something the core can work with.
    fn normalize(&mut self) {
        self.max_undo_steps = self.max_undo_steps.clamp(1, MAX_UNDO_CEILING);
        if !(self.brush_step_divisor > 0.0) {
            self.brush_step_divisor = 4.0;
        }
        if !(self.special_brush_spacing > 0.0) {
            self.special_brush_spacing = 0.3;
        }
        if !(self.zoom_step > 1.0) {
            self.zoom_step = 1.2;
        }
        if !(self.min_zoom > 0.0) {
            self.min_zoom = 0.1;
        }
        if self.max_zoom < self.min_zoom {
            self.max_zoom = self.min_zoom;
        }
        self.recent_colors_capacity = self.recent_colors_capacity.max(1);
        self.grid_size = self.grid_size.clamp(1.0, 100.0);
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, val: &str) {
    if let Ok(v) = val.parse::<T>() {
        *slot = v;
    }
}

/// Undo depth scaled to installed memory: whole-layer snapshots at 1080p are
/// ~8 MB apiece.
pub fn default_undo_steps(total_memory: Option<u64>) -> usize {
    const GIB: u64 = 1024 * 1024 * 1024;
    match total_memory {
        Some(bytes) if bytes >= 16 * GIB => 30,
        Some(bytes) if bytes >= 8 * GIB => 20,
        Some(bytes) if bytes >= 4 * GIB => 10,
        Some(_) => 5,
        None => 10,
    }
}

/// Installed physical memory, where the platform exposes it cheaply.
fn total_memory_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let meminfo = std::fs::read_to_string("/proc/meminfo").ok()?;
        let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
        let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
        Some(kib * 1024)
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_steps_follow_memory_tiers() {
        const GIB: u64 = 1024 * 1024 * 1024;
        assert_eq!(default_undo_steps(Some(32 * GIB)), 30);
        assert_eq!(default_undo_steps(Some(8 * GIB)), 20);
        assert_eq!(default_undo_steps(Some(4 * GIB)), 10);
        assert_eq!(default_undo_steps(Some(2 * GIB)), 5);
        assert_eq!(default_undo_steps(None), 10);
    }

    #[test]
    fn test_default_undo_within_ceiling() {
        let c = EditorConfig::default();
        assert!(c.max_undo_steps >= 1 && c.max_undo_steps <= MAX_UNDO_CEILING);
    }

    #[test]
    fn test_parse_overrides_and_ignores_garbage() {
        let text = "# comment\nmagic_wand_tolerance=10\nzoom_step=abc\nunknown=1\nmax_undo_steps=500\n";
        let c = EditorConfig::from_config_str(text);
        assert_eq!(c.magic_wand_tolerance, 10);
        assert_eq!(c.zoom_step, 1.2);
        assert_eq!(c.max_undo_steps, MAX_UNDO_CEILING);
    }

    #[test]
    fn test_config_text_survives_reparse() {
        let mut c = EditorConfig::default();
        c.grid_size = 32.0;
        c.max_undo_steps = 7;
        let back = EditorConfig::from_config_str(&c.to_config_string());
        assert_eq!(back, c);
    }

    #[test]
    fn test_clamp_canvas() {
        let c = EditorConfig::default();
        assert_eq!(c.clamp_canvas(100, 100), (800, 600));
        assert_eq!(c.clamp_canvas(4000, 4000), (1920, 1080));
        assert_eq!(c.clamp_canvas(1024, 768), (1024, 768));
    }
}
