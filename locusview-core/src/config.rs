//! Engine tunables
//!
//! Every field has a serde default so a partial `[engine]` table in a TOML
//! file is enough; missing values fall back to the values below.

use serde::{Deserialize, Serialize};

use crate::error::{ViewportError, ViewportResult};

/// What to do with new data that arrives while an earlier request is still
/// waiting for a drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingPolicy {
    /// Keep the first request, log and drop the newcomer.
    Reject,
    /// Keep every request and dispatch them in arrival order.
    Queue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Largest canvas extent in pixels along the sequence axis
    #[serde(default = "default_max_canvas_pixels")]
    pub max_canvas_pixels: f64,

    /// Zoom ceiling, in pixels per base
    #[serde(default = "default_max_pixels_per_base")]
    pub max_pixels_per_base: f64,

    /// Border kept above and below the sequence, in pixels
    #[serde(default = "default_border_pixels")]
    pub border_pixels: f64,

    /// Zoom multipliers closer than this to 1.0 are ignored
    #[serde(default = "default_zoom_epsilon")]
    pub zoom_epsilon: f64,

    /// Number of back-button snapshots kept
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// Narrowest allowed mark, in bases
    #[serde(default = "default_mark_min_width")]
    pub mark_min_width: f64,

    /// Pointer distance from a mark edge that arms a drag, in pixels
    #[serde(default = "default_mark_edge_tolerance_px")]
    pub mark_edge_tolerance_px: f64,

    /// Border left around a range when zooming to it, in pixels
    #[serde(default = "default_zoom_to_range_border_px")]
    pub zoom_to_range_border_px: f64,

    /// Ranges shorter than this many bases are not zoomed to
    #[serde(default = "default_min_zoom_range")]
    pub min_zoom_range: f64,

    /// Fraction of the region moved by a page step
    #[serde(default = "default_page_step")]
    pub page_step: f64,

    /// Fraction of the region moved by a line step
    #[serde(default = "default_line_step")]
    pub line_step: f64,

    #[serde(default = "default_pending_policy")]
    pub pending_policy: PendingPolicy,
}

/// Upper bound on `history_depth`
pub const MAX_HISTORY_DEPTH: usize = 10_000;

fn default_max_canvas_pixels() -> f64 { 30000.0 }
fn default_max_pixels_per_base() -> f64 { 1.0 }
fn default_border_pixels() -> f64 { 2.0 }
fn default_zoom_epsilon() -> f64 { 0.001 }
fn default_history_depth() -> usize { 32 }
fn default_mark_min_width() -> f64 { 1.0 }
fn default_mark_edge_tolerance_px() -> f64 { 5.0 }
fn default_zoom_to_range_border_px() -> f64 { 25.0 }
fn default_min_zoom_range() -> f64 { 5.0 }
fn default_page_step() -> f64 { 0.9 }
fn default_line_step() -> f64 { 0.1 }
fn default_pending_policy() -> PendingPolicy { PendingPolicy::Reject }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_canvas_pixels: default_max_canvas_pixels(),
            max_pixels_per_base: default_max_pixels_per_base(),
            border_pixels: default_border_pixels(),
            zoom_epsilon: default_zoom_epsilon(),
            history_depth: default_history_depth(),
            mark_min_width: default_mark_min_width(),
            mark_edge_tolerance_px: default_mark_edge_tolerance_px(),
            zoom_to_range_border_px: default_zoom_to_range_border_px(),
            min_zoom_range: default_min_zoom_range(),
            page_step: default_page_step(),
            line_step: default_line_step(),
            pending_policy: default_pending_policy(),
        }
    }
}

impl EngineConfig {
    /// Check that every value is usable before any viewport is built from it.
    pub fn validate(&self) -> ViewportResult<()> {
        fn positive(field: &str, value: f64) -> ViewportResult<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ViewportError::invalid_config(
                    field.to_string(),
                    format!("must be positive, got {}", value),
                ))
            }
        }

        fn non_negative(field: &str, value: f64) -> ViewportResult<()> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ViewportError::invalid_config(
                    field.to_string(),
                    format!("must not be negative, got {}", value),
                ))
            }
        }

        fn fraction(field: &str, value: f64) -> ViewportResult<()> {
            if value.is_finite() && value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(ViewportError::invalid_config(
                    field.to_string(),
                    format!("must lie in (0, 1], got {}", value),
                ))
            }
        }

        positive("max_canvas_pixels", self.max_canvas_pixels)?;
        positive("max_pixels_per_base", self.max_pixels_per_base)?;
        non_negative("border_pixels", self.border_pixels)?;
        non_negative("zoom_epsilon", self.zoom_epsilon)?;
        positive("mark_min_width", self.mark_min_width)?;
        non_negative("mark_edge_tolerance_px", self.mark_edge_tolerance_px)?;
        non_negative("zoom_to_range_border_px", self.zoom_to_range_border_px)?;
        non_negative("min_zoom_range", self.min_zoom_range)?;
        fraction("page_step", self.page_step)?;
        fraction("line_step", self.line_step)?;

        if self.history_depth == 0 {
            return Err(ViewportError::invalid_config(
                "history_depth",
                "must keep at least one entry",
            ));
        }
        if self.history_depth > MAX_HISTORY_DEPTH {
            return Err(ViewportError::invalid_config(
                "history_depth",
                "must not keep more than 10000 entries",
            ));
        }

        Ok(())
    }
}
