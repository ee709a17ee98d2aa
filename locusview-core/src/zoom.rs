//! Zoom factor bookkeeping
//!
//! The zoom factor is measured in pixels per base. The lower limit fits the
//! whole sequence into the measured surface height; the upper limit comes
//! from configuration. When the lower limit reaches the upper one the
//! sequence is short enough to show at maximum zoom and the factor is fixed.

use crate::config::EngineConfig;
use crate::error::{ViewportError, ViewportResult};
use crate::types::{SequenceBounds, ZoomStatus};

/// Smallest zoom factor ever produced, whatever the surface height
const MIN_ZOOM_FLOOR: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct ZoomController {
    factor: f64,
    min_zoom: f64,
    max_zoom: f64,
    status: ZoomStatus,
    epsilon: f64,
    border_px: f64,
    sequence_length: f64,
    height_px: Option<f64>,
}

impl ZoomController {
    pub fn new(bounds: &SequenceBounds, config: &EngineConfig) -> Self {
        Self {
            factor: config.max_pixels_per_base,
            min_zoom: config.max_pixels_per_base,
            max_zoom: config.max_pixels_per_base,
            status: ZoomStatus::Init,
            epsilon: config.zoom_epsilon,
            border_px: config.border_pixels,
            sequence_length: bounds.length(),
            height_px: None,
        }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    pub fn status(&self) -> ZoomStatus {
        self.status
    }

    pub fn height_px(&self) -> Option<f64> {
        self.height_px
    }

    pub fn is_measured(&self) -> bool {
        self.height_px.is_some()
    }

    /// How far in we are relative to the zoom ceiling
    pub fn magnification(&self) -> f64 {
        self.max_zoom / self.factor
    }

    pub fn bases_per_pixel(&self) -> f64 {
        1.0 / self.factor
    }

    fn min_zoom_for_height(&self, height_px: f64) -> f64 {
        let usable = (height_px - 2.0 * self.border_px).max(1.0);
        (usable / self.sequence_length).max(MIN_ZOOM_FLOOR)
    }

    fn update_status(&mut self) {
        self.status = if self.min_zoom >= self.max_zoom {
            self.min_zoom = self.max_zoom;
            self.factor = self.max_zoom;
            ZoomStatus::Fixed
        } else if self.factor >= self.max_zoom {
            self.factor = self.max_zoom;
            ZoomStatus::Max
        } else if self.factor <= self.min_zoom {
            self.factor = self.min_zoom;
            ZoomStatus::Min
        } else {
            ZoomStatus::Mid
        };
    }

    /// Recompute the limits for a new surface height.
    ///
    /// A first measurement fits the whole sequence. Afterwards a viewport
    /// sitting at the minimum stays there and any factor that has fallen
    /// below the new minimum is raised to it. Returns true if the factor
    /// changed.
    pub fn handle_resize(&mut self, height_px: f64) -> bool {
        let previous = self.factor;
        let was_at_min = matches!(
            self.status,
            ZoomStatus::Init | ZoomStatus::Min | ZoomStatus::Fixed
        );

        self.min_zoom = self.min_zoom_for_height(height_px);
        self.height_px = Some(height_px);

        if was_at_min || self.factor < self.min_zoom {
            self.factor = self.min_zoom;
        }
        self.update_status();

        log::debug!(
            "Resize to {}px: zoom {} -> {} (min {}, max {}, {:?})",
            height_px,
            previous,
            self.factor,
            self.min_zoom,
            self.max_zoom,
            self.status
        );

        (self.factor - previous).abs() > f64::EPSILON
    }

    /// Forget the surface; the limits stay as they were until it comes back
    pub fn surface_lost(&mut self) {
        self.height_px = None;
    }

    /// Whether a zoom by `multiplier` could move the factor at all
    pub fn can_zoom_by(&self, multiplier: f64) -> bool {
        match self.status {
            ZoomStatus::Fixed => false,
            ZoomStatus::Max => multiplier < 1.0,
            ZoomStatus::Min => multiplier > 1.0,
            ZoomStatus::Init | ZoomStatus::Mid => true,
        }
    }

    /// Work out the factor a zoom by `multiplier` would land on, without
    /// committing it. `Ok(None)` means nothing would change.
    pub fn candidate(&self, multiplier: f64) -> ViewportResult<Option<f64>> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ViewportError::invalid_zoom_factor(multiplier));
        }

        if (multiplier - 1.0).abs() <= self.epsilon || !self.can_zoom_by(multiplier) {
            return Ok(None);
        }

        let candidate = self.clamp(self.factor * multiplier);
        if (candidate - self.factor).abs() <= f64::EPSILON * self.factor {
            Ok(None)
        } else {
            Ok(Some(candidate))
        }
    }

    pub fn clamp(&self, factor: f64) -> f64 {
        if self.min_zoom >= self.max_zoom {
            self.max_zoom
        } else {
            factor.clamp(self.min_zoom, self.max_zoom)
        }
    }

    /// Commit a factor, clamped into the current limits. Returns the value
    /// actually stored.
    pub fn set_factor(&mut self, factor: f64) -> f64 {
        self.factor = self.clamp(factor);
        self.update_status();
        self.factor
    }

    /// Zoom by `multiplier`, returning the new factor if it moved.
    pub fn zoom_by(&mut self, multiplier: f64) -> ViewportResult<Option<f64>> {
        let candidate = self.candidate(multiplier)?;
        Ok(candidate.map(|factor| self.set_factor(factor)))
    }

    /// Factor that fits `span` bases into the surface, less `border_px`
    /// pixels top and bottom. `None` until the surface is measured.
    pub fn factor_for_span(&self, span: f64, border_px: f64) -> Option<f64> {
        let height = self.height_px?;
        let usable = (height - 2.0 * border_px).max(1.0);
        Some(self.clamp(usable / span.max(1.0)))
    }
}
