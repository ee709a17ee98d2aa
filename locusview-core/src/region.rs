//! Visible region management
//!
//! The region is the stretch of sequence laid out on the canvas. Its span is
//! capped by the canvas pixel budget at the current zoom, and it never leaves
//! the sequence bounds.

use crate::clamp::{clamp_span_to_limits, clamp_to_limits, limit_span, normalize, ClampType, Pin};
use crate::config::EngineConfig;
use crate::error::{ensure_finite, ViewportResult};
use crate::types::{SeqCoord, SequenceBounds};

#[derive(Debug, Clone)]
pub struct RegionManager {
    bounds: SequenceBounds,
    start: SeqCoord,
    end: SeqCoord,
    max_canvas_pixels: f64,
    border_px: f64,
}

impl RegionManager {
    pub fn new(bounds: SequenceBounds, config: &EngineConfig) -> Self {
        Self {
            bounds,
            start: bounds.min,
            end: bounds.max,
            max_canvas_pixels: config.max_canvas_pixels,
            border_px: config.border_pixels,
        }
    }

    /// Region a viewport opens on: the widest span the canvas holds at
    /// `zoom`, centred on the sequence.
    pub fn opening(bounds: SequenceBounds, config: &EngineConfig, zoom: f64) -> Self {
        let mut region = Self::new(bounds, config);
        let (start, end) = region.span_around(bounds.center(), zoom);
        region.commit(start, end);
        region
    }

    pub fn bounds(&self) -> &SequenceBounds {
        &self.bounds
    }

    pub fn start(&self) -> SeqCoord {
        self.start
    }

    pub fn end(&self) -> SeqCoord {
        self.end
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    pub fn center(&self) -> SeqCoord {
        (self.start + self.end) / 2.0
    }

    /// Widest region the canvas can hold at `zoom`, in bases
    pub fn max_canvas_span(&self, zoom: f64) -> f64 {
        self.max_canvas_pixels / zoom
    }

    /// Compute where `set_region(start, end)` would land without committing.
    pub fn fit(&self, start: SeqCoord, end: SeqCoord, zoom: f64, pin: Pin) -> ViewportResult<(SeqCoord, SeqCoord)> {
        let start = ensure_finite("region start", start)?;
        let end = ensure_finite("region end", end)?;
        Ok(self.limit(start, end, zoom, pin))
    }

    fn limit(&self, start: SeqCoord, end: SeqCoord, zoom: f64, pin: Pin) -> (SeqCoord, SeqCoord) {
        let (start, end) = normalize(start, end);
        let (start, end) = limit_span(start, end, self.max_canvas_span(zoom), pin);
        let (start, end, _) = clamp_span_to_limits(&self.bounds, start, end);
        (start, end)
    }

    fn span_around(&self, anchor: SeqCoord, zoom: f64) -> (SeqCoord, SeqCoord) {
        let canvas_px = self.max_canvas_pixels.min(self.bounds.length() * zoom);
        let half = canvas_px / zoom / 2.0;
        self.limit(anchor - half, anchor + half, zoom, Pin::None)
    }

    /// Region of the widest allowed span at `zoom`, centred on `anchor`.
    pub fn fit_around(&self, anchor: SeqCoord, zoom: f64) -> ViewportResult<(SeqCoord, SeqCoord)> {
        let anchor = ensure_finite("zoom anchor", anchor)?;
        Ok(self.span_around(anchor, zoom))
    }

    /// Store a region produced by `fit` or `fit_around`.
    pub fn commit(&mut self, start: SeqCoord, end: SeqCoord) -> bool {
        let changed = start != self.start || end != self.end;
        self.start = start;
        self.end = end;
        changed
    }

    pub fn set_region(&mut self, start: SeqCoord, end: SeqCoord, zoom: f64, pin: Pin) -> ViewportResult<bool> {
        let (start, end) = self.fit(start, end, zoom, pin)?;
        Ok(self.commit(start, end))
    }

    pub fn recenter(&mut self, anchor: SeqCoord, zoom: f64) -> ViewportResult<bool> {
        let (start, end) = self.fit_around(anchor, zoom)?;
        Ok(self.commit(start, end))
    }

    /// Region plus a border of `border_pixels` at `zoom` on each side; the
    /// border is cut back where it would pass the sequence ends.
    pub fn padded_extent(&self, zoom: f64) -> (SeqCoord, SeqCoord, ClampType) {
        let border = self.border_px / zoom;
        clamp_to_limits(&self.bounds, self.start - border, self.end + border)
    }

    /// Flip the region onto the opposite strand.
    pub fn mirror(&mut self) {
        let start = self.bounds.mirror(self.end);
        let end = self.bounds.mirror(self.start);
        self.start = start;
        self.end = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(max_canvas_pixels: f64) -> RegionManager {
        let config = EngineConfig {
            max_canvas_pixels,
            border_pixels: 10.0,
            ..EngineConfig::default()
        };
        RegionManager::new(SequenceBounds::new(1.0, 100000.0).unwrap(), &config)
    }

    #[test]
    fn test_set_region_caps_span() {
        let mut region = manager(1000.0);
        // At 0.1 px/base the canvas holds 10000 bases
        region.set_region(20000.0, 60000.0, 0.1, Pin::None).unwrap();
        assert_eq!(region.start(), 35000.0);
        assert_eq!(region.end(), 45000.0);

        region.set_region(20000.0, 60000.0, 0.1, Pin::Start).unwrap();
        assert_eq!((region.start(), region.end()), (20000.0, 30000.0));
    }

    #[test]
    fn test_set_region_stays_in_bounds() {
        let mut region = manager(30000.0);
        region.set_region(-500.0, 1500.0, 1.0, Pin::None).unwrap();
        assert_eq!((region.start(), region.end()), (1.0, 2001.0));

        region.set_region(99000.0, 101000.0, 1.0, Pin::None).unwrap();
        assert_eq!((region.start(), region.end()), (98000.0, 100000.0));
    }

    #[test]
    fn test_set_region_rejects_nan() {
        let mut region = manager(30000.0);
        assert!(region.set_region(f64::NAN, 10.0, 1.0, Pin::None).is_err());
        assert_eq!((region.start(), region.end()), (1.0, 100000.0));
    }

    #[test]
    fn test_recenter_on_anchor() {
        let mut region = manager(50.0);
        region.recenter(50000.0, 0.04).unwrap();
        assert_eq!(region.span(), 1250.0);
        assert_eq!(region.center(), 50000.0);
    }

    #[test]
    fn test_recenter_whole_sequence_when_it_fits() {
        let mut region = manager(30000.0);
        region.recenter(10.0, 0.01).unwrap();
        assert_eq!((region.start(), region.end()), (1.0, 100000.0));
    }

    #[test]
    fn test_opening_region_fits_canvas() {
        let config = EngineConfig::default();
        let bounds = SequenceBounds::new(1.0, 100000.0).unwrap();
        let region = RegionManager::opening(bounds, &config, 1.0);
        assert_eq!(region.span(), 30000.0);
        assert_eq!(region.center(), 50000.5);
        assert!(region.span() <= region.max_canvas_span(1.0));

        let short = SequenceBounds::new(1.0, 500.0).unwrap();
        let region = RegionManager::opening(short, &config, 1.0);
        assert_eq!((region.start(), region.end()), (1.0, 500.0));
    }

    #[test]
    fn test_padded_extent_drops_border_at_edges() {
        let mut region = manager(30000.0);
        region.set_region(1.0, 1000.0, 1.0, Pin::None).unwrap();
        let (start, end, clamp) = region.padded_extent(1.0);
        assert_eq!((start, end), (1.0, 1010.0));
        assert_eq!(clamp, ClampType::START);

        region.set_region(5000.0, 6000.0, 1.0, Pin::None).unwrap();
        let (start, end, clamp) = region.padded_extent(0.5);
        assert_eq!((start, end), (4980.0, 6020.0));
        assert!(clamp.is_empty());
    }

    #[test]
    fn test_mirror() {
        let mut region = manager(30000.0);
        region.set_region(1.0, 1000.0, 1.0, Pin::None).unwrap();
        region.mirror();
        assert_eq!((region.start(), region.end()), (99001.0, 100000.0));
    }
}
