//! One viewport onto a sequence
//!
//! Owns zoom, region, mark, history and the deferred draw state for a single
//! window and reports every visible change to the observer. Changes are
//! computed in full before anything is committed, so a failing request leaves
//! the viewport untouched.

use std::rc::Rc;

use crate::busy::{BusyGuard, BusyIndicator};
use crate::clamp::{clamp_to_limits, ClampType, Pin};
use crate::config::EngineConfig;
use crate::error::{ensure_finite, ViewportError, ViewportResult};
use crate::history::{HistoryEntry, HistoryStack};
use crate::lock::PropagatedOp;
use crate::mark::{DragOutcome, DragPhase, Mark, MarkEdge, MarkRegion};
use crate::observer::ViewportObserver;
use crate::region::RegionManager;
use crate::scheduler::{DeferredDrawScheduler, Offer, PendingDrawRequest, SchedulerState};
use crate::types::{
    ContextDiff, ExportScope, LockAxis, RegionStep, SeqCoord, SequenceBounds, ViewportId,
    ViewportState, VisibilityChange, ZoomStatus,
};
use crate::zoom::ZoomController;

/// What happened to a batch of new data
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawDisposition {
    Dispatched,
    Deferred,
    Rejected,
}

pub struct Viewport {
    id: ViewportId,
    bounds: SequenceBounds,
    config: EngineConfig,
    zoom: ZoomController,
    region: RegionManager,
    marks: MarkRegion,
    history: HistoryStack,
    scheduler: DeferredDrawScheduler,
    busy: Rc<BusyIndicator>,
    observer: Rc<dyn ViewportObserver>,
    reversed: bool,
}

impl Viewport {
    pub fn new(
        id: ViewportId,
        bounds: SequenceBounds,
        config: &EngineConfig,
        observer: Rc<dyn ViewportObserver>,
    ) -> Self {
        let zoom = ZoomController::new(&bounds, config);
        let region = RegionManager::opening(bounds, config, zoom.factor());

        Self {
            id,
            bounds,
            config: config.clone(),
            zoom,
            region,
            marks: MarkRegion::new(bounds, config),
            history: HistoryStack::new(config.history_depth),
            scheduler: DeferredDrawScheduler::new(config.pending_policy),
            busy: Rc::new(BusyIndicator::new(id, Rc::clone(&observer))),
            observer,
            reversed: false,
        }
    }

    /// A new viewport showing the same place, with its own history and
    /// draw queue.
    pub fn duplicate(&self, id: ViewportId) -> Self {
        let mut marks = self.marks.clone();
        marks.cancel_drag();

        Self {
            id,
            bounds: self.bounds,
            config: self.config.clone(),
            zoom: self.zoom.clone(),
            region: self.region.clone(),
            marks,
            history: HistoryStack::new(self.config.history_depth),
            scheduler: DeferredDrawScheduler::new(self.config.pending_policy),
            busy: Rc::new(BusyIndicator::new(id, Rc::clone(&self.observer))),
            observer: Rc::clone(&self.observer),
            reversed: self.reversed,
        }
    }

    pub fn id(&self) -> ViewportId {
        self.id
    }

    pub fn bounds(&self) -> &SequenceBounds {
        &self.bounds
    }

    pub fn region(&self) -> (SeqCoord, SeqCoord) {
        (self.region.start(), self.region.end())
    }

    pub fn region_center(&self) -> SeqCoord {
        self.region.center()
    }

    pub fn zoom_factor(&self) -> f64 {
        self.zoom.factor()
    }

    pub fn zoom_status(&self) -> ZoomStatus {
        self.zoom.status()
    }

    pub fn mark(&self) -> Mark {
        self.marks.mark()
    }

    pub fn is_measured(&self) -> bool {
        self.zoom.is_measured()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn drag_phase(&self) -> DragPhase {
        self.marks.drag_phase()
    }

    pub fn magnification(&self) -> f64 {
        self.zoom.magnification()
    }

    /// Region plus border padding, cut back at the sequence ends
    pub fn padded_extent(&self) -> (SeqCoord, SeqCoord, ClampType) {
        self.region.padded_extent(self.zoom.factor())
    }

    pub fn snapshot(&self, lock_axis: LockAxis) -> ViewportState {
        ViewportState {
            viewport: self.id,
            region_start: self.region.start(),
            region_end: self.region.end(),
            zoom_factor: self.zoom.factor(),
            min_zoom: self.zoom.min_zoom(),
            max_zoom: self.zoom.max_zoom(),
            zoom_status: self.zoom.status(),
            sequence_min: self.bounds.min,
            sequence_max: self.bounds.max,
            max_canvas_span: self.region.max_canvas_span(self.zoom.factor()),
            mark: self.marks.mark(),
            reversed: self.reversed,
            lock_axis,
        }
    }

    pub fn history_entry(&self) -> HistoryEntry {
        let mark = self.marks.mark();
        HistoryEntry {
            region_start: self.region.start(),
            region_end: self.region.end(),
            zoom_factor: self.zoom.factor(),
            mark: mark.set.then_some(mark),
            reversed: self.reversed,
        }
    }

    fn visibility(&self) -> VisibilityChange {
        VisibilityChange {
            region_start: self.region.start(),
            region_end: self.region.end(),
            zoom_status: self.zoom.status(),
        }
    }

    fn announce_visibility(&self) {
        self.observer.visibility_changed(self.id, &self.visibility());
    }

    fn announce_mark(&self) {
        self.observer.mark_changed(self.id, &self.marks.mark());
    }

    fn require_surface(&self) -> ViewportResult<()> {
        if self.zoom.is_measured() {
            Ok(())
        } else {
            Err(ViewportError::surface_not_measured(self.id))
        }
    }

    /// The drawing surface has been laid out at `height_px`. A zero height
    /// means the surface cannot be drawn on yet.
    pub fn surface_measured(&mut self, height_px: f64) -> ViewportResult<()> {
        let height_px = ensure_finite("surface height", height_px)?;
        if height_px <= 0.0 {
            log::debug!("Viewport {}: surface reported {}px, not drawable", self.id, height_px);
            self.zoom.surface_lost();
            return Ok(());
        }

        self.fit_to_height(height_px)?;

        let batch = self.scheduler.surface_measured();
        if !batch.is_empty() {
            log::debug!("Viewport {}: surface ready, drawing {} deferred request(s)", self.id, batch.len());
            self.dispatch(batch);
        }

        Ok(())
    }

    /// The hosting window changed height.
    pub fn resize(&mut self, height_px: f64) -> ViewportResult<()> {
        if !self.zoom.is_measured() {
            return self.surface_measured(height_px);
        }

        let height_px = ensure_finite("surface height", height_px)?;
        if height_px <= 0.0 {
            self.zoom.surface_lost();
            return Ok(());
        }

        self.fit_to_height(height_px)
    }

    /// Only a first measurement or a changed factor re-centres the region;
    /// otherwise the region the user chose is kept and just re-clamped.
    fn fit_to_height(&mut self, height_px: f64) -> ViewportResult<()> {
        let first = self.zoom.status() == ZoomStatus::Init;
        let previous_status = self.zoom.status();

        let mut zoom = self.zoom.clone();
        let rescaled = zoom.handle_resize(height_px);
        let (start, end) = if first {
            self.region.fit_around(self.bounds.center(), zoom.factor())?
        } else if rescaled {
            self.region.fit_around(self.region.center(), zoom.factor())?
        } else {
            self.region.fit(self.region.start(), self.region.end(), zoom.factor(), Pin::None)?
        };

        let status_changed = zoom.status() != previous_status;
        self.zoom = zoom;
        let moved = self.region.commit(start, end);
        if first || rescaled || moved || status_changed {
            self.announce_visibility();
        }
        Ok(())
    }

    /// Zoom by `multiplier` keeping `anchor` (default: region centre) in
    /// the middle. Returns false if the zoom level would not change.
    pub fn zoom(&mut self, multiplier: f64, anchor: Option<SeqCoord>) -> ViewportResult<bool> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ViewportError::invalid_zoom_factor(multiplier));
        }
        self.require_surface()?;

        let Some(factor) = self.zoom.candidate(multiplier)? else {
            log::debug!("Viewport {}: zoom by {} leaves zoom unchanged", self.id, multiplier);
            return Ok(false);
        };

        let anchor = match anchor {
            Some(anchor) => self.bounds.clamp(ensure_finite("zoom anchor", anchor)?),
            None => self.region.center(),
        };
        let (start, end) = self.region.fit_around(anchor, factor)?;

        let _busy = BusyGuard::new(&self.busy);
        self.history.push(self.history_entry());
        self.zoom.set_factor(factor);
        self.region.commit(start, end);

        log::debug!(
            "Viewport {}: zoom {} about {} -> region {}..{}",
            self.id,
            self.zoom.factor(),
            anchor,
            start,
            end
        );
        self.announce_visibility();
        Ok(true)
    }

    /// Scroll to show `start..end`. Returns false if the region would not
    /// change.
    pub fn move_to(&mut self, start: SeqCoord, end: SeqCoord) -> ViewportResult<bool> {
        let (start, end) = self.region.fit(start, end, self.zoom.factor(), Pin::None)?;
        if (start, end) == self.region() {
            return Ok(false);
        }

        let _busy = BusyGuard::new(&self.busy);
        self.history.push(self.history_entry());
        self.region.commit(start, end);
        self.announce_visibility();
        Ok(true)
    }

    /// Bounds a scroll step would move to
    pub fn step_bounds(&self, step: RegionStep) -> (SeqCoord, SeqCoord) {
        let span = self.region.span();
        let delta = match step {
            RegionStep::PageUp => -span * self.config.page_step,
            RegionStep::PageDown => span * self.config.page_step,
            RegionStep::LineUp => -span * self.config.line_step,
            RegionStep::LineDown => span * self.config.line_step,
        };
        (self.region.start() + delta, self.region.end() + delta)
    }

    pub fn step_region(&mut self, step: RegionStep) -> ViewportResult<bool> {
        let (start, end) = self.step_bounds(step);
        self.move_to(start, end)
    }

    /// Zoom so `start..end` fills the surface, centred on its middle.
    /// Ranges shorter than the configured minimum are ignored.
    pub fn zoom_to_range(&mut self, start: SeqCoord, end: SeqCoord) -> ViewportResult<bool> {
        let start = ensure_finite("range start", start)?;
        let end = ensure_finite("range end", end)?;
        self.require_surface()?;

        let (start, end, _) = clamp_to_limits(&self.bounds, start, end);
        if end - start < self.config.min_zoom_range {
            log::debug!(
                "Viewport {}: range {}..{} too short to zoom to",
                self.id,
                start,
                end
            );
            return Ok(false);
        }

        let factor = self
            .zoom
            .factor_for_span(end - start + 1.0, self.config.zoom_to_range_border_px)
            .ok_or_else(|| ViewportError::surface_not_measured(self.id))?;
        let (region_start, region_end) = self.region.fit_around((start + end) / 2.0, factor)?;

        if factor == self.zoom.factor() && (region_start, region_end) == self.region() {
            return Ok(false);
        }

        let _busy = BusyGuard::new(&self.busy);
        self.history.push(self.history_entry());
        self.zoom.set_factor(factor);
        self.region.commit(region_start, region_end);
        self.announce_visibility();
        Ok(true)
    }

    pub fn zoom_to_mark(&mut self) -> ViewportResult<bool> {
        let (start, end) = self
            .marks
            .mark()
            .range()
            .ok_or_else(|| ViewportError::mark_not_set(self.id))?;
        self.zoom_to_range(start, end)
    }

    pub fn set_mark(&mut self, start: SeqCoord, end: SeqCoord) -> ViewportResult<Mark> {
        let mark = self.marks.resolve(start, end)?;

        let _busy = BusyGuard::new(&self.busy);
        self.marks.commit(mark);
        self.announce_mark();
        Ok(mark)
    }

    pub fn clear_mark(&mut self) -> bool {
        if self.marks.clear() {
            self.announce_mark();
            true
        } else {
            false
        }
    }

    pub fn move_mark_edge(&mut self, edge: MarkEdge, value: SeqCoord) -> ViewportResult<Mark> {
        let mark = self
            .marks
            .move_edge(edge, value)?
            .ok_or_else(|| ViewportError::mark_not_set(self.id))?;
        self.announce_mark();
        Ok(mark)
    }

    pub fn pointer_moved(&mut self, pos: SeqCoord) -> ViewportResult<DragPhase> {
        self.marks.pointer_moved(pos, self.zoom.factor())
    }

    pub fn button_pressed(&mut self) -> bool {
        self.marks.button_pressed()
    }

    pub fn button_released(&mut self, pos: SeqCoord) -> ViewportResult<DragOutcome> {
        let _busy = BusyGuard::new(&self.busy);
        let outcome = self.marks.button_released(pos)?;
        if !matches!(outcome, DragOutcome::NoDrag) {
            self.announce_mark();
        }
        Ok(outcome)
    }

    pub fn pointer_left(&mut self) {
        self.marks.pointer_left();
    }

    pub fn pointer_entered(&mut self) {
        self.marks.pointer_entered();
    }

    /// Go back to the most recent snapshot. `Ok(None)` when there is
    /// nothing to go back to.
    pub fn back(&mut self) -> ViewportResult<Option<HistoryEntry>> {
        let Some(entry) = self.history.pop() else {
            log::info!("Viewport {}: nothing to go back to", self.id);
            return Ok(None);
        };

        match self.restore(&entry) {
            Ok(()) => Ok(Some(entry)),
            Err(err) => {
                self.history.push(entry);
                Err(err)
            }
        }
    }

    /// Apply a snapshot. Region, zoom and mark are all resolved before any
    /// of them is stored.
    pub fn restore(&mut self, entry: &HistoryEntry) -> ViewportResult<()> {
        let entry = entry.oriented(&self.bounds, self.reversed);

        let factor = self.zoom.clamp(ensure_finite("zoom factor", entry.zoom_factor)?);
        let (start, end) = self.region.fit(entry.region_start, entry.region_end, factor, Pin::None)?;
        let mark = match entry.mark.and_then(|mark| mark.range()) {
            Some((mark_start, mark_end)) => self.marks.resolve(mark_start, mark_end)?,
            None => Mark::unset(),
        };

        let _busy = BusyGuard::new(&self.busy);
        let mark_changed = mark != self.marks.mark();
        self.zoom.set_factor(factor);
        self.region.commit(start, end);
        if mark.set {
            self.marks.commit(mark);
        } else {
            self.marks.clear();
        }

        self.announce_visibility();
        if mark_changed {
            self.announce_mark();
        }
        Ok(())
    }

    /// Switch to the opposite strand. The region is mirrored and the mark
    /// cleared.
    pub fn reverse(&mut self) {
        let _busy = BusyGuard::new(&self.busy);
        self.region.mirror();
        self.reversed = !self.reversed;
        let had_mark = self.marks.clear();

        log::info!(
            "Viewport {}: now showing {} strand",
            self.id,
            if self.reversed { "reverse" } else { "forward" }
        );
        self.announce_visibility();
        if had_mark {
            self.announce_mark();
        }
    }

    /// Hand over new feature data. It is drawn at once if the surface is
    /// measured, otherwise parked until it is.
    pub fn notify_new_data(&mut self, diff: ContextDiff, restore: Option<HistoryEntry>) -> DrawDisposition {
        let request = PendingDrawRequest { diff, restore };
        match self.scheduler.offer(request, self.zoom.is_measured()) {
            Offer::Dispatch(batch) => {
                self.dispatch(batch);
                DrawDisposition::Dispatched
            }
            Offer::Deferred => DrawDisposition::Deferred,
            Offer::Rejected => DrawDisposition::Rejected,
        }
    }

    fn dispatch(&mut self, batch: Vec<PendingDrawRequest>) {
        for request in batch {
            if let Some(entry) = request.restore {
                if let Err(err) = self.restore(&entry) {
                    log::warn!("Viewport {}: could not restore state before drawing: {}", self.id, err);
                }
            }
            self.observer.draw_ready(self.id, &request.diff);
        }
        self.scheduler.dispatched();
    }

    /// Coordinates handed to external exporters
    pub fn export_range(&self, scope: ExportScope) -> (SeqCoord, SeqCoord) {
        match scope {
            ExportScope::Visible => self.region(),
            ExportScope::Mark => self.marks.mark().range().unwrap_or_else(|| self.region()),
            ExportScope::Sequence => (self.bounds.min, self.bounds.max),
        }
    }

    /// Apply one fanned-out operation from a lock group.
    pub fn apply(&mut self, op: &PropagatedOp) -> ViewportResult<bool> {
        match *op {
            PropagatedOp::Zoom { multiplier, anchor } => self.zoom(multiplier, anchor),
            PropagatedOp::Move { start, end } => self.move_to(start, end),
            PropagatedOp::MarkSet { start, end } => self.set_mark(start, end).map(|_| true),
        }
    }
}

impl std::fmt::Debug for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewport")
            .field("id", &self.id)
            .field("region", &self.region())
            .field("zoom", &self.zoom.factor())
            .field("status", &self.zoom.status())
            .field("mark", &self.marks.mark())
            .field("reversed", &self.reversed)
            .finish()
    }
}
