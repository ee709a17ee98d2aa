//! Entry point for hosts
//!
//! `ViewCoordinator` owns every open viewport and the lock registry. All
//! requests go through it so lock groups can be honoured, and it drains the
//! message channel that loader threads post new data into.

use crossbeam_channel::{unbounded, Receiver, SendError, Sender};
use indexmap::IndexMap;
use std::rc::Rc;

use crate::config::EngineConfig;
use crate::error::{ensure_finite, ViewportError, ViewportResult};
use crate::history::HistoryEntry;
use crate::lock::{LockRegistry, PropagatedOp};
use crate::mark::{DragOutcome, Mark};
use crate::observer::ViewportObserver;
use crate::types::{
    ContextDiff, ExportScope, LockAxis, RegionStep, SeqCoord, SequenceBounds, ViewportId,
    ViewportState, ZoomStep,
};
use crate::viewport::{DrawDisposition, Viewport};

/// Messages posted to the coordinator from other threads
#[derive(Debug)]
pub enum EngineMessage {
    NewData {
        viewport: ViewportId,
        diff: ContextDiff,
        restore: Option<HistoryEntry>,
    },
    SurfaceMeasured {
        viewport: ViewportId,
        height_px: f64,
    },
}

/// Cloneable handle for posting messages from loader threads
#[derive(Debug, Clone)]
pub struct EngineSender {
    inner: Sender<EngineMessage>,
}

impl EngineSender {
    pub fn send(&self, message: EngineMessage) -> Result<(), SendError<EngineMessage>> {
        self.inner.send(message)
    }

    pub fn new_data(
        &self,
        viewport: ViewportId,
        diff: ContextDiff,
        restore: Option<HistoryEntry>,
    ) -> Result<(), SendError<EngineMessage>> {
        self.send(EngineMessage::NewData { viewport, diff, restore })
    }

    pub fn surface_measured(&self, viewport: ViewportId, height_px: f64) -> Result<(), SendError<EngineMessage>> {
        self.send(EngineMessage::SurfaceMeasured { viewport, height_px })
    }
}

/// Outcome of an operation fanned out over a lock group
#[derive(Debug, Clone)]
pub struct PropagationReport {
    pub origin: ViewportId,
    pub op: PropagatedOp,
    /// Members whose state changed
    pub applied: Vec<ViewportId>,
    /// Members already where the op would put them
    pub unchanged: Vec<ViewportId>,
    pub failed: Vec<(ViewportId, ViewportError)>,
}

impl PropagationReport {
    fn new(origin: ViewportId, op: PropagatedOp) -> Self {
        Self {
            origin,
            op,
            applied: Vec::new(),
            unchanged: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

pub struct ViewCoordinator {
    config: EngineConfig,
    observer: Rc<dyn ViewportObserver>,
    viewports: IndexMap<ViewportId, Viewport>,
    locks: LockRegistry,
    next_id: u32,
    sender: Sender<EngineMessage>,
    receiver: Receiver<EngineMessage>,
}

impl ViewCoordinator {
    pub fn new(config: EngineConfig, observer: Rc<dyn ViewportObserver>) -> ViewportResult<Self> {
        config.validate()?;
        let (sender, receiver) = unbounded();

        Ok(Self {
            config,
            observer,
            viewports: IndexMap::new(),
            locks: LockRegistry::new(),
            next_id: 1,
            sender,
            receiver,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    pub fn viewport_ids(&self) -> Vec<ViewportId> {
        self.viewports.keys().copied().collect()
    }

    pub fn viewport(&self, id: ViewportId) -> ViewportResult<&Viewport> {
        self.viewports
            .get(&id)
            .ok_or_else(|| ViewportError::unknown_viewport(id))
    }

    /// Direct access for pointer handling and queries that do not involve
    /// lock groups
    pub fn viewport_mut(&mut self, id: ViewportId) -> ViewportResult<&mut Viewport> {
        self.viewports
            .get_mut(&id)
            .ok_or_else(|| ViewportError::unknown_viewport(id))
    }

    pub fn state(&self, id: ViewportId) -> ViewportResult<ViewportState> {
        Ok(self.viewport(id)?.snapshot(self.locks.axis_of(id)))
    }

    fn allocate_id(&mut self) -> ViewportId {
        let id = ViewportId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn open_viewport(&mut self, bounds: SequenceBounds) -> ViewportId {
        let id = self.allocate_id();
        let viewport = Viewport::new(id, bounds, &self.config, Rc::clone(&self.observer));
        self.viewports.insert(id, viewport);
        log::info!("Opened viewport {} on {}..{}", id, bounds.min, bounds.max);
        id
    }

    /// Open a copy of `source` at the same position. A locked source takes
    /// its copy into the same lock group.
    pub fn duplicate_viewport(&mut self, source: ViewportId) -> ViewportResult<ViewportId> {
        let id = self.allocate_id();
        let copy = self.viewport(source)?.duplicate(id);
        self.viewports.insert(id, copy);
        self.locks.copy_lock(source, id);
        log::info!("Duplicated viewport {} as {}", source, id);
        Ok(id)
    }

    pub fn close_viewport(&mut self, id: ViewportId) -> ViewportResult<()> {
        if self.viewports.shift_remove(&id).is_none() {
            return Err(ViewportError::unknown_viewport(id));
        }
        if self.locks.is_locked(id) {
            self.locks.unlock(id)?;
        }
        log::info!("Closed viewport {}", id);
        Ok(())
    }

    pub fn notify_surface_measured(&mut self, id: ViewportId, height_px: f64) -> ViewportResult<()> {
        self.viewport_mut(id)?.surface_measured(height_px)
    }

    pub fn notify_new_data(
        &mut self,
        id: ViewportId,
        diff: ContextDiff,
        restore: Option<HistoryEntry>,
    ) -> ViewportResult<DrawDisposition> {
        Ok(self.viewport_mut(id)?.notify_new_data(diff, restore))
    }

    pub fn request_zoom(&mut self, id: ViewportId, multiplier: f64) -> ViewportResult<PropagationReport> {
        self.request_zoom_at(id, multiplier, None)
    }

    /// Zoom about `anchor`, or the region centre when `None`. Members of a
    /// vertical lock group all zoom about the same anchor.
    pub fn request_zoom_at(
        &mut self,
        id: ViewportId,
        multiplier: f64,
        anchor: Option<SeqCoord>,
    ) -> ViewportResult<PropagationReport> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ViewportError::invalid_zoom_factor(multiplier));
        }
        if let Some(anchor) = anchor {
            ensure_finite("zoom anchor", anchor)?;
        }

        let origin = self.viewport(id)?;
        if !origin.is_measured() {
            return Err(ViewportError::surface_not_measured(id));
        }

        let anchor = match self.locks.axis_of(id) {
            LockAxis::Vertical => Some(anchor.unwrap_or_else(|| origin.region_center())),
            _ => anchor,
        };

        Ok(self.propagate(id, PropagatedOp::Zoom { multiplier, anchor }))
    }

    pub fn request_zoom_step(&mut self, id: ViewportId, step: ZoomStep) -> ViewportResult<PropagationReport> {
        self.request_zoom(id, step.multiplier())
    }

    pub fn request_move(&mut self, id: ViewportId, start: SeqCoord, end: SeqCoord) -> ViewportResult<PropagationReport> {
        ensure_finite("region start", start)?;
        ensure_finite("region end", end)?;
        self.viewport(id)?;

        Ok(self.propagate(id, PropagatedOp::Move { start, end }))
    }

    pub fn request_region_step(&mut self, id: ViewportId, step: RegionStep) -> ViewportResult<PropagationReport> {
        let (start, end) = self.viewport(id)?.step_bounds(step);
        self.request_move(id, start, end)
    }

    pub fn request_mark(&mut self, id: ViewportId, start: SeqCoord, end: SeqCoord) -> ViewportResult<PropagationReport> {
        ensure_finite("mark start", start)?;
        ensure_finite("mark end", end)?;
        self.viewport(id)?;

        Ok(self.propagate(id, PropagatedOp::MarkSet { start, end }))
    }

    pub fn request_clear_mark(&mut self, id: ViewportId) -> ViewportResult<bool> {
        Ok(self.viewport_mut(id)?.clear_mark())
    }

    /// Finish a mark drag. A committed mark is passed on to the rest of the
    /// viewport's lock group, and the report covers the whole group.
    pub fn request_pointer_release(
        &mut self,
        id: ViewportId,
        pos: SeqCoord,
    ) -> ViewportResult<(DragOutcome, Option<PropagationReport>)> {
        let outcome = self.viewport_mut(id)?.button_released(pos)?;

        let DragOutcome::Committed(Mark { start, end, .. }) = outcome else {
            return Ok((outcome, None));
        };

        let op = PropagatedOp::MarkSet { start, end };
        let siblings = self
            .locks
            .targets(id, op)
            .into_iter()
            .filter(|(member, _)| *member != id)
            .collect();
        let mut report = self.fan_out(id, op, siblings);
        report.applied.insert(0, id);

        Ok((outcome, Some(report)))
    }

    pub fn request_zoom_to_range(&mut self, id: ViewportId, start: SeqCoord, end: SeqCoord) -> ViewportResult<bool> {
        self.viewport_mut(id)?.zoom_to_range(start, end)
    }

    pub fn request_zoom_to_mark(&mut self, id: ViewportId) -> ViewportResult<bool> {
        self.viewport_mut(id)?.zoom_to_mark()
    }

    pub fn request_back(&mut self, id: ViewportId) -> ViewportResult<Option<HistoryEntry>> {
        self.viewport_mut(id)?.back()
    }

    pub fn request_resize(&mut self, id: ViewportId, height_px: f64) -> ViewportResult<()> {
        self.viewport_mut(id)?.resize(height_px)
    }

    pub fn request_reverse(&mut self, id: ViewportId) -> ViewportResult<()> {
        self.viewport_mut(id)?.reverse();
        Ok(())
    }

    /// Lock `id` on `axis`; `LockAxis::None` unlocks.
    pub fn request_lock(&mut self, id: ViewportId, axis: LockAxis) -> ViewportResult<()> {
        self.viewport(id)?;
        if axis == LockAxis::None {
            return self.request_unlock(id);
        }

        self.locks.lock(id, axis);
        log::info!("Viewport {} locked on {:?} axis", id, axis);
        Ok(())
    }

    pub fn request_lock_with(&mut self, id: ViewportId, sibling: ViewportId, axis: LockAxis) -> ViewportResult<()> {
        self.viewport(id)?;
        self.viewport(sibling)?;
        self.locks.lock_with(id, sibling, axis);
        Ok(())
    }

    pub fn request_unlock(&mut self, id: ViewportId) -> ViewportResult<()> {
        self.viewport(id)?;
        self.locks.unlock(id)?;
        log::info!("Viewport {} unlocked", id);
        Ok(())
    }

    pub fn export_range(&self, id: ViewportId, scope: ExportScope) -> ViewportResult<(SeqCoord, SeqCoord)> {
        Ok(self.viewport(id)?.export_range(scope))
    }

    fn apply_to(&mut self, member: ViewportId, op: &PropagatedOp) -> ViewportResult<bool> {
        let result = match self.viewports.get_mut(&member) {
            Some(viewport) => viewport.apply(op),
            None => Err(ViewportError::unknown_viewport(member)),
        };

        if let Err(err) = &result {
            log::warn!("Skipping viewport {} while propagating {:?}: {}", member, op, err);
        }
        result
    }

    /// Fan `op` out over the origin's lock group. The member list is fixed
    /// before the first member is touched; failures are logged and skipped.
    fn propagate(&mut self, origin: ViewportId, op: PropagatedOp) -> PropagationReport {
        let targets = self.locks.targets(origin, op);
        self.fan_out(origin, op, targets)
    }

    fn fan_out(
        &mut self,
        origin: ViewportId,
        op: PropagatedOp,
        targets: Vec<(ViewportId, PropagatedOp)>,
    ) -> PropagationReport {
        let mut report = PropagationReport::new(origin, op);

        for (member, member_op) in targets {
            match self.apply_to(member, &member_op) {
                Ok(true) => report.applied.push(member),
                Ok(false) => report.unchanged.push(member),
                Err(err) => report.failed.push((member, err)),
            }
        }

        log::debug!(
            "Propagated {:?} from {}: {} applied, {} unchanged, {} failed",
            op,
            origin,
            report.applied.len(),
            report.unchanged.len(),
            report.failed.len()
        );
        report
    }

    /// Handle for loader threads
    pub fn sender(&self) -> EngineSender {
        EngineSender {
            inner: self.sender.clone(),
        }
    }

    pub fn pending_messages(&self) -> usize {
        self.receiver.len()
    }

    /// Handle every message posted so far, in arrival order. Returns how
    /// many were handled.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;

        while let Ok(message) = self.receiver.try_recv() {
            handled += 1;
            if let Err(err) = self.handle_message(message) {
                log::warn!("Dropped engine message: {}", err);
            }
        }

        handled
    }

    fn handle_message(&mut self, message: EngineMessage) -> ViewportResult<()> {
        match message {
            EngineMessage::NewData { viewport, diff, restore } => {
                let disposition = self.notify_new_data(viewport, diff, restore)?;
                log::debug!("New data for viewport {}: {:?}", viewport, disposition);
                Ok(())
            }
            EngineMessage::SurfaceMeasured { viewport, height_px } => {
                self.notify_surface_measured(viewport, height_px)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{EngineEvent, RecordingObserver};

    fn coordinator() -> (Rc<RecordingObserver>, ViewCoordinator) {
        let observer = Rc::new(RecordingObserver::new());
        let config = EngineConfig {
            max_canvas_pixels: 50.0,
            border_pixels: 0.0,
            ..EngineConfig::default()
        };
        let coordinator = ViewCoordinator::new(config, observer.clone()).unwrap();
        (observer, coordinator)
    }

    fn bounds() -> SequenceBounds {
        SequenceBounds::new(1.0, 100000.0).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            history_depth: 0,
            ..EngineConfig::default()
        };
        assert!(ViewCoordinator::new(config, Rc::new(crate::observer::NullObserver)).is_err());
    }

    #[test]
    fn test_unknown_viewport() {
        let (_, mut coordinator) = coordinator();
        assert_eq!(
            coordinator.request_move(ViewportId(9), 1.0, 2.0).unwrap_err(),
            ViewportError::UnknownViewport { viewport: ViewportId(9) }
        );
    }

    #[test]
    fn test_vertical_zoom_shares_anchor() {
        let (_, mut coordinator) = coordinator();
        let a = coordinator.open_viewport(bounds());
        let b = coordinator.open_viewport(bounds());
        coordinator.notify_surface_measured(a, 1000.0).unwrap();
        coordinator.notify_surface_measured(b, 2000.0).unwrap();
        coordinator.request_move(b, 80000.0, 81000.0).unwrap();

        coordinator.request_lock(a, LockAxis::Vertical).unwrap();
        coordinator.request_lock(b, LockAxis::Vertical).unwrap();

        let report = coordinator.request_zoom_at(a, 2.0, Some(20000.0)).unwrap();
        assert_eq!(report.applied, vec![a, b]);

        let a_state = coordinator.state(a).unwrap();
        let b_state = coordinator.state(b).unwrap();
        assert_eq!(a_state.zoom_factor, 0.02);
        assert_eq!(b_state.zoom_factor, 0.04);
        assert_eq!((a_state.region_start + a_state.region_end) / 2.0, 20000.0);
        assert_eq!((b_state.region_start + b_state.region_end) / 2.0, 20000.0);
        assert_eq!(b_state.lock_axis, LockAxis::Vertical);
    }

    #[test]
    fn test_horizontal_zoom_uses_own_centre() {
        let (_, mut coordinator) = coordinator();
        let a = coordinator.open_viewport(bounds());
        let b = coordinator.open_viewport(bounds());
        coordinator.notify_surface_measured(a, 1000.0).unwrap();
        coordinator.notify_surface_measured(b, 1000.0).unwrap();
        coordinator.request_move(b, 80000.0, 81000.0).unwrap();

        coordinator.request_lock(a, LockAxis::Horizontal).unwrap();
        coordinator.request_lock(b, LockAxis::Horizontal).unwrap();
        coordinator.request_zoom_at(a, 2.0, Some(20000.0)).unwrap();

        let b_state = coordinator.state(b).unwrap();
        assert_eq!(b_state.zoom_factor, 0.02);
        assert_eq!((b_state.region_start + b_state.region_end) / 2.0, 80500.0);

        // Moves stay with the viewport that asked
        let report = coordinator.request_move(a, 1.0, 1000.0).unwrap();
        assert_eq!(report.applied, vec![a]);
    }

    #[test]
    fn test_failing_member_is_skipped() {
        let (_, mut coordinator) = coordinator();
        let a = coordinator.open_viewport(bounds());
        let b = coordinator.open_viewport(bounds());
        let c = coordinator.open_viewport(bounds());
        coordinator.notify_surface_measured(a, 1000.0).unwrap();
        coordinator.notify_surface_measured(c, 1000.0).unwrap();
        for id in [a, b, c] {
            coordinator.request_lock(id, LockAxis::Vertical).unwrap();
        }

        let report = coordinator.request_zoom(a, 2.0).unwrap();
        assert_eq!(report.applied, vec![a, c]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, b);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_mark_propagates() {
        let (observer, mut coordinator) = coordinator();
        let a = coordinator.open_viewport(bounds());
        let b = coordinator.open_viewport(bounds());
        coordinator.request_lock(a, LockAxis::Horizontal).unwrap();
        coordinator.request_lock(b, LockAxis::Horizontal).unwrap();
        observer.take();

        coordinator.request_mark(b, 300.0, 200.0).unwrap();
        for id in [a, b] {
            assert_eq!(coordinator.state(id).unwrap().mark.range(), Some((200.0, 300.0)));
        }
        let marks = observer
            .events()
            .into_iter()
            .filter(|e| matches!(e, EngineEvent::MarkChanged { .. }))
            .count();
        assert_eq!(marks, 2);
    }

    #[test]
    fn test_drag_release_propagates_commit() {
        let (_, mut coordinator) = coordinator();
        let a = coordinator.open_viewport(bounds());
        let b = coordinator.open_viewport(bounds());
        coordinator.notify_surface_measured(a, 1000.0).unwrap();
        coordinator.notify_surface_measured(b, 1000.0).unwrap();
        coordinator.request_lock(a, LockAxis::Vertical).unwrap();
        coordinator.request_lock(b, LockAxis::Vertical).unwrap();
        coordinator.request_mark(a, 1000.0, 2000.0).unwrap();

        let viewport = coordinator.viewport_mut(a).unwrap();
        // 5px at 0.01 px/base is 500 bases
        viewport.pointer_moved(2200.0).unwrap();
        assert!(viewport.button_pressed());
        viewport.pointer_moved(3000.0).unwrap();

        let (outcome, report) = coordinator.request_pointer_release(a, 3500.0).unwrap();
        assert!(matches!(outcome, DragOutcome::Committed(_)));
        let report = report.expect("committed drag reports on its group");
        assert_eq!(report.applied, vec![a, b]);
        assert!(report.is_complete());
        assert_eq!(coordinator.state(b).unwrap().mark.range(), Some((1000.0, 3500.0)));
    }

    #[test]
    fn test_release_without_drag_has_no_report() {
        let (_, mut coordinator) = coordinator();
        let a = coordinator.open_viewport(bounds());
        coordinator.notify_surface_measured(a, 1000.0).unwrap();

        let (outcome, report) = coordinator.request_pointer_release(a, 500.0).unwrap();
        assert_eq!(outcome, DragOutcome::NoDrag);
        assert!(report.is_none());
    }

    #[test]
    fn test_duplicate_joins_lock_and_close_unlocks() {
        let (_, mut coordinator) = coordinator();
        let a = coordinator.open_viewport(bounds());
        coordinator.request_lock(a, LockAxis::Vertical).unwrap();

        let copy = coordinator.duplicate_viewport(a).unwrap();
        assert_eq!(coordinator.locks().members_of(a), vec![a, copy]);

        coordinator.close_viewport(copy).unwrap();
        assert!(!coordinator.locks().is_locked(a));
        assert_eq!(coordinator.viewport_ids(), vec![a]);
        assert!(coordinator.close_viewport(copy).is_err());
    }

    #[test]
    fn test_unlock_unlocked_viewport() {
        let (_, mut coordinator) = coordinator();
        let a = coordinator.open_viewport(bounds());
        assert_eq!(
            coordinator.request_unlock(a),
            Err(ViewportError::NotLocked { viewport: a })
        );
    }

    #[test]
    fn test_messages_from_loader_thread() {
        let (observer, mut coordinator) = coordinator();
        let a = coordinator.open_viewport(bounds());
        let sender = coordinator.sender();

        let loader = std::thread::spawn(move || {
            sender.new_data(a, ContextDiff::new(vec![1u8, 2, 3]), None).unwrap();
            sender.surface_measured(a, 1000.0).unwrap();
        });
        loader.join().unwrap();

        assert_eq!(coordinator.pending_messages(), 2);
        assert_eq!(coordinator.process_events(), 2);
        assert_eq!(observer.draws_for(a).len(), 1);
        assert_eq!(coordinator.process_events(), 0);
    }
}
