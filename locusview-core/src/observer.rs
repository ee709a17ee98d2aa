//! Outbound notifications
//!
//! The host hands the coordinator one observer at construction. Every
//! method has an empty default so hosts implement only what they use.

use serde::Serialize;
use std::cell::RefCell;

use crate::mark::Mark;
use crate::types::{ContextDiff, SeqCoord, ViewportId, VisibilityChange, ZoomStatus};

pub trait ViewportObserver {
    /// The visible region or zoom status changed
    fn visibility_changed(&self, _viewport: ViewportId, _change: &VisibilityChange) {}

    /// New data may now be drawn on a measured surface
    fn draw_ready(&self, _viewport: ViewportId, _diff: &ContextDiff) {}

    fn mark_changed(&self, _viewport: ViewportId, _mark: &Mark) {}

    fn busy_changed(&self, _viewport: ViewportId, _busy: bool) {}
}

/// Observer that ignores everything
#[derive(Debug, Default)]
pub struct NullObserver;

impl ViewportObserver for NullObserver {}

/// Serialisable form of one outbound notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    VisibilityChanged {
        viewport: ViewportId,
        region_start: SeqCoord,
        region_end: SeqCoord,
        zoom_status: ZoomStatus,
    },
    DrawReady {
        viewport: ViewportId,
        diff: u64,
    },
    MarkChanged {
        viewport: ViewportId,
        mark: Mark,
    },
    BusyChanged {
        viewport: ViewportId,
        busy: bool,
    },
}

impl EngineEvent {
    pub fn viewport(&self) -> ViewportId {
        match self {
            EngineEvent::VisibilityChanged { viewport, .. }
            | EngineEvent::DrawReady { viewport, .. }
            | EngineEvent::MarkChanged { viewport, .. }
            | EngineEvent::BusyChanged { viewport, .. } => *viewport,
        }
    }

    pub fn visibility(viewport: ViewportId, change: &VisibilityChange) -> Self {
        EngineEvent::VisibilityChanged {
            viewport,
            region_start: change.region_start,
            region_end: change.region_end,
            zoom_status: change.zoom_status,
        }
    }
}

/// Observer that keeps every notification, in order
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<EngineEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.borrow().clone()
    }

    /// Hand over everything recorded so far and start afresh
    pub fn take(&self) -> Vec<EngineEvent> {
        self.events.take()
    }

    pub fn draws_for(&self, viewport: ViewportId) -> Vec<u64> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::DrawReady { viewport: v, diff } if *v == viewport => Some(*diff),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: EngineEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl ViewportObserver for RecordingObserver {
    fn visibility_changed(&self, viewport: ViewportId, change: &VisibilityChange) {
        self.record(EngineEvent::visibility(viewport, change));
    }

    fn draw_ready(&self, viewport: ViewportId, diff: &ContextDiff) {
        self.record(EngineEvent::DrawReady { viewport, diff: diff.id() });
    }

    fn mark_changed(&self, viewport: ViewportId, mark: &Mark) {
        self.record(EngineEvent::MarkChanged { viewport, mark: *mark });
    }

    fn busy_changed(&self, viewport: ViewportId, busy: bool) {
        self.record(EngineEvent::BusyChanged { viewport, busy });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        let diff = ContextDiff::new(());
        observer.busy_changed(ViewportId(1), true);
        observer.draw_ready(ViewportId(1), &diff);
        observer.busy_changed(ViewportId(1), false);

        let events = observer.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], EngineEvent::DrawReady { viewport: ViewportId(1), diff: diff.id() });
        assert_eq!(observer.draws_for(ViewportId(1)), vec![diff.id()]);
        assert!(observer.draws_for(ViewportId(2)).is_empty());

        assert_eq!(observer.take().len(), 3);
        assert!(observer.events().is_empty());
    }

    #[test]
    fn test_event_serialization() {
        let event = EngineEvent::BusyChanged { viewport: ViewportId(3), busy: true };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"busy_changed","viewport":3,"busy":true}"#);
    }
}
