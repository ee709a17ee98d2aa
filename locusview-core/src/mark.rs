//! The mark: a user-chosen sub-range of the sequence, adjustable by dragging
//! either edge.

use serde::{Deserialize, Serialize};

use crate::clamp::{clamp_to_limits, normalize};
use crate::config::EngineConfig;
use crate::error::{ensure_finite, ViewportResult};
use crate::types::{SeqCoord, SequenceBounds};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Mark {
    pub set: bool,
    pub start: SeqCoord,
    pub end: SeqCoord,
}

impl Mark {
    pub fn unset() -> Self {
        Self::default()
    }

    pub fn range(&self) -> Option<(SeqCoord, SeqCoord)> {
        self.set.then_some((self.start, self.end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkEdge {
    Start,
    End,
}

/// Pointer interaction with the mark edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragPhase {
    Idle,
    /// Pointer hovers close enough to an edge to grab it
    Armed { edge: MarkEdge },
    /// Button held, edge follows the pointer. `before` is restored if the
    /// button is released off the surface.
    Dragging { edge: MarkEdge, before: Mark, outside: bool },
}

/// Result of releasing the button at the end of a drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    NoDrag,
    Committed(Mark),
    Cancelled(Mark),
}

#[derive(Debug, Clone)]
pub struct MarkRegion {
    mark: Mark,
    bounds: SequenceBounds,
    min_width: f64,
    edge_tolerance_px: f64,
    drag: DragPhase,
}

impl MarkRegion {
    pub fn new(bounds: SequenceBounds, config: &EngineConfig) -> Self {
        Self {
            mark: Mark::unset(),
            bounds,
            min_width: config.mark_min_width,
            edge_tolerance_px: config.mark_edge_tolerance_px,
            drag: DragPhase::Idle,
        }
    }

    pub fn mark(&self) -> Mark {
        self.mark
    }

    pub fn is_set(&self) -> bool {
        self.mark.set
    }

    pub fn drag_phase(&self) -> DragPhase {
        self.drag
    }

    /// Work out the mark `set(start, end)` would store.
    pub fn resolve(&self, start: SeqCoord, end: SeqCoord) -> ViewportResult<Mark> {
        let start = ensure_finite("mark start", start)?;
        let end = ensure_finite("mark end", end)?;

        let (start, end) = normalize(start, end);
        let (mut start, mut end, _) = clamp_to_limits(&self.bounds, start, end);

        if end - start < self.min_width {
            end = (start + self.min_width).min(self.bounds.max);
            start = (end - self.min_width).max(self.bounds.min);
        }

        Ok(Mark { set: true, start, end })
    }

    pub fn commit(&mut self, mark: Mark) {
        self.mark = mark;
    }

    pub fn set(&mut self, start: SeqCoord, end: SeqCoord) -> ViewportResult<Mark> {
        let mark = self.resolve(start, end)?;
        self.commit(mark);
        Ok(mark)
    }

    /// Remove the mark and abandon any drag. Returns true if a mark was set.
    pub fn clear(&mut self) -> bool {
        let was_set = self.mark.set;
        self.mark = Mark::unset();
        self.drag = DragPhase::Idle;
        was_set
    }

    /// Move one edge to `value` without letting it cross the other one.
    /// `Ok(None)` if there is no mark to move.
    pub fn move_edge(&mut self, edge: MarkEdge, value: SeqCoord) -> ViewportResult<Option<Mark>> {
        let value = ensure_finite("mark edge", value)?;
        if !self.mark.set {
            return Ok(None);
        }

        match edge {
            MarkEdge::Start => {
                let limit = (self.mark.end - self.min_width).max(self.bounds.min);
                self.mark.start = value.clamp(self.bounds.min, limit);
            }
            MarkEdge::End => {
                let limit = (self.mark.start + self.min_width).min(self.bounds.max);
                self.mark.end = value.clamp(limit, self.bounds.max);
            }
        }

        Ok(Some(self.mark))
    }

    fn edge_near(&self, pos: SeqCoord, zoom: f64) -> Option<MarkEdge> {
        let (start, end) = self.mark.range()?;
        let tolerance = self.edge_tolerance_px / zoom;
        let to_start = (pos - start).abs();
        let to_end = (pos - end).abs();

        if to_start <= tolerance && to_start <= to_end {
            Some(MarkEdge::Start)
        } else if to_end <= tolerance {
            Some(MarkEdge::End)
        } else {
            None
        }
    }

    /// Pointer moved to `pos`. While dragging the grabbed edge follows it.
    pub fn pointer_moved(&mut self, pos: SeqCoord, zoom: f64) -> ViewportResult<DragPhase> {
        let pos = ensure_finite("pointer position", pos)?;

        match self.drag {
            DragPhase::Idle | DragPhase::Armed { .. } => {
                self.drag = match self.edge_near(pos, zoom) {
                    Some(edge) => DragPhase::Armed { edge },
                    None => DragPhase::Idle,
                };
            }
            DragPhase::Dragging { edge, .. } => {
                self.move_edge(edge, pos)?;
            }
        }

        Ok(self.drag)
    }

    /// Button pressed. Starts a drag if an edge is armed.
    pub fn button_pressed(&mut self) -> bool {
        if let DragPhase::Armed { edge } = self.drag {
            self.drag = DragPhase::Dragging {
                edge,
                before: self.mark,
                outside: false,
            };
            true
        } else {
            false
        }
    }

    /// Button released at `pos`. Inside the surface the edge is committed
    /// there; outside, the mark goes back to how it was before the drag.
    pub fn button_released(&mut self, pos: SeqCoord) -> ViewportResult<DragOutcome> {
        let DragPhase::Dragging { edge, before, outside } = self.drag else {
            self.drag = DragPhase::Idle;
            return Ok(DragOutcome::NoDrag);
        };

        self.drag = DragPhase::Idle;

        if outside {
            self.mark = before;
            log::debug!("Mark drag released off surface, restored {:?}", before);
            return Ok(DragOutcome::Cancelled(before));
        }

        match self.move_edge(edge, pos) {
            Ok(_) => {
                let mark = self.resolve(self.mark.start, self.mark.end)?;
                self.commit(mark);
                Ok(DragOutcome::Committed(mark))
            }
            Err(err) => {
                self.mark = before;
                Err(err)
            }
        }
    }

    /// Pointer left the surface. An armed edge is dropped; a drag carries
    /// on but will be cancelled if released outside.
    pub fn pointer_left(&mut self) {
        match self.drag {
            DragPhase::Armed { .. } => self.drag = DragPhase::Idle,
            DragPhase::Dragging { edge, before, .. } => {
                self.drag = DragPhase::Dragging { edge, before, outside: true };
            }
            DragPhase::Idle => {}
        }
    }

    pub fn pointer_entered(&mut self) {
        if let DragPhase::Dragging { edge, before, .. } = self.drag {
            self.drag = DragPhase::Dragging { edge, before, outside: false };
        }
    }

    pub fn cancel_drag(&mut self) {
        if let DragPhase::Dragging { before, .. } = self.drag {
            self.mark = before;
        }
        self.drag = DragPhase::Idle;
    }
}
