use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{ensure_finite, ViewportError, ViewportResult};
use crate::mark::Mark;

/// Sequence coordinate, in bases
pub type SeqCoord = f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewportId(pub u32);

impl fmt::Display for ViewportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Axis along which a group of viewports is kept in step.
///
/// `Vertical` groups share the sequence axis: zoom anchors and scroll
/// positions are identical across members. `Horizontal` groups sit side by
/// side and only share the zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockAxis {
    None,
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomStatus {
    /// No surface has been measured yet
    Init,
    Min,
    Mid,
    Max,
    /// The whole sequence already fits at maximum zoom
    Fixed,
}

/// Inclusive sequence extent a viewport may show.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceBounds {
    pub min: SeqCoord,
    pub max: SeqCoord,
}

impl SequenceBounds {
    pub fn new(min: SeqCoord, max: SeqCoord) -> ViewportResult<Self> {
        let min = ensure_finite("sequence start", min)?;
        let max = ensure_finite("sequence end", max)?;
        if min > max {
            return Err(ViewportError::invalid_coordinate(format!(
                "sequence start {} is after sequence end {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Number of bases covered, counting both ends
    pub fn length(&self) -> f64 {
        self.max - self.min + 1.0
    }

    pub fn center(&self) -> SeqCoord {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, coord: SeqCoord) -> bool {
        coord >= self.min && coord <= self.max
    }

    pub fn clamp(&self, coord: SeqCoord) -> SeqCoord {
        coord.clamp(self.min, self.max)
    }

    /// Position of `coord` once the sequence is read from the other strand
    pub fn mirror(&self, coord: SeqCoord) -> SeqCoord {
        self.min + self.max - coord
    }
}

/// Snapshot of everything a host needs to lay out one viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub viewport: ViewportId,
    pub region_start: SeqCoord,
    pub region_end: SeqCoord,
    pub zoom_factor: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_status: ZoomStatus,
    pub sequence_min: SeqCoord,
    pub sequence_max: SeqCoord,
    pub max_canvas_span: f64,
    pub mark: Mark,
    pub reversed: bool,
    pub lock_axis: LockAxis,
}

/// Payload of a visibility change notification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibilityChange {
    pub region_start: SeqCoord,
    pub region_end: SeqCoord,
    pub zoom_status: ZoomStatus,
}

static NEXT_DIFF_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque feature delta handed over by a loader.
///
/// The engine never looks inside; it only carries the handle from the
/// loader thread to the draw callback. Cloning shares the payload.
#[derive(Clone)]
pub struct ContextDiff {
    id: u64,
    payload: Arc<dyn Any + Send + Sync>,
}

impl ContextDiff {
    pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
        Self {
            id: NEXT_DIFF_ID.fetch_add(1, Ordering::Relaxed),
            payload: Arc::new(payload),
        }
    }

    /// Process-unique id, handy for tracing a delta through the scheduler
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for ContextDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextDiff").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Keyboard zoom steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomStep {
    SmallIn,
    LargeIn,
    SmallOut,
    LargeOut,
}

impl ZoomStep {
    pub fn multiplier(self) -> f64 {
        match self {
            ZoomStep::SmallIn => 1.1,
            ZoomStep::LargeIn => 2.0,
            ZoomStep::SmallOut => 1.0 / 1.1,
            ZoomStep::LargeOut => 0.5,
        }
    }
}

/// Scroll steps along the sequence axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionStep {
    PageUp,
    PageDown,
    LineUp,
    LineDown,
}

/// Which coordinates an export should cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    Visible,
    Mark,
    Sequence,
}
