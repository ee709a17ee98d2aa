//! LocusView Core Library
//!
//! Viewport coordination for genome annotation viewers: zoom limits, visible
//! region clamping, lock groups, the interactive mark, back-button history
//! and the deferred draw handshake for asynchronously loaded features.

pub mod error;
pub mod config;
pub mod types;
pub mod clamp;
pub mod zoom;
pub mod region;
pub mod mark;
pub mod history;
pub mod scheduler;
pub mod busy;
pub mod observer;
pub mod lock;
pub mod viewport;
pub mod coordinator;

// Re-export commonly used types and functions
pub use config::{EngineConfig, PendingPolicy, MAX_HISTORY_DEPTH};
pub use coordinator::{EngineMessage, EngineSender, PropagationReport, ViewCoordinator};
pub use error::{ViewportError, ViewportResult};
pub use history::HistoryEntry;
pub use lock::PropagatedOp;
pub use mark::{DragOutcome, DragPhase, Mark, MarkEdge};
pub use observer::{EngineEvent, NullObserver, RecordingObserver, ViewportObserver};
pub use scheduler::SchedulerState;
pub use types::{
    ContextDiff, ExportScope, LockAxis, RegionStep, SeqCoord, SequenceBounds, ViewportId,
    ViewportState, VisibilityChange, ZoomStatus, ZoomStep,
};
pub use viewport::{DrawDisposition, Viewport};

/// Version information for the LocusView core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
