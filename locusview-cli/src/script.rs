//! Session scripts
//!
//! A script declares the viewports a host would open and the sequence of
//! user and loader events to feed them, for example:
//!
//! ```toml
//! [[viewports]]
//! name = "top"
//! start = 1
//! end = 100000
//!
//! [[steps]]
//! action = "measure"
//! viewport = "top"
//! height = 800
//!
//! [[steps]]
//! action = "zoom"
//! viewport = "top"
//! factor = 2.0
//! anchor = 40000
//! ```

use locusview_core::{ExportScope, LockAxis, RegionStep, SeqCoord, ZoomStep};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CliError, CliResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub viewports: Vec<ViewportSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportSpec {
    pub name: String,
    pub start: SeqCoord,
    pub end: SeqCoord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Measure { viewport: String, height: f64 },
    Resize { viewport: String, height: f64 },
    Zoom {
        viewport: String,
        factor: f64,
        #[serde(default)]
        anchor: Option<SeqCoord>,
    },
    ZoomStep { viewport: String, step: ZoomStep },
    Move { viewport: String, start: SeqCoord, end: SeqCoord },
    Scroll { viewport: String, step: RegionStep },
    Mark { viewport: String, start: SeqCoord, end: SeqCoord },
    ClearMark { viewport: String },
    /// Press near `from`, drag to `to` and release there
    Drag { viewport: String, from: SeqCoord, to: SeqCoord },
    ZoomToMark { viewport: String },
    ZoomToRange { viewport: String, start: SeqCoord, end: SeqCoord },
    Lock {
        viewport: String,
        axis: LockAxis,
        #[serde(default)]
        with: Option<String>,
    },
    Unlock { viewport: String },
    Back { viewport: String },
    Reverse { viewport: String },
    Duplicate { viewport: String, name: String },
    Close { viewport: String },
    /// Post a feature batch from a loader thread
    Load {
        viewport: String,
        label: String,
        /// Viewport whose current position the reload should restore
        #[serde(default)]
        restore_from: Option<String>,
    },
    /// Wait for outstanding loaders and drain their messages
    Process,
    State { viewport: String },
    Export { viewport: String, scope: ExportScope },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Measure { .. } => "measure",
            Step::Resize { .. } => "resize",
            Step::Zoom { .. } => "zoom",
            Step::ZoomStep { .. } => "zoom_step",
            Step::Move { .. } => "move",
            Step::Scroll { .. } => "scroll",
            Step::Mark { .. } => "mark",
            Step::ClearMark { .. } => "clear_mark",
            Step::Drag { .. } => "drag",
            Step::ZoomToMark { .. } => "zoom_to_mark",
            Step::ZoomToRange { .. } => "zoom_to_range",
            Step::Lock { .. } => "lock",
            Step::Unlock { .. } => "unlock",
            Step::Back { .. } => "back",
            Step::Reverse { .. } => "reverse",
            Step::Duplicate { .. } => "duplicate",
            Step::Close { .. } => "close",
            Step::Load { .. } => "load",
            Step::Process => "process",
            Step::State { .. } => "state",
            Step::Export { .. } => "export",
        }
    }
}

impl Script {
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Err(CliError::file_not_found(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&path.display().to_string(), &content)
    }

    pub fn parse(origin: &str, content: &str) -> CliResult<Self> {
        let script: Script = toml::from_str(content)
            .map_err(|e| CliError::parse(origin.to_string(), e.to_string()))?;

        let mut seen = std::collections::HashSet::new();
        for spec in &script.viewports {
            if !seen.insert(spec.name.as_str()) {
                return Err(CliError::parse(
                    origin.to_string(),
                    format!("viewport '{}' declared twice", spec.name),
                ));
            }
        }

        log::debug!(
            "Parsed script {} with {} viewports and {} steps",
            origin,
            script.viewports.len(),
            script.steps.len()
        );
        Ok(script)
    }
}
