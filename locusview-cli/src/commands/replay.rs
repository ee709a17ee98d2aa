//! Replay command implementation - drive a coordinator from a session script

use locusview_core::{
    ContextDiff, DragOutcome, EngineConfig, EngineEvent, Mark, PendingPolicy, PropagationReport,
    SequenceBounds, ViewCoordinator, ViewportId, ViewportObserver, VisibilityChange,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::thread::JoinHandle;

use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::script::{Script, Step};
use crate::PolicyArg;

/// Collects every notification as an output line
#[derive(Debug, Default)]
pub struct Transcript {
    json: bool,
    lines: RefCell<Vec<String>>,
}

impl Transcript {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            lines: RefCell::new(Vec::new()),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    fn push(&self, line: String) {
        self.lines.borrow_mut().push(line);
    }

    fn record(&self, event: EngineEvent) {
        if self.json {
            match serde_json::to_string(&event) {
                Ok(line) => self.push(line),
                Err(e) => log::warn!("Failed to serialize {:?}: {}", event, e),
            }
            return;
        }

        let line = match event {
            EngineEvent::VisibilityChanged {
                viewport,
                region_start,
                region_end,
                zoom_status,
            } => format!("{} visible {}..{} ({:?})", viewport, region_start, region_end, zoom_status),
            EngineEvent::DrawReady { viewport, diff } => format!("{} draw batch {}", viewport, diff),
            EngineEvent::MarkChanged { viewport, mark } => match mark.range() {
                Some((start, end)) => format!("{} mark {}..{}", viewport, start, end),
                None => format!("{} mark cleared", viewport),
            },
            EngineEvent::BusyChanged { viewport, busy } => {
                format!("{} {}", viewport, if busy { "busy" } else { "idle" })
            }
        };
        self.push(line);
    }
}

impl ViewportObserver for Transcript {
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

pub fn execute(
    config: &Config,
    script_path: PathBuf,
    json: bool,
    policy: Option<PolicyArg>,
) -> CliResult<()> {
    log::info!("Replaying session script: {}", script_path.display());

    let script = Script::load_from_file(&script_path)?;

    let mut engine = config.engine.clone();
    if let Some(policy) = policy {
        engine.pending_policy = match policy {
            PolicyArg::Reject => PendingPolicy::Reject,
            PolicyArg::Queue => PendingPolicy::Queue,
        };
    }

    let lines = run(&engine, &script, json || config.general.json)?;
    for line in lines {
        println!("{}", line);
    }

    log::info!("Replay completed");
    Ok(())
}

/// Run every step of `script` against a fresh coordinator and return the
/// output lines in order
pub fn run(engine: &EngineConfig, script: &Script, json: bool) -> CliResult<Vec<String>> {
    let transcript = Rc::new(Transcript::new(json));
    let mut replay = Replay::new(engine.clone(), transcript.clone())?;

    for spec in &script.viewports {
        let bounds = SequenceBounds::new(spec.start, spec.end)?;
        let id = replay.coordinator.open_viewport(bounds);
        log::debug!("Opened viewport '{}' as {}", spec.name, id);
        replay.names.insert(spec.name.clone(), id);
    }

    for (index, step) in script.steps.iter().enumerate() {
        let number = index + 1;
        log::debug!("Step {}: {}", number, step.name());
        replay.apply(number, step)?;
    }

    // Loaders still in flight get their batches delivered before exit
    replay.drain(script.steps.len())?;

    Ok(transcript.lines())
}

struct Replay {
    coordinator: ViewCoordinator,
    transcript: Rc<Transcript>,
    names: HashMap<String, ViewportId>,
    loaders: Vec<JoinHandle<bool>>,
}

impl Replay {
    fn new(engine: EngineConfig, transcript: Rc<Transcript>) -> CliResult<Self> {
        let coordinator = ViewCoordinator::new(engine, transcript.clone())?;
        Ok(Self {
            coordinator,
            transcript,
            names: HashMap::new(),
            loaders: Vec::new(),
        })
    }

    fn id(&self, step: usize, name: &str) -> CliResult<ViewportId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| CliError::script(step, format!("unknown viewport '{}'", name)))
    }

    fn apply(&mut self, number: usize, step: &Step) -> CliResult<()> {
        match step {
            Step::Measure { viewport, height } => {
                let id = self.id(number, viewport)?;
                self.coordinator.notify_surface_measured(id, *height)?;
            }
            Step::Resize { viewport, height } => {
                let id = self.id(number, viewport)?;
                self.coordinator.request_resize(id, *height)?;
            }
            Step::Zoom { viewport, factor, anchor } => {
                let id = self.id(number, viewport)?;
                let report = self.coordinator.request_zoom_at(id, *factor, *anchor)?;
                log_report(number, &report);
            }
            Step::ZoomStep { viewport, step } => {
                let id = self.id(number, viewport)?;
                let report = self.coordinator.request_zoom_step(id, *step)?;
                log_report(number, &report);
            }
            Step::Move { viewport, start, end } => {
                let id = self.id(number, viewport)?;
                let report = self.coordinator.request_move(id, *start, *end)?;
                log_report(number, &report);
            }
            Step::Scroll { viewport, step } => {
                let id = self.id(number, viewport)?;
                let report = self.coordinator.request_region_step(id, *step)?;
                log_report(number, &report);
            }
            Step::Mark { viewport, start, end } => {
                let id = self.id(number, viewport)?;
                let report = self.coordinator.request_mark(id, *start, *end)?;
                log_report(number, &report);
            }
            Step::ClearMark { viewport } => {
                let id = self.id(number, viewport)?;
                if !self.coordinator.request_clear_mark(id)? {
                    log::info!("Step {}: {} has no mark to clear", number, viewport);
                }
            }
            Step::Drag { viewport, from, to } => {
                let id = self.id(number, viewport)?;
                self.drag(number, id, *from, *to)?;
            }
            Step::ZoomToMark { viewport } => {
                let id = self.id(number, viewport)?;
                self.coordinator.request_zoom_to_mark(id)?;
            }
            Step::ZoomToRange { viewport, start, end } => {
                let id = self.id(number, viewport)?;
                if !self.coordinator.request_zoom_to_range(id, *start, *end)? {
                    log::info!("Step {}: range {}..{} left the view unchanged", number, start, end);
                }
            }
            Step::Lock { viewport, axis, with } => {
                let id = self.id(number, viewport)?;
                match with {
                    Some(sibling) => {
                        let sibling = self.id(number, sibling)?;
                        self.coordinator.request_lock_with(id, sibling, *axis)?;
                    }
                    None => self.coordinator.request_lock(id, *axis)?,
                }
            }
            Step::Unlock { viewport } => {
                let id = self.id(number, viewport)?;
                self.coordinator.request_unlock(id)?;
            }
            Step::Back { viewport } => {
                let id = self.id(number, viewport)?;
                if self.coordinator.request_back(id)?.is_none() {
                    log::info!("Step {}: {} has no history", number, viewport);
                }
            }
            Step::Reverse { viewport } => {
                let id = self.id(number, viewport)?;
                self.coordinator.request_reverse(id)?;
            }
            Step::Duplicate { viewport, name } => {
                let id = self.id(number, viewport)?;
                if self.names.contains_key(name) {
                    return Err(CliError::script(number, format!("viewport '{}' already exists", name)));
                }
                let copy = self.coordinator.duplicate_viewport(id)?;
                self.names.insert(name.clone(), copy);
            }
            Step::Close { viewport } => {
                let id = self.id(number, viewport)?;
                self.coordinator.close_viewport(id)?;
                self.names.remove(viewport);
            }
            Step::Load { viewport, label, restore_from } => {
                let id = self.id(number, viewport)?;
                let restore = match restore_from {
                    Some(source) => {
                        let source = self.id(number, source)?;
                        Some(self.coordinator.viewport(source)?.history_entry())
                    }
                    None => None,
                };

                let sender = self.coordinator.sender();
                let diff = ContextDiff::new(label.clone());
                log::debug!("Step {}: loader posting batch {} for {}", number, diff.id(), id);
                self.loaders.push(std::thread::spawn(move || {
                    sender.new_data(id, diff, restore).is_ok()
                }));
            }
            Step::Process => {
                self.drain(number)?;
            }
            Step::State { viewport } => {
                let id = self.id(number, viewport)?;
                let state = self.coordinator.state(id)?;
                let line = if self.transcript.json {
                    serde_json::to_string(&state)
                        .map_err(|e| CliError::script(number, e.to_string()))?
                } else {
                    format!(
                        "{} state {}..{} zoom {:.6} ({:?}) lock {:?}",
                        id, state.region_start, state.region_end, state.zoom_factor,
                        state.zoom_status, state.lock_axis
                    )
                };
                self.transcript.push(line);
            }
            Step::Export { viewport, scope } => {
                let id = self.id(number, viewport)?;
                let (start, end) = self.coordinator.export_range(id, *scope)?;
                let line = if self.transcript.json {
                    serde_json::json!({
                        "event": "export",
                        "viewport": id,
                        "scope": scope,
                        "start": start,
                        "end": end,
                    })
                    .to_string()
                } else {
                    format!("{} export {:?} {}..{}", id, scope, start, end)
                };
                self.transcript.push(line);
            }
        }

        Ok(())
    }

    fn drag(&mut self, number: usize, id: ViewportId, from: f64, to: f64) -> CliResult<()> {
        let viewport = self.coordinator.viewport_mut(id)?;
        viewport.pointer_moved(from)?;
        if !viewport.button_pressed() {
            return Err(CliError::script(
                number,
                format!("no mark edge near {} on {}", from, id),
            ));
        }
        viewport.pointer_moved(to)?;

        let (outcome, report) = self.coordinator.request_pointer_release(id, to)?;
        if let Some(report) = &report {
            log_report(number, report);
        }
        match outcome {
            DragOutcome::Committed(mark) => {
                log::debug!("Step {}: drag committed {:?}", number, mark.range());
            }
            DragOutcome::Cancelled(mark) => {
                log::info!("Step {}: drag cancelled, mark back at {:?}", number, mark.range());
            }
            DragOutcome::NoDrag => {}
        }
        Ok(())
    }

    fn drain(&mut self, number: usize) -> CliResult<()> {
        for loader in self.loaders.drain(..) {
            match loader.join() {
                Ok(true) => {}
                Ok(false) => log::warn!("Step {}: loader could not post its batch", number),
                Err(_) => return Err(CliError::script(number, "loader thread panicked")),
            }
        }

        let handled = self.coordinator.process_events();
        if handled > 0 {
            log::debug!("Step {}: processed {} messages", number, handled);
        }
        Ok(())
    }
}

fn log_report(number: usize, report: &PropagationReport) {
    log::debug!(
        "Step {}: {:?} from {} changed {:?}",
        number,
        report.op,
        report.origin,
        report.applied
    );
    for (viewport, err) in &report.failed {
        log::warn!("Step {}: {} did not follow its lock group: {}", number, viewport, err);
    }
}
