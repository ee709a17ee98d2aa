//! Deferred draw handshake
//!
//! Feature data can arrive before the canvas has been laid out. Drawing then
//! has to wait until the surface has a measured size, so the request is
//! parked here and handed back once the surface reports in.

use std::collections::VecDeque;

use crate::config::PendingPolicy;
use crate::history::HistoryEntry;
use crate::types::ContextDiff;

#[derive(Debug, Clone)]
pub struct PendingDrawRequest {
    pub diff: ContextDiff,
    /// State to restore before drawing, e.g. after a reload
    pub restore: Option<HistoryEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    WaitingForSurface,
    Dispatching,
}

/// What the scheduler decided to do with a new request
#[derive(Debug)]
pub enum Offer {
    /// Surface is ready: draw these now, then call `dispatched`
    Dispatch(Vec<PendingDrawRequest>),
    /// Parked until the surface is measured
    Deferred,
    /// Dropped; an earlier request is still waiting
    Rejected,
}

#[derive(Debug)]
pub struct DeferredDrawScheduler {
    state: SchedulerState,
    pending: VecDeque<PendingDrawRequest>,
    policy: PendingPolicy,
}

impl DeferredDrawScheduler {
    pub fn new(policy: PendingPolicy) -> Self {
        Self {
            state: SchedulerState::Idle,
            pending: VecDeque::new(),
            policy,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn offer(&mut self, request: PendingDrawRequest, surface_ready: bool) -> Offer {
        match self.state {
            SchedulerState::Idle if surface_ready => {
                self.state = SchedulerState::Dispatching;
                Offer::Dispatch(vec![request])
            }
            SchedulerState::Idle => {
                log::debug!("Surface not measured, deferring draw of diff {}", request.diff.id());
                self.pending.push_back(request);
                self.state = SchedulerState::WaitingForSurface;
                Offer::Deferred
            }
            SchedulerState::WaitingForSurface => match self.policy {
                PendingPolicy::Queue => {
                    log::debug!(
                        "Queueing diff {} behind {} pending request(s)",
                        request.diff.id(),
                        self.pending.len()
                    );
                    self.pending.push_back(request);
                    Offer::Deferred
                }
                PendingPolicy::Reject => {
                    log::warn!(
                        "New data (diff {}) arrived while a draw is still waiting for a surface, rejecting it",
                        request.diff.id()
                    );
                    Offer::Rejected
                }
            },
            SchedulerState::Dispatching => {
                log::warn!(
                    "New data (diff {}) arrived during a draw dispatch, rejecting it",
                    request.diff.id()
                );
                Offer::Rejected
            }
        }
    }

    /// The surface now has a size. Returns the parked requests in arrival
    /// order; call `dispatched` once they have been drawn.
    pub fn surface_measured(&mut self) -> Vec<PendingDrawRequest> {
        if self.state != SchedulerState::WaitingForSurface {
            return Vec::new();
        }

        self.state = SchedulerState::Dispatching;
        self.pending.drain(..).collect()
    }

    pub fn dispatched(&mut self) {
        if self.state == SchedulerState::Dispatching {
            self.state = SchedulerState::Idle;
        }
    }
}
