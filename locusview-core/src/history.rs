//! Back-button history

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::mark::Mark;
use crate::types::{SeqCoord, SequenceBounds};

/// Snapshot of a viewport taken before a zoom or move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub region_start: SeqCoord,
    pub region_end: SeqCoord,
    pub zoom_factor: f64,
    pub mark: Option<Mark>,
    /// Strand the coordinates were recorded on
    pub reversed: bool,
}

impl HistoryEntry {
    /// The same entry expressed on the opposite strand.
    pub fn mirrored(&self, bounds: &SequenceBounds) -> Self {
        Self {
            region_start: bounds.mirror(self.region_end),
            region_end: bounds.mirror(self.region_start),
            zoom_factor: self.zoom_factor,
            mark: self.mark.map(|mark| Mark {
                set: mark.set,
                start: bounds.mirror(mark.end),
                end: bounds.mirror(mark.start),
            }),
            reversed: !self.reversed,
        }
    }

    /// Entry ready to apply to a viewport whose strand is `reversed`
    pub fn oriented(&self, bounds: &SequenceBounds, reversed: bool) -> Self {
        if self.reversed == reversed {
            *self
        } else {
            self.mirrored(bounds)
        }
    }
}

/// Bounded stack; pushing past capacity drops the oldest entry.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn pop(&mut self) -> Option<HistoryEntry> {
        self.entries.pop_back()
    }

    pub fn peek(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
