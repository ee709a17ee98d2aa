//! Lock groups keep sibling viewports scrolling and zooming together.
//!
//! A viewport is in at most one group. Operations are fanned out as
//! `PropagatedOp` values; each member applies them against its own state,
//! so members with different starting points stay proportionally in step.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{ViewportError, ViewportResult};
use crate::types::{LockAxis, SeqCoord, ViewportId};

/// An operation sent to every member of a lock group
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PropagatedOp {
    /// Relative zoom. `None` anchors each member on its own region centre.
    Zoom { multiplier: f64, anchor: Option<SeqCoord> },
    Move { start: SeqCoord, end: SeqCoord },
    MarkSet { start: SeqCoord, end: SeqCoord },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupId(u32);

#[derive(Debug, Clone)]
pub struct LockGroup {
    axis: LockAxis,
    members: IndexSet<ViewportId>,
}

impl LockGroup {
    pub fn axis(&self) -> LockAxis {
        self.axis
    }

    pub fn members(&self) -> impl Iterator<Item = ViewportId> + '_ {
        self.members.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct LockRegistry {
    groups: IndexMap<GroupId, LockGroup>,
    membership: HashMap<ViewportId, GroupId>,
    next_group: u32,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group_of(&self, viewport: ViewportId) -> Option<&LockGroup> {
        self.membership
            .get(&viewport)
            .and_then(|group| self.groups.get(group))
    }

    pub fn axis_of(&self, viewport: ViewportId) -> LockAxis {
        self.group_of(viewport)
            .map(LockGroup::axis)
            .unwrap_or(LockAxis::None)
    }

    pub fn is_locked(&self, viewport: ViewportId) -> bool {
        self.membership.contains_key(&viewport)
    }

    /// Members of the viewport's group in join order, or just the viewport
    /// itself when it is not locked.
    pub fn members_of(&self, viewport: ViewportId) -> Vec<ViewportId> {
        match self.group_of(viewport) {
            Some(group) => group.members().collect(),
            None => vec![viewport],
        }
    }

    fn create_group(&mut self, axis: LockAxis) -> GroupId {
        let id = GroupId(self.next_group);
        self.next_group += 1;
        self.groups.insert(
            id,
            LockGroup {
                axis,
                members: IndexSet::new(),
            },
        );
        id
    }

    fn join(&mut self, viewport: ViewportId, group: GroupId) {
        if let Some(entry) = self.groups.get_mut(&group) {
            entry.members.insert(viewport);
            self.membership.insert(viewport, group);
        }
    }

    /// Lock `viewport` on `axis`, joining the first existing group for that
    /// axis or starting a new one. Locking on `LockAxis::None` unlocks.
    pub fn lock(&mut self, viewport: ViewportId, axis: LockAxis) {
        if axis == LockAxis::None {
            let _ = self.leave(viewport);
            return;
        }

        match self.axis_of(viewport) {
            current if current == axis => return,
            LockAxis::None => {}
            _ => {
                let _ = self.leave(viewport);
            }
        }

        let existing = self
            .groups
            .iter()
            .find(|(_, group)| group.axis == axis)
            .map(|(id, _)| *id);
        let group = match existing {
            Some(group) => group,
            None => self.create_group(axis),
        };

        log::debug!("Locking viewport {} on {:?} axis", viewport, axis);
        self.join(viewport, group);
    }

    /// Lock `viewport` together with `sibling` on `axis`. The sibling is
    /// moved onto that axis first if it is locked differently.
    pub fn lock_with(&mut self, viewport: ViewportId, sibling: ViewportId, axis: LockAxis) {
        if axis == LockAxis::None || viewport == sibling {
            self.lock(viewport, axis);
            return;
        }

        if self.axis_of(sibling) != axis {
            let _ = self.leave(sibling);
            let group = self.create_group(axis);
            self.join(sibling, group);
        }

        if self.membership.get(&viewport) == self.membership.get(&sibling) {
            return;
        }
        if self.is_locked(viewport) {
            let _ = self.leave(viewport);
        }

        if let Some(group) = self.membership.get(&sibling).copied() {
            log::debug!("Locking viewport {} with {} on {:?} axis", viewport, sibling, axis);
            self.join(viewport, group);
        }
    }

    /// Put a duplicate of `source` into the same group as `source`.
    pub fn copy_lock(&mut self, source: ViewportId, copy: ViewportId) {
        if let Some(group) = self.membership.get(&source).copied() {
            self.join(copy, group);
        }
    }

    fn leave(&mut self, viewport: ViewportId) -> ViewportResult<()> {
        let group = self
            .membership
            .remove(&viewport)
            .ok_or_else(|| ViewportError::not_locked(viewport))?;

        let remaining = match self.groups.get_mut(&group) {
            Some(entry) => {
                entry.members.shift_remove(&viewport);
                entry.members.len()
            }
            None => 0,
        };

        if remaining <= 1 {
            if let Some(dissolved) = self.groups.shift_remove(&group) {
                for member in dissolved.members {
                    self.membership.remove(&member);
                }
                log::debug!("Lock group {:?} dissolved", group);
            }
        }

        Ok(())
    }

    /// Remove `viewport` from its group. A group left with a single member
    /// is dissolved.
    pub fn unlock(&mut self, viewport: ViewportId) -> ViewportResult<()> {
        self.leave(viewport)?;
        log::debug!("Unlocked viewport {}", viewport);
        Ok(())
    }

    /// Which viewports receive `op` when it starts at `origin`.
    ///
    /// Vertical groups share the sequence axis so every member gets the op
    /// unchanged. Horizontal groups only share zoom: other members zoom
    /// about their own centre and a move stays with the origin.
    pub fn targets(&self, origin: ViewportId, op: PropagatedOp) -> Vec<(ViewportId, PropagatedOp)> {
        let Some(group) = self.group_of(origin) else {
            return vec![(origin, op)];
        };

        match (group.axis, op) {
            (LockAxis::Horizontal, PropagatedOp::Move { .. }) => vec![(origin, op)],
            (LockAxis::Horizontal, PropagatedOp::Zoom { multiplier, .. }) => group
                .members()
                .map(|member| {
                    if member == origin {
                        (member, op)
                    } else {
                        (member, PropagatedOp::Zoom { multiplier, anchor: None })
                    }
                })
                .collect(),
            _ => group.members().map(|member| (member, op)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ViewportId = ViewportId(1);
    const B: ViewportId = ViewportId(2);
    const C: ViewportId = ViewportId(3);

    #[test]
    fn test_lock_joins_existing_group() {
        let mut locks = LockRegistry::new();
        locks.lock(A, LockAxis::Vertical);
        assert_eq!(locks.members_of(A), vec![A]);

        locks.lock(B, LockAxis::Vertical);
        locks.lock(C, LockAxis::Vertical);
        assert_eq!(locks.group_count(), 1);
        assert_eq!(locks.members_of(B), vec![A, B, C]);
    }

    #[test]
    fn test_same_axis_is_noop_and_other_axis_moves() {
        let mut locks = LockRegistry::new();
        locks.lock(A, LockAxis::Vertical);
        locks.lock(B, LockAxis::Vertical);
        locks.lock(B, LockAxis::Vertical);
        assert_eq!(locks.members_of(A), vec![A, B]);

        // B leaves, which dissolves A's group, then starts a horizontal one
        locks.lock(B, LockAxis::Horizontal);
        assert!(!locks.is_locked(A));
        assert_eq!(locks.axis_of(B), LockAxis::Horizontal);
    }

    #[test]
    fn test_unlock_dissolves_pair() {
        let mut locks = LockRegistry::new();
        locks.lock(A, LockAxis::Vertical);
        locks.lock(B, LockAxis::Vertical);
        locks.unlock(A).unwrap();

        assert!(!locks.is_locked(B));
        assert_eq!(locks.group_count(), 0);
        assert_eq!(locks.unlock(A), Err(ViewportError::NotLocked { viewport: A }));
    }

    #[test]
    fn test_unlock_keeps_larger_group() {
        let mut locks = LockRegistry::new();
        for v in [A, B, C] {
            locks.lock(v, LockAxis::Vertical);
        }
        locks.unlock(B).unwrap();
        assert_eq!(locks.members_of(A), vec![A, C]);
        assert_eq!(locks.members_of(B), vec![B]);
    }

    #[test]
    fn test_lock_with_sibling() {
        let mut locks = LockRegistry::new();
        locks.lock(A, LockAxis::Horizontal);
        locks.lock_with(B, C, LockAxis::Vertical);
        assert_eq!(locks.members_of(C), vec![C, B]);
        assert_eq!(locks.axis_of(B), LockAxis::Vertical);
        assert_eq!(locks.members_of(A), vec![A]);
    }

    #[test]
    fn test_copy_lock() {
        let mut locks = LockRegistry::new();
        locks.lock(A, LockAxis::Vertical);
        locks.copy_lock(A, B);
        assert_eq!(locks.members_of(B), vec![A, B]);

        locks.copy_lock(C, ViewportId(4));
        assert!(!locks.is_locked(ViewportId(4)));
    }

    #[test]
    fn test_targets_by_axis() {
        let mut locks = LockRegistry::new();
        let zoom = PropagatedOp::Zoom { multiplier: 2.0, anchor: Some(500.0) };
        let mv = PropagatedOp::Move { start: 1.0, end: 10.0 };

        assert_eq!(locks.targets(A, mv), vec![(A, mv)]);

        locks.lock(A, LockAxis::Vertical);
        locks.lock(B, LockAxis::Vertical);
        assert_eq!(locks.targets(B, zoom), vec![(A, zoom), (B, zoom)]);
        assert_eq!(locks.targets(B, mv), vec![(A, mv), (B, mv)]);

        locks.lock(A, LockAxis::Horizontal);
        locks.lock(B, LockAxis::Horizontal);
        assert_eq!(locks.targets(A, mv), vec![(A, mv)]);
        assert_eq!(
            locks.targets(A, zoom),
            vec![(A, zoom), (B, PropagatedOp::Zoom { multiplier: 2.0, anchor: None })]
        );
    }
}
