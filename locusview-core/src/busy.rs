//! Busy indicator with scoped acquisition
//!
//! Nested operations each take a `BusyGuard`; the indicator switches on when
//! the first guard is taken and off when the last one is dropped.

use std::cell::Cell;
use std::rc::Rc;

use crate::observer::ViewportObserver;
use crate::types::ViewportId;

pub struct BusyIndicator {
    viewport: ViewportId,
    count: Cell<usize>,
    observer: Rc<dyn ViewportObserver>,
}

impl BusyIndicator {
    pub fn new(viewport: ViewportId, observer: Rc<dyn ViewportObserver>) -> Self {
        Self {
            viewport,
            count: Cell::new(0),
            observer,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.count.get() > 0
    }

    pub fn depth(&self) -> usize {
        self.count.get()
    }

    pub fn enter(&self) {
        let count = self.count.get();
        self.count.set(count + 1);
        if count == 0 {
            self.observer.busy_changed(self.viewport, true);
        }
    }

    pub fn leave(&self) {
        match self.count.get() {
            0 => log::warn!("Busy indicator for viewport {} released more often than taken", self.viewport),
            1 => {
                self.count.set(0);
                self.observer.busy_changed(self.viewport, false);
            }
            n => self.count.set(n - 1),
        }
    }
}

impl std::fmt::Debug for BusyIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusyIndicator")
            .field("viewport", &self.viewport)
            .field("count", &self.count.get())
            .finish()
    }
}

/// Holds the indicator busy until dropped
#[must_use = "the indicator is released as soon as the guard is dropped"]
pub struct BusyGuard {
    indicator: Rc<BusyIndicator>,
}

impl BusyGuard {
    pub fn new(indicator: &Rc<BusyIndicator>) -> Self {
        indicator.enter();
        Self {
            indicator: Rc::clone(indicator),
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.indicator.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{EngineEvent, RecordingObserver};

    fn indicator() -> (Rc<RecordingObserver>, Rc<BusyIndicator>) {
        let observer = Rc::new(RecordingObserver::new());
        let indicator = Rc::new(BusyIndicator::new(ViewportId(1), observer.clone()));
        (observer, indicator)
    }

    #[test]
    fn test_nested_guards_toggle_once() {
        let (observer, indicator) = indicator();
        {
            let _outer = BusyGuard::new(&indicator);
            {
                let _inner = BusyGuard::new(&indicator);
                assert_eq!(indicator.depth(), 2);
            }
            assert!(indicator.is_busy());
        }
        assert!(!indicator.is_busy());

        assert_eq!(
            observer.events(),
            vec![
                EngineEvent::BusyChanged { viewport: ViewportId(1), busy: true },
                EngineEvent::BusyChanged { viewport: ViewportId(1), busy: false },
            ]
        );
    }

    #[test]
    fn test_guard_released_on_early_return() {
        fn fails(indicator: &Rc<BusyIndicator>) -> Result<(), ()> {
            let _guard = BusyGuard::new(indicator);
            let step: Result<u32, ()> = Err(());
            step?;
            Ok(())
        }

        let (_, indicator) = indicator();
        assert!(fails(&indicator).is_err());
        assert_eq!(indicator.depth(), 0);
    }

    #[test]
    fn test_extra_leave_clamped() {
        let (observer, indicator) = indicator();
        indicator.leave();
        assert_eq!(indicator.depth(), 0);
        assert!(observer.events().is_empty());
    }
}
