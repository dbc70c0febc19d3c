//! Busy indicator accounting
//!
//! Chat and scan requests can overlap. The indicator is reference counted:
//! the first outstanding request mounts it, the last one to settle removes
//! it, so one flow can never take down another flow's spinner.

use std::cell::Cell;
use tracing::debug;

use crate::ports::BusyView;

#[derive(Debug, Default)]
pub struct BusyTracker {
    active: Cell<usize>,
    acquired: Cell<u64>,
    released: Cell<u64>,
}

impl BusyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one request as outstanding
    pub fn acquire<'a, V: BusyView>(&'a self, view: &'a V) -> BusyGuard<'a, V> {
        if self.active.get() == 0 {
            view.mount_indicator();
        }
        self.active.set(self.active.get() + 1);
        self.acquired.set(self.acquired.get() + 1);
        debug!(active = self.active.get(), "Busy indicator acquired");

        BusyGuard {
            tracker: self,
            view,
            released: false,
        }
    }

    fn release<V: BusyView>(&self, view: &V) {
        let active = self.active.get().saturating_sub(1);
        self.active.set(active);
        self.released.set(self.released.get() + 1);
        if active == 0 {
            view.unmount_indicator();
        }
        debug!(active, "Busy indicator released");
    }

    /// Requests currently outstanding
    pub fn active(&self) -> usize {
        self.active.get()
    }

    pub fn acquired(&self) -> u64 {
        self.acquired.get()
    }

    pub fn released(&self) -> u64 {
        self.released.get()
    }
}

/// One request's hold on the indicator. Released exactly once.
pub struct BusyGuard<'a, V: BusyView> {
    tracker: &'a BusyTracker,
    view: &'a V,
    released: bool,
}

impl<V: BusyView> BusyGuard<'_, V> {
    pub fn release(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if !self.released {
            self.released = true;
            self.tracker.release(self.view);
        }
    }
}

impl<V: BusyView> Drop for BusyGuard<'_, V> {
    fn drop(&mut self) {
        self.finish();
    }
}
