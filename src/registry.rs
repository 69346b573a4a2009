//! Snapshot/realtime registry (§4.9, §5): read-copy-update handles for the Timetable Snapshot
//! and the Realtime Table, served to request handlers through an explicit context argument.
//!
//! The teacher's original design kept process-wide state as bare globals (`IS_API_ON`, a user-id
//! counter, a server-start timestamp — DESIGN.md). This registry replaces that pattern: it is an
//! ordinary value, owned by `main` and handed to the web layer, never a `static`.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::timetable::{RealtimeTable, Timetable};

/// Shared, swappable handle to the live Timetable Snapshot and Realtime Table.
///
/// `timetable()` returns `None` until the first build completes; request handlers treat that as
/// "service unavailable" (§7). A rebuild publishes a brand new snapshot atomically — in-flight
/// requests keep the `Arc` they already loaded until they finish; nothing blocks on the swap.
#[derive(Default)]
pub struct SnapshotRegistry {
    timetable: ArcSwapOption<Timetable>,
    realtime: ArcSwapOption<RealtimeTable>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically publishes a freshly built Timetable, replacing whatever was previously served.
    pub fn publish_timetable(&self, timetable: Timetable) {
        self.timetable.store(Some(Arc::new(timetable)));
    }

    /// Atomically publishes a freshly decoded Realtime Table (§5, swapped independently of the
    /// Timetable Snapshot and at its own, typically much shorter, refresh period).
    pub fn publish_realtime(&self, realtime: RealtimeTable) {
        self.realtime.store(Some(Arc::new(realtime)));
    }

    /// The current Timetable snapshot, or `None` if no build has completed yet.
    pub fn timetable(&self) -> Option<Arc<Timetable>> {
        self.timetable.load_full()
    }

    /// The current Realtime Table. `None` is a normal, common state — realtime enhances but
    /// never blocks scheduled matching (§7).
    pub fn realtime(&self) -> Option<Arc<RealtimeTable>> {
        self.realtime.load_full()
    }
}
