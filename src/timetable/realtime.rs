//! GTFS-Realtime delay corrections (§3 `RealtimeUpdate`, §4.3.1 delay propagation).
//!
//! The core never decodes a GTFS-Realtime protobuf feed itself — it consumes already-decoded
//! [`RealtimeUpdate`] values, matching the "Realtime Feed" external collaborator in SPEC_FULL §1.

use std::collections::HashMap;

use crate::ids::TripId;

/// A single delay correction, expressed either as an absolute epoch second or a relative offset.
#[derive(Debug, Clone, Copy)]
pub enum TimeDelta {
    Absolute(i64),
    Relative(i64),
}

/// One stop-sequence's worth of realtime correction for a trip.
#[derive(Debug, Clone)]
pub struct RealtimeUpdate {
    pub stop_sequence: u32,
    pub arrival_delta: Option<TimeDelta>,
    pub departure_delta: Option<TimeDelta>,
    pub start_date: Option<u32>,
}

/// A whole-sale-replaceable table of per-trip realtime corrections, swapped under the same RCU
/// discipline as the Timetable Snapshot (§5).
#[derive(Debug, Clone, Default)]
pub struct RealtimeTable {
    updates: HashMap<TripId, Vec<RealtimeUpdate>>,
}

impl RealtimeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, trip_id: TripId, mut updates: Vec<RealtimeUpdate>) {
        updates.sort_by_key(|u| u.stop_sequence);
        self.updates.insert(trip_id, updates);
    }

    pub fn for_trip(&self, trip_id: TripId) -> Option<&[RealtimeUpdate]> {
        self.updates.get(&trip_id).map(Vec::as_slice)
    }
}

/// Resolves a [`TimeDelta`] to a signed second offset against a nominal stop-time expressed as
/// `seconds_since_epoch` (the stop-time's scheduled instant, after date/overflow adjustment).
fn resolve_delta(delta: TimeDelta, nominal_epoch_secs: i64) -> i64 {
    match delta {
        TimeDelta::Absolute(epoch) => epoch - nominal_epoch_secs,
        TimeDelta::Relative(secs) => secs,
    }
}

/// Implements the sparse-by-stop-sequence delay propagation rule (§4.3.1) for trip segment
/// `(seg_start_seq, seg_end_seq)` (0-based stop sequence indices bracketing the segment):
/// - the start delay is the largest `ss <= seg_start_seq` with a departure delta;
/// - the end delay is the smallest `ss >= seg_end_seq` with an arrival delta; if none carries
///   one, the start delay becomes the end delay too (no departure-delta fallback on the end
///   side — matches the Python original's `get_rt_offset`, which computes `start_delay` first).
///
/// `nominal_start_epoch`/`nominal_end_epoch` are the segment's own scheduled instants, used to
/// resolve absolute-epoch deltas into relative seconds.
pub fn segment_offsets(
    updates: &[RealtimeUpdate],
    seg_start_seq: u32,
    seg_end_seq: u32,
    nominal_start_epoch: i64,
    nominal_end_epoch: i64,
) -> (i64, i64) {
    let mut start_delay = 0i64;
    for u in updates.iter().filter(|u| u.stop_sequence <= seg_start_seq).rev() {
        if let Some(d) = u.departure_delta {
            start_delay = resolve_delta(d, nominal_start_epoch);
            break;
        }
    }

    let mut end_delay = start_delay;
    for u in updates.iter().filter(|u| u.stop_sequence >= seg_end_seq) {
        if let Some(d) = u.arrival_delta {
            end_delay = resolve_delta(d, nominal_end_epoch);
            break;
        }
    }

    (start_delay, end_delay)
}

/// Candidate `(second-offset)` shifts to try against the active-hour probe (§4.3) when realtime
/// data is present: every distinct, resolved delta across the trip's updates, in stop-sequence
/// order, deduplicated.
pub fn delays_to_check(updates: &[RealtimeUpdate], nominal_epoch_for_seq: impl Fn(u32) -> i64) -> Vec<i64> {
    let mut seen = Vec::new();
    for u in updates {
        let nominal = nominal_epoch_for_seq(u.stop_sequence);
        if let Some(d) = u.arrival_delta {
            let r = resolve_delta(d, nominal);
            if !seen.contains(&r) {
                seen.push(r);
            }
        }
        if let Some(d) = u.departure_delta {
            let r = resolve_delta(d, nominal);
            if !seen.contains(&r) {
                seen.push(r);
            }
        }
    }
    seen
}
