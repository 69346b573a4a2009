//! The Trip Schedule Oracle (§4.3): pre-computed active-hour buckets answering "is this trip
//! running at (weekday, hour)?" in O(1), plus per-segment activity windows.

use std::collections::HashSet;

use crate::ids::{ServiceId, ShapeId};

/// An in-day time. `secs` is always `< 86_400`; `overflow` records whether the GTFS source value
/// was `>= 24:00:00` (continuation past midnight).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeOfDay {
    pub secs: u32,
    pub overflow: bool,
}

impl TimeOfDay {
    pub fn from_raw_seconds(raw: u32) -> Self {
        if raw >= 86_400 {
            TimeOfDay {
                secs: raw - 86_400,
                overflow: true,
            }
        } else {
            TimeOfDay {
                secs: raw,
                overflow: false,
            }
        }
    }

    fn hour(self) -> u8 {
        (self.secs / 3600).min(23) as u8
    }
}

/// One trip's pre-computed schedule-oracle entry.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TripWithSchedule {
    pub service_id: ServiceId,
    pub shape_id: ShapeId,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub active_hours: HashSet<(u8, u8, bool)>,
}

impl TripWithSchedule {
    pub fn new(service_id: ServiceId, shape_id: ShapeId, days_of_week: u8, start: TimeOfDay, end: TimeOfDay) -> Self {
        TripWithSchedule {
            service_id,
            shape_id,
            start,
            end,
            active_hours: build_active_hours(days_of_week, start, end),
        }
    }

    /// Probes the active-hour set for `(weekday, hour)`; returns the overtime bit on a hit.
    pub fn probe(&self, weekday: u8, hour: u8) -> Option<bool> {
        if self.active_hours.contains(&(weekday, hour, false)) {
            return Some(false);
        }
        if self.active_hours.contains(&(weekday, hour, true)) {
            return Some(true);
        }
        None
    }
}

/// Builds the `(weekday, hour, overtime_bit)` set for a trip active on `days_of_week` (bit 0 =
/// Monday .. bit 6 = Sunday) running from `start` to `end`.
///
/// Three cases, matching the reference oracle exactly:
/// - the whole interval starts past midnight (`start.overflow`): every active weekday is shifted
///   `+1 mod 7` and every generated hour carries the overtime bit.
/// - only the end overflows: hours up to midnight keep the original weekday with no overtime
///   bit; hours from midnight onward belong to the shifted weekday and carry the overtime bit.
/// - neither overflows: hours `[start.secs, end.secs]` on the unshifted weekday, no overtime bit.
fn build_active_hours(days_of_week: u8, start: TimeOfDay, end: TimeOfDay) -> HashSet<(u8, u8, bool)> {
    let mut set = HashSet::new();

    for wd in 0u8..7 {
        if days_of_week & (1 << wd) == 0 {
            continue;
        }

        if start.overflow {
            let shifted = (wd + 1) % 7;
            for h in hour_range(start.secs, end.secs.max(start.secs)) {
                set.insert((shifted, h, true));
            }
        } else if end.overflow {
            for h in hour_range(start.secs, 86_399) {
                set.insert((wd, h, false));
            }
            let shifted = (wd + 1) % 7;
            for h in hour_range(0, end.secs) {
                set.insert((shifted, h, true));
            }
        } else {
            for h in hour_range(start.secs, end.secs) {
                set.insert((wd, h, false));
            }
        }
    }

    set
}

fn hour_range(start_secs: u32, end_secs: u32) -> impl Iterator<Item = u8> {
    let start_h = (start_secs / 3600).min(23) as u8;
    let end_h = (end_secs / 3600).min(23) as u8;
    start_h..=end_h
}
