//! The Timetable Snapshot (§3, §4.9): the read-only, in-memory projection of a GTFS dataset the
//! match engine runs against.

pub mod oracle;
pub mod realtime;

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use chrono_tz::Tz;

use crate::geo::Coordinate;
use crate::graph::{GraphSnapshot, ShapeEdgeGraph};
use crate::ids::{AgencyId, EdgeId, RouteId, ServiceId, ShapeId, StopId, TripId};

pub use oracle::{TimeOfDay, TripWithSchedule};
pub use realtime::{RealtimeTable, RealtimeUpdate, TimeDelta};

pub const EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(2000, 1, 1) {
    Some(d) => d,
    None => unreachable!(),
};

pub fn date_to_days(date: NaiveDate) -> u32 {
    (date - EPOCH).num_days().max(0) as u32
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Stop {
    pub stop_id: StopId,
    pub name: String,
    pub coord: Coordinate,
    pub parent_station: Option<StopId>,
}

/// A weekly repeating activity pattern with date-specific overrides (§3 `Service`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Service {
    pub days_of_week: u8,
    pub start_date: u32,
    pub end_date: u32,
    pub added_dates: Vec<u32>,
    pub removed_dates: Vec<u32>,
}

impl Service {
    pub fn is_active(&self, date: u32, weekday: u8) -> bool {
        if self.removed_dates.binary_search(&date).is_ok() {
            return false;
        }
        if self.added_dates.binary_search(&date).is_ok() {
            return true;
        }
        date >= self.start_date && date <= self.end_date && (self.days_of_week & (1 << weekday)) != 0
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Agency {
    pub name: String,
    pub url: String,
    pub timezone: String,
}

/// `color`/`text_color` are `None` when the GTFS feed left the field at its own library default
/// (white fill, black text) — treated as "not specified" so the Response Assembler's category
/// override (§6) can tell an explicit route colour from an absent one.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Route {
    pub short_name: String,
    pub long_name: String,
    pub route_type: i16,
    pub agency_id: Option<AgencyId>,
    pub color: Option<String>,
    pub text_color: Option<String>,
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct StopTimeEntry {
    pub stop_id: StopId,
    pub arrival: TimeOfDay,
    pub departure: TimeOfDay,
    pub stop_sequence: u32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Trip {
    pub route_id: RouteId,
    pub service_id: ServiceId,
    pub shape_id: ShapeId,
    pub headsign: Option<String>,
    pub stop_times: Vec<StopTimeEntry>,
}

impl Trip {
    pub fn segment_count(&self) -> usize {
        self.stop_times.len().saturating_sub(1)
    }

    pub fn destination_name<'a>(&self, stops: &'a [Stop]) -> Option<&'a str> {
        self.stop_times
            .last()
            .map(|st| stops[st.stop_id.index()].name.as_str())
    }
}

/// A shape's geometry, as built during ingestion: the ordered polyline coordinates and the
/// corresponding Shape-Edge Graph edges.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ShapeRecord {
    pub shape_string_id: String,
    pub coords: Vec<Coordinate>,
    pub edge_ids: Vec<EdgeId>,
    pub seed_edge: EdgeId,
}

/// Keyed by `shape_hash` (§3): `{edge_id -> [trip_segment_index]}` plus the parallel
/// `[trip_segment_index -> polyline]`. Multiple trips sharing the same shape share this entry —
/// the core space optimisation (§9).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct EdgeTripSegmentIndex {
    pub edge_to_segments: HashMap<EdgeId, Vec<usize>>,
    pub segment_polylines: Vec<(Coordinate, Coordinate)>,
}

/// The full read-only projection of a GTFS dataset that match requests run against.
pub struct Timetable {
    pub graph: ShapeEdgeGraph,
    pub timezone: Tz,

    pub stops: Vec<Stop>,
    pub stop_name_index: HashMap<String, Vec<StopId>>,

    pub services: Vec<Service>,
    pub routes: Vec<Route>,
    pub agencies: Vec<Agency>,

    pub trips: Vec<Trip>,
    pub trip_schedules: Vec<TripWithSchedule>,
    pub trip_id_strings: Vec<String>,
    pub trip_id_index: HashMap<String, TripId>,

    pub shapes: HashMap<ShapeId, ShapeRecord>,
    pub shape_hash_of: HashMap<ShapeId, u64>,
    pub edge_index: HashMap<u64, EdgeTripSegmentIndex>,
    pub shape_id_strings: Vec<String>,
    pub shape_id_index: HashMap<String, ShapeId>,

    /// Departures at each stop, `(trip_id, stop_time_index)`, sorted by departure second-of-day.
    pub stop_departures: HashMap<StopId, Vec<(TripId, usize)>>,
}

impl Timetable {
    pub fn trip(&self, id: TripId) -> &Trip {
        &self.trips[id.index()]
    }

    pub fn trip_schedule(&self, id: TripId) -> &TripWithSchedule {
        &self.trip_schedules[id.index()]
    }

    pub fn route(&self, id: RouteId) -> &Route {
        &self.routes[id.index()]
    }

    pub fn service(&self, id: ServiceId) -> &Service {
        &self.services[id.index()]
    }

    pub fn trip_id_string(&self, id: TripId) -> &str {
        &self.trip_id_strings[id.index()]
    }

    pub fn shape_id_string(&self, id: ShapeId) -> &str {
        &self.shape_id_strings[id.index()]
    }

    pub fn local_time(&self, t_unix_seconds: i64) -> NaiveDateTime {
        use chrono::TimeZone;
        self.timezone
            .timestamp_opt(t_unix_seconds, 0)
            .single()
            .expect("valid unix timestamp")
            .naive_local()
    }

    /// Whether `trip_id` is running at local time `now`, per §4.3's `is_trip_active`: probe the
    /// active-hour set directly, falling back to realtime-shifted probes when a realtime table
    /// is supplied. Returns `(active, overtime_bit)`.
    pub fn is_trip_active(&self, trip_id: TripId, now: NaiveDateTime, realtime: Option<&RealtimeTable>) -> (bool, bool) {
        let weekday = now.weekday().num_days_from_monday() as u8;
        let hour = now.hour() as u8;
        let date = date_to_days(now.date());
        let schedule = self.trip_schedule(trip_id);
        let service = self.service(schedule.service_id);

        if let Some(updates) = realtime.and_then(|rt| rt.for_trip(trip_id)) {
            let nominal_epoch_for_seq = |_seq: u32| now.and_utc().timestamp();
            for delta in realtime::delays_to_check(updates, nominal_epoch_for_seq) {
                let shifted = now - chrono::Duration::seconds(delta);
                let wd = shifted.weekday().num_days_from_monday() as u8;
                let h = shifted.hour() as u8;
                let d = date_to_days(shifted.date());
                if let Some(overtime) = schedule.probe(wd, h) {
                    let effective_date = if overtime { d.saturating_sub(1) } else { d };
                    if service.removed_dates.binary_search(&effective_date).is_ok() {
                        return (false, overtime);
                    }
                    return (true, overtime);
                }
            }
            return (false, false);
        }

        if let Some(overtime) = schedule.probe(weekday, hour) {
            let effective_date = if overtime { date.saturating_sub(1) } else { date };
            if service.removed_dates.binary_search(&effective_date).is_ok() {
                return (false, overtime);
            }
            return (true, overtime);
        }

        if service.added_dates.binary_search(&date).is_ok() {
            return (true, false);
        }

        (false, false)
    }

    /// §4.3's `active_segments`: segments of `trip_id` whose widened `[start, end]` window
    /// (after delay/earliness, realtime offsets, and the day-shift matrix) brackets `now`.
    #[allow(clippy::too_many_arguments)]
    pub fn active_segments(
        &self,
        trip_id: TripId,
        edge_id: EdgeId,
        now: NaiveDateTime,
        realtime: Option<&RealtimeTable>,
        ignore_start_end_date: bool,
        delay_secs: i64,
        earliness_secs: i64,
    ) -> Vec<usize> {
        let schedule = self.trip_schedule(trip_id);
        let service = self.service(schedule.service_id);

        if !ignore_start_end_date {
            let date = date_to_days(now.date());
            if !(service.start_date < date && date < service.end_date) {
                return Vec::new();
            }
        }

        let (active, user_overtime) = self.is_trip_active(trip_id, now, realtime);
        if !active {
            return Vec::new();
        }

        let shape_hash = self.shape_hash_of[&schedule.shape_id];
        let index = match self.edge_index.get(&shape_hash) {
            Some(idx) => idx,
            None => return Vec::new(),
        };
        let candidate_segments = match index.edge_to_segments.get(&edge_id) {
            Some(segs) => segs,
            None => return Vec::new(),
        };

        let trip = self.trip(trip_id);
        let updates = realtime.and_then(|rt| rt.for_trip(trip_id)).unwrap_or(&[]);
        let today = now.date();
        let timezone = self.timezone;
        let nominal_epoch = |day_shift_days: i64, secs: u32| -> i64 {
            use chrono::TimeZone;
            let day = today + chrono::Duration::days(day_shift_days);
            let naive = day.and_hms_opt(0, 0, 0).expect("valid midnight") + chrono::Duration::seconds(secs as i64);
            timezone
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.timestamp())
                .unwrap_or_else(|| naive.and_utc().timestamp())
        };

        let mut out = Vec::new();
        for &seg in candidate_segments {
            if seg + 1 >= trip.stop_times.len() {
                continue;
            }
            let st_start = trip.stop_times[seg];
            let st_end = trip.stop_times[seg + 1];

            let (td_start, td_end) = day_shift(user_overtime, st_start.arrival.overflow, st_end.arrival.overflow);

            let nominal_start = nominal_epoch(td_start, st_start.arrival.secs);
            let nominal_end = nominal_epoch(td_end, st_end.arrival.secs);

            let (start_delay, end_delay) = realtime::segment_offsets(
                updates,
                st_start.stop_sequence,
                st_end.stop_sequence,
                nominal_start,
                nominal_end,
            );

            let start_with_offset =
                st_start.arrival.secs as i64 - earliness_secs + td_start * 86_400 + start_delay;
            let end_with_offset = st_end.arrival.secs as i64 + delay_secs + td_end * 86_400 + end_delay;

            let now_secs = now.num_seconds_from_midnight() as i64;
            if start_with_offset <= now_secs && now_secs <= end_with_offset {
                out.push(seg);
            }
        }

        out
    }
}

/// A serializable projection of a [`Timetable`] (§9 snapshot persistence, §4.9): identical field
/// set, with the graph reduced to [`GraphSnapshot`] and the timezone stored by IANA name so the
/// whole thing is plain data for `postcard`.
#[derive(serde::Serialize, serde::Deserialize)]
pub struct TimetableSnapshot {
    pub graph: GraphSnapshot,
    pub timezone: String,

    pub stops: Vec<Stop>,
    pub stop_name_index: HashMap<String, Vec<StopId>>,

    pub services: Vec<Service>,
    pub routes: Vec<Route>,
    pub agencies: Vec<Agency>,

    pub trips: Vec<Trip>,
    pub trip_schedules: Vec<TripWithSchedule>,
    pub trip_id_strings: Vec<String>,
    pub trip_id_index: HashMap<String, TripId>,

    pub shapes: HashMap<ShapeId, ShapeRecord>,
    pub shape_hash_of: HashMap<ShapeId, u64>,
    pub edge_index: HashMap<u64, EdgeTripSegmentIndex>,
    pub shape_id_strings: Vec<String>,
    pub shape_id_index: HashMap<String, ShapeId>,

    pub stop_departures: HashMap<StopId, Vec<(TripId, usize)>>,
}

impl Timetable {
    /// Reduces this snapshot to its serializable form (§9). The timezone is re-resolved from its
    /// IANA name on load, falling back to UTC if the name no longer parses (DESIGN.md: a stored
    /// snapshot never fails a load over this, it just degrades to UTC and gets logged).
    pub fn to_snapshot(&self) -> TimetableSnapshot {
        TimetableSnapshot {
            graph: self.graph.to_snapshot(),
            timezone: self.timezone.name().to_string(),
            stops: self.stops.clone(),
            stop_name_index: self.stop_name_index.clone(),
            services: self.services.clone(),
            routes: self.routes.clone(),
            agencies: self.agencies.clone(),
            trips: self.trips.clone(),
            trip_schedules: self.trip_schedules.clone(),
            trip_id_strings: self.trip_id_strings.clone(),
            trip_id_index: self.trip_id_index.clone(),
            shapes: self.shapes.clone(),
            shape_hash_of: self.shape_hash_of.clone(),
            edge_index: self.edge_index.clone(),
            shape_id_strings: self.shape_id_strings.clone(),
            shape_id_index: self.shape_id_index.clone(),
            stop_departures: self.stop_departures.clone(),
        }
    }

    pub fn from_snapshot(snapshot: TimetableSnapshot) -> Self {
        let timezone = snapshot.timezone.parse().unwrap_or(chrono_tz::UTC);
        Timetable {
            graph: ShapeEdgeGraph::from_snapshot(snapshot.graph),
            timezone,
            stops: snapshot.stops,
            stop_name_index: snapshot.stop_name_index,
            services: snapshot.services,
            routes: snapshot.routes,
            agencies: snapshot.agencies,
            trips: snapshot.trips,
            trip_schedules: snapshot.trip_schedules,
            trip_id_strings: snapshot.trip_id_strings,
            trip_id_index: snapshot.trip_id_index,
            shapes: snapshot.shapes,
            shape_hash_of: snapshot.shape_hash_of,
            edge_index: snapshot.edge_index,
            shape_id_strings: snapshot.shape_id_strings,
            shape_id_index: snapshot.shape_id_index,
            stop_departures: snapshot.stop_departures,
        }
    }
}

trait NumSecondsFromMidnight {
    fn num_seconds_from_midnight(&self) -> u32;
}

impl NumSecondsFromMidnight for NaiveDateTime {
    fn num_seconds_from_midnight(&self) -> u32 {
        self.time().num_seconds_from_midnight()
    }
}

/// The 4-case day-shift matrix of §4.3 (`user_in_overtime` × `start_ot` × `end_ot`), returned in
/// whole days to add to each bracket endpoint. Also used by the Identity Resolver's
/// schedule-time residual (§4.7.1), which brackets the same segment endpoints.
pub(crate) fn day_shift(user_overtime: bool, start_ot: bool, end_ot: bool) -> (i64, i64) {
    match (user_overtime, start_ot, end_ot) {
        (true, false, false) => (-1, -1),
        (true, false, true) => (-1, 0),
        (false, false, true) => (0, 1),
        (false, true, true) => (1, 1),
        _ => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_active_respects_removed_dates() {
        let svc = Service {
            days_of_week: 0b1, // Monday
            start_date: 0,
            end_date: 1000,
            added_dates: vec![],
            removed_dates: vec![500],
        };
        assert!(svc.is_active(100, 0));
        assert!(!svc.is_active(500, 0));
        assert!(!svc.is_active(100, 1));
    }

    #[test]
    fn service_active_on_added_date_regardless_of_weekday() {
        let svc = Service {
            days_of_week: 0,
            start_date: 0,
            end_date: 10,
            added_dates: vec![5],
            removed_dates: vec![],
        };
        assert!(svc.is_active(5, 3));
        assert!(!svc.is_active(6, 3));
    }

    #[test]
    fn day_shift_matches_table() {
        assert_eq!(day_shift(true, false, false), (-1, -1));
        assert_eq!(day_shift(true, false, true), (-1, 0));
        assert_eq!(day_shift(false, false, true), (0, 1));
        assert_eq!(day_shift(false, true, true), (1, 1));
        assert_eq!(day_shift(false, false, false), (0, 0));
    }

    /// §8 S4: a realtime correction that only carries a departure delta at the segment's end
    /// stop-sequence must fall back to the start delay rather than using that departure delta,
    /// bringing the middle segment's window forward far enough to bracket the query time.
    #[test]
    fn active_segments_applies_end_delay_fallback() {
        let (timetable, realtime, trip_id, edge_id, query_time) = crate::test_support::realtime_fallback_fixture();

        let segments = timetable.active_segments(trip_id, edge_id, query_time, Some(&realtime), false, 0, 0);
        assert_eq!(segments, vec![1]);
    }
}
