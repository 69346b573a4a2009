//! `/connections` (§6): the next scheduled departures from a named stop, filtered to exclude the
//! caller's current trip and any departure terminating at the query stop itself.

use chrono::{Datelike, NaiveDateTime, TimeZone};

use crate::ids::TripId;
use crate::matcher::response::display_colors;
use crate::timetable::{Timetable, date_to_days};

const WINDOW_HOURS: i64 = 5;
const MAX_ENTRIES: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionEntry {
    pub route_short_name: String,
    pub destination: String,
    pub route_type: String,
    pub departure_epoch_ms: u64,
    pub route_color: String,
    pub route_text_color: String,
}

/// Up to [`MAX_ENTRIES`] upcoming departures from `stop_name` in the next [`WINDOW_HOURS`] hours,
/// deduplicated and sorted ascending by departure time (§6).
pub fn scheduled_departures(
    timetable: &Timetable,
    stop_name: &str,
    now_local: NaiveDateTime,
    exclude_trip: Option<TripId>,
) -> Vec<ConnectionEntry> {
    let window_end = now_local + chrono::Duration::hours(WINDOW_HOURS);
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    let Some(stop_ids) = timetable.stop_name_index.get(stop_name) else {
        return out;
    };

    for &stop_id in stop_ids {
        let Some(departures) = timetable.stop_departures.get(&stop_id) else {
            continue;
        };

        for &(trip_id, st_idx) in departures {
            if Some(trip_id) == exclude_trip {
                continue;
            }

            let trip = timetable.trip(trip_id);
            let Some(dest) = trip.destination_name(&timetable.stops) else {
                continue;
            };
            if dest == stop_name {
                continue;
            }

            let st = trip.stop_times[st_idx];
            let service = timetable.service(trip.service_id);

            // The departure's own calendar day is ambiguous by a day around midnight: an
            // overflowing stop-time (`st.departure.overflow`) belongs to the service date's next
            // wall-clock day, so both "today" and "yesterday" are checked as candidate service
            // dates and whichever actually falls in the window survives.
            for day_offset in [0i64, -1i64] {
                let service_date = now_local.date() + chrono::Duration::days(day_offset);
                let weekday = service_date.weekday().num_days_from_monday() as u8;
                if !service.is_active(date_to_days(service_date), weekday) {
                    continue;
                }

                let wall_date = service_date + chrono::Duration::days(if st.departure.overflow { 1 } else { 0 });
                let naive = wall_date.and_hms_opt(0, 0, 0).expect("valid midnight")
                    + chrono::Duration::seconds(st.departure.secs as i64);

                if naive < now_local || naive > window_end {
                    continue;
                }

                let route = timetable.route(trip.route_id);
                let (color, text_color) = display_colors(route);
                let epoch_ms = timetable
                    .timezone
                    .from_local_datetime(&naive)
                    .single()
                    .map(|dt| dt.timestamp_millis() as u64)
                    .unwrap_or_else(|| naive.and_utc().timestamp_millis() as u64);

                let key = (route.short_name.clone(), dest.to_string(), route.route_type, epoch_ms);
                if seen.insert(key) {
                    out.push(ConnectionEntry {
                        route_short_name: route.short_name.clone(),
                        destination: dest.to_string(),
                        route_type: route.route_type.to_string(),
                        departure_epoch_ms: epoch_ms,
                        route_color: color,
                        route_text_color: text_color,
                    });
                }
            }
        }
    }

    out.sort_by_key(|e| e.departure_epoch_ms);
    out.truncate(MAX_ENTRIES);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ettingen_overnight_connections_timetable, tiny_timetable};
    use chrono::NaiveDate;

    fn at(hms: (u32, u32, u32)) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hms.0, hms.1, hms.2)
            .unwrap()
    }

    #[test]
    fn finds_departure_within_window() {
        let timetable = tiny_timetable();
        let entries = scheduled_departures(&timetable, "Start", at((7, 55, 0)), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].route_short_name, "10");
        assert_eq!(entries[0].destination, "End");
    }

    #[test]
    fn excludes_hinted_trip() {
        let timetable = tiny_timetable();
        let entries = scheduled_departures(&timetable, "Start", at((7, 55, 0)), Some(TripId(0)));
        assert!(entries.is_empty());
    }

    #[test]
    fn excludes_departures_terminating_at_query_stop() {
        let timetable = tiny_timetable();
        // "End" is the trip's own destination, so it never shows as a connection from itself.
        let entries = scheduled_departures(&timetable, "End", at((7, 55, 0)), None);
        assert!(entries.is_empty());
    }

    #[test]
    fn outside_window_returns_nothing() {
        let timetable = tiny_timetable();
        let entries = scheduled_departures(&timetable, "Start", at((1, 0, 0)), None);
        assert!(entries.is_empty());
    }

    /// §8 S5 "connections overnight": querying late in the evening excludes the hinted trip even
    /// though it departs within the window, and surfaces the other trip's midnight-crossing
    /// departure at its correct next-day wall-clock time.
    #[test]
    fn overnight_departure_crosses_midnight_and_excludes_hinted_trip() {
        let timetable = ettingen_overnight_connections_timetable();
        let now = NaiveDate::from_ymd_opt(2022, 9, 15)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();

        let entries = scheduled_departures(&timetable, "Ettingen, Bahnhof", now, Some(TripId(0)));

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].route_short_name, "10");
        assert_eq!(entries[0].destination, "Oberwil BL, Huslimatt");

        let expected_epoch_ms = NaiveDate::from_ymd_opt(2022, 9, 16)
            .unwrap()
            .and_hms_opt(0, 30, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis() as u64;
        assert_eq!(entries[0].departure_epoch_ms, expected_epoch_ms);
    }
}
