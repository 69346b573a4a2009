//! Test-only fixtures: a hand-built three-stop, one-trip Timetable, small enough to construct
//! inline but exercising every field the matcher touches. Used by unit tests across `matcher`,
//! `connections` and `shapes` instead of each re-deriving its own scaffolding.

#![cfg(test)]

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, TimeZone, Timelike};
use chrono_tz::UTC;

use crate::geo::Coordinate;
use crate::graph::ShapeEdgeGraph;
use crate::ids::{EdgeId, RouteId, ServiceId, ShapeId, StopId, TripId};
use crate::timetable::oracle::TimeOfDay;
use crate::timetable::realtime::{RealtimeTable, RealtimeUpdate, TimeDelta};
use crate::timetable::{
    EdgeTripSegmentIndex, Route, Service, ShapeRecord, Stop, StopTimeEntry, Timetable, Trip, TripWithSchedule,
};

/// A straight 3-stop line running 08:00 -> 08:05 -> 08:10, every day, with no realtime data.
pub(crate) fn tiny_timetable() -> Timetable {
    let mut graph = ShapeEdgeGraph::new();
    let a = graph.get_or_create_node(Coordinate::new(47.0, 7.0));
    let b = graph.get_or_create_node(Coordinate::new(47.001, 7.0));
    let c = graph.get_or_create_node(Coordinate::new(47.002, 7.0));
    let shape_id = ShapeId(0);
    let e1 = graph.add_edge(a, b, shape_id.0, 1);
    let e2 = graph.add_edge(b, c, shape_id.0, 2);

    let mut shapes = HashMap::new();
    shapes.insert(
        shape_id,
        ShapeRecord {
            shape_string_id: "shp_test".to_string(),
            coords: vec![graph.node_coord(a), graph.node_coord(b), graph.node_coord(c)],
            edge_ids: vec![e1, e2],
            seed_edge: e1,
        },
    );
    let shape_hash = 42u64;
    let mut shape_hash_of = HashMap::new();
    shape_hash_of.insert(shape_id, shape_hash);

    let stops = vec![
        Stop {
            stop_id: StopId(0),
            name: "Start".to_string(),
            coord: graph.node_coord(a),
            parent_station: None,
        },
        Stop {
            stop_id: StopId(1),
            name: "Middle".to_string(),
            coord: graph.node_coord(b),
            parent_station: None,
        },
        Stop {
            stop_id: StopId(2),
            name: "End".to_string(),
            coord: graph.node_coord(c),
            parent_station: None,
        },
    ];
    let mut stop_name_index: HashMap<String, Vec<StopId>> = HashMap::new();
    for s in &stops {
        stop_name_index.entry(s.name.clone()).or_default().push(s.stop_id);
    }

    let services = vec![Service {
        days_of_week: 0b111_1111,
        start_date: 0,
        end_date: 100_000,
        added_dates: vec![],
        removed_dates: vec![],
    }];

    let routes = vec![Route {
        short_name: "10".to_string(),
        long_name: "Line 10".to_string(),
        route_type: 3,
        agency_id: None,
        color: None,
        text_color: None,
    }];

    let start = TimeOfDay::from_raw_seconds(8 * 3600);
    let mid = TimeOfDay::from_raw_seconds(8 * 3600 + 5 * 60);
    let end = TimeOfDay::from_raw_seconds(8 * 3600 + 10 * 60);

    let stop_times = vec![
        StopTimeEntry {
            stop_id: StopId(0),
            arrival: start,
            departure: start,
            stop_sequence: 0,
        },
        StopTimeEntry {
            stop_id: StopId(1),
            arrival: mid,
            departure: mid,
            stop_sequence: 1,
        },
        StopTimeEntry {
            stop_id: StopId(2),
            arrival: end,
            departure: end,
            stop_sequence: 2,
        },
    ];

    let trips = vec![Trip {
        route_id: RouteId(0),
        service_id: ServiceId(0),
        shape_id,
        headsign: Some("End".to_string()),
        stop_times: stop_times.clone(),
    }];

    let trip_schedules = vec![TripWithSchedule::new(ServiceId(0), shape_id, 0b111_1111, start, end)];

    let trip_id_strings = vec!["trip_0".to_string()];
    let mut trip_id_index = HashMap::new();
    trip_id_index.insert("trip_0".to_string(), TripId(0));

    let shape_id_strings = vec!["shp_test".to_string()];
    let mut shape_id_index = HashMap::new();
    shape_id_index.insert("shp_test".to_string(), shape_id);

    let mut edge_to_segments = HashMap::new();
    edge_to_segments.insert(e1, vec![0]);
    edge_to_segments.insert(e2, vec![1]);
    let segment_polylines = vec![(graph.node_coord(a), graph.node_coord(b)), (graph.node_coord(b), graph.node_coord(c))];
    let mut edge_index = HashMap::new();
    edge_index.insert(
        shape_hash,
        EdgeTripSegmentIndex {
            edge_to_segments,
            segment_polylines,
        },
    );

    let mut stop_departures: HashMap<StopId, Vec<(TripId, usize)>> = HashMap::new();
    stop_departures.insert(StopId(0), vec![(TripId(0), 0)]);
    stop_departures.insert(StopId(1), vec![(TripId(0), 1)]);

    Timetable {
        graph,
        timezone: UTC,
        stops,
        stop_name_index,
        services,
        routes,
        agencies: vec![],
        trips,
        trip_schedules,
        trip_id_strings,
        trip_id_index,
        shapes,
        shape_hash_of,
        edge_index,
        shape_id_strings,
        shape_id_index,
        stop_departures,
    }
}

fn zurich_seconds_of_day(epoch_secs: i64) -> u32 {
    chrono_tz::Europe::Zurich
        .timestamp_opt(epoch_secs, 0)
        .unwrap()
        .naive_local()
        .time()
        .num_seconds_from_midnight()
}

/// Route 10 towards "Oberwil BL, Huslimatt" on shape `shp_0_573`, run by two trips
/// (`1.TA.91-10-A-j22-1.1.H` and `...1.2.H`) over the same three shape edges, in Europe/Zurich
/// local time. `1.1.H` is scheduled to bracket the three fixes used by the forward-match scenario
/// (around 2022-07-28 19:45-19:46 local); `1.2.H` brackets only the earlier pair used by the
/// tie-break scenario (around 19:42-19:43 local), so the two trips overlap only there.
pub(crate) fn oberwil_route10_timetable() -> Timetable {
    let mut graph = ShapeEdgeGraph::new();
    let p1 = Coordinate::new(47.499214172500004, 7.55713295935);
    let p2 = Coordinate::new(47.499652863, 7.5573019981);
    let p3 = Coordinate::new(47.500282288, 7.5572729111);
    let q1 = Coordinate::new(47.483688354, 7.5462784767);
    let q2 = Coordinate::new(47.48368454, 7.5464272499);

    let n_p1 = graph.get_or_create_node(p1);
    let n_p2 = graph.get_or_create_node(p2);
    let n_p3 = graph.get_or_create_node(p3);
    let n_q1 = graph.get_or_create_node(q1);
    let n_q2 = graph.get_or_create_node(q2);

    let shape_id = ShapeId(0);
    let e1 = graph.add_edge(n_p1, n_p2, shape_id.0, 1);
    let e2 = graph.add_edge(n_p2, n_p3, shape_id.0, 2);
    let e3 = graph.add_edge(n_q1, n_q2, shape_id.0, 3);

    let mut shapes = HashMap::new();
    shapes.insert(
        shape_id,
        ShapeRecord {
            shape_string_id: "shp_0_573".to_string(),
            coords: vec![p1, p2, p3],
            edge_ids: vec![e1, e2, e3],
            seed_edge: e1,
        },
    );
    let shape_hash = 501u64;
    let mut shape_hash_of = HashMap::new();
    shape_hash_of.insert(shape_id, shape_hash);

    let stops = vec![
        Stop {
            stop_id: StopId(0),
            name: "Oberwil BL, Zentrum".to_string(),
            coord: p1,
            parent_station: None,
        },
        Stop {
            stop_id: StopId(1),
            name: "Oberwil BL, Huslimatt".to_string(),
            coord: p3,
            parent_station: None,
        },
    ];
    let mut stop_name_index: HashMap<String, Vec<StopId>> = HashMap::new();
    for s in &stops {
        stop_name_index.entry(s.name.clone()).or_default().push(s.stop_id);
    }

    let services = vec![Service {
        days_of_week: 0b111_1111,
        start_date: 0,
        end_date: 100_000,
        added_dates: vec![],
        removed_dates: vec![],
    }];

    let routes = vec![Route {
        short_name: "10".to_string(),
        long_name: "Linie 10".to_string(),
        route_type: 0,
        agency_id: None,
        color: Some("777777".to_string()),
        text_color: None,
    }];

    // S1's three fixes (2022-07-28, UTC seconds 1659030303/1659030331/1659030391) and S2's two
    // fixes (1659030123/1659030183), both translated to Europe/Zurich local seconds-of-day.
    let t1 = zurich_seconds_of_day(1_659_030_303);
    let t3 = zurich_seconds_of_day(1_659_030_391);
    let ta = zurich_seconds_of_day(1_659_030_123);
    let tb = zurich_seconds_of_day(1_659_030_183);
    assert!(ta < t1, "fixture assumes S2's fixes precede S1's");

    let trip_a_start = TimeOfDay::from_raw_seconds(ta - 300);
    let trip_a_end = TimeOfDay::from_raw_seconds(t3 + 300);
    let trip_b_start = TimeOfDay::from_raw_seconds(ta - 60);
    let trip_b_end = TimeOfDay::from_raw_seconds(tb + 60);

    let stop_times_a = vec![
        StopTimeEntry {
            stop_id: StopId(0),
            arrival: trip_a_start,
            departure: trip_a_start,
            stop_sequence: 0,
        },
        StopTimeEntry {
            stop_id: StopId(1),
            arrival: trip_a_end,
            departure: trip_a_end,
            stop_sequence: 1,
        },
    ];
    let stop_times_b = vec![
        StopTimeEntry {
            stop_id: StopId(0),
            arrival: trip_b_start,
            departure: trip_b_start,
            stop_sequence: 0,
        },
        StopTimeEntry {
            stop_id: StopId(1),
            arrival: trip_b_end,
            departure: trip_b_end,
            stop_sequence: 1,
        },
    ];

    let trips = vec![
        Trip {
            route_id: RouteId(0),
            service_id: ServiceId(0),
            shape_id,
            headsign: Some("Oberwil BL, Huslimatt".to_string()),
            stop_times: stop_times_a,
        },
        Trip {
            route_id: RouteId(0),
            service_id: ServiceId(0),
            shape_id,
            headsign: Some("Oberwil BL, Huslimatt".to_string()),
            stop_times: stop_times_b,
        },
    ];

    let trip_schedules = vec![
        TripWithSchedule::new(ServiceId(0), shape_id, 0b111_1111, trip_a_start, trip_a_end),
        TripWithSchedule::new(ServiceId(0), shape_id, 0b111_1111, trip_b_start, trip_b_end),
    ];

    let trip_id_strings = vec!["1.TA.91-10-A-j22-1.1.H".to_string(), "1.TA.91-10-A-j22-1.2.H".to_string()];
    let mut trip_id_index = HashMap::new();
    trip_id_index.insert(trip_id_strings[0].clone(), TripId(0));
    trip_id_index.insert(trip_id_strings[1].clone(), TripId(1));

    let shape_id_strings = vec!["shp_0_573".to_string()];
    let mut shape_id_index = HashMap::new();
    shape_id_index.insert("shp_0_573".to_string(), shape_id);

    let mut edge_to_segments = HashMap::new();
    edge_to_segments.insert(e1, vec![0]);
    edge_to_segments.insert(e2, vec![0]);
    edge_to_segments.insert(e3, vec![0]);
    let segment_polylines = vec![(p1, p3)];
    let mut edge_index = HashMap::new();
    edge_index.insert(
        shape_hash,
        EdgeTripSegmentIndex {
            edge_to_segments,
            segment_polylines,
        },
    );

    let mut stop_departures: HashMap<StopId, Vec<(TripId, usize)>> = HashMap::new();
    stop_departures.insert(StopId(0), vec![(TripId(0), 0), (TripId(1), 0)]);
    stop_departures.insert(StopId(1), vec![(TripId(0), 1), (TripId(1), 1)]);

    Timetable {
        graph,
        timezone: chrono_tz::Europe::Zurich,
        stops,
        stop_name_index,
        services,
        routes,
        agencies: vec![],
        trips,
        trip_schedules,
        trip_id_strings,
        trip_id_index,
        shapes,
        shape_hash_of,
        edge_index,
        shape_id_strings,
        shape_id_index,
        stop_departures,
    }
}

/// A 4-stop, 3-segment trip plus a realtime table exercising the §4.3.1 end-delay fallback:
/// the update at the segment's start stop-sequence carries a departure delta, the update at its
/// end stop-sequence carries only a departure delta (no arrival), so the end delay must fall back
/// to the start delay rather than treating the end entry's own departure delta as usable.
/// Returns `(timetable, realtime, trip_id, middle_edge, query_time)`.
pub(crate) fn realtime_fallback_fixture() -> (Timetable, RealtimeTable, TripId, EdgeId, NaiveDateTime) {
    let date = NaiveDate::from_ymd_opt(2022, 7, 28).unwrap();
    let midnight_epoch = date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();

    // 19:40:00, 19:44:00, 19:46:00, 19:50:00.
    let a = TimeOfDay::from_raw_seconds(19 * 3600 + 40 * 60);
    let b = TimeOfDay::from_raw_seconds(19 * 3600 + 44 * 60);
    let c = TimeOfDay::from_raw_seconds(19 * 3600 + 46 * 60);
    let d = TimeOfDay::from_raw_seconds(19 * 3600 + 50 * 60);

    let stop_times = vec![
        StopTimeEntry {
            stop_id: StopId(0),
            arrival: a,
            departure: a,
            stop_sequence: 0,
        },
        StopTimeEntry {
            stop_id: StopId(1),
            arrival: b,
            departure: b,
            stop_sequence: 1,
        },
        StopTimeEntry {
            stop_id: StopId(2),
            arrival: c,
            departure: c,
            stop_sequence: 2,
        },
        StopTimeEntry {
            stop_id: StopId(3),
            arrival: d,
            departure: d,
            stop_sequence: 3,
        },
    ];

    let shape_id = ShapeId(0);
    let trip = Trip {
        route_id: RouteId(0),
        service_id: ServiceId(0),
        shape_id,
        headsign: None,
        stop_times,
    };

    let trip_schedule = TripWithSchedule::new(ServiceId(0), shape_id, 0b111_1111, a, d);

    let service = Service {
        days_of_week: 0b111_1111,
        start_date: 0,
        end_date: 100_000,
        added_dates: vec![],
        removed_dates: vec![],
    };
    let route = Route {
        short_name: "1".to_string(),
        long_name: String::new(),
        route_type: 0,
        agency_id: None,
        color: None,
        text_color: None,
    };

    let middle_edge = EdgeId(27);
    let mut edge_to_segments = HashMap::new();
    edge_to_segments.insert(middle_edge, vec![1]); // segment 1 == stop_times[1..=2], B -> C
    let shape_hash = 1u64;
    let mut edge_index = HashMap::new();
    edge_index.insert(
        shape_hash,
        EdgeTripSegmentIndex {
            edge_to_segments,
            segment_polylines: vec![],
        },
    );
    let mut shape_hash_of = HashMap::new();
    shape_hash_of.insert(shape_id, shape_hash);

    // B's departure is corrected to 19:46:00 (a +120s delay); C only carries a departure delta,
    // so under the corrected rule the end delay falls back to that same +120s start delay instead
    // of using C's own -600s departure delta.
    let mut realtime = RealtimeTable::new();
    realtime.set(
        TripId(0),
        vec![
            RealtimeUpdate {
                stop_sequence: 1,
                arrival_delta: None,
                departure_delta: Some(TimeDelta::Absolute(midnight_epoch + (19 * 3600 + 46 * 60))),
                start_date: None,
            },
            RealtimeUpdate {
                stop_sequence: 2,
                arrival_delta: None,
                departure_delta: Some(TimeDelta::Relative(-600)),
                start_date: None,
            },
        ],
    );

    let query_time = date.and_hms_opt(19, 46, 0).unwrap();

    let timetable = Timetable {
        graph: ShapeEdgeGraph::new(),
        timezone: UTC,
        stops: vec![],
        stop_name_index: HashMap::new(),
        services: vec![service],
        routes: vec![route],
        agencies: vec![],
        trips: vec![trip],
        trip_schedules: vec![trip_schedule],
        trip_id_strings: vec!["1.TA.91-10-A-j22-1.1.H".to_string()],
        trip_id_index: HashMap::new(),
        shapes: HashMap::new(),
        shape_hash_of,
        edge_index,
        shape_id_strings: vec![],
        shape_id_index: HashMap::new(),
        stop_departures: HashMap::new(),
    };

    (timetable, realtime, TripId(0), middle_edge, query_time)
}

/// A stop ("Ettingen, Bahnhof") served by two trips on route 10: one heading elsewhere that is
/// excluded from the query via its trip-id hint, and one running overnight to
/// "Oberwil BL, Huslimatt" whose departure crosses midnight (§8 S5 "connections overnight").
pub(crate) fn ettingen_overnight_connections_timetable() -> Timetable {
    let ettingen = Coordinate::new(47.498292, 7.558649);
    let elsewhere = Coordinate::new(47.51, 7.56);
    let huslimatt = Coordinate::new(47.500282288, 7.5572729111);

    let stops = vec![
        Stop {
            stop_id: StopId(0),
            name: "Ettingen, Bahnhof".to_string(),
            coord: ettingen,
            parent_station: None,
        },
        Stop {
            stop_id: StopId(1),
            name: "Therwil, Zentrum".to_string(),
            coord: elsewhere,
            parent_station: None,
        },
        Stop {
            stop_id: StopId(2),
            name: "Oberwil BL, Huslimatt".to_string(),
            coord: huslimatt,
            parent_station: None,
        },
    ];
    let mut stop_name_index: HashMap<String, Vec<StopId>> = HashMap::new();
    for s in &stops {
        stop_name_index.entry(s.name.clone()).or_default().push(s.stop_id);
    }

    let services = vec![Service {
        days_of_week: 0b111_1111,
        start_date: 0,
        end_date: 100_000,
        added_dates: vec![],
        removed_dates: vec![],
    }];
    let routes = vec![Route {
        short_name: "10".to_string(),
        long_name: "Linie 10".to_string(),
        route_type: 0,
        agency_id: None,
        color: Some("777777".to_string()),
        text_color: None,
    }];

    let same_day_departure = TimeOfDay::from_raw_seconds(23 * 3600 + 30 * 60); // 23:30:00
    let overnight_departure = TimeOfDay::from_raw_seconds(24 * 3600 + 30 * 60); // 00:30:00 "tomorrow"

    let trips = vec![
        Trip {
            route_id: RouteId(0),
            service_id: ServiceId(0),
            shape_id: ShapeId(0),
            headsign: Some("Therwil, Zentrum".to_string()),
            stop_times: vec![
                StopTimeEntry {
                    stop_id: StopId(0),
                    arrival: same_day_departure,
                    departure: same_day_departure,
                    stop_sequence: 0,
                },
                StopTimeEntry {
                    stop_id: StopId(1),
                    arrival: TimeOfDay::from_raw_seconds(23 * 3600 + 45 * 60),
                    departure: TimeOfDay::from_raw_seconds(23 * 3600 + 45 * 60),
                    stop_sequence: 1,
                },
            ],
        },
        Trip {
            route_id: RouteId(0),
            service_id: ServiceId(0),
            shape_id: ShapeId(0),
            headsign: Some("Oberwil BL, Huslimatt".to_string()),
            stop_times: vec![
                StopTimeEntry {
                    stop_id: StopId(0),
                    arrival: overnight_departure,
                    departure: overnight_departure,
                    stop_sequence: 0,
                },
                StopTimeEntry {
                    stop_id: StopId(2),
                    arrival: TimeOfDay::from_raw_seconds(24 * 3600 + 45 * 60),
                    departure: TimeOfDay::from_raw_seconds(24 * 3600 + 45 * 60),
                    stop_sequence: 1,
                },
            ],
        },
    ];

    let trip_schedules = vec![
        TripWithSchedule::new(
            ServiceId(0),
            ShapeId(0),
            0b111_1111,
            same_day_departure,
            TimeOfDay::from_raw_seconds(23 * 3600 + 45 * 60),
        ),
        TripWithSchedule::new(
            ServiceId(0),
            ShapeId(0),
            0b111_1111,
            overnight_departure,
            TimeOfDay::from_raw_seconds(24 * 3600 + 45 * 60),
        ),
    ];

    let trip_id_strings = vec!["1.TA.91-10-A-j22-1.1.H".to_string(), "1.TA.91-10-A-j22-1.2.H".to_string()];
    let mut trip_id_index = HashMap::new();
    trip_id_index.insert(trip_id_strings[0].clone(), TripId(0));
    trip_id_index.insert(trip_id_strings[1].clone(), TripId(1));

    let mut stop_departures: HashMap<StopId, Vec<(TripId, usize)>> = HashMap::new();
    stop_departures.insert(StopId(0), vec![(TripId(0), 0), (TripId(1), 0)]);

    Timetable {
        graph: ShapeEdgeGraph::new(),
        timezone: UTC,
        stops,
        stop_name_index,
        services,
        routes,
        agencies: vec![],
        trips,
        trip_schedules,
        trip_id_strings,
        trip_id_index,
        shapes: HashMap::new(),
        shape_hash_of: HashMap::new(),
        edge_index: HashMap::new(),
        shape_id_strings: vec![],
        shape_id_index: HashMap::new(),
        stop_departures,
    }
}
