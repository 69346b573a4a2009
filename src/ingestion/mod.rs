//! Builds a [`Timetable`](crate::timetable::Timetable) from a GTFS feed directory or zip via
//! `gtfs_structures` (§4.9). Grounded on the teacher's `ingestion/gtfs/gtfs.rs::load_gtfs`,
//! generalized from a street-network Graph target to the Shape-Edge Graph.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use chrono_tz::Tz;

use crate::error::IngestError;
use crate::geo::Coordinate;
use crate::graph::ShapeEdgeGraph;
use crate::ids::{AgencyId, EdgeId, IdMapper, RouteId, ServiceId, ShapeId, StopId, TripId};
use crate::timetable::oracle::TimeOfDay;
use crate::timetable::{
    Agency, EdgeTripSegmentIndex, Route, Service, ShapeRecord, Stop, StopTimeEntry, Timetable,
    TripWithSchedule, date_to_days,
};

/// Dense `Trip` as assembled during ingestion, before its schedule-oracle entry is computed.
struct TripBuild {
    route_id: RouteId,
    service_id: ServiceId,
    shape_id: ShapeId,
    headsign: Option<String>,
    stop_times: Vec<StopTimeEntry>,
}

pub fn load_gtfs(path: &str, timezone: Tz) -> Result<Timetable, IngestError> {
    let gtfs = gtfs_structures::Gtfs::new(path)?;

    // Stops.
    let mut stop_mapper: IdMapper<u32> = IdMapper::new();
    let mut stops: Vec<Stop> = Vec::new();
    let mut stop_name_index: HashMap<String, Vec<StopId>> = HashMap::new();

    for (stop_id_str, raw) in gtfs.stops.iter() {
        let (lat, lon) = match (raw.latitude, raw.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => continue,
        };
        let name = match &raw.name {
            Some(name) => name.clone(),
            None => continue,
        };

        let idx = stop_mapper.get_or_insert(stop_id_str);
        let stop_id = StopId(idx);
        while stops.len() <= idx as usize {
            stops.push(Stop {
                stop_id: StopId(stops.len() as u32),
                name: String::new(),
                coord: Coordinate::new(0.0, 0.0),
                parent_station: None,
            });
        }
        stops[idx as usize] = Stop {
            stop_id,
            name: name.clone(),
            coord: Coordinate::new(lat, lon),
            parent_station: raw
                .parent_station
                .as_ref()
                .and_then(|p| stop_mapper.get(p))
                .map(StopId),
        };

        stop_name_index.entry(name).or_default().push(stop_id);
    }

    // Agencies.
    let mut agency_mapper: IdMapper<u32> = IdMapper::new();
    let mut agencies: Vec<Agency> = Vec::new();
    for agency in &gtfs.agencies {
        let key = agency.id.clone().unwrap_or_else(|| "default".to_string());
        let idx = agency_mapper.get_or_insert(&key);
        while agencies.len() <= idx as usize {
            agencies.push(Agency {
                name: String::new(),
                url: String::new(),
                timezone: String::new(),
            });
        }
        agencies[idx as usize] = Agency {
            name: agency.name.clone(),
            url: agency.url.clone(),
            timezone: agency.timezone.clone(),
        };
    }

    // Calendar + calendar_dates -> Service.
    let mut service_mapper: IdMapper<u32> = IdMapper::new();
    let mut services: Vec<Service> = Vec::new();

    for (service_id_str, cal) in gtfs.calendar.iter() {
        let idx = service_mapper.get_or_insert(service_id_str);
        let days = (cal.monday as u8)
            | ((cal.tuesday as u8) << 1)
            | ((cal.wednesday as u8) << 2)
            | ((cal.thursday as u8) << 3)
            | ((cal.friday as u8) << 4)
            | ((cal.saturday as u8) << 5)
            | ((cal.sunday as u8) << 6);

        while services.len() <= idx as usize {
            services.push(Service {
                days_of_week: 0,
                start_date: 0,
                end_date: 0,
                added_dates: Vec::new(),
                removed_dates: Vec::new(),
            });
        }
        services[idx as usize] = Service {
            days_of_week: days,
            start_date: date_to_days(cal.start_date),
            end_date: date_to_days(cal.end_date),
            added_dates: Vec::new(),
            removed_dates: Vec::new(),
        };
    }

    for (service_id_str, dates) in gtfs.calendar_dates.iter() {
        let idx = service_mapper.get_or_insert(service_id_str);
        while services.len() <= idx as usize {
            services.push(Service {
                days_of_week: 0,
                start_date: 0,
                end_date: u32::MAX,
                added_dates: Vec::new(),
                removed_dates: Vec::new(),
            });
        }
        let svc = &mut services[idx as usize];
        for d in dates {
            let day = date_to_days(d.date);
            match d.exception_type {
                gtfs_structures::Exception::Added => svc.added_dates.push(day),
                gtfs_structures::Exception::Deleted => svc.removed_dates.push(day),
            }
        }
        svc.added_dates.sort_unstable();
        svc.removed_dates.sort_unstable();
    }

    // Routes.
    let mut route_mapper: IdMapper<u32> = IdMapper::new();
    let mut routes: Vec<Route> = Vec::new();
    for (_, route) in gtfs.routes.iter() {
        let idx = route_mapper.get_or_insert(&route.id);
        let agency_id = route
            .agency_id
            .as_ref()
            .and_then(|id| agency_mapper.get(id))
            .map(AgencyId);

        while routes.len() <= idx as usize {
            routes.push(Route {
                short_name: String::new(),
                long_name: String::new(),
                route_type: -1,
                agency_id: None,
                color: None,
                text_color: None,
            });
        }
        // `gtfs_structures` fills an absent route_color/route_text_color with the GTFS spec's
        // own default (white fill, black text, routes.txt §"route_color"); that value is
        // indistinguishable here from an explicit white/black route, so it is treated as "not
        // specified" and left as `None` for the Response Assembler's colour override (§6).
        let color_is_default = route.color.r == 255 && route.color.g == 255 && route.color.b == 255;
        let text_is_default = route.text_color.r == 0 && route.text_color.g == 0 && route.text_color.b == 0;
        routes[idx as usize] = Route {
            short_name: route.short_name.clone().unwrap_or_default(),
            long_name: route.long_name.clone().unwrap_or_default(),
            route_type: gtfs_route_type_number(&route.route_type),
            agency_id,
            color: (!color_is_default)
                .then(|| format!("{:02X}{:02X}{:02X}", route.color.r, route.color.g, route.color.b)),
            text_color: (!text_is_default).then(|| {
                format!(
                    "{:02X}{:02X}{:02X}",
                    route.text_color.r, route.text_color.g, route.text_color.b
                )
            }),
        };
    }

    // Shapes -> Shape-Edge Graph.
    let mut graph = ShapeEdgeGraph::new();
    let mut shape_mapper: IdMapper<u32> = IdMapper::new();
    let mut shapes: HashMap<ShapeId, ShapeRecord> = HashMap::new();
    let mut shape_hash_of: HashMap<ShapeId, u64> = HashMap::new();
    let mut edge_index: HashMap<u64, EdgeTripSegmentIndex> = HashMap::new();

    for (shape_id_str, points) in gtfs.shapes.iter() {
        let mut sorted: Vec<_> = points.iter().collect();
        sorted.sort_by_key(|p| p.sequence);

        let idx = shape_mapper.get_or_insert(shape_id_str);
        let shape_id = ShapeId(idx);

        let mut coords = Vec::with_capacity(sorted.len());
        let mut edge_ids = Vec::with_capacity(sorted.len().saturating_sub(1));
        let mut prev_node = None;
        let mut seq_no = 0u32;

        for p in &sorted {
            let coord = Coordinate::new(p.latitude, p.longitude);
            coords.push(coord);
            let node = graph.get_or_create_node(coord);
            if let Some(prev) = prev_node {
                if prev != node {
                    seq_no += 1;
                    let edge_id = graph.add_edge(prev, node, idx, seq_no);
                    edge_ids.push(edge_id);
                }
            }
            prev_node = Some(node);
        }

        if edge_ids.is_empty() {
            continue;
        }

        let shape_hash = hash_edge_sequence(&edge_ids);
        let seed_edge = edge_ids[0];

        shapes.insert(
            shape_id,
            ShapeRecord {
                shape_string_id: shape_id_str.clone(),
                coords,
                edge_ids,
                seed_edge,
            },
        );
        shape_hash_of.insert(shape_id, shape_hash);
    }

    // Trips + stop times -> segments, trip schedule oracle, per-shape edge/segment index.
    let mut trip_mapper: IdMapper<u32> = IdMapper::new();
    let mut trip_builds: Vec<TripBuild> = Vec::new();
    let mut trip_id_strings: Vec<String> = Vec::new();

    for (_, trip) in gtfs.trips.iter() {
        let service_id = match service_mapper.get(&trip.service_id) {
            Some(id) => ServiceId(id),
            None => continue,
        };
        let route_id = match route_mapper.get(&trip.route_id) {
            Some(id) => RouteId(id),
            None => continue,
        };
        let shape_id_str = match &trip.shape_id {
            Some(s) => s,
            None => continue,
        };
        let shape_id = match shape_mapper.get(shape_id_str) {
            Some(id) => ShapeId(id),
            None => continue,
        };

        let mut stop_times: Vec<_> = trip.stop_times.iter().collect();
        stop_times.sort_by_key(|st| st.stop_sequence);

        let mut entries = Vec::with_capacity(stop_times.len());
        for st in &stop_times {
            let (arrival, departure) = match (st.arrival_time, st.departure_time) {
                (Some(a), Some(d)) => (a, d),
                _ => continue,
            };
            let stop_id = match stop_mapper.get(&st.stop.id) {
                Some(id) => StopId(id),
                None => continue,
            };
            entries.push(StopTimeEntry {
                stop_id,
                arrival: TimeOfDay::from_raw_seconds(arrival),
                departure: TimeOfDay::from_raw_seconds(departure),
                stop_sequence: st.stop_sequence as u32,
            });
        }

        if entries.len() < 2 {
            continue;
        }

        let idx = trip_mapper.get_or_insert(&trip.id);
        while trip_builds.len() <= idx as usize {
            trip_builds.push(TripBuild {
                route_id: RouteId(0),
                service_id: ServiceId(0),
                shape_id: ShapeId(0),
                headsign: None,
                stop_times: Vec::new(),
            });
            trip_id_strings.push(String::new());
        }
        trip_id_strings[idx as usize] = trip.id.clone();
        trip_builds[idx as usize] = TripBuild {
            route_id,
            service_id,
            shape_id,
            headsign: trip.trip_headsign.clone(),
            stop_times: entries,
        };

        // Populate the shape's EdgeTripSegmentIndex once, from the first trip seen on this
        // shape_hash: stops are matched to the nearest shape vertex, and each trip segment
        // (between consecutive stops) is attributed to every shape edge between its two
        // stops' vertices.
        let shape_hash = shape_hash_of[&shape_id];
        edge_index.entry(shape_hash).or_insert_with(|| {
            build_edge_trip_segment_index(&shapes[&shape_id], &trip_builds[idx as usize].stop_times, &stops)
        });
    }

    let mut trips = Vec::with_capacity(trip_builds.len());
    let mut trip_schedules = Vec::with_capacity(trip_builds.len());

    for build in trip_builds {
        let service = &services[build.service_id.index()];
        let start = build.stop_times.first().unwrap().arrival;
        let end = build.stop_times.last().unwrap().arrival;

        trip_schedules.push(TripWithSchedule::new(
            build.service_id,
            build.shape_id,
            service.days_of_week,
            start,
            end,
        ));

        trips.push(crate::timetable::Trip {
            route_id: build.route_id,
            service_id: build.service_id,
            shape_id: build.shape_id,
            headsign: build.headsign,
            stop_times: build.stop_times,
        });
    }

    // Departures-by-stop index, for /connections (§6).
    let mut stop_departures: HashMap<StopId, Vec<(TripId, usize)>> = HashMap::new();
    for (trip_idx, trip) in trips.iter().enumerate() {
        for (st_idx, st) in trip.stop_times.iter().enumerate() {
            stop_departures
                .entry(st.stop_id)
                .or_default()
                .push((TripId(trip_idx as u32), st_idx));
        }
    }
    for deps in stop_departures.values_mut() {
        deps.sort_by_key(|&(trip_id, st_idx)| trips[trip_id.index()].stop_times[st_idx].departure.secs);
    }

    let shape_id_strings = {
        let mut v = vec![String::new(); shape_mapper.len()];
        for (id, rec) in &shapes {
            v[id.index()] = rec.shape_string_id.clone();
        }
        v
    };
    let shape_id_index: HashMap<String, ShapeId> = shape_id_strings
        .iter()
        .enumerate()
        .map(|(idx, s)| (s.clone(), ShapeId(idx as u32)))
        .collect();
    let trip_id_index: HashMap<String, TripId> = trip_id_strings
        .iter()
        .enumerate()
        .map(|(idx, s)| (s.clone(), TripId(idx as u32)))
        .collect();

    Ok(Timetable {
        graph,
        timezone,
        stops,
        stop_name_index,
        services,
        routes,
        agencies,
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
    })
}

fn gtfs_route_type_number(rt: &gtfs_structures::RouteType) -> i16 {
    match rt {
        gtfs_structures::RouteType::Tramway => 0,
        gtfs_structures::RouteType::Subway => 1,
        gtfs_structures::RouteType::Rail => 2,
        gtfs_structures::RouteType::Bus => 3,
        gtfs_structures::RouteType::Ferry => 4,
        gtfs_structures::RouteType::CableCar => 5,
        gtfs_structures::RouteType::Gondola => 6,
        gtfs_structures::RouteType::Funicular => 7,
        gtfs_structures::RouteType::Coach => 200,
        gtfs_structures::RouteType::Air => 1100,
        gtfs_structures::RouteType::Taxi => 1500,
        gtfs_structures::RouteType::Other(n) => *n as i16,
    }
}

fn hash_edge_sequence(edges: &[EdgeId]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for e in edges {
        e.0.hash(&mut hasher);
    }
    hasher.finish()
}

/// Attributes each trip segment to the shape edges spanning its two bracketing stops, by
/// nearest-vertex matching of each stop against the shape's polyline.
fn build_edge_trip_segment_index(
    shape: &ShapeRecord,
    stop_times: &[StopTimeEntry],
    stops: &[Stop],
) -> EdgeTripSegmentIndex {
    let vertex_for_stop = |stop_id: StopId| -> usize {
        let coord = stops[stop_id.index()].coord;
        shape
            .coords
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.dist(coord)
                    .partial_cmp(&b.dist(coord))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    };

    let vertices: Vec<usize> = stop_times.iter().map(|st| vertex_for_stop(st.stop_id)).collect();

    let mut index = EdgeTripSegmentIndex {
        edge_to_segments: HashMap::new(),
        segment_polylines: Vec::with_capacity(stop_times.len().saturating_sub(1)),
    };

    for seg in 0..stop_times.len().saturating_sub(1) {
        let (mut v0, mut v1) = (vertices[seg], vertices[seg + 1]);
        if v1 < v0 {
            std::mem::swap(&mut v0, &mut v1);
        }
        let v1 = v1.max(v0 + 1).min(shape.edge_ids.len());

        for edge_id in &shape.edge_ids[v0..v1] {
            index.edge_to_segments.entry(*edge_id).or_default().push(seg);
        }

        let start = shape.coords[v0.min(shape.coords.len() - 1)];
        let end = shape.coords[(v1).min(shape.coords.len() - 1)];
        index.segment_polylines.push((start, end));
    }

    index
}
