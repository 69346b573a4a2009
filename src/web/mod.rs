//! HTTP JSON facade (§6): thin handlers over the core's public match/connections/shapes
//! operations. Grounded in the teacher's poem server skeleton (`web/app.rs`), with its GraphQL
//! schema replaced by the plain JSON POST surface this spec calls for (DESIGN.md).

pub mod dto;

use std::sync::Arc;

use poem::http::StatusCode;
use poem::web::{Data, Json};
use poem::{EndpointExt, Result, Route, Server, handler, listener::TcpListener, post};

use crate::config::MatchConfig;
use crate::connections::scheduled_departures;
use crate::error::MatchError;
use crate::matcher::{MatchRequest, MatchResult, match_trip};
use crate::registry::SnapshotRegistry;
use crate::shapes::walk_shape_polyline;

use dto::{ConnectionsRequestDto, MapMatchRequestDto, ShapesRequestDto, ShapesResponseDto};

/// Parses one `"<lat>,<lon>,<t_ms>"` coordinate triple (§3, §6).
fn parse_coordinate(raw: &str) -> Option<(f64, f64, u64)> {
    let mut parts = raw.splitn(3, ',');
    let lat: f64 = parts.next()?.trim().parse().ok()?;
    let lon: f64 = parts.next()?.trim().parse().ok()?;
    let t_ms: u64 = parts.next()?.trim().parse().ok()?;
    Some((lat, lon, t_ms))
}

fn unavailable() -> poem::Error {
    poem::Error::from_string("service unavailable: timetable snapshot not ready", StatusCode::SERVICE_UNAVAILABLE)
}

#[handler]
pub async fn map_match(
    Json(body): Json<MapMatchRequestDto>,
    Data(registry): Data<&Arc<SnapshotRegistry>>,
    Data(config): Data<&Arc<MatchConfig>>,
) -> Result<Json<MatchResult>> {
    if body.coordinates.is_empty() {
        return Err(poem::Error::from_string("coordinates must not be empty", StatusCode::BAD_REQUEST));
    }

    let timetable = registry.timetable().ok_or_else(unavailable)?;
    let realtime = registry.realtime();

    let mut coordinates = Vec::with_capacity(body.coordinates.len());
    for raw in &body.coordinates {
        match parse_coordinate(raw) {
            Some(c) => coordinates.push(c),
            None => {
                return Err(poem::Error::from_string(
                    format!("malformed coordinate: {raw}"),
                    StatusCode::BAD_REQUEST,
                ));
            }
        }
    }

    let request = MatchRequest {
        trip_id_hint: body.trip_id,
        coordinates,
    };

    match match_trip(&timetable, realtime.as_deref(), config, &request) {
        Ok(result) => Ok(Json(result)),
        Err(MatchError::BadRequest(msg)) => Err(poem::Error::from_string(msg, StatusCode::BAD_REQUEST)),
        Err(MatchError::Unavailable) => Err(unavailable()),
        Err(MatchError::InvariantViolation(msg)) => {
            tracing::error!(error = %msg, "internal invariant violation during map-match");
            Ok(Json(MatchResult::empty()))
        }
    }
}

#[handler]
pub async fn connections(
    Json(body): Json<ConnectionsRequestDto>,
    Data(registry): Data<&Arc<SnapshotRegistry>>,
) -> Result<Json<serde_json::Value>> {
    let timetable = registry.timetable().ok_or_else(unavailable)?;

    let now_local = timetable.local_time((body.now / 1000) as i64);
    let exclude_trip = body.trip_id.as_deref().and_then(|id| timetable.trip_id_index.get(id).copied());

    let entries = scheduled_departures(&timetable, &body.stop_name, now_local, exclude_trip);

    let mut map = serde_json::Map::new();
    for (i, entry) in entries.iter().enumerate() {
        map.insert(
            i.to_string(),
            serde_json::json!([
                entry.route_short_name,
                entry.destination,
                entry.route_type,
                entry.departure_epoch_ms,
                entry.route_color,
                entry.route_text_color,
            ]),
        );
    }
    map.insert("length".to_string(), serde_json::json!(entries.len()));

    Ok(Json(serde_json::Value::Object(map)))
}

#[handler]
pub async fn shapes(
    Json(body): Json<ShapesRequestDto>,
    Data(registry): Data<&Arc<SnapshotRegistry>>,
) -> Result<Json<ShapesResponseDto>> {
    let timetable = registry.timetable().ok_or_else(unavailable)?;

    let shape_id = timetable
        .shape_id_index
        .get(&body.shape_id)
        .copied()
        .ok_or_else(|| poem::Error::from_string("unknown shape_id", StatusCode::BAD_REQUEST))?;

    let polyline = walk_shape_polyline(&timetable, shape_id)
        .into_iter()
        .map(|c| [c.lat, c.lon])
        .collect();

    let stops = body
        .trip_id
        .as_deref()
        .and_then(|id| timetable.trip_id_index.get(id).copied())
        .map(|trip_id| {
            timetable
                .trip(trip_id)
                .stop_times
                .iter()
                .map(|st| {
                    let coord = timetable.stops[st.stop_id.index()].coord;
                    [coord.lat, coord.lon]
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Json(ShapesResponseDto { polyline, stops }))
}

pub fn routes() -> Route {
    Route::new()
        .at("/map-match", post(map_match))
        .at("/connections", post(connections))
        .at("/shapes", post(shapes))
}

pub async fn serve(registry: Arc<SnapshotRegistry>, config: Arc<MatchConfig>, bind: &str) -> std::io::Result<()> {
    let app = routes().data(registry).data(config);

    tracing::info!(%bind, "serving transit-snapper");
    Server::new(TcpListener::bind(bind)).run(app).await
}
