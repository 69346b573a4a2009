//! Wires Candidate Filter -> Lattice Builder -> Viterbi Search -> Identity Resolver -> Response
//! Assembler into the single public match operation (§2 data flow).

use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::geo::Coordinate;
use crate::timetable::{RealtimeTable, Timetable};

use super::identity::{IdentityParams, resolve_identity};
use super::lattice::{Fix, MatchParams, build_lattice};
use super::response::{MatchResult, assemble_response};
use super::viterbi::find_path;

/// `{trip_id_hint, [(lat, lon, t_unix_ms)]}` (§6): each coordinate's third element is unsigned
/// milliseconds UTC, truncated-divided by 1000 by the engine (§3).
#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub trip_id_hint: String,
    pub coordinates: Vec<(f64, f64, u64)>,
}

/// The single public match operation: runs one GPS trace against `timetable` under `config`,
/// returning either a result (possibly the empty match, §7) or a typed bad-request error.
/// "Unavailable" and "internal invariant violation" (§7) are the caller's responsibility — this
/// function only runs once a snapshot reference has already been obtained.
pub fn match_trip(
    timetable: &Timetable,
    realtime: Option<&RealtimeTable>,
    config: &MatchConfig,
    request: &MatchRequest,
) -> Result<MatchResult, MatchError> {
    if request.coordinates.is_empty() {
        return Err(MatchError::BadRequest("coordinates must not be empty".to_string()));
    }

    let mut fixes: Vec<Fix> = request
        .coordinates
        .iter()
        .map(|&(lat, lon, t_ms)| Fix {
            point: Coordinate::new(lat, lon),
            t_local: timetable.local_time((t_ms / 1000) as i64),
        })
        .collect();

    // `baseline` (§6): only the last fix influences the output, and time filtering is disabled
    // the same way `baseline_hmm` disables it while still running the lattice.
    if config.baseline {
        if let Some(&last) = fixes.last() {
            fixes = vec![last];
        }
    }
    let ignore_time = config.baseline || config.baseline_hmm;

    let last_trip_id_hint = timetable.trip_id_index.get(&request.trip_id_hint).copied();

    let params = MatchParams {
        max_dist_km: config.candidate_radius_km,
        slack: config.slack,
        delay_secs: config.delay_secs(),
        earliness_secs: config.earliness_secs(),
        ignore_time,
    };

    let graph_from_nodes = |edge_id: crate::ids::EdgeId| {
        let edge = timetable.graph.edge(edge_id);
        (edge.from, edge.to)
    };

    let lattice = build_lattice(timetable, graph_from_nodes, realtime, &fixes, &params);

    let path = match find_path(timetable, &lattice) {
        Some(p) if !p.is_empty() => p,
        _ => return Ok(MatchResult::empty()),
    };

    let identity_params = IdentityParams {
        prefer_last_trip: config.prefer_last_trip,
        last_trip_id_hint,
        time_after: config.time_after,
    };

    let identity = match resolve_identity(timetable, &lattice, &path, &identity_params) {
        Some(identity) => identity,
        None => return Ok(MatchResult::empty()),
    };

    let &(last_layer, last_idx) = path.last().expect("path checked non-empty above");
    let last_node = &lattice.layers[last_layer][last_idx];
    let last_fix_point = fixes.last().expect("coordinates checked non-empty above").point;

    Ok(assemble_response(timetable, &identity, last_node, last_fix_point))
}
