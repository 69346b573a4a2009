//! `transit-snapper`: online transit GPS map-matching over GTFS schedules (§1-§9).
//!
//! A GPS trace from a vehicle already believed to belong to some trip is matched against a
//! layered lattice of nearby schedule activity and resolved, via Viterbi search plus an identity
//! vote, to the most likely `(shape, service, trip, route)` and a snapped on-line location.

pub mod config;
pub mod connections;
pub mod error;
pub mod geo;
pub mod graph;
pub mod ids;
pub mod ingestion;
pub mod matcher;
pub mod persistence;
pub mod registry;
pub mod shapes;
pub mod timetable;
pub mod web;

#[cfg(test)]
mod test_support;
