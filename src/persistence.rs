//! Snapshot persistence (§9): `postcard`-encodes a built [`Timetable`] to disk so a restart can
//! skip re-ingesting the GTFS feed. Grounded in the teacher's `services/persistence.rs`
//! `save_graph`/`load_graph` pair, generalized from a street-network `Graph` to the Timetable
//! Snapshot. Pure optimisation — never changes matching semantics.

use std::io::{Read, Write};

use crate::error::IngestError;
use crate::timetable::Timetable;

pub fn save_snapshot(timetable: &Timetable, path: &str) -> Result<(), IngestError> {
    let bytes = postcard::to_allocvec(&timetable.to_snapshot())?;
    let mut file = std::fs::File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}

pub fn load_snapshot(path: &str) -> Result<Timetable, IngestError> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    let snapshot = postcard::from_bytes(&bytes)?;
    Ok(Timetable::from_snapshot(snapshot))
}
