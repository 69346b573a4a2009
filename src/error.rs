use thiserror::Error;

/// Errors a map-match request can fail with. "No match" is not one of these —
/// it is a normal [`crate::matcher::MatchResult::empty`] value.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("service unavailable: timetable snapshot not ready")]
    Unavailable,
    #[error("internal invariant violation: {0}")]
    InvariantViolation(String),
}

/// Errors raised while building a [`crate::timetable::Timetable`] from a GTFS feed, or while
/// loading/saving one from/to a persisted snapshot (§9).
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("gtfs error: {0}")]
    Gtfs(#[from] gtfs_structures::Error),
    #[error("malformed feed: {0}")]
    MalformedFeed(String),
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Encode(#[from] postcard::Error),
}
