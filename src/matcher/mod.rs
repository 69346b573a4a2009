//! The map-matching engine (§2, §4.4-§4.8): Candidate Filter -> HMM Lattice Builder -> Viterbi
//! Path Search -> Identity Resolver -> Response Assembler, wired together in [`engine`].

pub mod candidate;
pub mod engine;
pub mod identity;
pub mod lattice;
pub mod response;
pub mod viterbi;

pub use engine::{MatchRequest, match_trip};
pub use response::MatchResult;
