//! Dense integer identifiers and the string interning table that produces them.
//!
//! GTFS feeds key everything by string id. Ingestion interns each namespace (stops, trips,
//! routes, services, agencies, shapes) into a dense, `Copy` index so the rest of the crate never
//! hashes a `String` on a hot path.

use std::collections::HashMap;

macro_rules! dense_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

dense_id!(StopId);
dense_id!(TripId);
dense_id!(RouteId);
dense_id!(ServiceId);
dense_id!(AgencyId);
dense_id!(EdgeId);
dense_id!(NodeId);
dense_id!(ShapeId);

/// Interns GTFS string identifiers of one namespace into dense indices of type `T`.
pub struct IdMapper<T> {
    to_index: HashMap<String, T>,
    to_string: Vec<String>,
}

impl<T> Default for IdMapper<T> {
    fn default() -> Self {
        Self {
            to_index: HashMap::new(),
            to_string: Vec::new(),
        }
    }
}

impl<T> IdMapper<T>
where
    T: Copy + Eq + std::hash::Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, gtfs_id: &str) -> Option<T> {
        self.to_index.get(gtfs_id).copied()
    }

    pub fn to_gtfs_id(&self, idx: usize) -> &str {
        &self.to_string[idx]
    }

    pub fn len(&self) -> usize {
        self.to_string.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_string.is_empty()
    }
}

impl IdMapper<u32> {
    pub fn get_or_insert(&mut self, gtfs_id: &str) -> u32 {
        if let Some(&idx) = self.to_index.get(gtfs_id) {
            return idx;
        }
        let idx = self.to_string.len() as u32;
        self.to_string.push(gtfs_id.to_string());
        self.to_index.insert(gtfs_id.to_string(), idx);
        idx
    }
}
