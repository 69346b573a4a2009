//! Per-deployment configuration (§6 "Configuration recognised by the core", §6.1). Loaded once
//! at startup from YAML, the same way the teacher's `structures/config.rs` loads its build
//! config — generalized from an ingestion pipeline description to `{build, matching}`.

use serde::Deserialize;

/// `build` section (§6.1): where to ingest the GTFS feed from and where to persist the built
/// Snapshot, mirroring the teacher's `Config.build` (`gtfs_path`/`output` there named for a
/// street-network build instead of this crate's Timetable one).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub gtfs_path: String,
    pub output: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            gtfs_path: "data/gtfs".to_string(),
            output: "data/snapshot.postcard".to_string(),
        }
    }
}

/// `matching` section (§6), plus the server-level tunables §6.1 groups alongside it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Enable the trip-id-hint tie-break in the Identity Resolver (§4.7 step 3).
    pub prefer_last_trip: bool,
    /// Use only the last GPS fix; skip time filtering entirely (§6).
    pub baseline: bool,
    /// Keep the lattice over every fix but disable time filtering (§6).
    pub baseline_hmm: bool,
    /// Enable the schedule-residual tie-break (§4.7 step 3, §4.7.1).
    pub time_after: bool,
    /// Fraction of fixes that may be skipped when no candidates are found (§4.5). Default 0.2.
    pub slack: f64,
    /// Minutes a vehicle may be early versus schedule (§4.3's `active_segments`).
    pub earliness_minutes: f64,
    /// Minutes a vehicle may be late versus schedule (§4.3's `active_segments`).
    pub delay_minutes: f64,
    /// Candidate Filter search radius in km (§4.4). The Flask facade's literal default, not the
    /// map-matcher's own internal default of 0.05 km (DESIGN.md Open Question resolution).
    pub candidate_radius_km: f64,
    /// IANA zone the timetable's schedule layer works in (§9).
    pub timezone: String,
    /// HTTP listen address (§6.1). Default matches the teacher's own default bind.
    pub bind_address: String,
    /// `tracing_subscriber::EnvFilter` directive string (§6.1).
    pub log_filter: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            prefer_last_trip: false,
            baseline: false,
            baseline_hmm: false,
            time_after: false,
            slack: 0.2,
            earliness_minutes: 0.0,
            delay_minutes: 0.0,
            candidate_radius_km: 0.1,
            timezone: "UTC".to_string(),
            bind_address: "127.0.0.1:3000".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl MatchConfig {
    pub fn delay_secs(&self) -> i64 {
        (self.delay_minutes * 60.0) as i64
    }

    pub fn earliness_secs(&self) -> i64 {
        (self.earliness_minutes * 60.0) as i64
    }

    pub fn timezone_tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }
}

/// The top-level YAML document (§6.1): `{ build: {...}, matching: {...} }`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub build: BuildConfig,
    pub matching: MatchConfig,
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, String> {
        let content = std::fs::read_to_string(path).map_err(|e| format!("failed to read config '{path}': {e}"))?;
        serde_yml::from_str(&content).map_err(|e| format!("failed to parse config '{path}': {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.slack, 0.2);
        assert!(!config.prefer_last_trip);
        assert_eq!(config.timezone_tz(), chrono_tz::UTC);
        assert_eq!(config.bind_address, "127.0.0.1:3000");
    }

    #[test]
    fn minutes_convert_to_whole_seconds() {
        let mut config = MatchConfig::default();
        config.delay_minutes = 2.5;
        config.earliness_minutes = 1.0;
        assert_eq!(config.delay_secs(), 150);
        assert_eq!(config.earliness_secs(), 60);
    }

    #[test]
    fn app_config_loads_nested_yaml() {
        let yaml = "build:\n  gtfs_path: /data/feed.zip\n  output: /data/snap.postcard\nmatching:\n  slack: 0.5\n  timezone: Europe/Zurich\n";
        let dir = std::env::temp_dir().join(format!("transit-snapper-config-test-{:?}", std::thread::current().id()));
        std::fs::write(&dir, yaml).unwrap();

        let config = AppConfig::load(dir.to_str().unwrap()).expect("parses");
        assert_eq!(config.build.gtfs_path, "/data/feed.zip");
        assert_eq!(config.matching.slack, 0.5);
        assert_eq!(config.matching.timezone, "Europe/Zurich");

        std::fs::remove_file(&dir).ok();
    }
}
