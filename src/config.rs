//! Runtime settings of the proxy.

use std::net::SocketAddr;
use std::time::Duration;

use crate::reference::REFERENCE_TTL;
use crate::timetable::TIMETABLE_TTL;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_LEGACY_BASE_URL: &str = "https://api.ibb.gov.tr/iett";
pub const DEFAULT_RELAY_BASE_URL: &str = "https://iett.rednexie.workers.dev";
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: SocketAddr,
    pub legacy_base_url: String,
    pub relay_base_url: String,
    /// Default per-request timeout. Slow legacy operations carry their own.
    pub upstream_timeout: Duration,
    /// Lifetime of the line and stop directories and of per-line routes.
    pub reference_ttl: Duration,
    pub timetable_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            legacy_base_url: DEFAULT_LEGACY_BASE_URL.to_string(),
            relay_base_url: DEFAULT_RELAY_BASE_URL.to_string(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            reference_ttl: REFERENCE_TTL,
            timetable_ttl: TIMETABLE_TTL,
        }
    }
}
