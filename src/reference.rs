//! Cached line and stop directories.
//!
//! Both collections are large, slow to fetch and change rarely, so each is
//! held for a day and replaced wholesale on refresh.

use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cache::{Cacheable, TtlCell};
use crate::error::UpstreamError;
use crate::model::{Line, Stop};
use crate::parser::{decode_records, parse_wkt_point, pick_str};
use crate::services::legacy_api::{LegacyApi, Operation};

pub const REFERENCE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// Newer field names first: the upstream renamed these at some point and
// either may be present.
const LINE_CODE: &[&str] = &["SHATKODU", "SHPIETT"];
const LINE_NAME: &[&str] = &["SHATADI", "SHAT_ADI"];
const STOP_CODE: &[&str] = &["SDURAKKODU", "DURAKKODU"];
const STOP_NAME: &[&str] = &["SDURAKADI", "DURAKADI"];
const STOP_DISTRICT: &[&str] = &["SILCEADI", "ILCEADI"];
const STOP_POINT: &[&str] = &["KOORDINAT"];
const STOP_DIRECTION: &[&str] = &["SYON"];

/// The stop directory with an index by stop code.
#[derive(Debug, Default)]
pub struct StopDirectory {
    stops: Vec<Stop>,
    by_code: HashMap<String, usize>,
}

impl StopDirectory {
    /// Builds the directory, keeping the first record of any repeated code.
    pub fn new(records: Vec<Stop>) -> Self {
        let mut stops = Vec::with_capacity(records.len());
        let mut by_code = HashMap::with_capacity(records.len());

        for stop in records {
            if let Entry::Vacant(slot) = by_code.entry(stop.code.clone()) {
                slot.insert(stops.len());
                stops.push(stop);
            }
        }

        Self { stops, by_code }
    }

    pub fn get(&self, code: &str) -> Option<&Stop> {
        self.by_code.get(code).map(|&i| &self.stops[i])
    }

    pub fn all(&self) -> &[Stop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

impl Cacheable for StopDirectory {
    fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

/// Normalizes raw line records, dropping those without a code.
pub fn normalize_lines(records: &[Value]) -> Vec<Line> {
    records
        .iter()
        .filter_map(|r| {
            Some(Line {
                code: pick_str(r, LINE_CODE)?,
                name: pick_str(r, LINE_NAME).unwrap_or_default(),
            })
        })
        .collect()
}

/// Normalizes raw stop records, dropping those without a code.
pub fn normalize_stops(records: &[Value]) -> Vec<Stop> {
    records
        .iter()
        .filter_map(|r| {
            let code = pick_str(r, STOP_CODE)?;
            let point = pick_str(r, STOP_POINT).and_then(|wkt| parse_wkt_point(&wkt));
            Some(Stop {
                code,
                name: pick_str(r, STOP_NAME).unwrap_or_default(),
                lat: point.map(|p| p.lat),
                lon: point.map(|p| p.lon),
                direction: pick_str(r, STOP_DIRECTION),
                district: pick_str(r, STOP_DISTRICT),
            })
        })
        .collect()
}

/// Lazily refreshed line and stop directories backed by the legacy service.
pub struct ReferenceDataCache {
    legacy: Arc<dyn LegacyApi>,
    lines: TtlCell<Vec<Line>>,
    stops: TtlCell<StopDirectory>,
}

impl ReferenceDataCache {
    /// Creates the cache with both entries empty.
    pub fn new(legacy: Arc<dyn LegacyApi>, ttl: Duration) -> Self {
        Self {
            legacy,
            lines: TtlCell::new("lines", ttl),
            stops: TtlCell::new("stops", ttl),
        }
    }

    /// The full line directory.
    ///
    /// # Errors
    ///
    /// Fails only if the upstream fails and nothing was cached before.
    pub async fn get_lines(&self) -> Result<Arc<Vec<Line>>, UpstreamError> {
        self.lines
            .get_or_refresh(|| async {
                let payload = self.legacy.call(&Operation::LINES, &[("HatKodu", "")]).await?;
                let lines = normalize_lines(&decode_records(payload));
                info!(count = lines.len(), "Line directory fetched");
                Ok::<_, UpstreamError>(lines)
            })
            .await
    }

    /// The full stop directory.
    ///
    /// # Errors
    ///
    /// Fails only if the upstream fails and nothing was cached before.
    pub async fn get_stops(&self) -> Result<Arc<StopDirectory>, UpstreamError> {
        self.stops
            .get_or_refresh(|| async {
                let payload = self
                    .legacy
                    .call(&Operation::STOPS, &[("DurakKodu", "")])
                    .await?;
                let directory = StopDirectory::new(normalize_stops(&decode_records(payload)));
                info!(count = directory.len(), "Stop directory fetched");
                Ok::<_, UpstreamError>(directory)
            })
            .await
    }
}
