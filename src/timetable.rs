//! Planned departures of a line.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::{Cacheable, KeyedTtlCache};
use crate::error::UpstreamError;
use crate::model::{DayTimetable, Departure, Timetable};
use crate::parser::{decode_records, pick_str};
use crate::services::legacy_api::{LegacyApi, Operation};
use crate::vehicles::{OUTBOUND_MARKER, RETURN_MARKER};

pub const TIMETABLE_TTL: Duration = Duration::from_secs(12 * 60 * 60);

const DAY_TYPE: &[&str] = &["SGUNTIPI"];
const DIRECTION: &[&str] = &["SYON"];
const TIME: &[&str] = &["DT"];
const VARIANT: &[&str] = &["SGUZERAH"];

impl Cacheable for Timetable {
    fn is_empty(&self) -> bool {
        [&self.weekday, &self.saturday, &self.sunday]
            .iter()
            .all(|d| d.outbound.is_empty() && d.return_.is_empty())
    }
}

impl Timetable {
    fn day_mut(&mut self, code: &str) -> Option<&mut DayTimetable> {
        match code {
            "I" => Some(&mut self.weekday),
            "C" => Some(&mut self.saturday),
            "P" => Some(&mut self.sunday),
            _ => None,
        }
    }
}

impl DayTimetable {
    fn direction_mut(&mut self, code: &str) -> Option<&mut Vec<Departure>> {
        match code {
            OUTBOUND_MARKER => Some(&mut self.outbound),
            RETURN_MARKER => Some(&mut self.return_),
            _ => None,
        }
    }
}

/// Buckets raw departure records by day type and direction, each bucket
/// sorted by time. Records with an unknown day type or direction are dropped.
pub fn build_timetable(records: &[Value]) -> Timetable {
    let mut table = Timetable::default();

    for r in records {
        let (Some(day), Some(dir), Some(time)) = (
            pick_str(r, DAY_TYPE),
            pick_str(r, DIRECTION),
            pick_str(r, TIME),
        ) else {
            continue;
        };
        let Some(bucket) = table.day_mut(&day).and_then(|d| d.direction_mut(&dir)) else {
            debug!(day = %day, dir = %dir, "Skipping departure with unknown day type or direction");
            continue;
        };
        bucket.push(Departure {
            time,
            variant: pick_str(r, VARIANT).unwrap_or_default(),
        });
    }

    for day in [&mut table.weekday, &mut table.saturday, &mut table.sunday] {
        day.outbound.sort_by(|a, b| a.time.cmp(&b.time));
        day.return_.sort_by(|a, b| a.time.cmp(&b.time));
    }

    table
}

/// Per-line timetables, cached.
pub struct TimetableService {
    legacy: Arc<dyn LegacyApi>,
    cache: KeyedTtlCache<String, Timetable>,
}

impl TimetableService {
    pub fn new(legacy: Arc<dyn LegacyApi>, ttl: Duration) -> Self {
        Self {
            legacy,
            cache: KeyedTtlCache::new("timetables", ttl),
        }
    }

    /// # Errors
    ///
    /// Fails only if the upstream fails and no earlier copy is cached.
    #[tracing::instrument(skip(self))]
    pub async fn timetable_for(&self, line: &str) -> Result<Arc<Timetable>, UpstreamError> {
        self.cache
            .get_or_refresh(&line.to_string(), || async {
                let payload = self
                    .legacy
                    .call(&Operation::TIMETABLE, &[("HatKodu", line)])
                    .await?;
                Ok::<_, UpstreamError>(build_timetable(&decode_records(payload)))
            })
            .await
    }
}
