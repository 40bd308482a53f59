//! Estimated arrivals at a stop.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::error::QueryError;
use crate::model::{ArrivalEstimate, Stop};
use crate::parser::{decode_records, pick_f64, pick_str};
use crate::reference::ReferenceDataCache;
use crate::services::legacy_api::{LegacyApi, Operation};

const LINE_CODE: &[&str] = &["hatkodu", "HATKODU", "hat", "HAT_NO"];
const DOOR_CODE: &[&str] = &["kapino", "KAPINO", "vehicleDoorCode"];
const ETA_MINUTES: &[&str] = &["dakika", "DAKIKA", "sure", "SURE", "eta"];
const DISTANCE_M: &[&str] = &["mesafe", "MESAFE", "distance"];
const DIRECTION: &[&str] = &["yon", "YON", "direction"];

/// A stop and the vehicles heading to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopArrivals {
    pub stop: Stop,
    pub arrivals: Vec<ArrivalEstimate>,
    /// Set when live data could not be fetched and `arrivals` is empty
    /// for that reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Normalizes raw arrival records and orders them by ETA.
///
/// Records without an ETA are dropped. Equal ETAs keep upstream order.
pub fn normalize_arrivals(records: &[Value]) -> Vec<ArrivalEstimate> {
    let mut arrivals: Vec<ArrivalEstimate> = records
        .iter()
        .filter_map(|r| {
            let eta = pick_f64(r, ETA_MINUTES)?;
            let metres = pick_f64(r, DISTANCE_M).unwrap_or(0.0);
            Some(ArrivalEstimate {
                line_code: pick_str(r, LINE_CODE).unwrap_or_default(),
                vehicle_door_code: pick_str(r, DOOR_CODE).unwrap_or_default(),
                eta_minutes: eta.round().max(0.0) as u32,
                distance_km: metres.max(0.0) / 1000.0,
                direction: pick_str(r, DIRECTION).unwrap_or_default(),
            })
        })
        .collect();

    arrivals.sort_by_key(|a| a.eta_minutes);
    arrivals
}

/// Combines a stop's directory record with its live arrivals.
pub struct StopArrivalAggregator {
    legacy: Arc<dyn LegacyApi>,
    reference: Arc<ReferenceDataCache>,
}

impl StopArrivalAggregator {
    pub fn new(legacy: Arc<dyn LegacyApi>, reference: Arc<ReferenceDataCache>) -> Self {
        Self { legacy, reference }
    }

    /// Looks up `stop_code` and lists the vehicles approaching it.
    ///
    /// A live-data failure is not an error: the stop is returned with no
    /// arrivals and an advisory.
    ///
    /// # Errors
    ///
    /// [`QueryError::StopNotFound`] if the code is not in the directory, or
    /// [`QueryError::Upstream`] if the directory has never been loaded.
    #[tracing::instrument(skip(self))]
    pub async fn arrivals_for(&self, stop_code: &str) -> Result<StopArrivals, QueryError> {
        let directory = self.reference.get_stops().await?;
        let stop = directory
            .get(stop_code)
            .cloned()
            .ok_or_else(|| QueryError::StopNotFound(stop_code.to_string()))?;

        let live = self
            .legacy
            .call(&Operation::APPROACHING_VEHICLES, &[("DurakKodu", stop_code)])
            .await;

        let (arrivals, advisory) = match live {
            Ok(payload) => (normalize_arrivals(&decode_records(payload)), None),
            Err(e) => {
                warn!(error = %e, "Live arrivals unavailable");
                (Vec::new(), Some(format!("live arrivals unavailable: {e}")))
            }
        };

        Ok(StopArrivals {
            stop,
            arrivals,
            advisory,
        })
    }
}
