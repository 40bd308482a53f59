//! Per-query composition of the caches, resolvers and live sources.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::arrivals::{StopArrivalAggregator, StopArrivals};
use crate::config::Settings;
use crate::error::{QueryError, UpstreamError};
use crate::fetch::BasicClient;
use crate::infra::legacy::SoapClient;
use crate::infra::relay::RelayClient;
use crate::model::{Line, RouteStop, RouteStops, Stop, Timetable, VariantGroup, Vehicle};
use crate::parser::{decode_records, pick_str};
use crate::reference::ReferenceDataCache;
use crate::route_stops::RouteStopsResolver;
use crate::services::{LegacyApi, RelayApi, RouteStopSource};
use crate::timetable::TimetableService;
use crate::vehicles::{normalize_vehicles, variant_groups};

pub const LINE_SEARCH_LIMIT: usize = 10;
pub const STOP_SEARCH_LIMIT: usize = 15;

const SUGGESTION_CODE: &[&str] = &["code", "hatKodu", "HatKodu", "SHATKODU", "SHPIETT", "value"];
const SUGGESTION_NAME: &[&str] = &["name", "hatAdi", "HatAdi", "SHATADI", "SHAT_ADI", "label"];

/// The upstream capabilities a [`QueryFacade`] is built from.
#[derive(Clone)]
pub struct Upstreams {
    pub legacy: Arc<dyn LegacyApi>,
    pub relay: Arc<dyn RelayApi>,
    pub route_source: Arc<dyn RouteStopSource>,
}

/// Live vehicles of a line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineVehicles {
    pub line_code: String,
    pub vehicles: Vec<Vehicle>,
    pub total_vehicles: usize,
    pub updated_at: DateTime<Utc>,
    pub variant_groups: Vec<VariantGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Route stops and live vehicles of a line in one answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineLive {
    pub line_code: String,
    pub outbound_stops: Vec<RouteStop>,
    pub return_stops: Vec<RouteStop>,
    pub vehicles: Vec<Vehicle>,
    pub total_vehicles: usize,
    pub updated_at: DateTime<Utc>,
    pub variant_groups: Vec<VariantGroup>,
    /// Set when either half could not be fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Answers every client query.
pub struct QueryFacade {
    reference: Arc<ReferenceDataCache>,
    routes: RouteStopsResolver,
    arrivals: StopArrivalAggregator,
    timetables: TimetableService,
    relay: Arc<dyn RelayApi>,
}

impl QueryFacade {
    pub fn new(upstreams: Upstreams, settings: &Settings) -> Self {
        let reference = Arc::new(ReferenceDataCache::new(
            upstreams.legacy.clone(),
            settings.reference_ttl,
        ));

        Self {
            routes: RouteStopsResolver::new(
                upstreams.route_source,
                reference.clone(),
                settings.reference_ttl,
            ),
            arrivals: StopArrivalAggregator::new(upstreams.legacy.clone(), reference.clone()),
            timetables: TimetableService::new(upstreams.legacy, settings.timetable_ttl),
            relay: upstreams.relay,
            reference,
        }
    }

    /// Builds a facade talking to the real upstreams named in `settings`.
    pub fn connect(settings: &Settings) -> reqwest::Result<Self> {
        let legacy = SoapClient::new(
            BasicClient::new(settings.upstream_timeout)?,
            settings.legacy_base_url.clone(),
        );
        let relay = Arc::new(RelayClient::new(
            BasicClient::new(settings.upstream_timeout)?,
            settings.relay_base_url.clone(),
        ));

        let upstreams = Upstreams {
            legacy: Arc::new(legacy),
            relay: relay.clone(),
            route_source: relay,
        };
        Ok(Self::new(upstreams, settings))
    }

    /// Loads the stop directory so the first stop query does not pay for it.
    pub async fn warm(&self) {
        match self.reference.get_stops().await {
            Ok(stops) => info!(count = stops.len(), "Stop directory warmed"),
            Err(e) => warn!(error = %e, "Stop directory warm-up failed"),
        }
    }

    /// Lines whose code or name contains `query`, case-insensitively.
    ///
    /// Falls back to the relay's suggestions when the directory is empty or
    /// cannot be loaded.
    #[tracing::instrument(skip(self))]
    pub async fn search_lines(&self, query: &str) -> Result<Vec<Line>, QueryError> {
        let needle = query.trim().to_lowercase();

        let directory_err = match self.reference.get_lines().await {
            Ok(lines) if !lines.is_empty() => {
                return Ok(lines
                    .iter()
                    .filter(|l| matches(&needle, &l.code, &l.name))
                    .take(LINE_SEARCH_LIMIT)
                    .cloned()
                    .collect());
            }
            Ok(_) => None,
            Err(e) => Some(e),
        };

        match self.relay.line_suggestions(query.trim()).await {
            Ok(payload) => Ok(normalize_suggestions(payload)),
            Err(e) => {
                warn!(error = %e, "Line suggestions unavailable");
                match directory_err {
                    Some(cold) => Err(cold.into()),
                    None => Ok(Vec::new()),
                }
            }
        }
    }

    /// Stops whose code or name contains `query`, case-insensitively.
    #[tracing::instrument(skip(self))]
    pub async fn search_stops(&self, query: &str) -> Result<Vec<Stop>, QueryError> {
        let needle = query.trim().to_lowercase();
        let directory = self.reference.get_stops().await?;

        Ok(directory
            .all()
            .iter()
            .filter(|s| matches(&needle, &s.code, &s.name))
            .take(STOP_SEARCH_LIMIT)
            .cloned()
            .collect())
    }

    /// The whole line directory.
    pub async fn all_lines(&self) -> Result<Arc<Vec<Line>>, QueryError> {
        Ok(self.reference.get_lines().await?)
    }

    pub async fn route(&self, line: &str) -> Result<RouteStops, QueryError> {
        Ok(self.routes.resolve(line).await?)
    }

    /// Live vehicles of `line`, each tagged with the route stop it is at.
    ///
    /// Never fails: an unavailable feed gives no vehicles and an advisory.
    #[tracing::instrument(skip(self))]
    pub async fn vehicles(&self, line: &str) -> LineVehicles {
        let (route, live) = tokio::join!(self.routes.resolve(line), self.relay.line_vehicles(line));

        let route = route.unwrap_or_else(|e| {
            warn!(error = %e, "Route unavailable, vehicles left without stop match");
            RouteStops::default()
        });
        let (vehicles, advisory) = positioned_vehicles(live, &route);

        LineVehicles {
            line_code: line.to_string(),
            total_vehicles: vehicles.len(),
            updated_at: Utc::now(),
            variant_groups: variant_groups(&vehicles),
            vehicles,
            advisory,
        }
    }

    /// Route stops and live vehicles of `line`, fetched concurrently.
    ///
    /// Never fails: either half degrades to empty with an advisory.
    #[tracing::instrument(skip(self))]
    pub async fn live(&self, line: &str) -> LineLive {
        let (route, live) = tokio::join!(self.routes.resolve(line), self.relay.line_vehicles(line));

        let mut advisories = Vec::new();
        let route = route.unwrap_or_else(|e| {
            warn!(error = %e, "Route unavailable");
            advisories.push(format!("route unavailable: {e}"));
            RouteStops::default()
        });
        let (vehicles, vehicle_advisory) = positioned_vehicles(live, &route);
        advisories.extend(vehicle_advisory);

        LineLive {
            line_code: line.to_string(),
            total_vehicles: vehicles.len(),
            updated_at: Utc::now(),
            variant_groups: variant_groups(&vehicles),
            vehicles,
            outbound_stops: route.outbound_stops,
            return_stops: route.return_stops,
            advisory: (!advisories.is_empty()).then(|| advisories.join("; ")),
        }
    }

    pub async fn stop_arrivals(&self, stop_code: &str) -> Result<StopArrivals, QueryError> {
        self.arrivals.arrivals_for(stop_code).await
    }

    pub async fn timetable(&self, line: &str) -> Result<Arc<Timetable>, QueryError> {
        Ok(self.timetables.timetable_for(line).await?)
    }

    /// Relay line information, passed through. `{}` when unavailable.
    #[tracing::instrument(skip(self))]
    pub async fn line_info(&self, line: &str) -> Value {
        self.relay.line_information(line).await.unwrap_or_else(|e| {
            warn!(error = %e, "Line information unavailable");
            Value::Object(Default::default())
        })
    }
}

fn matches(needle: &str, code: &str, name: &str) -> bool {
    code.to_lowercase().contains(needle) || name.to_lowercase().contains(needle)
}

fn positioned_vehicles(
    live: Result<Value, UpstreamError>,
    route: &RouteStops,
) -> (Vec<Vehicle>, Option<String>) {
    match live {
        Ok(payload) => {
            let vehicles = normalize_vehicles(&payload)
                .into_iter()
                .map(|v| v.with_nearest_stop(route.iter()))
                .collect();
            (vehicles, None)
        }
        Err(e) => {
            warn!(error = %e, "Live vehicles unavailable");
            (Vec::new(), Some(format!("live vehicles unavailable: {e}")))
        }
    }
}

fn normalize_suggestions(payload: Value) -> Vec<Line> {
    decode_records(Some(payload))
        .iter()
        .filter_map(|r| {
            Some(Line {
                code: pick_str(r, SUGGESTION_CODE)?,
                name: pick_str(r, SUGGESTION_NAME).unwrap_or_default(),
            })
        })
        .take(LINE_SEARCH_LIMIT)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_matches_is_case_insensitive_substring() {
        assert!(matches("34", "34A", "x"));
        assert!(matches("avc", "34", "AVCILAR"));
        assert!(matches("", "1", "a"));
        assert!(!matches("500", "34", "AVCILAR"));
    }

    #[test]
    fn test_normalize_suggestions() {
        let payload = json!([
            {"code": "34", "name": "Avcılar"},
            {"label": "no code"},
            {"hatKodu": "34A", "hatAdi": "Söğütlüçeşme"}
        ]);
        let lines = normalize_suggestions(payload);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].code, "34A");
    }

    #[test]
    fn test_positioned_vehicles_failure_has_advisory() {
        let (vehicles, advisory) =
            positioned_vehicles(Err(UpstreamError::Timeout), &RouteStops::default());
        assert!(vehicles.is_empty());
        assert_eq!(advisory.as_deref(), Some("live vehicles unavailable: upstream timed out"));
    }
}
