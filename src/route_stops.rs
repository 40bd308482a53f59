//! Ordered stops of a line, positioned and split by direction.

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::cache::KeyedTtlCache;
use crate::error::UpstreamError;
use crate::model::{RouteStop, RouteStops};
use crate::reference::{ReferenceDataCache, StopDirectory};
use crate::services::route_stop_source::{OrderedStop, RouteStopSource};

/// Joins ordered stops with the stop directory and splits them in two.
///
/// The first `n / 2` stops (rounded down) are taken as the outbound leg and
/// the rest as the return leg. This is positional only: the route page does
/// not say where the direction changes. Stops missing from the directory
/// keep their name and sequence but have no position.
pub fn split_route(ordered: &[OrderedStop], directory: Option<&StopDirectory>) -> RouteStops {
    let positioned: Vec<RouteStop> = ordered
        .iter()
        .map(|s| {
            let known = directory.and_then(|d| d.get(&s.code));
            RouteStop {
                seq: s.seq,
                code: s.code.clone(),
                name: s.name.clone(),
                lat: known.and_then(|k| k.lat),
                lon: known.and_then(|k| k.lon),
            }
        })
        .collect();

    let mid = positioned.len() / 2;
    let mut outbound_stops = positioned;
    let return_stops = outbound_stops.split_off(mid);

    RouteStops {
        outbound_stops,
        return_stops,
    }
}

/// Resolves the positioned route of a line.
pub struct RouteStopsResolver {
    source: Arc<dyn RouteStopSource>,
    reference: Arc<ReferenceDataCache>,
    ordered: KeyedTtlCache<String, Vec<OrderedStop>>,
}

impl RouteStopsResolver {
    pub fn new(
        source: Arc<dyn RouteStopSource>,
        reference: Arc<ReferenceDataCache>,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            reference,
            ordered: KeyedTtlCache::new("route_stops", ttl),
        }
    }

    /// Returns the outbound and return stops of `line`.
    ///
    /// The stop order is cached per line. A stop directory failure does not
    /// fail the route, the stops are then returned without positions.
    ///
    /// # Errors
    ///
    /// Fails only if the route page cannot be fetched and no earlier copy
    /// is cached.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, line: &str) -> Result<RouteStops, UpstreamError> {
        let key = line.to_string();
        let ordered = self
            .ordered
            .get_or_refresh(&key, || self.source.fetch_ordered_stops(line))
            .await?;

        let directory = match self.reference.get_stops().await {
            Ok(d) => Some(d),
            Err(e) => {
                warn!(error = %e, "Stop directory unavailable, route stops left unpositioned");
                None
            }
        };

        Ok(split_route(&ordered, directory.as_deref()))
    }
}
