//! Capabilities the core needs from its upstreams.
//!
//! Each trait has one production implementation under `infra` and in-memory
//! fakes in the tests.

pub mod legacy_api;
pub mod relay_api;
pub mod route_stop_source;

pub use legacy_api::{LegacyApi, Operation};
pub use relay_api::RelayApi;
pub use route_stop_source::{OrderedStop, RouteStopSource};
