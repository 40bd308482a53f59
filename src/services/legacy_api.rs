//! Trait and operation table for the legacy envelope-based service.

use serde_json::Value;
use std::time::Duration;

use crate::error::UpstreamError;

/// A remote method of the legacy service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    /// Service path relative to the legacy base URL.
    pub service: &'static str,
    pub method: &'static str,
    /// Overrides the client's default timeout when set.
    pub timeout: Option<Duration>,
}

impl Operation {
    /// Full line directory. Takes an empty `HatKodu`.
    pub const LINES: Operation = Operation {
        service: "UlasimAnaVeri/HatDurakGuzergah.asmx",
        method: "GetHat_json",
        timeout: None,
    };

    /// Full stop directory. Takes an empty `DurakKodu`. Large and slow.
    pub const STOPS: Operation = Operation {
        service: "UlasimAnaVeri/HatDurakGuzergah.asmx",
        method: "GetDurak_json",
        timeout: Some(Duration::from_secs(30)),
    };

    /// Planned departures of a line. Takes `HatKodu`.
    pub const TIMETABLE: Operation = Operation {
        service: "UlasimAnaVeri/PlanlananSeferSaati.asmx",
        method: "GetPlanlananSeferSaati_json",
        timeout: Some(Duration::from_secs(15)),
    };

    /// Vehicles approaching a stop. Takes `DurakKodu`.
    pub const APPROACHING_VEHICLES: Operation = Operation {
        service: "FiloDurak/FiloDurakSor662.asmx",
        method: "GetDurakaYaklasanOtobusler_json",
        timeout: None,
    };
}

/// Calls methods of the legacy service.
#[async_trait::async_trait]
pub trait LegacyApi: Send + Sync {
    /// Invokes `op` with `params` and returns its undecoded result payload.
    ///
    /// `Ok(None)` means the response envelope held no recognisable result,
    /// which callers treat as "no data".
    async fn call(
        &self,
        op: &Operation,
        params: &[(&str, &str)],
    ) -> Result<Option<Value>, UpstreamError>;
}
