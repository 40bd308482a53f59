//! Canonical data model served to the map client.

use serde::Serialize;

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Anything that may sit at a known position.
pub trait Located {
    fn coordinate(&self) -> Option<Coordinate>;
}

/// An entry of the line directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub code: String,
    pub name: String,
}

/// An entry of the stop directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop {
    pub code: String,
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Free-text direction label, e.g. the heading the platform serves.
    pub direction: Option<String>,
    pub district: Option<String>,
}

impl Located for Stop {
    fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.lat?, self.lon?))
    }
}

/// One stop along a line, in travel order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStop {
    pub seq: u32,
    pub code: String,
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl Located for RouteStop {
    fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.lat?, self.lon?))
    }
}

/// Ordered stops of a line split into its two travel directions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStops {
    pub outbound_stops: Vec<RouteStop>,
    pub return_stops: Vec<RouteStop>,
}

impl RouteStops {
    pub fn is_empty(&self) -> bool {
        self.outbound_stops.is_empty() && self.return_stops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteStop> {
        self.outbound_stops.iter().chain(self.return_stops.iter())
    }
}

/// Travel direction of a vehicle, derived from its segment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
    Return,
    Unknown,
}

/// A live vehicle position in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub door_code: String,
    pub lat: f64,
    pub lon: f64,
    pub direction: Direction,
    pub variant: String,
    pub raw_segment_id: String,
    /// Upstream destination label, shown as-is by the client.
    pub destination: String,
    pub nearest_stop_code: Option<String>,
}

impl Located for Vehicle {
    fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.lat, self.lon))
    }
}

/// Count of vehicles sharing a (direction, variant) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantGroup {
    pub direction: Direction,
    pub variant: String,
    pub label: String,
    pub count: usize,
}

/// A vehicle approaching a stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalEstimate {
    pub line_code: String,
    pub vehicle_door_code: String,
    pub eta_minutes: u32,
    pub distance_km: f64,
    pub direction: String,
}

/// One scheduled departure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Departure {
    pub time: String,
    pub variant: String,
}

/// Departures of one day type, per direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DayTimetable {
    pub outbound: Vec<Departure>,
    #[serde(rename = "return")]
    pub return_: Vec<Departure>,
}

/// Planned departures of a line for each day type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timetable {
    pub weekday: DayTimetable,
    pub saturday: DayTimetable,
    pub sunday: DayTimetable,
}
