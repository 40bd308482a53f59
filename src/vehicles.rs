//! Canonical form of live vehicle positions.

use serde_json::Value;

use crate::geo_match::{VEHICLE_AT_STOP_RADIUS_M, nearest};
use crate::model::{Direction, Located, RouteStop, VariantGroup, Vehicle};
use crate::parser::{pick_f64, pick_str};

pub const SEGMENT_DELIMITER: char = '_';
pub const OUTBOUND_MARKER: &str = "G";
pub const RETURN_MARKER: &str = "D";

const DOOR_CODE: &[&str] = &["vehicleDoorCode", "kapino", "KAPINO"];
const LATITUDE: &[&str] = &["lat", "enlem", "ENLEM"];
const LONGITUDE: &[&str] = &["lon", "lng", "boylam", "BOYLAM"];
const DESTINATION: &[&str] = &["direction", "hedef"];
const SEGMENT: &[&str] = &["guzergah", "GUZERGAH", "guzpiett", "GUZPIETT"];

/// Splits a route-segment identifier such as `34_G_A1` into its direction
/// and variant.
///
/// The direction comes from a `_G_` or `_D_` marker, outbound checked first,
/// and is `Unknown` only when neither occurs. The variant is the last token
/// of identifiers with at least three tokens, otherwise empty.
pub fn infer_segment(raw: &str) -> (Direction, String) {
    let tokens: Vec<&str> = raw.split(SEGMENT_DELIMITER).collect();

    let variant = match tokens.as_slice() {
        [_, _, .., last] => last.to_string(),
        _ => String::new(),
    };

    let direction = if raw.contains(&marker(OUTBOUND_MARKER)) {
        Direction::Outbound
    } else if raw.contains(&marker(RETURN_MARKER)) {
        Direction::Return
    } else {
        Direction::Unknown
    };

    (direction, variant)
}

fn marker(code: &str) -> String {
    format!("{SEGMENT_DELIMITER}{code}{SEGMENT_DELIMITER}")
}

/// Normalizes one raw vehicle record. Missing or malformed coordinates
/// become 0.
pub fn normalize_vehicle(record: &Value) -> Vehicle {
    let raw_segment_id = pick_str(record, SEGMENT).unwrap_or_default();
    let (direction, variant) = infer_segment(&raw_segment_id);

    Vehicle {
        door_code: pick_str(record, DOOR_CODE).unwrap_or_default(),
        lat: pick_f64(record, LATITUDE).unwrap_or(0.0),
        lon: pick_f64(record, LONGITUDE).unwrap_or(0.0),
        direction,
        variant,
        raw_segment_id,
        destination: pick_str(record, DESTINATION).unwrap_or_default(),
        nearest_stop_code: None,
    }
}

/// Normalizes a relay vehicle payload, either a bare array or an object with
/// a `vehicles` array.
pub fn normalize_vehicles(payload: &Value) -> Vec<Vehicle> {
    let records: &[Value] = match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("vehicles") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    records
        .iter()
        .filter(|r| r.is_object())
        .map(normalize_vehicle)
        .collect()
}

impl Vehicle {
    /// Tags the vehicle with the route stop it is at, if any lies within
    /// [`VEHICLE_AT_STOP_RADIUS_M`]. Vehicles at 0,0 have no usable fix.
    pub fn with_nearest_stop<'a>(mut self, stops: impl IntoIterator<Item = &'a RouteStop>) -> Self {
        if self.lat == 0.0 && self.lon == 0.0 {
            return self;
        }
        let Some(at) = self.coordinate() else {
            return self;
        };
        self.nearest_stop_code =
            nearest(at, stops, VEHICLE_AT_STOP_RADIUS_M).map(|hit| hit.item.code.clone());
        self
    }
}

/// Counts vehicles per (direction, variant) pair, in first-seen order.
pub fn variant_groups(vehicles: &[Vehicle]) -> Vec<VariantGroup> {
    let mut groups: Vec<VariantGroup> = Vec::new();

    for v in vehicles {
        if let Some(g) = groups
            .iter_mut()
            .find(|g| g.direction == v.direction && g.variant == v.variant)
        {
            g.count += 1;
            continue;
        }

        let label = if v.destination.is_empty() {
            group_key(v.direction, &v.variant)
        } else {
            v.destination.clone()
        };
        groups.push(VariantGroup {
            direction: v.direction,
            variant: v.variant.clone(),
            label,
            count: 1,
        });
    }

    groups
}

fn group_key(direction: Direction, variant: &str) -> String {
    let marker = match direction {
        Direction::Outbound => OUTBOUND_MARKER,
        Direction::Return => RETURN_MARKER,
        Direction::Unknown => "?",
    };
    if variant.is_empty() {
        marker.to_string()
    } else {
        format!("{marker}{SEGMENT_DELIMITER}{variant}")
    }
}
