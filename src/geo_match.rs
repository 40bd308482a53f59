//! Great-circle distance and nearest-point lookup.

use geo::{Distance, Haversine, Point};

use crate::model::{Coordinate, Located};

/// Radius within which a vehicle counts as being at a stop.
pub const VEHICLE_AT_STOP_RADIUS_M: f64 = 100.0;

/// Great-circle distance between `a` and `b`, in metres.
pub fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let p1 = Point::new(a.lon, a.lat);
    let p2 = Point::new(b.lon, b.lat);
    Haversine.distance(p1, p2)
}

/// A candidate picked by [`nearest`].
#[derive(Debug)]
pub struct Nearest<'a, T> {
    pub index: usize,
    pub item: &'a T,
    pub distance_m: f64,
}

/// Finds the candidate closest to `point`, at most `max_distance_m` away.
///
/// Candidates without a position are skipped. On ties the earliest candidate
/// wins.
pub fn nearest<'a, T: Located>(
    point: Coordinate,
    candidates: impl IntoIterator<Item = &'a T>,
    max_distance_m: f64,
) -> Option<Nearest<'a, T>> {
    let mut best: Option<Nearest<'a, T>> = None;

    for (index, item) in candidates.into_iter().enumerate() {
        let Some(at) = item.coordinate() else {
            continue;
        };
        let d = distance_m(point, at);
        if d > max_distance_m {
            continue;
        }
        if best.as_ref().is_none_or(|b| d < b.distance_m) {
            best = Some(Nearest {
                index,
                item,
                distance_m: d,
            });
        }
    }

    best
}
