//! Coverage generator (C4): lawnmower/spiral/sector waypoint sequences.
//!
//! Patterns are produced in a local tangent plane around a centroid and
//! projected to (lat, lon) by the small-angle approximation using the
//! spherical-earth metres-per-degree factors at the centroid latitude.
//! Pure, deterministic, coordinate-agnostic to airspace/obstacles — combine
//! with the A* planner (C3) when obstacle avoidance is required.

use drone_domain::{Coordinates, Waypoint, WaypointAction};
use std::f64::consts::PI;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Metres-per-degree conversion factors at a given latitude.
struct LocalPlane {
    centroid: Coordinates,
    meters_per_deg_lat: f64,
    meters_per_deg_lon: f64,
}

impl LocalPlane {
    fn at(centroid: Coordinates) -> Self {
        let meters_per_deg_lat = EARTH_RADIUS_M * (PI / 180.0);
        let meters_per_deg_lon = meters_per_deg_lat * centroid.latitude.to_radians().cos();
        Self {
            centroid,
            meters_per_deg_lat,
            meters_per_deg_lon,
        }
    }

    /// Convert a local offset in metres (east, north) to absolute
    /// coordinates at `altitude_m`.
    fn project(&self, east_m: f64, north_m: f64, altitude_m: f64) -> Coordinates {
        Coordinates::new(
            self.centroid.latitude + north_m / self.meters_per_deg_lat,
            self.centroid.longitude + east_m / self.meters_per_deg_lon,
            altitude_m,
        )
    }
}

fn waypoint(pos: Coordinates, action: WaypointAction) -> Waypoint {
    Waypoint {
        position: pos,
        speed_mps: None,
        heading_deg: None,
        action,
    }
}

/// Alternating east/west passes over a `width` x `height` rectangle
/// centred on `centroid`, with rows spaced `row_spacing` apart. Produces
/// `2 * ceil(height / row_spacing)` endpoint waypoints.
#[must_use]
pub fn lawnmower(
    centroid: Coordinates,
    width_m: f64,
    height_m: f64,
    row_spacing_m: f64,
    altitude_m: f64,
) -> Vec<Waypoint> {
    assert!(row_spacing_m > 0.0, "row spacing must be positive");
    let plane = LocalPlane::at(centroid);
    let rows = (height_m / row_spacing_m).ceil() as u32;
    let half_w = width_m / 2.0;
    let half_h = height_m / 2.0;

    let mut waypoints = Vec::with_capacity((rows * 2) as usize);
    for row in 0..rows {
        let north = -half_h + (row as f64) * row_spacing_m;
        let (east_start, east_end) = if row % 2 == 0 {
            (-half_w, half_w)
        } else {
            (half_w, -half_w)
        };
        waypoints.push(waypoint(
            plane.project(east_start, north, altitude_m),
            WaypointAction::Nav,
        ));
        waypoints.push(waypoint(
            plane.project(east_end, north, altitude_m),
            WaypointAction::Scan,
        ));
    }
    waypoints
}

/// Archimedean spiral `r = a * theta`, `a = spacing / (2*pi)`, sampled `n`
/// times from `theta = 0` to `theta = r_max / a`.
#[must_use]
pub fn spiral(
    centroid: Coordinates,
    spacing_m: f64,
    r_max_m: f64,
    samples: u32,
    altitude_m: f64,
) -> Vec<Waypoint> {
    assert!(spacing_m > 0.0, "spacing must be positive");
    assert!(samples >= 2, "need at least two samples");
    let plane = LocalPlane::at(centroid);
    let a = spacing_m / (2.0 * PI);
    let theta_max = r_max_m / a;

    (0..samples)
        .map(|i| {
            let theta = theta_max * (i as f64) / ((samples - 1) as f64);
            let r = a * theta;
            let east = r * theta.cos();
            let north = r * theta.sin();
            waypoint(plane.project(east, north, altitude_m), WaypointAction::Scan)
        })
        .collect()
}

/// `legs` radial out-and-back passes from `centroid` over the angular
/// wedge `[alpha0, alpha1]` (radians), each leg extending `radius_m`.
/// Emits centroid, perimeter, centroid, … for every leg.
#[must_use]
pub fn sector_scan(
    centroid: Coordinates,
    radius_m: f64,
    alpha0: f64,
    alpha1: f64,
    legs: u32,
    altitude_m: f64,
) -> Vec<Waypoint> {
    assert!(legs >= 1, "need at least one leg");
    let plane = LocalPlane::at(centroid);
    let center_wp = waypoint(centroid, WaypointAction::Nav);

    let mut waypoints = Vec::with_capacity((legs as usize) * 2 + 1);
    waypoints.push(center_wp);
    for i in 0..legs {
        let t = if legs == 1 {
            0.0
        } else {
            (i as f64) / ((legs - 1) as f64)
        };
        let alpha = alpha0 + t * (alpha1 - alpha0);
        let east = radius_m * alpha.cos();
        let north = radius_m * alpha.sin();
        waypoints.push(waypoint(
            plane.project(east, north, altitude_m),
            WaypointAction::Scan,
        ));
        waypoints.push(center_wp);
    }
    waypoints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sf() -> Coordinates {
        Coordinates::new(37.7749, -122.4194, 0.0)
    }

    #[test]
    fn lawnmower_produces_expected_waypoint_count() {
        let wps = lawnmower(sf(), 200.0, 450.0, 100.0, 100.0);
        // ceil(450/100) = 5 rows -> 10 endpoint waypoints
        assert_eq!(wps.len(), 10);
    }

    #[test]
    fn lawnmower_rows_alternate_direction() {
        let wps = lawnmower(sf(), 100.0, 300.0, 100.0, 50.0);
        let row0_start = wps[0].position.longitude;
        let row0_end = wps[1].position.longitude;
        let row1_start = wps[2].position.longitude;
        assert!(row0_start < row0_end);
        assert!((row1_start - row0_end).abs() < 1e-9);
    }

    #[test]
    fn spiral_starts_at_centroid_and_grows_outward() {
        let center = sf();
        let wps = spiral(center, 20.0, 200.0, 50, 30.0);
        let first = wps.first().unwrap();
        let last = wps.last().unwrap();
        assert!((first.position.latitude - center.latitude).abs() < 1e-9);
        let d_first = first.position.distance_to_km(&center);
        let d_last = last.position.distance_to_km(&center);
        assert!(d_last > d_first);
    }

    #[test]
    fn sector_scan_returns_to_centroid_between_legs() {
        let wps = sector_scan(sf(), 500.0, 0.0, PI, 4, 100.0);
        assert_eq!(wps.len(), 9); // center + 4 * (perimeter, center)
        assert_eq!(wps[0].position, wps[2].position);
    }
}
