//! Spherical-earth geodesy helpers.
//!
//! Everything here works on a sphere of radius [`EARTH_RADIUS_KM`]; inputs
//! and outputs are in degrees, intermediate math in radians.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by every computation in this module.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic position. Serializes as a `[lat, lon]` pair, the shape the
/// rendering library expects for polyline vertices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self(lat, lon)
    }

    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lon(&self) -> f64 {
        self.1
    }

    /// `true` when both components are finite and the latitude is within
    /// `[-90, 90]`. Longitude is not range-checked; the renderer wraps it.
    pub fn is_valid(&self) -> bool {
        self.0.is_finite() && self.1.is_finite() && (-90.0..=90.0).contains(&self.0)
    }
}

/// Destination reached from `(lat, lon)` after travelling `distance_km`
/// along the great circle with initial bearing `bearing_deg` (clockwise
/// from north).
pub fn destination_point(lat: f64, lon: f64, distance_km: f64, bearing_deg: f64) -> (f64, f64) {
    let delta = distance_km / EARTH_RADIUS_KM;
    let theta = bearing_deg.to_radians();
    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();

    // Floating-point overshoot can push the sine slightly past 1 near the poles.
    let sin_phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos())
        .clamp(-1.0, 1.0);
    let phi2 = sin_phi2.asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * sin_phi2);

    (phi2.to_degrees(), lambda2.to_degrees())
}

/// [`destination_point`] over [`LatLon`] with the distance in meters.
pub fn project(origin: LatLon, distance_m: f64, bearing_deg: f64) -> LatLon {
    let (lat, lon) = destination_point(origin.lat(), origin.lon(), distance_m / 1000.0, bearing_deg);
    LatLon(lat, lon)
}

/// Great-circle distance between two positions in kilometers (haversine).
pub fn distance_km(a: LatLon, b: LatLon) -> f64 {
    let phi1 = a.lat().to_radians();
    let phi2 = b.lat().to_radians();
    let d_phi = (b.lat() - a.lat()).to_radians();
    let d_lambda = (b.lon() - a.lon()).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Total length of a polyline in kilometers.
pub fn path_length_km(points: &[LatLon]) -> f64 {
    points.windows(2).map(|w| distance_km(w[0], w[1])).sum()
}
