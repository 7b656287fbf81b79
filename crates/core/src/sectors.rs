//! Derived tower geometry: coverage circle, sector rays, cardinal markers.
//!
//! Nothing produced here is stored. The geometry is recomputed from the
//! tower record whenever it is drawn, which is also how a radius preview
//! works: run the generator with an override and leave the record alone.

use serde::Serialize;

use crate::annotation::Tower;
use crate::geodesy::{self, LatLon};

/// Bearings of the three sector rays, clockwise from north.
pub const SECTOR_BEARINGS_DEG: [f64; 3] = [180.0, 300.0, 60.0];

/// Stroke colors of the sector rays, index-aligned with [`SECTOR_BEARINGS_DEG`].
pub const SECTOR_COLORS: [&str; 3] = ["blue", "green", "red"];

/// Cardinal markers sit at this fraction of the coverage radius.
pub const CARDINAL_RADIUS_FACTOR: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Cardinal {
    #[serde(rename = "N")]
    North,
    #[serde(rename = "E")]
    East,
    #[serde(rename = "S")]
    South,
    #[serde(rename = "O")]
    West,
}

impl Cardinal {
    pub const ALL: [Cardinal; 4] = [Self::North, Self::East, Self::South, Self::West];

    pub fn bearing_deg(&self) -> f64 {
        match self {
            Self::North => 0.0,
            Self::East => 90.0,
            Self::South => 180.0,
            Self::West => 270.0,
        }
    }

    /// Text drawn on the map for this marker.
    pub fn label(&self) -> &'static str {
        match self {
            Self::North => "N",
            Self::East => "E",
            Self::South => "S",
            Self::West => "O",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageCircle {
    pub center: LatLon,
    pub radius_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorRay {
    pub bearing_deg: f64,
    pub length_m: f64,
    pub color: &'static str,
    pub start: LatLon,
    pub end: LatLon,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardinalMarker {
    pub cardinal: Cardinal,
    pub distance_m: f64,
    pub position: LatLon,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TowerSectors {
    pub coverage: CoverageCircle,
    pub rays: [SectorRay; 3],
    pub cardinals: [CardinalMarker; 4],
}

/// Geometry for a tower record at its stored radius.
pub fn generate(tower: &Tower) -> TowerSectors {
    generate_at(tower.position(), tower.radius_m)
}

/// Geometry for a tower record drawn with a different radius.
pub fn generate_with_radius(tower: &Tower, radius_m: f64) -> TowerSectors {
    generate_at(tower.position(), radius_m)
}

/// Geometry for a tower at `center` with coverage `radius_m`.
pub fn generate_at(center: LatLon, radius_m: f64) -> TowerSectors {
    let rays = std::array::from_fn(|i| {
        let bearing_deg = SECTOR_BEARINGS_DEG[i];
        SectorRay {
            bearing_deg,
            length_m: radius_m,
            color: SECTOR_COLORS[i],
            start: center,
            end: geodesy::project(center, radius_m, bearing_deg),
        }
    });

    let marker_distance = radius_m * CARDINAL_RADIUS_FACTOR;
    let cardinals = Cardinal::ALL.map(|cardinal| CardinalMarker {
        cardinal,
        distance_m: marker_distance,
        position: geodesy::project(center, marker_distance, cardinal.bearing_deg()),
    });

    TowerSectors {
        coverage: CoverageCircle { center, radius_m },
        rays,
        cardinals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::distance_km;

    fn tower_at(lat: f64, lon: f64, radius_m: f64) -> Tower {
        Tower {
            lat,
            lon,
            radius_m,
            color: "#e74c3c".into(),
            thickness: 2.0,
            name: "T".into(),
        }
    }

    #[test]
    fn tower_yields_three_rays_and_four_cardinals() {
        let sectors = generate(&tower_at(10.0, 20.0, 1000.0));

        let bearings: Vec<f64> = sectors.rays.iter().map(|r| r.bearing_deg).collect();
        assert_eq!(bearings, vec![180.0, 300.0, 60.0]);

        for ray in &sectors.rays {
            assert_eq!(ray.length_m, 1000.0);
            assert_eq!(ray.start, LatLon::new(10.0, 20.0));
            let km = distance_km(ray.start, ray.end);
            assert!((km - 1.0).abs() < 1e-6, "ray at {} is {km} km", ray.bearing_deg);
        }

        let labels: Vec<&str> = sectors.cardinals.iter().map(|c| c.cardinal.label()).collect();
        assert_eq!(labels, vec!["N", "E", "S", "O"]);

        for marker in &sectors.cardinals {
            assert_eq!(marker.distance_m, 900.0);
            let km = distance_km(LatLon::new(10.0, 20.0), marker.position);
            assert!((km - 0.9).abs() < 1e-6);
        }
    }

    #[test]
    fn coverage_circle_matches_record() {
        let sectors = generate(&tower_at(-12.0, -77.0, 750.0));
        assert_eq!(sectors.coverage.radius_m, 750.0);
        assert_eq!(sectors.coverage.center, LatLon::new(-12.0, -77.0));
    }

    #[test]
    fn north_marker_is_due_north() {
        let sectors = generate_at(LatLon::new(0.0, 0.0), 1000.0);
        let north = &sectors.cardinals[0];
        assert!(north.position.lat() > 0.0);
        assert!(north.position.lon().abs() < 1e-12);
    }

    #[test]
    fn generation_is_deterministic() {
        let tower = tower_at(45.5, -73.6, 2000.0);
        assert_eq!(generate(&tower), generate(&tower));
    }

    #[test]
    fn radius_override_does_not_depend_on_stored_radius() {
        let small = tower_at(5.0, 5.0, 100.0);
        let large = tower_at(5.0, 5.0, 3000.0);
        assert_eq!(generate_with_radius(&small, 1500.0), generate_with_radius(&large, 1500.0));
        assert_eq!(generate_with_radius(&large, 3000.0), generate(&large));
    }

    #[test]
    fn ray_colors_follow_bearings() {
        let sectors = generate_at(LatLon::new(1.0, 1.0), 10.0);
        let colors: Vec<&str> = sectors.rays.iter().map(|r| r.color).collect();
        assert_eq!(colors, SECTOR_COLORS.to_vec());
    }
}
