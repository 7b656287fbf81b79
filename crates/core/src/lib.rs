//! Geospatial annotation model for standalone tower maps: records, the
//! sector geometry drawn for towers, the store that persists them, the codec
//! that embeds them into HTML map documents, and KML/KMZ ingest.

pub mod annotation;
pub mod error;
pub mod geodesy;
pub mod html;
pub mod kml;
pub mod sectors;
pub mod session;
pub mod store;
pub mod types;
