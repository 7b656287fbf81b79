//! KML/KMZ ingest.
//!
//! Parsing is pattern-based and tolerant: it reads the handful of elements
//! the importer needs (styles, style maps, placemarks) and skips anything it
//! cannot make sense of. Only three conditions fail an import: an unsupported
//! file extension, a KMZ without a `.kml` member, and a document with no
//! placemark carrying usable coordinates.

pub mod archive;
pub mod placemark;
pub mod styles;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::annotation::{NewAnnotation, NewLabel, NewRoute};
use crate::error::CoreError;
use crate::geodesy::LatLon;

pub use placemark::{Geometry, Placemark};
pub use styles::StyleIndex;

/// Route color for imported line strings.
pub const IMPORTED_LINE_COLOR: &str = "#0000FF";

/// Route color for imported polygons.
pub const IMPORTED_POLYGON_COLOR: &str = "#008000";

/// Route thickness for every imported shape.
pub const IMPORTED_THICKNESS: f64 = 3.0;

/// Ingest-domain error type.
#[derive(Debug, thiserror::Error)]
pub enum KmlError {
    #[error("Unsupported extension '{0}'. Use .kml or .kmz")]
    UnsupportedExtension(String),

    #[error("No .kml member found in archive {}", .0.display())]
    MissingKmlMember(PathBuf),

    #[error("No placemarks with coordinates found")]
    NoPlacemarks,

    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid KMZ archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl From<KmlError> for CoreError {
    fn from(err: KmlError) -> Self {
        match err {
            KmlError::UnsupportedExtension(_) | KmlError::MissingKmlMember(_) => {
                CoreError::UnsupportedInput(err.to_string())
            }
            KmlError::Io { path, source } => CoreError::Io { path, source },
            KmlError::NoPlacemarks | KmlError::Archive(_) => CoreError::Parse(err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Import result
// ---------------------------------------------------------------------------

/// One placemark with its icon already resolved against the archive images.
#[derive(Debug, Clone, PartialEq)]
pub struct KmlFeature {
    pub geometry: Geometry,
    pub name: String,
    pub description: String,
    /// Inline `data:` URI, when the placemark's style points at an image
    /// shipped inside the archive.
    pub resolved_icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KmlImport {
    pub features: Vec<KmlFeature>,
}

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub points: usize,
    pub lines: usize,
    pub polygons: usize,
    pub icons: usize,
}

impl KmlImport {
    pub fn summary(&self) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for feature in &self.features {
            match feature.geometry {
                Geometry::Point(_) => summary.points += 1,
                Geometry::Line(_) => summary.lines += 1,
                Geometry::Polygon(_) => summary.polygons += 1,
            }
            if feature.resolved_icon.is_some() {
                summary.icons += 1;
            }
        }
        summary
    }

    /// Arithmetic mean of every imported coordinate.
    pub fn center(&self) -> Option<LatLon> {
        let coords: Vec<LatLon> = self
            .features
            .iter()
            .flat_map(|f| f.geometry.coordinates())
            .collect();
        if coords.is_empty() {
            return None;
        }
        let n = coords.len() as f64;
        let lat = coords.iter().map(|c| c.lat()).sum::<f64>() / n;
        let lon = coords.iter().map(|c| c.lon()).sum::<f64>() / n;
        Some(LatLon::new(lat, lon))
    }

    /// Store drafts for every feature: points become labels, lines and
    /// polygons become routes.
    pub fn into_drafts(self) -> Vec<NewAnnotation> {
        self.features.into_iter().map(into_draft).collect()
    }
}

fn into_draft(feature: KmlFeature) -> NewAnnotation {
    let name = non_empty(feature.name);
    match feature.geometry {
        Geometry::Point(at) => NewAnnotation::Label(NewLabel {
            lat: Some(at.lat()),
            lon: Some(at.lon()),
            text: name.or_else(|| non_empty(feature.description)),
            icon_image: feature.resolved_icon,
            ..Default::default()
        }),
        Geometry::Line(points) => NewAnnotation::Route(NewRoute {
            points,
            color: Some(IMPORTED_LINE_COLOR.to_string()),
            thickness: Some(IMPORTED_THICKNESS),
            name,
        }),
        Geometry::Polygon(points) => NewAnnotation::Route(NewRoute {
            points,
            color: Some(IMPORTED_POLYGON_COLOR.to_string()),
            thickness: Some(IMPORTED_THICKNESS),
            name,
        }),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Read and parse a `.kml` or `.kmz` file.
pub fn ingest(path: &Path) -> Result<KmlImport, KmlError> {
    let source = archive::read_source(path)?;
    let import = parse(&source.kml, &source.images)?;

    let summary = import.summary();
    tracing::info!(
        path = %path.display(),
        points = summary.points,
        lines = summary.lines,
        polygons = summary.polygons,
        icons = summary.icons,
        images = source.images.len(),
        "KML import parsed"
    );
    Ok(import)
}

/// Parse KML text, resolving icons against `images` (archive path to data URI).
pub fn parse(kml: &str, images: &HashMap<String, String>) -> Result<KmlImport, KmlError> {
    let styles = StyleIndex::parse(kml);
    tracing::debug!(
        styles = styles.style_count(),
        style_maps = styles.style_map_count(),
        images = images.len(),
        "Indexed KML styles"
    );

    let features: Vec<KmlFeature> = placemark::parse_placemarks(kml)
        .into_iter()
        .map(|p| {
            let resolved_icon = p
                .style_url
                .as_deref()
                .and_then(|url| styles.resolve(url))
                .and_then(|href| images.get(href).cloned());
            KmlFeature {
                geometry: p.geometry,
                name: p.name,
                description: p.description,
                resolved_icon,
            }
        })
        .collect();

    if features.is_empty() {
        return Err(KmlError::NoPlacemarks);
    }
    Ok(KmlImport { features })
}
