//! Map annotation records, creation drafts, partial updates and validation.
//!
//! Records keep the original tool's JSON keys on the wire (`tipo`, `puntos`,
//! `radio`, ...) so documents saved by earlier versions load unchanged. Keys
//! starting with `_` are internal bookkeeping and never leave the backing
//! store file.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geodesy::{self, LatLon};
use crate::types::{AnnotationId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_ROUTE_COLOR: &str = "#FF0000";
pub const DEFAULT_ROUTE_THICKNESS: f64 = 3.0;

pub const DEFAULT_LABEL_TEXT: &str = "Label";
pub const DEFAULT_LABEL_COLOR: &str = "#000000";
pub const DEFAULT_LABEL_ICON: &str = "info";

pub const DEFAULT_CIRCLE_RADIUS_M: f64 = 100.0;
pub const DEFAULT_CIRCLE_COLOR: &str = "#3388ff";

pub const DEFAULT_TOWER_RADIUS_M: f64 = 500.0;
pub const DEFAULT_TOWER_COLOR: &str = "#e74c3c";
pub const DEFAULT_TOWER_THICKNESS: f64 = 2.0;

/// Maximum line thickness in pixels.
pub const MAX_THICKNESS: f64 = 50.0;

/// Maximum circle / tower coverage radius in meters.
pub const MAX_RADIUS_M: f64 = 100_000.0;

/// Prefix marking a record key as internal (persisted, never embedded).
pub const INTERNAL_FIELD_PREFIX: char = '_';

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// The variant of an annotation. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    #[serde(rename = "ruta")]
    Route,
    #[serde(rename = "etiqueta")]
    Label,
    #[serde(rename = "circulo")]
    Circle,
    #[serde(rename = "torre")]
    Tower,
}

impl AnnotationKind {
    /// Wire name of the kind (the `tipo` value).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Route => "ruta",
            Self::Label => "etiqueta",
            Self::Circle => "circulo",
            Self::Tower => "torre",
        }
    }

    /// Wire names of the fields an update may touch for this kind.
    pub fn updatable_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Route => &["puntos", "color", "grosor", "nombre"],
            Self::Label => &["lat", "lon", "texto", "color", "icono"],
            Self::Circle => &["lat", "lon", "radio", "color", "nombre"],
            Self::Tower => &["lat", "lon", "radio", "color", "grosor", "nombre"],
        }
    }

    fn accepts(&self, field: &str) -> bool {
        self.updatable_fields().contains(&field)
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A stored annotation: id, kind-specific shape, internal bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    #[serde(flatten)]
    pub shape: Shape,
    #[serde(
        rename = "_created_at",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<Timestamp>,
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        self.shape.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tipo")]
pub enum Shape {
    #[serde(rename = "ruta")]
    Route(Route),
    #[serde(rename = "etiqueta")]
    Label(Label),
    #[serde(rename = "circulo")]
    Circle(Circle),
    #[serde(rename = "torre")]
    Tower(Tower),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(rename = "puntos", default)]
    pub points: Vec<LatLon>,
    #[serde(default = "default_route_color")]
    pub color: String,
    #[serde(rename = "grosor", default = "default_route_thickness")]
    pub thickness: f64,
    #[serde(rename = "nombre", default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "texto", default = "default_label_text")]
    pub text: String,
    #[serde(default = "default_label_color")]
    pub color: String,
    #[serde(rename = "icono", default = "default_label_icon")]
    pub icon: String,
    /// Inline `data:` image, set when the label came from a KMZ placemark
    /// with a resolvable icon.
    #[serde(rename = "icono_img", default, skip_serializing_if = "Option::is_none")]
    pub icon_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "radio", default = "default_circle_radius")]
    pub radius_m: f64,
    #[serde(default = "default_circle_color")]
    pub color: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tower {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "radio", default = "default_tower_radius")]
    pub radius_m: f64,
    #[serde(default = "default_tower_color")]
    pub color: String,
    #[serde(rename = "grosor", default = "default_tower_thickness")]
    pub thickness: f64,
    #[serde(rename = "nombre", default)]
    pub name: String,
}

impl Route {
    /// Great-circle length of the polyline.
    pub fn length_km(&self) -> f64 {
        geodesy::path_length_km(&self.points)
    }
}

impl Tower {
    pub fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

fn default_route_color() -> String {
    DEFAULT_ROUTE_COLOR.to_string()
}
fn default_route_thickness() -> f64 {
    DEFAULT_ROUTE_THICKNESS
}
fn default_label_text() -> String {
    DEFAULT_LABEL_TEXT.to_string()
}
fn default_label_color() -> String {
    DEFAULT_LABEL_COLOR.to_string()
}
fn default_label_icon() -> String {
    DEFAULT_LABEL_ICON.to_string()
}
fn default_circle_radius() -> f64 {
    DEFAULT_CIRCLE_RADIUS_M
}
fn default_circle_color() -> String {
    DEFAULT_CIRCLE_COLOR.to_string()
}
fn default_tower_radius() -> f64 {
    DEFAULT_TOWER_RADIUS_M
}
fn default_tower_color() -> String {
    DEFAULT_TOWER_COLOR.to_string()
}
fn default_tower_thickness() -> f64 {
    DEFAULT_TOWER_THICKNESS
}

impl Shape {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Self::Route(_) => AnnotationKind::Route,
            Self::Label(_) => AnnotationKind::Label,
            Self::Circle(_) => AnnotationKind::Circle,
            Self::Tower(_) => AnnotationKind::Tower,
        }
    }

    /// Every coordinate the shape occupies (route vertices or the anchor).
    pub fn coordinates(&self) -> Vec<LatLon> {
        match self {
            Self::Route(r) => r.points.clone(),
            Self::Label(l) => vec![LatLon::new(l.lat, l.lon)],
            Self::Circle(c) => vec![LatLon::new(c.lat, c.lon)],
            Self::Tower(t) => vec![t.position()],
        }
    }

    /// Apply a partial update.
    ///
    /// Only fields declared for this shape's kind are considered; the rest
    /// are returned as ignored. All considered values are validated before
    /// anything is written, so a failed update leaves the shape untouched.
    pub fn apply(&mut self, patch: &AnnotationPatch) -> Result<Vec<&'static str>, CoreError> {
        let kind = self.kind();
        patch.validate_for(kind)?;

        match self {
            Self::Route(r) => {
                if let Some(points) = &patch.points {
                    r.points = points.clone();
                }
                assign(&mut r.color, &patch.color);
                assign_f64(&mut r.thickness, patch.thickness);
                assign(&mut r.name, &patch.name);
            }
            Self::Label(l) => {
                assign_f64(&mut l.lat, patch.lat);
                assign_f64(&mut l.lon, patch.lon);
                assign(&mut l.text, &patch.text);
                assign(&mut l.color, &patch.color);
                assign(&mut l.icon, &patch.icon);
            }
            Self::Circle(c) => {
                assign_f64(&mut c.lat, patch.lat);
                assign_f64(&mut c.lon, patch.lon);
                assign_f64(&mut c.radius_m, patch.radius_m);
                assign(&mut c.color, &patch.color);
                assign(&mut c.name, &patch.name);
            }
            Self::Tower(t) => {
                assign_f64(&mut t.lat, patch.lat);
                assign_f64(&mut t.lon, patch.lon);
                assign_f64(&mut t.radius_m, patch.radius_m);
                assign(&mut t.color, &patch.color);
                assign_f64(&mut t.thickness, patch.thickness);
                assign(&mut t.name, &patch.name);
            }
        }

        Ok(patch
            .present_fields()
            .into_iter()
            .filter(|f| !kind.accepts(f))
            .collect())
    }
}

fn assign(target: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        target.clone_from(v);
    }
}

fn assign_f64(target: &mut f64, value: Option<f64>) {
    if let Some(v) = value {
        *target = v;
    }
}

// ---------------------------------------------------------------------------
// Creation drafts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRoute {
    #[serde(rename = "puntos", default)]
    pub points: Vec<LatLon>,
    pub color: Option<String>,
    #[serde(rename = "grosor")]
    pub thickness: Option<f64>,
    #[serde(rename = "nombre")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLabel {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(rename = "texto")]
    pub text: Option<String>,
    pub color: Option<String>,
    #[serde(rename = "icono")]
    pub icon: Option<String>,
    #[serde(rename = "icono_img")]
    pub icon_image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCircle {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(rename = "radio")]
    pub radius_m: Option<f64>,
    pub color: Option<String>,
    #[serde(rename = "nombre")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTower {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(rename = "radio")]
    pub radius_m: Option<f64>,
    pub color: Option<String>,
    #[serde(rename = "grosor")]
    pub thickness: Option<f64>,
    #[serde(rename = "nombre")]
    pub name: Option<String>,
}

/// Input to [`AnnotationStore::add`](crate::store::AnnotationStore::add).
/// Omitted optional fields are filled with the kind's defaults.
#[derive(Debug, Clone)]
pub enum NewAnnotation {
    Route(NewRoute),
    Label(NewLabel),
    Circle(NewCircle),
    Tower(NewTower),
}

impl NewAnnotation {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Self::Route(_) => AnnotationKind::Route,
            Self::Label(_) => AnnotationKind::Label,
            Self::Circle(_) => AnnotationKind::Circle,
            Self::Tower(_) => AnnotationKind::Tower,
        }
    }

    /// Validate the draft and fill defaults. `ordinal` is the 1-based
    /// position the record will take in the store, used in default names.
    pub fn into_shape(self, ordinal: usize) -> Result<Shape, CoreError> {
        match self {
            Self::Route(d) => {
                validate_points(&d.points)?;
                let color = color_or(d.color, DEFAULT_ROUTE_COLOR)?;
                let thickness = d.thickness.unwrap_or(DEFAULT_ROUTE_THICKNESS);
                validate_thickness(thickness)?;
                Ok(Shape::Route(Route {
                    points: d.points,
                    color,
                    thickness,
                    name: d.name.unwrap_or_else(|| format!("Route {ordinal}")),
                }))
            }
            Self::Label(d) => {
                let at = require_position(d.lat, d.lon, AnnotationKind::Label)?;
                Ok(Shape::Label(Label {
                    lat: at.lat(),
                    lon: at.lon(),
                    text: d.text.unwrap_or_else(default_label_text),
                    color: color_or(d.color, DEFAULT_LABEL_COLOR)?,
                    icon: d.icon.unwrap_or_else(default_label_icon),
                    icon_image: d.icon_image,
                }))
            }
            Self::Circle(d) => {
                let at = require_position(d.lat, d.lon, AnnotationKind::Circle)?;
                let radius_m = d.radius_m.unwrap_or(DEFAULT_CIRCLE_RADIUS_M);
                validate_radius(radius_m)?;
                Ok(Shape::Circle(Circle {
                    lat: at.lat(),
                    lon: at.lon(),
                    radius_m,
                    color: color_or(d.color, DEFAULT_CIRCLE_COLOR)?,
                    name: d.name.unwrap_or_else(|| format!("Circle {ordinal}")),
                }))
            }
            Self::Tower(d) => {
                let at = require_position(d.lat, d.lon, AnnotationKind::Tower)?;
                let radius_m = d.radius_m.unwrap_or(DEFAULT_TOWER_RADIUS_M);
                validate_radius(radius_m)?;
                let thickness = d.thickness.unwrap_or(DEFAULT_TOWER_THICKNESS);
                validate_thickness(thickness)?;
                Ok(Shape::Tower(Tower {
                    lat: at.lat(),
                    lon: at.lon(),
                    radius_m,
                    color: color_or(d.color, DEFAULT_TOWER_COLOR)?,
                    thickness,
                    name: d.name.unwrap_or_else(|| format!("Tower {ordinal}")),
                }))
            }
        }
    }
}

fn color_or(color: Option<String>, default: &str) -> Result<String, CoreError> {
    match color {
        Some(c) => {
            validate_color_hex(&c)?;
            Ok(c)
        }
        None => Ok(default.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Partial updates
// ---------------------------------------------------------------------------

/// A partial update. Keys unknown to every kind are dropped by serde; keys
/// known but not declared for the target's kind are ignored by
/// [`Shape::apply`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnnotationPatch {
    #[serde(rename = "puntos")]
    pub points: Option<Vec<LatLon>>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(rename = "texto")]
    pub text: Option<String>,
    pub color: Option<String>,
    #[serde(rename = "icono")]
    pub icon: Option<String>,
    #[serde(rename = "radio")]
    pub radius_m: Option<f64>,
    #[serde(rename = "grosor")]
    pub thickness: Option<f64>,
    #[serde(rename = "nombre")]
    pub name: Option<String>,
}

impl AnnotationPatch {
    /// Wire names of the fields this patch carries.
    pub fn present_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.points.is_some() {
            fields.push("puntos");
        }
        if self.lat.is_some() {
            fields.push("lat");
        }
        if self.lon.is_some() {
            fields.push("lon");
        }
        if self.text.is_some() {
            fields.push("texto");
        }
        if self.color.is_some() {
            fields.push("color");
        }
        if self.icon.is_some() {
            fields.push("icono");
        }
        if self.radius_m.is_some() {
            fields.push("radio");
        }
        if self.thickness.is_some() {
            fields.push("grosor");
        }
        if self.name.is_some() {
            fields.push("nombre");
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }

    fn validate_for(&self, kind: AnnotationKind) -> Result<(), CoreError> {
        if kind.accepts("puntos") {
            if let Some(points) = &self.points {
                validate_points(points)?;
            }
        }
        if kind.accepts("lat") {
            if let Some(lat) = self.lat {
                validate_latitude(lat)?;
            }
        }
        if kind.accepts("lon") {
            if let Some(lon) = self.lon {
                validate_longitude(lon)?;
            }
        }
        if kind.accepts("color") {
            if let Some(color) = &self.color {
                validate_color_hex(color)?;
            }
        }
        if kind.accepts("radio") {
            if let Some(radius) = self.radius_m {
                validate_radius(radius)?;
            }
        }
        if kind.accepts("grosor") {
            if let Some(thickness) = self.thickness {
                validate_thickness(thickness)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation functions
// ---------------------------------------------------------------------------

/// Validate that a color string matches `#RRGGBB` or `#RRGGBBAA` hex format.
pub fn validate_color_hex(color: &str) -> Result<(), CoreError> {
    let valid_length = color.len() == 7 || color.len() == 9;

    if !valid_length {
        return Err(CoreError::Validation(format!(
            "Invalid color '{color}'. Must be in #RRGGBB or #RRGGBBAA hex format"
        )));
    }

    if !color.starts_with('#') {
        return Err(CoreError::Validation(format!(
            "Invalid color '{color}'. Must start with '#'"
        )));
    }

    let hex_part = &color[1..];
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CoreError::Validation(format!(
            "Invalid color '{color}'. Must contain only hex digits after '#'"
        )));
    }

    Ok(())
}

/// Validate that a line thickness is positive and at most [`MAX_THICKNESS`].
pub fn validate_thickness(thickness: f64) -> Result<(), CoreError> {
    if !thickness.is_finite() {
        return Err(CoreError::Validation(
            "thickness must be a finite number".to_string(),
        ));
    }
    if thickness <= 0.0 || thickness > MAX_THICKNESS {
        return Err(CoreError::Validation(format!(
            "thickness must be greater than 0 and at most {MAX_THICKNESS}, got {thickness}"
        )));
    }
    Ok(())
}

/// Validate that a radius in meters is positive and at most [`MAX_RADIUS_M`].
pub fn validate_radius(radius_m: f64) -> Result<(), CoreError> {
    if !radius_m.is_finite() {
        return Err(CoreError::Validation(
            "radius must be a finite number".to_string(),
        ));
    }
    if radius_m <= 0.0 || radius_m > MAX_RADIUS_M {
        return Err(CoreError::Validation(format!(
            "radius must be greater than 0 and at most {MAX_RADIUS_M} m, got {radius_m}"
        )));
    }
    Ok(())
}

pub fn validate_latitude(lat: f64) -> Result<(), CoreError> {
    if lat.is_finite() && (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "latitude must be between -90 and 90, got {lat}"
        )))
    }
}

pub fn validate_longitude(lon: f64) -> Result<(), CoreError> {
    if lon.is_finite() {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "longitude must be a finite number".to_string(),
        ))
    }
}

/// Validate every vertex of a route.
pub fn validate_points(points: &[LatLon]) -> Result<(), CoreError> {
    match points.iter().position(|p| !p.is_valid()) {
        Some(i) => Err(CoreError::Validation(format!(
            "puntos[{i}] is not a valid [lat, lon] pair"
        ))),
        None => Ok(()),
    }
}

fn require_position(
    lat: Option<f64>,
    lon: Option<f64>,
    kind: AnnotationKind,
) -> Result<LatLon, CoreError> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            validate_latitude(lat)?;
            validate_longitude(lon)?;
            Ok(LatLon::new(lat, lon))
        }
        _ => Err(CoreError::Validation(format!(
            "A {kind} requires both 'lat' and 'lon'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
