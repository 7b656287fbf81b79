//! Placemark extraction: name, description, style reference, geometry.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::geodesy::LatLon;

static PLACEMARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<Placemark\b[^>]*>(.*?)</Placemark>").expect("valid regex"));

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<name>(.*?)</name>").expect("valid regex"));

static DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<description>(.*?)</description>").expect("valid regex"));

static STYLE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<styleUrl>\s*([^<]+?)\s*</styleUrl>").expect("valid regex"));

static COORDINATES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<coordinates>(.*?)</coordinates>").expect("valid regex"));

static CDATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").expect("valid regex")
});

/// A polygon needs a closing vertex plus at least three others.
const MIN_POLYGON_POINTS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(LatLon),
    Line(Vec<LatLon>),
    Polygon(Vec<LatLon>),
}

impl Geometry {
    pub fn coordinates(&self) -> Vec<LatLon> {
        match self {
            Self::Point(p) => vec![*p],
            Self::Line(points) | Self::Polygon(points) => points.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placemark {
    pub name: String,
    pub description: String,
    /// Style id referenced by `<styleUrl>`, without the leading `#`.
    pub style_url: Option<String>,
    pub geometry: Geometry,
}

/// Every placemark with usable coordinates, in document order.
pub fn parse_placemarks(kml: &str) -> Vec<Placemark> {
    let mut placemarks = Vec::new();
    let mut skipped = 0usize;

    for caps in PLACEMARK.captures_iter(kml) {
        let body = group(&caps);
        let geometry = COORDINATES
            .captures(body)
            .and_then(|c| parse_coordinates(group(&c)));

        let Some(geometry) = geometry else {
            skipped += 1;
            continue;
        };

        placemarks.push(Placemark {
            name: NAME.captures(body).map(|c| element_text(group(&c))).unwrap_or_default(),
            description: DESCRIPTION
                .captures(body)
                .map(|c| element_text(group(&c)))
                .unwrap_or_default(),
            style_url: STYLE_URL.captures(body).map(|c| style_id(group(&c)).to_string()),
            geometry,
        });
    }

    if skipped > 0 {
        tracing::debug!(skipped, "Skipped placemarks without usable coordinates");
    }
    placemarks
}

fn group<'h>(caps: &Captures<'h>) -> &'h str {
    caps.get(1).map_or("", |m| m.as_str())
}

/// The id part of a style reference: text after the last `#`.
pub fn style_id(url: &str) -> &str {
    url.rsplit_once('#').map_or(url, |(_, id)| id)
}

/// Classify a `<coordinates>` body. Tuples are `lon,lat[,alt]` separated by
/// whitespace; tuples that do not parse are dropped.
pub fn parse_coordinates(text: &str) -> Option<Geometry> {
    let tuples: Vec<&str> = text.split_whitespace().collect();

    if tuples.len() == 1 {
        return parse_tuple(tuples[0]).map(Geometry::Point);
    }

    let points: Vec<LatLon> = tuples.into_iter().filter_map(parse_tuple).collect();
    let (first, last) = (points.first()?, points.last()?);

    if first == last && points.len() >= MIN_POLYGON_POINTS {
        Some(Geometry::Polygon(points))
    } else {
        Some(Geometry::Line(points))
    }
}

fn parse_tuple(tuple: &str) -> Option<LatLon> {
    let mut parts = tuple.split(',');
    let lon: f64 = parts.next()?.trim().parse().ok()?;
    let lat: f64 = parts.next()?.trim().parse().ok()?;
    let at = LatLon::new(lat, lon);
    at.is_valid().then_some(at)
}

/// Element text with CDATA sections unwrapped and entities decoded outside
/// them. Surrounding whitespace is trimmed.
pub fn element_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last = 0;

    for caps in CDATA.captures_iter(raw) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&decode_entities(&raw[last..whole.start()]));
        out.push_str(inner.as_str());
        last = whole.end();
    }
    out.push_str(&decode_entities(&raw[last..]));

    out.trim().to_string()
}

/// Decode the predefined XML entities and numeric character references.
/// Unknown entities are left as written.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => numeric_reference(entity),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn numeric_reference(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}
