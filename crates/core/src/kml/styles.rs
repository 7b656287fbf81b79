//! Style and StyleMap indexing for icon resolution.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::placemark::style_id;

static STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<Style\b[^>]*\bid\s*=\s*["']([^"']+)["'][^>]*>(.*?)</Style>"#)
        .expect("valid regex")
});

static STYLE_MAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<StyleMap\b[^>]*\bid\s*=\s*["']([^"']+)["'][^>]*>(.*?)</StyleMap>"#)
        .expect("valid regex")
});

static ICON_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<Icon\b[^>]*>.*?<href>\s*([^<]+?)\s*</href>").expect("valid regex")
});

static PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<Pair\b[^>]*>(.*?)</Pair>").expect("valid regex"));

static PAIR_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<key>\s*([^<]+?)\s*</key>").expect("valid regex"));

static PAIR_STYLE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<styleUrl>\s*([^<]+?)\s*</styleUrl>").expect("valid regex"));

/// Suffix tried when a placemark references a style map id that was not
/// declared, matching the `<id>-normal` naming Google Earth emits.
const NORMAL_SUFFIX: &str = "-normal";

/// Icon hrefs by style id and by style-map id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleIndex {
    styles: HashMap<String, String>,
    style_maps: HashMap<String, String>,
}

impl StyleIndex {
    pub fn parse(kml: &str) -> Self {
        let styles: HashMap<String, String> = STYLE
            .captures_iter(kml)
            .filter_map(|caps| {
                let id = caps.get(1)?.as_str();
                let href = ICON_HREF.captures(caps.get(2)?.as_str())?.get(1)?.as_str();
                Some((id.to_string(), href.to_string()))
            })
            .collect();

        let mut style_maps = HashMap::new();
        let mut dropped = 0usize;
        for caps in STYLE_MAP.captures_iter(kml) {
            let (Some(id), Some(body)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            match normal_style(body.as_str()).and_then(|s| styles.get(s)) {
                Some(href) => {
                    style_maps.insert(id.as_str().to_string(), href.clone());
                }
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            tracing::debug!(dropped, "Dropped style maps with unresolved normal style");
        }

        Self { styles, style_maps }
    }

    /// Icon href for a placemark style reference: style map first, then a
    /// plain style, then the `-normal` variant.
    pub fn resolve(&self, style_url: &str) -> Option<&str> {
        let id = style_id(style_url);
        self.style_maps
            .get(id)
            .or_else(|| self.styles.get(id))
            .or_else(|| self.styles.get(&format!("{id}{NORMAL_SUFFIX}")))
            .map(String::as_str)
    }

    pub fn style_count(&self) -> usize {
        self.styles.len()
    }

    pub fn style_map_count(&self) -> usize {
        self.style_maps.len()
    }
}

/// Style id referenced by the `normal` pair of a style map body.
fn normal_style(body: &str) -> Option<&str> {
    PAIR.captures_iter(body).find_map(|pair| {
        let pair = pair.get(1)?.as_str();
        let key = PAIR_KEY.captures(pair)?.get(1)?.as_str();
        if key != "normal" {
            return None;
        }
        let url = PAIR_STYLE_URL.captures(pair)?.get(1)?.as_str();
        Some(style_id(url))
    })
}
