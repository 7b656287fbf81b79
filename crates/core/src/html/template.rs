//! The replay script embedded into saved documents, and the blank page used
//! when a session starts from KML.
//!
//! The script opens with the state declaration so that documents written by
//! this crate stay readable by older tooling that matched
//! `(function() { var elementosGuardados = [...]`.

use crate::geodesy::{LatLon, EARTH_RADIUS_KM};
use crate::sectors::{Cardinal, CARDINAL_RADIUS_FACTOR, SECTOR_BEARINGS_DEG, SECTOR_COLORS};

use super::{MAP_POLL_INTERVAL_MS, SETTLE_DELAY_MS, STATE_VARIABLE};

/// Handle name the blank document gives its map instance.
pub const BLANK_MAP_HANDLE: &str = "map_annotations";

const BLANK_ZOOM: u8 = 13;

/// Body of the replay routine. Placeholders are substituted with constants
/// only; record data never passes through `replace`.
const REPLAY_BODY: &str = r#"
    var EARTH_RADIUS_KM = __EARTH_RADIUS_KM__;
    var SECTOR_BEARINGS = __SECTOR_BEARINGS__;
    var SECTOR_COLORS = __SECTOR_COLORS__;
    var CARDINALS = __CARDINALS__;
    var CARDINAL_FACTOR = __CARDINAL_FACTOR__;

    function destinationPoint(lat, lon, distKm, bearingDeg) {
        var delta = distKm / EARTH_RADIUS_KM;
        var theta = bearingDeg * Math.PI / 180;
        var phi1 = lat * Math.PI / 180;
        var lambda1 = lon * Math.PI / 180;
        var sinPhi2 = Math.sin(phi1) * Math.cos(delta) + Math.cos(phi1) * Math.sin(delta) * Math.cos(theta);
        sinPhi2 = Math.max(-1, Math.min(1, sinPhi2));
        var phi2 = Math.asin(sinPhi2);
        var lambda2 = lambda1 + Math.atan2(Math.sin(theta) * Math.sin(delta) * Math.cos(phi1), Math.cos(delta) - Math.sin(phi1) * sinPhi2);
        return [phi2 * 180 / Math.PI, lambda2 * 180 / Math.PI];
    }

    function resolveMap() {
        var named = namedMap();
        if (named instanceof L.Map) {
            return named;
        }
        // Not declared, not a map yet, or scoped out of reach: scan globals.
        for (var key in window) {
            try {
                if (window[key] instanceof L.Map) {
                    return window[key];
                }
            } catch (e) {}
        }
        return null;
    }

    function towerIcon(color) {
        var svg = '<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" width="28" height="28">'
            + '<path fill="' + color + '" stroke="white" stroke-width="1" d="M12 2L8 10h3v10h2V10h3L12 2z"/>'
            + '<circle cx="12" cy="5" r="2" fill="white"/>'
            + '<path fill="none" stroke="' + color + '" stroke-width="2" d="M6 8c0-3 2.5-5 6-5s6 2 6 5"/>'
            + '<path fill="none" stroke="' + color + '" stroke-width="2" d="M4 10c0-4 3.5-7 8-7s8 3 8 7"/>'
            + '</svg>';
        return L.divIcon({
            className: 'bts-marker',
            html: '<div style="background:white;border-radius:50%;padding:2px;box-shadow:0 2px 5px rgba(0,0,0,0.3);">' + svg + '</div>',
            iconSize: [32, 32],
            iconAnchor: [16, 16]
        });
    }

    function drawTower(map, elem) {
        var center = [elem.lat, elem.lon];
        L.marker(center, {icon: towerIcon(elem.color)}).addTo(map)
            .bindPopup('<b>' + elem.nombre + '</b><br>Radius: ' + elem.radio + ' m');
        L.circle(center, {
            radius: elem.radio,
            color: elem.color,
            fill: true,
            fillOpacity: 0.15,
            weight: elem.grosor
        }).addTo(map);
        SECTOR_BEARINGS.forEach(function(bearing, i) {
            var end = destinationPoint(elem.lat, elem.lon, elem.radio / 1000, bearing);
            L.polyline([center, end], {
                color: SECTOR_COLORS[i],
                weight: 2,
                opacity: 0.8,
                dashArray: '5, 5'
            }).addTo(map);
        });
        CARDINALS.forEach(function(cardinal) {
            var at = destinationPoint(elem.lat, elem.lon, elem.radio * CARDINAL_FACTOR / 1000, cardinal[1]);
            L.marker(at, {
                icon: L.divIcon({
                    className: 'cardinal-label',
                    html: '<div style="font-size:10pt;font-weight:bold;color:black;background:white;padding:2px;border-radius:3px;">' + cardinal[0] + '</div>',
                    iconSize: [20, 20],
                    iconAnchor: [10, 10]
                })
            }).addTo(map);
        });
    }

    function drawLabel(map, elem) {
        var options = {};
        if (elem.icono_img) {
            options.icon = L.icon({
                iconUrl: elem.icono_img,
                iconSize: [32, 32],
                iconAnchor: [16, 32],
                popupAnchor: [0, -32]
            });
        }
        L.marker([elem.lat, elem.lon], options).addTo(map).bindPopup(elem.texto);
    }

    function replay() {
        var map = resolveMap();
        if (!map) {
            setTimeout(replay, __POLL_MS__);
            return;
        }
        __STATE_VARIABLE__.forEach(function(elem) {
            if (elem.tipo === 'ruta') {
                if (elem.puntos && elem.puntos.length) {
                    L.polyline(elem.puntos, {color: elem.color, weight: elem.grosor})
                        .addTo(map).bindPopup(elem.nombre);
                }
            } else if (elem.tipo === 'etiqueta') {
                drawLabel(map, elem);
            } else if (elem.tipo === 'circulo') {
                L.circle([elem.lat, elem.lon], {radius: elem.radio, color: elem.color, fillOpacity: 0.2})
                    .addTo(map).bindPopup(elem.nombre);
            } else if (elem.tipo === 'torre') {
                drawTower(map, elem);
            }
        });
    }

    function start() {
        setTimeout(replay, __SETTLE_MS__);
    }

    if (document.readyState === 'loading') {
        document.addEventListener('DOMContentLoaded', start);
    } else {
        start();
    }
})();
</script>"#;

/// Assemble the full script element around an already-escaped JSON array.
///
/// The map handle is emitted as a direct identifier reference behind a
/// `typeof` guard, which reaches top-level `let`/`const` bindings that are not
/// properties of `window`. Anything that is not a plain identifier is dropped
/// and the script relies on the global scan.
pub fn replay_script(state_json: &str, map_handle: Option<&str>) -> String {
    let handle = map_handle.filter(|h| is_identifier(h));

    let mut script = format!(
        "<script>\n(function() {{\n    var {STATE_VARIABLE} = {state_json};\n"
    );
    match handle {
        Some(name) => script.push_str(&format!(
            "    var mapHandle = \"{name}\";\n    function namedMap() {{\n        try {{ return typeof {name} !== 'undefined' ? {name} : undefined; }} catch (e) {{ return undefined; }}\n    }}\n"
        )),
        None => script.push_str(
            "    var mapHandle = null;\n    function namedMap() {\n        return undefined;\n    }\n",
        ),
    }
    script.push_str(&replay_body());
    script
}

/// ASCII JavaScript identifier: letter, `_` or `$`, then also digits.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn replay_body() -> String {
    let cardinals: Vec<(&str, f64)> = Cardinal::ALL
        .iter()
        .map(|c| (c.label(), c.bearing_deg()))
        .collect();

    REPLAY_BODY
        .replace("__EARTH_RADIUS_KM__", &js_number(EARTH_RADIUS_KM))
        .replace("__SECTOR_BEARINGS__", &to_js(&SECTOR_BEARINGS_DEG))
        .replace("__SECTOR_COLORS__", &to_js(&SECTOR_COLORS))
        .replace("__CARDINALS__", &to_js(&cardinals))
        .replace("__CARDINAL_FACTOR__", &js_number(CARDINAL_RADIUS_FACTOR))
        .replace("__POLL_MS__", &MAP_POLL_INTERVAL_MS.to_string())
        .replace("__SETTLE_MS__", &SETTLE_DELAY_MS.to_string())
        .replace("__STATE_VARIABLE__", STATE_VARIABLE)
}

fn js_number(value: f64) -> String {
    value.to_string()
}

fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}

/// A minimal standalone Leaflet page centered on `center`.
pub fn blank_document(center: LatLon) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Tower map</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body {{ height: 100%; margin: 0; }} #map {{ height: 100%; }}</style>
</head>
<body>
<div id="map"></div>
<script>
var {BLANK_MAP_HANDLE} = L.map("map").setView([{lat}, {lon}], {BLANK_ZOOM});
L.tileLayer("https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
    maxZoom: 19,
    attribution: "&copy; OpenStreetMap contributors"
}}).addTo({BLANK_MAP_HANDLE});
</script>
</body>
</html>
"#,
        lat = center.lat(),
        lon = center.lon(),
    )
}
