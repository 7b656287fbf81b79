//! The HTML state codec: moves annotation records in and out of a standalone
//! map document.
//!
//! A saved document carries exactly one state block: a script element that
//! declares `var elementosGuardados = [...]` and replays the records onto the
//! page's map once it exists. Extraction is tolerant and never fails; it
//! degrades to an empty list with a warning.

pub mod scan;
pub mod template;

use std::sync::LazyLock;

use regex::Regex;

use crate::annotation::{Annotation, INTERNAL_FIELD_PREFIX};
use crate::error::CoreError;

pub use template::blank_document;

/// Name of the JS variable holding the embedded records.
pub const STATE_VARIABLE: &str = "elementosGuardados";

/// Delay before the replay routine first looks for the map.
pub const SETTLE_DELAY_MS: u64 = 500;

/// Retry interval while the map instance does not exist yet.
pub const MAP_POLL_INTERVAL_MS: u64 = 100;

static MAP_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:var|let|const)\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*=\s*L\.map\(").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Extract
// ---------------------------------------------------------------------------

/// Records embedded in `document`.
///
/// Absent block or unparsable literal yields an empty list. Records that do
/// not deserialize are skipped individually. When several blocks exist the
/// first one wins.
pub fn extract(document: &str) -> Vec<Annotation> {
    let blocks = scan::state_blocks(document);

    let Some(first) = blocks.first() else {
        return Vec::new();
    };
    if blocks.len() > 1 {
        tracing::warn!(
            blocks = blocks.len(),
            "Document carries more than one state block, using the first"
        );
    }

    let Some(literal) = first.literal.clone() else {
        tracing::warn!("State block array literal is not terminated, ignoring it");
        return Vec::new();
    };

    let values: Vec<serde_json::Value> = match serde_json::from_str(&document[literal]) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!(error = %e, "State block is not a valid JSON array, ignoring it");
            return Vec::new();
        }
    };

    let total = values.len();
    let records: Vec<Annotation> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed embedded record");
                None
            }
        })
        .collect();

    tracing::debug!(total, kept = records.len(), "Extracted embedded records");
    records
}

// ---------------------------------------------------------------------------
// Embed
// ---------------------------------------------------------------------------

/// JSON array of the records' public fields, safe to place in a script body.
pub fn serialize_state(records: &[Annotation]) -> Result<String, CoreError> {
    let public: Vec<serde_json::Value> = records
        .iter()
        .map(public_fields)
        .collect::<Result<_, _>>()?;

    let json = serde_json::to_string(&public)
        .map_err(|e| CoreError::Internal(format!("Failed to serialize state block: {e}")))?;

    // Markup characters only occur inside JSON strings, so unicode escapes
    // keep the literal equal while the HTML tokenizer never sees a tag,
    // comment opener or entity in the script body.
    Ok(escape_markup(&json))
}

fn escape_markup(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            _ => out.push(c),
        }
    }
    out
}

fn public_fields(record: &Annotation) -> Result<serde_json::Value, CoreError> {
    let mut value = serde_json::to_value(record)
        .map_err(|e| CoreError::Internal(format!("Failed to serialize annotation: {e}")))?;
    if let Some(map) = value.as_object_mut() {
        map.retain(|key, _| !key.starts_with(INTERNAL_FIELD_PREFIX));
    }
    Ok(value)
}

/// The complete state block for `records`, or `None` when there is nothing
/// to embed.
pub fn embed(records: &[Annotation], map_handle: Option<&str>) -> Result<Option<String>, CoreError> {
    if records.is_empty() {
        return Ok(None);
    }
    let state = serialize_state(records)?;
    Ok(Some(template::replay_script(&state, map_handle)))
}

// ---------------------------------------------------------------------------
// Replace
// ---------------------------------------------------------------------------

/// `document` with every state block removed, including the newline on
/// either side that [`inject`] adds around it.
pub fn strip_state_blocks(document: &str) -> String {
    let bytes = document.as_bytes();
    let mut out = String::with_capacity(document.len());
    let mut cursor = 0;

    for block in scan::state_blocks(document) {
        let mut start = block.element.outer.start;
        let mut end = block.element.outer.end;
        if start > cursor && bytes[start - 1] == b'\n' {
            start -= 1;
        }
        if end < bytes.len() && bytes[end] == b'\n' {
            end += 1;
        }
        out.push_str(&document[cursor..start]);
        cursor = end;
    }

    out.push_str(&document[cursor..]);
    out
}

/// Name of the variable the document assigns its map instance to.
pub fn find_map_handle(document: &str) -> Option<String> {
    scan::script_elements(document).into_iter().find_map(|element| {
        MAP_DECLARATION
            .captures(&document[element.body])
            .map(|caps| caps[1].to_string())
    })
}

/// Replace the document's state with `records`.
///
/// Existing blocks are removed first. The new block goes immediately before
/// the last `</body>`, or at the end when the document has none.
pub fn inject(document: &str, records: &[Annotation]) -> Result<String, CoreError> {
    let stripped = strip_state_blocks(document);
    let handle = find_map_handle(&stripped);
    if handle.is_none() && !records.is_empty() {
        tracing::debug!("No map declaration found, replay will scan globals");
    }

    let Some(block) = embed(records, handle.as_deref())? else {
        return Ok(stripped);
    };

    let framed = format!("\n{block}\n");
    let at = stripped
        .to_ascii_lowercase()
        .rfind("</body>")
        .unwrap_or(stripped.len());

    let mut out = String::with_capacity(stripped.len() + framed.len());
    out.push_str(&stripped[..at]);
    out.push_str(&framed);
    out.push_str(&stripped[at..]);
    Ok(out)
}
