//! A small tokenizer over HTML text that locates `<script>` elements and the
//! state declaration inside them.
//!
//! This is not an HTML parser. It understands exactly three things: comments
//! (skipped), script elements (case-insensitive, body taken verbatim up to the
//! matching close tag), and the JSON array literal assigned to the state
//! variable. Everything else is opaque text.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::STATE_VARIABLE;

static STATE_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(?:var|let|const)\s+{STATE_VARIABLE}\s*=\s*\["
    ))
    .expect("valid regex")
});

/// Byte ranges of one script element within the scanned document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    /// From `<script` through the end of the closing tag.
    pub outer: Range<usize>,
    /// The raw text between the opening and closing tags.
    pub body: Range<usize>,
}

/// A script element carrying the state declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateBlock {
    pub element: ScriptElement,
    /// The array literal, brackets included. `None` when the brackets never
    /// balance before the script ends.
    pub literal: Option<Range<usize>>,
}

/// Every script element in document order. An unterminated element runs to
/// the end of the document.
pub fn script_elements(document: &str) -> Vec<ScriptElement> {
    // ASCII lowercasing keeps byte offsets identical to the original.
    let lower = document.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut elements = Vec::new();
    let mut pos = 0;

    while let Some(offset) = lower[pos..].find('<') {
        let start = pos + offset;
        let rest = &lower[start..];

        if rest.starts_with("<!--") {
            pos = match lower[start + 4..].find("-->") {
                Some(end) => start + 4 + end + 3,
                None => break,
            };
            continue;
        }

        if !is_script_open(rest) {
            pos = start + 1;
            continue;
        }

        let Some(gt) = lower[start..].find('>') else {
            break;
        };
        let body_start = start + gt + 1;

        let (body_end, outer_end) = match lower[body_start..].find("</script") {
            Some(close) => {
                let close = body_start + close;
                let end = lower[close..]
                    .find('>')
                    .map_or(bytes.len(), |gt| close + gt + 1);
                (close, end)
            }
            None => (bytes.len(), bytes.len()),
        };

        elements.push(ScriptElement {
            outer: start..outer_end,
            body: body_start..body_end,
        });
        pos = outer_end;
    }

    elements
}

/// Script elements that declare the state variable, in document order.
pub fn state_blocks(document: &str) -> Vec<StateBlock> {
    script_elements(document)
        .into_iter()
        .filter_map(|element| {
            let body = &document[element.body.clone()];
            let decl = STATE_DECLARATION.find(body)?;
            let open = element.body.start + decl.end() - 1;
            let literal =
                array_literal_end(&document[..element.body.end], open).map(|end| open..end);
            Some(StateBlock { element, literal })
        })
        .collect()
}

fn is_script_open(rest: &str) -> bool {
    const TAG: &str = "<script";
    rest.starts_with(TAG)
        && rest[TAG.len()..]
            .bytes()
            .next()
            .is_some_and(|b| b.is_ascii_whitespace() || b == b'>' || b == b'/')
}

/// Index just past the bracket closing the array that opens at `open`.
///
/// Brackets inside JSON strings are ignored and string escapes are honored,
/// so `"]"` or `"\"]"` in a record never ends the literal early.
fn array_literal_end(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in text.as_bytes().iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}
