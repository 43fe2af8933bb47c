//! Row extraction from exported XML tables.
//!
//! Not a general XML parser: exports are read as a flat sequence of `<row>`
//! blocks, and fields are picked out of each block by element name.

use regex::Regex;
use std::sync::LazyLock;

static ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<row\b[^>]*>(.*?)</row>").expect("row pattern is valid")
});

/// Bodies of every `<row>...</row>` block, in document order
pub fn extract_rows(text: &str) -> Vec<&str> {
    ROW_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Whether the text is an export at all, even one with no rows
pub fn looks_like_table(text: &str) -> bool {
    text.contains("<trace-query-result") || text.contains("<node") || text.contains("<row")
}

/// Looks up one logical field under several possible element names
///
/// Names are tried in order. For each name the element text is used first,
/// then its `name="..."` attribute (how xctrace writes frames).
pub struct FieldPattern {
    patterns: Vec<(Regex, Regex)>,
}

impl FieldPattern {
    pub fn new(names: &[&str]) -> Self {
        let patterns = names
            .iter()
            .filter_map(|name| {
                let name = regex::escape(name);
                let text = Regex::new(&format!(r"(?s)<{name}(?:\s[^>]*)?>([^<]*)</{name}>")).ok()?;
                let attr = Regex::new(&format!(r#"<{name}\b[^>]*?\sname="([^"]*)""#)).ok()?;
                Some((text, attr))
            })
            .collect();
        Self { patterns }
    }

    pub fn find(&self, row: &str) -> Option<String> {
        self.patterns.iter().find_map(|(text, attr)| {
            text.captures(row)
                .or_else(|| attr.captures(row))
                .and_then(|caps| caps.get(1))
                .map(|m| unescape(m.as_str().trim()))
                .filter(|value| !value.is_empty())
        })
    }

    /// Field parsed as a number, see [`parse_number`]
    pub fn find_number(&self, row: &str) -> Option<f64> {
        self.find(row).and_then(|value| parse_number(&value))
    }
}

/// Parse the leading number of a field, ignoring thousands separators and
/// trailing units ("1,234.5 ms" -> 1234.5)
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned: String = value.chars().filter(|c| *c != ',' && *c != '_').collect();
    let number = cleaned.split_whitespace().next()?;
    number
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
