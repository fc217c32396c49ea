//! Embedding-field stripping.
//!
//! The store persists high-dimensional embedding vectors on nodes. They must
//! never reach downstream text context — a single node's vector can dwarf
//! the rest of a turn's payload — so every decoded row passes through this
//! scrub before leaving the client.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Matches a serialized `"embedding": [...]` pair inside string content,
/// e.g. a node `content` field holding a JSON-encoded row.
static EMBEDDED_VECTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)(?:\\?['"])embedding(?:\\?['"])\s*:\s*\[.*?\]"#)
        .unwrap_or_else(|e| panic!("embedding pattern: {e}"))
});

/// Recursively remove `embedding` fields (case-insensitive) from a value.
///
/// String values get a second pass: serialized `"embedding": [...]`
/// fragments inside them are replaced with a placeholder, since vectors
/// also arrive smuggled in JSON-encoded text fields.
pub fn strip_embeddings(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !key.eq_ignore_ascii_case("embedding"))
                .map(|(key, inner)| (key, strip_embeddings(inner)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_embeddings).collect()),
        Value::String(text) => Value::String(strip_embedded_vectors(text)),
        other => other,
    }
}

fn strip_embedded_vectors(text: String) -> String {
    // Case-insensitive containment check before paying for the regex.
    if !text.to_ascii_lowercase().contains("embedding") {
        return text;
    }
    EMBEDDED_VECTOR
        .replace_all(&text, r#""embedding": [<stripped>]"#)
        .into_owned()
}
