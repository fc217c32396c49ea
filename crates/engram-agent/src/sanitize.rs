//! Pre-execution statement guard.
//!
//! Authored statements are generative output; the authoring collaborator
//! is handed `MISSING` id sentinels by both the resolver and the core
//! index, and a slip can put one inside a `DETACH DELETE`. Matching by
//! the sentinel id deletes an arbitrary node (or nothing), so such
//! statements are blocked before they reach the store.

use std::sync::LazyLock;

use engram_types::MISSING_ID;
use regex::Regex;

/// `{id: "MISSING"}` and `.id = "MISSING"`, either quote style.
static MISSING_ID_TARGETS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    let compile = |pattern: &str| {
        Regex::new(pattern).unwrap_or_else(|e| panic!("sentinel pattern: {e}"))
    };
    [
        compile(&format!(r#"(?i)\{{id:\s*["']{MISSING_ID}["']\}}"#)),
        compile(&format!(r#"(?i)\.id\s*=\s*["']{MISSING_ID}["']"#)),
    ]
});

/// Whether a statement deletes by the unresolved-id sentinel.
///
/// Only `DETACH DELETE` statements are inspected; the sentinel is legal
/// in reads and in writes that create or update by name.
pub fn is_unsafe_delete(statement: &str) -> bool {
    if !statement.to_ascii_uppercase().contains("DETACH DELETE") {
        return false;
    }
    MISSING_ID_TARGETS.iter().any(|p| p.is_match(statement))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_delete_by_inline_sentinel_id() {
        let statement = r#"MATCH (remove {id: "MISSING"}) DETACH DELETE remove"#;
        assert!(is_unsafe_delete(statement));
    }

    #[test]
    fn test_blocks_delete_by_where_clause_sentinel() {
        let statement =
            "MATCH (remove) WHERE remove.id = 'MISSING' DETACH DELETE remove";
        assert!(is_unsafe_delete(statement));
    }

    #[test]
    fn test_sentinel_without_delete_passes() {
        let statement = r#"MATCH (n {id: "MISSING"}) RETURN n.name"#;
        assert!(!is_unsafe_delete(statement));
    }

    #[test]
    fn test_delete_by_real_id_passes() {
        let statement = r#"MATCH (remove {id: "person_7"}) DETACH DELETE remove"#;
        assert!(!is_unsafe_delete(statement));
    }

    #[test]
    fn test_whitespace_and_case_variants_are_caught() {
        let statement = "MATCH (x) WHERE x.ID  =  \"MISSING\"\ndetach delete x";
        assert!(is_unsafe_delete(statement));
    }
}
