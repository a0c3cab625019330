//! Codepoint-map reconciliation.
//!
//! The persisted map is the only state shared across invocations: a JSON
//! object of icon name → hexadecimal codepoint string, stored next to the
//! icons as `<set-name>.json`. Reconciliation converts values to integers and
//! drops entries whose icon is gone from the downloaded set, so a codepoint is
//! never silently reassigned to a different glyph. Icons without an entry are
//! left to the generation routine's own assignment.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::download::IconFile;

/// Reconciled assignment: icon base name → integer codepoint.
pub type CodepointMap = BTreeMap<String, u32>;

#[derive(Debug, Error)]
pub enum CodepointError {
    #[error("failed to read codepoint map {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Malformed map JSON aborts the pipeline before generation.
    #[error("malformed codepoint map JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Load the persisted map (if any) and reconcile it against the downloaded
/// icons. With no persisted map, every icon starts unassigned.
pub fn load_and_reconcile(
    map_path: Option<&Path>,
    icons: &[IconFile],
) -> Result<CodepointMap, CodepointError> {
    let Some(path) = map_path else {
        debug!("no persisted codepoint map, generator assigns all codepoints");
        return Ok(CodepointMap::new());
    };
    let raw = fs::read_to_string(path).map_err(|source| CodepointError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    reconcile(&raw, icons)
}

/// Parse a raw persisted map and keep only entries backed by a current icon.
pub fn reconcile(raw: &str, icons: &[IconFile]) -> Result<CodepointMap, CodepointError> {
    // The persisted form may be double-encoded; its backslashes carry no
    // structure, so strip them before parsing.
    let unescaped = raw.replace('\\', "");
    let parsed: BTreeMap<String, String> = serde_json::from_str(&unescaped)?;

    let mut map = CodepointMap::new();
    for (name, hex) in parsed {
        let value = match u32::from_str_radix(hex.trim_start_matches("0x"), 16) {
            Ok(value) => value,
            Err(e) => {
                warn!(icon = %name, value = %hex, error = %e, "dropping unparseable codepoint");
                continue;
            }
        };
        if icons.iter().any(|icon| icon.name == name) {
            map.insert(name, value);
        } else {
            info!(icon = %name, "icon no longer in set, dropping its codepoint");
        }
    }
    info!(assigned = map.len(), "reconciled codepoint map");
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn icons(names: &[&str]) -> Vec<IconFile> {
        names
            .iter()
            .map(|name| IconFile {
                name: name.to_string(),
                path: PathBuf::from(format!("/tmp/{name}.svg")),
            })
            .collect()
    }

    #[test]
    fn parses_hex_values_into_integers() {
        let map = reconcile(r#"{"arrow": "f101", "star": "f102"}"#, &icons(&["arrow", "star"]))
            .unwrap();
        assert_eq!(map.get("arrow"), Some(&0xf101));
        assert_eq!(map.get("star"), Some(&0xf102));
    }

    #[test]
    fn strips_double_encoding_backslashes() {
        let map = reconcile(r#"{"arrow": "\\f101"}"#, &icons(&["arrow"])).unwrap();
        assert_eq!(map.get("arrow"), Some(&0xf101));
    }

    #[test]
    fn drops_entries_without_a_downloaded_icon() {
        let map = reconcile(
            r#"{"arrow": "f101", "ghost": "f102"}"#,
            &icons(&["arrow"]),
        )
        .unwrap();
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key("ghost"));
    }

    #[test]
    fn drops_unparseable_values_but_keeps_the_rest() {
        let map = reconcile(
            r#"{"arrow": "f101", "bad": "not-hex"}"#,
            &icons(&["arrow", "bad"]),
        )
        .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("arrow"), Some(&0xf101));
    }

    #[test]
    fn malformed_json_is_fatal() {
        let result = reconcile(r#"{"arrow": "f101""#, &icons(&["arrow"]));
        assert!(matches!(result, Err(CodepointError::Parse(_))));
    }

    #[test]
    fn missing_map_yields_empty_assignment() {
        let map = load_and_reconcile(None, &icons(&["arrow"])).unwrap();
        assert!(map.is_empty());
    }
}
