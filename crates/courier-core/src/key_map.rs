//! Rename tables between idiomatic field names and the wire vocabulary.
//!
//! [`rename_keys`] works on a single nesting level. The validator calls it
//! once per object after that object's leaf rules have run, so validation
//! always sees the idiomatic names.

use serde_json::{Map, Value};
use thiserror::Error;

/// A rename table: `(idiomatic, wire)` pairs.
pub type KeyTable = &'static [(&'static str, &'static str)];

/// Both the idiomatic and the wire name were present on the same object.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("multiple specifications for {from} ({from} and {to})")]
pub struct KeyConflict {
    /// Idiomatic name.
    pub from: String,
    /// Wire name.
    pub to: String,
}

/// Move every `from` key present in `obj` to its `to` name.
///
/// Fails without touching `obj` when any pair has both keys present. Pairs
/// whose names are identical are skipped. Nested objects are not visited.
pub fn rename_keys(obj: &mut Map<String, Value>, table: &[(&str, &str)]) -> Result<(), KeyConflict> {
    if let Some((from, to)) = table
        .iter()
        .find(|(from, to)| from != to && obj.contains_key(*from) && obj.contains_key(*to))
    {
        return Err(KeyConflict {
            from: (*from).to_string(),
            to: (*to).to_string(),
        });
    }
    for (from, to) in table {
        if from == to {
            continue;
        }
        if let Some(value) = obj.remove(*from) {
            let _ = obj.insert((*to).to_string(), value);
        }
    }
    Ok(())
}

/// Swap a table's direction (wire → idiomatic).
pub fn inverted<'a>(table: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
    table.iter().map(|(from, to)| (*to, *from)).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
