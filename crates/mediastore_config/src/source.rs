//! Key spelling normalization for configuration sources.
//!
//! Descriptor keys are documented in PascalCase, but the environment layer
//! lower-cases everything it collects and users may write either spelling.
//! Two spellings of one key survive the merge as separate entries and fail
//! deserialization, so every source is rewritten to the documented spelling
//! before it is merged.

use config::{Map, Source, Value, ValueKind};

/// Top-level keys with a documented PascalCase spelling.
const TOP_LEVEL_KEYS: &[&str] = &[
    "CleanPendingDaysToKeep",
    "CleanDeletedDaysToKeep",
    "CleanObsoleteDaysToKeep",
    "MaximumMediaSize",
];

/// Keys of a `[slots.<group>.<name>]` table.
const SLOT_KEYS: &[&str] = &[
    "Alias",
    "MediaType",
    "FileTypes",
    "StorageLocation",
    "LogicalPath",
    "ServerEncoding",
    "ClientEncoding",
    "MaximumMediaSize",
];

/// Wraps a source so its keys use the documented spelling.
#[derive(Debug, Clone)]
pub(crate) struct CanonicalKeys<S>(pub(crate) S);

impl<S> Source for CanonicalKeys<S>
where
    S: Source + Clone + Send + Sync + 'static,
{
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
        Ok(normalize(&[], self.0.collect()?))
    }
}

fn canonical(parents: &[String], key: &str) -> String {
    let known = match parents {
        [] => TOP_LEVEL_KEYS,
        [slots, _, _] if slots == "slots" => SLOT_KEYS,
        _ => return key.to_string(),
    };
    known
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(key))
        .map_or_else(|| key.to_string(), |candidate| candidate.to_string())
}

/// Rewrite keys below `parents`. Keys may be nested tables (file sources) or
/// dotted paths (the environment).
fn normalize(parents: &[String], table: Map<String, Value>) -> Map<String, Value> {
    table
        .into_iter()
        .map(|(key, mut value)| {
            let mut path = parents.to_vec();
            for segment in key.split('.') {
                let segment = canonical(&path, segment);
                path.push(segment);
            }
            if let ValueKind::Table(nested) = &mut value.kind {
                *nested = normalize(&path, std::mem::take(nested));
            }
            (path[parents.len()..].join("."), value)
        })
        .collect()
}
