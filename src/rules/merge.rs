// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Reading, merging and writing rule and config documents.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::Error;

/// Merges a sequence of documents.
///
/// Common keys at the same depth are merged recursively, and later values
/// overwrite earlier ones.  Keys keep the position of their first occurrence.
/// If any of the values is not a mapping, the last value wins.
pub fn merge_values(values: &[Value]) -> Value {
    if !values.iter().all(Value::is_mapping) {
        return values.last().cloned().unwrap_or(Value::Null);
    }

    let mut keys: Vec<&Value> = vec![];
    for mapping in values.iter().filter_map(Value::as_mapping) {
        for key in mapping.keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    let mut merged = Mapping::new();
    for key in keys {
        let mut matches = values
            .iter()
            .filter_map(|v| v.as_mapping().and_then(|m| m.get(key)))
            .cloned()
            .collect::<Vec<_>>();
        let value = if matches.len() > 1 {
            merge_values(&matches)
        } else {
            matches.remove(0)
        };
        merged.insert(key.clone(), value);
    }
    Value::Mapping(merged)
}

/// Reads a YAML document.  An empty document is read as an empty mapping.
pub fn read_yaml(path: &Path) -> Result<Value, Error> {
    let text = read_to_string(path)?;
    let doc: Value = serde_yaml::from_str(&text)
        .map_err(|e| Error::parse(format!("{}: {e}", path.display())))?;
    Ok(empty_if_null(doc))
}

/// Reads a JSON document.
pub fn read_json(path: &Path) -> Result<Value, Error> {
    let text = read_to_string(path)?;
    let doc: Value = serde_json::from_str(&text)
        .map_err(|e| Error::parse(format!("{}: {e}", path.display())))?;
    Ok(empty_if_null(doc))
}

/// Reads all the given files with `reader`, and merges them in order.
pub fn merge_files<P: AsRef<Path>>(
    paths: &[P],
    reader: fn(&Path) -> Result<Value, Error>,
) -> Result<Value, Error> {
    let docs = paths
        .iter()
        .map(|p| reader(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!("Merging {} documents.", docs.len());
    Ok(merge_values(&docs))
}

/// Writes a document as YAML.
pub fn to_yaml(value: &Value, path: &Path) -> Result<(), Error> {
    let text = serde_yaml::to_string(value)
        .map_err(|e| Error::serialization(format!("{}: {e}", path.display())))?;
    write(path, text)
}

/// Writes a document as JSON.  Fails if the document has non-string keys.
pub fn to_json(value: &Value, path: &Path) -> Result<(), Error> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| Error::serialization(format!("{}: {e}", path.display())))?;
    write(path, text)
}

fn read_to_string(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|e| Error::io(format!("{}: {e}", path.display())))
}

fn write(path: &Path, text: String) -> Result<(), Error> {
    std::fs::write(path, text).map_err(|e| Error::io(format!("{}: {e}", path.display())))
}

fn empty_if_null(doc: Value) -> Value {
    if doc.is_null() {
        Value::Mapping(Mapping::new())
    } else {
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::paths::key_string;
    use crate::test_utils::yaml;
    use crate::ErrorKind;

    fn keys(value: &Value) -> Vec<String> {
        value
            .as_mapping()
            .map(|m| m.keys().map(key_string).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_merge() {
        let merged = merge_values(&[
            yaml(r#"{"a": 1, "b": {"c": 3}}"#),
            yaml(r#"{"b": {"d": 4}, "e": 5}"#),
        ]);
        assert_eq!(merged, yaml(r#"{"a": 1, "b": {"c": 3, "d": 4}, "e": 5}"#));
        assert_eq!(keys(&merged), ["a", "b", "e"]);
        assert_eq!(keys(&merged["b"]), ["c", "d"]);
    }

    #[test]
    fn test_merge_overrides() {
        let first = yaml(r#"{"a": 1, "b": {"c": 3, "d": 4}, "e": true}"#);
        let second = yaml(r#"{"c": 3, "b": {"e": 5, "d": 40}, "e": {"g": true, "h": "foo"}}"#);
        let merged = merge_values(&[first, second]);

        assert_eq!(
            merged,
            yaml(r#"{"a": 1, "b": {"c": 3, "d": 40, "e": 5}, "e": {"g": true, "h": "foo"}, "c": 3}"#)
        );
        assert_eq!(keys(&merged), ["a", "b", "e", "c"]);
        assert_eq!(keys(&merged["b"]), ["c", "d", "e"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let rules = yaml(
            r#"
            techs:
              energy_cap_max: {type: PositiveFloat, optional: true}
              carrier: {type: Dict, opts: [str, bool]}
            lifetime: {type: PositiveInt, default: 25}
            "#,
        );
        assert_eq!(merge_values(&[rules.clone(), rules.clone()]), rules);
        assert_eq!(merge_values(&[rules.clone()]), rules);
    }

    #[test]
    fn test_merge_non_mappings() {
        assert_eq!(
            merge_values(&[yaml("[1, 2]"), yaml("{a: 1}")]),
            yaml("{a: 1}")
        );
        assert_eq!(merge_values(&[yaml("{a: 1}"), yaml("3")]), yaml("3"));
        assert_eq!(merge_values(&[]), Value::Mapping(Mapping::new()));
    }

    #[test]
    fn test_files() -> Result<(), Error> {
        let dir = tempfile::tempdir().map_err(|e| Error::io(e.to_string()))?;
        let rules1 = dir.path().join("rules1.yaml");
        let rules2 = dir.path().join("rules2.json");
        let empty = dir.path().join("empty.yaml");
        std::fs::write(&rules1, "a: 1\nb:\n  c: 3\n").map_err(|e| Error::io(e.to_string()))?;
        std::fs::write(&rules2, r#"{"b": {"d": 4}, "e": 5}"#)
            .map_err(|e| Error::io(e.to_string()))?;
        std::fs::write(&empty, "").map_err(|e| Error::io(e.to_string()))?;

        let merged = merge_values(&[read_yaml(&rules1)?, read_json(&rules2)?, read_yaml(&empty)?]);
        assert_eq!(merged, yaml("{a: 1, b: {c: 3, d: 4}, e: 5}"));

        let out = dir.path().join("out.yaml");
        to_yaml(&merged, &out)?;
        assert_eq!(merge_files(&[&out], read_yaml)?, merged);

        let out = dir.path().join("out.json");
        to_json(&merged, &out)?;
        assert_eq!(merge_files(&[&out], read_json)?, merged);

        assert!(read_yaml(&dir.path().join("missing.yaml"))
            .is_err_and(|e| e.kind() == ErrorKind::Io));
        std::fs::write(&empty, "a: [").map_err(|e| Error::io(e.to_string()))?;
        assert!(read_yaml(&empty).is_err_and(|e| e.kind() == ErrorKind::Parse));

        Ok(())
    }
}
