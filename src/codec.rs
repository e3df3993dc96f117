//! Settings documents: export and import of every binding value.
//!
//! A document is a JSON object. Dotted binding keys become nested objects,
//! so `registers.CCR0` lives at `{"registers": {"CCR0": ...}}`. Files are
//! written with four-space indentation and sorted keys under the `.fscc`
//! extension.
//!
//! Neither direction needs a live session. Loading the defaults file differs
//! from a normal import only in where the document comes from.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::DocumentError;
use crate::registry::BindingRegistry;

/// Settings file extension, without the dot.
pub const SETTINGS_EXTENSION: &str = "fscc";

/// Keys touched by [`import_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Bindings whose key was present in the document.
    pub imported: Vec<String>,
    /// Bindings whose key was absent and were left unchanged.
    pub absent: Vec<String>,
}

/// Build one nested document from every binding's exported value.
pub fn export_all(registry: &BindingRegistry) -> Value {
    let mut root = Map::new();
    for binding in registry.iter() {
        if let Some(value) = binding.export_value() {
            insert_path(&mut root, binding.key(), value);
        }
    }
    Value::Object(root)
}

/// Hand each binding the fragment under its key. Absent keys are skipped.
pub fn import_all(document: &Value, registry: &mut BindingRegistry) -> ImportReport {
    let mut report = ImportReport::default();
    for binding in registry.iter_mut() {
        let key = binding.key().to_string();
        match lookup_path(document, &key) {
            Some(fragment) => {
                binding.import_value(fragment);
                debug!(key = %key, value = %binding.display_value(), "Imported");
                report.imported.push(key);
            }
            None => report.absent.push(key),
        }
    }
    info!(
        imported = report.imported.len(),
        absent = report.absent.len(),
        "Settings imported"
    );
    report
}

fn insert_path(root: &mut Map<String, Value>, key: &str, value: Value) {
    let (parents, leaf) = match key.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, key),
    };

    let mut map = root;
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        let entry = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        map = next;
    }
    map.insert(leaf.to_string(), value);
}

fn lookup_path<'a>(document: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(document, |node, segment| node.as_object()?.get(segment))
}

/// Parse document text. The top level must be an object.
pub fn parse_document(text: &str) -> Result<Value, DocumentError> {
    parse(text, None)
}

fn parse(text: &str, path: Option<&Path>) -> Result<Value, DocumentError> {
    let document: Value = serde_json::from_str(text).map_err(|source| DocumentError::Parse {
        path: path.map(Path::to_path_buf),
        source,
    })?;
    if !document.is_object() {
        return Err(DocumentError::NotAnObject {
            path: path.map(Path::to_path_buf),
        });
    }
    Ok(document)
}

/// Read and parse a settings file.
pub fn load_document(path: &Path) -> Result<Value, DocumentError> {
    let text = fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let document = parse(&text, Some(path))?;
    info!(path = %path.display(), "Loaded settings file");
    Ok(document)
}

/// Read the defaults file. A missing file is [`DocumentError::DefaultsMissing`].
pub fn load_defaults(path: &Path) -> Result<Value, DocumentError> {
    if !path.is_file() {
        return Err(DocumentError::DefaultsMissing {
            path: path.to_path_buf(),
        });
    }
    load_document(path)
}

/// Render a document as settings-file text.
pub fn render_document(document: &Value) -> Result<String, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    document.serialize(&mut serializer)?;
    out.push(b'\n');
    // serde_json only emits UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Write a document to `path`.
pub fn save_document(path: &Path, document: &Value) -> Result<(), DocumentError> {
    let io_error = |source: io::Error| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    };
    let text = render_document(document).map_err(|err| io_error(io::Error::from(err)))?;
    fs::write(path, text).map_err(io_error)?;
    info!(path = %path.display(), "Saved settings file");
    Ok(())
}

/// `path` with `extension` added when it has none.
pub fn with_settings_extension(path: &Path, extension: &str) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{FlagBinding, MemoryCapBinding, RegisterBinding};
    use crate::hardware::device::keys;
    use serde_json::json;
    use tempfile::tempdir;

    fn registry() -> BindingRegistry {
        let mut registry = BindingRegistry::new();
        registry.add(FlagBinding::append_status());
        registry.add(MemoryCapBinding::default());
        registry.add(RegisterBinding::new("CCR0"));
        registry.add(RegisterBinding::new("CCR1"));
        registry
    }

    #[test]
    fn export_nests_dotted_keys() {
        let mut registry = registry();
        registry
            .binding_mut::<RegisterBinding>("registers.CCR0")
            .unwrap()
            .set_value(0x1a);

        let document = export_all(&registry);

        assert_eq!(document["registers"]["CCR0"], json!("0x0000001a"));
        assert_eq!(document["registers"]["CCR1"], json!("0x00000000"));
        assert_eq!(document[keys::APPEND_STATUS], json!(false));
        assert!(document["memory_cap"].is_object());
    }

    #[test]
    fn import_skips_absent_keys() {
        let mut registry = registry();
        let report = import_all(&json!({"registers": {"CCR1": "0x10"}}), &mut registry);

        assert_eq!(report.imported, vec!["registers.CCR1"]);
        assert_eq!(report.absent.len(), 3);
    }

    #[test]
    fn non_object_nodes_on_the_path_are_absent() {
        let mut registry = registry();
        let report = import_all(&json!({"registers": 5}), &mut registry);
        assert!(report.absent.contains(&"registers.CCR0".to_string()));
    }

    #[test]
    fn parse_rejects_malformed_documents() {
        assert!(matches!(
            parse_document("{\"append_status\": "),
            Err(DocumentError::Parse { path: None, .. })
        ));
        assert!(matches!(
            parse_document("[1, 2]"),
            Err(DocumentError::NotAnObject { .. })
        ));
    }

    #[test]
    fn saved_file_uses_four_space_sorted_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.fscc");
        let document = json!({"rx_multiple": true, "append_status": false});

        save_document(&path, &document).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();

        assert_eq!(
            text,
            "{\n    \"append_status\": false,\n    \"rx_multiple\": true\n}\n"
        );
        assert_eq!(load_document(&path).unwrap(), document);
    }

    #[test]
    fn missing_defaults_are_reported() {
        let dir = tempdir().unwrap();
        let err = load_defaults(&dir.path().join("defaults.fscc")).unwrap_err();
        assert!(matches!(err, DocumentError::DefaultsMissing { .. }));
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let err = load_document(&dir.path().join("missing.fscc")).unwrap_err();
        assert!(matches!(err, DocumentError::Io { .. }));
    }

    #[test]
    fn extension_is_added_when_missing() {
        assert_eq!(
            with_settings_extension(Path::new("out/board"), SETTINGS_EXTENSION),
            PathBuf::from("out/board.fscc")
        );
        assert_eq!(
            with_settings_extension(Path::new("board.json"), SETTINGS_EXTENSION),
            PathBuf::from("board.json")
        );
    }
}
