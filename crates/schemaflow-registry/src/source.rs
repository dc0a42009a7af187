//! Loading schema definitions from disk.

use crate::error::{RegistryError, Result};
use std::path::Path;

/// Read a schema file and check that it is JSON before anything is sent.
///
/// Returns the trimmed file contents unchanged; canonicalization is left to
/// the registry.
pub fn load_schema_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str::<serde_json::Value>(&contents).map_err(|source| {
        RegistryError::MalformedDefinition {
            path: path.to_path_buf(),
            source,
        }
    })?;

    tracing::debug!(path = %path.display(), bytes = contents.len(), "Loaded schema file");
    Ok(contents.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loads_valid_schema() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"type":"record","name":"Ping","fields":[{{"name":"at","type":"long"}}]}}"#
        )
        .unwrap();

        let schema = load_schema_file(file.path()).unwrap();
        assert!(schema.starts_with('{'));
        assert!(!schema.ends_with('\n'));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"type":"record","#).unwrap();

        assert!(matches!(
            load_schema_file(file.path()),
            Err(RegistryError::MalformedDefinition { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_schema_file(dir.path().join("missing.avsc")),
            Err(RegistryError::Io { .. })
        ));
    }
}
