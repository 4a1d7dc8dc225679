//! Read access to the client's `public_keys` file.

use super::KeyError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// File written by the key generator inside the key directory
pub const PUBLIC_KEYS_FILE: &str = "public_keys";

const UNENCRYPTED_PREFIX: &str = "unencrypted:";

/// One named key record as stored by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub name: String,
    pub value: String,
}

impl KeyRecord {
    /// The public key with any `unencrypted:` prefix removed.
    pub fn public_key(&self) -> &str {
        self.value
            .strip_prefix(UNENCRYPTED_PREFIX)
            .unwrap_or(&self.value)
    }
}

/// Named key records of one chain's key directory.
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_file(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEYS_FILE)
    }

    /// Read every record of the key file.
    pub fn records(&self) -> Result<Vec<KeyRecord>, KeyError> {
        let path = self.key_file();
        let file = File::open(&path).map_err(|source| KeyError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|source| KeyError::Malformed { path, source })
    }

    /// Public key of the first record named `name`, or `None` if no record
    /// carries that name.
    pub fn lookup(&self, name: &str) -> Result<Option<String>, KeyError> {
        let records = self.records()?;
        Ok(records
            .iter()
            .find(|record| record.name == name)
            .map(|record| record.public_key().to_string()))
    }

    /// Like [`KeyStore::lookup`], but a missing record is an error.
    pub fn require(&self, name: &str) -> Result<String, KeyError> {
        self.lookup(name)?.ok_or_else(|| KeyError::NotFound {
            name: name.to_string(),
            path: self.key_file(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(contents: &str) -> (TempDir, KeyStore) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PUBLIC_KEYS_FILE), contents).unwrap();
        let store = KeyStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_lookup_strips_unencrypted_prefix() {
        let (_dir, store) = store_with(r#"[{"name":"genesis","value":"unencrypted:edpkABC"}]"#);
        assert_eq!(store.lookup("genesis").unwrap(), Some("edpkABC".to_string()));
    }

    #[test]
    fn test_lookup_missing_is_none() {
        let (_dir, store) = store_with(r#"[{"name":"genesis","value":"unencrypted:edpkABC"}]"#);
        assert_eq!(store.lookup("missing").unwrap(), None);

        let err = store.require("missing").unwrap_err();
        assert!(matches!(err, KeyError::NotFound { ref name, .. } if name == "missing"));
    }

    #[test]
    fn test_empty_key_is_not_missing() {
        let (_dir, store) = store_with(r#"[{"name":"blank","value":"unencrypted:"}]"#);
        assert_eq!(store.lookup("blank").unwrap(), Some(String::new()));
    }

    #[test]
    fn test_first_match_wins_and_raw_values_pass_through() {
        let (_dir, store) = store_with(
            r#"[
                {"name":"baker","value":"edpkRAW"},
                {"name":"baker","value":"unencrypted:edpkSECOND"}
            ]"#,
        );
        assert_eq!(store.lookup("baker").unwrap(), Some("edpkRAW".to_string()));
    }

    #[test]
    fn test_missing_or_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::new(dir.path());
        assert!(matches!(store.lookup("genesis").unwrap_err(), KeyError::Io { .. }));

        let (_dir, store) = store_with("not json");
        assert!(matches!(store.lookup("genesis").unwrap_err(), KeyError::Malformed { .. }));
    }
}
