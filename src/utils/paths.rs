//! Path resolution helpers.
//!
//! Handles `~` expansion for the chain directory and reports who owns a
//! directory, which is the identity containers and NFS exports must use.

use std::env;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

/// Default chain directory
pub const DEFAULT_TEZOS_DIR: &str = "~/.tq/";

/// Errors that can occur during path resolution
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Cannot determine home directory")]
    NoHomeDir,
}

/// Get the user's home directory from the HOME environment variable
fn get_home_dir() -> Result<PathBuf, PathError> {
    env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| PathError::NoHomeDir)
}

/// Expand a leading `~` or `~/` to the home directory.
///
/// # Examples
///
/// ```ignore
/// expand_home("~/.tq/") -> /home/user/.tq/
/// expand_home("/srv/tq") -> /srv/tq
/// ```
pub fn expand_home(path: &str) -> Result<PathBuf, PathError> {
    if path == "~" {
        return get_home_dir();
    }
    match path.strip_prefix("~/") {
        Some(rest) => Ok(get_home_dir()?.join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}

/// User and group id owning `path`.
pub fn owner_ids(path: &Path) -> io::Result<(u32, u32)> {
    let metadata = path.metadata()?;
    Ok((metadata.uid(), metadata.gid()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        let result = expand_home("~/.tq/").unwrap();
        assert!(result.ends_with(".tq"));
        assert!(!result.starts_with("~"));
    }

    #[test]
    fn test_absolute_path_untouched() {
        assert_eq!(expand_home("/srv/tq").unwrap(), PathBuf::from("/srv/tq"));
        assert_eq!(expand_home("relative/~dir").unwrap(), PathBuf::from("relative/~dir"));
    }

    #[test]
    fn test_owner_ids_of_temp_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let (uid, gid) = owner_ids(dir.path()).unwrap();
        let metadata = dir.path().metadata().unwrap();
        assert_eq!(uid, metadata.uid());
        assert_eq!(gid, metadata.gid());
    }
}
