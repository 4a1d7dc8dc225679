//! Destination of the rendered manifest.

use super::RenderError;
use log::info;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Mode of a newly created manifest
const MANIFEST_MODE: u32 = 0o644;

/// Where the manifest stream goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    Stdout,
    File(PathBuf),
}

impl OutputSink {
    /// `tq-<chain>.yaml` in the current directory
    pub fn for_chain(chain_name: &str) -> Self {
        OutputSink::File(PathBuf::from(format!("tq-{}.yaml", chain_name)))
    }

    /// Run `write` against the sink.
    ///
    /// A file sink is written to a temporary file next to the target and
    /// only moved into place once `write` succeeds and the data is flushed;
    /// on any failure the temporary file is removed and the target is left
    /// untouched. A replaced manifest keeps its permissions, a new one gets
    /// mode 0644. Stdout is flushed on success.
    pub fn write_with<F>(&self, write: F) -> Result<(), RenderError>
    where
        F: FnOnce(&mut dyn Write) -> Result<(), RenderError>,
    {
        match self {
            OutputSink::Stdout => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                write(&mut handle)?;
                handle.flush()?;
            }
            OutputSink::File(path) => {
                let dir = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent,
                    _ => Path::new("."),
                };
                fs::create_dir_all(dir)?;

                let temp = NamedTempFile::new_in(dir)?;
                let mut writer = BufWriter::new(temp);
                write(&mut writer)?;
                let temp = writer.into_inner().map_err(|e| RenderError::Io(e.into_error()))?;
                let permissions = match fs::metadata(path) {
                    Ok(existing) => existing.permissions(),
                    Err(_) => fs::Permissions::from_mode(MANIFEST_MODE),
                };
                temp.as_file().set_permissions(permissions)?;
                temp.as_file().sync_all()?;
                temp.persist(path).map_err(|e| RenderError::Io(e.error))?;
                info!("Wrote manifest to {:?}", path);
            }
        }
        Ok(())
    }

    /// Write an already rendered stream.
    pub fn write_all(&self, bytes: &[u8]) -> Result<(), RenderError> {
        self.write_with(|out| Ok(out.write_all(bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_for_chain_file_name() {
        assert_eq!(OutputSink::for_chain("mychain"), OutputSink::File(PathBuf::from("tq-mychain.yaml")));
    }

    #[test]
    fn test_file_sink_writes_whole_stream() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("tq-test.yaml");
        let sink = OutputSink::File(target.clone());

        sink.write_all(b"A: 1\n---\n").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "A: 1\n---\n");
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("tq-test.yaml");
        let sink = OutputSink::File(target.clone());

        let result = sink.write_with(|out| {
            out.write_all(b"partial document")?;
            Err(RenderError::MissingToken {
                template: "deployment/node.yaml".into(),
                token: "node_dir".into(),
            })
        });

        assert!(result.is_err());
        assert!(!target.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_write_keeps_previous_manifest() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("tq-test.yaml");
        fs::write(&target, "old").unwrap();

        let sink = OutputSink::File(target.clone());
        let result = sink.write_with(|_| {
            Err(RenderError::TemplateNotFound {
                id: "x".into(),
                path: PathBuf::from("x"),
            })
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");
    }

    #[test]
    fn test_new_manifest_is_world_readable() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("tq-test.yaml");
        OutputSink::File(target.clone()).write_all(b"a").unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_replaced_manifest_keeps_permissions() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("tq-test.yaml");
        fs::write(&target, "old").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o640)).unwrap();

        OutputSink::File(target.clone()).write_all(b"new").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }
}
