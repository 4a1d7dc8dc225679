//! Key generation through the Tezos client image.

use super::KeyError;
use crate::utils::paths::owner_ids;
use log::{debug, info};
use std::path::Path;
use std::process::Command;

pub const DEFAULT_DOCKER_IMAGE: &str = "tezos/tezos:v7-release";
pub const CLIENT_ENTRYPOINT: &str = "/usr/local/bin/tezos-client";
pub const KEYGEN_PROTOCOL: &str = "PsCARTHAGazK";

/// Mount point of the key directory inside the container
const CONTAINER_DATA_DIR: &str = "/data";

/// Creates (or overwrites) a named key pair inside a key directory.
pub trait KeyGenerator {
    fn generate(&self, dir: &Path, name: &str) -> Result<(), KeyError>;
}

/// Runs `tezos-client gen keys` in a throwaway container with the key
/// directory mounted at `/data`.
#[derive(Debug, Clone)]
pub struct DockerKeyGenerator {
    /// Container runtime binary, `docker` unless overridden
    pub program: String,
    pub image: String,
    pub protocol: String,
}

impl DockerKeyGenerator {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            program: "docker".to_string(),
            image: image.into(),
            protocol: KEYGEN_PROTOCOL.to_string(),
        }
    }

    /// Arguments passed to the runtime, running as the owner of `dir` so the
    /// key file stays readable on the host.
    pub fn docker_args(&self, dir: &Path, name: &str, uid: u32) -> Vec<String> {
        vec![
            "run".to_string(),
            "--entrypoint".to_string(),
            CLIENT_ENTRYPOINT.to_string(),
            "-u".to_string(),
            uid.to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{}:{}", dir.display(), CONTAINER_DATA_DIR),
            self.image.clone(),
            "-d".to_string(),
            CONTAINER_DATA_DIR.to_string(),
            "--protocol".to_string(),
            self.protocol.clone(),
            "gen".to_string(),
            "keys".to_string(),
            name.to_string(),
            "--force".to_string(),
        ]
    }
}

impl Default for DockerKeyGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_DOCKER_IMAGE)
    }
}

impl KeyGenerator for DockerKeyGenerator {
    fn generate(&self, dir: &Path, name: &str) -> Result<(), KeyError> {
        let (uid, _gid) = owner_ids(dir).map_err(|source| KeyError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let args = self.docker_args(dir, name, uid);
        debug!("{} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| KeyError::ExternalTool {
                tool: self.program.clone(),
                reason: format!("failed to start: {}", e),
            })?;

        if !output.status.success() {
            return Err(KeyError::ExternalTool {
                tool: self.program.clone(),
                reason: format!(
                    "generating key '{}' exited with {}: {}",
                    name,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        info!("Generated key '{}' in {:?}", name, dir);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docker_args() {
        let generator = DockerKeyGenerator::default();
        let args = generator.docker_args(Path::new("/home/me/.tq/client"), "baker", 1000);

        assert_eq!(
            args.join(" "),
            "run --entrypoint /usr/local/bin/tezos-client -u 1000 --rm \
             -v /home/me/.tq/client:/data tezos/tezos:v7-release \
             -d /data --protocol PsCARTHAGazK gen keys baker --force"
        );
    }

    #[test]
    fn test_custom_image() {
        let generator = DockerKeyGenerator::new("tezos/tezos:v8-release");
        let args = generator.docker_args(Path::new("/k"), "genesis", 0);
        assert!(args.contains(&"tezos/tezos:v8-release".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("--force"));
    }

    #[test]
    fn test_nonzero_exit_is_external_tool_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let generator = DockerKeyGenerator {
            program: "false".to_string(),
            ..DockerKeyGenerator::default()
        };

        let err = generator.generate(dir.path(), "baker").unwrap_err();
        assert!(
            matches!(err, KeyError::ExternalTool { ref tool, ref reason } if tool == "false" && reason.contains("'baker'"))
        );
    }

    #[test]
    fn test_missing_runtime_is_external_tool_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let generator = DockerKeyGenerator {
            program: "mkchain-no-such-runtime".to_string(),
            ..DockerKeyGenerator::default()
        };

        let err = generator.generate(dir.path(), "genesis").unwrap_err();
        assert!(matches!(err, KeyError::ExternalTool { ref reason, .. } if reason.starts_with("failed to start")));
    }
}
