//! Chain identities.
//!
//! Keys live in the client directory of a chain (`<tezos-dir>/client`), in
//! the `public_keys` file the Tezos client maintains. New keys are created by
//! a [`KeyGenerator`]; the production one runs the client in a container.

pub mod generator;
pub mod store;

pub use generator::{DockerKeyGenerator, KeyGenerator};
pub use store::{KeyRecord, KeyStore, PUBLIC_KEYS_FILE};

use std::path::PathBuf;

/// Accounts funded in the genesis block of a new chain
pub const BOOTSTRAP_ACCOUNTS: [&str; 3] = ["baker", "bootstrap_account_1", "bootstrap_account_2"];

/// Identity whose public key activates the protocol
pub const GENESIS_KEY: &str = "genesis";

/// Errors raised while generating or reading keys
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("{tool} failed: {reason}")]
    ExternalTool { tool: String, reason: String },

    #[error("No key named '{name}' in {path:?}")]
    NotFound { name: String, path: PathBuf },

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed key file {path:?}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Generate every identity a new chain needs: the bootstrap accounts
/// followed by the genesis key.
pub fn generate_chain_identities(
    generator: &dyn KeyGenerator,
    store: &KeyStore,
) -> Result<(), KeyError> {
    for name in BOOTSTRAP_ACCOUNTS.iter().chain(std::iter::once(&GENESIS_KEY)) {
        generator.generate(store.dir(), name)?;
    }
    Ok(())
}
