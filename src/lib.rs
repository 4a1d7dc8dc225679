//! # mkchain - Private Tezos chains on Kubernetes
//!
//! This library bootstraps a private Tezos network deployment: it
//! provisions the chain's identities, composes the node configuration and
//! protocol parameters, and renders a multi-document Kubernetes manifest
//! from a set of templates.
//!
//! ## Architecture
//!
//! - `keys`: key generation through the Tezos client image and lookup in
//!   the client's `public_keys` file
//! - `config`: composition of `config.json` (sectioned node configuration)
//!   and `parameters.json` (protocol parameters) from flat token sequences
//! - `manifest`: token table, template substitution and the output sink
//! - `cluster`: supported cluster flavors and minikube gateway discovery
//! - `orchestrator`: create / join policy driving one run end to end
//! - `utils`: path and IP helpers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use mkchain::cluster::{ClusterFlavor, MinikubeProbe};
//! use mkchain::keys::DockerKeyGenerator;
//! use mkchain::manifest::DirTemplates;
//! use mkchain::orchestrator::{generate_chain, ChainOptions, Collaborators, Mode};
//!
//! let mut options = ChainOptions::new("mychain", "/home/me/.tq", ClusterFlavor::Kind);
//! options.mode = Mode::Create;
//!
//! let keygen = DockerKeyGenerator::default();
//! let gateway = MinikubeProbe::default();
//! let templates = DirTemplates::new(".");
//! let collaborators = Collaborators {
//!     keygen: &keygen,
//!     gateway: &gateway,
//!     templates: &templates,
//! };
//!
//! // Writes tq-mychain.yaml
//! generate_chain(&options, &collaborators)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Each module reports failures through its own `thiserror` enum; the
//! orchestrator gathers them in [`orchestrator::ChainError`]. The binary
//! reports through `color_eyre`.

pub mod cluster;
pub mod config;
pub mod keys;
pub mod manifest;
pub mod orchestrator;
pub mod utils;
