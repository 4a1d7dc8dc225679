//! Chain orchestrator.
//!
//! This module coordinates one manifest-generation run, from the
//! pre-flight checks through identity work, document composition and
//! rendering:
//!
//! 1. Pre-flight: refuse to create over an existing chain directory,
//!    validate join parameters.
//! 2. Identities: generate keys for a new chain, or read existing ones.
//! 3. Compose `config.json` and `parameters.json`.
//! 4. Assemble the token table and the ordered template list.
//! 5. Render and write through the output sink.

use crate::cluster::{gateway::nfs_export_line, ClusterFlavor, GatewayProbe};
use crate::config::{compose_node_config, compose_parameters_with, ComposeError, ParameterOverrides};
use crate::keys::{generate_chain_identities, KeyError, KeyGenerator, KeyStore, BOOTSTRAP_ACCOUNTS, GENESIS_KEY};
use crate::manifest::{ManifestRenderer, OutputSink, RenderError, TemplateSource, TokenTable};
use crate::utils::ip_utils::parse_peer_ipv4;
use crate::utils::paths::owner_ids;
use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Templates every manifest starts from
pub const BASE_TEMPLATES: [&str; 2] = ["deployment/common.yaml", "deployment/node.yaml"];

/// Templates that activate the protocol and bake on a new chain
pub const CREATE_TEMPLATES: [&str; 2] = ["deployment/activate.yaml", "deployment/baker.yaml"];

pub const DEFAULT_BOOTSTRAP_MUTEZ: &str = "4000000000000";
pub const DEFAULT_PROTOCOL_HASH: &str = "PsCARTHAGazKbHtnKfLzQg3kms52kSRpgnDY982a9oYsSXRLQEb";
pub const DEFAULT_BAKER_COMMAND: &str = "tezos-baker-006-PsCARTHA";

/// Host name minikube VMs resolve to the host machine
pub const MINIKUBE_HOST_FALLBACK: &str = "host.minikube.internal";

/// Errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Detected existing installation, please remove it first: {0:?}")]
    AlreadyInitialized(PathBuf),

    #[error("Joining a chain requires --{0}")]
    MissingJoinParameter(&'static str),

    #[error("Invalid bootstrap peer: {0}")]
    InvalidPeerAddress(String),

    #[error(transparent)]
    Keys(#[from] KeyError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Failed to serialize configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to create {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whether the run starts a chain, joins one, or re-renders an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Join,
    Existing,
}

/// Values a joining node takes from the chain it joins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinParameters {
    pub bootstrap_peer: Option<String>,
    pub genesis_key: Option<String>,
    pub timestamp: Option<String>,
}

/// Everything one run needs to know
#[derive(Debug, Clone)]
pub struct ChainOptions {
    pub chain_name: String,
    pub tezos_dir: PathBuf,
    pub bootstrap_mutez: String,
    pub mode: Mode,
    pub join: JoinParameters,
    pub flavor: ClusterFlavor,
    pub protocol_hash: String,
    pub docker_image: String,
    pub baker_command: String,
    /// Protocol parameters set before the bootstrap accounts
    pub parameter_overrides: ParameterOverrides,
    pub output: OutputSink,
}

impl ChainOptions {
    pub fn new(chain_name: impl Into<String>, tezos_dir: impl Into<PathBuf>, flavor: ClusterFlavor) -> Self {
        let chain_name = chain_name.into();
        Self {
            output: OutputSink::for_chain(&chain_name),
            chain_name,
            tezos_dir: tezos_dir.into(),
            bootstrap_mutez: DEFAULT_BOOTSTRAP_MUTEZ.to_string(),
            mode: Mode::Existing,
            join: JoinParameters::default(),
            flavor,
            protocol_hash: DEFAULT_PROTOCOL_HASH.to_string(),
            docker_image: crate::keys::generator::DEFAULT_DOCKER_IMAGE.to_string(),
            baker_command: DEFAULT_BAKER_COMMAND.to_string(),
            parameter_overrides: ParameterOverrides::new(),
        }
    }

    pub fn key_dir(&self) -> PathBuf {
        self.tezos_dir.join("client")
    }

    pub fn node_dir(&self) -> PathBuf {
        self.tezos_dir.join("node")
    }
}

/// External tools a run depends on
pub struct Collaborators<'a> {
    pub keygen: &'a dyn KeyGenerator,
    pub gateway: &'a dyn GatewayProbe,
    pub templates: &'a dyn TemplateSource,
}

/// Ordered templates and the tokens to render them with
#[derive(Debug, Clone)]
pub struct ChainPlan {
    pub templates: Vec<String>,
    pub tokens: TokenTable,
}

/// Genesis facts of the chain being deployed
#[derive(Debug, Clone)]
struct Genesis {
    key: String,
    timestamp: String,
    bootstrap_peers: Vec<String>,
}

/// Validated join values, checked before anything touches the disk
fn validate_join(join: &JoinParameters) -> Result<Genesis, ChainError> {
    let peer = join
        .bootstrap_peer
        .as_deref()
        .ok_or(ChainError::MissingJoinParameter("bootstrap-peer"))?;
    let key = join
        .genesis_key
        .clone()
        .ok_or(ChainError::MissingJoinParameter("genesis-key"))?;
    let timestamp = join
        .timestamp
        .clone()
        .ok_or(ChainError::MissingJoinParameter("timestamp"))?;
    let peer = parse_peer_ipv4(peer).map_err(ChainError::InvalidPeerAddress)?;

    Ok(Genesis {
        key,
        timestamp,
        bootstrap_peers: vec![peer],
    })
}

fn create_dir(path: &Path) -> Result<(), ChainError> {
    fs::create_dir_all(path).map_err(|source| ChainError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Current UTC time in the form the node expects for a genesis timestamp
pub fn genesis_timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Template ids for a run, storage prerequisites first
pub fn template_plan(mode: Mode, flavor: &ClusterFlavor) -> Vec<String> {
    let mut templates: Vec<String> = flavor.storage_templates().iter().map(|t| t.to_string()).collect();
    templates.extend(BASE_TEMPLATES.iter().map(|t| t.to_string()));
    if mode == Mode::Create {
        templates.extend(CREATE_TEMPLATES.iter().map(|t| t.to_string()));
    }
    templates
}

/// Flat node configuration tokens for a chain
pub fn node_config_args(chain_name: &str, genesis_key: &str, timestamp: &str, bootstrap_peers: &[String]) -> Vec<String> {
    let mut args = vec!["p2p".to_string()];
    for peer in bootstrap_peers {
        args.extend(["--bootstrap-peers".to_string(), peer.clone()]);
    }
    args.extend(
        [
            "global",
            "rpc",
            "network",
            "--chain-name",
            chain_name,
            "genesis",
            "--timestamp",
            timestamp,
            "genesis_parameters",
            "--genesis-pubkey",
            genesis_key,
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args
}

/// Flat parameter tokens, one row per bootstrap account
fn parameters_args(options: &ChainOptions, store: &KeyStore) -> Result<Vec<String>, ChainError> {
    let mut args = Vec::new();
    if options.mode == Mode::Join {
        return Ok(args);
    }
    for account in BOOTSTRAP_ACCOUNTS {
        let key = store.require(account)?;
        args.extend([
            "--bootstrap-accounts".to_string(),
            key,
            options.bootstrap_mutez.clone(),
        ]);
    }
    Ok(args)
}

/// Tokens taken straight from the invocation
fn invocation_tokens(options: &ChainOptions, genesis: &Genesis) -> TokenTable {
    let mut tokens = TokenTable::new();
    tokens.insert("chain_name", &options.chain_name);
    tokens.insert("tezos_dir", options.tezos_dir.display());
    tokens.insert("bootstrap_mutez", &options.bootstrap_mutez);
    tokens.insert("create", options.mode == Mode::Create);
    tokens.insert("join", options.mode == Mode::Join);
    tokens.insert("stdout", options.output == OutputSink::Stdout);
    tokens.insert("protocol_hash", &options.protocol_hash);
    tokens.insert("docker_image", &options.docker_image);
    tokens.insert("baker_command", &options.baker_command);
    tokens.insert_opt("bootstrap_peer", genesis.bootstrap_peers.first());
    tokens.insert("genesis_key", &genesis.key);
    tokens.insert("timestamp", &genesis.timestamp);
    tokens
}

/// `/etc/exports` line for the chain directory, mapped to its owner.
fn exports_hint(chain_dir: &Path, vm_ip: &str) -> Option<String> {
    match owner_ids(chain_dir) {
        Ok((uid, gid)) => Some(nfs_export_line(&chain_dir.display().to_string(), uid, gid, vm_ip)),
        Err(e) => {
            warn!("Cannot read owner of {:?}, skipping exports hint: {}", chain_dir, e);
            None
        }
    }
}

/// Look up the cluster gateway; failures only cost the informational hint.
fn discover_gateway(options: &ChainOptions, probe: &dyn GatewayProbe, tokens: &mut TokenTable) {
    match probe.discover() {
        Ok(gateway) => {
            if let Some(line) = exports_hint(&options.tezos_dir, &gateway.interface_ip) {
                info!("Add the following line to /etc/exports and reload nfsd.");
                info!("{}", line);
            }
            tokens.insert("minikube_gw", gateway.address);
        }
        Err(e) => {
            warn!("Failed to get {} route: {}", options.flavor.name(), e);
            tokens.insert("minikube_gw", MINIKUBE_HOST_FALLBACK);
        }
    }
}

/// Run every step up to rendering: checks, identities, documents, tokens.
pub fn prepare_chain(options: &ChainOptions, collaborators: &Collaborators) -> Result<ChainPlan, ChainError> {
    if options.mode == Mode::Create && options.tezos_dir.exists() {
        return Err(ChainError::AlreadyInitialized(options.tezos_dir.clone()));
    }
    let joined = match options.mode {
        Mode::Join => Some(validate_join(&options.join)?),
        _ => None,
    };

    let key_dir = options.key_dir();
    let node_dir = options.node_dir();
    create_dir(&key_dir)?;
    create_dir(&node_dir)?;
    let store = KeyStore::new(&key_dir);

    let genesis = match joined {
        Some(genesis) => genesis,
        None => {
            if options.mode == Mode::Create {
                info!("Generating chain identities in {:?}", key_dir);
                generate_chain_identities(collaborators.keygen, &store)?;
            }
            Genesis {
                key: store.require(GENESIS_KEY)?,
                timestamp: genesis_timestamp_now(),
                bootstrap_peers: Vec::new(),
            }
        }
    };

    let templates = template_plan(options.mode, &options.flavor);

    let mut tokens = invocation_tokens(options, &genesis);
    tokens.insert("node_dir", node_dir.display());
    tokens.extend(options.flavor.tokens());
    if options.flavor.discovers_gateway() {
        discover_gateway(options, collaborators.gateway, &mut tokens);
    }

    let node_config = compose_node_config(&node_config_args(
        &options.chain_name,
        &genesis.key,
        &genesis.timestamp,
        &genesis.bootstrap_peers,
    ))?;
    tokens.insert("config_json", node_config.to_json()?);

    let parameters = compose_parameters_with(&options.parameter_overrides, &parameters_args(options, &store)?)?;
    tokens.insert("parameters_json", parameters.to_json()?);

    info!(
        "Prepared {} template(s) and {} bootstrap account(s) for chain '{}'",
        templates.len(),
        parameters.bootstrap_accounts().len(),
        options.chain_name
    );
    Ok(ChainPlan { templates, tokens })
}

/// Prepare, render and write the manifest for one chain.
pub fn generate_chain(options: &ChainOptions, collaborators: &Collaborators) -> Result<ChainPlan, ChainError> {
    let plan = prepare_chain(options, collaborators)?;

    let renderer = ManifestRenderer::new(collaborators.templates);
    let manifest = renderer.render(&plan.templates, &plan.tokens)?;
    options.output.write_all(&manifest)?;

    Ok(plan)
}
