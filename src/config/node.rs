//! Node configuration composer.
//!
//! Input is a flat token sequence mixing section markers with options of the
//! most recently opened section:
//!
//! ```text
//! p2p --bootstrap-peers 10.0.0.7 global rpc network --chain-name foo \
//!     genesis --timestamp 2020-06-01T00:00:00+00:00 \
//!     genesis_parameters --genesis-pubkey edpk...
//! ```
//!
//! Placement rules:
//!
//! - `global` options merge straight into the root of the tree.
//! - `rpc`, `p2p` and `network` become root keys holding their options.
//! - `genesis` lands at `network.genesis` and `genesis_parameters` at
//!   `network.genesis_parameters.values`; both require `network` to have
//!   been composed earlier in the same sequence.
//!
//! The node reads `listen-addrs`, `bootstrap-peers`, `data-dir`,
//! `listen-addr` and `expected-proof-of-work` in hyphen form, every other key
//! keeps its underscore destination name.

use super::options::{apply_value, split_flag, take_value, DefaultValue, OptionKind, OptionSpec};
use super::value::OptionValue;
use super::ComposeError;
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;

/// Destination names stored with hyphens instead of underscores
const HYPHENATED_KEYS: [&str; 5] = [
    "listen_addrs",
    "bootstrap_peers",
    "data_dir",
    "listen_addr",
    "expected_proof_of_work",
];

const GLOBAL_OPTIONS: &[OptionSpec] = &[OptionSpec::new(
    "data-dir",
    OptionKind::Str,
    DefaultValue::Str("/var/tezos/node"),
)];

const RPC_OPTIONS: &[OptionSpec] = &[OptionSpec::new(
    "listen-addrs",
    OptionKind::Repeated,
    DefaultValue::List(&[":8732"]),
)];

const P2P_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new("bootstrap-peers", OptionKind::Repeated, DefaultValue::List(&[])),
    OptionSpec::new("listen-addr", OptionKind::Str, DefaultValue::Str("[::]:9732")),
    OptionSpec::new("expected-proof-of-work", OptionKind::Int, DefaultValue::Int(0)),
];

const NETWORK_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new("chain-name", OptionKind::Str, DefaultValue::None),
    OptionSpec::new("sandboxed-chain-name", OptionKind::Str, DefaultValue::Str("SANDBOXED_TEZOS")),
    OptionSpec::new("default-bootstrap-peers", OptionKind::Repeated, DefaultValue::List(&[])),
];

const GENESIS_OPTIONS: &[OptionSpec] = &[
    OptionSpec::new("timestamp", OptionKind::Str, DefaultValue::None),
    OptionSpec::new(
        "block",
        OptionKind::Str,
        DefaultValue::Str("BLockGenesisGenesisGenesisGenesisGenesisd6f5afWyME7"),
    ),
    OptionSpec::new(
        "protocol",
        OptionKind::Str,
        DefaultValue::Str("PtYuensgYBb3G3x1hLLbCmcav8ue8Kyd2khADcL5LsT5R1hcXex"),
    ),
];

const GENESIS_PARAMETERS_OPTIONS: &[OptionSpec] = &[OptionSpec::new(
    "genesis-pubkey",
    OptionKind::Str,
    DefaultValue::None,
)];

/// Sections of the node configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Global,
    Rpc,
    P2p,
    Network,
    Genesis,
    GenesisParameters,
}

impl Section {
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "global" => Some(Section::Global),
            "rpc" => Some(Section::Rpc),
            "p2p" => Some(Section::P2p),
            "network" => Some(Section::Network),
            "genesis" => Some(Section::Genesis),
            "genesis_parameters" => Some(Section::GenesisParameters),
            _ => None,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Section::Global => "global",
            Section::Rpc => "rpc",
            Section::P2p => "p2p",
            Section::Network => "network",
            Section::Genesis => "genesis",
            Section::GenesisParameters => "genesis_parameters",
        }
    }

    pub fn options(&self) -> &'static [OptionSpec] {
        match self {
            Section::Global => GLOBAL_OPTIONS,
            Section::Rpc => RPC_OPTIONS,
            Section::P2p => P2P_OPTIONS,
            Section::Network => NETWORK_OPTIONS,
            Section::Genesis => GENESIS_OPTIONS,
            Section::GenesisParameters => GENESIS_PARAMETERS_OPTIONS,
        }
    }

    fn option(&self, flag: &str) -> Option<&'static OptionSpec> {
        self.options().iter().find(|spec| spec.flag == flag)
    }

    /// Whether the section nests inside `network` instead of the root
    pub fn nests_in_network(&self) -> bool {
        matches!(self, Section::Genesis | Section::GenesisParameters)
    }
}

/// Key under which an option is stored in the tree.
pub fn stored_key(spec: &OptionSpec) -> String {
    let dest = spec.dest();
    if HYPHENATED_KEYS.contains(&dest.as_str()) {
        dest.replace('_', "-")
    } else {
        dest
    }
}

/// A value or a nested section of the node configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigNode {
    Value(OptionValue),
    Section(BTreeMap<String, ConfigNode>),
}

impl ConfigNode {
    pub fn as_value(&self) -> Option<&OptionValue> {
        match self {
            ConfigNode::Value(value) => Some(value),
            ConfigNode::Section(_) => None,
        }
    }

    pub fn as_section(&self) -> Option<&BTreeMap<String, ConfigNode>> {
        match self {
            ConfigNode::Section(entries) => Some(entries),
            ConfigNode::Value(_) => None,
        }
    }
}

/// The composed node configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfigTree {
    root: BTreeMap<String, ConfigNode>,
}

impl ConfigTree {
    pub fn root(&self) -> &BTreeMap<String, ConfigNode> {
        &self.root
    }

    /// Follow a path of keys from the root.
    pub fn lookup(&self, path: &[&str]) -> Option<&ConfigNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.root.get(*first)?;
        for key in rest {
            node = node.as_section()?.get(*key)?;
        }
        Some(node)
    }

    /// Value at a path, if the path ends on a value.
    pub fn value(&self, path: &[&str]) -> Option<&OptionValue> {
        self.lookup(path)?.as_value()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn place(
        &mut self,
        section: Section,
        values: BTreeMap<String, OptionValue>,
    ) -> Result<(), ComposeError> {
        let entries = values.into_iter().map(|(k, v)| (k, ConfigNode::Value(v)));

        match section {
            Section::Global => self.root.extend(entries),
            Section::Rpc | Section::P2p | Section::Network => {
                merge_into(section_entry(&mut self.root, section.marker()), entries);
            }
            Section::Genesis | Section::GenesisParameters => {
                let network = match self.root.get_mut(Section::Network.marker()) {
                    Some(ConfigNode::Section(network)) => network,
                    _ => {
                        return Err(ComposeError::MissingParentSection {
                            section: section.marker().to_string(),
                        })
                    }
                };
                let mut target = section_entry(network, section.marker());
                if section == Section::GenesisParameters {
                    target = section_entry(target, "values");
                }
                merge_into(target, entries);
            }
        }
        Ok(())
    }
}

/// Get the section stored under `key`, replacing any plain value there.
fn section_entry<'a>(
    parent: &'a mut BTreeMap<String, ConfigNode>,
    key: &str,
) -> &'a mut BTreeMap<String, ConfigNode> {
    let node = parent
        .entry(key.to_string())
        .or_insert_with(|| ConfigNode::Section(BTreeMap::new()));
    if node.as_section().is_none() {
        *node = ConfigNode::Section(BTreeMap::new());
    }
    match node {
        ConfigNode::Section(entries) => entries,
        ConfigNode::Value(_) => unreachable!("entry was just replaced by a section"),
    }
}

fn merge_into(
    target: &mut BTreeMap<String, ConfigNode>,
    entries: impl IntoIterator<Item = (String, ConfigNode)>,
) {
    for (key, node) in entries {
        target.insert(key, node);
    }
}

/// Compose a node configuration from a flat token sequence.
///
/// Processing stops at the end of input or at the first token that is
/// neither a section marker nor an option of the open section. Tokens left
/// over at that point are logged and ignored.
pub fn compose_node_config<S: AsRef<str>>(tokens: &[S]) -> Result<ConfigTree, ComposeError> {
    let mut tree = ConfigTree::default();
    let mut cursor = 0;

    while let Some(section) = tokens.get(cursor).and_then(|t| Section::from_marker(t.as_ref())) {
        cursor += 1;

        let mut values: BTreeMap<&'static str, OptionValue> = section
            .options()
            .iter()
            .map(|spec| (spec.flag, spec.default.to_value()))
            .collect();

        while let Some(token) = tokens.get(cursor).map(AsRef::as_ref) {
            let Some((flag, inline)) = split_flag(token) else { break };
            let Some(spec) = section.option(flag) else { break };
            cursor += 1;

            let raw = take_value(spec.flag, inline, tokens, &mut cursor)?;
            if let Some(slot) = values.get_mut(spec.flag) {
                apply_value(spec, raw, slot)?;
            }
        }

        debug!("Composed node config section '{}'", section.marker());
        let stored = values
            .into_iter()
            .filter_map(|(flag, value)| section.option(flag).map(|spec| (stored_key(spec), value)))
            .collect();
        tree.place(section, stored)?;
    }

    if cursor < tokens.len() {
        warn!(
            "Ignoring {} unrecognized node config token(s) starting at '{}'",
            tokens.len() - cursor,
            tokens[cursor].as_ref()
        );
    }

    Ok(tree)
}
