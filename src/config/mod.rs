//! Composition of the two JSON documents embedded in the manifest.
//!
//! Both documents are built from flat token sequences, the same shape a
//! command line has:
//!
//! - `node`: the node configuration (`config.json`), a tree of sections
//!   opened by bare markers such as `p2p` or `network`.
//! - `parameters`: the protocol parameters (`parameters.json`), a single
//!   flat record of typed options.
//!
//! The composers are pure transforms; they never touch the filesystem.

pub mod node;
pub mod options;
pub mod parameters;
pub mod value;

pub use node::{compose_node_config, ConfigNode, ConfigTree, Section};
pub use parameters::{compose_parameters, compose_parameters_with, load_overrides, ParameterOverrides, ParametersRecord};
pub use value::{OptionValue, OverrideValue};

/// Errors raised while composing either document.
///
/// These point at a bug in how tokens were sequenced, not at user input.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("section '{section}' must follow a 'network' section")]
    MissingParentSection { section: String },
    #[error("unknown option '{0}'")]
    UnknownOption(String),
    #[error("option '--{option}' expects a value")]
    MissingValue { option: String },
    #[error("invalid value '{value}' for option '--{option}': {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },
}
