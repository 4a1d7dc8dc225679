//! Shared utilities: path expansion and IP helpers.

pub mod ip_utils;
pub mod paths;

pub use ip_utils::parse_peer_ipv4;
pub use paths::{expand_home, owner_ids, PathError};
