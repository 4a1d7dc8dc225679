//! Target cluster flavors.
//!
//! Each flavor knows which storage prerequisite goes in front of the
//! manifest and which extra tokens its templates read.

pub mod gateway;

pub use gateway::{Gateway, GatewayProbe, MinikubeProbe};

use crate::manifest::TokenTable;

/// Errors raised while talking to the cluster tooling
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("{tool} failed: {reason}")]
    ExternalTool { tool: String, reason: String },
    #[error("Unexpected output: {0}")]
    UnexpectedOutput(String),
}

/// Supported deployment targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterFlavor {
    Minikube,
    Eks {
        gdb_volume_id: String,
        gdb_aws_region: String,
    },
    Kind,
    DockerDesktop,
}

impl ClusterFlavor {
    pub fn name(&self) -> &'static str {
        match self {
            ClusterFlavor::Minikube => "minikube",
            ClusterFlavor::Eks { .. } => "eks",
            ClusterFlavor::Kind => "kind",
            ClusterFlavor::DockerDesktop => "docker-desktop",
        }
    }

    /// Templates placed before the base set, in order
    pub fn storage_templates(&self) -> &'static [&'static str] {
        match self {
            ClusterFlavor::Minikube => &["deployment/pv-minikube.yaml"],
            ClusterFlavor::Eks { .. } => &["deployment/pv-eks.yaml"],
            ClusterFlavor::Kind => &["deployment/pv-kind.yaml"],
            ClusterFlavor::DockerDesktop => &["deployment/pv-hostpath.yaml"],
        }
    }

    /// Whether the run should look up the cluster gateway
    pub fn discovers_gateway(&self) -> bool {
        matches!(self, ClusterFlavor::Minikube)
    }

    /// Flavor marker plus any flavor arguments
    pub fn tokens(&self) -> TokenTable {
        let mut tokens = TokenTable::new();
        tokens.insert(self.name().replace('-', "_"), true);
        if let ClusterFlavor::Eks {
            gdb_volume_id,
            gdb_aws_region,
        } = self
        {
            tokens.insert("gdb_volume_id", gdb_volume_id);
            tokens.insert("gdb_aws_region", gdb_aws_region);
        }
        tokens
    }
}
