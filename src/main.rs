use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use mkchain::cluster::{ClusterFlavor, MinikubeProbe};
use mkchain::config::load_overrides;
use mkchain::keys::DockerKeyGenerator;
use mkchain::keys::generator::DEFAULT_DOCKER_IMAGE;
use mkchain::manifest::{DirTemplates, OutputSink};
use mkchain::orchestrator::{
    generate_chain, ChainOptions, Collaborators, JoinParameters, Mode, DEFAULT_BAKER_COMMAND,
    DEFAULT_BOOTSTRAP_MUTEZ, DEFAULT_PROTOCOL_HASH,
};
use mkchain::utils::paths::{expand_home, DEFAULT_TEZOS_DIR};

/// Bootstrap a private Tezos chain and render its Kubernetes manifests
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Name of the chain
    chain_name: String,

    /// Directory holding the chain's keys and node data
    #[arg(long, default_value = DEFAULT_TEZOS_DIR)]
    tezos_dir: String,

    /// Mutez credited to each bootstrap account
    #[arg(long, default_value = DEFAULT_BOOTSTRAP_MUTEZ)]
    bootstrap_mutez: String,

    /// Create a private chain
    #[arg(long, conflicts_with = "join")]
    create: bool,

    /// Join a private chain
    #[arg(long)]
    join: bool,

    /// Peer ip to join
    #[arg(long, alias = "bootstrap_peer")]
    bootstrap_peer: Option<String>,

    /// Genesis public key for the chain to join
    #[arg(long, alias = "genesis_key")]
    genesis_key: Option<String>,

    /// Genesis timestamp for the chain to join
    #[arg(long)]
    timestamp: Option<String>,

    /// Write the manifest to stdout instead of tq-<CHAIN_NAME>.yaml
    #[arg(long)]
    stdout: bool,

    #[arg(long, default_value = DEFAULT_PROTOCOL_HASH)]
    protocol_hash: String,

    #[arg(long, default_value = DEFAULT_DOCKER_IMAGE)]
    docker_image: String,

    #[arg(long, default_value = DEFAULT_BAKER_COMMAND)]
    baker_command: String,

    /// Directory the deployment templates are resolved against
    #[arg(long, default_value = ".")]
    template_dir: PathBuf,

    /// YAML file overriding protocol parameters
    #[arg(long)]
    protocol_params: Option<PathBuf>,

    #[command(subcommand)]
    cluster: Cluster,
}

/// Target cluster
#[derive(Subcommand, Debug, PartialEq)]
enum Cluster {
    /// Generate config for minikube
    Minikube,
    /// Generate config for EKS
    Eks {
        gdb_volume_id: String,
        gdb_aws_region: String,
    },
    /// Generate config for kind
    Kind,
    /// Generate config for docker-desktop
    DockerDesktop,
}

impl From<Cluster> for ClusterFlavor {
    fn from(cluster: Cluster) -> Self {
        match cluster {
            Cluster::Minikube => ClusterFlavor::Minikube,
            Cluster::Eks {
                gdb_volume_id,
                gdb_aws_region,
            } => ClusterFlavor::Eks {
                gdb_volume_id,
                gdb_aws_region,
            },
            Cluster::Kind => ClusterFlavor::Kind,
            Cluster::DockerDesktop => ClusterFlavor::DockerDesktop,
        }
    }
}

impl Args {
    fn into_options(self) -> Result<ChainOptions> {
        let tezos_dir = expand_home(&self.tezos_dir)?;
        let mut options = ChainOptions::new(self.chain_name, tezos_dir, self.cluster.into());

        options.mode = match (self.create, self.join) {
            (true, _) => Mode::Create,
            (_, true) => Mode::Join,
            _ => Mode::Existing,
        };
        options.join = JoinParameters {
            bootstrap_peer: self.bootstrap_peer,
            genesis_key: self.genesis_key,
            timestamp: self.timestamp,
        };
        options.bootstrap_mutez = self.bootstrap_mutez;
        options.protocol_hash = self.protocol_hash;
        options.docker_image = self.docker_image;
        options.baker_command = self.baker_command;
        if self.stdout {
            options.output = OutputSink::Stdout;
        }
        if let Some(path) = &self.protocol_params {
            options.parameter_overrides = load_overrides(path)?;
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Logs go to stderr so --stdout output stays a clean manifest
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let template_dir = args.template_dir.clone();
    let options = args.into_options()?;

    info!("Chain: {}", options.chain_name);
    info!("Chain directory: {:?}", options.tezos_dir);
    info!("Mode: {:?}, cluster: {}", options.mode, options.flavor.name());

    let keygen = DockerKeyGenerator::new(options.docker_image.clone());
    let gateway = MinikubeProbe::default();
    let templates = DirTemplates::new(template_dir);
    let collaborators = Collaborators {
        keygen: &keygen,
        gateway: &gateway,
        templates: &templates,
    };

    generate_chain(&options, &collaborators)
        .wrap_err_with(|| format!("Failed to generate manifest for chain '{}'", options.chain_name))?;

    info!("Manifest generation completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["mkchain", "mychain", "--create", "kind"]);

        assert_eq!(args.chain_name, "mychain");
        assert_eq!(args.tezos_dir, "~/.tq/");
        assert_eq!(args.bootstrap_mutez, "4000000000000");
        assert!(args.create);
        assert!(!args.stdout);
        assert_eq!(args.cluster, Cluster::Kind);
    }

    #[test]
    fn test_join_args() {
        let args = Args::parse_from([
            "mkchain", "mychain",
            "--join",
            "--bootstrap_peer", "10.0.0.7",
            "--genesis-key", "edpkG",
            "--timestamp", "2020-06-01T00:00:00+00:00",
            "--stdout",
            "docker-desktop",
        ]);

        assert!(args.join);
        assert_eq!(args.bootstrap_peer.as_deref(), Some("10.0.0.7"));
        assert_eq!(args.cluster, Cluster::DockerDesktop);

        let options = args.into_options().unwrap();
        assert_eq!(options.mode, Mode::Join);
        assert_eq!(options.output, OutputSink::Stdout);
        assert_eq!(options.join.genesis_key.as_deref(), Some("edpkG"));
    }

    #[test]
    fn test_eks_args() {
        let args = Args::parse_from(["mkchain", "c", "eks", "vol-0123", "us-east-2"]);
        let options = args.into_options().unwrap();
        assert_eq!(options.mode, Mode::Existing);
        assert_eq!(
            options.flavor,
            ClusterFlavor::Eks {
                gdb_volume_id: "vol-0123".into(),
                gdb_aws_region: "us-east-2".into(),
            }
        );
        assert_eq!(options.output, OutputSink::File(PathBuf::from("tq-c.yaml")));
    }

    #[test]
    fn test_create_and_join_conflict() {
        let result = Args::try_parse_from(["mkchain", "c", "--create", "--join", "kind"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cluster_is_required() {
        assert!(Args::try_parse_from(["mkchain", "c"]).is_err());
    }
}
