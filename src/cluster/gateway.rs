//! Minikube gateway discovery.
//!
//! Pods on minikube mount the chain directory over NFS from the host. The
//! host side needs the VM's address for `/etc/exports` and the templates
//! need the VM's default gateway, both read from inside the VM.

use super::ClusterError;
use crate::utils::ip_utils::strip_prefix_len;
use log::debug;
use std::process::Command;

/// Default route of the cluster VM and the address of its interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateway {
    pub address: String,
    pub interface_ip: String,
}

/// Discovers the cluster gateway.
pub trait GatewayProbe {
    fn discover(&self) -> Result<Gateway, ClusterError>;
}

/// Queries the minikube VM over `minikube ssh`.
#[derive(Debug, Clone)]
pub struct MinikubeProbe {
    /// Program invoked for `ssh`, `minikube` unless overridden
    pub program: String,
}

impl Default for MinikubeProbe {
    fn default() -> Self {
        Self {
            program: "minikube".to_string(),
        }
    }
}

impl MinikubeProbe {
    fn ssh(&self, remote_command: &str) -> Result<String, ClusterError> {
        debug!("{} ssh {:?}", self.program, remote_command);
        let output = Command::new(&self.program)
            .args(["ssh", remote_command])
            .output()
            .map_err(|e| ClusterError::ExternalTool {
                tool: self.program.clone(),
                reason: format!("failed to start: {}", e),
            })?;

        if !output.status.success() {
            return Err(ClusterError::ExternalTool {
                tool: self.program.clone(),
                reason: format!("'{}' exited with {}", remote_command, output.status),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl GatewayProbe for MinikubeProbe {
    fn discover(&self) -> Result<Gateway, ClusterError> {
        let route = self.ssh("route -n | grep ^0.0.0.0")?;
        let (address, interface) = parse_default_route(&route)?;

        let addr_output = self.ssh(&format!(
            "ip addr show {}|awk /^[[:space:]]+inet/'{{print $2}}'",
            interface
        ))?;
        let interface_ip = parse_interface_ip(&addr_output)?;

        Ok(Gateway { address, interface_ip })
    }
}

/// Extract gateway and interface from a `route -n` default-route line.
///
/// ```text
/// 0.0.0.0   192.168.64.1   0.0.0.0   UG   1024   0   0 eth0
/// ```
pub fn parse_default_route(line: &str) -> Result<(String, String), ClusterError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match (fields.get(1), fields.get(7)) {
        (Some(gateway), Some(interface)) => Ok((gateway.to_string(), interface.to_string())),
        _ => Err(ClusterError::UnexpectedOutput(format!(
            "default route line has {} fields: {:?}",
            fields.len(),
            line.trim()
        ))),
    }
}

/// First address printed by `ip addr show`, without its prefix length.
pub fn parse_interface_ip(output: &str) -> Result<String, ClusterError> {
    output
        .lines()
        .map(strip_prefix_len)
        .find(|addr| !addr.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ClusterError::UnexpectedOutput("no interface address found".to_string()))
}

/// `/etc/exports` line letting the VM mount the chain directory.
pub fn nfs_export_line(chain_dir: &str, uid: u32, gid: u32, vm_ip: &str) -> String {
    format!("\"{}\" -alldirs -mapall={}:{} {}", chain_dir, uid, gid, vm_ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_route() {
        let line = "0.0.0.0         192.168.64.1    0.0.0.0         UG    1024   0        0 eth0\n";
        let (gateway, interface) = parse_default_route(line).unwrap();
        assert_eq!(gateway, "192.168.64.1");
        assert_eq!(interface, "eth0");
    }

    #[test]
    fn test_parse_default_route_short_line() {
        assert!(matches!(
            parse_default_route("0.0.0.0 192.168.64.1"),
            Err(ClusterError::UnexpectedOutput(_))
        ));
        assert!(parse_default_route("").is_err());
    }

    #[test]
    fn test_parse_interface_ip() {
        assert_eq!(parse_interface_ip("192.168.64.2/24\n").unwrap(), "192.168.64.2");
        assert_eq!(
            parse_interface_ip("\n192.168.64.2/24\nfe80::1/64\n").unwrap(),
            "192.168.64.2"
        );
        assert!(parse_interface_ip("\n").is_err());
    }

    #[test]
    fn test_failing_tool_is_external_tool_error() {
        let probe = MinikubeProbe {
            program: "false".to_string(),
        };
        let err = probe.discover().unwrap_err();
        assert!(matches!(err, ClusterError::ExternalTool { ref tool, .. } if tool == "false"));
    }

    #[test]
    fn test_missing_tool_is_external_tool_error() {
        let probe = MinikubeProbe {
            program: "mkchain-no-such-minikube".to_string(),
        };
        let err = probe.discover().unwrap_err();
        assert!(matches!(err, ClusterError::ExternalTool { ref reason, .. } if reason.starts_with("failed to start")));
    }

    #[test]
    fn test_nfs_export_line() {
        assert_eq!(
            nfs_export_line("/Users/me/.tq/", 501, 20, "192.168.64.2"),
            "\"/Users/me/.tq/\" -alldirs -mapall=501:20 192.168.64.2"
        );
    }
}
