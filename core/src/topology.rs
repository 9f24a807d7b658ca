//! Fabric topology: the hosts taking part in a run and the switches between them
//!
//! Host order is significant. Index-based roles are derived from it: the
//! broadcast root and the parameter server are `hosts[0]`, and a host's ring
//! successor is `hosts[(i + 1) % N]`.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FabricError, FabricResult};

/// A traffic endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Host {
    /// Unique name within the topology
    pub name: String,

    /// Management address, used to reach the host for remote execution
    pub mgmt_ip: String,

    /// Data-plane address, used as the flow destination
    pub data_ip: String,
}

impl Host {
    /// Create a host
    pub fn new(
        name: impl Into<String>,
        mgmt_ip: impl Into<String>,
        data_ip: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mgmt_ip: mgmt_ip.into(),
            data_ip: data_ip.into(),
        }
    }
}

/// Role of a network device in the fabric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Spine switch
    Spine,
    /// Leaf switch
    Leaf,
    /// Anything else (border leaf, router, ...)
    #[serde(other)]
    Other,
}

/// A switch or router. Carried as plain data, never interpreted by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Device name
    pub name: String,

    /// Device role
    #[serde(rename = "type")]
    pub kind: DeviceKind,

    /// Management address
    pub mgmt_ip: String,

    /// BGP autonomous system number, when the file provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
}

/// On-disk shape of a topology document
#[derive(Debug, Deserialize)]
struct TopologyFile {
    #[serde(default)]
    hosts: Vec<Host>,
    #[serde(default)]
    devices: Vec<Device>,
}

/// Ordered set of hosts plus the fabric devices connecting them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    hosts: Vec<Host>,
    devices: Vec<Device>,
}

impl Topology {
    /// Build a topology, rejecting duplicate host names
    pub fn new(hosts: Vec<Host>, devices: Vec<Device>) -> FabricResult<Self> {
        let mut seen = HashSet::with_capacity(hosts.len());
        for host in &hosts {
            if host.name.is_empty() {
                return Err(FabricError::topology("host with empty name"));
            }
            if !seen.insert(host.name.as_str()) {
                return Err(FabricError::topology(format!(
                    "duplicate host name: {}",
                    host.name
                )));
            }
        }

        Ok(Self { hosts, devices })
    }

    /// Build a topology from hosts only
    pub fn from_hosts(hosts: Vec<Host>) -> FabricResult<Self> {
        Self::new(hosts, Vec::new())
    }

    /// Parse a JSON topology document
    pub fn from_json_str(json: &str) -> FabricResult<Self> {
        let file: TopologyFile = serde_json::from_str(json)
            .map_err(|e| FabricError::topology(format!("malformed topology document: {e}")))?;
        Self::new(file.hosts, file.devices)
    }

    /// Load a JSON topology document from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> FabricResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FabricError::topology(format!("failed to read {}: {e}", path.display()))
        })?;
        let topology = Self::from_json_str(&raw)?;

        tracing::debug!(
            path = %path.display(),
            hosts = topology.len(),
            devices = topology.devices.len(),
            "Loaded topology"
        );

        Ok(topology)
    }

    /// Hosts in topology order
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Host at `index`
    pub fn host(&self, index: usize) -> Option<&Host> {
        self.hosts.get(index)
    }

    /// Number of hosts
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether the topology has no hosts
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Fabric devices
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Devices of one role
    pub fn devices_of(&self, kind: DeviceKind) -> impl Iterator<Item = &Device> {
        self.devices.iter().filter(move |d| d.kind == kind)
    }
}
