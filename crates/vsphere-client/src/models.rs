//! Data models for the vSphere automation API
//!
//! Field names follow the vCenter REST API payloads (`vm` is the managed
//! object identifier, power states are SCREAMING_SNAKE_CASE).

use serde::{Deserialize, Serialize};

/// A virtual machine as reported by vCenter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VirtualMachine {
    /// Managed object identifier (e.g., "vm-42")
    pub vm: String,

    /// VM display name
    pub name: String,

    /// Current power state
    pub power_state: PowerState,

    /// Number of virtual CPUs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_count: Option<u32>,

    /// Memory in MiB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_size_mib: Option<u64>,

    /// BIOS instance UUID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_uuid: Option<String>,
}

/// VM power state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerState {
    /// VM is powered on
    PoweredOn,
    /// VM is powered off
    PoweredOff,
    /// VM is suspended
    Suspended,
}

/// Request to deploy a VM from a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployVmRequest {
    /// Name of the new VM
    pub name: String,

    /// Template to clone from
    pub template: String,

    /// Number of virtual CPUs
    pub num_cpus: u32,

    /// Memory in MiB
    pub memory_mb: u64,

    /// Root disk size in GiB
    pub disk_gb: u64,

    /// Target datastore (placement default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datastore: Option<String>,

    /// Target resource pool (placement default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_pool: Option<String>,

    /// Network for the primary NIC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    /// VM folder to place the VM in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

/// A VM folder as reported by vCenter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Folder {
    /// Managed object identifier (e.g., "group-v7")
    pub folder: String,

    /// Folder display name
    pub name: String,

    /// Datacenter the folder belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
}

/// Guest networking identity for a VM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestIdentity {
    /// Primary IP address reported by the guest agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    /// Guest hostname
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_state_uses_vcenter_wire_format() {
        let json = serde_json::to_string(&PowerState::PoweredOn).unwrap();
        assert_eq!(json, "\"POWERED_ON\"");
        let parsed: PowerState = serde_json::from_str("\"POWERED_OFF\"").unwrap();
        assert_eq!(parsed, PowerState::PoweredOff);
    }

    #[test]
    fn deploy_request_omits_unset_placement() {
        let request = DeployVmRequest {
            name: "node-0".to_string(),
            template: "ubuntu-22.04".to_string(),
            num_cpus: 2,
            memory_mb: 4096,
            disk_gb: 40,
            datastore: None,
            resource_pool: None,
            network: None,
            folder: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("datastore").is_none());
        assert_eq!(json["template"], "ubuntu-22.04");
    }
}
