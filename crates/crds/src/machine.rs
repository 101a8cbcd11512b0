//! Machine CRD
//!
//! Describes a single machine that should exist on the virtualization
//! platform, including the VM shape and the cluster it belongs to.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cluster.k8s.io",
    version = "v1alpha1",
    kind = "Machine",
    namespaced,
    status = "MachineStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// Reference to the owning Cluster
    pub cluster_ref: ClusterRef,

    /// Platform-specific VM configuration
    pub provider_config: MachineProviderConfig,

    /// Roles this machine fulfills in the cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<MachineRole>,

    /// Named machine template from the catalog (named-machines backend only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_machine: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRef {
    /// Name of the Cluster resource
    pub name: String,

    /// Namespace (defaults to same namespace as the Machine)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// VM shape and placement on the virtualization platform
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineProviderConfig {
    /// Template the VM is cloned from
    pub template: String,

    /// Number of virtual CPUs
    pub num_cpus: u32,

    /// Memory in MiB
    pub memory_mb: u64,

    /// Root disk size in GiB
    pub disk_gb: u64,

    /// Target datastore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datastore: Option<String>,

    /// Target resource pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_pool: Option<String>,

    /// Network the primary NIC attaches to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

/// Role a machine plays in the cluster
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum MachineRole {
    /// Control plane member
    ControlPlane,
    /// Worker node
    Node,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    /// Provisioning phase
    pub phase: MachinePhase,

    /// Platform VM identifier (managed object reference)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_ref: Option<String>,

    /// IP address reported by the platform, once available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    /// Last reconciliation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconciled: Option<chrono::DateTime<chrono::Utc>>,

    /// Error message if provisioning failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Machine provisioning phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum MachinePhase {
    /// Not yet acted on
    #[default]
    Pending,
    /// VM creation in progress
    Provisioning,
    /// VM exists and is powered on
    Running,
    /// VM deletion in progress
    Deleting,
    /// Provisioning failed
    Failed,
}
