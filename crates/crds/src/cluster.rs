//! Cluster CRD
//!
//! Describes a provisioned cluster: its network ranges and the platform
//! placement (datacenter, per-cluster VM folder) machines are created under.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cluster.k8s.io",
    version = "v1alpha1",
    kind = "Cluster",
    namespaced,
    status = "ClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Cluster-wide network configuration
    pub cluster_network: ClusterNetwork,

    /// Platform-specific cluster configuration
    pub provider_config: ClusterProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetwork {
    /// CIDR blocks for services
    pub services: Vec<String>,

    /// CIDR blocks for pods
    pub pods: Vec<String>,

    /// DNS domain for services
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_domain: Option<String>,
}

/// Platform placement for a cluster
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProviderConfig {
    /// Datacenter the cluster's VMs live in
    pub datacenter: String,

    /// VM folder holding the cluster's machines (defaults to the cluster name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_folder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Provisioning phase
    pub phase: ClusterPhase,

    /// Platform folder identifier backing this cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_ref: Option<String>,

    /// Control plane endpoints, once known
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_endpoints: Vec<ApiEndpoint>,

    /// Last reconciliation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconciled: Option<chrono::DateTime<chrono::Utc>>,

    /// Error message if provisioning failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Host/port pair for a control plane endpoint
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    /// Endpoint host
    pub host: String,

    /// Endpoint port
    pub port: u16,
}

/// Cluster provisioning phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum ClusterPhase {
    /// Not yet acted on
    #[default]
    Pending,
    /// Platform resources being created
    Provisioning,
    /// Cluster infrastructure exists
    Ready,
    /// Cluster deletion in progress
    Deleting,
    /// Provisioning failed
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_spec_serializes_camel_case() {
        let spec = ClusterSpec {
            cluster_network: ClusterNetwork {
                services: vec!["10.96.0.0/12".to_string()],
                pods: vec!["192.168.0.0/16".to_string()],
                service_domain: Some("cluster.local".to_string()),
            },
            provider_config: ClusterProviderConfig {
                datacenter: "dc0".to_string(),
                vm_folder: None,
            },
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["clusterNetwork"]["serviceDomain"], "cluster.local");
        assert_eq!(json["providerConfig"]["datacenter"], "dc0");
        assert!(json["providerConfig"].get("vmFolder").is_none());
    }

    #[test]
    fn cluster_status_defaults_to_pending() {
        let status = ClusterStatus::default();
        assert_eq!(status.phase, ClusterPhase::Pending);
        assert!(status.api_endpoints.is_empty());
    }

    #[test]
    fn cluster_crd_names() {
        use kube::CustomResourceExt;
        let crd = Cluster::crd();
        assert_eq!(crd.spec.names.kind, "Cluster");
        assert_eq!(crd.spec.group, "cluster.k8s.io");
    }
}
