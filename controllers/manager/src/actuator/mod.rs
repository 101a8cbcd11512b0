//! Actuators drive the virtualization platform toward the state a CRD asks
//! for. Each actuator implements the {create, delete, exists} capability set
//! for one resource kind; the machine side is pluggable so an alternate
//! backend can be selected at startup.

pub mod cluster;
pub mod machine;
pub mod named_machines;

pub use cluster::VsphereClusterActuator;
pub use machine::VsphereMachineActuator;
pub use named_machines::{NamedMachineActuator, NamedMachinesCatalog};

use crate::error::ControllerError;
use async_trait::async_trait;
use crds::{Cluster, Machine};
use vsphere_client::{Folder, VirtualMachine};

/// Create/delete/exists operations for machines.
#[async_trait]
pub trait MachineActuator: Send + Sync {
    /// Ensure the machine's VM exists on the platform, returning it.
    async fn create(
        &self,
        cluster: &Cluster,
        machine: &Machine,
    ) -> Result<VirtualMachine, ControllerError>;

    /// Remove the machine's VM from the platform. Idempotent.
    async fn delete(&self, machine: &Machine) -> Result<(), ControllerError>;

    /// Whether the machine's VM exists on the platform.
    async fn exists(&self, machine: &Machine) -> Result<bool, ControllerError>;
}

/// Create/delete/exists operations for cluster infrastructure.
#[async_trait]
pub trait ClusterActuator: Send + Sync {
    /// Ensure the cluster's platform resources exist, returning the folder.
    async fn create(&self, cluster: &Cluster) -> Result<Folder, ControllerError>;

    /// Remove the cluster's platform resources. Idempotent.
    async fn delete(&self, cluster: &Cluster) -> Result<(), ControllerError>;

    /// Whether the cluster's platform resources exist.
    async fn exists(&self, cluster: &Cluster) -> Result<bool, ControllerError>;
}

/// Resource name from metadata, or an error naming the kind.
pub(crate) fn resource_name<'a>(
    name: Option<&'a String>,
    kind: &str,
) -> Result<&'a str, ControllerError> {
    name.map(String::as_str)
        .ok_or_else(|| ControllerError::InvalidResource(format!("{} missing name", kind)))
}

/// The VM folder a cluster's machines live in: explicit from the provider
/// config, or the cluster name.
pub(crate) fn cluster_folder_name<'a>(
    cluster: &'a Cluster,
) -> Result<&'a str, ControllerError> {
    match cluster.spec.provider_config.vm_folder.as_deref() {
        Some(folder) => Ok(folder),
        None => resource_name(cluster.metadata.name.as_ref(), "Cluster"),
    }
}
