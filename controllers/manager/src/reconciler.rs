//! Reconciliation logic for Machine and Cluster resources.
//!
//! Each reconcile drives the platform toward the resource's desired state
//! through the configured actuator and records the outcome in the resource
//! status. Errors surface to the watch loop's error policy, which requeues;
//! there is no retry at this layer.

use crate::actuator::{ClusterActuator, MachineActuator};
use crate::error::ControllerError;
use crds::{Cluster, ClusterPhase, Machine, MachinePhase};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Reconciles Machine and Cluster resources against the platform.
pub struct Reconciler {
    client: Client,
    machine_actuator: Arc<dyn MachineActuator>,
    cluster_actuator: Arc<dyn ClusterActuator>,
}

impl Reconciler {
    /// Creates a new reconciler.
    pub fn new(
        client: Client,
        machine_actuator: Arc<dyn MachineActuator>,
        cluster_actuator: Arc<dyn ClusterActuator>,
    ) -> Self {
        Self {
            client,
            machine_actuator,
            cluster_actuator,
        }
    }

    // Status patches and lookups need a namespaced Api even when the watch
    // streams span all namespaces.
    fn machine_api(&self, namespace: &str) -> Api<Machine> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn cluster_api(&self, namespace: &str) -> Api<Cluster> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Full status patch for a machine. Explicit nulls clear stale fields
    /// under a merge patch.
    fn machine_status_patch(
        phase: MachinePhase,
        vm_ref: Option<&str>,
        error: Option<&str>,
    ) -> serde_json::Value {
        serde_json::json!({
            "status": {
                "phase": phase,
                "vmRef": vm_ref,
                "lastReconciled": chrono::Utc::now(),
                "error": error,
            }
        })
    }

    /// Phase-and-error-only patch, leaving any recorded platform refs alone.
    fn phase_patch<P: serde::Serialize>(phase: P, error: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "status": {
                "phase": phase,
                "lastReconciled": chrono::Utc::now(),
                "error": error,
            }
        })
    }

    /// Full status patch for a cluster.
    fn cluster_status_patch(
        phase: ClusterPhase,
        folder_ref: Option<&str>,
        error: Option<&str>,
    ) -> serde_json::Value {
        serde_json::json!({
            "status": {
                "phase": phase,
                "folderRef": folder_ref,
                "lastReconciled": chrono::Utc::now(),
                "error": error,
            }
        })
    }

    async fn patch_machine_status(&self, namespace: &str, name: &str, patch: &serde_json::Value) {
        let pp = PatchParams::default();
        if let Err(e) = self
            .machine_api(namespace)
            .patch_status(name, &pp, &Patch::Merge(patch))
            .await
        {
            // Status is advisory; a failed patch must not fail the reconcile
            error!("Failed to update Machine {}/{} status: {}", namespace, name, e);
        }
    }

    async fn patch_cluster_status(&self, namespace: &str, name: &str, patch: &serde_json::Value) {
        let pp = PatchParams::default();
        if let Err(e) = self
            .cluster_api(namespace)
            .patch_status(name, &pp, &Patch::Merge(patch))
            .await
        {
            error!("Failed to update Cluster {}/{} status: {}", namespace, name, e);
        }
    }

    /// Reconcile one Machine.
    pub async fn reconcile_machine(&self, machine: &Machine) -> Result<(), ControllerError> {
        let name = machine
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ControllerError::InvalidResource("Machine missing name".to_string()))?;
        let namespace = machine.metadata.namespace.as_deref().unwrap_or("default");
        info!("Reconciling Machine {}/{}", namespace, name);

        if machine.metadata.deletion_timestamp.is_some() {
            self.patch_machine_status(
                namespace,
                name,
                &Self::phase_patch(MachinePhase::Deleting, None),
            )
            .await;
            if let Err(e) = self.machine_actuator.delete(machine).await {
                self.patch_machine_status(
                    namespace,
                    name,
                    &Self::phase_patch(MachinePhase::Failed, Some(&e.to_string())),
                )
                .await;
                return Err(e);
            }
            info!("Machine {}/{} deleted from platform", namespace, name);
            return Ok(());
        }

        // The owning cluster decides placement; without it we cannot create.
        let cluster_ref = &machine.spec.cluster_ref;
        let cluster_ns = cluster_ref.namespace.as_deref().unwrap_or(namespace);
        let cluster = match self.cluster_api(cluster_ns).get(&cluster_ref.name).await {
            Ok(cluster) => cluster,
            Err(e) => {
                let message = format!(
                    "Cluster {}/{} not found: {}",
                    cluster_ns, cluster_ref.name, e
                );
                warn!("{}", message);
                self.patch_machine_status(
                    namespace,
                    name,
                    &Self::phase_patch(MachinePhase::Failed, Some(&message)),
                )
                .await;
                return Err(ControllerError::Reconciliation(message));
            }
        };

        if !self.machine_actuator.exists(machine).await? {
            self.patch_machine_status(
                namespace,
                name,
                &Self::phase_patch(MachinePhase::Provisioning, None),
            )
            .await;
        }

        // `create` is ensure-style: it returns the existing VM when present.
        match self.machine_actuator.create(&cluster, machine).await {
            Ok(vm) => {
                self.patch_machine_status(
                    namespace,
                    name,
                    &Self::machine_status_patch(MachinePhase::Running, Some(&vm.vm), None),
                )
                .await;
                info!("Machine {}/{} running as {}", namespace, name, vm.vm);
                Ok(())
            }
            Err(e) => {
                self.patch_machine_status(
                    namespace,
                    name,
                    &Self::phase_patch(MachinePhase::Failed, Some(&e.to_string())),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Reconcile one Cluster.
    pub async fn reconcile_cluster(&self, cluster: &Cluster) -> Result<(), ControllerError> {
        let name = cluster
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ControllerError::InvalidResource("Cluster missing name".to_string()))?;
        let namespace = cluster.metadata.namespace.as_deref().unwrap_or("default");
        info!("Reconciling Cluster {}/{}", namespace, name);

        if cluster.metadata.deletion_timestamp.is_some() {
            self.patch_cluster_status(
                namespace,
                name,
                &Self::phase_patch(ClusterPhase::Deleting, None),
            )
            .await;
            if let Err(e) = self.cluster_actuator.delete(cluster).await {
                self.patch_cluster_status(
                    namespace,
                    name,
                    &Self::phase_patch(ClusterPhase::Failed, Some(&e.to_string())),
                )
                .await;
                return Err(e);
            }
            info!("Cluster {}/{} infrastructure deleted", namespace, name);
            return Ok(());
        }

        if !self.cluster_actuator.exists(cluster).await? {
            self.patch_cluster_status(
                namespace,
                name,
                &Self::phase_patch(ClusterPhase::Provisioning, None),
            )
            .await;
        }

        match self.cluster_actuator.create(cluster).await {
            Ok(folder) => {
                self.patch_cluster_status(
                    namespace,
                    name,
                    &Self::cluster_status_patch(ClusterPhase::Ready, Some(&folder.folder), None),
                )
                .await;
                info!(
                    "Cluster {}/{} ready in folder {}",
                    namespace, name, folder.folder
                );
                Ok(())
            }
            Err(e) => {
                self.patch_cluster_status(
                    namespace,
                    name,
                    &Self::phase_patch(ClusterPhase::Failed, Some(&e.to_string())),
                )
                .await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_status_patch_shape() {
        let patch = Reconciler::machine_status_patch(MachinePhase::Running, Some("vm-42"), None);
        assert_eq!(patch["status"]["phase"], "Running");
        assert_eq!(patch["status"]["vmRef"], "vm-42");
        // Explicit null clears a stale error on merge
        assert!(patch["status"]["error"].is_null());
        assert!(patch["status"]["lastReconciled"].is_string());
    }

    #[test]
    fn phase_patch_keeps_platform_refs_untouched() {
        let patch = Reconciler::phase_patch(MachinePhase::Failed, Some("boom"));
        assert_eq!(patch["status"]["phase"], "Failed");
        assert_eq!(patch["status"]["error"], "boom");
        assert!(patch["status"].get("vmRef").is_none());
    }

    #[test]
    fn cluster_status_patch_shape() {
        let patch = Reconciler::cluster_status_patch(ClusterPhase::Ready, Some("group-v7"), None);
        assert_eq!(patch["status"]["phase"], "Ready");
        assert_eq!(patch["status"]["folderRef"], "group-v7");
        assert!(patch["status"]["error"].is_null());
    }
}
