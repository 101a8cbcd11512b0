//! Controller manager assembly.
//!
//! Builds every dependency in strict order (API config, clients, recorders,
//! platform client, actuators, reconciler, watch loops) and then runs the
//! watch loops until a shutdown signal or a watcher failure. Any
//! construction error aborts startup; there is no partial-startup state.

use crate::actuator::{
    ClusterActuator, MachineActuator, NamedMachineActuator, NamedMachinesCatalog,
    VsphereClusterActuator, VsphereMachineActuator,
};
use crate::client;
use crate::config::{ControllerConfig, MachineBackend};
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::recorder::KubeEventPublisher;
use crate::watcher::Watcher;
use crds::{Cluster, Machine};
use kube::Api;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};
use vsphere_client::{VsphereClient, VsphereClientTrait};

/// Component identity for the machine controller's clients and events.
pub const MACHINE_CONTROLLER: &str = "machine-controller-manager";
/// Component identity for the cluster controller's clients and events.
pub const CLUSTER_CONTROLLER: &str = "cluster-controller-manager";

/// Owns the running watch loops for the machine and cluster controllers.
pub struct ControllerManager {
    machine_watcher: JoinHandle<Result<(), ControllerError>>,
    cluster_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl ControllerManager {
    /// Build and start all controllers from the process configuration.
    pub async fn new(settings: &ControllerConfig) -> Result<Self, ControllerError> {
        settings.validate()?;
        info!("Initializing controller manager");

        // Kubernetes API access, one client per component identity
        let kube_config = client::resolve_config(settings).await?;
        let crd_client = client::crd_client(&kube_config)?;
        let machine_client = client::client_for_component(&kube_config, MACHINE_CONTROLLER)?;
        let cluster_client = client::client_for_component(&kube_config, CLUSTER_CONTROLLER)?;

        let machine_events = Arc::new(KubeEventPublisher::new(machine_client, MACHINE_CONTROLLER)?);
        let cluster_events = Arc::new(KubeEventPublisher::new(cluster_client, CLUSTER_CONTROLLER)?);

        // Platform client; verify endpoint and credentials before any
        // controller starts
        let vsphere: Arc<dyn VsphereClientTrait> = Arc::new(VsphereClient::new(
            settings.vsphere_url.clone(),
            settings.vsphere_username.clone(),
            settings.vsphere_password.clone(),
        )?);
        info!("Validating vCenter session at {}", settings.vsphere_url);
        vsphere.validate_session().await.map_err(|e| {
            error!("Failed to validate vCenter session: {}", e);
            error!("Please ensure:");
            error!("  1. VSPHERE_URL points at a reachable vCenter");
            error!("  2. VSPHERE_USERNAME / VSPHERE_PASSWORD are valid");
            ControllerError::Vsphere(e)
        })?;
        info!("vCenter session validated");

        let machine_actuator: Arc<dyn MachineActuator> = match settings.machine_backend {
            MachineBackend::Api => Arc::new(VsphereMachineActuator::new(
                vsphere.clone(),
                machine_events,
            )),
            MachineBackend::NamedMachines => {
                let path = settings.namedmachines.as_ref().ok_or_else(|| {
                    ControllerError::ActuatorConstruction(
                        "named-machines backend selected but no --namedmachines path".to_string(),
                    )
                })?;
                let catalog = NamedMachinesCatalog::load(path)?;
                info!(
                    "Loaded {} named machines from {}",
                    catalog.items.len(),
                    path.display()
                );
                Arc::new(NamedMachineActuator::new(
                    catalog,
                    vsphere.clone(),
                    machine_events,
                ))
            }
        };
        let cluster_actuator: Arc<dyn ClusterActuator> =
            Arc::new(VsphereClusterActuator::new(vsphere, cluster_events));

        let (machine_api, cluster_api): (Api<Machine>, Api<Cluster>) = match &settings.namespace {
            Some(ns) => (
                Api::namespaced(crd_client.clone(), ns),
                Api::namespaced(crd_client.clone(), ns),
            ),
            None => (
                Api::all(crd_client.clone()),
                Api::all(crd_client.clone()),
            ),
        };

        let reconciler = Arc::new(Reconciler::new(
            crd_client,
            machine_actuator,
            cluster_actuator,
        ));

        let watcher = Arc::new(Watcher::new(
            reconciler,
            machine_api,
            cluster_api,
            Duration::from_secs(settings.requeue_interval_secs),
        ));

        let machine_watcher = {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.watch_machines().await })
        };
        let cluster_watcher = {
            let watcher = watcher;
            tokio::spawn(async move { watcher.watch_clusters().await })
        };

        Ok(Self {
            machine_watcher,
            cluster_watcher,
        })
    }

    /// Run until a shutdown signal (Ctrl-C) fires or a watcher fails.
    pub async fn run(self) -> Result<(), ControllerError> {
        self.run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Run until `shutdown` resolves or a watcher fails.
    ///
    /// Tests drive shutdown directly instead of signalling the process.
    pub async fn run_with_shutdown(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ControllerError> {
        info!("Controller manager running");
        tokio::pin!(shutdown);

        tokio::select! {
            () = &mut shutdown => {
                info!("Shutdown signal received, stopping controllers");
                self.machine_watcher.abort();
                self.cluster_watcher.abort();
                Ok(())
            }
            result = &mut self.machine_watcher => {
                self.cluster_watcher.abort();
                result
                    .map_err(|e| ControllerError::Watch(format!("Machine watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Machine watcher error: {}", e)))
            }
            result = &mut self.cluster_watcher => {
                self.machine_watcher.abort();
                result
                    .map_err(|e| ControllerError::Watch(format!("Cluster watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Cluster watcher error: {}", e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_identities_are_distinct() {
        assert_ne!(MACHINE_CONTROLLER, CLUSTER_CONTROLLER);
        assert!(!MACHINE_CONTROLLER.is_empty());
        assert!(!CLUSTER_CONTROLLER.is_empty());
    }

    #[tokio::test]
    async fn run_with_shutdown_stops_on_trigger() {
        // Watchers that would run forever; the shutdown trigger must win.
        let manager = ControllerManager {
            machine_watcher: tokio::spawn(async {
                std::future::pending::<()>().await;
                Ok(())
            }),
            cluster_watcher: tokio::spawn(async {
                std::future::pending::<()>().await;
                Ok(())
            }),
        };
        let result = manager.run_with_shutdown(async {}).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn watcher_error_surfaces() {
        let manager = ControllerManager {
            machine_watcher: tokio::spawn(async {
                Err(ControllerError::Watch("stream closed".to_string()))
            }),
            cluster_watcher: tokio::spawn(async {
                std::future::pending::<()>().await;
                Ok(())
            }),
        };
        let result = manager
            .run_with_shutdown(std::future::pending::<()>())
            .await;
        assert!(matches!(result, Err(ControllerError::Watch(_))));
    }
}
