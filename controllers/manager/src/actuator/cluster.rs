//! Cluster actuator.
//!
//! Cluster infrastructure on the platform is a VM folder in the configured
//! datacenter; machines for the cluster are placed under it.

use super::{cluster_folder_name, ClusterActuator};
use crate::error::ControllerError;
use crate::recorder::{actions, object_ref, reasons, EventPublisher};
use async_trait::async_trait;
use crds::Cluster;
use kube::runtime::events::EventType;
use std::sync::Arc;
use tracing::{debug, info};
use vsphere_client::{Folder, VsphereClientTrait};

/// Cluster actuator backed by the vCenter automation API.
pub struct VsphereClusterActuator {
    client: Arc<dyn VsphereClientTrait>,
    events: Arc<dyn EventPublisher>,
}

impl VsphereClusterActuator {
    /// Create an actuator over the given platform client and event sink.
    pub fn new(client: Arc<dyn VsphereClientTrait>, events: Arc<dyn EventPublisher>) -> Self {
        Self { client, events }
    }
}

#[async_trait]
impl ClusterActuator for VsphereClusterActuator {
    async fn create(&self, cluster: &Cluster) -> Result<Folder, ControllerError> {
        let folder_name = cluster_folder_name(cluster)?;
        let datacenter = &cluster.spec.provider_config.datacenter;

        if let Some(existing) = self.client.find_folder_by_name(folder_name).await? {
            debug!("Folder {} already exists as {}", folder_name, existing.folder);
            return Ok(existing);
        }

        let folder = match self.client.create_folder(folder_name, datacenter).await {
            Ok(folder) => folder,
            Err(e) => {
                self.events
                    .publish(
                        &object_ref(cluster),
                        EventType::Warning,
                        reasons::CLUSTER_CREATE_FAILED,
                        actions::PROVISION,
                        Some(e.to_string()),
                    )
                    .await;
                return Err(e.into());
            }
        };
        info!(
            "Created folder {} for cluster {} in datacenter {}",
            folder.folder, folder_name, datacenter
        );

        self.events
            .publish(
                &object_ref(cluster),
                EventType::Normal,
                reasons::CLUSTER_CREATED,
                actions::PROVISION,
                Some(format!("Created VM folder {}", folder.folder)),
            )
            .await;
        Ok(folder)
    }

    async fn delete(&self, cluster: &Cluster) -> Result<(), ControllerError> {
        let folder_name = cluster_folder_name(cluster)?;

        let Some(folder) = self.client.find_folder_by_name(folder_name).await? else {
            debug!("Folder for cluster {} already gone", folder_name);
            return Ok(());
        };

        if let Err(e) = self.client.delete_folder(&folder.folder).await {
            self.events
                .publish(
                    &object_ref(cluster),
                    EventType::Warning,
                    reasons::CLUSTER_DELETE_FAILED,
                    actions::DELETE,
                    Some(e.to_string()),
                )
                .await;
            return Err(e.into());
        }

        self.events
            .publish(
                &object_ref(cluster),
                EventType::Normal,
                reasons::CLUSTER_DELETED,
                actions::DELETE,
                Some(format!("Deleted VM folder {}", folder.folder)),
            )
            .await;
        Ok(())
    }

    async fn exists(&self, cluster: &Cluster) -> Result<bool, ControllerError> {
        let folder_name = cluster_folder_name(cluster)?;
        Ok(self.client.find_folder_by_name(folder_name).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::NoopEventPublisher;
    use crds::{ClusterNetwork, ClusterProviderConfig, ClusterSpec};
    use vsphere_client::MockVsphereClient;

    fn test_cluster(name: &str, vm_folder: Option<&str>) -> Cluster {
        Cluster::new(
            name,
            ClusterSpec {
                cluster_network: ClusterNetwork {
                    services: vec!["10.96.0.0/12".to_string()],
                    pods: vec!["192.168.0.0/16".to_string()],
                    service_domain: None,
                },
                provider_config: ClusterProviderConfig {
                    datacenter: "dc0".to_string(),
                    vm_folder: vm_folder.map(str::to_string),
                },
            },
        )
    }

    fn actuator(mock: &MockVsphereClient) -> VsphereClusterActuator {
        VsphereClusterActuator::new(
            Arc::new(mock.clone()),
            Arc::new(NoopEventPublisher::new("cluster-controller-manager")),
        )
    }

    #[tokio::test]
    async fn create_then_exists_then_delete() {
        let mock = MockVsphereClient::new("https://test-vcenter");
        let actuator = actuator(&mock);
        let cluster = test_cluster("test-cluster", None);

        assert!(!actuator.exists(&cluster).await.unwrap());
        let folder = actuator.create(&cluster).await.unwrap();
        assert_eq!(folder.name, "test-cluster");
        assert!(actuator.exists(&cluster).await.unwrap());

        actuator.delete(&cluster).await.unwrap();
        assert!(!actuator.exists(&cluster).await.unwrap());
        // Second delete is a no-op
        actuator.delete(&cluster).await.unwrap();
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let mock = MockVsphereClient::new("https://test-vcenter");
        let actuator = actuator(&mock);
        let cluster = test_cluster("test-cluster", None);

        let first = actuator.create(&cluster).await.unwrap();
        let second = actuator.create(&cluster).await.unwrap();
        assert_eq!(first.folder, second.folder);
        assert_eq!(mock.folder_count(), 1);
    }

    #[tokio::test]
    async fn explicit_vm_folder_name_wins() {
        let mock = MockVsphereClient::new("https://test-vcenter");
        let actuator = actuator(&mock);
        let cluster = test_cluster("test-cluster", Some("custom-folder"));

        let folder = actuator.create(&cluster).await.unwrap();
        assert_eq!(folder.name, "custom-folder");
    }
}
