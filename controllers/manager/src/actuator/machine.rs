//! API-backed machine actuator.
//!
//! Deploys VMs straight from the template named in the Machine's provider
//! config, via the vCenter automation API.

use super::{cluster_folder_name, resource_name, MachineActuator};
use crate::error::ControllerError;
use crate::recorder::{actions, object_ref, reasons, EventPublisher};
use async_trait::async_trait;
use crds::{Cluster, Machine};
use kube::runtime::events::EventType;
use std::sync::Arc;
use tracing::{debug, info};
use vsphere_client::{DeployVmRequest, VirtualMachine, VsphereClientTrait};

/// Machine actuator backed by the vCenter automation API.
pub struct VsphereMachineActuator {
    client: Arc<dyn VsphereClientTrait>,
    events: Arc<dyn EventPublisher>,
}

impl VsphereMachineActuator {
    /// Create an actuator over the given platform client and event sink.
    pub fn new(client: Arc<dyn VsphereClientTrait>, events: Arc<dyn EventPublisher>) -> Self {
        Self { client, events }
    }

    fn deploy_request(machine: &Machine, name: &str, folder: &str) -> DeployVmRequest {
        let provider = &machine.spec.provider_config;
        DeployVmRequest {
            name: name.to_string(),
            template: provider.template.clone(),
            num_cpus: provider.num_cpus,
            memory_mb: provider.memory_mb,
            disk_gb: provider.disk_gb,
            datastore: provider.datastore.clone(),
            resource_pool: provider.resource_pool.clone(),
            network: provider.network.clone(),
            folder: Some(folder.to_string()),
        }
    }
}

#[async_trait]
impl MachineActuator for VsphereMachineActuator {
    async fn create(
        &self,
        cluster: &Cluster,
        machine: &Machine,
    ) -> Result<VirtualMachine, ControllerError> {
        let name = resource_name(machine.metadata.name.as_ref(), "Machine")?;
        let folder = cluster_folder_name(cluster)?;

        if let Some(existing) = self.client.find_vm_by_name(name).await? {
            debug!("VM {} already exists as {}", name, existing.vm);
            return Ok(existing);
        }

        let request = Self::deploy_request(machine, name, folder);
        let deployed = match self.client.deploy_vm(&request).await {
            Ok(vm) => vm,
            Err(e) => {
                self.events
                    .publish(
                        &object_ref(machine),
                        EventType::Warning,
                        reasons::MACHINE_CREATE_FAILED,
                        actions::PROVISION,
                        Some(e.to_string()),
                    )
                    .await;
                return Err(e.into());
            }
        };
        self.client.power_on_vm(&deployed.vm).await?;
        info!("Created VM {} for machine {}", deployed.vm, name);

        self.events
            .publish(
                &object_ref(machine),
                EventType::Normal,
                reasons::MACHINE_CREATED,
                actions::PROVISION,
                Some(format!("Created VM {} from template {}", deployed.vm, request.template)),
            )
            .await;
        Ok(deployed)
    }

    async fn delete(&self, machine: &Machine) -> Result<(), ControllerError> {
        let name = resource_name(machine.metadata.name.as_ref(), "Machine")?;

        // Prefer the recorded VM ref; fall back to a name lookup.
        let vm_id = match machine.status.as_ref().and_then(|s| s.vm_ref.clone()) {
            Some(vm_ref) => Some(vm_ref),
            None => self.client.find_vm_by_name(name).await?.map(|vm| vm.vm),
        };

        let Some(vm_id) = vm_id else {
            debug!("VM for machine {} already gone", name);
            return Ok(());
        };

        if let Err(e) = self.client.delete_vm(&vm_id).await {
            self.events
                .publish(
                    &object_ref(machine),
                    EventType::Warning,
                    reasons::MACHINE_DELETE_FAILED,
                    actions::DELETE,
                    Some(e.to_string()),
                )
                .await;
            return Err(e.into());
        }
        info!("Deleted VM {} for machine {}", vm_id, name);

        self.events
            .publish(
                &object_ref(machine),
                EventType::Normal,
                reasons::MACHINE_DELETED,
                actions::DELETE,
                Some(format!("Deleted VM {}", vm_id)),
            )
            .await;
        Ok(())
    }

    async fn exists(&self, machine: &Machine) -> Result<bool, ControllerError> {
        let name = resource_name(machine.metadata.name.as_ref(), "Machine")?;
        Ok(self.client.find_vm_by_name(name).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::NoopEventPublisher;
    use crds::{ClusterNetwork, ClusterProviderConfig, ClusterRef, ClusterSpec, MachineProviderConfig, MachineSpec};
    use vsphere_client::{MockVsphereClient, PowerState};

    fn test_cluster(name: &str) -> Cluster {
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
                    vm_folder: None,
                },
            },
        )
    }

    fn test_machine(name: &str) -> Machine {
        Machine::new(
            name,
            MachineSpec {
                cluster_ref: ClusterRef {
                    name: "test-cluster".to_string(),
                    namespace: None,
                },
                provider_config: MachineProviderConfig {
                    template: "ubuntu-22.04".to_string(),
                    num_cpus: 2,
                    memory_mb: 4096,
                    disk_gb: 40,
                    datastore: None,
                    resource_pool: None,
                    network: None,
                },
                roles: vec![],
                named_machine: None,
            },
        )
    }

    fn actuator(mock: &MockVsphereClient) -> VsphereMachineActuator {
        VsphereMachineActuator::new(
            Arc::new(mock.clone()),
            Arc::new(NoopEventPublisher::new("machine-controller-manager")),
        )
    }

    #[tokio::test]
    async fn create_deploys_and_powers_on() {
        let mock = MockVsphereClient::new("https://test-vcenter");
        let actuator = actuator(&mock);
        let cluster = test_cluster("test-cluster");
        let machine = test_machine("node-0");

        assert!(!actuator.exists(&machine).await.unwrap());
        let vm = actuator.create(&cluster, &machine).await.unwrap();
        assert!(actuator.exists(&machine).await.unwrap());

        let stored = mock.get_vm(&vm.vm).await.unwrap();
        assert_eq!(stored.power_state, PowerState::PoweredOn);
        assert_eq!(stored.cpu_count, Some(2));
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let mock = MockVsphereClient::new("https://test-vcenter");
        let actuator = actuator(&mock);
        let cluster = test_cluster("test-cluster");
        let machine = test_machine("node-0");

        let first = actuator.create(&cluster, &machine).await.unwrap();
        let second = actuator.create(&cluster, &machine).await.unwrap();
        assert_eq!(first.vm, second.vm);
        assert_eq!(mock.vm_count(), 1);
    }

    #[tokio::test]
    async fn create_surfaces_platform_errors() {
        let mock = MockVsphereClient::new("https://test-vcenter");
        mock.fail_deployments(true);
        let actuator = actuator(&mock);
        let result = actuator
            .create(&test_cluster("test-cluster"), &test_machine("node-0"))
            .await;
        assert!(matches!(result, Err(ControllerError::Vsphere(_))));
    }

    #[tokio::test]
    async fn delete_removes_the_vm_and_tolerates_absence() {
        let mock = MockVsphereClient::new("https://test-vcenter");
        let actuator = actuator(&mock);
        let cluster = test_cluster("test-cluster");
        let machine = test_machine("node-0");

        actuator.create(&cluster, &machine).await.unwrap();
        actuator.delete(&machine).await.unwrap();
        assert_eq!(mock.vm_count(), 0);

        // Second delete is a no-op
        actuator.delete(&machine).await.unwrap();
    }
}
