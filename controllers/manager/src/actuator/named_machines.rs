//! Named-machines machine actuator.
//!
//! An alternate backend that resolves a Machine's VM shape through a YAML
//! catalog of named machine definitions (the `--namedmachines` file) instead
//! of the Machine's inline provider config. Selected with
//! `--machine-backend named-machines`.

use super::{cluster_folder_name, resource_name, MachineActuator};
use crate::error::ControllerError;
use crate::recorder::{actions, object_ref, reasons, EventPublisher};
use async_trait::async_trait;
use crds::{Cluster, Machine};
use kube::runtime::events::EventType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use vsphere_client::{DeployVmRequest, VirtualMachine, VsphereClientTrait};

/// One entry in the named machines catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedMachine {
    /// Catalog key referenced by `Machine.spec.namedMachine`
    pub name: String,

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

    /// Network for the primary NIC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

/// The named machines catalog, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedMachinesCatalog {
    /// Catalog entries
    pub items: Vec<NamedMachine>,
}

impl NamedMachinesCatalog {
    /// Parse a catalog from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ControllerError> {
        let catalog: Self = serde_yaml::from_str(yaml)
            .map_err(|e| ControllerError::InvalidConfig(format!("named machines file: {}", e)))?;
        for (index, entry) in catalog.items.iter().enumerate() {
            if entry.name.is_empty() {
                return Err(ControllerError::InvalidConfig(format!(
                    "named machines file: entry {} has an empty name",
                    index
                )));
            }
        }
        Ok(catalog)
    }

    /// Load a catalog from a file path.
    pub fn load(path: &Path) -> Result<Self, ControllerError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            ControllerError::InvalidConfig(format!(
                "named machines file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&yaml)
    }

    /// Look up an entry by name.
    pub fn find(&self, name: &str) -> Option<&NamedMachine> {
        self.items.iter().find(|entry| entry.name == name)
    }
}

/// Machine actuator resolving VM shapes through the named machines catalog.
pub struct NamedMachineActuator {
    catalog: NamedMachinesCatalog,
    client: Arc<dyn VsphereClientTrait>,
    events: Arc<dyn EventPublisher>,
}

impl NamedMachineActuator {
    /// Create an actuator over the given catalog, platform client and event sink.
    pub fn new(
        catalog: NamedMachinesCatalog,
        client: Arc<dyn VsphereClientTrait>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            catalog,
            client,
            events,
        }
    }

    fn resolve<'a>(&'a self, machine: &Machine) -> Result<&'a NamedMachine, ControllerError> {
        let key = machine.spec.named_machine.as_deref().ok_or_else(|| {
            ControllerError::InvalidResource(
                "Machine has no namedMachine but the named-machines backend is active".to_string(),
            )
        })?;
        self.catalog.find(key).ok_or_else(|| {
            ControllerError::InvalidResource(format!("named machine {:?} not in catalog", key))
        })
    }
}

#[async_trait]
impl MachineActuator for NamedMachineActuator {
    async fn create(
        &self,
        cluster: &Cluster,
        machine: &Machine,
    ) -> Result<VirtualMachine, ControllerError> {
        let name = resource_name(machine.metadata.name.as_ref(), "Machine")?;
        let folder = cluster_folder_name(cluster)?;
        let shape = self.resolve(machine)?;

        if let Some(existing) = self.client.find_vm_by_name(name).await? {
            debug!("VM {} already exists as {}", name, existing.vm);
            return Ok(existing);
        }

        let request = DeployVmRequest {
            name: name.to_string(),
            template: shape.template.clone(),
            num_cpus: shape.num_cpus,
            memory_mb: shape.memory_mb,
            disk_gb: shape.disk_gb,
            datastore: shape.datastore.clone(),
            resource_pool: shape.resource_pool.clone(),
            network: shape.network.clone(),
            folder: Some(folder.to_string()),
        };

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
        info!(
            "Created VM {} for machine {} from named machine {}",
            deployed.vm, name, shape.name
        );

        self.events
            .publish(
                &object_ref(machine),
                EventType::Normal,
                reasons::MACHINE_CREATED,
                actions::PROVISION,
                Some(format!(
                    "Created VM {} from named machine {}",
                    deployed.vm, shape.name
                )),
            )
            .await;
        Ok(deployed)
    }

    async fn delete(&self, machine: &Machine) -> Result<(), ControllerError> {
        let name = resource_name(machine.metadata.name.as_ref(), "Machine")?;

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
    use vsphere_client::MockVsphereClient;

    const CATALOG_YAML: &str = r#"
items:
  - name: small
    template: ubuntu-22.04
    numCpus: 2
    memoryMb: 4096
    diskGb: 40
  - name: large
    template: ubuntu-22.04
    numCpus: 8
    memoryMb: 32768
    diskGb: 200
    datastore: fast-ssd
"#;

    fn test_cluster() -> Cluster {
        Cluster::new(
            "test-cluster",
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

    fn test_machine(name: &str, named_machine: Option<&str>) -> Machine {
        Machine::new(
            name,
            MachineSpec {
                cluster_ref: ClusterRef {
                    name: "test-cluster".to_string(),
                    namespace: None,
                },
                provider_config: MachineProviderConfig {
                    template: "unused".to_string(),
                    num_cpus: 1,
                    memory_mb: 1024,
                    disk_gb: 10,
                    datastore: None,
                    resource_pool: None,
                    network: None,
                },
                roles: vec![],
                named_machine: named_machine.map(str::to_string),
            },
        )
    }

    #[test]
    fn catalog_parses_and_finds_entries() {
        let catalog = NamedMachinesCatalog::from_yaml(CATALOG_YAML).unwrap();
        assert_eq!(catalog.items.len(), 2);
        let large = catalog.find("large").unwrap();
        assert_eq!(large.num_cpus, 8);
        assert_eq!(large.datastore.as_deref(), Some("fast-ssd"));
        assert!(catalog.find("missing").is_none());
    }

    #[test]
    fn catalog_rejects_malformed_yaml() {
        assert!(matches!(
            NamedMachinesCatalog::from_yaml("items: {not a list}"),
            Err(ControllerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn catalog_rejects_empty_entry_names() {
        let yaml = "items:\n  - name: \"\"\n    template: t\n    numCpus: 1\n    memoryMb: 1\n    diskGb: 1\n";
        assert!(matches!(
            NamedMachinesCatalog::from_yaml(yaml),
            Err(ControllerError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn create_uses_catalog_shape() {
        let catalog = NamedMachinesCatalog::from_yaml(CATALOG_YAML).unwrap();
        let mock = MockVsphereClient::new("https://test-vcenter");
        let actuator = NamedMachineActuator::new(
            catalog,
            Arc::new(mock.clone()),
            Arc::new(NoopEventPublisher::new("machine-controller-manager")),
        );

        let vm = actuator
            .create(&test_cluster(), &test_machine("node-0", Some("large")))
            .await
            .unwrap();
        assert_eq!(vm.cpu_count, Some(8));
        assert_eq!(vm.memory_size_mib, Some(32768));
    }

    #[tokio::test]
    async fn create_fails_for_unknown_named_machine() {
        let catalog = NamedMachinesCatalog::from_yaml(CATALOG_YAML).unwrap();
        let mock = MockVsphereClient::new("https://test-vcenter");
        let actuator = NamedMachineActuator::new(
            catalog,
            Arc::new(mock.clone()),
            Arc::new(NoopEventPublisher::new("machine-controller-manager")),
        );

        let result = actuator
            .create(&test_cluster(), &test_machine("node-0", Some("missing")))
            .await;
        assert!(matches!(result, Err(ControllerError::InvalidResource(_))));
        assert_eq!(mock.vm_count(), 0);
    }

    #[tokio::test]
    async fn create_fails_when_machine_has_no_named_machine() {
        let catalog = NamedMachinesCatalog::from_yaml(CATALOG_YAML).unwrap();
        let mock = MockVsphereClient::new("https://test-vcenter");
        let actuator = NamedMachineActuator::new(
            catalog,
            Arc::new(mock),
            Arc::new(NoopEventPublisher::new("machine-controller-manager")),
        );

        let result = actuator
            .create(&test_cluster(), &test_machine("node-0", None))
            .await;
        assert!(matches!(result, Err(ControllerError::InvalidResource(_))));
    }
}
