//! Mock VsphereClient for unit testing
//!
//! An in-memory implementation of `VsphereClientTrait` so actuator tests
//! run without a vCenter. Resources live in shared maps; failure modes can
//! be toggled per scenario.

use crate::error::VsphereError;
use crate::models::*;
use crate::vsphere_trait::VsphereClientTrait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock vSphere client for testing
///
/// Stores VMs and folders in memory and can be configured to fail
/// deployments or reject the session for testing error paths.
#[derive(Clone)]
pub struct MockVsphereClient {
    base_url: String,
    vms: Arc<Mutex<HashMap<String, VirtualMachine>>>,
    // VM id -> guest IP, populated by `set_vm_ip`
    guest_ips: Arc<Mutex<HashMap<String, String>>>,
    folders: Arc<Mutex<HashMap<String, Folder>>>,
    next_id: Arc<Mutex<u64>>,
    fail_deployments: Arc<Mutex<bool>>,
    reject_session: Arc<Mutex<bool>>,
}

impl MockVsphereClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            vms: Arc::new(Mutex::new(HashMap::new())),
            guest_ips: Arc::new(Mutex::new(HashMap::new())),
            folders: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
            fail_deployments: Arc::new(Mutex::new(false)),
            reject_session: Arc::new(Mutex::new(false)),
        }
    }

    fn allocate_id(&self) -> u64 {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        id
    }

    /// Pre-seed a VM
    pub fn add_vm(&self, vm: VirtualMachine) {
        self.vms.lock().unwrap().insert(vm.vm.clone(), vm);
    }

    /// Pre-seed a folder
    pub fn add_folder(&self, folder: Folder) {
        self.folders.lock().unwrap().insert(folder.folder.clone(), folder);
    }

    /// Report a guest IP for a VM
    pub fn set_vm_ip(&self, vm_id: &str, ip: &str) {
        self.guest_ips
            .lock()
            .unwrap()
            .insert(vm_id.to_string(), ip.to_string());
    }

    /// Make subsequent deployments fail with an API error
    pub fn fail_deployments(&self, fail: bool) {
        *self.fail_deployments.lock().unwrap() = fail;
    }

    /// Make session validation fail with an authentication error
    pub fn reject_session(&self, reject: bool) {
        *self.reject_session.lock().unwrap() = reject;
    }

    /// Number of VMs currently stored
    pub fn vm_count(&self) -> usize {
        self.vms.lock().unwrap().len()
    }

    /// Number of folders currently stored
    pub fn folder_count(&self) -> usize {
        self.folders.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl VsphereClientTrait for MockVsphereClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_session(&self) -> Result<(), VsphereError> {
        if *self.reject_session.lock().unwrap() {
            return Err(VsphereError::Authentication(
                "Invalid credentials: 401".to_string(),
            ));
        }
        Ok(())
    }

    async fn find_vm_by_name(&self, name: &str) -> Result<Option<VirtualMachine>, VsphereError> {
        Ok(self
            .vms
            .lock()
            .unwrap()
            .values()
            .find(|vm| vm.name == name)
            .cloned())
    }

    async fn get_vm(&self, vm_id: &str) -> Result<VirtualMachine, VsphereError> {
        self.vms
            .lock()
            .unwrap()
            .get(vm_id)
            .cloned()
            .ok_or_else(|| VsphereError::NotFound(format!("VM {} not found", vm_id)))
    }

    async fn deploy_vm(&self, request: &DeployVmRequest) -> Result<VirtualMachine, VsphereError> {
        if *self.fail_deployments.lock().unwrap() {
            return Err(VsphereError::Api(format!(
                "Failed to deploy VM {}: 500 - simulated failure",
                request.name
            )));
        }
        if request.name.is_empty() {
            return Err(VsphereError::InvalidRequest(
                "VM name must not be empty".to_string(),
            ));
        }

        let vm = VirtualMachine {
            vm: format!("vm-{}", self.allocate_id()),
            name: request.name.clone(),
            power_state: PowerState::PoweredOff,
            cpu_count: Some(request.num_cpus),
            memory_size_mib: Some(request.memory_mb),
            instance_uuid: Some(uuid::Uuid::new_v4().to_string()),
        };
        self.vms.lock().unwrap().insert(vm.vm.clone(), vm.clone());
        Ok(vm)
    }

    async fn power_on_vm(&self, vm_id: &str) -> Result<(), VsphereError> {
        let mut vms = self.vms.lock().unwrap();
        let vm = vms
            .get_mut(vm_id)
            .ok_or_else(|| VsphereError::NotFound(format!("VM {} not found", vm_id)))?;
        vm.power_state = PowerState::PoweredOn;
        Ok(())
    }

    async fn delete_vm(&self, vm_id: &str) -> Result<(), VsphereError> {
        self.vms
            .lock()
            .unwrap()
            .remove(vm_id)
            .ok_or_else(|| VsphereError::NotFound(format!("VM {} not found", vm_id)))?;
        self.guest_ips.lock().unwrap().remove(vm_id);
        Ok(())
    }

    async fn vm_ip_address(&self, vm_id: &str) -> Result<Option<String>, VsphereError> {
        if !self.vms.lock().unwrap().contains_key(vm_id) {
            return Err(VsphereError::NotFound(format!("VM {} not found", vm_id)));
        }
        Ok(self.guest_ips.lock().unwrap().get(vm_id).cloned())
    }

    async fn find_folder_by_name(&self, name: &str) -> Result<Option<Folder>, VsphereError> {
        Ok(self
            .folders
            .lock()
            .unwrap()
            .values()
            .find(|folder| folder.name == name)
            .cloned())
    }

    async fn create_folder(&self, name: &str, datacenter: &str) -> Result<Folder, VsphereError> {
        if name.is_empty() {
            return Err(VsphereError::InvalidRequest(
                "Folder name must not be empty".to_string(),
            ));
        }
        let folder = Folder {
            folder: format!("group-v{}", self.allocate_id()),
            name: name.to_string(),
            datacenter: Some(datacenter.to_string()),
        };
        self.folders
            .lock()
            .unwrap()
            .insert(folder.folder.clone(), folder.clone());
        Ok(folder)
    }

    async fn delete_folder(&self, folder_id: &str) -> Result<(), VsphereError> {
        self.folders
            .lock()
            .unwrap()
            .remove(folder_id)
            .ok_or_else(|| VsphereError::NotFound(format!("Folder {} not found", folder_id)))?;
        Ok(())
    }
}
