//! VsphereClient trait for mocking
//!
//! This trait abstracts the VsphereClient so actuators can be unit tested
//! against an in-memory mock instead of a live vCenter.

use crate::error::VsphereError;
use crate::models::*;

/// Trait for vSphere automation API operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait VsphereClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Establish a session and verify credentials
    async fn validate_session(&self) -> Result<(), VsphereError>;

    // VM operations
    async fn find_vm_by_name(&self, name: &str) -> Result<Option<VirtualMachine>, VsphereError>;
    async fn get_vm(&self, vm_id: &str) -> Result<VirtualMachine, VsphereError>;
    async fn deploy_vm(&self, request: &DeployVmRequest) -> Result<VirtualMachine, VsphereError>;
    async fn power_on_vm(&self, vm_id: &str) -> Result<(), VsphereError>;
    async fn delete_vm(&self, vm_id: &str) -> Result<(), VsphereError>;
    async fn vm_ip_address(&self, vm_id: &str) -> Result<Option<String>, VsphereError>;

    // Folder operations
    async fn find_folder_by_name(&self, name: &str) -> Result<Option<Folder>, VsphereError>;
    async fn create_folder(&self, name: &str, datacenter: &str) -> Result<Folder, VsphereError>;
    async fn delete_folder(&self, folder_id: &str) -> Result<(), VsphereError>;
}
