//! vSphere Automation API Client
//!
//! A Rust client for the vCenter automation REST API, covering the
//! operations the provisioning actuators need: session management, VM
//! deployment from templates, power control, and VM folder management.
//!
//! # Example
//!
//! ```no_run
//! use vsphere_client::{VsphereClient, DeployVmRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = VsphereClient::new(
//!     "https://vcenter.example.com".to_string(),
//!     "administrator@vsphere.local".to_string(),
//!     "password".to_string(),
//! )?;
//!
//! // Establish and validate a session
//! client.validate_session().await?;
//!
//! // Deploy a VM from a template
//! let request = DeployVmRequest {
//!     name: "node-0".to_string(),
//!     template: "ubuntu-22.04".to_string(),
//!     num_cpus: 2,
//!     memory_mb: 4096,
//!     disk_gb: 40,
//!     datastore: None,
//!     resource_pool: None,
//!     network: None,
//!     folder: None,
//! };
//! let vm = client.deploy_vm(&request).await?;
//! client.power_on_vm(&vm.vm).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Session handling**: token acquisition on demand, re-login on expiry
//! - **VM lifecycle**: deploy from template, power on, delete, lookup by name
//! - **Folder management**: per-cluster VM folders
//! - **Mocking**: `test-util` feature provides an in-memory mock client

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod vsphere_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::VsphereClient;
pub use error::VsphereError;
pub use models::*;
pub use vsphere_trait::VsphereClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockVsphereClient;
