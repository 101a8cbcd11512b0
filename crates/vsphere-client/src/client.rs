//! vSphere automation API client
//!
//! Implements the subset of the vCenter REST API the actuators need.
//! Endpoints follow the automation API structure: /api/session,
//! /api/vcenter/vm and /api/vcenter/folder.

use crate::error::VsphereError;
use crate::models::*;
use crate::vsphere_trait::VsphereClientTrait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Session header used by the vCenter automation API
const SESSION_HEADER: &str = "vmware-api-session-id";

/// vSphere automation API client
pub struct VsphereClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    // Session token, acquired lazily and refreshed on expiry
    session: RwLock<Option<String>>,
}

impl VsphereClient {
    /// Create a new vSphere client
    ///
    /// # Arguments
    /// * `base_url` - vCenter base URL (e.g., "https://vcenter.example.com")
    /// * `username` - SSO username
    /// * `password` - SSO password
    pub fn new(base_url: String, username: String, password: String) -> Result<Self, VsphereError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(VsphereError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
            session: RwLock::new(None),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Log in to vCenter and store the session token.
    async fn login(&self) -> Result<String, VsphereError> {
        let url = format!("{}/api/session", self.base_url);
        debug!("Creating vCenter session");

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(VsphereError::Http)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(VsphereError::Authentication(format!(
                "Invalid credentials: {} - {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VsphereError::Api(format!(
                "Failed to create session: {} - {}",
                status, body
            )));
        }

        // The session endpoint returns the token as a bare JSON string
        let token: String = response.json().await.map_err(VsphereError::Http)?;
        *self.session.write().await = Some(token.clone());
        Ok(token)
    }

    /// Get the current session token, logging in if necessary.
    async fn session_token(&self) -> Result<String, VsphereError> {
        if let Some(token) = self.session.read().await.as_ref() {
            return Ok(token.clone());
        }
        self.login().await
    }

    /// Establish a session and verify credentials and connectivity.
    ///
    /// Called once at startup so a bad endpoint or bad credentials fail
    /// before any controller starts.
    pub async fn validate_session(&self) -> Result<(), VsphereError> {
        let token = self.session_token().await?;
        let url = format!("{}/api/session", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(SESSION_HEADER, &token)
            .send()
            .await
            .map_err(VsphereError::Http)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            *self.session.write().await = None;
            return Err(VsphereError::Authentication(format!(
                "Session rejected: {}",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VsphereError::Api(format!(
                "Failed to validate session: {} - {}",
                status, body
            )));
        }

        debug!("vCenter session validated");
        Ok(())
    }

    /// Map a non-success response to an error, consuming the body for context.
    async fn error_for(
        &self,
        context: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, VsphereError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            // Session expired; drop it so the next call re-authenticates
            *self.session.write().await = None;
            return Err(VsphereError::Authentication(format!(
                "{}: session expired ({})",
                context, status
            )));
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(VsphereError::NotFound(format!("{}: {}", context, body)));
        }
        Err(VsphereError::Api(format!(
            "{}: {} - {}",
            context, status, body
        )))
    }

    /// Find a VM by display name
    ///
    /// # Returns
    /// * `Ok(Some(vm))` - The first VM with that name
    /// * `Ok(None)` - No VM with that name exists
    pub async fn find_vm_by_name(
        &self,
        name: &str,
    ) -> Result<Option<VirtualMachine>, VsphereError> {
        let token = self.session_token().await?;
        let url = format!("{}/api/vcenter/vm", self.base_url);
        debug!("Looking up VM by name: {}", name);

        let response = self
            .client
            .get(&url)
            .query(&[("names", name)])
            .header(SESSION_HEADER, &token)
            .send()
            .await
            .map_err(VsphereError::Http)?;

        let response = self.error_for("Failed to list VMs", response).await?;
        let vms: Vec<VirtualMachine> = response.json().await.map_err(VsphereError::Http)?;
        Ok(vms.into_iter().next())
    }

    /// Get a VM by managed object identifier
    pub async fn get_vm(&self, vm_id: &str) -> Result<VirtualMachine, VsphereError> {
        let token = self.session_token().await?;
        let url = format!("{}/api/vcenter/vm/{}", self.base_url, vm_id);

        let response = self
            .client
            .get(&url)
            .header(SESSION_HEADER, &token)
            .send()
            .await
            .map_err(VsphereError::Http)?;

        let response = self
            .error_for(&format!("Failed to get VM {}", vm_id), response)
            .await?;
        response.json().await.map_err(VsphereError::Http)
    }

    /// Deploy a VM from a template
    pub async fn deploy_vm(
        &self,
        request: &DeployVmRequest,
    ) -> Result<VirtualMachine, VsphereError> {
        if request.name.is_empty() {
            return Err(VsphereError::InvalidRequest(
                "VM name must not be empty".to_string(),
            ));
        }
        if request.template.is_empty() {
            return Err(VsphereError::InvalidRequest(
                "VM template must not be empty".to_string(),
            ));
        }

        let token = self.session_token().await?;
        let url = format!("{}/api/vcenter/vm", self.base_url);
        debug!("Deploying VM {} from template {}", request.name, request.template);

        let response = self
            .client
            .post(&url)
            .header(SESSION_HEADER, &token)
            .json(request)
            .send()
            .await
            .map_err(VsphereError::Http)?;

        let response = self
            .error_for(&format!("Failed to deploy VM {}", request.name), response)
            .await?;

        // The create endpoint returns the new VM identifier as a bare string
        let vm_id: String = response.json().await.map_err(VsphereError::Http)?;
        self.get_vm(&vm_id).await
    }

    /// Power on a VM
    pub async fn power_on_vm(&self, vm_id: &str) -> Result<(), VsphereError> {
        let token = self.session_token().await?;
        let url = format!("{}/api/vcenter/vm/{}/power", self.base_url, vm_id);

        let response = self
            .client
            .post(&url)
            .query(&[("action", "start")])
            .header(SESSION_HEADER, &token)
            .send()
            .await
            .map_err(VsphereError::Http)?;

        self.error_for(&format!("Failed to power on VM {}", vm_id), response)
            .await?;
        Ok(())
    }

    /// Delete a VM
    pub async fn delete_vm(&self, vm_id: &str) -> Result<(), VsphereError> {
        let token = self.session_token().await?;
        let url = format!("{}/api/vcenter/vm/{}", self.base_url, vm_id);
        debug!("Deleting VM {}", vm_id);

        let response = self
            .client
            .delete(&url)
            .header(SESSION_HEADER, &token)
            .send()
            .await
            .map_err(VsphereError::Http)?;

        self.error_for(&format!("Failed to delete VM {}", vm_id), response)
            .await?;
        Ok(())
    }

    /// Get the guest IP address of a VM, if the guest agent reports one
    ///
    /// Returns `Ok(None)` while the guest agent has not published an
    /// address yet (vCenter answers 503 in that window).
    pub async fn vm_ip_address(&self, vm_id: &str) -> Result<Option<String>, VsphereError> {
        let token = self.session_token().await?;
        let url = format!(
            "{}/api/vcenter/vm/{}/guest/identity",
            self.base_url, vm_id
        );

        let response = self
            .client
            .get(&url)
            .header(SESSION_HEADER, &token)
            .send()
            .await
            .map_err(VsphereError::Http)?;

        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return Ok(None);
        }

        let response = self
            .error_for(&format!("Failed to get guest identity for VM {}", vm_id), response)
            .await?;
        let identity: GuestIdentity = response.json().await.map_err(VsphereError::Http)?;
        Ok(identity.ip_address)
    }

    /// Find a VM folder by display name
    pub async fn find_folder_by_name(&self, name: &str) -> Result<Option<Folder>, VsphereError> {
        let token = self.session_token().await?;
        let url = format!("{}/api/vcenter/folder", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("type", "VIRTUAL_MACHINE"), ("names", name)])
            .header(SESSION_HEADER, &token)
            .send()
            .await
            .map_err(VsphereError::Http)?;

        let response = self.error_for("Failed to list folders", response).await?;
        let folders: Vec<Folder> = response.json().await.map_err(VsphereError::Http)?;
        Ok(folders.into_iter().next())
    }

    /// Create a VM folder in a datacenter
    pub async fn create_folder(
        &self,
        name: &str,
        datacenter: &str,
    ) -> Result<Folder, VsphereError> {
        if name.is_empty() {
            return Err(VsphereError::InvalidRequest(
                "Folder name must not be empty".to_string(),
            ));
        }

        let token = self.session_token().await?;
        let url = format!("{}/api/vcenter/folder", self.base_url);
        debug!("Creating VM folder {} in datacenter {}", name, datacenter);

        let body = serde_json::json!({
            "name": name,
            "type": "VIRTUAL_MACHINE",
            "datacenter": datacenter,
        });

        let response = self
            .client
            .post(&url)
            .header(SESSION_HEADER, &token)
            .json(&body)
            .send()
            .await
            .map_err(VsphereError::Http)?;

        let response = self
            .error_for(&format!("Failed to create folder {}", name), response)
            .await?;
        let folder_id: String = response.json().await.map_err(VsphereError::Http)?;
        Ok(Folder {
            folder: folder_id,
            name: name.to_string(),
            datacenter: Some(datacenter.to_string()),
        })
    }

    /// Delete a VM folder
    pub async fn delete_folder(&self, folder_id: &str) -> Result<(), VsphereError> {
        let token = self.session_token().await?;
        let url = format!("{}/api/vcenter/folder/{}", self.base_url, folder_id);
        debug!("Deleting VM folder {}", folder_id);

        let response = self
            .client
            .delete(&url)
            .header(SESSION_HEADER, &token)
            .send()
            .await
            .map_err(VsphereError::Http)?;

        self.error_for(&format!("Failed to delete folder {}", folder_id), response)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl VsphereClientTrait for VsphereClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    async fn validate_session(&self) -> Result<(), VsphereError> {
        self.validate_session().await
    }

    async fn find_vm_by_name(&self, name: &str) -> Result<Option<VirtualMachine>, VsphereError> {
        self.find_vm_by_name(name).await
    }

    async fn get_vm(&self, vm_id: &str) -> Result<VirtualMachine, VsphereError> {
        self.get_vm(vm_id).await
    }

    async fn deploy_vm(&self, request: &DeployVmRequest) -> Result<VirtualMachine, VsphereError> {
        self.deploy_vm(request).await
    }

    async fn power_on_vm(&self, vm_id: &str) -> Result<(), VsphereError> {
        self.power_on_vm(vm_id).await
    }

    async fn delete_vm(&self, vm_id: &str) -> Result<(), VsphereError> {
        self.delete_vm(vm_id).await
    }

    async fn vm_ip_address(&self, vm_id: &str) -> Result<Option<String>, VsphereError> {
        self.vm_ip_address(vm_id).await
    }

    async fn find_folder_by_name(&self, name: &str) -> Result<Option<Folder>, VsphereError> {
        self.find_folder_by_name(name).await
    }

    async fn create_folder(&self, name: &str, datacenter: &str) -> Result<Folder, VsphereError> {
        self.create_folder(name, datacenter).await
    }

    async fn delete_folder(&self, folder_id: &str) -> Result<(), VsphereError> {
        self.delete_folder(folder_id).await
    }
}
