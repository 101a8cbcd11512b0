//! Controller-specific error types.
//!
//! Every variant that can occur during bootstrap is fatal: the process logs
//! the error and exits. Retry only happens inside the watch loops.

use thiserror::Error;
use vsphere_client::VsphereError;

/// Errors that can occur in the controller manager.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubeconfig could not be loaded or is invalid
    #[error("Could not create Config for talking to the apiserver: {0}")]
    ConfigResolution(String),

    /// A Kubernetes client could not be constructed
    #[error("Could not create client for talking to the apiserver: {0}")]
    ClientConstruction(String),

    /// An event recorder could not be constructed
    #[error("Could not create event recorder: {0}")]
    RecorderConstruction(String),

    /// An actuator could not be constructed
    #[error("Could not create actuator: {0}")]
    ActuatorConstruction(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// vSphere API error
    #[error("vSphere error: {0}")]
    Vsphere(#[from] VsphereError),

    /// A resource is missing required metadata
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// Reconciliation failed
    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_resolution_names_the_apiserver() {
        let err = ControllerError::ConfigResolution("no such file".to_string());
        assert!(err
            .to_string()
            .contains("Could not create Config for talking to the apiserver"));
    }

    #[test]
    fn vsphere_errors_convert() {
        let err: ControllerError = VsphereError::Api("boom".to_string()).into();
        assert!(matches!(err, ControllerError::Vsphere(_)));
    }
}
