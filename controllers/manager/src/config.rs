//! Controller manager configuration.
//!
//! All process configuration is parsed once at startup into an explicit
//! `ControllerConfig` value and passed down through constructors. There is
//! no global flag state.

use crate::error::ControllerError;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which machine actuator backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MachineBackend {
    /// Deploy VMs directly through the vCenter automation API
    Api,
    /// Resolve machine shapes through a named-machines catalog file
    NamedMachines,
}

/// Command-line configuration for the controller manager.
#[derive(Clone, Parser)]
#[command(name = "vsphere-controller-manager", about = "Runs the machine and cluster provisioning controllers")]
pub struct ControllerConfig {
    /// Path to a kubeconfig file; in-cluster config is inferred when unset
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Path to a named machines YAML file (named-machines backend only)
    #[arg(long)]
    pub namedmachines: Option<PathBuf>,

    /// Machine actuator backend
    #[arg(long, value_enum, default_value_t = MachineBackend::Api)]
    pub machine_backend: MachineBackend,

    /// Namespace to watch; all namespaces when unset
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// vCenter endpoint URL
    #[arg(long, env = "VSPHERE_URL")]
    pub vsphere_url: String,

    /// vCenter SSO username
    #[arg(long, env = "VSPHERE_USERNAME")]
    pub vsphere_username: String,

    /// vCenter SSO password
    #[arg(long, env = "VSPHERE_PASSWORD", hide_env_values = true)]
    pub vsphere_password: String,

    /// Requeue interval after reconciliation errors, in seconds
    #[arg(long, default_value_t = 60)]
    pub requeue_interval_secs: u64,
}

impl ControllerConfig {
    /// Check cross-flag consistency before any construction work starts.
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.machine_backend == MachineBackend::NamedMachines && self.namedmachines.is_none() {
            return Err(ControllerError::InvalidConfig(
                "--namedmachines is required with --machine-backend named-machines".to_string(),
            ));
        }
        Ok(())
    }
}

// Manual impl so the password never lands in logs.
impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("kubeconfig", &self.kubeconfig)
            .field("namedmachines", &self.namedmachines)
            .field("machine_backend", &self.machine_backend)
            .field("namespace", &self.namespace)
            .field("vsphere_url", &self.vsphere_url)
            .field("vsphere_username", &self.vsphere_username)
            .field("vsphere_password", &"<redacted>")
            .field("requeue_interval_secs", &self.requeue_interval_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec![
            "vsphere-controller-manager",
            "--vsphere-url",
            "https://vcenter.example.com",
            "--vsphere-username",
            "administrator@vsphere.local",
            "--vsphere-password",
            "secret",
        ]
    }

    #[test]
    fn defaults() {
        let config = ControllerConfig::try_parse_from(base_args()).unwrap();
        assert_eq!(config.machine_backend, MachineBackend::Api);
        assert!(config.namedmachines.is_none());
        assert_eq!(config.requeue_interval_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn namedmachines_flag_parses() {
        let mut args = base_args();
        args.extend(["--namedmachines", "/etc/named-machines.yaml"]);
        args.extend(["--machine-backend", "named-machines"]);
        let config = ControllerConfig::try_parse_from(args).unwrap();
        assert_eq!(config.machine_backend, MachineBackend::NamedMachines);
        assert_eq!(
            config.namedmachines.as_deref(),
            Some(std::path::Path::new("/etc/named-machines.yaml"))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn named_machines_backend_requires_catalog_path() {
        let mut args = base_args();
        args.extend(["--machine-backend", "named-machines"]);
        let config = ControllerConfig::try_parse_from(args).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ControllerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut args = base_args();
        args.extend(["--machine-backend", "terraform"]);
        assert!(ControllerConfig::try_parse_from(args).is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let config = ControllerConfig::try_parse_from(base_args()).unwrap();
        let output = format!("{:?}", config);
        assert!(!output.contains("secret"));
        assert!(output.contains("<redacted>"));
    }
}
