//! Kubernetes client factory.
//!
//! Resolves API access configuration from a kubeconfig path (or in-cluster
//! inference) and builds one client per component identity. Each component
//! client carries its own User-Agent so requests can be attributed in
//! apiserver audit and server logs.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use http::header::USER_AGENT;
use http::HeaderValue;
use kube::client::ClientBuilder;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tower_http::set_header::SetRequestHeaderLayer;
use tracing::debug;

/// Resolve a `kube::Config` from the configured kubeconfig path, falling
/// back to in-cluster inference when no path is given.
pub async fn resolve_config(settings: &ControllerConfig) -> Result<Config, ControllerError> {
    match &settings.kubeconfig {
        Some(path) => {
            debug!("Loading kubeconfig from {}", path.display());
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|e| ControllerError::ConfigResolution(e.to_string()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| ControllerError::ConfigResolution(e.to_string()))
        }
        None => {
            debug!("No kubeconfig path given, inferring config");
            Config::infer()
                .await
                .map_err(|e| ControllerError::ConfigResolution(e.to_string()))
        }
    }
}

/// Build the client used for CRD access.
pub fn crd_client(config: &Config) -> Result<Client, ControllerError> {
    Client::try_from(config.clone()).map_err(|e| ControllerError::ClientConstruction(e.to_string()))
}

/// Build a client whose requests carry `component` as User-Agent.
pub fn client_for_component(
    config: &Config,
    component: &str,
) -> Result<Client, ControllerError> {
    let user_agent = HeaderValue::from_str(component).map_err(|e| {
        ControllerError::ClientConstruction(format!(
            "invalid component name {:?}: {}",
            component, e
        ))
    })?;

    let builder = ClientBuilder::try_from(config.clone())
        .map_err(|e| ControllerError::ClientConstruction(e.to_string()))?;

    Ok(builder
        .with_layer(&SetRequestHeaderLayer::overriding(USER_AGENT, user_agent))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn settings_with_kubeconfig(path: &str) -> ControllerConfig {
        ControllerConfig::try_parse_from([
            "vsphere-controller-manager",
            "--kubeconfig",
            path,
            "--vsphere-url",
            "https://vcenter.example.com",
            "--vsphere-username",
            "user",
            "--vsphere-password",
            "pass",
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn missing_kubeconfig_is_a_config_resolution_error() {
        let settings = settings_with_kubeconfig("/nonexistent/kubeconfig");
        match resolve_config(&settings).await {
            Err(ControllerError::ConfigResolution(message)) => assert!(!message.is_empty()),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected ConfigResolution error"),
        }
    }

    #[test]
    fn component_name_must_be_a_valid_header_value() {
        let config = Config::new("https://kubernetes.default.svc".parse().unwrap());
        let result = client_for_component(&config, "bad\nname");
        assert!(matches!(
            result,
            Err(ControllerError::ClientConstruction(_))
        ));
    }

    #[tokio::test]
    async fn distinct_components_build_distinct_clients() {
        let config = Config::new("https://kubernetes.default.svc".parse().unwrap());
        assert!(client_for_component(&config, "machine-controller-manager").is_ok());
        assert!(client_for_component(&config, "cluster-controller-manager").is_ok());
    }
}
