//! Kubernetes Event recording for the provisioning controllers.
//!
//! Each component identity ("machine-controller-manager",
//! "cluster-controller-manager") gets its own publisher so events carry the
//! right source attribution. Every event is logged at info level and then
//! forwarded to the cluster Events API.
//!
//! Publishing is fire-and-forget: failures are logged as warnings and never
//! propagate errors. A failed event must never break reconciliation.

use crate::error::ControllerError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{EventType, Recorder, Reporter};
use kube::{Client, Resource};
use tracing::{info, warn};

/// Trait for publishing Kubernetes Events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// The component name events are attributed to.
    fn component(&self) -> &str;

    /// Publish an event about the given resource.
    ///
    /// # Arguments
    ///
    /// * `resource_ref` - The Kubernetes object this event is about
    /// * `type_` - Normal or Warning
    /// * `reason` - Machine-readable reason string (e.g. "MachineCreated")
    /// * `action` - What action was taken (e.g. "Provision")
    /// * `note` - Optional human-readable message
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Production implementation wrapping `kube::runtime::events::Recorder`.
pub struct KubeEventPublisher {
    component: String,
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Create a new publisher attributed to `component`.
    ///
    /// The component name appears as the reporting controller on Events and
    /// must be non-empty.
    pub fn new(client: Client, component: &str) -> Result<Self, ControllerError> {
        if component.is_empty() {
            return Err(ControllerError::RecorderConstruction(
                "component name must not be empty".to_string(),
            ));
        }
        let reporter = Reporter {
            controller: component.to_string(),
            instance: None,
        };
        Ok(Self {
            component: component.to_string(),
            recorder: Recorder::new(client, reporter),
        })
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    fn component(&self) -> &str {
        &self.component
    }

    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        info!(
            component = %self.component,
            reason,
            action,
            object = resource_ref.name.as_deref().unwrap_or("<unnamed>"),
            note = note.as_deref().unwrap_or(""),
            "Recording event"
        );
        let event = kube::runtime::events::Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(
                component = %self.component,
                reason,
                action,
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}

/// No-op implementation for tests.
pub struct NoopEventPublisher {
    component: String,
}

impl NoopEventPublisher {
    /// Create a no-op publisher carrying `component` for assertions.
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
        }
    }
}

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    fn component(&self) -> &str {
        &self.component
    }

    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
        // intentionally empty
    }
}

/// Build an `ObjectReference` for a namespaced custom resource.
pub fn object_ref<K>(obj: &K) -> ObjectReference
where
    K: Resource<DynamicType = ()>,
{
    let meta = obj.meta();
    ObjectReference {
        api_version: Some(K::api_version(&()).into_owned()),
        kind: Some(K::kind(&()).into_owned()),
        name: meta.name.clone(),
        namespace: meta.namespace.clone(),
        uid: meta.uid.clone(),
        ..ObjectReference::default()
    }
}

/// Well-known event reason strings.
pub mod reasons {
    /// VM created and powered on for a Machine
    pub const MACHINE_CREATED: &str = "MachineCreated";
    /// VM creation failed
    pub const MACHINE_CREATE_FAILED: &str = "MachineCreateFailed";
    /// VM deleted for a Machine
    pub const MACHINE_DELETED: &str = "MachineDeleted";
    /// VM deletion failed
    pub const MACHINE_DELETE_FAILED: &str = "MachineDeleteFailed";
    /// Cluster infrastructure created
    pub const CLUSTER_CREATED: &str = "ClusterCreated";
    /// Cluster infrastructure creation failed
    pub const CLUSTER_CREATE_FAILED: &str = "ClusterCreateFailed";
    /// Cluster infrastructure deleted
    pub const CLUSTER_DELETED: &str = "ClusterDeleted";
    /// Cluster infrastructure deletion failed
    pub const CLUSTER_DELETE_FAILED: &str = "ClusterDeleteFailed";
}

/// Well-known event action strings.
pub mod actions {
    /// Creating platform resources
    pub const PROVISION: &str = "Provision";
    /// Deleting platform resources
    pub const DELETE: &str = "Delete";
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Config;

    fn test_client() -> Client {
        let config = Config::new("https://kubernetes.default.svc".parse().unwrap());
        Client::try_from(config).unwrap()
    }

    #[tokio::test]
    async fn empty_component_is_rejected() {
        let result = KubeEventPublisher::new(test_client(), "");
        assert!(matches!(
            result,
            Err(ControllerError::RecorderConstruction(_))
        ));
    }

    #[tokio::test]
    async fn publishers_carry_distinct_components() {
        let machine = KubeEventPublisher::new(test_client(), "machine-controller-manager").unwrap();
        let cluster = KubeEventPublisher::new(test_client(), "cluster-controller-manager").unwrap();
        assert_eq!(machine.component(), "machine-controller-manager");
        assert_eq!(cluster.component(), "cluster-controller-manager");
        assert_ne!(machine.component(), cluster.component());
    }

    #[test]
    fn object_ref_carries_kind_and_name() {
        let machine = crds::Machine::new(
            "node-0",
            crds::MachineSpec {
                cluster_ref: crds::ClusterRef {
                    name: "test-cluster".to_string(),
                    namespace: None,
                },
                provider_config: crds::MachineProviderConfig {
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
        );
        let reference = object_ref(&machine);
        assert_eq!(reference.kind.as_deref(), Some("Machine"));
        assert_eq!(reference.api_version.as_deref(), Some("cluster.k8s.io/v1alpha1"));
        assert_eq!(reference.name.as_deref(), Some("node-0"));
    }

    #[tokio::test]
    async fn noop_publisher_does_not_panic() {
        let publisher = NoopEventPublisher::new("machine-controller-manager");
        publisher
            .publish(
                &ObjectReference::default(),
                EventType::Normal,
                reasons::MACHINE_CREATED,
                actions::PROVISION,
                Some("test".to_string()),
            )
            .await;
    }
}
