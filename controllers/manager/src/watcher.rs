//! Kubernetes resource watchers.
//!
//! Wraps `kube_runtime::Controller` so each CRD kind gets a watch loop with
//! automatic reconnection, debounce, bounded concurrency, and a
//! requeue-on-error policy. Retry and backoff live here; the bootstrap path
//! stays fail-fast.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::{Cluster, Machine};
use futures::StreamExt;
use kube::Api;
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Generic watch loop over one resource kind.
///
/// The reconcile_fn adapts the reconciler's `&K -> Result<(), _>` methods to
/// the controller's `Action`-returning signature.
async fn watch_resource<K, F>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &str,
    requeue_interval: Duration,
) -> Result<(), ControllerError>
where
    K: kube::Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Action, ControllerError>> + Send>> + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    // Error policy: requeue after the configured interval
    let error_policy = {
        let resource_name = resource_name.to_string();
        move |_obj: Arc<K>, error: &ControllerError, _ctx: Arc<Reconciler>| {
            error!("Reconciliation error for {}: {}", resource_name, error);
            Action::requeue(requeue_interval)
        }
    };

    let reconcile = {
        let resource_name = resource_name.to_string();
        move |obj: Arc<K>, ctx: Arc<Reconciler>| {
            let reconcile_fn = reconcile_fn.clone();
            let resource_name = resource_name.clone();
            async move {
                debug!("Reconciling {} {:?}", resource_name, obj.meta().name);
                reconcile_fn(ctx, obj).await
            }
        }
    };

    // Debounce batches bursts of status updates; concurrency bounds the
    // number of in-flight reconciliations per kind
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| {
            let resource_name = resource_name.to_string();
            async move {
                if let Err(e) = res {
                    error!("Controller error for {}: {}", resource_name, e);
                }
            }
        })
        .await;

    Ok(())
}

/// Watches Machine and Cluster resources for changes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    machine_api: Api<Machine>,
    cluster_api: Api<Cluster>,
    requeue_interval: Duration,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        reconciler: Arc<Reconciler>,
        machine_api: Api<Machine>,
        cluster_api: Api<Cluster>,
        requeue_interval: Duration,
    ) -> Self {
        Self {
            reconciler,
            machine_api,
            cluster_api,
            requeue_interval,
        }
    }

    /// Starts watching Machine resources.
    pub async fn watch_machines(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.machine_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| {
                Box::pin(async move {
                    match reconciler.reconcile_machine(&resource).await {
                        Ok(()) => Ok(Action::await_change()),
                        Err(e) => Err(e),
                    }
                })
            },
            "Machine",
            self.requeue_interval,
        )
        .await
    }

    /// Starts watching Cluster resources.
    pub async fn watch_clusters(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.cluster_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| {
                Box::pin(async move {
                    match reconciler.reconcile_cluster(&resource).await {
                        Ok(()) => Ok(Action::await_change()),
                        Err(e) => Err(e),
                    }
                })
            },
            "Cluster",
            self.requeue_interval,
        )
        .await
    }
}
