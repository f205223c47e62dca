use std::path::PathBuf;
use std::time::Duration;

use error_stack::Report;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::watcher;
use kube::runtime::watcher::Config;
use kube::Api;
use kube::Client;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::infrastructure::k8s::event_dispatcher::EventDispatcher;
use crate::infrastructure::k8s::snapshot;
use crate::infrastructure::k8s::types::KubernetesError;
use crate::infrastructure::k8s::types::PodEvent;
use crate::infrastructure::kube_client;

const WATCH_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Informer over all pods of the cluster (or one namespace).
///
/// Every add, update, delete and relist is converted to a [`PodEvent`] and
/// handed to the [`EventDispatcher`], which keeps the daemon pod cache current.
pub struct PodWatcher {
    namespace: Option<String>,
    kubeconfig: Option<PathBuf>,
}

impl PodWatcher {
    pub fn new(kubeconfig: Option<PathBuf>, namespace: Option<String>) -> Self {
        Self {
            namespace,
            kubeconfig,
        }
    }

    /// Watch pods until `cancellation_token` fires.
    ///
    /// The watch is restarted after a fixed delay whenever the stream fails.
    ///
    /// # Errors
    ///
    /// - [`KubernetesError::ConnectionFailed`] if no client can be built
    #[tracing::instrument(skip(self, dispatcher, cancellation_token), fields(namespace = ?self.namespace))]
    pub async fn run(
        &self,
        dispatcher: EventDispatcher,
        cancellation_token: CancellationToken,
    ) -> Result<(), Report<KubernetesError>> {
        info!("Starting pod watcher");
        let client = kube_client::init_kube_client(self.kubeconfig.as_deref()).await?;
        loop {
            select! {
                _ = cancellation_token.cancelled() => {
                    info!("Pod watcher shutdown requested");
                    break;
                }
                result = self.watch_pods(&client, &dispatcher) => {
                    match result {
                        Ok(()) => {
                            warn!("Pod watch stream ended unexpectedly, restarting...");
                        }
                        Err(e) => {
                            error!("Pod watch failed: {e:?}");
                            select! {
                                _ = cancellation_token.cancelled() => break,
                                _ = tokio::time::sleep(WATCH_RETRY_DELAY) => {}
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    async fn watch_pods(
        &self,
        client: &Client,
        dispatcher: &EventDispatcher,
    ) -> Result<(), Report<KubernetesError>> {
        let api: Api<Pod> = match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => Api::namespaced(client.clone(), ns),
            _ => Api::all(client.clone()),
        };

        let mut stream = watcher::watcher(api, Config::default()).boxed();

        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => {
                    if let Some(pod_event) = translate_event(event) {
                        dispatcher.dispatch(pod_event).await?;
                    }
                }
                Err(e) => {
                    return Err(Report::new(KubernetesError::WatchFailed {
                        message: format!("Watch stream error: {e}"),
                    }));
                }
            }
        }

        Ok(())
    }
}

/// Convert a raw watch event, dropping pods that cannot be interpreted.
pub fn translate_event(event: watcher::Event<Pod>) -> Option<PodEvent> {
    match event {
        watcher::Event::Applied(pod) => match snapshot::to_snapshot(&pod) {
            Ok(snapshot) => Some(PodEvent::Applied(snapshot)),
            Err(e) => {
                warn!(pod = ?pod.metadata.name, "Skipping malformed pod: {e}");
                None
            }
        },
        watcher::Event::Deleted(pod) => match snapshot::pod_identity(&pod) {
            Ok(identity) => Some(PodEvent::Deleted(identity)),
            Err(e) => {
                warn!("Skipping malformed pod deletion: {e}");
                None
            }
        },
        watcher::Event::Restarted(pods) => {
            let snapshots = pods
                .iter()
                .filter_map(|pod| match snapshot::to_snapshot(pod) {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        warn!(pod = ?pod.metadata.name, "Skipping malformed pod in relist: {e}");
                        None
                    }
                })
                .collect();
            Some(PodEvent::Restarted(snapshots))
        }
    }
}
