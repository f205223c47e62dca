//! Fan-out of pod events onto a fixed pool of cache workers.
//!
//! Each pod identity always maps to the same worker, so the events of one pod
//! are applied in delivery order while unrelated pods are applied in parallel.
//! A relist first drains every worker, then replaces the cache contents.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;

use error_stack::Report;
use tokio::select;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;

use super::types::KubernetesError;
use super::types::PodEvent;
use crate::domain::cache::DaemonPodCache;
use crate::domain::cache::PodIdentity;
use crate::domain::cache::PodSnapshot;

const WORKER_QUEUE_CAPACITY: usize = 256;

#[derive(Debug)]
enum WorkerMessage {
    Upsert(PodSnapshot),
    Remove(PodIdentity),
    /// Acknowledged once every earlier message of the worker has been applied
    Flush(oneshot::Sender<()>),
}

/// Routes pod events to the cache workers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    cache: Arc<DaemonPodCache>,
    senders: Vec<mpsc::Sender<WorkerMessage>>,
}

impl EventDispatcher {
    /// Spawn `workers` cache workers (at least one) and return the dispatcher
    /// feeding them together with their task handles.
    pub fn spawn(
        cache: Arc<DaemonPodCache>,
        workers: usize,
        cancellation_token: CancellationToken,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let workers = workers.max(1);
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let (sender, receiver) = mpsc::channel(WORKER_QUEUE_CAPACITY);
            senders.push(sender);
            handles.push(tokio::spawn(run_worker(
                worker_id,
                cache.clone(),
                receiver,
                cancellation_token.clone(),
            )));
        }

        info!(workers = workers, "Started pod event workers");
        (Self { cache, senders }, handles)
    }

    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }

    /// Hand `event` to the worker owning its pod, or resync on a relist.
    ///
    /// # Errors
    ///
    /// - [`KubernetesError::EventDeliveryFailed`] if a worker has stopped
    pub async fn dispatch(&self, event: PodEvent) -> Result<(), Report<KubernetesError>> {
        match event {
            PodEvent::Restarted(snapshots) => {
                self.flush().await?;
                let dropped = self.cache.resync(&snapshots);
                info!(
                    listed = snapshots.len(),
                    dropped = dropped,
                    "Resynced daemon pod cache from relist"
                );
                Ok(())
            }
            PodEvent::Applied(snapshot) => {
                let worker = self.worker_for(&snapshot.identity);
                self.send(worker, WorkerMessage::Upsert(snapshot)).await
            }
            PodEvent::Deleted(identity) => {
                let worker = self.worker_for(&identity);
                self.send(worker, WorkerMessage::Remove(identity)).await
            }
        }
    }

    /// Wait until every worker has applied everything queued so far.
    pub async fn flush(&self) -> Result<(), Report<KubernetesError>> {
        let mut acks = Vec::with_capacity(self.senders.len());
        for worker in 0..self.senders.len() {
            let (ack_sender, ack_receiver) = oneshot::channel();
            self.send(worker, WorkerMessage::Flush(ack_sender)).await?;
            acks.push(ack_receiver);
        }
        for ack in acks {
            ack.await.map_err(|_| {
                Report::new(KubernetesError::EventDeliveryFailed {
                    message: "worker stopped before acknowledging flush".to_string(),
                })
            })?;
        }
        Ok(())
    }

    fn worker_for(&self, identity: &PodIdentity) -> usize {
        let mut hasher = DefaultHasher::new();
        identity.hash(&mut hasher);
        (hasher.finish() % self.senders.len() as u64) as usize
    }

    async fn send(
        &self,
        worker: usize,
        message: WorkerMessage,
    ) -> Result<(), Report<KubernetesError>> {
        self.senders[worker].send(message).await.map_err(|e| {
            Report::new(KubernetesError::EventDeliveryFailed {
                message: format!("worker {worker} is not running"),
            })
            .attach_printable(format!("Channel error: {e}"))
        })
    }
}

#[tracing::instrument(skip(cache, receiver, cancellation_token))]
async fn run_worker(
    worker_id: usize,
    cache: Arc<DaemonPodCache>,
    mut receiver: mpsc::Receiver<WorkerMessage>,
    cancellation_token: CancellationToken,
) {
    loop {
        select! {
            _ = cancellation_token.cancelled() => {
                info!("Pod event worker shutdown requested");
                break;
            }
            message = receiver.recv() => {
                match message {
                    Some(WorkerMessage::Upsert(snapshot)) => {
                        cache.upsert(&snapshot);
                    }
                    Some(WorkerMessage::Remove(identity)) => {
                        cache.remove(&identity);
                    }
                    Some(WorkerMessage::Flush(ack)) => {
                        // The dispatcher may have given up waiting
                        let _ = ack.send(());
                    }
                    None => {
                        debug!("Pod event channel closed");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;
    use crate::domain::classifier::OwnerRef;
    use crate::domain::owner_kind::OwnerKindRegistry;
    use crate::domain::quantity::ResourceList;

    fn cache() -> Arc<DaemonPodCache> {
        let registry = Arc::new(
            OwnerKindRegistry::parse(["custom.io/v1/CustomDaemon"]).expect("registry should parse"),
        );
        Arc::new(DaemonPodCache::new(registry))
    }

    fn daemon(name: &str, node: &str, cpu: &str) -> PodSnapshot {
        PodSnapshot::new(PodIdentity::new("kube-system", name))
            .with_node(node)
            .with_owner(OwnerRef::from_api_version("custom.io/v1", "CustomDaemon", true))
            .with_requests(ResourceList::parse([("cpu", cpu)]).expect("cpu should parse"))
    }

    #[test(tokio::test)]
    async fn applies_events_in_order_per_pod() {
        let cache = cache();
        let token = CancellationToken::new();
        let (dispatcher, _handles) = EventDispatcher::spawn(cache.clone(), 4, token.clone());

        for i in 0..50 {
            let name = format!("agent-{i}");
            dispatcher
                .dispatch(PodEvent::Applied(daemon(&name, "n1", "100m")))
                .await
                .unwrap();
            dispatcher
                .dispatch(PodEvent::Applied(daemon(&name, "n2", "200m")))
                .await
                .unwrap();
            if i % 2 == 0 {
                dispatcher
                    .dispatch(PodEvent::Deleted(PodIdentity::new("kube-system", name)))
                    .await
                    .unwrap();
            }
        }
        dispatcher.flush().await.unwrap();

        assert_eq!(cache.len(), 25);
        assert!(cache.pods_on_node("n1").is_empty());
        assert_eq!(cache.pods_on_node("n2").len(), 25);
        token.cancel();
    }

    #[test(tokio::test)]
    async fn delete_follows_apply_onto_same_worker() {
        let cache = cache();
        let token = CancellationToken::new();
        let (dispatcher, _handles) = EventDispatcher::spawn(cache.clone(), 8, token.clone());

        for i in 0..32 {
            let identity = PodIdentity::new("kube-system", format!("agent-{i}"));
            dispatcher
                .dispatch(PodEvent::Applied(daemon(&identity.name, "n1", "100m")))
                .await
                .unwrap();
            dispatcher.dispatch(PodEvent::Deleted(identity)).await.unwrap();
        }
        dispatcher.flush().await.unwrap();

        assert!(cache.is_empty());
        token.cancel();
    }

    #[test(tokio::test)]
    async fn relist_replaces_cache_contents() {
        let cache = cache();
        let token = CancellationToken::new();
        let (dispatcher, _handles) = EventDispatcher::spawn(cache.clone(), 2, token.clone());

        dispatcher
            .dispatch(PodEvent::Applied(daemon("stale", "n1", "100m")))
            .await
            .unwrap();
        dispatcher
            .dispatch(PodEvent::Restarted(vec![daemon("fresh", "n2", "100m")]))
            .await
            .unwrap();

        assert!(!cache.contains(&PodIdentity::new("kube-system", "stale")));
        assert!(cache.contains(&PodIdentity::new("kube-system", "fresh")));
        token.cancel();
    }

    #[test(tokio::test)]
    async fn zero_workers_still_spawns_one() {
        let token = CancellationToken::new();
        let (dispatcher, handles) = EventDispatcher::spawn(cache(), 0, token.clone());

        assert_eq!(dispatcher.worker_count(), 1);
        assert_eq!(handles.len(), 1);
        token.cancel();
    }

    #[test(tokio::test)]
    async fn dispatch_fails_after_workers_stop() {
        let token = CancellationToken::new();
        let (dispatcher, handles) = EventDispatcher::spawn(cache(), 1, token.clone());
        token.cancel();
        for handle in handles {
            handle.await.unwrap();
        }

        let result = dispatcher
            .dispatch(PodEvent::Applied(daemon("late", "n1", "100m")))
            .await;
        assert!(result.is_err());
    }
}
