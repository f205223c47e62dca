use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;

use crate::app::core::Application;
use crate::app::services::ApplicationServices;
use crate::config::DaemonArgs;
use crate::domain::accountant::NodeCapacityAccountant;
use crate::domain::cache::DaemonPodCache;
use crate::infrastructure::k8s::PodWatcher;

/// Application builder
pub struct ApplicationBuilder {
    daemon_args: DaemonArgs,
}

impl ApplicationBuilder {
    pub fn new(daemon_args: DaemonArgs) -> Self {
        Self { daemon_args }
    }

    /// Build the complete application.
    ///
    /// Fails when the owner kind configuration is malformed.
    pub fn build(self) -> Result<Application> {
        tracing::info!("Building application components...");

        let registry = Arc::new(
            self.daemon_args
                .owner_kind_registry()
                .context("invalid --other-daemon-owner-kinds configuration")?,
        );
        tracing::info!(
            owner_kinds = registry.len(),
            "Loaded other-daemon owner kinds: [{}]",
            registry
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let cache = Arc::new(DaemonPodCache::new(registry.clone()));
        let accountant = Arc::new(NodeCapacityAccountant::new(registry.clone(), cache.clone()));
        let pod_watcher = Arc::new(PodWatcher::new(
            self.daemon_args.kubeconfig.clone(),
            self.daemon_args.k8s_namespace.clone(),
        ));

        let services = ApplicationServices {
            registry,
            cache,
            accountant,
            pod_watcher,
        };
        Ok(Application::new(services, self.daemon_args))
    }
}
