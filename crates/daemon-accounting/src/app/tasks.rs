use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::server::ApiServer;
use crate::app::core::Application;
use crate::infrastructure::k8s::EventDispatcher;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Task manager, responsible for starting and managing all background tasks
pub struct Tasks {
    pub tasks: Vec<JoinHandle<()>>,
    cancellation_token: CancellationToken,
}

impl Default for Tasks {
    fn default() -> Self {
        Self::new()
    }
}

impl Tasks {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start all background tasks
    pub fn spawn_all_tasks(&mut self, app: &Application) {
        let cli = app.daemon_args();

        if cli.enable_k8s {
            let (dispatcher, workers) = EventDispatcher::spawn(
                app.services().cache.clone(),
                cli.event_workers,
                self.cancellation_token.clone(),
            );
            self.tasks.extend(workers);

            let k8s_task = self.spawn_k8s_watcher_task(app, dispatcher);
            self.tasks.push(k8s_task);
        } else {
            tracing::warn!("Kubernetes watching disabled, daemon pod cache will stay empty");
        }

        if cli.enable_api {
            let api_server_task = self.spawn_api_server_task(app);
            self.tasks.push(api_server_task);
        }
    }

    /// Wait for tasks to complete or receive shutdown signal
    pub async fn wait_for_completion(&mut self) -> Result<()> {
        let signal_handler = spawn_signal_handler()?;

        if self.tasks.is_empty() {
            if let Err(e) = signal_handler.await {
                tracing::error!("Signal handler failed: {e}");
            }
            tracing::info!("Shutdown signal received, no tasks were running");
            return Ok(());
        }

        tokio::select! {
            _ = signal_handler => {
                tracing::info!("Shutdown signal received, cancelling all tasks");
                self.cancellation_token.cancel();
                self.wait_for_tasks_with_timeout(SHUTDOWN_TIMEOUT).await;
            }
            // Wait for any task to complete unexpectedly
            result = futures::future::select_all(&mut self.tasks) => {
                let (result, _index, _remaining) = result;
                self.cancellation_token.cancel();
                if let Err(e) = result {
                    tracing::error!("Task completed with error: {e}");
                    return Err(e.into());
                }
                tracing::warn!("Task completed unexpectedly, shutting down");
            }
        }

        Ok(())
    }

    async fn wait_for_tasks_with_timeout(&mut self, timeout: Duration) {
        tokio::time::timeout(timeout, async {
            for task in &mut self.tasks {
                if let Err(e) = task.await {
                    tracing::error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await
        .unwrap_or_else(|_| {
            tracing::warn!("Task shutdown timed out after {:?}", timeout);
        });
    }

    fn spawn_k8s_watcher_task(
        &self,
        app: &Application,
        dispatcher: EventDispatcher,
    ) -> JoinHandle<()> {
        let token = self.cancellation_token.clone();
        let pod_watcher = app.services().pod_watcher.clone();
        tokio::spawn(async move {
            tracing::info!("Starting Kubernetes pod watcher task");
            if let Err(e) = pod_watcher.run(dispatcher, token).await {
                tracing::error!("Kubernetes pod watcher failed: {e:?}");
            } else {
                tracing::info!("Kubernetes pod watcher completed");
            }
        })
    }

    fn spawn_api_server_task(&self, app: &Application) -> JoinHandle<()> {
        let accountant = app.services().accountant.clone();
        let listen_addr = app.daemon_args().api_listen_addr.clone();
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            let api_server = ApiServer::new(accountant, listen_addr);
            if let Err(e) = api_server.run(token).await {
                tracing::error!("API server failed: {e:?}");
            } else {
                tracing::info!("API server completed");
            }
        })
    }
}

fn spawn_signal_handler() -> Result<JoinHandle<()>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::signal;
        use tokio::signal::unix::SignalKind;
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        Ok(tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                }
            }
        }))
    }
    #[cfg(not(unix))]
    {
        Ok(tokio::spawn(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Received Ctrl+C, initiating graceful shutdown"),
                Err(e) => tracing::error!("Failed to listen for Ctrl+C: {e}"),
            }
        }))
    }
}
