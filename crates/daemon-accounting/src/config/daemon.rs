use std::path::PathBuf;

use clap::Parser;

use crate::domain::owner_kind::ConfigError;
use crate::domain::owner_kind::OwnerKindRegistry;

#[derive(Debug, Clone, Parser)]
pub struct DaemonArgs {
    #[arg(
        long,
        env = "OTHER_DAEMON_OWNER_KINDS",
        value_delimiter = ',',
        help = "Comma separated group/version/kind of controllers whose pods are daemon pods"
    )]
    pub other_daemon_owner_kinds: Vec<String>,

    #[arg(
        long,
        help = "Enable Kubernetes pod watching",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub enable_k8s: bool,

    #[arg(
        long,
        help = "Kubernetes namespace to watch (empty for all namespaces)"
    )]
    pub k8s_namespace: Option<String>,

    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (defaults to cluster config or ~/.kube/config)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        default_value = "4",
        help = "Number of workers applying pod events to the cache"
    )]
    pub event_workers: usize,

    #[arg(
        long,
        env = "API_LISTEN_ADDR",
        default_value = "0.0.0.0:8080",
        help = "HTTP API server listen address"
    )]
    pub api_listen_addr: String,

    #[arg(
        long,
        help = "Enable the HTTP API server",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub enable_api: bool,

    #[arg(
        long,
        env = utils::logging::LOG_PATH_ENV_VAR,
        value_hint = clap::ValueHint::FilePath,
        help = "Path of a daily rolling log file, in addition to stderr"
    )]
    pub log_path: Option<PathBuf>,
}

impl DaemonArgs {
    /// Parse the configured owner kinds.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MalformedOwnerKind`] for the first malformed entry
    pub fn owner_kind_registry(&self) -> Result<OwnerKindRegistry, ConfigError> {
        OwnerKindRegistry::parse(&self.other_daemon_owner_kinds)
    }
}
