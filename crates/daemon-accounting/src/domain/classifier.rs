//! Pod classification from controller owner references.

use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;

use super::owner_kind::OwnerKindRegistry;

/// API group of the built-in DaemonSet kind.
pub const BUILTIN_DAEMON_GROUP: &str = "apps";
/// Pre-`apps` API group that also served DaemonSets.
pub const LEGACY_DAEMON_GROUP: &str = "extensions";
pub const BUILTIN_DAEMON_KIND: &str = "DaemonSet";

static EMPTY_REGISTRY: LazyLock<OwnerKindRegistry> = LazyLock::new(OwnerKindRegistry::empty);

/// An owner reference as seen on a pod
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    pub group: String,
    pub version: String,
    pub kind: String,
    /// Whether this owner is the managing controller
    pub controller: bool,
}

impl OwnerRef {
    /// Build an owner reference from its `apiVersion` and `kind`.
    ///
    /// `apps/v1` splits into group `apps` and version `v1`; a bare `v1`
    /// belongs to the core group `""`.
    pub fn from_api_version(api_version: &str, kind: impl Into<String>, controller: bool) -> Self {
        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.into(),
            controller,
        }
    }

    fn is_builtin_daemon(&self) -> bool {
        self.kind == BUILTIN_DAEMON_KIND
            && (self.group == BUILTIN_DAEMON_GROUP || self.group == LEGACY_DAEMON_GROUP)
    }
}

/// How a pod relates to per-node daemon workloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PodClassification {
    /// Controlled by the built-in DaemonSet
    BuiltinDaemon,
    /// Controlled by one of the configured other-daemon owner kinds
    OtherDaemon,
    /// Regular workload, subject to elastic provisioning
    Ordinary,
}

impl PodClassification {
    pub fn is_daemon(self) -> bool {
        !matches!(self, Self::Ordinary)
    }
}

impl fmt::Display for PodClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BuiltinDaemon => "builtin-daemon",
            Self::OtherDaemon => "other-daemon",
            Self::Ordinary => "ordinary",
        };
        f.write_str(name)
    }
}

/// Classify a pod from its owner references.
///
/// Only controller owner references are consulted. A built-in DaemonSet owner
/// always wins over a registry match, whatever the order of the references.
pub fn classify(owners: &[OwnerRef], registry: &OwnerKindRegistry) -> PodClassification {
    let mut controllers = owners.iter().filter(|owner| owner.controller);

    if controllers.clone().any(OwnerRef::is_builtin_daemon) {
        return PodClassification::BuiltinDaemon;
    }

    if controllers.any(|owner| registry.contains(&owner.group, &owner.version, &owner.kind)) {
        return PodClassification::OtherDaemon;
    }

    PodClassification::Ordinary
}

/// Source of the owner-kind registry for call sites that do not hold one directly
pub trait ClassificationContext {
    /// The configured registry, `None` when the feature is not configured.
    fn owner_kind_registry(&self) -> Option<&OwnerKindRegistry>;
}

/// Classify using the registry resolved from `ctx`.
///
/// Without a configured registry this behaves exactly like [`classify`] with
/// an empty registry, i.e. only built-in DaemonSet pods are daemons.
pub fn classify_in_context<C>(ctx: &C, owners: &[OwnerRef]) -> PodClassification
where
    C: ClassificationContext + ?Sized,
{
    let registry = ctx.owner_kind_registry().unwrap_or(&*EMPTY_REGISTRY);
    classify(owners, registry)
}

impl ClassificationContext for OwnerKindRegistry {
    fn owner_kind_registry(&self) -> Option<&OwnerKindRegistry> {
        Some(self)
    }
}
