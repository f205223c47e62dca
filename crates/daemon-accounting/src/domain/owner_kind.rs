//! Operator-configured owner kinds whose pods behave like daemon pods.
//!
//! The registry is parsed once at startup from `group/version/kind` strings and
//! is immutable afterwards. The built-in `DaemonSet` kind is never stored here;
//! the classifier checks it on its own so that it cannot be configured away.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

/// Errors raised while parsing owner-kind configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "invalid owner kind at index {index}: `{entry}` (expected `group/version/kind` with three non-empty segments)"
    )]
    MalformedOwnerKind { index: usize, entry: String },
}

/// A group/version/kind triple identifying an owning resource type
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct OwnerKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl OwnerKind {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Parse one `group/version/kind` entry, `index` is only used for the error.
    fn parse_entry(index: usize, raw: &str) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::MalformedOwnerKind {
            index,
            entry: raw.to_string(),
        };

        let mut segments = raw.trim().split('/');
        let (Some(group), Some(version), Some(kind), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(malformed());
        };

        if group.is_empty() || version.is_empty() || kind.is_empty() {
            return Err(malformed());
        }

        Ok(Self::new(group, version, kind))
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.version, self.kind)
    }
}

/// Immutable set of owner kinds treated as "other daemon" controllers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerKindRegistry {
    kinds: BTreeSet<OwnerKind>,
    /// kind -> group -> versions
    index: HashMap<String, HashMap<String, HashSet<String>>>,
}

impl OwnerKindRegistry {
    /// An empty registry; classification degrades to built-in daemon detection only.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a list of `group/version/kind` strings.
    ///
    /// Duplicate entries are collapsed. The first malformed entry aborts parsing.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MalformedOwnerKind`] naming the offending entry and its index
    pub fn parse<I, S>(raw: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let kinds = raw
            .into_iter()
            .enumerate()
            .map(|(index, entry)| OwnerKind::parse_entry(index, entry.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let mut index: HashMap<String, HashMap<String, HashSet<String>>> = HashMap::new();
        for owner_kind in &kinds {
            index
                .entry(owner_kind.kind.clone())
                .or_default()
                .entry(owner_kind.group.clone())
                .or_default()
                .insert(owner_kind.version.clone());
        }

        Ok(Self { kinds, index })
    }

    /// O(1) membership check on the exact triple, without allocating.
    pub fn contains(&self, group: &str, version: &str, kind: &str) -> bool {
        self.index
            .get(kind)
            .and_then(|groups| groups.get(group))
            .is_some_and(|versions| versions.contains(version))
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Entries in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &OwnerKind> {
        self.kinds.iter()
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn parse_accepts_well_formed_entries() {
        let registry =
            OwnerKindRegistry::parse(["custom.io/v1/CustomDaemon", "acme.dev/v1beta1/NodeAgent"])
                .expect("should parse well-formed entries");

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("custom.io", "v1", "CustomDaemon"));
        assert!(registry.contains("acme.dev", "v1beta1", "NodeAgent"));
    }

    #[test]
    fn parse_deduplicates_repeated_entries() {
        let registry =
            OwnerKindRegistry::parse(["g/v/K", "g/v/K"]).expect("duplicates are not an error");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn parse_rejects_entry_without_three_segments() {
        let err = OwnerKindRegistry::parse(["bad-string"]).expect_err("should reject");
        assert_eq!(
            err,
            ConfigError::MalformedOwnerKind {
                index: 0,
                entry: "bad-string".to_string()
            }
        );
    }

    #[test]
    fn parse_reports_index_of_offending_entry() {
        let err = OwnerKindRegistry::parse(["g/v/K", "g/v/K/extra", "x//Y"])
            .expect_err("should reject the second entry");
        assert_eq!(
            err,
            ConfigError::MalformedOwnerKind {
                index: 1,
                entry: "g/v/K/extra".to_string()
            }
        );
        assert!(err.to_string().contains("g/v/K/extra"));
    }

    #[test]
    fn parse_rejects_empty_segments() {
        for raw in ["/v1/Kind", "group//Kind", "group/v1/", "", "  "] {
            assert!(
                OwnerKindRegistry::parse([raw]).is_err(),
                "entry {raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_trims_surrounding_whitespace() {
        let registry = OwnerKindRegistry::parse([" custom.io/v1/CustomDaemon "])
            .expect("should trim whitespace");
        assert!(registry.contains("custom.io", "v1", "CustomDaemon"));
    }

    #[test]
    fn contains_requires_exact_triple() {
        let registry = OwnerKindRegistry::parse(["custom.io/v1/CustomDaemon"]).expect("parse");

        assert!(!registry.contains("custom.io", "v2", "CustomDaemon"));
        assert!(!registry.contains("custom.io", "v1", "customdaemon"));
        assert!(!registry.contains("other.io", "v1", "CustomDaemon"));
    }

    #[test]
    fn contains_distinguishes_versions_and_groups_of_one_kind() {
        let registry = OwnerKindRegistry::parse([
            "custom.io/v1/Agent",
            "custom.io/v2/Agent",
            "acme.dev/v1/Agent",
        ])
        .expect("parse");

        assert!(registry.contains("custom.io", "v1", "Agent"));
        assert!(registry.contains("custom.io", "v2", "Agent"));
        assert!(registry.contains("acme.dev", "v1", "Agent"));
        assert!(!registry.contains("acme.dev", "v2", "Agent"));
        assert!(!registry.contains("custom.io", "v3", "Agent"));
        assert!(!registry.contains("custom.io", "v1", "Other"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn iter_is_sorted_and_displays_as_gvk() {
        let registry =
            OwnerKindRegistry::parse(["z.io/v1/Zeta", "a.io/v1/Alpha"]).expect("parse");
        let rendered: Vec<String> = registry.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["a.io/v1/Alpha", "z.io/v1/Zeta"]);
    }
}
