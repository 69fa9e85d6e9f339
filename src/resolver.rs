//! Finding a project's counterpart on the other instance.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::record::ProjectRecord;

type Predicate = dyn Fn(&ProjectRecord, &ProjectRecord) -> bool + Send + Sync;

/// How a source project is recognised among destination projects.
#[derive(Clone)]
pub enum MatchPolicy {
    /// `name` equal byte for byte.
    ExactName,
    /// `namespace.name/name` equal byte for byte.
    NamespacedName,
    /// Called as `predicate(source, candidate)`.
    Custom(Arc<Predicate>),
}

impl MatchPolicy {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&ProjectRecord, &ProjectRecord) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    pub fn matches(&self, source: &ProjectRecord, candidate: &ProjectRecord) -> bool {
        match self {
            MatchPolicy::ExactName => match (source.name(), candidate.name()) {
                (Some(wanted), Some(name)) => wanted == name,
                _ => false,
            },
            MatchPolicy::NamespacedName => {
                match (source.namespaced_name(), candidate.namespaced_name()) {
                    (Some(wanted), Some(name)) => wanted == name,
                    _ => false,
                }
            }
            MatchPolicy::Custom(predicate) => predicate(source, candidate),
        }
    }
}

impl fmt::Debug for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::ExactName => write!(f, "ExactName"),
            MatchPolicy::NamespacedName => write!(f, "NamespacedName"),
            MatchPolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "exact" => Ok(MatchPolicy::ExactName),
            "namespaced" => Ok(MatchPolicy::NamespacedName),
            other => Err(format!(
                "unknown match policy `{}`, expected `exact` or `namespaced`",
                other
            )),
        }
    }
}

/// Id of the first destination project `policy` accepts, in listing order.
///
/// Several candidates may match; the first one wins without a diagnostic.
/// `None` means there is no counterpart and the caller should skip.
pub fn resolve(
    policy: &MatchPolicy,
    destination: &[ProjectRecord],
    source: &ProjectRecord,
) -> Option<u64> {
    destination
        .iter()
        .find(|candidate| policy.matches(source, candidate))
        .and_then(ProjectRecord::id)
}

pub fn resolve_by_exact_name(destination: &[ProjectRecord], name: &str) -> Option<u64> {
    destination
        .iter()
        .find(|candidate| candidate.name() == Some(name))
        .and_then(ProjectRecord::id)
}
