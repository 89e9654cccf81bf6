//! Causation chains — the nesting history behind a dispatch.
//!
//! A chain is the ordered list of intent kinds that led to the current
//! operation's execution. Chains are append-only and extended by copy, never
//! mutated: a parent's chain is unchanged by anything a nested dispatch does.

use serde::{Deserialize, Serialize};

/// Ordered list of intent kinds describing why an operation is running.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CausationChain(Vec<String>);

impl CausationChain {
    /// The empty chain of a top-level dispatch.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a chain from a sequence of kinds.
    #[must_use]
    pub fn from_kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(kinds.into_iter().map(Into::into).collect())
    }

    /// Copy of this chain with one kind appended.
    #[must_use]
    pub fn child(&self, kind: &str) -> Self {
        let mut kinds = self.0.clone();
        kinds.push(kind.to_owned());
        Self(kinds)
    }

    /// Copy of this chain with another chain appended.
    #[must_use]
    pub fn extended(&self, tail: &CausationChain) -> Self {
        let mut kinds = self.0.clone();
        kinds.extend(tail.0.iter().cloned());
        Self(kinds)
    }

    /// The kinds, outermost first.
    #[must_use]
    pub fn kinds(&self) -> &[String] {
        &self.0
    }

    /// Whether this is a top-level chain.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Chain depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the chain is empty. Alias of [`is_root`](Self::is_root).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The innermost kind, if any.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Whether the chain contains a kind.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.0.iter().any(|k| k == kind)
    }
}

impl std::fmt::Display for CausationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(" -> "))
    }
}
