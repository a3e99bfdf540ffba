//! Merge-alias canonicalization.
//!
//! A merged code points at the code it was folded into. Pointers may chain
//! (`a -> b -> c`), so resolution walks the chain iteratively with a visited
//! set. A cycle, or a merged code with no pointer, resolves to `None`.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::graph::NodeStatus;

/// One code's merge state as read from a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub name: String,
    pub status: NodeStatus,
    pub canonical_pointer: Option<String>,
}

impl MergeRecord {
    pub fn active(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: NodeStatus::Active,
            canonical_pointer: None,
        }
    }

    pub fn merged(name: impl Into<String>, into: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: NodeStatus::Merged,
            canonical_pointer: Some(into.into()),
        }
    }
}

/// Lookup table from code name to its merge pointer.
#[derive(Debug, Clone, Default)]
pub struct CanonicalIndex {
    pointers: HashMap<String, String>,
    merged: HashSet<String>,
}

impl CanonicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = MergeRecord>,
    {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }
        index
    }

    pub fn insert(&mut self, record: MergeRecord) {
        if record.status != NodeStatus::Merged {
            return;
        }
        self.merged.insert(record.name.clone());
        if let Some(target) = record.canonical_pointer.filter(|t| !t.trim().is_empty()) {
            self.pointers.insert(record.name, target);
        }
    }

    /// Number of merged aliases known to the index.
    pub fn alias_count(&self) -> usize {
        self.merged.len()
    }

    pub fn is_merged(&self, name: &str) -> bool {
        self.merged.contains(name)
    }

    /// Resolve a code name to its canonical identity.
    ///
    /// Names the index does not know are their own canonical identity.
    pub fn resolve(&self, name: &str) -> Option<String> {
        let mut current = name;
        let mut visited: HashSet<&str> = HashSet::new();

        loop {
            match self.pointers.get(current) {
                Some(next) => {
                    if !visited.insert(current) {
                        warn!(code = name, at = current, "Merge pointer cycle, code left unresolved");
                        return None;
                    }
                    current = next.as_str();
                }
                None if self.merged.contains(current) => {
                    warn!(code = name, at = current, "Merged code without canonical pointer");
                    return None;
                }
                None => return Some(current.to_string()),
            }
        }
    }

    /// Every name that resolves to `canonical`, the canonical name included.
    pub fn members(&self, canonical: &str) -> Vec<String> {
        let mut members: Vec<String> = self
            .merged
            .iter()
            .filter(|alias| self.resolve(alias).as_deref() == Some(canonical))
            .cloned()
            .collect();
        members.push(canonical.to_string());
        members.sort();
        members.dedup();
        members
    }

    /// Bulk form of [`CanonicalIndex::resolve`].
    pub fn resolve_all<'a, I>(&self, names: I) -> HashMap<String, Option<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(|n| (n.to_string(), self.resolve(n)))
            .collect()
    }
}

/// Tenant-scoped bulk lookup of `code -> canonical code`.
pub trait CanonicalResolver {
    /// Load the merge state of every code in the project.
    fn canonical_index(&self, project_id: &str) -> Result<CanonicalIndex>;

    fn resolve_bulk(&self, project_id: &str, codes: &[String]) -> Result<HashMap<String, Option<String>>> {
        let index = self.canonical_index(project_id)?;
        Ok(index.resolve_all(codes.iter().map(String::as_str)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_name_is_canonical() {
        let index = CanonicalIndex::new();
        assert_eq!(index.resolve("trust"), Some("trust".to_string()));
    }

    #[test]
    fn test_transitive_chain() {
        let index = CanonicalIndex::from_records(vec![
            MergeRecord::merged("a", "b"),
            MergeRecord::merged("b", "c"),
            MergeRecord::active("c"),
        ]);
        assert_eq!(index.resolve("a"), Some("c".to_string()));
        assert_eq!(index.resolve("b"), Some("c".to_string()));
        assert_eq!(index.resolve("c"), Some("c".to_string()));
        assert_eq!(index.alias_count(), 2);
    }

    #[test]
    fn test_cycle_is_unresolved() {
        let index = CanonicalIndex::from_records(vec![
            MergeRecord::merged("a", "b"),
            MergeRecord::merged("b", "c"),
            MergeRecord::merged("c", "a"),
        ]);
        assert_eq!(index.resolve("a"), None);
        assert_eq!(index.resolve("c"), None);
    }

    #[test]
    fn test_self_pointer_is_unresolved() {
        let index = CanonicalIndex::from_records(vec![MergeRecord::merged("a", "a")]);
        assert_eq!(index.resolve("a"), None);
    }

    #[test]
    fn test_merged_without_pointer() {
        let index = CanonicalIndex::from_records(vec![MergeRecord {
            name: "orphan".to_string(),
            status: NodeStatus::Merged,
            canonical_pointer: None,
        }]);
        assert_eq!(index.resolve("orphan"), None);
    }

    #[test]
    fn test_members() {
        let index = CanonicalIndex::from_records(vec![
            MergeRecord::merged("a", "c"),
            MergeRecord::merged("b", "a"),
            MergeRecord::merged("x", "y"),
        ]);
        assert_eq!(index.members("c"), vec!["a", "b", "c"]);
        assert_eq!(index.members("lonely"), vec!["lonely"]);
    }

    #[test]
    fn test_resolve_all() {
        let index = CanonicalIndex::from_records(vec![MergeRecord::merged("old", "new")]);
        let resolved = index.resolve_all(["old", "new", "other"]);
        assert_eq!(resolved["old"], Some("new".to_string()));
        assert_eq!(resolved["other"], Some("other".to_string()));
    }
}
