//! Channel hierarchy and Distributary resolution
//!
//! The hierarchy is a parent-pointer forest keyed by channel name. Minors and
//! watercourses that are not listed in the taxonomy inherit the classification
//! of their nearest Distributary ancestor, found by walking parent links upward.

use crate::data::HierarchyRecord;
use rustc_hash::{FxHashMap, FxHashSet};

/// Channel type tag marking a Distributary in the source data
pub const DEFAULT_DISTRIBUTARY_TAG: &str = "D";

/// Identifier-keyed lookup tables built from the hierarchy rows
#[derive(Debug, Clone, Default)]
pub struct ChannelHierarchy {
    /// channel -> parent channel
    parents: FxHashMap<String, String>,
    /// channel -> channel type tag
    types: FxHashMap<String, String>,
    distributary_tag: String,
}

impl ChannelHierarchy {
    /// Build the lookup tables
    ///
    /// Keys and values are trimmed. A later row for the same channel replaces
    /// the earlier one. Rows without a parent produce no parent entry.
    pub fn from_records(records: &[HierarchyRecord], distributary_tag: &str) -> Self {
        let mut parents = FxHashMap::default();
        let mut types = FxHashMap::default();

        for record in records {
            let name = record.channel_name.trim();
            if name.is_empty() {
                continue;
            }

            match clean(record.parent_channel.as_deref()) {
                Some(parent) => {
                    parents.insert(name.to_string(), parent.to_string());
                }
                None => {
                    parents.remove(name);
                }
            }

            match clean(record.channel_type.as_deref()) {
                Some(kind) => {
                    types.insert(name.to_string(), kind.to_string());
                }
                None => {
                    types.remove(name);
                }
            }
        }

        Self {
            parents,
            types,
            distributary_tag: distributary_tag.trim().to_string(),
        }
    }

    /// Number of distinct channels with a parent or a type entry
    pub fn len(&self) -> usize {
        let typed_only = self.types.keys().filter(|k| !self.parents.contains_key(*k)).count();
        self.parents.len() + typed_only
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty() && self.types.is_empty()
    }

    pub fn is_distributary(&self, channel: &str) -> bool {
        self.types
            .get(channel.trim())
            .is_some_and(|kind| *kind == self.distributary_tag)
    }

    /// Nearest Distributary ancestor of `canal`
    ///
    /// Walks parent links iteratively. Returns `None` when the current node has
    /// no parent entry, points at itself, points at a channel that has no parent
    /// entry of its own (and is not a Distributary), or when a node repeats.
    pub fn find_distributary(&self, canal: &str) -> Option<&str> {
        let mut current = canal.trim();
        let mut visited: FxHashSet<&str> = FxHashSet::default();

        loop {
            if !visited.insert(current) {
                tracing::warn!("Cycle in channel hierarchy at '{}' while resolving '{}'", current, canal.trim());
                return None;
            }

            let parent = self.parents.get(current)?.as_str();

            if self.is_distributary(parent) {
                return Some(parent);
            }

            if parent == current || !self.parents.contains_key(parent) {
                return None;
            }

            current = parent;
        }
    }

    /// Number of parent hops from `canal` to its nearest Distributary
    pub fn depth_to_distributary(&self, canal: &str) -> Option<usize> {
        let target = self.find_distributary(canal)?;
        let mut current = canal.trim();
        let mut hops = 0;

        while current != target || hops == 0 {
            current = self.parents.get(current)?.as_str();
            hops += 1;
        }

        Some(hops)
    }
}

fn clean(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
