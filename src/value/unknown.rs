//! Unknown value sets, produced when an activation marks an attribute as
//! unknown during partial evaluation (§4.6/§7). An `UnknownSet` tracks the
//! ids of every expression whose value could not be determined; combining
//! operations union the sets rather than picking one arbitrarily, so the
//! final residual expression can cite every contributing unknown.
use std::collections::BTreeSet;

use crate::ids::NodeId;

#[derive(Clone, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct UnknownSet {
    ids: BTreeSet<NodeId>,
}

impl UnknownSet {
    pub fn new() -> UnknownSet {
        UnknownSet::default()
    }

    pub fn single(id: NodeId) -> UnknownSet {
        let mut ids = BTreeSet::new();
        ids.insert(id);
        UnknownSet { ids }
    }

    pub fn merge(&self, other: &UnknownSet) -> UnknownSet {
        UnknownSet {
            ids: self.ids.union(&other.ids).copied().collect(),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.ids.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_unions_ids() {
        let a = UnknownSet::single(NodeId(1));
        let b = UnknownSet::single(NodeId(2));
        let merged = a.merge(&b);
        assert_eq!(merged.ids().count(), 2);
    }
}
