//! The node id space shared between the AST, the checker's type/reference
//! maps, and runtime `Unknown` sets. Kept as a standalone module since all
//! three depend on it without depending on each other.
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mints fresh, strictly increasing ids. Used by the AST factory (parsing),
/// by macro expansion (after renumbering a rewritten subtree), and by the
/// planner when it synthesizes nodes (e.g. constant-folded calls).
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: i64,
}

impl IdGenerator {
    pub fn new() -> IdGenerator {
        IdGenerator { next: 1 }
    }

    /// Start numbering after the highest id already in use, so a generator
    /// seeded from an existing AST never collides with it.
    pub fn starting_after(max_used: NodeId) -> IdGenerator {
        IdGenerator {
            next: max_used.0 + 1,
        }
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// The id that would be minted next, without consuming it.
    pub fn peek(&self) -> NodeId {
        NodeId(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing() {
        let mut gen = IdGenerator::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert!(b.0 > a.0);
    }

    #[test]
    fn starting_after_avoids_collision() {
        let mut gen = IdGenerator::starting_after(NodeId(41));
        assert_eq!(gen.next_id(), NodeId(42));
    }
}
