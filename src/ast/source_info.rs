//! Node id → source position, kept external to the AST (§3.4). Also
//! records macro call sites pre-expansion (§4.7) so diagnostics and
//! unparsing can recover the original surface syntax a macro rewrote away.
use std::collections::HashMap;

use crate::ids::NodeId;
use crate::lexer::Position;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceInfo {
    positions: HashMap<NodeId, (Position, Position)>,
    /// Ids of nodes synthesized by macro expansion, mapped back to the
    /// macro call's own (now-discarded) id for "called from a macro" diagnostics.
    macro_calls: HashMap<NodeId, String>,
}

impl SourceInfo {
    pub fn new() -> SourceInfo {
        SourceInfo::default()
    }

    pub fn record(&mut self, id: NodeId, start: Position, end: Position) {
        self.positions.insert(id, (start, end));
    }

    pub fn position(&self, id: NodeId) -> Option<(Position, Position)> {
        self.positions.get(&id).copied()
    }

    pub fn record_macro_call(&mut self, root: NodeId, macro_name: impl Into<String>) {
        self.macro_calls.insert(root, macro_name.into());
    }

    pub fn macro_call(&self, id: NodeId) -> Option<&str> {
        self.macro_calls.get(&id).map(String::as_str)
    }
}
