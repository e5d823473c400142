//! The checked AST (§3.4): an [`AstNode`] tree paired with external
//! `type_map`/`reference_map`/`source_info`. Kept external rather than
//! threaded through the node (unlike the teacher's `Expression<T>` type
//! slot) because §6.3 requires the three maps to serialize independently
//! of the tree for interchange between a checking process and an
//! evaluating one.
use std::collections::HashMap;

use crate::ast::{AstNode, SourceInfo};
use crate::ids::NodeId;
use crate::value::types::Type;
use crate::value::Value;

/// What a resolved node's reference-map entry records, per §3.4.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Reference {
    /// A `Call` node resolved to one or more viable overload ids (§4.4:
    /// multiple viable overloads are all recorded; dispatch happens at
    /// runtime).
    Overloads(Vec<String>),
    /// An `Ident`/collapsed `Select` resolved to an absolute qualified name.
    Identifier(String),
    /// A literal folded at check time to a constant value.
    Constant(Value),
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct CheckedAst {
    pub expr: AstNode,
    pub type_map: HashMap<NodeId, Type>,
    pub reference_map: HashMap<NodeId, Reference>,
    pub source_info: SourceInfo,
}

impl CheckedAst {
    pub fn new(expr: AstNode) -> CheckedAst {
        CheckedAst {
            expr,
            type_map: HashMap::new(),
            reference_map: HashMap::new(),
            source_info: SourceInfo::new(),
        }
    }

    pub fn type_of(&self, id: NodeId) -> Type {
        self.type_map.get(&id).cloned().unwrap_or(Type::Dyn)
    }

    pub fn reference_of(&self, id: NodeId) -> Option<&Reference> {
        self.reference_map.get(&id)
    }

    /// §3.4's testable property: every node id in `expr` has a `type_map`
    /// entry. Used by tests and by `checker::check`'s own postcondition
    /// assertion in debug builds.
    pub fn every_node_typed(&self) -> bool {
        let nav = crate::ast::navigator::Navigator::build(&self.expr);
        fn walk(node: &AstNode, nav: &crate::ast::navigator::Navigator, map: &HashMap<NodeId, Type>) -> bool {
            if !map.contains_key(&node.id) {
                return false;
            }
            nav.children(node.id).iter().all(|c| walk(c, nav, map))
        }
        walk(self.expr_root(), &nav, &self.type_map)
    }

    fn expr_root(&self) -> &AstNode {
        &self.expr
    }
}
