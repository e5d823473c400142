//! A read-only navigable view over an [`AstNode`] tree (§4.3): parent
//! links, depth, and a fixed child ordering per node kind. Built once over
//! a whole tree so parent/depth lookups don't require re-walking.
use std::collections::HashMap;

use super::{AstNode, Expr, NodeId};
use crate::value::types::Type;

#[derive(Debug)]
pub struct Navigator<'a> {
    root: &'a AstNode,
    parents: HashMap<NodeId, NodeId>,
    depths: HashMap<NodeId, usize>,
    nodes: HashMap<NodeId, &'a AstNode>,
}

impl<'a> Navigator<'a> {
    pub fn build(root: &'a AstNode) -> Navigator<'a> {
        let mut nav = Navigator {
            root,
            parents: HashMap::new(),
            depths: HashMap::new(),
            nodes: HashMap::new(),
        };
        nav.visit(root, None, 0);
        nav
    }

    fn visit(&mut self, node: &'a AstNode, parent: Option<NodeId>, depth: usize) {
        self.nodes.insert(node.id, node);
        self.depths.insert(node.id, depth);
        if let Some(p) = parent {
            self.parents.insert(node.id, p);
        }
        for child in children(node) {
            self.visit(child, Some(node.id), depth + 1);
        }
    }

    pub fn root(&self) -> &'a AstNode {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&'a AstNode> {
        self.nodes.get(&id).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<&'a AstNode> {
        self.parents.get(&id).and_then(|p| self.node(*p))
    }

    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.depths.get(&id).copied()
    }

    pub fn children(&self, id: NodeId) -> Vec<&'a AstNode> {
        self.node(id).map(children).unwrap_or_default()
    }

    /// The node's checked type, or `Dyn` if this navigator wasn't built
    /// over a checked AST's type-map.
    pub fn checked_type(&self, id: NodeId, type_map: &HashMap<NodeId, Type>) -> Type {
        type_map.get(&id).cloned().unwrap_or(Type::Dyn)
    }
}

/// Children in the fixed order §4.3 mandates per node kind.
pub fn children(node: &AstNode) -> Vec<&AstNode> {
    match &node.kind {
        Expr::Ident(_) | Expr::Literal(_) => Vec::new(),
        Expr::Select(s) => vec![&s.operand],
        Expr::Call(c) => {
            let mut kids = Vec::new();
            if let Some(t) = &c.target {
                kids.push(t.as_ref());
            }
            kids.extend(c.args.iter());
            kids
        }
        Expr::List(l) => l.elements.iter().collect(),
        Expr::Map(m) => m.entries.iter().flat_map(|e| vec![&e.key, &e.value]).collect(),
        Expr::Struct(s) => s.fields.iter().map(|f| &f.value).collect(),
        Expr::Comprehension(c) => vec![
            &c.iter_range,
            &c.accu_init,
            &c.loop_condition,
            &c.loop_step,
            &c.result,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::factory::Factory;

    #[test]
    fn call_children_put_target_before_args() {
        let mut factory = Factory::new();
        let target = factory.ident("x");
        let arg = factory.ident("y");
        let call = factory.call("f", Some(target.clone()), vec![arg.clone()]);
        let nav = Navigator::build(&call);
        let kids = nav.children(call.id);
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[0].id, target.id);
        assert_eq!(kids[1].id, arg.id);
    }

    #[test]
    fn depth_increases_with_nesting() {
        let mut factory = Factory::new();
        let inner = factory.ident("x");
        let outer = factory.select(inner, "f", false);
        let nav = Navigator::build(&outer);
        assert_eq!(nav.depth(outer.id), Some(0));
        let select_operand_id = match &outer.kind {
            Expr::Select(s) => s.operand.id,
            _ => unreachable!(),
        };
        assert_eq!(nav.depth(select_operand_id), Some(1));
    }
}
