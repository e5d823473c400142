//! Rewrites every id in a subtree to a freshly minted value in stable
//! (pre-order) traversal order (§3.3 invariant d), required after macro
//! expansion so a rewritten subtree never collides with ids already in use
//! elsewhere in the composed AST.
use crate::ids::IdGenerator;

use super::{AstNode, Expr};

pub fn renumber(node: &mut AstNode, ids: &mut IdGenerator) {
    node.id = ids.next_id();
    match &mut node.kind {
        Expr::Ident(_) | Expr::Literal(_) => {}
        Expr::Select(s) => renumber(&mut s.operand, ids),
        Expr::Call(c) => {
            if let Some(t) = &mut c.target {
                renumber(t, ids);
            }
            for arg in &mut c.args {
                renumber(arg, ids);
            }
        }
        Expr::List(l) => {
            for elem in &mut l.elements {
                renumber(elem, ids);
            }
        }
        Expr::Map(m) => {
            for entry in &mut m.entries {
                renumber(&mut entry.key, ids);
                renumber(&mut entry.value, ids);
            }
        }
        Expr::Struct(s) => {
            for field in &mut s.fields {
                renumber(&mut field.value, ids);
            }
        }
        Expr::Comprehension(c) => {
            renumber(&mut c.iter_range, ids);
            renumber(&mut c.accu_init, ids);
            renumber(&mut c.loop_condition, ids);
            renumber(&mut c.loop_step, ids);
            renumber(&mut c.result, ids);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::factory::Factory;
    use crate::ids::NodeId;

    #[test]
    fn renumber_preserves_shape_with_fresh_ids() {
        let mut factory = Factory::new();
        let a = factory.ident("x");
        let b = factory.ident("y");
        let mut call = factory.call("f", None, vec![a, b]);

        let original_root = call.id;
        let mut ids = IdGenerator::starting_after(NodeId(1000));
        renumber(&mut call, &mut ids);

        assert_ne!(call.id, original_root);
        assert!(call.id.0 > 1000);
        match &call.kind {
            Expr::Call(c) => {
                assert_eq!(c.args.len(), 2);
                assert!(c.args[0].id.0 > 1000 && c.args[1].id.0 > c.args[0].id.0);
            }
            _ => unreachable!(),
        }
    }
}
