//! Predicate-based descendant enumeration (§4.3), used by optimizers and by
//! extension macros that need to inspect an already-built subtree (e.g. to
//! check whether an argument is a constant before folding it).
use super::navigator::children;
use super::{AstNode, Expr, Literal};

/// Depth-first pre-order enumeration of `root` and every descendant
/// matching `predicate`.
pub fn find_all<'a>(root: &'a AstNode, predicate: &dyn Fn(&AstNode) -> bool) -> Vec<&'a AstNode> {
    let mut matches = Vec::new();
    walk(root, predicate, &mut matches);
    matches
}

fn walk<'a>(node: &'a AstNode, predicate: &dyn Fn(&AstNode) -> bool, out: &mut Vec<&'a AstNode>) {
    if predicate(node) {
        out.push(node);
    }
    for child in children(node) {
        walk(child, predicate, out);
    }
}

pub fn is_call_named<'a>(name: &'a str) -> impl Fn(&AstNode) -> bool + 'a {
    move |node| matches!(&node.kind, Expr::Call(c) if c.function == name)
}

pub fn is_kind(predicate: fn(&Expr) -> bool) -> impl Fn(&AstNode) -> bool {
    move |node| predicate(&node.kind)
}

/// A literal, or a `List`/`Map`/`Struct` whose every descendant is itself
/// constant — the "constant-valued subtree" matcher §4.3 names, shared with
/// the planner's constant-folding decorator (§4.5).
pub fn is_constant_subtree(node: &AstNode) -> bool {
    match &node.kind {
        Expr::Literal(_) => true,
        Expr::List(l) => l.elements.iter().all(is_constant_subtree),
        Expr::Map(m) => m
            .entries
            .iter()
            .all(|e| is_constant_subtree(&e.key) && is_constant_subtree(&e.value)),
        Expr::Struct(s) => s.fields.iter().all(|f| is_constant_subtree(&f.value)),
        _ => false,
    }
}

pub fn literal_of(node: &AstNode) -> Option<&Literal> {
    match &node.kind {
        Expr::Literal(l) => Some(l),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::factory::Factory;

    #[test]
    fn finds_calls_by_name() {
        let mut factory = Factory::new();
        let arg = factory.literal(Literal::Int(1));
        let call = factory.call("size", None, vec![arg]);
        let matches = find_all(&call, &is_call_named("size"));
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn constant_list_is_constant_subtree() {
        let mut factory = Factory::new();
        let a = factory.literal(Literal::Int(1));
        let b = factory.literal(Literal::Int(2));
        let list = factory.list(vec![a, b], vec![]);
        assert!(is_constant_subtree(&list));
    }

    #[test]
    fn list_with_ident_is_not_constant() {
        let mut factory = Factory::new();
        let a = factory.ident("x");
        let list = factory.list(vec![a], vec![]);
        assert!(!is_constant_subtree(&list));
    }
}
