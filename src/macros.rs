//! Macro expansion (§4.7): rewrites macro-shaped `Call`/`Select` nodes into
//! their desugared comprehension/select form before checking. Runs
//! bottom-up so a macro nested inside another macro's predicate or
//! transform body is expanded first.
//!
//! Every synthesized subtree is built through a single [`Factory`] seeded
//! past the whole input tree's highest id via `Factory::resuming_after`
//! (see its doc comment) and threaded through the entire recursive
//! expansion, so every node it mints is guaranteed fresh — no separate
//! renumbering pass is needed. Nodes that pass through unchanged (anything
//! not inside a macro) keep their original ids.
use crate::ast::factory::Factory;
use crate::ast::source_info::SourceInfo;
use crate::ast::{AstNode, Call, Expr, Literal, MapEntry};

/// Expand every macro in `root`, recording each synthesized root's macro
/// name in `source_info` (§4.7's "macro call tracking") so diagnostics can
/// report "expanded from `all()`" against a node the parser never wrote.
pub fn expand(root: AstNode, source_info: &mut SourceInfo) -> AstNode {
    let highest = highest_id(&root);
    let mut factory = Factory::resuming_after(highest);
    expand_node(root, &mut factory, source_info)
}

fn highest_id(node: &AstNode) -> crate::ids::NodeId {
    let mut max = node.id;
    for child in crate::ast::navigator::children(node) {
        let child_max = highest_id(child);
        if child_max.0 > max.0 {
            max = child_max;
        }
    }
    max
}

fn expand_node(node: AstNode, factory: &mut Factory, source_info: &mut SourceInfo) -> AstNode {
    let AstNode { id, kind } = node;
    match kind {
        Expr::Ident(_) | Expr::Literal(_) => AstNode { id, kind },
        Expr::Select(mut select) => {
            select.operand = Box::new(expand_node(*select.operand, factory, source_info));
            AstNode {
                id,
                kind: Expr::Select(select),
            }
        }
        Expr::Call(mut call) => {
            call.target = call.target.map(|t| Box::new(expand_node(*t, factory, source_info)));
            call.args = call
                .args
                .into_iter()
                .map(|a| expand_node(a, factory, source_info))
                .collect();
            expand_call(AstNode { id, kind: Expr::Call(call) }, factory, source_info)
        }
        Expr::List(mut list) => {
            list.elements = list
                .elements
                .into_iter()
                .map(|e| expand_node(e, factory, source_info))
                .collect();
            AstNode {
                id,
                kind: Expr::List(list),
            }
        }
        Expr::Map(mut map) => {
            map.entries = map
                .entries
                .into_iter()
                .map(|entry| MapEntry {
                    key: expand_node(entry.key, factory, source_info),
                    value: expand_node(entry.value, factory, source_info),
                    optional: entry.optional,
                })
                .collect();
            AstNode { id, kind: Expr::Map(map) }
        }
        Expr::Struct(mut strct) => {
            strct.fields = strct
                .fields
                .into_iter()
                .map(|f| crate::ast::StructField {
                    name: f.name,
                    value: expand_node(f.value, factory, source_info),
                    optional: f.optional,
                })
                .collect();
            AstNode {
                id,
                kind: Expr::Struct(strct),
            }
        }
        Expr::Comprehension(mut comp) => {
            comp.iter_range = expand_node(comp.iter_range, factory, source_info);
            comp.accu_init = expand_node(comp.accu_init, factory, source_info);
            comp.loop_condition = expand_node(comp.loop_condition, factory, source_info);
            comp.loop_step = expand_node(comp.loop_step, factory, source_info);
            comp.result = expand_node(comp.result, factory, source_info);
            AstNode {
                id,
                kind: Expr::Comprehension(comp),
            }
        }
    }
}

/// Recognizes and rewrites one macro-shaped call. Non-macro calls pass
/// through unchanged (their target/args were already expanded by the
/// caller).
fn expand_call(node: AstNode, factory: &mut Factory, source_info: &mut SourceInfo) -> AstNode {
    let original_id = node.id;
    let Expr::Call(call) = node.kind else { unreachable!() };

    let (macro_name, rewritten) = if call.target.is_none() && call.function == "has" && call.args.len() == 1 {
        ("has", has_macro(call.args.into_iter().next().unwrap()))
    } else if call.target.is_some() && call.function == "all" && (call.args.len() == 2 || call.args.len() == 3) {
        ("all", quantifier_macro(factory, call, true))
    } else if call.target.is_some() && call.function == "exists" && (call.args.len() == 2 || call.args.len() == 3) {
        ("exists", quantifier_macro(factory, call, false))
    } else if call.target.is_some() && call.function == "existsOne" && (call.args.len() == 2 || call.args.len() == 3) {
        ("existsOne", exists_one_macro(factory, call))
    } else if call.target.is_some() && call.function == "filter" && (call.args.len() == 2 || call.args.len() == 3) {
        ("filter", filter_macro(factory, call))
    } else if call.target.is_some() && call.function == "map" && (call.args.len() == 2 || call.args.len() == 3) {
        ("map", map_macro(factory, call))
    } else if call.target.is_some()
        && call.function == "transformList"
        && (call.args.len() == 2 || call.args.len() == 3)
    {
        ("transformList", map_macro(factory, call))
    } else if call.target.is_some()
        && call.function == "transformMap"
        && (call.args.len() == 3 || call.args.len() == 4)
    {
        ("transformMap", transform_map_macro(factory, call))
    } else if call.target.is_some() && call.function == "transformMapEntry" && call.args.len() == 3 {
        ("transformMapEntry", transform_map_entry_macro(factory, call))
    } else if is_cel_bind(&call) {
        ("cel.bind", bind_macro(factory, call))
    } else {
        return AstNode {
            id: original_id,
            kind: Expr::Call(call),
        };
    };

    source_info.record_macro_call(rewritten.id, macro_name);
    rewritten
}

fn has_macro(operand: AstNode) -> AstNode {
    match operand.kind {
        Expr::Select(mut select) => {
            select.test_only = true;
            AstNode {
                id: operand.id,
                kind: Expr::Select(select),
            }
        }
        other => AstNode { id: operand.id, kind: other },
    }
}

/// `cel.bind(name, value, body)` is parsed as a member call on `cel` rather
/// than a plain global, mirroring how `has`/`all`/etc. target their
/// receiver — distinguishing it from an ordinary user-defined `bind` method
/// requires checking the receiver is literally the `cel` identifier.
fn is_cel_bind(call: &Call) -> bool {
    if call.function != "bind" || call.args.len() != 3 {
        return false;
    }
    matches!(call.target.as_deref(), Some(AstNode { kind: Expr::Ident(name), .. }) if name == "cel")
}

/// `x.all(v, pred)` folds a Boolean AND over `pred`, short-circuiting via
/// the ordinary `&&`/`||` `Interpretable`s once planned; `exists` is the
/// dual fold with OR (§4.7, cel-go's quantifier desugaring).
fn quantifier_macro(factory: &mut Factory, call: Call, is_all: bool) -> AstNode {
    let (iter_var, iter_var2, pred) = bind_vars(call.args);
    let range = *call.target.unwrap();
    let accu_var = "__result__";

    let accu_init = factory.literal(Literal::Bool(is_all));
    let loop_condition = if is_all {
        factory.ident(accu_var)
    } else {
        factory.call("!", None, vec![factory.ident(accu_var)])
    };
    let op = if is_all { "&&" } else { "||" };
    let loop_step = factory.call(op, None, vec![factory.ident(accu_var), pred]);
    let result = factory.ident(accu_var);
    factory.comprehension(
        range,
        iter_var,
        iter_var2,
        accu_var,
        accu_init,
        loop_condition,
        loop_step,
        result,
    )
}

fn exists_one_macro(factory: &mut Factory, call: Call) -> AstNode {
    let (iter_var, iter_var2, pred) = bind_vars(call.args);
    let range = *call.target.unwrap();
    let accu_var = "__result__";

    let accu_init = factory.literal(Literal::Int(0));
    let loop_condition = factory.literal(Literal::Bool(true));
    let incremented = factory.call("+", None, vec![factory.ident(accu_var), factory.literal(Literal::Int(1))]);
    let loop_step = factory.call("_?_:_", None, vec![pred, incremented, factory.ident(accu_var)]);
    let result = factory.call("==", None, vec![factory.ident(accu_var), factory.literal(Literal::Int(1))]);
    factory.comprehension(
        range,
        iter_var,
        iter_var2,
        accu_var,
        accu_init,
        loop_condition,
        loop_step,
        result,
    )
}

fn filter_macro(factory: &mut Factory, call: Call) -> AstNode {
    let (iter_var, iter_var2, pred) = bind_vars(call.args);
    let range = *call.target.unwrap();
    let accu_var = "__result__";

    let accu_init = factory.list(vec![], vec![]);
    let loop_condition = factory.literal(Literal::Bool(true));
    let singleton = factory.list(vec![factory.ident(iter_var.clone())], vec![]);
    let appended = factory.call("+", None, vec![factory.ident(accu_var), singleton]);
    let loop_step = factory.call("_?_:_", None, vec![pred, appended, factory.ident(accu_var)]);
    let result = factory.ident(accu_var);
    factory.comprehension(
        range,
        iter_var,
        iter_var2,
        accu_var,
        accu_init,
        loop_condition,
        loop_step,
        result,
    )
}

/// `x.map(v, transform)` / `x.map(v, pred, transform)`, and `transformList`
/// (same shape under a different surface name).
fn map_macro(factory: &mut Factory, call: Call) -> AstNode {
    let range = *call.target.unwrap();
    let mut args = call.args.into_iter();
    let iter_var = ident_name(args.next().unwrap());
    let second = args.next().unwrap();
    let third = args.next();

    let accu_var = "__result__";
    let accu_init = factory.list(vec![], vec![]);
    let loop_condition = factory.literal(Literal::Bool(true));

    let loop_step = match third {
        None => {
            let singleton = factory.list(vec![second], vec![]);
            factory.call("+", None, vec![factory.ident(accu_var), singleton])
        }
        Some(transform) => {
            let singleton = factory.list(vec![transform], vec![]);
            let appended = factory.call("+", None, vec![factory.ident(accu_var), singleton]);
            factory.call("_?_:_", None, vec![second, appended, factory.ident(accu_var)])
        }
    };
    let result = factory.ident(accu_var);
    factory.comprehension(range, iter_var, None, accu_var, accu_init, loop_condition, loop_step, result)
}

/// `x.transformMap(k, v, transform)` / `x.transformMap(k, v, pred, transform)`:
/// folds `@mapInsert` over the range, keyed by the unchanged iteration key.
fn transform_map_macro(factory: &mut Factory, call: Call) -> AstNode {
    let range = *call.target.unwrap();
    let mut args = call.args.into_iter();
    let key_var = ident_name(args.next().unwrap());
    let value_var = ident_name(args.next().unwrap());
    let third = args.next().unwrap();
    let fourth = args.next();

    let accu_var = "__result__";
    let accu_init = factory.map(vec![]);
    let loop_condition = factory.literal(Literal::Bool(true));

    let loop_step = match fourth {
        None => factory.call(
            "@mapInsert",
            None,
            vec![factory.ident(accu_var), factory.ident(key_var.clone()), third],
        ),
        Some(transform) => {
            let inserted = factory.call(
                "@mapInsert",
                None,
                vec![factory.ident(accu_var), factory.ident(key_var.clone()), transform],
            );
            factory.call("_?_:_", None, vec![third, inserted, factory.ident(accu_var)])
        }
    };
    let result = factory.ident(accu_var);
    factory.comprehension(
        range,
        key_var,
        Some(value_var),
        accu_var,
        accu_init,
        loop_condition,
        loop_step,
        result,
    )
}

/// `x.transformMapEntry(k, v, transform)`: `transform` evaluates to a
/// zero-or-one-entry map, merged via `@mapInsertEntry` so a body that emits
/// `{}` skips the current key without inserting anything (§4.7).
fn transform_map_entry_macro(factory: &mut Factory, call: Call) -> AstNode {
    let range = *call.target.unwrap();
    let mut args = call.args.into_iter();
    let key_var = ident_name(args.next().unwrap());
    let value_var = ident_name(args.next().unwrap());
    let transform = args.next().unwrap();

    let accu_var = "__result__";
    let accu_init = factory.map(vec![]);
    let loop_condition = factory.literal(Literal::Bool(true));
    let loop_step = factory.call("@mapInsertEntry", None, vec![factory.ident(accu_var), transform]);
    let result = factory.ident(accu_var);
    factory.comprehension(
        range,
        key_var,
        Some(value_var),
        accu_var,
        accu_init,
        loop_condition,
        loop_step,
        result,
    )
}

/// `cel.bind(name, value, body)`: a comprehension that iterates a single
/// sentinel element with a loop condition of `false`, so `loop_step` never
/// runs and the accumulator stays at `value` for `body` to read — a "let"
/// built out of the fold machinery rather than a dedicated node kind.
fn bind_macro(factory: &mut Factory, call: Call) -> AstNode {
    let mut args = call.args.into_iter();
    let name = ident_name(args.next().unwrap());
    let value = args.next().unwrap();
    let body = args.next().unwrap();

    let range = factory.list(vec![factory.literal(Literal::Int(0))], vec![]);
    let loop_condition = factory.literal(Literal::Bool(false));
    let loop_step = factory.ident(name.clone());
    factory.comprehension(range, "#unused", None, name, value, loop_condition, loop_step, body)
}

/// Unpacks the shared `(var[, var2], pred)` argument shape of `all`/
/// `exists`/`existsOne`/`filter`. The two-variable form binds an index (for
/// lists) or key (for maps) as the first variable and the element/value as
/// the second (§4.7).
fn bind_vars(args: Vec<AstNode>) -> (String, Option<String>, AstNode) {
    let mut args = args.into_iter();
    let first = ident_name(args.next().unwrap());
    let second = args.next().unwrap();
    match args.next() {
        Some(pred) => (first, Some(ident_name(second)), pred),
        None => (first, None, second),
    }
}

fn ident_name(node: AstNode) -> String {
    match node.kind {
        Expr::Ident(name) => name,
        _ => "_".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::navigator::Navigator;
    use crate::checker::check;
    use crate::env::{Env, EnvOption};
    use crate::eval::activation::BindingsActivation;
    use crate::eval::plan::plan;
    use crate::eval::stdlib::Stdlib;
    use crate::value::types::Type;
    use crate::value::Value;

    fn env_with(vars: Vec<(&str, Type)>) -> Env {
        let mut options = vec![EnvOption::Library(Box::new(Stdlib))];
        for (name, ty) in vars {
            options.push(EnvOption::Variable(name.into(), ty));
        }
        Env::with_options("", options)
    }

    #[test]
    fn has_macro_becomes_test_only_select() {
        let mut factory = Factory::new();
        let operand = factory.ident("request");
        let select = factory.select(operand, "auth", false);
        let call = factory.call("has", None, vec![select]);

        let mut source_info = SourceInfo::new();
        let expanded = expand(call, &mut source_info);
        match expanded.kind {
            Expr::Select(s) => assert!(s.test_only),
            other => panic!("expected a select, got {other:?}"),
        }
    }

    #[test]
    fn every_expanded_node_gets_a_unique_id() {
        let mut factory = Factory::new();
        let range = factory.list(vec![factory.literal(Literal::Int(1)), factory.literal(Literal::Int(2))], vec![]);
        let pred = factory.call("==", None, vec![factory.ident("v"), factory.literal(Literal::Int(1))]);
        let call = factory.call("all", Some(range), vec![factory.ident("v"), pred]);

        let mut source_info = SourceInfo::new();
        let expanded = expand(call, &mut source_info);
        let nav = Navigator::build(&expanded);
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![nav.root()];
        while let Some(node) = stack.pop() {
            assert!(seen.insert(node.id), "duplicate id {:?}", node.id);
            stack.extend(nav.children(node.id));
        }
    }

    #[test]
    fn all_macro_evaluates_like_a_fold() {
        let mut factory = Factory::new();
        let range = factory.list(
            vec![factory.literal(Literal::Int(2)), factory.literal(Literal::Int(4))],
            vec![],
        );
        let pred = factory.call(
            "==",
            None,
            vec![
                factory.call("%", None, vec![factory.ident("v"), factory.literal(Literal::Int(2))]),
                factory.literal(Literal::Int(0)),
            ],
        );
        let call = factory.call("all", Some(range), vec![factory.ident("v"), pred]);

        let mut source_info = SourceInfo::new();
        let expanded = expand(call, &mut source_info);

        let env = env_with(vec![]);
        let (checked, diagnostics) = check(&env, expanded);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let program = plan(&env, &checked.unwrap()).unwrap();
        let activation = BindingsActivation::new();
        assert_eq!(program.eval(&activation), Value::Bool(true));
    }

    #[test]
    fn exists_macro_short_circuits_to_true() {
        let mut factory = Factory::new();
        let range = factory.list(
            vec![factory.literal(Literal::Int(1)), factory.literal(Literal::Int(3))],
            vec![],
        );
        let pred = factory.call("==", None, vec![factory.ident("v"), factory.literal(Literal::Int(3))]);
        let call = factory.call("exists", Some(range), vec![factory.ident("v"), pred]);

        let mut source_info = SourceInfo::new();
        let expanded = expand(call, &mut source_info);

        let env = env_with(vec![]);
        let (checked, diagnostics) = check(&env, expanded);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let program = plan(&env, &checked.unwrap()).unwrap();
        let activation = BindingsActivation::new();
        assert_eq!(program.eval(&activation), Value::Bool(true));
    }

    #[test]
    fn filter_macro_keeps_matching_elements() {
        let mut factory = Factory::new();
        let range = factory.list(
            vec![
                factory.literal(Literal::Int(1)),
                factory.literal(Literal::Int(2)),
                factory.literal(Literal::Int(3)),
            ],
            vec![],
        );
        let pred = factory.call(
            "==",
            None,
            vec![
                factory.call("%", None, vec![factory.ident("v"), factory.literal(Literal::Int(2))]),
                factory.literal(Literal::Int(0)),
            ],
        );
        let call = factory.call("filter", Some(range), vec![factory.ident("v"), pred]);

        let mut source_info = SourceInfo::new();
        let expanded = expand(call, &mut source_info);

        let env = env_with(vec![]);
        let (checked, diagnostics) = check(&env, expanded);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let program = plan(&env, &checked.unwrap()).unwrap();
        let activation = BindingsActivation::new();
        let result = program.eval(&activation);
        match result {
            Value::List(list) => assert_eq!(list.as_slice(), &[Value::Int(2)]),
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn bind_macro_scopes_the_bound_name_to_the_body() {
        let mut factory = Factory::new();
        let value = factory.literal(Literal::Int(5));
        let body = factory.call("+", None, vec![factory.ident("x"), factory.literal(Literal::Int(1))]);
        let call = factory.call("bind", Some(factory.ident("cel")), vec![factory.ident("x"), value, body]);

        let mut source_info = SourceInfo::new();
        let expanded = expand(call, &mut source_info);

        let env = env_with(vec![]);
        let (checked, diagnostics) = check(&env, expanded);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let program = plan(&env, &checked.unwrap()).unwrap();
        let activation = BindingsActivation::new();
        assert_eq!(program.eval(&activation), Value::Int(6));
    }

    #[test]
    fn two_variable_exists_over_a_map_binds_key_and_value() {
        let mut factory = Factory::new();
        let entry_a = factory.map_entry(factory.literal(Literal::String("a".into())), factory.literal(Literal::Int(1)), false);
        let entry_b = factory.map_entry(factory.literal(Literal::String("b".into())), factory.literal(Literal::Int(2)), false);
        let map = factory.map(vec![entry_a, entry_b]);
        let pred = factory.call(
            "&&",
            None,
            vec![
                factory.call("==", None, vec![factory.ident("k"), factory.literal(Literal::String("a".into()))]),
                factory.call("==", None, vec![factory.ident("v"), factory.literal(Literal::Int(1))]),
            ],
        );
        let call = factory.call("exists", Some(map), vec![factory.ident("k"), factory.ident("v"), pred]);

        let mut source_info = SourceInfo::new();
        let expanded = expand(call, &mut source_info);

        let env = env_with(vec![]);
        let (checked, diagnostics) = check(&env, expanded);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let program = plan(&env, &checked.unwrap()).unwrap();
        let activation = BindingsActivation::new();
        assert_eq!(program.eval(&activation), Value::Bool(true));
    }

    #[test]
    fn two_variable_all_over_a_list_binds_index_and_value() {
        let mut factory = Factory::new();
        let range = factory.list(
            vec![
                factory.literal(Literal::Int(1)),
                factory.literal(Literal::Int(2)),
                factory.literal(Literal::Int(3)),
            ],
            vec![],
        );
        let pred = factory.call("<", None, vec![factory.ident("i"), factory.ident("v")]);
        let call = factory.call("all", Some(range), vec![factory.ident("i"), factory.ident("v"), pred]);

        let mut source_info = SourceInfo::new();
        let expanded = expand(call, &mut source_info);

        let env = env_with(vec![]);
        let (checked, diagnostics) = check(&env, expanded);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let program = plan(&env, &checked.unwrap()).unwrap();
        let activation = BindingsActivation::new();
        assert_eq!(program.eval(&activation), Value::Bool(true));
    }

    #[test]
    fn unrelated_member_call_named_bind_is_left_alone() {
        let mut factory = Factory::new();
        let target = factory.ident("x");
        let call = factory.call(
            "bind",
            Some(target),
            vec![factory.ident("a"), factory.ident("b"), factory.ident("c")],
        );
        let mut source_info = SourceInfo::new();
        let expanded = expand(call, &mut source_info);
        match expanded.kind {
            Expr::Call(c) => assert_eq!(c.function, "bind"),
            other => panic!("expected the call to pass through unchanged, got {other:?}"),
        }
    }
}
