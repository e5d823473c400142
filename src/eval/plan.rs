//! The planner (§4.5): turns a [`CheckedAst`] into an [`Interpretable`]
//! tree ready for repeated evaluation. Each `Call` node's bound overload is
//! resolved once here, rather than re-resolved on every `eval` — the same
//! "resolve once, evaluate many times" split the teacher draws between its
//! typechecker and its codegen pass.
use std::fmt;

use crate::ast::{AstNode, Call, Comprehension as AstComprehension, Expr, Literal, MapEntry, Select, Struct, StructField};
use crate::checker::checked_ast::{CheckedAst, Reference};
use crate::env::{Binding, Env};
use crate::ids::NodeId;
use crate::value::Value;

use super::interpretable::{Interpretable, Qualifier};

#[derive(Clone, Debug, PartialEq)]
pub enum PlanError {
    /// A checked call has no bound native implementation — either the
    /// overload the checker picked was declared without a binding, or (a
    /// planner bug) the reference map disagrees with the declarations.
    UnboundFunction(String),
    InvalidOptionalField(String),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::UnboundFunction(name) => write!(f, "no native binding for '{name}'"),
            PlanError::InvalidOptionalField(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PlanError {}

pub fn plan(env: &Env, checked: &CheckedAst) -> Result<Interpretable, PlanError> {
    plan_node(env, checked, &checked.expr)
}

fn plan_node(env: &Env, checked: &CheckedAst, node: &AstNode) -> Result<Interpretable, PlanError> {
    match &node.kind {
        Expr::Ident(name) => Ok(plan_ident(checked, node.id, name)),
        Expr::Literal(lit) => Ok(plan_literal(checked, node.id, lit)),
        Expr::Select(select) => plan_select(env, checked, node.id, select),
        Expr::Call(call) => plan_call(env, checked, node, call),
        Expr::List(list) => plan_list(env, checked, node.id, list),
        Expr::Map(map) => plan_map(env, checked, node.id, map),
        Expr::Struct(strct) => plan_struct(env, checked, node.id, strct),
        Expr::Comprehension(comp) => plan_comprehension(env, checked, node.id, comp),
    }
}

fn plan_ident(checked: &CheckedAst, id: NodeId, name: &str) -> Interpretable {
    let head = match checked.reference_of(id) {
        Some(Reference::Identifier(resolved)) => resolved.clone(),
        _ => name.to_string(),
    };
    Interpretable::Attribute {
        id,
        head,
        qualifiers: Vec::new(),
    }
}

fn plan_literal(checked: &CheckedAst, id: NodeId, lit: &Literal) -> Interpretable {
    let value = match checked.reference_of(id) {
        Some(Reference::Constant(v)) => v.clone(),
        _ => literal_to_value(lit),
    };
    Interpretable::Constant { id, value }
}

fn literal_to_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Uint(u) => Value::Uint(*u),
        Literal::Double(d) => Value::Double(*d),
        Literal::String(s) => Value::string(s.clone()),
        Literal::Bytes(b) => Value::Bytes(b.clone().into()),
    }
}

/// Flattens a chain of selects over an identifier into a single `Attribute`
/// with a qualifier list, which is what lets `eval_attribute` build the
/// dotted path unknown-pattern matching needs (§4.6). A select over
/// anything else (e.g. a call result) falls back to `FieldSelect`/
/// `PresenceTest`, which re-evaluate their operand directly.
fn plan_select(env: &Env, checked: &CheckedAst, id: NodeId, select: &Select) -> Result<Interpretable, PlanError> {
    // The checker may have collapsed this whole chain (e.g. a container-
    // qualified `a.b.c`) into a single resolved name (§4.4); in that case
    // the operand subtree was never meaningfully typed and must not be
    // replanned — the resolved name is this select's entire attribute.
    if let Some(Reference::Identifier(resolved)) = checked.reference_of(id) {
        return Ok(Interpretable::Attribute {
            id,
            head: resolved.clone(),
            qualifiers: Vec::new(),
        });
    }
    // An enum-variant select (`Pkg.Enum.VALUE`, §4.4) resolves to a constant
    // ordinal at check time rather than a runtime field lookup.
    if let Some(Reference::Constant(value)) = checked.reference_of(id) {
        return Ok(Interpretable::Constant { id, value: value.clone() });
    }
    let operand = plan_node(env, checked, &select.operand)?;
    match operand {
        Interpretable::Attribute { head, mut qualifiers, .. } => {
            qualifiers.push(if select.test_only {
                Qualifier::TestOnlyField(select.field.clone())
            } else {
                Qualifier::Field(select.field.clone())
            });
            Ok(Interpretable::Attribute { id, head, qualifiers })
        }
        other if select.test_only => Ok(Interpretable::PresenceTest {
            id,
            operand: Box::new(other),
            field: select.field.clone(),
        }),
        other => Ok(Interpretable::FieldSelect {
            id,
            operand: Box::new(other),
            field: select.field.clone(),
        }),
    }
}

fn plan_call(env: &Env, checked: &CheckedAst, node: &AstNode, call: &Call) -> Result<Interpretable, PlanError> {
    match call.function.as_str() {
        "&&" => {
            let (lhs, rhs) = two_args(env, checked, call)?;
            return Ok(Interpretable::LogicalAnd(Box::new(lhs), Box::new(rhs)));
        }
        "||" => {
            let (lhs, rhs) = two_args(env, checked, call)?;
            return Ok(Interpretable::LogicalOr(Box::new(lhs), Box::new(rhs)));
        }
        "_?_:_" => {
            if call.args.len() != 3 {
                return Err(PlanError::UnboundFunction("_?_:_".into()));
            }
            let cond = plan_node(env, checked, &call.args[0])?;
            let then_branch = plan_node(env, checked, &call.args[1])?;
            let else_branch = plan_node(env, checked, &call.args[2])?;
            return Ok(Interpretable::Conditional {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }
        "_[?_]" => {
            let (operand, index) = two_args(env, checked, call)?;
            return Ok(Interpretable::OptionalIndex {
                id: node.id,
                operand: Box::new(operand),
                index: Box::new(index),
            });
        }
        "_?._" => {
            if call.args.len() != 2 {
                return Err(PlanError::InvalidOptionalField(
                    "_?._ takes an operand and a field name".into(),
                ));
            }
            let operand = plan_node(env, checked, &call.args[0])?;
            let field = match &call.args[1].kind {
                Expr::Literal(Literal::String(s)) => s.clone(),
                _ => {
                    return Err(PlanError::InvalidOptionalField(
                        "_?._ field name must be a string literal".into(),
                    ))
                }
            };
            return Ok(Interpretable::OptionalSelect {
                id: node.id,
                operand: Box::new(operand),
                field,
            });
        }
        _ => {}
    }

    let binding = resolve_binding(env, checked, node.id, &call.function)?;
    let target = call
        .target
        .as_ref()
        .map(|t| plan_node(env, checked, t))
        .transpose()?
        .map(Box::new);
    let args = call
        .args
        .iter()
        .map(|a| plan_node(env, checked, a))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Interpretable::Call {
        id: node.id,
        function: call.function.clone(),
        binding,
        target,
        args,
    })
}

fn two_args(env: &Env, checked: &CheckedAst, call: &Call) -> Result<(Interpretable, Interpretable), PlanError> {
    let lhs = plan_node(env, checked, &call.args[0])?;
    let rhs = plan_node(env, checked, &call.args[1])?;
    Ok((lhs, rhs))
}

fn resolve_binding(env: &Env, checked: &CheckedAst, id: NodeId, function: &str) -> Result<Binding, PlanError> {
    let ids = match checked.reference_of(id) {
        Some(Reference::Overloads(ids)) => ids,
        _ => return Err(PlanError::UnboundFunction(function.to_string())),
    };
    env.declarations
        .overloads(function)
        .iter()
        .find(|o| ids.contains(&o.id))
        .and_then(|o| o.binding.clone())
        .ok_or_else(|| PlanError::UnboundFunction(function.to_string()))
}

fn plan_list(
    env: &Env,
    checked: &CheckedAst,
    id: NodeId,
    list: &crate::ast::ListExpr,
) -> Result<Interpretable, PlanError> {
    let elements = list
        .elements
        .iter()
        .map(|e| plan_node(env, checked, e))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Interpretable::ListConstructor {
        id,
        elements,
        optional_indices: list.optional_indices.clone(),
    })
}

fn plan_map(
    env: &Env,
    checked: &CheckedAst,
    id: NodeId,
    map: &crate::ast::MapExpr,
) -> Result<Interpretable, PlanError> {
    let entries = map
        .entries
        .iter()
        .map(|MapEntry { key, value, optional }| {
            Ok((plan_node(env, checked, key)?, plan_node(env, checked, value)?, *optional))
        })
        .collect::<Result<Vec<_>, PlanError>>()?;
    Ok(Interpretable::MapConstructor { id, entries })
}

fn plan_struct(env: &Env, checked: &CheckedAst, id: NodeId, strct: &Struct) -> Result<Interpretable, PlanError> {
    let fields = strct
        .fields
        .iter()
        .map(|StructField { name, value, optional }| {
            Ok((name.clone(), plan_node(env, checked, value)?, *optional))
        })
        .collect::<Result<Vec<_>, PlanError>>()?;
    Ok(Interpretable::ObjectConstructor {
        id,
        type_name: strct.type_name.clone(),
        fields,
    })
}

fn plan_comprehension(
    env: &Env,
    checked: &CheckedAst,
    id: NodeId,
    comp: &AstComprehension,
) -> Result<Interpretable, PlanError> {
    Ok(Interpretable::ComprehensionFold {
        id,
        iter_range: Box::new(plan_node(env, checked, &comp.iter_range)?),
        iter_var: comp.iter_var.clone(),
        iter_var2: comp.iter_var2.clone(),
        accu_var: comp.accu_var.clone(),
        accu_init: Box::new(plan_node(env, checked, &comp.accu_init)?),
        loop_condition: Box::new(plan_node(env, checked, &comp.loop_condition)?),
        loop_step: Box::new(plan_node(env, checked, &comp.loop_step)?),
        result: Box::new(plan_node(env, checked, &comp.result)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::factory::Factory;
    use crate::env::EnvOption;
    use crate::eval::activation::BindingsActivation;
    use crate::eval::stdlib::Stdlib;

    fn stdlib_env() -> Env {
        Env::with_options("", vec![EnvOption::Library(Box::new(Stdlib))])
    }

    #[test]
    fn plans_and_evaluates_arithmetic() {
        let mut factory = Factory::new();
        let expr = factory.call(
            "+",
            None,
            vec![factory.literal(Literal::Int(1)), factory.literal(Literal::Int(2))],
        );
        let env = stdlib_env();
        let (checked, diagnostics) = crate::checker::check(&env, expr);
        assert!(diagnostics.is_empty());
        let checked = checked.unwrap();
        let interpretable = plan(&env, &checked).unwrap();
        let activation = BindingsActivation::new();
        assert_eq!(interpretable.eval(&activation), Value::Int(3));
    }

    #[test]
    fn short_circuits_logical_and_without_evaluating_rhs() {
        let mut factory = Factory::new();
        // `unbound` typechecks as a declared Bool but is never given a
        // binding in the activation below; if `&&` evaluated it anyway this
        // would blow up with a "no such attribute" error instead of `false`.
        let expr = factory.call(
            "&&",
            None,
            vec![factory.literal(Literal::Bool(false)), factory.ident("unbound")],
        );
        let env = Env::with_options(
            "",
            vec![
                EnvOption::Library(Box::new(Stdlib)),
                EnvOption::Variable("unbound".into(), crate::value::types::Type::Bool),
            ],
        );
        let (checked, diagnostics) = crate::checker::check(&env, expr);
        assert!(diagnostics.is_empty());
        let checked = checked.unwrap();
        let interpretable = plan(&env, &checked).unwrap();
        let activation = BindingsActivation::new();
        assert_eq!(interpretable.eval(&activation), Value::Bool(false));
    }

    #[test]
    fn attribute_select_flattens_into_single_node() {
        let mut factory = Factory::new();
        let operand = factory.ident("request");
        let expr = factory.select(operand, "auth", false);
        let env = Env::with_options(
            "",
            vec![
                EnvOption::Library(Box::new(Stdlib)),
                EnvOption::Variable("request".into(), crate::value::types::Type::Dyn),
            ],
        );
        let (checked, _diagnostics) = crate::checker::check(&env, expr);
        let checked = checked.unwrap();
        let interpretable = plan(&env, &checked).unwrap();
        match interpretable {
            Interpretable::Attribute { head, qualifiers, .. } => {
                assert_eq!(head, "request");
                assert_eq!(qualifiers.len(), 1);
            }
            other => panic!("expected a flattened attribute, got {other:?}"),
        }
    }
}
