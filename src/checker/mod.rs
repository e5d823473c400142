//! The static checker (§4.4): given an AST and an [`Env`], produces a
//! [`CheckedAst`] plus a list of diagnostics. Follows the teacher's
//! two-phase checking shape (resolve/typecheck as a recursive walk
//! accumulating into shared state) generalized from its mutable
//! `Rc<RefCell<Option<Type>>>` node slots to external maps (see
//! `checked_ast` module docs for why).
pub mod checked_ast;
pub mod error;
pub mod scope;

use std::collections::HashMap;

use crate::ast::{AstNode, Call, Comprehension, Expr, Literal, MapEntry, Select, Struct, StructField};
use crate::env::Env;
use crate::ids::NodeId;
use crate::value::types::{is_assignable, least_upper_bound, unify, Substitution, Type};
use crate::value::Value;

use checked_ast::{CheckedAst, Reference};
use error::{
    AmbiguousOverload, Diagnostic, HeterogeneousLiteral, InvalidComprehension, NoMatchingOverload,
    Severity, TypeCheckError, TypeMismatch, UndefinedVariable,
};
use scope::Scope;

pub struct Checker<'a> {
    env: &'a Env,
    scope: Scope,
    type_map: HashMap<NodeId, Type>,
    reference_map: HashMap<NodeId, Reference>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    pub fn new(env: &'a Env) -> Checker<'a> {
        Checker {
            env,
            scope: Scope::new(),
            type_map: HashMap::new(),
            reference_map: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Check `expr`, returning a checked AST on success (no error-severity
    /// diagnostics) alongside every diagnostic emitted, or `None` alongside
    /// the diagnostics when checking failed (§4.4: "any error-severity
    /// diagnostic yields no checked AST").
    pub fn check(env: &Env, expr: AstNode) -> (Option<CheckedAst>, Vec<Diagnostic>) {
        let mut checker = Checker::new(env);
        checker.visit(&expr);

        let has_error = checker
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error);

        let checked = if has_error {
            None
        } else {
            Some(CheckedAst {
                expr,
                type_map: checker.type_map,
                reference_map: checker.reference_map,
                source_info: crate::ast::SourceInfo::new(),
            })
        };
        (checked, checker.diagnostics)
    }

    fn set_type(&mut self, id: NodeId, ty: Type) {
        self.type_map.insert(id, ty);
    }

    fn emit(&mut self, node: NodeId, error: TypeCheckError) {
        self.diagnostics.push(Diagnostic::error(node, None, error));
    }

    fn emit_warning(&mut self, node: NodeId, error: TypeCheckError) {
        self.diagnostics.push(Diagnostic::warning(node, None, error));
    }

    fn visit(&mut self, node: &AstNode) -> Type {
        let ty = match &node.kind {
            Expr::Ident(name) => self.check_ident(node.id, name),
            Expr::Literal(lit) => self.check_literal(node.id, lit),
            Expr::Select(select) => self.check_select(node, select),
            Expr::Call(call) => self.check_call(node, call),
            Expr::List(list) => self.check_list(node, list),
            Expr::Map(map) => self.check_map(node, map),
            Expr::Struct(strct) => self.check_struct(node, strct),
            Expr::Comprehension(comp) => self.check_comprehension(node, comp),
        };
        self.set_type(node.id, ty.clone());
        ty
    }

    fn check_ident(&mut self, id: NodeId, name: &str) -> Type {
        if let Some(ty) = self.scope.lookup(name) {
            self.reference_map
                .insert(id, Reference::Identifier(name.to_string()));
            return ty.clone();
        }
        match self.env.resolve_variable(name) {
            Some((resolved, ty)) => {
                self.reference_map.insert(id, Reference::Identifier(resolved));
                ty
            }
            None => {
                self.emit(
                    id,
                    TypeCheckError::UndefinedVariable(UndefinedVariable {
                        name: name.to_string(),
                    }),
                );
                Type::Error
            }
        }
    }

    fn check_literal(&mut self, id: NodeId, lit: &Literal) -> Type {
        let (ty, value) = match lit {
            Literal::Null => (Type::Null, Value::Null),
            Literal::Bool(b) => (Type::Bool, Value::Bool(*b)),
            Literal::Int(i) => (Type::Int, Value::Int(*i)),
            Literal::Uint(u) => (Type::Uint, Value::Uint(*u)),
            Literal::Double(d) => (Type::Double, Value::Double(*d)),
            Literal::String(s) => (Type::String, Value::string(s.clone())),
            Literal::Bytes(b) => (Type::Bytes, Value::Bytes(b.clone().into())),
        };
        self.reference_map.insert(id, Reference::Constant(value));
        ty
    }

    fn check_select(&mut self, node: &AstNode, select: &Select) -> Type {
        let operand_ty = self.resolve_operand_type(&select.operand);
        if select.test_only {
            // §3.3(c): test-only selects resolve to Bool unconditionally.
            return Type::Bool;
        }
        match operand_ty {
            Type::Object(name) => match self.env.types.find_field(&name, &select.field) {
                Some(field) => field.field_type,
                None => match self.env.types.enum_value(&name, &select.field) {
                    Some(ordinal) => {
                        self.reference_map
                            .insert(node.id, Reference::Constant(Value::Int(ordinal)));
                        Type::Int
                    }
                    None => {
                        self.emit(
                            node.id,
                            TypeCheckError::UndefinedVariable(UndefinedVariable {
                                name: format!("{name}.{}", select.field),
                            }),
                        );
                        Type::Error
                    }
                },
            },
            Type::Dyn | Type::Any | Type::Error => Type::Dyn,
            Type::Map(_, value_ty) => *value_ty,
            other => {
                self.emit(
                    node.id,
                    TypeCheckError::TypeMismatch(TypeMismatch {
                        expected: Type::Object("<any object>".into()),
                        actual: other,
                    }),
                );
                Type::Error
            }
        }
    }

    /// Tries the operand as a container-qualified identifier (§4.4) before
    /// falling back to ordinary recursive select/field typing: a `Select`
    /// chain that is entirely `Ident`s (e.g. `a.b.c`) may itself be a
    /// declared, dotted variable or type name (`env.resolve_variable`/
    /// `env.types.find_type` already try the container-stripping candidate
    /// order) rather than a field access on a bare variable `a`. Recursing
    /// through `self.visit` on failure retries progressively shorter
    /// prefixes, since each enclosing `Select` calls this same method on its
    /// own operand.
    fn resolve_operand_type(&mut self, operand: &AstNode) -> Type {
        if let Some(path) = flatten_dotted_path(operand) {
            if self.scope.lookup(&path[0]).is_none() {
                let dotted = path.join(".");
                if let Some((resolved, ty)) = self.env.resolve_variable(&dotted) {
                    self.record_collapsed_identifier(operand, &resolved, ty.clone());
                    return ty;
                }
                if let Some(ty) = self.env.types.find_type(&dotted) {
                    self.record_collapsed_identifier(operand, &dotted, ty.clone());
                    return ty;
                }
            }
        }
        self.visit(operand)
    }

    /// Records `node` (a whole `Select`/`Ident` chain) as having collapsed
    /// to a single resolved name, and types every node inside the chain
    /// `Dyn` so the checked AST's "every node is typed" invariant still
    /// holds without re-resolving (and possibly misreporting as undefined)
    /// the bare leading identifier.
    fn record_collapsed_identifier(&mut self, node: &AstNode, resolved: &str, ty: Type) {
        self.set_type(node.id, ty);
        self.reference_map
            .insert(node.id, Reference::Identifier(resolved.to_string()));
        self.mark_descendants_dyn(node);
    }

    fn mark_descendants_dyn(&mut self, node: &AstNode) {
        for child in crate::ast::navigator::children(node) {
            self.set_type(child.id, Type::Dyn);
            self.mark_descendants_dyn(child);
        }
    }

    fn check_call(&mut self, node: &AstNode, call: &Call) -> Type {
        let target_ty = call.target.as_ref().map(|t| self.visit(t));
        let arg_types: Vec<Type> = call.args.iter().map(|a| self.visit(a)).collect();

        let overloads = self.env.declarations.overloads(&call.function).to_vec();
        let mut viable = Vec::new();
        for overload in &overloads {
            if overload.member != call.target.is_some() {
                continue;
            }
            if overload.params.len() != arg_types.len() {
                continue;
            }
            let mut subst = Substitution::new();
            let mut ok = true;
            if let (Some(target_ty), Some(receiver_ty)) = (&target_ty, &overload.receiver_type) {
                if !is_assignable(target_ty, receiver_ty, &mut subst) {
                    ok = false;
                }
            }
            for (param, arg) in overload.params.iter().zip(&arg_types) {
                if !unify(param, arg, &mut subst) && !is_assignable(arg, param, &mut subst) {
                    ok = false;
                    break;
                }
            }
            if ok {
                viable.push((overload.id.clone(), subst.apply(&overload.result)));
            }
        }

        match viable.len() {
            0 => {
                self.emit(
                    node.id,
                    TypeCheckError::NoMatchingOverload(NoMatchingOverload {
                        function: call.function.clone(),
                        argument_types: arg_types,
                    }),
                );
                Type::Error
            }
            1 => {
                let (id, result) = viable.into_iter().next().unwrap();
                self.reference_map.insert(node.id, Reference::Overloads(vec![id]));
                result
            }
            _ => {
                let ids: Vec<String> = viable.iter().map(|(id, _)| id.clone()).collect();
                self.emit_warning(
                    node.id,
                    TypeCheckError::AmbiguousOverload(AmbiguousOverload {
                        function: call.function.clone(),
                        candidate_count: ids.len(),
                    }),
                );
                self.reference_map.insert(node.id, Reference::Overloads(ids));
                viable
                    .into_iter()
                    .map(|(_, ty)| ty)
                    .reduce(|a, b| least_upper_bound(&a, &b))
                    .unwrap_or(Type::Dyn)
            }
        }
    }

    fn check_list(&mut self, node: &AstNode, list: &crate::ast::ListExpr) -> Type {
        let element_types: Vec<Type> = list.elements.iter().map(|e| self.visit(e)).collect();
        let elem_ty = self.homogeneous_lub(node.id, &element_types, "list");
        Type::list_of(elem_ty)
    }

    fn check_map(&mut self, node: &AstNode, map: &crate::ast::MapExpr) -> Type {
        let mut key_types = Vec::new();
        let mut value_types = Vec::new();
        for MapEntry { key, value, .. } in &map.entries {
            key_types.push(self.visit(key));
            value_types.push(self.visit(value));
        }
        let key_ty = self.homogeneous_lub(node.id, &key_types, "map key");
        let value_ty = self.homogeneous_lub(node.id, &value_types, "map value");
        Type::map_of(key_ty, value_ty)
    }

    fn homogeneous_lub(&mut self, node: NodeId, types: &[Type], kind: &'static str) -> Type {
        let Some(first) = types.first() else {
            return Type::Dyn;
        };
        let lub = types
            .iter()
            .cloned()
            .reduce(|a, b| least_upper_bound(&a, &b))
            .unwrap_or_else(|| first.clone());

        if self.env.switches.homogeneous_aggregate_literals
            && types.iter().any(|t| !t.does_eq(&lub) && lub == Type::Dyn)
        {
            self.emit(node, TypeCheckError::HeterogeneousLiteral(HeterogeneousLiteral { kind }));
        }
        lub
    }

    fn check_struct(&mut self, node: &AstNode, strct: &Struct) -> Type {
        if self.env.types.find_type(&strct.type_name).is_none() {
            self.emit(
                node.id,
                TypeCheckError::UndefinedVariable(UndefinedVariable {
                    name: strct.type_name.clone(),
                }),
            );
        }
        for StructField { name, value, .. } in &strct.fields {
            let value_ty = self.visit(value);
            if let Some(field) = self.env.types.find_field(&strct.type_name, name) {
                let mut subst = Substitution::new();
                if !is_assignable(&value_ty, &field.field_type, &mut subst) {
                    self.emit(
                        node.id,
                        TypeCheckError::TypeMismatch(TypeMismatch {
                            expected: field.field_type,
                            actual: value_ty,
                        }),
                    );
                }
            }
        }
        Type::Object(strct.type_name.clone())
    }

    /// §4.4's comprehension typing rule: the iteration variable's type is
    /// the range's element/key type; the optional second variable binds to
    /// the index (lists) or value (maps); the accumulator is typed from
    /// `accu-init`; `loop-condition` must be Bool-assignable; `loop-step`
    /// must be assignable to the accumulator type; the comprehension's type
    /// is `result`'s type.
    fn check_comprehension(&mut self, node: &AstNode, comp: &Comprehension) -> Type {
        let range_ty = self.visit(&comp.iter_range);
        let (iter_ty, second_ty) = match &range_ty {
            Type::List(elem) => (*elem.clone(), Type::Int),
            Type::Map(key, value) => (*key.clone(), *value.clone()),
            Type::Dyn | Type::Any | Type::Error => (Type::Dyn, Type::Dyn),
            other => {
                self.emit(
                    node.id,
                    TypeCheckError::InvalidComprehension(InvalidComprehension {
                        reason: format!("cannot iterate over {other}"),
                    }),
                );
                (Type::Error, Type::Error)
            }
        };

        self.scope.enter();
        self.scope.bind(&comp.iter_var, iter_ty);
        if let Some(v2) = &comp.iter_var2 {
            self.scope.bind(v2, second_ty);
        }

        let accu_ty = self.visit(&comp.accu_init);
        self.scope.bind(&comp.accu_var, accu_ty.clone());

        let cond_ty = self.visit(&comp.loop_condition);
        let mut subst = Substitution::new();
        if !is_assignable(&cond_ty, &Type::Bool, &mut subst) {
            self.emit(
                comp.loop_condition.id,
                TypeCheckError::TypeMismatch(TypeMismatch {
                    expected: Type::Bool,
                    actual: cond_ty,
                }),
            );
        }

        let step_ty = self.visit(&comp.loop_step);
        let mut subst = Substitution::new();
        if !is_assignable(&step_ty, &accu_ty, &mut subst) {
            self.emit(
                comp.loop_step.id,
                TypeCheckError::TypeMismatch(TypeMismatch {
                    expected: accu_ty,
                    actual: step_ty,
                }),
            );
        }

        let result_ty = self.visit(&comp.result);
        self.scope.exit();
        result_ty
    }
}

/// Convenience entry point mirroring §4.4's top-level contract.
pub fn check(env: &Env, expr: AstNode) -> (Option<CheckedAst>, Vec<Diagnostic>) {
    Checker::check(env, expr)
}

/// Flattens a `Select`-over-`Ident` chain into its dotted segment names
/// (`a.b.c` -> `["a", "b", "c"]`), or `None` if the chain bottoms out in
/// anything else (a call result, an index, ...) or passes through a
/// test-only select.
fn flatten_dotted_path(node: &AstNode) -> Option<Vec<String>> {
    match &node.kind {
        Expr::Ident(name) => Some(vec![name.clone()]),
        Expr::Select(select) if !select.test_only => {
            let mut path = flatten_dotted_path(&select.operand)?;
            path.push(select.field.clone());
            Some(path)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::factory::Factory;
    use crate::env::{Binding, Declarations, EnvOption, FunctionOverload};

    #[test]
    fn undeclared_variable_is_error() {
        let mut factory = Factory::new();
        let expr = factory.ident("x");
        let env = Env::new("");
        let (checked, diagnostics) = check(&env, expr);
        assert!(checked.is_none());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn declared_variable_resolves() {
        let mut factory = Factory::new();
        let expr = factory.ident("x");
        let env = Env::with_options("", vec![EnvOption::Variable("x".into(), Type::Int)]);
        let (checked, diagnostics) = check(&env, expr);
        assert!(diagnostics.is_empty());
        let checked = checked.unwrap();
        assert_eq!(checked.type_of(checked.expr.id), Type::Int);
    }

    #[test]
    fn call_with_no_overload_is_error() {
        let mut factory = Factory::new();
        let arg = factory.literal(Literal::Int(1));
        let expr = factory.call("nope", None, vec![arg]);
        let env = Env::new("");
        let (checked, diagnostics) = check(&env, expr);
        assert!(checked.is_none());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn single_overload_sets_result_type() {
        let mut factory = Factory::new();
        let arg = factory.literal(Literal::Int(1));
        let expr = factory.call("double", None, vec![arg]);

        let mut declarations = Declarations::default();
        declarations.declare_function(
            "double",
            FunctionOverload {
                id: "double_int".into(),
                member: false,
                receiver_type: None,
                params: vec![Type::Int],
                result: Type::Int,
                binding: Some(Binding::Unary(std::rc::Rc::new(|v| v.clone()))),
            },
        );
        let env = Env {
            declarations,
            ..Env::new("")
        };

        let (checked, diagnostics) = check(&env, expr);
        assert!(diagnostics.is_empty());
        let checked = checked.unwrap();
        assert_eq!(checked.type_of(checked.expr.id), Type::Int);
    }

    #[test]
    fn comprehension_binds_iter_and_accu_types() {
        let mut factory = Factory::new();
        let range = factory.list(
            vec![factory.literal(Literal::Int(1)), factory.literal(Literal::Int(2))],
            vec![],
        );
        let accu_init = factory.literal(Literal::Bool(false));
        let cond = factory.literal(Literal::Bool(true));
        let v_ref = factory.ident("v");
        let step = factory.call("||", None, vec![factory.ident("__accu__"), v_ref]);
        let result = factory.ident("__accu__");
        let expr = factory.comprehension(
            range,
            "v",
            None,
            "__accu__",
            accu_init,
            cond,
            step,
            result,
        );

        let mut declarations = Declarations::default();
        declarations.declare_function(
            "||",
            FunctionOverload {
                id: "logical_or".into(),
                member: false,
                receiver_type: None,
                params: vec![Type::Bool, Type::Int],
                result: Type::Bool,
                binding: None,
            },
        );
        let env = Env {
            declarations,
            ..Env::new("")
        };

        let (checked, _diagnostics) = check(&env, expr);
        let checked = checked.expect("comprehension should check");
        assert_eq!(checked.type_of(checked.expr.id), Type::Bool);
    }
}
