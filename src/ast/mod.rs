//! The parser-facing AST (§3.3): an immutable expression tree addressed by
//! [`NodeId`], with checker results (types, references, source positions)
//! kept in external maps rather than mutated in place. This is a deliberate
//! departure from the teacher's `Expression<T>` pattern, which threads a
//! mutable `Rc<RefCell<Option<Type>>>` slot through every node — CEL's
//! checked-AST interchange (§3.4/§6.3) requires type/reference/source-info
//! to be serializable alongside, but independent of, the parsed tree.
pub mod factory;
pub mod matchers;
pub mod navigator;
pub mod renumber;
pub mod source_info;

use std::fmt;

pub use crate::ids::NodeId;
pub use source_info::SourceInfo;

/// One expression node: an id plus its shape. Every constructor goes
/// through [`factory::Factory`] so ids are always freshly minted.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AstNode {
    pub id: NodeId,
    pub kind: Expr,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Ident(String),
    Literal(Literal),
    Select(Select),
    Call(Call),
    List(ListExpr),
    Map(MapExpr),
    Struct(Struct),
    Comprehension(Box<Comprehension>),
}

/// Constant values embeddable directly in the AST. A strict subset of the
/// runtime `Value` variants (no `List`/`Map`/`Object`/`Unknown`/`Error` —
/// those are built by `List`/`Map`/`Struct` nodes or produced at runtime).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Select {
    pub operand: Box<AstNode>,
    pub field: String,
    /// `true` for `has(e.f)`-style test-only selects (§3.3 invariant c):
    /// resolves to `Bool`, never errors on an absent field.
    pub test_only: bool,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Call {
    pub function: String,
    pub target: Option<Box<AstNode>>,
    pub args: Vec<AstNode>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ListExpr {
    pub elements: Vec<AstNode>,
    /// Indices of elements built with `?` (optional-element syntax),
    /// omitted from the constructed list when they evaluate to `None`.
    pub optional_indices: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MapExpr {
    pub entries: Vec<MapEntry>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MapEntry {
    pub key: AstNode,
    pub value: AstNode,
    pub optional: bool,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Struct {
    pub type_name: String,
    pub fields: Vec<StructField>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StructField {
    pub name: String,
    pub value: AstNode,
    pub optional: bool,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Comprehension {
    pub iter_range: AstNode,
    pub iter_var: String,
    /// Second bound variable in two-variable comprehensions: the index
    /// (lists) or value (maps) alongside `iter_var`.
    pub iter_var2: Option<String>,
    pub accu_var: String,
    pub accu_init: AstNode,
    pub loop_condition: AstNode,
    pub loop_step: AstNode,
    pub result: AstNode,
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(name) => write!(f, "{name}"),
            Expr::Literal(_) => write!(f, "<literal>"),
            Expr::Select(s) => write!(f, "{}.{}", s.operand.kind, s.field),
            Expr::Call(c) => write!(f, "{}(...)", c.function),
            Expr::List(_) => write!(f, "[...]"),
            Expr::Map(_) => write!(f, "{{...}}"),
            Expr::Struct(s) => write!(f, "{}{{...}}", s.type_name),
            Expr::Comprehension(_) => write!(f, "<comprehension>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::factory::Factory;

    #[test]
    fn every_node_gets_a_unique_id() {
        let mut factory = Factory::new();
        let a = factory.ident("x");
        let b = factory.ident("y");
        assert_ne!(a.id, b.id);
    }
}
