//! The node factory (§4.3): the only way to construct an [`AstNode`],
//! guaranteeing every minted node gets a fresh id from its backing
//! [`IdGenerator`]. The external parser is expected to hold one `Factory`
//! for the lifetime of a parse; macro expansion (`crate::macros`) holds its
//! own, seeded past the original tree's ids via [`IdGenerator::starting_after`].
use crate::ids::{IdGenerator, NodeId};

use super::{AstNode, Call, Comprehension, Expr, Literal, ListExpr, MapEntry, MapExpr, Select, Struct, StructField};

pub struct Factory {
    ids: IdGenerator,
}

impl Factory {
    pub fn new() -> Factory {
        Factory {
            ids: IdGenerator::new(),
        }
    }

    pub fn resuming_after(max_used: NodeId) -> Factory {
        Factory {
            ids: IdGenerator::starting_after(max_used),
        }
    }

    fn node(&mut self, kind: Expr) -> AstNode {
        AstNode {
            id: self.ids.next_id(),
            kind,
        }
    }

    pub fn ident(&mut self, name: impl Into<String>) -> AstNode {
        self.node(Expr::Ident(name.into()))
    }

    pub fn literal(&mut self, value: Literal) -> AstNode {
        self.node(Expr::Literal(value))
    }

    pub fn select(&mut self, operand: AstNode, field: impl Into<String>, test_only: bool) -> AstNode {
        self.node(Expr::Select(Select {
            operand: Box::new(operand),
            field: field.into(),
            test_only,
        }))
    }

    pub fn call(&mut self, function: impl Into<String>, target: Option<AstNode>, args: Vec<AstNode>) -> AstNode {
        self.node(Expr::Call(Call {
            function: function.into(),
            target: target.map(Box::new),
            args,
        }))
    }

    pub fn list(&mut self, elements: Vec<AstNode>, optional_indices: Vec<usize>) -> AstNode {
        self.node(Expr::List(ListExpr {
            elements,
            optional_indices,
        }))
    }

    pub fn map(&mut self, entries: Vec<MapEntry>) -> AstNode {
        self.node(Expr::Map(MapExpr { entries }))
    }

    pub fn map_entry(&mut self, key: AstNode, value: AstNode, optional: bool) -> MapEntry {
        MapEntry { key, value, optional }
    }

    pub fn strct(&mut self, type_name: impl Into<String>, fields: Vec<StructField>) -> AstNode {
        self.node(Expr::Struct(Struct {
            type_name: type_name.into(),
            fields,
        }))
    }

    pub fn struct_field(&mut self, name: impl Into<String>, value: AstNode, optional: bool) -> StructField {
        StructField {
            name: name.into(),
            value,
            optional,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn comprehension(
        &mut self,
        iter_range: AstNode,
        iter_var: impl Into<String>,
        iter_var2: Option<String>,
        accu_var: impl Into<String>,
        accu_init: AstNode,
        loop_condition: AstNode,
        loop_step: AstNode,
        result: AstNode,
    ) -> AstNode {
        self.node(Expr::Comprehension(Box::new(Comprehension {
            iter_range,
            iter_var: iter_var.into(),
            iter_var2,
            accu_var: accu_var.into(),
            accu_init,
            loop_condition,
            loop_step,
            result,
        })))
    }

    /// The id of the next node this factory will mint, without minting it.
    /// Used by macro expansion to seed a renumbering pass that must not
    /// collide with nodes this factory already produced.
    pub fn peek_next_id(&self) -> NodeId {
        self.ids.peek()
    }
}

impl Default for Factory {
    fn default() -> Self {
        Factory::new()
    }
}
