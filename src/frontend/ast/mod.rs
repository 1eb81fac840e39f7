//! The syntax tree of a single Java-- compilation unit.
//!
//! Nodes live in an arena owned by [`Ast`] and refer to each other through
//! [`NodeId`]s. Every node also remembers its parent so that the optimizer can
//! rewrite the tree while it is being walked: replacing a node only rewrites
//! the child slot of its parent and the old subtree simply becomes
//! unreachable from the root.

use core::fmt;

use strum::{Display, EnumString};

use crate::{
    index::{IndexVec, simple_index},
    middle::ty::ResolvedType,
};

pub mod visit;

simple_index! {
    /// Identifies a node inside of an [`Ast`] arena
    pub struct NodeId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    /// Position used for diagnostics that concern the whole compilation unit
    pub const UNKNOWN: Span = Span { line: 0, column: 0 };

    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// Method a node belongs to, propagated down the tree by the symbol table
/// builder so that later passes never have to look at ancestors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodOwner {
    pub method: String,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct ParentedNode {
    pub parent: Option<NodeId>,
    pub span: Span,
    pub kind: NodeKind,
    pub owner: Option<MethodOwner>,
    /// Filled in by the type checker for every expression node
    pub ty: Option<ResolvedType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Program {
        imports: Vec<NodeId>,
        class: NodeId,
    },
    ImportDeclaration {
        /// Dotted path segments, the last one is the simple name
        path: Vec<String>,
    },
    ClassDeclaration {
        name: String,
        superclass: Option<String>,
        fields: Vec<NodeId>,
        methods: Vec<NodeId>,
    },
    VarDeclaration {
        name: String,
        ty: ResolvedType,
    },
    MethodDeclaration {
        name: String,
        return_type: ResolvedType,
        is_static: bool,
        parameters: Vec<NodeId>,
        locals: Vec<NodeId>,
        body: Vec<NodeId>,
    },
    Parameter {
        name: String,
        ty: ResolvedType,
    },

    // Statements
    Block {
        statements: Vec<NodeId>,
    },
    If {
        condition: NodeId,
        positive: NodeId,
        negative: NodeId,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    ExpressionStatement {
        expression: NodeId,
    },
    Assign {
        target: String,
        value: NodeId,
    },
    ArrayAssign {
        target: String,
        index: NodeId,
        value: NodeId,
    },
    Return {
        value: Option<NodeId>,
    },

    // Expressions
    Binary {
        operator: BinaryOperatorKind,
        lhs: NodeId,
        rhs: NodeId,
    },
    Unary {
        operator: UnaryOperatorKind,
        operand: NodeId,
    },
    Parenthesis {
        inner: NodeId,
    },
    ArrayAccess {
        array: NodeId,
        index: NodeId,
    },
    Length {
        array: NodeId,
    },
    MethodCall {
        receiver: NodeId,
        method: String,
        arguments: Vec<NodeId>,
    },
    NewObject {
        class: String,
    },
    NewArray {
        length: NodeId,
    },
    IntegerLiteral(i32),
    BooleanLiteral(bool),
    Identifier(String),
    This,
}

impl NodeKind {
    /// Children in evaluation order
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::Program { imports, class } => {
                imports.iter().copied().chain([*class]).collect()
            }
            Self::ClassDeclaration {
                fields, methods, ..
            } => fields.iter().chain(methods).copied().collect(),
            Self::MethodDeclaration {
                parameters,
                locals,
                body,
                ..
            } => parameters.iter().chain(locals).chain(body).copied().collect(),
            Self::Block { statements } => statements.clone(),
            Self::If {
                condition,
                positive,
                negative,
            } => vec![*condition, *positive, *negative],
            Self::While { condition, body } => vec![*condition, *body],
            Self::ExpressionStatement { expression } => vec![*expression],
            Self::Assign { value, .. } => vec![*value],
            Self::ArrayAssign { index, value, .. } => vec![*index, *value],
            Self::Return { value } => value.iter().copied().collect(),
            Self::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Self::Unary { operand, .. } => vec![*operand],
            Self::Parenthesis { inner } => vec![*inner],
            Self::ArrayAccess { array, index } => vec![*array, *index],
            Self::Length { array } => vec![*array],
            Self::MethodCall {
                receiver,
                arguments,
                ..
            } => [*receiver].into_iter().chain(arguments.iter().copied()).collect(),
            Self::NewArray { length } => vec![*length],
            Self::ImportDeclaration { .. }
            | Self::VarDeclaration { .. }
            | Self::Parameter { .. }
            | Self::NewObject { .. }
            | Self::IntegerLiteral(_)
            | Self::BooleanLiteral(_)
            | Self::Identifier(_)
            | Self::This => Vec::new(),
        }
    }

    fn children_mut(&mut self) -> Vec<&mut NodeId> {
        match self {
            Self::Program { imports, class } => {
                imports.iter_mut().chain([class]).collect()
            }
            Self::ClassDeclaration {
                fields, methods, ..
            } => fields.iter_mut().chain(methods.iter_mut()).collect(),
            Self::MethodDeclaration {
                parameters,
                locals,
                body,
                ..
            } => parameters
                .iter_mut()
                .chain(locals.iter_mut())
                .chain(body.iter_mut())
                .collect(),
            Self::Block { statements } => statements.iter_mut().collect(),
            Self::If {
                condition,
                positive,
                negative,
            } => vec![condition, positive, negative],
            Self::While { condition, body } => vec![condition, body],
            Self::ExpressionStatement { expression } => vec![expression],
            Self::Assign { value, .. } => vec![value],
            Self::ArrayAssign { index, value, .. } => vec![index, value],
            Self::Return { value } => value.iter_mut().collect(),
            Self::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Self::Unary { operand, .. } => vec![operand],
            Self::Parenthesis { inner } => vec![inner],
            Self::ArrayAccess { array, index } => vec![array, index],
            Self::Length { array } => vec![array],
            Self::MethodCall {
                receiver,
                arguments,
                ..
            } => [receiver].into_iter().chain(arguments.iter_mut()).collect(),
            Self::NewArray { length } => vec![length],
            Self::ImportDeclaration { .. }
            | Self::VarDeclaration { .. }
            | Self::Parameter { .. }
            | Self::NewObject { .. }
            | Self::IntegerLiteral(_)
            | Self::BooleanLiteral(_)
            | Self::Identifier(_)
            | Self::This => Vec::new(),
        }
    }

    pub fn as_constant(&self) -> Option<Constant> {
        match self {
            Self::IntegerLiteral(value) => Some(Constant::Integer(*value)),
            Self::BooleanLiteral(value) => Some(Constant::Boolean(*value)),
            _ => None,
        }
    }
}

/// Value of a literal node, tracked by the optimizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constant {
    Integer(i32),
    Boolean(bool),
}

impl Constant {
    pub fn into_node_kind(self) -> NodeKind {
        match self {
            Self::Integer(value) => NodeKind::IntegerLiteral(value),
            Self::Boolean(value) => NodeKind::BooleanLiteral(value),
        }
    }

    pub fn ty(self) -> ResolvedType {
        match self {
            Self::Integer(_) => ResolvedType::int(),
            Self::Boolean(_) => ResolvedType::boolean(),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum BinaryOperatorKind {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessThanOrEqualTo,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterThanOrEqualTo,
    #[strum(serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = "&&")]
    LogicalAnd,
    #[strum(serialize = "||")]
    LogicalOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperatorClass {
    /// int x int -> int
    Arithmetic,
    /// int x int -> boolean
    Relational,
    /// boolean x boolean -> boolean
    Logical,
    /// T x T -> boolean
    Equality,
}

impl BinaryOperatorKind {
    pub fn class(self) -> BinaryOperatorClass {
        match self {
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide => {
                BinaryOperatorClass::Arithmetic
            }
            Self::LessThan
            | Self::LessThanOrEqualTo
            | Self::GreaterThan
            | Self::GreaterThanOrEqualTo => BinaryOperatorClass::Relational,
            Self::LogicalAnd | Self::LogicalOr => BinaryOperatorClass::Logical,
            Self::Equals | Self::NotEquals => BinaryOperatorClass::Equality,
        }
    }

    pub fn result_type(self) -> ResolvedType {
        match self.class() {
            BinaryOperatorClass::Arithmetic => ResolvedType::int(),
            _ => ResolvedType::boolean(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum UnaryOperatorKind {
    #[strum(serialize = "!")]
    LogicalNot,
}

/// Arena holding every node of a compilation unit
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: IndexVec<NodeId, ParentedNode>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the arena and adopts its children
    pub fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let children = kind.children();

        let id = self.nodes.push(ParentedNode {
            parent: None,
            span,
            kind,
            owner: None,
            ty: None,
        });

        for child in children {
            self.nodes[child].parent = Some(id);
        }

        id
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.nodes[root].parent = None;
        self.root = Some(root);
    }

    pub fn root(&self) -> NodeId {
        self.root.expect("tree root must be set before it is traversed")
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &ParentedNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut ParentedNode {
        &mut self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id].kind.children()
    }

    pub fn ty(&self, id: NodeId) -> Option<&ResolvedType> {
        self.nodes[id].ty.as_ref()
    }

    pub fn set_ty(&mut self, id: NodeId, ty: ResolvedType) {
        self.nodes[id].ty = Some(ty);
    }

    pub fn owner(&self, id: NodeId) -> Option<&MethodOwner> {
        self.nodes[id].owner.as_ref()
    }

    pub fn constant(&self, id: NodeId) -> Option<Constant> {
        self.nodes[id].kind.as_constant()
    }

    /// Skips any number of enclosing parentheses
    pub fn strip_parentheses(&self, mut id: NodeId) -> NodeId {
        while let NodeKind::Parenthesis { inner } = self.kind(id) {
            id = *inner;
        }

        id
    }

    /// Whether `id` is the root or reachable from it
    pub fn is_attached(&self, mut id: NodeId) -> bool {
        loop {
            if Some(id) == self.root {
                return true;
            }

            match self.nodes[id].parent {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    /// Whether `id` or any of its descendants satisfies `predicate`
    pub fn any_descendant(&self, id: NodeId, predicate: &impl Fn(&NodeKind) -> bool) -> bool {
        predicate(self.kind(id))
            || self
                .children(id)
                .into_iter()
                .any(|child| self.any_descendant(child, predicate))
    }

    /// Puts `new` in the place of `old`. The subtree rooted at `old` is
    /// detached but stays in the arena.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        let parent = self.nodes[old].parent.take();
        self.nodes[new].parent = parent;

        match parent {
            Some(parent) => {
                if let Some(slot) = self.nodes[parent]
                    .kind
                    .children_mut()
                    .into_iter()
                    .find(|child| **child == old)
                {
                    *slot = new;
                }
            }
            None if self.root == Some(old) => self.root = Some(new),
            None => {}
        }
    }

    /// Creates a node that inherits the position and owner of `old` and puts
    /// it in the place of `old`
    pub fn replace_with(&mut self, old: NodeId, kind: NodeKind, ty: Option<ResolvedType>) -> NodeId {
        let span = self.nodes[old].span;
        let owner = self.nodes[old].owner.clone();

        let new = self.push(kind, span);
        self.nodes[new].owner = owner;
        self.nodes[new].ty = ty;

        self.replace(old, new);
        new
    }

    /// Detaches a statement from the tree. Statements held in a fixed slot
    /// (like the branch of an `if`) are replaced by an empty block.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id].parent else {
            return;
        };

        match &mut self.nodes[parent].kind {
            NodeKind::Block { statements } | NodeKind::MethodDeclaration { body: statements, .. } => {
                statements.retain(|statement| *statement != id);
                self.nodes[id].parent = None;
            }
            _ => {
                self.replace_with(id, NodeKind::Block { statements: Vec::new() }, None);
            }
        }
    }
}
