//! Hand-off format between the external parser and this compiler.
//!
//! The parser produces a generic labeled tree: every node has a kind tag, a
//! map of attributes and an ordered list of children. It reaches us as a JSON
//! document which we deserialize into [`RawNode`]s and then lower into the
//! typed [`Ast`] arena, checking the arity of every node on the way.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ast::{Ast, BinaryOperatorKind, NodeId, NodeKind, Span, UnaryOperatorKind};
use crate::{
    diagnostics::{Diagnostic, SyntaxError},
    middle::ty::{ResolvedType, TypeName},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawNode>,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

impl RawNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            line: 0,
            column: 0,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = RawNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }
}

/// Deserializes a tree document and lowers it into an [`Ast`]
pub fn parse_tree(source: &str) -> Result<Ast, Vec<Diagnostic>> {
    let raw: RawNode = serde_json::from_str(source).map_err(|error| {
        vec![Diagnostic::new(
            Span::new(error.line() as u32, error.column() as u32),
            SyntaxError::MalformedDocument(error.to_string()),
        )]
    })?;

    lower_raw_tree(&raw)
}

pub fn lower_raw_tree(raw: &RawNode) -> Result<Ast, Vec<Diagnostic>> {
    let mut lowering = TreeLowering { ast: Ast::new() };

    let root = lowering
        .lower_program(raw)
        .map_err(|error| vec![error])?;
    lowering.ast.set_root(root);

    tracing::debug!(nodes = lowering.ast.len(), "lowered parser tree");

    Ok(lowering.ast)
}

type LoweringResult<T> = Result<T, Diagnostic>;

struct TreeLowering {
    ast: Ast,
}

impl TreeLowering {
    fn lower_program(&mut self, raw: &RawNode) -> LoweringResult<NodeId> {
        expect_kind(raw, "Program")?;

        let Some((class, imports)) = raw.children.split_last() else {
            return Err(arity(raw, "at least 1"));
        };

        let imports = imports
            .iter()
            .map(|import| self.lower_import(import))
            .collect::<LoweringResult<Vec<_>>>()?;
        let class = self.lower_class(class)?;

        Ok(self.ast.push(NodeKind::Program { imports, class }, raw.span()))
    }

    fn lower_import(&mut self, raw: &RawNode) -> LoweringResult<NodeId> {
        expect_kind(raw, "ImportDeclaration")?;
        expect_children(raw, 0)?;

        let path = string_list_attribute(raw, "path")?;
        if path.is_empty() {
            return Err(invalid_attribute(raw, "path", "import path cannot be empty"));
        }

        Ok(self
            .ast
            .push(NodeKind::ImportDeclaration { path }, raw.span()))
    }

    fn lower_class(&mut self, raw: &RawNode) -> LoweringResult<NodeId> {
        expect_kind(raw, "ClassDeclaration")?;

        let name = string_attribute(raw, "name")?;
        let superclass = optional_string_attribute(raw, "extends")?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();

        for child in &raw.children {
            match child.kind.as_str() {
                "VarDeclaration" if methods.is_empty() => {
                    fields.push(self.lower_var_declaration(child)?)
                }
                "MethodDeclaration" => methods.push(self.lower_method(child)?),
                "MainDeclaration" => methods.push(self.lower_main(child)?),
                _ => return Err(unexpected(child, "a field or method declaration")),
            }
        }

        Ok(self.ast.push(
            NodeKind::ClassDeclaration {
                name,
                superclass,
                fields,
                methods,
            },
            raw.span(),
        ))
    }

    fn lower_var_declaration(&mut self, raw: &RawNode) -> LoweringResult<NodeId> {
        expect_kind(raw, "VarDeclaration")?;
        expect_children(raw, 1)?;

        let name = string_attribute(raw, "name")?;
        let ty = lower_type(&raw.children[0])?;

        Ok(self
            .ast
            .push(NodeKind::VarDeclaration { name, ty }, raw.span()))
    }

    fn lower_parameter(&mut self, raw: &RawNode) -> LoweringResult<NodeId> {
        expect_children(raw, 1)?;

        let name = string_attribute(raw, "name")?;
        let ty = lower_type(&raw.children[0])?;

        Ok(self.ast.push(NodeKind::Parameter { name, ty }, raw.span()))
    }

    fn lower_method(&mut self, raw: &RawNode) -> LoweringResult<NodeId> {
        let name = string_attribute(raw, "name")?;
        let is_static = optional_bool_attribute(raw, "isStatic")?.unwrap_or(false);

        let Some((return_type, rest)) = raw.children.split_first() else {
            return Err(arity(raw, "at least 1"));
        };
        let return_type = lower_type(return_type)?;

        let parameter_count = rest.iter().take_while(|child| child.kind == "Param").count();
        let (parameters, rest) = rest.split_at(parameter_count);

        let parameters = parameters
            .iter()
            .map(|parameter| self.lower_parameter(parameter))
            .collect::<LoweringResult<Vec<_>>>()?;

        let (locals, body) = self.lower_method_body(rest)?;

        Ok(self.ast.push(
            NodeKind::MethodDeclaration {
                name,
                return_type,
                is_static,
                parameters,
                locals,
                body,
            },
            raw.span(),
        ))
    }

    /// `main` gets turned into a regular static method receiving its
    /// command line arguments
    fn lower_main(&mut self, raw: &RawNode) -> LoweringResult<NodeId> {
        let parameter_name = string_attribute(raw, "parameter")?;
        let parameter_type = optional_string_attribute(raw, "parameterType")?
            .unwrap_or_else(|| "String".to_string());

        let parameter = self.ast.push(
            NodeKind::Parameter {
                name: parameter_name,
                ty: ResolvedType::new(TypeName::from_source(&parameter_type), true),
            },
            raw.span(),
        );

        let (locals, body) = self.lower_method_body(&raw.children)?;

        Ok(self.ast.push(
            NodeKind::MethodDeclaration {
                name: "main".to_string(),
                return_type: ResolvedType::void(),
                is_static: true,
                parameters: vec![parameter],
                locals,
                body,
            },
            raw.span(),
        ))
    }

    fn lower_method_body(
        &mut self,
        children: &[RawNode],
    ) -> LoweringResult<(Vec<NodeId>, Vec<NodeId>)> {
        let local_count = children
            .iter()
            .take_while(|child| child.kind == "VarDeclaration")
            .count();
        let (locals, statements) = children.split_at(local_count);

        let locals = locals
            .iter()
            .map(|local| self.lower_var_declaration(local))
            .collect::<LoweringResult<Vec<_>>>()?;

        let statements = statements
            .iter()
            .map(|statement| self.lower_statement(statement))
            .collect::<LoweringResult<Vec<_>>>()?;

        Ok((locals, statements))
    }

    fn lower_statement(&mut self, raw: &RawNode) -> LoweringResult<NodeId> {
        let kind = match raw.kind.as_str() {
            "Block" => NodeKind::Block {
                statements: raw
                    .children
                    .iter()
                    .map(|statement| self.lower_statement(statement))
                    .collect::<LoweringResult<Vec<_>>>()?,
            },
            "If" => {
                expect_children(raw, 3)?;
                NodeKind::If {
                    condition: self.lower_expression(&raw.children[0])?,
                    positive: self.lower_statement(&raw.children[1])?,
                    negative: self.lower_statement(&raw.children[2])?,
                }
            }
            "While" => {
                expect_children(raw, 2)?;
                NodeKind::While {
                    condition: self.lower_expression(&raw.children[0])?,
                    body: self.lower_statement(&raw.children[1])?,
                }
            }
            "ExpressionStatement" => {
                expect_children(raw, 1)?;
                NodeKind::ExpressionStatement {
                    expression: self.lower_expression(&raw.children[0])?,
                }
            }
            "Assign" => {
                expect_children(raw, 1)?;
                NodeKind::Assign {
                    target: string_attribute(raw, "target")?,
                    value: self.lower_expression(&raw.children[0])?,
                }
            }
            "ArrayAssign" => {
                expect_children(raw, 2)?;
                NodeKind::ArrayAssign {
                    target: string_attribute(raw, "target")?,
                    index: self.lower_expression(&raw.children[0])?,
                    value: self.lower_expression(&raw.children[1])?,
                }
            }
            "Return" => match raw.children.as_slice() {
                [] => NodeKind::Return { value: None },
                [value] => NodeKind::Return {
                    value: Some(self.lower_expression(value)?),
                },
                _ => return Err(arity(raw, "0 or 1")),
            },
            _ => return Err(unexpected(raw, "a statement")),
        };

        Ok(self.ast.push(kind, raw.span()))
    }

    fn lower_expression(&mut self, raw: &RawNode) -> LoweringResult<NodeId> {
        let kind = match raw.kind.as_str() {
            "BinaryOp" => {
                expect_children(raw, 2)?;
                let operator = string_attribute(raw, "op")?;
                let operator = operator.parse::<BinaryOperatorKind>().map_err(|_| {
                    invalid_attribute(raw, "op", &format!("unknown operator `{operator}`"))
                })?;

                NodeKind::Binary {
                    operator,
                    lhs: self.lower_expression(&raw.children[0])?,
                    rhs: self.lower_expression(&raw.children[1])?,
                }
            }
            "Not" => {
                expect_children(raw, 1)?;
                NodeKind::Unary {
                    operator: UnaryOperatorKind::LogicalNot,
                    operand: self.lower_expression(&raw.children[0])?,
                }
            }
            "Parenthesis" => {
                expect_children(raw, 1)?;
                NodeKind::Parenthesis {
                    inner: self.lower_expression(&raw.children[0])?,
                }
            }
            "ArrayAccess" => {
                expect_children(raw, 2)?;
                NodeKind::ArrayAccess {
                    array: self.lower_expression(&raw.children[0])?,
                    index: self.lower_expression(&raw.children[1])?,
                }
            }
            "Length" => {
                expect_children(raw, 1)?;
                NodeKind::Length {
                    array: self.lower_expression(&raw.children[0])?,
                }
            }
            "MethodCall" => {
                let Some((receiver, arguments)) = raw.children.split_first() else {
                    return Err(arity(raw, "at least 1"));
                };

                NodeKind::MethodCall {
                    method: string_attribute(raw, "method")?,
                    receiver: self.lower_expression(receiver)?,
                    arguments: arguments
                        .iter()
                        .map(|argument| self.lower_expression(argument))
                        .collect::<LoweringResult<Vec<_>>>()?,
                }
            }
            "NewObject" => {
                expect_children(raw, 0)?;
                NodeKind::NewObject {
                    class: string_attribute(raw, "class")?,
                }
            }
            "NewArray" => {
                expect_children(raw, 1)?;
                NodeKind::NewArray {
                    length: self.lower_expression(&raw.children[0])?,
                }
            }
            "Integer" => {
                expect_children(raw, 0)?;
                NodeKind::IntegerLiteral(integer_attribute(raw, "value")?)
            }
            "Boolean" => {
                expect_children(raw, 0)?;
                NodeKind::BooleanLiteral(
                    optional_bool_attribute(raw, "value")?
                        .ok_or_else(|| missing_attribute(raw, "value"))?,
                )
            }
            "Identifier" => {
                expect_children(raw, 0)?;
                NodeKind::Identifier(string_attribute(raw, "name")?)
            }
            "This" => {
                expect_children(raw, 0)?;
                NodeKind::This
            }
            _ => return Err(unexpected(raw, "an expression")),
        };

        Ok(self.ast.push(kind, raw.span()))
    }
}

fn lower_type(raw: &RawNode) -> LoweringResult<ResolvedType> {
    expect_kind(raw, "Type")?;
    expect_children(raw, 0)?;

    let name = string_attribute(raw, "name")?;
    let is_array = optional_bool_attribute(raw, "isArray")?.unwrap_or(false);

    Ok(ResolvedType::new(TypeName::from_source(&name), is_array))
}

const KNOWN_KINDS: &[&str] = &[
    "Program",
    "ImportDeclaration",
    "ClassDeclaration",
    "VarDeclaration",
    "Type",
    "MethodDeclaration",
    "MainDeclaration",
    "Param",
    "Block",
    "If",
    "While",
    "ExpressionStatement",
    "Assign",
    "ArrayAssign",
    "Return",
    "BinaryOp",
    "Not",
    "Parenthesis",
    "ArrayAccess",
    "Length",
    "MethodCall",
    "NewObject",
    "NewArray",
    "Integer",
    "Boolean",
    "Identifier",
    "This",
];

fn unexpected(raw: &RawNode, expected: &str) -> Diagnostic {
    let error = if KNOWN_KINDS.contains(&raw.kind.as_str()) {
        SyntaxError::UnexpectedNode {
            expected: expected.to_string(),
            found: raw.kind.clone(),
        }
    } else {
        SyntaxError::UnknownKind(raw.kind.clone())
    };

    Diagnostic::new(raw.span(), error)
}

fn expect_kind(raw: &RawNode, kind: &str) -> LoweringResult<()> {
    if raw.kind == kind {
        Ok(())
    } else {
        Err(unexpected(raw, &format!("a `{kind}` node")))
    }
}

fn expect_children(raw: &RawNode, count: usize) -> LoweringResult<()> {
    if raw.children.len() == count {
        Ok(())
    } else {
        Err(arity(raw, &count.to_string()))
    }
}

fn arity(raw: &RawNode, expected: &str) -> Diagnostic {
    Diagnostic::new(
        raw.span(),
        SyntaxError::UnexpectedArity {
            kind: raw.kind.clone(),
            expected: expected.to_string(),
            found: raw.children.len(),
        },
    )
}

fn missing_attribute(raw: &RawNode, attribute: &str) -> Diagnostic {
    Diagnostic::new(
        raw.span(),
        SyntaxError::MissingAttribute {
            kind: raw.kind.clone(),
            attribute: attribute.to_string(),
        },
    )
}

fn invalid_attribute(raw: &RawNode, attribute: &str, reason: &str) -> Diagnostic {
    Diagnostic::new(
        raw.span(),
        SyntaxError::InvalidAttribute {
            kind: raw.kind.clone(),
            attribute: attribute.to_string(),
            reason: reason.to_string(),
        },
    )
}

fn optional_string_attribute(raw: &RawNode, attribute: &str) -> LoweringResult<Option<String>> {
    match raw.attributes.get(attribute) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(invalid_attribute(raw, attribute, "expected a string")),
    }
}

fn string_attribute(raw: &RawNode, attribute: &str) -> LoweringResult<String> {
    optional_string_attribute(raw, attribute)?.ok_or_else(|| missing_attribute(raw, attribute))
}

fn optional_bool_attribute(raw: &RawNode, attribute: &str) -> LoweringResult<Option<bool>> {
    match raw.attributes.get(attribute) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(Value::String(value)) if value == "true" || value == "false" => {
            Ok(Some(value == "true"))
        }
        Some(_) => Err(invalid_attribute(raw, attribute, "expected a boolean")),
    }
}

fn integer_attribute(raw: &RawNode, attribute: &str) -> LoweringResult<i32> {
    let value = match raw.attributes.get(attribute) {
        None | Some(Value::Null) => return Err(missing_attribute(raw, attribute)),
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(text)) => text.parse::<i64>().ok(),
        Some(_) => None,
    };

    value
        .and_then(|value| i32::try_from(value).ok())
        .ok_or_else(|| invalid_attribute(raw, attribute, "expected a 32 bit integer"))
}

fn string_list_attribute(raw: &RawNode, attribute: &str) -> LoweringResult<Vec<String>> {
    match raw.attributes.get(attribute) {
        None | Some(Value::Null) => Err(missing_attribute(raw, attribute)),
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| {
                value
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid_attribute(raw, attribute, "expected a list of strings"))
            })
            .collect(),
        Some(Value::String(dotted)) => Ok(dotted.split('.').map(str::to_string).collect()),
        Some(_) => Err(invalid_attribute(raw, attribute, "expected a list of strings")),
    }
}
