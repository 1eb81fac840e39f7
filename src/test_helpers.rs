//! Shorthands for building parser hand-off trees in tests. Type names ending
//! in `[]` produce array types.

use crate::{
    diagnostics::Diagnostic,
    frontend::{
        ast::{Ast, NodeId, NodeKind},
        interchange::{RawNode, lower_raw_tree},
    },
    middle::{self, symbol_table::SymbolTable},
};

pub fn build(program: RawNode) -> Ast {
    lower_raw_tree(&program).expect("test tree should be well formed")
}

/// Builds and analyzes a program that is expected to be valid
pub fn analyzed(program: RawNode) -> (Ast, SymbolTable) {
    let mut ast = build(program);
    let table = middle::analyze(&mut ast).expect("test program should be well typed");
    (ast, table)
}

pub fn analysis_errors(program: RawNode) -> Vec<Diagnostic> {
    let mut ast = build(program);
    middle::analyze(&mut ast).expect_err("test program should be rejected")
}

/// Every reachable node whose kind satisfies `predicate`, in tree order
pub fn find_nodes(ast: &Ast, predicate: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
    fn walk(ast: &Ast, id: NodeId, predicate: &impl Fn(&NodeKind) -> bool, found: &mut Vec<NodeId>) {
        if predicate(ast.kind(id)) {
            found.push(id);
        }

        for child in ast.children(id) {
            walk(ast, child, predicate, found);
        }
    }

    let mut found = Vec::new();
    walk(ast, ast.root(), &predicate, &mut found);
    found
}

pub fn program(imports: &[&str], class: RawNode) -> RawNode {
    RawNode::new("Program").with_children(
        imports
            .iter()
            .map(|path| {
                let segments = path.split('.').collect::<Vec<_>>();
                RawNode::new("ImportDeclaration").with_attribute("path", segments)
            })
            .chain([class]),
    )
}

pub fn class(
    name: &str,
    superclass: Option<&str>,
    fields: Vec<RawNode>,
    methods: Vec<RawNode>,
) -> RawNode {
    let mut class = RawNode::new("ClassDeclaration")
        .with_attribute("name", name)
        .with_children(fields)
        .with_children(methods);

    if let Some(superclass) = superclass {
        class = class.with_attribute("extends", superclass);
    }

    class
}

pub fn ty(name: &str) -> RawNode {
    match name.strip_suffix("[]") {
        Some(element) => RawNode::new("Type")
            .with_attribute("name", element)
            .with_attribute("isArray", true),
        None => RawNode::new("Type").with_attribute("name", name),
    }
}

pub fn var(name: &str, type_name: &str) -> RawNode {
    RawNode::new("VarDeclaration")
        .with_attribute("name", name)
        .with_children([ty(type_name)])
}

pub fn param(name: &str, type_name: &str) -> RawNode {
    RawNode::new("Param")
        .with_attribute("name", name)
        .with_children([ty(type_name)])
}

pub fn method(
    name: &str,
    return_type: RawNode,
    parameters: Vec<RawNode>,
    locals: Vec<RawNode>,
    body: Vec<RawNode>,
) -> RawNode {
    RawNode::new("MethodDeclaration")
        .with_attribute("name", name)
        .with_children([return_type])
        .with_children(parameters)
        .with_children(locals)
        .with_children(body)
}

pub fn static_method(
    name: &str,
    return_type: RawNode,
    parameters: Vec<RawNode>,
    locals: Vec<RawNode>,
    body: Vec<RawNode>,
) -> RawNode {
    method(name, return_type, parameters, locals, body).with_attribute("isStatic", true)
}

pub fn main_method(locals: Vec<RawNode>, body: Vec<RawNode>) -> RawNode {
    RawNode::new("MainDeclaration")
        .with_attribute("parameter", "args")
        .with_children(locals)
        .with_children(body)
}

pub fn main_method_with_parameter(
    parameter_type: &str,
    locals: Vec<RawNode>,
    body: Vec<RawNode>,
) -> RawNode {
    main_method(locals, body).with_attribute("parameterType", parameter_type)
}

pub fn block(statements: Vec<RawNode>) -> RawNode {
    RawNode::new("Block").with_children(statements)
}

pub fn if_else(condition: RawNode, positive: RawNode, negative: RawNode) -> RawNode {
    RawNode::new("If").with_children([condition, positive, negative])
}

pub fn while_loop(condition: RawNode, body: RawNode) -> RawNode {
    RawNode::new("While").with_children([condition, body])
}

pub fn expr(expression: RawNode) -> RawNode {
    RawNode::new("ExpressionStatement").with_children([expression])
}

pub fn assign(target: &str, value: RawNode) -> RawNode {
    RawNode::new("Assign")
        .with_attribute("target", target)
        .with_children([value])
}

pub fn array_assign(target: &str, index: RawNode, value: RawNode) -> RawNode {
    RawNode::new("ArrayAssign")
        .with_attribute("target", target)
        .with_children([index, value])
}

pub fn ret(value: RawNode) -> RawNode {
    RawNode::new("Return").with_children([value])
}

pub fn binary(operator: &str, lhs: RawNode, rhs: RawNode) -> RawNode {
    RawNode::new("BinaryOp")
        .with_attribute("op", operator)
        .with_children([lhs, rhs])
}

pub fn not(operand: RawNode) -> RawNode {
    RawNode::new("Not").with_children([operand])
}

pub fn paren(inner: RawNode) -> RawNode {
    RawNode::new("Parenthesis").with_children([inner])
}

pub fn index(array: RawNode, index: RawNode) -> RawNode {
    RawNode::new("ArrayAccess").with_children([array, index])
}

pub fn length(array: RawNode) -> RawNode {
    RawNode::new("Length").with_children([array])
}

pub fn call(receiver: RawNode, method: &str, arguments: Vec<RawNode>) -> RawNode {
    RawNode::new("MethodCall")
        .with_attribute("method", method)
        .with_children([receiver])
        .with_children(arguments)
}

pub fn new_object(class: &str) -> RawNode {
    RawNode::new("NewObject").with_attribute("class", class)
}

pub fn new_array(length: RawNode) -> RawNode {
    RawNode::new("NewArray").with_children([length])
}

pub fn int(value: i32) -> RawNode {
    RawNode::new("Integer").with_attribute("value", value)
}

pub fn boolean(value: bool) -> RawNode {
    RawNode::new("Boolean").with_attribute("value", value)
}

pub fn ident(name: &str) -> RawNode {
    RawNode::new("Identifier").with_attribute("name", name)
}

pub fn this() -> RawNode {
    RawNode::new("This")
}
