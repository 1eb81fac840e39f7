//! Forward propagation of literal values into later reads of method locals,
//! parameters and array elements indexed by a literal.
//!
//! Branches are analyzed from a snapshot of the incoming facts and joined by
//! intersection. Loops are scanned once without rewriting anything to find
//! out which facts the body may invalidate, then analyzed for real with only
//! the facts that survive the whole loop.

use hashbrown::HashMap;

use crate::{
    frontend::ast::{
        Ast, Constant, NodeId, NodeKind,
        visit::{Visitor, walk_children},
    },
    middle::symbol_table::SymbolTable,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Variable(String),
    Element { array: String, index: i32 },
}

type Facts = HashMap<Key, Constant>;

pub struct ConstantPropagation<'a> {
    table: &'a SymbolTable,
    facts: Facts,
    /// Cleared while pre-scanning a loop body
    rewrite: bool,
    changed: bool,
}

impl<'a> ConstantPropagation<'a> {
    /// Returns whether any read was replaced by a literal
    pub fn run(ast: &mut Ast, table: &'a SymbolTable) -> bool {
        let mut pass = Self {
            table,
            facts: Facts::new(),
            rewrite: true,
            changed: false,
        };

        let root = ast.root();
        pass.visit_node(ast, root);

        pass.changed
    }

    fn is_tracked(&self, ast: &Ast, id: NodeId, name: &str) -> bool {
        ast.owner(id)
            .is_some_and(|owner| self.table.is_method_variable(&owner.method, name))
    }

    fn forget_elements(&mut self) {
        self.facts.retain(|key, _| matches!(key, Key::Variable(_)));
    }

    fn substitute(&mut self, ast: &mut Ast, id: NodeId, key: &Key) {
        if !self.rewrite {
            return;
        }

        if let Some(constant) = self.facts.get(key).copied() {
            ast.replace_with(id, constant.into_node_kind(), Some(constant.ty()));
            self.changed = true;
        }
    }

    fn visit_assignment(&mut self, ast: &mut Ast, id: NodeId, target: &str, value: NodeId) {
        self.visit_node(ast, value);

        let is_array = ast.ty(value).is_some_and(|ty| ty.is_array());
        if is_array {
            // the array may now be aliased by another name
            self.forget_elements();
        }

        if !self.is_tracked(ast, id, target) {
            return;
        }

        let key = Key::Variable(target.to_string());
        match ast.constant(ast.strip_parentheses(value)) {
            Some(constant) => {
                self.facts.insert(key, constant);
            }
            None => {
                self.facts.remove(&key);
            }
        }
    }

    fn visit_array_assignment(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        target: &str,
        index: NodeId,
        value: NodeId,
    ) {
        self.visit_node(ast, index);
        self.visit_node(ast, value);

        self.forget_elements();

        if !self.is_tracked(ast, id, target) {
            return;
        }

        let index = ast.constant(ast.strip_parentheses(index));
        let value = ast.constant(ast.strip_parentheses(value));

        if let (Some(Constant::Integer(index)), Some(value)) = (index, value) {
            self.facts.insert(
                Key::Element {
                    array: target.to_string(),
                    index,
                },
                value,
            );
        }
    }

    fn visit_if(&mut self, ast: &mut Ast, condition: NodeId, positive: NodeId, negative: NodeId) {
        self.visit_node(ast, condition);

        let incoming = self.facts.clone();
        self.visit_node(ast, positive);

        let after_positive = std::mem::replace(&mut self.facts, incoming);
        self.visit_node(ast, negative);

        self.facts = intersect(&after_positive, &self.facts);
    }

    fn visit_while(&mut self, ast: &mut Ast, condition: NodeId, body: NodeId) {
        let entry = self.facts.clone();

        let rewrite = std::mem::replace(&mut self.rewrite, false);
        self.visit_node(ast, condition);
        self.visit_node(ast, body);
        self.rewrite = rewrite;

        let loop_invariant = intersect(&entry, &self.facts);

        self.facts = loop_invariant.clone();
        self.visit_node(ast, condition);
        self.visit_node(ast, body);

        // the body may run zero times
        self.facts = intersect(&loop_invariant, &self.facts);
    }
}

/// Facts that hold with the same value on both sides
fn intersect(lhs: &Facts, rhs: &Facts) -> Facts {
    lhs.iter()
        .filter(|(key, value)| rhs.get(*key) == Some(*value))
        .map(|(key, value)| (key.clone(), *value))
        .collect()
}

impl Visitor for ConstantPropagation<'_> {
    fn visit_node(&mut self, ast: &mut Ast, id: NodeId) {
        match ast.kind(id).clone() {
            NodeKind::MethodDeclaration { .. } => {
                self.facts.clear();
                walk_children(self, ast, id);
                self.facts.clear();
            }
            NodeKind::Identifier(name) => {
                if self.is_tracked(ast, id, &name) {
                    self.substitute(ast, id, &Key::Variable(name));
                }
            }
            NodeKind::ArrayAccess { array, index } => {
                walk_children(self, ast, id);

                let NodeKind::Identifier(name) = ast.kind(array).clone() else {
                    return;
                };

                if let Some(Constant::Integer(index)) = ast.constant(ast.strip_parentheses(index)) {
                    let key = Key::Element { array: name, index };
                    self.substitute(ast, id, &key);
                }
            }
            NodeKind::MethodCall { .. } => {
                walk_children(self, ast, id);
                // the callee may store into any array it can reach
                self.forget_elements();
            }
            NodeKind::Assign { target, value } => {
                self.visit_assignment(ast, id, &target, value);
            }
            NodeKind::ArrayAssign {
                target,
                index,
                value,
            } => self.visit_array_assignment(ast, id, &target, index, value),
            NodeKind::If {
                condition,
                positive,
                negative,
            } => self.visit_if(ast, condition, positive, negative),
            NodeKind::While { condition, body } => self.visit_while(ast, condition, body),
            _ => walk_children(self, ast, id),
        }
    }
}
