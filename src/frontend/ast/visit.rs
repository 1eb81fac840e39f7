//! Trait definition for an AST visitor which walks the arena in DFS order

use super::{Ast, NodeId};

/// Passes override [`Visitor::visit_node`] for the node kinds they care about
/// and call [`walk_children`] for everything else.
///
/// The tree is handed out mutably so that visitors may rewrite it while it is
/// being walked. Child lists are snapshotted before recursing, so a visitor
/// is free to replace or remove the node it is currently looking at.
pub trait Visitor: Sized {
    fn visit_node(&mut self, ast: &mut Ast, id: NodeId) {
        walk_children(self, ast, id)
    }
}

pub fn walk_children<V: Visitor>(visitor: &mut V, ast: &mut Ast, id: NodeId) {
    for child in ast.children(id) {
        visitor.visit_node(ast, child);
    }
}

/// Every node reachable from `root`, children before their parents
pub fn post_order(ast: &Ast, root: NodeId) -> Vec<NodeId> {
    fn walk(ast: &Ast, id: NodeId, order: &mut Vec<NodeId>) {
        for child in ast.children(id) {
            walk(ast, child, order);
        }

        order.push(id);
    }

    let mut order = Vec::new();
    walk(ast, root, &mut order);
    order
}
