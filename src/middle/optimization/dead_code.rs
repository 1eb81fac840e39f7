//! Dead code elimination over straight-line runs of statements.
//!
//! For every local and parameter we remember the latest assignment and
//! whether it has been read since. Overwriting a value nobody read deletes
//! the earlier assignment. Tracking restarts at every `if` and `while`.

use hashbrown::HashMap;

use crate::{
    frontend::ast::{
        Ast, Constant, NodeId, NodeKind,
        visit::{Visitor, walk_children},
    },
    middle::symbol_table::SymbolTable,
};

#[derive(Debug, Clone, Copy)]
struct PendingAssignment {
    statement: NodeId,
    read: bool,
    /// Right hand side contains a call, so it must run regardless
    has_call: bool,
}

pub struct DeadCodeElimination<'a> {
    table: &'a SymbolTable,
    pending: HashMap<String, PendingAssignment>,
    removed: usize,
}

impl<'a> DeadCodeElimination<'a> {
    /// Returns whether any statement was removed or replaced
    pub fn run(ast: &mut Ast, table: &'a SymbolTable) -> bool {
        let mut pass = Self {
            table,
            pending: HashMap::new(),
            removed: 0,
        };

        let root = ast.root();
        pass.visit_node(ast, root);

        if pass.removed > 0 {
            tracing::trace!(removed = pass.removed, "eliminated dead statements");
        }

        pass.removed > 0
    }

    fn is_tracked(&self, ast: &Ast, id: NodeId, name: &str) -> bool {
        ast.owner(id)
            .is_some_and(|owner| self.table.is_method_variable(&owner.method, name))
    }

    fn mark_read(&mut self, name: &str) {
        if let Some(pending) = self.pending.get_mut(name) {
            pending.read = true;
        }
    }

    fn remove(&mut self, ast: &mut Ast, statement: NodeId) {
        ast.remove(statement);
        self.removed += 1;
    }

    fn visit_assignment(&mut self, ast: &mut Ast, id: NodeId, target: &str, value: NodeId) {
        self.visit_node(ast, value);

        if !self.is_tracked(ast, id, target) {
            return;
        }

        let has_call = ast.any_descendant(value, &|kind| matches!(kind, NodeKind::MethodCall { .. }));

        let previous = self.pending.insert(
            target.to_string(),
            PendingAssignment {
                statement: id,
                read: false,
                has_call,
            },
        );

        if let Some(previous) = previous.filter(|previous| !previous.read && !previous.has_call) {
            self.remove(ast, previous.statement);
        }
    }

    /// Assignments that are still unread once the method body is done
    fn remove_unread(&mut self, ast: &mut Ast) {
        let unread = self
            .pending
            .drain()
            .filter(|(_, pending)| !pending.read && !pending.has_call)
            .map(|(_, pending)| pending.statement)
            .collect::<Vec<_>>();

        for statement in unread {
            self.remove(ast, statement);
        }
    }
}

impl Visitor for DeadCodeElimination<'_> {
    fn visit_node(&mut self, ast: &mut Ast, id: NodeId) {
        match ast.kind(id).clone() {
            NodeKind::MethodDeclaration { .. } => {
                self.pending.clear();
                walk_children(self, ast, id);
                self.remove_unread(ast);
            }
            NodeKind::Identifier(name) => self.mark_read(&name),
            NodeKind::Assign { target, value } => self.visit_assignment(ast, id, &target, value),
            NodeKind::ArrayAssign { target, .. } => {
                walk_children(self, ast, id);
                self.mark_read(&target);
            }
            NodeKind::If {
                condition,
                positive,
                negative,
            } => {
                if let Some(Constant::Boolean(taken)) = ast.constant(condition) {
                    let branch = if taken { positive } else { negative };
                    ast.replace(id, branch);
                    self.removed += 1;

                    self.visit_node(ast, branch);
                    return;
                }

                self.visit_node(ast, condition);

                self.pending.clear();
                self.visit_node(ast, positive);
                self.pending.clear();
                self.visit_node(ast, negative);
                self.pending.clear();
            }
            NodeKind::While { condition, body } => {
                if ast.constant(condition) == Some(Constant::Boolean(false)) {
                    self.remove(ast, id);
                    return;
                }

                self.pending.clear();
                self.visit_node(ast, condition);
                self.visit_node(ast, body);
                self.pending.clear();
            }
            _ => walk_children(self, ast, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{frontend::interchange::RawNode, test_helpers::*};

    fn eliminate(body: Vec<RawNode>) -> (Ast, bool) {
        let (mut ast, table) = analyzed(program(
            &[],
            class(
                "Foo",
                None,
                vec![var("field", "int")],
                vec![method(
                    "bar",
                    ty("int"),
                    vec![param("c", "boolean")],
                    vec![var("x", "int"), var("a", "int[]")],
                    body,
                )],
            ),
        ));

        let changed = DeadCodeElimination::run(&mut ast, &table);
        (ast, changed)
    }

    fn assigned_values(ast: &Ast) -> Vec<NodeKind> {
        find_nodes(ast, |kind| matches!(kind, NodeKind::Assign { .. }))
            .into_iter()
            .flat_map(|id| ast.children(id))
            .map(|id| ast.kind(id).clone())
            .collect()
    }

    #[test]
    fn overwritten_and_trailing_unread_assignments_are_removed() {
        let (ast, changed) = eliminate(vec![
            assign("x", int(5)),
            assign("x", int(6)),
            ret(int(0)),
        ]);

        assert!(changed);
        assert_eq!(assigned_values(&ast), vec![]);
    }

    #[test]
    fn read_assignments_survive() {
        let (ast, changed) = eliminate(vec![
            assign("x", int(5)),
            assign("x", binary("+", ident("x"), int(1))),
            ret(ident("x")),
        ]);

        assert!(!changed);
        assert_eq!(assigned_values(&ast).len(), 2);
    }

    #[test]
    fn assignments_with_calls_are_kept() {
        let (ast, _) = eliminate(vec![
            assign("x", call(this(), "bar", vec![boolean(true)])),
            assign("x", int(1)),
            assign("field", int(1)),
            assign("field", int(2)),
            ret(int(0)),
        ]);

        let values = assigned_values(&ast);
        assert_eq!(values.len(), 3);
        assert!(matches!(values[0], NodeKind::MethodCall { .. }));
        assert_eq!(
            &values[1..],
            &[NodeKind::IntegerLiteral(1), NodeKind::IntegerLiteral(2)]
        );
    }

    #[test]
    fn array_stores_count_as_reads() {
        let (ast, changed) = eliminate(vec![
            assign("a", new_array(int(3))),
            array_assign("a", int(0), int(1)),
            ret(index(ident("a"), int(0))),
        ]);

        assert!(!changed);
        assert_eq!(assigned_values(&ast).len(), 1);
    }

    #[test]
    fn branches_reset_tracking() {
        let (ast, _) = eliminate(vec![
            assign("x", int(1)),
            if_else(
                ident("c"),
                block(vec![assign("x", int(2))]),
                block(vec![]),
            ),
            ret(ident("x")),
        ]);

        assert_eq!(
            assigned_values(&ast),
            vec![NodeKind::IntegerLiteral(1), NodeKind::IntegerLiteral(2)]
        );
    }

    #[test]
    fn literal_conditions_select_a_branch() {
        let (ast, changed) = eliminate(vec![
            if_else(
                boolean(false),
                block(vec![assign("x", int(1))]),
                block(vec![assign("x", int(2))]),
            ),
            while_loop(boolean(false), block(vec![assign("x", int(3))])),
            ret(ident("x")),
        ]);

        assert!(changed);
        assert_eq!(assigned_values(&ast), vec![NodeKind::IntegerLiteral(2)]);
        assert_eq!(
            find_nodes(&ast, |kind| matches!(kind, NodeKind::If { .. } | NodeKind::While { .. })),
            vec![]
        );
    }
}
