//! Tree level optimizations. Propagation, folding and dead code elimination
//! feed each other, so they are repeated until a whole round leaves the tree
//! untouched.

use crate::{frontend::ast::Ast, middle::symbol_table::SymbolTable};

pub mod constant_folding;
pub mod constant_propagation;
pub mod dead_code;

use self::{
    constant_folding::fold_constants, constant_propagation::ConstantPropagation,
    dead_code::DeadCodeElimination,
};

/// Runs every pass to a fixed point and returns the number of rounds
pub fn optimize(ast: &mut Ast, table: &SymbolTable) -> usize {
    let mut rounds = 0;

    loop {
        rounds += 1;

        let propagated = ConstantPropagation::run(ast, table);
        let folded = fold_constants(ast);
        let eliminated = DeadCodeElimination::run(ast, table);

        tracing::debug!(round = rounds, propagated, folded, eliminated, "optimization round");

        if !(propagated || folded || eliminated) {
            break;
        }
    }

    rounds
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{frontend::ast::NodeKind, test_helpers::*};

    #[test]
    fn passes_feed_each_other_until_nothing_changes() {
        let (mut ast, table) = analyzed(program(
            &[],
            class(
                "Foo",
                None,
                vec![],
                vec![method(
                    "bar",
                    ty("int"),
                    vec![],
                    vec![var("x", "int"), var("y", "int")],
                    vec![
                        assign("x", int(2)),
                        assign("y", binary("*", ident("x"), int(3))),
                        if_else(
                            binary("<", ident("y"), int(10)),
                            block(vec![assign("x", ident("y"))]),
                            block(vec![assign("x", int(0))]),
                        ),
                        ret(ident("x")),
                    ],
                )],
            ),
        ));

        let rounds = optimize(&mut ast, &table);

        assert!(rounds > 1);
        let body = find_nodes(&ast, |kind| matches!(kind, NodeKind::MethodDeclaration { .. }))[0];
        let NodeKind::MethodDeclaration { body, .. } = ast.kind(body) else {
            unreachable!()
        };
        let returns = body
            .iter()
            .filter_map(|statement| match ast.kind(*statement) {
                NodeKind::Return { value: Some(value) } => Some(ast.kind(*value).clone()),
                _ => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(returns, vec![NodeKind::IntegerLiteral(6)]);
        assert_eq!(
            find_nodes(&ast, |kind| matches!(kind, NodeKind::If { .. } | NodeKind::Assign { .. })),
            vec![]
        );
    }

    #[test]
    fn optimizing_twice_is_a_no_op() {
        let (mut ast, table) = analyzed(program(
            &[],
            class(
                "Foo",
                None,
                vec![],
                vec![method(
                    "bar",
                    ty("int"),
                    vec![param("a", "int")],
                    vec![],
                    vec![ret(binary("+", ident("a"), binary("*", int(2), int(3))))],
                )],
            ),
        ));

        optimize(&mut ast, &table);
        let size = ast.len();

        assert_eq!(optimize(&mut ast, &table), 1);
        assert_eq!(ast.len(), size);
    }
}
