use crate::frontend::ast::{
    Ast, BinaryOperatorKind, Constant, NodeId, NodeKind, UnaryOperatorKind, visit::post_order,
};

/// Replaces parenthesized literals and operators whose operands are all
/// literals with the resulting literal. Children are folded before their
/// parents so nested expressions collapse in a single pass.
pub fn fold_constants(ast: &mut Ast) -> bool {
    let root = ast.root();
    let mut folded = 0;

    for id in post_order(ast, root) {
        if let Some(constant) = fold(ast, id) {
            ast.replace_with(id, constant.into_node_kind(), Some(constant.ty()));
            folded += 1;
        }
    }

    if folded > 0 {
        tracing::trace!(folded, "folded constant expressions");
    }

    folded > 0
}

fn fold(ast: &Ast, id: NodeId) -> Option<Constant> {
    match ast.kind(id) {
        NodeKind::Parenthesis { inner } => ast.constant(*inner),
        NodeKind::Unary {
            operator: UnaryOperatorKind::LogicalNot,
            operand,
        } => match ast.constant(*operand)? {
            Constant::Boolean(value) => Some(Constant::Boolean(!value)),
            Constant::Integer(_) => None,
        },
        NodeKind::Binary { operator, lhs, rhs } => {
            let lhs = ast.constant(*lhs)?;
            let rhs = ast.constant(*rhs)?;

            let result = evaluate(*operator, lhs, rhs);
            if result.is_none() {
                tracing::warn!(
                    span = %ast.span(id),
                    "left `{lhs} {operator} {rhs}` to be evaluated at run time"
                );
            }

            result
        }
        _ => None,
    }
}

/// Integer arithmetic wraps like it does on the virtual machine. Division by
/// zero is never folded.
pub fn evaluate(operator: BinaryOperatorKind, lhs: Constant, rhs: Constant) -> Option<Constant> {
    use BinaryOperatorKind as Op;
    use Constant::{Boolean, Integer};

    let result = match (lhs, rhs) {
        (Integer(lhs), Integer(rhs)) => match operator {
            Op::Add => Integer(lhs.wrapping_add(rhs)),
            Op::Subtract => Integer(lhs.wrapping_sub(rhs)),
            Op::Multiply => Integer(lhs.wrapping_mul(rhs)),
            Op::Divide if rhs == 0 => return None,
            Op::Divide => Integer(lhs.wrapping_div(rhs)),
            Op::LessThan => Boolean(lhs < rhs),
            Op::LessThanOrEqualTo => Boolean(lhs <= rhs),
            Op::GreaterThan => Boolean(lhs > rhs),
            Op::GreaterThanOrEqualTo => Boolean(lhs >= rhs),
            Op::Equals => Boolean(lhs == rhs),
            Op::NotEquals => Boolean(lhs != rhs),
            Op::LogicalAnd | Op::LogicalOr => return None,
        },
        (Boolean(lhs), Boolean(rhs)) => match operator {
            Op::LogicalAnd => Boolean(lhs && rhs),
            Op::LogicalOr => Boolean(lhs || rhs),
            Op::Equals => Boolean(lhs == rhs),
            Op::NotEquals => Boolean(lhs != rhs),
            _ => return None,
        },
        _ => return None,
    };

    Some(result)
}
