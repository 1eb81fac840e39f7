//! Graph coloring register allocation over the IR. Every method is handled
//! on its own: liveness, then the interference graph, then coloring. Only
//! the register numbers of local variables are rewritten; parameters and
//! `this` keep the slots the calling convention gives them.

use crate::{
    config::RegisterBudget,
    diagnostics::{Diagnostic, OptimizationError},
    middle::ir,
};

pub mod interference;
pub mod liveness;

use self::{interference::InterferenceGraph, liveness::compute_liveness};

/// Assigns frame slots to the locals of every method. Methods that need more
/// slots than the budget allows are reported and left untouched.
pub fn allocate_registers(class: &mut ir::Class, budget: RegisterBudget) -> Result<(), Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();

    for method in &mut class.methods {
        let liveness = compute_liveness(method);
        let graph = InterferenceGraph::build(method, &liveness);
        let coloring = graph.color();

        tracing::debug!(
            method = %method.name,
            min_colors = graph.min_colors(),
            registers = coloring.distinct,
            "colored interference graph"
        );

        if let RegisterBudget::AtMost(maximum) = budget {
            if coloring.distinct > maximum {
                diagnostics.push(Diagnostic::unpositioned(
                    OptimizationError::RegisterBudgetExceeded {
                        method: method.name.clone(),
                        required: coloring.distinct,
                        maximum,
                    },
                ));
                continue;
            }
        }

        for (name, register) in coloring.registers {
            if let Some(descriptor) = method.variables.get_mut(&name) {
                descriptor.register = register;
            }
        }
    }

    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}
