use std::collections::BTreeSet;

use crate::middle::ir::{Instruction, Method, Operand, VarScope};

/// Def, use, in and out sets of a single instruction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivenessData {
    pub def: BTreeSet<String>,
    pub uses: BTreeSet<String>,
    pub live_in: BTreeSet<String>,
    pub live_out: BTreeSet<String>,
}

struct DefUseCollector<'a> {
    method: &'a Method,
    def: BTreeSet<String>,
    uses: BTreeSet<String>,
}

impl DefUseCollector<'_> {
    /// Parameters and `this` keep their slots and never take part
    fn is_allocatable(&self, name: &str) -> bool {
        self.method
            .variables
            .get(name)
            .is_some_and(|descriptor| descriptor.scope == VarScope::Local)
    }

    fn use_operand(&mut self, operand: &Operand) {
        match operand {
            Operand::Variable(variable) => {
                if self.is_allocatable(&variable.name) {
                    self.uses.insert(variable.name.clone());
                }
            }
            Operand::ArrayElement { array, index } => {
                if self.is_allocatable(&array.name) {
                    self.uses.insert(array.name.clone());
                }
                self.use_operand(index);
            }
            Operand::Literal(_) | Operand::This(_) => {}
        }
    }

    fn collect(&mut self, instruction: &Instruction) {
        match instruction {
            Instruction::Assign { destination, value } => {
                self.collect(value);

                match destination {
                    Operand::Variable(variable) if self.is_allocatable(&variable.name) => {
                        self.def.insert(variable.name.clone());
                    }
                    // storing into an element reads both the array and the index
                    Operand::ArrayElement { .. } => self.use_operand(destination),
                    _ => {}
                }
            }
            Instruction::Call(call) => {
                for operand in call.operands() {
                    self.use_operand(operand);
                }
            }
            Instruction::Branch { condition, .. } => self.collect(condition),
            Instruction::Return(Some(operand))
            | Instruction::PutField { value: operand, .. }
            | Instruction::UnaryOp { operand, .. }
            | Instruction::NoOp(operand) => self.use_operand(operand),
            Instruction::BinaryOp { lhs, rhs, .. } => {
                self.use_operand(lhs);
                self.use_operand(rhs);
            }
            Instruction::Return(None) | Instruction::Goto(_) | Instruction::GetField { .. } => {}
        }
    }
}

fn def_use(method: &Method, instruction: &Instruction) -> LivenessData {
    let mut collector = DefUseCollector {
        method,
        def: BTreeSet::new(),
        uses: BTreeSet::new(),
    };
    collector.collect(instruction);

    LivenessData {
        def: collector.def,
        uses: collector.uses,
        ..Default::default()
    }
}

/// Backward dataflow until no set changes:
/// `in = use ∪ (out − def)` and `out = ∪ in` of every successor
pub fn compute_liveness(method: &Method) -> Vec<LivenessData> {
    let mut data = method
        .instructions
        .iter()
        .map(|instruction| def_use(method, instruction))
        .collect::<Vec<_>>();

    let mut iterations = 0;
    loop {
        iterations += 1;
        let mut changed = false;

        for index in (0..data.len()).rev() {
            let live_out = method
                .successors(index)
                .into_iter()
                .flat_map(|successor| data[successor].live_in.iter().cloned())
                .collect::<BTreeSet<_>>();

            let live_in = data[index]
                .uses
                .iter()
                .chain(live_out.difference(&data[index].def))
                .cloned()
                .collect::<BTreeSet<_>>();

            if live_in != data[index].live_in || live_out != data[index].live_out {
                data[index].live_in = live_in;
                data[index].live_out = live_out;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    tracing::trace!(method = %method.name, iterations, "computed liveness");

    data
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{frontend::interchange::RawNode, middle::ir::ast_lowering::lower_to_ir, test_helpers::*};

    fn lowered(body: Vec<RawNode>) -> Method {
        let (ast, table) = analyzed(program(
            &[],
            class(
                "Foo",
                None,
                vec![],
                vec![method(
                    "bar",
                    ty("int"),
                    vec![param("p", "int")],
                    vec![var("x", "int"), var("y", "int"), var("z", "int")],
                    body,
                )],
            ),
        ));

        let class = lower_to_ir(&ast, &table);
        class
            .methods
            .into_iter()
            .find(|method| method.name == "bar")
            .expect("method should be lowered")
    }

    fn names(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn straight_line_sets() {
        // x = p; y = x + 1; x = 2; z = x + y; return z;
        let method = lowered(vec![
            assign("x", ident("p")),
            assign("y", binary("+", ident("x"), int(1))),
            assign("x", int(2)),
            assign("z", binary("+", ident("x"), ident("y"))),
            ret(ident("z")),
        ]);
        let liveness = compute_liveness(&method);

        let live_in = liveness
            .iter()
            .map(|data| data.live_in.clone())
            .collect::<Vec<_>>();

        assert_eq!(
            live_in,
            vec![
                names(&[]),
                names(&["x"]),
                names(&["y"]),
                names(&["x", "y"]),
                names(&["z"]),
            ]
        );
        assert_eq!(liveness[2].def, names(&["x"]));
        assert_eq!(liveness[3].uses, names(&["x", "y"]));
    }

    #[test]
    fn loops_keep_values_alive_across_the_back_edge() {
        let method = lowered(vec![
            assign("x", int(0)),
            assign("y", int(0)),
            while_loop(
                binary("<", ident("x"), ident("p")),
                block(vec![
                    assign("y", binary("+", ident("y"), ident("x"))),
                    assign("x", binary("+", ident("x"), int(1))),
                ]),
            ),
            ret(ident("y")),
        ]);
        let liveness = compute_liveness(&method);

        // the loop condition sees both counters alive
        let condition = method.labels.values().min().copied().unwrap();
        assert_eq!(liveness[condition].live_in, names(&["x", "y"]));
        assert!(liveness.iter().all(|data| !data.live_in.contains("p")));
    }
}
