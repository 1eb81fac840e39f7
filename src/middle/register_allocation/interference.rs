use std::collections::{BTreeMap, BTreeSet};

use crate::middle::{
    ir::{Method, VarScope},
    register_allocation::liveness::LivenessData,
};

/// Locals that are alive at the same time and may not share a slot.
/// Parameters and `this` are precolored and only raise the lowest slot the
/// locals may use.
#[derive(Debug, Clone, Default)]
pub struct InterferenceGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
    min_colors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coloring {
    pub registers: BTreeMap<String, usize>,
    /// Number of different slots given to locals
    pub distinct: usize,
}

impl InterferenceGraph {
    pub fn build(method: &Method, liveness: &[LivenessData]) -> Self {
        let edges = method
            .variables
            .iter()
            .filter(|(_, descriptor)| descriptor.scope == VarScope::Local)
            .map(|(name, _)| (name.clone(), BTreeSet::new()))
            .collect();

        let min_colors = method
            .variables
            .values()
            .filter(|descriptor| descriptor.scope != VarScope::Local)
            .map(|descriptor| descriptor.register + 1)
            .max()
            .unwrap_or(0);

        let mut graph = Self { edges, min_colors };

        for data in liveness {
            graph.connect_all(&data.live_in);
            graph.connect_all(&data.live_out.union(&data.def).cloned().collect());
        }

        graph
    }

    fn connect_all(&mut self, alive: &BTreeSet<String>) {
        for lhs in alive {
            for rhs in alive {
                if lhs != rhs && self.edges.contains_key(rhs) {
                    if let Some(neighbors) = self.edges.get_mut(lhs) {
                        neighbors.insert(rhs.clone());
                    }
                }
            }
        }
    }

    pub fn min_colors(&self) -> usize {
        self.min_colors
    }

    pub fn interferes(&self, lhs: &str, rhs: &str) -> bool {
        self.edges
            .get(lhs)
            .is_some_and(|neighbors| neighbors.contains(rhs))
    }

    /// Simplify by repeatedly removing the node with the fewest remaining
    /// neighbors, then select slots in reverse removal order, always taking
    /// the lowest slot at or above [`Self::min_colors`] that no colored
    /// neighbor uses.
    pub fn color(&self) -> Coloring {
        let mut remaining = self.edges.keys().cloned().collect::<BTreeSet<_>>();
        let mut stack = Vec::with_capacity(remaining.len());

        while let Some(next) = remaining
            .iter()
            .min_by_key(|name| {
                self.edges[*name]
                    .iter()
                    .filter(|neighbor| remaining.contains(*neighbor))
                    .count()
            })
            .cloned()
        {
            remaining.remove(&next);
            stack.push(next);
        }

        let mut registers = BTreeMap::new();
        while let Some(name) = stack.pop() {
            let taken = self.edges[&name]
                .iter()
                .filter_map(|neighbor| registers.get(neighbor).copied())
                .collect::<BTreeSet<usize>>();

            let register = (self.min_colors..)
                .find(|register| !taken.contains(register))
                .unwrap_or(self.min_colors);

            registers.insert(name, register);
        }

        let distinct = registers.values().collect::<BTreeSet<_>>().len();

        Coloring {
            registers,
            distinct,
        }
    }
}
