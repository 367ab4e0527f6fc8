// Copyright 2020 Xavier Gillard
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! This module provides the builder of the invariant graph. Experiments
//! describe their decomposition leaves first: every node must be declared
//! before any node that consumes its output, which is what makes the
//! insertion order a topological order (and the graph trivially acyclic).
//!
//! The construction ends with the declaration of the one objective sink;
//! the nodes whose value must remain zero in any feasible assignment are
//! registered as hard constraints along the way.

use crate::{Dag, Invariant, NodeId, Source, Variable};
use crate::implementation::dag::graph::Node;

/// The builder of an invariant graph over a fixed set of decision
/// variables.
///
/// # Example
/// ```
/// # use cbls::*;
/// // weight = 2a + 3b, hard constraint weight <= 4, objective = -(a + b)
/// let mut builder = DagBuilder::new(2);
/// let a = Source::Variable(Variable(0));
/// let b = Source::Variable(Variable(1));
/// let weight = builder.scalar_product(vec![2, 3], vec![a, b]);
/// let slack = builder.comparator(Source::Node(weight), 4);
/// builder.hard_constraint(slack);
/// let profit = builder.scalar_product(vec![-1, -1], vec![a, b]);
/// builder.objective(vec![Source::Node(profit)]);
/// let dag = builder.build();
/// ```
#[derive(Debug)]
pub struct DagBuilder {
    nb_variables: usize,
    nodes: Vec<Node>,
    objective: Option<NodeId>,
    violations: Vec<NodeId>,
}

impl DagBuilder {
    pub fn new(nb_variables: usize) -> Self {
        DagBuilder { nb_variables, nodes: vec![], objective: None, violations: vec![] }
    }

    /// The number of decision variables the graph is built over
    pub fn nb_variables(&self) -> usize {
        self.nb_variables
    }

    fn add(&mut self, invariant: Invariant, parents: Vec<Source>) -> NodeId {
        for s in &parents {
            match s {
                Source::Node(n) => assert!(
                    n.0 < self.nodes.len(),
                    "a node must be built before its children (leaves first)"
                ),
                Source::Variable(v) => {
                    assert!(v.id() < self.nb_variables, "unknown decision variable")
                }
            }
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            invariant,
            parents,
            children: vec![],
            value: 0,
            cp_relevant: true,
        });
        id
    }

    /// Adds a node computing the sum of its parents
    pub fn sum(&mut self, parents: Vec<Source>) -> NodeId {
        self.add(Invariant::Sum, parents)
    }

    /// Adds a node computing the weighted sum of its parents
    pub fn scalar_product(&mut self, coeffs: Vec<isize>, parents: Vec<Source>) -> NodeId {
        assert_eq!(coeffs.len(), parents.len(), "one coefficient per parent");
        self.add(Invariant::ScalarProduct { coeffs }, parents)
    }

    /// Adds a node computing the one-sided slack `max(0, parent - bound)`
    pub fn comparator(&mut self, parent: Source, bound: isize) -> NodeId {
        self.add(Invariant::Comparator { bound }, vec![parent])
    }

    /// Adds a node computing the conjunction of its (boolean valued) parents
    pub fn and(&mut self, parents: Vec<Source>) -> NodeId {
        self.add(Invariant::And { arity: 0, nb_true: 0 }, parents)
    }

    /// Adds a node computing the disjunction of its (boolean valued) parents
    pub fn or(&mut self, parents: Vec<Source>) -> NodeId {
        self.add(Invariant::Or { arity: 0, nb_true: 0 }, parents)
    }

    /// Adds a node counting the parents whose value lies in `set`
    pub fn among(&mut self, parents: Vec<Source>, set: Vec<isize>) -> NodeId {
        self.add(Invariant::Among { set }, parents)
    }

    /// Adds a node counting the duplicate pairs among its parents
    pub fn all_different(&mut self, parents: Vec<Source>) -> NodeId {
        self.add(Invariant::AllDifferent { counts: Default::default() }, parents)
    }

    /// Adds a node computing `array[index]`
    pub fn element(&mut self, array: Vec<isize>, index: Source) -> NodeId {
        self.add(Invariant::Element { array }, vec![index])
    }

    /// Adds a node telling whether its parent differs from `forbidden`
    pub fn is_different(&mut self, parent: Source, forbidden: isize) -> NodeId {
        self.add(Invariant::IsDifferent { forbidden }, vec![parent])
    }

    /// Adds a node chaining the given invariant stages: the first stage
    /// aggregates the parents, each further stage transforms the output of
    /// its predecessor
    pub fn composite(
        &mut self,
        name: &str,
        stages: Vec<Invariant>,
        parents: Vec<Source>,
    ) -> NodeId {
        assert!(!stages.is_empty(), "a composite needs at least one stage");
        self.add(
            Invariant::Composite {
                name: name.to_string(),
                stages,
                stage_values: vec![],
            },
            parents,
        )
    }

    /// Declares the objective sink, summing the given parents (objective
    /// terms and soft penalties alike). There must be exactly one.
    ///
    /// # Panics
    /// When a sink was already declared.
    pub fn objective(&mut self, parents: Vec<Source>) -> NodeId {
        assert!(self.objective.is_none(), "a graph has exactly one objective sink");
        let id = self.add(Invariant::Objective, parents);
        self.nodes[id.0].cp_relevant = false;
        self.objective = Some(id);
        id
    }

    /// Registers `node` as a hard feasibility aggregate: any assignment
    /// under which its value is non zero is infeasible
    pub fn hard_constraint(&mut self, node: NodeId) {
        if !self.violations.contains(&node) {
            self.violations.push(node);
        }
    }

    /// Excludes `node` from the CP translation (typically: the purely
    /// objective-side aggregates, which the CP subsolver could not use to
    /// prune anything)
    pub fn exclude_from_cp(&mut self, node: NodeId) {
        self.nodes[node.0].cp_relevant = false;
    }

    /// Wires the children lists and the per-variable first-invariant cache,
    /// and seals the graph.
    ///
    /// # Panics
    /// When no objective sink was declared.
    pub fn build(mut self) -> Dag {
        let objective = self.objective.expect("a graph needs an objective sink");
        let mut var_to_first_invariants: Vec<Vec<NodeId>> = vec![vec![]; self.nb_variables];
        for id in 0..self.nodes.len() {
            let parents = self.nodes[id].parents.clone();
            for s in parents {
                match s {
                    Source::Node(p) => {
                        if !self.nodes[p.0].children.contains(&NodeId(id)) {
                            self.nodes[p.0].children.push(NodeId(id));
                        }
                    }
                    Source::Variable(v) => {
                        let firsts = &mut var_to_first_invariants[v.id()];
                        if !firsts.contains(&NodeId(id)) {
                            firsts.push(NodeId(id));
                        }
                    }
                }
            }
        }
        Dag {
            nodes: self.nodes,
            values: vec![],
            var_to_first_invariants,
            objective,
            violations: self.violations,
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
