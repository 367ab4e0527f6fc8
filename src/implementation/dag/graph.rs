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

//! This module provides the incremental evaluation graph: the structure
//! holding the current assignment, the invariant nodes decomposing the
//! objective and the constraints, and the machinery that propagates a move
//! through the affected nodes only.
//!
//! Node ids are handed out monotonically and the graph is built leaves
//! first, so the insertion order *is* a topological order. Propagating in
//! ascending id order (a small id-ordered heap) therefore guarantees that a
//! node is only examined once all of its changed parents have spoken.
//!
//! `evaluate` is speculative: it computes what the move would change and
//! throws the scratch state away, leaving nothing observable behind.
//! `commit` re-plays the propagation and folds the changes into the node
//! caches, the invariant states and the stored assignment.

use std::cmp::Ordering;

use binary_heap_plus::BinaryHeap;
use compare::Compare;
use fxhash::{FxHashMap, FxHashSet};

use crate::{EvaluatedMove, Invariant, Message, Move, ParentDelta, Solution, Value, Variable};

// ----------------------------------------------------------------------------
// --- IDS AND SOURCES --------------------------------------------------------
// ----------------------------------------------------------------------------
/// The identifier of a node of the invariant graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// One input of a node: either a decision variable or the output of an
/// earlier node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Variable(Variable),
    Node(NodeId),
}

/// This is a thin comparator turning the id-ordered propagation queue into
/// a *min* heap (the underlying heap pops its maximum)
#[derive(Debug, Clone, Copy)]
struct MinNodeId;
impl Compare<NodeId> for MinNodeId {
    fn compare(&self, l: &NodeId, r: &NodeId) -> Ordering {
        r.0.cmp(&l.0)
    }
}

// ----------------------------------------------------------------------------
// --- NODES ------------------------------------------------------------------
// ----------------------------------------------------------------------------
/// One node of the graph: its payload, its wiring and its cached output
#[derive(Debug)]
pub(crate) struct Node {
    pub invariant: Invariant,
    pub parents: Vec<Source>,
    pub children: Vec<NodeId>,
    /// The committed output of the node (its last full message)
    pub value: isize,
    /// Whether the node takes part in the CP translation
    pub cp_relevant: bool,
}

// ----------------------------------------------------------------------------
// --- THE GRAPH --------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The invariant graph. Instances are created through `DagBuilder` and must
/// be `init`ialized with a first assignment before any move is evaluated.
#[derive(Debug)]
pub struct Dag {
    pub(crate) nodes: Vec<Node>,
    /// The committed assignment of the decision variables
    pub(crate) values: Solution,
    /// For each decision variable, the distinct first-level invariants to
    /// wake when that variable moves
    pub(crate) var_to_first_invariants: Vec<Vec<NodeId>>,
    /// The unique objective sink
    pub(crate) objective: NodeId,
    /// The hard feasibility aggregates: an assignment is feasible iff they
    /// all evaluate to zero
    pub(crate) violations: Vec<NodeId>,
}

impl Dag {
    /// Installs the initial assignment and computes a full message along
    /// every edge: after this call each node caches its committed output.
    pub fn init(&mut self, assignment: Solution) {
        assert_eq!(
            assignment.len(),
            self.var_to_first_invariants.len(),
            "the initial assignment must cover every variable"
        );
        self.values = assignment;
        for id in 0..self.nodes.len() {
            let parent_values: Vec<isize> = self.nodes[id]
                .parents
                .iter()
                .map(|s| self.source_value(*s))
                .collect();
            let node = &mut self.nodes[id];
            node.value = node.invariant.init(&parent_values);
        }
    }

    /// The committed value of the objective sink
    pub fn current_objective(&self) -> isize {
        self.nodes[self.objective.0].value
    }

    /// True iff every hard feasibility aggregate is at zero
    pub fn is_feasible(&self) -> bool {
        self.violations.iter().all(|n| self.nodes[n.0].value == 0)
    }

    /// The committed assignment
    pub fn assignment(&self) -> &[Value] {
        &self.values
    }

    /// Speculatively propagates the move and reports the objective change
    /// and the feasibility of the would-be assignment. Nothing observable is
    /// mutated: two consecutive evaluations of the same move return the same
    /// answer.
    pub fn evaluate(&self, mov: &Move) -> EvaluatedMove {
        let changes = self.propagate(mov);
        let mut new_values: FxHashMap<NodeId, isize> = FxHashMap::default();
        for (n, _, message) in &changes {
            new_values.insert(*n, message.value_after(self.nodes[n.0].value));
        }
        let delta = new_values
            .get(&self.objective)
            .map_or(0, |v| v - self.current_objective());
        let infeasible = self.violations.iter().any(|n| {
            new_values
                .get(n)
                .copied()
                .unwrap_or(self.nodes[n.0].value)
                > 0
        });
        EvaluatedMove { mov: mov.clone(), delta, infeasible }
    }

    /// Commits the move: re-plays the propagation, folds each accepted delta
    /// into the node caches and the invariant states, and updates the stored
    /// assignment.
    pub fn commit(&mut self, mov: &Move) {
        let changes = self.propagate(mov);
        for d in mov.decisions() {
            self.values[d.variable.id()] = d.value;
        }
        for (n, changed, message) in changes {
            let node = &mut self.nodes[n.0];
            let current = node.value;
            node.invariant.commit(&changed);
            node.value = message.value_after(current);
        }
    }

    /// The core propagation: walks the affected nodes in topological order
    /// and returns, for each node whose output would change, its changed
    /// inputs and the message it would emit. Pure with respect to `self`.
    fn propagate(&self, mov: &Move) -> Vec<(NodeId, Vec<ParentDelta>, Message)> {
        let mut pending_inputs: FxHashMap<NodeId, Vec<ParentDelta>> = FxHashMap::default();
        let mut heap = BinaryHeap::from_vec_cmp(vec![], MinNodeId);
        let mut enqueued: FxHashSet<NodeId> = FxHashSet::default();

        for d in mov.decisions() {
            let var = d.variable.id();
            assert!(var < self.values.len(), "move references an unknown variable");
            let old = self.values[var].as_int();
            let new = d.value.as_int();
            if old == new {
                continue;
            }
            for &n in &self.var_to_first_invariants[var] {
                for (index, s) in self.nodes[n.0].parents.iter().enumerate() {
                    if matches!(s, Source::Variable(v) if v.id() == var) {
                        pending_inputs
                            .entry(n)
                            .or_default()
                            .push(ParentDelta { index, old, new });
                    }
                }
                if enqueued.insert(n) {
                    heap.push(n);
                }
            }
        }

        let mut changes = vec![];
        while let Some(n) = heap.pop() {
            let changed = pending_inputs.remove(&n).unwrap_or_default();
            if changed.is_empty() {
                continue;
            }
            let current = self.nodes[n.0].value;
            let new = self.nodes[n.0].invariant.eval(current, &changed);
            if new == current {
                continue;
            }
            for &child in &self.nodes[n.0].children {
                for (index, s) in self.nodes[child.0].parents.iter().enumerate() {
                    if matches!(s, Source::Node(p) if *p == n) {
                        pending_inputs
                            .entry(child)
                            .or_default()
                            .push(ParentDelta { index, old: current, new });
                    }
                }
                if enqueued.insert(child) {
                    heap.push(child);
                }
            }
            changes.push((n, changed, Message::Delta(new - current)));
        }
        changes
    }

    fn source_value(&self, source: Source) -> isize {
        match source {
            Source::Variable(v) => self.values[v.id()].as_int(),
            Source::Node(n) => self.nodes[n.0].value,
        }
    }

    // --- read access for the CP translation pass ----------------------------
    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }
    pub fn invariant(&self, node: NodeId) -> &Invariant {
        &self.nodes[node.0].invariant
    }
    pub fn parents(&self, node: NodeId) -> &[Source] {
        &self.nodes[node.0].parents
    }
    pub fn is_cp_relevant(&self, node: NodeId) -> bool {
        self.nodes[node.0].cp_relevant
    }
    pub fn is_violation(&self, node: NodeId) -> bool {
        self.violations.contains(&node)
    }
    pub fn objective_id(&self) -> NodeId {
        self.objective
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod tests {
    use crate::*;

    /// A small knapsack-shaped graph over three binary variables:
    /// profit = 3a + 4b + 2c (to minimize, negated), weight = 2a + 3b + 4c,
    /// and the hard constraint weight <= 5.
    fn knapsack_dag() -> Dag {
        let mut builder = DagBuilder::new(3);
        let vars: Vec<Source> = (0..3).map(|i| Source::Variable(Variable(i))).collect();
        let profit = builder.scalar_product(vec![-3, -4, -2], vars.clone());
        let weight = builder.scalar_product(vec![2, 3, 4], vars);
        let slack = builder.comparator(Source::Node(weight), 5);
        builder.hard_constraint(slack);
        builder.objective(vec![Source::Node(profit)]);
        builder.build()
    }

    fn bools(bits: &[isize]) -> Solution {
        bits.iter().map(|&b| Value::Bool(b != 0)).collect()
    }

    fn single_flip(var: usize, to: bool) -> Move {
        Move::new(vec![Decision { variable: Variable(var), value: Value::Bool(to) }])
    }

    #[test]
    fn init_computes_every_cache_from_scratch() {
        let mut dag = knapsack_dag();
        dag.init(bools(&[1, 0, 1]));
        assert_eq!(-5, dag.current_objective());
        // weight 6 exceeds the bound by 1
        assert!(!dag.is_feasible());
    }

    #[test]
    fn evaluate_matches_a_recompute_from_scratch() {
        let mut dag = knapsack_dag();
        dag.init(bools(&[1, 0, 0]));

        // try each single flip and compare against a fresh graph
        for var in 0..3 {
            for to in [false, true] {
                let mov = single_flip(var, to);
                let evaluated = dag.evaluate(&mov);

                let mut scratch = knapsack_dag();
                let mut assignment = bools(&[1, 0, 0]);
                assignment[var] = Value::Bool(to);
                scratch.init(assignment);

                assert_eq!(
                    scratch.current_objective() - dag.current_objective(),
                    evaluated.delta,
                    "flip x{var} to {to}"
                );
                assert_eq!(!scratch.is_feasible(), evaluated.infeasible);
            }
        }
    }

    #[test]
    fn evaluate_is_speculative() {
        let mut dag = knapsack_dag();
        dag.init(bools(&[1, 0, 0]));

        let mov = single_flip(1, true);
        let first = dag.evaluate(&mov);
        // whatever was computed, the graph still stands at its committed state
        assert_eq!(-3, dag.current_objective());
        assert_eq!(Value::Bool(false), dag.assignment()[1]);
        let second = dag.evaluate(&mov);
        assert_eq!(first, second);
    }

    #[test]
    fn commit_replays_the_evaluated_move() {
        let mut dag = knapsack_dag();
        dag.init(bools(&[1, 0, 0]));

        let mov = single_flip(1, true);
        let evaluated = dag.evaluate(&mov);
        dag.commit(&mov);

        assert_eq!(-3 + evaluated.delta, dag.current_objective());
        assert_eq!(-7, dag.current_objective());
        assert_eq!(Value::Bool(true), dag.assignment()[1]);
        // weight is 5: still feasible
        assert!(dag.is_feasible());
    }

    #[test]
    fn a_move_to_the_current_value_changes_nothing() {
        let mut dag = knapsack_dag();
        dag.init(bools(&[1, 0, 0]));
        let evaluated = dag.evaluate(&single_flip(0, true));
        assert_eq!(0, evaluated.delta);
        assert!(!evaluated.infeasible);
    }

    #[test]
    fn multi_variable_moves_propagate_once_per_node() {
        let mut dag = knapsack_dag();
        dag.init(bools(&[0, 0, 0]));
        let mov = Move::new(vec![
            Decision { variable: Variable(0), value: Value::Bool(true) },
            Decision { variable: Variable(1), value: Value::Bool(true) },
        ]);
        let evaluated = dag.evaluate(&mov);
        assert_eq!(-7, evaluated.delta);
        assert!(!evaluated.infeasible);

        dag.commit(&mov);
        assert_eq!(-7, dag.current_objective());
        assert!(dag.is_feasible());
    }

    #[test]
    #[should_panic(expected = "unknown variable")]
    fn referencing_an_unknown_variable_is_a_violation() {
        let mut dag = knapsack_dag();
        dag.init(bools(&[0, 0, 0]));
        let _ = dag.evaluate(&single_flip(12, true));
    }

    /// Three integer variables whose total load is capped at 5: the cap is
    /// one composite node chaining a sum into a slack stage, and the
    /// objective is the plain load.
    fn composite_dag() -> Dag {
        let mut builder = DagBuilder::new(3);
        let vars: Vec<Source> = (0..3).map(|i| Source::Variable(Variable(i))).collect();
        let load = builder.sum(vars.clone());
        let overload = builder.composite(
            "overload",
            vec![Invariant::Sum, Invariant::Comparator { bound: 5 }],
            vars,
        );
        builder.hard_constraint(overload);
        builder.objective(vec![Source::Node(load)]);
        builder.build()
    }

    fn set_to(var: usize, value: isize) -> Move {
        Move::new(vec![Decision { variable: Variable(var), value: Value::Int(value) }])
    }

    #[test]
    fn a_composite_node_prices_moves_like_its_expanded_chain() {
        let mut dag = composite_dag();
        dag.init(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(6, dag.current_objective());
        // the composite slack stands at 1: over capacity
        assert!(!dag.is_feasible());

        // every single re-assignment is priced exactly like a recompute
        // from scratch
        for var in 0..3 {
            for value in 0..=4 {
                let mov = set_to(var, value);
                let evaluated = dag.evaluate(&mov);

                let mut scratch = composite_dag();
                let mut assignment = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
                assignment[var] = Value::Int(value);
                scratch.init(assignment);

                assert_eq!(
                    scratch.current_objective() - dag.current_objective(),
                    evaluated.delta,
                    "set x{var} to {value}"
                );
                assert_eq!(!scratch.is_feasible(), evaluated.infeasible);
            }
        }
    }

    #[test]
    fn committing_through_a_composite_updates_its_staged_state() {
        let mut dag = composite_dag();
        dag.init(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

        // lowering x2 brings the load back within the cap
        dag.commit(&set_to(2, 2));
        assert_eq!(5, dag.current_objective());
        assert!(dag.is_feasible());

        // the next round prices off the committed stage values
        let evaluated = dag.evaluate(&set_to(0, 3));
        assert_eq!(2, evaluated.delta);
        assert!(evaluated.infeasible);

        dag.commit(&set_to(0, 3));
        assert_eq!(7, dag.current_objective());
        assert!(!dag.is_feasible());
    }
}
