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

//! This module provides the translation of an invariant graph into its CP
//! companion model: one pass over the nodes, in topological order, mapping
//! each CP-relevant invariant onto a CP variable plus its defining inner
//! constraint, or onto a transversal constraint when the invariant is a
//! hard bound rather than a value.
//!
//! Translation table:
//! - sum / scalar product: an integer intermediate bounded by the parent
//!   ranges, with a `Sum` / `ScalarProduct` inner constraint;
//! - comparator over a linear intermediate (or a variable): a
//!   `LessOrEqual` transversal constraint; over an `among` node: the fused
//!   `AmongUp` counting constraint (the among itself produces no variable);
//! - and / or / is-different: a boolean intermediate with the matching
//!   inner constraint;
//! - element: an integer intermediate over the array values;
//! - all-different: an `AllDifferent` transversal constraint;
//! - objective sink, composites, and nodes excluded by the experiment: not
//!   translated. A node whose parents are themselves untranslated is
//!   skipped as well (its semantics are already carried by the constraints
//!   standing for those parents).

use fxhash::FxHashMap;

use crate::{
    ConstraintSpec, CpLsModel, CpVarId, Dag, Invariant, NodeId, Source, Value,
};

/// Builds the CP companion model of the given graph: decision variables are
/// mirrored with the given domains, then every CP-relevant node is
/// translated in one topological pass.
pub fn init_cp_model(dag: &Dag, domains: &[Vec<Value>]) -> CpLsModel {
    let mut model = CpLsModel::default();
    for dom in domains {
        let values: Vec<isize> = dom.iter().map(|v| v.as_int()).collect();
        model.add_decision(&values);
    }

    let mut translation = Translation {
        dag,
        domains,
        node_vars: FxHashMap::default(),
        node_bounds: FxHashMap::default(),
    };
    for id in 0..dag.nb_nodes() {
        let node = NodeId(id);
        if !dag.is_cp_relevant(node) || node == dag.objective_id() {
            continue;
        }
        translation.translate(node, &mut model);
    }
    model.freeze();
    model
}

/// The running state of one translation pass
struct Translation<'a> {
    dag: &'a Dag,
    domains: &'a [Vec<Value>],
    /// The CP variable standing for each translated node
    node_vars: FxHashMap<NodeId, CpVarId>,
    /// The (lo, hi) range of each translated node's variable
    node_bounds: FxHashMap<NodeId, (isize, isize)>,
}

impl Translation<'_> {
    fn translate(&mut self, node: NodeId, model: &mut CpLsModel) {
        match self.dag.invariant(node) {
            Invariant::Sum | Invariant::Objective => self.linear(node, None, model),
            Invariant::ScalarProduct { coeffs } => {
                self.linear(node, Some(coeffs.clone()), model)
            }
            Invariant::Comparator { bound } => self.comparator(node, *bound, model),
            Invariant::And { .. } => self.gate(node, true, model),
            Invariant::Or { .. } => self.gate(node, false, model),
            Invariant::IsDifferent { forbidden } => {
                let forbidden = *forbidden;
                if let Some(x) = self.source_var(self.dag.parents(node)[0], model) {
                    let b = model.new_intermediate_bool();
                    let inner = model.post(ConstraintSpec::IsDifferent { x, forbidden, b });
                    model.declare_intermediate(b, inner);
                    self.node_vars.insert(node, b);
                    self.node_bounds.insert(node, (0, 1));
                }
            }
            Invariant::Element { array } => {
                let array = array.clone();
                if let Some(index) = self.source_var(self.dag.parents(node)[0], model) {
                    let mut values = array.clone();
                    values.sort_unstable();
                    values.dedup();
                    let out = model.new_intermediate_int(&values);
                    let (lo, hi) = (values[0], values[values.len() - 1]);
                    let inner = model.post(ConstraintSpec::Element { array, index, out });
                    model.declare_intermediate(out, inner);
                    self.node_vars.insert(node, out);
                    self.node_bounds.insert(node, (lo, hi));
                }
            }
            Invariant::AllDifferent { .. } => {
                if let Some(xs) = self.source_vars(self.dag.parents(node), model) {
                    let c = model.post(ConstraintSpec::AllDifferent { xs });
                    model.declare_transversal(c);
                }
            }
            // an among only reaches the CP side fused under a comparator;
            // composites stay on the evaluation side
            Invariant::Among { .. } | Invariant::Composite { .. } => {}
        }
    }

    fn linear(&mut self, node: NodeId, coeffs: Option<Vec<isize>>, model: &mut CpLsModel) {
        let parents = self.dag.parents(node);
        let xs = match self.source_vars(parents, model) {
            Some(xs) => xs,
            None => return,
        };
        let mut lo = 0;
        let mut hi = 0;
        for (i, &s) in parents.iter().enumerate() {
            let c = coeffs.as_ref().map_or(1, |cs| cs[i]);
            let (p_lo, p_hi) = self.source_bounds(s);
            if c >= 0 {
                lo += c * p_lo;
                hi += c * p_hi;
            } else {
                lo += c * p_hi;
                hi += c * p_lo;
            }
        }
        let values: Vec<isize> = (lo..=hi).collect();
        let y = model.new_intermediate_int(&values);
        let inner = match coeffs {
            Some(coeffs) => model.post(ConstraintSpec::ScalarProduct { coeffs, xs, y }),
            None => model.post(ConstraintSpec::Sum { xs, y }),
        };
        model.declare_intermediate(y, inner);
        self.node_vars.insert(node, y);
        self.node_bounds.insert(node, (lo, hi));
    }

    fn comparator(&mut self, node: NodeId, bound: isize, model: &mut CpLsModel) {
        let parent = self.dag.parents(node)[0];
        // a comparator capping an among is the counting constraint in
        // disguise: fuse the two into one AmongUp
        if let Source::Node(p) = parent {
            if let Invariant::Among { set } = self.dag.invariant(p) {
                if let Some(xs) = self.source_vars(self.dag.parents(p), model) {
                    let c = model.post(ConstraintSpec::AmongUp {
                        xs,
                        set: set.clone(),
                        k: bound.max(0) as usize,
                    });
                    model.declare_transversal(c);
                }
                return;
            }
        }
        if let Some(x) = self.source_var(parent, model) {
            let c = model.post(ConstraintSpec::LessOrEqual { x, bound });
            model.declare_transversal(c);
        }
    }

    /// And (`conjunction == true`) and Or nodes share their translation
    fn gate(&mut self, node: NodeId, conjunction: bool, model: &mut CpLsModel) {
        if let Some(xs) = self.source_vars(self.dag.parents(node), model) {
            let b = model.new_intermediate_bool();
            let inner = if conjunction {
                model.post(ConstraintSpec::And { xs, b })
            } else {
                model.post(ConstraintSpec::Or { xs, b })
            };
            model.declare_intermediate(b, inner);
            self.node_vars.insert(node, b);
            self.node_bounds.insert(node, (0, 1));
        }
    }

    /// The CP variable standing for the given source, if it has one
    fn source_var(&self, source: Source, model: &CpLsModel) -> Option<CpVarId> {
        match source {
            Source::Variable(v) => Some(model.decision_var(v)),
            Source::Node(n) => self.node_vars.get(&n).copied(),
        }
    }

    /// The CP variables of all the given sources, or `None` when some source
    /// has no CP counterpart (in which case the consumer is skipped)
    fn source_vars(&self, sources: &[Source], model: &CpLsModel) -> Option<Vec<CpVarId>> {
        sources.iter().map(|&s| self.source_var(s, model)).collect()
    }

    fn source_bounds(&self, source: Source) -> (isize, isize) {
        match source {
            Source::Variable(v) => {
                let dom = &self.domains[v.id()];
                let lo = dom.iter().map(|x| x.as_int()).min().unwrap();
                let hi = dom.iter().map(|x| x.as_int()).max().unwrap();
                (lo, hi)
            }
            Source::Node(n) => self.node_bounds[&n],
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod tests {
    use rand::{rngs::SmallRng, SeedableRng};

    use crate::*;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(0)
    }

    fn binary_domains(n: usize) -> Vec<Vec<Value>> {
        (0..n).map(|_| vec![Value::Bool(false), Value::Bool(true)]).collect()
    }

    /// weight = 2a + 3b + 4c <= 5, profit excluded from the CP side
    fn knapsack_model() -> CpLsModel {
        let mut builder = DagBuilder::new(3);
        let vars: Vec<Source> = (0..3).map(|i| Source::Variable(Variable(i))).collect();
        let profit = builder.scalar_product(vec![-3, -4, -2], vars.clone());
        builder.exclude_from_cp(profit);
        let weight = builder.scalar_product(vec![2, 3, 4], vars);
        let slack = builder.comparator(Source::Node(weight), 5);
        builder.hard_constraint(slack);
        builder.objective(vec![Source::Node(profit)]);
        let dag = builder.build();

        init_cp_model(&dag, &binary_domains(3))
    }

    #[test]
    fn the_capacity_constraint_crosses_over() {
        let mut model = knapsack_model();
        let t = Value::Bool(true);
        let f = Value::Bool(false);
        assert!(model.is_feasible(&[t, t, f]));
        assert!(model.is_feasible(&[f, f, t]));
        assert!(!model.is_feasible(&[t, f, t]));
        assert!(!model.is_feasible(&[t, t, t]));
    }

    #[test]
    fn completions_only_list_assignments_under_capacity() {
        let mut model = knapsack_model();
        let t = Value::Bool(true);
        let f = Value::Bool(false);
        // relax a and c while b is taken: 2a + 4c <= 2
        let (completions, _) = model.feasible_completions(
            &[f, t, f],
            &[Variable(0), Variable(2)],
            CpRunConfig::default(),
            &mut rng(),
        );
        let mut got = completions;
        got.sort();
        assert_eq!(
            vec![vec![Value::Int(0), Value::Int(0)], vec![Value::Int(1), Value::Int(0)]],
            got
        );
    }

    #[test]
    fn a_comparator_over_an_among_fuses_into_a_counting_constraint() {
        // at most one of the three variables may take the value 1
        let mut builder = DagBuilder::new(3);
        let vars: Vec<Source> = (0..3).map(|i| Source::Variable(Variable(i))).collect();
        let among = builder.among(vars.clone(), vec![1]);
        let slack = builder.comparator(Source::Node(among), 1);
        builder.hard_constraint(slack);
        let spread = builder.sum(vars);
        builder.exclude_from_cp(spread);
        builder.objective(vec![Source::Node(spread)]);
        let dag = builder.build();

        let mut model = init_cp_model(&dag, &binary_domains(3));
        let t = Value::Bool(true);
        let f = Value::Bool(false);
        assert!(model.is_feasible(&[t, f, f]));
        assert!(!model.is_feasible(&[t, t, f]));
    }

    #[test]
    fn an_all_different_node_becomes_a_global_constraint() {
        let mut builder = DagBuilder::new(2);
        let vars: Vec<Source> = (0..2).map(|i| Source::Variable(Variable(i))).collect();
        let clashes = builder.all_different(vars.clone());
        builder.hard_constraint(clashes);
        let load = builder.sum(vars);
        builder.exclude_from_cp(load);
        builder.objective(vec![Source::Node(load)]);
        let dag = builder.build();

        let domains: Vec<Vec<Value>> =
            (0..2).map(|_| vec![Value::Int(1), Value::Int(2)]).collect();
        let mut model = init_cp_model(&dag, &domains);
        assert!(model.is_feasible(&[Value::Int(1), Value::Int(2)]));
        assert!(!model.is_feasible(&[Value::Int(2), Value::Int(2)]));
    }
}
