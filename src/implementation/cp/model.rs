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

//! This module provides the CP companion model of a local search: the
//! structure which, given the current assignment and a set of relaxed
//! variables, enumerates the feasible completions. It is the bridge between
//! the two solvers: the invariant graph evaluates moves, this model tells
//! which moves are worth evaluating at all.
//!
//! A filtering call is a *scoped acquisition* of the trailer: whatever
//! happens inside (including an infeasible root propagation), the model
//! restores the trailer to its root and puts the pristine notification
//! lists back before returning, so that consecutive calls are independent.

use rand::rngs::SmallRng;

use crate::{
    fix_point, Constraint, ConstraintId, ConstraintSpec, CpRun, CpRunConfig, CpStore, CpVarId,
    SearchStatus, Value, Variable, WorkSet,
};

// ----------------------------------------------------------------------------
// --- CONTEXTS ---------------------------------------------------------------
// ----------------------------------------------------------------------------
/// What the model remembers about one decision variable: its CP counterpart
/// and the pristine notification list, reinstalled after every filtering run.
#[derive(Debug)]
struct DecisionContext {
    var: CpVarId,
    initial_watchers: Vec<ConstraintId>,
}

/// What the model remembers about one intermediate variable: the CP variable
/// standing for an invariant's output, the inner constraint that defines it
/// from its parents, and the pristine notification list.
#[derive(Debug)]
struct IntermediateContext {
    var: CpVarId,
    inner: ConstraintId,
    initial_watchers: Vec<ConstraintId>,
}

// ----------------------------------------------------------------------------
// --- MODEL ------------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The CP companion model: a trailed store, the constraint arena, one
/// context per decision variable (indexed like the decision variables
/// themselves), one context per intermediate variable (in topological
/// order), and the transversal constraints (those not owned by any single
/// intermediate, e.g. the hard comparators).
#[derive(Debug, Default)]
pub struct CpLsModel {
    store: CpStore,
    constraints: Vec<Constraint>,
    decisions: Vec<DecisionContext>,
    intermediates: Vec<IntermediateContext>,
    transversal: Vec<ConstraintId>,
}

impl CpLsModel {
    // --- construction (used by the DAG translation pass) --------------------

    /// Creates the CP variable mirroring a decision variable. Decision
    /// variables must be declared in variable-id order.
    pub fn add_decision(&mut self, values: &[isize]) -> CpVarId {
        let var = self.store.new_int_var(values);
        self.decisions.push(DecisionContext { var, initial_watchers: vec![] });
        var
    }

    /// Creates an intermediate integer variable (an invariant output)
    pub fn new_intermediate_int(&mut self, values: &[isize]) -> CpVarId {
        self.store.new_int_var(values)
    }

    /// Creates an intermediate boolean variable (an invariant output)
    pub fn new_intermediate_bool(&mut self) -> CpVarId {
        self.store.new_bool_var()
    }

    /// Posts a constraint: allocates its entailment flag, registers it on
    /// the notification lists of the variables it watches
    pub fn post(&mut self, spec: ConstraintSpec) -> ConstraintId {
        let constraint = Constraint::new(&mut self.store.trail, spec);
        let id = ConstraintId(self.constraints.len());
        constraint.post(id, &mut self.store);
        self.constraints.push(constraint);
        id
    }

    /// Posts the canonical counting constraint `AtMost(xs, set, k)`: at
    /// most `k` of the `xs` may take a value in `set`. It is the one-sided
    /// `AmongUp` propagator under its usual name.
    pub fn post_at_most(
        &mut self,
        xs: Vec<CpVarId>,
        set: Vec<isize>,
        k: usize,
    ) -> ConstraintId {
        self.post(ConstraintSpec::AmongUp { xs, set, k })
    }

    /// Declares `var` as an intermediate defined by its `inner` constraint
    pub fn declare_intermediate(&mut self, var: CpVarId, inner: ConstraintId) {
        self.intermediates.push(IntermediateContext { var, inner, initial_watchers: vec![] });
    }

    /// Declares a constraint that no single intermediate owns
    pub fn declare_transversal(&mut self, constraint: ConstraintId) {
        self.transversal.push(constraint);
    }

    /// Snapshots the pristine notification lists. To be called once the
    /// whole model is built, before the first filtering call.
    pub fn freeze(&mut self) {
        for i in 0..self.decisions.len() {
            let var = self.decisions[i].var;
            self.decisions[i].initial_watchers = self.store.watchers(var).to_vec();
        }
        for i in 0..self.intermediates.len() {
            let var = self.intermediates[i].var;
            self.intermediates[i].initial_watchers = self.store.watchers(var).to_vec();
        }
    }

    /// The CP variable mirroring the given decision variable
    pub fn decision_var(&self, variable: Variable) -> CpVarId {
        self.decisions[variable.id()].var
    }
    pub fn nb_decisions(&self) -> usize {
        self.decisions.len()
    }

    // --- filtering ----------------------------------------------------------

    /// Enumerates the feasible completions of `solution` when the variables
    /// of `relaxed` are freed: each completion lists, in the order of
    /// `relaxed`, values such that re-assigning them to the relaxed
    /// variables satisfies every constraint of the model.
    ///
    /// With the default (deterministic) selection strategies, this
    /// enumeration is a pure function of the inputs. The trailer is restored
    /// to its root before returning, on every path.
    pub fn feasible_completions(
        &mut self,
        solution: &[Value],
        relaxed: &[Variable],
        config: CpRunConfig,
        rng: &mut SmallRng,
    ) -> (Vec<Vec<Value>>, SearchStatus) {
        self.store.trail.save();
        let mut branchables: Vec<CpVarId> =
            relaxed.iter().map(|&v| self.decision_var(v)).collect();

        let status = self.install(solution, relaxed, &mut branchables);
        let (solutions, status) = match status {
            SearchStatus::Infeasible => (vec![], SearchStatus::Infeasible),
            _ => {
                let mut run =
                    CpRun::new(&mut self.store, &self.constraints, branchables, config);
                let status = run.solve(rng);
                (run.solutions, status)
            }
        };

        self.reset();
        let completions = solutions
            .iter()
            .map(|sol| sol[0..relaxed.len()].iter().map(|&v| Value::Int(v)).collect())
            .collect();
        (completions, status)
    }

    /// True iff the given complete assignment satisfies every constraint of
    /// the model (this is filtering with an empty relaxed set, once the move
    /// under scrutiny has been applied to the assignment).
    pub fn is_feasible(&mut self, solution: &[Value]) -> bool {
        self.store.trail.save();
        let mut pending = WorkSet::default();
        let mut feasible = true;
        for (i, ctx) in self.decisions.iter().enumerate() {
            if !self.store.assign(ctx.var, solution[i].as_int(), &mut pending) {
                feasible = false;
                break;
            }
        }
        if feasible {
            for i in 0..self.constraints.len() {
                pending.push(ConstraintId(i));
            }
            feasible = fix_point(&self.constraints, &mut self.store, &mut pending);
        }
        self.reset();
        feasible
    }

    /// Applies the non-relaxed part of the current solution and lets the
    /// inner constraints of the bound intermediates do their work. The
    /// intermediates that remain unbound join the branchable set. Also
    /// trims the notification lists of the not-yet-assigned variables down
    /// to their still-active constraints.
    fn install(
        &mut self,
        solution: &[Value],
        relaxed: &[Variable],
        branchables: &mut Vec<CpVarId>,
    ) -> SearchStatus {
        let mut pending = WorkSet::default();

        for (i, ctx) in self.decisions.iter().enumerate() {
            if relaxed.iter().any(|v| v.id() == i) {
                continue;
            }
            if !self.store.assign(ctx.var, solution[i].as_int(), &mut pending) {
                return SearchStatus::Infeasible;
            }
        }

        // apply the inner constraint of each intermediate (in topological
        // order, so that bound parents bind their outputs cascade-style)
        for i in 0..self.intermediates.len() {
            let inner = self.intermediates[i].inner;
            pending.push(inner);
            if !fix_point(&self.constraints, &mut self.store, &mut pending) {
                return SearchStatus::Infeasible;
            }
        }
        for i in 0..self.transversal.len() {
            pending.push(self.transversal[i]);
            if !fix_point(&self.constraints, &mut self.store, &mut pending) {
                return SearchStatus::Infeasible;
            }
        }

        for ctx in &self.intermediates {
            if !self.store.is_bound(ctx.var) {
                branchables.push(ctx.var);
            }
        }

        // drop the entailed constraints from the notification lists of the
        // variables the search will still touch
        let still_open: Vec<CpVarId> = branchables
            .iter()
            .copied()
            .filter(|&x| !self.store.is_bound(x))
            .collect();
        for x in still_open {
            let trimmed: Vec<ConstraintId> = self
                .store
                .watchers(x)
                .iter()
                .copied()
                .filter(|c| self.constraints[c.0].is_active(&self.store.trail))
                .collect();
            self.store.set_watchers(x, trimmed);
        }
        SearchStatus::Complete
    }

    /// Restores the trailer to its root and reinstalls the pristine
    /// notification lists
    fn reset(&mut self) {
        self.store.trail.restore_to_root();
        for i in 0..self.decisions.len() {
            let var = self.decisions[i].var;
            let watchers = self.decisions[i].initial_watchers.clone();
            self.store.set_watchers(var, watchers);
        }
        for i in 0..self.intermediates.len() {
            let var = self.intermediates[i].var;
            let watchers = self.intermediates[i].initial_watchers.clone();
            self.store.set_watchers(var, watchers);
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

    /// Three variables over {0,1,2}, all different
    fn all_diff_model() -> CpLsModel {
        let mut model = CpLsModel::default();
        let x0 = model.add_decision(&[0, 1, 2]);
        let x1 = model.add_decision(&[0, 1, 2]);
        let x2 = model.add_decision(&[0, 1, 2]);
        let ad = model.post(ConstraintSpec::AllDifferent { xs: vec![x0, x1, x2] });
        model.declare_transversal(ad);
        model.freeze();
        model
    }

    #[test]
    fn completions_match_a_brute_force_enumeration() {
        let mut model = all_diff_model();
        let solution = vec![Value::Int(0), Value::Int(1), Value::Int(2)];
        let relaxed = vec![Variable(0), Variable(2)];

        let (completions, status) = model.feasible_completions(
            &solution,
            &relaxed,
            CpRunConfig::default(),
            &mut rng(),
        );
        assert_eq!(SearchStatus::Complete, status);

        // brute force: x1 stays 1; (x0, x2) must keep all three distinct
        let mut expected = vec![];
        for a in 0..=2isize {
            for b in 0..=2isize {
                if a != 1 && b != 1 && a != b {
                    expected.push(vec![Value::Int(a), Value::Int(b)]);
                }
            }
        }
        let mut got = completions.clone();
        got.sort();
        expected.sort();
        assert_eq!(expected, got);
    }

    #[test]
    fn filtering_twice_gives_the_same_answer() {
        let mut model = all_diff_model();
        let solution = vec![Value::Int(0), Value::Int(1), Value::Int(2)];
        let relaxed = vec![Variable(0), Variable(2)];

        let (first, _) = model.feasible_completions(
            &solution,
            &relaxed,
            CpRunConfig::default(),
            &mut rng(),
        );
        let (second, _) = model.feasible_completions(
            &solution,
            &relaxed,
            CpRunConfig::default(),
            &mut rng(),
        );
        assert_eq!(first, second);
    }

    #[test]
    fn at_most_caps_how_many_variables_enter_the_set() {
        // three 0/1 variables, at most one of which may be raised
        let mut model = CpLsModel::default();
        let x0 = model.add_decision(&[0, 1]);
        let x1 = model.add_decision(&[0, 1]);
        let x2 = model.add_decision(&[0, 1]);
        let cap = model.post_at_most(vec![x0, x1, x2], vec![1], 1);
        model.declare_transversal(cap);
        model.freeze();

        assert!(model.is_feasible(&[Value::Int(0), Value::Int(1), Value::Int(0)]));
        assert!(!model.is_feasible(&[Value::Int(1), Value::Int(1), Value::Int(0)]));

        // x0 already uses up the quota: relaxing the two others can only
        // leave them out of the set
        let (completions, status) = model.feasible_completions(
            &[Value::Int(1), Value::Int(0), Value::Int(0)],
            &[Variable(1), Variable(2)],
            CpRunConfig::default(),
            &mut rng(),
        );
        assert_eq!(SearchStatus::Complete, status);
        assert_eq!(vec![vec![Value::Int(0), Value::Int(0)]], completions);
    }

    #[test]
    fn is_feasible_accepts_and_rejects_complete_assignments() {
        let mut model = all_diff_model();
        assert!(model.is_feasible(&[Value::Int(2), Value::Int(0), Value::Int(1)]));
        assert!(!model.is_feasible(&[Value::Int(2), Value::Int(0), Value::Int(2)]));
        // and the model is still usable afterwards
        assert!(model.is_feasible(&[Value::Int(1), Value::Int(0), Value::Int(2)]));
    }

    #[test]
    fn relaxing_a_variable_tied_to_the_frozen_part_prunes_the_completions() {
        let mut model = CpLsModel::default();
        let x0 = model.add_decision(&[0, 1]);
        let x1 = model.add_decision(&[0, 1]);
        let eq = model.post(ConstraintSpec::Equal { x: x0, y: x1 });
        model.declare_transversal(eq);
        model.freeze();

        // x1 is frozen at 1, x0 relaxed: the only completion echoes x1
        let (some, _) = model.feasible_completions(
            &[Value::Int(0), Value::Int(1)],
            &[Variable(0)],
            CpRunConfig::default(),
            &mut rng(),
        );
        assert_eq!(vec![vec![Value::Int(1)]], some);
    }

    #[test]
    fn an_infeasible_frozen_part_yields_no_completion() {
        let mut model = CpLsModel::default();
        let x0 = model.add_decision(&[0]);
        let x1 = model.add_decision(&[0, 1]);
        let eq = model.post(ConstraintSpec::Equal { x: x0, y: x1 });
        model.declare_transversal(eq);
        model.freeze();

        // freezing x1 at 1 contradicts x0 == x1 since x0 can only be 0
        let (none, status) = model.feasible_completions(
            &[Value::Int(0), Value::Int(1)],
            &[Variable(0)],
            CpRunConfig::default(),
            &mut rng(),
        );
        assert!(none.is_empty());
        assert_eq!(SearchStatus::Infeasible, status);
        // and a later call still works
        assert!(model.is_feasible(&[Value::Int(0), Value::Int(0)]));
    }
}
