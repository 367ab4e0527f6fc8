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

//! This module provides the depth-first branch-and-prune search of the CP
//! subsolver. The search is driven by an explicit continuation stack rather
//! than by recursion: every branching decision becomes a trio of stack
//! entries (the assignment branch, the refutation branch, and the restore
//! that rebalances the trailer), which lets the enumeration pause when the
//! caller only wants the first few solutions and keeps the save/restore
//! pairs balanced on every exit path, time out included.

use std::time::{Duration, Instant};

use derive_builder::Builder;
use rand::{rngs::SmallRng, Rng};

use crate::{fix_point, Constraint, ConstraintId, CpStore, CpVarId, SearchStatus, WorkSet};

/// The default wall-clock budget of one CP run. This default is admittedly
/// problem dependent; it can be overridden through `CpRunConfig`.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(10);

// ----------------------------------------------------------------------------
// --- CONFIGURATION ----------------------------------------------------------
// ----------------------------------------------------------------------------
/// The resource parameters of one CP run.
///
/// # Example
/// ```
/// # use cbls::CpRunConfigBuilder;
/// use std::time::Duration;
/// let config = CpRunConfigBuilder::default()
///     .time_limit(Duration::from_millis(500))
///     .build()
///     .unwrap();
/// assert_eq!(Duration::from_millis(500), config.time_limit);
/// ```
#[derive(Debug, Clone, Copy, Builder)]
pub struct CpRunConfig {
    /// The wall clock budget of the run; checked at every branching node
    #[builder(default = "DEFAULT_TIME_LIMIT")]
    pub time_limit: Duration,
    /// When set, the enumeration pauses after that many solutions
    #[builder(default = "None")]
    pub max_solutions: Option<usize>,
}
impl Default for CpRunConfig {
    fn default() -> Self {
        CpRunConfigBuilder::default().build().unwrap()
    }
}

/// The strategy used to pick the next variable to branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableSelection {
    /// Branch on the unbound variable with the fewest remaining values
    /// (first one in case of tie). This is the default.
    MinDomain,
    /// Branch on an unbound variable drawn uniformly at random
    Random,
}

/// The strategy used to pick the value to try first on the branching variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSelection {
    /// Try the largest value of the domain first. This is the default.
    MaxValue,
    /// Try a value drawn uniformly at random
    Random,
}

// ----------------------------------------------------------------------------
// --- SEARCH -----------------------------------------------------------------
// ----------------------------------------------------------------------------
/// One continuation of the search. A branching node pushes the refutation
/// branch below the assignment branch so that *assign* is always explored
/// first; both branches stack their own `Restore` right after saving, which
/// guarantees the trailer is rebalanced no matter how the subtree ends.
#[derive(Debug, Clone, Copy)]
enum SearchStep {
    /// Examine the current node: record a solution, stop, or branch
    Expand,
    /// Try `var = val` (the left branch)
    Assign(CpVarId, isize),
    /// Try `var != val` (the right branch)
    Remove(CpVarId, isize),
    /// Pop the checkpoint taken by the matching branch entry
    Restore,
}

/// A CP run: one depth-first enumeration of the feasible assignments of the
/// branchable variables. A run is created fresh for each move-filtering call
/// and only borrows the (trailed) store and the constraints; the solutions
/// it finds are collected in `solutions`, each one listing the values of the
/// branchable variables in their declaration order.
pub struct CpRun<'a> {
    store: &'a mut CpStore,
    constraints: &'a [Constraint],
    /// The variables the search branches on
    branchables: Vec<CpVarId>,
    config: CpRunConfig,
    var_selection: VariableSelection,
    val_selection: ValueSelection,
    /// The assignments of the branchables that were proven feasible
    pub solutions: Vec<Vec<isize>>,
}

impl<'a> CpRun<'a> {
    pub fn new(
        store: &'a mut CpStore,
        constraints: &'a [Constraint],
        branchables: Vec<CpVarId>,
        config: CpRunConfig,
    ) -> Self {
        CpRun {
            store,
            constraints,
            branchables,
            config,
            var_selection: VariableSelection::MinDomain,
            val_selection: ValueSelection::MaxValue,
            solutions: vec![],
        }
    }

    pub fn with_selection(
        mut self,
        var_selection: VariableSelection,
        val_selection: ValueSelection,
    ) -> Self {
        self.var_selection = var_selection;
        self.val_selection = val_selection;
        self
    }

    /// Runs the depth-first enumeration. On return the trailer holds as many
    /// checkpoints as when the method was entered (every branch checkpoint
    /// has been popped), whatever the status.
    ///
    /// The random source is only ever sampled by the `Random` selection
    /// strategies; with the default min-domain/max-value strategies the
    /// enumeration is fully deterministic.
    pub fn solve(&mut self, rng: &mut SmallRng) -> SearchStatus {
        let start = Instant::now();
        let mut pending = WorkSet::default();
        for i in 0..self.constraints.len() {
            pending.push(ConstraintId(i));
        }
        if !fix_point(self.constraints, self.store, &mut pending) {
            return SearchStatus::Infeasible;
        }

        let mut stack = vec![SearchStep::Expand];
        while let Some(step) = stack.pop() {
            match step {
                SearchStep::Expand => {
                    if self.is_above(start, self.config.time_limit) {
                        Self::unwind(self.store, &mut stack);
                        return SearchStatus::LimitStop;
                    }
                    match self.pick_variable(rng) {
                        None => {
                            self.record_solution();
                            if self.enough_solutions() {
                                Self::unwind(self.store, &mut stack);
                                return SearchStatus::LimitStop;
                            }
                        }
                        Some(var) => {
                            let val = self.pick_value(var, rng);
                            stack.push(SearchStep::Remove(var, val));
                            stack.push(SearchStep::Assign(var, val));
                        }
                    }
                }
                SearchStep::Assign(var, val) => {
                    self.store.trail.save();
                    stack.push(SearchStep::Restore);
                    if self.store.assign(var, val, &mut pending)
                        && fix_point(self.constraints, self.store, &mut pending)
                    {
                        stack.push(SearchStep::Expand);
                    } else {
                        pending.clear();
                    }
                }
                SearchStep::Remove(var, val) => {
                    self.store.trail.save();
                    stack.push(SearchStep::Restore);
                    if self.store.remove(var, val, &mut pending)
                        && fix_point(self.constraints, self.store, &mut pending)
                    {
                        stack.push(SearchStep::Expand);
                    } else {
                        pending.clear();
                    }
                }
                SearchStep::Restore => self.store.trail.restore(),
            }
        }
        SearchStatus::Complete
    }

    /// True iff the elapsed time exceeds the given budget
    fn is_above(&self, start: Instant, budget: Duration) -> bool {
        start.elapsed() >= budget
    }

    /// Pops the continuations of an interrupted search, honouring the
    /// pending restores so the trailer ends up balanced
    fn unwind(store: &mut CpStore, stack: &mut Vec<SearchStep>) {
        while let Some(step) = stack.pop() {
            if let SearchStep::Restore = step {
                store.trail.restore();
            }
        }
    }

    fn enough_solutions(&self) -> bool {
        self.config
            .max_solutions
            .map_or(false, |cap| self.solutions.len() >= cap)
    }

    fn record_solution(&mut self) {
        let solution = self
            .branchables
            .iter()
            .map(|&x| self.store.value(x))
            .collect();
        self.solutions.push(solution);
    }

    /// Picks the next branching variable, or `None` when every branchable is
    /// bound (i.e. the current node is a solution)
    fn pick_variable(&self, rng: &mut SmallRng) -> Option<CpVarId> {
        let unbound: Vec<CpVarId> = self
            .branchables
            .iter()
            .copied()
            .filter(|&x| !self.store.is_bound(x))
            .collect();
        if unbound.is_empty() {
            return None;
        }
        match self.var_selection {
            VariableSelection::MinDomain => {
                unbound.iter().copied().min_by_key(|&x| self.store.size(x))
            }
            VariableSelection::Random => Some(unbound[rng.gen_range(0..unbound.len())]),
        }
    }

    fn pick_value(&self, var: CpVarId, rng: &mut SmallRng) -> isize {
        match self.val_selection {
            ValueSelection::MaxValue => self.store.max(var),
            ValueSelection::Random => {
                let values = self.store.values(var);
                values[rng.gen_range(0..values.len())]
            }
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::{rngs::SmallRng, SeedableRng};

    use crate::*;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(0)
    }

    #[test]
    fn dfs_enumerates_assign_first_in_max_value_order() {
        // x in {1,2,3}, y in {2,3}, x == y
        let mut store = CpStore::default();
        let x = store.new_int_var(&[1, 2, 3]);
        let y = store.new_int_var(&[2, 3]);
        let eq = Constraint::new(&mut store.trail, ConstraintSpec::Equal { x, y });
        eq.post(ConstraintId(0), &mut store);
        let constraints = vec![eq];

        let mut run = CpRun::new(&mut store, &constraints, vec![x, y], CpRunConfig::default());
        let status = run.solve(&mut rng());

        assert_eq!(SearchStatus::Complete, status);
        assert_eq!(vec![vec![3, 3], vec![2, 2]], run.solutions);
    }

    #[test]
    fn an_infeasible_root_yields_no_solution() {
        let mut store = CpStore::default();
        let x = store.new_int_var(&[1]);
        let y = store.new_int_var(&[2]);
        let eq = Constraint::new(&mut store.trail, ConstraintSpec::Equal { x, y });
        eq.post(ConstraintId(0), &mut store);
        let constraints = vec![eq];

        let mut run = CpRun::new(&mut store, &constraints, vec![x, y], CpRunConfig::default());
        assert_eq!(SearchStatus::Infeasible, run.solve(&mut rng()));
        assert!(run.solutions.is_empty());
    }

    #[test]
    fn the_trailer_is_balanced_when_the_search_returns() {
        let mut store = CpStore::default();
        let x = store.new_int_var(&[1, 2, 3]);
        let y = store.new_int_var(&[1, 2, 3]);
        let ne = Constraint::new(&mut store.trail, ConstraintSpec::NotEqual { x, y });
        ne.post(ConstraintId(0), &mut store);
        let constraints = vec![ne];

        {
            let mut run =
                CpRun::new(&mut store, &constraints, vec![x, y], CpRunConfig::default());
            assert_eq!(SearchStatus::Complete, run.solve(&mut rng()));
            assert_eq!(6, run.solutions.len());
        }
        assert_eq!(0, store.trail.depth());
        // and the domains are intact
        assert_eq!(3, store.size(x));
        assert_eq!(3, store.size(y));
    }

    #[test]
    fn the_solution_cap_pauses_the_enumeration() {
        let mut store = CpStore::default();
        let x = store.new_int_var(&[1, 2, 3]);
        let y = store.new_int_var(&[1, 2, 3]);
        let constraints = vec![];

        let config = CpRunConfigBuilder::default()
            .max_solutions(Some(2))
            .build()
            .unwrap();
        let mut run = CpRun::new(&mut store, &constraints, vec![x, y], config);
        assert_eq!(SearchStatus::LimitStop, run.solve(&mut rng()));
        assert_eq!(2, run.solutions.len());
    }

    #[test]
    fn a_zero_time_budget_stops_immediately() {
        let mut store = CpStore::default();
        let x = store.new_int_var(&[1, 2, 3]);
        let constraints = vec![];

        let config = CpRunConfigBuilder::default()
            .time_limit(Duration::from_secs(0))
            .build()
            .unwrap();
        let mut run = CpRun::new(&mut store, &constraints, vec![x], config);
        assert_eq!(SearchStatus::LimitStop, run.solve(&mut rng()));
        assert!(run.solutions.is_empty());
        assert_eq!(0, store.trail.depth());
    }

    #[test]
    fn solve_is_confluent_with_respect_to_propagation_order() {
        // same model, constraints posted in two different orders: the
        // solution sets must coincide
        let build = |flip: bool| {
            let mut store = CpStore::default();
            let x = store.new_int_var(&[1, 2, 3]);
            let y = store.new_int_var(&[1, 2, 3]);
            let z = store.new_int_var(&[2, 3]);
            let mut constraints = vec![
                Constraint::new(&mut store.trail, ConstraintSpec::NotEqual { x, y }),
                Constraint::new(&mut store.trail, ConstraintSpec::Equal { x: y, y: z }),
            ];
            if flip {
                constraints.reverse();
            }
            for (i, c) in constraints.iter().enumerate() {
                c.post(ConstraintId(i), &mut store);
            }
            let mut run =
                CpRun::new(&mut store, &constraints, vec![x, y, z], CpRunConfig::default());
            run.solve(&mut rng());
            let mut sols = run.solutions.clone();
            sols.sort();
            sols
        };
        assert_eq!(build(false), build(true));
    }
}
