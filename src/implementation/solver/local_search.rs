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

//! This module provides the local search driver: the structure that wires
//! the experiment, the invariant graph and the heuristics together and runs
//! the optimization loop. The engine is single threaded and cooperative:
//! everything happens inside `optimize`, state is only observable at
//! iteration boundaries, and a fixed seed makes any run reproducible.

use std::time::Instant;

use rand::{rngs::SmallRng, SeedableRng};

use crate::{
    Completion, Dag, DagBuilder, EvaluatedMove, Experiment, Initialization, MoveFilter,
    MoveSelection, Neighborhood, SearchView, Solution, Statistics, StopCriterion, Value,
};

/// Builds the invariant graph an experiment describes. This is also what
/// client code calls when it needs the graph ahead of the solver (e.g. to
/// derive the CP companion model for a `CpFilter`).
pub fn build_experiment_dag(experiment: &dyn Experiment) -> Dag {
    let mut builder = DagBuilder::new(experiment.nb_variables());
    experiment.build_dag(&mut builder);
    builder.build()
}

/// This is the structure driving the constraint-based local search. The
/// experiment and the heuristics are borrowed, in the same spirit as the
/// other solvers of this family: the caller owns the strategy objects and
/// may inspect them once the optimization is over.
///
/// # Example
/// ```
/// # use cbls::*;
/// # struct OneBit;
/// # impl Experiment for OneBit {
/// #     fn nb_variables(&self) -> usize { 1 }
/// #     fn value_kind(&self) -> ValueKind { ValueKind::Bool }
/// #     fn domains(&self) -> Vec<Vec<Value>> {
/// #         vec![vec![Value::Bool(false), Value::Bool(true)]]
/// #     }
/// #     fn build_dag(&self, dag: &mut DagBuilder) {
/// #         let x = Source::Variable(Variable(0));
/// #         let cost = dag.scalar_product(vec![-1], vec![x]);
/// #         dag.objective(vec![Source::Node(cost)]);
/// #     }
/// #     fn initial_solution(&self) -> Solution { vec![Value::Bool(false)] }
/// #     fn use_cp(&self) -> bool { false }
/// # }
/// let problem = OneBit;
/// let init = SimpleInit;
/// let mut neighborhood = BinarySingleNeighborhood;
/// let mut filter = NoFilter;
/// let mut selection = GreedySelection;
/// let stop = IterationLimit(10);
///
/// let mut solver = LocalSearch::new(
///     &problem,
///     &init,
///     &mut neighborhood,
///     &mut filter,
///     &mut selection,
///     &stop,
///     0,
/// );
/// let completion = solver.optimize();
/// assert_eq!(-1, completion.best_value);
/// ```
pub struct LocalSearch<'a> {
    /// The problem being solved
    experiment: &'a dyn Experiment,
    /// The strategy producing the initial assignment
    initialization: &'a dyn Initialization,
    /// The strategy proposing the candidate moves of each iteration
    neighborhood: &'a mut dyn Neighborhood,
    /// The feasibility filter applied before any evaluation
    filter: &'a mut dyn MoveFilter,
    /// The strategy electing the one move to commit
    selection: &'a mut dyn MoveSelection,
    /// The criterion deciding when to stop, polled between iterations
    stop: &'a dyn StopCriterion,

    /// The invariant graph (owns the current assignment)
    dag: Dag,
    /// The domain of each decision variable
    domains: Vec<Vec<Value>>,
    /// The one random source, threaded through every stochastic heuristic
    rng: SmallRng,
    /// The number of completed iterations
    iteration: usize,
    /// The best feasible objective observed so far
    best_value: isize,
    /// The assignment achieving `best_value`
    best_solution: Solution,
    /// The counters reported along with the completion
    stats: Statistics,
}

impl<'a> LocalSearch<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        experiment: &'a dyn Experiment,
        initialization: &'a dyn Initialization,
        neighborhood: &'a mut dyn Neighborhood,
        filter: &'a mut dyn MoveFilter,
        selection: &'a mut dyn MoveSelection,
        stop: &'a dyn StopCriterion,
        seed: u64,
    ) -> Self {
        let dag = build_experiment_dag(experiment);
        let domains = experiment.domains();
        LocalSearch {
            experiment,
            initialization,
            neighborhood,
            filter,
            selection,
            stop,
            dag,
            domains,
            rng: SmallRng::seed_from_u64(seed),
            iteration: 0,
            best_value: isize::MAX,
            best_solution: vec![],
            stats: Statistics::default(),
        }
    }

    /// Runs the optimization until the stop criterion fires and returns the
    /// best solution that was observed.
    pub fn optimize(&mut self) -> Completion {
        let start = Instant::now();

        let assignment = self.initialization.initial_assignment(self.experiment);
        self.dag.init(assignment.clone());
        self.best_value = self.dag.current_objective();
        self.best_solution = assignment;

        while !self.stop.must_stop(self.iteration) {
            self.one_iteration();
        }

        self.stats.elapsed = start.elapsed();
        Completion {
            best_value: self.best_value,
            best_solution: self.best_solution.clone(),
        }
    }

    /// One full iteration: sample, filter, evaluate, select, commit.
    fn one_iteration(&mut self) {
        let view = SearchView { solution: self.dag.assignment(), domains: &self.domains };
        let proposed = self.neighborhood.moves(view, &mut self.rng);
        self.stats.proposed += proposed.len();

        let solution = self.dag.assignment().to_vec();
        let nb_proposed = proposed.len();
        debug_assert!(
            proposed.iter().all(|m| {
                m.decisions()
                    .iter()
                    .all(|d| self.domains[d.variable.id()].contains(&d.value))
            }),
            "a move must keep every variable within its domain"
        );
        let kept = self.filter.filter(&solution, proposed);
        self.stats.filtered_out += nb_proposed - kept.len();

        // each evaluation is speculative: the graph is left untouched, so
        // the candidates are priced independently of one another
        let evaluated: Vec<EvaluatedMove> =
            kept.iter().map(|mov| self.dag.evaluate(mov)).collect();
        self.stats.evaluated += evaluated.len();

        if let Some(chosen) = self.selection.select(&evaluated, &mut self.rng) {
            let mov = chosen.mov.clone();
            self.dag.commit(&mov);
            self.stats.committed += 1;

            let objective = self.dag.current_objective();
            if self.dag.is_feasible() && objective < self.best_value {
                self.best_value = objective;
                self.best_solution = self.dag.assignment().to_vec();
            }
        }

        self.iteration += 1;
        self.stats.iterations = self.iteration;
    }

    /// The best objective value observed so far
    pub fn best_value(&self) -> isize {
        self.best_value
    }
    /// The best assignment observed so far
    pub fn best_solution(&self) -> &[Value] {
        &self.best_solution
    }
    /// The committed assignment the search currently stands at
    pub fn current_solution(&self) -> &[Value] {
        self.dag.assignment()
    }
    /// The counters accumulated since the beginning of the run
    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod tests {
    use crate::*;

    /// A 3-item knapsack: profits [3, 4, 2], weights [2, 3, 4], capacity 5.
    /// The optimum takes items 0 and 1 (profit 7, weight 5).
    struct Knapsack;
    impl Experiment for Knapsack {
        fn nb_variables(&self) -> usize {
            3
        }
        fn value_kind(&self) -> ValueKind {
            ValueKind::Bool
        }
        fn domains(&self) -> Vec<Vec<Value>> {
            (0..3).map(|_| vec![Value::Bool(false), Value::Bool(true)]).collect()
        }
        fn build_dag(&self, dag: &mut DagBuilder) {
            let vars: Vec<Source> = (0..3).map(|i| Source::Variable(Variable(i))).collect();
            let profit = dag.scalar_product(vec![-3, -4, -2], vars.clone());
            dag.exclude_from_cp(profit);
            let weight = dag.scalar_product(vec![2, 3, 4], vars);
            let slack = dag.comparator(Source::Node(weight), 5);
            dag.hard_constraint(slack);
            dag.objective(vec![Source::Node(profit)]);
        }
        fn initial_solution(&self) -> Solution {
            vec![Value::Bool(false); 3]
        }
    }

    #[test]
    fn the_driver_reaches_the_optimum_of_a_tiny_knapsack() {
        let problem = Knapsack;
        let init = SimpleInit;
        let mut neighborhood = BinarySingleNeighborhood;
        let mut filter = CpFilter::new(init_cp_model(
            &build_experiment_dag(&problem),
            &problem.domains(),
        ));
        let mut selection = GreedySelection;
        let stop = IterationLimit(20);

        let mut solver = LocalSearch::new(
            &problem,
            &init,
            &mut neighborhood,
            &mut filter,
            &mut selection,
            &stop,
            0,
        );
        let completion = solver.optimize();

        assert_eq!(-7, completion.best_value);
        assert_eq!(
            vec![Value::Bool(true), Value::Bool(true), Value::Bool(false)],
            completion.best_solution
        );
    }

    #[test]
    fn the_filter_keeps_the_search_inside_the_feasible_region() {
        let problem = Knapsack;
        let init = SimpleInit;
        let mut neighborhood = BinaryRandomNeighborhood { nb_moves: 8, nb_flips: 1 };
        let mut filter = CpFilter::new(init_cp_model(
            &build_experiment_dag(&problem),
            &problem.domains(),
        ));
        let mut selection = SimulatedAnnealing::default();
        let stop = IterationLimit(50);

        let mut solver = LocalSearch::new(
            &problem,
            &init,
            &mut neighborhood,
            &mut filter,
            &mut selection,
            &stop,
            17,
        );
        let _ = solver.optimize();

        // whatever the annealing wandered through, the committed state is
        // within capacity at every observable point
        let weight: isize = solver
            .current_solution()
            .iter()
            .zip([2isize, 3, 4])
            .map(|(v, w)| v.as_int() * w)
            .sum();
        assert!(weight <= 5);
        assert_eq!(50, solver.statistics().iterations);
    }

    #[test]
    fn two_runs_with_the_same_seed_are_identical() {
        let run = |seed: u64| {
            let problem = Knapsack;
            let init = SimpleInit;
            let mut neighborhood = BinaryRandomNeighborhood { nb_moves: 4, nb_flips: 2 };
            let mut filter = NoFilter;
            let mut selection = Metropolis::new(2.0);
            let stop = IterationLimit(30);
            let mut solver = LocalSearch::new(
                &problem,
                &init,
                &mut neighborhood,
                &mut filter,
                &mut selection,
                &stop,
                seed,
            );
            let completion = solver.optimize();
            (completion.best_value, solver.current_solution().to_vec())
        };
        assert_eq!(run(5), run(5));
    }
}
