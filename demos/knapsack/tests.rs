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

//! This module is meant to test the correctness of our knapsack example

use cbls::*;

use crate::Knapsack;

/// The four-item instance used throughout these tests: capacity 12,
/// weights [8, 10, 15, 4], profits [4, 5, 8, 3]. The optimum takes items
/// 1 and 4 (1-based) for a profit of 7 and a weight of exactly 12.
fn instance() -> Knapsack {
    Knapsack {
        capacity: 12,
        profit: vec![4, 5, 8, 3],
        weight: vec![8, 10, 15, 4],
    }
}

fn solve(problem: &Knapsack, init: &dyn Initialization, seed: u64) -> Completion {
    let mut neighborhood = ExhaustiveNeighborhood::new(problem.nb_variables());
    let mut selection = GreedySelection;
    let stop = IterationLimit(50);
    let dag = build_experiment_dag(problem);
    let mut filter = CpFilter::new(init_cp_model(&dag, &problem.domains()));

    let mut solver = LocalSearch::new(
        problem,
        init,
        &mut neighborhood,
        &mut filter,
        &mut selection,
        &stop,
        seed,
    );
    solver.optimize()
}

#[test]
fn the_exhaustive_greedy_cp_run_reaches_the_optimum_from_the_empty_sack() {
    let problem = instance();
    let completion = solve(&problem, &SimpleInit, 0);
    assert_eq!(-7, completion.best_value);
    assert_eq!(
        vec![
            Value::Bool(true),
            Value::Bool(false),
            Value::Bool(false),
            Value::Bool(true)
        ],
        completion.best_solution
    );
}

#[test]
fn the_optimum_is_reached_from_the_greedy_start_as_well() {
    let problem = instance();
    let completion = solve(&problem, &GreedyInit, 0);
    assert_eq!(-7, completion.best_value);
}

#[test]
fn the_optimum_is_reached_whatever_the_seed() {
    let problem = instance();
    for seed in 0..10 {
        assert_eq!(-7, solve(&problem, &SimpleInit, seed).best_value);
    }
}

#[test]
fn the_greedy_assignment_packs_by_density_within_capacity() {
    let problem = instance();
    let greedy = problem.greedy_solution().unwrap();
    let weight: isize = greedy
        .iter()
        .zip(&problem.weight)
        .map(|(v, w)| v.as_int() * w)
        .sum();
    assert!(weight <= problem.capacity);
    // density ordering: item 4 (3/4) first, then item 1 (4/8) fits too
    assert_eq!(
        vec![
            Value::Bool(true),
            Value::Bool(false),
            Value::Bool(false),
            Value::Bool(true)
        ],
        greedy
    );
}

#[test]
fn without_the_filter_the_violations_price_the_objective_instead() {
    // the same run with no CP filter may visit overweight assignments, but
    // they are flagged infeasible by the graph and never recorded as best
    let problem = instance();
    let mut neighborhood = ExhaustiveNeighborhood::new(problem.nb_variables());
    let mut selection = Metropolis::new(2.0);
    let stop = IterationLimit(100);
    let mut filter = NoFilter;

    let mut solver = LocalSearch::new(
        &problem,
        &SimpleInit,
        &mut neighborhood,
        &mut filter,
        &mut selection,
        &stop,
        3,
    );
    let completion = solver.optimize();

    let weight: isize = completion
        .best_solution
        .iter()
        .zip(&problem.weight)
        .map(|(v, w)| v.as_int() * w)
        .sum();
    assert!(weight <= problem.capacity);
}
