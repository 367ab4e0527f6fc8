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

//! This module is meant to test the correctness of our TSP example

use cbls::*;

use crate::Tsp;

/// A small asymmetric 4-city instance whose optimum tour 0-2-1-3 costs 70
fn instance() -> Tsp {
    Tsp {
        distance: vec![
            vec![0, 40, 10, 25],
            vec![40, 0, 30, 15],
            vec![10, 20, 0, 50],
            vec![25, 15, 45, 0],
        ],
    }
}

#[test]
fn the_dag_prices_a_tour_like_a_plain_recomputation() {
    let problem = instance();
    let mut dag = build_experiment_dag(&problem);
    let tour: Solution = vec![Value::Int(0), Value::Int(1), Value::Int(2), Value::Int(3)];
    dag.init(tour.clone());
    assert_eq!(problem.tour_cost(&tour), dag.current_objective());
    assert!(dag.is_feasible());
}

#[test]
fn duplicate_cities_break_feasibility() {
    let problem = instance();
    let mut dag = build_experiment_dag(&problem);
    dag.init(vec![Value::Int(0), Value::Int(1), Value::Int(1), Value::Int(3)]);
    assert!(!dag.is_feasible());
}

#[test]
fn swap_descent_finds_the_optimal_tour_of_a_tiny_instance() {
    let problem = instance();
    let init = GreedyInit;
    let mut neighborhood = SwapNeighborhood;
    let mut selection = GreedySelection;
    let stop = IterationLimit(50);
    let mut filter = NoFilter;

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

    assert_eq!(70, completion.best_value);
    assert_eq!(completion.best_value, problem.tour_cost(&completion.best_solution));
}

#[test]
fn kopt_anneal_stays_a_permutation_end_to_end() {
    let problem = instance();
    let init = SimpleInit;
    let mut neighborhood = KOptNeighborhood { nb_moves: 10, k: 3 };
    let mut selection = SimulatedAnnealing::new(30.0, 0.95, 0.0);
    let stop = IterationLimit(200);
    let mut filter = NoFilter;

    let mut solver = LocalSearch::new(
        &problem,
        &init,
        &mut neighborhood,
        &mut filter,
        &mut selection,
        &stop,
        11,
    );
    let completion = solver.optimize();

    let mut cities: Vec<isize> =
        completion.best_solution.iter().map(|v| v.as_int()).collect();
    cities.sort_unstable();
    assert_eq!(vec![0, 1, 2, 3], cities);
    assert_eq!(completion.best_value, problem.tour_cost(&completion.best_solution));
}

#[test]
fn the_nearest_neighbor_tour_starts_at_city_zero() {
    let problem = instance();
    let greedy = problem.greedy_solution().unwrap();
    assert_eq!(Value::Int(0), greedy[0]);
    // nearest to 0 is 2 (10), nearest to 2 is 1 (20), then 3
    assert_eq!(
        vec![Value::Int(0), Value::Int(2), Value::Int(1), Value::Int(3)],
        greedy
    );
}
