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

//! This module is meant to test the correctness of our graph coloring
//! example

use cbls::*;

use crate::{adjacent_sampler, Coloring};

/// The gc_4_1 instance: a 4-node star around node 2 (1-based), i.e. the
/// edges (1,2), (2,3), (2,4).
fn gc_4_1(max_color: isize) -> Coloring {
    Coloring {
        nb_nodes: 4,
        edges: vec![(0, 1), (1, 2), (1, 3)],
        max_color,
    }
}

#[test]
fn the_greedy_coloring_orders_by_descending_degree_with_index_ties() {
    // node 2 has degree 3 and is colored first (color 1); every other node
    // touches it and ends up with color 2
    let problem = gc_4_1(2);
    let greedy = problem.greedy_solution().unwrap();
    assert_eq!(
        vec![Value::Int(2), Value::Int(1), Value::Int(2), Value::Int(2)],
        greedy
    );
}

#[test]
fn the_greedy_coloring_of_the_star_has_no_conflict() {
    let problem = gc_4_1(2);
    let mut dag = build_experiment_dag(&problem);
    dag.init(problem.greedy_solution().unwrap());
    assert!(dag.is_feasible());
}

#[test]
fn the_search_moves_the_star_off_the_last_color() {
    // with 3 colors, the greedy start uses colors 1 and 2 only, so nobody
    // wears color 3 and the objective is already 0; from the all-1 start
    // instead, the search must resolve the conflicts without color 3
    let problem = gc_4_1(3);
    let init = SimpleInit;
    let mut neighborhood =
        ExhaustiveNeighborhood::with_sampler(3, adjacent_sampler(&problem, 3));
    let mut selection = GreedySelection;
    let stop = IterationLimit(100);
    let dag = build_experiment_dag(&problem);
    let mut filter = CpFilter::new(init_cp_model(&dag, &problem.domains()));

    let mut solver = LocalSearch::new(
        &problem,
        &init,
        &mut neighborhood,
        &mut filter,
        &mut selection,
        &stop,
        1,
    );
    let completion = solver.optimize();

    // a conflict-free coloring avoiding color 3 exists and costs 0
    let colors: Vec<isize> = completion.best_solution.iter().map(|v| v.as_int()).collect();
    for &(u, v) in &problem.edges {
        assert_ne!(colors[u], colors[v]);
    }
    assert_eq!(0, completion.best_value);
}

#[test]
fn an_unsatisfiable_color_count_keeps_every_move_filtered_out() {
    // a triangle cannot be 2-colored: the CP filter proves every candidate
    // infeasible and the search never leaves its starting point
    let problem = Coloring {
        nb_nodes: 3,
        edges: vec![(0, 1), (1, 2), (0, 2)],
        max_color: 2,
    };
    let init = SimpleInit;
    let mut neighborhood = ExhaustiveNeighborhood::new(3);
    let mut selection = GreedySelection;
    let stop = IterationLimit(10);
    let dag = build_experiment_dag(&problem);
    let mut filter = CpFilter::new(init_cp_model(&dag, &problem.domains()));

    let mut solver = LocalSearch::new(
        &problem,
        &init,
        &mut neighborhood,
        &mut filter,
        &mut selection,
        &stop,
        0,
    );
    let _ = solver.optimize();

    assert_eq!(0, solver.statistics().committed);
    assert_eq!(
        solver.statistics().proposed,
        solver.statistics().filtered_out
    );
}
