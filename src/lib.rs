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

//! # CBLS
//! CBLS is a hybrid constraint-based local search engine in Rust. Its goal
//! is to let you describe your combinatorial optimization problem (see
//! `Experiment`) as a graph of *invariants*: incremental aggregates that
//! decompose the objective and the constraints. When a move is proposed,
//! only the invariants downstream of the touched variables are re-evaluated,
//! which is what makes pricing thousands of candidate moves per iteration
//! affordable.
//!
//! ## Side benefit
//! As a side benefit from using `cbls`, your neighborhoods can be *filtered*
//! by a small constraint-programming subsolver derived automatically from
//! the very same invariant graph: candidate moves that cannot be extended
//! into any feasible assignment are discarded before the evaluation even
//! takes place, so the search only ever wanders through feasible territory.
//!
//! ## Quick Example
//! The following presents a minimalistic use of cbls. It implements a solver
//! for the knapsack problem. This example is shown for illustration purpose
//! because it is pretty simple and chances are high anybody is already
//! comfortable with the problem definition.
//!
//! #### Note:
//! The `demos` folder of our repository contains other examples in addition
//! to this one (graph coloring, TSP). So please consider checking them out
//! for further details.
//!
//! #### Describe the problem as an experiment
//! An experiment declares its decision variables and their domains, and
//! describes -- leaves first -- how the objective and the constraints are
//! computed. The engine minimizes, so the knapsack profit enters the
//! objective negated.
//! ```
//! use cbls::*;
//!
//! /// This structure represents a particular instance of the knapsack
//! /// problem: a maximum (weight) capacity, and a set of items to choose
//! /// from, each with a weight and a profit.
//! struct Knapsack {
//!     capacity: isize,
//!     profit: Vec<isize>,
//!     weight: Vec<isize>,
//! }
//!
//! impl Experiment for Knapsack {
//!     // one 0/1 variable per item: take it or leave it out
//!     fn nb_variables(&self) -> usize {
//!         self.profit.len()
//!     }
//!     fn value_kind(&self) -> ValueKind {
//!         ValueKind::Bool
//!     }
//!     fn domains(&self) -> Vec<Vec<Value>> {
//!         (0..self.nb_variables())
//!             .map(|_| vec![Value::Bool(false), Value::Bool(true)])
//!             .collect()
//!     }
//!     // profit (negated) feeds the objective; weight feeds a hard
//!     // capacity comparator
//!     fn build_dag(&self, dag: &mut DagBuilder) {
//!         let items: Vec<Source> = (0..self.nb_variables())
//!             .map(|i| Source::Variable(Variable(i)))
//!             .collect();
//!         let profit = dag.scalar_product(
//!             self.profit.iter().map(|p| -p).collect(),
//!             items.clone(),
//!         );
//!         dag.exclude_from_cp(profit);
//!         let weight = dag.scalar_product(self.weight.clone(), items);
//!         let slack = dag.comparator(Source::Node(weight), self.capacity);
//!         dag.hard_constraint(slack);
//!         dag.objective(vec![Source::Node(profit)]);
//!     }
//!     fn initial_solution(&self) -> Solution {
//!         vec![Value::Bool(false); self.nb_variables()]
//!     }
//! }
//!
//! // 1. Create an instance of our knapsack problem
//! let problem = Knapsack {
//!     capacity: 12,
//!     profit: vec![4, 5, 8, 3],
//!     weight: vec![8, 10, 15, 4],
//! };
//!
//! // 2. Pick the heuristics: how to start, which moves to propose, how to
//! //    select among them, and when to stop
//! let init = SimpleInit;
//! let mut neighborhood = ExhaustiveNeighborhood::new(4);
//! let mut selection = GreedySelection;
//! let stop = IterationLimit(30);
//!
//! // 3. Derive the CP companion model from the very same invariant graph,
//! //    and use it as a move filter
//! let dag = build_experiment_dag(&problem);
//! let mut filter = CpFilter::new(init_cp_model(&dag, &problem.domains()));
//!
//! // 4. Instantiate and run the solver (the seed makes the run reproducible)
//! let mut solver = LocalSearch::new(
//!     &problem,
//!     &init,
//!     &mut neighborhood,
//!     &mut filter,
//!     &mut selection,
//!     &stop,
//!     0,
//! );
//! let completion = solver.optimize();
//!
//! // 5. Do whatever you like with the best solution: here, taking items
//! //    1 and 4 fills the sack up to its capacity for a profit of 7
//! assert_eq!(-7, completion.best_value);
//! assert_eq!(
//!     vec![
//!         Value::Bool(true),
//!         Value::Bool(false),
//!         Value::Bool(false),
//!         Value::Bool(true),
//!     ],
//!     completion.best_solution
//! );
//! ```
//!
//! ## Going further / Getting a grasp on the codebase
//! The easiest way to get your way around with CBLS is probably to start
//! exploring the available APIs and then to move to the exploration of the
//! demos. (Or the other way around, that's really up to you !).
//! For the exploration of the APIs, you are encouraged to start with the
//! trait `cbls::Experiment` which defines the core abstraction you will
//! need to implement. After that, it is also interesting to have a look at
//! the various heuristics available (initializations, neighborhoods, move
//! selections, stop criteria) and at the CP side (`CpLsModel`,
//! `init_cp_model`) if you intend to filter your neighborhoods.

mod common;
mod abstraction;
mod implementation;

pub use common::*;
pub use abstraction::*;
pub use implementation::*;
