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

//! This module defines the traits used to encapsulate the customization
//! points of the local search: how the first assignment is produced, how the
//! candidate moves of one iteration are generated, which candidates survive
//! the feasibility filter, how the one move to commit is selected, and when
//! the search must stop.
//!
//! The stochastic heuristics all receive the random source as an explicit
//! parameter. The engine owns a single seeded generator and threads it
//! through every call, which makes any run reproducible from its seed.

use rand::rngs::SmallRng;

use crate::{EvaluatedMove, Experiment, Move, Solution, Value};

/// The portion of the search state which the neighborhood heuristics may
/// observe: the current assignment and the domain of each variable. This is
/// a read only view; neighborhoods propose moves, they never apply them.
#[derive(Debug, Clone, Copy)]
pub struct SearchView<'a> {
    /// The current assignment, indexed by variable id
    pub solution: &'a [Value],
    /// The domain of each variable, indexed by variable id
    pub domains: &'a [Vec<Value>],
}

/// This trait encapsulates the production of the assignment the search
/// starts from.
pub trait Initialization {
    /// Returns the assignment the search starts from. The returned vector
    /// must be dense and every value must belong to its variable's domain.
    fn initial_assignment(&self, experiment: &dyn Experiment) -> Solution;
}

/// This trait encapsulates a neighborhood: the strategy that proposes the
/// candidate moves of one iteration.
pub trait Neighborhood {
    /// Returns the list of candidate moves for the current iteration.
    /// Implementations are free to return an empty list (the iteration then
    /// commits nothing).
    fn moves(&mut self, view: SearchView<'_>, rng: &mut SmallRng) -> Vec<Move>;
}

/// This trait encapsulates the feasibility filter applied to the candidate
/// moves before they are evaluated. The canonical implementations are the
/// pass-through filter and the CP filter which only retains the moves whose
/// resulting assignment admits a feasible completion.
pub trait MoveFilter {
    /// Retains the candidates that are worth evaluating given the current
    /// assignment. The relative order of the retained moves is preserved.
    fn filter(&mut self, solution: &[Value], moves: Vec<Move>) -> Vec<Move>;
}

/// This trait encapsulates the selection of the one move to commit among the
/// evaluated candidates of an iteration.
pub trait MoveSelection {
    /// Returns the selected move, or `None` to express the distinguished
    /// "don't move" outcome (the iteration then commits nothing). Selection
    /// may be stateful: simulated annealing updates its temperature here.
    fn select<'a>(
        &mut self,
        candidates: &'a [EvaluatedMove],
        rng: &mut SmallRng,
    ) -> Option<&'a EvaluatedMove>;
}

/// This trait encapsulates the criterion deciding when the optimization must
/// stop. It is polled at iteration boundaries only: an iteration that has
/// started always runs to completion.
pub trait StopCriterion {
    /// Returns true iff the optimization must stop
    fn must_stop(&self, iteration: usize) -> bool;
}
