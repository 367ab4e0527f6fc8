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

//! This module defines the "contract" between the engine and the problem
//! being solved: the `Experiment` trait. This is the only abstraction a
//! client *must* implement in order to use the library.

use crate::{DagBuilder, Solution, Value};

/// The kind of payload carried by the decision variables of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Variables range over (an encoded set of) integers
    Int,
    /// Variables are 0/1 flags
    Bool,
}

/// This trait defines the contract of what defines an optimization problem
/// solvable with this engine. An implementation of this trait declares the
/// decision variables and their domains, and describes -- as an invariant
/// graph -- how the objective and the constraints are computed from an
/// assignment of these variables.
///
/// The invariant graph is built leaves first: the experiment receives a
/// `DagBuilder` and declares aggregates bottom up until it reaches the one
/// objective sink. The same graph is later translated (one pass) into the
/// companion CP model that filters the neighborhoods during search.
pub trait Experiment {
    /// Any problem bears on a number of variables $x_0, x_1, ... , x_{n-1}$.
    /// This method returns the value of the number $n$
    fn nb_variables(&self) -> usize;

    /// The kind of the decision variables (all variables share one kind)
    fn value_kind(&self) -> ValueKind;

    /// This method returns, for each variable, the ordered list of the values
    /// it may assume. The engine never proposes a value outside of these
    /// lists, and the CP domains are seeded from them.
    fn domains(&self) -> Vec<Vec<Value>>;

    /// This method describes the decomposition of the objective and of the
    /// constraints as an invariant graph. It is called exactly once, before
    /// the search starts.
    fn build_dag(&self, dag: &mut DagBuilder);

    /// This method returns the problem-provided default assignment which is
    /// used by the simple initialization heuristic. The returned vector must
    /// be dense (one value per variable) and every value must belong to the
    /// corresponding domain.
    fn initial_solution(&self) -> Solution;

    /// An optional deterministic initialization heuristic (used by the greedy
    /// initialization). Experiments with no such heuristic inherit the
    /// default: no greedy assignment, in which case the greedy initialization
    /// falls back onto `initial_solution`.
    fn greedy_solution(&self) -> Option<Solution> {
        None
    }

    /// Whether the CP subsolver should be used to filter the neighborhoods
    /// of this experiment. Defaults to true; an experiment whose constraints
    /// are all soft may opt out and spare the translation.
    fn use_cp(&self) -> bool {
        true
    }
}
