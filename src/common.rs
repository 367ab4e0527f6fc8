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

//! This module defines the most basic data types that are used throughout all
//! the code of our library (both at the abstraction and implementation levels).
//! These are also the types your client library is likely to work with.

use std::time::Duration;

// ----------------------------------------------------------------------------
// --- VARIABLE ---------------------------------------------------------------
// ----------------------------------------------------------------------------
/// This type denotes a decision variable from the optimization problem at
/// hand. Each variable is assumed to be identified with an integer ranging
/// from 0 until `experiment.nb_variables()`
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Variable(pub usize);
impl Variable {
    #[inline]
    /// This function retruns the id (numeric value) of the variable.
    ///
    /// # Examples:
    /// ```
    /// # use cbls::Variable;
    /// assert_eq!(0, Variable(0).id());
    /// assert_eq!(1, Variable(1).id());
    /// assert_eq!(2, Variable(2).id());
    /// assert_eq!(3, Variable(3).id());
    /// ```
    pub fn id(self) -> usize {
        self.0
    }
}

// ----------------------------------------------------------------------------
// --- VALUE ------------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The value a decision variable can assume. Values are either plain integers
/// or booleans. Problems whose decisions are drawn from a richer set (colors,
/// cities, machine states, ...) are expected to provide a dense integer
/// encoding of that set in their domains; the engine only ever relies on the
/// equality and ordering of the encoded payload.
///
/// Equality, ordering and hashing all go through the integer image, so that
/// `Bool(true)` and `Int(1)` denote one same value (the CP subsolver speaks
/// integers even about boolean variables).
#[derive(Copy, Clone, Debug)]
pub enum Value {
    /// An integer payload
    Int(isize),
    /// A boolean payload
    Bool(bool),
}
impl Value {
    /// Returns the integer image of this value (booleans map onto 0 and 1).
    /// All of the numeric machinery of the engine (domains, invariants,
    /// constraints) works on that image.
    #[inline]
    pub fn as_int(self) -> isize {
        match self {
            Value::Int(x) => x,
            Value::Bool(b) => b as isize,
        }
    }
    /// Returns true iff this value is the boolean true or a non zero integer
    #[inline]
    pub fn as_bool(self) -> bool {
        self.as_int() != 0
    }
}
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.as_int() == other.as_int()
    }
}
impl Eq for Value {}
impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_int().hash(state);
    }
}
impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_int().cmp(&other.as_int())
    }
}
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl From<isize> for Value {
    fn from(x: isize) -> Self {
        Value::Int(x)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// ----------------------------------------------------------------------------
// --- DECISION ---------------------------------------------------------------
// ----------------------------------------------------------------------------
/// This denotes a decision that might be taken during the search. It affects a
/// given `value` to the specified `variable`. Any given `Decision` should be
/// understood as ```[[ variable = value ]]````
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Decision {
    pub variable: Variable,
    pub value: Value,
}

// ----------------------------------------------------------------------------
// --- MOVE -------------------------------------------------------------------
// ----------------------------------------------------------------------------
/// A move is a set of decisions with pairwise distinct variables. It is pure
/// data: proposing a move mutates nothing; it only becomes effective when it
/// is committed to the evaluation graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Move(Vec<Decision>);

impl Move {
    /// Creates a move out of the given decisions.
    ///
    /// # Panics
    /// In debug builds, when two decisions bear on the same variable (this is
    /// a contract violation: such a move is meaningless).
    pub fn new(decisions: Vec<Decision>) -> Self {
        debug_assert!(
            {
                let mut vars = decisions.iter().map(|d| d.variable).collect::<Vec<_>>();
                vars.sort_unstable();
                vars.windows(2).all(|w| w[0] != w[1])
            },
            "a move must not assign the same variable twice"
        );
        Move(decisions)
    }
    /// The decisions comprised in this move
    pub fn decisions(&self) -> &[Decision] {
        &self.0
    }
    /// True iff the move changes nothing
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// The number of variables touched by the move
    pub fn len(&self) -> usize {
        self.0.len()
    }
}
impl From<Vec<Decision>> for Move {
    fn from(decisions: Vec<Decision>) -> Self {
        Move::new(decisions)
    }
}

// ----------------------------------------------------------------------------
// --- EVALUATED MOVE ---------------------------------------------------------
// ----------------------------------------------------------------------------
/// The outcome of the speculative evaluation of one move by the invariant
/// graph: the signed change of the objective should the move be committed,
/// and a flag telling whether the move breaks a hard constraint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluatedMove {
    /// The candidate move that was evaluated
    pub mov: Move,
    /// The signed objective change the move would cause
    pub delta: isize,
    /// True iff some hard feasibility aggregate would be violated
    pub infeasible: bool,
}

// ----------------------------------------------------------------------------
// --- SOLUTION ---------------------------------------------------------------
// ----------------------------------------------------------------------------
/// A complete assignment of the decision variables, indexed by variable id.
pub type Solution = Vec<Value>;

// ----------------------------------------------------------------------------
// --- RESULTS ----------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The status of a CP search when it returns to its caller.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SearchStatus {
    /// The whole search space was explored: the solution set is exact
    Complete,
    /// The time budget ran out: the solution set is an under approximation
    LimitStop,
    /// The root propagation already failed: there is no solution at all
    Infeasible,
}

/// The outcome of an optimization run.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The objective value of the best solution that was found
    pub best_value: isize,
    /// The best assignment that was found
    pub best_solution: Solution,
}

/// A handful of counters tracking what the local search did. These are
/// recorded at each iteration and returned along with the completion.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// The number of iterations that were performed
    pub iterations: usize,
    /// The total number of candidate moves proposed by the neighborhoods
    pub proposed: usize,
    /// The number of candidates discarded by the move filter
    pub filtered_out: usize,
    /// The number of moves speculatively evaluated by the graph
    pub evaluated: usize,
    /// The number of moves that were effectively committed
    pub committed: usize,
    /// The total wall clock time spent optimizing
    pub elapsed: Duration,
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_var {
    use crate::Variable;

    #[test]
    fn test_var_id() {
        assert_eq!(0, Variable(0).id());
        assert_eq!(1, Variable(1).id());
        assert_eq!(2, Variable(2).id());
        assert_eq!(3, Variable(3).id());
    }
}

#[cfg(test)]
mod test_value {
    use crate::Value;

    #[test]
    fn booleans_map_onto_zero_and_one() {
        assert_eq!(0, Value::Bool(false).as_int());
        assert_eq!(1, Value::Bool(true).as_int());
    }
    #[test]
    fn values_order_by_integer_image() {
        assert!(Value::Bool(false) < Value::Bool(true));
        assert!(Value::Bool(true) < Value::Int(2));
        assert!(Value::Int(-3) < Value::Bool(false));
    }
    #[test]
    fn booleans_and_their_integer_image_are_one_same_value() {
        assert_eq!(Value::Bool(true), Value::Int(1));
        assert_eq!(Value::Bool(false), Value::Int(0));
        assert_ne!(Value::Bool(true), Value::Int(2));
    }
}

#[cfg(test)]
mod test_move {
    use crate::{Decision, Move, Value, Variable};

    #[test]
    fn a_move_remembers_its_decisions() {
        let mv = Move::new(vec![
            Decision { variable: Variable(0), value: Value::Int(3) },
            Decision { variable: Variable(2), value: Value::Int(5) },
        ]);
        assert_eq!(2, mv.len());
        assert_eq!(Variable(2), mv.decisions()[1].variable);
    }

    #[test]
    #[should_panic(expected = "same variable twice")]
    fn duplicate_variables_are_rejected() {
        let _ = Move::new(vec![
            Decision { variable: Variable(1), value: Value::Int(3) },
            Decision { variable: Variable(1), value: Value::Int(5) },
        ]);
    }
}
