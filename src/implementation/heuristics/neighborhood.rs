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

//! This module provides the neighborhood samplers: the strategies proposing
//! the candidate moves of each iteration. The stochastic ones draw from the
//! random source that is threaded through the call; none of them ever
//! proposes an empty (identity) move.

use rand::rngs::SmallRng;
use rand::seq::index::sample;

use crate::{Decision, Move, Neighborhood, SearchView, Value, Variable};

/// A problem-supplied strategy picking which variables an exhaustive
/// neighborhood explores (e.g. a graph-based sampler preferring the
/// neighbors of a conflicting node)
pub type VariableSampler = Box<dyn Fn(SearchView<'_>, &mut SmallRng) -> Vec<Variable>>;

/// Draws `k` distinct variables uniformly at random
fn distinct_variables(view: SearchView<'_>, k: usize, rng: &mut SmallRng) -> Vec<Variable> {
    let n = view.solution.len();
    sample(rng, n, k.min(n)).iter().map(Variable).collect()
}

// ----------------------------------------------------------------------------
// --- BINARY NEIGHBORHOODS ---------------------------------------------------
// ----------------------------------------------------------------------------
/// Proposes `nb_moves` random moves, each flipping `nb_flips` distinct
/// binary variables.
#[derive(Debug, Clone, Copy)]
pub struct BinaryRandomNeighborhood {
    pub nb_moves: usize,
    pub nb_flips: usize,
}
impl Neighborhood for BinaryRandomNeighborhood {
    fn moves(&mut self, view: SearchView<'_>, rng: &mut SmallRng) -> Vec<Move> {
        (0..self.nb_moves)
            .map(|_| {
                let decisions = distinct_variables(view, self.nb_flips, rng)
                    .into_iter()
                    .map(|variable| Decision {
                        variable,
                        value: Value::Bool(!view.solution[variable.id()].as_bool()),
                    })
                    .collect();
                Move::new(decisions)
            })
            .collect()
    }
}

/// Proposes every single-bit-flip move (one per variable, deterministic).
#[derive(Debug, Default, Clone, Copy)]
pub struct BinarySingleNeighborhood;
impl Neighborhood for BinarySingleNeighborhood {
    fn moves(&mut self, view: SearchView<'_>, _rng: &mut SmallRng) -> Vec<Move> {
        view.solution
            .iter()
            .enumerate()
            .map(|(i, v)| {
                Move::new(vec![Decision {
                    variable: Variable(i),
                    value: Value::Bool(!v.as_bool()),
                }])
            })
            .collect()
    }
}

// ----------------------------------------------------------------------------
// --- GENERIC NEIGHBORHOODS --------------------------------------------------
// ----------------------------------------------------------------------------
/// Proposes `nb_moves` random moves, each re-assigning `nb_vars` distinct
/// variables to values drawn from their domains.
#[derive(Debug, Clone, Copy)]
pub struct RandomNeighborhood {
    pub nb_moves: usize,
    pub nb_vars: usize,
}
impl Neighborhood for RandomNeighborhood {
    fn moves(&mut self, view: SearchView<'_>, rng: &mut SmallRng) -> Vec<Move> {
        use rand::Rng;
        (0..self.nb_moves)
            .filter_map(|_| {
                let decisions: Vec<Decision> = distinct_variables(view, self.nb_vars, rng)
                    .into_iter()
                    .filter_map(|variable| {
                        let domain = &view.domains[variable.id()];
                        let value = domain[rng.gen_range(0..domain.len())];
                        if value == view.solution[variable.id()] {
                            None
                        } else {
                            Some(Decision { variable, value })
                        }
                    })
                    .collect();
                if decisions.is_empty() {
                    None
                } else {
                    Some(Move::new(decisions))
                }
            })
            .collect()
    }
}

/// Proposes every pairwise value swap (for permutation-like problems, this
/// preserves the multiset of assigned values).
#[derive(Debug, Default, Clone, Copy)]
pub struct SwapNeighborhood;
impl Neighborhood for SwapNeighborhood {
    fn moves(&mut self, view: SearchView<'_>, _rng: &mut SmallRng) -> Vec<Move> {
        let n = view.solution.len();
        let mut moves = vec![];
        for i in 0..n {
            for j in i + 1..n {
                if view.solution[i] == view.solution[j] {
                    continue;
                }
                moves.push(Move::new(vec![
                    Decision { variable: Variable(i), value: view.solution[j] },
                    Decision { variable: Variable(j), value: view.solution[i] },
                ]));
            }
        }
        moves
    }
}

/// Proposes `nb_moves` k-opt moves: each one picks `k` distinct positions
/// and rotates their values one step (which keeps permutations
/// permutations).
#[derive(Debug, Clone, Copy)]
pub struct KOptNeighborhood {
    pub nb_moves: usize,
    pub k: usize,
}
impl Neighborhood for KOptNeighborhood {
    fn moves(&mut self, view: SearchView<'_>, rng: &mut SmallRng) -> Vec<Move> {
        (0..self.nb_moves)
            .filter_map(|_| {
                let positions = distinct_variables(view, self.k, rng);
                let k = positions.len();
                let decisions: Vec<Decision> = (0..k)
                    .filter_map(|i| {
                        let variable = positions[i];
                        let value = view.solution[positions[(i + 1) % k].id()];
                        if value == view.solution[variable.id()] {
                            None
                        } else {
                            Some(Decision { variable, value })
                        }
                    })
                    .collect();
                if decisions.is_empty() {
                    None
                } else {
                    Some(Move::new(decisions))
                }
            })
            .collect()
    }
}

/// Proposes the full Cartesian product of the domains of `k` variables
/// (minus the identity): the variables are drawn at random, unless the
/// problem supplies its own sampler.
pub struct ExhaustiveNeighborhood {
    pub k: usize,
    pub sampler: Option<VariableSampler>,
}
impl ExhaustiveNeighborhood {
    pub fn new(k: usize) -> Self {
        ExhaustiveNeighborhood { k, sampler: None }
    }
    pub fn with_sampler(k: usize, sampler: VariableSampler) -> Self {
        ExhaustiveNeighborhood { k, sampler: Some(sampler) }
    }
}
impl Neighborhood for ExhaustiveNeighborhood {
    fn moves(&mut self, view: SearchView<'_>, rng: &mut SmallRng) -> Vec<Move> {
        let vars = match &self.sampler {
            Some(sampler) => sampler(view, rng),
            None => distinct_variables(view, self.k, rng),
        };
        let mut combos: Vec<Vec<Value>> = vec![vec![]];
        for &v in &vars {
            let mut grown = Vec::with_capacity(combos.len() * view.domains[v.id()].len());
            for combo in &combos {
                for &value in &view.domains[v.id()] {
                    let mut next = combo.clone();
                    next.push(value);
                    grown.push(next);
                }
            }
            combos = grown;
        }
        combos
            .into_iter()
            .filter_map(|values| {
                let decisions: Vec<Decision> = vars
                    .iter()
                    .zip(values)
                    .filter(|(v, value)| view.solution[v.id()] != *value)
                    .map(|(&variable, value)| Decision { variable, value })
                    .collect();
                if decisions.is_empty() {
                    None
                } else {
                    Some(Move::new(decisions))
                }
            })
            .collect()
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
