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

//! This module provides the invariant library: the computational payloads of
//! the graph nodes. Invariants are one tagged variant with three
//! operations: `init` computes the output from scratch (and sets up whatever
//! internal state makes the deltas cheap), `eval` computes the new output
//! from the current one and the changed inputs *without touching any state*
//! (this is what makes speculative move evaluation free to roll back), and
//! `commit` folds an accepted change into the internal state.
//!
//! The counter-based invariants (and/or, among, all-different) pay O(1) per
//! changed input instead of re-scanning all their parents; this is the heart
//! of the "time proportional to the affected nodes" promise.

use fxhash::FxHashMap;

use crate::ParentDelta;

/// The computational payload of one graph node.
#[derive(Debug, Clone)]
pub enum Invariant {
    /// The sum of the parents
    Sum,
    /// The weighted sum of the parents
    ScalarProduct { coeffs: Vec<isize> },
    /// The one-sided slack `max(0, parent - bound)`: zero when the bound is
    /// honoured, the amount of the excess otherwise. This is both the
    /// feasibility bit (value == 0) and the penalty of the comparison.
    Comparator { bound: isize },
    /// 1 iff every (boolean valued) parent is non zero
    And { arity: usize, nb_true: usize },
    /// 1 iff some (boolean valued) parent is non zero
    Or { arity: usize, nb_true: usize },
    /// The number of parents whose value lies in `set`
    Among { set: Vec<isize> },
    /// The number of duplicate pairs among the parents (0 iff all distinct,
    /// each extra occurrence of a value counts for one)
    AllDifferent { counts: FxHashMap<isize, usize> },
    /// The array cell designated by the (single) index parent
    Element { array: Vec<isize> },
    /// 1 iff the (single) parent differs from `forbidden`
    IsDifferent { forbidden: isize },
    /// A named sequence of invariants applied in order: the first stage
    /// aggregates the node's parents, each further stage transforms its
    /// predecessor's output. The graph sees the whole chain as one node.
    Composite { name: String, stages: Vec<Invariant>, stage_values: Vec<isize> },
    /// The objective sink: accumulates the sum of its parents (objective
    /// terms and penalties alike)
    Objective,
}

impl Invariant {
    /// Computes the output from the complete list of parent values, setting
    /// up the internal state of the counter-based variants. Called once per
    /// node at graph initialization (the full-message pass).
    pub fn init(&mut self, parent_values: &[isize]) -> isize {
        match self {
            Invariant::Sum | Invariant::Objective => parent_values.iter().sum(),
            Invariant::ScalarProduct { coeffs } => {
                debug_assert_eq!(coeffs.len(), parent_values.len());
                coeffs.iter().zip(parent_values).map(|(c, v)| c * v).sum()
            }
            Invariant::Comparator { bound } => (parent_values[0] - *bound).max(0),
            Invariant::And { arity, nb_true } => {
                *arity = parent_values.len();
                *nb_true = parent_values.iter().filter(|v| **v != 0).count();
                (*nb_true == *arity) as isize
            }
            Invariant::Or { arity, nb_true } => {
                *arity = parent_values.len();
                *nb_true = parent_values.iter().filter(|v| **v != 0).count();
                (*nb_true > 0) as isize
            }
            Invariant::Among { set } => {
                parent_values.iter().filter(|v| set.contains(v)).count() as isize
            }
            Invariant::AllDifferent { counts } => {
                counts.clear();
                for &v in parent_values {
                    *counts.entry(v).or_insert(0) += 1;
                }
                counts.values().map(|&occ| (occ - 1) as isize).sum()
            }
            Invariant::Element { array } => {
                let index = parent_values[0];
                assert!(
                    index >= 0 && (index as usize) < array.len(),
                    "element index out of bounds"
                );
                array[index as usize]
            }
            Invariant::IsDifferent { forbidden } => (parent_values[0] != *forbidden) as isize,
            Invariant::Composite { stages, stage_values, .. } => {
                stage_values.clear();
                let mut value = stages[0].init(parent_values);
                stage_values.push(value);
                for i in 1..stages.len() {
                    value = stages[i].init(&[value]);
                    stage_values.push(value);
                }
                value
            }
        }
    }

    /// Computes the output the node would have if the given inputs changed,
    /// starting from its currently committed output. This never mutates the
    /// invariant: evaluating a move and walking away leaves no trace.
    pub fn eval(&self, current: isize, changed: &[ParentDelta]) -> isize {
        match self {
            Invariant::Sum | Invariant::Objective => {
                current + changed.iter().map(|c| c.new - c.old).sum::<isize>()
            }
            Invariant::ScalarProduct { coeffs } => {
                current
                    + changed
                        .iter()
                        .map(|c| coeffs[c.index] * (c.new - c.old))
                        .sum::<isize>()
            }
            Invariant::Comparator { bound } => (changed[0].new - *bound).max(0),
            Invariant::And { arity, nb_true } => {
                let count = Self::true_count(*nb_true, changed);
                (count == *arity) as isize
            }
            Invariant::Or { nb_true, .. } => {
                let count = Self::true_count(*nb_true, changed);
                (count > 0) as isize
            }
            Invariant::Among { set } => {
                current
                    + changed
                        .iter()
                        .map(|c| set.contains(&c.new) as isize - set.contains(&c.old) as isize)
                        .sum::<isize>()
            }
            Invariant::AllDifferent { counts } => {
                // the overlay tracks the occurrence changes caused by the
                // inputs already replayed, without touching `counts`
                let mut value = current;
                let mut overlay: FxHashMap<isize, isize> = FxHashMap::default();
                for c in changed {
                    let occ = |v: isize, overlay: &FxHashMap<isize, isize>| {
                        counts.get(&v).map_or(0, |o| *o as isize)
                            + overlay.get(&v).copied().unwrap_or(0)
                    };
                    if occ(c.old, &overlay) >= 2 {
                        value -= 1;
                    }
                    *overlay.entry(c.old).or_insert(0) -= 1;
                    if occ(c.new, &overlay) >= 1 {
                        value += 1;
                    }
                    *overlay.entry(c.new).or_insert(0) += 1;
                }
                value
            }
            Invariant::Element { array } => {
                let index = changed[0].new;
                assert!(
                    index >= 0 && (index as usize) < array.len(),
                    "element index out of bounds"
                );
                array[index as usize]
            }
            Invariant::IsDifferent { forbidden } => (changed[0].new != *forbidden) as isize,
            Invariant::Composite { stages, stage_values, .. } => {
                let mut changed = changed.to_vec();
                let mut value = current;
                for (i, stage) in stages.iter().enumerate() {
                    let old = stage_values[i];
                    let new = stage.eval(old, &changed);
                    if new == old {
                        return current;
                    }
                    value = new;
                    changed = vec![ParentDelta { index: 0, old, new }];
                }
                value
            }
        }
    }

    /// Folds an accepted change into the internal state of the invariant.
    /// The graph re-plays the very same inputs it previously evaluated.
    pub fn commit(&mut self, changed: &[ParentDelta]) {
        match self {
            Invariant::And { nb_true, .. } | Invariant::Or { nb_true, .. } => {
                *nb_true = Self::true_count(*nb_true, changed);
            }
            Invariant::AllDifferent { counts } => {
                for c in changed {
                    let occ = counts.entry(c.old).or_insert(0);
                    *occ -= 1;
                    if *occ == 0 {
                        counts.remove(&c.old);
                    }
                    *counts.entry(c.new).or_insert(0) += 1;
                }
            }
            Invariant::Composite { stages, stage_values, .. } => {
                let mut changed = changed.to_vec();
                for (i, stage) in stages.iter_mut().enumerate() {
                    let old = stage_values[i];
                    let new = stage.eval(old, &changed);
                    if new == old {
                        return;
                    }
                    stage.commit(&changed);
                    stage_values[i] = new;
                    changed = vec![ParentDelta { index: 0, old, new }];
                }
            }
            // the other variants carry no state beside the node's cache
            _ => {}
        }
    }

    fn true_count(nb_true: usize, changed: &[ParentDelta]) -> usize {
        let delta: isize = changed
            .iter()
            .map(|c| (c.new != 0) as isize - (c.old != 0) as isize)
            .sum();
        (nb_true as isize + delta) as usize
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
