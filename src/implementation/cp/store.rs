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

//! This module provides the store of the CP variables: one arena holding the
//! trailer, the domain of every variable and its notification list (the
//! constraints to wake up when that domain shrinks). The variable/constraint
//! mesh being a bipartite graph with back edges, both sides are kept as
//! arenas and all the edges are plain indices.
//!
//! Every mutating operation of the store goes through a `WorkSet`: whenever
//! a domain effectively shrinks, the watchers of that variable are collected
//! into the pending set, which the fix-point loop then drains.

use std::collections::VecDeque;

use fxhash::FxHashSet;

use crate::{BoolDomain, Domain, SparseDomain, Trailer};

// ----------------------------------------------------------------------------
// --- IDS --------------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The identifier of a CP variable within its store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CpVarId(pub usize);

/// The identifier of a constraint within its model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub usize);

// ----------------------------------------------------------------------------
// --- WORK SET ---------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The set of constraints awaiting propagation. Any draining order reaches
/// the same fix point; a FIFO is used for cache friendliness. Membership is
/// tracked so that a constraint is never enqueued twice.
#[derive(Debug, Default)]
pub struct WorkSet {
    queue: VecDeque<ConstraintId>,
    enqueued: FxHashSet<ConstraintId>,
}

impl WorkSet {
    /// Adds the constraint to the set (no-op if already pending)
    pub fn push(&mut self, constraint: ConstraintId) {
        if self.enqueued.insert(constraint) {
            self.queue.push_back(constraint);
        }
    }
    /// Pops one pending constraint
    pub fn pop(&mut self) -> Option<ConstraintId> {
        let constraint = self.queue.pop_front();
        if let Some(c) = constraint {
            self.enqueued.remove(&c);
        }
        constraint
    }
    /// Forgets every pending constraint
    pub fn clear(&mut self) {
        self.queue.clear();
        self.enqueued.clear();
    }
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

// ----------------------------------------------------------------------------
// --- STORE ------------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The domain and the notification list of one CP variable
#[derive(Debug)]
struct VarData {
    domain: Domain,
    watchers: Vec<ConstraintId>,
}

/// The store of all CP variables: trailer + variable arena. Constraints are
/// kept by the model (see `CpLsModel`); the store only knows them by id.
#[derive(Debug, Default)]
pub struct CpStore {
    /// The one reversible-state stack backing every trailed datum
    pub trail: Trailer,
    vars: Vec<VarData>,
}

impl CpStore {
    /// Creates an integer variable over the given (distinct) values
    pub fn new_int_var(&mut self, values: &[isize]) -> CpVarId {
        let domain = Domain::Sparse(SparseDomain::new(&mut self.trail, values));
        self.vars.push(VarData { domain, watchers: vec![] });
        CpVarId(self.vars.len() - 1)
    }

    /// Creates a boolean variable (domain {0, 1})
    pub fn new_bool_var(&mut self) -> CpVarId {
        let domain = Domain::Bool(BoolDomain::new(&mut self.trail));
        self.vars.push(VarData { domain, watchers: vec![] });
        CpVarId(self.vars.len() - 1)
    }

    /// The number of variables in the store
    pub fn nb_vars(&self) -> usize {
        self.vars.len()
    }

    /// Registers `constraint` on the notification list of `x`
    pub fn watch(&mut self, x: CpVarId, constraint: ConstraintId) {
        self.vars[x.0].watchers.push(constraint);
    }
    /// The notification list of `x`
    pub fn watchers(&self, x: CpVarId) -> &[ConstraintId] {
        &self.vars[x.0].watchers
    }
    /// Replaces the notification list of `x` (used by the move filter to
    /// trim and later restore the active constraint lists)
    pub fn set_watchers(&mut self, x: CpVarId, watchers: Vec<ConstraintId>) {
        self.vars[x.0].watchers = watchers;
    }

    // --- queries ------------------------------------------------------------
    pub fn size(&self, x: CpVarId) -> usize {
        self.vars[x.0].domain.size(&self.trail)
    }
    pub fn is_bound(&self, x: CpVarId) -> bool {
        self.vars[x.0].domain.is_bound(&self.trail)
    }
    pub fn min(&self, x: CpVarId) -> isize {
        self.vars[x.0].domain.min(&self.trail)
    }
    pub fn max(&self, x: CpVarId) -> isize {
        self.vars[x.0].domain.max(&self.trail)
    }
    pub fn contains(&self, x: CpVarId, v: isize) -> bool {
        self.vars[x.0].domain.contains(&self.trail, v)
    }
    /// The single value of a bound variable
    ///
    /// # Panics
    /// When the variable is not bound (a programming violation)
    pub fn value(&self, x: CpVarId) -> isize {
        assert!(self.is_bound(x), "value() requires a bound variable");
        self.min(x)
    }
    /// The live values of `x`, collected
    pub fn values(&self, x: CpVarId) -> Vec<isize> {
        self.vars[x.0].domain.values(&self.trail)
    }

    // --- mutations ----------------------------------------------------------
    /// Removes `v` from the domain of `x`, waking the watchers if anything
    /// changed. Returns false iff the domain was wiped out.
    pub fn remove(&mut self, x: CpVarId, v: isize, pending: &mut WorkSet) -> bool {
        let data = &mut self.vars[x.0];
        if data.domain.remove(&mut self.trail, v) {
            self.notify(x, pending);
            self.size(x) > 0
        } else {
            true
        }
    }

    /// Binds `x` to `v`, waking the watchers if the domain shrank. Returns
    /// false iff `v` was not available (the infeasibility signal).
    pub fn assign(&mut self, x: CpVarId, v: isize, pending: &mut WorkSet) -> bool {
        let shrinks = self.size(x) > 1;
        let data = &mut self.vars[x.0];
        if data.domain.assign(&mut self.trail, v) {
            if shrinks {
                self.notify(x, pending);
            }
            true
        } else {
            false
        }
    }

    /// Removes every value strictly below `bound`. Returns false on wipe out.
    pub fn remove_below(&mut self, x: CpVarId, bound: isize, pending: &mut WorkSet) -> bool {
        for v in self.values(x) {
            if v < bound && !self.remove(x, v, pending) {
                return false;
            }
        }
        true
    }

    /// Removes every value strictly above `bound`. Returns false on wipe out.
    pub fn remove_above(&mut self, x: CpVarId, bound: isize, pending: &mut WorkSet) -> bool {
        for v in self.values(x) {
            if v > bound && !self.remove(x, v, pending) {
                return false;
            }
        }
        true
    }

    fn notify(&self, x: CpVarId, pending: &mut WorkSet) {
        for w in self.watchers(x) {
            pending.push(*w);
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod tests {
    use crate::{ConstraintId, CpStore, WorkSet};

    #[test]
    fn shrinking_a_domain_wakes_the_watchers_once() {
        let mut store = CpStore::default();
        let x = store.new_int_var(&[1, 2, 3]);
        store.watch(x, ConstraintId(7));
        store.watch(x, ConstraintId(9));

        let mut pending = WorkSet::default();
        assert!(store.remove(x, 2, &mut pending));
        assert!(store.remove(x, 3, &mut pending));

        assert_eq!(Some(ConstraintId(7)), pending.pop());
        assert_eq!(Some(ConstraintId(9)), pending.pop());
        assert_eq!(None, pending.pop());
    }

    #[test]
    fn removing_an_absent_value_wakes_nobody() {
        let mut store = CpStore::default();
        let x = store.new_int_var(&[1, 2]);
        store.watch(x, ConstraintId(0));

        let mut pending = WorkSet::default();
        assert!(store.remove(x, 5, &mut pending));
        assert!(pending.is_empty());
    }

    #[test]
    fn wiping_a_domain_out_reports_infeasibility() {
        let mut store = CpStore::default();
        let x = store.new_int_var(&[4]);
        let mut pending = WorkSet::default();
        assert!(!store.remove(x, 4, &mut pending));
    }

    #[test]
    fn bounds_cuts_work_on_both_sides() {
        let mut store = CpStore::default();
        let x = store.new_int_var(&[1, 2, 3, 4, 5]);
        let mut pending = WorkSet::default();

        assert!(store.remove_below(x, 2, &mut pending));
        assert!(store.remove_above(x, 4, &mut pending));
        assert_eq!(2, store.min(x));
        assert_eq!(4, store.max(x));
        assert_eq!(3, store.size(x));
    }

    #[test]
    fn backtracking_restores_domains_and_bounds() {
        let mut store = CpStore::default();
        let x = store.new_int_var(&[1, 2, 3]);
        let b = store.new_bool_var();
        let mut pending = WorkSet::default();

        store.trail.save();
        assert!(store.assign(x, 2, &mut pending));
        assert!(store.assign(b, 1, &mut pending));
        assert!(store.is_bound(x));
        assert!(store.is_bound(b));
        store.trail.restore();

        assert_eq!(3, store.size(x));
        assert_eq!(2, store.size(b));
    }
}
