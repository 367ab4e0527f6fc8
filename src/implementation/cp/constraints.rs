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

//! This module provides the constraint library of the CP subsolver and the
//! work-set fix-point loop that drives it.
//!
//! Constraints are one tagged variant with a single entry point,
//! `propagate`: re-examine the attached variables, tighten their domains,
//! and report feasibility. A constraint whose semantic is already ensured by
//! the current domains turns its trailed `active` flag off; the fix-point
//! loop skips deactivated constraints until a backtrack reactivates them.
//!
//! Each domain shrink wakes the watchers of the touched variable, so the
//! pending work-set grows as propagation uncovers new consequences.
//! Termination is guaranteed because every effective propagation strictly
//! shrinks a domain or deactivates a constraint.

use crate::{ConstraintId, CpStore, CpVarId, TrailedInt, Trailer, WorkSet};

/// Division rounding towards negative infinity
fn div_floor(a: isize, b: isize) -> isize {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q }
}
/// Division rounding towards positive infinity
fn div_ceil(a: isize, b: isize) -> isize {
    let q = a / b;
    if a % b != 0 && ((a < 0) == (b < 0)) { q + 1 } else { q }
}

// ----------------------------------------------------------------------------
// --- CONSTRAINT -------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The semantic payload of a constraint.
#[derive(Debug, Clone)]
pub enum ConstraintSpec {
    /// x == y
    Equal { x: CpVarId, y: CpVarId },
    /// x != y
    NotEqual { x: CpVarId, y: CpVarId },
    /// b <=> (x != forbidden)
    IsDifferent { x: CpVarId, forbidden: isize, b: CpVarId },
    /// b <=> (x1 \/ ... \/ xn) over boolean variables
    Or { xs: Vec<CpVarId>, b: CpVarId },
    /// b <=> (x1 /\ ... /\ xn) over boolean variables
    And { xs: Vec<CpVarId>, b: CpVarId },
    /// y == sum(xs)
    Sum { xs: Vec<CpVarId>, y: CpVarId },
    /// y == sum(coeffs[i] * xs[i])
    ScalarProduct { coeffs: Vec<isize>, xs: Vec<CpVarId>, y: CpVarId },
    /// x <= bound (the hard comparator)
    LessOrEqual { x: CpVarId, bound: isize },
    /// out == array[index]
    Element { array: Vec<isize>, index: CpVarId, out: CpVarId },
    /// at most k of the xs take a value in `set`. This is also the
    /// propagator of the canonical `AtMost(xs, set, k)` counting
    /// constraint, posted through `CpLsModel::post_at_most`.
    AmongUp { xs: Vec<CpVarId>, set: Vec<isize>, k: usize },
    /// at least k of the xs take a value in `set`
    AmongDown { xs: Vec<CpVarId>, set: Vec<isize>, k: usize },
    /// the xs are pairwise distinct
    AllDifferent { xs: Vec<CpVarId> },
}

/// One constraint of the model: its semantic payload plus the trailed
/// entailment flag.
#[derive(Debug)]
pub struct Constraint {
    /// 1 while the constraint may still prune something, 0 once entailed.
    /// Trailed, so backtracking past the entailment point reactivates it.
    active: TrailedInt,
    spec: ConstraintSpec,
}

impl Constraint {
    /// Wraps the given payload, allocating its entailment flag
    pub fn new(trail: &mut Trailer, spec: ConstraintSpec) -> Self {
        Constraint { active: trail.trailed_int(1), spec }
    }

    pub fn spec(&self) -> &ConstraintSpec {
        &self.spec
    }

    /// The exact set of variables whose domain changes must wake this
    /// constraint up
    pub fn watched(&self) -> Vec<CpVarId> {
        use ConstraintSpec::*;
        match &self.spec {
            Equal { x, y } | NotEqual { x, y } => vec![*x, *y],
            IsDifferent { x, b, .. } => vec![*x, *b],
            Or { xs, b } | And { xs, b } => {
                let mut watched = xs.clone();
                watched.push(*b);
                watched
            }
            Sum { xs, y } => {
                let mut watched = xs.clone();
                watched.push(*y);
                watched
            }
            ScalarProduct { xs, y, .. } => {
                let mut watched = xs.clone();
                watched.push(*y);
                watched
            }
            LessOrEqual { x, .. } => vec![*x],
            Element { index, out, .. } => vec![*index, *out],
            AmongUp { xs, .. } | AmongDown { xs, .. } | AllDifferent { xs } => xs.clone(),
        }
    }

    /// Registers this constraint (known to the store as `id`) on the
    /// notification list of every variable it watches
    pub fn post(&self, id: ConstraintId, store: &mut CpStore) {
        for x in self.watched() {
            store.watch(x, id);
        }
    }

    /// True while the constraint may still prune something
    #[inline]
    pub fn is_active(&self, trail: &Trailer) -> bool {
        trail.get(self.active) == 1
    }

    fn deactivate(&self, trail: &mut Trailer) {
        trail.set(self.active, 0);
    }

    /// Re-examines the attached variables and tightens their domains.
    /// Returns false iff the constraint detected infeasibility. Every domain
    /// shrink performed here wakes the corresponding watchers through
    /// `pending`.
    pub fn propagate(&self, store: &mut CpStore, pending: &mut WorkSet) -> bool {
        use ConstraintSpec::*;
        match &self.spec {
            Equal { x, y } => self.propagate_equal(*x, *y, store, pending),
            NotEqual { x, y } => self.propagate_not_equal(*x, *y, store, pending),
            IsDifferent { x, forbidden, b } => {
                self.propagate_is_different(*x, *forbidden, *b, store, pending)
            }
            Or { xs, b } => self.propagate_or(xs, *b, store, pending),
            And { xs, b } => self.propagate_and(xs, *b, store, pending),
            Sum { xs, y } => self.propagate_linear(None, xs, *y, store, pending),
            ScalarProduct { coeffs, xs, y } => {
                self.propagate_linear(Some(coeffs.as_slice()), xs, *y, store, pending)
            }
            LessOrEqual { x, bound } => {
                if !store.remove_above(*x, *bound, pending) {
                    return false;
                }
                // values only ever shrink: once max <= bound it stays so
                self.deactivate(&mut store.trail);
                true
            }
            Element { array, index, out } => {
                self.propagate_element(array, *index, *out, store, pending)
            }
            AmongUp { xs, set, k } => self.propagate_among_up(xs, set, *k, store, pending),
            AmongDown { xs, set, k } => self.propagate_among_down(xs, set, *k, store, pending),
            AllDifferent { xs } => self.propagate_all_different(xs, store, pending),
        }
    }

    fn propagate_equal(
        &self,
        x: CpVarId,
        y: CpVarId,
        store: &mut CpStore,
        pending: &mut WorkSet,
    ) -> bool {
        for v in store.values(x) {
            if !store.contains(y, v) && !store.remove(x, v, pending) {
                return false;
            }
        }
        for v in store.values(y) {
            if !store.contains(x, v) && !store.remove(y, v, pending) {
                return false;
            }
        }
        if store.is_bound(x) && store.is_bound(y) {
            self.deactivate(&mut store.trail);
        }
        true
    }

    fn propagate_not_equal(
        &self,
        x: CpVarId,
        y: CpVarId,
        store: &mut CpStore,
        pending: &mut WorkSet,
    ) -> bool {
        if store.is_bound(x) {
            let v = store.value(x);
            if !store.remove(y, v, pending) {
                return false;
            }
            self.deactivate(&mut store.trail);
        } else if store.is_bound(y) {
            let v = store.value(y);
            if !store.remove(x, v, pending) {
                return false;
            }
            self.deactivate(&mut store.trail);
        }
        true
    }

    fn propagate_is_different(
        &self,
        x: CpVarId,
        forbidden: isize,
        b: CpVarId,
        store: &mut CpStore,
        pending: &mut WorkSet,
    ) -> bool {
        if store.is_bound(b) {
            let ok = if store.value(b) == 1 {
                store.remove(x, forbidden, pending)
            } else {
                store.assign(x, forbidden, pending)
            };
            self.deactivate(&mut store.trail);
            return ok;
        }
        if !store.contains(x, forbidden) {
            let ok = store.assign(b, 1, pending);
            self.deactivate(&mut store.trail);
            return ok;
        }
        if store.is_bound(x) {
            // bound, and the single value is the forbidden one
            let ok = store.assign(b, 0, pending);
            self.deactivate(&mut store.trail);
            return ok;
        }
        true
    }

    fn propagate_or(
        &self,
        xs: &[CpVarId],
        b: CpVarId,
        store: &mut CpStore,
        pending: &mut WorkSet,
    ) -> bool {
        let any_true = xs.iter().any(|&x| store.is_bound(x) && store.value(x) == 1);
        if any_true {
            let ok = store.assign(b, 1, pending);
            self.deactivate(&mut store.trail);
            return ok;
        }
        let all_false = xs.iter().all(|&x| store.is_bound(x) && store.value(x) == 0);
        if all_false {
            let ok = store.assign(b, 0, pending);
            self.deactivate(&mut store.trail);
            return ok;
        }
        if store.is_bound(b) {
            if store.value(b) == 0 {
                // no disjunct may hold
                for &x in xs {
                    if !store.assign(x, 0, pending) {
                        return false;
                    }
                }
                self.deactivate(&mut store.trail);
            } else {
                // b is true: when a single candidate remains it must hold
                let unbound: Vec<CpVarId> =
                    xs.iter().copied().filter(|&x| !store.is_bound(x)).collect();
                if unbound.len() == 1 {
                    let ok = store.assign(unbound[0], 1, pending);
                    self.deactivate(&mut store.trail);
                    return ok;
                }
            }
        }
        true
    }

    fn propagate_and(
        &self,
        xs: &[CpVarId],
        b: CpVarId,
        store: &mut CpStore,
        pending: &mut WorkSet,
    ) -> bool {
        let any_false = xs.iter().any(|&x| store.is_bound(x) && store.value(x) == 0);
        if any_false {
            let ok = store.assign(b, 0, pending);
            self.deactivate(&mut store.trail);
            return ok;
        }
        let all_true = xs.iter().all(|&x| store.is_bound(x) && store.value(x) == 1);
        if all_true {
            let ok = store.assign(b, 1, pending);
            self.deactivate(&mut store.trail);
            return ok;
        }
        if store.is_bound(b) {
            if store.value(b) == 1 {
                for &x in xs {
                    if !store.assign(x, 1, pending) {
                        return false;
                    }
                }
                self.deactivate(&mut store.trail);
            } else {
                let unbound: Vec<CpVarId> =
                    xs.iter().copied().filter(|&x| !store.is_bound(x)).collect();
                if unbound.len() == 1 {
                    let ok = store.assign(unbound[0], 0, pending);
                    self.deactivate(&mut store.trail);
                    return ok;
                }
            }
        }
        true
    }

    /// Bounds propagation of y == sum(c[i] * x[i]); `coeffs == None` stands
    /// for the all-ones coefficient vector (plain sum).
    fn propagate_linear(
        &self,
        coeffs: Option<&[isize]>,
        xs: &[CpVarId],
        y: CpVarId,
        store: &mut CpStore,
        pending: &mut WorkSet,
    ) -> bool {
        let coef = |i: usize| coeffs.map_or(1, |cs| cs[i]);

        let mut lo = 0;
        let mut hi = 0;
        for (i, &x) in xs.iter().enumerate() {
            let c = coef(i);
            if c >= 0 {
                lo += c * store.min(x);
                hi += c * store.max(x);
            } else {
                lo += c * store.max(x);
                hi += c * store.min(x);
            }
        }
        if !store.remove_below(y, lo, pending) || !store.remove_above(y, hi, pending) {
            return false;
        }

        for (i, &x) in xs.iter().enumerate() {
            let c = coef(i);
            if c == 0 {
                continue;
            }
            let (term_lo, term_hi) = if c >= 0 {
                (c * store.min(x), c * store.max(x))
            } else {
                (c * store.max(x), c * store.min(x))
            };
            // c*x must fit within what y leaves once the other terms are set
            let t_lo = store.min(y) - (hi - term_hi);
            let t_hi = store.max(y) - (lo - term_lo);
            let (x_lo, x_hi) = if c > 0 {
                (div_ceil(t_lo, c), div_floor(t_hi, c))
            } else {
                (div_ceil(t_hi, c), div_floor(t_lo, c))
            };
            if !store.remove_below(x, x_lo, pending) || !store.remove_above(x, x_hi, pending) {
                return false;
            }
        }

        if xs.iter().all(|&x| store.is_bound(x)) && store.is_bound(y) {
            self.deactivate(&mut store.trail);
        }
        true
    }

    fn propagate_element(
        &self,
        array: &[isize],
        index: CpVarId,
        out: CpVarId,
        store: &mut CpStore,
        pending: &mut WorkSet,
    ) -> bool {
        // an index is only viable when it is in range and its image is
        for i in store.values(index) {
            let viable =
                i >= 0 && (i as usize) < array.len() && store.contains(out, array[i as usize]);
            if !viable && !store.remove(index, i, pending) {
                return false;
            }
        }
        // an output value needs at least one supporting index
        let supported: Vec<isize> =
            store.values(index).iter().map(|&i| array[i as usize]).collect();
        for v in store.values(out) {
            if !supported.contains(&v) && !store.remove(out, v, pending) {
                return false;
            }
        }
        if store.is_bound(index) && store.is_bound(out) {
            self.deactivate(&mut store.trail);
        }
        true
    }

    fn propagate_among_up(
        &self,
        xs: &[CpVarId],
        set: &[isize],
        k: usize,
        store: &mut CpStore,
        pending: &mut WorkSet,
    ) -> bool {
        let surely = xs
            .iter()
            .filter(|&&x| store.values(x).iter().all(|v| set.contains(v)))
            .count();
        if surely > k {
            return false;
        }
        if surely == k {
            // the quota is used up: strip the counted values everywhere else
            for &x in xs {
                if store.values(x).iter().all(|v| set.contains(v)) {
                    continue;
                }
                for &v in set {
                    if !store.remove(x, v, pending) {
                        return false;
                    }
                }
            }
            self.deactivate(&mut store.trail);
            return true;
        }
        let possible = xs
            .iter()
            .filter(|&&x| store.values(x).iter().any(|v| set.contains(v)))
            .count();
        if possible <= k {
            self.deactivate(&mut store.trail);
        }
        true
    }

    fn propagate_among_down(
        &self,
        xs: &[CpVarId],
        set: &[isize],
        k: usize,
        store: &mut CpStore,
        pending: &mut WorkSet,
    ) -> bool {
        let possible: Vec<CpVarId> = xs
            .iter()
            .copied()
            .filter(|&x| store.values(x).iter().any(|v| set.contains(v)))
            .collect();
        if possible.len() < k {
            return false;
        }
        if possible.len() == k {
            // every candidate is needed: forbid their values outside the set
            for &x in &possible {
                for v in store.values(x) {
                    if !set.contains(&v) && !store.remove(x, v, pending) {
                        return false;
                    }
                }
            }
            self.deactivate(&mut store.trail);
            return true;
        }
        let surely = xs
            .iter()
            .filter(|&&x| store.values(x).iter().all(|v| set.contains(v)))
            .count();
        if surely >= k {
            self.deactivate(&mut store.trail);
        }
        true
    }

    fn propagate_all_different(
        &self,
        xs: &[CpVarId],
        store: &mut CpStore,
        pending: &mut WorkSet,
    ) -> bool {
        for (i, &x) in xs.iter().enumerate() {
            if !store.is_bound(x) {
                continue;
            }
            let v = store.value(x);
            for (j, &other) in xs.iter().enumerate() {
                if i != j && !store.remove(other, v, pending) {
                    return false;
                }
            }
        }
        if xs.iter().all(|&x| store.is_bound(x)) {
            self.deactivate(&mut store.trail);
        }
        true
    }
}

// ----------------------------------------------------------------------------
// --- FIX POINT --------------------------------------------------------------
// ----------------------------------------------------------------------------
/// Drains the pending work-set: pops a constraint, propagates it, and keeps
/// going until the set is empty (fix point reached, returns true) or some
/// propagation reports infeasibility (returns false, the work-set is cleared
/// so that the caller may backtrack and reuse it).
pub fn fix_point(constraints: &[Constraint], store: &mut CpStore, pending: &mut WorkSet) -> bool {
    while let Some(cid) = pending.pop() {
        let constraint = &constraints[cid.0];
        if !constraint.is_active(&store.trail) {
            continue;
        }
        if !constraint.propagate(store, pending) {
            pending.clear();
            return false;
        }
    }
    true
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
