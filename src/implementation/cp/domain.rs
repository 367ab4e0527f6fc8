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

//! This module provides the domain stores of the CP variables. Integer
//! domains are backed by a backtrackable sparse set: removals permute a dense
//! value array and shrink a trailed size, so that restoring the size (which
//! the trailer does for free) resurrects exactly the values removed since the
//! checkpoint. An additive offset makes negative and shifted ranges
//! representable. Boolean domains are the two-flag specialisation of the
//! same idea.
//!
//! None of the operations here ever fails with an error: tentatively
//! assigning a value that is no longer available simply reports
//! infeasibility through its return value, as such events are an expected
//! and frequent outcome of propagation.

use crate::{TrailedInt, Trailer};

/// A position marking a value that never belonged to the domain (a hole in
/// the initial value list).
const HOLE: usize = usize::MAX;

// ----------------------------------------------------------------------------
// --- SPARSE INTEGER DOMAIN --------------------------------------------------
// ----------------------------------------------------------------------------
/// The sparse-set domain of an integer CP variable.
///
/// The live values are `values[0..size]`; removing a value swaps it with the
/// last live one and decrements the trailed `size`. Since removed values are
/// never permuted again, rewinding `size` restores the exact former set.
/// `positions[v - offset]` tracks where each value currently sits, giving
/// O(1) membership and removal.
#[derive(Debug)]
pub struct SparseDomain {
    /// The values, live ones first
    values: Vec<isize>,
    /// Current index of each value in `values` (indexed by `v - offset`)
    positions: Vec<usize>,
    /// Additive offset: the smallest initial value
    offset: isize,
    /// The number of live values (trailed)
    size: TrailedInt,
    /// The smallest live value (trailed, meaningless when empty)
    min: TrailedInt,
    /// The largest live value (trailed, meaningless when empty)
    max: TrailedInt,
}

impl SparseDomain {
    /// Creates the domain holding the given (distinct) values.
    ///
    /// # Panics
    /// When the value list is empty: a variable with no value at all is a
    /// modelling error, not a propagation outcome.
    pub fn new(trail: &mut Trailer, initial: &[isize]) -> Self {
        assert!(!initial.is_empty(), "a domain needs at least one value");
        let lo = initial.iter().copied().min().unwrap();
        let hi = initial.iter().copied().max().unwrap();

        let mut positions = vec![HOLE; (hi - lo + 1) as usize];
        let mut values = Vec::with_capacity(initial.len());
        for (i, &v) in initial.iter().enumerate() {
            debug_assert!(positions[(v - lo) as usize] == HOLE, "duplicate domain value");
            positions[(v - lo) as usize] = i;
            values.push(v);
        }
        let size = trail.trailed_int(values.len() as isize);
        let min = trail.trailed_int(lo);
        let max = trail.trailed_int(hi);
        SparseDomain { values, positions, offset: lo, size, min, max }
    }

    /// The number of live values
    #[inline]
    pub fn size(&self, trail: &Trailer) -> usize {
        trail.get(self.size) as usize
    }
    /// True iff exactly one value remains
    #[inline]
    pub fn is_bound(&self, trail: &Trailer) -> bool {
        self.size(trail) == 1
    }
    /// The smallest live value
    #[inline]
    pub fn min(&self, trail: &Trailer) -> isize {
        trail.get(self.min)
    }
    /// The largest live value
    #[inline]
    pub fn max(&self, trail: &Trailer) -> isize {
        trail.get(self.max)
    }
    /// True iff `v` is live
    #[inline]
    pub fn contains(&self, trail: &Trailer, v: isize) -> bool {
        if v < self.offset || v - self.offset >= self.positions.len() as isize {
            return false;
        }
        let pos = self.positions[(v - self.offset) as usize];
        pos != HOLE && pos < self.size(trail)
    }
    /// The live values, in no particular order
    pub fn iter(&self, trail: &Trailer) -> impl Iterator<Item = isize> + '_ {
        self.values[0..self.size(trail)].iter().copied()
    }

    /// Removes `v` from the domain. Returns true iff the domain changed
    /// (i.e. iff `v` was live). The domain is allowed to become empty; it is
    /// the caller's burden to check for a wipe out.
    pub fn remove(&mut self, trail: &mut Trailer, v: isize) -> bool {
        if !self.contains(trail, v) {
            return false;
        }
        let size = self.size(trail);
        let pos = self.positions[(v - self.offset) as usize];
        let last = self.values[size - 1];

        self.values.swap(pos, size - 1);
        self.positions[(v - self.offset) as usize] = size - 1;
        self.positions[(last - self.offset) as usize] = pos;
        trail.set(self.size, (size - 1) as isize);

        if size > 1 {
            if v == self.min(trail) {
                let lo = self.iter(trail).min().unwrap();
                trail.set(self.min, lo);
            }
            if v == self.max(trail) {
                let hi = self.iter(trail).max().unwrap();
                trail.set(self.max, hi);
            }
        }
        true
    }

    /// Restricts the domain to the single value `v`. Returns false iff `v`
    /// was not live (the infeasibility signal).
    pub fn assign(&mut self, trail: &mut Trailer, v: isize) -> bool {
        if !self.contains(trail, v) {
            return false;
        }
        let pos = self.positions[(v - self.offset) as usize];
        let first = self.values[0];
        self.values.swap(pos, 0);
        self.positions[(v - self.offset) as usize] = 0;
        self.positions[(first - self.offset) as usize] = pos;
        trail.set(self.size, 1);
        trail.set(self.min, v);
        trail.set(self.max, v);
        true
    }
}

// ----------------------------------------------------------------------------
// --- BOOLEAN DOMAIN ---------------------------------------------------------
// ----------------------------------------------------------------------------
/// The domain of a boolean CP variable: two trailed presence flags over the
/// encoded values 0 (false) and 1 (true).
#[derive(Debug)]
pub struct BoolDomain {
    has_false: TrailedInt,
    has_true: TrailedInt,
}

impl BoolDomain {
    pub fn new(trail: &mut Trailer) -> Self {
        BoolDomain {
            has_false: trail.trailed_int(1),
            has_true: trail.trailed_int(1),
        }
    }
    #[inline]
    pub fn size(&self, trail: &Trailer) -> usize {
        (trail.get(self.has_false) + trail.get(self.has_true)) as usize
    }
    #[inline]
    pub fn is_bound(&self, trail: &Trailer) -> bool {
        self.size(trail) == 1
    }
    #[inline]
    pub fn contains(&self, trail: &Trailer, v: isize) -> bool {
        match v {
            0 => trail.get(self.has_false) == 1,
            1 => trail.get(self.has_true) == 1,
            _ => false,
        }
    }
    pub fn min(&self, trail: &Trailer) -> isize {
        if trail.get(self.has_false) == 1 { 0 } else { 1 }
    }
    pub fn max(&self, trail: &Trailer) -> isize {
        if trail.get(self.has_true) == 1 { 1 } else { 0 }
    }
    pub fn remove(&mut self, trail: &mut Trailer, v: isize) -> bool {
        if !self.contains(trail, v) {
            return false;
        }
        match v {
            0 => trail.set(self.has_false, 0),
            _ => trail.set(self.has_true, 0),
        }
        true
    }
    /// Assigning true removes false and conversely.
    pub fn assign(&mut self, trail: &mut Trailer, v: isize) -> bool {
        if !self.contains(trail, v) {
            return false;
        }
        match v {
            0 => trail.set(self.has_true, 0),
            _ => trail.set(self.has_false, 0),
        }
        true
    }
}

// ----------------------------------------------------------------------------
// --- TAGGED DOMAIN ----------------------------------------------------------
// ----------------------------------------------------------------------------
/// The domain store of one CP variable: either a sparse integer set or the
/// boolean specialisation.
#[derive(Debug)]
pub enum Domain {
    Sparse(SparseDomain),
    Bool(BoolDomain),
}

impl Domain {
    pub fn size(&self, trail: &Trailer) -> usize {
        match self {
            Domain::Sparse(d) => d.size(trail),
            Domain::Bool(d) => d.size(trail),
        }
    }
    pub fn is_bound(&self, trail: &Trailer) -> bool {
        self.size(trail) == 1
    }
    pub fn min(&self, trail: &Trailer) -> isize {
        match self {
            Domain::Sparse(d) => d.min(trail),
            Domain::Bool(d) => d.min(trail),
        }
    }
    pub fn max(&self, trail: &Trailer) -> isize {
        match self {
            Domain::Sparse(d) => d.max(trail),
            Domain::Bool(d) => d.max(trail),
        }
    }
    pub fn contains(&self, trail: &Trailer, v: isize) -> bool {
        match self {
            Domain::Sparse(d) => d.contains(trail, v),
            Domain::Bool(d) => d.contains(trail, v),
        }
    }
    /// The live values, collected (removals may not happen mid-iteration)
    pub fn values(&self, trail: &Trailer) -> Vec<isize> {
        match self {
            Domain::Sparse(d) => d.iter(trail).collect(),
            Domain::Bool(d) => (0..=1).filter(|v| d.contains(trail, *v)).collect(),
        }
    }
    pub fn remove(&mut self, trail: &mut Trailer, v: isize) -> bool {
        match self {
            Domain::Sparse(d) => d.remove(trail, v),
            Domain::Bool(d) => d.remove(trail, v),
        }
    }
    pub fn assign(&mut self, trail: &mut Trailer, v: isize) -> bool {
        match self {
            Domain::Sparse(d) => d.assign(trail, v),
            Domain::Bool(d) => d.assign(trail, v),
        }
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod test_sparse {
    use crate::Trailer;
    use super::SparseDomain;

    #[test]
    fn removal_updates_membership_size_and_bounds() {
        let mut trail = Trailer::default();
        let mut dom = SparseDomain::new(&mut trail, &[2, 3, 5, 8]);

        assert!(dom.remove(&mut trail, 2));
        assert!(!dom.contains(&trail, 2));
        assert_eq!(3, dom.size(&trail));
        assert_eq!(3, dom.min(&trail));
        assert_eq!(8, dom.max(&trail));

        assert!(dom.remove(&mut trail, 8));
        assert_eq!(5, dom.max(&trail));
    }

    #[test]
    fn removing_an_absent_value_changes_nothing() {
        let mut trail = Trailer::default();
        let mut dom = SparseDomain::new(&mut trail, &[2, 3, 5]);
        assert!(!dom.remove(&mut trail, 4));
        assert!(!dom.remove(&mut trail, 100));
        assert_eq!(3, dom.size(&trail));
    }

    #[test]
    fn restore_resurrects_the_removed_values() {
        let mut trail = Trailer::default();
        let mut dom = SparseDomain::new(&mut trail, &[-3, 0, 4, 7]);

        trail.save();
        assert!(dom.remove(&mut trail, -3));
        assert!(dom.remove(&mut trail, 4));
        assert_eq!(2, dom.size(&trail));
        trail.restore();

        assert_eq!(4, dom.size(&trail));
        assert!(dom.contains(&trail, -3));
        assert!(dom.contains(&trail, 4));
        assert_eq!(-3, dom.min(&trail));
        assert_eq!(7, dom.max(&trail));
    }

    #[test]
    fn assign_keeps_exactly_one_value() {
        let mut trail = Trailer::default();
        let mut dom = SparseDomain::new(&mut trail, &[1, 2, 3]);

        trail.save();
        assert!(dom.assign(&mut trail, 2));
        assert!(dom.is_bound(&trail));
        assert_eq!(2, dom.min(&trail));
        assert_eq!(2, dom.max(&trail));
        assert!(!dom.contains(&trail, 1));
        trail.restore();
        assert_eq!(3, dom.size(&trail));
    }

    #[test]
    fn assigning_an_absent_value_signals_infeasibility() {
        let mut trail = Trailer::default();
        let mut dom = SparseDomain::new(&mut trail, &[1, 2, 3]);
        dom.remove(&mut trail, 2);
        assert!(!dom.assign(&mut trail, 2));
    }

    #[test]
    fn holes_in_the_initial_list_are_never_members() {
        let mut trail = Trailer::default();
        let dom = SparseDomain::new(&mut trail, &[1, 5, 9]);
        assert!(!dom.contains(&trail, 3));
        assert!(!dom.contains(&trail, 6));
        assert!(dom.contains(&trail, 5));
    }
}

#[cfg(test)]
mod test_bool {
    use crate::Trailer;
    use super::BoolDomain;

    #[test]
    fn assign_true_removes_false() {
        let mut trail = Trailer::default();
        let mut dom = BoolDomain::new(&mut trail);

        trail.save();
        assert!(dom.assign(&mut trail, 1));
        assert!(dom.is_bound(&trail));
        assert!(!dom.contains(&trail, 0));
        assert_eq!(1, dom.min(&trail));
        trail.restore();
        assert_eq!(2, dom.size(&trail));
    }

    #[test]
    fn wiping_the_last_value_leaves_an_empty_domain() {
        let mut trail = Trailer::default();
        let mut dom = BoolDomain::new(&mut trail);
        assert!(dom.remove(&mut trail, 0));
        assert!(dom.remove(&mut trail, 1));
        assert_eq!(0, dom.size(&trail));
    }
}
