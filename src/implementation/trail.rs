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

//! This module provides the trailer: the reversible-state stack which makes
//! every mutation of the CP subsolver backtrackable. All of the CP-owned
//! mutable state (domain sizes, bounds, entailment flags, counters) lives in
//! cells allocated from one trailer, so that undoing a failed branch is one
//! `restore` away.
//!
//! The cells are kept in a single arena and are addressed through the tiny
//! copiable `TrailedInt` handle. Storing indices rather than references keeps
//! the trail entries small and sidesteps any ownership cycle between the
//! variables, the constraints and their notification lists.

/// A handle onto one reversible cell of a `Trailer`. Handles are plain
/// indices: they are only meaningful for the trailer that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailedInt(usize);

/// One undo record: the cell and the value it held before the write.
#[derive(Debug, Clone, Copy)]
struct TrailEntry {
    cell: usize,
    previous: isize,
}

/// The reversible-state stack. `save` takes a checkpoint, `restore` undoes
/// every write since the matching checkpoint (in reverse order), and
/// `restore_to_root` unwinds all the checkpoints at once.
///
/// Writing a value equal to the current one is a no-op and leaves no trail
/// entry, so the cost of a trail section is linear in the number of distinct
/// changes, not in the number of writes.
///
/// # Example
/// ```
/// # use cbls::Trailer;
/// let mut trail = Trailer::default();
/// let cell = trail.trailed_int(42);
///
/// trail.save();
/// trail.set(cell, 64);
/// assert_eq!(64, trail.get(cell));
///
/// trail.restore();
/// assert_eq!(42, trail.get(cell));
/// ```
#[derive(Debug, Default)]
pub struct Trailer {
    /// The current value of every cell
    values: Vec<isize>,
    /// The undo records, most recent last
    trail: Vec<TrailEntry>,
    /// The trail height at the time of each `save`
    levels: Vec<usize>,
}

impl Trailer {
    /// Allocates a new reversible cell holding `initial` and returns its
    /// handle. Cells allocated after a `save` survive the matching `restore`
    /// (only their values are rewound, never their existence).
    pub fn trailed_int(&mut self, initial: isize) -> TrailedInt {
        self.values.push(initial);
        TrailedInt(self.values.len() - 1)
    }

    /// Reads the current value of the given cell.
    #[inline]
    pub fn get(&self, cell: TrailedInt) -> isize {
        self.values[cell.0]
    }

    /// Writes `value` into the given cell. Writing the value the cell already
    /// holds is a no-op; a write that changes the value pushes an undo record
    /// carrying the previous value.
    #[inline]
    pub fn set(&mut self, cell: TrailedInt, value: isize) {
        let previous = self.values[cell.0];
        if previous != value {
            self.trail.push(TrailEntry { cell: cell.0, previous });
            self.values[cell.0] = value;
        }
    }

    /// Adds `delta` to the given cell (a convenience over get + set).
    #[inline]
    pub fn add(&mut self, cell: TrailedInt, delta: isize) {
        self.set(cell, self.get(cell) + delta);
    }

    /// Takes a checkpoint and returns the new save depth. Every write
    /// performed between this call and the matching `restore` will be undone
    /// by that `restore`.
    pub fn save(&mut self) -> usize {
        self.levels.push(self.trail.len());
        self.levels.len()
    }

    /// Pops the writes performed since the last `save`, rewriting each cell
    /// with its previous value in reverse order.
    ///
    /// # Panics
    /// When there is no matching `save`: an unbalanced save/restore pair is a
    /// programming violation, not a recoverable situation.
    pub fn restore(&mut self) {
        let level = self.levels.pop().expect("restore without a matching save");
        while self.trail.len() > level {
            let TrailEntry { cell, previous } = self.trail.pop().unwrap();
            self.values[cell] = previous;
        }
    }

    /// Unwinds every checkpoint: after this call the cells are back to the
    /// values they held before the very first `save`, and the save depth is
    /// zero. Calling it with no checkpoint saved is a no-op.
    pub fn restore_to_root(&mut self) {
        while !self.levels.is_empty() {
            self.restore();
        }
    }

    /// The current save depth (the number of checkpoints currently stacked).
    pub fn depth(&self) -> usize {
        self.levels.len()
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod tests {
    use crate::Trailer;

    #[test]
    fn a_matched_save_restore_pair_recovers_the_value_at_save_time() {
        let mut trail = Trailer::default();
        let a = trail.trailed_int(1);
        let b = trail.trailed_int(10);

        trail.set(a, 2);
        trail.save();
        trail.set(a, 3);
        trail.set(b, 30);
        trail.set(a, 4);
        trail.restore();

        assert_eq!(2, trail.get(a));
        assert_eq!(10, trail.get(b));
    }

    #[test]
    fn save_restore_pairs_nest() {
        let mut trail = Trailer::default();
        let a = trail.trailed_int(0);

        trail.save();
        trail.set(a, 1);
        trail.save();
        trail.set(a, 2);
        trail.save();
        trail.set(a, 3);

        trail.restore();
        assert_eq!(2, trail.get(a));
        trail.restore();
        assert_eq!(1, trail.get(a));
        trail.restore();
        assert_eq!(0, trail.get(a));
    }

    #[test]
    fn restore_to_root_recovers_the_initial_values_regardless_of_depth() {
        let mut trail = Trailer::default();
        let a = trail.trailed_int(5);
        let b = trail.trailed_int(7);

        for i in 0..10 {
            trail.save();
            trail.set(a, i);
            trail.set(b, -i);
        }
        trail.restore_to_root();

        assert_eq!(5, trail.get(a));
        assert_eq!(7, trail.get(b));
        assert_eq!(0, trail.depth());
    }

    #[test]
    fn writing_an_equal_value_leaves_no_trail_entry() {
        let mut trail = Trailer::default();
        let a = trail.trailed_int(5);

        trail.save();
        trail.set(a, 5);
        trail.set(a, 6);
        trail.set(a, 6);
        trail.restore();

        assert_eq!(5, trail.get(a));
    }

    #[test]
    #[should_panic(expected = "restore without a matching save")]
    fn restoring_with_no_checkpoint_is_a_violation() {
        let mut trail = Trailer::default();
        trail.restore();
    }

    #[test]
    fn cells_created_below_a_checkpoint_survive_the_restore() {
        let mut trail = Trailer::default();
        trail.save();
        let a = trail.trailed_int(3);
        trail.set(a, 9);
        trail.restore();
        assert_eq!(3, trail.get(a));
    }
}
