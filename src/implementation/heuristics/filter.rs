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

//! This module provides the move filters: the strategies deciding which
//! candidate moves are worth a speculative evaluation at all.

use crate::{CpLsModel, Move, MoveFilter, Value};

/// _This is the default filter._ It lets every candidate through (the
/// evaluation graph then prices the infeasible ones through their
/// violation aggregates).
#[derive(Debug, Default, Copy, Clone)]
pub struct NoFilter;
impl MoveFilter for NoFilter {
    fn filter(&mut self, _solution: &[Value], moves: Vec<Move>) -> Vec<Move> {
        moves
    }
}

/// The CP filter: a candidate survives iff the assignment it leads to still
/// admits a consistent extension of the companion CP model. Each check is a
/// scoped use of the trailed store, so consecutive candidates are
/// independent.
pub struct CpFilter {
    model: CpLsModel,
}
impl CpFilter {
    pub fn new(model: CpLsModel) -> Self {
        CpFilter { model }
    }
    /// The underlying CP model (e.g. to enumerate feasible completions
    /// directly)
    pub fn model_mut(&mut self) -> &mut CpLsModel {
        &mut self.model
    }
}
impl MoveFilter for CpFilter {
    fn filter(&mut self, solution: &[Value], moves: Vec<Move>) -> Vec<Move> {
        let mut scratch = solution.to_vec();
        moves
            .into_iter()
            .filter(|mov| {
                scratch.copy_from_slice(solution);
                for d in mov.decisions() {
                    scratch[d.variable.id()] = d.value;
                }
                self.model.is_feasible(&scratch)
            })
            .collect()
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod tests {
    use crate::*;

    fn mv(var: usize, value: isize) -> Move {
        Move::new(vec![Decision { variable: Variable(var), value: Value::Int(value) }])
    }

    #[test]
    fn no_filter_keeps_everything() {
        let moves = vec![mv(0, 1), mv(1, 0)];
        let kept = NoFilter.filter(&[Value::Int(0), Value::Int(1)], moves.clone());
        assert_eq!(moves, kept);
    }

    #[test]
    fn the_cp_filter_discards_constraint_breaking_moves() {
        // two variables over {0,1,2} that must differ
        let mut model = CpLsModel::default();
        let x0 = model.add_decision(&[0, 1, 2]);
        let x1 = model.add_decision(&[0, 1, 2]);
        let ad = model.post(ConstraintSpec::AllDifferent { xs: vec![x0, x1] });
        model.declare_transversal(ad);
        model.freeze();
        let mut filter = CpFilter::new(model);

        let solution = vec![Value::Int(0), Value::Int(1)];
        let kept = filter.filter(&solution, vec![mv(0, 1), mv(0, 2), mv(1, 2)]);

        // moving x0 onto 1 collides with x1
        assert_eq!(vec![mv(0, 2), mv(1, 2)], kept);
    }

    #[test]
    fn the_filter_preserves_the_candidate_order() {
        let mut model = CpLsModel::default();
        let _ = model.add_decision(&[0, 1, 2]);
        model.freeze();
        let mut filter = CpFilter::new(model);

        let kept = filter.filter(&[Value::Int(0)], vec![mv(0, 2), mv(0, 1)]);
        assert_eq!(vec![mv(0, 2), mv(0, 1)], kept);
    }
}
