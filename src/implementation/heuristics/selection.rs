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

//! This module provides the move selection strategies: given the evaluated
//! candidates of one iteration, pick the move to commit or decline to move
//! at all. Infeasible candidates are never selected.

use rand::rngs::SmallRng;
use rand::Rng;

use crate::{EvaluatedMove, MoveSelection};

/// The candidate with the smallest delta among the feasible ones (first
/// seen wins a tie), or `None` when there is no feasible candidate at all
fn best_candidate(candidates: &[EvaluatedMove]) -> Option<&EvaluatedMove> {
    candidates
        .iter()
        .filter(|c| !c.infeasible)
        .fold(None, |best: Option<&EvaluatedMove>, c| match best {
            Some(b) if b.delta <= c.delta => Some(b),
            _ => Some(c),
        })
}

// ----------------------------------------------------------------------------
// --- GREEDY -----------------------------------------------------------------
// ----------------------------------------------------------------------------
/// _This is the default selection._ It commits the move with the most
/// negative delta and declines to move when nothing improves.
#[derive(Debug, Default, Copy, Clone)]
pub struct GreedySelection;
impl MoveSelection for GreedySelection {
    fn select<'a>(
        &mut self,
        candidates: &'a [EvaluatedMove],
        _rng: &mut SmallRng,
    ) -> Option<&'a EvaluatedMove> {
        best_candidate(candidates).filter(|c| c.delta < 0)
    }
}

// ----------------------------------------------------------------------------
// --- METROPOLIS -------------------------------------------------------------
// ----------------------------------------------------------------------------
/// The Metropolis criterion at a fixed temperature: the best candidate is
/// always accepted when its delta is non positive, and with probability
/// `exp(-delta / T)` otherwise.
#[derive(Debug, Copy, Clone)]
pub struct Metropolis {
    pub temperature: f64,
}
impl Metropolis {
    pub fn new(temperature: f64) -> Self {
        Metropolis { temperature }
    }

    /// The acceptance rule, reused by simulated annealing at its current
    /// temperature
    fn accept<'a>(
        temperature: f64,
        candidates: &'a [EvaluatedMove],
        rng: &mut SmallRng,
    ) -> Option<&'a EvaluatedMove> {
        let best = best_candidate(candidates)?;
        if best.delta <= 0 {
            return Some(best);
        }
        if temperature > 0.0 {
            let probability = (-(best.delta as f64) / temperature).exp();
            if rng.gen::<f64>() < probability {
                return Some(best);
            }
        }
        None
    }
}
impl MoveSelection for Metropolis {
    fn select<'a>(
        &mut self,
        candidates: &'a [EvaluatedMove],
        rng: &mut SmallRng,
    ) -> Option<&'a EvaluatedMove> {
        Self::accept(self.temperature, candidates, rng)
    }
}

// ----------------------------------------------------------------------------
// --- SIMULATED ANNEALING ----------------------------------------------------
// ----------------------------------------------------------------------------
/// Simulated annealing: delegates each selection to the Metropolis
/// criterion at the current temperature, then cools down geometrically
/// (`T <- max(alpha * T, t_min)`).
#[derive(Debug, Copy, Clone)]
pub struct SimulatedAnnealing {
    pub temperature: f64,
    pub alpha: f64,
    pub t_min: f64,
}
impl SimulatedAnnealing {
    pub fn new(temperature: f64, alpha: f64, t_min: f64) -> Self {
        SimulatedAnnealing { temperature, alpha, t_min }
    }
}
impl Default for SimulatedAnnealing {
    fn default() -> Self {
        SimulatedAnnealing { temperature: 1.0, alpha: 0.99, t_min: 0.0 }
    }
}
impl MoveSelection for SimulatedAnnealing {
    fn select<'a>(
        &mut self,
        candidates: &'a [EvaluatedMove],
        rng: &mut SmallRng,
    ) -> Option<&'a EvaluatedMove> {
        let selected = Metropolis::accept(self.temperature, candidates, rng);
        self.temperature = (self.alpha * self.temperature).max(self.t_min);
        selected
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################

#[cfg(test)]
mod tests {
    use rand::{rngs::SmallRng, SeedableRng};

    use crate::*;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    fn candidate(delta: isize, infeasible: bool) -> EvaluatedMove {
        EvaluatedMove { mov: Move::default(), delta, infeasible }
    }

    #[test]
    fn greedy_picks_the_most_negative_delta() {
        let candidates = vec![candidate(3, false), candidate(-5, false), candidate(-2, false)];
        let picked = GreedySelection.select(&candidates, &mut rng()).unwrap();
        assert_eq!(-5, picked.delta);
    }

    #[test]
    fn greedy_breaks_ties_on_first_seen() {
        let mut first = candidate(-4, false);
        first.mov = Move::new(vec![Decision {
            variable: Variable(0),
            value: Value::Int(1),
        }]);
        let candidates = vec![first.clone(), candidate(-4, false)];
        let picked = GreedySelection.select(&candidates, &mut rng()).unwrap();
        assert_eq!(first.mov, picked.mov);
    }

    #[test]
    fn greedy_declines_when_nothing_improves() {
        let candidates = vec![candidate(0, false), candidate(4, false)];
        assert!(GreedySelection.select(&candidates, &mut rng()).is_none());
    }

    #[test]
    fn infeasible_candidates_are_never_selected() {
        let candidates = vec![candidate(-10, true), candidate(2, false)];
        assert!(GreedySelection.select(&candidates, &mut rng()).is_none());
        // metropolis may or may not take the +2 one, but never the -10
        for seed in 0..20 {
            let mut rng = SmallRng::seed_from_u64(seed);
            if let Some(c) = Metropolis::new(10.0).select(&candidates, &mut rng) {
                assert!(!c.infeasible);
            }
        }
    }

    #[test]
    fn metropolis_always_accepts_a_negative_delta() {
        let candidates = vec![candidate(-1, false)];
        for temperature in [0.0, 0.5, 5.0, 500.0] {
            for seed in 0..20 {
                let mut rng = SmallRng::seed_from_u64(seed);
                let picked = Metropolis::new(temperature).select(&candidates, &mut rng);
                assert!(picked.is_some());
            }
        }
    }

    #[test]
    fn metropolis_at_zero_temperature_rejects_any_degradation() {
        let candidates = vec![candidate(1, false)];
        for seed in 0..20 {
            let mut rng = SmallRng::seed_from_u64(seed);
            assert!(Metropolis::new(0.0).select(&candidates, &mut rng).is_none());
        }
    }

    #[test]
    fn simulated_annealing_cools_geometrically() {
        let mut sa = SimulatedAnnealing::new(5.1, 0.9, 0.0);
        let candidates = vec![candidate(-1, false)];
        let mut rng = rng();
        for k in 1..=10 {
            let _ = sa.select(&candidates, &mut rng);
            let expected = 5.1 * 0.9f64.powi(k);
            assert!((sa.temperature - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn simulated_annealing_never_cools_below_its_floor() {
        let mut sa = SimulatedAnnealing::new(1.0, 0.5, 0.4);
        let mut rng = rng();
        for _ in 0..10 {
            let _ = sa.select(&[], &mut rng);
        }
        assert!((sa.temperature - 0.4).abs() < 1e-9);
    }
}
