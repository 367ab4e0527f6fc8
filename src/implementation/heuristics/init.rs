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

//! This module provides the initialization strategies: how the very first
//! assignment of a search is produced.

use crate::{Experiment, Initialization, Solution};

/// _This is the default initialization._ It installs the problem-provided
/// default assignment.
#[derive(Debug, Default, Copy, Clone)]
pub struct SimpleInit;
impl Initialization for SimpleInit {
    fn initial_assignment(&self, experiment: &dyn Experiment) -> Solution {
        experiment.initial_solution()
    }
}

/// This initialization asks the problem for its deterministic greedy
/// assignment, and falls back onto the default assignment when the problem
/// provides none.
#[derive(Debug, Default, Copy, Clone)]
pub struct GreedyInit;
impl Initialization for GreedyInit {
    fn initial_assignment(&self, experiment: &dyn Experiment) -> Solution {
        experiment
            .greedy_solution()
            .unwrap_or_else(|| experiment.initial_solution())
    }
}
