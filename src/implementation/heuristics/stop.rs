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

//! This module provides the implementation of the various stop criteria that
//! can be used to bound an optimization run. They are polled at iteration
//! boundaries only.

use std::{
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use crate::StopCriterion;

/// _This is the default criterion._ It never stops the search on its own;
/// the run then goes on until the process is interrupted.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoLimit;
impl StopCriterion for NoLimit {
    fn must_stop(&self, _iteration: usize) -> bool {
        false
    }
}

/// Stops the optimization after a fixed number of iterations.
#[derive(Debug, Copy, Clone)]
pub struct IterationLimit(pub usize);
impl StopCriterion for IterationLimit {
    fn must_stop(&self, iteration: usize) -> bool {
        iteration >= self.0
    }
}

/// This criterion allows one to specify a maximum time budget for the whole
/// optimization. Once the budget is elapsed, the run stops at the next
/// iteration boundary and the best solution found so far is returned.
#[derive(Debug, Clone)]
pub struct TimeLimit {
    stop: Arc<AtomicBool>,
}
impl TimeLimit {
    pub fn new(budget: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let t_flag = Arc::clone(&stop);

        // timer
        std::thread::spawn(move || {
            std::thread::sleep(budget);
            t_flag.store(true, std::sync::atomic::Ordering::Relaxed);
        });

        TimeLimit { stop }
    }
}
impl StopCriterion for TimeLimit {
    fn must_stop(&self, _iteration: usize) -> bool {
        self.stop.load(std::sync::atomic::Ordering::Relaxed)
    }
}

// ############################################################################
// #### TESTS #################################################################
// ############################################################################
