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

//! This example shows how to implement a solver for the knapsack problem
//! using cbls. It is a fairly simple example but it features most of the
//! aspects you will want to copy when implementing your own solver.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    num::ParseIntError,
    path::Path,
    time::Instant,
};

use clap::Parser;
use cbls::*;
use ordered_float::OrderedFloat;

#[cfg(test)]
mod tests;

/// This structure represents a particular instance of the knapsack problem:
/// a knapsack with a maximum (weight) capacity, and a set of items to choose
/// from, each having a weight and a profit. The goal is to select the best
/// subset of the items to place in the sack so as to maximize the profit.
pub struct Knapsack {
    /// The maximum capacity of the sack (when empty)
    pub capacity: isize,
    /// the profit of each item
    pub profit: Vec<isize>,
    /// the weight of each item
    pub weight: Vec<isize>,
}

/// The engine minimizes; maximizing the profit hence means feeding the
/// objective with the negated profits. The weights, on their side, flow
/// through a hard capacity comparator: the CP filter derived from this very
/// graph will therefore never let the search wander above the capacity.
impl Experiment for Knapsack {
    fn nb_variables(&self) -> usize {
        self.profit.len()
    }
    fn value_kind(&self) -> ValueKind {
        ValueKind::Bool
    }
    fn domains(&self) -> Vec<Vec<Value>> {
        (0..self.nb_variables())
            .map(|_| vec![Value::Bool(false), Value::Bool(true)])
            .collect()
    }
    fn build_dag(&self, dag: &mut DagBuilder) {
        let items: Vec<Source> = (0..self.nb_variables())
            .map(|i| Source::Variable(Variable(i)))
            .collect();
        let profit =
            dag.scalar_product(self.profit.iter().map(|p| -p).collect(), items.clone());
        dag.exclude_from_cp(profit);
        let weight = dag.scalar_product(self.weight.clone(), items);
        let slack = dag.comparator(Source::Node(weight), self.capacity);
        dag.hard_constraint(slack);
        dag.objective(vec![Source::Node(profit)]);
    }
    fn initial_solution(&self) -> Solution {
        vec![Value::Bool(false); self.nb_variables()]
    }
    /// The greedy assignment packs the items by decreasing profit density
    /// as long as they fit.
    fn greedy_solution(&self) -> Option<Solution> {
        let mut order: Vec<usize> = (0..self.nb_variables()).collect();
        order.sort_unstable_by_key(|&i| {
            OrderedFloat(-(self.profit[i] as f64) / self.weight[i] as f64)
        });

        let mut taken = vec![Value::Bool(false); self.nb_variables()];
        let mut left = self.capacity;
        for i in order {
            if self.weight[i] <= left {
                taken[i] = Value::Bool(true);
                left -= self.weight[i];
            }
        }
        Some(taken)
    }
}

// #########################################################################
// # THE INFORMATION BEYOND THIS LINE IS NOT DIRECTLY RELATED TO THE       #
// # IMPLEMENTATION OF A CBLS SOLVER. IT CONTAINS GENERIC FUNCTIONS TO     #
// # READ AN INSTANCE FROM FILE, PROCESS THE COMMAND LINE ARGUMENTS, AND   #
// # THE MAIN FUNCTION.                                                    #
// #########################################################################

/// This structure uses `clap-derive` annotations and defines the arguments
/// that can be passed on to the executable solver.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path to the instance file
    fname: String,
    /// The number of local search iterations
    #[clap(short, long, default_value = "1000")]
    iterations: usize,
    /// The seed of the random source (a fixed seed makes runs reproducible)
    #[clap(short, long, default_value = "0")]
    seed: u64,
    /// Start from the greedy (density ordered) assignment rather than the
    /// empty sack
    #[clap(short, long)]
    greedy: bool,
    /// Disable the CP move filter
    #[clap(long)]
    no_cp: bool,
    /// How many variables the exhaustive neighborhood relaxes at each
    /// iteration
    #[clap(short, long, default_value = "4")]
    width: usize,
}

/// This enumeration simply groups the kind of errors that might occur when
/// parsing a knapsack instance from file. There can be io errors (file
/// unavailable ?), format errors, or parse int errors (a variant of the
/// format error: the parser expected an integer and got something else).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// There was an io related error
    #[error("io error {0}")]
    Io(#[from] std::io::Error),
    /// The parser expected to read something that was an integer but got
    /// some garbage
    #[error("parse int {0}")]
    ParseInt(#[from] ParseIntError),
    /// The file was not properly formatted
    #[error("ill formed instance")]
    Format,
}

/// Reads a knapsack instance from file: the first line carries the number
/// of items and the capacity, then one `weight profit` line per item.
pub fn read_instance<P: AsRef<Path>>(fname: P) -> Result<Knapsack, Error> {
    let f = File::open(fname)?;
    let f = BufReader::new(f);

    let mut is_first = true;
    let mut n = 0;
    let mut count = 0;
    let mut capacity = 0;
    let mut profit = vec![];
    let mut weight = vec![];

    for line in f.lines() {
        let line = line?;
        if line.starts_with('c') {
            continue;
        }
        if is_first {
            is_first = false;
            let mut ab = line.split_whitespace();
            n = ab.next().ok_or(Error::Format)?.parse()?;
            capacity = ab.next().ok_or(Error::Format)?.parse()?;
        } else {
            if count >= n {
                break;
            }
            let mut ab = line.split_whitespace();
            weight.push(ab.next().ok_or(Error::Format)?.parse()?);
            profit.push(ab.next().ok_or(Error::Format)?.parse()?);
            count += 1;
        }
    }
    Ok(Knapsack { capacity, profit, weight })
}

/// This is your executable's entry point: it puts the pieces together to
/// solve a knapsack instance with a CP-filtered local search.
fn main() {
    let args = Args::parse();
    let problem = read_instance(&args.fname).unwrap();

    let simple = SimpleInit;
    let greedy = GreedyInit;
    let init: &dyn Initialization = if args.greedy { &greedy } else { &simple };

    let mut neighborhood =
        ExhaustiveNeighborhood::new(args.width.min(problem.nb_variables()));
    let mut selection = GreedySelection;
    let stop = IterationLimit(args.iterations);

    let mut no_filter = NoFilter;
    let mut cp_filter;
    let filter: &mut dyn MoveFilter = if args.no_cp {
        &mut no_filter
    } else {
        let dag = build_experiment_dag(&problem);
        cp_filter = CpFilter::new(init_cp_model(&dag, &problem.domains()));
        &mut cp_filter
    };

    let mut solver = LocalSearch::new(
        &problem,
        init,
        &mut neighborhood,
        filter,
        &mut selection,
        &stop,
        args.seed,
    );

    let start = Instant::now();
    let completion = solver.optimize();
    let duration = start.elapsed();

    let taken: Vec<usize> = completion
        .best_solution
        .iter()
        .enumerate()
        .filter(|(_, v)| v.as_bool())
        .map(|(i, _)| i)
        .collect();

    println!("Duration:   {:.3} seconds", duration.as_secs_f32());
    println!("Profit:     {}", -completion.best_value);
    println!("Iterations: {}", solver.statistics().iterations);
    println!("Filtered:   {}", solver.statistics().filtered_out);
    println!("Items:      {taken:?}");
}
