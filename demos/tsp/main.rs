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

//! This example shows how to implement a solver for the traveling salesman
//! problem using cbls. Position i of the tour holds a city; the tour cost
//! is decomposed leg by leg with element invariants over the flattened
//! distance matrix, and an all-different invariant keeps the assignment a
//! permutation.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    num::ParseIntError,
    path::Path,
    time::Instant,
};

use clap::Parser;
use cbls::*;

#[cfg(test)]
mod tests;

/// An instance of the traveling salesman problem: a (square, not
/// necessarily symmetric) distance matrix.
pub struct Tsp {
    /// distance[i][j] is the cost of traveling from city i to city j
    pub distance: Vec<Vec<isize>>,
}

impl Tsp {
    fn nb_cities(&self) -> usize {
        self.distance.len()
    }
    /// The distance matrix, flattened row-major (the form the element
    /// invariants index into)
    fn flat_distance(&self) -> Vec<isize> {
        self.distance.iter().flatten().copied().collect()
    }
    /// The cost of the tour visiting the cities in the given order
    pub fn tour_cost(&self, tour: &[Value]) -> isize {
        let n = self.nb_cities();
        (0..n)
            .map(|i| {
                let from = tour[i].as_int() as usize;
                let to = tour[(i + 1) % n].as_int() as usize;
                self.distance[from][to]
            })
            .sum()
    }
}

/// Each leg (i, i+1) is priced by an element invariant over the flattened
/// matrix, indexed by `n * city_i + city_(i+1)` (a scalar product of the
/// two position variables). The permutation structure is one all-different
/// over all positions, kept hard.
impl Experiment for Tsp {
    fn nb_variables(&self) -> usize {
        self.nb_cities()
    }
    fn value_kind(&self) -> ValueKind {
        ValueKind::Int
    }
    fn domains(&self) -> Vec<Vec<Value>> {
        let n = self.nb_cities() as isize;
        (0..n).map(|_| (0..n).map(Value::Int).collect()).collect()
    }
    fn build_dag(&self, dag: &mut DagBuilder) {
        let n = self.nb_cities();
        let positions: Vec<Source> =
            (0..n).map(|i| Source::Variable(Variable(i))).collect();

        let duplicates = dag.all_different(positions.clone());
        dag.hard_constraint(duplicates);

        let flat = self.flat_distance();
        let legs: Vec<Source> = (0..n)
            .map(|i| {
                let index = dag.scalar_product(
                    vec![n as isize, 1],
                    vec![positions[i], positions[(i + 1) % n]],
                );
                dag.exclude_from_cp(index);
                let leg = dag.element(flat.clone(), Source::Node(index));
                dag.exclude_from_cp(leg);
                Source::Node(leg)
            })
            .collect();
        let cost = dag.sum(legs);
        dag.exclude_from_cp(cost);
        dag.objective(vec![Source::Node(cost)]);
    }
    fn initial_solution(&self) -> Solution {
        (0..self.nb_cities() as isize).map(Value::Int).collect()
    }
    /// Swap moves preserve the permutation structure by themselves, so the
    /// CP filter would only re-prove what the neighborhood guarantees.
    fn use_cp(&self) -> bool {
        false
    }
    /// The nearest-neighbor tour from city 0.
    fn greedy_solution(&self) -> Option<Solution> {
        let n = self.nb_cities();
        let mut tour = vec![0usize];
        let mut left: Vec<usize> = (1..n).collect();
        while !left.is_empty() {
            let here = *tour.last().unwrap();
            let (pos, _) = left
                .iter()
                .enumerate()
                .min_by_key(|(_, &city)| self.distance[here][city])
                .unwrap();
            tour.push(left.remove(pos));
        }
        Some(tour.into_iter().map(|c| Value::Int(c as isize)).collect())
    }
}

// #########################################################################
// # INSTANCE READING, COMMAND LINE PROCESSING AND THE MAIN FUNCTION       #
// #########################################################################

/// This structure uses `clap-derive` annotations and defines the arguments
/// that can be passed on to the executable solver.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path to the instance file
    fname: String,
    /// The number of local search iterations
    #[clap(short, long, default_value = "5000")]
    iterations: usize,
    /// The seed of the random source
    #[clap(short, long, default_value = "0")]
    seed: u64,
    /// Anneal instead of plain greedy descent
    #[clap(short, long)]
    anneal: bool,
}

/// The errors that might occur when parsing a TSP instance from file.
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

/// Reads a TSP instance from file: the first line carries the number of
/// cities, then one row of the distance matrix per line.
pub fn read_instance<P: AsRef<Path>>(fname: P) -> Result<Tsp, Error> {
    let f = File::open(fname)?;
    let f = BufReader::new(f);

    let mut is_first = true;
    let mut n = 0;
    let mut distance: Vec<Vec<isize>> = vec![];

    for line in f.lines() {
        let line = line?;
        if line.starts_with('c') {
            continue;
        }
        if is_first {
            is_first = false;
            n = line.split_whitespace().next().ok_or(Error::Format)?.parse()?;
        } else {
            if distance.len() >= n {
                break;
            }
            let row = line
                .split_whitespace()
                .map(|tok| tok.parse())
                .collect::<Result<Vec<isize>, _>>()?;
            if row.len() != n {
                return Err(Error::Format);
            }
            distance.push(row);
        }
    }
    if distance.len() != n {
        return Err(Error::Format);
    }
    Ok(Tsp { distance })
}

/// This is your executable's entry point: it optimizes a tour with swap
/// moves started from the nearest-neighbor solution. Swaps preserve the
/// permutation structure, so the CP filter is left out of this demo
/// (`use_cp` would only re-prove what the neighborhood guarantees).
fn main() {
    let args = Args::parse();
    let problem = read_instance(&args.fname).unwrap();

    let init = GreedyInit;
    let mut neighborhood = SwapNeighborhood;
    let mut greedy = GreedySelection;
    let mut annealing = SimulatedAnnealing::new(50.0, 0.995, 0.0);
    let selection: &mut dyn MoveSelection =
        if args.anneal { &mut annealing } else { &mut greedy };
    let stop = IterationLimit(args.iterations);
    let mut filter = NoFilter;

    let mut solver = LocalSearch::new(
        &problem,
        &init,
        &mut neighborhood,
        &mut filter,
        selection,
        &stop,
        args.seed,
    );

    let start = Instant::now();
    let completion = solver.optimize();
    let duration = start.elapsed();

    let tour: Vec<isize> = completion.best_solution.iter().map(|v| v.as_int()).collect();
    println!("Duration:   {:.3} seconds", duration.as_secs_f32());
    println!("Cost:       {}", completion.best_value);
    println!("Iterations: {}", solver.statistics().iterations);
    println!("Tour:       {tour:?}");
}
