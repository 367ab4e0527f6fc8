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

//! This example shows how to implement a solver for the graph coloring
//! problem using cbls: color the nodes of an undirected graph with at most
//! `max_color` colors so that no edge joins two nodes of the same color,
//! while using the last color as rarely as possible.

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

/// An instance of the graph coloring problem: an undirected graph and the
/// number of colors one is allowed to use.
pub struct Coloring {
    /// The number of nodes of the graph
    pub nb_nodes: usize,
    /// The edges, as (smaller, larger) pairs of 0-based node ids
    pub edges: Vec<(usize, usize)>,
    /// The number of available colors (colors are the values 1..=max_color)
    pub max_color: isize,
}

impl Coloring {
    /// The degree of each node
    fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.nb_nodes];
        for &(u, v) in &self.edges {
            degrees[u] += 1;
            degrees[v] += 1;
        }
        degrees
    }
    /// The neighbors of each node
    fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![vec![]; self.nb_nodes];
        for &(u, v) in &self.edges {
            adjacency[u].push(v);
            adjacency[v].push(u);
        }
        adjacency
    }
}

/// One all-different node per edge counts that edge's conflicts (0 or 1);
/// their sum is the hard feasibility aggregate. The objective charges one
/// unit per node wearing the last color, so that a feasible search drifts
/// towards colorings that could do with one color less.
impl Experiment for Coloring {
    fn nb_variables(&self) -> usize {
        self.nb_nodes
    }
    fn value_kind(&self) -> ValueKind {
        ValueKind::Int
    }
    fn domains(&self) -> Vec<Vec<Value>> {
        (0..self.nb_nodes)
            .map(|_| (1..=self.max_color).map(Value::Int).collect())
            .collect()
    }
    fn build_dag(&self, dag: &mut DagBuilder) {
        let clashes: Vec<Source> = self
            .edges
            .iter()
            .map(|&(u, v)| {
                let pair =
                    vec![Source::Variable(Variable(u)), Source::Variable(Variable(v))];
                Source::Node(dag.all_different(pair))
            })
            .collect();
        let conflicts = dag.sum(clashes);
        dag.hard_constraint(conflicts);

        let nodes: Vec<Source> =
            (0..self.nb_nodes).map(|i| Source::Variable(Variable(i))).collect();
        let last_color_usage = dag.among(nodes, vec![self.max_color]);
        dag.exclude_from_cp(last_color_usage);

        // an infeasible coloring costs more than any feasible one
        let weight = self.nb_nodes as isize + 1;
        let penalty = dag.scalar_product(
            vec![weight, 1],
            vec![Source::Node(conflicts), Source::Node(last_color_usage)],
        );
        dag.exclude_from_cp(penalty);
        dag.objective(vec![Source::Node(penalty)]);
    }
    fn initial_solution(&self) -> Solution {
        vec![Value::Int(1); self.nb_nodes]
    }
    /// The deterministic greedy coloring: nodes by descending degree (ties
    /// by index), each taking the smallest color its colored neighbors
    /// leave available (the last color when none is).
    fn greedy_solution(&self) -> Option<Solution> {
        let degrees = self.degrees();
        let adjacency = self.adjacency();
        let mut order: Vec<usize> = (0..self.nb_nodes).collect();
        order.sort_by_key(|&i| (std::cmp::Reverse(degrees[i]), i));

        let mut colors = vec![0isize; self.nb_nodes];
        for node in order {
            let used: Vec<isize> =
                adjacency[node].iter().map(|&nb| colors[nb]).collect();
            let free = (1..=self.max_color).find(|c| !used.contains(c));
            colors[node] = free.unwrap_or(self.max_color);
        }
        Some(colors.into_iter().map(Value::Int).collect())
    }
}

/// An exhaustive neighborhood sampler that favours adjacent nodes: it draws
/// one node at random and completes the set with its neighbors, so that the
/// explored Cartesian product has a chance to repair both ends of a
/// conflicting edge at once.
pub fn adjacent_sampler(problem: &Coloring, k: usize) -> VariableSampler {
    let adjacency = problem.adjacency();
    Box::new(move |view: SearchView<'_>, rng: &mut rand::rngs::SmallRng| {
        use rand::Rng;
        let seed = rng.gen_range(0..view.solution.len());
        let mut picked = vec![seed];
        for &nb in &adjacency[seed] {
            if picked.len() >= k {
                break;
            }
            picked.push(nb);
        }
        picked.into_iter().map(Variable).collect()
    })
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
    /// The number of colors to color the graph with
    #[clap(short, long, default_value = "3")]
    max_color: isize,
    /// The number of local search iterations
    #[clap(short, long, default_value = "1000")]
    iterations: usize,
    /// The seed of the random source
    #[clap(short, long, default_value = "0")]
    seed: u64,
    /// Disable the CP move filter
    #[clap(long)]
    no_cp: bool,
}

/// The errors that might occur when parsing a coloring instance from file.
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

/// Reads a coloring instance from file: the first line carries the number
/// of nodes and edges, then one `u v` line per edge (1-based node ids).
pub fn read_instance<P: AsRef<Path>>(fname: P, max_color: isize) -> Result<Coloring, Error> {
    let f = File::open(fname)?;
    let f = BufReader::new(f);

    let mut is_first = true;
    let mut nb_nodes = 0;
    let mut nb_edges = 0;
    let mut edges = vec![];

    for line in f.lines() {
        let line = line?;
        if line.starts_with('c') {
            continue;
        }
        if is_first {
            is_first = false;
            let mut ab = line.split_whitespace();
            nb_nodes = ab.next().ok_or(Error::Format)?.parse()?;
            nb_edges = ab.next().ok_or(Error::Format)?.parse()?;
        } else {
            if edges.len() >= nb_edges {
                break;
            }
            let mut ab = line.split_whitespace();
            let u: usize = ab.next().ok_or(Error::Format)?.parse()?;
            let v: usize = ab.next().ok_or(Error::Format)?.parse()?;
            if u == 0 || v == 0 || u > nb_nodes || v > nb_nodes {
                return Err(Error::Format);
            }
            edges.push(((u - 1).min(v - 1), (u - 1).max(v - 1)));
        }
    }
    Ok(Coloring { nb_nodes, edges, max_color })
}

/// This is your executable's entry point: it colors the given graph with a
/// CP-filtered local search started from the greedy coloring.
fn main() {
    let args = Args::parse();
    let problem = read_instance(&args.fname, args.max_color).unwrap();

    let init = GreedyInit;
    let mut neighborhood =
        ExhaustiveNeighborhood::with_sampler(3, adjacent_sampler(&problem, 3));
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
        &init,
        &mut neighborhood,
        filter,
        &mut selection,
        &stop,
        args.seed,
    );

    let start = Instant::now();
    let completion = solver.optimize();
    let duration = start.elapsed();

    let colors: Vec<isize> = completion.best_solution.iter().map(|v| v.as_int()).collect();
    println!("Duration:   {:.3} seconds", duration.as_secs_f32());
    println!("Objective:  {}", completion.best_value);
    println!("Iterations: {}", solver.statistics().iterations);
    println!("Colors:     {colors:?}");
}
