//! Many independent graphs processed in parallel.
//!
//! A [`Forest`] is the data-parallel mode: one graph per plant, each
//! rewritten on a worker thread. Graphs share nothing mutable; per-plant
//! parameters are drawn up front by [`Forest::sampled`], before any worker
//! starts. A graph whose rewrite fails is reported and left behind, the rest
//! of the batch carries on.

use std::thread;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::GraphError;
use crate::graph::Graph;
use crate::node::Node;
use crate::rewrite::RewriteReport;

#[derive(Debug)]
pub struct Forest<N: Node, D = ()> {
    pub graphs: Vec<Graph<N, D>>,
}

impl<N: Node, D> Forest<N, D> {
    pub fn new(graphs: Vec<Graph<N, D>>) -> Self {
        Self { graphs }
    }

    /// Builds `count` graphs, drawing one parameter set per graph from `rng`
    /// with `sample` and handing it to `build`.
    pub fn sampled<R: Rng, P>(
        count: usize,
        rng: &mut R,
        mut sample: impl FnMut(&mut R) -> P,
        mut build: impl FnMut(P) -> Result<Graph<N, D>, GraphError>,
    ) -> Result<Self, GraphError> {
        let graphs = (0..count)
            .map(|_| build(sample(rng)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { graphs })
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Live nodes across all graphs.
    pub fn total_nodes(&self) -> usize {
        self.graphs.iter().map(Graph::len).sum()
    }
}

impl<N, D> Forest<N, D>
where
    N: Node + Send,
    D: Send,
{
    /// One rewrite per graph on up to `threads` workers. Results are in
    /// graph order.
    pub fn rewrite_all(&mut self, threads: usize) -> Vec<Result<RewriteReport, GraphError>> {
        self.run_parallel(threads, |index, graph| {
            graph.rewrite().inspect_err(|e| {
                warn!(graph = index, error = %e, "rewrite failed; graph left unchanged");
            })
        })
    }

    /// `n` rewrites per graph. A graph stops at its first failure and reports
    /// it; the others keep going.
    pub fn rewrite_all_n(
        &mut self,
        n: usize,
        threads: usize,
    ) -> Vec<Result<Vec<RewriteReport>, GraphError>> {
        self.run_parallel(threads, |index, graph| {
            graph.rewrite_n(n).inspect_err(|e| {
                warn!(
                    graph = index,
                    generation = graph.generation(),
                    error = %e,
                    "rewrite failed; graph stopped"
                );
            })
        })
    }

    /// Applies `job` to every graph, chunked over scoped worker threads.
    fn run_parallel<T: Send>(
        &mut self,
        threads: usize,
        job: impl Fn(usize, &mut Graph<N, D>) -> T + Sync,
    ) -> Vec<T> {
        if self.graphs.is_empty() {
            return Vec::new();
        }

        let workers = threads.clamp(1, self.graphs.len());
        let chunk = self.graphs.len().div_ceil(workers);
        debug!(graphs = self.graphs.len(), workers, chunk, "forest pass");

        let job = &job;
        thread::scope(|s| {
            let handles: Vec<_> = self
                .graphs
                .chunks_mut(chunk)
                .enumerate()
                .map(|(c, graphs)| {
                    s.spawn(move || {
                        graphs
                            .iter_mut()
                            .enumerate()
                            .map(|(i, g)| job(c * chunk + i, g))
                            .collect::<Vec<T>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    }
}
