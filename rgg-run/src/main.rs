//! Headless runner for the growth-graph scenarios.
//!
//! Runs algae, cell propagation, a single branching plant and a parallel
//! forest in turn, logging what each produced. Set `RUST_LOG=debug` to see
//! every rewrite generation.

mod plant;
mod scenes;

use std::num::NonZeroUsize;
use std::thread;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Settings for one run of every scenario.
#[derive(Clone, Copy, Debug)]
pub struct RunConfig {
    pub algae_generations: usize,
    pub cell_count: usize,
    pub cell_generations: usize,
    /// Days for the single plant, generations for each forest tree.
    pub plant_generations: usize,
    pub trees: usize,
    pub threads: usize,
    pub seed: u64,
    pub max_nodes_per_tree: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            algae_generations: 7,
            cell_count: 5,
            cell_generations: 4,
            plant_generations: 8,
            trees: 32,
            threads: thread::available_parallelism().map_or(1, NonZeroUsize::get),
            seed: 0x5ca1ab1e,
            max_nodes_per_tree: 400,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = RunConfig::default();
    info!(?cfg, "starting");

    let sizes = scenes::algae(cfg.algae_generations)?;
    info!(?sizes, "algae sizes");

    scenes::cells(cfg.cell_count, cfg.cell_generations)?;

    let plant = scenes::plant(cfg.plant_generations)?;
    info!(?plant, "plant done");

    let forest = scenes::forest(&cfg)?;
    info!(?forest, "forest done");

    Ok(())
}
