//! The scenarios the runner executes, one function each. Every scenario
//! returns a small summary so the tests can check it without parsing logs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rgg_core::prelude::*;
use tracing::{info, warn};

use crate::RunConfig;
use crate::plant::{self, PlantParams};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algae {
    A,
    B,
}

impl Node for Algae {
    type Kind = Self;

    fn kind(&self) -> Self {
        *self
    }
}

/// A → A B, B → A. Returns the size after each generation.
pub fn algae(generations: usize) -> anyhow::Result<Vec<usize>> {
    let mut g: Graph<Algae> = Graph::build(Fragment::node(Algae::A))?;
    g.add_rule(Rule::new("a", Algae::A, |_, _| {
        Fragment::node(Algae::A) + Fragment::node(Algae::B)
    }));
    g.add_rule(Rule::new("b", Algae::B, |_, _| Fragment::node(Algae::A)));

    let sizes: Vec<usize> = g
        .rewrite_n(generations)?
        .iter()
        .map(|r| r.total_nodes)
        .collect();

    let word: String = g
        .dfs_order()
        .into_iter()
        .map(|id| match g.node(id) {
            Ok(Algae::A) => 'A',
            Ok(Algae::B) => 'B',
            Err(_) => '?',
        })
        .take(34)
        .collect();
    info!(generations, nodes = g.len(), %word, "algae");
    Ok(sizes)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub state: u8,
}

impl Node for Cell {
    type Kind = ();

    fn kind(&self) -> Self::Kind {}
}

/// A chain of cells where every non-root cell takes its parent's state.
/// Returns the states bottom to top after each generation.
pub fn cells(length: usize, generations: usize) -> anyhow::Result<Vec<Vec<u8>>> {
    let axiom = Fragment::chain(
        (0..length.max(1)).map(|i| Cell {
            state: u8::from(i == 0),
        }),
    );
    let mut g = Graph::build(axiom)?;
    g.add_rule(
        Rule::<Cell, ()>::new("copy-parent", (), |ctx, _| {
            let state = ctx.parent().map_or(0, |p| p.data().state);
            Fragment::node(Cell { state })
        })
        .when(|ctx| !ctx.is_root()),
    );

    let mut history = Vec::with_capacity(generations);
    for _ in 0..generations {
        g.rewrite()?;
        let states: Vec<u8> = g
            .dfs_order()
            .into_iter()
            .map(|id| g.node(id).map(|c| c.state))
            .collect::<Result<_, _>>()?;
        info!(generation = g.generation(), ?states, "cells");
        history.push(states);
    }
    Ok(history)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantSummary {
    pub nodes: usize,
    pub meristems: usize,
    pub leaf_area: f32,
    pub height: f32,
}

/// Grows one plant day by day and feeds it to the turtle.
pub fn plant(days: usize) -> anyhow::Result<PlantSummary> {
    let mut p = plant::seedling(PlantParams::default())?;
    for day in 1..=days {
        let report = plant::step(&mut p)?;
        info!(day, matched = report.matched, nodes = report.total_nodes, "plant");
    }

    let scene = p.feed_geometry();
    let height = scene.bounds().map_or(0.0, |(lo, hi)| hi.z - lo.z);
    let summary = PlantSummary {
        nodes: p.len(),
        meristems: p.nodes_of_kind(plant::OrganKind::Meristem).len(),
        leaf_area: plant::total_leaf_area(&p),
        height,
    };
    info!(
        nodes = summary.nodes,
        meristems = summary.meristems,
        leaf_area = summary.leaf_area,
        height = summary.height,
        primitives = scene.primitives.len(),
        "plant geometry"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestSummary {
    pub trees: usize,
    pub failed: usize,
    pub total_nodes: usize,
}

/// Draws parameters for every tree from a seeded generator, then rewrites
/// the whole forest in parallel. Trees that hit the node cap stop there.
pub fn forest(cfg: &RunConfig) -> anyhow::Result<ForestSummary> {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let engine = EngineConfig {
        max_nodes: Some(cfg.max_nodes_per_tree),
        ..EngineConfig::default()
    };

    let mut forest = Forest::sampled(
        cfg.trees,
        &mut rng,
        |r| PlantParams {
            internode_length: r.random_range(0.8..2.0),
            bud_break_length: r.random_range(1.0..2.5),
            branch_angle: r.random_range(25.0..60.0),
            ..PlantParams::default()
        },
        |params| Ok(plant::seedling(params)?.with_config(engine)),
    )?;

    let results = forest.rewrite_all_n(cfg.plant_generations, cfg.threads);
    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        warn!(failed, trees = forest.len(), "some trees stopped early");
    }

    let summary = ForestSummary {
        trees: forest.len(),
        failed,
        total_nodes: forest.total_nodes(),
    };
    info!(
        trees = summary.trees,
        failed = summary.failed,
        total_nodes = summary.total_nodes,
        threads = cfg.threads,
        "forest"
    );
    Ok(summary)
}
