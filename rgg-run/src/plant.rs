//! A small branching shoot model: apical meristems lay down internodes,
//! leaves and axillary buds; buds break once the internode below them is
//! long enough.

use rgg_core::prelude::*;

/// Per-plant parameters, stored as graph-level data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlantParams {
    pub internode_length: f32,
    pub elongation: f32,
    pub leaf_area: f32,
    pub leaf_growth: f32,
    pub bud_break_length: f32,
    pub branch_angle: f32,
    pub phyllotaxis: f32,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            internode_length: 1.0,
            elongation: 0.25,
            leaf_area: 0.5,
            leaf_growth: 0.1,
            bud_break_length: 1.5,
            branch_angle: 45.0,
            phyllotaxis: 137.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Organ {
    /// `turn` is applied to the first internode the meristem lays down.
    Meristem { vigor: f32, turn: f32 },
    Internode {
        length: f32,
        turn: f32,
        age: u32,
        supported_area: f32,
    },
    Leaf { area: f32 },
    Bud,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrganKind {
    Meristem,
    Internode,
    Leaf,
    Bud,
}

impl Node for Organ {
    type Kind = OrganKind;

    fn kind(&self) -> OrganKind {
        match self {
            Organ::Meristem { .. } => OrganKind::Meristem,
            Organ::Internode { .. } => OrganKind::Internode,
            Organ::Leaf { .. } => OrganKind::Leaf,
            Organ::Bud => OrganKind::Bud,
        }
    }
}

impl Feed<PlantParams> for Organ {
    fn feed(&self, turtle: &mut Turtle, params: &PlantParams) {
        match *self {
            Organ::Internode {
                length,
                turn,
                supported_area,
                ..
            } => {
                turtle.turn(turn);
                turtle.roll(params.phyllotaxis);
                turtle.set_width(0.05 * supported_area.max(0.01).sqrt());
                turtle.segment(length);
            }
            Organ::Leaf { area } => {
                turtle.pitch(-60.0);
                turtle.set_width(area);
                turtle.segment(area.sqrt());
            }
            Organ::Meristem { .. } => turtle.point(0.05),
            Organ::Bud => {}
        }
    }
}

pub type Plant = Graph<Organ, PlantParams>;

fn node(organ: Organ) -> Fragment<Organ> {
    Fragment::node(organ)
}

/// Seedling: a single apical meristem.
pub fn seedling(params: PlantParams) -> Result<Plant, GraphError> {
    let apex = Organ::Meristem {
        vigor: 1.0,
        turn: 0.0,
    };
    let mut plant = Graph::with_data(node(apex), params)?;
    add_rules(&mut plant);
    Ok(plant)
}

pub fn add_rules(plant: &mut Plant) {
    // Meristem -> Internode [Bud] [Leaf] Meristem
    plant.add_rule(Rule::<Organ, PlantParams>::new(
        "apex",
        OrganKind::Meristem,
        |ctx, _| {
            let params = ctx.graph_data();
            let (vigor, turn) = match *ctx.data() {
                Organ::Meristem { vigor, turn } => (vigor, turn),
                _ => (1.0, 0.0),
            };
            node(Organ::Internode {
                length: params.internode_length * vigor,
                turn,
                age: 0,
                supported_area: 0.0,
            }) + branch(node(Organ::Bud))
                + branch(node(Organ::Leaf {
                    area: params.leaf_area * vigor,
                }))
                + node(Organ::Meristem { vigor, turn: 0.0 })
        },
    ));

    // Bud -> Meristem, once the internode carrying it is long enough.
    // The internode is captured so the new axis inherits its vigor from it.
    plant.add_rule(
        Rule::<Organ, PlantParams>::new("bud-break", OrganKind::Bud, |ctx, captured| {
            let params = ctx.graph_data();
            let length = match captured.first().map(|c| c.data()) {
                Some(Organ::Internode { length, .. }) => *length,
                _ => params.bud_break_length,
            };
            let vigor = length / (length + params.bud_break_length);
            node(Organ::Meristem {
                vigor,
                turn: params.branch_angle,
            })
        })
        .capturing(|ctx| {
            let threshold = ctx.graph_data().bud_break_length;
            let carrier = ctx.ancestor(|c| c.kind() == OrganKind::Internode);
            let long_enough = |c: &Context<'_, Organ, PlantParams>| match c.data() {
                Organ::Internode { length, .. } => *length >= threshold,
                _ => false,
            };
            Ok(carrier.filter(long_enough).map(|c| vec![c.id()]))
        }),
    );
}

/// Elongates internodes and ages them, in place.
pub fn elongate(plant: &mut Plant) -> Result<usize, GraphError> {
    let query = Query::new(OrganKind::Internode);
    plant.apply_mut(&query, |_, organ, params| {
        if let Organ::Internode { length, age, .. } = organ {
            *length += params.elongation;
            *age += 1;
        }
    })
}

pub fn grow_leaves(plant: &mut Plant) {
    let growth = plant.data().leaf_growth;
    plant.traverse_dfs_mut(|organ| {
        if let Organ::Leaf { area } = organ {
            *area += growth;
        }
    });
}

/// Every internode must still lead to a meristem; an axis without one has
/// lost its apex.
pub fn check_axes(plant: &Plant) -> Result<(), GraphError> {
    let query = Query::<Organ, PlantParams>::new(OrganKind::Internode).try_when(|c| {
        let (found, _) = c.has_descendant(|d| d.kind() == OrganKind::Meristem);
        if found {
            Ok(false)
        } else {
            Err(GraphError::structural(format!(
                "no meristem found in branch above internode {}",
                c.id()
            )))
        }
    });
    plant.apply(&query).map(|_| ())
}

/// Bottom-up pass: each internode learns the leaf area it carries.
pub fn accumulate_leaf_area(plant: &mut Plant) {
    plant.traverse_post_order_mut(|organ, children| {
        if let Organ::Internode { supported_area, .. } = organ {
            *supported_area = children.iter().map(|c| carried_area(c)).sum();
        }
    });
}

fn carried_area(organ: &Organ) -> f32 {
    match organ {
        Organ::Leaf { area } => *area,
        Organ::Internode { supported_area, .. } => *supported_area,
        _ => 0.0,
    }
}

/// Leaf area above the root, after [`accumulate_leaf_area`].
pub fn total_leaf_area(plant: &Plant) -> f32 {
    let mut total = 0.0;
    plant.traverse_dfs(|organ| {
        if let Organ::Leaf { area } = organ {
            total += area;
        }
    });
    total
}

/// One simulated day: rewrite, then the in-place updates.
pub fn step(plant: &mut Plant) -> Result<RewriteReport, GraphError> {
    let report = plant.rewrite()?;
    elongate(plant)?;
    grow_leaves(plant);
    check_axes(plant)?;
    accumulate_leaf_area(plant);
    Ok(report)
}
