//! Turtle geometry feed.
//!
//! This is the boundary between a graph and whatever turns it into a 3-D
//! scene. Payloads implement [`Feed`]; [`Graph::feed_geometry`] walks the
//! graph depth-first and lets every node move the [`Turtle`] and emit
//! [`Primitive`]s. Nothing here renders anything.
//!
//! Frame conventions: the heading is the turtle's local `+Z`, up is local
//! `+Y` and left is local `+X`. Angles are in degrees.

use glam::{Quat, Vec3};

use crate::graph::Graph;
use crate::node::Node;
use crate::types::NodeId;

/// Position, orientation and pen width of the turtle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurtleState {
    pub pos: Vec3,
    pub orientation: Quat,
    pub width: f32,
}

impl Default for TurtleState {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            width: 1.0,
        }
    }
}

impl TurtleState {
    pub fn heading(&self) -> Vec3 {
        self.orientation * Vec3::Z
    }

    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    pub fn left(&self) -> Vec3 {
        self.orientation * Vec3::X
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Primitive {
    Segment {
        node: NodeId,
        start: Vec3,
        end: Vec3,
        width: f32,
    },
    Point {
        node: NodeId,
        pos: Vec3,
        size: f32,
    },
}

/// The cursor handed to [`Feed::feed`].
#[derive(Debug, Default)]
pub struct Turtle {
    pub state: TurtleState,
    node: NodeId,
    primitives: Vec<Primitive>,
}

impl Turtle {
    pub fn new(state: TurtleState) -> Self {
        Self {
            state,
            node: 0,
            primitives: Vec::new(),
        }
    }

    /// Moves along the heading without drawing.
    pub fn forward(&mut self, length: f32) {
        self.state.pos += self.state.heading() * length;
    }

    /// Rotates around the up axis (yaw).
    pub fn turn(&mut self, degrees: f32) {
        self.rotate(Quat::from_rotation_y(degrees.to_radians()));
    }

    /// Rotates around the left axis.
    pub fn pitch(&mut self, degrees: f32) {
        self.rotate(Quat::from_rotation_x(degrees.to_radians()));
    }

    /// Rotates around the heading.
    pub fn roll(&mut self, degrees: f32) {
        self.rotate(Quat::from_rotation_z(degrees.to_radians()));
    }

    pub fn set_width(&mut self, width: f32) {
        self.state.width = width;
    }

    /// Draws a segment of `length` along the heading and moves to its end.
    pub fn segment(&mut self, length: f32) {
        let start = self.state.pos;
        self.forward(length);
        self.primitives.push(Primitive::Segment {
            node: self.node,
            start,
            end: self.state.pos,
            width: self.state.width,
        });
    }

    /// Marks the current position without moving.
    pub fn point(&mut self, size: f32) {
        self.primitives.push(Primitive::Point {
            node: self.node,
            pos: self.state.pos,
            size,
        });
    }

    fn rotate(&mut self, local: Quat) {
        self.state.orientation = (self.state.orientation * local).normalize();
    }
}

/// Implemented by payloads that contribute geometry. Called once per node;
/// the turtle arrives where the parent left it.
pub trait Feed<D> {
    fn feed(&self, turtle: &mut Turtle, data: &D);
}

/// Everything emitted by one [`Graph::feed_geometry`] pass.
#[derive(Debug, Default, Clone)]
pub struct Scene {
    pub primitives: Vec<Primitive>,
}

impl Scene {
    pub fn segments(&self) -> impl Iterator<Item = (Vec3, Vec3, f32)> + '_ {
        self.primitives.iter().filter_map(|p| match *p {
            Primitive::Segment {
                start, end, width, ..
            } => Some((start, end, width)),
            Primitive::Point { .. } => None,
        })
    }

    /// Axis-aligned bounds of every emitted position.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self.primitives.iter().flat_map(|p| match *p {
            Primitive::Segment { start, end, .. } => [start, end],
            Primitive::Point { pos, .. } => [pos, pos],
        });
        let first = points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }
}

impl<N: Node + Feed<D>, D> Graph<N, D> {
    /// Walks the graph depth-first from `start`. Each child starts from the
    /// state its parent left behind, so siblings never see each other's
    /// moves.
    pub fn feed_geometry_from(&self, start: TurtleState) -> Scene {
        let mut turtle = Turtle::new(start);
        let mut stack = vec![(self.root, start)];
        while let Some((id, state)) = stack.pop() {
            turtle.state = state;
            turtle.node = id;
            let node = self.slot(id);
            node.payload.feed(&mut turtle, &self.data);
            let after = turtle.state;
            stack.extend(node.children.iter().rev().map(|&c| (c, after)));
        }
        Scene {
            primitives: turtle.primitives,
        }
    }

    pub fn feed_geometry(&self) -> Scene {
        self.feed_geometry_from(TurtleState::default())
    }
}
