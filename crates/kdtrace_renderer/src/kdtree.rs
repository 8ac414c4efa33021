//! KD-tree spatial index over the scene's shapes.
//!
//! The tree partitions shapes (not space): every shape is referenced by
//! exactly one leaf, and each node stores the union bounding box of the
//! shapes below it. Splits are chosen with the surface area heuristic
//!
//! ```text
//! cost = area(bbox(left)) * |left| + area(bbox(right)) * |right|
//! ```
//!
//! and a node stays a leaf when no candidate split improves on the cost of
//! not splitting, `area(bbox(node)) * |node|`.
//!
//! The tree is immutable once built and is shared by reference between
//! render threads.

use crate::Shape;
use kdtrace_math::{Aabb, Interval, Ray, Vec3};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KdTreeError {
    #[error("Cannot build a kd-tree from an empty shape list")]
    EmptyShapeList,
}

pub type KdTreeResult<T> = Result<T, KdTreeError>;

/// How candidate splits are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// One candidate per axis at the mean centroid coordinate.
    MeanCentroid,
    /// Sort by centroid and evaluate every split position on every axis.
    SahSweep,
}

/// Build parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdTreeConfig {
    pub strategy: SplitStrategy,
    /// Nodes with at most this many shapes are not split
    pub max_leaf_shapes: usize,
    pub max_depth: usize,
    /// Relative cost reduction a split must achieve to be kept
    pub min_cost_improvement: f64,
}

impl Default for KdTreeConfig {
    fn default() -> Self {
        Self {
            strategy: SplitStrategy::SahSweep,
            max_leaf_shapes: 4,
            max_depth: 64,
            min_cost_improvement: 1e-3,
        }
    }
}

/// Tree node: internal with two children, or a leaf holding shape indices.
#[derive(Debug)]
pub enum KdNode {
    Internal {
        bbox: Aabb,
        left: Box<KdNode>,
        right: Box<KdNode>,
    },
    Leaf {
        bbox: Aabb,
        shapes: Vec<usize>,
    },
}

impl KdNode {
    pub fn bbox(&self) -> &Aabb {
        match self {
            KdNode::Internal { bbox, .. } | KdNode::Leaf { bbox, .. } => bbox,
        }
    }
}

/// Counters for a single query, or a sum over many.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Nodes whose bounding box the ray entered
    pub nodes_visited: u64,
    /// Shapes handed to the visitor
    pub shapes_visited: u64,
}

impl AddAssign for QueryStats {
    fn add_assign(&mut self, other: Self) {
        self.nodes_visited += other.nodes_visited;
        self.shapes_visited += other.shapes_visited;
    }
}

/// Shape of the built tree.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KdTreeStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub max_depth: usize,
    /// Shape references across all leaves
    pub total_shapes: usize,
    pub min_leaf_shapes: usize,
    pub max_leaf_shapes: usize,
}

impl KdTreeStats {
    pub fn mean_leaf_shapes(&self) -> f64 {
        if self.leaf_count == 0 {
            0.0
        } else {
            self.total_shapes as f64 / self.leaf_count as f64
        }
    }

    fn record(&mut self, node: &KdNode, depth: usize) {
        self.node_count += 1;
        self.max_depth = self.max_depth.max(depth);
        match node {
            KdNode::Internal { left, right, .. } => {
                self.record(left, depth + 1);
                self.record(right, depth + 1);
            }
            KdNode::Leaf { shapes, .. } => {
                let n = shapes.len();
                self.min_leaf_shapes = if self.leaf_count == 0 {
                    n
                } else {
                    self.min_leaf_shapes.min(n)
                };
                self.max_leaf_shapes = self.max_leaf_shapes.max(n);
                self.leaf_count += 1;
                self.total_shapes += n;
            }
        }
    }
}

/// Per-shape data cached for the build.
#[derive(Debug, Clone, Copy)]
struct BuildItem {
    index: usize,
    bbox: Aabb,
    centroid: Vec3,
}

/// A chosen partition of a node's items.
struct Split {
    left: Vec<BuildItem>,
    right: Vec<BuildItem>,
    cost: f64,
}

/// Immutable kd-tree owning the shapes it indexes.
#[derive(Debug)]
pub struct KdTree {
    shapes: Vec<Shape>,
    root: KdNode,
    stats: KdTreeStats,
}

impl KdTree {
    /// Build with default parameters.
    pub fn new(shapes: Vec<Shape>) -> KdTreeResult<Self> {
        Self::build(shapes, &KdTreeConfig::default())
    }

    /// Build the tree. Fails on an empty shape list.
    pub fn build(shapes: Vec<Shape>, config: &KdTreeConfig) -> KdTreeResult<Self> {
        if shapes.is_empty() {
            return Err(KdTreeError::EmptyShapeList);
        }

        let items = shapes
            .iter()
            .enumerate()
            .map(|(index, shape)| BuildItem {
                index,
                bbox: shape.bounding_box(),
                centroid: shape.centroid(),
            })
            .collect();

        let root = build_node(items, 0, config);

        let mut stats = KdTreeStats::default();
        stats.record(&root, 0);

        log::info!(
            "Built kd-tree ({:?}): {} shapes, {} nodes, {} leaves, depth {}, leaf size {}..{} (mean {:.2})",
            config.strategy,
            shapes.len(),
            stats.node_count,
            stats.leaf_count,
            stats.max_depth,
            stats.min_leaf_shapes,
            stats.max_leaf_shapes,
            stats.mean_leaf_shapes()
        );

        Ok(Self { shapes, root, stats })
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn root(&self) -> &KdNode {
        &self.root
    }

    /// Bounding box of every shape in the tree.
    pub fn bounds(&self) -> Aabb {
        *self.root.bbox()
    }

    pub fn stats(&self) -> &KdTreeStats {
        &self.stats
    }

    /// Call `visitor` for every shape in every leaf whose box (and whose
    /// ancestors' boxes) the ray enters ahead of its origin.
    ///
    /// Shapes are not tested against the ray; the caller does that and
    /// tracks the closest hit.
    pub fn query<F>(&self, ray: &Ray, mut visitor: F) -> QueryStats
    where
        F: FnMut(&Shape),
    {
        self.query_indices(ray, |index| visitor(&self.shapes[index]))
    }

    /// Like `query`, but hands the visitor shape indices.
    pub fn query_indices<F>(&self, ray: &Ray, mut visitor: F) -> QueryStats
    where
        F: FnMut(usize),
    {
        let mut stats = QueryStats::default();
        visit(&self.root, ray, &mut visitor, &mut stats);
        stats
    }
}

fn visit<F: FnMut(usize)>(node: &KdNode, ray: &Ray, visitor: &mut F, stats: &mut QueryStats) {
    if !node.bbox().hit(ray, Interval::new(0.0, f64::INFINITY)) {
        return;
    }
    stats.nodes_visited += 1;

    match node {
        KdNode::Internal { left, right, .. } => {
            visit(left, ray, visitor, stats);
            visit(right, ray, visitor, stats);
        }
        KdNode::Leaf { shapes, .. } => {
            stats.shapes_visited += shapes.len() as u64;
            for &index in shapes {
                visitor(index);
            }
        }
    }
}

fn bounds_of(items: &[BuildItem]) -> Aabb {
    items.iter().fold(Aabb::EMPTY, |mut acc, item| {
        acc.grow(&item.bbox);
        acc
    })
}

fn sah_cost(left: &Aabb, left_count: usize, right: &Aabb, right_count: usize) -> f64 {
    left.surface_area() * left_count as f64 + right.surface_area() * right_count as f64
}

fn build_node(items: Vec<BuildItem>, depth: usize, config: &KdTreeConfig) -> KdNode {
    let bbox = bounds_of(&items);
    let n = items.len();

    if n <= config.max_leaf_shapes || depth >= config.max_depth {
        return make_leaf(bbox, items);
    }

    let unsplit_cost = bbox.surface_area() * n as f64;
    let split = match config.strategy {
        SplitStrategy::MeanCentroid => mean_centroid_split(items.clone()),
        SplitStrategy::SahSweep => sah_sweep_split(items.clone()),
    };

    match split {
        Some(split)
            if !split.left.is_empty()
                && !split.right.is_empty()
                && split.cost < unsplit_cost * (1.0 - config.min_cost_improvement) =>
        {
            KdNode::Internal {
                bbox,
                left: Box::new(build_node(split.left, depth + 1, config)),
                right: Box::new(build_node(split.right, depth + 1, config)),
            }
        }
        _ => make_leaf(bbox, items),
    }
}

fn make_leaf(bbox: Aabb, items: Vec<BuildItem>) -> KdNode {
    KdNode::Leaf {
        bbox,
        shapes: items.into_iter().map(|item| item.index).collect(),
    }
}

/// Split each axis at the mean centroid coordinate; keep the cheapest axis.
fn mean_centroid_split(items: Vec<BuildItem>) -> Option<Split> {
    let n = items.len() as f64;
    let mean = items.iter().fold(Vec3::ZERO, |acc, item| acc + item.centroid) / n;

    let mut best: Option<(usize, f64)> = None;
    for axis in 0..3 {
        let mut left_box = Aabb::EMPTY;
        let mut right_box = Aabb::EMPTY;
        let mut left_count = 0;
        for item in &items {
            if item.centroid[axis] < mean[axis] {
                left_box.grow(&item.bbox);
                left_count += 1;
            } else {
                right_box.grow(&item.bbox);
            }
        }
        let right_count = items.len() - left_count;
        if left_count == 0 || right_count == 0 {
            continue;
        }

        let cost = sah_cost(&left_box, left_count, &right_box, right_count);
        if best.map_or(true, |(_, best_cost)| cost < best_cost) {
            best = Some((axis, cost));
        }
    }

    let (axis, cost) = best?;
    let (left, right): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|item| item.centroid[axis] < mean[axis]);
    Some(Split { left, right, cost })
}

/// Sort by centroid on each axis and evaluate every split position with a
/// running prefix box and a running suffix box.
fn sah_sweep_split(mut items: Vec<BuildItem>) -> Option<Split> {
    let n = items.len();
    let mut best: Option<(usize, usize, f64)> = None;
    let mut prefix = Vec::with_capacity(n);

    for axis in 0..3 {
        sort_on_axis(&mut items, axis);

        prefix.clear();
        let mut acc = Aabb::EMPTY;
        for item in &items {
            acc.grow(&item.bbox);
            prefix.push(acc);
        }

        // Split position k puts items[..k] left and items[k..] right
        let mut suffix = Aabb::EMPTY;
        for k in (1..n).rev() {
            suffix.grow(&items[k].bbox);
            let cost = sah_cost(&prefix[k - 1], k, &suffix, n - k);
            if best.map_or(true, |(_, _, best_cost)| cost < best_cost) {
                best = Some((axis, k, cost));
            }
        }
    }

    let (axis, k, cost) = best?;
    sort_on_axis(&mut items, axis);
    let right = items.split_off(k);
    Some(Split {
        left: items,
        right,
        cost,
    })
}

/// Order by centroid coordinate, ties broken by shape index so the order
/// does not depend on the previous axis.
fn sort_on_axis(items: &mut [BuildItem], axis: usize) {
    items.sort_unstable_by(|a, b| {
        a.centroid[axis]
            .total_cmp(&b.centroid[axis])
            .then(a.index.cmp(&b.index))
    });
}
