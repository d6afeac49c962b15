//! Batch regeneration of a regular tiling
//!
//! Rebuilds the whole layout: one root leaf over the target, split into columns
//! and then rows of roughly `cell_mm`, after which every leaf gets a fresh source
//! placement. The loop polls a [`CancellationToken`] at every outer step; work
//! already committed when it fires is kept.
//!
//! A leaf enters the source grid only once it holds a legal source placement, so
//! leaves still waiting for a seed are filed in the target grid alone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::algorithm::matcher::AppearanceMatcher;
use crate::algorithm::seeding::{SeedParams, SeedStrategy, seed_leaf};
use crate::algorithm::split::{Cut, cut_children};
use crate::analysis::features::FeatureProvider;
use crate::io::error::{LayoutError, Result, invalid_parameter};
use crate::math::correlation::Axis;
use crate::math::geometry::{Point, Size};
use crate::math::probability::RandomSelector;
use crate::spatial::grid::Space;
use crate::spatial::patch::Patch;
use crate::spatial::tree::{ClearScope, NodeId, PatchTree};

/// Shared stop flag for a running batch operation
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A token that has not fired
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the batch operation to stop at its next check
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether [`CancellationToken::cancel`] has been called on any clone
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Receives progress of long-running batch work
pub trait ProgressSink {
    /// A stage with `total` steps starts
    fn begin(&mut self, stage: &str, total: usize);
    /// `steps` more steps of the current stage are done
    fn advance(&mut self, steps: usize);
    /// The current stage ended, completed or not
    fn finish(&mut self);
}

/// Discards progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn begin(&mut self, _stage: &str, _total: usize) {}
    fn advance(&mut self, _steps: usize) {}
    fn finish(&mut self) {}
}

/// What a regeneration run achieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegenerationReport {
    /// Columns of the regular tiling
    pub columns: usize,
    /// Rows of the regular tiling
    pub rows: usize,
    /// Live leaves when the run ended
    pub leaves: usize,
    /// Leaves holding a legal source placement
    pub seeded: usize,
    /// The run stopped early
    pub cancelled: bool,
}

/// Rebuild `tree` as a regular tiling and seed every leaf
///
/// On success every leaf is legal and indexed in both grids. A cancelled run
/// reports `seeded < leaves`; the unseeded leaves are indexed in the target grid
/// only.
///
/// # Errors
///
/// Returns [`LayoutError::SourceExhausted`], with the tree cleared, if a leaf
/// finds no legal source placement. Also fails if `cell_mm` is not positive or
/// smaller than the minimum patch dimension, or a patch involved is malformed
pub fn regenerate_regular<F: FeatureProvider + ?Sized>(
    tree: &mut PatchTree,
    cell_mm: f64,
    strategy: SeedStrategy,
    selector: &mut RandomSelector,
    matcher: &AppearanceMatcher<'_, F>,
    params: &SeedParams,
    token: &CancellationToken,
    progress: &mut dyn ProgressSink,
) -> Result<RegenerationReport> {
    if !(cell_mm.is_finite() && cell_mm > 0.0) || cell_mm < params.min_dimension {
        return Err(invalid_parameter(
            "cell_mm",
            &cell_mm,
            &format!(
                "cell size must be positive and at least {} mm",
                params.min_dimension
            ),
        ));
    }

    tree.clear(ClearScope::Both);
    let target = tree.geometry().bounds_mm(Space::Target);
    let root_patch = Patch::new(
        Point::default(),
        Point::default(),
        Size::new(target.width(), target.height()),
        0,
    );
    let Some(root) = tree.add_root(root_patch) else {
        return Err(invalid_parameter("tree", &tree.len(), &"tree was not cleared"));
    };
    tree.register_in(root, Space::Target)?;

    let columns = ((target.width() / cell_mm).floor() as usize).max(1);
    let rows = ((target.height() / cell_mm).floor() as usize).max(1);
    let mut report = RegenerationReport {
        columns,
        rows,
        ..RegenerationReport::default()
    };

    progress.begin("split", (columns - 1) + columns * (rows - 1));
    let mut column_leaves = Vec::with_capacity(columns);
    let mut remainder = root;
    for _ in 1..columns {
        if token.is_cancelled() {
            return Ok(cancelled(tree, report, progress));
        }
        let (column, rest) = peel(tree, remainder, Axis::Vertical, cell_mm)?;
        column_leaves.push(column);
        remainder = rest;
        progress.advance(1);
    }
    column_leaves.push(remainder);

    for column in column_leaves {
        let mut remainder = column;
        for _ in 1..rows {
            if token.is_cancelled() {
                return Ok(cancelled(tree, report, progress));
            }
            let (_, rest) = peel(tree, remainder, Axis::Horizontal, cell_mm)?;
            remainder = rest;
            progress.advance(1);
        }
    }
    progress.finish();

    let leaves = tree.leaves();
    report.leaves = leaves.len();
    progress.begin("seed", leaves.len());
    for leaf in leaves {
        if token.is_cancelled() {
            return Ok(cancelled(tree, report, progress));
        }
        if seed_leaf(tree, leaf, strategy, selector, matcher, params)?.is_none() {
            progress.finish();
            tree.clear(ClearScope::Both);
            warn!(
                "Source exhausted at node {} after placing {} of {} leaves",
                leaf.index(),
                report.seeded,
                report.leaves
            );
            return Err(LayoutError::SourceExhausted {
                node: leaf.index(),
                placed: report.seeded,
                leaves: report.leaves,
            });
        }
        report.seeded += 1;
        progress.advance(1);
    }
    progress.finish();

    info!(
        "Regenerated {}x{} tiling with {} leaves",
        report.columns, report.rows, report.leaves
    );
    Ok(report)
}

/// Cut `cell_mm` off the top or left of a leaf and file both halves in the target grid
fn peel(tree: &mut PatchTree, leaf: NodeId, axis: Axis, cell_mm: f64) -> Result<(NodeId, NodeId)> {
    let patch = tree
        .patch(leaf)
        .copied()
        .ok_or_else(|| invalid_parameter("node", &leaf.index(), &"no such node"))?;
    let cut = Cut {
        axis,
        offset_mm: cell_mm,
        score: 0.0,
    };
    let (first, second) = cut_children(&patch, &cut, &tree.geometry().rotations)?;
    tree.unregister_in(leaf, Space::Target)?;
    let children = tree
        .add(leaf, first, second)
        .ok_or_else(|| invalid_parameter("node", &leaf.index(), &"only leaves can be split"))?;
    tree.register_in(children.0, Space::Target)?;
    tree.register_in(children.1, Space::Target)?;
    Ok(children)
}

fn cancelled(
    tree: &PatchTree,
    mut report: RegenerationReport,
    progress: &mut dyn ProgressSink,
) -> RegenerationReport {
    progress.finish();
    report.leaves = tree.leaves().len();
    report.cancelled = true;
    warn!(
        "Regeneration cancelled with {} leaves, {} seeded",
        report.leaves, report.seeded
    );
    report
}
