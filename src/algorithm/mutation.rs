//! Single-patch greedy mutation
//!
//! A mutation request samples a few perturbations of one leaf, drops every
//! candidate that leaves an image or runs into another leaf, scores the rest and
//! commits the lowest-scoring candidate if it beats the current placement.

use log::debug;

use crate::algorithm::matcher::AppearanceMatcher;
use crate::analysis::features::FeatureProvider;
use crate::io::error::{LayoutError, Result, invalid_parameter};
use crate::math::geometry::{Point, Rect, RotationSet};
use crate::math::probability::RandomSelector;
use crate::spatial::patch::Patch;
use crate::spatial::tree::{NodeId, PatchTree};

/// The closed set of single-patch perturbations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Move the left edge outward (positive amount) or inward
    ExtendLeft,
    /// Move the right edge outward (positive amount) or inward
    ExtendRight,
    /// Move the top edge outward (positive amount) or inward
    ExtendUp,
    /// Move the bottom edge outward (positive amount) or inward
    ExtendDown,
    /// Slide the source footprint horizontally
    ShiftSourceX,
    /// Slide the source footprint vertically
    ShiftSourceY,
    /// Step the rotation index; the amount is rounded to whole steps
    Rotate,
}

impl MutationKind {
    /// Every mutation kind
    pub const ALL: [Self; 7] = [
        Self::ExtendLeft,
        Self::ExtendRight,
        Self::ExtendUp,
        Self::ExtendDown,
        Self::ShiftSourceX,
        Self::ShiftSourceY,
        Self::Rotate,
    ];

    /// Short name used in logs
    pub const fn label(self) -> &'static str {
        match self {
            Self::ExtendLeft => "extend-left",
            Self::ExtendRight => "extend-right",
            Self::ExtendUp => "extend-up",
            Self::ExtendDown => "extend-down",
            Self::ShiftSourceX => "shift-source-x",
            Self::ShiftSourceY => "shift-source-y",
            Self::Rotate => "rotate",
        }
    }
}

/// One concrete perturbation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mutation {
    /// What to change
    pub kind: MutationKind,
    /// Signed step: millimetres for edges and shifts, rotation steps for [`MutationKind::Rotate`]
    pub amount: f64,
}

impl Mutation {
    /// Create a mutation
    pub const fn new(kind: MutationKind, amount: f64) -> Self {
        Self { kind, amount }
    }
}

/// Result of a mutation request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MutationOutcome {
    /// A candidate replaced the leaf
    Committed {
        /// Kind of the winning mutation
        kind: MutationKind,
        /// Appearance distance of the committed patch
        score: f64,
    },
    /// No legal candidate improved on the current placement
    Unchanged,
}

/// Apply a mutation to a patch
///
/// Edge moves act in the patch's local frame, so the source footprint grows or
/// shrinks on the matching side whatever the rotation. Returns `None` when the
/// mutation is a no-op or would collapse the patch.
///
/// # Errors
///
/// Returns an error if the patch's rotation index is unknown
pub fn apply_mutation(
    patch: &Patch,
    mutation: Mutation,
    rotations: &RotationSet,
) -> Result<Option<Patch>> {
    let amount = mutation.amount;
    if !amount.is_finite() || amount == 0.0 {
        return Ok(None);
    }
    let (w, h) = (patch.dimension.width, patch.dimension.height);
    let local = match mutation.kind {
        MutationKind::ExtendLeft => Rect::new(-amount, 0.0, w, h),
        MutationKind::ExtendRight => Rect::new(0.0, 0.0, w + amount, h),
        MutationKind::ExtendUp => Rect::new(0.0, -amount, w, h),
        MutationKind::ExtendDown => Rect::new(0.0, 0.0, w, h + amount),
        MutationKind::ShiftSourceX => {
            return Ok(Some(shifted(patch, Point::new(amount, 0.0))));
        }
        MutationKind::ShiftSourceY => {
            return Ok(Some(shifted(patch, Point::new(0.0, amount))));
        }
        MutationKind::Rotate => {
            rotations.get(patch.rotation_index)?;
            let steps = amount.round() as isize;
            let rotation_index = rotations.step(patch.rotation_index, steps);
            if steps == 0 || rotation_index == patch.rotation_index {
                return Ok(None);
            }
            return Ok(Some(Patch {
                rotation_index,
                matching: None,
                ..*patch
            }));
        }
    };
    if !local.size().is_positive() {
        return Ok(None);
    }
    patch.sub_patch(&local, rotations).map(Some)
}

fn shifted(patch: &Patch, delta: Point) -> Patch {
    Patch {
        source_offset: patch.source_offset + delta,
        matching: None,
        ..*patch
    }
}

/// Draw `sample_count` distinct mutation kinds with random signed steps
///
/// Edge and shift amounts are uniform in `[-step_mm, step_mm]`; rotations take
/// `1..=rotation_steps` steps in a random direction.
pub fn propose_mutations(
    selector: &mut RandomSelector,
    sample_count: usize,
    step_mm: f64,
    rotation_steps: usize,
) -> Vec<Mutation> {
    let mut kinds = MutationKind::ALL;
    selector.shuffle(&mut kinds);
    kinds
        .into_iter()
        .take(sample_count)
        .map(|kind| {
            let sign = if selector.coin() { 1.0 } else { -1.0 };
            let amount = match kind {
                MutationKind::Rotate => (1 + selector.index(rotation_steps.max(1))) as f64,
                _ => selector.uniform(0.0, step_mm).max(f64::EPSILON),
            };
            Mutation::new(kind, sign * amount)
        })
        .collect()
}

/// Try each mutation on a leaf and commit the best legal improvement
///
/// Candidates failing bounds, minimum size or overlap checks are skipped without
/// scoring. A current placement that cannot be scored counts as infinitely bad.
/// On rejection the tree is left untouched.
///
/// # Errors
///
/// Returns an error if `leaf` is not a live leaf or a patch involved is malformed
pub fn mutate_leaf<F: FeatureProvider + ?Sized>(
    tree: &mut PatchTree,
    leaf: NodeId,
    mutations: &[Mutation],
    matcher: &AppearanceMatcher<'_, F>,
    min_dimension: f64,
) -> Result<MutationOutcome> {
    let current = match tree.patch(leaf) {
        Some(patch) if tree.is_leaf(leaf) => *patch,
        _ => {
            return Err(invalid_parameter(
                "selection",
                &leaf.index(),
                &"mutation target must be a live leaf",
            ));
        }
    };
    let current_score = score_or_reject(matcher, &current, tree)?.unwrap_or(f64::INFINITY);

    let mut best: Option<(MutationKind, Patch, f64)> = None;
    for &mutation in mutations {
        let Some(candidate) = apply_mutation(&current, mutation, &tree.geometry().rotations)?
        else {
            continue;
        };
        let placement = tree.check_placement(&candidate, &[leaf], min_dimension)?;
        if !placement.is_legal() {
            debug!(
                "Rejected {} by {:.3} on node {}: {placement:?}",
                mutation.kind.label(),
                mutation.amount,
                leaf.index()
            );
            continue;
        }
        let Some(score) = score_or_reject(matcher, &candidate, tree)? else {
            continue;
        };
        if best.is_none_or(|(_, _, best_score)| score < best_score) {
            best = Some((mutation.kind, candidate, score));
        }
    }

    match best {
        Some((kind, mut candidate, score)) if score < current_score => {
            candidate.matching = Some(score);
            tree.commit(leaf, candidate)?;
            debug!(
                "Committed {} on node {} ({current_score:.6} -> {score:.6})",
                kind.label(),
                leaf.index()
            );
            Ok(MutationOutcome::Committed { kind, score })
        }
        _ => Ok(MutationOutcome::Unchanged),
    }
}

/// Score a patch, mapping sampling failures to `None`
pub(crate) fn score_or_reject<F: FeatureProvider + ?Sized>(
    matcher: &AppearanceMatcher<'_, F>,
    patch: &Patch,
    tree: &PatchTree,
) -> Result<Option<f64>> {
    match matcher.score(patch, tree.geometry()) {
        Ok(score) => Ok(Some(score)),
        Err(LayoutError::OutOfBounds { .. }) => Ok(None),
        Err(error) => Err(error),
    }
}
