//! Guided recursive split
//!
//! Leaves carrying the most edge energy are the ones worth subdividing. A leaf is
//! cut along the straight line that best follows the energy underneath it, so the
//! new seam lands where the target already has an edge.

use std::cmp::Ordering;

use log::debug;

use crate::algorithm::matcher::AppearanceMatcher;
use crate::algorithm::mutation::score_or_reject;
use crate::analysis::features::{EnergyProvider, FeatureProvider};
use crate::io::error::{Result, invalid_parameter, out_of_bounds};
use crate::math::correlation::{Axis, Peak, best_peak, line_profile};
use crate::math::geometry::{PixelRect, Rect, RotationSet};
use crate::math::probability::RandomSelector;
use crate::spatial::grid::Space;
use crate::spatial::patch::Patch;
use crate::spatial::tree::{NodeId, PatchTree};

/// Knobs of the split heuristic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitParams {
    /// Smallest side either child may have (mm)
    pub min_dimension: f64,
    /// Exponent applied to leaf energy before weighted sampling
    pub sampling_exponent: f64,
    /// Try the other axis when the preferred cut is illegal
    pub alternate_axis_fallback: bool,
}

/// Result of splitting one leaf
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitOutcome {
    /// The leaf was replaced by two children
    Split {
        /// The retired leaf
        parent: NodeId,
        /// New leaves, top/left first
        children: (NodeId, NodeId),
        /// Orientation of the cut
        axis: Axis,
        /// Cut position from the parent's top or left edge (mm)
        offset_mm: f64,
    },
    /// No legal cut was found this round
    Abandoned {
        /// The untouched leaf
        leaf: NodeId,
    },
}

/// Candidate cut through a leaf
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cut {
    /// Orientation of the cut
    pub axis: Axis,
    /// Cut position from the patch's top or left edge (mm)
    pub offset_mm: f64,
    /// Line correlation at the cut
    pub score: f64,
}

/// Pixel rectangle of a patch's target footprint
fn target_rect(patch: &Patch, px_per_mm: f64, extent: (usize, usize)) -> Result<PixelRect> {
    let rect = PixelRect::from_mm(&patch.target_bounds(), px_per_mm)
        .ok_or_else(|| out_of_bounds(Space::Target, PixelRect::default(), extent))?;
    if rect.fits_within(extent) {
        Ok(rect)
    } else {
        Err(out_of_bounds(Space::Target, rect, extent))
    }
}

/// Total energy under a leaf's target footprint
///
/// # Errors
///
/// Returns an error if the node is unknown or its footprint leaves the target
pub fn leaf_energy<E: EnergyProvider + ?Sized>(
    tree: &PatchTree,
    leaf: NodeId,
    energy: &E,
) -> Result<f64> {
    let patch = tree
        .patch(leaf)
        .ok_or_else(|| invalid_parameter("node", &leaf.index(), &"no such node"))?;
    let geometry = tree.geometry();
    let rect = target_rect(patch, geometry.px_per_mm, geometry.target_extent)?;
    Ok(energy
        .energy(rect)?
        .iter()
        .map(|&v| f64::from(v))
        .sum())
}

/// Draw up to `count` leaves, biased toward high energy
///
/// Leaves are ranked by energy, highest first, and sampled without replacement
/// with weights `energy^exponent`.
///
/// # Errors
///
/// Returns an error if a leaf's footprint cannot be read from the energy map
pub fn select_leaves<E: EnergyProvider + ?Sized>(
    tree: &PatchTree,
    energy: &E,
    selector: &mut RandomSelector,
    count: usize,
    exponent: f64,
) -> Result<Vec<NodeId>> {
    let mut ranked = tree
        .leaves()
        .into_iter()
        .map(|leaf| Ok((leaf, leaf_energy(tree, leaf, energy)?)))
        .collect::<Result<Vec<_>>>()?;
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let weights: Vec<f64> = ranked
        .iter()
        .map(|(_, score)| score.max(0.0).powf(exponent))
        .collect();
    Ok(selector
        .weighted_sample(&weights, count)
        .into_iter()
        .filter_map(|i| ranked.get(i).map(|(leaf, _)| *leaf))
        .collect())
}

/// Best cut per axis, strongest first
///
/// Each axis is profiled over the leaf's energy window; the margin keeps both
/// children at least `min_dimension` wide.
///
/// # Errors
///
/// Returns an error if the footprint cannot be read from the energy map
pub fn rank_cuts<E: EnergyProvider + ?Sized>(
    patch: &Patch,
    tree: &PatchTree,
    energy: &E,
    min_dimension: f64,
) -> Result<Vec<Cut>> {
    let geometry = tree.geometry();
    let ppm = geometry.px_per_mm;
    let rect = target_rect(patch, ppm, geometry.target_extent)?;
    let window = energy.energy(rect)?;
    let margin = (min_dimension * ppm).ceil().max(1.0) as usize;

    let mut cuts: Vec<Cut> = [Axis::Vertical, Axis::Horizontal]
        .into_iter()
        .filter_map(|axis| {
            let Peak { offset, score } = best_peak(&line_profile(window.view(), axis), margin)?;
            let (origin_px, origin_mm) = match axis {
                Axis::Vertical => (rect.x, patch.target_offset.x),
                Axis::Horizontal => (rect.y, patch.target_offset.y),
            };
            let offset_mm = (origin_px + offset) as f64 / ppm - origin_mm;
            Some(Cut {
                axis,
                offset_mm,
                score,
            })
        })
        .collect();
    cuts.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    Ok(cuts)
}

/// The two children a cut produces, top/left first
///
/// # Errors
///
/// Returns an error if the cut leaves an empty side or the rotation is unknown
pub fn cut_children(patch: &Patch, cut: &Cut, rotations: &RotationSet) -> Result<(Patch, Patch)> {
    let (w, h) = (patch.dimension.width, patch.dimension.height);
    let at = cut.offset_mm;
    let (first, second) = match cut.axis {
        Axis::Vertical => (Rect::new(0.0, 0.0, at, h), Rect::new(at, 0.0, w, h)),
        Axis::Horizontal => (Rect::new(0.0, 0.0, w, at), Rect::new(0.0, at, w, h)),
    };
    Ok((
        patch.sub_patch(&first, rotations)?,
        patch.sub_patch(&second, rotations)?,
    ))
}

/// Split one leaf along its best legal cut
///
/// Both children must pass the same placement checks as a mutation, with the
/// parent ignored as an obstacle. On success the parent's grid entries are
/// replaced by the children's and both children are scored.
///
/// # Errors
///
/// Returns an error if `leaf` is not a live leaf or a patch involved is malformed
pub fn split_leaf<E, F>(
    tree: &mut PatchTree,
    leaf: NodeId,
    energy: &E,
    matcher: &AppearanceMatcher<'_, F>,
    params: &SplitParams,
) -> Result<SplitOutcome>
where
    E: EnergyProvider + ?Sized,
    F: FeatureProvider + ?Sized,
{
    let parent = match tree.patch(leaf) {
        Some(patch) if tree.is_leaf(leaf) => *patch,
        _ => {
            return Err(invalid_parameter(
                "selection",
                &leaf.index(),
                &"split target must be a live leaf",
            ));
        }
    };

    let cuts = rank_cuts(&parent, tree, energy, params.min_dimension)?;
    let attempts = if params.alternate_axis_fallback { cuts.len() } else { 1 };

    for cut in cuts.iter().take(attempts) {
        let (first, second) = cut_children(&parent, cut, &tree.geometry().rotations)?;
        let mut legal = true;
        for child in [&first, &second] {
            let placement = tree.check_placement(child, &[leaf], params.min_dimension)?;
            if !placement.is_legal() {
                debug!(
                    "Cut {:?} at {:.3} mm on node {} rejected: {placement:?}",
                    cut.axis,
                    cut.offset_mm,
                    leaf.index()
                );
                legal = false;
                break;
            }
        }
        if !legal {
            continue;
        }

        tree.unregister(leaf)?;
        let Some(children) = tree.add(leaf, first, second) else {
            tree.register(leaf)?;
            break;
        };
        for child in [children.0, children.1] {
            tree.register(child)?;
            let patch = tree.patch(child).copied();
            if let Some(score) = patch
                .map(|p| score_or_reject(matcher, &p, tree))
                .transpose()?
                .flatten()
            {
                tree.set_matching(child, score);
            }
        }
        return Ok(SplitOutcome::Split {
            parent: leaf,
            children,
            axis: cut.axis,
            offset_mm: cut.offset_mm,
        });
    }

    debug!("Split of node {} abandoned", leaf.index());
    Ok(SplitOutcome::Abandoned { leaf })
}
