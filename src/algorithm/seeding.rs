//! Source placement strategies for fresh leaves

use clap::ValueEnum;
use log::debug;

use crate::algorithm::matcher::AppearanceMatcher;
use crate::algorithm::mutation::score_or_reject;
use crate::analysis::features::FeatureProvider;
use crate::io::configuration::{
    PLACEMENT_TOLERANCE_MM, SEED_LATTICE_DIVISIONS, SEED_LATTICE_MAX_STEPS,
};
use crate::io::error::{Result, invalid_parameter};
use crate::math::geometry::{Point, Rect};
use crate::math::probability::RandomSelector;
use crate::spatial::grid::Space;
use crate::spatial::patch::Patch;
use crate::spatial::tree::{NodeId, PatchTree};

/// How a leaf's source footprint is first placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum SeedStrategy {
    /// First legal uniformly random centre and rotation
    Random,
    /// Several random proposals; keep the legal one that matches best
    #[default]
    SalienceGreedy,
    /// Target position mapped into the source, plus bounded jitter
    Jittered,
}

/// Limits shared by the seed strategies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedParams {
    /// Smallest allowed patch side (mm)
    pub min_dimension: f64,
    /// Proposals scored by [`SeedStrategy::SalienceGreedy`]
    pub candidates: usize,
    /// Proposals tried by the other strategies before giving up
    pub attempts: usize,
    /// Maximum jitter (mm) for [`SeedStrategy::Jittered`]
    pub jitter_mm: f64,
}

/// Propose a source placement for a leaf and commit it if legal
///
/// The leaf's target footprint and size are kept; only the source centre and
/// rotation change. When the strategy finds nothing legal, the source is swept
/// on a regular lattice, every rotation in turn. Returns the committed patch, or
/// `None` when the source has no free slot for the leaf.
///
/// # Errors
///
/// Returns an error if `leaf` is not a live leaf or a patch involved is malformed
pub fn seed_leaf<F: FeatureProvider + ?Sized>(
    tree: &mut PatchTree,
    leaf: NodeId,
    strategy: SeedStrategy,
    selector: &mut RandomSelector,
    matcher: &AppearanceMatcher<'_, F>,
    params: &SeedParams,
) -> Result<Option<Patch>> {
    let current = match tree.patch(leaf) {
        Some(patch) if tree.is_leaf(leaf) => *patch,
        _ => {
            return Err(invalid_parameter(
                "selection",
                &leaf.index(),
                &"only live leaves can be seeded",
            ));
        }
    };

    let proposed = match strategy {
        SeedStrategy::Random => first_legal(tree, leaf, params, params.attempts, || {
            random_proposal(tree, &current, selector)
        })?,
        SeedStrategy::Jittered => first_legal(tree, leaf, params, params.attempts, || {
            jittered_proposal(tree, &current, selector, params.jitter_mm)
        })?,
        SeedStrategy::SalienceGreedy => {
            let mut best: Option<(Patch, f64)> = None;
            for _ in 0..params.candidates {
                let Some(candidate) = random_proposal(tree, &current, selector)? else {
                    continue;
                };
                if !tree
                    .check_placement(&candidate, &[leaf], params.min_dimension)?
                    .is_legal()
                {
                    continue;
                }
                let Some(score) = score_or_reject(matcher, &candidate, tree)? else {
                    continue;
                };
                if best.is_none_or(|(_, best_score)| score < best_score) {
                    best = Some((Patch { matching: Some(score), ..candidate }, score));
                }
            }
            best.map(|(patch, _)| patch)
        }
    };

    let chosen = if proposed.is_some() {
        proposed
    } else {
        debug!(
            "No legal {strategy:?} seed for node {}; sweeping the source",
            leaf.index()
        );
        scan_lattice(tree, leaf, &current, params)?
    };

    let Some(mut patch) = chosen else {
        debug!("Source has no free slot for node {}", leaf.index());
        return Ok(None);
    };
    if patch.matching.is_none() {
        patch.matching = score_or_reject(matcher, &patch, tree)?;
    }
    tree.commit(leaf, patch)?;
    Ok(Some(patch))
}

fn first_legal(
    tree: &PatchTree,
    leaf: NodeId,
    params: &SeedParams,
    attempts: usize,
    mut propose: impl FnMut() -> Result<Option<Patch>>,
) -> Result<Option<Patch>> {
    for _ in 0..attempts {
        let Some(candidate) = propose()? else {
            continue;
        };
        if tree
            .check_placement(&candidate, &[leaf], params.min_dimension)?
            .is_legal()
        {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// First legal placement on a row-major lattice of source centres
fn scan_lattice(
    tree: &PatchTree,
    leaf: NodeId,
    patch: &Patch,
    params: &SeedParams,
) -> Result<Option<Patch>> {
    let step = (patch.dimension.width.min(patch.dimension.height) / SEED_LATTICE_DIVISIONS)
        .max(PLACEMENT_TOLERANCE_MM);
    for rotation_index in 0..tree.geometry().rotations.len() {
        let rotated = Patch {
            rotation_index,
            ..*patch
        };
        let Some(range) = centre_range(tree, &rotated)? else {
            continue;
        };
        for y in lattice_axis(range.min_y, range.max_y, step) {
            for x in lattice_axis(range.min_x, range.max_x, step) {
                let candidate = with_centre(patch, rotation_index, Point::new(x, y));
                if tree
                    .check_placement(&candidate, &[leaf], params.min_dimension)?
                    .is_legal()
                {
                    return Ok(Some(candidate));
                }
            }
        }
    }
    Ok(None)
}

/// Evenly spaced positions from `low` to `high` inclusive, roughly `step` apart
fn lattice_axis(low: f64, high: f64, step: f64) -> impl Iterator<Item = f64> {
    let span = high - low;
    let steps = ((span / step).ceil() as usize).clamp(1, SEED_LATTICE_MAX_STEPS);
    (0..=steps).map(move |i| (low + span * i as f64 / steps as f64).min(high))
}

/// Range of centres that keep a rotated footprint inside the source
fn centre_range(tree: &PatchTree, patch: &Patch) -> Result<Option<Rect>> {
    let rotation = tree.geometry().rotations.get(patch.rotation_index)?;
    let half = rotation.bounding_half_extents(patch.dimension);
    let bounds = tree.geometry().bounds_mm(Space::Source);
    let range = Rect::new(
        bounds.min_x + half.x,
        bounds.min_y + half.y,
        bounds.max_x - half.x,
        bounds.max_y - half.y,
    );
    Ok((range.width() >= 0.0 && range.height() >= 0.0).then_some(range))
}

fn with_centre(patch: &Patch, rotation_index: usize, centre: Point) -> Patch {
    Patch {
        source_offset: centre - patch.dimension.half(),
        rotation_index,
        matching: None,
        ..*patch
    }
}

fn random_proposal(
    tree: &PatchTree,
    patch: &Patch,
    selector: &mut RandomSelector,
) -> Result<Option<Patch>> {
    let rotation_index = selector.index(tree.geometry().rotations.len());
    let rotated = Patch {
        rotation_index,
        ..*patch
    };
    let Some(range) = centre_range(tree, &rotated)? else {
        return Ok(None);
    };
    let centre = Point::new(
        selector.uniform(range.min_x, range.max_x),
        selector.uniform(range.min_y, range.max_y),
    );
    Ok(Some(with_centre(patch, rotation_index, centre)))
}

fn jittered_proposal(
    tree: &PatchTree,
    patch: &Patch,
    selector: &mut RandomSelector,
    jitter_mm: f64,
) -> Result<Option<Patch>> {
    let Some(range) = centre_range(tree, patch)? else {
        return Ok(None);
    };
    let source = tree.geometry().bounds_mm(Space::Source);
    let target = tree.geometry().bounds_mm(Space::Target);
    let anchor = patch.target_bounds().center();
    let mapped = Point::new(
        anchor.x * source.width() / target.width(),
        anchor.y * source.height() / target.height(),
    );
    let jitter = Point::new(
        selector.uniform(-jitter_mm, jitter_mm),
        selector.uniform(-jitter_mm, jitter_mm),
    );
    let centre = mapped + jitter;
    let clamped = Point::new(
        centre.x.clamp(range.min_x, range.max_x),
        centre.y.clamp(range.min_y, range.max_y),
    );
    Ok(Some(with_centre(patch, patch.rotation_index, clamped)))
}
