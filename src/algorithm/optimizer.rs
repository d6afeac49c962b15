//! Layout optimizer facade
//!
//! Owns the injected feature and energy providers, the seeded random source and
//! the tuning knobs, and exposes the refinement entry points callers drive one
//! request at a time.

use log::debug;

use crate::algorithm::matcher::AppearanceMatcher;
use crate::algorithm::mutation::{
    Mutation, MutationOutcome, mutate_leaf, propose_mutations, score_or_reject,
};
use crate::algorithm::regeneration::{
    CancellationToken, ProgressSink, RegenerationReport, regenerate_regular,
};
use crate::algorithm::seeding::{SeedParams, SeedStrategy, seed_leaf};
use crate::algorithm::split::{SplitOutcome, SplitParams, select_leaves, split_leaf};
use crate::analysis::features::{EnergyProvider, FeatureProvider};
use crate::io::configuration::{
    EDGE_WEIGHT, INTENSITY_WEIGHT, MIN_PATCH_DIMENSION_MM, MUTATION_STEP_MM, ROTATION_STEP_LIMIT,
    SEED_ATTEMPTS, SEED_CANDIDATES, SEED_JITTER_MM, SPLIT_SAMPLING_EXPONENT,
};
use crate::io::error::{Result, invalid_parameter};
use crate::math::probability::RandomSelector;
use crate::spatial::patch::Patch;
use crate::spatial::tree::{NodeId, PatchTree};

/// Tuning knobs of the optimizer
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Smallest allowed patch side (mm)
    pub min_dimension: f64,
    /// Largest edge or offset step of one mutation (mm)
    pub mutation_step: f64,
    /// Largest rotation-index step of one mutation
    pub rotation_step_limit: usize,
    /// Exponent applied to leaf energy when sampling split targets
    pub split_sampling_exponent: f64,
    /// Try the other axis when the preferred split is illegal
    pub alternate_axis_fallback: bool,
    /// Proposals scored per leaf by the salience-greedy seed strategy
    pub seed_candidates: usize,
    /// Proposals tried per leaf by the other seed strategies
    pub seed_attempts: usize,
    /// Jitter bound of the jittered seed strategy (mm)
    pub seed_jitter: f64,
    /// One weight per feature channel
    pub channel_weights: Vec<f64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            min_dimension: MIN_PATCH_DIMENSION_MM,
            mutation_step: MUTATION_STEP_MM,
            rotation_step_limit: ROTATION_STEP_LIMIT,
            split_sampling_exponent: SPLIT_SAMPLING_EXPONENT,
            alternate_axis_fallback: true,
            seed_candidates: SEED_CANDIDATES,
            seed_attempts: SEED_ATTEMPTS,
            seed_jitter: SEED_JITTER_MM,
            channel_weights: vec![INTENSITY_WEIGHT, EDGE_WEIGHT],
        }
    }
}

impl OptimizerConfig {
    const fn split_params(&self) -> SplitParams {
        SplitParams {
            min_dimension: self.min_dimension,
            sampling_exponent: self.split_sampling_exponent,
            alternate_axis_fallback: self.alternate_axis_fallback,
        }
    }

    const fn seed_params(&self) -> SeedParams {
        SeedParams {
            min_dimension: self.min_dimension,
            candidates: self.seed_candidates,
            attempts: self.seed_attempts,
            jitter_mm: self.seed_jitter,
        }
    }
}

/// Greedy mutation and guided split over a [`PatchTree`]
pub struct LayoutOptimizer<'a, F: ?Sized, E: ?Sized> {
    matcher: AppearanceMatcher<'a, F>,
    energy: &'a E,
    config: OptimizerConfig,
    selector: RandomSelector,
}

impl<'a, F, E> LayoutOptimizer<'a, F, E>
where
    F: FeatureProvider + ?Sized,
    E: EnergyProvider + ?Sized,
{
    /// Create an optimizer over injected providers
    ///
    /// # Errors
    ///
    /// Returns an error if the channel weights do not fit the feature provider or
    /// a size limit is not positive
    pub fn new(features: &'a F, energy: &'a E, config: OptimizerConfig, seed: u64) -> Result<Self> {
        if !(config.min_dimension.is_finite() && config.min_dimension > 0.0) {
            return Err(invalid_parameter(
                "min_dimension",
                &config.min_dimension,
                &"minimum patch dimension must be positive",
            ));
        }
        if !(config.mutation_step.is_finite() && config.mutation_step > 0.0) {
            return Err(invalid_parameter(
                "mutation_step",
                &config.mutation_step,
                &"mutation step must be positive",
            ));
        }
        let matcher = AppearanceMatcher::new(features, config.channel_weights.clone())?;
        Ok(Self {
            matcher,
            energy,
            config,
            selector: RandomSelector::new(seed),
        })
    }

    /// Active configuration
    pub const fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// The appearance matcher built from the feature provider
    pub const fn matcher(&self) -> &AppearanceMatcher<'a, F> {
        &self.matcher
    }

    /// Appearance distance of a patch placed in `tree`
    ///
    /// # Errors
    ///
    /// Returns an error if the patch leaves either image
    pub fn score(&self, tree: &PatchTree, patch: &Patch) -> Result<f64> {
        self.matcher.score(patch, tree.geometry())
    }

    /// Score every live leaf and store the result on its patch
    ///
    /// Leaves whose footprint cannot be sampled are left unscored. Returns the
    /// mean of the scored leaves, or `None` if none could be scored.
    ///
    /// # Errors
    ///
    /// Returns an error if a leaf patch is malformed
    pub fn rescore(&self, tree: &mut PatchTree) -> Result<Option<f64>> {
        let mut total = 0.0;
        let mut scored = 0_usize;
        for leaf in tree.leaves() {
            let Some(patch) = tree.patch(leaf).copied() else {
                continue;
            };
            if let Some(score) = score_or_reject(&self.matcher, &patch, tree)? {
                tree.set_matching(leaf, score);
                total += score;
                scored += 1;
            }
        }
        Ok((scored > 0).then(|| total / scored as f64))
    }

    /// Sample `sample_count` mutations of one leaf and commit the best improvement
    ///
    /// # Errors
    ///
    /// Returns an error if `selection` is not a live leaf or a patch is malformed
    pub fn mutate(
        &mut self,
        tree: &mut PatchTree,
        selection: NodeId,
        sample_count: usize,
    ) -> Result<MutationOutcome> {
        let mutations = propose_mutations(
            &mut self.selector,
            sample_count,
            self.config.mutation_step,
            self.config.rotation_step_limit,
        );
        self.apply_best(tree, selection, &mutations)
    }

    /// Evaluate explicit mutations of one leaf and commit the best improvement
    ///
    /// # Errors
    ///
    /// Returns an error if `selection` is not a live leaf or a patch is malformed
    pub fn apply_best(
        &self,
        tree: &mut PatchTree,
        selection: NodeId,
        mutations: &[Mutation],
    ) -> Result<MutationOutcome> {
        mutate_leaf(
            tree,
            selection,
            mutations,
            &self.matcher,
            self.config.min_dimension,
        )
    }

    /// Pick up to `selection_count` high-energy leaves and split each along its best cut
    ///
    /// # Errors
    ///
    /// Returns an error if the energy map cannot be read or a patch is malformed
    pub fn split(
        &mut self,
        tree: &mut PatchTree,
        selection_count: usize,
    ) -> Result<Vec<SplitOutcome>> {
        let chosen = select_leaves(
            tree,
            self.energy,
            &mut self.selector,
            selection_count,
            self.config.split_sampling_exponent,
        )?;
        debug!("Selected {} leaves for splitting", chosen.len());
        chosen
            .into_iter()
            .map(|leaf| self.split_leaf(tree, leaf))
            .collect()
    }

    /// Split a specific leaf along its best legal cut
    ///
    /// # Errors
    ///
    /// Returns an error if `leaf` is not a live leaf or a patch is malformed
    pub fn split_leaf(&self, tree: &mut PatchTree, leaf: NodeId) -> Result<SplitOutcome> {
        split_leaf(
            tree,
            leaf,
            self.energy,
            &self.matcher,
            &self.config.split_params(),
        )
    }

    /// Give one leaf a fresh source placement
    ///
    /// # Errors
    ///
    /// Returns an error if `leaf` is not a live leaf or a patch is malformed
    pub fn seed_leaf(
        &mut self,
        tree: &mut PatchTree,
        leaf: NodeId,
        strategy: SeedStrategy,
    ) -> Result<Option<Patch>> {
        seed_leaf(
            tree,
            leaf,
            strategy,
            &mut self.selector,
            &self.matcher,
            &self.config.seed_params(),
        )
    }

    /// Rebuild `tree` as a regular tiling of `cell_mm` cells and seed every leaf
    ///
    /// # Errors
    ///
    /// Returns an error if the cell size is invalid or a patch is malformed
    pub fn regenerate_regular(
        &mut self,
        tree: &mut PatchTree,
        cell_mm: f64,
        strategy: SeedStrategy,
        token: &CancellationToken,
        progress: &mut dyn ProgressSink,
    ) -> Result<RegenerationReport> {
        regenerate_regular(
            tree,
            cell_mm,
            strategy,
            &mut self.selector,
            &self.matcher,
            &self.config.seed_params(),
            token,
            progress,
        )
    }
}
