//! Command-line interface: tile a target image with patches of a source image

use crate::algorithm::mutation::MutationOutcome;
use crate::algorithm::optimizer::{LayoutOptimizer, OptimizerConfig};
use crate::algorithm::regeneration::{CancellationToken, ProgressSink};
use crate::algorithm::seeding::SeedStrategy;
use crate::algorithm::split::SplitOutcome;
use crate::analysis::features::ImageFeatures;
use crate::io::configuration::{
    DEFAULT_CELL_SIZE_MM, DEFAULT_MUTATION_ROUNDS, DEFAULT_MUTATION_SAMPLES, DEFAULT_PX_PER_MM,
    DEFAULT_ROTATION_STEPS, DEFAULT_SEED, DEFAULT_SPLIT_ROUNDS, DEFAULT_SPLIT_SELECTION, GRID_COLS,
    GRID_ROWS, OUTPUT_SUFFIX,
};
use crate::io::error::Result;
use crate::io::image::{export_composite, grey_from_rgba, load_rgba};
use crate::io::progress::ProgressManager;
use crate::math::geometry::RotationSet;
use crate::spatial::patch::ImageGeometry;
use crate::spatial::tree::PatchTree;
use clap::Parser;
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(name = "mosaictile")]
#[command(
    author,
    version,
    about = "Tile a target image with rotated patches cut from a source image"
)]
/// Command-line arguments for the mosaic layout tool
pub struct Cli {
    /// Source material PNG that patches are cut from
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Target PNG the layout reproduces
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Random seed for reproducible layouts
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Pixel density of both images
    #[arg(long, default_value_t = DEFAULT_PX_PER_MM)]
    pub px_per_mm: f64,

    /// Side of the initial regular cells in millimetres
    #[arg(short, long, default_value_t = DEFAULT_CELL_SIZE_MM)]
    pub cell_size: f64,

    /// Leaves sampled per split round
    #[arg(long, default_value_t = DEFAULT_SPLIT_SELECTION)]
    pub splits: usize,

    /// Number of split rounds
    #[arg(long, default_value_t = DEFAULT_SPLIT_ROUNDS)]
    pub split_rounds: usize,

    /// Number of mutation sweeps over all leaves
    #[arg(short, long, default_value_t = DEFAULT_MUTATION_ROUNDS)]
    pub mutation_rounds: usize,

    /// Mutation kinds sampled per mutation request
    #[arg(long, default_value_t = DEFAULT_MUTATION_SAMPLES)]
    pub samples: usize,

    /// How fresh leaves get their source placement
    #[arg(long, value_enum, default_value_t = SeedStrategy::default())]
    pub strategy: SeedStrategy,

    /// Discretized source rotations over a full turn
    #[arg(short, long, default_value_t = DEFAULT_ROTATION_STEPS)]
    pub rotations: usize,

    /// Output PNG (defaults to <TARGET>_mosaic.png)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Where the composite is written
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.target))
    }
}

/// `<stem>_mosaic.<ext>` next to the input
pub fn default_output_path(input_path: &Path) -> PathBuf {
    let stem = input_path.file_stem().unwrap_or_default();
    let extension = input_path
        .extension()
        .map_or_else(|| "png".into(), |ext| ext.to_string_lossy());
    let output_name = format!("{}{}.{}", stem.to_string_lossy(), OUTPUT_SUFFIX, extension);

    if let Some(parent) = input_path.parent() {
        parent.join(output_name)
    } else {
        PathBuf::from(output_name)
    }
}

/// Totals of one layout run
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutSummary {
    /// Live leaves in the final layout
    pub leaves: usize,
    /// Leaves that received a legal source placement during regeneration
    pub seeded: usize,
    /// Successful splits
    pub splits: usize,
    /// Committed mutations
    pub mutations: usize,
    /// Mean appearance distance over scorable leaves
    pub mean_score: Option<f64>,
}

/// Runs regeneration, split and mutation rounds, then exports the composite
pub struct LayoutRunner {
    cli: Cli,
    progress: ProgressManager,
}

impl LayoutRunner {
    /// Create a runner for the given CLI arguments
    pub fn new(cli: Cli) -> Self {
        let progress = if cli.should_show_progress() {
            ProgressManager::new()
        } else {
            ProgressManager::hidden()
        };
        Self { cli, progress }
    }

    /// Build, refine and export a layout
    ///
    /// # Errors
    ///
    /// Returns an error if an image cannot be loaded or written, or a parameter
    /// is invalid
    pub fn run(&mut self) -> Result<LayoutSummary> {
        let source = load_rgba(&self.cli.source)?;
        let target = load_rgba(&self.cli.target)?;
        let features = ImageFeatures::from_grey(&grey_from_rgba(&source), &grey_from_rgba(&target))?;

        let geometry = ImageGeometry::new(
            (source.width() as usize, source.height() as usize),
            (target.width() as usize, target.height() as usize),
            self.cli.px_per_mm,
            RotationSet::uniform(self.cli.rotations)?,
        )?;
        let mut tree = PatchTree::new(geometry, GRID_ROWS, GRID_COLS)?;
        let mut optimizer =
            LayoutOptimizer::new(&features, &features, OptimizerConfig::default(), self.cli.seed)?;

        let report = optimizer.regenerate_regular(
            &mut tree,
            self.cli.cell_size,
            self.cli.strategy,
            &CancellationToken::new(),
            &mut self.progress,
        )?;
        let mut summary = LayoutSummary {
            seeded: report.seeded,
            ..LayoutSummary::default()
        };

        self.progress.begin("split", self.cli.split_rounds);
        for _ in 0..self.cli.split_rounds {
            let outcomes = optimizer.split(&mut tree, self.cli.splits)?;
            summary.splits += outcomes
                .iter()
                .filter(|o| matches!(o, SplitOutcome::Split { .. }))
                .count();
            self.progress.advance(1);
        }
        self.progress.finish();

        self.progress.begin("mutate", self.cli.mutation_rounds);
        for _ in 0..self.cli.mutation_rounds {
            for leaf in tree.leaves() {
                let outcome = optimizer.mutate(&mut tree, leaf, self.cli.samples)?;
                if matches!(outcome, MutationOutcome::Committed { .. }) {
                    summary.mutations += 1;
                }
            }
            self.progress.set_message(format!("{} committed", summary.mutations));
            self.progress.advance(1);
        }
        self.progress.finish();
        self.progress.clear();

        summary.leaves = tree.leaves().len();
        summary.mean_score = optimizer.rescore(&mut tree)?;

        let output_path = self.cli.output_path();
        export_composite(&tree, &source, &output_path)?;
        info!(
            "Wrote {} ({} leaves, {} splits, {} mutations)",
            output_path.display(),
            summary.leaves,
            summary.splits,
            summary.mutations
        );
        Ok(summary)
    }
}
