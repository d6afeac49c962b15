//! Appearance distance between a patch's source and target footprints

use ndarray::ArrayView2;

use crate::analysis::features::FeatureProvider;
use crate::io::error::{Result, invalid_parameter, out_of_bounds};
use crate::math::geometry::{PixelRect, Point};
use crate::spatial::grid::Space;
use crate::spatial::patch::{ImageGeometry, Patch, PatchMask};

/// Feature image positioned in absolute pixel coordinates
#[derive(Debug, Clone, Copy)]
pub struct FeatureWindow<'a> {
    /// Feature values, row-major (rows = y)
    pub image: ArrayView2<'a, f32>,
    /// Absolute (x, y) of the window's top-left pixel
    pub origin: (usize, usize),
}

impl FeatureWindow<'_> {
    /// Value at absolute pixel (x, y), `None` outside the window
    pub fn sample(&self, x: usize, y: usize) -> Option<f32> {
        let col = x.checked_sub(self.origin.0)?;
        let row = y.checked_sub(self.origin.1)?;
        self.image.get((row, col)).copied()
    }
}

/// One weighted pair of source/target feature images
#[derive(Debug, Clone, Copy)]
pub struct FeatureChannel<'a> {
    /// Source-space feature window
    pub source: FeatureWindow<'a>,
    /// Target-space feature window
    pub target: FeatureWindow<'a>,
    /// Non-negative channel weight
    pub weight: f64,
}

/// Weighted, masked L2 distance between a patch's source and target samples
///
/// Every masked source pixel is paired with the target pixel it lands on once the
/// footprint is rotated back. Each channel's norm is divided by the source image's
/// pixel count so scores compare across source images. Lower is better.
///
/// # Errors
///
/// Returns an error if the target footprint leaves the target image or a channel
/// window does not cover a sampled pixel
pub fn appearance_distance(
    patch: &Patch,
    mask: &PatchMask,
    geometry: &ImageGeometry,
    channels: &[FeatureChannel<'_>],
) -> Result<f64> {
    let rotation = geometry.rotations.get(patch.rotation_index)?;
    let target_extent = geometry.extent(Space::Target);
    let target_rect = target_pixels(patch, geometry)?;
    let source_pixels = (geometry.source_extent.0 * geometry.source_extent.1).max(1) as f64;

    let mut sums = vec![0.0_f64; channels.len()];
    for (sx, sy) in mask.pixels() {
        let sample = Point::new(sx as f64 + 0.5, sy as f64 + 0.5).scale(1.0 / geometry.px_per_mm);
        let landing = (patch.target_offset + patch.source_to_local(sample, rotation))
            .scale(geometry.px_per_mm);
        let tx = clamp_to(landing.x, target_rect.x, target_rect.right());
        let ty = clamp_to(landing.y, target_rect.y, target_rect.bottom());

        for (sum, channel) in sums.iter_mut().zip(channels) {
            let source = channel
                .source
                .sample(sx, sy)
                .ok_or_else(|| out_of_bounds(Space::Source, mask.rect(), geometry.source_extent))?;
            let target = channel
                .target
                .sample(tx, ty)
                .ok_or_else(|| out_of_bounds(Space::Target, target_rect, target_extent))?;
            let diff = f64::from(source) - f64::from(target);
            *sum += diff * diff;
        }
    }

    Ok(sums
        .iter()
        .zip(channels)
        .map(|(sum, channel)| sum.sqrt() / source_pixels * channel.weight)
        .sum())
}

fn clamp_to(value: f64, low: usize, high_exclusive: usize) -> usize {
    let high = high_exclusive.saturating_sub(1).max(low);
    (value.floor().max(low as f64) as usize).min(high)
}

fn target_pixels(patch: &Patch, geometry: &ImageGeometry) -> Result<PixelRect> {
    let extent = geometry.extent(Space::Target);
    let rect = PixelRect::from_mm(&patch.target_bounds(), geometry.px_per_mm)
        .ok_or_else(|| out_of_bounds(Space::Target, PixelRect::default(), extent))?;
    if rect.area() == 0 || !rect.fits_within(extent) {
        return Err(out_of_bounds(Space::Target, rect, extent));
    }
    Ok(rect)
}

/// Scores patches against features fetched from a [`FeatureProvider`]
#[derive(Debug, Clone)]
pub struct AppearanceMatcher<'a, F: ?Sized> {
    provider: &'a F,
    weights: Vec<f64>,
}

impl<'a, F: FeatureProvider + ?Sized> AppearanceMatcher<'a, F> {
    /// Create a matcher with one weight per provider channel
    ///
    /// # Errors
    ///
    /// Returns an error if the weight count differs from the channel count or a
    /// weight is negative
    pub fn new(provider: &'a F, weights: Vec<f64>) -> Result<Self> {
        if weights.len() != provider.channel_count() {
            return Err(invalid_parameter(
                "weights",
                &weights.len(),
                &format!("expected one weight per channel ({})", provider.channel_count()),
            ));
        }
        if let Some(bad) = weights.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
            return Err(invalid_parameter(
                "weights",
                bad,
                &"channel weights must be finite and non-negative",
            ));
        }
        Ok(Self { provider, weights })
    }

    /// Channel weights
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Appearance distance of a patch at its current placement
    ///
    /// # Errors
    ///
    /// Returns an error if the placement leaves either image
    pub fn score(&self, patch: &Patch, geometry: &ImageGeometry) -> Result<f64> {
        let mask = patch.mask(geometry)?;
        let target_rect = target_pixels(patch, geometry)?;
        let source_maps = self.provider.features(Space::Source, mask.rect())?;
        let target_maps = self.provider.features(Space::Target, target_rect)?;

        let source_origin = (mask.rect().x, mask.rect().y);
        let target_origin = (target_rect.x, target_rect.y);
        let channels: Vec<FeatureChannel<'_>> = source_maps
            .iter()
            .zip(&target_maps)
            .zip(&self.weights)
            .map(|((source, target), &weight)| FeatureChannel {
                source: FeatureWindow {
                    image: source.view(),
                    origin: source_origin,
                },
                target: FeatureWindow {
                    image: target.view(),
                    origin: target_origin,
                },
                weight,
            })
            .collect();

        appearance_distance(patch, &mask, geometry, &channels)
    }
}
