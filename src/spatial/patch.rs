//! Patches: paired target and source footprints
//!
//! A patch covers an axis-aligned rectangle of the target and a same-sized
//! rectangle of the source material, rotated about its own centre by one of the
//! discretized rotations. All geometry is kept in millimetres; pixel conversions
//! go through [`ImageGeometry`].

use bitvec::{bitvec, vec::BitVec};

use crate::io::configuration::PLACEMENT_TOLERANCE_MM;
use crate::io::error::{Result, invalid_geometry, invalid_parameter, out_of_bounds};
use crate::math::geometry::{PixelRect, Point, Rect, Rotation, RotationSet, Size};
use crate::spatial::grid::Space;

/// Pixel extents and transforms of the two images a layout is built over
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeometry {
    /// Source material size in pixels (width, height)
    pub source_extent: (usize, usize),
    /// Target image size in pixels (width, height)
    pub target_extent: (usize, usize),
    /// Pixel density shared by both images
    pub px_per_mm: f64,
    /// Rotations a source footprint may take
    pub rotations: RotationSet,
}

impl ImageGeometry {
    /// Create a geometry description
    ///
    /// # Errors
    ///
    /// Returns an error if either extent is empty or the pixel density is not positive
    pub fn new(
        source_extent: (usize, usize),
        target_extent: (usize, usize),
        px_per_mm: f64,
        rotations: RotationSet,
    ) -> Result<Self> {
        if !(px_per_mm.is_finite() && px_per_mm > 0.0) {
            return Err(invalid_parameter(
                "px_per_mm",
                &px_per_mm,
                &"pixel density must be positive",
            ));
        }
        for (name, extent) in [("source", source_extent), ("target", target_extent)] {
            if extent.0 == 0 || extent.1 == 0 {
                return Err(invalid_parameter(
                    "extent",
                    &format!("{name} {}x{}", extent.0, extent.1),
                    &"images must be at least one pixel in each direction",
                ));
            }
        }
        Ok(Self {
            source_extent,
            target_extent,
            px_per_mm,
            rotations,
        })
    }

    /// Pixel extent of one space
    pub const fn extent(&self, space: Space) -> (usize, usize) {
        match space {
            Space::Source => self.source_extent,
            Space::Target => self.target_extent,
        }
    }

    /// Image bounds of one space in millimetres
    pub fn bounds_mm(&self, space: Space) -> Rect {
        let (w, h) = self.extent(space);
        Rect::new(
            0.0,
            0.0,
            w as f64 / self.px_per_mm,
            h as f64 / self.px_per_mm,
        )
    }

    /// Patch footprint in `space` lies inside that image
    ///
    /// # Errors
    ///
    /// Returns an error if the patch geometry is malformed
    pub fn contains(&self, patch: &Patch, space: Space) -> Result<bool> {
        let bounds = patch.bounds(space, &self.rotations)?;
        Ok(self
            .bounds_mm(space)
            .contains_rect(&bounds, PLACEMENT_TOLERANCE_MM))
    }
}

/// A paired target/source region representing one assignable tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patch {
    /// Top-left corner of the target footprint
    pub target_offset: Point,
    /// Top-left corner of the source footprint before rotation
    pub source_offset: Point,
    /// Footprint size, shared by both spaces
    pub dimension: Size,
    /// Index into the rotation set applied to the source footprint
    pub rotation_index: usize,
    /// Last computed appearance distance, if any
    pub matching: Option<f64>,
}

impl Patch {
    /// Create an unscored patch
    pub const fn new(
        target_offset: Point,
        source_offset: Point,
        dimension: Size,
        rotation_index: usize,
    ) -> Self {
        Self {
            target_offset,
            source_offset,
            dimension,
            rotation_index,
            matching: None,
        }
    }

    /// Fail unless both dimensions are positive and finite
    ///
    /// # Errors
    ///
    /// Returns an error if the patch has a non-positive dimension
    pub fn validate(&self) -> Result<()> {
        if self.dimension.is_positive() {
            Ok(())
        } else {
            Err(invalid_geometry(&format!(
                "patch dimension {}x{} mm is not positive",
                self.dimension.width, self.dimension.height
            )))
        }
    }

    /// Target footprint
    pub fn target_bounds(&self) -> Rect {
        Rect::from_origin_size(self.target_offset, self.dimension)
    }

    /// Centre of the source footprint (the rotation pivot)
    pub fn source_center(&self) -> Point {
        self.source_offset + self.dimension.half()
    }

    /// Rotated source footprint corners, clockwise from the local top-left
    ///
    /// # Errors
    ///
    /// Returns an error if the patch is malformed or its rotation index is unknown
    pub fn source_corners(&self, rotations: &RotationSet) -> Result<[Point; 4]> {
        self.validate()?;
        let rotation = rotations.get(self.rotation_index)?;
        let local = Rect::from_origin_size(Point::default(), self.dimension).corners();
        Ok(local.map(|corner| self.local_to_source(corner, rotation)))
    }

    /// Axis-aligned box around the rotated source footprint
    ///
    /// # Errors
    ///
    /// Returns an error if the patch is malformed or its rotation index is unknown
    pub fn source_bounds(&self, rotations: &RotationSet) -> Result<Rect> {
        let corners = self.source_corners(rotations)?;
        Rect::bounding(&corners).ok_or_else(|| invalid_geometry(&"empty source footprint"))
    }

    /// Bounding box of the footprint in either space
    ///
    /// # Errors
    ///
    /// Returns an error if the patch is malformed or its rotation index is unknown
    pub fn bounds(&self, space: Space, rotations: &RotationSet) -> Result<Rect> {
        match space {
            Space::Source => self.source_bounds(rotations),
            Space::Target => {
                self.validate()?;
                Ok(self.target_bounds())
            }
        }
    }

    /// Map a point in patch-local coordinates (`[0, w) x [0, h)`) into source space
    pub fn local_to_source(&self, local: Point, rotation: Rotation) -> Point {
        self.source_center() + rotation.apply(local - self.dimension.half())
    }

    /// Map a source-space point back into patch-local coordinates
    pub fn source_to_local(&self, source: Point, rotation: Rotation) -> Point {
        rotation.invert(source - self.source_center()) + self.dimension.half()
    }

    /// Patch covering `local` (a rectangle in this patch's local frame)
    ///
    /// The rectangle may reach past the patch; the source footprint follows the
    /// same local frame, so a sub-patch of a legal patch keeps its orientation.
    ///
    /// # Errors
    ///
    /// Returns an error if the local rectangle or the rotation index is invalid
    pub fn sub_patch(&self, local: &Rect, rotations: &RotationSet) -> Result<Self> {
        let dimension = local.size();
        if !dimension.is_positive() {
            return Err(invalid_geometry(&format!(
                "sub-patch dimension {}x{} mm is not positive",
                dimension.width, dimension.height
            )));
        }
        let rotation = rotations.get(self.rotation_index)?;
        let center = self.local_to_source(local.center(), rotation);
        Ok(Self {
            target_offset: self.target_offset + local.origin(),
            source_offset: center - dimension.half(),
            dimension,
            rotation_index: self.rotation_index,
            matching: None,
        })
    }

    /// Rasterize the rotated source footprint into a pixel mask
    ///
    /// # Errors
    ///
    /// Returns an error if the patch is malformed or its source footprint
    /// leaves the source image
    pub fn mask(&self, geometry: &ImageGeometry) -> Result<PatchMask> {
        let rotation = geometry.rotations.get(self.rotation_index)?;
        let bounds = self.source_bounds(&geometry.rotations)?;
        let extent = geometry.extent(Space::Source);
        // Trig round-off must not push an edge-aligned footprint onto an extra pixel
        let eps = PLACEMENT_TOLERANCE_MM;
        let snapped = Rect::new(
            bounds.min_x + eps,
            bounds.min_y + eps,
            bounds.max_x - eps,
            bounds.max_y - eps,
        );
        let rect = PixelRect::covering_mm(&snapped, geometry.px_per_mm)
            .ok_or_else(|| out_of_bounds(Space::Source, PixelRect::default(), extent))?;
        if !rect.fits_within(extent) {
            return Err(out_of_bounds(Space::Source, rect, extent));
        }

        let mut bits = bitvec![0; rect.area()];
        for row in 0..rect.height {
            for col in 0..rect.width {
                let sample = Point::new(
                    (rect.x + col) as f64 + 0.5,
                    (rect.y + row) as f64 + 0.5,
                )
                .scale(1.0 / geometry.px_per_mm);
                let local = self.source_to_local(sample, rotation);
                let inside = local.x >= 0.0
                    && local.y >= 0.0
                    && local.x < self.dimension.width
                    && local.y < self.dimension.height;
                if inside {
                    bits.set(row * rect.width + col, true);
                }
            }
        }
        Ok(PatchMask { rect, bits })
    }
}

/// Binary rasterization of a rotated source footprint
///
/// Covers the pixel bounding box of the footprint; a bit is set when the pixel
/// centre falls inside the unrotated footprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchMask {
    rect: PixelRect,
    bits: BitVec,
}

impl PatchMask {
    /// Pixel bounding box of the footprint in the source image
    pub const fn rect(&self) -> PixelRect {
        self.rect
    }

    /// Whether the source pixel at absolute `(x, y)` lies inside the footprint
    pub fn contains(&self, x: usize, y: usize) -> bool {
        if x < self.rect.x || y < self.rect.y || x >= self.rect.right() || y >= self.rect.bottom()
        {
            return false;
        }
        let index = (y - self.rect.y) * self.rect.width + (x - self.rect.x);
        self.bits.get(index).as_deref() == Some(&true)
    }

    /// Number of pixels inside the footprint
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Absolute source pixel coordinates `(x, y)` inside the footprint
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.rect.width.max(1);
        self.bits
            .iter_ones()
            .map(move |i| (self.rect.x + i % width, self.rect.y + i / width))
    }
}
