//! Planar geometry in millimetre space
//!
//! Points, axis-aligned rectangles, the discretized rotation set applied to source
//! footprints, and the separating-axis test used to compare rotated footprints.

use std::ops::{Add, Sub};

use num_traits::ToPrimitive;

use crate::io::error::{Result, invalid_geometry, invalid_parameter};

/// A point (or displacement) in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate (grows downwards)
    pub y: f64,
}

impl Point {
    /// Create a point from its coordinates
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise scale
    #[must_use]
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Dot product with another vector
    pub fn dot(self, other: Self) -> f64 {
        self.x.mul_add(other.x, self.y * other.y)
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Width and height of a footprint in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    /// Horizontal extent
    pub width: f64,
    /// Vertical extent
    pub height: f64,
}

impl Size {
    /// Create a size from width and height
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both components strictly positive and finite
    pub fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Half of the size as a displacement
    pub fn half(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Axis-aligned rectangle given by its minimum and maximum corners
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge
    pub min_x: f64,
    /// Top edge
    pub min_y: f64,
    /// Right edge
    pub max_x: f64,
    /// Bottom edge
    pub max_y: f64,
}

impl Rect {
    /// Create a rectangle from its corner coordinates
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create a rectangle from its top-left corner and size
    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(
            origin.x,
            origin.y,
            origin.x + size.width,
            origin.y + size.height,
        )
    }

    /// Smallest rectangle containing every point, `None` for an empty slice
    pub fn bounding(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut rect = Self::new(first.x, first.y, first.x, first.y);
        for p in points {
            rect.min_x = rect.min_x.min(p.x);
            rect.min_y = rect.min_y.min(p.y);
            rect.max_x = rect.max_x.max(p.x);
            rect.max_y = rect.max_y.max(p.y);
        }
        Some(rect)
    }

    /// Horizontal extent
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Vertical extent
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Top-left corner
    pub const fn origin(&self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    /// Width and height
    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// Centre point
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Corner points in clockwise order starting at the top-left
    pub const fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
        ]
    }

    /// Interiors overlap by more than `tolerance` along both axes
    ///
    /// Rectangles that merely share an edge do not overlap.
    pub fn overlaps(&self, other: &Self, tolerance: f64) -> bool {
        self.max_x - other.min_x > tolerance
            && other.max_x - self.min_x > tolerance
            && self.max_y - other.min_y > tolerance
            && other.max_y - self.min_y > tolerance
    }

    /// `other` lies inside this rectangle, allowing `tolerance` of slack
    pub fn contains_rect(&self, other: &Self, tolerance: f64) -> bool {
        other.min_x >= self.min_x - tolerance
            && other.min_y >= self.min_y - tolerance
            && other.max_x <= self.max_x + tolerance
            && other.max_y <= self.max_y + tolerance
    }

    /// Smallest rectangle containing both
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Rectangle translated by a displacement
    #[must_use]
    pub fn translate(&self, offset: Point) -> Self {
        Self::new(
            self.min_x + offset.x,
            self.min_y + offset.y,
            self.max_x + offset.x,
            self.max_y + offset.y,
        )
    }
}

/// Axis-aligned rectangle on the pixel lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    /// Left column (inclusive)
    pub x: usize,
    /// Top row (inclusive)
    pub y: usize,
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
}

impl PixelRect {
    /// Create a pixel rectangle from its origin and size
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Snap a millimetre rectangle to the nearest pixel edges
    ///
    /// Returns `None` when the rectangle starts at negative coordinates
    /// or the conversion is not finite.
    pub fn from_mm(rect: &Rect, px_per_mm: f64) -> Option<Self> {
        let x0 = (rect.min_x * px_per_mm).round().to_usize()?;
        let y0 = (rect.min_y * px_per_mm).round().to_usize()?;
        let x1 = (rect.max_x * px_per_mm).round().to_usize()?;
        let y1 = (rect.max_y * px_per_mm).round().to_usize()?;
        Some(Self::new(
            x0,
            y0,
            x1.saturating_sub(x0),
            y1.saturating_sub(y0),
        ))
    }

    /// Smallest pixel rectangle covering a millimetre rectangle
    ///
    /// Returns `None` when the rectangle starts at negative coordinates.
    pub fn covering_mm(rect: &Rect, px_per_mm: f64) -> Option<Self> {
        let x0 = (rect.min_x * px_per_mm).floor().to_usize()?;
        let y0 = (rect.min_y * px_per_mm).floor().to_usize()?;
        let x1 = (rect.max_x * px_per_mm).ceil().to_usize()?;
        let y1 = (rect.max_y * px_per_mm).ceil().to_usize()?;
        Some(Self::new(
            x0,
            y0,
            x1.saturating_sub(x0),
            y1.saturating_sub(y0),
        ))
    }

    /// Exclusive right column
    pub const fn right(&self) -> usize {
        self.x + self.width
    }

    /// Exclusive bottom row
    pub const fn bottom(&self) -> usize {
        self.y + self.height
    }

    /// Number of pixels covered
    pub const fn area(&self) -> usize {
        self.width * self.height
    }

    /// Lies entirely inside an image of the given (width, height)
    pub const fn fits_within(&self, extent: (usize, usize)) -> bool {
        self.right() <= extent.0 && self.bottom() <= extent.1
    }
}

/// Forward and inverse rotation about the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    angle: f64,
    cos: f64,
    sin: f64,
}

impl Rotation {
    /// Rotation by `angle` radians (clockwise on screen, since y grows downwards)
    pub fn from_radians(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { angle, cos, sin }
    }

    /// Rotation angle in radians
    pub const fn angle(&self) -> f64 {
        self.angle
    }

    /// Rotate a vector forward
    pub fn apply(&self, v: Point) -> Point {
        Point::new(
            self.cos.mul_add(v.x, -self.sin * v.y),
            self.sin.mul_add(v.x, self.cos * v.y),
        )
    }

    /// Rotate a vector backward
    pub fn invert(&self, v: Point) -> Point {
        Point::new(
            self.cos.mul_add(v.x, self.sin * v.y),
            (-self.sin).mul_add(v.x, self.cos * v.y),
        )
    }

    /// Half extents of the axis-aligned box enclosing a rotated footprint of `size`
    pub fn bounding_half_extents(&self, size: Size) -> Point {
        let (c, s) = (self.cos.abs(), self.sin.abs());
        Point::new(
            c.mul_add(size.width, s * size.height) / 2.0,
            s.mul_add(size.width, c * size.height) / 2.0,
        )
    }
}

/// Fixed, discretized set of source rotations
///
/// Index 0 is always the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationSet {
    rotations: Vec<Rotation>,
}

impl RotationSet {
    /// `steps` rotations evenly spaced over a full turn
    ///
    /// # Errors
    ///
    /// Returns an error if `steps` is zero
    pub fn uniform(steps: usize) -> Result<Self> {
        if steps == 0 {
            return Err(invalid_parameter(
                "rotation_steps",
                &steps,
                &"at least one rotation (the identity) is required",
            ));
        }
        let step = std::f64::consts::TAU / steps as f64;
        let rotations = (0..steps)
            .map(|i| Rotation::from_radians(step * i as f64))
            .collect();
        Ok(Self { rotations })
    }

    /// The set containing only the identity rotation
    pub fn identity() -> Self {
        Self {
            rotations: vec![Rotation::from_radians(0.0)],
        }
    }

    /// Number of available rotations
    pub fn len(&self) -> usize {
        self.rotations.len()
    }

    /// Whether the set is empty (never true for sets built by the constructors)
    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty()
    }

    /// Rotation for an index
    ///
    /// # Errors
    ///
    /// Returns an error if the index does not name a rotation in the set
    pub fn get(&self, index: usize) -> Result<Rotation> {
        self.rotations.get(index).copied().ok_or_else(|| {
            invalid_geometry(&format!(
                "rotation index {index} outside set of {}",
                self.rotations.len()
            ))
        })
    }

    /// Index reached by stepping `delta` positions, wrapping around the full turn
    pub fn step(&self, index: usize, delta: isize) -> usize {
        let len = self.rotations.len().max(1) as isize;
        (index as isize + delta).rem_euclid(len) as usize
    }
}

/// Separating-axis test for two convex polygons
///
/// Touching polygons count as intersecting.
///
/// # Errors
///
/// Returns an error if either polygon has fewer than three points
pub fn separating_axis_intersect(a: &[Point], b: &[Point]) -> Result<bool> {
    polygons_intersect(a, b, 0.0)
}

/// Separating-axis test with a contact tolerance
///
/// Projections that overlap by less than `tolerance` are treated as separated,
/// so with a positive tolerance shared edges no longer count as intersecting.
///
/// # Errors
///
/// Returns an error if either polygon has fewer than three points
pub fn polygons_intersect(a: &[Point], b: &[Point], tolerance: f64) -> Result<bool> {
    if a.len() < 3 || b.len() < 3 {
        return Err(invalid_geometry(&format!(
            "separating axis test needs polygons of at least 3 points, got {} and {}",
            a.len(),
            b.len()
        )));
    }

    for polygon in [a, b] {
        for (i, &start) in polygon.iter().enumerate() {
            let Some(&end) = polygon.get((i + 1) % polygon.len()) else {
                continue;
            };
            let edge = end - start;
            let axis = Point::new(-edge.y, edge.x);
            if axis.x == 0.0 && axis.y == 0.0 {
                continue;
            }
            let (min_a, max_a) = project(a, axis);
            let (min_b, max_b) = project(b, axis);
            let length = axis.dot(axis).sqrt();
            if (max_a - min_b) / length < tolerance || (max_b - min_a) / length < tolerance {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn project(polygon: &[Point], axis: Point) -> (f64, f64) {
    polygon
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            let d = p.dot(axis);
            (lo.min(d), hi.max(d))
        })
}
