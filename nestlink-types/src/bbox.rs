use geo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned bounding box in a projected coordinate system.
///
/// Represents a rectangular area defined by minimum and maximum coordinates.
/// This is a wrapper around `geo::Rect` with the overlap measures the nest
/// linker needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2D {
    /// The underlying geometric rectangle
    pub rect: Rect,
}

impl BoundingBox2D {
    /// Create a new bounding box from minimum and maximum coordinates.
    ///
    /// `geo::Rect` normalises the corners, so swapped arguments still produce
    /// a valid box.
    ///
    /// # Examples
    ///
    /// ```
    /// use nestlink_types::bbox::BoundingBox2D;
    ///
    /// let bbox = BoundingBox2D::new(10.0, 20.0, 12.0, 23.0);
    /// assert_eq!(bbox.area(), 6.0);
    /// ```
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            rect: Rect::new(
                geo::coord! { x: min_x, y: min_y },
                geo::coord! { x: max_x, y: max_y },
            ),
        }
    }

    /// Create a bounding box from a `geo::Rect`.
    pub fn from_rect(rect: Rect) -> Self {
        Self { rect }
    }

    pub fn min_x(&self) -> f64 {
        self.rect.min().x
    }

    pub fn min_y(&self) -> f64 {
        self.rect.min().y
    }

    pub fn max_x(&self) -> f64 {
        self.rect.max().x
    }

    pub fn max_y(&self) -> f64 {
        self.rect.max().y
    }

    /// Get the center point of the bounding box.
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x() + self.max_x()) / 2.0,
            (self.min_y() + self.max_y()) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x() - self.min_x()
    }

    pub fn height(&self) -> f64 {
        self.max_y() - self.min_y()
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// True when every corner coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.min_x().is_finite()
            && self.min_y().is_finite()
            && self.max_x().is_finite()
            && self.max_y().is_finite()
    }

    /// Check if this bounding box intersects with another.
    ///
    /// Boxes that only share an edge or a corner count as intersecting.
    pub fn intersects(&self, other: &BoundingBox2D) -> bool {
        !(self.max_x() < other.min_x()
            || self.min_x() > other.max_x()
            || self.max_y() < other.min_y()
            || self.min_y() > other.max_y())
    }

    /// The overlapping region of two boxes, if they intersect.
    pub fn intersection(&self, other: &BoundingBox2D) -> Option<BoundingBox2D> {
        if !self.intersects(other) {
            return None;
        }
        Some(Self::new(
            self.min_x().max(other.min_x()),
            self.min_y().max(other.min_y()),
            self.max_x().min(other.max_x()),
            self.max_y().min(other.max_y()),
        ))
    }

    /// Area of the overlapping region, zero for disjoint boxes.
    pub fn intersection_area(&self, other: &BoundingBox2D) -> f64 {
        self.intersection(other).map_or(0.0, |overlap| overlap.area())
    }

    /// Area covered by either box.
    pub fn union_area(&self, other: &BoundingBox2D) -> f64 {
        self.area() + other.area() - self.intersection_area(other)
    }

    /// Intersection-over-union of two boxes.
    ///
    /// Returns `0.0` when the union is degenerate (both boxes have zero area).
    ///
    /// # Examples
    ///
    /// ```
    /// use nestlink_types::bbox::BoundingBox2D;
    ///
    /// let a = BoundingBox2D::new(0.0, 0.0, 2.0, 1.0);
    /// let b = BoundingBox2D::new(1.0, 0.0, 3.0, 1.0);
    /// assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-12);
    /// ```
    pub fn iou(&self, other: &BoundingBox2D) -> f64 {
        let union = self.union_area(other);
        if union <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / union
    }

    /// Closed ring of the box corners, counter-clockwise from the minimum corner.
    pub fn exterior_ring(&self) -> [[f64; 2]; 5] {
        [
            [self.min_x(), self.min_y()],
            [self.max_x(), self.min_y()],
            [self.max_x(), self.max_y()],
            [self.min_x(), self.max_y()],
            [self.min_x(), self.min_y()],
        ]
    }
}
