//! Rectangle types.
//!
//! These are used for letterboxing network inputs, palm detections, and the rotated hand regions
//! that are fed to the landmark network.

use std::fmt;

use nalgebra::{Rotation2, Vector2};

use crate::resolution::AspectRatio;

/// An axis-aligned rectangle.
///
/// Rectangles are allowed to have zero height and/or width. Negative dimensions are not allowed.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    center: Vector2<f32>,
    size: Vector2<f32>,
}

impl Rect {
    /// Creates a rectangle extending outwards from a center point.
    #[inline]
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            center: Vector2::new(x_center, y_center),
            size: Vector2::new(width, height),
        }
    }

    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        Self::from_center(
            top_left_x + width * 0.5,
            top_left_y + height * 0.5,
            width,
            height,
        )
    }

    /// Computes the (axis-aligned) bounding rectangle that encompasses `points`.
    ///
    /// Returns [`None`] if `points` is an empty iterator.
    pub fn bounding<I: IntoIterator<Item = [f32; 2]>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();

        let [x, y] = iter.next()?;
        let (mut min, mut max) = (Vector2::new(x, y), Vector2::new(x, y));
        for [x, y] in iter {
            let pt = Vector2::new(x, y);
            min = min.inf(&pt);
            max = max.sup(&pt);
        }

        let size = max - min;
        Some(Self::from_top_left(min.x, min.y, size.x, size.y))
    }

    /// Scales the width and height of this [`Rect`] by the given amount.
    ///
    /// The center position of the [`Rect`] remains the same.
    #[must_use]
    pub fn scale(&self, scale: f32) -> Self {
        Self {
            center: self.center,
            size: self.size * scale,
        }
    }

    /// Symmetrically extends one dimension of `self` so that the resulting rectangle has the given
    /// aspect ratio.
    #[must_use]
    pub fn grow_to_fit_aspect(&self, target_aspect: AspectRatio) -> Self {
        let mut res = *self;
        let target_width = self.height() * target_aspect.as_f32();
        if target_width >= self.width() {
            res.size.x = target_width;
        } else {
            res.size.y = self.width() / target_aspect.as_f32();
        }

        res
    }

    #[must_use]
    pub fn move_by(&self, x: f32, y: f32) -> Self {
        Self {
            center: self.center + Vector2::new(x, y),
            ..*self
        }
    }

    #[inline]
    pub fn top_left(&self) -> Vector2<f32> {
        self.center - self.size * 0.5
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> f32 {
        self.top_left().x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> f32 {
        self.top_left().y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size.y
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.size.x * self.size.y
    }

    #[inline]
    pub fn center(&self) -> Vector2<f32> {
        self.center
    }

    #[inline]
    pub fn size(&self) -> Vector2<f32> {
        self.size
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns [`None`] when the intersection is empty (ie. the rectangles do not overlap).
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min = self.top_left().sup(&other.top_left());
        let max = (self.top_left() + self.size).inf(&(other.top_left() + other.size));
        if min.x > max.x || min.y > max.y {
            return None;
        }

        Rect::bounding([[min.x, min.y], [max.x, max.y]])
    }

    fn intersection_area(&self, other: &Self) -> f32 {
        self.intersection(other).map_or(0.0, |rect| rect.area())
    }

    fn union_area(&self, other: &Self) -> f32 {
        self.area() + other.area() - self.intersection_area(other)
    }

    /// Computes the Intersection over Union (IOU) of `self` and `other`.
    ///
    /// Two empty rectangles have an IOU of 0.0.
    pub fn iou(&self, other: &Self) -> f32 {
        let union = self.union_area(other);
        if union <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / union
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})/{}x{}",
            self.center.x, self.center.y, self.size.x, self.size.y
        )
    }
}

/// A [`Rect`], rotated around its center.
///
/// The rotation is clockwise as seen in image coordinates (Y pointing down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    rect: Rect,
    radians: f32,
}

impl RotatedRect {
    /// Creates a new rotated rectangle.
    ///
    /// `radians` is the clockwise rotation to apply to the [`Rect`].
    #[inline]
    pub fn new(rect: Rect, radians: f32) -> Self {
        Self { rect, radians }
    }

    /// Returns the rectangle's clockwise rotation in radians.
    #[inline]
    pub fn rotation_radians(&self) -> f32 {
        self.radians
    }

    /// Returns a reference to the underlying non-rotated rectangle.
    #[inline]
    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    /// Applies a closure to the underlying non-rotated [`Rect`].
    #[must_use]
    pub fn map(mut self, f: impl FnOnce(Rect) -> Rect) -> Self {
        self.rect = f(self.rect);
        self
    }

    /// Transforms a point from the parent coordinate system into the [`RotatedRect`]'s system.
    ///
    /// The origin of the inner coordinate system is formed by the top left corner of the rectangle.
    pub fn transform_in(&self, x: f32, y: f32) -> [f32; 2] {
        let half = self.rect.size() * 0.5;
        let rel = Vector2::new(x, y) - self.rect.center();
        let p = Rotation2::new(-self.radians) * rel + half;
        [p.x, p.y]
    }

    /// Transforms a point from the [`RotatedRect`]'s coordinate system to the parent system.
    ///
    /// The origin of the inner coordinate system is formed by the top left corner of the rectangle.
    pub fn transform_out(&self, x: f32, y: f32) -> [f32; 2] {
        let half = self.rect.size() * 0.5;
        let rel = Vector2::new(x, y) - half;
        let p = Rotation2::new(self.radians) * rel + self.rect.center();
        [p.x, p.y]
    }
}

impl From<Rect> for RotatedRect {
    fn from(rect: Rect) -> Self {
        Self::new(rect, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_intersection() {
        let a = Rect::from_top_left(0.0, 0.0, 2.0, 2.0);
        let b = Rect::from_top_left(1.0, 1.0, 2.0, 2.0);
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, Rect::from_top_left(1.0, 1.0, 1.0, 1.0));

        let far = Rect::from_top_left(5.0, 5.0, 1.0, 1.0);
        assert!(a.intersection(&far).is_none());
    }

    #[test]
    fn test_iou() {
        let a = Rect::from_top_left(0.0, 0.0, 2.0, 2.0);
        assert_eq!(a.iou(&a), 1.0);

        let b = Rect::from_top_left(1.0, 0.0, 2.0, 2.0);
        // intersection 2, union 6
        assert_abs_diff_eq!(a.iou(&b), 1.0 / 3.0);

        let empty = Rect::from_center(0.0, 0.0, 0.0, 0.0);
        assert_eq!(empty.iou(&empty), 0.0);
    }

    #[test]
    fn test_bounding() {
        let rect = Rect::bounding([[1.0, 5.0], [-1.0, 2.0], [3.0, 3.0]]).unwrap();
        assert_eq!(rect, Rect::from_top_left(-1.0, 2.0, 4.0, 3.0));
        assert!(Rect::bounding([]).is_none());
    }

    #[test]
    fn test_scale() {
        let rect = Rect::from_center(0.0, 0.0, 2.0, 4.0);
        assert_eq!(rect.scale(2.0), Rect::from_center(0.0, 0.0, 4.0, 8.0));
    }

    #[test]
    fn test_fit_aspect() {
        let wide = Rect::from_top_left(0.0, 0.0, 640.0, 480.0);
        let square = wide.grow_to_fit_aspect(AspectRatio::SQUARE);
        assert_eq!(square, Rect::from_center(320.0, 240.0, 640.0, 640.0));
        assert_eq!(square.y(), -80.0);

        let tall = Rect::from_top_left(0.0, 0.0, 480.0, 640.0);
        let square = tall.grow_to_fit_aspect(AspectRatio::SQUARE);
        assert_eq!(square, Rect::from_center(240.0, 320.0, 640.0, 640.0));
    }

    #[test]
    fn test_rotated_rect_transform() {
        let rect = Rect::from_top_left(10.0, 20.0, 4.0, 2.0);

        let unrotated = RotatedRect::from(rect);
        assert_eq!(unrotated.transform_out(0.0, 0.0), [10.0, 20.0]);
        assert_eq!(unrotated.transform_in(10.0, 20.0), [0.0, 0.0]);

        // A quarter turn clockwise maps the inner "right" direction to "down".
        let rotated = RotatedRect::new(rect, FRAC_PI_2);
        let [x, y] = rotated.transform_out(4.0, 1.0);
        assert_abs_diff_eq!(x, 12.0, epsilon = 1e-5);
        assert_abs_diff_eq!(y, 23.0, epsilon = 1e-5);

        let [x, y] = rotated.transform_in(12.0, 23.0);
        assert_abs_diff_eq!(x, 4.0, epsilon = 1e-5);
        assert_abs_diff_eq!(y, 1.0, epsilon = 1e-5);
    }
}
