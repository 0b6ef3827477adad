//! Common types for visual landmarks.

/// A landmark in 3D space.
///
/// Depending on where it came from, the X and Y coordinates are either in pixels or normalized to
/// the input image's size. Z is a relative depth value (smaller values are closer to the camera)
/// that shares the scale of the X coordinate.
#[derive(Debug, PartialEq, PartialOrd, Clone, Copy, Default)]
pub struct Landmark {
    pos: [f32; 3],
}

impl Landmark {
    #[inline]
    pub fn new(position: [f32; 3]) -> Self {
        Self { pos: position }
    }

    #[inline]
    pub fn position(&self) -> [f32; 3] {
        self.pos
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.pos[0]
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.pos[1]
    }

    #[inline]
    pub fn z(&self) -> f32 {
        self.pos[2]
    }

    /// Returns whether all coordinates of this landmark are finite (not NaN or infinite).
    pub fn is_finite(&self) -> bool {
        self.pos.iter().all(|c| c.is_finite())
    }

    /// Applies `f` to the landmark's position.
    #[must_use]
    pub fn map(self, f: impl FnOnce([f32; 3]) -> [f32; 3]) -> Self {
        Self { pos: f(self.pos) }
    }
}

impl From<[f32; 3]> for Landmark {
    fn from(pos: [f32; 3]) -> Self {
        Self::new(pos)
    }
}
