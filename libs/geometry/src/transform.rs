//! Affine symbol transforms.

use serde::{Deserialize, Serialize};

use crate::point::Point;

/// A 2-D affine transform in the six-element `[a, b, c, d, e, f]` form
/// used by schematic documents:
///
/// ```text
/// | x' |   | a  c  e |   | x |
/// | y' | = | b  d  f | * | y |
/// | 1  |   | 0  0  1 |   | 1 |
/// ```
///
/// Symbol transforms are expected to be unimodular (rotations, reflections,
/// and translations); this type does not enforce that, but pin placement
/// rounds back onto the integer grid afterwards.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct Affine {
    /// Matrix entry in row 0, column 0.
    pub a: f64,
    /// Matrix entry in row 1, column 0.
    pub b: f64,
    /// Matrix entry in row 0, column 1.
    pub c: f64,
    /// Matrix entry in row 1, column 1.
    pub d: f64,
    /// The x translation.
    pub e: f64,
    /// The y translation.
    pub f: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<[f64; 6]> for Affine {
    fn from([a, b, c, d, e, f]: [f64; 6]) -> Self {
        Self { a, b, c, d, e, f }
    }
}

impl From<Affine> for [f64; 6] {
    fn from(t: Affine) -> Self {
        [t.a, t.b, t.c, t.d, t.e, t.f]
    }
}

impl Affine {
    /// Returns the identity transform, leaving any placed pin unmodified.
    pub const fn identity() -> Self {
        Self {
            a: 1.,
            b: 0.,
            c: 0.,
            d: 1.,
            e: 0.,
            f: 0.,
        }
    }

    /// Returns a counterclockwise rotation by `angle` degrees.
    pub fn rotate(angle: f64) -> Self {
        let sin = angle.to_radians().sin();
        let cos = angle.to_radians().cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.,
            f: 0.,
        }
    }

    /// Applies the transform to local coordinates `(x, y)`.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Places a symbol-local pin onto the grid.
    ///
    /// The pin at `(x, y)` is shifted so the symbol rotates about its center
    /// `(mid, mid)`, transformed, shifted back, offset by the symbol origin,
    /// and rounded half-away-from-zero onto the grid.
    pub fn place(&self, origin: Point, mid: f64, x: f64, y: f64) -> Point {
        let (nx, ny) = self.apply(x - mid, y - mid);
        Point::new(
            (origin.x as f64 + nx + mid).round() as i64,
            (origin.y as f64 + ny + mid).round() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_placement_is_translation() {
        let t = Affine::identity();
        assert_eq!(t.place(Point::new(2, 0), 1.0, 1.0, 0.0), Point::new(3, 0));
        assert_eq!(t.place(Point::new(2, 0), 1.0, 1.0, 2.0), Point::new(3, 2));
    }

    #[test]
    fn quarter_turn_matches_matrix() {
        let t = Affine::rotate(90.);
        let (x, y) = t.apply(1., 0.);
        assert_relative_eq!(x, 0., epsilon = 1e-12);
        assert_relative_eq!(y, 1., epsilon = 1e-12);
    }

    #[test]
    fn quarter_turn_of_mosfet_pins() {
        // Quarter turn as a unimodular 6-tuple, device origin (5, 5),
        // 3-wide symbol grid (mid = 1.0). Pin layout D(1,0) G(0,1) B(1,1)
        // S(1,2).
        let t = Affine::from([0., -1., 1., 0., 0., 0.]);
        assert_eq!(t.place(Point::new(5, 5), 1.0, 1.0, 0.0), Point::new(5, 6));
        assert_eq!(t.place(Point::new(5, 5), 1.0, 0.0, 1.0), Point::new(6, 7));
        assert_eq!(t.place(Point::new(5, 5), 1.0, 1.0, 1.0), Point::new(6, 6));
        assert_eq!(t.place(Point::new(5, 5), 1.0, 1.0, 2.0), Point::new(7, 6));
    }

    #[test]
    fn unimodular_transforms_stay_on_grid() {
        // For every rotation/reflection in {-1, 0, 1}, centered pin
        // coordinates are integers, so rounding never moves a pin.
        let eight = [
            [1., 0., 0., 1.],
            [0., 1., -1., 0.],
            [-1., 0., 0., -1.],
            [0., -1., 1., 0.],
            [-1., 0., 0., 1.],
            [1., 0., 0., -1.],
            [0., 1., 1., 0.],
            [0., -1., -1., 0.],
        ];
        for m in eight {
            let t = Affine::from([m[0], m[1], m[2], m[3], 0., 0.]);
            for (px, py) in [(1., 0.), (0., 1.), (1., 1.), (1., 2.)] {
                let (nx, ny) = t.apply(px - 1.0, py - 1.0);
                assert_relative_eq!(nx, nx.round());
                assert_relative_eq!(ny, ny.round());
            }
        }
    }

    #[test]
    fn serde_six_tuple() {
        let t: Affine = serde_json::from_str("[0,1,-1,0,2,3]").unwrap();
        assert_eq!(t, Affine::from([0., 1., -1., 0., 2., 3.]));
    }
}
