use crate::foundation::error::{MocksmithError, MocksmithResult};

pub use kurbo::{Point, Rect, Vec2};

/// Axis-aligned placement rectangle in template canvas coordinates.
///
/// Stored as `[x1, y1, x2, y2]` with `x1 < x2` and `y1 < y2`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DesignArea {
    /// Left edge.
    pub x1: f64,
    /// Top edge.
    pub y1: f64,
    /// Right edge (exclusive of margin, inclusive of pixels).
    pub x2: f64,
    /// Bottom edge.
    pub y2: f64,
}

impl DesignArea {
    /// Construct from corner coordinates, validating ordering and finiteness.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> MocksmithResult<Self> {
        let area = Self { x1, y1, x2, y2 };
        area.validate()?;
        Ok(area)
    }

    /// Construct from a `[x1, y1, x2, y2]` array as it appears in config.
    pub fn from_array(v: [f64; 4]) -> MocksmithResult<Self> {
        Self::new(v[0], v[1], v[2], v[3])
    }

    /// Validate ordering and finiteness.
    pub fn validate(&self) -> MocksmithResult<()> {
        for (name, v) in [
            ("x1", self.x1),
            ("y1", self.y1),
            ("x2", self.x2),
            ("y2", self.y2),
        ] {
            if !v.is_finite() {
                return Err(MocksmithError::geometry(format!(
                    "design_area {name} must be finite"
                )));
            }
        }
        if self.x1 >= self.x2 || self.y1 >= self.y2 {
            return Err(MocksmithError::geometry(
                "design_area requires x1 < x2 and y1 < y2",
            ));
        }
        Ok(())
    }

    /// Width of the region.
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Height of the region.
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Center point of the region.
    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// Ordered placement quad: top-left, top-right, bottom-right, bottom-left.
///
/// Used for photographed templates where the printable surface is seen at an
/// angle and requires a projective transform.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Quad {
    /// Corner points in TL, TR, BR, BL order.
    pub corners: [Point; 4],
}

impl Quad {
    /// Construct from corner points, rejecting degenerate geometry.
    pub fn new(corners: [Point; 4]) -> MocksmithResult<Self> {
        let quad = Self { corners };
        quad.validate()?;
        Ok(quad)
    }

    /// Construct from a `[[x, y]; 4]` array as it appears in config.
    pub fn from_array(v: [[f64; 2]; 4]) -> MocksmithResult<Self> {
        Self::new([
            Point::new(v[0][0], v[0][1]),
            Point::new(v[1][0], v[1][1]),
            Point::new(v[2][0], v[2][1]),
            Point::new(v[3][0], v[3][1]),
        ])
    }

    /// Validate finiteness, convex ordering, and non-zero area.
    ///
    /// A quad whose corners are collinear, or whose TL,TR,BR,BL ordering
    /// self-intersects, is rejected: the homography either does not exist or
    /// flips the design through itself.
    pub fn validate(&self) -> MocksmithResult<()> {
        for (i, p) in self.corners.iter().enumerate() {
            if !p.x.is_finite() || !p.y.is_finite() {
                return Err(MocksmithError::geometry(format!(
                    "quad corner {i} must be finite"
                )));
            }
        }

        // Cross product of consecutive edges must keep a consistent sign for
        // the TL,TR,BR,BL winding to be convex and non-self-intersecting.
        let mut sign = 0.0f64;
        for i in 0..4 {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % 4];
            let c = self.corners[(i + 2) % 4];
            let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
            if cross.abs() < f64::EPSILON * 64.0 {
                return Err(MocksmithError::geometry(
                    "quad corners are collinear (zero-area edge turn)",
                ));
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return Err(MocksmithError::geometry(
                    "quad corners self-intersect (inconsistent winding)",
                ));
            }
        }

        if self.area() < 1.0 {
            return Err(MocksmithError::geometry("quad area is degenerate"));
        }
        Ok(())
    }

    /// Absolute area via the shoelace formula.
    pub fn area(&self) -> f64 {
        let mut acc = 0.0;
        for i in 0..4 {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % 4];
            acc += a.x * b.y - b.x * a.y;
        }
        (acc / 2.0).abs()
    }

    /// Axis-aligned bounding box of the corners.
    pub fn bounding_box(&self) -> Rect {
        let xs = self.corners.map(|p| p.x);
        let ys = self.corners.map(|p| p.y);
        let min_x = xs.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_x = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min_y = ys.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_y = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Rect::new(min_x, min_y, max_x, max_y)
    }

    /// Whether the quad is a true axis-aligned rectangle.
    pub fn is_axis_aligned(&self) -> bool {
        let [tl, tr, br, bl] = self.corners;
        (tl.y - tr.y).abs() < 1e-9
            && (bl.y - br.y).abs() < 1e-9
            && (tl.x - bl.x).abs() < 1e-9
            && (tr.x - br.x).abs() < 1e-9
    }

    /// Equivalent [`DesignArea`] when [`Self::is_axis_aligned`] holds.
    pub fn as_design_area(&self) -> Option<DesignArea> {
        if !self.is_axis_aligned() {
            return None;
        }
        let [tl, _, br, _] = self.corners;
        DesignArea::new(tl.x, tl.y, br.x, br.y).ok()
    }
}

/// Placement geometry for a template: rectangle or perspective quad.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Placement {
    /// Axis-aligned rectangle placement.
    Area(DesignArea),
    /// Four-corner perspective placement.
    Quad(Quad),
}

impl Placement {
    /// Width/height of the target region (the quad's source rectangle uses
    /// its bounding box extents).
    pub fn target_extents(&self) -> (f64, f64) {
        match self {
            Placement::Area(a) => (a.width(), a.height()),
            Placement::Quad(q) => {
                let bb = q.bounding_box();
                (bb.width(), bb.height())
            }
        }
    }
}

/// Pixel-combination formula used when compositing design over base.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Straight alpha composite using the design's own alpha.
    #[default]
    Normal,
    /// `base × design`; integrates the design into light fabric, but drives
    /// toward black on dark bases.
    Multiply,
    /// `1 − (1−base)(1−design)`; the choice for dark bases.
    Screen,
    /// Multiply below mid-gray base, screen at or above it.
    Overlay,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
