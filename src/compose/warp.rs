use image::RgbaImage;
use kurbo::Point;

use crate::compose::blend::Rgba8;
use crate::foundation::core::Quad;
use crate::foundation::error::{MocksmithError, MocksmithResult};

/// A 3×3 projective transform in row-major order, normalized so `m[8] == 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    /// Row-major coefficients `[a b c; d e f; g h 1]`.
    pub m: [f64; 9],
}

impl Homography {
    /// Solve the homography mapping four source points onto four destination
    /// points (same ordering on both sides).
    ///
    /// Fails with a `Geometry` error when the system is singular, which is
    /// exactly the degenerate-quad case (collinear corners).
    pub fn quad_to_quad(src: [Point; 4], dst: [Point; 4]) -> MocksmithResult<Self> {
        // Standard DLT rows for [a b c d e f g h] with i fixed at 1:
        //   u = (a·x + b·y + c) / (g·x + h·y + 1)
        //   v = (d·x + e·y + f) / (g·x + h·y + 1)
        let mut aug = [[0.0f64; 9]; 8];
        for i in 0..4 {
            let (x, y) = (src[i].x, src[i].y);
            let (u, v) = (dst[i].x, dst[i].y);
            aug[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, u];
            aug[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, v];
        }

        let sol = solve_8x8(&mut aug)?;
        Ok(Self {
            m: [
                sol[0], sol[1], sol[2], sol[3], sol[4], sol[5], sol[6], sol[7], 1.0,
            ],
        })
    }

    /// Homography mapping the design rectangle `(0,0)-(w,0)-(w,h)-(0,h)` onto
    /// the quad's corners in TL, TR, BR, BL order.
    pub fn rect_to_quad(width: f64, height: f64, quad: &Quad) -> MocksmithResult<Self> {
        if !(width > 0.0) || !(height > 0.0) {
            return Err(MocksmithError::geometry(
                "warp source extent must be positive",
            ));
        }
        let src = [
            Point::new(0.0, 0.0),
            Point::new(width, 0.0),
            Point::new(width, height),
            Point::new(0.0, height),
        ];
        Self::quad_to_quad(src, quad.corners)
    }

    /// Inverse transform via the adjugate, renormalized to `m[8] == 1`.
    pub fn invert(&self) -> MocksmithResult<Self> {
        let m = &self.m;
        let det = m[0] * (m[4] * m[8] - m[5] * m[7]) - m[1] * (m[3] * m[8] - m[5] * m[6])
            + m[2] * (m[3] * m[7] - m[4] * m[6]);
        if det.abs() < 1e-12 {
            return Err(MocksmithError::geometry(
                "homography is singular and cannot be inverted",
            ));
        }

        let adj = [
            m[4] * m[8] - m[5] * m[7],
            m[2] * m[7] - m[1] * m[8],
            m[1] * m[5] - m[2] * m[4],
            m[5] * m[6] - m[3] * m[8],
            m[0] * m[8] - m[2] * m[6],
            m[2] * m[3] - m[0] * m[5],
            m[3] * m[7] - m[4] * m[6],
            m[1] * m[6] - m[0] * m[7],
            m[0] * m[4] - m[1] * m[3],
        ];
        let norm = adj[8] / det;
        if norm.abs() < 1e-12 {
            return Err(MocksmithError::geometry(
                "inverted homography cannot be normalized",
            ));
        }
        let mut out = [0.0f64; 9];
        for (o, a) in out.iter_mut().zip(adj.iter()) {
            *o = a / det / norm;
        }
        Ok(Self { m: out })
    }

    /// Apply the transform to a point. Points on the line at infinity
    /// (denominator ~ 0) map far outside any canvas.
    pub fn apply(&self, p: Point) -> Point {
        let m = &self.m;
        let w = m[6] * p.x + m[7] * p.y + m[8];
        if w.abs() < 1e-12 {
            return Point::new(f64::MAX, f64::MAX);
        }
        Point::new(
            (m[0] * p.x + m[1] * p.y + m[2]) / w,
            (m[3] * p.x + m[4] * p.y + m[5]) / w,
        )
    }

    /// Whether the projective row is (numerically) zero, i.e. the transform is
    /// a plain affine map. Axis-aligned quads must satisfy this.
    pub fn is_affine(&self) -> bool {
        self.m[6].abs() < 1e-9 && self.m[7].abs() < 1e-9
    }
}

// Gaussian elimination with partial pivoting on an 8×8 system with one
// right-hand side (stored as column 8).
fn solve_8x8(aug: &mut [[f64; 9]; 8]) -> MocksmithResult<[f64; 8]> {
    for col in 0..8 {
        let mut pivot = col;
        for row in (col + 1)..8 {
            if aug[row][col].abs() > aug[pivot][col].abs() {
                pivot = row;
            }
        }
        if aug[pivot][col].abs() < 1e-12 {
            return Err(MocksmithError::geometry(
                "quad corners are degenerate (homography system is singular)",
            ));
        }
        aug.swap(col, pivot);

        for row in (col + 1)..8 {
            let factor = aug[row][col] / aug[col][col];
            for k in col..9 {
                aug[row][k] -= factor * aug[col][k];
            }
        }
    }

    let mut sol = [0.0f64; 8];
    for col in (0..8).rev() {
        let mut acc = aug[col][8];
        for k in (col + 1)..8 {
            acc -= aug[col][k] * sol[k];
        }
        sol[col] = acc / aug[col][col];
    }
    Ok(sol)
}

/// Shrink a quad toward its centroid by `factor` (1.0 = unchanged).
///
/// This is how `padding_factor` applies to perspective placement: the design
/// still maps corner-to-corner, but onto a proportionally smaller quad.
pub fn shrink_quad(quad: &Quad, factor: f64) -> MocksmithResult<Quad> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(MocksmithError::geometry("shrink factor must be > 0"));
    }
    let cx = quad.corners.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = quad.corners.iter().map(|p| p.y).sum::<f64>() / 4.0;
    let corners = quad
        .corners
        .map(|p| Point::new(cx + (p.x - cx) * factor, cy + (p.y - cy) * factor));
    Quad::new(corners)
}

/// Warp a design through the quad's homography into a transparent
/// canvas-sized layer, sampling with Catmull-Rom bicubic filtering.
///
/// Each canvas pixel inside the quad's bounding box is inverse-mapped into
/// design space; pixels landing outside the design stay transparent, which
/// bounds the warp exactly to the quad.
pub fn warp_into_canvas(
    design: &RgbaImage,
    quad: &Quad,
    canvas_width: u32,
    canvas_height: u32,
) -> MocksmithResult<RgbaImage> {
    quad.validate()?;
    let (dw, dh) = (f64::from(design.width()), f64::from(design.height()));
    let forward = Homography::rect_to_quad(dw, dh, quad)?;
    let inverse = forward.invert()?;

    let bb = quad.bounding_box();
    let x_min = bb.x0.floor().max(0.0) as u32;
    let y_min = bb.y0.floor().max(0.0) as u32;
    let x_max = (bb.x1.ceil() as i64).clamp(0, i64::from(canvas_width)) as u32;
    let y_max = (bb.y1.ceil() as i64).clamp(0, i64::from(canvas_height)) as u32;

    let mut out = RgbaImage::new(canvas_width, canvas_height);
    for y in y_min..y_max {
        for x in x_min..x_max {
            let src = inverse.apply(Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5));
            if src.x < 0.0 || src.y < 0.0 || src.x > dw || src.y > dh {
                continue;
            }
            let px = sample_bicubic(design, src.x, src.y);
            out.put_pixel(x, y, image::Rgba(px));
        }
    }
    Ok(out)
}

/// Catmull-Rom bicubic sample at a continuous position in pixel coordinates
/// (pixel centers at `i + 0.5`), with edge-clamped taps.
pub fn sample_bicubic(img: &RgbaImage, x: f64, y: f64) -> Rgba8 {
    let w = img.width() as i64;
    let h = img.height() as i64;

    let px = x - 0.5;
    let py = y - 0.5;
    let x0 = px.floor();
    let y0 = py.floor();
    let wx = catmull_rom_weights(px - x0);
    let wy = catmull_rom_weights(py - y0);

    let mut acc = [0.0f64; 4];
    for (j, wyj) in wy.iter().enumerate() {
        let sy = (y0 as i64 + j as i64 - 1).clamp(0, h - 1) as u32;
        for (i, wxi) in wx.iter().enumerate() {
            let sx = (x0 as i64 + i as i64 - 1).clamp(0, w - 1) as u32;
            let p = img.get_pixel(sx, sy).0;
            let wgt = wxi * wyj;
            for c in 0..4 {
                acc[c] += wgt * f64::from(p[c]);
            }
        }
    }

    let mut out = [0u8; 4];
    for c in 0..4 {
        out[c] = acc[c].round().clamp(0.0, 255.0) as u8;
    }
    out
}

// Catmull-Rom weights for taps at offsets -1, 0, 1, 2 given fraction t.
fn catmull_rom_weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/compose/warp.rs"]
mod tests;
