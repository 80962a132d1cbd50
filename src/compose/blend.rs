use crate::foundation::core::BlendMode;
use crate::foundation::error::{MocksmithError, MocksmithResult};
use crate::foundation::math::{lerp_u8, mul_div255_u8};

/// Straight-alpha RGBA8 pixel.
pub type Rgba8 = [u8; 4];

/// Combine one design pixel over one base pixel.
///
/// `coverage` is the design's alpha scaled by template opacity, 0..=255. The
/// blended color is computed per the mode, then the base is moved toward it by
/// `coverage`. Bases are template photographs and assumed opaque; alpha is
/// carried through standard straight-over arithmetic regardless.
pub fn blend_px(base: Rgba8, design: Rgba8, mode: BlendMode, coverage: u16, boost: u16) -> Rgba8 {
    if coverage == 0 {
        return base;
    }

    let mut out = [0u8; 4];
    for i in 0..3 {
        let b = u16::from(base[i]);
        let d = boosted(design[i], mode, boost);
        let blended = match mode {
            BlendMode::Normal => d as u8,
            BlendMode::Multiply => mul_div255_u8(b, d),
            BlendMode::Screen => screen_channel(b, d),
            BlendMode::Overlay => {
                if b < 128 {
                    mul_div255_u8(2 * b, d).min(255)
                } else {
                    255 - mul_div255_u8(2 * (255 - b), 255 - d)
                }
            }
        };
        out[i] = lerp_u8(base[i], blended, coverage);
    }

    let ba = u16::from(base[3]);
    out[3] = (coverage + mul_div255_u8(ba, 255 - coverage) as u16).min(255) as u8;
    out
}

fn screen_channel(b: u16, d: u16) -> u8 {
    255 - mul_div255_u8(255 - b, 255 - d)
}

// Brightness boost applies to the design channel only, before the screen
// formula, and never for other modes.
fn boosted(c: u8, mode: BlendMode, boost: u16) -> u16 {
    if mode != BlendMode::Screen || boost <= 256 {
        return u16::from(c);
    }
    ((u32::from(c) * u32::from(boost)) >> 8).min(255) as u16
}

/// Blend an equal-sized design layer onto a base buffer in place.
///
/// `boost` is the screen brightness multiplier (1.0 = no boost); it is
/// quantized to 8.8 fixed point.
pub fn blend_in_place(
    base: &mut [u8],
    design: &[u8],
    mode: BlendMode,
    opacity: f64,
    boost: f64,
) -> MocksmithResult<()> {
    if base.len() != design.len() || !base.len().is_multiple_of(4) {
        return Err(MocksmithError::asset(
            "blend_in_place expects equal-length rgba8 buffers",
        ));
    }
    let opacity = opacity.clamp(0.0, 1.0);
    let op = ((opacity * 255.0).round() as i64).clamp(0, 255) as u16;
    let boost_q8 = ((boost.max(1.0) * 256.0).round() as i64).clamp(256, 65535) as u16;

    for (b, d) in base.chunks_exact_mut(4).zip(design.chunks_exact(4)) {
        let coverage = u16::from(mul_div255_u8(u16::from(d[3]), op));
        let out = blend_px(
            [b[0], b[1], b[2], b[3]],
            [d[0], d[1], d[2], d[3]],
            mode,
            coverage,
            boost_q8,
        );
        b.copy_from_slice(&out);
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/compose/blend.rs"]
mod tests;
