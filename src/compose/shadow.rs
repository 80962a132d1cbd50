use image::RgbaImage;

use crate::compose::blur::blur_alpha;
use crate::foundation::error::MocksmithResult;
use crate::template::model::ShadowSettings;

/// Build a drop-shadow layer for a positioned design layer.
///
/// The design's alpha is offset, gaussian-blurred, and scaled by the shadow
/// opacity; the result is a black silhouette the same size as the canvas,
/// meant to be normal-blended beneath the design.
pub fn shadow_layer(layer: &RgbaImage, settings: &ShadowSettings) -> MocksmithResult<RgbaImage> {
    let (w, h) = layer.dimensions();
    let opacity = settings.opacity.clamp(0.0, 1.0);

    // Offset the alpha mask first so the blur softens the shifted silhouette.
    let mut mask = vec![0u8; (w as usize) * (h as usize)];
    let [dx, dy] = settings.offset;
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let sx = x - i64::from(dx);
            let sy = y - i64::from(dy);
            if sx < 0 || sy < 0 || sx >= i64::from(w) || sy >= i64::from(h) {
                continue;
            }
            let a = layer.get_pixel(sx as u32, sy as u32).0[3];
            mask[(y * i64::from(w) + x) as usize] = a;
        }
    }

    let radius = settings.blur_radius;
    let blurred = if radius > 0 {
        blur_alpha(&mask, w, h, radius, f64::from(radius) / 2.0)?
    } else {
        mask
    };

    let mut out = RgbaImage::new(w, h);
    for (i, px) in out.pixels_mut().enumerate() {
        let a = (f64::from(blurred[i]) * opacity).round().clamp(0.0, 255.0) as u8;
        *px = image::Rgba([0, 0, 0, a]);
    }
    Ok(out)
}
