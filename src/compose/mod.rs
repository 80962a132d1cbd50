//! Pixel pipeline: placement, warping, blending, shadows, and the
//! batch compositor that ties them together.

pub mod blend;
pub mod blur;
pub mod engine;
pub mod shadow;
pub mod warp;
