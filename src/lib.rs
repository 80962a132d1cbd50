//! mocksmith is a CPU mockup composition engine with output-cache retention.
//!
//! The pipeline takes a flat design image and a product template (a
//! photograph plus a configured printable region), scales or
//! perspective-warps the design into that region, blends it with the
//! product surface, and writes an encoded preview. A retention layer then
//! keeps the output directories within configured age, count, and size
//! limits, archiving or deleting what falls outside them.
//!
//! # Pipeline overview
//!
//! 1. **Load**: `templates.json -> TemplateStore` (deep-merged, validated settings)
//! 2. **Place**: scale-and-center into a `DesignArea`, or homography-warp onto a `Quad`
//! 3. **Blend**: normal / multiply / screen / overlay, with optional shadow and fabric blur
//! 4. **Retain**: `output_config.json -> RetentionManager` cleanup over the output tree
//!
//! Entry points: [`TemplateStore`] loads template config, [`Compositor`]
//! renders mockups, [`RetentionManager`] runs cleanup.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod compose;
mod foundation;
mod retention;
mod template;

pub use compose::blend::{Rgba8, blend_in_place, blend_px};
pub use compose::blur::{blur_alpha, blur_rgba8};
pub use compose::engine::{
    BatchOptions, ComposeJob, Compositor, GeneratedMockup, OutputFormat, OutputSettings,
    compose_pixels,
};
pub use compose::shadow::shadow_layer;
pub use compose::warp::{Homography, sample_bicubic, shrink_quad, warp_into_canvas};
pub use foundation::core::{BlendMode, DesignArea, Placement, Point, Quad, Rect, Vec2};
pub use foundation::error::{MocksmithError, MocksmithResult};
pub use retention::classify::{Category, classify, glob_match};
pub use retention::manager::{
    ActionReason, CacheStats, CleanupPlan, CleanupReport, RetentionAction, RetentionManager,
    TrackedFile,
};
pub use retention::policy::{
    CacheSettings, CategoryPolicy, CleanupSchedule, CompressionSettings, MonitoringSettings,
    RetentionConfig, ScheduleFrequency,
};
pub use retention::state::{CacheState, CategoryStats};
pub use template::model::{
    CategoryConfig, ShadowSettings, Template, TemplateConfigDoc, TemplateSettings, deep_merge,
    resolve_settings,
};
pub use template::store::TemplateStore;
