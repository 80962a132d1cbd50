use std::collections::BTreeMap;

use serde_json::Value;

use crate::foundation::core::{BlendMode, DesignArea, Placement, Quad};
use crate::foundation::error::{MocksmithError, MocksmithResult};

/// Top-level template configuration document.
///
/// Mirrors the on-disk JSON layout: one entry per product category, each with
/// category-wide `default_settings` and a map of per-template override blocks.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TemplateConfigDoc {
    /// Product category name → category block.
    pub template_categories: BTreeMap<String, CategoryConfig>,
}

/// Per-category configuration block.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct CategoryConfig {
    /// Settings inherited by every template in the category.
    #[serde(default)]
    pub default_settings: Value,
    /// Template name → override block merged over the defaults.
    #[serde(default)]
    pub templates: BTreeMap<String, Value>,
}

/// Drop-shadow parameters for a template.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShadowSettings {
    /// Shadow offset in pixels `[dx, dy]`.
    #[serde(default = "default_shadow_offset")]
    pub offset: [i32; 2],
    /// Shadow opacity in `[0, 1]`.
    pub opacity: f64,
    /// Gaussian blur radius in pixels.
    #[serde(default = "default_shadow_blur")]
    pub blur_radius: u32,
}

fn default_shadow_offset() -> [i32; 2] {
    [8, 8]
}

fn default_shadow_blur() -> u32 {
    6
}

/// Fully resolved, validated settings for one template.
///
/// Constructed once at load time by deep-merging the category defaults with
/// the template's own block; every field is owned value data, so no two
/// templates can alias the same geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateSettings {
    /// Template photograph path, relative to the assets root.
    pub source: Option<String>,
    /// Placement geometry (rectangle or perspective quad).
    pub placement: Placement,
    /// Blend mode used when compositing the design over the base.
    pub blend_mode: BlendMode,
    /// Design opacity in `[0, 1]`.
    pub opacity: f64,
    /// Fraction of the target region the scaled design fills (1.0 =
    /// edge-to-edge on the limiting axis).
    pub padding_factor: f64,
    /// Multiplier (>= 1.0) applied to design channels before the screen
    /// formula, to compensate for dark bases.
    pub brightness_boost: Option<f64>,
    /// Soften the design slightly before blending, for fabric texture.
    pub fabric_blur: bool,
    /// Optional drop shadow beneath the design.
    pub shadow: Option<ShadowSettings>,
    /// Descriptive base-color tag (informational, not used in math).
    pub color_base: Option<String>,
}

/// An immutable named template: identity plus resolved settings.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    /// Product category this template belongs to.
    pub product_type: String,
    /// Template name, unique within the category.
    pub name: String,
    /// Resolved settings.
    pub settings: TemplateSettings,
}

impl Template {
    /// Stable `product_type/name` identifier used in error messages.
    pub fn id(&self) -> String {
        format!("{}/{}", self.product_type, self.name)
    }
}

/// Deep-merge `overlay` onto `base`.
///
/// Objects merge key-by-key, recursing into nested objects; arrays and
/// scalars from the overlay replace the base wholesale. Both inputs are read
/// through owned clones, so the result never shares structure with either
/// document.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(b), Value::Object(o)) => {
            let mut out = b.clone();
            for (k, v) in o {
                let merged = match out.get(k) {
                    Some(existing) => deep_merge(existing, v),
                    None => v.clone(),
                };
                out.insert(k.clone(), merged);
            }
            Value::Object(out)
        }
        (_, overlay) => overlay.clone(),
    }
}

// Serde shape of a merged settings block. Unknown keys (perspective_type,
// difficulty, annotation metadata) are accepted and ignored.
#[derive(serde::Deserialize)]
struct RawSettings {
    source: Option<String>,
    design_area: Option<[f64; 4]>,
    corners: Option<[[f64; 2]; 4]>,
    blend_mode: Option<BlendMode>,
    opacity: Option<f64>,
    padding_factor: Option<f64>,
    brightness_boost: Option<f64>,
    #[serde(default)]
    fabric_blur: bool,
    shadow: Option<ShadowSettings>,
    color_base: Option<String>,
}

/// Resolve and validate a merged settings block for `(product_type, name)`.
///
/// Every required-field or range violation fails with a `Config` error that
/// names the offending template.
pub fn resolve_settings(
    product_type: &str,
    name: &str,
    merged: &Value,
) -> MocksmithResult<TemplateSettings> {
    let ident = format!("{product_type}/{name}");
    let raw: RawSettings = serde_json::from_value(merged.clone()).map_err(|e| {
        MocksmithError::config(format!("template '{ident}' has a malformed block: {e}"))
    })?;

    let placement = match (raw.design_area, raw.corners) {
        (Some(_), Some(_)) => {
            return Err(MocksmithError::config(format!(
                "template '{ident}' declares both design_area and corners; pick one"
            )));
        }
        (Some(area), None) => Placement::Area(DesignArea::from_array(area).map_err(|e| {
            MocksmithError::config(format!("template '{ident}' design_area invalid: {e}"))
        })?),
        (None, Some(corners)) => Placement::Quad(Quad::from_array(corners).map_err(|e| {
            MocksmithError::config(format!("template '{ident}' corners invalid: {e}"))
        })?),
        (None, None) => {
            return Err(MocksmithError::config(format!(
                "template '{ident}' is missing placement geometry (design_area or corners)"
            )));
        }
    };

    let blend_mode = raw.blend_mode.ok_or_else(|| {
        MocksmithError::config(format!("template '{ident}' is missing blend_mode"))
    })?;

    let opacity = raw
        .opacity
        .ok_or_else(|| MocksmithError::config(format!("template '{ident}' is missing opacity")))?;
    if !opacity.is_finite() || !(0.0..=1.0).contains(&opacity) {
        return Err(MocksmithError::config(format!(
            "template '{ident}' opacity must be in [0, 1]"
        )));
    }

    let padding_factor = raw.padding_factor.unwrap_or(1.0);
    if !padding_factor.is_finite() || padding_factor <= 0.0 {
        return Err(MocksmithError::config(format!(
            "template '{ident}' padding_factor must be > 0"
        )));
    }

    if let Some(boost) = raw.brightness_boost
        && (!boost.is_finite() || boost < 1.0)
    {
        return Err(MocksmithError::config(format!(
            "template '{ident}' brightness_boost must be >= 1.0"
        )));
    }

    if let Some(shadow) = &raw.shadow {
        if !shadow.opacity.is_finite() || !(0.0..=1.0).contains(&shadow.opacity) {
            return Err(MocksmithError::config(format!(
                "template '{ident}' shadow.opacity must be in [0, 1]"
            )));
        }
    }

    Ok(TemplateSettings {
        source: raw.source,
        placement,
        blend_mode,
        opacity,
        padding_factor,
        brightness_boost: raw.brightness_boost,
        fabric_blur: raw.fabric_blur,
        shadow: raw.shadow,
        color_base: raw.color_base,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/template/model.rs"]
mod tests;
