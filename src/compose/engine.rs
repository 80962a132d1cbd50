use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use image::RgbaImage;
use rayon::prelude::*;

use crate::compose::blend::blend_in_place;
use crate::compose::blur::blur_rgba8;
use crate::compose::shadow::shadow_layer;
use crate::compose::warp::{shrink_quad, warp_into_canvas};
use crate::foundation::core::{BlendMode, Placement};
use crate::foundation::error::{MocksmithError, MocksmithResult};
use crate::template::model::Template;
use crate::template::store::TemplateStore;

/// Encoded output format for generated mockups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless PNG.
    Png,
    /// JPEG at the given quality (1..=100).
    Jpeg {
        /// Encoder quality.
        quality: u8,
    },
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg { .. } => "jpg",
        }
    }
}

/// Output encoding settings for the compositor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OutputSettings {
    /// Encoded format.
    pub format: OutputFormat,
    /// Optional cap on the longer output edge; larger results are downscaled
    /// uniformly before encoding.
    pub max_dimension: Option<u32>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            max_dimension: None,
        }
    }
}

/// One generated preview artifact.
///
/// Created by the compositor; the retention layer later classifies, archives,
/// or deletes it. Immutable after creation except for the `archived` flag.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GeneratedMockup {
    /// Final output path.
    pub path: PathBuf,
    /// Product category the template belongs to.
    pub product_type: String,
    /// Template used.
    pub template_name: String,
    /// Design identifier (source file stem).
    pub design_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Encoded size in bytes.
    pub bytes: u64,
    /// Retention category, once classified.
    pub category: Option<String>,
    /// Set when the retention layer compresses the file away.
    pub archived: bool,
}

/// One unit of batch work: a `(template, design)` pair.
#[derive(Clone, Debug)]
pub struct ComposeJob {
    /// Product category.
    pub product_type: String,
    /// Template name within the category.
    pub template_name: String,
    /// Path to the flat design image.
    pub design_path: PathBuf,
}

/// Batch execution controls.
#[derive(Clone, Copy, Debug, Default)]
pub struct BatchOptions {
    /// Worker thread cap; `None` uses the rayon default.
    pub max_concurrent_generations: Option<usize>,
    /// Cooperative per-file timeout, checked between pipeline stages.
    pub per_file_timeout: Option<Duration>,
}

/// The mockup compositor: places a design into a template's printable region
/// and blends it onto the template photograph.
///
/// Holds only immutable data (template store, paths, encoding settings), so a
/// single instance is safe to share across batch workers.
#[derive(Clone, Debug)]
pub struct Compositor {
    store: TemplateStore,
    assets_root: PathBuf,
    output_dir: PathBuf,
    output: OutputSettings,
}

impl Compositor {
    /// Construct a compositor over a loaded template store.
    pub fn new(
        store: TemplateStore,
        assets_root: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        output: OutputSettings,
    ) -> Self {
        Self {
            store,
            assets_root: assets_root.into(),
            output_dir: output_dir.into(),
            output,
        }
    }

    /// The template store backing this compositor.
    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Compose one `(template, design)` pair and write the encoded result.
    #[tracing::instrument(skip(self))]
    pub fn compose(
        &self,
        product_type: &str,
        template_name: &str,
        design_path: &Path,
    ) -> MocksmithResult<GeneratedMockup> {
        self.compose_with_deadline(product_type, template_name, design_path, None)
    }

    /// [`Self::compose`] with a cooperative deadline.
    ///
    /// The deadline is checked between pipeline stages (decode, compose,
    /// encode); exceeding it aborts this composition with an `Asset` error.
    /// There is no mid-stage cancellation: a composition either completes or
    /// fails without leaving a partial file visible.
    pub fn compose_with_deadline(
        &self,
        product_type: &str,
        template_name: &str,
        design_path: &Path,
        deadline: Option<Instant>,
    ) -> MocksmithResult<GeneratedMockup> {
        let template = self.store.get(product_type, template_name)?;
        let ident = template.id();

        let source = template.settings.source.as_deref().ok_or_else(|| {
            MocksmithError::config(format!(
                "template '{ident}' has no source image configured"
            ))
        })?;
        let base = decode_rgba(&self.assets_root.join(source))?;
        check_deadline(deadline, &ident, "template decode")?;

        let design = decode_rgba(design_path)?;
        check_deadline(deadline, &ident, "design decode")?;

        let composed = compose_pixels(template, &base, &design)?;
        check_deadline(deadline, &ident, "composition")?;

        let composed = self.downscale_for_output(composed);

        let design_id = design_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "design".to_string());
        let file_name = format!(
            "{design_id}_{product_type}_{template_name}.{}",
            self.output.format.extension()
        );
        let out_path = self.output_dir.join(&file_name);

        let encoded = self.encode(&composed, &ident)?;
        check_deadline(deadline, &ident, "encode")?;
        write_atomic(&self.output_dir, &file_name, &encoded)?;

        tracing::info!(path = %out_path.display(), bytes = encoded.len(), "generated mockup");
        Ok(GeneratedMockup {
            path: out_path,
            product_type: product_type.to_string(),
            template_name: template_name.to_string(),
            design_id,
            created_at: Utc::now(),
            bytes: encoded.len() as u64,
            category: None,
            archived: false,
        })
    }

    /// Compose many pairs on a bounded worker pool.
    ///
    /// Items are independent; each result carries its own success or failure
    /// so batch callers decide whether to continue.
    pub fn compose_batch(
        &self,
        jobs: &[ComposeJob],
        opts: &BatchOptions,
    ) -> MocksmithResult<Vec<MocksmithResult<GeneratedMockup>>> {
        let pool = build_thread_pool(opts.max_concurrent_generations)?;
        let results = pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let deadline = opts.per_file_timeout.map(|t| Instant::now() + t);
                    self.compose_with_deadline(
                        &job.product_type,
                        &job.template_name,
                        &job.design_path,
                        deadline,
                    )
                })
                .collect::<Vec<_>>()
        });
        Ok(results)
    }

    fn downscale_for_output(&self, img: RgbaImage) -> RgbaImage {
        let Some(max_dim) = self.output.max_dimension else {
            return img;
        };
        let (w, h) = img.dimensions();
        let longer = w.max(h);
        if max_dim == 0 || longer <= max_dim {
            return img;
        }
        let scale = f64::from(max_dim) / f64::from(longer);
        let nw = ((f64::from(w) * scale).round() as u32).max(1);
        let nh = ((f64::from(h) * scale).round() as u32).max(1);
        image::imageops::resize(&img, nw, nh, image::imageops::FilterType::Lanczos3)
    }

    fn encode(&self, img: &RgbaImage, ident: &str) -> MocksmithResult<Vec<u8>> {
        let mut buf = Vec::new();
        match self.output.format {
            OutputFormat::Png => {
                image::DynamicImage::ImageRgba8(img.clone())
                    .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                    .map_err(|e| {
                        MocksmithError::asset(format!("encode png for '{ident}': {e}"))
                    })?;
            }
            OutputFormat::Jpeg { quality } => {
                // JPEG has no alpha; flatten onto the opaque composite.
                let rgb = image::DynamicImage::ImageRgba8(img.clone()).to_rgb8();
                let mut cursor = Cursor::new(&mut buf);
                let enc = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut cursor,
                    quality.clamp(1, 100),
                );
                rgb.write_with_encoder(enc).map_err(|e| {
                    MocksmithError::asset(format!("encode jpeg for '{ident}': {e}"))
                })?;
            }
        }
        Ok(buf)
    }
}

/// Pure composition: place and blend a decoded design onto a decoded base
/// according to the template's settings.
///
/// Rectangle placement anchors the scaled design at the **center** of the
/// design area. Quad placement maps the design corner-to-corner onto the
/// (padding-shrunk) quad through a homography.
pub fn compose_pixels(
    template: &Template,
    base: &RgbaImage,
    design: &RgbaImage,
) -> MocksmithResult<RgbaImage> {
    let s = &template.settings;
    let (cw, ch) = base.dimensions();
    if design.width() == 0 || design.height() == 0 {
        return Err(MocksmithError::asset(format!(
            "design for template '{}' has zero extent",
            template.id()
        )));
    }

    let mut layer = match &s.placement {
        Placement::Area(area) => {
            let (dw, dh) = (f64::from(design.width()), f64::from(design.height()));
            let target_w = area.width() * s.padding_factor;
            let target_h = area.height() * s.padding_factor;
            let scale = (target_w / dw).min(target_h / dh);
            let nw = ((dw * scale).round() as u32).max(1);
            let nh = ((dh * scale).round() as u32).max(1);
            let scaled =
                image::imageops::resize(design, nw, nh, image::imageops::FilterType::Lanczos3);

            let center = area.center();
            let x0 = (center.x - f64::from(nw) / 2.0).round() as i64;
            let y0 = (center.y - f64::from(nh) / 2.0).round() as i64;

            let mut layer = RgbaImage::new(cw, ch);
            paste_into(&mut layer, &scaled, x0, y0);
            layer
        }
        Placement::Quad(quad) => {
            let target = if (s.padding_factor - 1.0).abs() < 1e-9 {
                *quad
            } else {
                shrink_quad(quad, s.padding_factor)?
            };
            warp_into_canvas(design, &target, cw, ch)?
        }
    };

    if s.fabric_blur {
        let (lw, lh) = layer.dimensions();
        let blurred = blur_rgba8(layer.as_raw(), lw, lh, 1, 0.5)?;
        layer = RgbaImage::from_raw(lw, lh, blurred)
            .ok_or_else(|| MocksmithError::asset("fabric blur produced a bad buffer"))?;
    }

    let mut out = base.clone();
    if let Some(shadow) = &s.shadow {
        let shadow_img = shadow_layer(&layer, shadow)?;
        blend_in_place(&mut out, shadow_img.as_raw(), BlendMode::Normal, 1.0, 1.0)?;
    }

    blend_in_place(
        &mut out,
        layer.as_raw(),
        s.blend_mode,
        s.opacity,
        s.brightness_boost.unwrap_or(1.0),
    )?;
    Ok(out)
}

fn paste_into(layer: &mut RgbaImage, img: &RgbaImage, x0: i64, y0: i64) {
    let (lw, lh) = layer.dimensions();
    for (x, y, px) in img.enumerate_pixels() {
        let tx = x0 + i64::from(x);
        let ty = y0 + i64::from(y);
        if tx < 0 || ty < 0 || tx >= i64::from(lw) || ty >= i64::from(lh) {
            continue;
        }
        layer.put_pixel(tx as u32, ty as u32, *px);
    }
}

fn decode_rgba(path: &Path) -> MocksmithResult<RgbaImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| MocksmithError::asset(format!("read image '{}': {e}", path.display())))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| MocksmithError::asset(format!("decode image '{}': {e}", path.display())))?;
    Ok(img.to_rgba8())
}

fn check_deadline(deadline: Option<Instant>, ident: &str, stage: &str) -> MocksmithResult<()> {
    if let Some(d) = deadline
        && Instant::now() > d
    {
        return Err(MocksmithError::asset(format!(
            "composition for template '{ident}' timed out during {stage}"
        )));
    }
    Ok(())
}

// Write encoded bytes to a temp sibling and rename into place so a partially
// written file is never visible under its final name.
fn write_atomic(dir: &Path, file_name: &str, bytes: &[u8]) -> MocksmithResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        MocksmithError::asset(format!("create output dir '{}': {e}", dir.display()))
    })?;
    let tmp = dir.join(format!(".{file_name}.tmp-{}", std::process::id()));
    std::fs::write(&tmp, bytes)
        .map_err(|e| MocksmithError::asset(format!("write '{}': {e}", tmp.display())))?;
    let final_path = dir.join(file_name);
    if let Err(e) = std::fs::rename(&tmp, &final_path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(MocksmithError::asset(format!(
            "rename into '{}': {e}",
            final_path.display()
        )));
    }
    Ok(())
}

fn build_thread_pool(threads: Option<usize>) -> MocksmithResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(MocksmithError::config(
            "max_concurrent_generations must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| MocksmithError::config(format!("failed to build worker pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/compose/engine.rs"]
mod tests;
