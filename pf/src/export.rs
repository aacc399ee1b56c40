//! PNG export of finished slides
//!
//! Each slide becomes a 1080×1920 image: the slide picture stretched to fill,
//! a dark gradient over the top 900px, then the headline and description in
//! white over it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ExportConfig;
use crate::domain::{GeneratedSlice, SliceCollection};

pub const CANVAS_WIDTH: u32 = 1080;
pub const CANVAS_HEIGHT: u32 = 1920;

const GRADIENT_HEIGHT: u32 = 900;
const GRADIENT_TOP_ALPHA: f32 = 0.95;
const CENTER_X: f32 = 540.0;
const HEADLINE_PX: f32 = 110.0;
const HEADLINE_BASELINE: f32 = 300.0;
const DESCRIPTION_PX: f32 = 50.0;
const DESCRIPTION_BASELINE: f32 = 420.0;

/// Bold fonts tried, in order, when no font is configured
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Bold.ttc",
    "/usr/share/fonts/truetype/noto/NotoSansKR-Bold.ttf",
    "/usr/share/fonts/truetype/nanum/NanumGothicBold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/AppleSDGothicNeo.ttc",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\malgunbd.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Errors from rendering or writing a slide
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Slide image could not be decoded: {0}")]
    Decode(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Font error: {0}")]
    Font(String),
}

/// `page_<index+1>.png`
pub fn export_filename(index: usize) -> String {
    format!("page_{}.png", index + 1)
}

/// Load a font file (first face of a collection)
pub fn load_font(path: &Path) -> Result<FontVec, ExportError> {
    debug!(path = %path.display(), "load_font: called");
    let bytes = std::fs::read(path)?;
    FontVec::try_from_vec_and_index(bytes, 0)
        .map_err(|e| ExportError::Font(format!("{}: {}", path.display(), e)))
}

/// First readable font from the system list
pub fn discover_font() -> Option<FontVec> {
    SYSTEM_FONTS.iter().map(Path::new).filter(|p| p.exists()).find_map(|p| {
        load_font(p)
            .inspect(|_| debug!(path = %p.display(), "discover_font: using system font"))
            .ok()
    })
}

/// Render one slide onto a fresh canvas
///
/// Without a font the text overlay is skipped.
pub fn render_slice(slice: &GeneratedSlice, font: Option<&FontVec>) -> Result<RgbaImage, ExportError> {
    debug!(title = %slice.title, has_font = font.is_some(), "render_slice: called");
    let mut canvas = RgbaImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, Rgba([0, 0, 0, 255]));

    if let Some(image) = slice.image() {
        let bytes = image.decode().map_err(|e| ExportError::Decode(e.to_string()))?;
        let picture = image::load_from_memory(&bytes)?.to_rgba8();
        let stretched = imageops::resize(&picture, CANVAS_WIDTH, CANVAS_HEIGHT, FilterType::Triangle);
        imageops::overlay(&mut canvas, &stretched, 0, 0);
    } else if !slice.url.is_empty() {
        return Err(ExportError::Decode("slide url is not a base64 data URL".to_string()));
    }

    apply_top_gradient(&mut canvas);

    if let Some(font) = font {
        draw_centered(&mut canvas, font, &slice.copy, HEADLINE_PX, HEADLINE_BASELINE);
        draw_centered(&mut canvas, font, &slice.description, DESCRIPTION_PX, DESCRIPTION_BASELINE);
    }
    Ok(canvas)
}

/// Black at 0.95 alpha at the top fading to transparent at 900px
fn apply_top_gradient(canvas: &mut RgbaImage) {
    let height = GRADIENT_HEIGHT.min(canvas.height());
    for y in 0..height {
        let alpha = GRADIENT_TOP_ALPHA * (1.0 - y as f32 / GRADIENT_HEIGHT as f32);
        let keep = 1.0 - alpha;
        for x in 0..canvas.width() {
            let pixel = canvas.get_pixel_mut(x, y);
            for channel in pixel.0.iter_mut().take(3) {
                *channel = (*channel as f32 * keep).round() as u8;
            }
        }
    }
}

/// Advance width of `text` at `px`
fn line_width(font: &FontVec, text: &str, px: f32) -> f32 {
    let scaled = font.as_scaled(PxScale::from(px));
    let mut width = 0.0;
    let mut previous = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    width
}

/// Draw one white line centered on `CENTER_X` with its baseline at `baseline`
fn draw_centered(canvas: &mut RgbaImage, font: &FontVec, text: &str, px: f32, baseline: f32) {
    if text.is_empty() {
        return;
    }
    let scale = PxScale::from(px);
    let scaled = font.as_scaled(scale);
    let mut caret = point(CENTER_X - line_width(font, text, px) / 2.0, baseline);
    let mut previous = None;
    let (width, height) = (canvas.width() as i32, canvas.height() as i32);

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            caret.x += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, caret);
        caret.x += scaled.h_advance(id);
        previous = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let x = bounds.min.x as i32 + gx as i32;
            let y = bounds.min.y as i32 + gy as i32;
            if x < 0 || y < 0 || x >= width || y >= height {
                return;
            }
            let pixel = canvas.get_pixel_mut(x as u32, y as u32);
            let coverage = coverage.clamp(0.0, 1.0);
            for channel in pixel.0.iter_mut().take(3) {
                *channel = (*channel as f32 + (255.0 - *channel as f32) * coverage).round() as u8;
            }
        });
    }
}

/// Render `slice` and write it as `dir/page_<index+1>.png`
pub fn export_one(
    slice: &GeneratedSlice,
    index: usize,
    dir: &Path,
    font: Option<&FontVec>,
) -> Result<PathBuf, ExportError> {
    debug!(index, dir = %dir.display(), "export_one: called");
    std::fs::create_dir_all(dir)?;
    let canvas = render_slice(slice, font)?;
    let path = dir.join(export_filename(index));
    canvas.save(&path)?;
    info!(path = %path.display(), "Slide exported");
    Ok(path)
}

/// Handle on a running batch export
///
/// Tasks report their own failures through the log; the batch only knows
/// when they are all done.
pub struct ExportBatch {
    handles: Vec<JoinHandle<()>>,
}

impl ExportBatch {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every task to finish
    pub async fn wait(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %ExportError::from(e), "Export task aborted");
            }
        }
    }
}

/// Export every slide, task `i` starting after `i × stagger`
pub fn export_all(
    slices: &SliceCollection,
    dir: &Path,
    font: Option<Arc<FontVec>>,
    stagger: Duration,
) -> ExportBatch {
    debug!(count = slices.len(), ?stagger, "export_all: called");
    let handles = slices
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, slice)| {
            let dir = dir.to_path_buf();
            let font = font.clone();
            let delay = stagger * index as u32;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let result =
                    tokio::task::spawn_blocking(move || export_one(&slice, index, &dir, font.as_deref())).await;
                match result {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => error!(page = index + 1, error = %e, "Slide export failed"),
                    Err(e) => error!(page = index + 1, error = %ExportError::from(e), "Slide export failed"),
                }
            })
        })
        .collect();
    ExportBatch { handles }
}

/// Exporter bound to a font and stagger from config
#[derive(Clone)]
pub struct Exporter {
    font: Option<Arc<FontVec>>,
    stagger: Duration,
}

impl Exporter {
    pub fn new(font: Option<FontVec>, stagger: Duration) -> Self {
        Self {
            font: font.map(Arc::new),
            stagger,
        }
    }

    /// Font from `font-path`, else the first system font found
    ///
    /// A configured font that cannot be loaded is an error; finding no
    /// system font only disables the text overlay.
    pub fn from_config(config: &ExportConfig) -> Result<Self, ExportError> {
        debug!(font_path = ?config.font_path, "Exporter::from_config: called");
        let font = match &config.font_path {
            Some(path) => Some(load_font(path)?),
            None => {
                let found = discover_font();
                if found.is_none() {
                    warn!("No bold system font found, slides will be exported without text");
                }
                found
            }
        };
        Ok(Self::new(font, config.stagger()))
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn export_one(&self, slice: &GeneratedSlice, index: usize, dir: &Path) -> Result<PathBuf, ExportError> {
        export_one(slice, index, dir, self.font.as_deref())
    }

    pub fn export_all(&self, slices: &SliceCollection, dir: &Path) -> ExportBatch {
        export_all(slices, dir, self.font.clone(), self.stagger)
    }
}
