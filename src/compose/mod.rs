mod narrative;
mod photos;
mod service_data;

pub(crate) use narrative::compose_narrative;
pub use narrative::META_NARRATIVE_LINES;
pub(crate) use photos::{PHOTOS_PER_SHEET, compose_photos};
pub(crate) use service_data::compose_service_data;

use crate::assets::{BrandAssets, RasterImage, decode_image};
use crate::canvas::Canvas;
use crate::debug::DebugLogger;
use crate::draw::{TextStyle, outline, place_paragraph, place_text, pt_rect};
use crate::error::{ImageDecodeError, RenderError};
use crate::theme::Theme;
use crate::types::Rect;
use serde_json::json;
use std::sync::Arc;

pub const META_SIGNATURE: &str = "psi.signature";
pub const META_PHOTO: &str = "psi.photo";

pub(crate) struct ComposeContext<'a> {
    pub theme: &'a Theme,
    pub brand: &'a BrandAssets,
    pub debug: Option<&'a DebugLogger>,
}

impl ComposeContext<'_> {
    /// Decodes one embedded asset. Failures are logged here and handed back
    /// so the composer can pick its own fallback.
    fn decode_asset(&self, slot: &str, source: &str) -> Result<RasterImage, ImageDecodeError> {
        decode_image(source).inspect_err(|err| {
            if let Some(logger) = self.debug {
                logger.event(
                    "asset.decode_failed",
                    json!({ "slot": slot, "reason": err.as_str(), "detail": err.to_string() }),
                );
            }
        })
    }
}

fn require_space(what: &str, available: f32) -> Result<(), RenderError> {
    if available.is_finite() && available > 0.0 {
        Ok(())
    } else {
        Err(RenderError::Layout(format!(
            "{what}: no room left on the page ({available:.2} mm)"
        )))
    }
}

/// Registers `image` under `resource_id` and draws it aspect-fitted inside `slot`.
fn place_image(canvas: &mut Canvas, resource_id: &str, image: RasterImage, slot: Rect) {
    let fitted = slot.fit_centered(image.width as f32, image.height as f32);
    canvas.register_image(resource_id, Arc::new(image));
    let (x, y, w, h) = pt_rect(fitted);
    canvas.draw_image(x, y, w, h, resource_id);
}

/// Bordered free-text box: small label on top, wrapped text below.
fn text_area(canvas: &mut Canvas, theme: &Theme, label: &str, text: &str, rect: Rect) {
    outline(canvas, theme, rect);
    let label_rect = Rect::new(rect.x, rect.y + 0.4, rect.width, 3.5);
    place_text(canvas, theme, label, label_rect, &TextStyle::label(theme));
    let body = Rect::new(rect.x, rect.y + 3.5, rect.width, rect.height - 3.5);
    place_paragraph(canvas, theme, text, body, &TextStyle::value(theme));
}
