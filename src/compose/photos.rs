use super::{ComposeContext, META_PHOTO, place_image, require_space};
use crate::canvas::Canvas;
use crate::draw::{Align, TextStyle, outline, place_text};
use crate::error::RenderError;
use crate::sections::{page_footer, page_header, section_bar};
use crate::theme::Theme;
use crate::types::Rect;

pub(crate) const PHOTOS_PER_SHEET: usize = 3;
const FAILED_PHOTO_MESSAGE: &str = "No se pudo cargar la imagen";

/// Vertical slots of one photo sheet, top to bottom.
fn sheet_slots(theme: &Theme, top: f32) -> Result<[Rect; PHOTOS_PER_SHEET], RenderError> {
    let available = theme.body_rect().bottom() - top;
    let gaps = theme.photo_gap * (PHOTOS_PER_SHEET as f32 - 1.0);
    let height = (available - gaps) / PHOTOS_PER_SHEET as f32;
    require_space("photo slot", height)?;
    Ok(std::array::from_fn(|index| {
        Rect::new(
            theme.content_left(),
            top + (height + theme.photo_gap) * index as f32,
            theme.content_width(),
            height,
        )
    }))
}

/// Photo gallery, three photos per sheet. Starts on the canvas' current page
/// and opens a new page with a fresh masthead for every further sheet.
/// `photos` must already exclude blank entries; nothing is drawn when empty.
pub(crate) fn compose_photos(
    canvas: &mut Canvas,
    ctx: &ComposeContext<'_>,
    photos: &[&str],
) -> Result<usize, RenderError> {
    let theme = ctx.theme;
    let mut sheets = 0usize;
    for (sheet, chunk) in photos.chunks(PHOTOS_PER_SHEET).enumerate() {
        if sheet > 0 {
            canvas.show_page();
        }
        let top = page_header(canvas, theme, ctx.brand);
        let top = section_bar(canvas, theme, "REPORTAJE FOTOGRÁFICO", top) + theme.block_gap;
        let slots = sheet_slots(theme, top)?;

        for (position, slot) in slots.into_iter().enumerate() {
            outline(canvas, theme, slot);
            let index = sheet * PHOTOS_PER_SHEET + position;
            match chunk.get(position) {
                Some(source) => place_photo(canvas, ctx, index, source, slot),
                None => canvas.meta(META_PHOTO, format!("{index}=empty")),
            }
        }

        page_footer(canvas, theme, ctx.brand);
        sheets += 1;
    }
    Ok(sheets)
}

fn place_photo(
    canvas: &mut Canvas,
    ctx: &ComposeContext<'_>,
    index: usize,
    source: &str,
    slot: Rect,
) {
    let theme = ctx.theme;
    match ctx.decode_asset(&format!("foto.{index}"), source) {
        Ok(image) => {
            place_image(canvas, &format!("photo:{index}"), image, slot.inset(1.0));
            canvas.meta(META_PHOTO, format!("{index}=embedded"));
        }
        Err(err) => {
            let style = TextStyle::value(theme).aligned(Align::Center);
            place_text(canvas, theme, FAILED_PHOTO_MESSAGE, slot, &style);
            canvas.meta(META_PHOTO, format!("{index}=failed:{}", err.as_str()));
        }
    }
}
