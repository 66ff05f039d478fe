use super::{ComposeContext, require_space};
use crate::canvas::Canvas;
use crate::draw::{TextStyle, outline, place_paragraph};
use crate::error::RenderError;
use crate::narrative::strip_legacy_headers;
use crate::record::ReportRecord;
use crate::sections::{page_footer, page_header, section_bar};
use crate::types::Rect;

pub const META_NARRATIVE_LINES: &str = "psi.narrative.lines";

/// Page 2: the detailed development narrative in one box filling the body.
/// The box is drawn even when the narrative is empty.
pub(crate) fn compose_narrative(
    canvas: &mut Canvas,
    ctx: &ComposeContext<'_>,
    record: &ReportRecord,
) -> Result<(), RenderError> {
    let theme = ctx.theme;
    let top = page_header(canvas, theme, ctx.brand);
    let top = section_bar(canvas, theme, "DESARROLLO DETALLADO", top) + theme.block_gap;
    let height = theme.body_rect().bottom() - top;
    require_space("narrative box", height)?;

    let rect = Rect::new(theme.content_left(), top, theme.content_width(), height);
    outline(canvas, theme, rect);
    let text = strip_legacy_headers(&record.desarrollo_detallado);
    let lines = place_paragraph(canvas, theme, &text, rect, &TextStyle::value(theme));
    canvas.meta(META_NARRATIVE_LINES, lines.to_string());

    page_footer(canvas, theme, ctx.brand);
    Ok(())
}
