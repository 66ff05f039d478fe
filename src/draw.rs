use crate::canvas::Canvas;
use crate::font::{FontFace, measure_text_width, wrap_text};
use crate::theme::Theme;
use crate::types::{Color, Pt, Rect};

// Layout is in millimetres with a top-left origin.
const MM_PER_PT: f32 = 25.4 / 72.0;
const TEXT_PADDING: f32 = 1.5;
// Helvetica cap height, 718/1000 em.
const CAP_HEIGHT: f32 = 0.718;
const LINE_SPACING: f32 = 1.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: Color,
    /// Font size in points.
    pub size: f32,
    pub bold: bool,
    pub align: Align,
}

impl TextStyle {
    pub fn value(theme: &Theme) -> Self {
        Self {
            color: theme.text,
            size: theme.value_size,
            bold: false,
            align: Align::Left,
        }
    }

    pub fn label(theme: &Theme) -> Self {
        Self {
            color: theme.brand_blue,
            size: theme.label_size,
            bold: true,
            align: Align::Left,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn sized(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn colored(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn aligned(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    fn face(&self) -> FontFace {
        if self.bold {
            FontFace::Bold
        } else {
            FontFace::Regular
        }
    }
}

pub(crate) fn pt_rect(rect: Rect) -> (Pt, Pt, Pt, Pt) {
    (
        Pt::from_mm(rect.x),
        Pt::from_mm(rect.y),
        Pt::from_mm(rect.width),
        Pt::from_mm(rect.height),
    )
}

/// Paints a rectangle. Fill and border are independently optional.
pub fn draw_box(
    canvas: &mut Canvas,
    theme: &Theme,
    rect: Rect,
    fill: Option<Color>,
    border: Option<Color>,
) {
    if fill.is_none() && border.is_none() {
        return;
    }
    let (x, y, width, height) = pt_rect(rect);
    if let Some(color) = fill {
        canvas.set_fill_color(color);
    }
    if let Some(color) = border {
        canvas.set_stroke_color(color);
        canvas.set_line_width(Pt::from_mm(theme.border_width));
    }
    canvas.rectangle(x, y, width, height);
    match (fill.is_some(), border.is_some()) {
        (true, true) => canvas.fill_stroke(),
        (true, false) => canvas.fill(),
        _ => canvas.stroke(),
    }
}

/// Bordered box with the theme's border colour and no fill.
pub fn outline(canvas: &mut Canvas, theme: &Theme, rect: Rect) {
    draw_box(canvas, theme, rect, None, Some(theme.border));
}

fn apply_text_style(canvas: &mut Canvas, theme: &Theme, style: &TextStyle) {
    let font = if style.bold {
        &theme.font_bold
    } else {
        &theme.font_regular
    };
    canvas.set_font_name(font);
    canvas.set_font_size(Pt::from_f32(style.size));
    canvas.set_fill_color(style.color);
}

fn aligned_x(rect: Rect, text_width: f32, align: Align) -> f32 {
    match align {
        Align::Left => rect.x + TEXT_PADDING,
        Align::Center => rect.x + (rect.width - text_width) / 2.0,
        Align::Right => rect.right() - TEXT_PADDING - text_width,
    }
}

/// Places one line of text vertically centred in `rect`. No wrapping, no clipping.
pub fn place_text(canvas: &mut Canvas, theme: &Theme, text: &str, rect: Rect, style: &TextStyle) {
    if text.trim().is_empty() {
        return;
    }
    let size_mm = style.size * MM_PER_PT;
    let width = measure_text_width(style.face(), size_mm, text);
    let baseline = rect.y + rect.height / 2.0 + size_mm * CAP_HEIGHT / 2.0;
    let x = aligned_x(rect, width, style.align);
    apply_text_style(canvas, theme, style);
    canvas.draw_string(Pt::from_mm(x), Pt::from_mm(baseline - size_mm), text);
}

/// Word-wraps `text` inside `rect`, top-aligned. Lines past the bottom edge are
/// dropped. Returns the number of lines drawn.
pub fn place_paragraph(
    canvas: &mut Canvas,
    theme: &Theme,
    text: &str,
    rect: Rect,
    style: &TextStyle,
) -> usize {
    if text.trim().is_empty() {
        return 0;
    }
    let inner = rect.inset(TEXT_PADDING);
    let size_mm = style.size * MM_PER_PT;
    let line_height = size_mm * LINE_SPACING;
    let lines = wrap_text(style.face(), size_mm, text, inner.width);
    apply_text_style(canvas, theme, style);

    let mut drawn = 0usize;
    let mut top = inner.y;
    for line in lines {
        if top + size_mm > inner.bottom() {
            break;
        }
        if !line.is_empty() {
            let width = measure_text_width(style.face(), size_mm, &line);
            let x = aligned_x(rect, width, style.align);
            canvas.draw_string(Pt::from_mm(x), Pt::from_mm(top), line);
            drawn += 1;
        }
        top += line_height;
    }
    drawn
}

/// Bordered value box with a small label above the value, as used by the form fields.
pub fn labeled_field(canvas: &mut Canvas, theme: &Theme, label: &str, value: &str, rect: Rect) {
    outline(canvas, theme, rect);
    let label_height = (rect.height * 0.4).min(3.5);
    let label_rect = Rect::new(rect.x, rect.y + 0.4, rect.width, label_height);
    place_text(canvas, theme, label, label_rect, &TextStyle::label(theme));
    let value_rect = Rect::new(
        rect.x,
        rect.y + label_height,
        rect.width,
        rect.height - label_height,
    );
    place_text(canvas, theme, value, value_rect, &TextStyle::value(theme));
}
