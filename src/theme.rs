use crate::error::RenderError;
use crate::types::{Color, Rect, Size};

/// Palette, geometry and type sizes shared by every primitive and composer.
///
/// Lengths are millimetres; font sizes are points.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,

    pub brand_blue: Color,
    pub accent_orange: Color,
    pub text: Color,
    pub border: Color,
    pub background: Color,

    pub border_width: f32,
    pub section_bar_height: f32,
    pub checkbox_size: f32,
    pub masthead_height: f32,
    pub masthead_gap: f32,
    pub footer_height: f32,
    pub block_gap: f32,
    pub photo_gap: f32,

    pub font_regular: String,
    pub font_bold: String,
    pub label_size: f32,
    pub value_size: f32,
    pub bar_label_size: f32,
    pub title_size: f32,
    pub mark_size: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 8.0,
            brand_blue: Color::rgb8(0x1f, 0x4e, 0x8c),
            accent_orange: Color::rgb8(0xf0, 0x8a, 0x24),
            text: Color::rgb8(0x33, 0x33, 0x33),
            border: Color::rgb8(0xb4, 0xb4, 0xb4),
            background: Color::rgb8(0xf2, 0xf2, 0xf2),
            border_width: 0.2,
            section_bar_height: 6.0,
            checkbox_size: 3.5,
            masthead_height: 18.0,
            masthead_gap: 2.0,
            footer_height: 10.0,
            block_gap: 2.0,
            photo_gap: 4.0,
            font_regular: "Helvetica".to_string(),
            font_bold: "Helvetica-Bold".to_string(),
            label_size: 6.5,
            value_size: 8.0,
            bar_label_size: 8.5,
            title_size: 11.0,
            mark_size: 20.0,
        }
    }
}

impl Theme {
    pub fn page_size(&self) -> Size {
        Size::from_mm(self.page_width, self.page_height)
    }

    pub fn content_width(&self) -> f32 {
        self.page_width - self.margin * 2.0
    }

    pub fn content_left(&self) -> f32 {
        self.margin
    }

    pub fn content_right(&self) -> f32 {
        self.page_width - self.margin
    }

    /// Top edge of the footer strip.
    pub fn footer_top(&self) -> f32 {
        self.page_height - self.margin - self.footer_height
    }

    /// First y coordinate below the masthead.
    pub fn body_top(&self) -> f32 {
        self.margin + self.masthead_height + self.masthead_gap
    }

    /// Area between masthead and footer, with one block gap above the footer.
    pub fn body_rect(&self) -> Rect {
        let top = self.body_top();
        let bottom = self.footer_top() - self.block_gap;
        Rect::new(self.content_left(), top, self.content_width(), bottom - top)
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        let positive = [
            ("page_width", self.page_width),
            ("page_height", self.page_height),
            ("section_bar_height", self.section_bar_height),
            ("checkbox_size", self.checkbox_size),
            ("masthead_height", self.masthead_height),
            ("footer_height", self.footer_height),
            ("label_size", self.label_size),
            ("value_size", self.value_size),
            ("bar_label_size", self.bar_label_size),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(RenderError::InvalidConfiguration(format!(
                    "theme.{name} must be > 0 (got {value})"
                )));
            }
        }
        let non_negative = [
            ("margin", self.margin),
            ("border_width", self.border_width),
            ("masthead_gap", self.masthead_gap),
            ("block_gap", self.block_gap),
            ("photo_gap", self.photo_gap),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(RenderError::InvalidConfiguration(format!(
                    "theme.{name} must be >= 0 (got {value})"
                )));
            }
        }
        if self.margin * 2.0 >= self.page_width.min(self.page_height) {
            return Err(RenderError::InvalidConfiguration(
                "theme.margin leaves no content area".to_string(),
            ));
        }
        if self.body_rect().height <= 0.0 {
            return Err(RenderError::InvalidConfiguration(
                "masthead and footer leave no body height".to_string(),
            ));
        }
        if self.font_regular.trim().is_empty() || self.font_bold.trim().is_empty() {
            return Err(RenderError::InvalidConfiguration(
                "theme fonts cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
