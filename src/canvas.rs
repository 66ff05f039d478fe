use crate::assets::RasterImage;
use crate::types::{Color, Pt, Size};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Command {
    // Non-rendered metadata used for page-aware reporting and tests. Ignored by the PDF writer.
    Meta {
        key: String,
        value: String,
    },
    SetFillColor(Color),
    SetStrokeColor(Color),
    SetLineWidth(Pt),
    SetFontName(String),
    SetFontSize(Pt),
    // Appends a rectangle to the current path; paint with Fill/Stroke/FillStroke.
    Rectangle {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    MoveTo {
        x: Pt,
        y: Pt,
    },
    LineTo {
        x: Pt,
        y: Pt,
    },
    Fill,
    Stroke,
    FillStroke,
    // `y` is the top of the text line; the writer places the baseline one font size below.
    DrawString {
        x: Pt,
        y: Pt,
        text: String,
    },
    DrawImage {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct Page {
    pub commands: Vec<Command>,
}

impl Page {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn meta_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.commands.iter().filter_map(move |cmd| match cmd {
            Command::Meta { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::DrawString { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn image_draws(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::DrawImage { resource_id, .. } => Some(resource_id.as_str()),
            _ => None,
        })
    }
}

/// A finished, fixed-size multi-page document ready for serialization.
#[derive(Debug, Clone)]
pub struct Document {
    pub page_size: Size,
    pub pages: Vec<Page>,
    pub images: BTreeMap<String, Arc<RasterImage>>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    fill_color: Color,
    stroke_color: Color,
    line_width: Pt,
    font_size: Pt,
    font_name: String,
}

impl GraphicsState {
    fn initial() -> Self {
        Self {
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            line_width: Pt::from_f32(1.0),
            font_size: Pt::from_f32(12.0),
            font_name: "Helvetica".to_string(),
        }
    }
}

/// Recording drawing surface. Draw calls append commands to the current page;
/// pagination is explicit through [`Canvas::show_page`] and [`Canvas::finish`].
pub struct Canvas {
    page_size: Size,
    pages: Vec<Page>,
    current: Page,
    current_state: GraphicsState,
    images: BTreeMap<String, Arc<RasterImage>>,
}

impl Canvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            current: Page::new(),
            current_state: GraphicsState::initial(),
            images: BTreeMap::new(),
        }
    }

    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.current.commands.push(Command::Meta {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.current_state.fill_color == color {
            return;
        }
        self.current_state.fill_color = color;
        self.current.commands.push(Command::SetFillColor(color));
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        if self.current_state.stroke_color == color {
            return;
        }
        self.current_state.stroke_color = color;
        self.current.commands.push(Command::SetStrokeColor(color));
    }

    pub fn set_line_width(&mut self, width: Pt) {
        let width = if width < Pt::ZERO { Pt::ZERO } else { width };
        if self.current_state.line_width == width {
            return;
        }
        self.current_state.line_width = width;
        self.current.commands.push(Command::SetLineWidth(width));
    }

    pub fn set_font_name(&mut self, name: &str) {
        if self.current_state.font_name == name {
            return;
        }
        self.current_state.font_name = name.to_string();
        self.current
            .commands
            .push(Command::SetFontName(self.current_state.font_name.clone()));
    }

    pub fn set_font_size(&mut self, size: Pt) {
        if self.current_state.font_size == size {
            return;
        }
        self.current_state.font_size = size;
        self.current.commands.push(Command::SetFontSize(size));
    }

    pub fn rectangle(&mut self, x: Pt, y: Pt, width: Pt, height: Pt) {
        self.current.commands.push(Command::Rectangle {
            x,
            y,
            width,
            height,
        });
    }

    pub fn move_to(&mut self, x: Pt, y: Pt) {
        self.current.commands.push(Command::MoveTo { x, y });
    }

    pub fn line_to(&mut self, x: Pt, y: Pt) {
        self.current.commands.push(Command::LineTo { x, y });
    }

    pub fn fill(&mut self) {
        self.current.commands.push(Command::Fill);
    }

    pub fn stroke(&mut self) {
        self.current.commands.push(Command::Stroke);
    }

    pub fn fill_stroke(&mut self) {
        self.current.commands.push(Command::FillStroke);
    }

    pub fn draw_string(&mut self, x: Pt, y: Pt, text: impl Into<String>) {
        self.current.commands.push(Command::DrawString {
            x,
            y,
            text: text.into(),
        });
    }

    /// Registers a decoded image under `resource_id`. Re-registering an id
    /// keeps the first image so shared assets (logo, footer) embed once.
    pub fn register_image(&mut self, resource_id: impl Into<String>, image: Arc<RasterImage>) {
        self.images.entry(resource_id.into()).or_insert(image);
    }

    pub fn draw_image(
        &mut self,
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: impl Into<String>,
    ) {
        self.current.commands.push(Command::DrawImage {
            x,
            y,
            width,
            height,
            resource_id: resource_id.into(),
        });
    }

    pub fn show_page(&mut self) {
        let current = std::mem::replace(&mut self.current, Page::new());
        self.pages.push(current);
        self.current_state = GraphicsState::initial();
    }

    pub fn current_command_count(&self) -> usize {
        self.current.commands.len()
    }

    pub fn is_current_empty(&self) -> bool {
        self.current.commands.is_empty()
    }

    pub fn finish(mut self) -> Document {
        if !self.current.commands.is_empty() || self.pages.is_empty() {
            self.show_page();
        }
        Document {
            page_size: self.page_size,
            pages: self.pages,
            images: self.images,
        }
    }
}
