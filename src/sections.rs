use crate::assets::BrandAssets;
use crate::canvas::Canvas;
use crate::draw::{Align, TextStyle, draw_box, outline, place_text, pt_rect};
use crate::theme::Theme;
use crate::types::{Color, Pt, Rect};

pub const META_CHECKBOX: &str = "psi.checkbox";
pub const META_TABLE: &str = "psi.table";

pub const LOGO_RESOURCE: &str = "brand:logo";
pub const FOOTER_RESOURCE: &str = "brand:footer";

const TITLE_LINE_1: &str = "PARTE DE SERVICIO E INTERVENCIÓN";
const TITLE_LINE_2: &str = "Protección Civil · Agrupación Municipal de Voluntarios";

/// Full-width brand-blue bar with a white bold label. Returns the y below the bar.
pub fn section_bar(canvas: &mut Canvas, theme: &Theme, label: &str, y: f32) -> f32 {
    let rect = Rect::new(
        theme.content_left(),
        y,
        theme.content_width(),
        theme.section_bar_height,
    );
    draw_box(canvas, theme, rect, Some(theme.brand_blue), None);
    let style = TextStyle::value(theme)
        .bold()
        .sized(theme.bar_label_size)
        .colored(Color::WHITE);
    place_text(canvas, theme, label, rect, &style);
    rect.bottom()
}

/// Bordered square at (x, y); a cross is drawn inside when `checked`.
/// `key` identifies the checkbox in the page metadata.
pub fn checkbox(canvas: &mut Canvas, theme: &Theme, x: f32, y: f32, checked: bool, key: &str) {
    let size = theme.checkbox_size;
    let rect = Rect::new(x, y, size, size);
    draw_box(canvas, theme, rect, Some(Color::WHITE), Some(theme.text));
    canvas.meta(META_CHECKBOX, format!("{key}={}", u8::from(checked)));
    if !checked {
        return;
    }
    let inner = rect.inset(size * 0.2);
    let (x0, y0, w, h) = pt_rect(inner);
    canvas.set_stroke_color(theme.text);
    canvas.set_line_width(Pt::from_mm(0.35));
    canvas.move_to(x0, y0);
    canvas.line_to(x0 + w, y0 + h);
    canvas.move_to(x0 + w, y0);
    canvas.line_to(x0, y0 + h);
    canvas.stroke();
}

/// Fixed masthead: colour band, "PSI" mark, two-line title and the logo.
/// Returns the first y available for page content.
pub fn page_header(canvas: &mut Canvas, theme: &Theme, brand: &BrandAssets) -> f32 {
    let band = Rect::new(
        theme.content_left(),
        theme.margin,
        theme.content_width(),
        theme.masthead_height,
    );
    draw_box(canvas, theme, band, Some(theme.brand_blue), None);

    let mark = Rect::new(band.x, band.y, band.height * 1.6, band.height);
    draw_box(canvas, theme, mark, Some(theme.accent_orange), None);
    let mark_style = TextStyle::value(theme)
        .bold()
        .sized(theme.mark_size)
        .colored(Color::WHITE)
        .aligned(Align::Center);
    place_text(canvas, theme, "PSI", mark, &mark_style);

    let logo_slot = Rect::new(
        band.right() - band.height,
        band.y,
        band.height,
        band.height,
    )
    .inset(1.5);
    let title_x = mark.right() + 3.0;
    let title_width = (logo_slot.x - 2.0 - title_x).max(0.0);
    let half = band.height / 2.0;
    let title_style = TextStyle::value(theme)
        .bold()
        .sized(theme.title_size)
        .colored(Color::WHITE);
    place_text(
        canvas,
        theme,
        TITLE_LINE_1,
        Rect::new(title_x, band.y + 1.5, title_width, half - 1.5),
        &title_style,
    );
    let subtitle_style = TextStyle::value(theme).colored(Color::WHITE);
    place_text(
        canvas,
        theme,
        TITLE_LINE_2,
        Rect::new(title_x, band.y + half, title_width, half - 1.5),
        &subtitle_style,
    );

    canvas.register_image(LOGO_RESOURCE, brand.logo.clone());
    let logo = logo_slot.fit_centered(brand.logo.width as f32, brand.logo.height as f32);
    let (x, y, w, h) = pt_rect(logo);
    canvas.draw_image(x, y, w, h, LOGO_RESOURCE);

    theme.body_top()
}

/// Footer image strip across the content width at the bottom of the page.
pub fn page_footer(canvas: &mut Canvas, theme: &Theme, brand: &BrandAssets) {
    canvas.register_image(FOOTER_RESOURCE, brand.footer.clone());
    let strip = Rect::new(
        theme.content_left(),
        theme.footer_top(),
        theme.content_width(),
        theme.footer_height,
    );
    let (x, y, w, h) = pt_rect(strip);
    canvas.draw_image(x, y, w, h, FOOTER_RESOURCE);
}

/// A table with a coloured header row and a fixed number of body rows.
pub struct ResourceTable<'a> {
    pub key: &'a str,
    pub headers: &'a [&'a str],
    /// Relative column widths; normalised against their sum.
    pub weights: &'a [f32],
    pub capacity: usize,
    pub row_height: f32,
}

impl ResourceTable<'_> {
    pub fn height(&self) -> f32 {
        self.row_height * (self.capacity + 1) as f32
    }

    /// Draws the header and `capacity` rows. Extra rows are ignored; missing
    /// rows and cells render as empty bordered cells. Returns the y below the table.
    pub fn draw(
        &self,
        canvas: &mut Canvas,
        theme: &Theme,
        x: f32,
        y: f32,
        width: f32,
        rows: &[Vec<&str>],
    ) -> f32 {
        let total: f32 = self.weights.iter().sum();
        let total = if total > 0.0 { total } else { 1.0 };
        let widths: Vec<f32> = self.weights.iter().map(|w| width * w / total).collect();

        let header_style = TextStyle::label(theme)
            .colored(Color::WHITE)
            .aligned(Align::Center);
        let mut cx = x;
        for (header, w) in self.headers.iter().zip(&widths) {
            let cell = Rect::new(cx, y, *w, self.row_height);
            draw_box(canvas, theme, cell, Some(theme.brand_blue), Some(theme.border));
            place_text(canvas, theme, header, cell, &header_style);
            cx += w;
        }

        let value_style = TextStyle::value(theme);
        let mut filled = 0usize;
        for index in 0..self.capacity {
            let row_y = y + self.row_height * (index + 1) as f32;
            let row = rows.get(index);
            if row.is_some_and(|r| r.iter().any(|v| !v.trim().is_empty())) {
                filled += 1;
            }
            let mut cx = x;
            for (col, w) in widths.iter().enumerate() {
                let cell = Rect::new(cx, row_y, *w, self.row_height);
                outline(canvas, theme, cell);
                if let Some(value) = row.and_then(|r| r.get(col)) {
                    place_text(canvas, theme, value, cell, &value_style);
                }
                cx += w;
            }
        }
        canvas.meta(
            META_TABLE,
            format!("{}:{}/{}", self.key, filled, self.capacity),
        );
        y + self.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;

    fn setup() -> (Canvas, Theme) {
        let theme = Theme::default();
        (Canvas::new(theme.page_size()), theme)
    }

    #[test]
    fn section_bar_returns_y_below_bar() {
        let (mut canvas, theme) = setup();
        let next = section_bar(&mut canvas, &theme, "DATOS DEL SERVICIO", 40.0);
        assert_eq!(next, 46.0);
        let doc = canvas.finish();
        assert!(doc.pages[0].texts().any(|t| t == "DATOS DEL SERVICIO"));
    }

    #[test]
    fn checkbox_cross_only_when_checked() {
        let (mut canvas, theme) = setup();
        checkbox(&mut canvas, &theme, 10.0, 10.0, false, "a");
        let unchecked = canvas.current_command_count();
        checkbox(&mut canvas, &theme, 20.0, 10.0, true, "b");
        let doc = canvas.finish();
        let lines = doc.pages[0]
            .commands
            .iter()
            .skip(unchecked)
            .filter(|cmd| matches!(cmd, Command::LineTo { .. }))
            .count();
        assert_eq!(lines, 2);
        let meta: Vec<&str> = doc.pages[0].meta_values(META_CHECKBOX).collect();
        assert_eq!(meta, vec!["a=0", "b=1"]);
    }

    #[test]
    fn header_and_footer_reuse_brand_resources() {
        let (mut canvas, theme) = setup();
        let brand = BrandAssets::bundled().expect("brand");
        let top = page_header(&mut canvas, &theme, &brand);
        page_footer(&mut canvas, &theme, &brand);
        canvas.show_page();
        page_header(&mut canvas, &theme, &brand);
        page_footer(&mut canvas, &theme, &brand);
        let doc = canvas.finish();
        assert_eq!(top, 28.0);
        assert_eq!(doc.images.len(), 2);
        for page in &doc.pages {
            let draws: Vec<&str> = page.image_draws().collect();
            assert_eq!(draws, vec![LOGO_RESOURCE, FOOTER_RESOURCE]);
            assert!(page.texts().any(|t| t == "PSI"));
        }
    }

    #[test]
    fn table_truncates_to_capacity() {
        let (mut canvas, theme) = setup();
        let table = ResourceTable {
            key: "vehiculos",
            headers: &["Vehículo", "Componente", "Emisora"],
            weights: &[1.0, 1.0, 1.0],
            capacity: 2,
            row_height: 5.0,
        };
        let rows = vec![
            vec!["V1", "Ana", "E1"],
            vec!["V2", "Luis", "E2"],
            vec!["V3", "Eva", "E3"],
        ];
        let bottom = table.draw(&mut canvas, &theme, 10.0, 30.0, 90.0, &rows);
        assert_eq!(bottom, 45.0);
        let doc = canvas.finish();
        let texts: Vec<&str> = doc.pages[0].texts().collect();
        assert!(texts.contains(&"V2"));
        assert!(!texts.contains(&"V3"));
        assert_eq!(
            doc.pages[0].meta_values(META_TABLE).collect::<Vec<_>>(),
            vec!["vehiculos:2/2"]
        );
    }
}
