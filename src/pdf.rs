use crate::assets::RasterImage;
use crate::canvas::{Command, Document, Page};
use crate::debug::DebugLogger;
use crate::metrics::{DocumentMetrics, PageMetrics};
use crate::types::{Color, Pt, Size};
use fixed::types::I32F32;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub(crate) struct PdfOptions {
    pub document_title: Option<String>,
}

const PDF_HEADER: &[u8] = b"%PDF-1.7\n";
const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const PDF_RESOURCES_ID: usize = 3;
const PDF_PAGE_NODE_MAX_KIDS: usize = 256;
const PRODUCER: &str = "psi-report";

struct StreamFont {
    resource: String,
    object_id: usize,
}

struct PdfPageNode {
    id: usize,
    kids: Vec<usize>,
}

/// Writes a [`Document`] as PDF objects straight to `writer`. Fonts and images
/// are shared through a single resource dictionary referenced by every page.
pub(crate) struct PdfStreamWriter<'a, W: Write> {
    writer: &'a mut W,
    offset: usize,
    offsets: Vec<usize>, // index by object id; 0 is the free object.
    next_id: usize,
    page_size: Size,
    options: PdfOptions,
    debug: Option<&'a DebugLogger>,
    images: &'a BTreeMap<String, Arc<RasterImage>>,

    fonts: BTreeMap<String, StreamFont>,
    next_font_resource: usize,

    image_resources: Vec<(String, usize)>,
    image_name_map: HashMap<String, String>,
    next_image_index: usize,
    image_bytes_total: usize,

    page_nodes: Vec<PdfPageNode>,
    current_node: Option<PdfPageNode>,
    page_ids: Vec<usize>,
    page_metrics: Vec<PageMetrics>,
}

impl<'a, W: Write> PdfStreamWriter<'a, W> {
    pub(crate) fn new(
        writer: &'a mut W,
        document: &'a Document,
        options: PdfOptions,
        debug: Option<&'a DebugLogger>,
    ) -> io::Result<Self> {
        let mut offset: usize = 0;
        write_bytes(writer, PDF_HEADER, &mut offset)?;
        write_bytes(writer, b"%\xE2\xE3\xCF\xD3\n", &mut offset)?;

        Ok(Self {
            writer,
            offset,
            offsets: vec![0; PDF_RESOURCES_ID + 1],
            next_id: PDF_RESOURCES_ID + 1,
            page_size: document.page_size,
            options,
            debug,
            images: &document.images,
            fonts: BTreeMap::new(),
            next_font_resource: 1,
            image_resources: Vec::new(),
            image_name_map: HashMap::new(),
            next_image_index: 1,
            image_bytes_total: 0,
            page_nodes: Vec::new(),
            current_node: None,
            page_ids: Vec::new(),
            page_metrics: Vec::new(),
        })
    }

    pub(crate) fn add_page(&mut self, page: &Page) -> io::Result<()> {
        let page_number = self.page_ids.len() + 1;
        let parent_id = self.ensure_page_node();
        let start = self.alloc_ids(2);
        let content_id = start;
        let page_id = start + 1;

        if let Some(node) = self.current_node.as_mut() {
            node.kids.push(page_id);
        }

        let content_stream = self.render_page(page)?;
        self.page_metrics.push(PageMetrics {
            page_number,
            command_count: page.commands.len(),
            content_bytes: content_stream.len(),
        });
        self.write_object(content_id, &stream_object(&content_stream))?;
        self.page_ids.push(page_id);

        let page_obj = format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} 0 R /Contents {} 0 R >>",
            parent_id,
            fmt_pt(self.page_size.width),
            fmt_pt(self.page_size.height),
            PDF_RESOURCES_ID,
            content_id,
        );
        self.write_object(page_id, &page_obj)
    }

    /// Writes shared resources, page tree, catalog, xref and trailer.
    /// Returns the total number of bytes written.
    pub(crate) fn finish(&mut self) -> io::Result<usize> {
        if let Some(node) = self.current_node.take() {
            self.page_nodes.push(node);
        }

        // 1) Fonts: base-14, never embedded.
        let fonts = std::mem::take(&mut self.fonts);
        for (name, font) in &fonts {
            self.write_object(font.object_id, &font_object(name))?;
        }

        // 2) Resources dictionary (referenced by every page).
        let font_entries: Vec<(String, usize)> = fonts
            .values()
            .map(|font| (font.resource.clone(), font.object_id))
            .collect();
        let mut resources = vec![format!("/Font {}", named_refs(&font_entries))];
        if !self.image_resources.is_empty() {
            resources.push(format!("/XObject {}", named_refs(&self.image_resources)));
        }
        self.write_object(PDF_RESOURCES_ID, &format!("<< {} >>", resources.join(" ")))?;

        // 3) Page tree nodes + root.
        let page_nodes = std::mem::take(&mut self.page_nodes);
        for node in &page_nodes {
            self.write_object(
                node.id,
                &format!(
                    "<< /Type /Pages /Parent {} 0 R /Count {} /Kids [{}] >>",
                    PDF_PAGES_ID,
                    node.kids.len(),
                    object_refs(&node.kids)
                ),
            )?;
        }
        let total_pages: usize = page_nodes.iter().map(|n| n.kids.len()).sum();
        let node_ids: Vec<usize> = page_nodes.iter().map(|n| n.id).collect();
        self.write_object(
            PDF_PAGES_ID,
            &format!(
                "<< /Type /Pages /Count {} /Kids [{}] >>",
                total_pages,
                object_refs(&node_ids)
            ),
        )?;

        // 4) Info + Catalog.
        let title = self.options.document_title.clone();
        let info_id = self.alloc_ids(1);
        self.write_object(info_id, &info_object(title.as_deref()))?;
        let mut catalog = format!("<< /Type /Catalog /Pages {} 0 R", PDF_PAGES_ID);
        if title.is_some() {
            catalog.push_str(" /ViewerPreferences << /DisplayDocTitle true >>");
        }
        catalog.push_str(" >>");
        self.write_object(PDF_CATALOG_ID, &catalog)?;

        // 5) XRef + trailer.
        let total_objects = self.next_id.saturating_sub(1);
        let xref_start = self.offset;
        write_str(
            self.writer,
            &format!("xref\n0 {}\n", total_objects + 1),
            &mut self.offset,
        )?;
        write_bytes(self.writer, b"0000000000 65535 f \n", &mut self.offset)?;
        for id in 1..=total_objects {
            let obj_offset = self.offsets.get(id).copied().unwrap_or(0);
            write_str(
                self.writer,
                &format!("{:010} 00000 n \n", obj_offset),
                &mut self.offset,
            )?;
        }
        let trailer = format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF",
            total_objects + 1,
            PDF_CATALOG_ID,
            info_id,
            xref_start
        );
        write_str(self.writer, &trailer, &mut self.offset)?;

        if let Some(logger) = self.debug {
            logger.event(
                "pdf.link",
                json!({
                    "bytes": self.offset,
                    "pages": self.page_ids.len(),
                    "fonts": fonts.len(),
                    "images": self.image_resources.len(),
                    "image_bytes": self.image_bytes_total,
                }),
            );
        }
        Ok(self.offset)
    }

    fn render_page(&mut self, page: &Page) -> io::Result<String> {
        let page_height = self.page_size.height;
        let mut out = String::new();
        let mut current_font_size = Pt::from_f32(12.0);
        let mut current_font_name = "Helvetica".to_string();

        for cmd in &page.commands {
            match cmd {
                Command::Meta { .. } => {}
                Command::SetFillColor(color) => out.push_str(&color_to_pdf_fill(*color)),
                Command::SetStrokeColor(color) => out.push_str(&color_to_pdf_stroke(*color)),
                Command::SetLineWidth(width) => {
                    out.push_str(&format!("{} w\n", fmt_pt(*width)));
                }
                Command::SetFontName(name) => {
                    current_font_name = name.clone();
                    self.ensure_font(&current_font_name);
                }
                Command::SetFontSize(size) => {
                    current_font_size = *size;
                }
                Command::Rectangle {
                    x,
                    y,
                    width,
                    height,
                } => {
                    let draw_y = page_height - *y - *height;
                    out.push_str(&format!(
                        "{} {} {} {} re\n",
                        fmt_pt(*x),
                        fmt_pt(draw_y),
                        fmt_pt(*width),
                        fmt_pt(*height)
                    ));
                }
                Command::MoveTo { x, y } => {
                    out.push_str(&format!("{} {} m\n", fmt_pt(*x), fmt_pt(page_height - *y)));
                }
                Command::LineTo { x, y } => {
                    out.push_str(&format!("{} {} l\n", fmt_pt(*x), fmt_pt(page_height - *y)));
                }
                Command::Fill => out.push_str("f\n"),
                Command::Stroke => out.push_str("S\n"),
                Command::FillStroke => out.push_str("B\n"),
                Command::DrawString { x, y, text } => {
                    let resource = self.ensure_font(&current_font_name);
                    let encoded = encode_winansi_pdf_string(text);
                    if encoded.replaced > 0 {
                        if let Some(logger) = self.debug {
                            logger.event(
                                "pdf.winansi.lossy",
                                json!({
                                    "font": current_font_name,
                                    "replaced": encoded.replaced,
                                    "sample": truncate_preview(text, 80),
                                }),
                            );
                        }
                    }
                    out.push_str("BT\n");
                    out.push_str(&format!("/{} {} Tf\n", resource, fmt_pt(current_font_size)));
                    out.push_str(&format!(
                        "{} {} Td\n",
                        fmt_pt(*x),
                        fmt_pt(page_height - *y - current_font_size)
                    ));
                    out.push_str(&format!("({}) Tj\n", encoded.text));
                    out.push_str("ET\n");
                }
                Command::DrawImage {
                    x,
                    y,
                    width,
                    height,
                    resource_id,
                } => {
                    let Some(name) = self.ensure_image(resource_id)? else {
                        continue;
                    };
                    let draw_y = page_height - *y - *height;
                    out.push_str("q\n");
                    out.push_str(&format!(
                        "{} 0 0 {} {} {} cm\n",
                        fmt_pt(*width),
                        fmt_pt(*height),
                        fmt_pt(*x),
                        fmt_pt(draw_y)
                    ));
                    out.push_str(&format!("/{} Do\n", name));
                    out.push_str("Q\n");
                }
            }
        }
        Ok(out)
    }

    fn ensure_offsets_len(&mut self, required_len: usize) {
        if self.offsets.len() < required_len {
            self.offsets.resize(required_len, 0);
        }
    }

    fn alloc_ids(&mut self, count: usize) -> usize {
        let start = self.next_id;
        self.next_id = self.next_id.saturating_add(count);
        self.ensure_offsets_len(self.next_id);
        start
    }

    fn write_object(&mut self, obj_id: usize, body: &str) -> io::Result<()> {
        write_pdf_object(
            self.writer,
            &mut self.offset,
            &mut self.offsets,
            obj_id,
            body,
        )
    }

    fn ensure_page_node(&mut self) -> usize {
        let needs_new = self
            .current_node
            .as_ref()
            .map(|n| n.kids.len() >= PDF_PAGE_NODE_MAX_KIDS)
            .unwrap_or(true);
        if needs_new {
            if let Some(node) = self.current_node.take() {
                self.page_nodes.push(node);
            }
            let id = self.alloc_ids(1);
            self.current_node = Some(PdfPageNode {
                id,
                kids: Vec::with_capacity(PDF_PAGE_NODE_MAX_KIDS),
            });
        }
        self.current_node
            .as_ref()
            .map(|n| n.id)
            .unwrap_or(PDF_PAGES_ID)
    }

    /// Resource name for a base-14 font; the object itself is written in `finish`.
    fn ensure_font(&mut self, name: &str) -> String {
        let base = sanitize_font_name(name);
        if let Some(font) = self.fonts.get(&base) {
            return font.resource.clone();
        }
        let resource = format!("F{}", self.next_font_resource);
        self.next_font_resource += 1;
        let object_id = self.alloc_ids(1);
        self.fonts.insert(
            base,
            StreamFont {
                resource: resource.clone(),
                object_id,
            },
        );
        resource
    }

    /// Writes the image XObject on first use. Unknown ids draw nothing.
    fn ensure_image(&mut self, resource_id: &str) -> io::Result<Option<String>> {
        if let Some(name) = self.image_name_map.get(resource_id) {
            return Ok(Some(name.clone()));
        }
        let images = self.images;
        let Some(image) = images.get(resource_id) else {
            if let Some(logger) = self.debug {
                logger.event("pdf.image.missing", json!({ "resource": resource_id }));
            }
            return Ok(None);
        };

        let smask_id = image.alpha.as_ref().map(|_| self.alloc_ids(1));
        let obj_id = self.alloc_ids(1);
        let name = format!("Im{}", self.next_image_index);
        self.next_image_index += 1;
        self.image_bytes_total += image.encoded_len();

        if let (Some(alpha), Some(mask_id)) = (image.alpha.as_ref(), smask_id) {
            self.write_object(
                mask_id,
                &image_smask_object(image.width, image.height, &alpha.data),
            )?;
        }
        self.write_object(obj_id, &image_object(image, smask_id))?;
        self.image_resources.push((name.clone(), obj_id));
        self.image_name_map
            .insert(resource_id.to_string(), name.clone());
        Ok(Some(name))
    }
}

pub(crate) fn document_to_pdf(
    document: &Document,
    options: &PdfOptions,
    debug: Option<&DebugLogger>,
) -> io::Result<(Vec<u8>, DocumentMetrics)> {
    let mut bytes: Vec<u8> = Vec::new();
    let metrics = document_to_writer(document, options, &mut bytes, debug)?;
    Ok((bytes, metrics))
}

pub(crate) fn document_to_writer<W: Write>(
    document: &Document,
    options: &PdfOptions,
    writer: &mut W,
    debug: Option<&DebugLogger>,
) -> io::Result<DocumentMetrics> {
    let mut pdf_stream = PdfStreamWriter::new(writer, document, options.clone(), debug)?;
    for page in &document.pages {
        pdf_stream.add_page(page)?;
    }
    let total_bytes = pdf_stream.finish()?;
    Ok(DocumentMetrics {
        pages: std::mem::take(&mut pdf_stream.page_metrics),
        total_bytes,
    })
}

fn image_object(image: &RasterImage, smask_id: Option<usize>) -> String {
    let stream_data = encode_stream_data(&image.data);
    let filters = format!("[/ASCIIHexDecode {}]", image.filter);
    let smask = smask_id
        .map(|id| format!(" /SMask {} 0 R", id))
        .unwrap_or_default();
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent {} /Length {} /Filter {}{} >>
stream
{}
endstream",
        image.width,
        image.height,
        image.color_space,
        image.bits_per_component,
        stream_data.len(),
        filters,
        smask,
        stream_data
    )
}

fn image_smask_object(width: u32, height: u32, alpha: &[u8]) -> String {
    let stream_data = encode_stream_data(alpha);
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Length {} /Filter [/ASCIIHexDecode /FlateDecode] >>
stream
{}
endstream",
        width,
        height,
        stream_data.len(),
        stream_data
    )
}

fn encode_stream_data(data: &[u8]) -> String {
    let mut hex = ascii_hex_encode(data);
    hex.push('>');
    hex
}

fn ascii_hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2 + data.len() / 32);
    for (index, byte) in data.iter().enumerate() {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02X}", byte);
        if index % 32 == 31 {
            out.push('\n');
        }
    }
    out
}

fn font_object(base_font: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        base_font
    )
}

fn named_refs(entries: &[(String, usize)]) -> String {
    let refs: Vec<String> = entries
        .iter()
        .map(|(resource, id)| format!("/{} {} 0 R", resource, id))
        .collect();
    format!("<< {} >>", refs.join(" "))
}

fn object_refs(ids: &[usize]) -> String {
    ids.iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ")
}

fn sanitize_font_name(name: &str) -> String {
    let mut out = String::new();
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
        } else if ch == ' ' {
            out.push('-');
        }
    }
    if out.is_empty() {
        "Helvetica".to_string()
    } else {
        out
    }
}

fn stream_object(content: &str) -> String {
    format!(
        "<< /Length {} >>\nstream\n{}\nendstream",
        content.len(),
        content
    )
}

fn info_object(title: Option<&str>) -> String {
    let mut entries = vec![format!("/Producer {}", pdf_text_string(PRODUCER))];
    if let Some(title) = title {
        entries.push(format!("/Title {}", pdf_text_string(title)));
    }
    format!("<< {} >>", entries.join(" "))
}

/// Literal string for ASCII text, UTF-16BE hex string with BOM otherwise.
fn pdf_text_string(input: &str) -> String {
    if input.is_ascii() {
        return format!("({})", escape_pdf_string(input));
    }
    let mut out = String::from("<FEFF");
    for unit in input.encode_utf16() {
        out.push_str(&format!("{:04X}", unit));
    }
    out.push('>');
    out
}

fn write_pdf_object<W: Write>(
    writer: &mut W,
    offset: &mut usize,
    offsets: &mut [usize],
    obj_id: usize,
    body: &str,
) -> io::Result<()> {
    if let Some(slot) = offsets.get_mut(obj_id) {
        *slot = *offset;
    }
    write_str(writer, &format!("{} 0 obj\n", obj_id), offset)?;
    write_bytes(writer, body.as_bytes(), offset)?;
    write_bytes(writer, b"\nendobj\n", offset)?;
    Ok(())
}

fn write_bytes<W: Write>(writer: &mut W, data: &[u8], offset: &mut usize) -> io::Result<()> {
    writer.write_all(data)?;
    *offset += data.len();
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, data: &str, offset: &mut usize) -> io::Result<()> {
    write_bytes(writer, data.as_bytes(), offset)
}

fn escape_pdf_string(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

struct WinAnsiEncoded {
    text: String,
    replaced: usize,
}

fn encode_winansi_pdf_string(input: &str) -> WinAnsiEncoded {
    let mut out = String::new();
    let mut replaced = 0usize;
    for ch in input.chars() {
        let byte = match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            // cp1252 extensions
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => {
                replaced += 1;
                b'?'
            }
        };

        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b if !(0x20..0x7f).contains(&b) => out.push_str(&format!("\\{:03o}", b)),
            b => out.push(b as char),
        }
    }

    WinAnsiEncoded {
        text: out,
        replaced,
    }
}

fn truncate_preview(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::from_num(value);
    let scaled = (fixed * I32F32::from_num(1000)).round();
    let milli: i64 = scaled.to_num();
    format_milli(milli)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        s
    }
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn color_to_pdf_fill(color: Color) -> String {
    format!(
        "{} {} {} rg\n",
        fmt(clamp_unit(color.r)),
        fmt(clamp_unit(color.g)),
        fmt(clamp_unit(color.b))
    )
}

fn color_to_pdf_stroke(color: Color) -> String {
    format!(
        "{} {} {} RG\n",
        fmt(clamp_unit(color.r)),
        fmt(clamp_unit(color.g)),
        fmt(clamp_unit(color.b))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::decode_image_bytes;
    use crate::assets::fixtures::png_bytes;
    use crate::canvas::Canvas;
    use crate::debug::capture::SharedBuffer;
    use lopdf::Document as LoDocument;

    fn sample_document() -> Document {
        let mut canvas = Canvas::new(Size::a4());
        let logo = Arc::new(decode_image_bytes(&png_bytes(4, 4, [0, 0, 255, 128])).expect("png"));
        for page in 0..3 {
            canvas.register_image("brand:logo", logo.clone());
            canvas.set_font_name("Helvetica-Bold");
            canvas.set_font_size(Pt::from_f32(10.0));
            canvas.draw_string(
                Pt::from_mm(10.0),
                Pt::from_mm(10.0),
                format!("Página {}", page + 1),
            );
            canvas.rectangle(
                Pt::from_mm(8.0),
                Pt::from_mm(8.0),
                Pt::from_mm(20.0),
                Pt::from_mm(10.0),
            );
            canvas.stroke();
            canvas.draw_image(
                Pt::from_mm(50.0),
                Pt::from_mm(50.0),
                Pt::from_mm(10.0),
                Pt::from_mm(10.0),
                "brand:logo",
            );
            canvas.show_page();
        }
        canvas.finish()
    }

    #[test]
    fn output_parses_with_expected_page_count() {
        let options = PdfOptions {
            document_title: Some("PSI PSI-2024-001".to_string()),
        };
        let (bytes, metrics) = document_to_pdf(&sample_document(), &options, None).expect("pdf");
        assert!(bytes.starts_with(b"%PDF-1.7"));
        let parsed = LoDocument::load_mem(&bytes).expect("lopdf parse");
        assert_eq!(parsed.get_pages().len(), 3);
        assert_eq!(metrics.total_bytes, bytes.len());
        assert_eq!(metrics.pages.len(), 3);
        assert_eq!(metrics.pages[2].page_number, 3);
        assert!(metrics.pages.iter().all(|p| p.content_bytes > 0));
    }

    #[test]
    fn shared_images_and_fonts_are_written_once() {
        let (bytes, _) =
            document_to_pdf(&sample_document(), &PdfOptions::default(), None).expect("pdf");
        let text = String::from_utf8_lossy(&bytes);
        // one image plus its soft mask
        assert_eq!(text.matches("/Subtype /Image").count(), 2);
        assert_eq!(text.matches("/SMask").count(), 1);
        assert_eq!(text.matches("/BaseFont /Helvetica-Bold").count(), 1);
    }

    #[test]
    fn coordinates_are_flipped_to_bottom_left() {
        let mut canvas = Canvas::new(Size::from_mm(100.0, 100.0));
        canvas.rectangle(
            Pt::from_f32(10.0),
            Pt::from_f32(20.0),
            Pt::from_f32(30.0),
            Pt::from_f32(40.0),
        );
        canvas.fill();
        let doc = canvas.finish();
        let mut writer = Vec::new();
        let mut stream =
            PdfStreamWriter::new(&mut writer, &doc, PdfOptions::default(), None).expect("writer");
        let content = stream.render_page(&doc.pages[0]).expect("content");
        let height = Size::from_mm(100.0, 100.0).height;
        let expected_y = fmt_pt(height - Pt::from_f32(60.0));
        assert_eq!(content, format!("10 {} 30 40 re\nf\n", expected_y));
    }

    #[test]
    fn winansi_encodes_spanish_and_escapes() {
        let encoded = encode_winansi_pdf_string("Ó(ñ)\\");
        assert_eq!(encoded.text, "\\323\\(\\361\\)\\\\");
        assert_eq!(encoded.replaced, 0);
        let lossy = encode_winansi_pdf_string("✕ ok");
        assert_eq!(lossy.text, "? ok");
        assert_eq!(lossy.replaced, 1);
    }

    #[test]
    fn info_title_uses_utf16_for_non_ascii() {
        assert_eq!(pdf_text_string("PSI (1)"), "(PSI \\(1\\))");
        assert_eq!(pdf_text_string("Ñ"), "<FEFF00D1>");
    }

    #[test]
    fn number_formatting_trims_trailing_zeros() {
        assert_eq!(format_milli(0), "0");
        assert_eq!(format_milli(1500), "1.5");
        assert_eq!(format_milli(-250), "-0.25");
        assert_eq!(fmt(0.2), "0.2");
    }

    #[test]
    fn lossy_text_is_logged() {
        let sink = SharedBuffer::default();
        let logger = DebugLogger::from_writer(sink.clone());
        let mut canvas = Canvas::new(Size::a4());
        canvas.draw_string(Pt::ZERO, Pt::ZERO, "✕");
        let doc = canvas.finish();
        document_to_pdf(&doc, &PdfOptions::default(), Some(&logger)).expect("pdf");
        let kinds: Vec<String> = sink
            .lines()
            .iter()
            .filter_map(|line| line["type"].as_str().map(str::to_string))
            .collect();
        assert_eq!(kinds, vec!["pdf.winansi.lossy", "pdf.link"]);
    }
}
