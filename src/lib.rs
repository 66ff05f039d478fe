mod archive;
mod assets;
mod canvas;
mod compose;
mod debug;
mod draw;
mod error;
mod font;
mod metrics;
mod narrative;
mod pdf;
mod record;
mod sections;
mod theme;
mod types;

pub use archive::{
    ArchivePayload, ArchiveRejection, MIN_REPORT_PAGES, PdfSummary, check_archivable,
    summarize_pdf, summarize_pdf_file,
};
pub use assets::{BrandAssets, RasterImage, decode_image, decode_image_bytes};
pub use canvas::{Canvas, Command, Document, Page};
pub use compose::{META_NARRATIVE_LINES, META_PHOTO, META_SIGNATURE};
pub use draw::{Align, TextStyle, draw_box, labeled_field, outline, place_paragraph, place_text};
pub use error::{ImageDecodeError, RenderError};
pub use font::{FontFace, measure_text_width, wrap_text};
pub use metrics::{DocumentMetrics, PageMetrics};
pub use narrative::strip_legacy_headers;
pub use record::{
    CREW_ROWS, Checkpoints, CrewRow, INTERVENTION_ITEMS, OTHER_ITEMS, PLATE_SLOTS,
    PREVENTION_ITEMS, ReportRecord, SignatureSlot, Signatures, Typology, VEHICLE_ROWS, VehicleRow,
};
pub use sections::{
    META_CHECKBOX, META_TABLE, ResourceTable, checkbox, page_footer, page_header, section_bar,
};
pub use theme::Theme;
pub use types::{Color, Pt, Rect, Size};

use compose::{
    ComposeContext, PHOTOS_PER_SHEET, compose_narrative, compose_photos, compose_service_data,
};
use debug::DebugLogger;
use pdf::PdfOptions;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const DRAFT_NUMBER: &str = "borrador";

/// Renders PSI service and intervention reports to fixed-layout PDF.
///
/// Built once through [`ReportRenderer::builder`]; every render is independent
/// and only reads the renderer's configuration.
#[derive(Clone)]
pub struct ReportRenderer {
    theme: Theme,
    brand: BrandAssets,
    document_title: Option<String>,
    debug: Option<Arc<DebugLogger>>,
}

#[derive(Clone, Default)]
pub struct ReportRendererBuilder {
    theme: Option<Theme>,
    logo: Option<Vec<u8>>,
    footer: Option<Vec<u8>>,
    document_title: Option<String>,
    debug_path: Option<PathBuf>,
}

impl ReportRenderer {
    pub fn builder() -> ReportRendererBuilder {
        ReportRendererBuilder::new()
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Lays out every page of `record`. Page 1 (service data) and page 2
    /// (narrative) are always present; photo sheets follow only when the
    /// record carries at least one non-blank photo entry.
    pub fn render(&self, record: &ReportRecord) -> Result<RenderedReport, RenderError> {
        let started = Instant::now();
        let photos = record.photo_entries();
        if let Some(logger) = self.debug.as_deref() {
            logger.event(
                "render.start",
                json!({ "numero": record.number(), "photos": photos.len() }),
            );
        }

        let result = self.compose(record, &photos);
        let document = match result {
            Ok(document) => document,
            Err(err) => {
                if let Some(logger) = self.debug.as_deref() {
                    logger.event("render.failed", json!({ "error": err.to_string() }));
                }
                self.emit_debug_summary("render");
                return Err(err);
            }
        };

        if let Some(logger) = self.debug.as_deref() {
            for (index, page) in document.pages.iter().enumerate() {
                logger.event(
                    "render.page",
                    json!({
                        "page": index + 1,
                        "composer": composer_name(index),
                        "commands": page.commands.len(),
                    }),
                );
            }
            logger.event(
                "render.done",
                json!({
                    "pages": document.page_count(),
                    "images": document.images.len(),
                    "elapsed_ms": started.elapsed().as_secs_f64() * 1000.0,
                }),
            );
        }
        self.emit_debug_summary("render");

        let number = record.number().map(str::to_string);
        let document_title = self
            .document_title
            .clone()
            .unwrap_or_else(|| default_title(number.as_deref()));
        Ok(RenderedReport {
            document,
            filename: report_filename(number.as_deref()),
            report_number: number,
            document_title,
            debug: self.debug.clone(),
        })
    }

    /// Parses a JSON report record and renders it.
    pub fn render_json(&self, data: &[u8]) -> Result<RenderedReport, RenderError> {
        let record = ReportRecord::from_json_slice(data)?;
        self.render(&record)
    }

    fn compose(&self, record: &ReportRecord, photos: &[&str]) -> Result<Document, RenderError> {
        let ctx = ComposeContext {
            theme: &self.theme,
            brand: &self.brand,
            debug: self.debug.as_deref(),
        };
        let mut canvas = Canvas::new(self.theme.page_size());
        compose_service_data(&mut canvas, &ctx, record)?;
        canvas.show_page();
        compose_narrative(&mut canvas, &ctx, record)?;
        if !photos.is_empty() {
            canvas.show_page();
            compose_photos(&mut canvas, &ctx, photos)?;
        }
        Ok(canvas.finish())
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
    }
}

impl ReportRendererBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Replaces the bundled masthead logo (PNG or JPEG bytes).
    pub fn logo(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.logo = Some(bytes.into());
        self
    }

    /// Replaces the bundled footer strip (PNG or JPEG bytes).
    pub fn footer(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.footer = Some(bytes.into());
        self
    }

    pub fn document_title(mut self, title: impl Into<String>) -> Self {
        self.document_title = Some(title.into());
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<ReportRenderer, RenderError> {
        let theme = self.theme.unwrap_or_default();
        theme.validate()?;

        let bundled = BrandAssets::bundled().map_err(|err| {
            RenderError::InvalidConfiguration(format!("bundled brand assets: {err}"))
        })?;
        let logo = match self.logo {
            Some(bytes) => Arc::new(decode_image_bytes(&bytes).map_err(|err| {
                RenderError::InvalidConfiguration(format!("logo: {err}"))
            })?),
            None => bundled.logo,
        };
        let footer = match self.footer {
            Some(bytes) => Arc::new(decode_image_bytes(&bytes).map_err(|err| {
                RenderError::InvalidConfiguration(format!("footer: {err}"))
            })?),
            None => bundled.footer,
        };

        if let Some(title) = self.document_title.as_deref() {
            if title.trim().is_empty() {
                return Err(RenderError::InvalidConfiguration(
                    "document_title must not be blank".to_string(),
                ));
            }
        }

        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };

        Ok(ReportRenderer {
            theme,
            brand: BrandAssets { logo, footer },
            document_title: self.document_title,
            debug,
        })
    }
}

/// A laid-out report, ready to serialise.
pub struct RenderedReport {
    document: Document,
    filename: String,
    report_number: Option<String>,
    document_title: String,
    debug: Option<Arc<DebugLogger>>,
}

impl RenderedReport {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    /// `PSI_<numero>.pdf`, or `PSI_borrador.pdf` when no number is assigned.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn report_number(&self) -> Option<&str> {
        self.report_number.as_deref()
    }

    pub fn document_title(&self) -> &str {
        &self.document_title
    }

    pub fn to_pdf_bytes(&self) -> Result<Vec<u8>, RenderError> {
        Ok(self.to_pdf_bytes_with_metrics()?.0)
    }

    pub fn to_pdf_bytes_with_metrics(&self) -> Result<(Vec<u8>, DocumentMetrics), RenderError> {
        let (bytes, metrics) =
            pdf::document_to_pdf(&self.document, &self.pdf_options(), self.debug.as_deref())?;
        self.emit_debug_summary("pdf");
        Ok((bytes, metrics))
    }

    pub fn write_pdf<W: Write>(&self, writer: &mut W) -> Result<DocumentMetrics, RenderError> {
        let metrics = pdf::document_to_writer(
            &self.document,
            &self.pdf_options(),
            writer,
            self.debug.as_deref(),
        )?;
        self.emit_debug_summary("pdf");
        Ok(metrics)
    }

    /// Writes the PDF under `dir` using [`RenderedReport::filename`].
    pub fn save_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, RenderError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        let file = std::fs::File::create(&path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_pdf(&mut writer)?;
        writer.flush()?;
        Ok(path)
    }

    /// Bytes and metadata for the external archival upload.
    pub fn archive_payload(
        &self,
        report_id: impl Into<String>,
    ) -> Result<ArchivePayload, RenderError> {
        let bytes = self.to_pdf_bytes()?;
        ArchivePayload::new(
            report_id,
            self.report_number.as_deref(),
            self.filename.clone(),
            bytes,
            Some(self.page_count()),
        )
    }

    fn pdf_options(&self) -> PdfOptions {
        PdfOptions {
            document_title: Some(self.document_title.clone()),
        }
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
    }
}

fn composer_name(page_index: usize) -> &'static str {
    match page_index {
        0 => "service_data",
        1 => "narrative",
        _ => "photos",
    }
}

fn default_title(number: Option<&str>) -> String {
    format!("PSI {}", number.unwrap_or(DRAFT_NUMBER))
}

/// Download name for a report; characters that are not filename-safe become `-`.
pub fn report_filename(number: Option<&str>) -> String {
    let number = number.map(str::trim).filter(|n| !n.is_empty());
    let stem: String = match number {
        Some(number) => number
            .chars()
            .map(|ch| match ch {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
                c if c.is_control() => '-',
                c => c,
            })
            .collect(),
        None => DRAFT_NUMBER.to_string(),
    };
    format!("PSI_{stem}.pdf")
}

/// Total page count for a record with `photo_count` non-blank photos.
pub fn expected_page_count(photo_count: usize) -> usize {
    2 + photo_count.div_ceil(PHOTOS_PER_SHEET)
}
