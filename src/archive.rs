use crate::error::RenderError;
use lopdf::{Document as LoDocument, Object as LoObject};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Service data and narrative pages are always present.
pub const MIN_REPORT_PAGES: usize = 2;

/// What the archive reads back from a produced PDF before storing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfSummary {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub title: Option<String>,
    pub byte_len: usize,
}

/// Why a produced PDF was refused for archival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveRejection {
    Unreadable(String),
    Unparseable(String),
    Encrypted,
    Incomplete { pages: usize },
    PageCountMismatch { expected: usize, found: usize },
}

impl ArchiveRejection {
    pub fn code(&self) -> &'static str {
        match self {
            ArchiveRejection::Unreadable(_) => "unreadable",
            ArchiveRejection::Unparseable(_) => "unparseable",
            ArchiveRejection::Encrypted => "encrypted",
            ArchiveRejection::Incomplete { .. } => "incomplete",
            ArchiveRejection::PageCountMismatch { .. } => "page_count_mismatch",
        }
    }
}

impl fmt::Display for ArchiveRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveRejection::Unreadable(message) => write!(f, "unreadable: {}", message),
            ArchiveRejection::Unparseable(message) => write!(f, "unparseable: {}", message),
            ArchiveRejection::Encrypted => write!(f, "encrypted: archive stores plain pdf only"),
            ArchiveRejection::Incomplete { pages } => write!(
                f,
                "incomplete: {} page(s), a report has at least {}",
                pages, MIN_REPORT_PAGES
            ),
            ArchiveRejection::PageCountMismatch { expected, found } => write!(
                f,
                "page_count_mismatch: rendered {} page(s), pdf has {}",
                expected, found
            ),
        }
    }
}

impl std::error::Error for ArchiveRejection {}

pub fn summarize_pdf(bytes: &[u8]) -> Result<PdfSummary, ArchiveRejection> {
    let pdf = LoDocument::load_mem(bytes)
        .map_err(|err| ArchiveRejection::Unparseable(err.to_string()))?;
    Ok(PdfSummary {
        pdf_version: pdf.version.clone(),
        page_count: pdf.get_pages().len(),
        encrypted: pdf.is_encrypted(),
        title: document_title(&pdf),
        byte_len: bytes.len(),
    })
}

pub fn summarize_pdf_file(path: &Path) -> Result<PdfSummary, ArchiveRejection> {
    let data =
        std::fs::read(path).map_err(|err| ArchiveRejection::Unreadable(err.to_string()))?;
    summarize_pdf(&data)
}

/// Accepts a summary only when it is a plain, complete report. `expected_pages`
/// is the page count of the rendered document, when known.
pub fn check_archivable(
    summary: &PdfSummary,
    expected_pages: Option<usize>,
) -> Result<(), ArchiveRejection> {
    if summary.encrypted {
        return Err(ArchiveRejection::Encrypted);
    }
    if summary.page_count < MIN_REPORT_PAGES {
        return Err(ArchiveRejection::Incomplete {
            pages: summary.page_count,
        });
    }
    match expected_pages {
        Some(expected) if expected != summary.page_count => {
            Err(ArchiveRejection::PageCountMismatch {
                expected,
                found: summary.page_count,
            })
        }
        _ => Ok(()),
    }
}

/// Rendered bytes plus the metadata the archival upload sends alongside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePayload {
    pub report_id: String,
    pub report_number: Option<String>,
    pub filename: String,
    pub bytes: Vec<u8>,
    pub sha256: String,
    pub page_count: usize,
}

#[derive(Debug, Serialize)]
struct ArchiveManifest<'a> {
    report_id: &'a str,
    report_number: Option<&'a str>,
    filename: &'a str,
    content_type: &'static str,
    byte_len: usize,
    page_count: usize,
    sha256: &'a str,
}

impl ArchivePayload {
    /// Reads `bytes` back, checks it is archivable and digests it.
    pub fn new(
        report_id: impl Into<String>,
        report_number: Option<&str>,
        filename: impl Into<String>,
        bytes: Vec<u8>,
        expected_pages: Option<usize>,
    ) -> Result<Self, RenderError> {
        let summary = summarize_pdf(&bytes)?;
        check_archivable(&summary, expected_pages)?;
        Ok(Self {
            report_id: report_id.into(),
            report_number: report_number.map(str::to_string),
            filename: filename.into(),
            sha256: sha256_hex(&bytes),
            page_count: summary.page_count,
            bytes,
        })
    }

    /// Upload metadata as JSON, without the document bytes.
    pub fn manifest_json(&self) -> Result<String, RenderError> {
        let manifest = ArchiveManifest {
            report_id: &self.report_id,
            report_number: self.report_number.as_deref(),
            filename: &self.filename,
            content_type: "application/pdf",
            byte_len: self.bytes.len(),
            page_count: self.page_count,
            sha256: &self.sha256,
        };
        serde_json::to_string(&manifest).map_err(|err| RenderError::Archive(err.to_string()))
    }
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn document_title(pdf: &LoDocument) -> Option<String> {
    let info = match pdf.trailer.get(b"Info").ok()? {
        LoObject::Reference(id) => pdf.get_dictionary(*id).ok()?,
        LoObject::Dictionary(dict) => dict,
        _ => return None,
    };
    match info.get(b"Title").ok()? {
        LoObject::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

// UTF-16BE with BOM, otherwise read as Latin-1.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::pdf::{PdfOptions, document_to_pdf};
    use crate::types::Size;

    fn pdf_with_pages(pages: usize, title: Option<&str>) -> Vec<u8> {
        let mut canvas = Canvas::new(Size::a4());
        for _ in 0..pages {
            canvas.show_page();
        }
        let options = PdfOptions {
            document_title: title.map(str::to_string),
        };
        let (bytes, _) = document_to_pdf(&canvas.finish(), &options, None).expect("pdf");
        bytes
    }

    fn summary(page_count: usize, encrypted: bool) -> PdfSummary {
        PdfSummary {
            pdf_version: "1.7".to_string(),
            page_count,
            encrypted,
            title: None,
            byte_len: 0,
        }
    }

    #[test]
    fn digest_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn summary_reads_version_pages_and_title() {
        let bytes = pdf_with_pages(3, Some("Parte Ñ"));
        let summary = summarize_pdf(&bytes).expect("summary");
        assert_eq!(summary.pdf_version, "1.7");
        assert_eq!(summary.page_count, 3);
        assert!(!summary.encrypted);
        assert_eq!(summary.title.as_deref(), Some("Parte Ñ"));
        assert_eq!(summary.byte_len, bytes.len());
    }

    #[test]
    fn file_and_bytes_summaries_agree() {
        let bytes = pdf_with_pages(2, Some("PSI borrador"));
        let dir = std::env::temp_dir().join(format!(
            "psi_archive_summary_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("report.pdf");
        std::fs::write(&path, &bytes).expect("write");
        assert_eq!(
            summarize_pdf_file(&path).expect("file"),
            summarize_pdf(&bytes).expect("bytes")
        );

        let missing = summarize_pdf_file(&dir.join("missing.pdf")).expect_err("missing");
        assert_eq!(missing.code(), "unreadable");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn only_plain_complete_reports_are_archivable() {
        assert_eq!(
            check_archivable(&summary(3, true), None),
            Err(ArchiveRejection::Encrypted)
        );
        assert_eq!(
            check_archivable(&summary(1, false), None),
            Err(ArchiveRejection::Incomplete { pages: 1 })
        );
        assert_eq!(
            check_archivable(&summary(3, false), Some(4)),
            Err(ArchiveRejection::PageCountMismatch {
                expected: 4,
                found: 3
            })
        );
        assert!(check_archivable(&summary(4, false), Some(4)).is_ok());
        assert!(check_archivable(&summary(2, false), None).is_ok());
    }

    #[test]
    fn payload_carries_metadata_and_digest() {
        let bytes = pdf_with_pages(2, None);
        let expected = sha256_hex(&bytes);
        let payload = ArchivePayload::new(
            "42",
            Some("PSI-2024-001"),
            "PSI_PSI-2024-001.pdf",
            bytes,
            Some(2),
        )
        .expect("payload");
        assert_eq!(payload.sha256, expected);
        assert_eq!(payload.page_count, 2);

        let manifest: serde_json::Value =
            serde_json::from_str(&payload.manifest_json().expect("manifest")).expect("json");
        assert_eq!(manifest["report_id"], "42");
        assert_eq!(manifest["report_number"], "PSI-2024-001");
        assert_eq!(manifest["content_type"], "application/pdf");
        assert_eq!(manifest["sha256"], expected.as_str());
        assert!(manifest.get("bytes").is_none());
    }

    #[test]
    fn garbage_and_short_documents_are_rejected() {
        let err = ArchivePayload::new("1", None, "PSI_borrador.pdf", b"nope".to_vec(), None)
            .expect_err("not a pdf");
        assert!(matches!(err, RenderError::Archive(msg) if msg.starts_with("unparseable")));

        let single = pdf_with_pages(1, None);
        let err = ArchivePayload::new("1", None, "PSI_borrador.pdf", single, None)
            .expect_err("one page");
        assert!(matches!(err, RenderError::Archive(msg) if msg.starts_with("incomplete")));
    }

    #[test]
    fn utf16_titles_decode() {
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0xD1]), "Ñ");
        assert_eq!(decode_text_string(b"PSI"), "PSI");
    }
}
