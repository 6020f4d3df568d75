//! Turning files into plain text.
//!
//! [`TextExtractor`] is the seam between the engine and file formats. The
//! default [`FileExtractor`] handles the formats the data directory scan picks
//! up: plain text and Markdown are read as UTF-8, PDFs go through
//! `pdf-extract` on the blocking pool, and DOCX text is pulled from
//! `word/document.xml` inside the archive. Other extensions yield empty text.

use crate::error::ExtractionError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

/// A `<w:p>` paragraph element of WordprocessingML.
static PARAGRAPH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:p[ >].*?</w:p>").expect("Invalid paragraph regex pattern"));

/// Content inside a paragraph: a `<w:t>` run's text, a tab, or a line break.
static RUN_CONTENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w:t(?: [^>]*)?>(.*?)</w:t>|<w:(tab)\s*/>|<w:(?:br|cr)(?: [^>]*)?/>")
        .expect("Invalid run content regex pattern")
});

/// Predefined XML entities and decimal or hex character references.
static ENTITY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(lt|gt|quot|apos|amp|#[0-9]+|#x[0-9a-fA-F]+);")
        .expect("Invalid entity regex pattern")
});

/// Extracts the text content of a file.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Returns the trimmed text of `path`; empty for unsupported formats.
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Extension-dispatching extractor for `.txt`, `.md`, `.markdown`, `.pdf` and `.docx`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileExtractor;

impl FileExtractor {
    pub fn new() -> Self {
        Self
    }

    async fn read_bytes(path: &Path) -> Result<Vec<u8>, ExtractionError> {
        tokio::fs::read(path)
            .await
            .map_err(|source| ExtractionError::FileRead {
                path: path.display().to_string(),
                source,
            })
    }

    async fn extract_plain(path: &Path) -> Result<String, ExtractionError> {
        let bytes = Self::read_bytes(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn extract_pdf(path: &Path) -> Result<String, ExtractionError> {
        let bytes = Self::read_bytes(path).await?;
        let display = path.display().to_string();

        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| ExtractionError::TaskFailed(format!("Task join error: {}", e)))?
            .map_err(|e| ExtractionError::Pdf {
                path: display,
                reason: e.to_string(),
            })
    }

    async fn extract_docx(path: &Path) -> Result<String, ExtractionError> {
        let bytes = Self::read_bytes(path).await?;
        let display = path.display().to_string();

        tokio::task::spawn_blocking(move || docx_text(&bytes))
            .await
            .map_err(|e| ExtractionError::TaskFailed(format!("Task join error: {}", e)))?
            .map_err(|reason| ExtractionError::Docx {
                path: display,
                reason,
            })
    }
}

#[async_trait]
impl TextExtractor for FileExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let text = match extension.as_str() {
            "txt" | "md" | "markdown" => Self::extract_plain(path).await?,
            "pdf" => Self::extract_pdf(path).await?,
            "docx" => Self::extract_docx(path).await?,
            _ => {
                debug!("Unsupported file type, skipping: {}", path.display());
                String::new()
            }
        };

        Ok(text.trim().to_string())
    }
}

/// Extracts paragraph text from DOCX bytes, one paragraph per line.
fn docx_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not a zip archive: {}", e))?;
    let mut document = archive
        .by_name("word/document.xml")
        .map_err(|e| format!("missing word/document.xml: {}", e))?;

    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .map_err(|e| format!("unreadable word/document.xml: {}", e))?;

    Ok(document_xml_text(&xml))
}

fn document_xml_text(xml: &str) -> String {
    PARAGRAPH_PATTERN
        .find_iter(xml)
        .map(|paragraph| paragraph_text(paragraph.as_str()))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn paragraph_text(paragraph: &str) -> String {
    let mut text = String::new();
    for caps in RUN_CONTENT_PATTERN.captures_iter(paragraph) {
        if let Some(run) = caps.get(1) {
            text.push_str(&unescape_xml(run.as_str()));
        } else if caps.get(2).is_some() {
            text.push(' ');
        } else {
            text.push('\n');
        }
    }
    text.trim().to_string()
}

/// Decodes entities in one pass so `&amp;lt;` stays `&lt;`. Unknown code
/// points are left as written.
fn unescape_xml(text: &str) -> String {
    ENTITY_PATTERN
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => {
                    let code = match entity.strip_prefix("#x") {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => entity[1..].parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
