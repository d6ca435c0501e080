use async_trait::async_trait;
use thiserror::Error;

use crate::notify::Attachment;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),
    #[error("template render failed: {0}")]
    Render(String),
    #[error("document conversion failed: {0}")]
    Conversion(String),
}

/// A rendered document, ready for display or attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderedDocument {
    Pdf(Vec<u8>),
    Html(String),
}

impl RenderedDocument {
    pub fn into_attachment(self, filename_stem: &str) -> Attachment {
        match self {
            RenderedDocument::Pdf(bytes) => Attachment {
                filename: format!("{filename_stem}.pdf"),
                bytes,
                mime: "application/pdf".to_string(),
            },
            RenderedDocument::Html(html) => Attachment {
                filename: format!("{filename_stem}.html"),
                bytes: html.into_bytes(),
                mime: "text/html".to_string(),
            },
        }
    }

    /// The document as displayable text. PDF bytes have no useful text form
    /// and come back as `None`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RenderedDocument::Html(html) => Some(html),
            RenderedDocument::Pdf(_) => None,
        }
    }
}

/// Turns a request (plus its parsed items) into a document for display or
/// attachment. The server crate provides the tera-backed implementation;
/// this trait keeps the workflow testable without a template engine.
#[async_trait]
pub trait LetterRenderer: Send + Sync {
    async fn render(
        &self,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<RenderedDocument, RenderError>;
}

/// Minimal renderer producing deterministic text. Used as the test double
/// and as the last-resort fallback when template loading fails.
#[derive(Clone, Default)]
pub struct PlainTextRenderer;

#[async_trait]
impl LetterRenderer for PlainTextRenderer {
    async fn render(
        &self,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<RenderedDocument, RenderError> {
        let title = context
            .get("request")
            .and_then(|request| request.get("title"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("(untitled)");

        match template {
            "request_summary" | "request_letter" => {
                Ok(RenderedDocument::Html(format!("{template}: {title}")))
            }
            other => Err(RenderError::UnknownTemplate(other.to_string())),
        }
    }
}

/// Test double whose every render fails, for exercising the degraded
/// notification path.
#[derive(Clone, Default)]
pub struct FailingRenderer;

#[async_trait]
impl LetterRenderer for FailingRenderer {
    async fn render(
        &self,
        _template: &str,
        _context: &serde_json::Value,
    ) -> Result<RenderedDocument, RenderError> {
        Err(RenderError::Render("template engine unavailable".to_string()))
    }
}
