//! Letter and summary rendering.
//!
//! Templates are tera; the approval letter is converted to PDF via
//! wkhtmltopdf when the binary is on PATH, and degrades to HTML otherwise.

use std::process::Stdio;

use async_trait::async_trait;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

use upkeep_core::render::{LetterRenderer, RenderError, RenderedDocument};

pub struct LetterEngine {
    tera: Tera,
    wkhtmltopdf_path: Option<String>,
}

fn find_wkhtmltopdf() -> Option<String> {
    let path = which::which("wkhtmltopdf").ok().map(|p| p.to_string_lossy().to_string());
    match &path {
        Some(found) => info!(path = %found, "wkhtmltopdf found"),
        None => warn!("wkhtmltopdf not found in PATH - letters will be attached as HTML"),
    }
    path
}

impl LetterEngine {
    /// Load templates from a directory on disk.
    pub fn new(template_dir: &str) -> Result<Self, RenderError> {
        let tera = Tera::new(&format!("{template_dir}/**/*"))
            .map_err(|e| RenderError::Render(e.to_string()))?;

        Ok(Self { tera, wkhtmltopdf_path: find_wkhtmltopdf() })
    }

    /// Fall back to the templates compiled into the binary.
    pub fn with_embedded_templates() -> Self {
        let mut tera = Tera::default();

        tera.add_raw_template(
            "request_letter.html.tera",
            include_str!("../../../templates/letters/request_letter.html.tera"),
        )
        .expect("request_letter template should parse");
        tera.add_raw_template(
            "request_summary.html.tera",
            include_str!("../../../templates/letters/request_summary.html.tera"),
        )
        .expect("request_summary template should parse");

        Self { tera, wkhtmltopdf_path: find_wkhtmltopdf() }
    }

    fn template_file(template: &str) -> Option<&'static str> {
        match template {
            "request_letter" => Some("request_letter.html.tera"),
            "request_summary" => Some("request_summary.html.tera"),
            _ => None,
        }
    }

    async fn convert_html_to_pdf(
        &self,
        html: &str,
        wkhtmltopdf_path: &str,
    ) -> Result<Vec<u8>, RenderError> {
        let temp_dir = std::env::temp_dir();
        let html_path = temp_dir.join(format!("letter_{}.html", uuid::Uuid::new_v4()));
        let pdf_path = temp_dir.join(format!("letter_{}.pdf", uuid::Uuid::new_v4()));

        tokio::fs::write(&html_path, html)
            .await
            .map_err(|e| RenderError::Conversion(e.to_string()))?;

        let output = Command::new(wkhtmltopdf_path)
            .arg("--page-size")
            .arg("A4")
            .arg("--encoding")
            .arg("utf-8")
            .arg("--enable-local-file-access")
            .arg(&html_path)
            .arg(&pdf_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RenderError::Conversion(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(stderr = %stderr, "wkhtmltopdf failed");
            return Err(RenderError::Conversion(stderr.to_string()));
        }

        let pdf_bytes = tokio::fs::read(&pdf_path)
            .await
            .map_err(|e| RenderError::Conversion(e.to_string()))?;

        let _ = tokio::fs::remove_file(&html_path).await;
        let _ = tokio::fs::remove_file(&pdf_path).await;

        Ok(pdf_bytes)
    }
}

#[async_trait]
impl LetterRenderer for LetterEngine {
    async fn render(
        &self,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<RenderedDocument, RenderError> {
        let template_file = Self::template_file(template)
            .ok_or_else(|| RenderError::UnknownTemplate(template.to_string()))?;

        let mut tera_context = Context::new();
        tera_context
            .insert("request", &context.get("request").cloned().unwrap_or(serde_json::json!({})));
        tera_context.insert("hod", &context.get("hod").cloned().unwrap_or(serde_json::json!({})));
        tera_context.insert(
            "items",
            &context
                .get("request")
                .and_then(|request| request.get("items"))
                .cloned()
                .unwrap_or(serde_json::json!([])),
        );

        let html = self
            .tera
            .render(template_file, &tera_context)
            .map_err(|e| RenderError::Render(e.to_string()))?;

        // Only the letter is worth a PDF; summaries stay HTML email bodies.
        if template == "request_letter" {
            if let Some(wkhtmltopdf_path) = self.wkhtmltopdf_path.clone() {
                match self.convert_html_to_pdf(&html, &wkhtmltopdf_path).await {
                    Ok(pdf_bytes) => return Ok(RenderedDocument::Pdf(pdf_bytes)),
                    Err(e) => {
                        warn!(error = %e, "PDF conversion failed, falling back to HTML");
                    }
                }
            }
        }

        Ok(RenderedDocument::Html(html))
    }
}
