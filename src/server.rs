//! MCP Server implementation using rmcp

use crate::config::ServerConfig;
use crate::error::Error;
use crate::pdf::editor::{self, EditSummary};
use crate::pdf::reader::{
    self, AnnotationEntry, DocumentMetadata, LayoutSpan, PageBlocks, PageContent,
};
use crate::pdf::{read_pdf_file, write_atomically, AlignedColumnFinder, Rect, TableFinder};
use anyhow::Result;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// PDF Tools MCP Server
#[derive(Clone)]
pub struct PdfToolsServer {
    tool_router: ToolRouter<Self>,
    config: Arc<ServerConfig>,
    table_finder: Arc<dyn TableFinder>,
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DocumentParams {
    /// Path to the PDF file
    pub path: String,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PagesParams {
    /// Path to the PDF file
    pub path: String,
    /// Zero-indexed pages to read (default: all pages)
    #[serde(default)]
    pub pages: Option<Vec<u32>>,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddTextParams {
    /// Path to the PDF file
    pub path: String,
    /// Text to insert
    pub text: String,
    /// Baseline start [x, y] in points, origin at the top-left of the page
    pub position: [f32; 2],
    /// Font size in points (default: 11)
    #[serde(default)]
    pub font_size: Option<f32>,
    /// Zero-indexed pages to modify (default: all pages)
    #[serde(default)]
    pub pages: Option<Vec<u32>>,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReplaceTextParams {
    /// Path to the PDF file
    pub path: String,
    /// Exact text to replace (case-sensitive)
    pub old_text: String,
    /// Replacement text; empty redacts without replacement
    #[serde(default)]
    pub new_text: String,
    /// Zero-indexed pages to modify (default: all pages)
    #[serde(default)]
    pub pages: Option<Vec<u32>>,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HighlightTextParams {
    /// Path to the PDF file
    pub path: String,
    /// Text to highlight
    pub text: String,
    /// Match case exactly (default: false)
    #[serde(default)]
    pub case_sensitive: bool,
    /// Zero-indexed pages to modify (default: all pages)
    #[serde(default)]
    pub pages: Option<Vec<u32>>,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InsertImageParams {
    /// Path to the PDF file
    pub path: String,
    /// Path to the image file (PNG, JPEG, ...)
    pub image_path: String,
    /// Top-left corner [x, y] in points, origin at the top-left of the page
    pub position: [f32; 2],
    /// [width, height] in points (default: [100, 100])
    #[serde(default)]
    pub size: Option<[f32; 2]>,
    /// Zero-indexed pages to modify (default: all pages)
    #[serde(default)]
    pub pages: Option<Vec<u32>>,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BboxParams {
    /// Path to the PDF file
    pub path: String,
    /// Rectangle [x0, y0, x1, y1] in points, origin at the top-left of the page
    pub bbox: [f32; 4],
    /// Zero-indexed pages to modify (default: all pages)
    #[serde(default)]
    pub pages: Option<Vec<u32>>,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnnotateRectParams {
    /// Path to the PDF file
    pub path: String,
    /// Rectangle [x0, y0, x1, y1] in points, origin at the top-left of the page
    pub bbox: [f32; 4],
    /// Outline colour as "#RRGGBB"
    pub color: String,
    /// Zero-indexed pages to modify (default: all pages)
    #[serde(default)]
    pub pages: Option<Vec<u32>>,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MetadataResult {
    pub path: String,
    #[serde(flatten)]
    pub metadata: Option<DocumentMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PagesResult {
    pub path: String,
    pub pages: Vec<PageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlocksResult {
    pub path: String,
    pub pages: Vec<PageBlocks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LayoutResult {
    pub path: String,
    pub spans: Vec<LayoutSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnnotationsResult {
    pub path: String,
    pub annotations: Vec<AnnotationEntry>,
    pub total_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EditResult {
    pub path: String,
    pub success: bool,
    /// Pages that were changed
    pub pages_modified: Vec<u32>,
    /// Items inserted, replaced, highlighted or redacted
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EditResult {
    fn ok(path: &str, summary: EditSummary) -> Self {
        Self {
            path: path.to_string(),
            success: true,
            pages_modified: summary.pages,
            count: summary.count,
            error: None,
        }
    }

    fn failed(path: &str, error: &Error) -> Self {
        Self {
            path: path.to_string(),
            success: false,
            pages_modified: vec![],
            count: 0,
            error: Some(error.client_message()),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Run engine work off the async runtime.
async fn run_blocking<T, F>(f: F) -> crate::error::Result<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Pdfium {
            reason: format!("Task join error: {}", e),
        })?
}

impl Default for PdfToolsServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_router]
impl PdfToolsServer {
    /// Create a new server with no path restrictions
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            tool_router: Self::tool_router(),
            config: Arc::new(config),
            table_finder: Arc::new(AlignedColumnFinder::default()),
        }
    }

    /// Replace the table finder used for Markdown extraction.
    pub fn with_table_finder(mut self, finder: Arc<dyn TableFinder>) -> Self {
        self.table_finder = finder;
        self
    }

    #[tool(
        description = "Get PDF metadata: title, author, subject, keywords, creator, producer, creation and modification dates, and page count."
    )]
    async fn get_metadata(&self, Parameters(params): Parameters<DocumentParams>) -> String {
        let result = self
            .process_get_metadata(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "get_metadata failed");
                MetadataResult {
                    path: params.path.clone(),
                    metadata: None,
                    error: Some(e.client_message()),
                }
            });
        to_json(&result)
    }

    #[tool(description = "Extract plain text from PDF pages. Pages are zero-indexed; omit pages for all.")]
    async fn extract_content_as_text(
        &self,
        Parameters(params): Parameters<PagesParams>,
    ) -> String {
        let result = self
            .process_extract_text(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "extract_content_as_text failed");
                PagesResult {
                    path: params.path.clone(),
                    pages: vec![],
                    error: Some(e.client_message()),
                }
            });
        to_json(&result)
    }

    #[tool(
        description = "Extract PDF pages as Markdown. Groups lines into paragraphs, infers headings from font size, renders bold/italic spans, and appends detected tables as pipe tables."
    )]
    async fn extract_content_as_markdown(
        &self,
        Parameters(params): Parameters<PagesParams>,
    ) -> String {
        let result = self
            .process_extract_markdown(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "extract_content_as_markdown failed");
                PagesResult {
                    path: params.path.clone(),
                    pages: vec![],
                    error: Some(e.client_message()),
                }
            });
        to_json(&result)
    }

    #[tool(
        description = "Extract structured page content as JSON: blocks containing lines containing spans with text, font, size, color, bbox and origin."
    )]
    async fn extract_content_as_json(
        &self,
        Parameters(params): Parameters<PagesParams>,
    ) -> String {
        let result = self
            .process_extract_blocks(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "extract_content_as_json failed");
                BlocksResult {
                    path: params.path.clone(),
                    pages: vec![],
                    error: Some(e.client_message()),
                }
            });
        to_json(&result)
    }

    #[tool(
        description = "Extract text spans with page, bbox [x0, y0, x1, y1], font and size for layout-aware tasks."
    )]
    async fn extract_text_with_layout(
        &self,
        Parameters(params): Parameters<PagesParams>,
    ) -> String {
        let result = self
            .process_extract_layout(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "extract_text_with_layout failed");
                LayoutResult {
                    path: params.path.clone(),
                    spans: vec![],
                    error: Some(e.client_message()),
                }
            });
        to_json(&result)
    }

    #[tool(description = "List annotations with page, type, text and bbox.")]
    async fn list_annotations(&self, Parameters(params): Parameters<PagesParams>) -> String {
        let result = self
            .process_list_annotations(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "list_annotations failed");
                AnnotationsResult {
                    path: params.path.clone(),
                    annotations: vec![],
                    total_count: 0,
                    error: Some(e.client_message()),
                }
            });
        to_json(&result)
    }

    #[tool(
        description = "Add a line of text (Helvetica) with its baseline at position [x, y] on the selected pages. The file is modified in place."
    )]
    async fn add_text(&self, Parameters(params): Parameters<AddTextParams>) -> String {
        let result = self.process_add_text(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "add_text failed");
            EditResult::failed(&params.path, &e)
        });
        to_json(&result)
    }

    #[tool(
        description = "Replace every occurrence of old_text (case-sensitive) with new_text, matching the original font size and colour. An empty new_text only redacts. The file is modified in place."
    )]
    async fn replace_text(&self, Parameters(params): Parameters<ReplaceTextParams>) -> String {
        let result = self.process_replace_text(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "replace_text failed");
            EditResult::failed(&params.path, &e)
        });
        to_json(&result)
    }

    #[tool(
        description = "Add highlight annotations over every occurrence of text (case-insensitive unless case_sensitive is set). The file is modified in place."
    )]
    async fn highlight_text(&self, Parameters(params): Parameters<HighlightTextParams>) -> String {
        let result = self
            .process_highlight_text(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "highlight_text failed");
                EditResult::failed(&params.path, &e)
            });
        to_json(&result)
    }

    #[tool(
        description = "Insert an image with its top-left corner at position [x, y] and the given size (default 100x100 points). The file is modified in place."
    )]
    async fn insert_image(&self, Parameters(params): Parameters<InsertImageParams>) -> String {
        let result = self.process_insert_image(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "insert_image failed");
            EditResult::failed(&params.path, &e)
        });
        to_json(&result)
    }

    #[tool(
        description = "Redact all content inside bbox [x0, y0, x1, y1] and cover it with white. The file is modified in place."
    )]
    async fn delete_text_by_bbox(&self, Parameters(params): Parameters<BboxParams>) -> String {
        let result = self
            .process_delete_text_by_bbox(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "delete_text_by_bbox failed");
                EditResult::failed(&params.path, &e)
            });
        to_json(&result)
    }

    #[tool(
        description = "Draw an unfilled rectangle over bbox [x0, y0, x1, y1] in the given \"#RRGGBB\" colour. The file is modified in place."
    )]
    async fn annotate_rect(&self, Parameters(params): Parameters<AnnotateRectParams>) -> String {
        let result = self
            .process_annotate_rect(&params)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "annotate_rect failed");
                EditResult::failed(&params.path, &e)
            });
        to_json(&result)
    }
}

// Processing methods
impl PdfToolsServer {
    /// Check access and read the document bytes off the runtime, then run
    /// `f` on them.
    async fn read_document<T, F>(
        &self,
        path: &str,
        password: Option<String>,
        f: F,
    ) -> crate::error::Result<T>
    where
        F: FnOnce(&[u8], Option<&str>) -> crate::error::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.config.validate_path_access(path)?;
        run_blocking(move || {
            let data = read_pdf_file(&path)?;
            f(&data, password.as_deref())
        })
        .await
    }

    /// Check access, apply `f` to the document and replace the file with
    /// the result.
    async fn edit_document<F>(
        &self,
        path: &str,
        password: Option<String>,
        f: F,
    ) -> crate::error::Result<EditResult>
    where
        F: FnOnce(&[u8], Option<&str>) -> crate::error::Result<(Vec<u8>, EditSummary)>
            + Send
            + 'static,
    {
        let target = self.config.validate_path_access(path)?;
        let summary = run_blocking(move || {
            let data = read_pdf_file(&target)?;
            let (bytes, summary) = f(&data, password.as_deref())?;
            write_atomically(&target, &bytes)?;
            Ok(summary)
        })
        .await?;

        tracing::info!(
            path = %path,
            pages = summary.pages.len(),
            count = summary.count,
            "document updated"
        );
        Ok(EditResult::ok(path, summary))
    }

    fn resolve_image_path(&self, image_path: &str) -> crate::error::Result<PathBuf> {
        self.config.validate_path_access(image_path)
    }

    async fn process_get_metadata(
        &self,
        params: &DocumentParams,
    ) -> crate::error::Result<MetadataResult> {
        let metadata = self
            .read_document(&params.path, params.password.clone(), reader::get_metadata)
            .await?;
        Ok(MetadataResult {
            path: params.path.clone(),
            metadata: Some(metadata),
            error: None,
        })
    }

    async fn process_extract_text(
        &self,
        params: &PagesParams,
    ) -> crate::error::Result<PagesResult> {
        let pages = params.pages.clone();
        let content = self
            .read_document(&params.path, params.password.clone(), move |data, pw| {
                reader::extract_text(data, pw, pages.as_deref())
            })
            .await?;
        Ok(PagesResult {
            path: params.path.clone(),
            pages: content,
            error: None,
        })
    }

    async fn process_extract_markdown(
        &self,
        params: &PagesParams,
    ) -> crate::error::Result<PagesResult> {
        let pages = params.pages.clone();
        let finder = Arc::clone(&self.table_finder);
        let content = self
            .read_document(&params.path, params.password.clone(), move |data, pw| {
                reader::extract_markdown(data, pw, pages.as_deref(), finder.as_ref())
            })
            .await?;
        Ok(PagesResult {
            path: params.path.clone(),
            pages: content,
            error: None,
        })
    }

    async fn process_extract_blocks(
        &self,
        params: &PagesParams,
    ) -> crate::error::Result<BlocksResult> {
        let pages = params.pages.clone();
        let content = self
            .read_document(&params.path, params.password.clone(), move |data, pw| {
                reader::extract_blocks(data, pw, pages.as_deref())
            })
            .await?;
        Ok(BlocksResult {
            path: params.path.clone(),
            pages: content,
            error: None,
        })
    }

    async fn process_extract_layout(
        &self,
        params: &PagesParams,
    ) -> crate::error::Result<LayoutResult> {
        let pages = params.pages.clone();
        let spans = self
            .read_document(&params.path, params.password.clone(), move |data, pw| {
                reader::extract_layout(data, pw, pages.as_deref())
            })
            .await?;
        Ok(LayoutResult {
            path: params.path.clone(),
            spans,
            error: None,
        })
    }

    async fn process_list_annotations(
        &self,
        params: &PagesParams,
    ) -> crate::error::Result<AnnotationsResult> {
        let pages = params.pages.clone();
        let annotations = self
            .read_document(&params.path, params.password.clone(), move |data, pw| {
                reader::list_annotations(data, pw, pages.as_deref())
            })
            .await?;
        let total_count = annotations.len() as u32;
        Ok(AnnotationsResult {
            path: params.path.clone(),
            annotations,
            total_count,
            error: None,
        })
    }

    async fn process_add_text(&self, params: &AddTextParams) -> crate::error::Result<EditResult> {
        let pages = params.pages.clone();
        let text = params.text.clone();
        let position = (params.position[0], params.position[1]);
        let font_size = params.font_size;
        self.edit_document(&params.path, params.password.clone(), move |data, pw| {
            editor::add_text(data, pw, pages.as_deref(), &text, position, font_size)
        })
        .await
    }

    async fn process_replace_text(
        &self,
        params: &ReplaceTextParams,
    ) -> crate::error::Result<EditResult> {
        let pages = params.pages.clone();
        let old_text = params.old_text.clone();
        let new_text = params.new_text.clone();
        self.edit_document(&params.path, params.password.clone(), move |data, pw| {
            editor::replace_text(data, pw, pages.as_deref(), &old_text, &new_text)
        })
        .await
    }

    async fn process_highlight_text(
        &self,
        params: &HighlightTextParams,
    ) -> crate::error::Result<EditResult> {
        let pages = params.pages.clone();
        let text = params.text.clone();
        let case_sensitive = params.case_sensitive;
        self.edit_document(&params.path, params.password.clone(), move |data, pw| {
            editor::highlight_text(data, pw, pages.as_deref(), &text, case_sensitive)
        })
        .await
    }

    async fn process_insert_image(
        &self,
        params: &InsertImageParams,
    ) -> crate::error::Result<EditResult> {
        let image_path = self.resolve_image_path(&params.image_path)?;
        let pages = params.pages.clone();
        let position = (params.position[0], params.position[1]);
        let size = params.size.map(|[w, h]| (w, h));
        self.edit_document(&params.path, params.password.clone(), move |data, pw| {
            editor::insert_image(data, pw, pages.as_deref(), &image_path, position, size)
        })
        .await
    }

    async fn process_delete_text_by_bbox(
        &self,
        params: &BboxParams,
    ) -> crate::error::Result<EditResult> {
        let pages = params.pages.clone();
        let bbox = Rect::from(params.bbox);
        self.edit_document(&params.path, params.password.clone(), move |data, pw| {
            editor::delete_text_by_bbox(data, pw, pages.as_deref(), bbox)
        })
        .await
    }

    async fn process_annotate_rect(
        &self,
        params: &AnnotateRectParams,
    ) -> crate::error::Result<EditResult> {
        let pages = params.pages.clone();
        let bbox = Rect::from(params.bbox);
        let color = params.color.clone();
        self.edit_document(&params.path, params.password.clone(), move |data, pw| {
            editor::annotate_rect(data, pw, pages.as_deref(), bbox, &color)
        })
        .await
    }
}

#[tool_handler]
impl ServerHandler for PdfToolsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "PDF Tools MCP Server reads PDFs (metadata, text, Markdown, JSON structure, \
                 layout, annotations) and edits them in place (add, replace, highlight or \
                 redact text, insert images, draw rectangles). Pages are zero-indexed and \
                 coordinates use a top-left origin in PDF points."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server configured from the environment
pub async fn run_server() -> Result<()> {
    let config = ServerConfig::from_env()?;
    run_server_with_config(config).await
}

/// Run the MCP server with an explicit configuration
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    if config.is_restricted() {
        tracing::info!(allowed_dirs = ?config.allowed_dirs, "path access restricted");
    }
    let server = PdfToolsServer::with_config(config);

    tracing::info!("PDF Tools MCP Server ready, waiting for connections...");

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_params_defaults() {
        let params: PagesParams = serde_json::from_str(r#"{"path": "/tmp/a.pdf"}"#).unwrap();
        assert!(params.pages.is_none());
        assert!(params.password.is_none());

        let params: PagesParams =
            serde_json::from_str(r#"{"path": "/tmp/a.pdf", "pages": [0, 2]}"#).unwrap();
        assert_eq!(params.pages, Some(vec![0, 2]));
    }

    #[test]
    fn test_highlight_defaults_to_case_insensitive() {
        let params: HighlightTextParams =
            serde_json::from_str(r#"{"path": "a.pdf", "text": "x"}"#).unwrap();
        assert!(!params.case_sensitive);
    }

    #[test]
    fn test_replace_text_new_text_defaults_to_empty() {
        let params: ReplaceTextParams =
            serde_json::from_str(r#"{"path": "a.pdf", "old_text": "secret"}"#).unwrap();
        assert_eq!(params.new_text, "");
    }

    #[test]
    fn test_edit_result_failure_shape() {
        let result = EditResult::failed("a.pdf", &Error::InvalidColor { value: "x".into() });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Invalid color: x");
    }

    #[test]
    fn test_metadata_result_flattens_fields() {
        let result = MetadataResult {
            path: "a.pdf".into(),
            metadata: Some(DocumentMetadata {
                title: Some("T".into()),
                page_count: 3,
                ..Default::default()
            }),
            error: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["title"], "T");
        assert_eq!(json["page_count"], 3);
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_missing_file_reports_not_found() {
        let server = PdfToolsServer::new();
        let params = PagesParams {
            path: "/nonexistent/path/file.pdf".to_string(),
            pages: None,
            password: None,
        };
        let result = server.process_extract_text(&params).await;
        assert!(matches!(result, Err(Error::PdfNotFound { .. })));
    }

    #[tokio::test]
    async fn test_non_pdf_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"plain text").unwrap();

        let server = PdfToolsServer::new();
        let params = DocumentParams {
            path: path.to_string_lossy().to_string(),
            password: None,
        };
        let result = server.process_get_metadata(&params).await;
        assert!(matches!(result, Err(Error::InvalidPdf { .. })));
    }

    #[tokio::test]
    async fn test_path_outside_allowlist_denied() {
        let allowed = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let outside = other.path().join("doc.pdf");
        std::fs::write(&outside, b"%PDF-1.7").unwrap();

        let server = PdfToolsServer::with_config(ServerConfig::with_allowed_dirs([allowed.path()]));
        let params = BboxParams {
            path: outside.to_string_lossy().to_string(),
            bbox: [0.0, 0.0, 10.0, 10.0],
            pages: None,
            password: None,
        };
        let result = server.process_delete_text_by_bbox(&params).await;
        assert!(matches!(result, Err(Error::PathAccessDenied { .. })));
        // Denied edits leave the file alone
        assert_eq!(std::fs::read(&outside).unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_image_path_outside_allowlist_denied() {
        let allowed = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let pdf = allowed.path().join("doc.pdf");
        let image = other.path().join("logo.png");
        std::fs::write(&pdf, b"%PDF-1.7").unwrap();
        std::fs::write(&image, b"png").unwrap();

        let server = PdfToolsServer::with_config(ServerConfig::with_allowed_dirs([allowed.path()]));
        let params = InsertImageParams {
            path: pdf.to_string_lossy().to_string(),
            image_path: image.to_string_lossy().to_string(),
            position: [0.0, 0.0],
            size: None,
            pages: None,
            password: None,
        };
        let result = server.process_insert_image(&params).await;
        assert!(matches!(result, Err(Error::PathAccessDenied { .. })));
    }

    #[tokio::test]
    async fn test_invalid_color_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let server = PdfToolsServer::new();
        let params = AnnotateRectParams {
            path: path.to_string_lossy().to_string(),
            bbox: [10.0, 10.0, 50.0, 50.0],
            color: "#12345".to_string(),
            pages: None,
            password: None,
        };
        let result = server.process_annotate_rect(&params).await;
        assert!(matches!(result, Err(Error::InvalidColor { .. })));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
    }

    #[test]
    fn test_server_info_enables_tools() {
        let info = PdfToolsServer::new().get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.is_some());
    }
}
