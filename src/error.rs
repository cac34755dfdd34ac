//! Error types for PDF Tools MCP Server

use thiserror::Error;

/// Result type alias for PDF Tools MCP Server
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for PDF Tools MCP Server
#[derive(Error, Debug)]
pub enum Error {
    /// PDF file not found
    #[error("PDF not found: {path}")]
    PdfNotFound { path: String },

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// PDF is password protected and no (or a wrong) password was provided
    #[error("PDF is password protected")]
    PasswordRequired,

    /// Page index out of bounds (zero-indexed)
    #[error("Page {page} out of bounds (total: {total})")]
    PageOutOfBounds { page: u32, total: u32 },

    /// A tool parameter was rejected before touching the document
    #[error("Invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    /// Colour string could not be parsed as `#RRGGBB`
    #[error("Invalid color: {value}")]
    InvalidColor { value: String },

    /// Environment configuration could not be parsed
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Path access denied (outside allowed directories)
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// Image decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, library errors) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::PdfNotFound { .. } => "PDF not found".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::PasswordRequired => "PDF is password protected".to_string(),
            Error::PageOutOfBounds { page, total } => {
                format!("Page {} out of bounds (total: {})", page, total)
            }
            Error::InvalidParameter { reason } => format!("Invalid parameter: {}", reason),
            Error::InvalidColor { value } => format!("Invalid color: {}", value),
            Error::InvalidConfig { .. } => "Server configuration error".to_string(),
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
            Error::Pdfium { .. } => "PDF processing error".to_string(),
            Error::Image(_) => "Image could not be decoded".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_paths() {
        let err = Error::PathAccessDenied {
            path: "/etc/secret.pdf".to_string(),
        };
        assert_eq!(err.client_message(), "Access denied");
        assert!(err.to_string().contains("/etc/secret.pdf"));
    }

    #[test]
    fn test_client_message_keeps_page_bounds() {
        let err = Error::PageOutOfBounds { page: 7, total: 3 };
        assert_eq!(err.client_message(), "Page 7 out of bounds (total: 3)");
    }
}
