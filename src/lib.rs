//! PDF Tools MCP Server Library
//!
//! This crate provides MCP tools for reading and editing PDFs:
//! - metadata, plain text, Markdown, block JSON and span layout extraction
//! - annotation listing
//! - text insertion, replacement, highlighting and redaction
//! - image insertion and rectangle drawing

pub mod config;
pub mod error;
pub mod pdf;
pub mod server;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use server::{run_server, run_server_with_config, PdfToolsServer};
