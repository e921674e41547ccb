// src/error.rs

use reqwest::StatusCode;
use thiserror::Error;

/// Every failure the payroll library can surface.
///
/// All of these are recoverable from the caller's point of view: the action
/// that produced them can simply be retried. Nothing here is retried
/// automatically.
#[derive(Error, Debug)]
pub enum PayrollError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Could not read import file: {0}")]
    Parse(String),

    #[error("No payroll records selected")]
    EmptySelection,

    #[error("HTTP request failed")]
    Network(#[from] reqwest::Error),

    // Non-success responses from the REST backend
    #[error("API error: Status={status}, Message='{message}'")]
    Http { status: StatusCode, message: String },

    #[error("JSON processing error")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("URL parsing error")]
    UrlParse(#[from] url::ParseError),

    #[error("CSV processing error")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet write failed")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("Not logged in (no session available)")]
    MissingSession,

    #[error("Session expired, log in again")]
    SessionExpired,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} is already in progress")]
    ActionInProgress(&'static str),
}

impl PayrollError {
    /// HTTP status of a backend rejection, if this error is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PayrollError::Http { status, .. } => Some(*status),
            PayrollError::Network(e) => e.status(),
            _ => None,
        }
    }
}

// Helper to create context-aware IO errors
pub(crate) fn io_context<E: Into<std::io::Error>, S: Into<String>>(
    source: E,
    context: S,
) -> PayrollError {
    PayrollError::Io {
        source: source.into(),
        context: context.into(),
    }
}
