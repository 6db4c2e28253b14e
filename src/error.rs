// Error types module

use thiserror::Error;

/// Centralized error type for a render request.
///
/// Every variant maps to one HTTP status and one short label; the `Display`
/// text becomes the `details` field of the JSON error body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    /// Missing (or, in strict mode, invalid) bearer credential
    #[error("{0}")]
    Unauthorized(String),

    /// HTTP method other than GET, POST or OPTIONS
    #[error("Method {0} is not allowed; use GET or POST")]
    MethodNotAllowed(String),

    /// Missing or malformed request parameters
    #[error("{0}")]
    BadRequest(String),

    /// Container or object absent from the store
    #[error("{0}")]
    NotFound(String),

    /// Source object exceeds the size ceiling
    #[error("File size {size} bytes exceeds the maximum of {max} bytes")]
    PayloadTooLarge { size: u64, max: u64 },

    /// Page window outside `1 <= start <= end <= total`
    #[error("{0}")]
    InvalidRange(String),

    /// Page window larger than the per-request ceiling
    #[error(
        "Requested {requested} pages ({start}-{end}) but at most {max} pages may be rendered per request for this file"
    )]
    RangeTooLarge {
        start: u32,
        end: u32,
        requested: u32,
        max: u32,
    },

    /// Whole-document render of a document above the page ceiling
    #[error(
        "Document has {pages} pages, more than the {max} pages allowed without a page range; request a range with start and end"
    )]
    DocumentTooLarge { pages: u32, max: u32 },

    /// Decode, composite or copy failure
    #[error("{0}")]
    Processing(String),

    /// Serialization of the final PDF failed
    #[error("Failed to save watermarked PDF: {0}")]
    PdfSaveFailed(String),

    /// The object store could not be reached or answered with an unexpected error
    #[error("Storage backend error: {0}")]
    StoreUnavailable(String),

    /// Missing server-side credentials or settings
    #[error("Server configuration error: {0}")]
    Configuration(String),
}

impl RenderError {
    /// Maps the error to an HTTP status code
    ///
    /// Status mapping:
    /// - BadRequest, PayloadTooLarge, InvalidRange, RangeTooLarge, DocumentTooLarge → 400
    /// - Unauthorized → 401
    /// - NotFound → 404
    /// - MethodNotAllowed → 405
    /// - Processing, PdfSaveFailed, StoreUnavailable, Configuration → 500
    pub fn status_code(&self) -> u16 {
        match self {
            RenderError::BadRequest(_)
            | RenderError::PayloadTooLarge { .. }
            | RenderError::InvalidRange(_)
            | RenderError::RangeTooLarge { .. }
            | RenderError::DocumentTooLarge { .. } => 400,
            RenderError::Unauthorized(_) => 401,
            RenderError::NotFound(_) => 404,
            RenderError::MethodNotAllowed(_) => 405,
            RenderError::Processing(_)
            | RenderError::PdfSaveFailed(_)
            | RenderError::StoreUnavailable(_)
            | RenderError::Configuration(_) => 500,
        }
    }

    /// Short label used as the `error` field of JSON error bodies
    pub fn label(&self) -> &'static str {
        match self {
            RenderError::Unauthorized(_) => "Unauthorized",
            RenderError::MethodNotAllowed(_) => "Method not allowed",
            RenderError::BadRequest(_) => "Bad request",
            RenderError::NotFound(_) => "Not found",
            RenderError::PayloadTooLarge { .. } => "File too large",
            RenderError::InvalidRange(_) => "Invalid page range",
            RenderError::RangeTooLarge { .. } => "Page range too large",
            RenderError::DocumentTooLarge { .. } => "Document too large",
            RenderError::Processing(_) => "Processing failed",
            RenderError::PdfSaveFailed(_) => "PDF save failed",
            RenderError::StoreUnavailable(_) => "Storage unavailable",
            RenderError::Configuration(_) => "Server configuration error",
        }
    }

    /// Metric/log friendly name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::Unauthorized(_) => "unauthorized",
            RenderError::MethodNotAllowed(_) => "method_not_allowed",
            RenderError::BadRequest(_) => "bad_request",
            RenderError::NotFound(_) => "not_found",
            RenderError::PayloadTooLarge { .. } => "payload_too_large",
            RenderError::InvalidRange(_) => "invalid_range",
            RenderError::RangeTooLarge { .. } => "range_too_large",
            RenderError::DocumentTooLarge { .. } => "document_too_large",
            RenderError::Processing(_) => "processing_failure",
            RenderError::PdfSaveFailed(_) => "pdf_save_failed",
            RenderError::StoreUnavailable(_) => "store_unavailable",
            RenderError::Configuration(_) => "configuration_error",
        }
    }
}
