//! Standard error response body.

use serde::{Deserialize, Serialize};

/// The JSON body returned for all error responses.
///
/// ```json
/// { "error": "format text/csv;version=1 is not implemented for RatingTemplate", "code": "not_implemented" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Human-readable description of the problem.
    pub error: String,

    /// Machine-readable error code.
    ///
    /// | `code` | HTTP status |
    /// |--------|------------|
    /// | `invalid_parameter` | 400 |
    /// | `not_found` | 404 |
    /// | `not_acceptable` | 406 |
    /// | `integrity_violation` | 500 |
    /// | `formatting_failed` | 500 |
    /// | `internal_error` | 500 |
    /// | `not_implemented` | 501 |
    pub code: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a static code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            error: error.into(),
        }
    }
}

/// Well-known error codes.
pub mod codes {
    pub const INVALID_PARAMETER: &str = "invalid_parameter";
    pub const NOT_FOUND: &str = "not_found";
    pub const NOT_ACCEPTABLE: &str = "not_acceptable";
    pub const NOT_IMPLEMENTED: &str = "not_implemented";
    pub const INTEGRITY_VIOLATION: &str = "integrity_violation";
    pub const FORMATTING_FAILED: &str = "formatting_failed";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let e = ErrorResponse::new(codes::NOT_ACCEPTABLE, "requested format \"text/x\" is not acceptable");
        let json = serde_json::to_string(&e).unwrap();
        let back: ErrorResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
