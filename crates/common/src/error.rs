//! Common error types for catalogx.

use thiserror::Error;

/// Common error type for catalogx operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("XML parse error: {0}")]
    Parse(String),

    #[error("Invalid query '{expr}': {reason}")]
    Query { expr: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate asset ID: {0}")]
    DuplicateId(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Schema validation failed: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Conflicting update: {0}")]
    Conflict(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a query error for the given expression.
    pub fn query(expr: &str, reason: impl Into<String>) -> Self {
        Error::Query {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error reports a missing file, attribute or lookup target.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Archive(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_covers_missing_files() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(Error::from(io).is_not_found());
        assert!(Error::NotFound("asset 'a1'".to_string()).is_not_found());
        assert!(!Error::DuplicateId("a1".to_string()).is_not_found());
    }

    #[test]
    fn test_query_error_display() {
        let err = Error::query("/a[", "unterminated predicate");
        assert_eq!(err.to_string(), "Invalid query '/a[': unterminated predicate");
    }
}
