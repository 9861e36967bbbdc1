//! Error types for codeBeamer API operations.

use thiserror::Error;

/// Errors that can occur during codeBeamer API operations.
#[derive(Debug, Error)]
pub enum CbError {
    /// Configuration is missing or incomplete.
    #[error("codeBeamer configuration required: {0}")]
    ConfigMissing(String),

    /// Entity not found.
    #[error("{entity_type} '{id}' not found")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A write was attempted on a field the server reported as read-only.
    #[error("field '{field}' is not editable")]
    NotEditable { field: String },

    /// A value of the wrong kind was supplied for a field.
    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The server returned a field type tag this client does not know.
    #[error("unknown field type '{0}'")]
    UnknownFieldType(String),

    /// A choice value is not among the field's available choices.
    #[error("'{choice}' is not an available choice for field '{field}'")]
    InvalidChoice { field: String, choice: String },

    /// The server answered with a non-2xx status.
    #[error("codeBeamer API error: {message}")]
    ServerError {
        message: String,
        status_code: Option<u16>,
    },

    /// A page after the first failed while aggregating a listing.
    #[error("pagination aborted at page {page}: {source}")]
    PaginationAborted {
        page: u32,
        #[source]
        source: Box<CbError>,
    },

    /// A timestamp did not match `YYYY-MM-DDTHH:MM:SS.ffffff`.
    #[error("invalid timestamp '{0}': expected YYYY-MM-DDTHH:MM:SS.ffffff")]
    InvalidTimestamp(String),

    /// A payload lacked data needed to build an entity.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
}

impl CbError {
    /// Whether this error means the requested resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CbError::NotFound { .. })
    }

    /// Re-label a transport-level 404 with the entity that was requested.
    pub(crate) fn for_entity(self, entity_type: &'static str, id: impl ToString) -> Self {
        match self {
            CbError::NotFound { .. }
            | CbError::ServerError {
                status_code: Some(404),
                ..
            } => CbError::NotFound {
                entity_type,
                id: id.to_string(),
            },
            other => other,
        }
    }
}

/// Result type alias for codeBeamer operations.
pub type Result<T> = core::result::Result<T, CbError>;

/// Converts a `NotFound` failure into an explicit absence.
///
/// Finder operations use this so callers branch on `None` rather than on
/// an error for "does this exist" questions.
pub trait NotFoundExt<T> {
    /// `Ok(Some(v))` on success, `Ok(None)` on `NotFound`, `Err` otherwise.
    fn found(self) -> Result<Option<T>>;
}

impl<T> NotFoundExt<T> for Result<T> {
    fn found(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_converts_not_found_to_none() {
        let result: Result<u32> = Err(CbError::NotFound {
            entity_type: "project",
            id: "7".to_string(),
        });
        assert!(result.found().unwrap().is_none());
    }

    #[test]
    fn test_found_keeps_other_errors() {
        let result: Result<u32> = Err(CbError::NotEditable {
            field: "Status".to_string(),
        });
        assert!(matches!(result.found(), Err(CbError::NotEditable { .. })));
    }

    #[test]
    fn test_for_entity_relabels_404() {
        let err = CbError::ServerError {
            message: "Not Found".to_string(),
            status_code: Some(404),
        }
        .for_entity("tracker", 12);
        assert_eq!(err.to_string(), "tracker '12' not found");

        let err = CbError::ServerError {
            message: "boom".to_string(),
            status_code: Some(500),
        }
        .for_entity("tracker", 12);
        assert!(matches!(err, CbError::ServerError { .. }));
    }

    #[test]
    fn test_pagination_aborted_display() {
        let err = CbError::PaginationAborted {
            page: 3,
            source: Box::new(CbError::ServerError {
                message: "Internal error".to_string(),
                status_code: Some(500),
            }),
        };
        assert!(err.to_string().contains("page 3"));
        assert!(err.to_string().contains("Internal error"));
    }
}
