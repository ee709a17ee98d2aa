//! Error types for the viewport engine

use thiserror::Error;

use crate::types::ViewportId;

/// Errors raised by viewport operations.
///
/// None of these are fatal: callers log them and carry on with the
/// viewport left in its last committed state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewportError {
    #[error("Invalid zoom factor: {factor} (must be positive and finite)")]
    InvalidZoomFactor { factor: f64 },

    #[error("Invalid coordinate: {message}")]
    InvalidCoordinate { message: String },

    #[error("Viewport {viewport} has no measured drawing surface")]
    SurfaceNotMeasured { viewport: ViewportId },

    #[error("Unknown viewport: {viewport}")]
    UnknownViewport { viewport: ViewportId },

    #[error("Viewport {viewport} has no mark set")]
    MarkNotSet { viewport: ViewportId },

    #[error("Viewport {viewport} is not locked")]
    NotLocked { viewport: ViewportId },

    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfig { field: String, message: String },
}

impl ViewportError {
    pub fn invalid_zoom_factor(factor: f64) -> Self {
        Self::InvalidZoomFactor { factor }
    }

    pub fn invalid_coordinate<S: Into<String>>(message: S) -> Self {
        Self::InvalidCoordinate { message: message.into() }
    }

    pub fn surface_not_measured(viewport: ViewportId) -> Self {
        Self::SurfaceNotMeasured { viewport }
    }

    pub fn unknown_viewport(viewport: ViewportId) -> Self {
        Self::UnknownViewport { viewport }
    }

    pub fn mark_not_set(viewport: ViewportId) -> Self {
        Self::MarkNotSet { viewport }
    }

    pub fn not_locked(viewport: ViewportId) -> Self {
        Self::NotLocked { viewport }
    }

    pub fn invalid_config<S: Into<String>>(field: S, message: S) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type for viewport operations
pub type ViewportResult<T> = Result<T, ViewportError>;

/// Reject NaN and infinite coordinates before they reach any arithmetic.
pub(crate) fn ensure_finite(what: &str, value: f64) -> ViewportResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ViewportError::invalid_coordinate(format!(
            "{} is not finite: {}",
            what, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ViewportError::invalid_zoom_factor(-2.0);
        assert!(matches!(err, ViewportError::InvalidZoomFactor { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid zoom factor: -2 (must be positive and finite)"
        );
    }

    #[test]
    fn test_viewport_id_in_message() {
        let err = ViewportError::surface_not_measured(ViewportId(7));
        assert!(err.to_string().contains("#7"));
    }

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite("start", 12.5), Ok(12.5));
        assert!(ensure_finite("start", f64::NAN).is_err());
        assert!(ensure_finite("end", f64::INFINITY).is_err());
    }
}
