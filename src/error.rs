//! Unified error handling for the sightline library.
//!
//! Geometry problems are recoverable: aggregation skips the offending region or
//! trail and keeps going. Configuration problems are rejected before any metric
//! is touched.

use thiserror::Error;

/// Unified error type for sightline operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SightlineError {
    /// Malformed polygon or polyline (too few vertices, unclosed ring, non-finite coordinates)
    #[error("Invalid geometry: {message}")]
    InvalidGeometry { message: String },

    /// Non-positive buffer distance, non-ascending breakpoints, unparseable config
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Input feature carries a geometry type the adapter does not decode
    #[error("Unsupported geometry type '{kind}' at feature {index}")]
    UnsupportedGeometry { kind: String, index: usize },

    /// GeoJSON text could not be parsed
    #[error("Failed to parse GeoJSON: {0}")]
    GeoJson(String),

    /// Report or config could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SightlineError {
    pub(crate) fn invalid_geometry(message: impl Into<String>) -> Self {
        SightlineError::InvalidGeometry {
            message: message.into(),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        SightlineError::Configuration {
            message: message.into(),
        }
    }
}

/// Result type alias for sightline operations.
pub type Result<T> = std::result::Result<T, SightlineError>;

/// Extension trait for converting Option to SightlineError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an invalid geometry error.
    fn ok_or_invalid_geometry(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid_geometry(self, message: &str) -> Result<T> {
        self.ok_or_else(|| SightlineError::invalid_geometry(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SightlineError::invalid_geometry("ring 0 has 3 coordinates, minimum 4 required");
        assert!(err.to_string().starts_with("Invalid geometry"));
        assert!(err.to_string().contains("ring 0"));

        let err = SightlineError::UnsupportedGeometry {
            kind: "MultiPoint".to_string(),
            index: 7,
        };
        assert!(err.to_string().contains("MultiPoint"));
        assert!(err.to_string().contains("feature 7"));
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        assert!(matches!(
            none.ok_or_invalid_geometry("empty polyline"),
            Err(SightlineError::InvalidGeometry { .. })
        ));
        assert_eq!(Some(3).ok_or_invalid_geometry("unused"), Ok(3));
    }
}
