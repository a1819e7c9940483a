//! Error types for configuration parsing.

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing a labeling configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Markup syntax error.
    #[error("Markup parse error at byte {position}: {message}")]
    Parse { message: String, position: u64 },

    /// The document contained no root element.
    #[error("Configuration has no root element")]
    EmptyDocument,

    /// The outermost element is not the designated root container.
    #[error("Configuration root must be <{expected}>, found <{found}>")]
    InvalidRoot { expected: String, found: String },

    /// A required attribute is missing and has no default.
    #[error("Attribute '{attribute}' is required on <{tag}>")]
    MissingAttribute { attribute: String, tag: String },

    /// An attribute value failed coercion or membership validation.
    #[error("Invalid value '{value}' for attribute '{attribute}' on <{tag}>: {message}")]
    InvalidValue {
        attribute: String,
        tag: String,
        value: String,
        message: String,
    },
}

impl Error {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>, position: u64) -> Self {
        Self::Parse {
            message: message.into(),
            position,
        }
    }

    /// Create a missing-attribute error.
    pub fn missing_attribute(attribute: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute: attribute.into(),
            tag: tag.into(),
        }
    }

    /// Create a value error.
    pub fn invalid_value(
        attribute: impl Into<String>,
        tag: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            attribute: attribute.into(),
            tag: tag.into(),
            value: value.into(),
            message: message.into(),
        }
    }
}
