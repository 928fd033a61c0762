use thiserror::Error;

use crate::value::ValueKind;

/// Errors raised by the object model when a mutation cannot be carried out.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The type has no property with this name.
    #[error("unknown property `{property}` on {type_name}")]
    UnknownProperty {
        type_name: &'static str,
        property: String,
    },

    /// The value does not fit the property's declared kind.
    #[error("property `{property}` expects {expected:?}, got {actual:?}")]
    TypeMismatch {
        property: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// A list index was outside the valid range.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Result type for object model operations.
pub type ModelResult<T = ()> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            ModelError::UnknownProperty {
                type_name: "Shape",
                property: "Color".into()
            }
            .to_string(),
            "unknown property `Color` on Shape"
        );
        assert_eq!(
            ModelError::IndexOutOfRange { index: 4, len: 2 }.to_string(),
            "index 4 out of range for length 2"
        );
        assert_eq!(
            ModelError::TypeMismatch {
                property: "Width".into(),
                expected: ValueKind::Float,
                actual: ValueKind::Str,
            }
            .to_string(),
            "property `Width` expects Float, got Str"
        );
    }
}
