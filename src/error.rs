//! Error types for adx-translate.

use thiserror::Error;

/// The main error type for canonicalization, retrieval and translation.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The query could not be tokenized (e.g. an unterminated string literal).
    #[error("Malformed query at byte {position}: {message}")]
    MalformedQuery { position: usize, message: String },

    /// The generator never produced an extractable target-query block.
    #[error("Translation failed after {attempts} attempt(s): no wrapped query in the response")]
    TranslationFailed { attempts: usize },

    /// The completion service returned an error.
    #[error("Generator error: {0}")]
    Generator(String),

    /// Function, table or keyword lists could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// The example corpus could not be loaded.
    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranslateError {
    /// Create a malformed-query error at the given byte offset.
    pub fn malformed(position: usize, message: impl Into<String>) -> Self {
        Self::MalformedQuery {
            position,
            message: message.into(),
        }
    }

    /// Create a translation failure after `attempts` completions.
    pub fn failed(attempts: usize) -> Self {
        Self::TranslationFailed { attempts }
    }
}

/// Result type alias for adx-translate operations.
pub type TranslateResult<T> = Result<T, TranslateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TranslateError::malformed(11, "unterminated string literal");
        assert_eq!(
            err.to_string(),
            "Malformed query at byte 11: unterminated string literal"
        );
    }

    #[test]
    fn test_translation_failed_display() {
        let err = TranslateError::failed(3);
        assert!(err.to_string().contains("after 3 attempt(s)"));
    }
}
