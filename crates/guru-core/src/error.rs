/// Errors that can occur across the guru platform.
///
/// Each variant wraps a specific failure domain. Library crates use this type
/// directly; the binary crate converts to `miette` diagnostics at the boundary.
///
/// The collaborator-facing variants map onto the query pipeline: [`Embedding`]
/// means the embedding provider could not produce a vector, [`Retrieval`]
/// means the vector index could not be reached or errored, and
/// [`DimensionMismatch`] means the query or record vector does not match the
/// dimensionality the index was created with — a configuration problem
/// (wrong embedding model), not a connectivity one.
///
/// [`Embedding`]: GuruError::Embedding
/// [`Retrieval`]: GuruError::Retrieval
/// [`DimensionMismatch`]: GuruError::DimensionMismatch
///
/// # Examples
///
/// ```
/// use guru_core::GuruError;
///
/// let err = GuruError::Config("missing API key".into());
/// assert!(err.to_string().contains("missing API key"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum GuruError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed caller input (non-positive top-n, blank query). Fails fast.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The PR source (GitHub API) could not be reached or errored.
    #[error("PR source error: {0}")]
    Source(String),

    /// The embedding provider could not produce a vector.
    #[error("embedding unavailable: {0}")]
    Embedding(String),

    /// The vector index could not be reached or errored.
    #[error("retrieval unavailable: {0}")]
    Retrieval(String),

    /// Query or record vector does not match the index dimensionality.
    #[error("dimension mismatch: index expects {expected}-dim vectors, got {actual}")]
    DimensionMismatch {
        /// Dimensionality the index was created with.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: GuruError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn invalid_argument_displays_message() {
        let err = GuruError::InvalidArgument("top_n must be positive".into());
        assert_eq!(err.to_string(), "invalid argument: top_n must be positive");
    }

    #[test]
    fn dimension_mismatch_names_both_sizes() {
        let err = GuruError::DimensionMismatch {
            expected: 384,
            actual: 1536,
        };
        let msg = err.to_string();
        assert!(msg.contains("384"));
        assert!(msg.contains("1536"));
    }

    #[test]
    fn embedding_and_retrieval_are_distinct() {
        let embed = GuruError::Embedding("provider 500".into());
        let retrieve = GuruError::Retrieval("index offline".into());
        assert!(embed.to_string().starts_with("embedding unavailable"));
        assert!(retrieve.to_string().starts_with("retrieval unavailable"));
    }
}
