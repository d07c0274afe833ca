use std::path::PathBuf;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, TtsError>;

/// Errors surfaced by synthesizers and the provider factory
///
/// Every variant reaches the caller unmodified. Nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    /// Missing or invalid settings, unknown provider, out-of-range option
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Input script does not exist
    #[error("script not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Vendor rejected the request or could not be reached
    ///
    /// `status` is `None` when no HTTP response was received.
    #[error("{provider} API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    ProviderApi {
        /// Provider that failed
        provider: &'static str,
        /// HTTP status returned by the vendor
        status: Option<u16>,
        /// Vendor error body or transport error
        message: String,
    },

    /// Output directory or audio file could not be written
    #[error("failed to write {}: {source}", .path.display())]
    Storage {
        /// Path that could not be created or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Script exists but holds nothing to speak
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// Vendor audio could not be parsed in the expected container
    #[error("invalid audio: {0}")]
    InvalidAudio(String),
}

impl TtsError {
    /// Vendor refused the credential
    pub const fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::ProviderApi {
                status: Some(401 | 403),
                ..
            }
        )
    }

    /// Vendor rate-limited the request
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::ProviderApi { status: Some(429), .. })
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}
