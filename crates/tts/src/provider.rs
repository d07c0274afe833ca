pub mod elevenlabs;
pub mod openai;

use std::{
    ops::RangeInclusive,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::{
    audio::AudioFormat,
    error::{Result, TtsError},
    types::{AudioResult, ProviderMetadata},
};

/// Uniform synthesis contract shared by every provider
///
/// Calling code holds a `Box<dyn TtsSynthesizer>` and never needs to know
/// which vendor sits behind it.
#[async_trait]
pub trait TtsSynthesizer: Send + Sync {
    /// Synthesize the script at `script_path` into one audio file
    ///
    /// `target_duration` (seconds) is a hint: the provider tries to match it
    /// and succeeds with the natural length when it cannot.
    async fn execute(&self, script_path: &Path, target_duration: Option<f64>) -> Result<AudioResult>;

    /// Provider identifier, e.g. `openai`
    fn name(&self) -> &'static str;

    /// Directory receiving the audio files
    fn output_dir(&self) -> &Path;
}

/// Construction parameters common to all providers
#[derive(Debug, Clone)]
pub struct SynthesizerOptions {
    /// Created on construction if missing
    pub output_dir: PathBuf,
    /// Per-request HTTP timeout
    pub timeout: Duration,
    /// Upper bound on vendor requests in flight
    pub max_concurrent_requests: usize,
}

impl SynthesizerOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            timeout: Duration::from_secs(120),
            max_concurrent_requests: 4,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }
}

/// A single vendor call: text in, encoded audio out
///
/// The shared pipeline drives this for every chunk of a script.
#[async_trait]
pub(crate) trait SpeechEngine: Send + Sync {
    /// Provider identifier used in errors and logs
    fn provider(&self) -> &'static str;

    /// Container of the bytes returned by [`SpeechEngine::speak`]
    fn format(&self) -> AudioFormat;

    /// Longest text accepted in one request
    fn max_input_chars(&self) -> usize;

    /// Model identifier reported in results
    fn model(&self) -> &str;

    /// Configured speaking rate
    fn base_speed(&self) -> f64;

    /// Rates the vendor accepts, if speed can be adjusted at all
    fn speed_range(&self) -> Option<RangeInclusive<f64>>;

    /// Settings actually used, for the result metadata
    fn metadata(&self, speed: f64) -> ProviderMetadata;

    async fn speak(&self, text: &str, speed: f64) -> Result<Vec<u8>>;
}

/// Reject an empty or whitespace-only credential
pub(crate) fn require_api_key(provider: &str, api_key: &SecretString) -> Result<()> {
    if api_key.expose_secret().trim().is_empty() {
        return Err(TtsError::Configuration(format!("API key required for TTS provider '{provider}'")));
    }

    Ok(())
}

/// Turn a vendor response into audio bytes or a provider error
pub(crate) async fn read_audio(
    provider: &'static str,
    response: reqwest::Result<reqwest::Response>,
) -> Result<Vec<u8>> {
    let response = response.map_err(|e| {
        tracing::error!("{provider} request failed: {e}");
        TtsError::ProviderApi {
            provider,
            status: None,
            message: format!("failed to send request: {e}"),
        }
    })?;

    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

        tracing::error!("{provider} API error ({status}): {error_text}");

        return Err(TtsError::ProviderApi {
            provider,
            status: Some(status.as_u16()),
            message: error_text,
        });
    }

    let audio = response.bytes().await.map_err(|e| {
        tracing::error!("failed to read {provider} response body: {e}");
        TtsError::ProviderApi {
            provider,
            status: Some(status.as_u16()),
            message: format!("failed to read response body: {e}"),
        }
    })?;

    Ok(audio.to_vec())
}
