use std::{path::PathBuf, time::Duration};

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

/// Default provider when neither the file nor `TTS_PROVIDER` names one
pub const DEFAULT_PROVIDER: &str = "elevenlabs";

/// Top-level TTS configuration
///
/// `provider` stays a plain string here. Mapping it to a concrete
/// synthesizer (and rejecting unknown names) is the factory's job.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtsConfig {
    /// Provider name (`elevenlabs` or `openai`, case-sensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Directory receiving the synthesized audio files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Per-request HTTP timeout, e.g. `"120s"` or `"2m"`
    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    /// Upper bound on vendor requests in flight during one synthesis
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// `ElevenLabs` settings, only read when `provider = "elevenlabs"`
    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,
    /// `OpenAI` settings, only read when `provider = "openai"`
    #[serde(default)]
    pub openai: OpenAiConfig,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            output_dir: default_output_dir(),
            timeout: default_timeout(),
            max_concurrent_requests: default_max_concurrent_requests(),
            elevenlabs: ElevenLabsConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// `ElevenLabs` provider settings
///
/// Numeric settings are forwarded as-is; the vendor decides whether they
/// are in range.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElevenLabsConfig {
    /// API key sent as `xi-api-key`
    pub api_key: Option<SecretString>,
    /// Base URL override
    pub base_url: Option<String>,
    /// Voice to synthesize with
    pub voice_id: String,
    /// Synthesis model
    pub model_id: String,
    /// Voice consistency (0.0 to 1.0)
    pub stability: f64,
    /// Similarity to the original voice (0.0 to 1.0)
    pub similarity_boost: f64,
    /// Style exaggeration (0.0 to 1.0)
    pub style: f64,
    /// Speaker boost toggle
    pub use_speaker_boost: bool,
    /// Speaking rate (vendor accepts 0.7 to 1.2)
    pub speed: f64,
    /// Vendor output format, e.g. `mp3_44100_128` or `wav_44100`
    pub output_format: String,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            voice_id: "JBFqnCBsd6RMkjVDRZzb".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            stability: 0.75,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
            speed: 1.0,
            output_format: "mp3_44100_128".to_string(),
        }
    }
}

/// `OpenAI` (or compatible host) provider settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key sent as a bearer token
    pub api_key: Option<SecretString>,
    /// Endpoint override for compatible hosts
    pub base_url: Option<String>,
    /// One of alloy, echo, fable, onyx, nova, shimmer
    pub voice: String,
    /// `tts-1` or `tts-1-hd`
    pub model: String,
    /// Audio container requested from the vendor
    pub response_format: String,
    /// Speaking rate (0.25 to 4.0)
    pub speed: f64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            voice: "alloy".to_string(),
            model: "tts-1".to_string(),
            response_format: "mp3".to_string(),
            speed: 1.0,
        }
    }
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output/audio")
}

#[allow(clippy::missing_const_for_fn)]
fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_concurrent_requests() -> usize {
    4
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
}
