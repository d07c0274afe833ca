#![allow(clippy::must_use_candidate)]

mod env;
mod loader;
mod overrides;
pub mod telemetry;
pub mod tts;

use serde::Deserialize;

pub use telemetry::{LogFormat, TelemetryConfig};
pub use tts::*;

/// Top-level narrate configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// TTS provider selection and provider settings
    #[serde(default)]
    pub tts: TtsConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
