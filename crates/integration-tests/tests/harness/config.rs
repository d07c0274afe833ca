//! Programmatic configuration builder for integration tests

use std::path::Path;
use std::time::Duration;

use narrate_config::{ElevenLabsConfig, OpenAiConfig, TtsConfig};
use secrecy::SecretString;

use super::mock_tts::TEST_API_KEY;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: TtsConfig,
}

impl ConfigBuilder {
    /// Create a builder writing audio beneath `output_dir`
    pub fn new(output_dir: &Path) -> Self {
        Self {
            config: TtsConfig {
                output_dir: output_dir.to_path_buf(),
                timeout: Duration::from_secs(10),
                ..TtsConfig::default()
            },
        }
    }

    /// Select `OpenAI` pointed at a mock vendor
    pub fn with_openai(mut self, base_url: &str) -> Self {
        self.config.provider = "openai".to_owned();
        self.config.openai = OpenAiConfig {
            api_key: Some(SecretString::from(TEST_API_KEY)),
            base_url: Some(base_url.to_owned()),
            ..OpenAiConfig::default()
        };
        self
    }

    /// Select `ElevenLabs` pointed at a mock vendor
    pub fn with_elevenlabs(mut self, base_url: &str) -> Self {
        self.config.provider = "elevenlabs".to_owned();
        self.config.elevenlabs = ElevenLabsConfig {
            api_key: Some(SecretString::from(TEST_API_KEY)),
            base_url: Some(base_url.to_owned()),
            ..ElevenLabsConfig::default()
        };
        self
    }

    /// Replace the provider name verbatim
    pub fn with_provider(mut self, provider: &str) -> Self {
        self.config.provider = provider.to_owned();
        self
    }

    /// Adjust the `OpenAI` settings block
    pub fn openai(mut self, f: impl FnOnce(&mut OpenAiConfig)) -> Self {
        f(&mut self.config.openai);
        self
    }

    /// Adjust the `ElevenLabs` settings block
    pub fn elevenlabs(mut self, f: impl FnOnce(&mut ElevenLabsConfig)) -> Self {
        f(&mut self.config.elevenlabs);
        self
    }

    pub fn build(self) -> TtsConfig {
        self.config
    }
}
