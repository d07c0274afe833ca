use narrate_config::TtsConfig;
use secrecy::SecretString;
use strum::{AsRefStr, Display, EnumString, VariantNames};

use crate::{
    error::{Result, TtsError},
    provider::{SynthesizerOptions, TtsSynthesizer, elevenlabs::ElevenLabsSynthesizer, openai::OpenAiSynthesizer},
};

/// Recognized provider names
///
/// Parsing is case-sensitive: `OpenAI` is not a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum TtsProviderKind {
    ElevenLabs,
    OpenAi,
}

/// Builds the one synthesizer a run uses from configuration
pub struct TtsSynthesizerBuilder<'a> {
    config: &'a TtsConfig,
}

impl<'a> TtsSynthesizerBuilder<'a> {
    pub const fn new(config: &'a TtsConfig) -> Self {
        Self { config }
    }

    /// Resolve the provider name and construct its synthesizer
    ///
    /// Fails before touching the filesystem when the provider is unknown or
    /// its API key is missing.
    pub fn build(self) -> Result<Box<dyn TtsSynthesizer>> {
        let config = self.config;

        let kind = config.provider.parse::<TtsProviderKind>().map_err(|_| {
            TtsError::Configuration(format!(
                "unknown TTS provider '{}', expected one of: {}",
                config.provider,
                TtsProviderKind::VARIANTS.join(", ")
            ))
        })?;

        tracing::debug!("Initializing TTS provider: {kind}");

        let options = SynthesizerOptions::new(&config.output_dir)
            .with_timeout(config.timeout)
            .with_max_concurrent_requests(config.max_concurrent_requests);

        let synthesizer: Box<dyn TtsSynthesizer> = match kind {
            TtsProviderKind::ElevenLabs => {
                let api_key = resolve_api_key(kind, config.elevenlabs.api_key.as_ref())?;
                Box::new(ElevenLabsSynthesizer::new(api_key, &options, &config.elevenlabs)?)
            }
            TtsProviderKind::OpenAi => {
                let api_key = resolve_api_key(kind, config.openai.api_key.as_ref())?;
                Box::new(OpenAiSynthesizer::new(api_key, &options, &config.openai)?)
            }
        };

        tracing::info!(
            provider = synthesizer.name(),
            output_dir = %synthesizer.output_dir().display(),
            "TTS synthesizer initialized"
        );

        Ok(synthesizer)
    }
}

/// Construct the synthesizer named by `config.provider`
pub fn create_synthesizer(config: &TtsConfig) -> Result<Box<dyn TtsSynthesizer>> {
    TtsSynthesizerBuilder::new(config).build()
}

fn resolve_api_key(kind: TtsProviderKind, api_key: Option<&SecretString>) -> Result<SecretString> {
    api_key
        .cloned()
        .ok_or_else(|| TtsError::Configuration(format!("API key required for TTS provider '{kind}'")))
}
