use std::{ops::RangeInclusive, path::Path};

use async_trait::async_trait;
use narrate_config::OpenAiConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use strum::{AsRefStr, Display, EnumString, VariantNames};

use crate::{
    audio::AudioFormat,
    error::{Result, TtsError},
    http_client::http_client,
    pipeline::Pipeline,
    types::{AudioResult, ProviderMetadata},
};

use super::{SpeechEngine, SynthesizerOptions, TtsSynthesizer, read_audio, require_api_key};

const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";
const PROVIDER: &str = "openai";
const MAX_INPUT_CHARS: usize = 4096;
const SPEED_RANGE: RangeInclusive<f64> = 0.25..=4.0;

/// Voices offered by the speech endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum OpenAiVoice {
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

/// Speech models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames)]
pub enum OpenAiModel {
    #[strum(serialize = "tts-1")]
    Tts1,
    #[strum(serialize = "tts-1-hd")]
    Tts1Hd,
}

/// `OpenAI` speech synthesizer
#[derive(Debug)]
pub struct OpenAiSynthesizer {
    client: Client,
    base_url: String,
    api_key: SecretString,
    voice: OpenAiVoice,
    model: OpenAiModel,
    format: AudioFormat,
    speed: f64,
    pipeline: Pipeline,
}

impl OpenAiSynthesizer {
    /// Validate `settings` and prepare the output directory
    ///
    /// Nothing touches the filesystem until every setting is accepted.
    pub fn new(api_key: SecretString, options: &SynthesizerOptions, settings: &OpenAiConfig) -> Result<Self> {
        require_api_key(PROVIDER, &api_key)?;

        let voice = settings.voice.parse::<OpenAiVoice>().map_err(|_| {
            TtsError::Configuration(format!(
                "invalid OpenAI voice '{}', expected one of: {}",
                settings.voice,
                OpenAiVoice::VARIANTS.join(", ")
            ))
        })?;

        let model = settings.model.parse::<OpenAiModel>().map_err(|_| {
            TtsError::Configuration(format!(
                "invalid OpenAI model '{}', expected one of: {}",
                settings.model,
                OpenAiModel::VARIANTS.join(", ")
            ))
        })?;

        let format = settings.response_format.parse::<AudioFormat>().map_err(|_| {
            TtsError::Configuration(format!(
                "unsupported OpenAI response format '{}', expected mp3 or wav",
                settings.response_format
            ))
        })?;

        if !SPEED_RANGE.contains(&settings.speed) {
            return Err(TtsError::Configuration(format!(
                "OpenAI speed must be between {} and {}, got {}",
                SPEED_RANGE.start(),
                SPEED_RANGE.end(),
                settings.speed
            )));
        }

        let client = http_client(options.timeout)?;
        let pipeline = Pipeline::new(options)?;
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_API_URL.to_string());

        tracing::debug!(%voice, %model, %format, speed = settings.speed, "OpenAI synthesizer ready");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            voice,
            model,
            format,
            speed: settings.speed,
            pipeline,
        })
    }
}

#[derive(serde::Serialize)]
struct OpenAiSpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    speed: f64,
}

#[async_trait]
impl SpeechEngine for OpenAiSynthesizer {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn max_input_chars(&self) -> usize {
        MAX_INPUT_CHARS
    }

    fn model(&self) -> &str {
        self.model.as_ref()
    }

    fn base_speed(&self) -> f64 {
        self.speed
    }

    fn speed_range(&self) -> Option<RangeInclusive<f64>> {
        Some(SPEED_RANGE)
    }

    fn metadata(&self, speed: f64) -> ProviderMetadata {
        ProviderMetadata::from([
            ("voice".to_string(), self.voice.as_ref().into()),
            ("model".to_string(), self.model.as_ref().into()),
            ("response_format".to_string(), self.format.as_ref().into()),
            ("speed".to_string(), speed.into()),
        ])
    }

    async fn speak(&self, text: &str, speed: f64) -> Result<Vec<u8>> {
        let url = format!("{}/audio/speech", self.base_url);

        let body = OpenAiSpeechRequest {
            model: self.model.as_ref(),
            input: text,
            voice: self.voice.as_ref(),
            response_format: self.format.as_ref(),
            speed,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
            .json(&body)
            .send()
            .await;

        let audio = read_audio(PROVIDER, response).await?;

        tracing::debug!("OpenAI TTS chunk complete, {} bytes", audio.len());

        Ok(audio)
    }
}

#[async_trait]
impl TtsSynthesizer for OpenAiSynthesizer {
    async fn execute(&self, script_path: &Path, target_duration: Option<f64>) -> Result<AudioResult> {
        self.pipeline.run(self, script_path, target_duration).await
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn output_dir(&self) -> &Path {
        self.pipeline.output_dir()
    }
}
