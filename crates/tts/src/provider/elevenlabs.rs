use std::{ops::RangeInclusive, path::Path};

use async_trait::async_trait;
use narrate_config::ElevenLabsConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use crate::{
    audio::AudioFormat,
    error::{Result, TtsError},
    http_client::http_client,
    pipeline::Pipeline,
    types::{AudioResult, ProviderMetadata},
};

use super::{SpeechEngine, SynthesizerOptions, TtsSynthesizer, read_audio, require_api_key};

const DEFAULT_ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io/v1";
const PROVIDER: &str = "elevenlabs";
const MAX_INPUT_CHARS: usize = 5000;
const SPEED_RANGE: RangeInclusive<f64> = 0.7..=1.2;

/// `ElevenLabs` speech synthesizer
///
/// Voice settings are passed through as configured; the vendor is the one
/// judging their ranges.
#[derive(Debug)]
pub struct ElevenLabsSynthesizer {
    client: Client,
    base_url: String,
    api_key: SecretString,
    settings: ElevenLabsConfig,
    format: AudioFormat,
    pipeline: Pipeline,
}

impl ElevenLabsSynthesizer {
    pub fn new(api_key: SecretString, options: &SynthesizerOptions, settings: &ElevenLabsConfig) -> Result<Self> {
        require_api_key(PROVIDER, &api_key)?;

        let format = output_format(&settings.output_format)?;

        if settings.voice_id.trim().is_empty() {
            return Err(TtsError::Configuration("ElevenLabs voice_id must not be empty".to_string()));
        }

        let client = http_client(options.timeout)?;
        let pipeline = Pipeline::new(options)?;
        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_ELEVENLABS_API_URL.to_string());

        tracing::debug!(
            voice_id = %settings.voice_id,
            model_id = %settings.model_id,
            output_format = %settings.output_format,
            "ElevenLabs synthesizer ready"
        );

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            settings: settings.clone(),
            format,
            pipeline,
        })
    }
}

/// Map a vendor output format such as `mp3_44100_128` to its container
fn output_format(name: &str) -> Result<AudioFormat> {
    match name.split_once('_') {
        Some(("mp3", _)) => Ok(AudioFormat::Mp3),
        Some(("wav", _)) => Ok(AudioFormat::Wav),
        _ => Err(TtsError::Configuration(format!(
            "unsupported ElevenLabs output format '{name}', expected an mp3_* or wav_* format"
        ))),
    }
}

#[derive(serde::Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(serde::Serialize)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
    style: f64,
    use_speaker_boost: bool,
    speed: f64,
}

#[async_trait]
impl SpeechEngine for ElevenLabsSynthesizer {
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
        &self.settings.model_id
    }

    fn base_speed(&self) -> f64 {
        self.settings.speed
    }

    fn speed_range(&self) -> Option<RangeInclusive<f64>> {
        Some(SPEED_RANGE)
    }

    fn metadata(&self, speed: f64) -> ProviderMetadata {
        let s = &self.settings;

        ProviderMetadata::from([
            ("voice_id".to_string(), s.voice_id.clone().into()),
            ("model_id".to_string(), s.model_id.clone().into()),
            ("output_format".to_string(), s.output_format.clone().into()),
            ("stability".to_string(), s.stability.into()),
            ("similarity_boost".to_string(), s.similarity_boost.into()),
            ("style".to_string(), s.style.into()),
            ("use_speaker_boost".to_string(), s.use_speaker_boost.into()),
            ("speed".to_string(), speed.into()),
        ])
    }

    async fn speak(&self, text: &str, speed: f64) -> Result<Vec<u8>> {
        let url = format!("{}/text-to-speech/{}", self.base_url, self.settings.voice_id);

        let body = ElevenLabsRequest {
            text,
            model_id: &self.settings.model_id,
            voice_settings: VoiceSettings {
                stability: self.settings.stability,
                similarity_boost: self.settings.similarity_boost,
                style: self.settings.style,
                use_speaker_boost: self.settings.use_speaker_boost,
                speed,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("output_format", self.settings.output_format.as_str())])
            .header("xi-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await;

        let audio = read_audio(PROVIDER, response).await?;

        tracing::debug!("ElevenLabs TTS chunk complete, {} bytes", audio.len());

        Ok(audio)
    }
}

#[async_trait]
impl TtsSynthesizer for ElevenLabsSynthesizer {
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
