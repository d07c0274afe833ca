use std::{fmt::Display, path::PathBuf, str::FromStr};

use secrecy::SecretString;

use crate::Config;

/// Every environment variable consulted by [`Config::apply_env_overrides`]
#[cfg(test)]
pub(crate) const OVERRIDE_KEYS: &[&str] = &[
    "TTS_PROVIDER",
    "TTS_OUTPUT_DIR",
    "ELEVENLABS_API_KEY",
    "ELEVENLABS_VOICE_ID",
    "ELEVENLABS_MODEL_ID",
    "ELEVENLABS_STABILITY",
    "ELEVENLABS_SIMILARITY_BOOST",
    "ELEVENLABS_STYLE",
    "ELEVENLABS_USE_SPEAKER_BOOST",
    "OPENAI_API_KEY",
    "OPENAI_ENDPOINT",
    "OPENAI_VOICE",
    "OPENAI_MODEL",
    "OPENAI_RESPONSE_FORMAT",
    "OPENAI_SPEED",
];

impl Config {
    /// Overlay settings from process environment variables
    ///
    /// Unset or empty variables leave the current value alone.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable when a numeric or boolean value
    /// does not parse
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub(crate) fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let tts = &mut self.tts;

        if let Some(provider) = var("TTS_PROVIDER") {
            tts.provider = provider;
        }
        if let Some(dir) = var("TTS_OUTPUT_DIR") {
            tts.output_dir = PathBuf::from(dir);
        }

        let elevenlabs = &mut tts.elevenlabs;
        if let Some(key) = var("ELEVENLABS_API_KEY") {
            elevenlabs.api_key = Some(SecretString::from(key));
        }
        if let Some(voice_id) = var("ELEVENLABS_VOICE_ID") {
            elevenlabs.voice_id = voice_id;
        }
        if let Some(model_id) = var("ELEVENLABS_MODEL_ID") {
            elevenlabs.model_id = model_id;
        }
        if let Some(value) = var("ELEVENLABS_STABILITY") {
            elevenlabs.stability = parse("ELEVENLABS_STABILITY", &value)?;
        }
        if let Some(value) = var("ELEVENLABS_SIMILARITY_BOOST") {
            elevenlabs.similarity_boost = parse("ELEVENLABS_SIMILARITY_BOOST", &value)?;
        }
        if let Some(value) = var("ELEVENLABS_STYLE") {
            elevenlabs.style = parse("ELEVENLABS_STYLE", &value)?;
        }
        if let Some(value) = var("ELEVENLABS_USE_SPEAKER_BOOST") {
            elevenlabs.use_speaker_boost = parse_bool("ELEVENLABS_USE_SPEAKER_BOOST", &value)?;
        }

        let openai = &mut tts.openai;
        if let Some(key) = var("OPENAI_API_KEY") {
            openai.api_key = Some(SecretString::from(key));
        }
        if let Some(endpoint) = var("OPENAI_ENDPOINT") {
            openai.base_url = Some(endpoint);
        }
        if let Some(voice) = var("OPENAI_VOICE") {
            openai.voice = voice;
        }
        if let Some(model) = var("OPENAI_MODEL") {
            openai.model = model;
        }
        if let Some(format) = var("OPENAI_RESPONSE_FORMAT") {
            openai.response_format = format;
        }
        if let Some(value) = var("OPENAI_SPEED") {
            openai.speed = parse("OPENAI_SPEED", &value)?;
        }

        Ok(())
    }
}

fn parse<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid value for {key} ('{value}'): {e}"))
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("invalid value for {key} ('{value}'): expected a boolean"),
    }
}
