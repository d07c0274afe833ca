#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod audio;
mod error;
mod factory;
mod http_client;
mod pipeline;
mod provider;
pub mod script;
mod types;

pub use error::{Result, TtsError};
pub use factory::{TtsProviderKind, TtsSynthesizerBuilder, create_synthesizer};
pub use provider::{
    SynthesizerOptions, TtsSynthesizer,
    elevenlabs::ElevenLabsSynthesizer,
    openai::{OpenAiModel, OpenAiSynthesizer, OpenAiVoice},
};
pub use types::{AudioResult, AudioSegment, MetadataValue, ProviderMetadata};
