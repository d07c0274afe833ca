use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use serde::Serialize;

/// Provider-specific details attached to a result
pub type ProviderMetadata = BTreeMap<String, MetadataValue>;

/// Primitive metadata value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Flag(bool),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// Placement of one synthesized cue in the final audio
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioSegment {
    /// Cue sequence number from the script
    pub sequence: u32,
    /// Spoken text
    pub text: String,
    /// Offset of the clip in the output, in seconds
    pub start_seconds: f64,
    /// End of the clip in the output, in seconds
    pub end_seconds: f64,
    /// Measured clip length, in seconds
    pub duration_seconds: f64,
}

/// Outcome of a successful synthesis
///
/// The file at `audio_path` belongs to the caller once returned.
#[derive(Debug, Clone, Serialize)]
pub struct AudioResult {
    /// Written audio file, beneath the synthesizer's output directory
    pub audio_path: PathBuf,
    /// Measured length of the written file
    pub duration_seconds: f64,
    /// Voice, model and speed actually used
    pub provider_metadata: ProviderMetadata,
    /// One entry per script cue, in playback order
    pub segments: Vec<AudioSegment>,
    /// Size of the written file
    pub file_size_bytes: u64,
    /// Wall-clock time spent synthesizing
    #[serde(serialize_with = "serialize_seconds")]
    pub generation_time: Duration,
    /// Vendor model identifier
    pub model: String,
}

fn serialize_seconds<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}
