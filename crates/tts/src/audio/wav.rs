use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::MAX_DURATION_SECONDS;
use crate::error::{Result, TtsError};

#[derive(Debug, Clone)]
enum Samples {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl Samples {
    fn len(&self) -> usize {
        match self {
            Self::Int(s) => s.len(),
            Self::Float(s) => s.len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded PCM audio
#[derive(Debug, Clone)]
pub struct WavAudio {
    spec: WavSpec,
    samples: Samples,
}

impl WavAudio {
    /// Decode a RIFF/WAVE body
    ///
    /// Streaming vendors sometimes write a placeholder data length; decoding
    /// stops at the first short read instead of failing.
    ///
    /// # Errors
    ///
    /// Returns [`TtsError::InvalidAudio`] for a malformed header or a body
    /// without a single sample
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| TtsError::InvalidAudio(format!("not a WAV file: {e}")))?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            SampleFormat::Int => Samples::Int(read_until_short(reader.into_samples::<i32>())),
            SampleFormat::Float => Samples::Float(read_until_short(reader.into_samples::<f32>())),
        };

        if samples.is_empty() {
            return Err(TtsError::InvalidAudio("WAV file has no samples".to_string()));
        }

        Ok(Self { spec, samples })
    }

    /// An empty track sharing `template`'s format
    pub fn empty_like(template: &Self) -> Self {
        let samples = match template.samples {
            Samples::Int(_) => Samples::Int(Vec::new()),
            Samples::Float(_) => Samples::Float(Vec::new()),
        };

        Self {
            spec: template.spec,
            samples,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> f64 {
        let frames = self.samples.len() / usize::from(self.spec.channels.max(1));
        frames as f64 / f64::from(self.spec.sample_rate)
    }

    /// Append `other`, which must share this track's sample spec
    ///
    /// # Errors
    ///
    /// Returns [`TtsError::InvalidAudio`] if the specs differ
    pub fn append(&mut self, other: Self) -> Result<()> {
        if other.spec != self.spec {
            return Err(TtsError::InvalidAudio(format!(
                "cannot join WAV clips with different formats ({:?} vs {:?})",
                self.spec, other.spec
            )));
        }

        match (&mut self.samples, other.samples) {
            (Samples::Int(ours), Samples::Int(theirs)) => ours.extend(theirs),
            (Samples::Float(ours), Samples::Float(theirs)) => ours.extend(theirs),
            _ => unreachable!("equal specs imply equal sample formats"),
        }

        Ok(())
    }

    /// Append zero samples covering `seconds`
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn append_silence(&mut self, seconds: f64) {
        if seconds <= 0.0 {
            return;
        }

        let seconds = seconds.min(MAX_DURATION_SECONDS);
        let frames = (seconds * f64::from(self.spec.sample_rate)).round() as usize;
        let count = frames * usize::from(self.spec.channels);

        match &mut self.samples {
            Samples::Int(s) => s.resize(s.len() + count, 0),
            Samples::Float(s) => s.resize(s.len() + count, 0.0),
        }
    }

    /// Encode as a WAV file
    ///
    /// # Errors
    ///
    /// Returns [`TtsError::InvalidAudio`] if the encoder rejects the spec
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        let encode_error = |e: hound::Error| TtsError::InvalidAudio(format!("failed to encode WAV: {e}"));
        let mut cursor = Cursor::new(Vec::new());

        {
            let mut writer = WavWriter::new(&mut cursor, self.spec).map_err(encode_error)?;

            match self.samples {
                Samples::Int(samples) => {
                    for sample in samples {
                        writer.write_sample(sample).map_err(encode_error)?;
                    }
                }
                Samples::Float(samples) => {
                    for sample in samples {
                        writer.write_sample(sample).map_err(encode_error)?;
                    }
                }
            }

            writer.finalize().map_err(encode_error)?;
        }

        Ok(cursor.into_inner())
    }
}

fn read_until_short<T>(samples: impl Iterator<Item = hound::Result<T>>) -> Vec<T> {
    let mut out = Vec::new();

    for sample in samples {
        match sample {
            Ok(sample) => out.push(sample),
            Err(e) => {
                tracing::debug!("stopping WAV decode after {} samples: {e}", out.len());
                break;
            }
        }
    }

    out
}
