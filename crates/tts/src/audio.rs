pub mod mp3;
pub mod wav;

use strum::{AsRefStr, Display, EnumString};

use crate::error::{Result, TtsError};

pub use mp3::{Mp3Stream, silent_mp3};
pub use wav::WavAudio;

/// Longest track the pipeline will build, in seconds
pub const MAX_DURATION_SECONDS: f64 = 86_400.0;

/// Gaps shorter than this are not worth filling with silence
const MIN_GAP_SECONDS: f64 = 0.05;

/// Containers the pipeline can measure and assemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    /// File extension for the written artifact
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }
}

/// Measured audio in one of the supported containers
#[derive(Debug, Clone)]
pub enum Audio {
    Mp3(Mp3Stream),
    Wav(WavAudio),
}

impl Audio {
    /// Parse a vendor response body
    ///
    /// # Errors
    ///
    /// Returns [`TtsError::InvalidAudio`] if `bytes` is not `format`
    pub fn decode(format: AudioFormat, bytes: &[u8]) -> Result<Self> {
        match format {
            AudioFormat::Mp3 => Mp3Stream::parse(bytes).map(Self::Mp3),
            AudioFormat::Wav => WavAudio::parse(bytes).map(Self::Wav),
        }
    }

    pub const fn format(&self) -> AudioFormat {
        match self {
            Self::Mp3(_) => AudioFormat::Mp3,
            Self::Wav(_) => AudioFormat::Wav,
        }
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        match self {
            Self::Mp3(stream) => stream.duration(),
            Self::Wav(audio) => audio.duration(),
        }
    }

    /// Empty audio in the same container and shape as `self`
    pub fn empty_like(&self) -> Self {
        match self {
            Self::Mp3(stream) => Self::Mp3(Mp3Stream::empty(*stream.template())),
            Self::Wav(audio) => Self::Wav(WavAudio::empty_like(audio)),
        }
    }

    /// Append `other` to the end
    ///
    /// # Errors
    ///
    /// Returns [`TtsError::InvalidAudio`] if the containers or sample
    /// formats differ
    pub fn append(&mut self, other: Self) -> Result<()> {
        match (self, other) {
            (Self::Mp3(ours), Self::Mp3(theirs)) => {
                ours.append(theirs);
                Ok(())
            }
            (Self::Wav(ours), Self::Wav(theirs)) => ours.append(theirs),
            (ours, theirs) => Err(TtsError::InvalidAudio(format!(
                "cannot join {} audio onto {} audio",
                theirs.format(),
                ours.format()
            ))),
        }
    }

    /// Append silence covering roughly `seconds`, at most
    /// [`MAX_DURATION_SECONDS`] per call
    pub fn append_silence(&mut self, seconds: f64) {
        match self {
            Self::Mp3(stream) => stream.append_silence(seconds),
            Self::Wav(audio) => audio.append_silence(seconds),
        }
    }

    /// Encode into the bytes of a complete file
    ///
    /// # Errors
    ///
    /// Returns [`TtsError::InvalidAudio`] if WAV encoding fails
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Self::Mp3(stream) => Ok(stream.into_bytes()),
            Self::Wav(audio) => audio.into_bytes(),
        }
    }
}

/// Audio for one cue together with its scheduled start
#[derive(Debug)]
pub struct Placement {
    /// Requested start in seconds; `None` plays right after the previous clip
    pub start: Option<f64>,
    pub audio: Audio,
}

/// Where a clip actually landed in the assembled track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

/// Lay clips out on one track
///
/// Each clip starts at its requested time, with silence filling any gap
/// longer than 50 ms. A clip that overruns its slot pushes the following
/// ones back; untimed clips follow each other directly.
///
/// # Errors
///
/// Returns [`TtsError::InvalidAudio`] if there are no clips or they do not
/// share one container and format
pub fn assemble(placements: Vec<Placement>) -> Result<(Audio, Vec<Span>)> {
    let Some(first) = placements.first() else {
        return Err(TtsError::InvalidAudio("no audio clips to assemble".to_string()));
    };

    let mut track = first.audio.empty_like();
    let mut spans = Vec::with_capacity(placements.len());

    for placement in placements {
        if let Some(start) = placement.start {
            let gap = start - track.duration();
            if gap > MIN_GAP_SECONDS {
                track.append_silence(gap);
            }
        }

        let start = track.duration();
        track.append(placement.audio)?;
        spans.push(Span {
            start,
            end: track.duration(),
        });
    }

    Ok((track, spans))
}
