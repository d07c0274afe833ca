//! MPEG Layer III frame handling
//!
//! Enough of the container to measure a stream, strip its metadata and
//! splice streams together with silence in between. No decoding.

use super::MAX_DURATION_SECONDS;
use crate::error::{Result, TtsError};

/// Header of a mono MPEG-1 Layer III frame at 128 kbps / 44.1 kHz
const REFERENCE_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC0];

const V1_BITRATES: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const V2_BITRATES: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Version {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

/// Decoded 4-byte Layer III frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    raw: [u8; 4],
    version: Version,
    bitrate_kbps: u32,
    sample_rate: u32,
    padded: bool,
    crc: bool,
    mono: bool,
}

impl FrameHeader {
    /// Parse a header at the start of `bytes`
    ///
    /// Only Layer III with a fixed bitrate index is accepted.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let &[b0, b1, b2, b3, ..] = bytes else {
            return None;
        };

        if b0 != 0xFF || b1 & 0xE0 != 0xE0 {
            return None;
        }

        let version = match (b1 >> 3) & 0b11 {
            0b11 => Version::Mpeg1,
            0b10 => Version::Mpeg2,
            0b00 => Version::Mpeg25,
            _ => return None,
        };

        if (b1 >> 1) & 0b11 != 0b01 {
            return None;
        }

        let bitrate_index = usize::from(b2 >> 4);
        if bitrate_index == 0 || bitrate_index == 15 {
            return None;
        }

        let bitrate_kbps = match version {
            Version::Mpeg1 => V1_BITRATES[bitrate_index],
            Version::Mpeg2 | Version::Mpeg25 => V2_BITRATES[bitrate_index],
        };

        let base_rate = match (b2 >> 2) & 0b11 {
            0 => 44_100,
            1 => 48_000,
            2 => 32_000,
            _ => return None,
        };

        let sample_rate = match version {
            Version::Mpeg1 => base_rate,
            Version::Mpeg2 => base_rate / 2,
            Version::Mpeg25 => base_rate / 4,
        };

        Some(Self {
            raw: [b0, b1, b2, b3],
            version,
            bitrate_kbps,
            sample_rate,
            padded: (b2 >> 1) & 1 == 1,
            crc: b1 & 1 == 0,
            mono: b3 >> 6 == 0b11,
        })
    }

    /// Frame length in bytes, header included
    pub fn frame_len(&self) -> usize {
        let coefficient = match self.version {
            Version::Mpeg1 => 144,
            Version::Mpeg2 | Version::Mpeg25 => 72,
        };

        (coefficient * self.bitrate_kbps * 1000 / self.sample_rate) as usize + usize::from(self.padded)
    }

    /// PCM samples per channel carried by one frame
    pub const fn samples(&self) -> u32 {
        match self.version {
            Version::Mpeg1 => 1152,
            Version::Mpeg2 | Version::Mpeg25 => 576,
        }
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Playback length of one frame
    pub fn frame_seconds(&self) -> f64 {
        f64::from(self.samples()) / f64::from(self.sample_rate)
    }

    const fn side_info_len(&self) -> usize {
        match (self.version, self.mono) {
            (Version::Mpeg1, false) => 32,
            (Version::Mpeg1, true) | (Version::Mpeg2 | Version::Mpeg25, false) => 17,
            (Version::Mpeg2 | Version::Mpeg25, true) => 9,
        }
    }

    /// Whether `frame` is a Xing/Info/VBRI metadata frame rather than audio
    fn is_metadata_frame(&self, frame: &[u8]) -> bool {
        let xing_at = 4 + if self.crc { 2 } else { 0 } + self.side_info_len();
        let tag_at = |offset: usize| frame.get(offset..offset + 4);

        matches!(tag_at(xing_at), Some(b"Xing" | b"Info")) || matches!(tag_at(36), Some(b"VBRI"))
    }

    /// A frame that decodes to silence, shaped like this one
    ///
    /// Zeroed side info means zero bits of main data, so every spectral
    /// value is zero. Padding and CRC are cleared to keep the length fixed.
    pub fn silent_frame(&self) -> Vec<u8> {
        let header = Self {
            raw: [self.raw[0], self.raw[1] | 0x01, self.raw[2] & !0x02, self.raw[3]],
            padded: false,
            crc: false,
            ..*self
        };

        let mut frame = vec![0; header.frame_len()];
        frame[..4].copy_from_slice(&header.raw);
        frame
    }
}

/// Audio frames of one or more spliced MP3 streams
#[derive(Debug, Clone)]
pub struct Mp3Stream {
    template: FrameHeader,
    data: Vec<u8>,
    frames: usize,
    seconds: f64,
}

impl Mp3Stream {
    /// Scan `bytes` for Layer III frames
    ///
    /// ID3v2 tags, a leading Xing/Info/VBRI frame, trailing tags and junk
    /// between frames are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TtsError::InvalidAudio`] if no audio frame is found
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut pos = skip_id3v2(bytes);
        let mut stream: Option<Self> = None;
        let mut first = true;

        while pos + 4 <= bytes.len() {
            let Some(header) = FrameHeader::parse(&bytes[pos..]) else {
                pos += 1;
                continue;
            };

            let end = pos + header.frame_len();
            if end > bytes.len() {
                break;
            }

            // require a second sync before trusting the first frame
            if first && end < bytes.len() && FrameHeader::parse(&bytes[end..]).is_none() {
                pos += 1;
                continue;
            }

            let frame = &bytes[pos..end];
            let metadata = first && header.is_metadata_frame(frame);
            first = false;

            if !metadata {
                stream
                    .get_or_insert_with(|| Self::empty(header))
                    .push_frame(&header, frame);
            }

            pos = end;
        }

        stream.ok_or_else(|| TtsError::InvalidAudio("no MPEG audio frames found".to_string()))
    }

    /// An empty stream whose silence is shaped like `template`
    pub const fn empty(template: FrameHeader) -> Self {
        Self {
            template,
            data: Vec::new(),
            frames: 0,
            seconds: 0.0,
        }
    }

    /// Silence of roughly `seconds`, rounded to whole frames
    pub fn silence(template: FrameHeader, seconds: f64) -> Self {
        let mut stream = Self::empty(template);
        stream.append_silence(seconds);
        stream
    }

    fn push_frame(&mut self, header: &FrameHeader, frame: &[u8]) {
        self.data.extend_from_slice(frame);
        self.frames += 1;
        self.seconds += header.frame_seconds();
    }

    pub const fn duration(&self) -> f64 {
        self.seconds
    }

    pub const fn frame_count(&self) -> usize {
        self.frames
    }

    pub const fn template(&self) -> &FrameHeader {
        &self.template
    }

    /// Splice `other` onto the end of this stream
    pub fn append(&mut self, other: Self) {
        self.data.extend(other.data);
        self.frames += other.frames;
        self.seconds += other.seconds;
    }

    /// Append silent frames covering roughly `seconds`
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn append_silence(&mut self, seconds: f64) {
        if seconds <= 0.0 {
            return;
        }

        let frame = self.template.silent_frame();
        let seconds = seconds.min(MAX_DURATION_SECONDS);
        let count = (seconds / self.template.frame_seconds()).round() as usize;

        for _ in 0..count {
            self.data.extend_from_slice(&frame);
        }

        self.frames += count;
        self.seconds += count as f64 * self.template.frame_seconds();
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Silent mono 44.1 kHz MP3 of roughly `seconds`
pub fn silent_mp3(seconds: f64) -> Vec<u8> {
    let template = FrameHeader::parse(&REFERENCE_HEADER).unwrap_or_else(|| unreachable!("reference header is valid"));
    Mp3Stream::silence(template, seconds).into_bytes()
}

/// Offset of the first byte after any leading ID3v2 tags
fn skip_id3v2(bytes: &[u8]) -> usize {
    let mut pos = 0;

    while let Some(tag) = bytes.get(pos..pos + 10)
        && tag.starts_with(b"ID3")
    {
        let size = tag[6..10]
            .iter()
            .fold(0usize, |acc, &b| (acc << 7) | usize::from(b & 0x7F));
        let footer = if tag[5] & 0x10 == 0 { 0 } else { 10 };
        pos += 10 + size + footer;
    }

    pos.min(bytes.len())
}
