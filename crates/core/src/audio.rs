//! Audio container formats and magic-byte sniffing

use serde::{Deserialize, Serialize};

/// Audio container / encoding formats the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// RIFF/WAVE container, PCM payload
    Wav,
    /// OGG container (usually Opus or Vorbis)
    Ogg,
    /// MPEG layer III
    Mp3,
    /// Free Lossless Audio Codec
    Flac,
    /// Raw Opus frames (no container)
    Opus,
    /// Raw 16-bit signed little-endian PCM
    Pcm16,
    /// Could not be identified
    Unknown,
}

impl AudioFormat {
    /// MIME type for HTTP uploads
    pub fn mime(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Opus => "audio/opus",
            AudioFormat::Pcm16 => "audio/pcm",
            AudioFormat::Unknown => "application/octet-stream",
        }
    }

    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::Opus => "opus",
            AudioFormat::Pcm16 => "pcm",
            AudioFormat::Unknown => "bin",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Identify an audio payload by its magic bytes.
///
/// Upstream callers (messaging platforms in particular) routinely mislabel
/// containers, so the declared extension is never trusted: a file named
/// `voice.mp3` that starts with `OggS` is treated as OGG.
pub fn detect_format(bytes: &[u8]) -> AudioFormat {
    if bytes.len() < 4 {
        return AudioFormat::Unknown;
    }

    if &bytes[..4] == b"OggS" {
        return AudioFormat::Ogg;
    }
    if &bytes[..4] == b"fLaC" {
        return AudioFormat::Flac;
    }
    // RIFF....WAVE
    if &bytes[..4] == b"RIFF" && bytes.len() >= 12 && &bytes[8..12] == b"WAVE" {
        return AudioFormat::Wav;
    }
    // ID3v2 tag or bare MPEG frame sync (11 set bits)
    if &bytes[..3] == b"ID3" {
        return AudioFormat::Mp3;
    }
    if bytes[0] == 0xFF && (bytes[1] & 0xE0) == 0xE0 {
        return AudioFormat::Mp3;
    }

    AudioFormat::Unknown
}
