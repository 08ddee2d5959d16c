use std::fmt;

/// Container formats recognized on upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Webm,
    Mp4,
    Ogg,
    Unknown,
}

impl AudioFormat {
    /// File extension used when writing a buffer of this format to disk
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Webm => "webm",
            AudioFormat::Mp4 => "mp4",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Unknown => "bin",
        }
    }

    /// MIME type reported when submitting a buffer of this format to a provider
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Webm => "audio/webm",
            AudioFormat::Mp4 => "audio/mp4",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Unknown => "application/octet-stream",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AudioFormat::Unknown => "unknown",
            other => other.extension(),
        };
        f.write_str(name)
    }
}

/// Minimum buffer length for reliable detection
const MIN_SNIFF_LEN: usize = 12;

/// Detect the container format of an audio buffer from its magic bytes.
///
/// Checks run in a fixed order and the first match wins. Buffers shorter
/// than 12 bytes are reported as unknown.
pub fn detect_format(data: &[u8]) -> AudioFormat {
    if data.len() < MIN_SNIFF_LEN {
        return AudioFormat::Unknown;
    }

    if &data[0..4] == b"RIFF" {
        return AudioFormat::Wav;
    }

    // EBML header, shared by WebM and Matroska
    if data[0..4] == [0x1A, 0x45, 0xDF, 0xA3] {
        return AudioFormat::Webm;
    }

    // MPEG frame sync or an ID3v2 tag
    if (data[0] == 0xFF && data[1] & 0xE0 == 0xE0) || &data[0..3] == b"ID3" {
        return AudioFormat::Mp3;
    }

    // ISO BMFF puts the box size first, the ftyp brand at offset 4
    if &data[4..8] == b"ftyp" {
        return AudioFormat::Mp4;
    }

    if &data[0..4] == b"OggS" {
        return AudioFormat::Ogg;
    }

    AudioFormat::Unknown
}
