//! Output formats and their encoder mapping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target container for a channel's recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Raw capture format; never passed to the encoder.
    #[default]
    Wav,
    Wma,
    Mp3,
    M4a,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Wav,
        OutputFormat::Wma,
        OutputFormat::Mp3,
        OutputFormat::M4a,
    ];

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Wma => "wma",
            OutputFormat::Mp3 => "mp3",
            OutputFormat::M4a => "m4a",
        }
    }

    /// Codec selector passed to the encoder's `-c:a`.
    pub fn codec(&self) -> &'static str {
        match self {
            OutputFormat::Wav => "pcm_s16le",
            OutputFormat::Wma => "wmav2",
            OutputFormat::Mp3 => "libmp3lame",
            OutputFormat::M4a => "aac",
        }
    }

    /// Whether the recorder already produces this format.
    pub fn is_raw(&self) -> bool {
        matches!(self, OutputFormat::Wav)
    }

    pub fn as_str(&self) -> &'static str {
        self.extension()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_uppercase())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().trim_start_matches('.').to_lowercase();
        OutputFormat::ALL
            .into_iter()
            .find(|f| f.extension() == lower)
            .ok_or_else(|| format!("unknown output format '{s}' (expected wav, wma, mp3 or m4a)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_mapping() {
        assert_eq!(OutputFormat::Wav.codec(), "pcm_s16le");
        assert_eq!(OutputFormat::Wma.codec(), "wmav2");
        assert_eq!(OutputFormat::Mp3.codec(), "libmp3lame");
        assert_eq!(OutputFormat::M4a.codec(), "aac");
    }

    #[test]
    fn test_only_wav_is_raw() {
        let raw: Vec<_> = OutputFormat::ALL.into_iter().filter(|f| f.is_raw()).collect();
        assert_eq!(raw, vec![OutputFormat::Wav]);
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("MP3".parse::<OutputFormat>().unwrap(), OutputFormat::Mp3);
        assert_eq!(".m4a".parse::<OutputFormat>().unwrap(), OutputFormat::M4a);
        assert!("ogg".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_serialization() {
        let json = serde_json::to_string(&OutputFormat::Wma).unwrap();
        assert_eq!(json, "\"wma\"");
        let parsed: OutputFormat = serde_json::from_str("\"mp3\"").unwrap();
        assert_eq!(parsed, OutputFormat::Mp3);
    }
}
