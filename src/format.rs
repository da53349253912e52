//! Track formats and MIME classification

use serde::{Deserialize, Serialize};

/// Subsample offset meaning that cue times inside a sample are relative to the
/// sample's own presentation timestamp.
pub const OFFSET_SAMPLE_RELATIVE: i64 = i64::MAX;

/// Description of a text track as seen by the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    /// Track identifier, if the container provides one
    pub id: Option<String>,
    /// MIME type of the samples, e.g. `text/vtt`
    pub sample_mime_type: Option<String>,
    /// ISO 639 language code
    pub language: Option<String>,
    /// Offset added to cue times decoded from a sample
    pub subsample_offset_us: i64,
}

impl Format {
    /// Create a text format with absolute cue times
    pub fn text(sample_mime_type: &str) -> Self {
        Self {
            id: None,
            sample_mime_type: Some(sample_mime_type.to_string()),
            language: None,
            subsample_offset_us: 0,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn with_subsample_offset_us(mut self, subsample_offset_us: i64) -> Self {
        self.subsample_offset_us = subsample_offset_us;
        self
    }

    /// The MIME type, or an empty string when unknown
    pub fn mime_type(&self) -> &str {
        self.sample_mime_type.as_deref().unwrap_or("")
    }
}

/// Receives the format of the upstream stream on a format read
#[derive(Debug, Clone, Default)]
pub struct FormatHolder {
    pub format: Option<Format>,
}

/// MIME type helpers
pub mod mime {
    pub const TEXT_VTT: &str = "text/vtt";
    pub const TEXT_SSA: &str = "text/x-ssa";
    pub const APPLICATION_TTML: &str = "application/ttml+xml";
    pub const APPLICATION_TX3G: &str = "application/x-quicktime-tx3g";
    pub const APPLICATION_MP4VTT: &str = "application/x-mp4-vtt";
    pub const APPLICATION_MP4CEA608: &str = "application/x-mp4-cea-608";
    pub const APPLICATION_RAWCC: &str = "application/x-rawcc";
    pub const APPLICATION_SUBRIP: &str = "application/x-subrip";
    pub const APPLICATION_CEA608: &str = "application/cea-608";
    pub const APPLICATION_CEA708: &str = "application/cea-708";
    pub const APPLICATION_DVBSUBS: &str = "application/dvbsubs";
    pub const APPLICATION_PGS: &str = "application/pgs";
    pub const APPLICATION_VOBSUB: &str = "application/vobsub";
    pub const APPLICATION_ID3: &str = "application/id3";

    /// Caption types carried under the `application` top-level type
    const APPLICATION_TEXT_TYPES: &[&str] = &[
        APPLICATION_TTML,
        APPLICATION_TX3G,
        APPLICATION_MP4VTT,
        APPLICATION_MP4CEA608,
        APPLICATION_RAWCC,
        APPLICATION_SUBRIP,
        APPLICATION_CEA608,
        APPLICATION_CEA708,
        APPLICATION_DVBSUBS,
        APPLICATION_PGS,
        APPLICATION_VOBSUB,
    ];

    /// Top-level type of a MIME type (`text` for `text/vtt`)
    pub fn top_level_type(mime_type: &str) -> Option<&str> {
        mime_type.split_once('/').map(|(top, _)| top)
    }

    /// Whether the MIME type describes a text/caption track
    pub fn is_text(mime_type: &str) -> bool {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        top_level_type(&mime_type) == Some("text")
            || APPLICATION_TEXT_TYPES.contains(&mime_type.as_str())
    }
}
