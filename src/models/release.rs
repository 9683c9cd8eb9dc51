use serde::{Deserialize, Serialize};
use std::fmt;

/// Video quality token as advertised in a release title.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Quality {
    #[serde(rename = "2160p")]
    P2160,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
}

impl Quality {
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "2160p" => Some(Self::P2160),
            "1080p" => Some(Self::P1080),
            "720p" => Some(Self::P720),
            "480p" => Some(Self::P480),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::P2160 => "2160p",
            Self::P1080 => "1080p",
            Self::P720 => "720p",
            Self::P480 => "480p",
        }
    }

    /// Coarse rank used as a ranking tie-break: 2160p > 1080p > everything else.
    #[must_use]
    pub const fn rank(self) -> i32 {
        match self {
            Self::P2160 => 2,
            Self::P1080 => 1,
            Self::P720 | Self::P480 => 0,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Distribution source token as advertised in a release title.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Source {
    #[serde(rename = "WEB")]
    Web,
    #[serde(rename = "WEB-DL")]
    WebDl,
    #[serde(rename = "BD")]
    Bd,
    #[serde(rename = "BluRay")]
    BluRay,
    #[serde(rename = "DVD")]
    Dvd,
}

impl Source {
    /// Parses a raw token, folding the `WEBDL` / `WEB DL` spellings into `WEB-DL`.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "WEB" => Some(Self::Web),
            "WEB-DL" | "WEBDL" | "WEB DL" => Some(Self::WebDl),
            "BD" => Some(Self::Bd),
            "BLURAY" => Some(Self::BluRay),
            "DVD" => Some(Self::Dvd),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Web => "WEB",
            Self::WebDl => "WEB-DL",
            Self::Bd => "BD",
            Self::BluRay => "BluRay",
            Self::Dvd => "DVD",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured view of a free-text release title.
///
/// Produced only when one of the title grammars matches in full; there is no
/// partially-filled variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedRelease {
    pub group: Option<String>,

    pub title: String,

    pub season: Option<u32>,

    pub episode: Option<u32>,

    pub version: Option<u32>,

    /// Raw language token, e.g. "VOSTFR", "MULTI", "VF", "ENG".
    pub language: Option<String>,

    pub quality: Option<Quality>,

    pub source: Option<Source>,

    /// Distributor/platform tag, e.g. "CR", "DSNP".
    pub provider: Option<String>,
}

impl ParsedRelease {
    /// Release revision, defaulting to 1 when no `vN` suffix was present.
    #[must_use]
    pub fn effective_version(&self) -> u32 {
        self.version.unwrap_or(1)
    }

    #[must_use]
    pub fn is_revised(&self) -> bool {
        self.version.is_some_and(|v| v > 1)
    }

    #[must_use]
    pub fn quality_rank(&self) -> i32 {
        self.quality.map_or(0, Quality::rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_tokens() {
        assert_eq!(Quality::from_token("1080P"), Some(Quality::P1080));
        assert_eq!(Quality::from_token("2160p"), Some(Quality::P2160));
        assert_eq!(Quality::from_token("540p"), None);
        assert_eq!(Quality::P720.to_string(), "720p");
    }

    #[test]
    fn test_quality_rank_ordering() {
        assert!(Quality::P2160.rank() > Quality::P1080.rank());
        assert!(Quality::P1080.rank() > Quality::P720.rank());
        assert_eq!(Quality::P720.rank(), Quality::P480.rank());
    }

    #[test]
    fn test_source_normalizes_webdl() {
        assert_eq!(Source::from_token("WEBDL"), Some(Source::WebDl));
        assert_eq!(Source::from_token("web dl"), Some(Source::WebDl));
        assert_eq!(Source::from_token("WEB-DL"), Some(Source::WebDl));
        assert_eq!(Source::from_token("WEB"), Some(Source::Web));
        assert_eq!(Source::from_token("bluray"), Some(Source::BluRay));
    }

    #[test]
    fn test_effective_version() {
        let parsed = ParsedRelease {
            group: None,
            title: "Test".to_string(),
            season: None,
            episode: Some(1),
            version: None,
            language: None,
            quality: None,
            source: None,
            provider: None,
        };
        assert_eq!(parsed.effective_version(), 1);
        assert!(!parsed.is_revised());

        let revised = ParsedRelease {
            version: Some(3),
            ..parsed
        };
        assert_eq!(revised.effective_version(), 3);
        assert!(revised.is_revised());
    }
}
