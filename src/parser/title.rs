use crate::models::release::{ParsedRelease, Quality, Source};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Parses a free-text release title into a structured record.
///
/// A primary grammar requiring an `SxxEyy` token is tried first, then a
/// season-less fallback expecting only `Eyy`. When neither matches, the title
/// carries no usable structure and `None` is returned. Whichever grammar
/// matched, a second location-independent pass re-scans the whole title for
/// quality/source/provider tokens, since real titles place them in varying
/// order.
#[must_use]
pub fn parse_release_title(title: &str) -> Option<ParsedRelease> {
    parse_primary(title)
        .or_else(|| parse_fallback(title))
        .map(|parsed| refine_from_full_title(parsed, title))
}

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

fn parse_primary(title: &str) -> Option<ParsedRelease> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?:\[(?P<group>[^\]]+)\]\s*)?(?P<title>.+?)\s+S(?P<season>\d{2})E(?P<episode>\d{2,3})(?:v(?P<version>\d+))?\s*(?P<lang>VOSTFR|VF|ENG|MULTI)?\s*(?P<quality>2160p|1080p|720p|480p)?\s*(?P<source>WEB-DL|WEB\s?DL|WEB|BD|BluRay|DVD)?",
    );

    let caps = re.captures(title)?;
    let season = caps.name("season")?.as_str().parse().ok()?;
    extract_common_fields(&caps, Some(season))
}

fn parse_fallback(title: &str) -> Option<ParsedRelease> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(?:\[(?P<group>[^\]]+)\]\s*)?(?P<title>.+?)\s+E(?P<episode>\d{2,3})(?:v(?P<version>\d+))?\s*(?P<lang>VOSTFR|VF|ENG|MULTI)?\s*(?P<quality>2160p|1080p|720p|480p)?",
    );

    let caps = re.captures(title)?;
    extract_common_fields(&caps, None)
}

fn extract_common_fields(caps: &Captures, season: Option<u32>) -> Option<ParsedRelease> {
    let show_title = caps.name("title")?.as_str().trim().to_string();
    let episode = caps.name("episode")?.as_str().parse().ok()?;
    let version = caps.name("version").and_then(|m| m.as_str().parse().ok());

    Some(ParsedRelease {
        group: caps.name("group").map(|m| m.as_str().trim().to_string()),
        title: show_title,
        season,
        episode: Some(episode),
        version,
        language: caps.name("lang").map(|m| m.as_str().to_string()),
        quality: caps.name("quality").and_then(|m| Quality::from_token(m.as_str())),
        source: caps.name("source").and_then(|m| Source::from_token(m.as_str())),
        provider: None,
    })
}

/// Second pass over the full title: a global token find supersedes whatever
/// the positional grammar captured.
fn refine_from_full_title(mut parsed: ParsedRelease, title: &str) -> ParsedRelease {
    if let Some(quality) = find_quality(title) {
        parsed.quality = Some(quality);
    }

    if let Some(source) = find_source(title) {
        parsed.source = Some(source);
    }

    if let Some(provider) = find_trailing_provider(title) {
        parsed.provider = Some(provider);
    }

    if parsed.group.is_none() {
        parsed.group = find_trailing_group(title);
    }

    parsed
}

fn find_quality(s: &str) -> Option<Quality> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"(?i)\b(2160p|1080p|720p|480p)\b");

    re.find(s).and_then(|m| Quality::from_token(m.as_str()))
}

fn find_source(s: &str) -> Option<Source> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"(?i)\b(WEB[-\s]?DL|WEB|BD|BluRay|DVD)\b");

    re.find(s).and_then(|m| Source::from_token(m.as_str()))
}

/// Provider tags are conventionally the contents of a parenthesized group at
/// the very end of the title, e.g. `... -Tsundere-Raws (CR)`.
fn find_trailing_provider(s: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"\(([^)]+)\)\s*$");

    re.captures(s)
        .and_then(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
}

/// Release groups without a leading bracket tag show up as a ` -Group` marker
/// near the end of the title, optionally followed by the provider parens.
fn find_trailing_group(s: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"\s-\s*([A-Za-z][A-Za-z0-9-]*)\s*(?:\([^)]*\))?\s*$",
    );

    re.captures(s)
        .and_then(|c| c.get(1).map(|m| m.as_str().to_string()))
}

/// Best-effort season detection from a bare series title ("Season 2",
/// "2nd Season", "Part II", ...). Used for display and download-client
/// categorization when the library manager does not supply a season.
#[must_use]
pub fn infer_season_from_title(title: &str) -> Option<u32> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"(?i)\b(?:Season|S)\s*(\d+)\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\b(\d+)(?:st|nd|rd|th)\s+Season\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\bPart\s+(\d+|I{1,3}V?|VI{0,3})\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\bCour\s+(\d+)\b").expect("Invalid Regex"),
            Regex::new(r"\b(I{2,3}V?|VI{0,3})\s*$").expect("Invalid Regex"),
        ]
    });

    for pattern in patterns {
        if let Some(caps) = pattern.captures(title)
            && let Some(m) = caps.get(1)
        {
            let num_str = m.as_str();

            if let Ok(n) = num_str.parse::<u32>() {
                return Some(n);
            }

            if let Some(n) = roman_to_int(num_str) {
                return Some(n);
            }
        }
    }

    None
}

fn roman_to_int(s: &str) -> Option<u32> {
    match s.to_uppercase().as_str() {
        "I" => Some(1),
        "II" => Some(2),
        "III" => Some(3),
        "IV" => Some(4),
        "V" => Some(5),
        "VI" => Some(6),
        "VII" => Some(7),
        "VIII" => Some(8),
        "IX" => Some(9),
        "X" => Some(10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_grammar_full_title() {
        let p = parse_release_title(
            "My Hero Academia S07E11 VOSTFR 1080p WEB x264 AAC -Tsundere-Raws (CR)",
        )
        .unwrap();
        assert_eq!(p.title, "My Hero Academia");
        assert_eq!(p.season, Some(7));
        assert_eq!(p.episode, Some(11));
        assert_eq!(p.language.as_deref(), Some("VOSTFR"));
        assert_eq!(p.quality, Some(Quality::P1080));
        assert_eq!(p.source, Some(Source::Web));
        assert_eq!(p.provider.as_deref(), Some("CR"));
        assert_eq!(p.group.as_deref(), Some("Tsundere-Raws"));
    }

    #[test]
    fn test_fallback_grammar_no_season() {
        let p = parse_release_title("Some Show E03 720p -Tsundere-Raws").unwrap();
        assert_eq!(p.title, "Some Show");
        assert_eq!(p.season, None);
        assert_eq!(p.episode, Some(3));
        assert_eq!(p.quality, Some(Quality::P720));
        assert_eq!(p.group.as_deref(), Some("Tsundere-Raws"));
    }

    #[test]
    fn test_bracket_group_with_version() {
        let p = parse_release_title(
            "[Team Arcedo] NUKITASHI THE ANIMATION S01E02v2 VOSTFR WEB 1080p H264 AAC",
        )
        .unwrap();
        assert_eq!(p.group.as_deref(), Some("Team Arcedo"));
        assert_eq!(p.season, Some(1));
        assert_eq!(p.episode, Some(2));
        assert_eq!(p.version, Some(2));
        assert_eq!(p.language.as_deref(), Some("VOSTFR"));
        // Quality trails the source here; the global re-scan still finds it.
        assert_eq!(p.quality, Some(Quality::P1080));
        assert_eq!(p.source, Some(Source::Web));
    }

    #[test]
    fn test_three_digit_episode() {
        let p = parse_release_title("One Piece S01E109 VOSTFR 1080p").unwrap();
        assert_eq!(p.episode, Some(109));
    }

    #[test]
    fn test_case_insensitive() {
        let p = parse_release_title("my show s02e05 vostfr 720p").unwrap();
        assert_eq!(p.season, Some(2));
        assert_eq!(p.episode, Some(5));
        assert_eq!(p.language.as_deref(), Some("vostfr"));
        assert_eq!(p.quality, Some(Quality::P720));
    }

    #[test]
    fn test_webdl_spelling_normalized() {
        let p = parse_release_title("Frieren S01E12 VOSTFR 1080p WEBDL").unwrap();
        assert_eq!(p.source, Some(Source::WebDl));

        let p2 = parse_release_title("Frieren S01E12 VOSTFR 1080p WEB-DL").unwrap();
        assert_eq!(p2.source, Some(Source::WebDl));
    }

    #[test]
    fn test_global_rescan_overrides_positional_order() {
        // Quality placed before the language token, where the positional
        // grammar cannot capture it.
        let p = parse_release_title("Spy x Family S02E07 1080p VOSTFR WEB").unwrap();
        assert_eq!(p.quality, Some(Quality::P1080));
    }

    #[test]
    fn test_unrecognized_title_yields_none() {
        assert!(parse_release_title("Random discussion thread").is_none());
        assert!(parse_release_title("").is_none());
    }

    #[test]
    fn test_multi_language_token() {
        let p = parse_release_title("Dandadan S01E05 MULTI 1080p WEB (DSNP)").unwrap();
        assert_eq!(p.language.as_deref(), Some("MULTI"));
        assert_eq!(p.provider.as_deref(), Some("DSNP"));
    }

    #[test]
    fn test_infer_season_from_title() {
        assert_eq!(infer_season_from_title("Title Season 3"), Some(3));
        assert_eq!(infer_season_from_title("Title S2"), Some(2));
        assert_eq!(infer_season_from_title("Title 2nd Season"), Some(2));
        assert_eq!(infer_season_from_title("Title Part 2"), Some(2));
        assert_eq!(infer_season_from_title("Title Part II"), Some(2));
        assert_eq!(infer_season_from_title("Title III"), Some(3));
        assert_eq!(infer_season_from_title("Title Cour 2"), Some(2));
        assert_eq!(infer_season_from_title("Just a Title"), None);
    }
}
