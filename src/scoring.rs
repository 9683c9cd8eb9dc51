use crate::config::PreferencesConfig;
use crate::models::release::ParsedRelease;

/// Computes the desirability score of a parsed release against the user's
/// preferences. Pure and deterministic; every bonus is independent and summed,
/// and the total is only meaningful for relative ranking.
///
/// - Language: the preferred language as a case-insensitive substring of the
///   release's language token earns the exact-match bonus; a broad
///   multi-language token (e.g. `MULTI`) earns the smaller multi bonus.
/// - Quality: position-weighted, `(len - index) * 10` for the first matching
///   entry of the preferred qualities list.
/// - Version: `(version - 1) * 3`, so revised releases outrank their v1.
/// - Provider: position-weighted `(len - index) * 5` for the first preferred
///   provider found in the release's provider tag; no stacking.
#[must_use]
pub fn score_release(parsed: &ParsedRelease, prefs: &PreferencesConfig) -> i32 {
    let mut score = 0;

    if let (Some(pref_lang), Some(lang)) = (prefs.language.as_deref(), parsed.language.as_deref())
        && !pref_lang.is_empty()
    {
        if lang.to_uppercase().contains(&pref_lang.to_uppercase()) {
            score += prefs.exact_language_bonus;
        } else if prefs
            .multi_language_tokens
            .iter()
            .any(|token| token.eq_ignore_ascii_case(lang))
        {
            score += prefs.multi_language_bonus;
        }
    }

    if let Some(quality) = parsed.quality
        && let Some(idx) = prefs
            .qualities
            .iter()
            .position(|q| q.eq_ignore_ascii_case(quality.as_str()))
    {
        score += (prefs.qualities.len() - idx) as i32 * 10;
    }

    score += parsed.effective_version().saturating_sub(1) as i32 * 3;

    if let Some(provider) = parsed.provider.as_deref() {
        let provider = provider.to_uppercase();
        for (idx, preferred) in prefs.sources.iter().enumerate() {
            if provider.contains(&preferred.to_uppercase()) {
                score += (prefs.sources.len() - idx) as i32 * 5;
                break;
            }
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_release_title;

    fn prefs() -> PreferencesConfig {
        PreferencesConfig {
            language: Some("VOSTFR".to_string()),
            qualities: vec!["1080p".to_string(), "720p".to_string()],
            sources: vec![],
            ..PreferencesConfig::default()
        }
    }

    fn parsed(title: &str) -> ParsedRelease {
        parse_release_title(title).expect("title should parse")
    }

    #[test]
    fn test_language_tiers_are_ordered() {
        let prefs = prefs();
        let exact = score_release(&parsed("Show S01E01 VOSTFR 1080p"), &prefs);
        let multi = score_release(&parsed("Show S01E01 MULTI 1080p"), &prefs);
        let other = score_release(&parsed("Show S01E01 VF 1080p"), &prefs);

        assert_eq!(exact, 70);
        assert_eq!(multi, 60);
        assert_eq!(other, 20);
        assert!(exact > multi && multi > other);
    }

    #[test]
    fn test_quality_position_weighting() {
        let mut prefs = prefs();
        prefs.language = None;

        let first = score_release(&parsed("Show S01E01 VOSTFR 1080p"), &prefs);
        let second = score_release(&parsed("Show S01E01 VOSTFR 720p"), &prefs);
        let unlisted = score_release(&parsed("Show S01E01 VOSTFR 480p"), &prefs);

        assert_eq!(first, 20);
        assert_eq!(second, 10);
        assert_eq!(unlisted, 0);
    }

    #[test]
    fn test_version_bonus() {
        let prefs = prefs();
        let v1 = score_release(&parsed("Show S01E01 VOSTFR 1080p"), &prefs);
        let v2 = score_release(&parsed("Show S01E01v2 VOSTFR 1080p"), &prefs);
        let v3 = score_release(&parsed("Show S01E01v3 VOSTFR 1080p"), &prefs);

        assert_eq!(v2 - v1, 3);
        assert_eq!(v3 - v1, 6);
    }

    #[test]
    fn test_provider_first_match_no_stacking() {
        let mut prefs = prefs();
        prefs.language = None;
        prefs.qualities = vec![];
        prefs.sources = vec!["CR".to_string(), "ADN".to_string(), "AMZN".to_string()];

        let cr = score_release(&parsed("Show S01E01 VOSTFR (CR)"), &prefs);
        let adn = score_release(&parsed("Show S01E01 VOSTFR (ADN)"), &prefs);
        let none = score_release(&parsed("Show S01E01 VOSTFR (NF)"), &prefs);

        assert_eq!(cr, 15);
        assert_eq!(adn, 10);
        assert_eq!(none, 0);
    }

    #[test]
    fn test_no_preferences_scores_version_only() {
        let prefs = PreferencesConfig {
            language: None,
            qualities: vec![],
            sources: vec![],
            ..PreferencesConfig::default()
        };
        assert_eq!(score_release(&parsed("Show S01E01 VOSTFR 1080p"), &prefs), 0);
        assert_eq!(score_release(&parsed("Show S01E01v2 VOSTFR 1080p"), &prefs), 3);
    }
}
