/// Normalizes a show title for use in feed search queries.
///
/// Apostrophes and colons are removed outright. Hyphens survive only inside
/// compound words ("Twisted-Wonderland"); a hyphen used as a separator
/// ("Show - Part 2") becomes a space. All other punctuation becomes a space
/// and runs of whitespace collapse to one.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let chars: Vec<char> = title.chars().collect();
    let mut cleaned = String::with_capacity(title.len());

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '\'' | '\u{2019}' | ':' => {}
            '-' => {
                let prev_is_word = i > 0 && chars[i - 1].is_alphanumeric();
                let next_is_word = chars.get(i + 1).is_some_and(|n| n.is_alphanumeric());
                cleaned.push(if prev_is_word && next_is_word { '-' } else { ' ' });
            }
            c if c.is_alphanumeric() || c.is_whitespace() => cleaned.push(c),
            _ => cleaned.push(' '),
        }
    }

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds the ordered list of search queries to try for one missing episode.
///
/// Query 1 pins the exact `SxxEyy` token when a season is known, query 2 is
/// the season-agnostic `Eyy` form, and query 3 re-issues the most specific
/// query with a ` VOSTFR` suffix to bias the feed toward subtitled releases.
/// Order-preserving dedup, so coinciding variants collapse to one.
#[must_use]
pub fn build_queries(show_title: &str, season: Option<u32>, episode: u32) -> Vec<String> {
    let title = sanitize_title(show_title);
    let mut queries = Vec::with_capacity(3);

    if let Some(season) = season {
        queries.push(format!("{title} S{season:02}E{episode:02}"));
    }
    queries.push(format!("{title} E{episode:02}"));
    queries.push(format!("{} VOSTFR", &queries[0]));

    let mut seen = std::collections::HashSet::new();
    queries.retain(|q| seen.insert(q.clone()));
    queries
}
