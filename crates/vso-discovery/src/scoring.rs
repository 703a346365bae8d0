//! Ranking: keyword overlap plus a popularity proxy. The algorithm itself
//! is replaceable; the only hard contract is that results are totally
//! ordered and stable for a given input.

const KEYWORD_WEIGHT: f64 = 0.7;
const POPULARITY_WEIGHT: f64 = 0.3;

fn tokenize(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

/// Fraction of query tokens (capability name plus optional hints) that
/// appear in the hit's package name or description.
fn keyword_overlap(capability: &str, hints: Option<&str>, package: &str, description: &str) -> f64 {
    let mut query = tokenize(capability);
    if let Some(hints) = hints {
        query.extend(tokenize(hints));
    }
    if query.is_empty() {
        return 0.0;
    }

    let haystack = tokenize(&format!("{package} {description}"));
    let matched = query.iter().filter(|t| haystack.contains(t)).count();
    matched as f64 / query.len() as f64
}

/// Popularity proxy: a download count compressed onto `[0, 1]` by a log
/// scale so that a handful of very popular packages don't swamp the
/// keyword-overlap signal.
fn popularity_proxy(downloads: u64) -> f64 {
    ((downloads as f64 + 1.0).ln() / 20.0).min(1.0)
}

/// Combined score for one registry hit.
pub fn score_hit(
    capability: &str,
    hints: Option<&str>,
    package: &str,
    description: &str,
    downloads: u64,
) -> f64 {
    let keyword = keyword_overlap(capability, hints, package, description);
    keyword * KEYWORD_WEIGHT + popularity_proxy(downloads) * POPULARITY_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_name_match_scores_higher_than_unrelated() {
        let exact = score_hit("blockchain", None, "blockchain", "", 0);
        let unrelated = score_hit("blockchain", None, "weather-tool", "forecasts", 0);
        assert!(exact > unrelated);
    }

    #[test]
    fn popularity_breaks_ties_between_equal_keyword_matches() {
        let popular = score_hit("blockchain", None, "blockchain-a", "blockchain tool", 1_000_000);
        let obscure = score_hit("blockchain", None, "blockchain-b", "blockchain tool", 0);
        assert!(popular > obscure);
    }

    #[test]
    fn empty_query_has_no_keyword_signal() {
        assert_eq!(keyword_overlap("", None, "anything", "anything"), 0.0);
    }
}
