use std::collections::BTreeSet;

use strsim::normalized_levenshtein;

/// Plain similarity ratio on a 0-100 scale.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

/// Best [`ratio`] between the shorter string and every window of the longer
/// string at the shorter string's length. 100 when one is a substring of the
/// other.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    let short_len = shorter.chars().count();
    if short_len == 0 {
        return if longer.is_empty() { 100.0 } else { 0.0 };
    }

    let longer_chars: Vec<char> = longer.chars().collect();
    if longer_chars.len() == short_len {
        return ratio(shorter, longer);
    }

    let mut best = 0.0_f64;
    for window in longer_chars.windows(short_len) {
        let candidate: String = window.iter().collect();
        let score = ratio(shorter, &candidate);
        if score > best {
            best = score;
        }
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// [`ratio`] over the whitespace tokens of each side sorted lexicographically,
/// making the score insensitive to word order.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Token-set construction: score the sorted token intersection against each
/// side's intersection-plus-remainder and keep the best, making the score
/// insensitive to both word order and repeated/extra tokens.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    let intersection = join(tokens_a.intersection(&tokens_b));
    let only_a = join(tokens_a.difference(&tokens_b));
    let only_b = join(tokens_b.difference(&tokens_a));

    let combined_a = join_nonempty(&intersection, &only_a);
    let combined_b = join_nonempty(&intersection, &only_b);

    ratio(&intersection, &combined_a)
        .max(ratio(&intersection, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn join<'a>(tokens: impl Iterator<Item = &'a &'a str>) -> String {
    tokens.copied().collect::<Vec<_>>().join(" ")
}

fn join_nonempty(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_bounded_and_exact_on_equality() {
        assert_eq!(ratio("oderzo", "oderzo"), 100.0);
        assert_eq!(ratio("", ""), 100.0);
        let score = ratio("oderzo", "odezro");
        assert!(score > 0.0 && score < 100.0);
    }

    #[test]
    fn partial_ratio_finds_embedded_names() {
        assert_eq!(partial_ratio("piavon", "piavon oderzo"), 100.0);
        assert_eq!(partial_ratio("piavon oderzo", "piavon"), 100.0);
        assert!(partial_ratio("piavon", "treviso") < 50.0);
    }

    #[test]
    fn token_sort_ignores_word_order() {
        assert_eq!(token_sort_ratio("martino lupari", "lupari martino"), 100.0);
        assert!(token_sort_ratio("martino lupari", "martino buon albergo") < 100.0);
    }

    #[test]
    fn token_set_ignores_extra_tokens() {
        assert_eq!(token_set_ratio("lucia piave", "lucia piave frazione"), 100.0);
        assert_eq!(token_set_ratio("piave lucia", "lucia piave"), 100.0);
    }

    #[test]
    fn scorers_are_deterministic() {
        for _ in 0..3 {
            assert_eq!(ratio("motta livenza", "meduna livenza"), ratio("motta livenza", "meduna livenza"));
            assert_eq!(
                partial_ratio("motta", "meduna livenza"),
                partial_ratio("motta", "meduna livenza")
            );
        }
    }
}
