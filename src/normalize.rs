use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Leading honorific / administrative prefixes stripped before matching.
/// Ordered longest-first so the longest applicable prefix wins. The CRM mixes
/// Italian record text with Portuguese operator annotations, so both forms
/// appear.
const LEADING_PREFIXES: [&str; 16] = [
    "circoscrizione di ",
    "parrocchia di ",
    "provincia di ",
    "municipio di ",
    "paroquia de ",
    "frazione di ",
    "diocesi di ",
    "diocese de ",
    "comune di ",
    "comune de ",
    "localita ",
    "citta di ",
    "santa ",
    "santo ",
    "sant ",
    "san ",
];

/// Trailing province-code abbreviations and region names. Gazetteer names run
/// through the same strip, so a comune that legitimately ends in one of these
/// ("vittorio veneto") still lines up on both sides.
const TRAILING_SUFFIXES: [&str; 28] = [
    " friuli venezia giulia",
    " emilia romagna",
    " lombardia",
    " trentino",
    " campania",
    " piemonte",
    " calabria",
    " toscana",
    " sicilia",
    " veneto",
    " italia",
    " lazio",
    " ve",
    " tv",
    " pd",
    " vr",
    " vi",
    " bl",
    " ro",
    " mn",
    " mi",
    " rm",
    " to",
    " na",
    " fi",
    " ge",
    " bo",
    " ud",
];

/// Full-string rewrites for known spelling variants, Portuguese exonyms, and
/// bare province codes.
static SUBSTITUTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("montova", "mantova"),
        ("mantua", "mantova"),
        ("veneza", "venezia"),
        ("venecia", "venezia"),
        ("padua", "padova"),
        ("napoles", "napoli"),
        ("florenca", "firenze"),
        ("genoa", "genova"),
        ("milao", "milano"),
        ("turim", "torino"),
        ("trevizo", "treviso"),
        ("vicensa", "vicenza"),
        ("ve", "venezia"),
        ("tv", "treviso"),
        ("pd", "padova"),
        ("vr", "verona"),
        ("vi", "vicenza"),
        ("bl", "belluno"),
        ("ro", "rovigo"),
        ("mn", "mantova"),
        ("mi", "milano"),
        ("rm", "roma"),
        ("to", "torino"),
        ("na", "napoli"),
        ("fi", "firenze"),
        ("ge", "genova"),
        ("bo", "bologna"),
        ("ud", "udine"),
    ])
});

/// Articles and prepositions dropped token-by-token. Italian plus the
/// Portuguese connectives the CRM operators type.
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "di", "de", "del", "della", "delle", "dei", "degli", "dal", "dalla", "da", "la", "le",
        "il", "lo", "li", "gli", "i", "e", "ed", "a", "al", "alla", "alle", "in", "nel", "nella",
        "su", "sul", "sulla", "per", "con", "un", "una", "do", "dos", "das", "no", "na",
    ])
});

/// Canonicalizes free text into the sole matching key used downstream.
///
/// Applied identically to queries and gazetteer rows; a normalizer fork on
/// either side silently degrades matching. Idempotent:
/// `normalize(normalize(s)) == normalize(s)`. An empty result means the value
/// was not specified and must never be used as a match key.
pub fn normalize(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return String::new();
    }

    let folded = strip_diacritics(&lowered);
    let mut current = collapse_whitespace(&strip_punctuation(&folded));

    // Dropping a stopword can expose a fresh prefix or suffix ("di San
    // Martino" sheds "di", then "san "), so the strip passes repeat until
    // the string stops changing. Every pass shrinks the string, except a
    // substitution whose outputs are themselves fixed points.
    loop {
        let next = strip_pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn strip_pass(text: &str) -> String {
    let unprefixed = strip_leading_prefixes(text);
    let unsuffixed = strip_trailing_suffixes(&unprefixed);

    let substituted = match SUBSTITUTIONS.get(unsuffixed.as_str()) {
        Some(replacement) => (*replacement).to_string(),
        None => unsuffixed,
    };

    let without_stopwords = substituted
        .split_whitespace()
        .filter(|token| !STOPWORDS.contains(token))
        .collect::<Vec<_>>()
        .join(" ");

    collapse_whitespace(&without_stopwords)
}

fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

fn strip_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect()
}

fn strip_leading_prefixes(text: &str) -> String {
    let mut current = text.to_string();
    // Prefixes stack ("comune di san martino"), so strip until none applies.
    // Each pass removes the longest match; the list length bounds the loop.
    for _ in 0..LEADING_PREFIXES.len() {
        let Some(prefix) = LEADING_PREFIXES
            .iter()
            .find(|prefix| current.starts_with(*prefix))
        else {
            break;
        };
        current = current[prefix.len()..].trim_start().to_string();
    }
    current
}

fn strip_trailing_suffixes(text: &str) -> String {
    let mut current = text.to_string();
    for _ in 0..TRAILING_SUFFIXES.len() {
        let Some(suffix) = TRAILING_SUFFIXES
            .iter()
            .find(|suffix| current.ends_with(*suffix))
        else {
            break;
        };
        current = current[..current.len() - suffix.len()].trim_end().to_string();
    }
    current
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_input_yield_empty_key() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize(" - "), "");
    }

    #[test]
    fn lowercases_and_strips_diacritics() {
        assert_eq!(normalize("FORLÌ"), normalize("forli"));
        assert_eq!(normalize("San Donà di Piave"), normalize("san dona di piave"));
        assert_eq!(normalize("Cefalù"), "cefalu");
    }

    #[test]
    fn strips_stacked_prefixes_and_province_suffix() {
        assert_eq!(normalize("Comune di San Martino VE"), "martino");
        assert_eq!(normalize("Parrocchia di Santa Lucia di Piave"), "lucia piave");
        assert_eq!(normalize("Sant'Angelo"), "angelo");
    }

    #[test]
    fn applies_spelling_substitutions() {
        assert_eq!(normalize("Montova"), "mantova");
        assert_eq!(normalize("Mântua"), "mantova");
        assert_eq!(normalize("Veneza"), "venezia");
        assert_eq!(normalize("TV"), "treviso");
    }

    #[test]
    fn drops_stopword_tokens_and_collapses_whitespace() {
        assert_eq!(normalize("Motta  di  Livenza"), "motta livenza");
        assert_eq!(normalize("Riva del Garda"), "riva garda");
    }

    #[test]
    fn region_suffix_strips_identically_for_real_comune_names() {
        // The gazetteer side runs through the same function, so both keys
        // collapse to the same value.
        assert_eq!(normalize("Vittorio Veneto"), normalize("Vittorio"));
    }

    #[test]
    fn stopword_removal_cannot_expose_an_unstripped_prefix() {
        // "di" drops as a stopword, which uncovers the "san " prefix; a
        // single pass would stop at "san martino" while "San Martino" alone
        // normalizes to "martino".
        assert_eq!(normalize("di San Martino"), "martino");
        assert_eq!(normalize("di San Martino"), normalize("San Martino"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "Comune di San Martino VE",
            "di San Martino",
            "Parrocchia di Santa Lucia di Piave",
            "Sant'Angelo (VE)",
            "Montova",
            "Não especificado",
            "FORLÌ",
            "Motta di Livenza - Veneto",
            "xyzabc123",
            "",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }
}
