use std::{env, io};

use tracing::debug;

/// Minimum plain-ratio score for a gazetteer comune to count as a fuzzy
/// candidate (stages 6 and 9). Empirically tuned against the CRM corpus.
pub const DEFAULT_RATIO_CUTOFF: f64 = 65.0;
/// Minimum token-sort-ratio score for a fuzzy candidate.
pub const DEFAULT_TOKEN_SORT_CUTOFF: f64 = 70.0;
/// Minimum token-set-ratio score for a fuzzy candidate.
pub const DEFAULT_TOKEN_SET_CUTOFF: f64 = 75.0;
/// Minimum partial-ratio score for a fuzzy candidate.
pub const DEFAULT_PARTIAL_CUTOFF: f64 = 80.0;
/// Minimum partial-ratio score for the fragment stage. Fragments are riskier
/// than whole-string fuzzy matches, so the bar is stricter than any stage-6
/// cutoff.
pub const DEFAULT_FRAGMENT_CUTOFF: f64 = 85.0;
/// Tokens shorter than this never seed a fragment search.
pub const DEFAULT_MIN_FRAGMENT_LEN: usize = 4;

/// Tunable score cutoffs for the fuzzy and fragment matching stages.
///
/// The defaults are carried over from the original tuning and have no
/// documented derivation; every field can be overridden through a
/// `GEOCODER_*` environment variable so recalibration against a labeled set
/// requires no code change.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolverConfig {
    pub ratio_cutoff: f64,
    pub token_sort_cutoff: f64,
    pub token_set_cutoff: f64,
    pub partial_cutoff: f64,
    pub fragment_cutoff: f64,
    pub min_fragment_len: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ratio_cutoff: DEFAULT_RATIO_CUTOFF,
            token_sort_cutoff: DEFAULT_TOKEN_SORT_CUTOFF,
            token_set_cutoff: DEFAULT_TOKEN_SET_CUTOFF,
            partial_cutoff: DEFAULT_PARTIAL_CUTOFF,
            fragment_cutoff: DEFAULT_FRAGMENT_CUTOFF,
            min_fragment_len: DEFAULT_MIN_FRAGMENT_LEN,
        }
    }
}

impl ResolverConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        Self {
            ratio_cutoff: parse_f64("GEOCODER_RATIO_CUTOFF", DEFAULT_RATIO_CUTOFF),
            token_sort_cutoff: parse_f64("GEOCODER_TOKEN_SORT_CUTOFF", DEFAULT_TOKEN_SORT_CUTOFF),
            token_set_cutoff: parse_f64("GEOCODER_TOKEN_SET_CUTOFF", DEFAULT_TOKEN_SET_CUTOFF),
            partial_cutoff: parse_f64("GEOCODER_PARTIAL_CUTOFF", DEFAULT_PARTIAL_CUTOFF),
            fragment_cutoff: parse_f64("GEOCODER_FRAGMENT_CUTOFF", DEFAULT_FRAGMENT_CUTOFF),
            min_fragment_len: parse_usize("GEOCODER_MIN_FRAGMENT_LEN", DEFAULT_MIN_FRAGMENT_LEN),
        }
    }
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = ResolverConfig::default();
        assert_eq!(config.ratio_cutoff, DEFAULT_RATIO_CUTOFF);
        assert_eq!(config.partial_cutoff, DEFAULT_PARTIAL_CUTOFF);
        assert!(config.fragment_cutoff > config.partial_cutoff);
        assert_eq!(config.min_fragment_len, DEFAULT_MIN_FRAGMENT_LEN);
    }

    #[test]
    fn env_overrides_take_effect() {
        env::set_var("GEOCODER_FRAGMENT_CUTOFF", "90.5");
        env::set_var("GEOCODER_MIN_FRAGMENT_LEN", "5");

        let config = ResolverConfig::from_env();

        assert_eq!(config.fragment_cutoff, 90.5);
        assert_eq!(config.min_fragment_len, 5);
        assert_eq!(config.ratio_cutoff, DEFAULT_RATIO_CUTOFF);

        env::remove_var("GEOCODER_FRAGMENT_CUTOFF");
        env::remove_var("GEOCODER_MIN_FRAGMENT_LEN");
    }
}
