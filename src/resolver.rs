use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::ResolverConfig;
use crate::gazetteer::Gazetteer;
use crate::keywords::KeywordTable;
use crate::normalize::normalize;
use crate::overrides::OverrideTable;
use crate::scoring::{partial_ratio, ratio, token_set_ratio, token_sort_ratio};

/// Province values the CRM uses to mean "no province recorded". A normalized
/// province equal to one of these is never used as a match key.
const NOT_SPECIFIED_SENTINELS: [&str; 2] = ["nao especificado", "nao informado"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Which strategy produced a match, recorded for auditing and confidence
/// assessment. `CASCADE` lists the strategies in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchSource {
    ManualComune,
    ManualProvincia,
    ExactComuneProvincia,
    ExactComune,
    ExactProvincia,
    FuzzyComune,
    FragmentComune,
    KeywordCity,
    FuzzyProvincia,
    Unresolved,
}

impl MatchSource {
    pub const CASCADE: [MatchSource; 9] = [
        MatchSource::ManualComune,
        MatchSource::ManualProvincia,
        MatchSource::ExactComuneProvincia,
        MatchSource::ExactComune,
        MatchSource::ExactProvincia,
        MatchSource::FuzzyComune,
        MatchSource::FragmentComune,
        MatchSource::KeywordCity,
        MatchSource::FuzzyProvincia,
    ];

    pub fn as_tag(&self) -> &'static str {
        match self {
            MatchSource::ManualComune => crate::overrides::COMUNE_OVERRIDE_LABEL,
            MatchSource::ManualProvincia => crate::overrides::PROVINCIA_OVERRIDE_LABEL,
            MatchSource::ExactComuneProvincia => "Exata Comune+Província",
            MatchSource::ExactComune => "Exata Comune",
            MatchSource::ExactProvincia => "Exata Província",
            MatchSource::FuzzyComune => "Fuzzy Comune",
            MatchSource::FragmentComune => "Fragmento Comune",
            MatchSource::KeywordCity => "Cidade Conhecida",
            MatchSource::FuzzyProvincia => "Fuzzy Província",
            MatchSource::Unresolved => "unresolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::CASCADE
            .iter()
            .copied()
            .chain(std::iter::once(MatchSource::Unresolved))
            .find(|source| source.as_tag() == value)
    }
}

/// One input row to resolve. Raw text is immutable once created; the
/// normalized keys are derived exactly once at construction. The match
/// fields are set at most once, by the first strategy that succeeds.
#[derive(Debug, Clone)]
pub struct LocalityQuery {
    pub record_id: String,
    pub raw_comune: String,
    pub raw_province: String,
    pub norm_comune: String,
    pub norm_province: String,
    pub resolved: Option<Coordinates>,
    pub match_source: MatchSource,
}

impl LocalityQuery {
    pub fn new(
        record_id: impl Into<String>,
        raw_comune: impl Into<String>,
        raw_province: impl Into<String>,
    ) -> Self {
        let raw_comune = raw_comune.into();
        let raw_province = raw_province.into();
        let norm_comune = normalize(&raw_comune);
        let norm_province = normalize(&raw_province);
        Self {
            record_id: record_id.into(),
            raw_comune,
            raw_province,
            norm_comune,
            norm_province,
            resolved: None,
            match_source: MatchSource::Unresolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    fn has_comune_key(&self) -> bool {
        !self.norm_comune.is_empty()
    }

    fn has_province_key(&self) -> bool {
        !self.norm_province.is_empty()
            && !NOT_SPECIFIED_SENTINELS.contains(&self.norm_province.as_str())
    }
}

/// Context handed to every strategy: the read-only reference data and the
/// cutoff configuration. Strategies never reach for ambient globals.
pub struct MatchContext<'a> {
    pub gazetteer: &'a Gazetteer,
    pub overrides: &'a OverrideTable,
    pub keywords: &'a KeywordTable,
    pub config: &'a ResolverConfig,
}

/// One rung of the cascade. `attempt` either produces coordinates or defers
/// to the next strategy; it never partially matches.
pub trait MatchStrategy: Send + Sync {
    fn source(&self) -> MatchSource;
    fn attempt(&self, query: &LocalityQuery, ctx: &MatchContext<'_>) -> Option<Coordinates>;
}

/// Resolves queries against the gazetteer, overrides, and keyword table by
/// trying each strategy in fixed order and stopping at the first success.
pub struct Resolver {
    gazetteer: Gazetteer,
    overrides: OverrideTable,
    keywords: KeywordTable,
    config: ResolverConfig,
    strategies: Vec<Box<dyn MatchStrategy>>,
}

impl Resolver {
    pub fn new(
        gazetteer: Gazetteer,
        overrides: OverrideTable,
        keywords: KeywordTable,
        config: ResolverConfig,
    ) -> Self {
        Self {
            gazetteer,
            overrides,
            keywords,
            config,
            strategies: default_cascade(),
        }
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    /// Runs the cascade over one query. The query's match fields are set
    /// exactly once; an unmatched query comes back `Unresolved`, which is a
    /// valid terminal state rather than an error.
    pub fn resolve(&self, mut query: LocalityQuery) -> LocalityQuery {
        let ctx = MatchContext {
            gazetteer: &self.gazetteer,
            overrides: &self.overrides,
            keywords: &self.keywords,
            config: &self.config,
        };
        for strategy in &self.strategies {
            if let Some(coords) = strategy.attempt(&query, &ctx) {
                trace!(
                    record_id = %query.record_id,
                    source = strategy.source().as_tag(),
                    "query resolved"
                );
                query.resolved = Some(coords);
                query.match_source = strategy.source();
                return query;
            }
        }
        debug!(record_id = %query.record_id, comune = %query.raw_comune, "query left unresolved");
        query
    }

    /// Resolves a batch sequentially. Queries are independent, so order has
    /// no effect on individual outcomes.
    pub fn resolve_batch(&self, queries: Vec<LocalityQuery>) -> Vec<LocalityQuery> {
        queries.into_iter().map(|q| self.resolve(q)).collect()
    }
}

fn default_cascade() -> Vec<Box<dyn MatchStrategy>> {
    vec![
        Box::new(ManualComuneStrategy),
        Box::new(ManualProvinciaStrategy),
        Box::new(ExactComuneProvinciaStrategy),
        Box::new(ExactComuneStrategy),
        Box::new(ExactProvinciaStrategy),
        Box::new(FuzzyComuneStrategy),
        Box::new(FragmentComuneStrategy),
        Box::new(KeywordCityStrategy),
        Box::new(FuzzyProvinciaStrategy),
    ]
}

struct ManualComuneStrategy;

impl MatchStrategy for ManualComuneStrategy {
    fn source(&self) -> MatchSource {
        MatchSource::ManualComune
    }

    fn attempt(&self, query: &LocalityQuery, ctx: &MatchContext<'_>) -> Option<Coordinates> {
        if !query.has_comune_key() {
            return None;
        }
        ctx.overrides.comune(&query.norm_comune)
    }
}

struct ManualProvinciaStrategy;

impl MatchStrategy for ManualProvinciaStrategy {
    fn source(&self) -> MatchSource {
        MatchSource::ManualProvincia
    }

    fn attempt(&self, query: &LocalityQuery, ctx: &MatchContext<'_>) -> Option<Coordinates> {
        if !query.has_province_key() {
            return None;
        }
        ctx.overrides.provincia(&query.norm_province)
    }
}

struct ExactComuneProvinciaStrategy;

impl MatchStrategy for ExactComuneProvinciaStrategy {
    fn source(&self) -> MatchSource {
        MatchSource::ExactComuneProvincia
    }

    fn attempt(&self, query: &LocalityQuery, ctx: &MatchContext<'_>) -> Option<Coordinates> {
        if !query.has_comune_key() || !query.has_province_key() {
            return None;
        }
        ctx.gazetteer
            .comune_matches(&query.norm_comune)
            .iter()
            .map(|&index| ctx.gazetteer.entry(index))
            .find(|entry| entry.norm_provincia == query.norm_province)
            .map(|entry| Coordinates {
                lat: entry.lat,
                lon: entry.lon,
            })
    }
}

struct ExactComuneStrategy;

impl MatchStrategy for ExactComuneStrategy {
    fn source(&self) -> MatchSource {
        MatchSource::ExactComune
    }

    fn attempt(&self, query: &LocalityQuery, ctx: &MatchContext<'_>) -> Option<Coordinates> {
        if !query.has_comune_key() {
            return None;
        }
        ctx.gazetteer
            .comune_matches(&query.norm_comune)
            .first()
            .map(|&index| {
                let entry = ctx.gazetteer.entry(index);
                Coordinates {
                    lat: entry.lat,
                    lon: entry.lon,
                }
            })
    }
}

struct ExactProvinciaStrategy;

impl MatchStrategy for ExactProvinciaStrategy {
    fn source(&self) -> MatchSource {
        MatchSource::ExactProvincia
    }

    fn attempt(&self, query: &LocalityQuery, ctx: &MatchContext<'_>) -> Option<Coordinates> {
        if !query.has_province_key() {
            return None;
        }
        // One-to-many key: the first entry in load order represents the
        // province, keeping repeated runs byte-identical.
        ctx.gazetteer
            .provincia_matches(&query.norm_province)
            .first()
            .map(|&index| {
                let entry = ctx.gazetteer.entry(index);
                Coordinates {
                    lat: entry.lat,
                    lon: entry.lon,
                }
            })
    }
}

/// Best score across the four scorers, provided at least one clears its own
/// cutoff. `None` when the candidate fails every cutoff.
fn multi_scorer_score(query: &str, candidate: &str, config: &ResolverConfig) -> Option<f64> {
    let plain = ratio(query, candidate);
    let token_sort = token_sort_ratio(query, candidate);
    let token_set = token_set_ratio(query, candidate);
    let partial = partial_ratio(query, candidate);

    let above_cutoff = plain >= config.ratio_cutoff
        || token_sort >= config.token_sort_cutoff
        || token_set >= config.token_set_cutoff
        || partial >= config.partial_cutoff;
    if !above_cutoff {
        return None;
    }
    Some(plain.max(token_sort).max(token_set).max(partial))
}

struct FuzzyComuneStrategy;

impl MatchStrategy for FuzzyComuneStrategy {
    fn source(&self) -> MatchSource {
        MatchSource::FuzzyComune
    }

    fn attempt(&self, query: &LocalityQuery, ctx: &MatchContext<'_>) -> Option<Coordinates> {
        if !query.has_comune_key() {
            return None;
        }
        // Strict improvement only: on equal scores the earlier gazetteer
        // entry keeps the win, which makes tie-breaks deterministic.
        let mut best: Option<(f64, usize)> = None;
        for (index, entry) in ctx.gazetteer.entries().iter().enumerate() {
            let Some(score) = multi_scorer_score(&query.norm_comune, &entry.norm_comune, ctx.config)
            else {
                continue;
            };
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, index));
            }
        }
        best.map(|(score, index)| {
            let entry = ctx.gazetteer.entry(index);
            trace!(
                record_id = %query.record_id,
                comune = %entry.comune,
                score,
                "fuzzy comune candidate accepted"
            );
            Coordinates {
                lat: entry.lat,
                lon: entry.lon,
            }
        })
    }
}

/// Tokens that are long enough to be distinctive but are generic place-name
/// vocabulary; they never seed a fragment search on their own.
const FRAGMENT_STOPWORDS: [&str; 8] = [
    "comune",
    "paese",
    "localita",
    "frazione",
    "provincia",
    "parrocchia",
    "paroquia",
    "italia",
];

struct FragmentComuneStrategy;

impl MatchStrategy for FragmentComuneStrategy {
    fn source(&self) -> MatchSource {
        MatchSource::FragmentComune
    }

    fn attempt(&self, query: &LocalityQuery, ctx: &MatchContext<'_>) -> Option<Coordinates> {
        if !query.has_comune_key() {
            return None;
        }
        let fragments: Vec<&str> = query
            .norm_comune
            .split_whitespace()
            .filter(|token| token.chars().count() >= ctx.config.min_fragment_len)
            .filter(|token| !FRAGMENT_STOPWORDS.contains(token))
            .collect();
        if fragments.is_empty() {
            return None;
        }

        let mut best: Option<(f64, usize)> = None;
        for (index, entry) in ctx.gazetteer.entries().iter().enumerate() {
            // The fragment itself is scored against the candidate; the full
            // query text has already failed every fuzzy cutoff by the time
            // this rung runs.
            let mut score: Option<f64> = None;
            for fragment in &fragments {
                if !entry.norm_comune.contains(fragment) {
                    continue;
                }
                let fragment_score = partial_ratio(fragment, &entry.norm_comune);
                score = Some(score.map_or(fragment_score, |s: f64| s.max(fragment_score)));
            }
            let Some(score) = score else {
                continue;
            };
            if score < ctx.config.fragment_cutoff {
                continue;
            }
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, index));
            }
        }
        best.map(|(_, index)| {
            let entry = ctx.gazetteer.entry(index);
            Coordinates {
                lat: entry.lat,
                lon: entry.lon,
            }
        })
    }
}

struct KeywordCityStrategy;

impl MatchStrategy for KeywordCityStrategy {
    fn source(&self) -> MatchSource {
        MatchSource::KeywordCity
    }

    fn attempt(&self, query: &LocalityQuery, ctx: &MatchContext<'_>) -> Option<Coordinates> {
        // Deliberately scans the raw text: the city often appears inside
        // free-text artifacts that normalization would mangle.
        ctx.keywords
            .find_in(&query.raw_comune)
            .or_else(|| ctx.keywords.find_in(&query.raw_province))
            .map(|(_, coords)| coords)
    }
}

struct FuzzyProvinciaStrategy;

impl MatchStrategy for FuzzyProvinciaStrategy {
    fn source(&self) -> MatchSource {
        MatchSource::FuzzyProvincia
    }

    fn attempt(&self, query: &LocalityQuery, ctx: &MatchContext<'_>) -> Option<Coordinates> {
        if !query.has_province_key() {
            return None;
        }
        let mut best: Option<(f64, usize)> = None;
        for index in ctx.gazetteer.distinct_provincie() {
            let entry = ctx.gazetteer.entry(index);
            let Some(score) =
                multi_scorer_score(&query.norm_province, &entry.norm_provincia, ctx.config)
            else {
                continue;
            };
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, index));
            }
        }
        best.map(|(_, index)| {
            let entry = ctx.gazetteer.entry(index);
            Coordinates {
                lat: entry.lat,
                lon: entry.lon,
            }
        })
    }
}
