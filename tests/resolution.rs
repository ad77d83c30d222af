use std::fs;

use tempfile::tempdir;

use comune_geocoder::{
    normalize, Gazetteer, KeywordTable, LocalityQuery, MatchSource, OverrideTable,
    ResolutionReport, Resolver, ResolverConfig,
};

const SAMPLE_GAZETTEER: &str = r#"[
    {"comune": "Oderzo", "provincia": "Treviso", "lat": 45.78, "lon": 12.49},
    {"comune": "Motta di Livenza", "provincia": "Treviso", "lat": 45.78, "lon": 12.61},
    {"comune": "San Donà di Piave", "provincia": "Venezia", "lat": 45.63, "lon": 12.57},
    {"comune": "Portogruaro", "provincia": "Venezia", "lat": 45.78, "lon": 12.84},
    {"comune": "Vittorio Veneto", "provincia": "Treviso", "lat": 45.98, "lon": 12.30}
]"#;

fn load_sample_gazetteer() -> Gazetteer {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gazetteer.json");
    fs::write(&path, SAMPLE_GAZETTEER).unwrap();
    Gazetteer::load(&path).unwrap()
}

fn default_resolver() -> Resolver {
    Resolver::new(
        load_sample_gazetteer(),
        OverrideTable::curated(),
        KeywordTable::curated(),
        ResolverConfig::default(),
    )
}

#[test]
fn batch_resolves_through_the_full_cascade() {
    let resolver = default_resolver();
    let batch = resolver.resolve_batch(vec![
        // Stage 1: curated override beats everything downstream.
        LocalityQuery::new("123", "Piavon", ""),
        // Stage 3: verbatim gazetteer pair.
        LocalityQuery::new("2", "Motta di Livenza", "Treviso"),
        // Stage 3 after heavy normalization.
        LocalityQuery::new("456", "Comune di San Donà di Piave VE", "Venezia"),
        // Stage 6: misspelling within fuzzy reach.
        LocalityQuery::new("4", "Portogruario", ""),
        // Stage 8: incidental city mention in free text.
        LocalityQuery::new("5", "registrato presso Milano nel 1910", ""),
        // Terminal unresolved state.
        LocalityQuery::new("6", "xyzabc123", ""),
    ]);

    assert_eq!(batch[0].match_source, MatchSource::ManualComune);
    assert_eq!(batch[0].match_source.as_tag(), "Correção Manual");
    let piavon = batch[0].resolved.unwrap();
    assert_eq!((piavon.lat, piavon.lon), (45.7167, 12.4333));

    assert_eq!(batch[1].match_source, MatchSource::ExactComuneProvincia);
    assert_eq!(batch[2].match_source, MatchSource::ExactComuneProvincia);
    assert_eq!(batch[3].match_source, MatchSource::FuzzyComune);
    assert_eq!(batch[3].resolved.unwrap().lon, 12.84);
    assert_eq!(batch[4].match_source, MatchSource::KeywordCity);
    assert_eq!(batch[5].match_source, MatchSource::Unresolved);
    assert!(batch[5].resolved.is_none());
}

#[test]
fn report_reflects_the_batch() {
    let resolver = default_resolver();
    let batch = resolver.resolve_batch(vec![
        LocalityQuery::new("1", "Oderzo", "Treviso"),
        LocalityQuery::new("2", "xyzabc123", ""),
        LocalityQuery::new("3", "", ""),
    ]);
    let report = ResolutionReport::from_queries(&batch);

    assert_eq!(report.total, 3);
    assert_eq!(report.resolved, 1);
    assert_eq!(report.unresolved, 2);
    assert_eq!(report.unresolved_records, vec!["2", "3"]);

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("unresolved_records"));
}

#[test]
fn override_wins_even_when_gazetteer_contains_the_key() {
    let mut overrides = OverrideTable::empty();
    overrides.insert_comune("oderzo", 1.5, 2.5);
    let resolver = Resolver::new(
        load_sample_gazetteer(),
        overrides,
        KeywordTable::empty(),
        ResolverConfig::default(),
    );

    let result = resolver.resolve(LocalityQuery::new("1", "Oderzo", "Treviso"));
    assert_eq!(result.match_source, MatchSource::ManualComune);
    assert_eq!(result.resolved.unwrap().lat, 1.5);
}

#[test]
fn queries_and_gazetteer_share_one_normalizer() {
    // The gazetteer's normalized keys must equal what a query with the same
    // verbatim text produces, otherwise exact matching silently degrades.
    let gazetteer = load_sample_gazetteer();
    for entry in gazetteer.entries() {
        assert_eq!(entry.norm_comune, normalize(&entry.comune));
        assert_eq!(entry.norm_provincia, normalize(&entry.provincia));
        let query = LocalityQuery::new("id", entry.comune.clone(), entry.provincia.clone());
        assert_eq!(query.norm_comune, entry.norm_comune);
    }
}

#[test]
fn two_runs_produce_identical_output() {
    let inputs = [
        ("1", "Oderzo", "Treviso"),
        ("2", "Odezro", ""),
        ("3", "Vittorio Veneto", ""),
        ("4", "Trevizo", "Trevizo"),
        ("5", "xyzabc123", ""),
    ];
    let run = || {
        let resolver = default_resolver();
        let batch = resolver.resolve_batch(
            inputs
                .iter()
                .map(|(id, c, p)| LocalityQuery::new(*id, *c, *p))
                .collect(),
        );
        batch
            .iter()
            .map(|q| {
                format!(
                    "{};{:?};{}",
                    q.record_id,
                    q.resolved.map(|c| (c.lat, c.lon)),
                    q.match_source.as_tag()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    assert_eq!(run(), run());
}
