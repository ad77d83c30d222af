use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::resolver::Coordinates;

/// Source label attached to comune-level manual corrections, carried through
/// to the output as the match tag.
pub const COMUNE_OVERRIDE_LABEL: &str = "Correção Manual";
/// Source label attached to province-level manual corrections.
pub const PROVINCIA_OVERRIDE_LABEL: &str = "Correção Província";

/// One curated correction: normalized key, coordinates, human-readable
/// source label.
#[derive(Debug, Clone, Copy)]
pub struct ManualOverride {
    pub key: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub label: &'static str,
}

/// Small localities and renamed parishes the automated cascade cannot
/// resolve reliably. Keys are already in normalized form; they are matched
/// against `norm_comune` verbatim.
static COMUNE_OVERRIDES: Lazy<Vec<ManualOverride>> = Lazy::new(|| {
    [
        ("piavon", 45.7167, 12.4333),
        ("lutrano", 45.7789, 12.3431),
        ("campodipietra", 45.7206, 12.4069),
        ("fossalta maggiore", 45.7839, 12.5331),
        ("levada", 45.7406, 12.4522),
        ("busco", 45.7294, 12.4625),
        ("faro", 45.7542, 12.4211),
        ("fae", 45.7644, 12.4342),
        ("cavalier", 45.7636, 12.3917),
        ("camino", 45.7608, 12.4761),
        ("navole", 45.7458, 12.5067),
        ("stabiuzzo", 45.7183, 12.3856),
    ]
    .into_iter()
    .map(|(key, lat, lon)| ManualOverride {
        key,
        lat,
        lon,
        label: COMUNE_OVERRIDE_LABEL,
    })
    .collect()
});

/// Province-level fallbacks consulted after the comune-level pass. These are
/// historical provinces of ceded territories that no current gazetteer
/// carries, which is why they need curated coordinates at all.
static PROVINCIA_OVERRIDES: Lazy<Vec<ManualOverride>> = Lazy::new(|| {
    [
        ("istria", 45.2406, 13.9361),
        ("dalmazia", 43.5081, 16.4402),
        ("venezia giulia", 45.6495, 13.7768),
        ("fiume", 45.3271, 14.4422),
        ("zara", 44.1194, 15.2314),
        ("pola", 44.8666, 13.8496),
    ]
    .into_iter()
    .map(|(key, lat, lon)| ManualOverride {
        key,
        lat,
        lon,
        label: PROVINCIA_OVERRIDE_LABEL,
    })
    .collect()
});

/// The manual override table, checked before any computed strategy: first by
/// comune key, then by province key. Injected into the resolver so tests can
/// substitute their own corrections.
#[derive(Debug, Default, Clone)]
pub struct OverrideTable {
    by_comune: HashMap<String, Coordinates>,
    by_provincia: HashMap<String, Coordinates>,
}

impl OverrideTable {
    /// The curated, version-controlled table.
    pub fn curated() -> Self {
        let mut table = Self::default();
        for entry in COMUNE_OVERRIDES.iter() {
            table.insert_comune(entry.key, entry.lat, entry.lon);
        }
        for entry in PROVINCIA_OVERRIDES.iter() {
            table.insert_provincia(entry.key, entry.lat, entry.lon);
        }
        table
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert_comune(&mut self, key: &str, lat: f64, lon: f64) {
        self.by_comune.insert(key.to_string(), Coordinates { lat, lon });
    }

    pub fn insert_provincia(&mut self, key: &str, lat: f64, lon: f64) {
        self.by_provincia
            .insert(key.to_string(), Coordinates { lat, lon });
    }

    pub fn comune(&self, norm_comune: &str) -> Option<Coordinates> {
        self.by_comune.get(norm_comune).copied()
    }

    pub fn provincia(&self, norm_provincia: &str) -> Option<Coordinates> {
        self.by_provincia.get(norm_provincia).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_comune.is_empty() && self.by_provincia.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curated_table_contains_known_frazioni() {
        let table = OverrideTable::curated();
        let piavon = table.comune("piavon").unwrap();
        assert_eq!(piavon.lat, 45.7167);
        assert_eq!(piavon.lon, 12.4333);
        assert!(table.provincia("istria").is_some());
        assert!(table.provincia("treviso").is_none());
    }

    #[test]
    fn empty_table_never_matches() {
        let table = OverrideTable::empty();
        assert!(table.is_empty());
        assert!(table.comune("piavon").is_none());
        assert!(table.provincia("istria").is_none());
    }

    #[test]
    fn curated_keys_are_already_normalized() {
        for entry in COMUNE_OVERRIDES.iter().chain(PROVINCIA_OVERRIDES.iter()) {
            assert_eq!(crate::normalize::normalize(entry.key), entry.key);
        }
    }
}
