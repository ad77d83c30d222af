use once_cell::sync::Lazy;

use crate::resolver::Coordinates;

/// A major Italian city recognized anywhere in the raw query text. This
/// exists for free-text artifacts where a city is mentioned incidentally
/// rather than filled in as a structured field.
#[derive(Debug, Clone, Copy)]
pub struct KeywordCity {
    pub keyword: &'static str,
    pub lat: f64,
    pub lon: f64,
}

static KEYWORD_CITIES: Lazy<Vec<KeywordCity>> = Lazy::new(|| {
    [
        ("roma", 41.9028, 12.4964),
        ("milano", 45.4642, 9.1900),
        ("napoli", 40.8518, 14.2681),
        ("torino", 45.0703, 7.6869),
        ("venezia", 45.4408, 12.3155),
        ("firenze", 43.7696, 11.2558),
        ("bologna", 44.4949, 11.3426),
        ("genova", 44.4056, 8.9463),
        ("palermo", 38.1157, 13.3615),
        ("verona", 45.4384, 10.9916),
        ("padova", 45.4064, 11.8768),
        ("treviso", 45.6669, 12.2430),
        ("trieste", 45.6495, 13.7768),
        ("bari", 41.1171, 16.8719),
    ]
    .into_iter()
    .map(|(keyword, lat, lon)| KeywordCity { keyword, lat, lon })
    .collect()
});

/// Fixed table of well-known cities, scanned in declaration order.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    cities: Vec<KeywordCity>,
}

impl KeywordTable {
    pub fn curated() -> Self {
        Self {
            cities: KEYWORD_CITIES.clone(),
        }
    }

    pub fn empty() -> Self {
        Self { cities: Vec::new() }
    }

    /// First city whose keyword appears in `raw_text` on word boundaries.
    /// Boundary matching keeps a comune that merely contains a city name
    /// inside a longer word ("Romano d'Ezzelino") from hitting the table.
    pub fn find_in(&self, raw_text: &str) -> Option<(&'static str, Coordinates)> {
        let lowered = raw_text.to_lowercase();
        self.cities
            .iter()
            .find(|city| contains_word(&lowered, city.keyword))
            .map(|city| {
                (
                    city.keyword,
                    Coordinates {
                        lat: city.lat,
                        lon: city.lon,
                    },
                )
            })
    }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    let mut search_from = 0;
    while let Some(offset) = haystack[search_from..].find(word) {
        let start = search_from + offset;
        let end = start + word.len();
        let boundary_before = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let boundary_after = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if boundary_before && boundary_after {
            return true;
        }
        search_from = end;
    }
    false
}
