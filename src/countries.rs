use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::data::{Coordinates, CountryRecord, RawCountry, RawCurrency, NOT_AVAILABLE};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("could not decode country dataset: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The loaded, name-sorted country list. Replaced wholesale, never edited in place.
#[derive(Debug, Default)]
pub struct Catalog {
    records: Vec<Rc<CountryRecord>>,
}

impl Catalog {
    pub fn replace(&mut self, records: Vec<CountryRecord>) {
        self.records = records.into_iter().map(Rc::new).collect();
    }

    pub fn find(&self, name: &str) -> Option<Rc<CountryRecord>> {
        self.records.iter().find(|record| record.name == name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Stores a finished fetch in the catalog. A failed fetch is logged and
/// leaves whatever the catalog already held. Returns whether anything changed.
pub fn apply_fetch_result(catalog: &mut Catalog, result: Result<Vec<CountryRecord>, FetchError>) -> bool {
    match result {
        Ok(records) => {
            info!(count = records.len(), "loaded country dataset");
            catalog.replace(records);
            true
        }
        Err(e) => {
            error!(error = %e, "error fetching countries");
            false
        }
    }
}

pub async fn fetch_countries(client: &reqwest::Client, url: &str) -> Result<Vec<CountryRecord>, FetchError> {
    info!(%url, "fetching country dataset");

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    let text = response.text().await?;
    parse_dataset(&text)
}

/// Decodes the dataset body into sorted records.
///
/// The body must be a JSON array. Elements that are not objects, or that
/// carry no common name, are skipped rather than failing the whole load.
/// Badly shaped fields inside an element fall back to their defaults.
pub fn parse_dataset(text: &str) -> Result<Vec<CountryRecord>, FetchError> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(text)?;

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<RawCountry>(entry) {
            Ok(raw) => match normalize(raw) {
                Some(record) => records.push(record),
                None => debug!(index, "skipping country without a name"),
            },
            Err(e) => warn!(index, error = %e, "skipping malformed country entry"),
        }
    }

    sort_by_name(&mut records);
    Ok(records)
}

pub fn normalize(raw: RawCountry) -> Option<CountryRecord> {
    let name = raw.name.and_then(|n| n.common).filter(|n| !n.is_empty())?;

    let flag_url = raw
        .flags
        .and_then(|flags| non_empty(flags.png).or_else(|| non_empty(flags.svg)))
        .unwrap_or_default();

    let languages = match raw.languages {
        Some(languages) => languages
            .into_values()
            .filter_map(|language| match language {
                serde_json::Value::String(name) => Some(name),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(", "),
        None => NOT_AVAILABLE.to_string(),
    };

    let currency = match raw.currencies {
        Some(currencies) => currencies
            .into_values()
            .filter_map(RawCurrency::name_of)
            .collect::<Vec<_>>()
            .join(", "),
        None => NOT_AVAILABLE.to_string(),
    };

    let coordinates = match raw.latlng.as_deref() {
        Some([latitude, longitude, ..]) => Coordinates::new(*latitude, *longitude),
        _ => Coordinates::ORIGIN,
    };

    Some(CountryRecord {
        name,
        flag_url,
        capital: first_or_sentinel(raw.capital),
        region: raw.region.unwrap_or_default(),
        subregion: non_empty(raw.subregion).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        continent: first_or_sentinel(raw.continents),
        languages,
        currency,
        coordinates,
    })
}

pub fn sort_by_name(records: &mut [CountryRecord]) {
    records.sort_by_cached_key(|record| (collation_key(&record.name), record.name.clone()));
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn first_or_sentinel(values: Option<Vec<String>>) -> String {
    non_empty(values.and_then(|v| v.into_iter().next())).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Primary sort key: lowercase with Latin diacritics removed, so that
/// "Åland Islands" sorts among the A's and "Côte d'Ivoire" among the C's.
fn collation_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in name.chars() {
        match fold_latin(c) {
            Some(base) => key.push_str(base),
            None => key.extend(c.to_lowercase()),
        }
    }
    key
}

fn fold_latin(c: char) -> Option<&'static str> {
    let base = match c {
        'À'..='Å' | 'à'..='å' | 'Ā'..='ą' => "a",
        'Æ' | 'æ' => "ae",
        'Ç' | 'ç' | 'Ć'..='č' => "c",
        'Ď'..='đ' => "d",
        'È'..='Ë' | 'è'..='ë' | 'Ē'..='ě' => "e",
        'Ĝ'..='ģ' => "g",
        'Ĥ'..='ħ' => "h",
        'Ì'..='Ï' | 'ì'..='ï' | 'Ĩ'..='ı' => "i",
        'Ĵ' | 'ĵ' => "j",
        'Ķ' | 'ķ' => "k",
        'Ĺ'..='ł' => "l",
        'Ñ' | 'ñ' | 'Ń'..='ň' => "n",
        'Ò'..='Ö' | 'Ø' | 'ò'..='ö' | 'ø' | 'Ō'..='ő' => "o",
        'Œ' | 'œ' => "oe",
        'Ŕ'..='ř' => "r",
        'Ś'..='š' => "s",
        'ß' => "ss",
        'Ţ'..='ŧ' => "t",
        'Ù'..='Ü' | 'ù'..='ü' | 'Ũ'..='ų' => "u",
        'Ŵ' | 'ŵ' => "w",
        'Ý' | 'ý' | 'ÿ' | 'Ŷ'..='Ÿ' => "y",
        'Ź'..='ž' => "z",
        _ => return None,
    };
    Some(base)
}
