use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const APP_ID: &str = "com.toasterrepair.Worldview";

// /all rejects requests that do not name the fields they want
pub const COUNTRIES_API_URL: &str = "https://restcountries.com/v3.1/all?fields=name,flags,capital,region,subregion,languages,currencies,continents,latlng";

pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_LICENSE: &str = "© OpenStreetMap contributors";
pub const LOCATION_ICON_URL: &str = "https://cdn-icons-png.flaticon.com/512/1673/1673221.png";
pub const WORLD_LOGO_URL: &str = "https://cdn-icons-png.flaticon.com/512/1041/1041885.png";
pub const DEFAULT_ZOOM_LEVEL: f64 = 5.0;

/// Placeholder shown for any field the dataset leaves out.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const ORIGIN: Coordinates = Coordinates { latitude: 0.0, longitude: 0.0 };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// A country as shown in the interface, with every optional field resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryRecord {
    pub name: String,
    pub flag_url: String,
    pub capital: String,
    pub region: String,
    pub subregion: String,
    pub continent: String,
    pub languages: String,
    pub currency: String,
    pub coordinates: Coordinates,
}

/// One element of the dataset array as it arrives.
///
/// Every field is decoded on its own: a field of the wrong shape reads as
/// absent and takes its display default, so only a non-object element can
/// fail to decode.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawCountry {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<RawName>,
    #[serde(default, deserialize_with = "lenient")]
    pub flags: Option<RawFlags>,
    #[serde(default, deserialize_with = "lenient")]
    pub capital: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subregion: Option<String>,
    // values stay loose so one null language does not discard the rest
    #[serde(default, deserialize_with = "lenient")]
    pub languages: Option<IndexMap<String, Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub currencies: Option<IndexMap<String, Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub continents: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub latlng: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawName {
    #[serde(default, deserialize_with = "lenient")]
    pub common: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawFlags {
    #[serde(default, deserialize_with = "lenient")]
    pub png: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub svg: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawCurrency {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
}

impl RawCurrency {
    pub fn name_of(value: Value) -> Option<String> {
        serde_json::from_value::<RawCurrency>(value).ok().and_then(|currency| currency.name)
    }
}

/// Reads any JSON value and keeps it only if it converts to `T`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
