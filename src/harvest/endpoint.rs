//! Remote endpoints
//!
//! An endpoint ties a unit type to how its pages are requested, how a page
//! body turns into rows, and which columns those rows fill.

use crate::config::HttpConfig;
use crate::harvest::fetcher::{FetchError, FetchRequest};
use crate::harvest::parser::{cell, parse_document, parse_listing, PageOutcome, ParseError};
use crate::output::ResultRow;
use crate::unit::{EventCategory, GeoPoint, WorkUnit};
use crate::ConfigError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use url::Url;

/// Event fields copied from every explore record, in dataset order
pub const EVENT_FIELDS: &[&str] = &[
    "eventId",
    "name",
    "url",
    "dayOfWeek",
    "formattedDateWithoutYear",
    "formattedTime",
    "venueName",
    "formattedVenueLocation",
    "categoryId",
    "imageUrl",
    "priceClass",
    "isTbd",
    "isDateConfirmed",
    "isTimeConfirmed",
    "eventState",
    "venueId",
    "hasActiveListings",
    "isFavorite",
    "aggregateFavorites",
    "isParkingEvent",
    "isRefetchedGlobalEvent",
    "isUnderHundred",
];

/// Columns of the venue manifest dataset
pub const VENUE_COLUMNS: &[&str] = &[
    "eventId",
    "categoryId",
    "page",
    "recordCount",
    "payloadBytes",
    "fetchedAt",
];

/// A paginated remote resource
pub trait Endpoint: Send + Sync + 'static {
    type Unit: WorkUnit;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Fixed, ordered dataset columns
    fn columns(&self) -> Vec<&'static str>;

    /// Request for `page` of `unit`
    ///
    /// `Ok(None)` means the unit has no page at this cursor; the walker
    /// treats it as end of unit without fetching.
    fn build_request(&self, unit: &Self::Unit, page: u32)
        -> Result<Option<FetchRequest>, FetchError>;

    /// Decodes one page body
    fn parse(&self, unit: &Self::Unit, page: u32, body: &str) -> Result<PageOutcome, ParseError>;
}

fn parse_base_url(http: &HttpConfig) -> Result<Url, ConfigError> {
    Url::parse(&http.base_url).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", http.base_url, e)))
}

fn endpoint_url(base: &Url, path: &str, params: &[(&str, &str)]) -> Result<Url, FetchError> {
    let raw = format!("{}/{}", base.as_str().trim_end_matches('/'), path);
    Url::parse_with_params(&raw, params)
        .map_err(|e| FetchError::Fatal(format!("Cannot build URL {}: {}", raw, e)))
}

/// Explore listing: events around a geographic point, one page per request
pub struct ExploreEndpoint {
    base: Url,
}

impl ExploreEndpoint {
    pub fn new(http: &HttpConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            base: parse_base_url(http)?,
        })
    }
}

impl Endpoint for ExploreEndpoint {
    type Unit = GeoPoint;

    fn name(&self) -> &'static str {
        "explore"
    }

    fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec!["city", "country", "page"];
        columns.extend_from_slice(EVENT_FIELDS);
        columns
    }

    fn build_request(&self, unit: &GeoPoint, page: u32) -> Result<Option<FetchRequest>, FetchError> {
        let lat = STANDARD.encode(unit.lat.as_bytes());
        let lon = STANDARD.encode(unit.lng.as_bytes());
        let page = page.to_string();

        let url = endpoint_url(
            &self.base,
            "explore",
            &[
                ("method", "getExploreEvents"),
                ("lat", &lat),
                ("lon", &lon),
                ("page", &page),
            ],
        )?;

        Ok(Some(FetchRequest::get(url)))
    }

    fn parse(&self, unit: &GeoPoint, page: u32, body: &str) -> Result<PageOutcome, ParseError> {
        let listing = parse_listing(body)?;
        if listing.is_end_of_unit() {
            return Ok(PageOutcome::EndOfUnit);
        }

        let page = page.to_string();
        let rows = listing
            .records
            .iter()
            .map(|record| {
                EVENT_FIELDS.iter().fold(
                    ResultRow::new()
                        .with("city", unit.name.as_str())
                        .with("country", unit.country.as_str())
                        .with("page", page.as_str()),
                    |row, field| row.with(*field, cell(record.get(*field))),
                )
            })
            .collect();

        Ok(PageOutcome::Rows(rows))
    }
}

/// Venue map lookup: one POST per event/category pair
///
/// The full payload is kept as a raw artifact; the dataset receives one
/// manifest row per pair.
pub struct VenueMapEndpoint {
    base: Url,
}

impl VenueMapEndpoint {
    pub fn new(http: &HttpConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            base: parse_base_url(http)?,
        })
    }
}

impl Endpoint for VenueMapEndpoint {
    type Unit = EventCategory;

    fn name(&self) -> &'static str {
        "venue-map"
    }

    fn columns(&self) -> Vec<&'static str> {
        VENUE_COLUMNS.to_vec()
    }

    fn build_request(
        &self,
        unit: &EventCategory,
        page: u32,
    ) -> Result<Option<FetchRequest>, FetchError> {
        if page > 0 {
            return Ok(None);
        }
        if !unit.is_valid() {
            return Err(FetchError::Fatal(format!(
                "Invalid event/category pair {}",
                unit.key()
            )));
        }

        let url = endpoint_url(
            &self.base,
            &format!("Browse/VenueMap/GetVenueMapSeatingConfig/{}", unit.event_id),
            &[("categoryId", unit.category_id.as_str())],
        )?;
        let body = format!(
            "categoryId={}&withFees=true&withSeats=false",
            unit.category_id
        );

        Ok(Some(FetchRequest::post_form(url, body)))
    }

    fn parse(&self, unit: &EventCategory, page: u32, body: &str) -> Result<PageOutcome, ParseError> {
        let record_count = match parse_document(body)? {
            Value::Object(map) if !map.is_empty() => map.len(),
            Value::Array(items) if !items.is_empty() => items.len(),
            _ => {
                return Err(ParseError::UnexpectedShape(
                    "venue map is empty or not a JSON object/array".to_string(),
                ))
            }
        };

        let row = ResultRow::new()
            .with("eventId", unit.event_id.as_str())
            .with("categoryId", unit.category_id.as_str())
            .with("page", page.to_string())
            .with("recordCount", record_count.to_string())
            .with("payloadBytes", body.len().to_string())
            .with("fetchedAt", chrono::Utc::now().to_rfc3339());

        Ok(PageOutcome::Rows(vec![row]))
    }
}
