//! Response body decoding
//!
//! Turns a raw JSON body into the pieces the endpoints need: a listing page
//! (record list plus declared total) or a whole document, and renders JSON
//! values as dataset cells.

use crate::output::ResultRow;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur while decoding a page
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Empty response body")]
    EmptyBody,

    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),
}

/// What one page contributed to its unit
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// Zero or more records; an empty list is not a stop signal
    Rows(Vec<ResultRow>),

    /// The unit has no more pages
    EndOfUnit,
}

/// One decoded page of a paginated listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage {
    pub records: Vec<Map<String, Value>>,

    /// Declared total, when the service sends one
    pub total: Option<u64>,
}

impl ListingPage {
    /// End of unit: no records AND a declared total of zero (or none at all)
    ///
    /// An empty page with a positive total is only a gap, pagination goes on.
    pub fn is_end_of_unit(&self) -> bool {
        self.records.is_empty() && self.total.unwrap_or(0) == 0
    }
}

/// Decodes a listing body
///
/// Records are read from `events`, falling back to `records`. Non-object
/// entries in the list are ignored.
pub fn parse_listing(body: &str) -> Result<ListingPage, ParseError> {
    let document = parse_document(body)?;
    let Value::Object(mut object) = document else {
        return Err(ParseError::UnexpectedShape(
            "listing body is not a JSON object".to_string(),
        ));
    };

    let list = match object.remove("events") {
        Some(list) => list,
        None => object
            .remove("records")
            .ok_or(ParseError::MissingField("events"))?,
    };

    let records = match list {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            return Err(ParseError::UnexpectedShape(format!(
                "record list is {}",
                json_type(&other)
            )))
        }
    };

    let total = object.get("total").and_then(declared_total);

    Ok(ListingPage { records, total })
}

/// Decodes a whole JSON document, rejecting blank bodies
pub fn parse_document(body: &str) -> Result<Value, ParseError> {
    if body.trim().is_empty() {
        return Err(ParseError::EmptyBody);
    }
    Ok(serde_json::from_str(body)?)
}

/// Renders a JSON value as one dataset cell
///
/// `null` and missing values become an empty cell, strings are written
/// unquoted, everything else uses its JSON form.
pub fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Reads a declared total that may arrive as a number or a numeric string
fn declared_total(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
