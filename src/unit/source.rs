//! Loaders enumerating units of work from delimited files
//!
//! Malformed rows are skipped with a warning and counted; only an unreadable
//! file or a missing required column is an error.

use crate::unit::{EventCategory, GeoPoint, WorkUnit};
use crate::UnitError;
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

/// Outcome counters of a unit load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Valid, distinct units returned
    pub loaded: usize,
    /// Rows skipped for missing or malformed fields
    pub invalid: usize,
    /// Rows skipped because their key was already seen
    pub duplicates: usize,
}

/// Loads geographic points from a CSV with `name,country,lat,lng` columns
///
/// # Arguments
///
/// * `path` - The delimited file (header row required)
/// * `limit` - Keep only the first N valid units
pub fn load_points(
    path: &Path,
    limit: Option<usize>,
) -> Result<(Vec<GeoPoint>, LoadReport), UnitError> {
    load_units(path, limit, &["name", "country", "lat", "lng"], |fields| {
        let point = GeoPoint::new(fields[0], fields[1], fields[2].trim(), fields[3].trim());
        point.is_valid().then_some(point)
    })
}

/// Loads unique `(eventId, categoryId)` pairs from a consolidated events dataset
pub fn load_event_pairs(
    path: &Path,
    limit: Option<usize>,
) -> Result<(Vec<EventCategory>, LoadReport), UnitError> {
    load_units(path, limit, &["eventId", "categoryId"], |fields| {
        let unit = EventCategory::new(fields[0].trim(), fields[1].trim());
        unit.is_valid().then_some(unit)
    })
}

fn load_units<U, F>(
    path: &Path,
    limit: Option<usize>,
    columns: &[&str],
    build: F,
) -> Result<(Vec<U>, LoadReport), UnitError>
where
    U: WorkUnit,
    F: Fn(&[&str]) -> Option<U>,
{
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let indices = column_indices(&headers, columns)?;

    let mut units = Vec::new();
    let mut seen = HashSet::new();
    let mut report = LoadReport::default();

    for (row_num, record) in reader.records().enumerate() {
        if limit.is_some_and(|max| units.len() >= max) {
            break;
        }

        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping unreadable row {} in {}: {}", row_num + 1, path.display(), e);
                report.invalid += 1;
                continue;
            }
        };

        let fields: Vec<&str> = indices
            .iter()
            .map(|&idx| record.get(idx).unwrap_or(""))
            .collect();

        let Some(unit) = build(&fields) else {
            tracing::warn!("Skipping invalid unit at row {}: {:?}", row_num + 1, fields);
            report.invalid += 1;
            continue;
        };

        if !seen.insert(unit.key()) {
            report.duplicates += 1;
            continue;
        }

        units.push(unit);
    }

    report.loaded = units.len();
    tracing::info!(
        "Loaded {} units from {} ({} invalid, {} duplicate)",
        report.loaded,
        path.display(),
        report.invalid,
        report.duplicates
    );

    Ok((units, report))
}

fn column_indices(headers: &StringRecord, columns: &[&str]) -> Result<Vec<usize>, UnitError> {
    columns
        .iter()
        .map(|name| {
            headers
                .iter()
                .position(|h| h == *name)
                .ok_or_else(|| UnitError::MissingColumn(name.to_string()))
        })
        .collect()
}
