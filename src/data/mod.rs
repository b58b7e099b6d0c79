//! Dataset loading: fetch, schema mapping, optional join, allow-list.

use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

use crate::logging::{log_dataset_loaded, log_rows_skipped, log_source_fetched};
use crate::state::{Config, PayloadRange, SiteSelection, ALL_SITES};

pub mod join;
pub mod manifest;
pub mod schema;
pub mod source;

use schema::{canonical_site, Column, ColumnMap};
pub use source::{open_source, CsvSource, SourceBytes};

// =============================================================================
// Records
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    Failure,
    Success,
}

impl Outcome {
    pub fn from_class(class: u8) -> Option<Self> {
        match class {
            0 => Some(Outcome::Failure),
            1 => Some(Outcome::Success),
            _ => None,
        }
    }

    pub fn class(&self) -> u8 {
        match self {
            Outcome::Failure => 0,
            Outcome::Success => 1,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "Success",
            Outcome::Failure => "Failure",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Outcome::Success => "#2ca02c",
            Outcome::Failure => "#d62728",
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.class())
    }
}

/// One launch. Never mutated after load.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LaunchRecord {
    pub flight_number: Option<u32>,
    pub site: String,
    pub payload_kg: f64,
    pub booster: String,
    pub outcome: Outcome,
    pub lat: Option<f64>,
    pub long: Option<f64>,
}

impl LaunchRecord {
    pub fn new(site: &str, payload_kg: f64, booster: &str, outcome: Outcome) -> Self {
        Self {
            flight_number: None,
            site: site.to_string(),
            payload_kg,
            booster: booster.to_string(),
            outcome,
            lat: None,
            long: None,
        }
    }
}

/// The loaded launches, in source order, plus the facts the controls need.
#[derive(Debug)]
pub struct Dataset {
    records: Box<[LaunchRecord]>,
    sites: Vec<String>,
    payload_bounds: PayloadRange,
}

impl Dataset {
    pub fn from_records(records: Vec<LaunchRecord>) -> Result<Self, LoadError> {
        if records.is_empty() {
            return Err(LoadError::Empty);
        }
        let mut sites: Vec<String> = Vec::new();
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for r in &records {
            if !sites.iter().any(|s| *s == r.site) {
                sites.push(r.site.clone());
            }
            min = min.min(r.payload_kg);
            max = max.max(r.payload_kg);
        }
        Ok(Self {
            records: records.into_boxed_slice(),
            sites,
            payload_bounds: PayloadRange::new(min, max),
        })
    }

    pub fn records(&self) -> &[LaunchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct sites in first-appearance order.
    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    pub fn site_index(&self, site: &str) -> Option<usize> {
        self.sites.iter().position(|s| s == site)
    }

    pub fn payload_bounds(&self) -> PayloadRange {
        self.payload_bounds
    }

    /// Maps a dropdown value onto a selection; `None` for unknown sites.
    pub fn selection(&self, value: &str) -> Option<SiteSelection> {
        let value = value.trim();
        if value.eq_ignore_ascii_case(ALL_SITES) {
            return Some(SiteSelection::All);
        }
        let canonical = canonical_site(value);
        self.site_index(&canonical)
            .map(|i| SiteSelection::Site(self.sites[i].clone()))
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    Unreachable { location: String, reason: String },
    Malformed { location: String, reason: String },
    MissingColumns { location: String, missing: Vec<String> },
    Empty,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Unreachable { location, reason } => {
                write!(f, "source {} unreachable: {}", location, reason)
            }
            LoadError::Malformed { location, reason } => {
                write!(f, "source {} is not valid CSV: {}", location, reason)
            }
            LoadError::MissingColumns { location, missing } => {
                write!(f, "source {} lacks required columns: {}", location, missing.join(", "))
            }
            LoadError::Empty => write!(f, "no launch records left after normalization"),
        }
    }
}

impl std::error::Error for LoadError {}

// =============================================================================
// Parsing
// =============================================================================

/// A row after schema mapping, before required values are enforced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRow {
    pub flight_number: Option<u32>,
    pub site: String,
    pub payload_kg: Option<f64>,
    pub booster: Option<String>,
    pub outcome: Option<Outcome>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub location: String,
    pub columns: ColumnMap,
    pub rows: Vec<RawRow>,
    pub rows_read: u64,
    pub bad_rows: u64,
}

fn parse_f64(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.parse::<f64>().ok()).filter(|v| v.is_finite())
}

fn parse_class(value: Option<&str>) -> Option<Outcome> {
    let v = parse_f64(value)?;
    if v == 0.0 {
        Some(Outcome::Failure)
    } else if v == 1.0 {
        Some(Outcome::Success)
    } else {
        None
    }
}

fn parse_flight(value: Option<&str>) -> Option<u32> {
    let v = value?;
    v.parse::<u32>().ok().or_else(|| {
        v.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64)
            .map(|f| f as u32)
    })
}

/// Reads one CSV source through the schema mapping table.
pub fn parse_table(src: &SourceBytes) -> Result<ParsedTable, LoadError> {
    let malformed = |e: csv::Error| LoadError::Malformed {
        location: src.description.clone(),
        reason: e.to_string(),
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(src.bytes.as_slice());
    let columns = ColumnMap::resolve(reader.headers().map_err(malformed)?);
    if !columns.has(Column::Site) {
        return Err(LoadError::MissingColumns {
            location: src.description.clone(),
            missing: vec![Column::Site.canonical().to_string()],
        });
    }

    let mut rows = Vec::new();
    let mut rows_read = 0u64;
    let mut bad_rows = 0u64;
    for record in reader.records() {
        let record = record.map_err(malformed)?;
        rows_read += 1;
        let site = match columns.field(&record, Column::Site) {
            Some(site) => canonical_site(site),
            None => {
                bad_rows += 1;
                continue;
            }
        };
        rows.push(RawRow {
            flight_number: parse_flight(columns.field(&record, Column::FlightNumber)),
            site,
            payload_kg: parse_f64(columns.field(&record, Column::Payload)).filter(|p| *p >= 0.0),
            booster: columns.field(&record, Column::Booster).map(str::to_string),
            outcome: parse_class(columns.field(&record, Column::Class)),
            lat: parse_f64(columns.field(&record, Column::Lat)),
            long: parse_f64(columns.field(&record, Column::Long)),
        });
    }

    Ok(ParsedTable {
        location: src.description.clone(),
        columns,
        rows,
        rows_read,
        bad_rows,
    })
}

// =============================================================================
// Dataset assembly
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SourceDigest {
    pub location: String,
    pub sha256: String,
    pub bytes: usize,
    pub rows_read: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub sources: Vec<SourceDigest>,
    pub rows_kept: u64,
    pub rows_outside_allow_list: u64,
    pub bad_rows: u64,
    pub unmatched_outcome_rows: u64,
    pub warnings: Vec<String>,
}

pub fn bytes_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn digest(src: &SourceBytes, table: &ParsedTable) -> SourceDigest {
    let sha256 = bytes_sha256(&src.bytes);
    log_source_fetched(&src.description, src.bytes.len(), &sha256);
    SourceDigest {
        location: src.description.clone(),
        sha256,
        bytes: src.bytes.len(),
        rows_read: table.rows_read,
    }
}

fn ensure_required(tables: &[&ParsedTable]) -> Result<(), LoadError> {
    // A column counts as missing only when no table carries it.
    let missing: Vec<String> = tables
        .iter()
        .map(|t| t.columns.missing_required())
        .reduce(|acc, next| acc.into_iter().filter(|c| next.contains(c)).collect())
        .unwrap_or_default()
        .into_iter()
        .map(String::from)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    let location = tables
        .iter()
        .map(|t| t.location.as_str())
        .collect::<Vec<_>>()
        .join(" + ");
    Err(LoadError::MissingColumns { location, missing })
}

/// Builds a dataset from already-fetched bytes.
///
/// With `metadata`, rows come from a left join of `metadata` onto `primary`
/// (see [`join::left_join`]). Sites outside `allowed_sites` are dropped before
/// required values are checked.
pub fn build_dataset(
    primary: &SourceBytes,
    metadata: Option<&SourceBytes>,
    allowed_sites: &[String],
) -> Result<(Dataset, LoadReport), LoadError> {
    let mut report = LoadReport::default();
    let outcomes = parse_table(primary)?;
    report.sources.push(digest(primary, &outcomes));
    report.bad_rows += outcomes.bad_rows;

    let rows = match metadata {
        Some(meta_src) => {
            let meta = parse_table(meta_src)?;
            report.sources.push(digest(meta_src, &meta));
            report.bad_rows += meta.bad_rows;
            ensure_required(&[&outcomes, &meta])?;
            let joined = join::left_join(&meta, &outcomes, &mut report.warnings);
            report.unmatched_outcome_rows = joined.unmatched_outcome_rows;
            log_rows_skipped(&primary.description, "unmatched_outcome_row", joined.unmatched_outcome_rows);
            joined.rows
        }
        None => {
            ensure_required(&[&outcomes])?;
            outcomes.rows
        }
    };

    let allowed: HashSet<&str> = allowed_sites.iter().map(String::as_str).collect();
    let mut records = Vec::with_capacity(rows.len());
    let mut incomplete = 0u64;
    for row in rows {
        if !allowed.contains(row.site.as_str()) {
            report.rows_outside_allow_list += 1;
            continue;
        }
        match (row.payload_kg, row.booster, row.outcome) {
            (Some(payload_kg), Some(booster), Some(outcome)) => records.push(LaunchRecord {
                flight_number: row.flight_number,
                site: row.site,
                payload_kg,
                booster,
                outcome,
                lat: row.lat,
                long: row.long,
            }),
            _ => incomplete += 1,
        }
    }
    report.bad_rows += incomplete;
    if incomplete > 0 {
        report
            .warnings
            .push(format!("incomplete_rows: {} rows lacked payload, booster or class", incomplete));
    }
    report.rows_kept = records.len() as u64;

    let location = primary.description.as_str();
    log_rows_skipped(location, "outside_allow_list", report.rows_outside_allow_list);
    log_rows_skipped(location, "bad_row", report.bad_rows);

    let dataset = Dataset::from_records(records)?;
    let bounds = dataset.payload_bounds();
    log_dataset_loaded(dataset.len(), dataset.sites(), bounds.min, bounds.max);
    Ok((dataset, report))
}

/// Fetches the configured sources and builds the dataset. Blocks startup;
/// there is no retry.
pub async fn load(cfg: &Config) -> Result<(Dataset, LoadReport), LoadError> {
    let primary = open_source(&cfg.data_source, cfg.fetch_timeout_secs)?
        .fetch()
        .await?;
    let metadata = match &cfg.meta_source {
        Some(location) => Some(open_source(location, cfg.fetch_timeout_secs)?.fetch().await?),
        None => None,
    };
    build_dataset(&primary, metadata.as_ref(), &cfg.allowed_sites)
}
