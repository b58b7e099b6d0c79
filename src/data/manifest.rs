use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{Dataset, LoadReport, SourceDigest};
use crate::logging::ts_now;

#[derive(Debug, Clone, Serialize)]
pub struct DatasetManifest {
    pub sources: Vec<SourceDigest>,
    pub row_count: u64,
    pub rows_outside_allow_list: u64,
    pub bad_rows: u64,
    pub unmatched_outcome_rows: u64,
    pub sites: Vec<String>,
    pub payload_min: f64,
    pub payload_max: f64,
    pub successes: u64,
    pub warnings: Vec<String>,
    pub generated_at: String,
}

pub fn build_manifest(dataset: &Dataset, report: &LoadReport) -> DatasetManifest {
    let bounds = dataset.payload_bounds();
    DatasetManifest {
        sources: report.sources.clone(),
        row_count: dataset.len() as u64,
        rows_outside_allow_list: report.rows_outside_allow_list,
        bad_rows: report.bad_rows,
        unmatched_outcome_rows: report.unmatched_outcome_rows,
        sites: dataset.sites().to_vec(),
        payload_min: bounds.min,
        payload_max: bounds.max,
        successes: dataset.records().iter().filter(|r| r.outcome.is_success()).count() as u64,
        warnings: report.warnings.clone(),
        generated_at: ts_now(),
    }
}

pub fn default_manifest_path(dataset_path: &Path) -> PathBuf {
    let mut p = dataset_path.to_path_buf();
    let fname = dataset_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset.csv");
    p.set_file_name(format!("{}.manifest.json", fname));
    p
}
