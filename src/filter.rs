use serde_json::json;

use crate::data::{Dataset, LaunchRecord};
use crate::logging::{log, obj, v_str, Domain, Level, ProfileScope};
use crate::state::FilterState;

pub fn matches(record: &LaunchRecord, state: &FilterState) -> bool {
    state.payload_range.contains(record.payload_kg) && state.selected_site.admits(&record.site)
}

/// Rows passing both the payload and the site predicate, in dataset order.
pub fn filter<'a>(dataset: &'a Dataset, state: &FilterState) -> Vec<&'a LaunchRecord> {
    let _scope = ProfileScope::new("filter");
    let rows: Vec<&LaunchRecord> = dataset.records().iter().filter(|r| matches(r, state)).collect();
    log(
        Level::Trace,
        Domain::Filter,
        "filtered",
        obj(&[
            ("site", v_str(state.selected_site.as_str())),
            ("payload_min", json!(state.payload_range.min)),
            ("payload_max", json!(state.payload_range.max)),
            ("kept", json!(rows.len())),
            ("total", json!(dataset.len())),
        ]),
    );
    rows
}
