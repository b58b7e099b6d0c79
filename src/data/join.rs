use std::collections::HashMap;

use super::schema::Column;
use super::{Outcome, ParsedTable, RawRow};
use crate::logging::{log, obj, v_str, Domain, Level};

type JoinKey = (String, Option<u32>);

fn key_of(row: &RawRow, by_flight: bool) -> JoinKey {
    let flight = if by_flight { row.flight_number } else { None };
    (row.site.clone(), flight)
}

fn coalesce_outcome(
    from_outcomes: Option<Outcome>,
    from_meta: Option<Outcome>,
    site: &str,
    warnings: &mut Vec<String>,
) -> Option<Outcome> {
    match (from_outcomes, from_meta) {
        (Some(a), Some(b)) if a != b => {
            warnings.push(format!(
                "outcome_conflict: site={} outcome_table={} metadata={}",
                site,
                a.class(),
                b.class()
            ));
            Some(a)
        }
        (Some(a), _) => Some(a),
        (None, b) => b,
    }
}

#[derive(Debug, Default)]
pub struct JoinedRows {
    pub rows: Vec<RawRow>,
    /// Outcome-table rows whose key matched no metadata row.
    pub unmatched_outcome_rows: u64,
}

/// Left join from the metadata table onto the outcome table, keyed by
/// canonical site (and flight number when both tables carry one).
///
/// Every metadata row survives; a row with several matches fans out in
/// outcome-table order. Outcome-table values win for payload, booster and
/// class, metadata values fill the gaps. Outcome rows no metadata row
/// reaches are counted and reported as a warning.
pub fn left_join(meta: &ParsedTable, outcomes: &ParsedTable, warnings: &mut Vec<String>) -> JoinedRows {
    let by_flight = meta.columns.has(Column::FlightNumber) && outcomes.columns.has(Column::FlightNumber);
    let mut index: HashMap<JoinKey, Vec<usize>> = HashMap::new();
    for (i, row) in outcomes.rows.iter().enumerate() {
        index.entry(key_of(row, by_flight)).or_default().push(i);
    }

    let mut joined = Vec::with_capacity(meta.rows.len());
    let mut reached = vec![false; outcomes.rows.len()];
    let mut unmatched = 0u64;
    for m in &meta.rows {
        let Some(matches) = index.get(&key_of(m, by_flight)) else {
            unmatched += 1;
            joined.push(m.clone());
            continue;
        };
        for &i in matches {
            reached[i] = true;
            let o = &outcomes.rows[i];
            joined.push(RawRow {
                flight_number: m.flight_number.or(o.flight_number),
                site: m.site.clone(),
                payload_kg: o.payload_kg.or(m.payload_kg),
                booster: o.booster.clone().or_else(|| m.booster.clone()),
                outcome: coalesce_outcome(o.outcome, m.outcome, &m.site, warnings),
                lat: m.lat.or(o.lat),
                long: m.long.or(o.long),
            });
        }
    }

    let unmatched_outcome_rows = reached.iter().filter(|r| !**r).count() as u64;
    if unmatched_outcome_rows > 0 {
        warnings.push(format!(
            "unmatched_outcome_rows: {} rows in {} matched no row in {}",
            unmatched_outcome_rows, outcomes.location, meta.location
        ));
    }

    log(
        Level::Info,
        Domain::Data,
        "join",
        obj(&[
            ("metadata", v_str(&meta.location)),
            ("outcomes", v_str(&outcomes.location)),
            ("key", v_str(if by_flight { "site+flight" } else { "site" })),
            ("rows", serde_json::json!(joined.len())),
            ("unmatched_metadata_rows", serde_json::json!(unmatched)),
            ("unmatched_outcome_rows", serde_json::json!(unmatched_outcome_rows)),
        ]),
    );
    JoinedRows {
        rows: joined,
        unmatched_outcome_rows,
    }
}
