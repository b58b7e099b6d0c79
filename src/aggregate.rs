//! Group-by summaries over launch records.
//!
//! Every function here is pure; groups come out in first-appearance order
//! unless a sort is stated.

use serde::Serialize;
use std::collections::HashMap;

use crate::data::{Dataset, LaunchRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteSuccessRate {
    pub site: String,
    pub total_launches: usize,
    pub successes: usize,
    /// Mean outcome class scaled to 0..=100.
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessRateTable {
    pub rows: Vec<SiteSuccessRate>,
}

impl SuccessRateTable {
    pub fn get(&self, site: &str) -> Option<&SiteSuccessRate> {
        self.rows.iter().find(|r| r.site == site)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub successes: usize,
    pub failures: usize,
}

impl OutcomeCounts {
    pub fn total(&self) -> usize {
        self.successes + self.failures
    }

    fn add(&mut self, record: &LaunchRecord) {
        if record.outcome.is_success() {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoosterCounts {
    pub booster: String,
    pub counts: OutcomeCounts,
}

/// Groups by a string key, keeping first-appearance order.
fn group_outcomes<'a, I, F>(records: I, key: F) -> Vec<(String, OutcomeCounts)>
where
    I: IntoIterator<Item = &'a LaunchRecord>,
    F: Fn(&LaunchRecord) -> &str,
{
    let mut order: Vec<(String, OutcomeCounts)> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();
    for r in records {
        let k = key(r);
        let i = match slot.get(k) {
            Some(&i) => i,
            None => {
                slot.insert(k.to_string(), order.len());
                order.push((k.to_string(), OutcomeCounts::default()));
                order.len() - 1
            }
        };
        order[i].1.add(r);
    }
    order
}

/// Per-site launch count and success rate, sorted by rate descending.
/// Ties keep first-appearance order.
pub fn compute_success_rates(dataset: &Dataset) -> SuccessRateTable {
    success_rates_of(dataset.records())
}

pub fn success_rates_of<'a, I>(records: I) -> SuccessRateTable
where
    I: IntoIterator<Item = &'a LaunchRecord>,
{
    let mut rows: Vec<SiteSuccessRate> = group_outcomes(records, |r| r.site.as_str())
        .into_iter()
        .map(|(site, c)| SiteSuccessRate {
            site,
            total_launches: c.total(),
            successes: c.successes,
            success_rate: c.successes as f64 / c.total() as f64 * 100.0,
        })
        .collect();
    rows.sort_by(|a, b| b.success_rate.total_cmp(&a.success_rate));
    SuccessRateTable { rows }
}

/// Successful launches per site.
pub fn success_counts_by_site(subset: &[&LaunchRecord]) -> Vec<(String, usize)> {
    group_outcomes(subset.iter().copied(), |r| r.site.as_str())
        .into_iter()
        .map(|(site, c)| (site, c.successes))
        .collect()
}

pub fn outcome_breakdown(subset: &[&LaunchRecord]) -> OutcomeCounts {
    let mut counts = OutcomeCounts::default();
    for r in subset {
        counts.add(r);
    }
    counts
}

pub fn booster_breakdown(subset: &[&LaunchRecord]) -> Vec<BoosterCounts> {
    group_outcomes(subset.iter().copied(), |r| r.booster.as_str())
        .into_iter()
        .map(|(booster, counts)| BoosterCounts { booster, counts })
        .collect()
}
