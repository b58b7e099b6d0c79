//! End-to-end dashboard behavior: load, construct, drive with events.

use launchdash::controller::{ControlEvent, Controller};
use launchdash::data::{build_dataset, Dataset, LaunchRecord, Outcome, SourceBytes};
use launchdash::filter::filter;
use launchdash::state::{default_allowed_sites, DashVariant, FilterState, PayloadPreset, PayloadRange, SiteSelection};
use launchdash::view::{ChartData, ChartId};
use std::sync::Arc;

const DASH_CSV: &str = "\
Flight Number,Launch Site,class,Payload Mass (kg),Booster Version,Booster Version Category
1,CCAFS LC-40,0,0,F9 v1.0  B0003,v1.0
2,CCAFS LC-40,0,525,F9 v1.0  B0005,v1.0
3,CCAFS LC-40,0,677,F9 v1.0  B0007,v1.0
6,VAFB SLC-4E,0,500,F9 v1.1  B1003,v1.1
11,CCAFS LC-40,1,3170,F9 v1.1,v1.1
21,KSC LC-39A,1,2490,F9 FT B1031.1,FT
24,KSC LC-39A,1,5300,F9 FT B1034,FT
31,KSC LC-39A,0,3600,F9 FT B1029.2,FT
35,VAFB SLC-4E,1,9600,F9 B4 B1041.1,B4
";

fn loaded() -> Arc<Dataset> {
    let (ds, _) = build_dataset(&SourceBytes::new("dash.csv", DASH_CSV), None, &default_allowed_sites()).unwrap();
    Arc::new(ds)
}

fn pie_labels(c: &Controller) -> Vec<String> {
    match &c.chart(ChartId::SitePie).unwrap().data {
        ChartData::Slices { slices } => slices.iter().map(|s| s.label.clone()).collect(),
        other => panic!("pie expected, got {:?}", other),
    }
}

#[test]
fn abc_scenario_range_filter() {
    let ds = Dataset::from_records(vec![
        LaunchRecord::new("A", 500.0, "v1.0", Outcome::Success),
        LaunchRecord::new("B", 3000.0, "FT", Outcome::Failure),
        LaunchRecord::new("C", 9000.0, "B5", Outcome::Success),
    ])
    .unwrap();
    let state = FilterState {
        selected_site: SiteSelection::All,
        payload_range: PayloadRange::new(0.0, 3000.0),
    };
    let rows = filter(&ds, &state);
    let payloads: Vec<f64> = rows.iter().map(|r| r.payload_kg).collect();
    assert_eq!(payloads, vec![500.0, 3000.0]);
}

#[test]
fn all_success_site_renders_single_success_slice() {
    let mut c = Controller::new(loaded(), DashVariant::Full);
    c.handle(ControlEvent::SetPayloadRange(PayloadRange::new(2000.0, 6000.0)));
    c.handle(ControlEvent::SelectSite(SiteSelection::Site("CCAFS SLC-40".into())));
    assert_eq!(pie_labels(&c), vec!["Success"]);

    c.handle(ControlEvent::ApplyPreset(PayloadPreset::All));
    assert_eq!(pie_labels(&c), vec!["Success", "Failure"]);
}

#[test]
fn empty_site_range_is_placeholder_not_error() {
    let mut c = Controller::new(loaded(), DashVariant::Booster);
    c.handle(ControlEvent::SelectSite(SiteSelection::Site("VAFB SLC-4E".into())));
    let updated = c.handle(ControlEvent::ApplyPreset(PayloadPreset::Medium));
    assert_eq!(updated.len(), 3);
    assert!(updated.iter().all(|s| s.empty && s.placeholder.is_some()));
}

#[test]
fn replaying_the_same_events_is_bit_identical() {
    let events = [
        ControlEvent::SelectSite(SiteSelection::Site("KSC LC-39A".into())),
        ControlEvent::SetPayloadRange(PayloadRange::new(1000.0, 6000.0)),
        ControlEvent::ApplyPreset(PayloadPreset::Heavy),
        ControlEvent::SelectSite(SiteSelection::All),
    ];
    let run = || {
        let mut c = Controller::new(loaded(), DashVariant::Full);
        for e in events.iter().cloned() {
            c.handle(e);
        }
        serde_json::to_string(c.charts()).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn success_rate_bar_is_computed_once() {
    let mut c = Controller::new(loaded(), DashVariant::Full);
    let before = c.chart(ChartId::SuccessRateBar).cloned().unwrap();
    c.handle(ControlEvent::SetPayloadRange(PayloadRange::new(0.0, 600.0)));
    c.handle(ControlEvent::SelectSite(SiteSelection::Site("KSC LC-39A".into())));
    assert_eq!(c.chart(ChartId::SuccessRateBar), Some(&before));

    let rates = c.success_rates();
    assert_eq!(rates.rows[0].site, "KSC LC-39A");
    for pair in rates.rows.windows(2) {
        assert!(pair[0].success_rate >= pair[1].success_rate);
    }
}

#[test]
fn layout_lists_variant_charts() {
    let classic = Controller::new(loaded(), DashVariant::Classic).layout();
    assert_eq!(classic.charts, vec![ChartId::SitePie, ChartId::PayloadScatter]);
    let full = Controller::new(loaded(), DashVariant::Full).layout();
    assert_eq!(full.charts.len(), 4);
    let json = serde_json::to_value(&full).unwrap();
    assert_eq!(json["controls"][0]["id"], "site-dropdown");
    assert_eq!(json["controls"][2]["presets"][0]["name"], "0-2000");
    assert_eq!(json["charts"][3], "success-rate-bar-chart");
}
