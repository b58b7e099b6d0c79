//! Chart specs and page layout.
//!
//! A [`ChartSpec`] is a declarative description of one figure; the front end
//! renders it however it likes. Specs are rebuilt from scratch on every
//! recompute.

use serde::Serialize;

use crate::aggregate::{booster_breakdown, outcome_breakdown, success_counts_by_site, SuccessRateTable};
use crate::data::{Dataset, LaunchRecord, Outcome};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::state::{DashVariant, FilterState, PayloadPreset, SiteSelection, ALL_SITES};

pub const DASHBOARD_TITLE: &str = "SpaceX Launch Records Dashboard";
pub const EMPTY_PLACEHOLDER: &str = "No launches match the current filters";
pub const NO_SUCCESS_PLACEHOLDER: &str = "No successful launches in range";

pub const FIELD_SITE: &str = "Launch Site";
pub const FIELD_PAYLOAD: &str = "Payload Mass (kg)";
pub const FIELD_BOOSTER: &str = "Booster Version Category";
pub const FIELD_CLASS: &str = "class";
pub const FIELD_FLIGHT: &str = "Flight Number";

const SITE_PALETTE: [&str; 10] = [
    "#636efa", "#ef553b", "#00cc96", "#ab63fa", "#ffa15a",
    "#19d3f3", "#ff6692", "#b6e880", "#ff97ff", "#fecb52",
];

/// Outcome slice order for single-site pies. Fixed so colors never depend
/// on which classes a site happens to have.
const OUTCOME_ORDER: [Outcome; 2] = [Outcome::Success, Outcome::Failure];

pub fn site_color(dataset: &Dataset, site: &str) -> &'static str {
    let i = dataset.site_index(site).unwrap_or(0);
    SITE_PALETTE[i % SITE_PALETTE.len()]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ChartId {
    #[serde(rename = "success-pie-chart")]
    SitePie,
    #[serde(rename = "success-payload-scatter-chart")]
    PayloadScatter,
    #[serde(rename = "booster-breakdown-chart")]
    BoosterBreakdown,
    #[serde(rename = "success-rate-bar-chart")]
    SuccessRateBar,
}

impl ChartId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartId::SitePie => "success-pie-chart",
            ChartId::PayloadScatter => "success-payload-scatter-chart",
            ChartId::BoosterBreakdown => "booster-breakdown-chart",
            ChartId::SuccessRateBar => "success-rate-bar-chart",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Scatter,
    Bar,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: usize,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: u8,
    pub color_key: String,
    pub site: String,
    pub flight_number: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bar {
    pub category: String,
    pub group: String,
    pub value: f64,
    pub color: String,
    pub hover: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartData {
    Slices { slices: Vec<Slice> },
    Points { points: Vec<Point> },
    Bars { bars: Vec<Bar> },
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Slices { slices } => slices.is_empty(),
            ChartData::Points { points } => points.is_empty(),
            ChartData::Bars { bars } => bars.is_empty(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSpec {
    pub id: ChartId,
    pub kind: ChartKind,
    pub title: String,
    pub x: Option<&'static str>,
    pub y: Option<&'static str>,
    pub color: Option<&'static str>,
    pub hover: Vec<&'static str>,
    pub data: ChartData,
    pub empty: bool,
    pub placeholder: Option<&'static str>,
}

impl ChartSpec {
    fn new(id: ChartId, kind: ChartKind, title: String, data: ChartData) -> Self {
        let empty = data.is_empty();
        log(
            Level::Trace,
            Domain::View,
            "chart_built",
            obj(&[("chart", v_str(id.as_str())), ("empty", serde_json::json!(empty))]),
        );
        Self {
            id,
            kind,
            title,
            x: None,
            y: None,
            color: None,
            hover: Vec::new(),
            data,
            empty,
            placeholder: empty.then_some(EMPTY_PLACEHOLDER),
        }
    }

    fn axes(mut self, x: &'static str, y: &'static str, color: Option<&'static str>) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self.color = color;
        self
    }

    /// Swaps the empty-state text; no-op for charts with data.
    fn empty_text(mut self, text: &'static str) -> Self {
        if self.empty {
            self.placeholder = Some(text);
        }
        self
    }

    fn with_hover(mut self, fields: &[&'static str]) -> Self {
        self.hover = fields.to_vec();
        self
    }
}

// =============================================================================
// Chart builders
// =============================================================================

/// Pie keyed to the site dropdown. `subset` is the already-filtered rows.
pub fn site_pie(dataset: &Dataset, subset: &[&LaunchRecord], site: &SiteSelection) -> ChartSpec {
    match site {
        SiteSelection::All => {
            let slices = success_counts_by_site(subset)
                .into_iter()
                .filter(|(_, n)| *n > 0)
                .map(|(site, value)| Slice {
                    color: site_color(dataset, &site).to_string(),
                    label: site,
                    value,
                })
                .collect();
            let spec = ChartSpec::new(
                ChartId::SitePie,
                ChartKind::Pie,
                "Total Success Launches by Site".to_string(),
                ChartData::Slices { slices },
            )
            .with_hover(&[FIELD_SITE]);
            if subset.is_empty() {
                spec
            } else {
                spec.empty_text(NO_SUCCESS_PLACEHOLDER)
            }
        }
        SiteSelection::Site(name) => {
            let at_site: Vec<&LaunchRecord> = subset.iter().copied().filter(|r| r.site == *name).collect();
            let counts = outcome_breakdown(&at_site);
            let slices = OUTCOME_ORDER
                .iter()
                .map(|o| (o, if o.is_success() { counts.successes } else { counts.failures }))
                .filter(|(_, n)| *n > 0)
                .map(|(o, value)| Slice {
                    label: o.label().to_string(),
                    value,
                    color: o.color().to_string(),
                })
                .collect();
            ChartSpec::new(
                ChartId::SitePie,
                ChartKind::Pie,
                format!("Total Success Launches for site {}", name),
                ChartData::Slices { slices },
            )
            .with_hover(&[FIELD_CLASS])
        }
    }
}

pub fn payload_scatter(subset: &[&LaunchRecord], site: &SiteSelection) -> ChartSpec {
    let points = subset
        .iter()
        .filter(|r| site.admits(&r.site))
        .map(|r| Point {
            x: r.payload_kg,
            y: r.outcome.class(),
            color_key: r.booster.clone(),
            site: r.site.clone(),
            flight_number: r.flight_number,
        })
        .collect();
    let title = match site {
        SiteSelection::All => "Correlation between Payload and Success for all Sites".to_string(),
        SiteSelection::Site(name) => format!("Correlation between Payload and Success for site {}", name),
    };
    ChartSpec::new(ChartId::PayloadScatter, ChartKind::Scatter, title, ChartData::Points { points })
        .axes(FIELD_PAYLOAD, FIELD_CLASS, Some(FIELD_BOOSTER))
        .with_hover(&[FIELD_SITE, FIELD_BOOSTER, FIELD_FLIGHT])
}

pub fn booster_breakdown_chart(subset: &[&LaunchRecord], site: &SiteSelection) -> ChartSpec {
    let at_site: Vec<&LaunchRecord> = subset.iter().copied().filter(|r| site.admits(&r.site)).collect();
    let mut bars = Vec::new();
    for b in booster_breakdown(&at_site) {
        for outcome in OUTCOME_ORDER {
            let n = if outcome.is_success() { b.counts.successes } else { b.counts.failures };
            bars.push(Bar {
                category: b.booster.clone(),
                group: outcome.label().to_string(),
                value: n as f64,
                color: outcome.color().to_string(),
                hover: None,
            });
        }
    }
    let title = match site {
        SiteSelection::All => "Launch Outcomes by Booster Version".to_string(),
        SiteSelection::Site(name) => format!("Launch Outcomes by Booster Version for site {}", name),
    };
    ChartSpec::new(ChartId::BoosterBreakdown, ChartKind::Bar, title, ChartData::Bars { bars })
        .axes(FIELD_BOOSTER, "count", Some(FIELD_CLASS))
}

pub fn success_rate_bar(dataset: &Dataset, table: &SuccessRateTable) -> ChartSpec {
    let bars = table
        .rows
        .iter()
        .map(|r| Bar {
            category: r.site.clone(),
            group: r.site.clone(),
            value: r.success_rate,
            color: site_color(dataset, &r.site).to_string(),
            hover: Some(format!("{} launches", r.total_launches)),
        })
        .collect();
    ChartSpec::new(
        ChartId::SuccessRateBar,
        ChartKind::Bar,
        "Launch Success Rate by Site (%)".to_string(),
        ChartData::Bars { bars },
    )
    .axes(FIELD_SITE, "success rate (%)", Some(FIELD_SITE))
    .with_hover(&["total launches"])
}

// =============================================================================
// Layout
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Mark {
    pub value: f64,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PresetButton {
    pub name: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum Control {
    Dropdown {
        id: &'static str,
        options: Vec<DropdownOption>,
        value: String,
        placeholder: &'static str,
        searchable: bool,
    },
    RangeSlider {
        id: &'static str,
        label: &'static str,
        min: f64,
        max: f64,
        step: f64,
        marks: Vec<Mark>,
        value: [f64; 2],
    },
    PresetButtons {
        id: &'static str,
        presets: Vec<PresetButton>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Layout {
    pub title: &'static str,
    pub variant: DashVariant,
    pub controls: Vec<Control>,
    pub charts: Vec<ChartId>,
}

const SLIDER_STEP: f64 = 1000.0;

fn slider_marks(min: f64, max: f64) -> Vec<Mark> {
    (0..5)
        .map(|i| {
            let value = (min + (max - min) * i as f64 / 4.0).round();
            Mark { value, label: format!("{:.0}", value) }
        })
        .collect()
}

pub fn layout(dataset: &Dataset, variant: DashVariant, charts: Vec<ChartId>) -> Layout {
    let bounds = dataset.payload_bounds();
    let initial = FilterState::initial(bounds);

    let mut options = vec![DropdownOption {
        label: "All Sites".to_string(),
        value: ALL_SITES.to_string(),
    }];
    options.extend(dataset.sites().iter().map(|s| DropdownOption {
        label: s.clone(),
        value: s.clone(),
    }));

    let mut controls = vec![
        Control::Dropdown {
            id: "site-dropdown",
            options,
            value: initial.selected_site.as_str().to_string(),
            placeholder: "Select a Launch Site here",
            searchable: true,
        },
        Control::RangeSlider {
            id: "payload-slider",
            label: "Payload range (Kg):",
            min: bounds.min,
            max: bounds.max,
            step: SLIDER_STEP,
            marks: slider_marks(bounds.min, bounds.max),
            value: [initial.payload_range.min, initial.payload_range.max],
        },
    ];
    if variant.has_presets() {
        controls.push(Control::PresetButtons {
            id: "payload-presets",
            presets: PayloadPreset::ALL
                .iter()
                .map(|p| {
                    let r = p.range(bounds);
                    PresetButton { name: p.name(), label: p.label(), min: r.min, max: r.max }
                })
                .collect(),
        });
    }

    Layout {
        title: DASHBOARD_TITLE,
        variant,
        controls,
        charts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Outcome::{Failure, Success};

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            LaunchRecord::new("CCAFS SLC-40", 0.0, "v1.0", Failure),
            LaunchRecord::new("KSC LC-39A", 2490.0, "FT", Success),
            LaunchRecord::new("KSC LC-39A", 5300.0, "FT", Success),
            LaunchRecord::new("VAFB SLC-4E", 9600.0, "B4", Failure),
        ])
        .unwrap()
    }

    fn all(ds: &Dataset) -> Vec<&LaunchRecord> {
        ds.records().iter().collect()
    }

    fn slices(spec: &ChartSpec) -> Vec<(String, usize)> {
        match &spec.data {
            ChartData::Slices { slices } => slices.iter().map(|s| (s.label.clone(), s.value)).collect(),
            other => panic!("not a pie: {:?}", other),
        }
    }

    #[test]
    fn all_sites_pie_counts_successes() {
        let ds = dataset();
        let spec = site_pie(&ds, &all(&ds), &SiteSelection::All);
        assert_eq!(spec.title, "Total Success Launches by Site");
        assert_eq!(slices(&spec), vec![("KSC LC-39A".to_string(), 2)]);
        assert!(!spec.empty);
    }

    #[test]
    fn all_success_site_is_single_success_slice() {
        let ds = dataset();
        let spec = site_pie(&ds, &all(&ds), &SiteSelection::Site("KSC LC-39A".into()));
        assert_eq!(slices(&spec), vec![("Success".to_string(), 2)]);
        match &spec.data {
            ChartData::Slices { slices } => assert_eq!(slices[0].color, Outcome::Success.color()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn all_failure_site_is_single_failure_slice() {
        let ds = dataset();
        let spec = site_pie(&ds, &all(&ds), &SiteSelection::Site("VAFB SLC-4E".into()));
        assert_eq!(slices(&spec), vec![("Failure".to_string(), 1)]);
    }

    #[test]
    fn failures_only_pie_says_no_successes() {
        let ds = dataset();
        let failures: Vec<&LaunchRecord> = all(&ds).into_iter().filter(|r| !r.outcome.is_success()).collect();
        let pie = site_pie(&ds, &failures, &SiteSelection::All);
        assert!(pie.empty);
        assert_eq!(pie.placeholder, Some(NO_SUCCESS_PLACEHOLDER));
        assert!(!payload_scatter(&failures, &SiteSelection::All).empty);

        let none = site_pie(&ds, &[], &SiteSelection::All);
        assert_eq!(none.placeholder, Some(EMPTY_PLACEHOLDER));
    }

    #[test]
    fn empty_subset_renders_placeholder() {
        let ds = dataset();
        let spec = payload_scatter(&[], &SiteSelection::Site("KSC LC-39A".into()));
        assert!(spec.empty);
        assert_eq!(spec.placeholder, Some(EMPTY_PLACEHOLDER));
        let pie = site_pie(&ds, &[], &SiteSelection::All);
        assert!(pie.empty);
    }

    #[test]
    fn scatter_binds_payload_class_and_booster() {
        let ds = dataset();
        let spec = payload_scatter(&all(&ds), &SiteSelection::All);
        assert_eq!(spec.x, Some(FIELD_PAYLOAD));
        assert_eq!(spec.y, Some(FIELD_CLASS));
        assert_eq!(spec.color, Some(FIELD_BOOSTER));
        match &spec.data {
            ChartData::Points { points } => {
                assert_eq!(points.len(), 4);
                assert_eq!(points[1].y, 1);
                assert_eq!(points[3].color_key, "B4");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn booster_breakdown_has_success_and_failure_bars() {
        let ds = dataset();
        let spec = booster_breakdown_chart(&all(&ds), &SiteSelection::All);
        match &spec.data {
            ChartData::Bars { bars } => {
                assert_eq!(bars.len(), 6);
                assert_eq!(bars[2].category, "FT");
                assert_eq!(bars[2].group, "Success");
                assert_eq!(bars[2].value, 2.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn site_colors_are_stable_per_dataset_position() {
        let ds = dataset();
        assert_eq!(site_color(&ds, "CCAFS SLC-40"), SITE_PALETTE[0]);
        assert_eq!(site_color(&ds, "VAFB SLC-4E"), SITE_PALETTE[2]);
    }

    #[test]
    fn layout_has_dropdown_slider_and_presets() {
        let ds = dataset();
        let l = layout(&ds, DashVariant::Full, vec![ChartId::SitePie]);
        assert_eq!(l.controls.len(), 3);
        match &l.controls[0] {
            Control::Dropdown { options, value, .. } => {
                assert_eq!(options.len(), 4);
                assert_eq!(value, "ALL");
            }
            other => panic!("unexpected {:?}", other),
        }
        match &l.controls[1] {
            Control::RangeSlider { min, max, value, marks, .. } => {
                assert_eq!((*min, *max), (0.0, 9600.0));
                assert_eq!(*value, [0.0, 9600.0]);
                assert_eq!(marks[2].value, 4800.0);
            }
            other => panic!("unexpected {:?}", other),
        }
        let classic = layout(&ds, DashVariant::Classic, vec![]);
        assert_eq!(classic.controls.len(), 2);
    }
}
