//! Reactive controller: control events in, recomputed chart specs out.
//!
//! Each chart binding declares the inputs it depends on. An event replaces
//! the [`FilterState`] and recomputes exactly the bindings whose dependency
//! set contains the event's input; nothing else triggers a recompute.

use serde::Serialize;
use std::sync::Arc;

use crate::aggregate::{compute_success_rates, SuccessRateTable};
use crate::data::Dataset;
use crate::filter::filter;
use crate::logging::{log, log_control_event, obj, v_str, Domain, Level, ProfileScope};
use crate::state::{DashVariant, FilterState, PayloadPreset, PayloadRange, SiteSelection};
use crate::view::{self, ChartId, ChartSpec, Layout};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Input {
    Site,
    Payload,
}

impl Input {
    pub fn as_str(&self) -> &'static str {
        match self {
            Input::Site => "site",
            Input::Payload => "payload",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ControlEvent {
    SelectSite(SiteSelection),
    SetPayloadRange(PayloadRange),
    ApplyPreset(PayloadPreset),
}

impl ControlEvent {
    pub fn input(&self) -> Input {
        match self {
            ControlEvent::SelectSite(_) => Input::Site,
            ControlEvent::SetPayloadRange(_) | ControlEvent::ApplyPreset(_) => Input::Payload,
        }
    }

    fn describe(&self) -> String {
        match self {
            ControlEvent::SelectSite(site) => site.as_str().to_string(),
            ControlEvent::SetPayloadRange(r) => format!("{}..{}", r.min, r.max),
            ControlEvent::ApplyPreset(p) => p.name().to_string(),
        }
    }
}

/// Everything a chart render may read.
pub struct RenderContext<'a> {
    pub dataset: &'a Dataset,
    pub state: &'a FilterState,
    pub rates: &'a SuccessRateTable,
}

type RenderFn = fn(&RenderContext<'_>) -> ChartSpec;

#[derive(Clone, Copy)]
pub struct ChartBinding {
    pub id: ChartId,
    pub deps: &'static [Input],
    render: RenderFn,
}

impl ChartBinding {
    pub fn depends_on(&self, input: Input) -> bool {
        self.deps.contains(&input)
    }
}

fn render_site_pie(ctx: &RenderContext<'_>) -> ChartSpec {
    let subset = filter(ctx.dataset, ctx.state);
    view::site_pie(ctx.dataset, &subset, &ctx.state.selected_site)
}

/// Classic pie: the site dropdown only; payloads are never filtered.
fn render_site_pie_unfiltered(ctx: &RenderContext<'_>) -> ChartSpec {
    let state = FilterState {
        selected_site: ctx.state.selected_site.clone(),
        payload_range: ctx.dataset.payload_bounds(),
    };
    let subset = filter(ctx.dataset, &state);
    view::site_pie(ctx.dataset, &subset, &state.selected_site)
}

fn render_payload_scatter(ctx: &RenderContext<'_>) -> ChartSpec {
    let subset = filter(ctx.dataset, ctx.state);
    view::payload_scatter(&subset, &ctx.state.selected_site)
}

fn render_booster_breakdown(ctx: &RenderContext<'_>) -> ChartSpec {
    let subset = filter(ctx.dataset, ctx.state);
    view::booster_breakdown_chart(&subset, &ctx.state.selected_site)
}

fn render_success_rate_bar(ctx: &RenderContext<'_>) -> ChartSpec {
    view::success_rate_bar(ctx.dataset, ctx.rates)
}

const SITE_ONLY: &[Input] = &[Input::Site];
const SITE_AND_PAYLOAD: &[Input] = &[Input::Site, Input::Payload];
const STATIC: &[Input] = &[];

pub fn bindings(variant: DashVariant) -> Vec<ChartBinding> {
    let pie = match variant {
        DashVariant::Classic => ChartBinding {
            id: ChartId::SitePie,
            deps: SITE_ONLY,
            render: render_site_pie_unfiltered,
        },
        DashVariant::Booster | DashVariant::Full => ChartBinding {
            id: ChartId::SitePie,
            deps: SITE_AND_PAYLOAD,
            render: render_site_pie,
        },
    };
    let mut out = vec![
        pie,
        ChartBinding {
            id: ChartId::PayloadScatter,
            deps: SITE_AND_PAYLOAD,
            render: render_payload_scatter,
        },
    ];
    if variant.has_presets() {
        out.push(ChartBinding {
            id: ChartId::BoosterBreakdown,
            deps: SITE_AND_PAYLOAD,
            render: render_booster_breakdown,
        });
    }
    if variant == DashVariant::Full {
        out.push(ChartBinding {
            id: ChartId::SuccessRateBar,
            deps: STATIC,
            render: render_success_rate_bar,
        });
    }
    out
}

pub struct Controller {
    dataset: Arc<Dataset>,
    variant: DashVariant,
    rates: SuccessRateTable,
    bindings: Vec<ChartBinding>,
    state: FilterState,
    charts: Vec<ChartSpec>,
}

impl Controller {
    /// Computes every chart from the default state: all sites, full range.
    pub fn new(dataset: Arc<Dataset>, variant: DashVariant) -> Self {
        let rates = compute_success_rates(&dataset);
        let state = FilterState::initial(dataset.payload_bounds());
        let bindings = bindings(variant);
        let ctx = RenderContext {
            dataset: &dataset,
            state: &state,
            rates: &rates,
        };
        let charts = bindings.iter().map(|b| (b.render)(&ctx)).collect();
        Self {
            dataset,
            variant,
            rates,
            bindings,
            state,
            charts,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn success_rates(&self) -> &SuccessRateTable {
        &self.rates
    }

    pub fn charts(&self) -> &[ChartSpec] {
        &self.charts
    }

    pub fn chart(&self, id: ChartId) -> Option<&ChartSpec> {
        self.charts.iter().find(|c| c.id == id)
    }

    pub fn layout(&self) -> Layout {
        view::layout(&self.dataset, self.variant, self.bindings.iter().map(|b| b.id).collect())
    }

    fn next_state(&self, event: &ControlEvent) -> Option<FilterState> {
        let bounds = self.dataset.payload_bounds();
        let mut next = self.state.clone();
        match event {
            ControlEvent::SelectSite(site) => {
                if let SiteSelection::Site(name) = site {
                    if self.dataset.site_index(name).is_none() {
                        return None;
                    }
                }
                next.selected_site = site.clone();
            }
            ControlEvent::SetPayloadRange(range) => next.payload_range = range.clamp_to(bounds),
            ControlEvent::ApplyPreset(preset) => next.payload_range = preset.range(bounds),
        }
        Some(next)
    }

    /// Applies one control event and returns the charts it recomputed, in
    /// layout order. Unknown sites leave the state untouched.
    pub fn handle(&mut self, event: ControlEvent) -> Vec<ChartSpec> {
        let input = event.input();
        let Some(next) = self.next_state(&event) else {
            log(
                Level::Warn,
                Domain::Controller,
                "unknown_site",
                obj(&[("value", v_str(&event.describe()))]),
            );
            return Vec::new();
        };
        self.state = next;

        let _scope = ProfileScope::with_context("recompute", &[("input", v_str(input.as_str()))]);
        let ctx = RenderContext {
            dataset: &self.dataset,
            state: &self.state,
            rates: &self.rates,
        };
        let mut updated = Vec::new();
        let mut recomputed = Vec::new();
        for (binding, slot) in self.bindings.iter().zip(self.charts.iter_mut()) {
            if !binding.depends_on(input) {
                continue;
            }
            let spec = (binding.render)(&ctx);
            *slot = spec.clone();
            updated.push(spec);
            recomputed.push(binding.id.as_str());
        }
        log_control_event(input.as_str(), &event.describe(), &recomputed);
        updated
    }
}
