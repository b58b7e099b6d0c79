use serde::{Serialize, Serializer};

use crate::data::schema::DEFAULT_ALLOWED_SITES;

/// Sentinel value the dropdown uses for "every site".
pub const ALL_SITES: &str = "ALL";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DashVariant {
    /// Site pie + payload scatter; the pie ignores the payload slider.
    Classic,
    /// Adds the booster breakdown chart and the payload preset buttons.
    Booster,
    /// Everything in `Booster` plus the static success-rate bar chart.
    Full,
}

impl DashVariant {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("DASH_VARIANT").unwrap_or_default())
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "classic" => DashVariant::Classic,
            "booster" => DashVariant::Booster,
            _ => DashVariant::Full,
        }
    }

    pub fn has_presets(&self) -> bool {
        !matches!(self, DashVariant::Classic)
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub data_source: String,
    pub meta_source: Option<String>,
    pub variant: DashVariant,
    pub allowed_sites: Vec<String>,
    pub http_host: String,
    pub http_port: u16,
    pub fetch_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_source: std::env::var("DATA_SOURCE").unwrap_or_else(|_| "spacex_launch_dash.csv".to_string()),
            meta_source: std::env::var("META_SOURCE").ok().filter(|v| !v.trim().is_empty()),
            variant: DashVariant::from_env(),
            allowed_sites: std::env::var("ALLOWED_SITES")
                .ok()
                .map(|v| parse_site_list(&v))
                .filter(|sites| !sites.is_empty())
                .unwrap_or_else(default_allowed_sites),
            http_host: std::env::var("HTTP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            http_port: std::env::var("HTTP_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8050),
            fetch_timeout_secs: std::env::var("FETCH_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(30),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

pub fn default_allowed_sites() -> Vec<String> {
    DEFAULT_ALLOWED_SITES.iter().map(|s| s.to_string()).collect()
}

fn parse_site_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(crate::data::schema::canonical_site)
        .collect()
}

// =============================================================================
// Filter state
// =============================================================================

/// Inclusive payload bounds in kg.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PayloadRange {
    pub min: f64,
    pub max: f64,
}

impl PayloadRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, payload_kg: f64) -> bool {
        payload_kg >= self.min && payload_kg <= self.max
    }

    pub fn overlaps(&self, other: PayloadRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }

    /// Orders the bounds and clamps both into `bounds`. A range that lies
    /// wholly outside `bounds` is returned ordered but unclamped, so it still
    /// matches no launch in the dataset.
    pub fn clamp_to(&self, bounds: PayloadRange) -> PayloadRange {
        let ordered = if self.min <= self.max {
            *self
        } else {
            PayloadRange::new(self.max, self.min)
        };
        if !ordered.overlaps(bounds) {
            return ordered;
        }
        PayloadRange {
            min: ordered.min.clamp(bounds.min, bounds.max),
            max: ordered.max.clamp(bounds.min, bounds.max),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SiteSelection {
    All,
    Site(String),
}

impl SiteSelection {
    pub fn as_str(&self) -> &str {
        match self {
            SiteSelection::All => ALL_SITES,
            SiteSelection::Site(site) => site,
        }
    }

    pub fn admits(&self, site: &str) -> bool {
        match self {
            SiteSelection::All => true,
            SiteSelection::Site(selected) => selected == site,
        }
    }
}

impl Serialize for SiteSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterState {
    pub selected_site: SiteSelection,
    pub payload_range: PayloadRange,
}

impl FilterState {
    /// Default dashboard state: every site, the full payload range.
    pub fn initial(payload_bounds: PayloadRange) -> Self {
        Self {
            selected_site: SiteSelection::All,
            payload_range: payload_bounds,
        }
    }
}

/// Shortcut buttons next to the booster breakdown chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadPreset {
    Light,
    Medium,
    Heavy,
    All,
}

impl PayloadPreset {
    pub const ALL: [PayloadPreset; 4] = [
        PayloadPreset::Light,
        PayloadPreset::Medium,
        PayloadPreset::Heavy,
        PayloadPreset::All,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "0-2000" | "light" => Some(PayloadPreset::Light),
            "2000-4000" | "medium" => Some(PayloadPreset::Medium),
            "4000-6000" | "heavy" => Some(PayloadPreset::Heavy),
            "all" => Some(PayloadPreset::All),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PayloadPreset::Light => "0-2000",
            PayloadPreset::Medium => "2000-4000",
            PayloadPreset::Heavy => "4000-6000",
            PayloadPreset::All => "all",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PayloadPreset::Light => "0 - 2000 kg",
            PayloadPreset::Medium => "2000 - 4000 kg",
            PayloadPreset::Heavy => "4000 - 6000 kg",
            PayloadPreset::All => "All payloads",
        }
    }

    /// Preset range, clamped into the dataset's payload bounds when the two overlap.
    pub fn range(&self, bounds: PayloadRange) -> PayloadRange {
        let raw = match self {
            PayloadPreset::Light => PayloadRange::new(0.0, 2000.0),
            PayloadPreset::Medium => PayloadRange::new(2000.0, 4000.0),
            PayloadPreset::Heavy => PayloadRange::new(4000.0, 6000.0),
            PayloadPreset::All => return bounds,
        };
        raw.clamp_to(bounds)
    }
}
