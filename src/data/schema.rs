//! Schema mapping applied once at load.
//!
//! Each canonical column owns an ordered alias list; the first alias found in
//! a header wins, whatever naming convention the source used.

use csv::StringRecord;

pub const DEFAULT_ALLOWED_SITES: [&str; 3] = ["CCAFS SLC-40", "KSC LC-39A", "VAFB SLC-4E"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Site,
    Payload,
    Booster,
    Class,
    FlightNumber,
    Lat,
    Long,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Site,
        Column::Payload,
        Column::Booster,
        Column::Class,
        Column::FlightNumber,
        Column::Lat,
        Column::Long,
    ];

    pub const REQUIRED: [Column; 4] = [Column::Site, Column::Payload, Column::Booster, Column::Class];

    pub fn canonical(&self) -> &'static str {
        match self {
            Column::Site => "Launch Site",
            Column::Payload => "Payload Mass (kg)",
            Column::Booster => "Booster Version Category",
            Column::Class => "class",
            Column::FlightNumber => "Flight Number",
            Column::Lat => "Lat",
            Column::Long => "Long",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::Site => &["Launch Site", "LaunchSite", "launch_site", "Site"],
            Column::Payload => &["Payload Mass (kg)", "PayloadMass", "payload_mass_kg", "Payload Mass"],
            Column::Booster => &[
                "Booster Version Category",
                "BoosterVersionCategory",
                "Booster Version",
                "BoosterVersion",
            ],
            Column::Class => &["class", "Outcome Class", "outcome"],
            Column::FlightNumber => &["Flight Number", "FlightNumber", "flight_number"],
            Column::Lat => &["Lat", "Latitude"],
            Column::Long => &["Long", "Longitude", "Lon"],
        }
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

fn header_key(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_ascii_lowercase()
}

/// Header positions for each canonical column of one source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMap {
    positions: [Option<usize>; 7],
}

impl ColumnMap {
    pub fn resolve(headers: &StringRecord) -> Self {
        let keys: Vec<String> = headers.iter().map(header_key).collect();
        let mut positions = [None; 7];
        for column in Column::ALL {
            positions[column.slot()] = column
                .aliases()
                .iter()
                .find_map(|alias| keys.iter().position(|k| *k == header_key(alias)));
        }
        Self { positions }
    }

    pub fn get(&self, column: Column) -> Option<usize> {
        self.positions[column.slot()]
    }

    pub fn has(&self, column: Column) -> bool {
        self.get(column).is_some()
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        Column::REQUIRED
            .iter()
            .filter(|c| !self.has(**c))
            .map(|c| c.canonical())
            .collect()
    }

    /// Trimmed cell value; empty cells read as absent.
    pub fn field<'r>(&self, record: &'r StringRecord, column: Column) -> Option<&'r str> {
        self.get(column)
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

const SITE_ALIASES: [(&str, &str); 6] = [
    ("CCAFSLC40", "CCAFS SLC-40"),
    ("CCAFSSLC40", "CCAFS SLC-40"),
    ("CCSFSSLC40", "CCAFS SLC-40"),
    ("KSCLC39A", "KSC LC-39A"),
    ("VAFBSLC4E", "VAFB SLC-4E"),
    ("VSFBSLC4E", "VAFB SLC-4E"),
];

fn site_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Canonical launch site name; unknown names pass through trimmed.
pub fn canonical_site(raw: &str) -> String {
    let key = site_key(raw);
    SITE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}
