use launchdash::data::manifest::{build_manifest, default_manifest_path};
use launchdash::data::{build_dataset, load, LoadError, Outcome, SourceBytes};
use launchdash::state::{default_allowed_sites, Config, DashVariant};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_csv(path: &Path, header: &[&str], rows: &[&str]) {
    let mut out = String::new();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(path, out).unwrap();
}

fn config(data: &Path, meta: Option<&Path>) -> Config {
    Config {
        data_source: data.display().to_string(),
        meta_source: meta.map(|p| p.display().to_string()),
        variant: DashVariant::Full,
        allowed_sites: default_allowed_sites(),
        http_host: "127.0.0.1".to_string(),
        http_port: 0,
        fetch_timeout_secs: 5,
    }
}

const ROWS: [&str; 4] = [
    "1,CCAFS LC-40,0,0,v1.0",
    "21,KSC LC-39A,1,2490,FT",
    "30,VAFB SLC-4E,1,9600,B4",
    "41,CCAFS SLC-40,1,3170,FT",
];

#[tokio::test]
async fn loads_local_csv_through_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("spacex_launch_dash.csv");
    write_csv(
        &path,
        &["Flight Number", "Launch Site", "class", "Payload Mass (kg)", "Booster Version Category"],
        &ROWS,
    );
    let (ds, report) = load(&config(&path, None)).await.unwrap();
    assert_eq!(ds.len(), 4);
    assert_eq!(ds.sites(), &["CCAFS SLC-40", "KSC LC-39A", "VAFB SLC-4E"]);
    assert_eq!(report.sources.len(), 1);
}

#[test]
fn naming_conventions_produce_the_same_dataset() {
    let a = "Flight Number,Launch Site,class,Payload Mass (kg),Booster Version Category\n";
    let b = "FlightNumber,LaunchSite,Class,PayloadMass,BoosterVersion\n";
    let body = ROWS.join("\n");
    let allowed = default_allowed_sites();
    let (da, _) = build_dataset(&SourceBytes::new("a.csv", format!("{}{}\n", a, body)), None, &allowed).unwrap();
    let (db, _) = build_dataset(&SourceBytes::new("b.csv", format!("{}{}\n", b, body)), None, &allowed).unwrap();
    assert_eq!(da.records(), db.records());
}

#[tokio::test]
async fn unreachable_source_fails_load() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.csv");
    match load(&config(&missing, None)).await {
        Err(LoadError::Unreachable { .. }) => {}
        other => panic!("expected Unreachable, got {:?}", other.map(|(d, _)| d.len())),
    }
}

#[tokio::test]
async fn missing_columns_after_join_fail_load() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("dash.csv");
    let meta = dir.path().join("geo.csv");
    write_csv(&data, &["Launch Site", "class"], &["KSC LC-39A,1"]);
    write_csv(&meta, &["Launch Site", "Lat", "Long"], &["KSC LC-39A,28.57,-80.64"]);
    match load(&config(&data, Some(&meta))).await {
        Err(LoadError::MissingColumns { missing, .. }) => {
            assert_eq!(missing, vec!["Payload Mass (kg)", "Booster Version Category"]);
        }
        other => panic!("expected MissingColumns, got {:?}", other.map(|(d, _)| d.len())),
    }
}

#[tokio::test]
async fn joined_sources_carry_geo_and_coalesced_outcomes() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("dash.csv");
    let meta = dir.path().join("geo.csv");
    write_csv(
        &data,
        &["Flight Number", "Launch Site", "class", "Payload Mass (kg)", "Booster Version Category"],
        &["1,CCAFS LC-40,,0,v1.0", "21,KSC LC-39A,1,2490,FT"],
    );
    write_csv(
        &meta,
        &["Flight Number", "Launch Site", "Lat", "Long", "class"],
        &[
            "1,CCAFS LC-40,28.562,-80.577,0",
            "21,KSC LC-39A,28.573,-80.646,",
            "99,Kwajalein,9.04,167.74,1",
        ],
    );
    let (ds, report) = load(&config(&data, Some(&meta))).await.unwrap();
    assert_eq!(ds.len(), 2);
    assert_eq!(report.rows_outside_allow_list, 1);
    let ccafs = &ds.records()[0];
    assert_eq!(ccafs.outcome, Outcome::Failure);
    assert_eq!(ccafs.lat, Some(28.562));
    assert_eq!(ds.records()[1].outcome, Outcome::Success);
}

#[tokio::test]
async fn launches_missing_from_metadata_are_accounted_for() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("dash.csv");
    let meta = dir.path().join("geo.csv");
    write_csv(
        &data,
        &["Launch Site", "class", "Payload Mass (kg)", "Booster Version Category"],
        &["CCAFS LC-40,0,0,v1.0", "KSC LC-39A,1,2490,FT", "VAFB SLC-4E,1,9600,B4"],
    );
    write_csv(&meta, &["Launch Site", "Lat", "Long"], &["KSC LC-39A,28.573,-80.646"]);

    let (ds, report) = load(&config(&data, Some(&meta))).await.unwrap();
    assert_eq!(ds.len(), 1);
    assert_eq!(report.sources[0].rows_read, 3);
    assert_eq!(report.unmatched_outcome_rows, 2);
    assert!(report.warnings.iter().any(|w| w.starts_with("unmatched_outcome_rows: 2")));

    let manifest = build_manifest(&ds, &report);
    assert_eq!(
        manifest.row_count + manifest.unmatched_outcome_rows + manifest.rows_outside_allow_list + manifest.bad_rows,
        3
    );
}

#[test]
fn manifest_written_next_to_csv() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("spacex_launch_dash.csv");
    write_csv(
        &path,
        &["Flight Number", "Launch Site", "class", "Payload Mass (kg)", "Booster Version Category"],
        &ROWS,
    );
    let src = SourceBytes::read_file(&path).unwrap();
    let (ds, report) = build_dataset(&src, None, &default_allowed_sites()).unwrap();
    let manifest = build_manifest(&ds, &report);
    let out = default_manifest_path(&path);
    fs::write(&out, serde_json::to_string_pretty(&manifest).unwrap()).unwrap();

    let back: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(back["row_count"], 4);
    assert_eq!(back["successes"], 3);
    assert_eq!(back["sources"][0]["sha256"].as_str().unwrap().len(), 64);
}
