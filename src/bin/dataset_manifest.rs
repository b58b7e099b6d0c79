use launchdash::data::manifest::{build_manifest, default_manifest_path};
use launchdash::data::{build_dataset, LoadError, SourceBytes};
use launchdash::state::Config;
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "spacex_launch_dash.csv".to_string());
    let meta = env::args().nth(2);
    let cfg = Config::from_env();

    let primary = match SourceBytes::read_file(&path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };
    let metadata = match meta.as_deref().map(SourceBytes::read_file).transpose() {
        Ok(m) => m,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };

    let (dataset, report) = match build_dataset(&primary, metadata.as_ref(), &cfg.allowed_sites) {
        Ok(loaded) => loaded,
        Err(err @ LoadError::MissingColumns { .. }) => {
            eprintln!("schema mismatch: {}", err);
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("load failed: {}", err);
            std::process::exit(3);
        }
    };

    let out_path = default_manifest_path(PathBuf::from(&path).as_path());
    let body = match serde_json::to_string_pretty(&build_manifest(&dataset, &report)) {
        Ok(b) => b,
        Err(err) => {
            eprintln!("failed to encode manifest: {}", err);
            std::process::exit(4);
        }
    };
    if let Err(err) = fs::write(&out_path, body) {
        eprintln!("failed to write {}: {}", out_path.display(), err);
        std::process::exit(4);
    }
    println!("wrote manifest {}", out_path.display());
}
