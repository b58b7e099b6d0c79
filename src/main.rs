use anyhow::Result;
use std::sync::Arc;

use launchdash::controller::Controller;
use launchdash::data::{self, manifest::build_manifest};
use launchdash::logging::{log, obj, v_str, Domain, Level};
use launchdash::server::{self, Dashboard};
use launchdash::state::Config;

fn main() -> Result<()> {
    let cfg = Config::from_env();
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("data_source", v_str(&cfg.data_source)),
            ("meta_source", cfg.meta_source.as_deref().map(v_str).unwrap_or(serde_json::Value::Null)),
            ("variant", serde_json::to_value(cfg.variant)?),
            ("addr", v_str(&cfg.bind_addr())),
        ]),
    );

    // One blocking load before anything is served.
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let (dataset, report) = match runtime.block_on(data::load(&cfg)) {
        Ok(loaded) => loaded,
        Err(err) => {
            log(
                Level::Fatal,
                Domain::Data,
                "load_failed",
                obj(&[("error", v_str(&err.to_string()))]),
            );
            return Err(err.into());
        }
    };
    drop(runtime);

    let manifest = build_manifest(&dataset, &report);
    let controller = Controller::new(Arc::new(dataset), cfg.variant);
    let listener = server::bind(&cfg)?;
    server::serve(listener, Dashboard::new(controller, manifest))
}
