//! Single-threaded HTTP surface for the dashboard.
//!
//! Requests are served one at a time off a blocking `TcpListener`, so control
//! events reach the controller strictly in arrival order.
//!
//! Endpoints (GET):
//!   /api/health, /api/layout, /api/charts, /api/success-rates, /api/manifest
//!   /api/select?site=..   /api/payload?min=..&max=..   /api/preset?name=..

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use url::Url;

use crate::controller::{ControlEvent, Controller};
use crate::data::manifest::DatasetManifest;
use crate::logging::{log, log_request, obj, v_str, Domain, Level};
use crate::state::{Config, PayloadPreset, PayloadRange};

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status: "200 OK",
                content_type: "application/json",
                body,
            },
            Err(err) => Self::error("500 INTERNAL SERVER ERROR", &err.to_string()),
        }
    }

    fn error(status: &'static str, message: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }

    fn bad_request(message: &str) -> Self {
        Self::error("400 BAD REQUEST", message)
    }

    pub fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {}\r\n\
             Content-Type: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Content-Length: {}\r\n\r\n{}",
            self.status,
            self.content_type,
            self.body.len(),
            self.body
        )
    }
}

pub struct Dashboard {
    controller: Controller,
    manifest: DatasetManifest,
}

impl Dashboard {
    pub fn new(controller: Controller, manifest: DatasetManifest) -> Self {
        Self { controller, manifest }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Routes one HTTP request line, e.g. `GET /api/charts HTTP/1.1`.
    pub fn route(&mut self, request_line: &str) -> Response {
        let mut parts = request_line.split_whitespace();
        let (method, target) = match (parts.next(), parts.next()) {
            (Some(m), Some(t)) => (m, t),
            _ => return Response::bad_request("malformed request line"),
        };
        if method != "GET" {
            return Response::error("405 METHOD NOT ALLOWED", "only GET is supported");
        }
        let url = match Url::parse("http://localhost").and_then(|base| base.join(target)) {
            Ok(u) => u,
            Err(err) => return Response::bad_request(&err.to_string()),
        };
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

        let response = match url.path() {
            "/api/health" => Response::json(&serde_json::json!({ "status": "ok" })),
            "/api/layout" => Response::json(&self.controller.layout()),
            "/api/charts" => Response::json(&self.controller.charts()),
            "/api/success-rates" => Response::json(self.controller.success_rates()),
            "/api/manifest" => Response::json(&self.manifest),
            "/api/select" => match self.site_event(&query) {
                Ok(event) => Response::json(&self.controller.handle(event)),
                Err(msg) => Response::bad_request(&msg),
            },
            "/api/payload" => match payload_event(&query) {
                Ok(event) => Response::json(&self.controller.handle(event)),
                Err(msg) => Response::bad_request(&msg),
            },
            "/api/preset" => match preset_event(&query) {
                Ok(event) => Response::json(&self.controller.handle(event)),
                Err(msg) => Response::bad_request(&msg),
            },
            _ => Response {
                status: "404 NOT FOUND",
                content_type: "text/plain",
                body: "Not Found".to_string(),
            },
        };
        log_request(url.path(), response.status);
        response
    }

    fn site_event(&self, query: &HashMap<String, String>) -> Result<ControlEvent, String> {
        let value = query.get("site").ok_or("missing site parameter")?;
        self.controller
            .dataset()
            .selection(value)
            .map(ControlEvent::SelectSite)
            .ok_or_else(|| format!("unknown site: {}", value))
    }
}

fn bound(query: &HashMap<String, String>, key: &str) -> Result<f64, String> {
    let raw = query.get(key).ok_or_else(|| format!("missing {} parameter", key))?;
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("{} is not a number: {}", key, raw))
}

fn payload_event(query: &HashMap<String, String>) -> Result<ControlEvent, String> {
    Ok(ControlEvent::SetPayloadRange(PayloadRange::new(
        bound(query, "min")?,
        bound(query, "max")?,
    )))
}

fn preset_event(query: &HashMap<String, String>) -> Result<ControlEvent, String> {
    let name = query.get("name").ok_or("missing name parameter")?;
    PayloadPreset::parse(name)
        .map(ControlEvent::ApplyPreset)
        .ok_or_else(|| format!("unknown preset: {}", name))
}

pub fn bind(cfg: &Config) -> Result<TcpListener> {
    let addr = cfg.bind_addr();
    TcpListener::bind(&addr).with_context(|| format!("failed to bind {}", addr))
}

/// Serves until the listener fails.
pub fn serve(listener: TcpListener, mut dashboard: Dashboard) -> Result<()> {
    let addr = listener.local_addr()?;
    log(
        Level::Info,
        Domain::Server,
        "listening",
        obj(&[("addr", v_str(&addr.to_string()))]),
    );

    for stream in listener.incoming() {
        let mut stream = match stream {
            Ok(s) => s,
            Err(_) => continue,
        };

        let request = match BufReader::new(&stream).lines().next() {
            Some(Ok(line)) => line,
            _ => continue,
        };

        let response = dashboard.route(&request);
        if let Err(err) = write_response(&mut stream, &response) {
            log(
                Level::Warn,
                Domain::Server,
                "write_failed",
                obj(&[("request", v_str(&request)), ("error", v_str(&err.to_string()))]),
            );
        }
    }
    Ok(())
}

fn write_response<W: Write>(out: &mut W, response: &Response) -> std::io::Result<()> {
    out.write_all(response.to_http().as_bytes())?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::manifest::build_manifest;
    use crate::data::{build_dataset, SourceBytes};
    use crate::state::{default_allowed_sites, DashVariant};
    use std::sync::Arc;

    fn dashboard() -> Dashboard {
        let csv = "Launch Site,class,Payload Mass (kg),Booster Version Category\n\
                   CCAFS LC-40,0,0,v1.0\n\
                   KSC LC-39A,1,2490,FT\n\
                   VAFB SLC-4E,1,9600,B4\n";
        let (ds, report) =
            build_dataset(&SourceBytes::new("dash.csv", csv), None, &default_allowed_sites()).unwrap();
        let manifest = build_manifest(&ds, &report);
        Dashboard::new(Controller::new(Arc::new(ds), DashVariant::Full), manifest)
    }

    #[test]
    fn health_and_unknown_paths() {
        let mut d = dashboard();
        assert_eq!(d.route("GET /api/health HTTP/1.1").body, r#"{"status":"ok"}"#);
        assert_eq!(d.route("GET /nope HTTP/1.1").status, "404 NOT FOUND");
        assert_eq!(d.route("POST /api/charts HTTP/1.1").status, "405 METHOD NOT ALLOWED");
        assert_eq!(d.route("garbage").status, "400 BAD REQUEST");
    }

    #[test]
    fn select_decodes_site_and_updates_state() {
        let mut d = dashboard();
        let resp = d.route("GET /api/select?site=KSC%20LC-39A HTTP/1.1");
        assert_eq!(resp.status, "200 OK");
        let charts: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(charts.as_array().unwrap().len(), 3);
        assert_eq!(d.controller().state().selected_site.as_str(), "KSC LC-39A");
    }

    #[test]
    fn bad_queries_are_rejected_before_the_controller() {
        let mut d = dashboard();
        assert_eq!(d.route("GET /api/select?site=Boca+Chica HTTP/1.1").status, "400 BAD REQUEST");
        assert_eq!(d.route("GET /api/payload?min=abc&max=10 HTTP/1.1").status, "400 BAD REQUEST");
        assert_eq!(d.route("GET /api/preset?name=huge HTTP/1.1").status, "400 BAD REQUEST");
        assert_eq!(d.controller().state().payload_range, PayloadRange::new(0.0, 9600.0));
    }

    #[test]
    fn payload_and_preset_events() {
        let mut d = dashboard();
        assert_eq!(d.route("GET /api/payload?min=100&max=3000 HTTP/1.1").status, "200 OK");
        assert_eq!(d.controller().state().payload_range, PayloadRange::new(100.0, 3000.0));
        assert_eq!(d.route("GET /api/preset?name=all HTTP/1.1").status, "200 OK");
        assert_eq!(d.controller().state().payload_range, PayloadRange::new(0.0, 9600.0));
    }

    struct ClosedPeer;

    impl Write for ClosedPeer {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_surface_to_the_loop() {
        let mut d = dashboard();
        let resp = d.route("GET /api/health HTTP/1.1");
        let err = write_response(&mut ClosedPeer, &resp).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);

        let mut buf = Vec::new();
        write_response(&mut buf, &resp).unwrap();
        assert!(String::from_utf8(buf).unwrap().ends_with(r#"{"status":"ok"}"#));
    }

    #[test]
    fn http_framing_carries_length_and_cors() {
        let mut d = dashboard();
        let raw = d.route("GET /api/health HTTP/1.1").to_http();
        assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(raw.contains("Access-Control-Allow-Origin: *"));
        assert!(raw.contains("Content-Length: 15"));
    }
}
