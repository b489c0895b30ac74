//! Process-wide tracing subscriber for the exam server.
//!
//! `LOG_LEVEL` takes EnvFilter directives and falls back to [`DEFAULT_FILTER`]
//! when unset or unparsable. `LOG_FORMAT=json` switches to one JSON object per
//! event; anything else prints human-readable lines.
//!
//! Crate targets: `hsk_mock` (startup, transport), `corpus` (file loading and
//! lookups), `exam` (question assembly, grading, results).

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,hsk_mock=debug,exam=debug,corpus=info,tower_http=info,axum=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn filter_from(raw: Option<&str>) -> EnvFilter {
    raw.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").ok();
    let format = std::env::var("LOG_FORMAT").ok();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_from(level.as_deref()))
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match LogFormat::parse(format.as_deref()) {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
