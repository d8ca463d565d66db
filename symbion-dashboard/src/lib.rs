//! Symbion Dashboard - live resource glyphs for the monitored hosts
//!
//! Polls each host's metrics endpoint on a fixed period and draws, per host,
//! one glyph (disc + connector + label) for CPU, RAM and disk usage:
//! - `fetcher`: timed GET + JSON parsing with last-known-good fallback
//! - `layout` / `render`: pure glyph geometry and drawing on a `Surface`
//! - `dashboard`: the poll-render cycle
//! - `terminal`: ratatui canvas surface and the interactive loop

pub mod config;
pub mod dashboard;
pub mod fetcher;
pub mod layout;
pub mod model;
pub mod render;
pub mod terminal;

pub use config::{load_config, ConfigError, DashboardConfig};
pub use dashboard::Dashboard;
pub use fetcher::{FetchError, MetricsFetcher};
pub use model::{ConnectivityStatus, MetricKind, MetricsRecord, MonitoredHost, Rgb};
