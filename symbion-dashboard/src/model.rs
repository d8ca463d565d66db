//! Core value types shared by the fetcher and the renderer
//!
//! - `MetricsRecord`: normalized snapshot of one host
//! - `MonitoredHost`: static host configuration + last-known-good record
//! - `MetricKind` / `Rgb`: metric identity and colors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hostname label used when a fetch failed before any successful one
pub const ERROR_HOSTNAME: &str = "Error";

/// Hostname label used when the producer did not send one
pub const UNKNOWN_HOSTNAME: &str = "Unknown";

/// Connectivity of a host as seen by the last poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityStatus {
    Ok,
    Stale,
}

/// One host snapshot, replaced wholesale every poll cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub disk_percent: f64,
    pub hostname: String,
    pub status: ConnectivityStatus,
}

impl MetricsRecord {
    /// Record shown before the first successful fetch
    pub fn default_error() -> Self {
        Self {
            cpu_percent: 0.0,
            ram_percent: 0.0,
            disk_percent: 0.0,
            hostname: ERROR_HOSTNAME.to_string(),
            status: ConnectivityStatus::Stale,
        }
    }

    /// Same readings, flagged as no longer fresh
    pub fn into_stale(self) -> Self {
        Self {
            status: ConnectivityStatus::Stale,
            ..self
        }
    }

    pub fn is_stale(&self) -> bool {
        self.status == ConnectivityStatus::Stale
    }

    pub fn value(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Cpu => self.cpu_percent,
            MetricKind::Ram => self.ram_percent,
            MetricKind::Disk => self.disk_percent,
        }
    }
}

impl Default for MetricsRecord {
    fn default() -> Self {
        Self::default_error()
    }
}

/// The three metrics drawn for every host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Cpu,
    Ram,
    Disk,
}

impl MetricKind {
    /// Draw order inside a host column
    pub const ALL: [MetricKind; 3] = [MetricKind::Cpu, MetricKind::Ram, MetricKind::Disk];

    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU",
            MetricKind::Ram => "RAM",
            MetricKind::Disk => "DISK",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 24-bit color, written `rgb(r,g,b)` or `#rrggbb` in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const GOLD: Rgb = Rgb::new(255, 215, 0);
    pub const GREEN: Rgb = Rgb::new(100, 255, 100);
    pub const BLUE: Rgb = Rgb::new(0, 47, 167);
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale toward black; `intensity` 1.0 keeps the color, 0.0 gives black
    pub fn dimmed(self, intensity: f64) -> Self {
        let k = intensity.clamp(0.0, 1.0);
        let scale = |c: u8| (f64::from(c) * k).round() as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}': expected rgb(r,g,b) or #rrggbb")]
pub struct ColorParseError(pub String);

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let err = || ColorParseError(s.to_string());

        if let Some(hex) = raw.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(err());
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
            return Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?));
        }

        let inner = raw
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(err)?;
        let channels: Vec<u8> = inner
            .split(',')
            .map(|part| part.trim().parse::<u8>().map_err(|_| err()))
            .collect::<Result<_, _>>()?;
        match channels.as_slice() {
            [r, g, b] => Ok(Rgb::new(*r, *g, *b)),
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

/// A monitored server: fixed configuration plus the last record fetched for it
#[derive(Debug, Clone)]
pub struct MonitoredHost {
    pub display_name: String,
    pub primary_color: Rgb,
    pub endpoint_url: String,
    /// Fraction of the surface width where this host's column starts
    pub horizontal_position: f64,
    pub last_record: MetricsRecord,
}

impl MonitoredHost {
    pub fn new(
        display_name: impl Into<String>,
        primary_color: Rgb,
        endpoint_url: impl Into<String>,
        horizontal_position: f64,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            primary_color,
            endpoint_url: endpoint_url.into(),
            horizontal_position,
            last_record: MetricsRecord::default_error(),
        }
    }

    /// CPU glyph color: identity color while reachable, alarm color once stale
    pub fn status_color(&self, alarm: Rgb) -> Rgb {
        match self.last_record.status {
            ConnectivityStatus::Ok => self.primary_color,
            ConnectivityStatus::Stale => alarm,
        }
    }
}
