//! Glyph layout: pure geometry from records + theme + surface size
//!
//! Coordinates are surface pixels with the origin top-left and y growing
//! downward. Host columns and metric lanes are fractions of the width, the
//! vertical travel is a fraction of the height, so the layout follows the
//! surface when it is resized. Radius and connector lengths stay in pixels.

use crate::model::{MetricKind, MonitoredHost, Rgb};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Colors, lanes and geometry injected into the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// CPU glyph color for a host that stopped answering
    pub alarm_color: Rgb,
    /// Opacity of the black overlay laid over the previous frame; 1.0 is a hard clear
    pub fade_alpha: f64,
    pub cpu: LaneStyle,
    #[serde(deserialize_with = "ram_style")]
    pub ram: MetricStyle,
    #[serde(deserialize_with = "disk_style")]
    pub disk: MetricStyle,
    pub geometry: Geometry,
}

/// CPU has no identity color of its own: it shows connectivity instead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneStyle {
    #[serde(default)]
    pub lane_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStyle {
    pub color: Rgb,
    pub lane_offset: f64,
}

impl MetricStyle {
    pub const RAM: Self = Self { color: Rgb::GREEN, lane_offset: 0.15 };
    pub const DISK: Self = Self { color: Rgb::WHITE, lane_offset: 0.30 };
}

/// A metric block as written in the config; absent fields keep the metric's own defaults
#[derive(Deserialize)]
struct MetricStyleOverride {
    color: Option<Rgb>,
    lane_offset: Option<f64>,
}

impl MetricStyleOverride {
    fn over(self, base: MetricStyle) -> MetricStyle {
        MetricStyle {
            color: self.color.unwrap_or(base.color),
            lane_offset: self.lane_offset.unwrap_or(base.lane_offset),
        }
    }
}

fn ram_style<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MetricStyle, D::Error> {
    MetricStyleOverride::deserialize(deserializer).map(|o| o.over(MetricStyle::RAM))
}

fn disk_style<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MetricStyle, D::Error> {
    MetricStyleOverride::deserialize(deserializer).map(|o| o.over(MetricStyle::DISK))
}

#[derive(Debug, thiserror::Error)]
#[error("theme.{field} must be {constraint}")]
pub struct ThemeError {
    pub field: &'static str,
    pub constraint: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    /// y of a 0% glyph, as a fraction of the height
    pub baseline_fraction: f64,
    /// Distance climbed by a 100% glyph, as a fraction of the height
    pub travel_fraction: f64,
    pub min_radius: f64,
    pub radius_per_percent: f64,
    pub diagonal_length: f64,
    pub horizontal_length: f64,
    pub line_width: f64,
    pub text_padding_x: f64,
    pub text_offset_y: f64,
    pub line_height: f64,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            alarm_color: Rgb::RED,
            fade_alpha: 0.35,
            cpu: LaneStyle { lane_offset: 0.0 },
            ram: MetricStyle::RAM,
            disk: MetricStyle::DISK,
            geometry: Geometry::default(),
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            baseline_fraction: 0.9,
            travel_fraction: 0.75,
            min_radius: 2.0,
            radius_per_percent: 0.06,
            diagonal_length: 4.0,
            horizontal_length: 8.0,
            line_width: 1.0,
            text_padding_x: 2.0,
            text_offset_y: -2.0,
            line_height: 4.0,
        }
    }
}

impl Theme {
    pub fn lane_offset(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Cpu => self.cpu.lane_offset,
            MetricKind::Ram => self.ram.lane_offset,
            MetricKind::Disk => self.disk.lane_offset,
        }
    }

    pub fn glyph_color(&self, metric: MetricKind, host: &MonitoredHost) -> Rgb {
        match metric {
            MetricKind::Cpu => host.status_color(self.alarm_color),
            MetricKind::Ram => self.ram.color,
            MetricKind::Disk => self.disk.color,
        }
    }

    /// Grows with usage; a 0% metric keeps `min_radius` so it stays visible
    pub fn radius(&self, percent: f64) -> f64 {
        self.geometry.min_radius + percent.max(0.0) * self.geometry.radius_per_percent
    }

    pub fn validate(&self) -> Result<(), ThemeError> {
        let g = &self.geometry;
        if !(self.fade_alpha > 0.0 && self.fade_alpha <= 1.0) {
            return Err(ThemeError { field: "fade_alpha", constraint: "within (0, 1]" });
        }
        for (name, value) in [
            ("cpu.lane_offset", self.cpu.lane_offset),
            ("ram.lane_offset", self.ram.lane_offset),
            ("disk.lane_offset", self.disk.lane_offset),
            ("geometry.baseline_fraction", g.baseline_fraction),
            ("geometry.travel_fraction", g.travel_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ThemeError { field: name, constraint: "within [0, 1]" });
            }
        }
        for (name, value) in [
            ("geometry.min_radius", g.min_radius),
            ("geometry.radius_per_percent", g.radius_per_percent),
            ("geometry.diagonal_length", g.diagonal_length),
            ("geometry.horizontal_length", g.horizontal_length),
            ("geometry.line_width", g.line_width),
            ("geometry.line_height", g.line_height),
        ] {
            if !(value >= 0.0) {
                return Err(ThemeError { field: name, constraint: ">= 0" });
            }
        }
        Ok(())
    }
}

/// Everything needed to draw one metric of one host
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub host: String,
    pub metric: MetricKind,
    pub percent: f64,
    pub center: Point,
    pub radius: f64,
    pub color: Rgb,
    /// Circle edge, end of the diagonal, end of the horizontal (label anchor)
    pub connector: [Point; 3],
    pub name_anchor: Point,
    pub value_anchor: Point,
    pub name_label: String,
    pub value_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameLayout {
    pub size: SurfaceSize,
    pub glyphs: Vec<Glyph>,
}

impl FrameLayout {
    pub fn glyph(&self, host: &str, metric: MetricKind) -> Option<&Glyph> {
        self.glyphs
            .iter()
            .find(|g| g.host == host && g.metric == metric)
    }
}

pub fn value_label(metric: MetricKind, percent: f64) -> String {
    format!("{}: {:.1}%", metric.label(), percent)
}

/// Lay out the three glyphs of every host for the given surface
pub fn layout_frame(hosts: &[MonitoredHost], theme: &Theme, size: SurfaceSize) -> FrameLayout {
    let g = &theme.geometry;
    let baseline = g.baseline_fraction * size.height;
    let travel = g.travel_fraction * size.height;

    let mut glyphs = Vec::with_capacity(hosts.len() * MetricKind::ALL.len());
    for host in hosts {
        let record = &host.last_record;
        let column = host.horizontal_position * size.width;

        for metric in MetricKind::ALL {
            let percent = record.value(metric);
            let center = Point::new(
                column + theme.lane_offset(metric) * size.width,
                baseline - percent / 100.0 * travel,
            );
            let radius = theme.radius(percent);

            let edge = Point::new(center.x + radius, center.y);
            let diagonal_end = Point::new(edge.x + g.diagonal_length, edge.y - g.diagonal_length);
            let anchor = Point::new(diagonal_end.x + g.horizontal_length, diagonal_end.y);

            let name_anchor = Point::new(anchor.x + g.text_padding_x, anchor.y + g.text_offset_y);
            let value_anchor = Point::new(name_anchor.x, name_anchor.y + g.line_height);

            glyphs.push(Glyph {
                host: host.display_name.clone(),
                metric,
                percent,
                center,
                radius,
                color: theme.glyph_color(metric, host),
                connector: [edge, diagonal_end, anchor],
                name_anchor,
                value_anchor,
                name_label: record.hostname.clone(),
                value_label: value_label(metric, percent),
            });
        }
    }

    FrameLayout { size, glyphs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConnectivityStatus, MetricsRecord};

    fn host(name: &str, color: Rgb, x: f64, record: MetricsRecord) -> MonitoredHost {
        let mut host = MonitoredHost::new(name, color, "http://127.0.0.1:9/metrics", x);
        host.last_record = record;
        host
    }

    fn record(cpu: f64, ram: f64, disk: f64, hostname: &str, status: ConnectivityStatus) -> MetricsRecord {
        MetricsRecord {
            cpu_percent: cpu,
            ram_percent: ram,
            disk_percent: disk,
            hostname: hostname.into(),
            status,
        }
    }

    #[test]
    fn test_radius_is_monotonic_with_floor() {
        let theme = Theme::default();
        assert!(theme.radius(0.0) >= theme.geometry.min_radius);
        assert_eq!(theme.radius(-1.0), theme.geometry.min_radius);

        let mut previous = theme.radius(0.0);
        for step in 1..=1000 {
            let r = theme.radius(step as f64 * 0.1);
            assert!(r >= previous);
            previous = r;
        }
    }

    #[test]
    fn test_higher_usage_draws_higher() {
        let theme = Theme::default();
        let size = SurfaceSize::new(400.0, 200.0);
        let hosts = vec![host("gold", Rgb::GOLD, 0.0, record(90.0, 10.0, 0.0, "gold-1", ConnectivityStatus::Ok))];
        let frame = layout_frame(&hosts, &theme, size);

        let cpu = frame.glyph("gold", MetricKind::Cpu).unwrap();
        let ram = frame.glyph("gold", MetricKind::Ram).unwrap();
        let disk = frame.glyph("gold", MetricKind::Disk).unwrap();
        assert!(cpu.center.y < ram.center.y);
        assert!(ram.center.y < disk.center.y);
        assert_eq!(disk.center.y, 0.9 * 200.0);
    }

    #[test]
    fn test_positions_scale_with_surface() {
        let theme = Theme::default();
        let hosts = vec![host("blue", Rgb::BLUE, 0.5, record(50.0, 50.0, 50.0, "blue-1", ConnectivityStatus::Ok))];

        let small = layout_frame(&hosts, &theme, SurfaceSize::new(200.0, 100.0));
        let large = layout_frame(&hosts, &theme, SurfaceSize::new(400.0, 200.0));
        let s = small.glyph("blue", MetricKind::Ram).unwrap();
        let l = large.glyph("blue", MetricKind::Ram).unwrap();
        assert!((s.center.x * 2.0 - l.center.x).abs() < 1e-9);
        assert!((s.center.y * 2.0 - l.center.y).abs() < 1e-9);
        assert!((s.center.x - (0.5 + 0.15) * 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_connector_shape() {
        let theme = Theme::default();
        let g = &theme.geometry;
        let hosts = vec![host("gold", Rgb::GOLD, 0.1, record(20.0, 0.0, 0.0, "gold-1", ConnectivityStatus::Ok))];
        let frame = layout_frame(&hosts, &theme, SurfaceSize::new(300.0, 120.0));
        let glyph = frame.glyph("gold", MetricKind::Cpu).unwrap();

        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;

        let [edge, diag, anchor] = glyph.connector;
        assert_eq!(edge, Point::new(glyph.center.x + glyph.radius, glyph.center.y));
        assert!(close(diag.x - edge.x, g.diagonal_length));
        assert!(close(edge.y - diag.y, g.diagonal_length));
        assert_eq!(anchor.y, diag.y);
        assert!(close(anchor.x - diag.x, g.horizontal_length));
        assert!(close(glyph.value_anchor.y - glyph.name_anchor.y, g.line_height));
    }

    #[test]
    fn test_scenario_fresh_host_colors_and_labels() {
        let theme = Theme::default();
        let hosts = vec![host("gold", Rgb::GOLD, 0.02, record(73.2, 40.0, 88.9, "gold-1", ConnectivityStatus::Ok))];
        let frame = layout_frame(&hosts, &theme, SurfaceSize::new(320.0, 160.0));

        let cpu = frame.glyph("gold", MetricKind::Cpu).unwrap();
        assert_eq!(cpu.color, Rgb::GOLD);
        assert_eq!(cpu.value_label, "CPU: 73.2%");
        assert_eq!(cpu.name_label, "gold-1");
        assert_eq!(frame.glyph("gold", MetricKind::Ram).unwrap().value_label, "RAM: 40.0%");
        assert_eq!(frame.glyph("gold", MetricKind::Disk).unwrap().value_label, "DISK: 88.9%");
    }

    #[test]
    fn test_scenario_stale_host_only_recolors_cpu() {
        let theme = Theme::default();
        let hosts = vec![host("blue", Rgb::BLUE, 0.52, record(10.0, 20.0, 30.0, "blue-1", ConnectivityStatus::Stale))];
        let frame = layout_frame(&hosts, &theme, SurfaceSize::new(320.0, 160.0));

        assert_eq!(frame.glyph("blue", MetricKind::Cpu).unwrap().color, theme.alarm_color);
        assert_eq!(frame.glyph("blue", MetricKind::Ram).unwrap().color, theme.ram.color);
        assert_eq!(frame.glyph("blue", MetricKind::Disk).unwrap().color, theme.disk.color);
        assert_eq!(frame.glyph("blue", MetricKind::Cpu).unwrap().value_label, "CPU: 10.0%");
    }

    #[test]
    fn test_layout_is_idempotent() {
        let theme = Theme::default();
        let size = SurfaceSize::new(640.0, 240.0);
        let hosts = vec![
            host("gold", Rgb::GOLD, 0.02, record(73.2, 40.0, 88.9, "gold-1", ConnectivityStatus::Ok)),
            host("blue", Rgb::BLUE, 0.52, record(10.0, 20.0, 30.0, "blue-1", ConnectivityStatus::Stale)),
        ];
        assert_eq!(layout_frame(&hosts, &theme, size), layout_frame(&hosts, &theme, size));
        assert_eq!(layout_frame(&hosts, &theme, size).glyphs.len(), 6);
    }

    #[test]
    fn test_theme_validation() {
        Theme::default().validate().unwrap();

        let theme = Theme { fade_alpha: 0.0, ..Theme::default() };
        assert!(theme.validate().is_err());

        let mut theme = Theme::default();
        theme.geometry.min_radius = -1.0;
        assert!(theme.validate().is_err());

        let mut theme = Theme::default();
        theme.disk.lane_offset = 1.2;
        let err = theme.validate().unwrap_err();
        assert_eq!(err.field, "disk.lane_offset");
        assert_eq!(err.to_string(), "theme.disk.lane_offset must be within [0, 1]");
    }

    #[test]
    fn test_metric_block_defaults_per_metric() {
        let theme: Theme = serde_yaml::from_str("ram: { lane_offset: 0.2 }\ndisk: {}\n").unwrap();
        assert_eq!(theme.ram, MetricStyle { color: Rgb::GREEN, lane_offset: 0.2 });
        assert_eq!(theme.disk, MetricStyle::DISK);
        assert_eq!(theme.cpu, LaneStyle { lane_offset: 0.0 });
    }
}
