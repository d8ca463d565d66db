//! Frame renderer
//!
//! `render_frame` fades the surface, lays out every host's glyphs and draws
//! them. Drawing goes through the `Surface` trait so the same frame can land
//! on the terminal canvas or in a `RecordingSurface` (headless mode, tests).

use crate::layout::{layout_frame, FrameLayout, Point, SurfaceSize, Theme};
use crate::model::{MonitoredHost, Rgb};

/// A 2D drawing target sized in pixels, origin top-left
pub trait Surface {
    fn size(&self) -> SurfaceSize;

    /// Lay a black overlay of opacity `alpha` over what is already drawn
    fn fade(&mut self, alpha: f64);

    fn clear(&mut self) {
        self.fade(1.0);
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgb);

    fn stroke_polyline(&mut self, points: &[Point], width: f64, color: Rgb);

    fn text(&mut self, at: Point, text: &str, color: Rgb);
}

/// Draw one frame for the current records of `hosts`
pub fn render_frame<S: Surface + ?Sized>(surface: &mut S, hosts: &[MonitoredHost], theme: &Theme) {
    if theme.fade_alpha >= 1.0 {
        surface.clear();
    } else {
        surface.fade(theme.fade_alpha);
    }

    let layout = layout_frame(hosts, theme, surface.size());
    draw_layout(surface, &layout, theme);
}

pub fn draw_layout<S: Surface + ?Sized>(surface: &mut S, layout: &FrameLayout, theme: &Theme) {
    for glyph in &layout.glyphs {
        surface.fill_circle(glyph.center, glyph.radius, glyph.color);
        surface.stroke_polyline(&glyph.connector, theme.geometry.line_width, glyph.color);
        surface.text(glyph.name_anchor, &glyph.name_label, glyph.color);
        surface.text(glyph.value_anchor, &glyph.value_label, glyph.color);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Fade { alpha: f64 },
    Circle { center: Point, radius: f64, color: Rgb },
    Polyline { points: Vec<Point>, width: f64, color: Rgb },
    Text { at: Point, text: String, color: Rgb },
}

/// In-memory surface keeping every draw call of the current frame
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: SurfaceSize,
    commands: Vec<DrawCommand>,
    frames: u64,
}

impl RecordingSurface {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            commands: Vec::new(),
            frames: 0,
        }
    }

    pub fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Frames started so far (one per fade/clear)
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// `(center, radius, color)` of every circle drawn since the last fade
    pub fn circles(&self) -> Vec<(Point, f64, Rgb)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Circle { center, radius, color } => Some((*center, *radius, *color)),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<(&str, Rgb)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, color, .. } => Some((text.as_str(), *color)),
                _ => None,
            })
            .collect()
    }

    /// Color of the text line exactly equal to `label`
    pub fn text_color(&self, label: &str) -> Option<Rgb> {
        self.texts()
            .into_iter()
            .find(|(text, _)| *text == label)
            .map(|(_, color)| color)
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn fade(&mut self, alpha: f64) {
        // A recording only keeps the frame being drawn.
        self.commands.clear();
        self.commands.push(DrawCommand::Fade { alpha });
        self.frames += 1;
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgb) {
        self.commands.push(DrawCommand::Circle { center, radius, color });
    }

    fn stroke_polyline(&mut self, points: &[Point], width: f64, color: Rgb) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            width,
            color,
        });
    }

    fn text(&mut self, at: Point, text: &str, color: Rgb) {
        self.commands.push(DrawCommand::Text {
            at,
            text: text.to_string(),
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConnectivityStatus, MetricsRecord};

    fn hosts() -> Vec<MonitoredHost> {
        let mut gold = MonitoredHost::new("gold", Rgb::GOLD, "http://127.0.0.1:9/metrics", 0.02);
        gold.last_record = MetricsRecord {
            cpu_percent: 73.2,
            ram_percent: 40.0,
            disk_percent: 88.9,
            hostname: "gold-1".into(),
            status: ConnectivityStatus::Ok,
        };
        let blue = MonitoredHost::new("blue", Rgb::BLUE, "http://127.0.0.1:9/metrics", 0.52);
        vec![gold, blue]
    }

    #[test]
    fn test_frame_draws_three_glyphs_per_host() {
        let mut surface = RecordingSurface::new(SurfaceSize::new(320.0, 160.0));
        render_frame(&mut surface, &hosts(), &Theme::default());

        assert_eq!(surface.frames(), 1);
        assert_eq!(surface.commands()[0], DrawCommand::Fade { alpha: 0.35 });
        assert_eq!(surface.circles().len(), 6);
        assert_eq!(surface.texts().len(), 12);

        let polylines = surface
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::Polyline { points, .. } if points.len() == 3))
            .count();
        assert_eq!(polylines, 6);
    }

    #[test]
    fn test_cpu_label_colors() {
        let theme = Theme::default();
        let mut surface = RecordingSurface::new(SurfaceSize::new(320.0, 160.0));
        render_frame(&mut surface, &hosts(), &theme);

        assert_eq!(surface.text_color("CPU: 73.2%"), Some(Rgb::GOLD));
        // blue never answered: default error record, alarm colored
        assert_eq!(surface.text_color("CPU: 0.0%"), Some(theme.alarm_color));
        // first "Error" label belongs to blue's CPU glyph
        assert_eq!(surface.text_color("Error"), Some(theme.alarm_color));
        assert_eq!(surface.text_color("RAM: 40.0%"), Some(theme.ram.color));
    }

    #[test]
    fn test_hard_clear_when_alpha_is_one() {
        let theme = Theme { fade_alpha: 1.0, ..Theme::default() };
        let mut surface = RecordingSurface::new(SurfaceSize::new(100.0, 100.0));
        render_frame(&mut surface, &hosts(), &theme);
        assert_eq!(surface.commands()[0], DrawCommand::Fade { alpha: 1.0 });
    }

    #[test]
    fn test_render_is_idempotent() {
        let theme = Theme::default();
        let size = SurfaceSize::new(640.0, 200.0);
        let mut first = RecordingSurface::new(size);
        let mut second = RecordingSurface::new(size);
        render_frame(&mut first, &hosts(), &theme);
        render_frame(&mut second, &hosts(), &theme);
        assert_eq!(first.commands(), second.commands());

        // Same surface, second frame: identical draw list
        let before = first.commands().to_vec();
        render_frame(&mut first, &hosts(), &theme);
        assert_eq!(first.commands(), before.as_slice());
        assert_eq!(first.frames(), 2);
    }
}
