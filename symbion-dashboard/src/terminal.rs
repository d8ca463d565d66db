//! Terminal display surface
//!
//! The viewport is a ratatui `Canvas` with Braille markers: one surface pixel
//! is one Braille dot, so an 80x24 terminal is a 160x96 surface. Fading is
//! emulated by keeping earlier frames as layers whose intensity decays toward
//! black; only the newest frame keeps its text labels.

use crate::dashboard::Dashboard;
use crate::layout::{Point, SurfaceSize};
use crate::model::Rgb;
use crate::render::Surface;
use anyhow::{Context as _, Result};
use crossterm::cursor::Show;
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::{Stream, StreamExt};
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::text::Line;
use ratatui::widgets::canvas::{Canvas, Context, Line as CanvasLine, Points};
use ratatui::Terminal;
use std::io::{self, Stdout, Write};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Braille dots per terminal cell
const DOTS_PER_COLUMN: f64 = 2.0;
const DOTS_PER_ROW: f64 = 4.0;

/// Layers fainter than this are dropped
const MIN_INTENSITY: f64 = 0.08;

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Disc { center: Point, radius: f64, color: Rgb },
    Polyline { points: Vec<Point>, color: Rgb },
    Label { at: Point, text: String, color: Rgb },
}

#[derive(Debug, Clone)]
struct Layer {
    intensity: f64,
    shapes: Vec<Shape>,
}

#[derive(Debug, Clone)]
pub struct TerminalSurface {
    size: SurfaceSize,
    layers: Vec<Layer>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self {
            size: SurfaceSize::new(0.0, 0.0),
            layers: Vec::new(),
        }
    }

    /// Follow the terminal size; a new size invalidates the trail
    pub fn set_viewport(&mut self, columns: u16, rows: u16) {
        let size = SurfaceSize::new(
            f64::from(columns) * DOTS_PER_COLUMN,
            f64::from(rows) * DOTS_PER_ROW,
        );
        if size != self.size {
            debug!("Viewport resized to {}x{} cells", columns, rows);
            self.size = size;
            self.layers.clear();
        }
    }

    /// Intensities from oldest to newest
    pub fn layer_intensities(&self) -> Vec<f64> {
        self.layers.iter().map(|l| l.intensity).collect()
    }

    pub fn canvas(&self) -> Canvas<'_, impl Fn(&mut Context) + '_> {
        Canvas::default()
            .marker(Marker::Braille)
            .background_color(Color::Black)
            .x_bounds([0.0, self.size.width])
            .y_bounds([0.0, self.size.height])
            .paint(move |ctx| self.paint(ctx))
    }

    fn paint(&self, ctx: &mut Context) {
        let newest = self.layers.len().saturating_sub(1);

        for (index, layer) in self.layers.iter().enumerate() {
            for shape in &layer.shapes {
                match shape {
                    Shape::Disc { center, radius, color } => {
                        let coords = self.disc_points(*center, *radius);
                        ctx.draw(&Points {
                            coords: &coords,
                            color: to_color(color.dimmed(layer.intensity)),
                        });
                    }
                    Shape::Polyline { points, color } => {
                        let color = to_color(color.dimmed(layer.intensity));
                        for segment in points.windows(2) {
                            ctx.draw(&CanvasLine {
                                x1: segment[0].x,
                                y1: self.flip(segment[0].y),
                                x2: segment[1].x,
                                y2: self.flip(segment[1].y),
                                color,
                            });
                        }
                    }
                    Shape::Label { at, text, color } if index == newest => {
                        ctx.print(
                            at.x,
                            self.flip(at.y),
                            Line::styled(text.clone(), Style::default().fg(to_color(*color))),
                        );
                    }
                    Shape::Label { .. } => {}
                }
            }
            ctx.layer();
        }
    }

    /// Canvas y grows upward, surface y grows downward
    fn flip(&self, y: f64) -> f64 {
        self.size.height - y
    }

    /// Dot centers covered by a filled circle, in canvas coordinates
    ///
    /// Only dots on the surface are produced and the radius is capped at the
    /// surface diagonal, so an out-of-range reading costs at most one
    /// screenful of dots.
    fn disc_points(&self, center: Point, radius: f64) -> Vec<(f64, f64)> {
        let r = radius.min(self.size.width.hypot(self.size.height)).max(0.5);
        let (max_x, max_y) = (self.size.width as i64 - 1, self.size.height as i64 - 1);
        let x0 = ((center.x - r).floor() as i64).max(0);
        let x1 = ((center.x + r).ceil() as i64).min(max_x);
        let y0 = ((center.y - r).floor() as i64).max(0);
        let y1 = ((center.y + r).ceil() as i64).min(max_y);

        let mut coords = Vec::new();
        for y in y0..=y1 {
            for x in x0..=x1 {
                let (dx, dy) = (x as f64 - center.x, y as f64 - center.y);
                if dx * dx + dy * dy <= r * r {
                    coords.push((x as f64, self.flip(y as f64)));
                }
            }
        }
        if coords.is_empty() {
            coords.push((center.x, self.flip(center.y)));
        }
        coords
    }

    fn current_layer(&mut self) -> &mut Layer {
        if self.layers.is_empty() {
            self.layers.push(Layer { intensity: 1.0, shapes: Vec::new() });
        }
        let last = self.layers.len() - 1;
        &mut self.layers[last]
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for TerminalSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn fade(&mut self, alpha: f64) {
        let keep = 1.0 - alpha.clamp(0.0, 1.0);
        for layer in &mut self.layers {
            layer.intensity *= keep;
        }
        self.layers.retain(|l| l.intensity >= MIN_INTENSITY);
        self.layers.push(Layer { intensity: 1.0, shapes: Vec::new() });
    }

    fn clear(&mut self) {
        self.layers.clear();
        self.layers.push(Layer { intensity: 1.0, shapes: Vec::new() });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgb) {
        self.current_layer().shapes.push(Shape::Disc { center, radius, color });
    }

    // Terminal strokes are one dot wide whatever the requested width.
    fn stroke_polyline(&mut self, points: &[Point], _width: f64, color: Rgb) {
        self.current_layer().shapes.push(Shape::Polyline {
            points: points.to_vec(),
            color,
        });
    }

    fn text(&mut self, at: Point, text: &str, color: Rgb) {
        self.current_layer().shapes.push(Shape::Label {
            at,
            text: text.to_string(),
            color,
        });
    }
}

fn to_color(color: Rgb) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

type Term = Terminal<CrosstermBackend<Stdout>>;

/// What a terminal event asks the loop to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    Refresh,
    Redraw,
    Ignore,
}

fn action_for(event: &Event) -> Action {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Char('r') => Action::Refresh,
            _ => Action::Ignore,
        },
        Event::Resize(_, _) => Action::Redraw,
        _ => Action::Ignore,
    }
}

/// Run the dashboard full-screen until the user quits
pub async fn run(dashboard: &mut Dashboard) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))
        .context("Failed to create terminal")?;

    let result = event_loop(&mut terminal, dashboard).await;

    for failure in restore(terminal.backend_mut(), disable_raw_mode) {
        warn!("Terminal restore: {}", failure);
    }
    result
}

/// Undo raw mode, the alternate screen and the hidden cursor
///
/// Every step runs even when an earlier one fails; the failures are returned.
fn restore<W, F>(out: &mut W, disable_raw: F) -> Vec<String>
where
    W: Write,
    F: FnOnce() -> io::Result<()>,
{
    let steps = [
        ("disable raw mode", disable_raw()),
        ("leave alternate screen", execute!(out, LeaveAlternateScreen)),
        ("show cursor", execute!(out, Show)),
    ];
    steps
        .into_iter()
        .filter_map(|(step, outcome)| outcome.err().map(|e| format!("failed to {step}: {e}")))
        .collect()
}

async fn event_loop(terminal: &mut Term, dashboard: &mut Dashboard) -> Result<()> {
    let mut surface = TerminalSurface::new();
    let mut events = EventStream::new();
    let mut ticker = interval(dashboard.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Terminal dashboard started ({} hosts)", dashboard.hosts().len());

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !cycle_unless_quit(dashboard, &mut events).await? {
                    break;
                }
                draw(terminal, &mut surface, dashboard, false)?;
            }
            maybe_event = events.next() => {
                let event = match maybe_event {
                    Some(event) => event.context("Terminal event stream failed")?,
                    None => break,
                };
                match action_for(&event) {
                    Action::Quit => break,
                    Action::Refresh => {
                        debug!("Manual refresh");
                        if !cycle_unless_quit(dashboard, &mut events).await? {
                            break;
                        }
                        draw(terminal, &mut surface, dashboard, false)?;
                        ticker.reset();
                    }
                    Action::Redraw => draw(terminal, &mut surface, dashboard, true)?,
                    Action::Ignore => {}
                }
            }
        }
    }

    info!("Terminal dashboard stopped after {} cycles", dashboard.cycles());
    Ok(())
}

/// Run one frame cycle while still answering the quit keys
///
/// Returns `false` when the user quit; the unfinished cycle is dropped and
/// the records stay as they were. Other events during the cycle are skipped,
/// the draw that follows picks up the current terminal size anyway.
async fn cycle_unless_quit<S>(dashboard: &mut Dashboard, events: &mut S) -> Result<bool>
where
    S: Stream<Item = io::Result<Event>> + Unpin,
{
    let cycle = dashboard.run_cycle();
    tokio::pin!(cycle);

    loop {
        tokio::select! {
            _ = &mut cycle => return Ok(true),
            maybe_event = events.next() => match maybe_event {
                Some(event) => {
                    if action_for(&event.context("Terminal event stream failed")?) == Action::Quit {
                        debug!("Quit during a frame cycle");
                        return Ok(false);
                    }
                }
                None => return Ok(false),
            },
        }
    }
}

fn draw(terminal: &mut Term, surface: &mut TerminalSurface, dashboard: &Dashboard, resized: bool) -> Result<()> {
    let size = terminal.size().context("Failed to read terminal size")?;
    surface.set_viewport(size.width, size.height);

    if resized {
        dashboard.redraw(surface);
    } else {
        dashboard.render(surface);
    }

    terminal
        .draw(|frame| frame.render_widget(surface.canvas(), frame.area()))
        .context("Failed to draw frame")?;
    Ok(())
}
