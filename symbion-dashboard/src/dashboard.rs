//! Poll-render loop
//!
//! One `Dashboard` owns the monitored hosts and their last-known-good
//! records. A frame cycle fetches every host concurrently, swaps all records
//! in once every fetch has settled, then renders.

use crate::config::DashboardConfig;
use crate::fetcher::{FetchError, MetricsFetcher};
use crate::layout::{layout_frame, SurfaceSize, Theme};
use crate::model::MonitoredHost;
use crate::render::{draw_layout, render_frame, RecordingSurface, Surface};
use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Surface used when running without a terminal
pub const HEADLESS_SURFACE: SurfaceSize = SurfaceSize::new(1280.0, 720.0);

pub struct Dashboard {
    hosts: Vec<MonitoredHost>,
    theme: Theme,
    fetcher: MetricsFetcher,
    poll_interval: Duration,
    cycles: u64,
}

impl Dashboard {
    pub fn new(
        hosts: Vec<MonitoredHost>,
        theme: Theme,
        fetcher: MetricsFetcher,
        poll_interval: Duration,
    ) -> Self {
        Self {
            hosts,
            theme,
            fetcher,
            poll_interval,
            cycles: 0,
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, FetchError> {
        let fetcher = MetricsFetcher::new(config.fetch_timeout())?;
        Ok(Self::new(
            config.monitored_hosts(),
            config.theme.clone(),
            fetcher,
            config.poll_interval(),
        ))
    }

    pub fn hosts(&self) -> &[MonitoredHost] {
        &self.hosts
    }

    pub fn host(&self, display_name: &str) -> Option<&MonitoredHost> {
        self.hosts.iter().find(|h| h.display_name == display_name)
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Completed frame cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Fetch all hosts concurrently, then replace every record at once
    pub async fn run_cycle(&mut self) {
        let fetcher = &self.fetcher;
        let records = join_all(self.hosts.iter().map(|host| fetcher.fetch(host))).await;

        for (host, record) in self.hosts.iter_mut().zip(records) {
            host.last_record = record;
        }
        self.cycles += 1;
        debug!("Cycle {} settled for {} hosts", self.cycles, self.hosts.len());
    }

    /// Draw the current records over a faded previous frame
    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        render_frame(surface, &self.hosts, &self.theme);
    }

    /// Draw the current records on a cleared surface (after a resize)
    pub fn redraw<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface.clear();
        let layout = layout_frame(&self.hosts, &self.theme, surface.size());
        draw_layout(surface, &layout, &self.theme);
    }

    /// Poll-render loop without a terminal, until `shutdown` resolves
    pub async fn run_headless<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "Headless mode: polling {} hosts every {:?}",
            self.hosts.len(),
            self.poll_interval
        );

        let mut surface = RecordingSurface::new(HEADLESS_SURFACE);
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested after {} cycles", self.cycles);
                    break;
                }
                _ = ticker.tick() => {
                    let interrupted = tokio::select! {
                        _ = &mut shutdown => true,
                        _ = self.run_cycle() => false,
                    };
                    if interrupted {
                        info!("Shutdown requested during cycle {}", self.cycles + 1);
                        break;
                    }
                    self.render(&mut surface);
                    self.log_frame(&surface);
                }
            }
        }
    }

    fn log_frame(&self, surface: &RecordingSurface) {
        for host in &self.hosts {
            let r = &host.last_record;
            info!(
                "[frame {}] {} ({}): {:?} cpu={:.1}% ram={:.1}% disk={:.1}%",
                surface.frames(),
                host.display_name,
                r.hostname,
                r.status,
                r.cpu_percent,
                r.ram_percent,
                r.disk_percent
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConnectivityStatus, Rgb};
    use symbion_devkit::MetricsStub;

    fn dashboard_for(stubs: &[(&str, &MetricsStub)], timeout: Duration) -> Dashboard {
        let hosts = stubs
            .iter()
            .enumerate()
            .map(|(i, (name, stub))| MonitoredHost::new(*name, Rgb::GOLD, stub.url(), i as f64 * 0.5))
            .collect();
        let fetcher = MetricsFetcher::new(timeout).unwrap();
        Dashboard::new(hosts, Theme::default(), fetcher, timeout * 2)
    }

    #[tokio::test]
    async fn test_cycle_updates_every_host() {
        let gold = MetricsStub::start().await.unwrap();
        let blue = MetricsStub::start().await.unwrap();
        gold.serve_metrics(73.2, 40.0, 88.9, "gold-1");
        blue.serve_metrics(10.0, 20.0, 30.0, "blue-1");

        let mut dashboard = dashboard_for(&[("gold", &gold), ("blue", &blue)], Duration::from_secs(2));
        assert!(dashboard.hosts().iter().all(|h| h.last_record.is_stale()));

        dashboard.run_cycle().await;
        assert_eq!(dashboard.cycles(), 1);
        assert_eq!(dashboard.host("gold").unwrap().last_record.hostname, "gold-1");
        assert_eq!(dashboard.host("blue").unwrap().last_record.cpu_percent, 10.0);
        assert!(dashboard
            .hosts()
            .iter()
            .all(|h| h.last_record.status == ConnectivityStatus::Ok));
        assert_eq!(gold.hits(), 1);
        assert_eq!(blue.hits(), 1);
    }

    #[tokio::test]
    async fn test_redraw_clears_before_drawing() {
        let gold = MetricsStub::start().await.unwrap();
        let mut dashboard = dashboard_for(&[("gold", &gold)], Duration::from_secs(2));
        dashboard.run_cycle().await;

        let mut surface = RecordingSurface::new(SurfaceSize::new(200.0, 100.0));
        dashboard.redraw(&mut surface);
        assert_eq!(
            surface.commands()[0],
            crate::render::DrawCommand::Fade { alpha: 1.0 }
        );
        assert_eq!(surface.circles().len(), 3);
    }

    #[tokio::test]
    async fn test_headless_runs_until_shutdown() {
        let gold = MetricsStub::start().await.unwrap();
        let mut dashboard = dashboard_for(&[("gold", &gold)], Duration::from_millis(100));

        dashboard
            .run_headless(tokio::time::sleep(Duration::from_millis(450)))
            .await;
        assert!(dashboard.cycles() >= 2);
        assert!(gold.hits() >= 2);
    }

    #[tokio::test]
    async fn test_headless_shutdown_interrupts_slow_cycle() {
        let gold = MetricsStub::start().await.unwrap();
        gold.hang_for(Duration::from_secs(3));
        let mut dashboard = dashboard_for(&[("gold", &gold)], Duration::from_secs(2));

        let started = std::time::Instant::now();
        dashboard
            .run_headless(tokio::time::sleep(Duration::from_millis(200)))
            .await;
        assert!(started.elapsed() < Duration::from_secs(1), "stopped after {:?}", started.elapsed());
        assert_eq!(dashboard.cycles(), 0);
        assert!(dashboard.host("gold").unwrap().last_record.is_stale());
    }
}
