/*!
Test Harness pour le dashboard Symbion

Facilite l'écriture de tests multi-hôtes avec:
- Un stub `/metrics` démarré par hôte surveillé
- Génération d'une configuration YAML pointant sur les stubs
- Attente bornée sur le trafic reçu par un stub
*/

use crate::metrics_stub::MetricsStub;
use anyhow::Result;
use std::time::Duration;

/// Harness de test: un stub par hôte, dans l'ordre de déclaration
pub struct TestHarness {
    hosts: Vec<(String, MetricsStub)>,
}

impl TestHarness {
    /// Démarre un stub pour chaque nom d'hôte
    pub async fn with_hosts(names: &[&str]) -> Result<Self> {
        let mut hosts = Vec::with_capacity(names.len());
        for name in names {
            hosts.push((name.to_string(), MetricsStub::start().await?));
        }
        log::info!("🧪 Harness ready with {} hosts", hosts.len());
        Ok(Self { hosts })
    }

    /// Stub associé à un hôte
    pub fn stub(&self, name: &str) -> &MetricsStub {
        self.hosts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, stub)| stub)
            .unwrap_or_else(|| panic!("no stub for host '{}'", name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.hosts.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Configuration dashboard (YAML) pointant sur les stubs
    ///
    /// Les hôtes sont répartis sur la largeur, couleur d'identité blanche.
    pub fn config_yaml(&self, poll_interval_ms: u64, fetch_timeout_ms: u64) -> String {
        let mut yaml = format!(
            "poll_interval_ms: {}\nfetch_timeout_ms: {}\nhosts:\n",
            poll_interval_ms, fetch_timeout_ms
        );
        let count = self.hosts.len().max(1) as f64;
        for (i, (name, stub)) in self.hosts.iter().enumerate() {
            yaml.push_str(&format!(
                "  - display_name: {}\n    primary_color: \"rgb(255,255,255)\"\n    endpoint_url: \"{}\"\n    horizontal_position: {:.3}\n",
                name,
                stub.url(),
                i as f64 / count
            ));
        }
        yaml
    }

    /// Attend qu'un stub ait reçu au moins `count` requêtes
    pub async fn wait_for_hits(&self, name: &str, count: u32, timeout_ms: u64) -> bool {
        let stub = self.stub(name);
        let start = std::time::Instant::now();

        while start.elapsed() < Duration::from_millis(timeout_ms) {
            if stub.hits() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        log::warn!("⏰ Timeout waiting for {} hits on {}", count, name);
        false
    }

    /// Arrêt de tous les stubs
    pub async fn shutdown(self) {
        for (_, stub) in self.hosts {
            stub.shutdown().await;
        }
        log::info!("🧹 Test harness stopped");
    }
}
