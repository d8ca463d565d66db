/*!
Stub HTTP du producteur de métriques

Sert `GET /metrics` sur un port éphémère de la loopback. La réponse est
scriptable à chaud (JSON, statut d'erreur, corps brut, latence) et chaque
requête reçue est comptée, ce qui permet de tester le fetcher sans hôte réel.
*/

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Réponse renvoyée par le stub au prochain `GET /metrics`
#[derive(Debug, Clone)]
pub enum StubResponse {
    /// 200 avec le JSON donné
    Json(Value),
    /// Statut et corps arbitraires (ex: 503, HTML, JSON tronqué)
    Raw { status: u16, body: String },
    /// Attend `after` avant de répondre `then`
    Delay { after: Duration, then: Box<StubResponse> },
}

struct StubState {
    response: Mutex<StubResponse>,
    hits: AtomicU32,
}

/// Serveur `/metrics` en process pour les tests
pub struct MetricsStub {
    addr: SocketAddr,
    state: Arc<StubState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl MetricsStub {
    /// Démarre le stub avec un payload sain par défaut
    pub async fn start() -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        let state = Arc::new(StubState {
            response: Mutex::new(StubResponse::Json(MetricsPayloadBuilder::metrics(
                12.5, 34.0, 56.0, "stub-host",
            ))),
            hits: AtomicU32::new(0),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(state.clone());

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                rx.await.ok();
            });
            if let Err(e) = server.await {
                log::error!("❌ [STUB] server error: {}", e);
            }
        });

        log::info!("🛰️ [STUB] metrics endpoint on http://{}/metrics", addr);
        Ok(Self {
            addr,
            state,
            shutdown: Some(tx),
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL complète du endpoint
    pub fn url(&self) -> String {
        format!("http://{}/metrics", self.addr)
    }

    /// Remplace la réponse servie
    pub fn respond_with(&self, response: StubResponse) {
        *self.state.response.lock() = response;
    }

    /// Sert un payload complet
    pub fn serve_metrics(&self, cpu: f64, ram: f64, disk: f64, hostname: &str) {
        self.respond_with(StubResponse::Json(MetricsPayloadBuilder::metrics(
            cpu, ram, disk, hostname,
        )));
    }

    /// Répond un statut HTTP d'erreur
    pub fn fail_with_status(&self, status: u16) {
        self.respond_with(StubResponse::Raw {
            status,
            body: format!("stub failure {}", status),
        });
    }

    /// Répond 200 avec un corps qui n'est pas du JSON valide
    pub fn serve_garbage(&self) {
        self.respond_with(StubResponse::Raw {
            status: 200,
            body: "<html>metrics unavailable</html>".into(),
        });
    }

    /// Garde la réponse actuelle mais la retarde de `delay`
    pub fn hang_for(&self, delay: Duration) {
        let mut current = self.state.response.lock();
        let then = Box::new(current.clone());
        *current = StubResponse::Delay { after: delay, then };
    }

    /// Nombre de requêtes reçues
    pub fn hits(&self) -> u32 {
        self.state.hits.load(Ordering::Relaxed)
    }

    /// Arrêt propre du serveur
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        // Les requêtes retardées ne bloquent pas l'arrêt
        self.handle.abort();
        log::info!("🧹 [STUB] {} stopped", self.addr);
    }
}

impl Drop for MetricsStub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn metrics_handler(State(state): State<Arc<StubState>>) -> Response {
    state.hits.fetch_add(1, Ordering::Relaxed);
    let mut response = state.response.lock().clone();

    loop {
        match response {
            StubResponse::Delay { after, then } => {
                tokio::time::sleep(after).await;
                response = *then;
            }
            StubResponse::Json(value) => return (StatusCode::OK, Json(value)).into_response(),
            StubResponse::Raw { status, body } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                return (status, body).into_response();
            }
        }
    }
}

/// Helper pour créer des payloads au format du producteur de métriques
pub struct MetricsPayloadBuilder;

impl MetricsPayloadBuilder {
    /// Payload complet, tel que servi par l'agent de métriques
    pub fn metrics(cpu: f64, ram: f64, disk: f64, hostname: &str) -> Value {
        serde_json::json!({
            "hostname": hostname,
            "cpu_usage_percent": cpu,
            "memory_usage_percent": ram,
            "disk_usage_percent": disk,
            "disk_mount_point": "/",
            "timestamp": chrono::Utc::now().timestamp_millis() as f64 / 1000.0
        })
    }

    /// Payload sans certains champs
    pub fn without(fields: &[&str], base: Value) -> Value {
        let mut value = base;
        if let Some(obj) = value.as_object_mut() {
            for field in fields {
                obj.remove(*field);
            }
        }
        value
    }
}
