/*!
# Symbion DevKit - Stubs et utilitaires pour le développement du dashboard

Bibliothèque facilitant les tests du dashboard sans hôtes réels:
- Stub HTTP du endpoint `/metrics` avec réponses scriptables (succès, erreur, lenteur)
- Builders de payloads au format du producteur de métriques
- Harness multi-hôtes générant une configuration prête à charger
*/

pub mod metrics_stub;
pub mod test_utils;

pub use metrics_stub::{MetricsPayloadBuilder, MetricsStub, StubResponse};
pub use test_utils::TestHarness;
