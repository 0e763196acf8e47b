//! Prometheus metrics exposition
//!
//! The counters themselves are recorded by the `admin-token` crate:
//!
//! - `admin_token_grants_total` (counter): labels `grant`, `outcome`
//! - `admin_token_invalidations_total` (counter)
//! - `admin_token_unavailable_total` (counter)
//!
//! This module only installs the recorder that `/metrics` renders.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Must run before the token manager emits anything, otherwise those
/// increments go to the no-op recorder and are lost.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}
