pub mod config;
pub mod db;
pub mod error;
pub mod license;
pub mod models;
pub mod pagination;
pub mod pipeline;
pub mod retry;
pub mod routes;
pub mod telemetry;

pub use config::Config;

use std::sync::Arc;
use std::time::Duration;

use pipeline::ReportAssembler;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub assembler: Arc<ReportAssembler>,
    /// Cancelled on shutdown; every request runs with a child token.
    pub shutdown: CancellationToken,
    pub request_timeout: Duration,
}
