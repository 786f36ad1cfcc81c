use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use serde_json::json;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use crate::retry::Cancelled;

/// Failure of one report attempt.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error(
        "no users found for domain {domain_id} (page {page_number}, size {page_size}, total {total_count})"
    )]
    NoUsersFound {
        domain_id: Uuid,
        page_size: u32,
        page_number: u32,
        total_count: usize,
    },

    #[error("license service unavailable for domain {domain_id}")]
    ProviderUnavailable { domain_id: Uuid },

    #[error("license service returned no data for domain {domain_id}")]
    NoLicenseData { domain_id: Uuid },

    #[error("remote call failed for domain {domain_id}")]
    RemoteCall {
        domain_id: Uuid,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl ReportError {
    /// True when the requested page lies past the end of a non-empty user set.
    pub fn is_page_out_of_range(&self) -> bool {
        matches!(self, ReportError::NoUsersFound { total_count, .. } if *total_count > 0)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::NoUsersFound { .. } => "no_users_found",
            ReportError::ProviderUnavailable { .. } => "provider_unavailable",
            ReportError::NoLicenseData { .. } => "no_license_data",
            ReportError::RemoteCall { .. } => "remote_call",
            ReportError::Cancelled(_) => "cancelled",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Report(ReportError::Cancelled(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub(crate) fn get_trace_id() -> Option<String> {
    let span = Span::current();
    let context = span.context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

/// JSON error body shared by every failing response.
pub(crate) fn error_body(status: StatusCode, message: &str) -> Response {
    let body = if let Some(trace_id) = get_trace_id() {
        json!({
            "error": message,
            "status": status.as_u16(),
            "trace_id": trace_id,
        })
    } else {
        json!({
            "error": message,
            "status": status.as_u16(),
        })
    };

    (status, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Report(ReportError::Cancelled(_)) => {
                tracing::warn!("Report request cancelled");
                "Service shutting down".to_string()
            }
            AppError::Report(e) => {
                tracing::error!(error = %e, error.kind = e.kind(), "Report error");
                "Internal server error".to_string()
            }
        };

        error_body(status, &error_message)
    }
}

pub type AppResult<T> = Result<T, AppError>;
