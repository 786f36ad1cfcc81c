use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::KeyValue;
use tokio_util::sync::CancellationToken;

use crate::config::RetrySettings;
use crate::db::{UserFilter, UserProvider};
use crate::error::{ReportError, error_body};
use crate::license::LicenseServiceProvider;
use crate::models::{ReportQuery, UserReport};
use crate::pagination::paginate;
use crate::retry::Retry;
use crate::telemetry::metrics::{
    REPORT_ATTEMPT_FAILURES, REPORT_EXHAUSTED, REPORT_GENERATION_DURATION, REPORT_ROWS,
};

use super::assemble::build_rows;
use super::licenses::LicenseResolver;

/// Final outcome of a report request once retries are settled.
#[derive(Debug)]
pub enum ReportResponse {
    Ready(UserReport),
    Exhausted { attempts: u32 },
}

impl IntoResponse for ReportResponse {
    fn into_response(self) -> Response {
        match self {
            ReportResponse::Ready(report) => (StatusCode::OK, Json(report)).into_response(),
            ReportResponse::Exhausted { .. } => {
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

/// Builds report pages, retrying whole attempts per [`RetrySettings`].
pub struct ReportAssembler {
    users: Arc<dyn UserProvider>,
    licenses: LicenseResolver,
    retry: RetrySettings,
    failed_attempts: AtomicU64,
}

impl ReportAssembler {
    pub fn new(
        users: Arc<dyn UserProvider>,
        license_provider: Arc<dyn LicenseServiceProvider>,
        license_timeout: Duration,
        retry: RetrySettings,
    ) -> Self {
        Self {
            users,
            licenses: LicenseResolver::new(license_provider, license_timeout),
            retry,
            failed_attempts: AtomicU64::new(0),
        }
    }

    /// Failed attempts across all requests served by this assembler.
    pub fn failed_attempts(&self) -> u64 {
        self.failed_attempts.load(Ordering::Relaxed)
    }

    #[tracing::instrument(
        name = "report",
        skip(self, cancel),
        fields(
            domain.id = %query.domain_id,
            report.page_size = query.page_size,
            report.page_number = query.page_number,
            report.outcome,
        )
    )]
    pub async fn get_report(
        &self,
        query: &ReportQuery,
        cancel: CancellationToken,
    ) -> Result<ReportResponse, ReportError> {
        let start = Instant::now();
        let retry_out_of_range = self.retry.retry_out_of_range_pages;

        let result = Retry::<ReportResponse, ReportError>::attempts(self.retry.attempts)
            .interval(self.retry.interval())
            .retry_if(move |err| retry_out_of_range || !err.is_page_out_of_range())
            .on_attempt_failed(|attempt, err| {
                self.record_failure(attempt, err);
                Ok(())
            })
            .on_exhausted(|attempts, err| {
                self.record_failure(attempts, &err);
                REPORT_EXHAUSTED.add(1, &[KeyValue::new("error.kind", err.kind())]);
                tracing::error!(
                    attempts,
                    error = %err,
                    error.kind = err.kind(),
                    "Report attempts exhausted"
                );
                ReportResponse::Exhausted { attempts }
            })
            .cancel_on(cancel)
            .run(move |_| async move { self.build_report(query).await.map(ReportResponse::Ready) })
            .await;

        let outcome = match &result {
            Ok(ReportResponse::Ready(_)) => "ready",
            Ok(ReportResponse::Exhausted { .. }) => "exhausted",
            Err(_) => "cancelled",
        };
        tracing::Span::current().record("report.outcome", outcome);
        REPORT_GENERATION_DURATION.record(
            start.elapsed().as_secs_f64(),
            &[KeyValue::new("report.outcome", outcome)],
        );

        result
    }

    fn record_failure(&self, attempt: u32, err: &ReportError) {
        let failed = self.failed_attempts.fetch_add(1, Ordering::Relaxed) + 1;
        REPORT_ATTEMPT_FAILURES.add(1, &[KeyValue::new("error.kind", err.kind())]);
        tracing::debug!(
            attempt,
            failed_attempts = failed,
            error = %err,
            "Attempt {failed} failed"
        );
    }

    #[tracing::instrument(
        name = "pipeline report",
        skip(self),
        fields(report.total_count, report.rows)
    )]
    async fn build_report(&self, query: &ReportQuery) -> Result<UserReport, ReportError> {
        let domain_id = query.domain_id;

        // Stage 1: Fetch the full filtered set once; count and page come from it
        let users = self
            .users
            .get_users(&UserFilter::report(domain_id))
            .await
            .map_err(|source| {
                tracing::error!(domain.id = %domain_id, error = %source, "Failed to fetch users");
                ReportError::RemoteCall { domain_id, source }
            })?;
        let total_count = users.len();

        // Stage 2: Paginate in memory
        let page = paginate(
            Some(users.as_slice()),
            query.page_size as usize,
            query.page_number as usize,
        );
        if page.is_empty() {
            return Err(ReportError::NoUsersFound {
                domain_id,
                page_size: query.page_size,
                page_number: query.page_number,
                total_count,
            });
        }

        // Stage 3: Resolve licenses for the page
        let licenses = self.licenses.resolve(domain_id, page).await?;

        // Stage 4: Join
        let data = build_rows(page, &licenses);

        REPORT_ROWS.record(data.len() as f64, &[]);
        let span = tracing::Span::current();
        span.record("report.total_count", total_count);
        span.record("report.rows", data.len());

        Ok(UserReport { total_count, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{LicenseReply, MockLicenseProvider, MockUsers, license, users};
    use crate::retry::Cancelled;
    use std::sync::atomic::Ordering;
    use uuid::Uuid;

    fn domain() -> Uuid {
        Uuid::from_u128(0xd0)
    }

    fn settings(attempts: u32) -> RetrySettings {
        RetrySettings {
            attempts,
            interval_ms: 0,
            retry_out_of_range_pages: true,
        }
    }

    fn query(page_size: u32, page_number: u32) -> ReportQuery {
        ReportQuery {
            domain_id: domain(),
            page_size,
            page_number,
        }
    }

    fn assembler(
        users: Arc<MockUsers>,
        licenses: &MockLicenseProvider,
        retry: RetrySettings,
    ) -> ReportAssembler {
        ReportAssembler::new(
            users,
            Arc::new(licenses.clone()),
            Duration::from_secs(5),
            retry,
        )
    }

    fn ready(response: ReportResponse) -> UserReport {
        match response {
            ReportResponse::Ready(report) => report,
            other => panic!("expected a report, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_first_page_of_twenty_five_users() {
        let all = users(domain(), 25);
        let source = Arc::new(MockUsers::new(all.clone()));
        let licenses = MockLicenseProvider::new();
        let assembler = assembler(source.clone(), &licenses, settings(3));

        let report = ready(
            assembler
                .get_report(&query(10, 0), CancellationToken::new())
                .await
                .unwrap(),
        );

        assert_eq!(report.total_count, 25);
        assert_eq!(report.data.len(), 10);
        let ids: Vec<Uuid> = report.data.iter().map(|r| r.id).collect();
        let expected: Vec<Uuid> = all[0..10].iter().map(|u| u.id).collect();
        assert_eq!(ids, expected);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            source.filters.lock().unwrap()[0],
            UserFilter::report(domain())
        );
        assert_eq!(assembler.failed_attempts(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_page_exhausts_retries() {
        let source = Arc::new(MockUsers::new(users(domain(), 25)));
        let licenses = MockLicenseProvider::new();
        let assembler = assembler(source.clone(), &licenses, settings(3));

        let response = assembler
            .get_report(&query(10, 3), CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(response, ReportResponse::Exhausted { attempts: 3 }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(assembler.failed_attempts(), 3);
        assert_eq!(licenses.state.acquired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_page_can_fail_fast() {
        let source = Arc::new(MockUsers::new(users(domain(), 25)));
        let licenses = MockLicenseProvider::new();
        let retry = RetrySettings {
            retry_out_of_range_pages: false,
            ..settings(5)
        };
        let assembler = assembler(source.clone(), &licenses, retry);

        let response = assembler
            .get_report(&query(10, 3), CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(response, ReportResponse::Exhausted { attempts: 1 }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_domain_is_retried_even_when_failing_fast() {
        let source = Arc::new(MockUsers::new(vec![]));
        let licenses = MockLicenseProvider::new();
        let retry = RetrySettings {
            retry_out_of_range_pages: false,
            ..settings(2)
        };
        let assembler = assembler(source.clone(), &licenses, retry);

        let response = assembler
            .get_report(&query(10, 0), CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(response, ReportResponse::Exhausted { attempts: 2 }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_license_is_labelled_none() {
        let all = users(domain(), 3);
        let source = Arc::new(MockUsers::new(all.clone()));
        let licenses = MockLicenseProvider::new();
        licenses.push(LicenseReply::Data(vec![
            license(&all[0].user_email, true),
            license(&all[2].user_email, false),
        ]));
        let assembler = assembler(source, &licenses, settings(1));

        let report = ready(
            assembler
                .get_report(&query(10, 0), CancellationToken::new())
                .await
                .unwrap(),
        );

        let labels: Vec<&str> = report.data.iter().map(|r| r.license_type.as_str()).collect();
        assert_eq!(labels, vec!["Trial", "None", "Paid"]);
    }

    #[tokio::test]
    async fn test_license_failure_then_success_counts_one_failure() {
        let all = users(domain(), 4);
        let source = Arc::new(MockUsers::new(all.clone()));
        let licenses = MockLicenseProvider::new();
        licenses.push(LicenseReply::Fail("license backend timeout"));
        licenses.push(LicenseReply::Data(vec![license(&all[1].user_email, true)]));
        let assembler = assembler(source.clone(), &licenses, settings(3));

        let report = ready(
            assembler
                .get_report(&query(10, 0), CancellationToken::new())
                .await
                .unwrap(),
        );

        assert_eq!(report.total_count, 4);
        assert_eq!(report.data[1].license_type, "Trial");
        assert_eq!(report.data[0].license_type, "None");
        assert_eq!(assembler.failed_attempts(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(licenses.state.acquired.load(Ordering::SeqCst), 2);
        assert_eq!(licenses.state.released.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_user_provider_failure_is_retried() {
        let source = Arc::new(MockUsers::new(users(domain(), 2)).failing_first(2));
        let licenses = MockLicenseProvider::new();
        let assembler = assembler(source.clone(), &licenses, settings(3));

        let report = ready(
            assembler
                .get_report(&query(10, 0), CancellationToken::new())
                .await
                .unwrap(),
        );

        assert_eq!(report.data.len(), 2);
        assert_eq!(assembler.failed_attempts(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_license_service_exhausts() {
        let source = Arc::new(MockUsers::new(users(domain(), 2)));
        let licenses = MockLicenseProvider::unavailable();
        let assembler = assembler(source, &licenses, settings(2));

        let response = assembler
            .get_report(&query(10, 0), CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(response, ReportResponse::Exhausted { attempts: 2 }));
    }

    #[tokio::test]
    async fn test_counter_is_shared_across_requests() {
        let source = Arc::new(MockUsers::new(vec![]));
        let licenses = MockLicenseProvider::new();
        let assembler = assembler(source, &licenses, settings(2));

        let (page_one, page_two) = (query(10, 0), query(5, 1));
        let (first, second) = tokio::join!(
            assembler.get_report(&page_one, CancellationToken::new()),
            assembler.get_report(&page_two, CancellationToken::new()),
        );

        assert!(matches!(first, Ok(ReportResponse::Exhausted { .. })));
        assert!(matches!(second, Ok(ReportResponse::Exhausted { .. })));
        assert_eq!(assembler.failed_attempts(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_request_stops_retrying() {
        let source = Arc::new(MockUsers::new(vec![]));
        let licenses = MockLicenseProvider::new();
        let retry = RetrySettings {
            interval_ms: 60_000,
            ..settings(10)
        };
        let assembler = assembler(source.clone(), &licenses, retry);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = assembler.get_report(&query(10, 0), cancel).await.unwrap_err();

        assert!(matches!(err, ReportError::Cancelled(Cancelled)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exhausted_response_is_server_error() {
        let response = ReportResponse::Exhausted { attempts: 10 }.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_ready_response_is_ok() {
        let response = ReportResponse::Ready(UserReport {
            total_count: 0,
            data: vec![],
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
