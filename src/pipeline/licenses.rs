use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::ReportError;
use crate::license::LicenseServiceProvider;
use crate::models::{LicenseInfo, LicenseServiceSettings, User};
use crate::telemetry::metrics::LICENSE_LOOKUP_DURATION;

/// Looks up the licenses of a set of users and keys them by user id.
pub struct LicenseResolver {
    provider: Arc<dyn LicenseServiceProvider>,
    timeout: Duration,
}

impl LicenseResolver {
    pub fn new(provider: Arc<dyn LicenseServiceProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    fn configure(&self, current: Option<&LicenseServiceSettings>) -> LicenseServiceSettings {
        let mut settings = current.cloned().unwrap_or_default();
        settings.timeout = self.timeout;
        settings
    }

    #[tracing::instrument(
        name = "pipeline_stage licenses",
        skip(self, users),
        fields(
            pipeline.stage = "licenses",
            domain.id = %domain_id,
            report.users = users.len(),
            report.licenses,
        )
    )]
    pub async fn resolve(
        &self,
        domain_id: Uuid,
        users: &[User],
    ) -> Result<HashMap<Uuid, LicenseInfo>, ReportError> {
        // Dropping the handle releases it, on every return path below.
        let mut service = self
            .provider
            .license_service()
            .ok_or(ReportError::ProviderUnavailable { domain_id })?;

        let settings = self.configure(service.settings());
        service.set_settings(settings);

        match service.licensed_user_count(domain_id).await {
            Ok(count) => {
                tracing::info!(domain.id = %domain_id, licensed_users = count, "Total licenses for domain");
            }
            Err(e) => {
                tracing::warn!(domain.id = %domain_id, error = %e, "Failed to read licensed user count");
            }
        }

        let emails = distinct_emails(users);
        let start = Instant::now();
        let result = service.licenses(domain_id, &emails).await;
        LICENSE_LOOKUP_DURATION.record(start.elapsed().as_secs_f64(), &[]);

        let licenses = result
            .map_err(|source| {
                tracing::error!(
                    domain.id = %domain_id,
                    error = %source,
                    "Problem getting license information"
                );
                ReportError::RemoteCall { domain_id, source }
            })?
            .ok_or(ReportError::NoLicenseData { domain_id })?;

        let mapping = map_licenses(users, &licenses);
        tracing::Span::current().record("report.licenses", mapping.len());

        Ok(mapping)
    }
}

/// Emails of `users` without duplicates, in first-seen order.
fn distinct_emails(users: &[User]) -> Vec<String> {
    let mut seen = HashSet::new();
    users
        .iter()
        .filter(|u| seen.insert(u.user_email.as_str()))
        .map(|u| u.user_email.clone())
        .collect()
}

/// Pairs each user with the first license carrying the same email.
/// Users without a match get no entry.
pub fn map_licenses(users: &[User], licenses: &[LicenseInfo]) -> HashMap<Uuid, LicenseInfo> {
    let mut mapping = HashMap::with_capacity(users.len());

    for user in users {
        if mapping.contains_key(&user.id) {
            continue;
        }
        if let Some(license) = licenses.iter().find(|l| l.email == user.user_email) {
            mapping.insert(user.id, license.clone());
        }
    }

    mapping
}
