pub mod http;

pub use http::HttpLicenseServiceProvider;

use uuid::Uuid;

use crate::models::{LicenseInfo, LicenseServiceSettings};

/// Connection to the remote license service. The handle is released when it
/// is dropped.
#[async_trait::async_trait]
pub trait LicenseService: Send + Sync {
    fn settings(&self) -> Option<&LicenseServiceSettings>;

    fn set_settings(&mut self, settings: LicenseServiceSettings);

    async fn licensed_user_count(&self, domain_id: Uuid) -> anyhow::Result<u64>;

    /// `Ok(None)` means the service had no license data to return.
    async fn licenses(
        &self,
        domain_id: Uuid,
        emails: &[String],
    ) -> anyhow::Result<Option<Vec<LicenseInfo>>>;
}

pub trait LicenseServiceProvider: Send + Sync {
    fn license_service(&self) -> Option<Box<dyn LicenseService>>;
}
