use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LicenseService, LicenseServiceProvider};
use crate::models::{LicenseInfo, LicenseServiceSettings};

/// Hands out handles to the license REST service at `base_url`.
pub struct HttpLicenseServiceProvider {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpLicenseServiceProvider {
    pub fn new(base_url: &str) -> Self {
        let base_url = match reqwest::Url::parse(base_url) {
            Ok(_) => Some(base_url.trim_end_matches('/').to_string()),
            Err(e) => {
                tracing::warn!(url = %base_url, error = %e, "Invalid license service URL");
                None
            }
        };

        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

impl LicenseServiceProvider for HttpLicenseServiceProvider {
    fn license_service(&self) -> Option<Box<dyn LicenseService>> {
        let base_url = self.base_url.clone()?;
        tracing::debug!(url = %base_url, "License service handle acquired");

        Some(Box::new(HttpLicenseService {
            client: self.client.clone(),
            base_url,
            settings: None,
        }))
    }
}

pub struct HttpLicenseService {
    client: reqwest::Client,
    base_url: String,
    settings: Option<LicenseServiceSettings>,
}

#[derive(Serialize)]
struct LicensesRequest<'a> {
    emails: &'a [String],
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

impl HttpLicenseService {
    fn timeout(&self) -> std::time::Duration {
        self.settings.clone().unwrap_or_default().timeout
    }

    async fn error_for(response: reqwest::Response) -> anyhow::Error {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.message)
            .unwrap_or(text);
        anyhow::anyhow!("license service error {status}: {message}")
    }
}

#[async_trait::async_trait]
impl LicenseService for HttpLicenseService {
    fn settings(&self) -> Option<&LicenseServiceSettings> {
        self.settings.as_ref()
    }

    fn set_settings(&mut self, settings: LicenseServiceSettings) {
        self.settings = Some(settings);
    }

    async fn licensed_user_count(&self, domain_id: Uuid) -> anyhow::Result<u64> {
        let response = self
            .client
            .get(format!(
                "{}/domains/{domain_id}/licensed-users/count",
                self.base_url
            ))
            .timeout(self.timeout())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        Ok(response.json::<CountResponse>().await?.count)
    }

    async fn licenses(
        &self,
        domain_id: Uuid,
        emails: &[String],
    ) -> anyhow::Result<Option<Vec<LicenseInfo>>> {
        let response = self
            .client
            .post(format!("{}/domains/{domain_id}/licenses", self.base_url))
            .timeout(self.timeout())
            .json(&LicensesRequest { emails })
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(response.json().await?),
            _ => Err(Self::error_for(response).await),
        }
    }
}

impl Drop for HttpLicenseService {
    fn drop(&mut self) {
        tracing::debug!(url = %self.base_url, "License service handle released");
    }
}
