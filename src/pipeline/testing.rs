//! In-memory providers and fixtures shared by the pipeline and route tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::db::{UserFilter, UserProvider};
use crate::license::{LicenseService, LicenseServiceProvider};
use crate::models::{
    BackupStatus, LicenseInfo, LicenseServiceSettings, ServiceBackup, User, UserState,
};

pub(crate) fn user(domain_id: Uuid, index: usize) -> User {
    let backup = ServiceBackup {
        last_backup_status: BackupStatus::Success,
        last_backup_date: Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).single(),
    };

    User {
        id: Uuid::from_u128(index as u128 + 1),
        user_email: format!("user{index:03}@example.com"),
        domain_id,
        backup_enabled: true,
        state: UserState::InDomain,
        email: backup.clone(),
        drive: ServiceBackup {
            last_backup_status: BackupStatus::Failed,
            ..backup.clone()
        },
        calendar: ServiceBackup {
            last_backup_status: BackupStatus::NotStarted,
            last_backup_date: None,
        },
    }
}

pub(crate) fn users(domain_id: Uuid, count: usize) -> Vec<User> {
    (0..count).map(|i| user(domain_id, i)).collect()
}

pub(crate) fn license(email: &str, is_trial: bool) -> LicenseInfo {
    LicenseInfo {
        email: email.to_string(),
        is_trial,
    }
}

/// Returns a fixed user list, optionally failing the first calls.
pub(crate) struct MockUsers {
    pub users: Vec<User>,
    pub calls: AtomicU32,
    pub failures: AtomicU32,
    pub filters: Mutex<Vec<UserFilter>>,
}

impl MockUsers {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users,
            calls: AtomicU32::new(0),
            failures: AtomicU32::new(0),
            filters: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_first(self, failures: u32) -> Self {
        self.failures.store(failures, Ordering::SeqCst);
        self
    }
}

#[async_trait::async_trait]
impl UserProvider for MockUsers {
    async fn get_users(&self, filter: &UserFilter) -> anyhow::Result<Vec<User>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.filters.lock().unwrap().push(*filter);

        let pending = self.failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.failures.store(pending - 1, Ordering::SeqCst);
            anyhow::bail!("user store unavailable");
        }

        Ok(self
            .users
            .iter()
            .filter(|u| u.domain_id == filter.domain_id)
            .cloned()
            .collect())
    }
}

pub(crate) enum LicenseReply {
    Data(Vec<LicenseInfo>),
    NoData,
    Fail(&'static str),
}

#[derive(Default)]
pub(crate) struct MockLicenseState {
    pub replies: Mutex<VecDeque<LicenseReply>>,
    pub acquired: AtomicU32,
    pub released: AtomicU32,
    pub applied: Mutex<Option<LicenseServiceSettings>>,
    pub requested: Mutex<Vec<Vec<String>>>,
    pub fail_count: AtomicBool,
}

/// License provider whose handles answer from a queue of scripted replies.
/// Once the queue is empty every requested email gets a paid license.
#[derive(Clone)]
pub(crate) struct MockLicenseProvider {
    pub state: Arc<MockLicenseState>,
    available: bool,
}

impl MockLicenseProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockLicenseState::default()),
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn push(&self, reply: LicenseReply) {
        self.state.replies.lock().unwrap().push_back(reply);
    }
}

impl LicenseServiceProvider for MockLicenseProvider {
    fn license_service(&self) -> Option<Box<dyn LicenseService>> {
        if !self.available {
            return None;
        }
        self.state.acquired.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(MockLicenseService {
            state: self.state.clone(),
            settings: None,
        }))
    }
}

struct MockLicenseService {
    state: Arc<MockLicenseState>,
    settings: Option<LicenseServiceSettings>,
}

#[async_trait::async_trait]
impl LicenseService for MockLicenseService {
    fn settings(&self) -> Option<&LicenseServiceSettings> {
        self.settings.as_ref()
    }

    fn set_settings(&mut self, settings: LicenseServiceSettings) {
        *self.state.applied.lock().unwrap() = Some(settings.clone());
        self.settings = Some(settings);
    }

    async fn licensed_user_count(&self, _domain_id: Uuid) -> anyhow::Result<u64> {
        if self.state.fail_count.load(Ordering::SeqCst) {
            anyhow::bail!("count endpoint unavailable");
        }
        Ok(100)
    }

    async fn licenses(
        &self,
        _domain_id: Uuid,
        emails: &[String],
    ) -> anyhow::Result<Option<Vec<LicenseInfo>>> {
        self.state.requested.lock().unwrap().push(emails.to_vec());

        let reply = self.state.replies.lock().unwrap().pop_front();
        match reply {
            Some(LicenseReply::Data(licenses)) => Ok(Some(licenses)),
            Some(LicenseReply::NoData) => Ok(None),
            Some(LicenseReply::Fail(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(Some(emails.iter().map(|e| license(e, false)).collect())),
        }
    }
}

impl Drop for MockLicenseService {
    fn drop(&mut self) {
        self.state.released.fetch_add(1, Ordering::SeqCst);
    }
}
