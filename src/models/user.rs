use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    InDomain,
    NotInDomain,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    NotStarted,
    InProgress,
    Success,
    Warning,
    Failed,
}

impl UserState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserState::InDomain => "in_domain",
            UserState::NotInDomain => "not_in_domain",
            UserState::Archived => "archived",
        }
    }
}

impl FromStr for UserState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_domain" => Ok(UserState::InDomain),
            "not_in_domain" => Ok(UserState::NotInDomain),
            "archived" => Ok(UserState::Archived),
            other => Err(anyhow::anyhow!("unknown user state {other:?}")),
        }
    }
}

impl FromStr for BackupStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(BackupStatus::NotStarted),
            "in_progress" => Ok(BackupStatus::InProgress),
            "success" => Ok(BackupStatus::Success),
            "warning" => Ok(BackupStatus::Warning),
            "failed" => Ok(BackupStatus::Failed),
            other => Err(anyhow::anyhow!("unknown backup status {other:?}")),
        }
    }
}

/// Outcome of the most recent backup run of one service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceBackup {
    pub last_backup_status: BackupStatus,
    pub last_backup_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub user_email: String,
    pub domain_id: Uuid,
    pub backup_enabled: bool,
    pub state: UserState,
    pub email: ServiceBackup,
    pub drive: ServiceBackup,
    pub calendar: ServiceBackup,
}
