use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::BackupStatus;

/// One page of the backup report for a domain. Pages are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ReportQuery {
    pub domain_id: Uuid,
    pub page_size: u32,
    pub page_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserReportRow {
    pub id: Uuid,
    pub user_name: String,
    pub in_backup: bool,
    pub email_last_backup_status: BackupStatus,
    pub email_last_backup_date: Option<DateTime<Utc>>,
    pub drive_last_backup_status: BackupStatus,
    pub drive_last_backup_date: Option<DateTime<Utc>>,
    pub calendar_last_backup_status: BackupStatus,
    pub calendar_last_backup_date: Option<DateTime<Utc>>,
    pub license_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserReport {
    pub total_count: usize,
    pub data: Vec<UserReportRow>,
}
