use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{LicenseInfo, LicenseType, User, UserReportRow};

pub fn to_report_row(user: &User, licenses: &HashMap<Uuid, LicenseInfo>) -> UserReportRow {
    UserReportRow {
        id: user.id,
        user_name: user.user_email.clone(),
        in_backup: user.backup_enabled,
        email_last_backup_status: user.email.last_backup_status,
        email_last_backup_date: user.email.last_backup_date,
        drive_last_backup_status: user.drive.last_backup_status,
        drive_last_backup_date: user.drive.last_backup_date,
        calendar_last_backup_status: user.calendar.last_backup_status,
        calendar_last_backup_date: user.calendar.last_backup_date,
        license_type: LicenseType::of(licenses.get(&user.id)).to_string(),
    }
}

#[tracing::instrument(
    name = "pipeline_stage assemble",
    skip_all,
    fields(pipeline.stage = "assemble", report.rows = users.len())
)]
pub fn build_rows(users: &[User], licenses: &HashMap<Uuid, LicenseInfo>) -> Vec<UserReportRow> {
    users.iter().map(|u| to_report_row(u, licenses)).collect()
}
