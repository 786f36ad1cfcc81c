pub mod license;
pub mod report;
pub mod user;

pub use license::{LicenseInfo, LicenseServiceSettings, LicenseType};
pub use report::{ReportQuery, UserReport, UserReportRow};
pub use user::{BackupStatus, ServiceBackup, User, UserState};
