use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInfo {
    pub email: String,
    pub is_trial: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LicenseType {
    Trial,
    Paid,
    None,
}

impl LicenseType {
    pub fn of(license: Option<&LicenseInfo>) -> Self {
        match license {
            Some(info) if info.is_trial => LicenseType::Trial,
            Some(_) => LicenseType::Paid,
            None => LicenseType::None,
        }
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LicenseType::Trial => "Trial",
            LicenseType::Paid => "Paid",
            LicenseType::None => "None",
        };
        f.write_str(label)
    }
}

/// Per-handle options of a license service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseServiceSettings {
    pub timeout: Duration,
}

impl Default for LicenseServiceSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(100),
        }
    }
}
