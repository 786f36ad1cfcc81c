pub mod pool;
pub mod users;

pub use pool::create_pool;
pub use users::PgUserProvider;

use uuid::Uuid;

use crate::models::{User, UserState};

/// Selects the users of one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserFilter {
    pub domain_id: Uuid,
    pub backup_enabled: bool,
    pub state: UserState,
}

impl UserFilter {
    /// Backup-enabled users currently in the domain, the population of the
    /// backup report.
    pub fn report(domain_id: Uuid) -> Self {
        Self {
            domain_id,
            backup_enabled: true,
            state: UserState::InDomain,
        }
    }
}

/// Source of users, ordered by email.
#[async_trait::async_trait]
pub trait UserProvider: Send + Sync {
    async fn get_users(&self, filter: &UserFilter) -> anyhow::Result<Vec<User>>;
}
