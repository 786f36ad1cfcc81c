use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ServiceBackup, User};

use super::{UserFilter, UserProvider};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    user_email: String,
    domain_id: Uuid,
    backup_enabled: bool,
    state: String,
    email_status: String,
    email_last_backup_at: Option<DateTime<Utc>>,
    drive_status: String,
    drive_last_backup_at: Option<DateTime<Utc>>,
    calendar_status: String,
    calendar_last_backup_at: Option<DateTime<Utc>>,
}

fn service_backup(status: &str, at: Option<DateTime<Utc>>) -> anyhow::Result<ServiceBackup> {
    Ok(ServiceBackup {
        last_backup_status: status.parse()?,
        last_backup_date: at,
    })
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            state: row
                .state
                .parse()
                .with_context(|| format!("user {}", row.id))?,
            email: service_backup(&row.email_status, row.email_last_backup_at)?,
            drive: service_backup(&row.drive_status, row.drive_last_backup_at)?,
            calendar: service_backup(&row.calendar_status, row.calendar_last_backup_at)?,
            user_email: row.user_email,
            domain_id: row.domain_id,
            backup_enabled: row.backup_enabled,
        })
    }
}

/// Reads users and their per-service backup state from Postgres.
#[derive(Clone)]
pub struct PgUserProvider {
    pool: PgPool,
}

impl PgUserProvider {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserProvider for PgUserProvider {
    #[tracing::instrument(
        name = "db.users.query",
        skip(self),
        fields(domain.id = %filter.domain_id, user_count)
    )]
    async fn get_users(&self, filter: &UserFilter) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT u.id, u.user_email, u.domain_id, u.backup_enabled, u.state, \
                    b.email_status, b.email_last_backup_at, \
                    b.drive_status, b.drive_last_backup_at, \
                    b.calendar_status, b.calendar_last_backup_at \
             FROM users u \
             JOIN user_backups b ON b.user_id = u.id \
             WHERE u.domain_id = $1 \
               AND u.backup_enabled = $2 \
               AND u.state = $3 \
             ORDER BY u.user_email",
        )
        .bind(filter.domain_id)
        .bind(filter.backup_enabled)
        .bind(filter.state.as_str())
        .fetch_all(&self.pool)
        .await?;

        tracing::Span::current().record("user_count", rows.len());

        rows.into_iter().map(User::try_from).collect()
    }
}
