//! Users, their role links, and the directory that resolves them.
//!
//! DESIGN
//! ======
//! A user can be linked to an admin record, an account record, both, or
//! neither. Guards only ask one question of a user: "can it play role X?",
//! answered by [`User::can_play_role_of`]. The account link additionally
//! carries the email-verification flag consulted by `ensure_account`.
//!
//! The directory is a trait so the session layer can resolve users from
//! Postgres in production and from memory in tests and DB-less runs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Capability a user may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Account,
}

/// Account email-verification status, stored as `"yes"` / `"no"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verification {
    Yes,
    #[default]
    No,
}

impl Verification {
    /// Parse the stored flag. Only an exact `"yes"` counts as verified.
    #[must_use]
    pub fn from_flag(flag: &str) -> Self {
        if flag == "yes" { Self::Yes } else { Self::No }
    }

    #[must_use]
    pub fn as_flag(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRole {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRole {
    pub id: Uuid,
    pub is_verified: Verification,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub admin: Option<AdminRole>,
    pub account: Option<AccountRole>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub roles: Roles,
}

impl User {
    #[must_use]
    pub fn can_play_role_of(&self, role: Role) -> bool {
        match role {
            Role::Admin => self.roles.admin.is_some(),
            Role::Account => self.roles.account.is_some(),
        }
    }

    /// Whether the linked account has confirmed its email. `false` without an account.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.roles
            .account
            .as_ref()
            .is_some_and(|account| account.is_verified == Verification::Yes)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Looks up users by id for the session layer.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DirectoryError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DirectoryError> {
        let row = sqlx::query(
            r"SELECT
                  u.id,
                  u.username,
                  u.email,
                  u.is_active,
                  ad.id   AS admin_id,
                  ad.name AS admin_name,
                  ac.id   AS account_id,
                  ac.is_verified
              FROM users u
              LEFT JOIN admins ad ON ad.user_id = u.id
              LEFT JOIN accounts ac ON ac.user_id = u.id
              WHERE u.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let admin = r
                .get::<Option<Uuid>, _>("admin_id")
                .map(|admin_id| AdminRole { id: admin_id, name: r.get("admin_name") });
            let account = r.get::<Option<Uuid>, _>("account_id").map(|account_id| AccountRole {
                id: account_id,
                is_verified: Verification::from_flag(&r.get::<String, _>("is_verified")),
            });
            User {
                id: r.get("id"),
                username: r.get("username"),
                email: r.get("email"),
                is_active: r.get("is_active"),
                roles: Roles { admin, account },
            }
        }))
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Directory backed by a map. Used when no database is configured.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user.
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait::async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DirectoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
