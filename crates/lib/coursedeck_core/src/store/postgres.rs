//! PostgreSQL-backed user store.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, UserStore};
use crate::models::{Identity, NewUser, Role, UserRecord};

/// Durable user store over a `sqlx` Postgres pool.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type UserRow = (String, String, Option<String>, String, Option<String>);

fn row_to_record(row: UserRow) -> Result<UserRecord, StoreError> {
    let (id, email, display_name, role, password_digest) = row;
    let role = Role::parse(&role)
        .ok_or_else(|| StoreError::Backend(format!("unknown role in store: {role}")))?;
    Ok(UserRecord {
        identity: Identity {
            id,
            email,
            display_name,
            role,
        },
        password_digest,
    })
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id::text, email, display_name, role, password_digest \
             FROM users WHERE email = $1",
        )
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_record).transpose()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id::text, email, display_name, role, password_digest \
             FROM users WHERE id::text = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_record).transpose()
    }

    async fn create(&self, user: NewUser) -> Result<Identity, StoreError> {
        let email = user.email.to_lowercase();
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(&email)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            return Err(StoreError::Duplicate(email));
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, email, display_name, role, password_digest) \
             VALUES ($1::uuid, $2, $3, $4, $5)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(&user.password_digest)
        .execute(&self.pool)
        .await?;

        Ok(Identity {
            id,
            email,
            display_name: user.display_name,
            role: user.role,
        })
    }

    async fn set_role(&self, id: &str, role: Role) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET role = $2 WHERE id::text = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users WHERE id::text = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
