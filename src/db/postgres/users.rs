use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::{
    db::UserStore,
    error::{AppError, AppResult},
    models::{User, Vector},
};

const USER_COLUMNS: &str = "id, email, name, role, taste, version, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    role: String,
    taste: Vec<f32>,
    version: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role.parse()?,
            taste: Vector::try_from(row.taste)?,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

#[async_trait::async_trait]
impl UserStore for PgStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool())
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn create(&self, user: &User) -> AppResult<()> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
        sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(user.role.as_str())
            .bind(user.taste.as_slice())
            .bind(user.version)
            .bind(user.created_at)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    async fn update(&self, user: &User) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $1, name = $2, role = $3, taste = $4, version = version + 1
            WHERE id = $5
            "#,
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.taste.as_slice())
        .bind(user.id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
