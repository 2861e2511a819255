use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::{
    db::{CommitOutcome, RatingLedger, RatingStore, TasteUpdate},
    error::{AppError, AppResult},
    models::{Rating, Score},
};

const RATING_COLUMNS: &str = "id, user_id, movie_id, score, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct RatingRow {
    id: Uuid,
    user_id: Uuid,
    movie_id: Uuid,
    score: f32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RatingRow> for Rating {
    type Error = AppError;

    fn try_from(row: RatingRow) -> Result<Self, Self::Error> {
        Ok(Rating {
            id: row.id,
            user_id: row.user_id,
            movie_id: row.movie_id,
            score: Score::new(row.score)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait::async_trait]
impl RatingStore for PgStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Rating>> {
        let sql = format!("SELECT {RATING_COLUMNS} FROM ratings WHERE id = $1");
        sqlx::query_as::<_, RatingRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(Rating::try_from)
            .transpose()
    }

    async fn get_by_user_and_movie(
        &self,
        user_id: Uuid,
        movie_id: Uuid,
    ) -> AppResult<Option<Rating>> {
        let sql =
            format!("SELECT {RATING_COLUMNS} FROM ratings WHERE user_id = $1 AND movie_id = $2");
        sqlx::query_as::<_, RatingRow>(&sql)
            .bind(user_id)
            .bind(movie_id)
            .fetch_optional(self.pool())
            .await?
            .map(Rating::try_from)
            .transpose()
    }

    async fn create(&self, rating: &Rating) -> AppResult<Rating> {
        let sql = format!(
            r#"
            INSERT INTO ratings ({RATING_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RATING_COLUMNS}
            "#
        );
        sqlx::query_as::<_, RatingRow>(&sql)
            .bind(rating.id)
            .bind(rating.user_id)
            .bind(rating.movie_id)
            .bind(rating.score.get())
            .bind(rating.created_at)
            .bind(rating.updated_at)
            .fetch_one(self.pool())
            .await?
            .try_into()
    }

    async fn update(&self, rating: &Rating) -> AppResult<bool> {
        let result = sqlx::query("UPDATE ratings SET score = $1, updated_at = $2 WHERE id = $3")
            .bind(rating.score.get())
            .bind(rating.updated_at)
            .bind(rating.id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> AppResult<Option<Rating>> {
        let sql = format!("DELETE FROM ratings WHERE id = $1 RETURNING {RATING_COLUMNS}");
        sqlx::query_as::<_, RatingRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(Rating::try_from)
            .transpose()
    }
}

#[async_trait::async_trait]
impl RatingLedger for PgStore {
    async fn commit_rating(&self, rating: Rating, taste: TasteUpdate) -> AppResult<CommitOutcome> {
        let mut tx = self.pool().begin().await?;

        // Taking the user row first also serializes concurrent commits for the same user.
        let updated = sqlx::query(
            "UPDATE users SET taste = $1, version = version + 1 WHERE id = $2 AND version = $3",
        )
        .bind(taste.taste.as_slice())
        .bind(taste.user_id)
        .bind(taste.expected_version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CommitOutcome::VersionConflict);
        }

        let sql = format!(
            r#"
            INSERT INTO ratings ({RATING_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, movie_id)
            DO UPDATE SET score = EXCLUDED.score, updated_at = EXCLUDED.updated_at
            RETURNING {RATING_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, RatingRow>(&sql)
            .bind(rating.id)
            .bind(rating.user_id)
            .bind(rating.movie_id)
            .bind(rating.score.get())
            .bind(rating.created_at)
            .bind(rating.updated_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CommitOutcome::Committed(row.try_into()?))
    }
}
