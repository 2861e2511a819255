use uuid::Uuid;

use super::PgStore;
use crate::{
    db::MovieStore,
    error::{AppError, AppResult},
    models::{Movie, MoviePage, Page, PageRequest, Vector},
};

const MOVIE_COLUMNS: &str = r#"id, title, genre, year, wiki, plot, director, "cast", embedding"#;

/// Filter shared by the search query and its count query. `$1` is either NULL
/// (no filter) or an escaped `%term%` pattern.
const SEARCH_FILTER: &str =
    r#"WHERE $1::text IS NULL OR title ILIKE $1 OR "cast" ILIKE $1 OR director ILIKE $1"#;

#[derive(sqlx::FromRow)]
struct MovieRow {
    id: Uuid,
    title: String,
    genre: String,
    year: i32,
    wiki: String,
    plot: String,
    director: String,
    cast: String,
    embedding: Vec<f32>,
}

impl TryFrom<MovieRow> for Movie {
    type Error = AppError;

    fn try_from(row: MovieRow) -> Result<Self, Self::Error> {
        Ok(Movie {
            id: row.id,
            title: row.title,
            genre: row.genre,
            year: row.year,
            wiki: row.wiki,
            plot: row.plot,
            director: row.director,
            cast: row.cast,
            embedding: Vector::try_from(row.embedding)?,
        })
    }
}

fn into_movies(rows: Vec<MovieRow>) -> AppResult<Vec<Movie>> {
    rows.into_iter().map(Movie::try_from).collect()
}

/// Builds an ILIKE pattern that matches `term` literally as a substring
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait::async_trait]
impl MovieStore for PgStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Movie>> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1");
        sqlx::query_as::<_, MovieRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(Movie::try_from)
            .transpose()
    }

    async fn get_by_title(&self, title: &str) -> AppResult<Option<Movie>> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE title = $1 ORDER BY id LIMIT 1");
        sqlx::query_as::<_, MovieRow>(&sql)
            .bind(title)
            .fetch_optional(self.pool())
            .await?
            .map(Movie::try_from)
            .transpose()
    }

    async fn list_movies(&self, search: Option<String>, page: PageRequest) -> AppResult<MoviePage> {
        let pattern = search.as_deref().map(like_pattern);

        let sql = format!(
            "SELECT {MOVIE_COLUMNS} FROM movies {SEARCH_FILTER} ORDER BY id LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, MovieRow>(&sql)
            .bind(pattern.as_deref())
            .bind(page.fetch_limit())
            .bind(page.offset())
            .fetch_all(self.pool())
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM movies {SEARCH_FILTER}");
        let total_count: i64 = sqlx::query_scalar(&count_sql)
            .bind(pattern.as_deref())
            .fetch_one(self.pool())
            .await?;

        Ok(Page::from_overfetch(into_movies(rows)?, total_count, page))
    }

    async fn get_similar_movies(&self, taste: &Vector, page: PageRequest) -> AppResult<MoviePage> {
        let sql = format!(
            r#"
            SELECT {MOVIE_COLUMNS} FROM movies
            ORDER BY (
                SELECT SUM((u.e - u.t) * (u.e - u.t))
                FROM unnest(movies.embedding, $1::real[]) AS u(e, t)
            ) ASC, id ASC
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, MovieRow>(&sql)
            .bind(taste.as_slice())
            .bind(page.fetch_limit())
            .bind(page.offset())
            .fetch_all(self.pool())
            .await?;

        let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(self.pool())
            .await?;

        Ok(Page::from_overfetch(into_movies(rows)?, total_count, page))
    }

    async fn create(&self, movie: &Movie) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO movies (id, title, genre, year, wiki, plot, director, "cast", embedding)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(movie.id)
        .bind(&movie.title)
        .bind(&movie.genre)
        .bind(movie.year)
        .bind(&movie.wiki)
        .bind(&movie.plot)
        .bind(&movie.director)
        .bind(&movie.cast)
        .bind(movie.embedding.as_slice())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    async fn update(&self, movie: &Movie) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE movies
            SET title = $1, genre = $2, year = $3, wiki = $4, plot = $5,
                director = $6, "cast" = $7, embedding = $8
            WHERE id = $9
            "#,
        )
        .bind(&movie.title)
        .bind(&movie.genre)
        .bind(movie.year)
        .bind(&movie.wiki)
        .bind(&movie.plot)
        .bind(&movie.director)
        .bind(&movie.cast)
        .bind(movie.embedding.as_slice())
        .bind(movie.id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> AppResult<Option<Movie>> {
        let sql = format!("DELETE FROM movies WHERE id = $1 RETURNING {MOVIE_COLUMNS}");
        sqlx::query_as::<_, MovieRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(Movie::try_from)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_wraps_term() {
        assert_eq!(like_pattern("matrix"), "%matrix%");
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("100%_\\"), "%100\\%\\_\\\\%");
    }
}
