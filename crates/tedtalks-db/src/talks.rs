//! Database operations for the `talks` table.
//!
//! The table is append-only: the CSV import pipeline is the sole writer and
//! performs one bulk insert per import, everything else is read-only.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use tedtalks_core::{NewTalk, Talk};

use crate::DbError;

/// A row from the `talks` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TalkRow {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub talk_date: NaiveDate,
    pub views: i64,
    pub likes: i64,
    pub link: String,
    pub created_at: DateTime<Utc>,
}

impl From<TalkRow> for Talk {
    fn from(row: TalkRow) -> Self {
        Talk {
            id: row.id,
            title: row.title,
            author: row.author,
            date: row.talk_date,
            views: row.views,
            likes: row.likes,
            link: row.link,
        }
    }
}

const TALK_COLUMNS: &str = "id, title, author, talk_date, views, likes, link, created_at";

/// Bulk-inserts a parsed CSV batch and returns the persisted rows with their
/// store-assigned ids, in input order.
///
/// A single `INSERT … SELECT FROM UNNEST` statement, so the batch commits
/// atomically: either every row lands or none does.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_talks(pool: &PgPool, talks: &[NewTalk]) -> Result<Vec<TalkRow>, DbError> {
    if talks.is_empty() {
        return Ok(Vec::new());
    }

    let mut titles = Vec::with_capacity(talks.len());
    let mut authors = Vec::with_capacity(talks.len());
    let mut dates = Vec::with_capacity(talks.len());
    let mut views = Vec::with_capacity(talks.len());
    let mut likes = Vec::with_capacity(talks.len());
    let mut links = Vec::with_capacity(talks.len());
    for talk in talks {
        titles.push(talk.title.clone());
        authors.push(talk.author.clone());
        dates.push(talk.date);
        views.push(talk.views);
        likes.push(talk.likes);
        links.push(talk.link.clone());
    }

    let rows = sqlx::query_as::<_, TalkRow>(
        "INSERT INTO talks (title, author, talk_date, views, likes, link) \
         SELECT * FROM UNNEST($1::text[], $2::text[], $3::date[], $4::bigint[], $5::bigint[], $6::text[]) \
         RETURNING id, title, author, talk_date, views, likes, link, created_at",
    )
    .bind(&titles)
    .bind(&authors)
    .bind(&dates)
    .bind(&views)
    .bind(&likes)
    .bind(&links)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single talk by id, or `None` if absent. Absence is not an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_talk_by_id(pool: &PgPool, id: i64) -> Result<Option<TalkRow>, DbError> {
    let row = sqlx::query_as::<_, TalkRow>(&format!(
        "SELECT {TALK_COLUMNS} FROM talks WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns every talk whose date falls in the given calendar year, in
/// store-natural (id) order. An empty result is a valid result.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_talks_by_year(pool: &PgPool, year: i32) -> Result<Vec<TalkRow>, DbError> {
    let rows = sqlx::query_as::<_, TalkRow>(&format!(
        "SELECT {TALK_COLUMNS} FROM talks \
         WHERE talk_date >= make_date($1, 1, 1) AND talk_date < make_date($1 + 1, 1, 1) \
         ORDER BY id"
    ))
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Total number of talks.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_talks(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM talks")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Returns one page of talks in id order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_talks_page(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<TalkRow>, DbError> {
    let rows = sqlx::query_as::<_, TalkRow>(&format!(
        "SELECT {TALK_COLUMNS} FROM talks ORDER BY id LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Full-table scan feeding the ranking engine. Deliberate simplicity for a
/// few thousand rows; revisit with server-side aggregation if the table grows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_all_talks(pool: &PgPool) -> Result<Vec<TalkRow>, DbError> {
    let rows = sqlx::query_as::<_, TalkRow>(&format!("SELECT {TALK_COLUMNS} FROM talks ORDER BY id"))
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
