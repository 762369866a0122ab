use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Testimonial {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Weighted running mean: the new value is folded in before the count is
/// incremented.
pub(crate) fn next_average(avg: f64, count: i32, value: i32) -> f64 {
    (avg * count as f64 + value as f64) / (count as f64 + 1.0)
}

/// Fold one rating into a mentor's aggregate and optionally append a
/// testimonial, as a single transactional unit. The row lock makes
/// concurrent submissions serialize instead of losing updates.
///
/// Returns the new `(average, count)` pair, or `None` if the mentor does not
/// exist.
pub async fn apply_rating(
    db: &PgPool,
    mentor_id: Uuid,
    value: i32,
    comment: Option<&str>,
) -> anyhow::Result<Option<(f64, i32)>> {
    let mut tx = db.begin().await.context("begin tx")?;

    let current: Option<(f64, i32)> = sqlx::query_as(
        r#"SELECT rating_avg, rating_count FROM accounts WHERE id = $1 FOR UPDATE"#,
    )
    .bind(mentor_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((avg, count)) = current else {
        return Ok(None);
    };

    let new_avg = next_average(avg, count, value);
    let new_count = count + 1;

    sqlx::query(r#"UPDATE accounts SET rating_avg = $2, rating_count = $3 WHERE id = $1"#)
        .bind(mentor_id)
        .bind(new_avg)
        .bind(new_count)
        .execute(&mut *tx)
        .await?;

    if comment.is_some() {
        sqlx::query(
            r#"INSERT INTO testimonials (mentor_id, rating, comment) VALUES ($1, $2, $3)"#,
        )
        .bind(mentor_id)
        .bind(value)
        .bind(comment)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await.context("commit tx")?;
    Ok(Some((new_avg, new_count)))
}

pub async fn list_testimonials(db: &PgPool, mentor_id: Uuid) -> anyhow::Result<Vec<Testimonial>> {
    let rows = sqlx::query_as::<_, Testimonial>(
        r#"
        SELECT id, mentor_id, rating, comment, created_at
        FROM testimonials
        WHERE mentor_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(mentor_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_equal_ratings_from_zero_average_exactly_v() {
        for v in 1..=5 {
            let mut avg = 0.0;
            let mut count = 0;
            for _ in 0..7 {
                avg = next_average(avg, count, v);
                count += 1;
            }
            assert_eq!(avg, v as f64);
            assert_eq!(count, 7);
        }
    }

    #[test]
    fn mixed_ratings_match_plain_mean() {
        let values = [5, 3, 4, 1, 2, 5];
        let mut avg = 0.0;
        let mut count = 0;
        for v in values {
            avg = next_average(avg, count, v);
            count += 1;
        }
        let expected: f64 = values.iter().sum::<i32>() as f64 / values.len() as f64;
        assert!((avg - expected).abs() < 1e-9);
    }

    #[test]
    fn single_rating_becomes_the_average() {
        assert_eq!(next_average(0.0, 0, 4), 4.0);
    }
}
