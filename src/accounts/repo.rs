use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::dto::UpdateProfileRequest;

const ACCOUNT_COLUMNS: &str = r#"
    id, email, password_hash, full_name, bio, skills, job_title, company,
    expertise, experience_years, scheduling_url, photo_key,
    rating_avg, rating_count, created_at
"#;

/// Account record in a role store. Mentee rows leave the mentor-only columns
/// at their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub skills: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub expertise: Option<String>,
    pub experience_years: Option<i32>,
    pub scheduling_url: Option<String>,
    pub photo_key: Option<String>,
    pub rating_avg: f64,
    pub rating_count: i32,
    pub created_at: OffsetDateTime,
}

/// Fields persisted at signup.
#[derive(Debug)]
pub struct NewAccount<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub full_name: &'a str,
    pub bio: Option<&'a str>,
    pub skills: Option<&'a str>,
    pub job_title: Option<&'a str>,
    pub company: Option<&'a str>,
    pub expertise: Option<&'a str>,
    pub experience_years: Option<i32>,
    pub scheduling_url: Option<&'a str>,
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.is_unique_violation())
}

/// `%`, `_` and `\` in a search query are literals, not pattern syntax.
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl Account {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"#
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(account)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(account)
    }

    /// Returns `None` when the email is already taken, so a signup that loses
    /// a race with a duplicate still surfaces as a conflict rather than a
    /// constraint error.
    pub async fn create(db: &PgPool, new: &NewAccount<'_>) -> anyhow::Result<Option<Account>> {
        let result = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts
                (email, password_hash, full_name, bio, skills, job_title, company,
                 expertise, experience_years, scheduling_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.full_name)
        .bind(new.bio)
        .bind(new.skills)
        .bind(new.job_title)
        .bind(new.company)
        .bind(new.expertise)
        .bind(new.experience_years)
        .bind(new.scheduling_url)
        .fetch_one(db)
        .await;
        match result {
            Ok(account) => Ok(Some(account)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Patch the free-text profile fields. Email, role and password are not
    /// reachable from here.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        update: &UpdateProfileRequest,
    ) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts SET
                full_name        = COALESCE($2, full_name),
                bio              = COALESCE($3, bio),
                skills           = COALESCE($4, skills),
                job_title        = COALESCE($5, job_title),
                company          = COALESCE($6, company),
                expertise        = COALESCE($7, expertise),
                experience_years = COALESCE($8, experience_years),
                scheduling_url   = COALESCE($9, scheduling_url)
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.full_name.as_deref())
        .bind(update.bio.as_deref())
        .bind(update.skills.as_deref())
        .bind(update.job_title.as_deref())
        .bind(update.company.as_deref())
        .bind(update.expertise.as_deref())
        .bind(update.experience_years)
        .bind(update.scheduling_url.as_deref())
        .fetch_optional(db)
        .await?;
        Ok(account)
    }

    /// Point the account at a new photo key (or clear it), returning the key
    /// it previously held. Outer `None` means the account does not exist.
    pub async fn set_photo_key(
        db: &PgPool,
        id: Uuid,
        key: Option<&str>,
    ) -> anyhow::Result<Option<Option<String>>> {
        let mut tx = db.begin().await.context("begin tx")?;
        let old: Option<(Option<String>,)> =
            sqlx::query_as(r#"SELECT photo_key FROM accounts WHERE id = $1 FOR UPDATE"#)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((old_key,)) = old else {
            return Ok(None);
        };
        sqlx::query(r#"UPDATE accounts SET photo_key = $2 WHERE id = $1"#)
            .bind(id)
            .bind(key)
            .execute(&mut *tx)
            .await?;
        tx.commit().await.context("commit tx")?;
        Ok(Some(old_key))
    }

    pub async fn update_password(
        db: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(r#"UPDATE accounts SET password_hash = $2 WHERE id = $1"#)
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the account, returning the photo key it held (if any) so the
    /// caller can clean up storage.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Option<String>>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as(r#"DELETE FROM accounts WHERE id = $1 RETURNING photo_key"#)
                .bind(id)
                .fetch_optional(db)
                .await?;
        Ok(row.map(|(key,)| key))
    }

    /// Every account in the store, newest first.
    pub async fn browse(db: &PgPool) -> anyhow::Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, Account>(&format!(
            r#"SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at DESC"#
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Case-insensitive substring match over name/title/skills/expertise,
    /// capped at 20, unordered.
    pub async fn search(db: &PgPool, query: &str) -> anyhow::Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, Account>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS} FROM accounts
            WHERE full_name ILIKE '%' || $1 || '%'
               OR job_title ILIKE '%' || $1 || '%'
               OR skills    ILIKE '%' || $1 || '%'
               OR expertise ILIKE '%' || $1 || '%'
            LIMIT 20
            "#
        ))
        .bind(escape_like(query))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_never_serialized() {
        let account = Account {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            password_hash: "$argon2id$secret".into(),
            full_name: "A B".into(),
            bio: None,
            skills: None,
            job_title: None,
            company: None,
            expertise: None,
            experience_years: None,
            scheduling_url: None,
            photo_key: None,
            rating_avg: 0.0,
            rating_count: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn search_patterns_are_escaped() {
        assert_eq!(escape_like("rust"), "rust");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn duplicate_key_errors_are_classified() {
        #[derive(Debug)]
        struct DupError;
        impl std::fmt::Display for DupError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("duplicate key value violates unique constraint")
            }
        }
        impl std::error::Error for DupError {}
        impl sqlx::error::DatabaseError for DupError {
            fn message(&self) -> &str {
                "duplicate key value violates unique constraint"
            }
            fn kind(&self) -> sqlx::error::ErrorKind {
                sqlx::error::ErrorKind::UniqueViolation
            }
            fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
                self
            }
            fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
                self
            }
            fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
                self
            }
        }

        assert!(is_unique_violation(&sqlx::Error::Database(Box::new(DupError))));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
