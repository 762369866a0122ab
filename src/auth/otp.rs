use async_trait::async_trait;
use rand::Rng;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::role::Role;

/// A live password-reset challenge: at most one per email, valid until
/// `expires_at`.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub code: String,
    pub expires_at: OffsetDateTime,
}

/// Challenge storage, injected so handlers never care whether it is backed by
/// Postgres or by memory (tests).
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Store a challenge, overwriting any prior one for the same email.
    async fn put(
        &self,
        role: Role,
        email: &str,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()>;

    async fn get(&self, role: Role, email: &str) -> anyhow::Result<Option<OtpChallenge>>;

    /// Delete the challenge only if the stored code still matches; returns
    /// whether a row was removed. This is the consume step of a reset.
    async fn consume(&self, role: Role, email: &str, code: &str) -> anyhow::Result<bool>;

    /// Unconditional delete, used to clear stale challenges.
    async fn delete(&self, role: Role, email: &str) -> anyhow::Result<()>;
}

pub fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

#[derive(Debug, PartialEq, Eq)]
pub enum ChallengeCheck {
    Valid,
    Expired,
    Mismatch,
}

/// Expiry wins over mismatch: a stale challenge is reported (and then
/// deleted by the caller) regardless of what code was submitted.
pub fn check_challenge(
    challenge: &OtpChallenge,
    submitted_code: &str,
    now: OffsetDateTime,
) -> ChallengeCheck {
    if now > challenge.expires_at {
        ChallengeCheck::Expired
    } else if challenge.code != submitted_code {
        ChallengeCheck::Mismatch
    } else {
        ChallengeCheck::Valid
    }
}

/// Challenges live in the same store as the role's accounts, so restarts and
/// horizontal scaling do not invalidate in-flight resets.
pub struct PgOtpStore {
    mentor_db: PgPool,
    mentee_db: PgPool,
}

impl PgOtpStore {
    pub fn new(mentor_db: PgPool, mentee_db: PgPool) -> Self {
        Self {
            mentor_db,
            mentee_db,
        }
    }

    fn db(&self, role: Role) -> &PgPool {
        match role {
            Role::Mentor => &self.mentor_db,
            Role::Mentee => &self.mentee_db,
        }
    }
}

#[async_trait]
impl OtpStore for PgOtpStore {
    async fn put(
        &self,
        role: Role,
        email: &str,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO password_resets (email, code, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (email)
            DO UPDATE SET code = EXCLUDED.code, expires_at = EXCLUDED.expires_at,
                          created_at = now()
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(expires_at)
        .execute(self.db(role))
        .await?;
        Ok(())
    }

    async fn get(&self, role: Role, email: &str) -> anyhow::Result<Option<OtpChallenge>> {
        let row: Option<(String, OffsetDateTime)> = sqlx::query_as(
            r#"
            SELECT code, expires_at
            FROM password_resets
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.db(role))
        .await?;
        Ok(row.map(|(code, expires_at)| OtpChallenge { code, expires_at }))
    }

    async fn consume(&self, role: Role, email: &str, code: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM password_resets
            WHERE email = $1 AND code = $2
            "#,
        )
        .bind(email)
        .bind(code)
        .execute(self.db(role))
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, role: Role, email: &str) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM password_resets WHERE email = $1"#)
            .bind(email)
            .execute(self.db(role))
            .await?;
        Ok(())
    }
}

/// In-memory implementation for tests and local development.
#[derive(Default)]
pub struct MemoryOtpStore {
    entries: std::sync::Mutex<std::collections::HashMap<(Role, String), OtpChallenge>>,
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn put(
        &self,
        role: Role,
        email: &str,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        self.entries.lock().unwrap().insert(
            (role, email.to_string()),
            OtpChallenge {
                code: code.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, role: Role, email: &str) -> anyhow::Result<Option<OtpChallenge>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&(role, email.to_string()))
            .cloned())
    }

    async fn consume(&self, role: Role, email: &str, code: &str) -> anyhow::Result<bool> {
        let mut entries = self.entries.lock().unwrap();
        let key = (role, email.to_string());
        match entries.get(&key) {
            Some(ch) if ch.code == code => {
                entries.remove(&key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, role: Role, email: &str) -> anyhow::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .remove(&(role, email.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn challenge(code: &str, ttl_secs: i64) -> OtpChallenge {
        OtpChallenge {
            code: code.to_string(),
            expires_at: OffsetDateTime::now_utc() + Duration::seconds(ttl_secs),
        }
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn matching_code_within_window_is_valid() {
        let ch = challenge("123456", 600);
        let now = OffsetDateTime::now_utc();
        assert_eq!(check_challenge(&ch, "123456", now), ChallengeCheck::Valid);
    }

    #[test]
    fn wrong_code_is_mismatch() {
        let ch = challenge("123456", 600);
        let now = OffsetDateTime::now_utc();
        assert_eq!(check_challenge(&ch, "654321", now), ChallengeCheck::Mismatch);
    }

    #[test]
    fn stale_challenge_is_expired_even_with_correct_code() {
        let ch = challenge("123456", 600);
        let later = OffsetDateTime::now_utc() + Duration::minutes(11);
        assert_eq!(check_challenge(&ch, "123456", later), ChallengeCheck::Expired);
    }

    #[tokio::test]
    async fn memory_store_roundtrip_and_overwrite() {
        let store = MemoryOtpStore::default();
        let exp = OffsetDateTime::now_utc() + Duration::minutes(10);

        store.put(Role::Mentee, "a@b.com", "111111", exp).await.unwrap();
        store.put(Role::Mentee, "a@b.com", "222222", exp).await.unwrap();

        let ch = store.get(Role::Mentee, "a@b.com").await.unwrap().unwrap();
        assert_eq!(ch.code, "222222");

        // Mentor store is independent of the mentee store.
        assert!(store.get(Role::Mentor, "a@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn consume_is_conditional_and_single_shot() {
        let store = MemoryOtpStore::default();
        let exp = OffsetDateTime::now_utc() + Duration::minutes(10);
        store.put(Role::Mentor, "m@x.com", "123456", exp).await.unwrap();

        assert!(!store.consume(Role::Mentor, "m@x.com", "000000").await.unwrap());
        assert!(store.consume(Role::Mentor, "m@x.com", "123456").await.unwrap());
        // Already consumed.
        assert!(!store.consume(Role::Mentor, "m@x.com", "123456").await.unwrap());
        assert!(store.get(Role::Mentor, "m@x.com").await.unwrap().is_none());
    }
}
