use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::repo::Account;
use crate::ratings::repo::Testimonial;

/// Client-facing projection of an account; the password hash never leaves
/// the repo layer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub skills: Option<String>,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub expertise: Option<String>,
    pub experience_years: Option<i32>,
    pub scheduling_url: Option<String>,
    pub photo_url: Option<String>,
    pub average_rating: f64,
    pub total_reviews: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl PublicAccount {
    pub fn from_account(account: Account, photo_url: Option<String>) -> Self {
        Self {
            id: account.id,
            email: account.email,
            full_name: account.full_name,
            bio: account.bio,
            skills: account.skills,
            job_title: account.job_title,
            company: account.company,
            expertise: account.expertise,
            experience_years: account.experience_years,
            scheduling_url: account.scheduling_url,
            photo_url,
            average_rating: account.rating_avg,
            total_reviews: account.rating_count,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub expertise: Option<String>,
    #[serde(default)]
    pub experience_years: Option<i32>,
    #[serde(default)]
    pub scheduling_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialItem {
    pub rating: i32,
    pub comment: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Testimonial> for TestimonialItem {
    fn from(t: Testimonial) -> Self {
        Self {
            rating: t.rating,
            comment: t.comment,
            created_at: t.created_at,
        }
    }
}

/// Public mentor page: profile plus its testimonials.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorDetail {
    #[serde(flatten)]
    pub profile: PublicAccount,
    pub testimonials: Vec<TestimonialItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            id: Uuid::new_v4(),
            email: "mentor@example.com".into(),
            password_hash: "$argon2id$hidden".into(),
            full_name: "Jordan Mentor".into(),
            bio: Some("20 years of backend work".into()),
            skills: Some("rust, sql".into()),
            job_title: Some("Staff Engineer".into()),
            company: None,
            expertise: Some("databases".into()),
            experience_years: Some(20),
            scheduling_url: None,
            photo_key: Some("mentors/abc.jpg".into()),
            rating_avg: 4.5,
            rating_count: 2,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn public_projection_hides_password_and_uses_camel_case() {
        let public =
            PublicAccount::from_account(account(), Some("/uploads/mentors/abc.jpg".into()));
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("password"));
        assert!(json.contains("\"fullName\":\"Jordan Mentor\""));
        assert!(json.contains("\"photoUrl\":\"/uploads/mentors/abc.jpg\""));
        assert!(json.contains("\"averageRating\":4.5"));
        assert!(json.contains("\"totalReviews\":2"));
    }
}
