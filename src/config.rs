use serde::Deserialize;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub mentor_database_url: String,
    pub mentee_database_url: String,
    pub jwt: JwtConfig,
    pub otp_ttl_minutes: i64,
    /// When absent, OTP codes are written to the log instead of emailed.
    pub smtp: Option<SmtpConfig>,
    /// Optional third-party media host; local disk is used when absent.
    pub media_s3: Option<S3Config>,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mentor_database_url = std::env::var("MENTOR_DATABASE_URL")?;
        let mentee_database_url = std::env::var("MENTEE_DATABASE_URL")?;

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "mentorconnect".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "mentorconnect-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };

        let otp_ttl_minutes = std::env::var("OTP_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(10);

        let smtp = match (
            std::env::var("SMTP_HOST"),
            std::env::var("SMTP_USERNAME"),
            std::env::var("SMTP_PASSWORD"),
            std::env::var("SMTP_FROM"),
        ) {
            (Ok(host), Ok(username), Ok(password), Ok(from)) => Some(SmtpConfig {
                host,
                username,
                password,
                from,
            }),
            _ => None,
        };

        let media_s3 = match (
            std::env::var("MEDIA_S3_ENDPOINT"),
            std::env::var("MEDIA_S3_BUCKET"),
            std::env::var("MEDIA_S3_ACCESS_KEY"),
            std::env::var("MEDIA_S3_SECRET_KEY"),
        ) {
            (Ok(endpoint), Ok(bucket), Ok(access_key), Ok(secret_key)) => Some(S3Config {
                endpoint,
                bucket,
                access_key,
                secret_key,
            }),
            _ => None,
        };

        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());
        let max_upload_bytes = std::env::var("UPLOAD_MAX_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            mentor_database_url,
            mentee_database_url,
            jwt,
            otp_ttl_minutes,
            smtp,
            media_s3,
            upload_dir,
            max_upload_bytes,
        })
    }
}
