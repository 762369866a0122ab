use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

/// Outbound mail, injected so handlers never talk SMTP directly.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, to: &str, code: &str, ttl_minutes: i64) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)?
            .credentials(Credentials::new(
                cfg.username.clone(),
                cfg.password.clone(),
            ))
            .build();
        let from: Mailbox = cfg.from.parse()?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_otp(&self, to: &str, code: &str, ttl_minutes: i64) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject("Your Mentor Connect password reset code")
            .header(ContentType::TEXT_PLAIN)
            .body(reset_body(code, ttl_minutes))?;
        self.transport.send(message).await?;
        Ok(())
    }
}

fn reset_body(code: &str, ttl_minutes: i64) -> String {
    format!(
        "Your password reset code is {code}. It expires in {ttl_minutes} minutes.\n\n\
         If you did not request a reset, you can ignore this email."
    )
}

/// Fallback when SMTP is not configured: the code only reaches the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_otp(&self, to: &str, code: &str, ttl_minutes: i64) -> anyhow::Result<()> {
        info!(%to, %code, ttl_minutes, "smtp not configured; otp code logged instead of emailed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_body_carries_configured_window() {
        let body = reset_body("482910", 25);
        assert!(body.contains("482910"));
        assert!(body.contains("expires in 25 minutes"));
        assert!(!body.contains("10 minutes"));
    }
}
