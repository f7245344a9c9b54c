use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail. Delivery failures are the implementation's concern;
/// callers never surface them to the requester.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

/// Writes every message to the log instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        tracing::info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            body = %email.body,
            "Outbound email"
        );
        Ok(())
    }
}

pub fn password_reset_email(from: &str, to: &str, base_url: &str, token: &str) -> Email {
    let link = format!("{}/reset-password?token={}", base_url.trim_end_matches('/'), token);
    Email {
        from: from.to_string(),
        to: to.to_string(),
        subject: "Password Reset Request".to_string(),
        body: format!(
            "You requested a password reset. Open the link below to choose a new password:\n\n{}\n\n\
             The link expires in one hour. If you did not request this, ignore this email.",
            link
        ),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_link_has_no_double_slash() {
        let email = password_reset_email("noreply@company.com", "jane@company.com", "https://app.company.com/", "abc");
        assert!(email.body.contains("https://app.company.com/reset-password?token=abc"));
        assert_eq!(email.to, "jane@company.com");
    }
}
