use async_trait::async_trait;
use lettre::message::header::{ContentType, HeaderName, HeaderValue};
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use tracing::{info, warn};

use crate::config::MailConfig;
use crate::errors::{PhishsimError, Result};

/// 待发送的一封邮件（已渲染）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub from_name: String,
    pub from_email: String,
    pub subject: String,
    pub html: String,
    pub headers: Vec<(String, String)>,
}

impl OutgoingMail {
    fn to_message(&self) -> Result<Message> {
        let from: Mailbox = format!("{} <{}>", self.from_name, self.from_email)
            .parse()
            .map_err(|e| PhishsimError::mail_transport(format!("Invalid from address: {}", e)))?;
        let to: Mailbox = self
            .to
            .parse()
            .map_err(|e| PhishsimError::mail_transport(format!("Invalid to address: {}", e)))?;

        let mut builder = Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.clone())
            .header(ContentType::TEXT_HTML);

        for (name, value) in &self.headers {
            let name = HeaderName::new_from_ascii(name.clone()).map_err(|e| {
                PhishsimError::mail_transport(format!("Invalid header name: {}", e))
            })?;
            builder = builder.raw_header(HeaderValue::new(name, value.clone()));
        }

        builder
            .body(self.html.clone())
            .map_err(|e| PhishsimError::mail_transport(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// SMTP 发信（lettre 同步传输，在 blocking 线程池执行）
pub struct SmtpMailTransport {
    mailer: SmtpTransport,
}

impl SmtpMailTransport {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let builder = if config.use_tls {
            SmtpTransport::starttls_relay(&config.server).map_err(|e| {
                PhishsimError::mail_transport(format!("SMTP relay error: {}", e))
            })?
        } else {
            SmtpTransport::builder_dangerous(&config.server)
        };

        let mut builder = builder.port(config.port);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let message = mail.to_message()?;
        let mailer = self.mailer.clone();

        tokio::task::spawn_blocking(move || mailer.send(&message))
            .await
            .map_err(|e| PhishsimError::mail_transport(format!("Mail task failed: {}", e)))?
            .map_err(|e| PhishsimError::mail_transport(format!("Failed to send email: {}", e)))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// 未配置 SMTP 时使用：只写日志
pub struct LogOnlyTransport;

#[async_trait]
impl MailTransport for LogOnlyTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        mail.to_message()?;
        info!(
            to = %mail.to,
            subject = %mail.subject,
            "SMTP not configured, simulated email logged instead of sent"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log-only"
    }
}

/// 根据配置选择传输层
pub fn build_transport(config: &MailConfig) -> Result<Box<dyn MailTransport>> {
    if config.server.trim().is_empty() {
        warn!("mail.server is empty, emails will only be logged");
        return Ok(Box::new(LogOnlyTransport));
    }
    Ok(Box::new(SmtpMailTransport::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &str) -> OutgoingMail {
        OutgoingMail {
            to: to.to_string(),
            from_name: "IT Security".to_string(),
            from_email: "security@example.com".to_string(),
            subject: "Password expiry".to_string(),
            html: "<p>hello</p>".to_string(),
            headers: vec![("X-Phishing-Simulation".to_string(), "true".to_string())],
        }
    }

    #[test]
    fn test_message_carries_simulation_header() {
        let message = mail("alice@example.com").to_message().unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("X-Phishing-Simulation: true"));
        assert!(raw.contains("Subject: Password expiry"));
    }

    #[tokio::test]
    async fn test_log_only_rejects_bad_address() {
        let transport = LogOnlyTransport;
        assert!(transport.send(&mail("alice@example.com")).await.is_ok());
        assert!(matches!(
            transport.send(&mail("not an address")).await,
            Err(PhishsimError::MailTransport(_))
        ));
    }

    #[test]
    fn test_empty_server_selects_log_only() {
        let transport = build_transport(&MailConfig::default()).unwrap();
        assert_eq!(transport.name(), "log-only");
    }
}
