//! Order status emails to customers, as a text/HTML alternative pair.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Values substituted into the status-update email.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub order_number: String,
    pub customer_name: String,
    /// Human-readable status, e.g. "Shipped".
    pub status_label: String,
    /// AWB number, when the order has one.
    pub tracking_number: Option<String>,
    pub order_url: String,
}

impl StatusUpdate {
    fn subject(&self) -> String {
        format!("Order {}: {}", self.order_number, self.status_label)
    }
}

#[derive(Template)]
#[template(path = "email/status_update.html")]
struct StatusUpdateHtml<'a> {
    update: &'a StatusUpdate,
}

#[derive(Template)]
#[template(path = "email/status_update.txt")]
struct StatusUpdateText<'a> {
    update: &'a StatusUpdate,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

fn mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address
        .parse()
        .map_err(|_| EmailError::InvalidAddress(address.to_owned()))
}

/// Sends status-update emails over SMTP.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailService {
    /// # Errors
    ///
    /// Returns an error if the STARTTLS relay cannot be set up or
    /// `EMAIL_FROM` is not a valid mailbox.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.expose_secret().to_owned(),
            ))
            .build();

        Ok(Self {
            mailer,
            from: mailbox(&config.from_address)?,
        })
    }

    /// Tell the customer their order moved to a new status.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or delivery fails.
    pub async fn send_status_update(
        &self,
        to: &str,
        update: &StatusUpdate,
    ) -> Result<(), EmailError> {
        let message = self.compose(to, update)?;
        self.mailer.send(message).await?;
        tracing::info!(to = %to, order_number = %update.order_number, "Status email sent");
        Ok(())
    }

    fn compose(&self, to: &str, update: &StatusUpdate) -> Result<Message, EmailError> {
        let body = MultiPart::alternative()
            .singlepart(SinglePart::plain(StatusUpdateText { update }.render()?))
            .singlepart(SinglePart::html(StatusUpdateHtml { update }.render()?));
        Ok(Message::builder()
            .from(self.from.clone())
            .to(mailbox(to)?)
            .subject(update.subject())
            .multipart(body)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn update(tracking_number: Option<&str>) -> StatusUpdate {
        StatusUpdate {
            order_number: "BS-000042".to_owned(),
            customer_name: "Ana Pop".to_owned(),
            status_label: "Shipped".to_owned(),
            tracking_number: tracking_number.map(str::to_owned),
            order_url: "https://shop.test/account/orders/42".to_owned(),
        }
    }

    #[test]
    fn test_status_update_includes_awb() {
        let update = update(Some("AWB 1234567890"));
        let text = StatusUpdateText { update: &update }.render().unwrap();

        assert!(text.contains("BS-000042"));
        assert!(text.contains("Shipped"));
        assert!(text.contains("AWB 1234567890"));
        assert!(text.contains("https://shop.test/account/orders/42"));
    }

    #[test]
    fn test_subject_names_order_and_status() {
        assert_eq!(update(None).subject(), "Order BS-000042: Shipped");
    }

    #[test]
    fn test_recipient_must_be_a_mailbox() {
        assert!(matches!(
            mailbox("ana.pop@"),
            Err(EmailError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_status_update_without_awb() {
        let update = update(None);
        let html = StatusUpdateHtml { update: &update }.render().unwrap();

        assert!(html.contains("Shipped"));
        assert!(!html.contains("Tracking number"));
    }
}
