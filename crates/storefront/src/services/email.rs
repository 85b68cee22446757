//! Order and payment confirmation emails.
//!
//! Bodies come from Askama templates under `templates/email/`, sent over
//! SMTP as a text/HTML alternative pair.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::models::{Order, OrderItem};

/// A rendered order line.
pub struct EmailLine {
    pub part_number: String,
    pub name: String,
    pub quantity: i32,
    pub line_total: String,
}

impl EmailLine {
    fn from_items(order: &Order, items: &[OrderItem]) -> Vec<Self> {
        items
            .iter()
            .map(|item| Self {
                part_number: item.part_number.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                line_total: order.money(item.line_total()).display(),
            })
            .collect()
    }
}

/// Values shared by the order emails.
pub struct OrderSummary {
    pub order_number: String,
    pub lines: Vec<EmailLine>,
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub total: String,
    pub address: Vec<String>,
    pub order_url: String,
}

impl OrderSummary {
    #[must_use]
    pub fn new(order: &Order, items: &[OrderItem], order_url: String) -> Self {
        Self {
            order_number: order.number(),
            lines: EmailLine::from_items(order, items),
            subtotal: order.money(order.subtotal).display(),
            shipping: order.money(order.shipping).display(),
            tax: order.money(order.tax).display(),
            total: order.total_money().display(),
            address: order.shipping_address.lines(),
            order_url,
        }
    }
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    order: &'a OrderSummary,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    order: &'a OrderSummary,
}

#[derive(Template)]
#[template(path = "email/payment_confirmation.html")]
struct PaymentConfirmationHtml<'a> {
    order: &'a OrderSummary,
}

#[derive(Template)]
#[template(path = "email/payment_confirmation.txt")]
struct PaymentConfirmationText<'a> {
    order: &'a OrderSummary,
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

/// A rendered message: subject plus plain-text and HTML bodies.
struct Mail {
    subject: String,
    text: String,
    html: String,
}

fn mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address
        .parse()
        .map_err(|_| EmailError::InvalidAddress(address.to_owned()))
}

/// SMTP sender for customer emails; cheap to clone into spawned tasks.
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

    /// "We received your order", sent right after checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or delivery fails.
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        order: &OrderSummary,
    ) -> Result<(), EmailError> {
        let mail = Mail {
            subject: format!("Order {} received", order.order_number),
            text: OrderConfirmationText { order }.render()?,
            html: OrderConfirmationHtml { order }.render()?,
        };
        self.deliver(to, mail).await
    }

    /// "Payment received", sent from the Stripe webhook.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or delivery fails.
    pub async fn send_payment_confirmation(
        &self,
        to: &str,
        order: &OrderSummary,
    ) -> Result<(), EmailError> {
        let mail = Mail {
            subject: format!("Payment confirmed for order {}", order.order_number),
            text: PaymentConfirmationText { order }.render()?,
            html: PaymentConfirmationHtml { order }.render()?,
        };
        self.deliver(to, mail).await
    }

    fn compose(&self, to: &str, mail: Mail) -> Result<Message, EmailError> {
        let body = MultiPart::alternative()
            .singlepart(SinglePart::plain(mail.text))
            .singlepart(SinglePart::html(mail.html));
        Ok(Message::builder()
            .from(self.from.clone())
            .to(mailbox(to)?)
            .subject(mail.subject)
            .multipart(body)?)
    }

    async fn deliver(&self, to: &str, mail: Mail) -> Result<(), EmailError> {
        let message = self.compose(to, mail)?;
        self.mailer.send(message).await?;
        tracing::info!(to = %to, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn summary() -> OrderSummary {
        OrderSummary {
            order_number: "BS-000042".to_owned(),
            lines: vec![EmailLine {
                part_number: "6205-2RS".to_owned(),
                name: "Deep groove ball bearing".to_owned(),
                quantity: 2,
                line_total: "€25.00".to_owned(),
            }],
            subtotal: "€25.00".to_owned(),
            shipping: "€25.00".to_owned(),
            tax: "€4.75".to_owned(),
            total: "€54.75".to_owned(),
            address: vec!["Ana Pop".to_owned(), "Str. Lunga 1".to_owned()],
            order_url: "https://shop.test/account/orders/42".to_owned(),
        }
    }

    #[test]
    fn test_order_confirmation_substitutes_tokens() {
        let order = summary();
        let text = OrderConfirmationText { order: &order }.render().unwrap();

        assert!(text.contains("BS-000042"));
        assert!(text.contains("2 × 6205-2RS"));
        assert!(text.contains("Total: €54.75"));
        assert!(text.contains("https://shop.test/account/orders/42"));
    }

    #[test]
    fn test_invalid_recipient_is_rejected_before_sending() {
        let err = mailbox("not an address").unwrap_err();
        assert!(matches!(err, EmailError::InvalidAddress(a) if a == "not an address"));
        assert!(mailbox("Bearing Shop <orders@rulmenti.ro>").is_ok());
    }

    #[test]
    fn test_payment_confirmation_html_escapes() {
        let mut order = summary();
        order.address = vec!["<b>Ana</b>".to_owned()];
        let html = PaymentConfirmationHtml { order: &order }.render().unwrap();

        assert!(html.contains("€54.75"));
        assert!(html.contains("&#60;b&#62;Ana") || html.contains("&lt;b&gt;Ana"));
    }
}
