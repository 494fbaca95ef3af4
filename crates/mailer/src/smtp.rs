//! Production mailer over lettre. The transport is built once at startup;
//! every send borrows it, so a failed relay never poisons the application.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use tera::Tera;
use tracing::debug;
use uuid::Uuid;

use charterdesk_core::config::{BusinessConfig, SmtpConfig};

use crate::templates::{self, render_quotation};
use crate::{DeliveryError, QuotationEmail, QuotationMailer, SendReceipt};

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    templates: Tera,
    from: Mailbox,
    reply_to: Option<Mailbox>,
    company_name: String,
    currency: String,
}

impl SmtpMailer {
    pub fn new(smtp: &SmtpConfig, business: &BusinessConfig) -> Result<Self, DeliveryError> {
        let from = parse_mailbox(&format!("{} <{}>", smtp.from_name, smtp.from_address))?;
        let reply_to = match &business.reply_to {
            Some(address) => Some(parse_mailbox(address)?),
            None => None,
        };

        // Port 465 relays expect a TLS wrapper from the first byte; everything
        // else negotiates STARTTLS on the submission port.
        let mut builder = if smtp.implicit_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
        }
        .map_err(|e| DeliveryError::Transport(e.to_string()))?
        .port(smtp.port)
        .timeout(Some(Duration::from_secs(smtp.timeout_secs)));

        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder
                .credentials(Credentials::new(username.clone(), password.expose_secret().to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            templates: templates::quotation_templates()?,
            from,
            reply_to,
            company_name: business.company_name.clone(),
            currency: business.currency.clone(),
        })
    }

    /// Message ids are minted locally so the audit trail can reference the
    /// message even when the relay never acknowledges it.
    fn next_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4().simple(), self.from.email.domain())
    }
}

#[async_trait]
impl QuotationMailer for SmtpMailer {
    async fn send_quotation(&self, email: QuotationEmail) -> Result<SendReceipt, DeliveryError> {
        let to = parse_mailbox(&email.to)?;
        let rendered = render_quotation(&self.templates, &email, &self.company_name, &self.currency)?;
        let message_id = self.next_message_id();

        let mut builder = Message::builder()
            .message_id(Some(message_id.clone()))
            .from(self.from.clone())
            .to(to)
            .subject(rendered.subject);
        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(reply_to.clone());
        }

        let message = builder
            .multipart(MultiPart::alternative_plain_html(rendered.text, rendered.html))
            .map_err(|e| DeliveryError::Template(format!("could not assemble the message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        debug!(
            quote = %email.quote_code,
            message_id = %message_id,
            "quotation email handed to the smtp relay"
        );
        Ok(SendReceipt { message_id })
    }
}

fn parse_mailbox(raw: &str) -> Result<Mailbox, DeliveryError> {
    raw.parse::<Mailbox>().map_err(|e| DeliveryError::Address {
        address: raw.to_string(),
        detail: e.to_string(),
    })
}
