//! In-process mailer that records instead of delivering. Backs the desk and
//! server tests, where assertions care about what was attempted rather than
//! whether a relay accepted it.

use tokio::sync::Mutex;

use crate::{DeliveryError, QuotationEmail, QuotationMailer, SendReceipt};

/// Records every attempt in order. A scripted failure makes each send return
/// a transport error until [`RecordingMailer::recover`] is called, while the
/// attempt itself is still recorded, matching how a real relay outage looks
/// from the caller's side.
#[derive(Default)]
pub struct RecordingMailer {
    attempts: Mutex<Vec<QuotationEmail>>,
    failure: Mutex<Option<String>>,
}

impl RecordingMailer {
    pub fn failing(detail: impl Into<String>) -> Self {
        Self {
            attempts: Mutex::new(Vec::new()),
            failure: Mutex::new(Some(detail.into())),
        }
    }

    pub async fn fail_with(&self, detail: impl Into<String>) {
        *self.failure.lock().await = Some(detail.into());
    }

    pub async fn recover(&self) {
        *self.failure.lock().await = None;
    }

    pub async fn attempts(&self) -> Vec<QuotationEmail> {
        self.attempts.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl QuotationMailer for RecordingMailer {
    async fn send_quotation(&self, email: QuotationEmail) -> Result<SendReceipt, DeliveryError> {
        let position = {
            let mut attempts = self.attempts.lock().await;
            attempts.push(email);
            attempts.len()
        };

        if let Some(detail) = self.failure.lock().await.clone() {
            return Err(DeliveryError::Transport(detail));
        }

        Ok(SendReceipt {
            message_id: format!("<recorded-{position:04}@charterdesk.test>"),
        })
    }
}
